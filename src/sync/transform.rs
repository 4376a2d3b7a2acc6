//! Fixed 36-byte transform record.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::core::Transform;
use crate::util::{Error, Result};

/// Position, euler rotation and scale as little-endian f32 triples at
/// offsets 0, 12 and 24.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct TransformRecord {
    pub position: [f32; 3],
    pub rotation: [f32; 3],
    pub scale: [f32; 3],
}

impl TransformRecord {
    pub const SIZE: usize = 36;

    pub fn new(position: Vec3, rotation: Vec3, scale: Vec3) -> Self {
        Self {
            position: position.to_array(),
            rotation: rotation.to_array(),
            scale: scale.to_array(),
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::from_array(self.position)
    }

    pub fn rotation(&self) -> Vec3 {
        Vec3::from_array(self.rotation)
    }

    pub fn scale(&self) -> Vec3 {
        Vec3::from_array(self.scale)
    }

    pub fn values(&self) -> [f32; 9] {
        bytemuck::cast(*self)
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        self.write_to(&mut out[..]);
        out
    }

    fn write_to(&self, mut buf: &mut [u8]) {
        for v in self.values() {
            // Infallible: callers size the buffer.
            let _ = buf.write_f32::<LittleEndian>(v);
        }
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::record(format!(
                "transform record needs {} bytes, got {}",
                Self::SIZE,
                bytes.len()
            )));
        }
        let mut cur = Cursor::new(&bytes[..Self::SIZE]);
        let mut values = [0f32; 9];
        cur.read_f32_into::<LittleEndian>(&mut values)?;
        Ok(bytemuck::cast(values))
    }
}

impl From<&Transform> for TransformRecord {
    fn from(t: &Transform) -> Self {
        Self {
            position: t.position,
            rotation: t.rotation,
            scale: t.scale,
        }
    }
}

/// Pack records back to back.
pub fn encode_transforms(records: &[TransformRecord]) -> Vec<u8> {
    if cfg!(target_endian = "little") {
        return bytemuck::cast_slice(records).to_vec();
    }
    let mut out = vec![0u8; records.len() * TransformRecord::SIZE];
    for (rec, chunk) in records.iter().zip(out.chunks_exact_mut(TransformRecord::SIZE)) {
        rec.write_to(chunk);
    }
    out
}

pub fn decode_transforms(bytes: &[u8]) -> Result<Vec<TransformRecord>> {
    if bytes.len() % TransformRecord::SIZE != 0 {
        return Err(Error::record(format!(
            "{} bytes is not a whole number of transform records",
            bytes.len()
        )));
    }
    bytes.chunks_exact(TransformRecord::SIZE).map(TransformRecord::decode).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout() {
        assert_eq!(std::mem::size_of::<TransformRecord>(), TransformRecord::SIZE);

        let rec = TransformRecord::new(Vec3::new(1.0, 2.0, 3.0), Vec3::ZERO, Vec3::ONE);
        let bytes = rec.encode();
        assert_eq!(&bytes[0..4], &1.0f32.to_le_bytes());
        assert_eq!(&bytes[8..12], &3.0f32.to_le_bytes());
        assert_eq!(&bytes[12..24], &[0u8; 12]);
        assert_eq!(&bytes[32..36], &1.0f32.to_le_bytes());

        let back = TransformRecord::decode(&bytes).unwrap();
        assert_eq!(back.values(), [1.0, 2.0, 3.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_bulk_and_truncation() {
        let a = TransformRecord::new(Vec3::X, Vec3::Y, Vec3::splat(2.0));
        let b = TransformRecord::new(Vec3::NEG_Z, Vec3::new(90.0, 0.0, 0.0), Vec3::ONE);
        let bytes = encode_transforms(&[a, b]);
        assert_eq!(bytes.len(), 72);
        assert_eq!(&bytes[36..72], &b.encode());
        assert_eq!(decode_transforms(&bytes).unwrap(), vec![a, b]);

        assert!(matches!(TransformRecord::decode(&bytes[..20]), Err(Error::InvalidRecord(_))));
        assert!(decode_transforms(&bytes[..40]).is_err());
    }
}
