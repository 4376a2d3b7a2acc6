//! Camera sync record: fixed part plus an offset-indexed string section.
//!
//! Layout (little-endian):
//!
//! | offset | field                         |
//! |--------|-------------------------------|
//! | 0      | u32 offset of `user_id`       |
//! | 4      | u32 offset of `guid`          |
//! | 8      | u8 `dont_save`, 3 bytes zero  |
//! | 12     | position, 3 x f32             |
//! | 24     | rotation, 3 x f32             |
//! | 36     | strings: u32 length + UTF-8, zero padded to 4 |
//!
//! Offsets count from the start of the record.

use std::io::{Cursor, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use glam::Vec3;

use crate::util::{Error, Result};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct CameraSyncRecord {
    pub user_id: String,
    pub guid: String,
    pub dont_save: bool,
    pub position: Vec3,
    pub rotation: Vec3,
}

const FIXED_SIZE: usize = 36;

fn padded(len: usize) -> usize {
    (len + 3) & !3
}

impl CameraSyncRecord {
    pub fn encoded_len(&self) -> usize {
        FIXED_SIZE + 4 + padded(self.user_id.len()) + 4 + padded(self.guid.len())
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let user_off = FIXED_SIZE;
        let guid_off = user_off + 4 + padded(self.user_id.len());
        let mut out = Vec::with_capacity(self.encoded_len());

        out.write_u32::<LittleEndian>(offset(user_off)?)?;
        out.write_u32::<LittleEndian>(offset(guid_off)?)?;
        out.write_all(&[self.dont_save as u8, 0, 0, 0])?;
        for v in self.position.to_array().into_iter().chain(self.rotation.to_array()) {
            out.write_f32::<LittleEndian>(v)?;
        }
        write_string(&mut out, &self.user_id)?;
        write_string(&mut out, &self.guid)?;
        debug_assert_eq!(out.len(), self.encoded_len());
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < FIXED_SIZE {
            return Err(Error::record(format!(
                "camera record needs at least {FIXED_SIZE} bytes, got {}",
                bytes.len()
            )));
        }
        let mut cur = Cursor::new(bytes);
        let user_off = cur.read_u32::<LittleEndian>()? as usize;
        let guid_off = cur.read_u32::<LittleEndian>()? as usize;
        let dont_save = match cur.read_u8()? {
            0 => false,
            1 => true,
            b => return Err(Error::record(format!("dont_save flag must be 0 or 1, got {b}"))),
        };
        cur.set_position(12);
        let mut floats = [0f32; 6];
        cur.read_f32_into::<LittleEndian>(&mut floats)?;

        Ok(Self {
            user_id: read_string(bytes, user_off, "user_id")?,
            guid: read_string(bytes, guid_off, "guid")?,
            dont_save,
            position: Vec3::new(floats[0], floats[1], floats[2]),
            rotation: Vec3::new(floats[3], floats[4], floats[5]),
        })
    }
}

fn offset(at: usize) -> Result<u32> {
    u32::try_from(at).map_err(|_| Error::record(format!("offset {at} exceeds u32")))
}

fn write_string(out: &mut Vec<u8>, s: &str) -> Result<()> {
    out.write_u32::<LittleEndian>(offset(s.len())?)?;
    out.extend_from_slice(s.as_bytes());
    out.resize(out.len() + padded(s.len()) - s.len(), 0);
    Ok(())
}

fn read_string(bytes: &[u8], at: usize, field: &str) -> Result<String> {
    if at < FIXED_SIZE || at % 4 != 0 {
        return Err(Error::record(format!("{field} offset {at} is not in the string section")));
    }
    let len_bytes = bytes
        .get(at..at + 4)
        .ok_or_else(|| Error::record(format!("{field} offset {at} past end of record")))?;
    let len = Cursor::new(len_bytes).read_u32::<LittleEndian>()? as usize;
    let data = bytes
        .get(at + 4..at + 4 + len)
        .ok_or_else(|| Error::record(format!("{field} length {len} past end of record")))?;
    std::str::from_utf8(data)
        .map(str::to_string)
        .map_err(|e| Error::record(format!("{field} is not UTF-8: {e}")))
}
