//! GLB container: 12-byte header followed by a JSON chunk.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::util::{Error, Result};

/// `glTF` in little-endian.
pub const GLB_MAGIC: u32 = 0x4654_6C67;
pub const GLB_VERSION: u32 = 2;
/// `JSON` chunk type.
pub const CHUNK_JSON: u32 = 0x4E4F_534A;

const HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

/// Wrap a JSON document in a GLB container; the chunk is padded with
/// spaces to a 4-byte boundary.
pub fn write_glb(json: &[u8]) -> Result<Vec<u8>> {
    let padded = json.len().next_multiple_of(4);
    let total = HEADER_LEN + CHUNK_HEADER_LEN + padded;
    let total_u32 = u32::try_from(total).map_err(|_| Error::other("GLB exceeds 4 GiB"))?;

    let mut out = Vec::with_capacity(total);
    out.write_u32::<LittleEndian>(GLB_MAGIC)?;
    out.write_u32::<LittleEndian>(GLB_VERSION)?;
    out.write_u32::<LittleEndian>(total_u32)?;
    out.write_u32::<LittleEndian>(padded as u32)?;
    out.write_u32::<LittleEndian>(CHUNK_JSON)?;
    out.extend_from_slice(json);
    out.resize(total, b' ');
    Ok(out)
}

/// Read the JSON chunk back out of a GLB container.
pub fn parse_glb(bytes: &[u8]) -> Result<serde_json::Value> {
    let mut r = Cursor::new(bytes);
    let magic = r.read_u32::<LittleEndian>()?;
    if magic != GLB_MAGIC {
        return Err(Error::invalid(format!("not a GLB container (magic {magic:#010x})")));
    }
    let version = r.read_u32::<LittleEndian>()?;
    if version != GLB_VERSION {
        return Err(Error::invalid(format!("unsupported GLB version {version}")));
    }
    let total = r.read_u32::<LittleEndian>()? as usize;
    if total > bytes.len() {
        return Err(Error::invalid(format!(
            "GLB declares {total} bytes, {} present",
            bytes.len()
        )));
    }

    let chunk_len = r.read_u32::<LittleEndian>()? as usize;
    let chunk_type = r.read_u32::<LittleEndian>()?;
    if chunk_type != CHUNK_JSON {
        return Err(Error::invalid("first GLB chunk is not JSON"));
    }
    if HEADER_LEN + CHUNK_HEADER_LEN + chunk_len > total {
        return Err(Error::invalid("GLB JSON chunk overruns the container"));
    }
    let mut chunk = vec![0u8; chunk_len];
    r.read_exact(&mut chunk)?;
    Ok(serde_json::from_slice(&chunk)?)
}
