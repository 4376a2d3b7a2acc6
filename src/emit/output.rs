//! Staged output files.
//!
//! Bytes go to a temporary file next to the destination; `commit` renames
//! it over the destination. Dropping an uncommitted file removes the
//! temporary, so a failed export never leaves a partial file behind.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::util::{Error, Result};

/// Output file written through a temporary.
pub struct OutputFile {
    writer: BufWriter<NamedTempFile>,
    dest: PathBuf,
    pos: u64,
}

impl OutputFile {
    /// Stage a new file for `dest`, creating its directory.
    pub fn create(dest: impl AsRef<Path>) -> Result<Self> {
        let dest = dest.as_ref().to_path_buf();
        let dir = dest
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or(Path::new("."));
        std::fs::create_dir_all(dir)?;
        let tmp = NamedTempFile::new_in(dir)?;
        Ok(Self {
            writer: BufWriter::with_capacity(256 * 1024, tmp),
            dest,
            pos: 0,
        })
    }

    #[inline]
    pub fn pos(&self) -> u64 {
        self.pos
    }

    pub fn dest(&self) -> &Path {
        &self.dest
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        self.writer.write_all(data)?;
        self.pos += data.len() as u64;
        Ok(())
    }

    /// Flush and move the file into place.
    pub fn commit(self) -> Result<PathBuf> {
        let tmp = self
            .writer
            .into_inner()
            .map_err(|e| Error::Io(e.into_error()))?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.dest)?;
        Ok(self.dest)
    }
}

/// Write `bytes` to `dest` atomically.
pub fn write_file(dest: impl AsRef<Path>, bytes: &[u8]) -> Result<PathBuf> {
    let mut out = OutputFile::create(dest)?;
    out.write_bytes(bytes)?;
    out.commit()
}
