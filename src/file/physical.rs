//! Memory-mapped program images.
//!
//! The file is mapped read-only; the loader walks the mapping once, so nothing is copied
//! before validation.

use super::Backend;
use crate::{
    Error::{Error, FileError, ProgramTooShort},
    Result,
};

use memmap2::Mmap;
use std::{fs, path::Path};

/// A program image on disk, accessed through a read-only mapping.
#[derive(Debug)]
pub struct Physical {
    data: Mmap,
}

impl Physical {
    /// Map the file at `path`.
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be opened,
    /// [`crate::Error::ProgramTooShort`] for a zero-length file (which cannot be mapped) or
    /// [`crate::Error::Error`] if mapping fails.
    pub fn new(path: impl AsRef<Path>) -> Result<Physical> {
        let file = fs::File::open(path).map_err(FileError)?;
        if file.metadata()?.len() == 0 {
            return Err(ProgramTooShort { length: 0 });
        }

        // SAFETY: the mapping is read-only and lives as long as `Physical`; images are not
        // expected to be modified while they are being disassembled.
        let data = unsafe { Mmap::map(&file) }.map_err(|error| Error(error.to_string()))?;

        Ok(Physical { data })
    }
}

impl Backend for Physical {
    fn data(&self) -> &[u8] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_physical() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"ba&`@]").unwrap();
        file.flush().unwrap();

        let physical = Physical::new(file.path()).unwrap();

        assert_eq!(physical.len(), 6);
        assert_eq!(physical.data(), b"ba&`@]");
    }

    #[test]
    fn test_physical_empty_file() {
        let file = tempfile::NamedTempFile::new().unwrap();

        assert!(matches!(
            Physical::new(file.path()),
            Err(ProgramTooShort { length: 0 })
        ));
    }

    #[test]
    fn test_physical_missing_file() {
        let dir = tempfile::tempdir().unwrap();

        assert!(matches!(
            Physical::new(dir.path().join("nothing.mb")),
            Err(FileError(_))
        ));
    }
}
