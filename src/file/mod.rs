//! Program image access for the disassembler.
//!
//! This module provides the byte source the loader reads a program image from. Images can live
//! on disk (memory-mapped) or in a buffer that is already in memory, and both are accessed through
//! the same [`Backend`] trait so that the loader in [`crate::vm::VmState::load`] never cares where
//! the bytes came from.
//!
//! # Key Components
//!
//! - [`ProgramImage`] - An opened program image, owning its backend
//! - [`Backend`] - Trait for the different data sources
//! - [`memory::Memory`] - Buffer backed image
//! - [`physical::Physical`] - Memory-mapped file backed image
//!
//! # Example
//!
//! ```rust,no_run
//! use malscope::file::ProgramImage;
//! use std::path::Path;
//!
//! let image = ProgramImage::from_file(Path::new("hello.mb"))?;
//! println!("{} bytes", image.len());
//! # Ok::<(), malscope::Error>(())
//! ```

pub mod memory;
pub mod physical;

use std::path::Path;

use crate::{Error::ProgramTooShort, Result};
use memory::Memory;
use physical::Physical;

/// Backend trait for program image data sources.
///
/// Implementors hand out the raw bytes of an image; where they live is up to them.
pub trait Backend: Send + Sync {
    /// Returns the entire data buffer.
    fn data(&self) -> &[u8];

    /// Returns the total length of the data buffer.
    fn len(&self) -> usize {
        self.data().len()
    }
}

/// An opened program image.
///
/// The image is the raw byte stream as stored on disk: it still contains whitespace, may carry
/// an early terminator (`0x1A` / `0x04`) and has not been validated. Validation happens when a
/// [`crate::vm::VmState`] is loaded from it.
pub struct ProgramImage {
    data: Box<dyn Backend>,
}

impl ProgramImage {
    /// Open a program image from disk.
    ///
    /// # Arguments
    /// * `file` - Path to the program image
    ///
    /// # Errors
    /// Returns [`crate::Error::FileError`] if the file cannot be read and
    /// [`crate::Error::ProgramTooShort`] if it has no content.
    pub fn from_file(file: &Path) -> Result<ProgramImage> {
        let input = Physical::new(file)?;

        Self::load(input)
    }

    /// Create a program image from a buffer.
    ///
    /// # Arguments
    /// * `data` - The raw image bytes
    ///
    /// # Errors
    /// Returns [`crate::Error::ProgramTooShort`] if the buffer is empty.
    pub fn from_mem(data: Vec<u8>) -> Result<ProgramImage> {
        let input = Memory::new(data);

        Self::load(input)
    }

    fn load<T: Backend + 'static>(data: T) -> Result<ProgramImage> {
        if data.len() == 0 {
            return Err(ProgramTooShort { length: 0 });
        }

        Ok(ProgramImage {
            data: Box::new(data),
        })
    }

    /// Returns the total size of the image in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the image has a length of zero.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.len() == 0
    }

    /// Returns the raw image bytes.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        self.data.data()
    }
}
