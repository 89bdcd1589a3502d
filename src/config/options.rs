//! # Mapped File Options
//!
//! `MmfOptions` carries the per-instance sizing policy of a
//! [`MappedFile`](crate::MappedFile). The defaults reproduce the fixed
//! on-disk contract (64 KiB blocks, header = one block); the builder exists
//! for tools and tests that need a smaller footprint.
//!
//! ## Usage
//!
//! ```ignore
//! let opts = MmfOptions::builder()
//!     .block_size(4096)
//!     .file_mode(0o644)
//!     .build()?;
//! let mut mmf = MappedFile::with_options(opts);
//! ```
//!
//! ## Rounding Rule
//!
//! Sizes requested from the mapped file are rounded with [`round_to_block`]:
//! anything at or below one block becomes exactly one block, anything larger
//! is rounded up to the next multiple of the block size. The header region is
//! always one block long, so the write cursor of a freshly opened file sits at
//! `block_size`.

use crate::config::constants::{DEFAULT_BLOCK_SIZE, FILE_MODE};
use crate::error::{MmfError, Result};

/// Rounds `size` to the block policy: floor of one block, otherwise the next
/// multiple of `block`.
///
/// `block` must be non-zero; [`MmfOptionsBuilder::build`] guarantees this for
/// every value that reaches a [`MappedFile`](crate::MappedFile).
pub fn round_to_block(size: u64, block: u64) -> u64 {
    if size <= block {
        return block;
    }
    match size % block {
        0 => size,
        r => (size - r).saturating_add(block),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MmfOptions {
    block_size: u64,
    file_mode: u32,
}

impl Default for MmfOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            file_mode: FILE_MODE,
        }
    }
}

impl MmfOptions {
    pub fn builder() -> MmfOptionsBuilder {
        MmfOptionsBuilder::default()
    }

    /// Allocation unit for file and mapping sizes.
    pub fn block_size(&self) -> u64 {
        self.block_size
    }

    /// Size of the reserved header; the initial write cursor.
    pub fn header_size(&self) -> u64 {
        self.block_size
    }

    /// Permission bits applied when a missing file is created.
    pub fn file_mode(&self) -> u32 {
        self.file_mode
    }

    pub fn round(&self, size: u64) -> u64 {
        round_to_block(size, self.block_size)
    }
}

/// Builder for [`MmfOptions`]. Unset fields keep their defaults.
#[derive(Debug, Default)]
pub struct MmfOptionsBuilder {
    block_size: Option<u64>,
    file_mode: Option<u32>,
}

impl MmfOptionsBuilder {
    pub fn block_size(mut self, block_size: u64) -> Self {
        self.block_size = Some(block_size);
        self
    }

    pub fn file_mode(mut self, mode: u32) -> Self {
        self.file_mode = Some(mode);
        self
    }

    pub fn build(self) -> Result<MmfOptions> {
        let defaults = MmfOptions::default();
        let block_size = self.block_size.unwrap_or(defaults.block_size);
        if block_size == 0 {
            return Err(MmfError::InvalidBlockSize(block_size));
        }

        Ok(MmfOptions {
            block_size,
            file_mode: self.file_mode.unwrap_or(defaults.file_mode),
        })
    }
}
