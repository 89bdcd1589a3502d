//! # mmf - Growable Memory-Mapped Files
//!
//! `mmf` maps a file into the process address space and lets it grow without
//! the caller re-opening or re-mapping by hand. It is meant for appenders that
//! write sequentially past a fixed header:
//!
//! - **Zero-copy access**: views are slices straight into the mapping
//! - **Lockstep growth**: file blocks are allocated, then the mapping is grown
//! - **Atomic publication**: files are built as `*_tmp` and renamed when done
//!
//! ## Quick Start
//!
//! ```ignore
//! use mmf::MappedFile;
//!
//! let mut segment = MappedFile::new();
//! segment.open_for_write("./segment_tmp", 0, true)?;
//!
//! for record in records {
//!     segment.ensure_size(segment.pos_write() + record.len() as u64)?;
//!     segment.append(record)?;
//! }
//!
//! segment.sync()?;
//! segment.mark_flushed();
//! segment.rename_from_tmp()?;
//! segment.close();
//! ```
//!
//! ## File Layout
//!
//! ```text
//! ┌──────────────────────────────┐ 0
//! │ Header (one block, 64 KiB)    │
//! ├──────────────────────────────┤ block_size  <- initial write cursor
//! │ Data region                   │
//! │ (appended sequentially)       │
//! └──────────────────────────────┘ file_size (multiple of block_size)
//! ```
//!
//! The crate imposes no structure on header or data; it exposes bytes.
//!
//! ## Module Overview
//!
//! - [`storage`]: `Region` (raw mapping) and `MappedFile` (growable file)
//! - [`config`]: block size, temp suffix and `MmfOptions`
//! - [`error`]: `MmfError` and the crate `Result`
//!
//! ## Thread Safety
//!
//! No internal locking. A `MappedFile` is owned by one caller at a time;
//! share it across threads only behind an external lock.

pub mod config;
pub mod error;
pub mod storage;

pub use config::{MmfOptions, DEFAULT_BLOCK_SIZE, HEADER_SIZE, TMP_SUFFIX};
pub use error::{MmfError, Result};
pub use storage::{
    file_exists, unlink, AccessPattern, Growth, MappedFile, OpenMode, Protection, Region, Span,
};
