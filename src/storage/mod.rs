//! # Storage Module
//!
//! This module provides the two layers of the crate: a raw memory mapping and
//! the growable file built on top of it.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ MappedFile                                    │
//! │  path, File, file_size == map_size,           │
//! │  write/flush cursors, block-size policy       │
//! │  open / ensure_size / sync / rename / unlink  │
//! ├──────────────────────────────────────────────┤
//! │ Region                                        │
//! │  mmap / mremap / munmap, generation counter,  │
//! │  zero-copy views and detached spans           │
//! ├──────────────────────────────────────────────┤
//! │ files                                         │
//! │  fallocate, exists, unlink                    │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! ## Safety Model
//!
//! A mapping's address changes when it grows. Slices handed out by `view()`
//! borrow the owner, and growth needs `&mut self`, so the borrow checker
//! rejects slices held across a growth at compile time:
//!
//! ```text
//! MappedFile::view(&self) -> &[u8]          // Borrows &self immutably
//! MappedFile::ensure_size(&mut self)        // Requires &mut self exclusively
//! ```
//!
//! References that must outlive a borrow are stored as `Span`s. Each carries
//! the mapping generation it was minted in and is checked on resolve.
//!
//! ## Platform Support
//!
//! Uses the `memmap2` crate for mapping and `libc` for block allocation:
//! - Linux: mmap / mremap / munmap / msync, fallocate
//! - Other Unix: mmap / munmap / msync, sparse `set_len` growth

mod files;
mod mapped_file;
mod region;

pub use files::{file_exists, unlink};
pub use mapped_file::{Growth, MappedFile, OpenMode};
pub use region::{AccessPattern, Protection, Region, Span};
