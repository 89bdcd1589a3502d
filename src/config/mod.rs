//! # Configuration Module
//!
//! Sizing constants and the [`MmfOptions`] builder used to construct a
//! [`MappedFile`](crate::MappedFile).
//!
//! ## Module Organization
//!
//! - [`constants`]: Block size, header size, temp suffix, file mode
//! - `options`: Per-instance overrides validated at build time

pub mod constants;
mod options;

pub use constants::*;
pub use options::{round_to_block, MmfOptions, MmfOptionsBuilder};
