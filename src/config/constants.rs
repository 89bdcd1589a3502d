//! # Mapped File Constants
//!
//! This module centralizes the sizing and naming constants used by the mapped
//! file layer. Values that depend on each other are co-located and their
//! relationships are checked at compile time.
//!
//! ## Dependency Graph
//!
//! ```text
//! DEFAULT_BLOCK_SIZE (65536 bytes, 256 * 256)
//!       │
//!       ├─> HEADER_SIZE (equal: the first block is the reserved header)
//!       │     The write cursor of a freshly opened file starts here.
//!       │
//!       └─> Minimum file size and growth granularity
//!             Every file is exactly one block or a multiple of it.
//!
//! TMP_SUFFIX ("_tmp")
//!       │
//!       └─> TMP_SUFFIX_LEN (4, checked below)
//!             rename_from_tmp() strips exactly this many bytes.
//! ```
//!
//! ## Critical Invariants
//!
//! 1. `HEADER_SIZE == DEFAULT_BLOCK_SIZE`
//! 2. `DEFAULT_BLOCK_SIZE` is a multiple of the smallest common OS page (4 KiB)
//! 3. `TMP_SUFFIX.len() == TMP_SUFFIX_LEN`

// ============================================================================
// SIZING
// ============================================================================

/// Fixed allocation unit for file and mapping sizes (64 KiB).
pub const DEFAULT_BLOCK_SIZE: u64 = 256 * 256;

/// Size of the reserved header region at the start of every file.
pub const HEADER_SIZE: u64 = DEFAULT_BLOCK_SIZE;

/// Smallest OS page size we assume when checking block alignment.
const MIN_OS_PAGE_SIZE: u64 = 4096;

const _: () = assert!(
    HEADER_SIZE == DEFAULT_BLOCK_SIZE,
    "the header occupies exactly one block"
);

const _: () = assert!(
    DEFAULT_BLOCK_SIZE % MIN_OS_PAGE_SIZE == 0,
    "DEFAULT_BLOCK_SIZE must be page aligned"
);

// ============================================================================
// NAMING
// ============================================================================

/// Suffix carried by files that are still under construction.
pub const TMP_SUFFIX: &str = "_tmp";

/// Number of bytes dropped from the path on publication.
pub const TMP_SUFFIX_LEN: usize = 4;

const _: () = assert!(
    TMP_SUFFIX.len() == TMP_SUFFIX_LEN,
    "TMP_SUFFIX_LEN does not match TMP_SUFFIX"
);

// ============================================================================
// FILE CREATION
// ============================================================================

/// Permission bits used when `open_for_write` creates a missing file.
pub const FILE_MODE: u32 = 0o777;
