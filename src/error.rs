//! # Error Types
//!
//! Every fallible operation in this crate returns [`MmfError`]. Errors are
//! handed straight back to the caller: nothing is retried and nothing is
//! logged on the error path. The single exception is the removal inside
//! [`MappedFile::unlink_and_close`](crate::MappedFile::unlink_and_close),
//! which is best-effort.
//!
//! ## Kinds
//!
//! | Variant          | Raised by                                           |
//! |------------------|-----------------------------------------------------|
//! | `AlreadyMapped`  | any open on an instance that is still mapped         |
//! | `NotMapped`      | operations that need a mapping on a closed instance  |
//! | `NotATempPath`   | `rename_from_tmp` on a path without `_tmp`           |
//! | `Io`             | open, stat, truncate, rename, remove, fsync          |
//! | `Mapping`        | establishing, growing or releasing a mapping         |
//! | `Allocation`     | reserving file blocks during growth                  |
//! | `FileEnd`        | cursor helpers running past the mapped size          |
//! | `OutOfBounds`    | checked views outside the mapping                    |
//! | `ReadOnly`       | mutation through a read-only mapping                 |
//! | `StaleView`      | resolving a span minted before a growth              |
//! | `SizeMismatch`   | `verify_sizes` finding disk and mapping out of sync  |
//!
//! ## Partial Growth
//!
//! A remap failure after a successful block allocation is reported as
//! `Mapping`. The instance keeps its previous mapped size; the file on disk
//! may be larger. `verify_sizes` exposes that state as `SizeMismatch`.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, MmfError>;

#[derive(Debug, Error)]
pub enum MmfError {
    #[error("mapped file is already mapped")]
    AlreadyMapped,

    #[error("mapped file is not mapped")]
    NotMapped,

    #[error("no path retained for reopen")]
    NoPath,

    #[error("file path '{}' is not a temporary path", path.display())]
    NotATempPath { path: PathBuf },

    #[error("failed to {op} '{}': {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to {op} mapping: {source}")]
    Mapping {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("failed to allocate file blocks {from}..{to}: {source}")]
    Allocation {
        from: u64,
        to: u64,
        #[source]
        source: io::Error,
    },

    #[error("file end reached: requested {requested} bytes, {available} available")]
    FileEnd { requested: u64, available: u64 },

    #[error("range {offset}+{len} out of bounds (mapped={mapped})")]
    OutOfBounds { offset: u64, len: u64, mapped: u64 },

    #[error("mapping is read-only")]
    ReadOnly,

    #[error("span from generation {expected} used after growth (current generation {current})")]
    StaleView { expected: u64, current: u64 },

    #[error("file size {on_disk} does not match mapped size {mapped}")]
    SizeMismatch { on_disk: u64, mapped: u64 },

    #[error("block size must be non-zero, got {0}")]
    InvalidBlockSize(u64),
}

impl MmfError {
    pub(crate) fn io(op: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Self {
        MmfError::Io {
            op,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn mapping(op: &'static str, source: io::Error) -> Self {
        MmfError::Mapping { op, source }
    }

    /// Underlying OS error, if this error wraps one.
    pub fn os_error(&self) -> Option<&io::Error> {
        match self {
            MmfError::Io { source, .. }
            | MmfError::Mapping { source, .. }
            | MmfError::Allocation { source, .. } => Some(source),
            _ => None,
        }
    }
}
