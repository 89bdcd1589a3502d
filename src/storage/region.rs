//! # Raw Mapping
//!
//! `Region` is the leaf of the storage layer: one shared (`MAP_SHARED`)
//! mapping of a file descriptor at a byte offset. It knows nothing about block
//! sizes, cursors or paths; [`MappedFile`](super::MappedFile) sequences file
//! growth around it.
//!
//! ## Operations
//!
//! ```text
//! Region::establish(file, offset, len, prot)   mmap
//! Region::grow(&mut self, file, new_len)       mremap(MREMAP_MAYMOVE) / remap
//! Region::release(self)                        munmap
//! Region::view_unchecked(offset, len)          pointer arithmetic, no checks
//! ```
//!
//! ## Address Validity
//!
//! The base address is only valid until the next successful `grow()` or until
//! `release()`. Two mechanisms keep stale addresses from being used:
//!
//! - **Borrows**: `view()` borrows `&self`, `view_mut()` and `grow()` borrow
//!   `&mut self`, so the borrow checker rejects any slice held across a grow.
//! - **Generations**: a [`Span`] is a detached `(offset, len, generation)`
//!   handle that can be stored anywhere. Generations are drawn from one
//!   process-wide counter, so no two mappings ever share one. Every
//!   successful grow draws a fresh generation and `resolve()` refuses spans
//!   minted under any other, including spans from a mapping that was
//!   released and replaced.
//!
//! `release()` consumes the region, so a double unmap cannot be expressed.
//!
//! ## Growth Precondition
//!
//! `grow()` must only be called after the backing file has been extended to at
//! least `new_len` bytes. Touching mapped pages past the end of the file raises
//! `SIGBUS`.
//!
//! ## Platform Behavior
//!
//! ### Linux
//! - `grow()` uses `mremap` with `MREMAP_MAYMOVE`: extended in place when the
//!   address range is free, relocated otherwise
//!
//! ### Other Unix
//! - `grow()` establishes a fresh mapping of the new length and drops the old
//!   one; the address always changes

use std::fs::File;
use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::{Advice, MmapOptions, MmapRaw};
#[cfg(target_os = "linux")]
use memmap2::RemapOptions;

use crate::error::{MmfError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    ReadOnly,
    ReadWrite,
}

/// Access-pattern hint passed to `madvise`. Never affects correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessPattern {
    Normal,
    Sequential,
    Random,
    WillNeed,
}

impl From<AccessPattern> for Advice {
    fn from(pattern: AccessPattern) -> Self {
        match pattern {
            AccessPattern::Normal => Advice::Normal,
            AccessPattern::Sequential => Advice::Sequential,
            AccessPattern::Random => Advice::Random,
            AccessPattern::WillNeed => Advice::WillNeed,
        }
    }
}

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// A byte range of a region, valid for one mapping generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    offset: u64,
    len: u64,
    generation: u64,
}

impl Span {
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
pub struct Region {
    raw: MmapRaw,
    offset: u64,
    protection: Protection,
    generation: u64,
}

impl Region {
    pub fn establish(file: &File, offset: u64, len: usize, protection: Protection) -> Result<Self> {
        let raw = Self::map(file, offset, len, protection)?;

        Ok(Self {
            raw,
            offset,
            protection,
            generation: next_generation(),
        })
    }

    fn map(file: &File, offset: u64, len: usize, protection: Protection) -> Result<MmapRaw> {
        let mut opts = MmapOptions::new();
        opts.offset(offset).len(len);

        let raw = match protection {
            Protection::ReadOnly => opts.map_raw_read_only(file),
            Protection::ReadWrite => opts.map_raw(file),
        };

        raw.map_err(|e| MmfError::mapping("establish", e))
    }

    /// Extends the mapping to `new_len` bytes, moving it if necessary.
    ///
    /// On error the region keeps its previous address, length and generation.
    pub fn grow(&mut self, file: &File, new_len: usize) -> Result<()> {
        debug_assert!(
            new_len > self.len(),
            "grow to {} from {} does not extend the mapping",
            new_len,
            self.len()
        );

        self.remap(file, new_len)?;
        self.generation = next_generation();

        Ok(())
    }

    #[cfg(target_os = "linux")]
    fn remap(&mut self, _file: &File, new_len: usize) -> Result<()> {
        // SAFETY: MmapRaw::remap is unsafe because the old address range becomes
        // invalid once the mapping moves. This is safe because:
        // 1. grow() takes &mut self, so no slice borrowed from this region exists
        // 2. Detached Spans are checked against the generation replaced by grow()
        // 3. The caller extended the file to at least new_len before calling
        unsafe {
            self.raw
                .remap(new_len, RemapOptions::new().may_move(true))
                .map_err(|e| MmfError::mapping("grow", e))
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn remap(&mut self, file: &File, new_len: usize) -> Result<()> {
        let fresh = Self::map(file, self.offset, new_len, self.protection)?;
        self.raw = fresh;
        Ok(())
    }

    /// Unmaps the region. Every address derived from it is invalid afterwards.
    pub fn release(self) {
        drop(self.raw);
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.raw.as_ptr()
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.len() == 0
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn protection(&self) -> Protection {
        self.protection
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Returns `len` bytes starting `offset` bytes past the base address.
    ///
    /// # Safety
    ///
    /// `offset + len` must not exceed [`Region::len`], and the mapped pages
    /// must be backed by the file. No check is performed.
    pub unsafe fn view_unchecked(&self, offset: usize, len: usize) -> &[u8] {
        std::slice::from_raw_parts(self.raw.as_ptr().add(offset), len)
    }

    pub fn view(&self, offset: u64, len: u64) -> Result<&[u8]> {
        let (start, len) = self.check_range(offset, len)?;

        // SAFETY: check_range() guarantees start + len <= self.len().
        Ok(unsafe { self.view_unchecked(start, len) })
    }

    pub fn view_mut(&mut self, offset: u64, len: u64) -> Result<&mut [u8]> {
        if self.protection == Protection::ReadOnly {
            return Err(MmfError::ReadOnly);
        }
        let (start, len) = self.check_range(offset, len)?;

        // SAFETY: the range is in bounds (check_range), the mapping is writable
        // (checked above) and &mut self makes this the only live view.
        Ok(unsafe { std::slice::from_raw_parts_mut(self.raw.as_mut_ptr().add(start), len) })
    }

    pub fn span(&self, offset: u64, len: u64) -> Result<Span> {
        self.check_range(offset, len)?;

        Ok(Span {
            offset,
            len,
            generation: self.generation,
        })
    }

    pub fn resolve(&self, span: &Span) -> Result<&[u8]> {
        self.check_generation(span)?;
        self.view(span.offset, span.len)
    }

    pub fn resolve_mut(&mut self, span: &Span) -> Result<&mut [u8]> {
        self.check_generation(span)?;
        self.view_mut(span.offset, span.len)
    }

    fn check_generation(&self, span: &Span) -> Result<()> {
        if span.generation != self.generation {
            return Err(MmfError::StaleView {
                expected: span.generation,
                current: self.generation,
            });
        }
        Ok(())
    }

    fn check_range(&self, offset: u64, len: u64) -> Result<(usize, usize)> {
        let mapped = self.len() as u64;
        match offset.checked_add(len) {
            Some(end) if end <= mapped => Ok((offset as usize, len as usize)),
            _ => Err(MmfError::OutOfBounds {
                offset,
                len,
                mapped,
            }),
        }
    }

    pub fn advise(&self, pattern: AccessPattern) -> Result<()> {
        if self.is_empty() {
            return Ok(());
        }
        self.raw
            .advise(pattern.into())
            .map_err(|e| MmfError::mapping("advise", e))
    }

    /// Synchronously writes dirty pages of the mapping back to the file.
    pub fn flush(&self) -> Result<()> {
        self.raw.flush().map_err(|e| MmfError::mapping("flush", e))
    }
}
