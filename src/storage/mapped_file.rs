//! # Growable Mapped File
//!
//! `MappedFile` couples a file handle with a [`Region`] and keeps the two the
//! same size while the file grows. It is the building block for appenders that
//! write sequentially past a fixed header and need the backing storage to
//! expand on demand while remaining one contiguous byte range.
//!
//! ## State Machine
//!
//! ```text
//!             open_for_read
//!           ┌──────────────> MappedRead ──┐
//! Unmapped ─┤                             ├── close / unlink_and_close ──> Unmapped
//!           └──────────────> MappedWrite ─┘
//!             open_for_write   │      ^
//!                              └──────┘ ensure_size
//! ```
//!
//! Opening an instance that is already mapped fails with `AlreadyMapped`.
//! `close_for_reopen` keeps the path so `reopen_for_read` / `reopen_for_write`
//! can map the same file again.
//!
//! ## File Layout
//!
//! ```text
//! Offset 0:            Header (one block, contents owned by the caller)
//! Offset block_size:   Data region, filled sequentially; the write cursor
//!                      of a fresh open starts here
//! ...
//! file_size:           Always one block or a multiple of the block size
//! ```
//!
//! ## Growth
//!
//! `ensure_size(target)` rounds `target` up to the block size, reserves real
//! disk blocks for the new tail with `fallocate`, then grows the mapping.
//! Size fields are committed only after both steps succeed. If the remap
//! fails after the allocation, the instance stays valid at its previous
//! mapped size and the file on disk is larger than the mapping, which is
//! harmless; `verify_sizes()` reports it.
//!
//! Growth requires `&mut self`, so no slice from `view()` can survive it.
//! Long-lived references should be stored as [`Span`]s, which fail with
//! `StaleView` once the mapping generation moves on.
//!
//! ## Publication
//!
//! Files under construction carry the `_tmp` suffix. `rename_from_tmp()`
//! atomically renames `name_tmp` to `name`, which is the only way a file
//! becomes visible under its final name.
//!
//! ## Thread Safety
//!
//! None. A `MappedFile` has exactly one owner; callers sharing one across
//! threads must wrap it in their own lock.

use std::ffi::OsStr;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{MmfOptions, TMP_SUFFIX, TMP_SUFFIX_LEN};
use crate::error::{MmfError, Result};

use super::files;
use super::region::{AccessPattern, Protection, Region, Span};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
}

/// Outcome of [`MappedFile::ensure_size`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Growth {
    Unchanged,
    Grown { from: u64, to: u64 },
}

#[derive(Debug)]
struct Mapped {
    file: File,
    region: Region,
    mode: OpenMode,
}

#[derive(Debug)]
pub struct MappedFile {
    options: MmfOptions,
    path: Option<PathBuf>,
    mapped: Option<Mapped>,
    file_size: u64,
    map_size: u64,
    pos_write: u64,
    pos_flush: u64,
}

impl Default for MappedFile {
    fn default() -> Self {
        Self::new()
    }
}

impl MappedFile {
    pub fn new() -> Self {
        Self::with_options(MmfOptions::default())
    }

    pub fn with_options(options: MmfOptions) -> Self {
        Self {
            options,
            path: None,
            mapped: None,
            file_size: 0,
            map_size: 0,
            pos_write: 0,
            pos_flush: 0,
        }
    }

    /// Maps `path` read-only.
    ///
    /// A non-positive `map_size` maps the whole file; otherwise exactly
    /// `map_size` bytes are mapped. Mapping past the end of the file is
    /// permitted, but touching those bytes raises `SIGBUS`.
    ///
    /// Returns the number of bytes mapped.
    pub fn open_for_read<P: AsRef<Path>>(&mut self, path: P, map_size: i64) -> Result<u64> {
        if self.is_mapped() {
            return Err(MmfError::AlreadyMapped);
        }
        let path = path.as_ref();

        let file = File::open(path).map_err(|e| MmfError::io("open", path, e))?;
        let file_size = file
            .metadata()
            .map_err(|e| MmfError::io("stat", path, e))?
            .len();

        let map_size = if map_size <= 0 {
            file_size
        } else {
            map_size as u64
        };
        let region = Region::establish(&file, 0, to_len(map_size)?, Protection::ReadOnly)?;

        debug!(path = %path.display(), file_size, map_size, "mapped file for read");

        self.install(path, file, region, OpenMode::Read, file_size, map_size);
        Ok(map_size)
    }

    /// Maps `path` read-write, extending it to at least `target_size` rounded
    /// to the block size.
    ///
    /// Returns `true` if the file was empty before this call.
    pub fn open_for_write<P: AsRef<Path>>(
        &mut self,
        path: P,
        target_size: u64,
        create: bool,
    ) -> Result<bool> {
        if self.is_mapped() {
            return Err(MmfError::AlreadyMapped);
        }
        let path = path.as_ref();

        let mut open_opts = OpenOptions::new();
        open_opts.read(true).write(true).create(create);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            open_opts.mode(self.options.file_mode());
        }
        let file = open_opts
            .open(path)
            .map_err(|e| MmfError::io("open", path, e))?;

        let size = self.options.round(target_size);
        let mut file_size = file
            .metadata()
            .map_err(|e| MmfError::io("stat", path, e))?
            .len();

        let mut created = false;
        if file_size < size {
            file.set_len(size)
                .map_err(|e| MmfError::io("truncate", path, e))?;
            created = file_size == 0;
            file_size = size;
        }

        let region = Region::establish(&file, 0, to_len(file_size)?, Protection::ReadWrite)?;

        debug!(path = %path.display(), file_size, created, "mapped file for write");

        self.install(path, file, region, OpenMode::Write, file_size, file_size);
        Ok(created)
    }

    fn install(
        &mut self,
        path: &Path,
        file: File,
        region: Region,
        mode: OpenMode,
        file_size: u64,
        map_size: u64,
    ) {
        self.mapped = Some(Mapped { file, region, mode });
        self.path = Some(path.to_path_buf());
        self.file_size = file_size;
        self.map_size = map_size;
        self.pos_write = self.options.header_size();
        self.pos_flush = 0;
    }

    /// Maps the path retained by [`close_for_reopen`](Self::close_for_reopen)
    /// read-only.
    pub fn reopen_for_read(&mut self, map_size: i64) -> Result<u64> {
        let path = self.path.clone().ok_or(MmfError::NoPath)?;
        self.open_for_read(path, map_size)
    }

    /// Maps the path retained by [`close_for_reopen`](Self::close_for_reopen)
    /// read-write.
    pub fn reopen_for_write(&mut self, target_size: u64, create: bool) -> Result<bool> {
        let path = self.path.clone().ok_or(MmfError::NoPath)?;
        self.open_for_write(path, target_size, create)
    }

    /// Grows file and mapping so that at least `target` bytes are addressable.
    ///
    /// Nothing happens if the file is already larger than `target`. Any slice
    /// or span obtained before a `Grown` result is invalid afterwards.
    pub fn ensure_size(&mut self, target: u64) -> Result<Growth> {
        let mapped = self.mapped.as_mut().ok_or(MmfError::NotMapped)?;
        if mapped.mode != OpenMode::Write {
            return Err(MmfError::ReadOnly);
        }
        if self.file_size > target {
            return Ok(Growth::Unchanged);
        }

        let from = self.file_size;
        let to = self.options.round(target);
        if to <= from {
            return Ok(Growth::Unchanged);
        }

        files::allocate(&mapped.file, from, to)
            .map_err(|source| MmfError::Allocation { from, to, source })?;
        mapped.region.grow(&mapped.file, to_len(to)?)?;

        self.file_size = to;
        self.map_size = to;

        debug!(from, to, generation = mapped.region.generation(), "grew mapped file");
        Ok(Growth::Grown { from, to })
    }

    /// Unmaps and closes the file, forgetting the path.
    pub fn close(&mut self) {
        self.close_for_reopen();
        self.path = None;
    }

    /// Unmaps and closes the file but keeps the path for a later reopen.
    pub fn close_for_reopen(&mut self) {
        if let Some(Mapped { file, region, .. }) = self.mapped.take() {
            region.release();
            drop(file);
            debug!(path = ?self.path, "closed mapped file");
        }
        self.file_size = 0;
        self.map_size = 0;
    }

    /// Removes the file, closes the instance and resets both cursors.
    ///
    /// A failed removal does not stop the close. It is logged and handed back
    /// so callers that care can inspect it.
    pub fn unlink_and_close(&mut self) -> Option<io::Error> {
        let removal = self.path.as_ref().and_then(|path| {
            let err = files::unlink(path).err()?;
            warn!(path = %path.display(), error = %err, "failed to remove mapped file");
            Some(err)
        });

        self.close();
        self.pos_write = 0;
        self.pos_flush = 0;

        removal
    }

    /// Makes every write through the mapping durable.
    pub fn sync(&self) -> Result<()> {
        let mapped = self.mapped.as_ref().ok_or(MmfError::NotMapped)?;
        if mapped.mode == OpenMode::Write {
            mapped.region.flush()?;
        }
        mapped
            .file
            .sync_all()
            .map_err(|e| MmfError::io("sync", self.path_or_empty(), e))
    }

    /// Publishes a `*_tmp` file under its final name by dropping the suffix.
    pub fn rename_from_tmp(&mut self) -> Result<()> {
        let current = self.path.as_deref().ok_or(MmfError::NoPath)?;
        let published = strip_tmp_suffix(current).ok_or_else(|| MmfError::NotATempPath {
            path: current.to_path_buf(),
        })?;

        self.rename(published)
    }

    pub fn rename<P: AsRef<Path>>(&mut self, new_path: P) -> Result<()> {
        let from = self.path.as_ref().ok_or(MmfError::NoPath)?;
        let to = new_path.as_ref();

        std::fs::rename(from, to).map_err(|e| MmfError::io("rename", from.clone(), e))?;
        debug!(from = %from.display(), to = %to.display(), "renamed mapped file");

        self.path = Some(to.to_path_buf());
        Ok(())
    }

    /// Overwrites the whole file with zero bytes in place.
    pub fn zero(&mut self) -> Result<()> {
        let len = self.file_size;
        self.region_mut()?.view_mut(0, len)?.fill(0);
        Ok(())
    }

    pub fn advise(&self, pattern: AccessPattern) -> Result<()> {
        self.region()?.advise(pattern)
    }

    /// Compares the on-disk length with the mapped size.
    pub fn verify_sizes(&self) -> Result<()> {
        let mapped = self.mapped.as_ref().ok_or(MmfError::NotMapped)?;
        let on_disk = mapped
            .file
            .metadata()
            .map_err(|e| MmfError::io("stat", self.path_or_empty(), e))?
            .len();

        if on_disk != self.map_size {
            return Err(MmfError::SizeMismatch {
                on_disk,
                mapped: self.map_size,
            });
        }
        Ok(())
    }

    pub fn view(&self, offset: u64, len: u64) -> Result<&[u8]> {
        self.region()?.view(offset, len)
    }

    pub fn view_mut(&mut self, offset: u64, len: u64) -> Result<&mut [u8]> {
        self.region_mut()?.view_mut(offset, len)
    }

    pub fn span(&self, offset: u64, len: u64) -> Result<Span> {
        self.region()?.span(offset, len)
    }

    pub fn resolve(&self, span: &Span) -> Result<&[u8]> {
        self.region()?.resolve(span)
    }

    pub fn resolve_mut(&mut self, span: &Span) -> Result<&mut [u8]> {
        self.region_mut()?.resolve_mut(span)
    }

    /// Advances the write cursor by `len` bytes and returns where the
    /// reservation starts.
    pub fn reserve(&mut self, len: u64) -> Result<u64> {
        self.region()?;
        self.check_room(len)?;

        let at = self.pos_write;
        self.pos_write += len;
        Ok(at)
    }

    /// Copies `bytes` to the write cursor and advances it.
    pub fn append(&mut self, bytes: &[u8]) -> Result<u64> {
        let len = bytes.len() as u64;
        self.check_room(len)?;

        let at = self.pos_write;
        self.region_mut()?.view_mut(at, len)?.copy_from_slice(bytes);
        self.pos_write += len;
        Ok(at)
    }

    fn check_room(&self, len: u64) -> Result<()> {
        let available = self.map_size.saturating_sub(self.pos_write);
        if len > available {
            return Err(MmfError::FileEnd {
                requested: len,
                available,
            });
        }
        Ok(())
    }

    pub fn pos_write(&self) -> u64 {
        self.pos_write
    }

    pub fn set_pos_write(&mut self, pos: u64) {
        debug_assert!(
            pos >= self.pos_write,
            "write cursor moved backwards: {} -> {}",
            self.pos_write,
            pos
        );
        self.pos_write = pos;
    }

    pub fn pos_flush(&self) -> u64 {
        self.pos_flush
    }

    pub fn set_pos_flush(&mut self, pos: u64) {
        self.pos_flush = pos;
    }

    /// Records the current write cursor as durable.
    pub fn mark_flushed(&mut self) {
        self.pos_flush = self.pos_write;
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped.is_some()
    }

    pub fn mode(&self) -> Option<OpenMode> {
        self.mapped.as_ref().map(|m| m.mode)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Base address of the mapping; valid until the next growth or close.
    pub fn base_addr(&self) -> Option<*const u8> {
        self.mapped.as_ref().map(|m| m.region.as_ptr())
    }

    pub fn generation(&self) -> Option<u64> {
        self.mapped.as_ref().map(|m| m.region.generation())
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn map_size(&self) -> u64 {
        self.map_size
    }

    pub fn options(&self) -> &MmfOptions {
        &self.options
    }

    fn region(&self) -> Result<&Region> {
        self.mapped
            .as_ref()
            .map(|m| &m.region)
            .ok_or(MmfError::NotMapped)
    }

    fn region_mut(&mut self) -> Result<&mut Region> {
        self.mapped
            .as_mut()
            .map(|m| &mut m.region)
            .ok_or(MmfError::NotMapped)
    }

    fn path_or_empty(&self) -> PathBuf {
        self.path.clone().unwrap_or_default()
    }
}

/// Drops the trailing `TMP_SUFFIX_LEN` bytes of a `*_tmp` path. Compares raw
/// bytes, so non-UTF-8 names publish too.
fn strip_tmp_suffix(path: &Path) -> Option<PathBuf> {
    let bytes = path.as_os_str().as_bytes();
    if bytes.len() <= TMP_SUFFIX_LEN || !bytes.ends_with(TMP_SUFFIX.as_bytes()) {
        return None;
    }
    let stem = &bytes[..bytes.len() - TMP_SUFFIX_LEN];
    Some(PathBuf::from(OsStr::from_bytes(stem)))
}

fn to_len(size: u64) -> Result<usize> {
    usize::try_from(size).map_err(|_| {
        MmfError::mapping(
            "size",
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{} bytes exceed the address space", size),
            ),
        )
    })
}
