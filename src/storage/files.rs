//! Filesystem helpers used by the mapped file: existence checks, removal and
//! physical block allocation.

use std::fs::File;
use std::io;
use std::path::Path;

pub fn file_exists<P: AsRef<Path>>(path: P) -> bool {
    std::fs::metadata(path).is_ok()
}

pub fn unlink<P: AsRef<Path>>(path: P) -> io::Result<()> {
    std::fs::remove_file(path)
}

/// Reserves real disk blocks for `from..to`, extending the file to `to`.
///
/// Falls back to `posix_fallocate` where the filesystem does not support
/// `fallocate` (glibc emulates it by writing zeroes).
#[cfg(target_os = "linux")]
pub(crate) fn allocate(file: &File, from: u64, to: u64) -> io::Result<()> {
    use std::os::unix::io::AsRawFd;

    debug_assert!(to > from);
    let fd = file.as_raw_fd();
    let offset = from as libc::off_t;
    let len = (to - from) as libc::off_t;

    // SAFETY: fallocate only reads its integer arguments; fd stays open for the
    // duration of the call because `file` is borrowed.
    let rc = unsafe { libc::fallocate(fd, 0, offset, len) };
    if rc == 0 {
        return Ok(());
    }

    let err = io::Error::last_os_error();
    if err.raw_os_error() != Some(libc::EOPNOTSUPP) {
        return Err(err);
    }

    // SAFETY: same as above.
    match unsafe { libc::posix_fallocate(fd, offset, len) } {
        0 => Ok(()),
        errno => Err(io::Error::from_raw_os_error(errno)),
    }
}

/// Extends the file to `to`. Platforms without `fallocate` get a sparse
/// extension.
#[cfg(not(target_os = "linux"))]
pub(crate) fn allocate(file: &File, from: u64, to: u64) -> io::Result<()> {
    debug_assert!(to > from);
    file.set_len(to)
}
