//! # Mapped File Lifecycle Tests
//!
//! Exercises the public `MappedFile` API end to end:
//! 1. Write-open sizing follows the block rounding rule
//! 2. Growth keeps file size and mapped size equal and leaves cursors alone
//! 3. Double opens fail with `AlreadyMapped`
//! 4. Publication strips exactly the `_tmp` suffix
//! 5. `unlink_and_close` always ends unmapped with zeroed cursors
//! 6. Zeroing clears every byte of the mapping
//! 7. Spans minted before a growth or an unmap never resolve afterwards
//!
//! ## Background
//!
//! The default block size is 64 KiB, which keeps these tests on real
//! on-disk sizes. Tests that loop over many growths use a 4 KiB block to
//! keep the temp directory small.

use mmf::{
    file_exists, unlink, Growth, MappedFile, MmfError, MmfOptions, OpenMode, DEFAULT_BLOCK_SIZE,
    HEADER_SIZE,
};
use tempfile::tempdir;

fn with_block(block: u64) -> MappedFile {
    MappedFile::with_options(MmfOptions::builder().block_size(block).build().unwrap())
}

mod sizing {
    use super::*;

    #[test]
    fn fresh_ten_byte_request_yields_one_block() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("fresh_tmp");
        let mut mmf = MappedFile::new();

        let created = mmf.open_for_write(&path, 10, true).unwrap();

        assert!(created, "an empty file SHOULD be reported as created");
        assert_eq!(mmf.file_size(), 65536);
        assert_eq!(mmf.map_size(), 65536);
        assert_eq!(mmf.pos_write(), 65536);
        assert_eq!(mmf.pos_write(), mmf.file_size(), "no data room at one block");
    }

    #[test]
    fn write_open_sizes_are_block_multiples() {
        let dir = tempdir().unwrap();
        let b = DEFAULT_BLOCK_SIZE;

        for (i, requested) in [0, 1, b - 1, b, b + 1, 3 * b, 3 * b + 17]
            .into_iter()
            .enumerate()
        {
            let mut mmf = MappedFile::new();
            mmf.open_for_write(dir.path().join(format!("f{}", i)), requested, true)
                .unwrap();

            let size = mmf.file_size();
            assert_eq!(size % b, 0, "size {} for request {}", size, requested);
            assert!(size >= requested.max(b));
            assert!(size - requested.max(b) < b);
            assert_eq!(size, mmf.map_size());
            mmf.close();
        }
    }

    #[test]
    fn reopening_existing_file_never_shrinks_it() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let mut mmf = with_block(4096);
        mmf.open_for_write(&path, 5 * 4096, true).unwrap();
        mmf.close();

        let created = mmf.open_for_write(&path, 0, false).unwrap();

        assert!(!created);
        assert_eq!(mmf.file_size(), 5 * 4096);
    }
}

mod growth {
    use super::*;

    #[test]
    fn increasing_targets_keep_sizes_equal() {
        let dir = tempdir().unwrap();
        let block = 4096;
        let mut mmf = with_block(block);
        mmf.open_for_write(dir.path().join("f"), 0, true).unwrap();
        mmf.set_pos_write(block + 42);

        for target in [block + 1, 2 * block + 5, 7 * block, 7 * block + 1, 20 * block - 3] {
            let expected = if target % block == 0 {
                target
            } else {
                target - target % block + block
            };

            mmf.ensure_size(target).unwrap();

            assert_eq!(mmf.file_size(), expected);
            assert_eq!(mmf.map_size(), expected);
            assert_eq!(mmf.pos_write(), block + 42);
            mmf.verify_sizes().unwrap();
        }
    }

    #[test]
    fn growth_reports_old_and_new_size() {
        let dir = tempdir().unwrap();
        let mut mmf = MappedFile::new();
        mmf.open_for_write(dir.path().join("f"), 0, true).unwrap();

        let growth = mmf.ensure_size(HEADER_SIZE + 1).unwrap();

        assert_eq!(
            growth,
            Growth::Grown {
                from: DEFAULT_BLOCK_SIZE,
                to: 2 * DEFAULT_BLOCK_SIZE
            }
        );
    }

    #[test]
    fn appender_loop_grows_on_demand() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log_tmp");
        let block = 4096;
        let mut mmf = with_block(block);
        mmf.open_for_write(&path, 0, true).unwrap();

        let record = [0xABu8; 100];
        for _ in 0..200 {
            mmf.ensure_size(mmf.pos_write() + record.len() as u64)
                .unwrap();
            mmf.append(&record).unwrap();
        }
        mmf.sync().unwrap();
        mmf.mark_flushed();

        let end = block + 200 * 100;
        assert_eq!(mmf.pos_write(), end);
        assert_eq!(mmf.pos_flush(), end);
        assert!(mmf.file_size() >= end);
        assert!(mmf
            .view(block, 200 * 100)
            .unwrap()
            .iter()
            .all(|&b| b == 0xAB));
    }

    #[test]
    fn failed_allocation_leaves_sizes_and_generation_untouched() {
        let dir = tempdir().unwrap();
        let mut mmf = with_block(4096);
        mmf.open_for_write(dir.path().join("f"), 0, true).unwrap();
        let generation = mmf.generation();

        let err = mmf.ensure_size(u64::MAX).unwrap_err();

        assert!(
            matches!(err, MmfError::Allocation { from: 4096, .. }),
            "an impossible growth SHOULD fail in allocation, got {:?}",
            err
        );
        assert_eq!(mmf.file_size(), 4096);
        assert_eq!(mmf.map_size(), 4096);
        assert_eq!(mmf.generation(), generation);
        assert!(mmf.verify_sizes().is_ok());
        mmf.view_mut(0, 4096).unwrap().fill(1);
    }

    #[test]
    fn reads_after_growth_use_the_new_base_address() {
        let dir = tempdir().unwrap();
        let mut mmf = with_block(4096);
        mmf.open_for_write(dir.path().join("f"), 0, true).unwrap();
        mmf.view_mut(0, 4).unwrap().copy_from_slice(b"head");
        let generation = mmf.generation().unwrap();

        mmf.ensure_size(64 * 4096).unwrap();

        let after = mmf.base_addr().unwrap();
        // The mapping may or may not have moved; reads go through the new base.
        assert!(!after.is_null());
        assert_ne!(mmf.generation().unwrap(), generation);
        assert_eq!(mmf.view(0, 4).unwrap(), b"head");
    }
}

mod exclusivity {
    use super::*;

    #[test]
    fn double_write_open_fails_both_times() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let mut mmf = MappedFile::new();
        mmf.open_for_write(&path, 0, true).unwrap();

        for _ in 0..2 {
            let err = mmf.open_for_write(&path, 0, true).unwrap_err();
            assert!(matches!(err, MmfError::AlreadyMapped));
        }
        assert_eq!(mmf.mode(), Some(OpenMode::Write));
    }

    #[test]
    fn open_after_close_succeeds() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f");
        let mut mmf = MappedFile::new();
        mmf.open_for_write(&path, 0, true).unwrap();
        mmf.close();

        mmf.open_for_read(&path, 0).unwrap();

        assert_eq!(mmf.mode(), Some(OpenMode::Read));
    }
}

mod publication {
    use super::*;

    #[test]
    fn publish_without_suffix_fails_and_keeps_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment.dat");
        let mut mmf = MappedFile::new();
        mmf.open_for_write(&path, 0, true).unwrap();

        let err = mmf.rename_from_tmp().unwrap_err();

        assert!(matches!(err, MmfError::NotATempPath { .. }));
        assert_eq!(mmf.path(), Some(path.as_path()));
        assert!(file_exists(&path));
    }

    #[test]
    fn publish_strips_suffix_and_new_name_opens() {
        let dir = tempdir().unwrap();
        let tmp = dir.path().join("segment_0001_tmp");
        let published = dir.path().join("segment_0001");
        let mut mmf = MappedFile::new();
        mmf.open_for_write(&tmp, 0, true).unwrap();
        mmf.view_mut(0, 5).unwrap().copy_from_slice(b"magic");
        mmf.sync().unwrap();

        mmf.rename_from_tmp().unwrap();
        mmf.close();

        assert!(!file_exists(&tmp));
        let mut reader = MappedFile::new();
        reader.open_for_read(&published, 0).unwrap();
        assert_eq!(reader.view(0, 5).unwrap(), b"magic");
        assert_eq!(reader.file_size(), DEFAULT_BLOCK_SIZE);
    }

    #[test]
    fn publish_replaces_existing_target() {
        let dir = tempdir().unwrap();
        let published = dir.path().join("segment");
        std::fs::write(&published, b"stale").unwrap();
        let mut mmf = MappedFile::new();
        mmf.open_for_write(dir.path().join("segment_tmp"), 0, true)
            .unwrap();

        mmf.rename_from_tmp().unwrap();

        assert_eq!(
            std::fs::metadata(&published).unwrap().len(),
            DEFAULT_BLOCK_SIZE
        );
    }
}

mod deletion {
    use super::*;

    #[test]
    fn unlink_and_close_removes_backing_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f_tmp");
        let mut mmf = MappedFile::new();
        mmf.open_for_write(&path, 0, true).unwrap();
        mmf.set_pos_flush(mmf.pos_write());

        assert!(mmf.unlink_and_close().is_none());

        assert!(!file_exists(&path));
        assert!(!mmf.is_mapped());
        assert_eq!(mmf.path(), None);
        assert_eq!((mmf.pos_write(), mmf.pos_flush()), (0, 0));
    }

    #[test]
    fn unlink_and_close_after_external_removal_still_closes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("f_tmp");
        let mut mmf = MappedFile::new();
        mmf.open_for_write(&path, 0, true).unwrap();
        unlink(&path).unwrap();

        let removal = mmf.unlink_and_close();

        assert!(removal.is_some(), "the ignored removal error SHOULD be observable");
        assert!(!mmf.is_mapped());
        assert_eq!((mmf.pos_write(), mmf.pos_flush()), (0, 0));
        mmf.open_for_write(&path, 0, true).unwrap();
    }
}

mod zeroing {
    use super::*;

    #[test]
    fn zeroed_file_reads_back_all_zero() {
        let dir = tempdir().unwrap();
        let mut mmf = with_block(4096);
        mmf.open_for_write(dir.path().join("f"), 3 * 4096, true)
            .unwrap();
        mmf.view_mut(0, 3 * 4096).unwrap().fill(0x5A);

        mmf.zero().unwrap();

        for (offset, len) in [(0, 1), (100, 400), (4096, 4096), (0, 3 * 4096)] {
            assert!(mmf.view(offset, len).unwrap().iter().all(|&b| b == 0));
        }
    }
}

mod spans {
    use super::*;

    #[test]
    fn span_from_unlinked_file_is_stale_in_the_next_file() {
        let dir = tempdir().unwrap();
        let mut mmf = with_block(4096);
        mmf.open_for_write(dir.path().join("a_tmp"), 0, true).unwrap();
        let span = mmf.span(0, 16).unwrap();

        mmf.unlink_and_close();
        mmf.open_for_write(dir.path().join("b_tmp"), 0, true).unwrap();

        assert!(
            matches!(mmf.resolve(&span), Err(MmfError::StaleView { .. })),
            "a span SHOULD NOT resolve against a different file"
        );
    }

    #[test]
    fn span_is_stale_after_close_for_reopen() {
        let dir = tempdir().unwrap();
        let mut mmf = with_block(4096);
        mmf.open_for_write(dir.path().join("f"), 0, true).unwrap();
        let span = mmf.span(0, 16).unwrap();

        mmf.close_for_reopen();
        mmf.reopen_for_write(0, false).unwrap();

        assert!(matches!(
            mmf.resolve(&span),
            Err(MmfError::StaleView { .. })
        ));
        let fresh = mmf.span(0, 16).unwrap();
        assert_eq!(mmf.resolve(&fresh).unwrap().len(), 16);
    }
}
