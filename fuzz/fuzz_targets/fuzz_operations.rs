//! Fuzz testing for mapped file operation sequences.
//!
//! This fuzz target drives a MappedFile through arbitrary sequences of
//! growth, append, span and lifecycle operations and checks after every
//! step that file size and mapped size agree and stay block aligned.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use mmf::{Growth, MappedFile, MmfError, MmfOptions};

const BLOCK: u64 = 4096;
const MAX_SIZE: u64 = 256 * BLOCK;

#[derive(Debug, Arbitrary)]
struct OperationsInput {
    initial_size: u16,
    operations: Vec<Operation>,
}

#[derive(Debug, Arbitrary)]
enum Operation {
    EnsureSize(u32),
    Append(Vec<u8>),
    Reserve(u16),
    SpanThenGrow { offset: u16, len: u8, grow: u16 },
    Zero,
    Sync,
    Reopen,
}

fuzz_target!(|input: OperationsInput| {
    if input.operations.len() > 64 {
        return;
    }

    let dir = tempfile::tempdir().unwrap();
    let opts = MmfOptions::builder().block_size(BLOCK).build().unwrap();
    let mut mmf = MappedFile::with_options(opts);
    mmf.open_for_write(dir.path().join("fuzz_tmp"), input.initial_size as u64, true)
        .unwrap();

    for op in input.operations {
        match op {
            Operation::EnsureSize(target) => {
                let target = (target as u64).min(MAX_SIZE);
                let before = mmf.file_size();
                match mmf.ensure_size(target).unwrap() {
                    Growth::Unchanged => assert_eq!(mmf.file_size(), before),
                    Growth::Grown { from, to } => {
                        assert_eq!(from, before);
                        assert!(to >= target);
                    }
                }
            }
            Operation::Append(bytes) => {
                let before = mmf.pos_write();
                match mmf.append(&bytes) {
                    Ok(at) => {
                        assert_eq!(at, before);
                        assert_eq!(mmf.view(at, bytes.len() as u64).unwrap(), &bytes[..]);
                    }
                    Err(MmfError::FileEnd { .. }) => assert_eq!(mmf.pos_write(), before),
                    Err(e) => panic!("unexpected append error: {}", e),
                }
            }
            Operation::Reserve(len) => {
                let _ = mmf.reserve(len as u64);
            }
            Operation::SpanThenGrow { offset, len, grow } => {
                let Ok(span) = mmf.span(offset as u64, len as u64) else {
                    continue;
                };
                let target = (mmf.file_size() + grow as u64).min(MAX_SIZE);
                let grown = matches!(mmf.ensure_size(target).unwrap(), Growth::Grown { .. });
                assert_eq!(mmf.resolve(&span).is_err(), grown);
            }
            Operation::Zero => {
                mmf.zero().unwrap();
                assert!(mmf.view(0, mmf.file_size()).unwrap().iter().all(|&b| b == 0));
            }
            Operation::Sync => mmf.sync().unwrap(),
            Operation::Reopen => {
                let size = mmf.file_size();
                mmf.close_for_reopen();
                mmf.reopen_for_write(0, false).unwrap();
                assert_eq!(mmf.file_size(), size);
            }
        }

        assert_eq!(mmf.file_size(), mmf.map_size());
        assert_eq!(mmf.file_size() % BLOCK, 0);
        mmf.verify_sizes().unwrap();
    }

    mmf.unlink_and_close();
});
