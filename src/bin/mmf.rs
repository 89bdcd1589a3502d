//! # mmf CLI Entry Point
//!
//! Small maintenance tool for growable mapped files.
//!
//! ## Usage
//!
//! ```bash
//! # Create (or extend) a file to at least 1 MiB
//! mmf create ./segment_tmp 1048576
//!
//! # Grow an existing file
//! mmf grow ./segment_tmp 4194304
//!
//! # Publish segment_tmp as segment
//! mmf publish ./segment_tmp
//!
//! # Inspect, zero or delete a file
//! mmf info ./segment
//! mmf zero ./segment
//! mmf unlink ./segment
//! ```
//!
//! Set `RUST_LOG=debug` to trace open, growth and rename events.

use std::env;
use std::path::PathBuf;

use eyre::{bail, eyre, Result, WrapErr};
use mmf::{Growth, MappedFile, MmfOptions, TMP_SUFFIX};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

enum Command {
    Create { size: u64 },
    Grow { size: u64 },
    Info,
    Publish,
    Zero,
    Unlink,
}

fn run() -> Result<()> {
    let args: Vec<String> = env::args().skip(1).collect();

    let mut block_size: Option<u64> = None;
    let mut positional: Vec<&str> = Vec::new();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            "--version" | "-v" => {
                println!("mmf {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--block-size" | "-b" => {
                i += 1;
                let value = args
                    .get(i)
                    .ok_or_else(|| eyre!("--block-size requires a value"))?;
                block_size = Some(parse_size(value)?);
            }
            arg if arg.starts_with('-') => {
                bail!("Unknown option: {}", arg);
            }
            arg => positional.push(arg),
        }
        i += 1;
    }

    let (command, path) = match positional.as_slice() {
        ["create", path] => (Command::Create { size: 0 }, path),
        ["create", path, size] => (
            Command::Create {
                size: parse_size(size)?,
            },
            path,
        ),
        ["grow", path, size] => (
            Command::Grow {
                size: parse_size(size)?,
            },
            path,
        ),
        ["info", path] => (Command::Info, path),
        ["publish", path] => (Command::Publish, path),
        ["zero", path] => (Command::Zero, path),
        ["unlink", path] => (Command::Unlink, path),
        [] => {
            print_usage();
            return Ok(());
        }
        other => bail!("Unrecognized command: {}", other.join(" ")),
    };
    let path = PathBuf::from(*path);

    let mut options = MmfOptions::builder();
    if let Some(block_size) = block_size {
        options = options.block_size(block_size);
    }
    let mut mmf = MappedFile::with_options(options.build()?);

    match command {
        Command::Create { size } => {
            let created = mmf
                .open_for_write(&path, size, true)
                .wrap_err_with(|| format!("failed to create {:?}", path))?;
            println!(
                "{} {:?}: {} bytes",
                if created { "created" } else { "opened" },
                path,
                mmf.file_size()
            );
            mmf.sync()?;
        }
        Command::Grow { size } => {
            mmf.open_for_write(&path, 0, false)
                .wrap_err_with(|| format!("failed to open {:?}", path))?;
            match mmf
                .ensure_size(size)
                .wrap_err_with(|| format!("failed to grow {:?} to {} bytes", path, size))?
            {
                Growth::Unchanged => println!("unchanged: {} bytes", mmf.file_size()),
                Growth::Grown { from, to } => println!("grew {} -> {} bytes", from, to),
            }
            mmf.sync()?;
        }
        Command::Info => {
            mmf.open_for_read(&path, 0)
                .wrap_err_with(|| format!("failed to open {:?}", path))?;
            let block = mmf.options().block_size();
            let size = mmf.file_size();
            println!("path:        {:?}", path);
            println!("size:        {} bytes", size);
            println!("block size:  {} bytes", block);
            println!("blocks:      {}", size / block);
            println!("aligned:     {}", size >= block && size % block == 0);
            println!("temporary:   {}", path.to_string_lossy().ends_with(TMP_SUFFIX));
        }
        Command::Publish => {
            mmf.open_for_read(&path, 0)
                .wrap_err_with(|| format!("failed to open {:?}", path))?;
            mmf.rename_from_tmp()
                .wrap_err_with(|| format!("failed to publish {:?}", path))?;
            println!("published {:?}", mmf.path().unwrap_or(path.as_path()));
        }
        Command::Zero => {
            mmf.open_for_write(&path, 0, false)
                .wrap_err_with(|| format!("failed to open {:?}", path))?;
            mmf.zero()?;
            mmf.sync()?;
            println!("zeroed {} bytes", mmf.file_size());
        }
        Command::Unlink => {
            mmf.open_for_read(&path, 0)
                .wrap_err_with(|| format!("failed to open {:?}", path))?;
            if let Some(err) = mmf.unlink_and_close() {
                bail!("failed to remove {:?}: {}", path, err);
            }
            println!("removed {:?}", path);
        }
    }

    mmf.close();
    Ok(())
}

fn parse_size(value: &str) -> Result<u64> {
    value
        .parse::<u64>()
        .wrap_err_with(|| format!("invalid size: {}", value))
}

fn print_usage() {
    println!("mmf - Growable memory-mapped file tool");
    println!();
    println!("USAGE:");
    println!("    mmf [OPTIONS] <COMMAND> <PATH> [SIZE]");
    println!();
    println!("COMMANDS:");
    println!("    create <PATH> [SIZE]   Create or extend a file to SIZE rounded to the block size");
    println!("    grow <PATH> <SIZE>     Allocate blocks so the file covers SIZE bytes");
    println!("    info <PATH>            Print size and block alignment");
    println!("    publish <PATH>         Rename PATH_tmp to PATH");
    println!("    zero <PATH>            Overwrite the whole file with zeroes");
    println!("    unlink <PATH>          Remove the file");
    println!();
    println!("OPTIONS:");
    println!("    -b, --block-size <N>   Block size in bytes (default 65536)");
    println!("    -h, --help             Print help information");
    println!("    -v, --version          Print version information");
}
