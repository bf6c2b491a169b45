/* 📖 # Why is the CLI a thin layer over SpliceFile?

Each subcommand opens a handle in the narrowest mode that permits the operation,
performs it and lets the handle close when it goes out of scope. All validation and
error reporting comes from the engine, so the CLI only parses arguments and prints.
Paths are relative to the current directory.

Exit codes:
- 0: Success
- 1: Error (printed to stderr)
*/

use std::env;
use std::io::{self, Write};
use std::process;

use clap::{Parser, Subcommand};
use tracing::debug;

use filesplice_base::tracing::init_tracing;
use filesplice_base::{FilePath, PalHandle, RealPal, SpliceError, SpliceResult};
use filesplice_engine::{
    APPEND, READ, SpliceFile, WRITE, create_file, delete_file, file_properties, load_config,
    rename_file, resize_path, size_of,
};

#[derive(Debug, Parser)]
#[command(name = "filesplice", version, about = "Insert and cut byte ranges inside files")]
struct Cli {
    /// Config file controlling the tail cache
    #[arg(long, default_value = "filesplice.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create an empty file
    Create { path: String },
    /// Delete a file
    Delete { path: String },
    /// Rename a file
    Rename { from: String, to: String },
    /// Print the size of a file in bytes
    Size { path: String },
    /// Print existence and permissions of a path
    Props { path: String },
    /// Write a byte range to stdout
    Read {
        path: String,
        offset: u64,
        length: u64,
    },
    /// Overwrite bytes at an offset
    Write {
        path: String,
        offset: u64,
        data: String,
    },
    /// Append bytes at the end of a file
    Append { path: String, data: String },
    /// Insert bytes at an offset, shifting the rest of the file back
    Insert {
        path: String,
        offset: u64,
        data: String,
    },
    /// Remove bytes at an offset, shifting the rest of the file forward
    Cut {
        path: String,
        offset: u64,
        length: u64,
    },
    /// Shrink or zero-extend a file
    Resize { path: String, size: u64 },
}

fn stdout_error(e: io::Error) -> Box<SpliceError> {
    Box::new(SpliceError::io("<stdout>", e))
}

fn run(cli: Cli, pal: &PalHandle, out: &mut dyn Write) -> SpliceResult<()> {
    let config = load_config(pal, &FilePath::from(cli.config.as_str()))?;
    let policy = config.cache_policy(pal);
    debug!(?policy, "cache policy");

    match cli.command {
        Command::Create { path } => create_file(pal, &FilePath::from(path)),
        Command::Delete { path } => delete_file(pal, &FilePath::from(path)),
        Command::Rename { from, to } => {
            rename_file(pal, &FilePath::from(from), &FilePath::from(to))
        }
        Command::Size { path } => {
            let size = size_of(pal, &FilePath::from(path))?;
            writeln!(out, "{}", size).map_err(stdout_error)
        }
        Command::Props { path } => {
            let props = file_properties(pal, &FilePath::from(path))?;
            writeln!(
                out,
                "exists={} readable={} writable={} executable={}",
                props.exists, props.readable, props.writable, props.executable
            )
            .map_err(stdout_error)
        }
        Command::Read {
            path,
            offset,
            length,
        } => {
            let mut file = SpliceFile::open_with(pal.clone(), FilePath::from(path), READ)?;
            let data = file.read(offset, length)?;
            out.write_all(&data).map_err(stdout_error)
        }
        Command::Write { path, offset, data } => {
            SpliceFile::open_with(pal.clone(), FilePath::from(path), WRITE)?
                .write(offset, data.as_bytes())
        }
        Command::Append { path, data } => {
            SpliceFile::open_with(pal.clone(), FilePath::from(path), APPEND)?
                .append(data.as_bytes())
        }
        Command::Insert { path, offset, data } => {
            SpliceFile::open_with(pal.clone(), FilePath::from(path), READ | WRITE)?
                .insert(data.as_bytes(), offset, &policy)
        }
        Command::Cut {
            path,
            offset,
            length,
        } => SpliceFile::open_with(pal.clone(), FilePath::from(path), READ | WRITE)?
            .cut(length, offset, &policy),
        Command::Resize { path, size } => resize_path(pal, &FilePath::from(path), size),
    }
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = init_tracing() {
        eprintln!("Warning: {}", e);
    }

    let current_dir = env::current_dir().unwrap_or_else(|e| {
        eprintln!("Error: Failed to get current directory: {}", e);
        process::exit(1);
    });
    let pal = PalHandle::new(RealPal::new(current_dir));

    let mut stdout = io::stdout().lock();
    if let Err(e) = run(cli, &pal, &mut stdout) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filesplice_base::{ErrorKind, MockPal};

    fn run_args(mock: &MockPal, args: &[&str]) -> SpliceResult<String> {
        let cli = Cli::try_parse_from(std::iter::once("filesplice").chain(args.iter().copied()))
            .expect("arguments should parse");
        let pal = PalHandle::new(mock.clone());
        let mut out = Vec::new();
        run(cli, &pal, &mut out)?;
        Ok(String::from_utf8(out).expect("output should be UTF-8"))
    }

    fn contents(mock: &MockPal, path: &str) -> Vec<u8> {
        mock.file_contents(&FilePath::from(path)).unwrap()
    }

    #[test]
    fn test_insert_and_cut() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("data.bin"), b"0123456789".to_vec());

        run_args(&mock, &["insert", "data.bin", "3", "XY"]).unwrap();
        assert_eq!(contents(&mock, "data.bin"), b"012XY3456789");

        run_args(&mock, &["cut", "data.bin", "3", "2"]).unwrap();
        assert_eq!(contents(&mock, "data.bin"), b"0123456789");
    }

    #[test]
    fn test_insert_with_disk_cache_config() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("data.bin"), b"0123456789".to_vec());
        mock.add_file(
            FilePath::from("splice.toml"),
            b"[cache]\ndisk_cache_path = \"tail.cache\"\nmax_ram_cache_size = 2\n".to_vec(),
        );

        run_args(
            &mock,
            &["--config", "splice.toml", "insert", "data.bin", "5", "ab"],
        )
        .unwrap();

        assert_eq!(contents(&mock, "data.bin"), b"01234ab56789");
        assert!(mock.file_contents(&FilePath::from("tail.cache")).is_none());
    }

    #[test]
    fn test_read_size_and_props() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("data.bin"), b"0123456789".to_vec());

        assert_eq!(run_args(&mock, &["read", "data.bin", "2", "3"]).unwrap(), "234");
        assert_eq!(run_args(&mock, &["size", "data.bin"]).unwrap(), "10\n");
        assert_eq!(
            run_args(&mock, &["props", "data.bin"]).unwrap(),
            "exists=true readable=true writable=true executable=false\n"
        );
    }

    #[test]
    fn test_file_lifecycle() {
        let mock = MockPal::new();

        run_args(&mock, &["create", "log.txt"]).unwrap();
        run_args(&mock, &["append", "log.txt", "hello"]).unwrap();
        run_args(&mock, &["write", "log.txt", "0", "J"]).unwrap();
        run_args(&mock, &["resize", "log.txt", "3"]).unwrap();
        assert_eq!(contents(&mock, "log.txt"), b"Jel");

        run_args(&mock, &["rename", "log.txt", "old.txt"]).unwrap();
        run_args(&mock, &["delete", "old.txt"]).unwrap();
        assert_eq!(mock.file_count(), 0);
    }

    #[test]
    fn test_errors_are_reported() {
        let mock = MockPal::new();
        mock.add_file(FilePath::from("data.bin"), b"0123".to_vec());

        let err = run_args(&mock, &["cut", "data.bin", "3", "5"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidRange { .. }));

        let err = run_args(&mock, &["create", "data.bin"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyExists { .. }));

        let err = run_args(&mock, &["size", "missing.bin"]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
    }
}
