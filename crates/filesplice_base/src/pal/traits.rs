use std::sync::Arc;

use crate::{ErrorKind, SpliceError, SpliceResult};

use super::file_path::FilePath;

/// Access mode a raw file is opened with.
///
/// `Write` opens the OS file for reading as well, since shifting a tail needs to read it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileAccess {
    Read,
    Write,
    ReadWrite,
    Append,
}

/// Properties of a file as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FileProperties {
    /// The path exists and is a regular file
    pub exists: bool,
    /// Read access to the file is granted
    pub readable: bool,
    /// Write access to the file is granted
    pub writable: bool,
    /// The file can be executed
    pub executable: bool,
}

/* 📖 # Why are the raw file primitives a separate trait?

The splice engine only ever needs four operations on an open file: size, range read,
range write and truncate. Keeping those in RawFileAccessor (instead of handing out
std::fs::File) lets the algorithms be written once and run against real files,
in-memory MockPal files and the fault-injecting doubles used in tests.
*/

/// The four primitives of an open file.
pub trait RawFileAccessor: std::fmt::Debug + Send {
    /// Current size of the file in bytes.
    fn size(&mut self) -> SpliceResult<u64>;

    /// Read exactly `length` bytes starting at `offset`.
    ///
    /// Fails with `InvalidRange` if the range extends beyond the end of the file.
    fn read_range(&mut self, offset: u64, length: u64) -> SpliceResult<Vec<u8>>;

    /// Write `data` at `offset`, extending the file if the write runs past its end.
    fn write_range(&mut self, offset: u64, data: &[u8]) -> SpliceResult<()>;

    /// Set the file size to `new_size`, discarding or zero-filling as needed.
    fn truncate(&mut self, new_size: u64) -> SpliceResult<()>;
}

/// Platform Abstraction Layer (PAL) trait providing path level file operations.
///
/// Two implementations are provided:
/// - `RealPal`: Uses the real filesystem via `std::fs`
/// - `MockPal`: In-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Query existence and permissions of a path. Never fails for a missing path.
    fn file_properties(&self, path: &FilePath) -> SpliceResult<FileProperties>;

    /// Create a new empty file. Fails with `AlreadyExists` if the path exists.
    fn create_file(&self, path: &FilePath) -> SpliceResult<()>;

    /// Open an existing file. Fails with `NotFound` if the path does not exist.
    fn open_file(
        &self,
        path: &FilePath,
        access: FileAccess,
    ) -> SpliceResult<Box<dyn RawFileAccessor>>;

    /// Rename a file. Fails with `NotFound` if `from` is missing and with
    /// `AlreadyExists` if `to` is already taken.
    fn rename_file(&self, from: &FilePath, to: &FilePath) -> SpliceResult<()>;

    /// Delete a file. Fails with `NotFound` if the path does not exist.
    fn remove_file(&self, path: &FilePath) -> SpliceResult<()>;

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> SpliceResult<String> {
        let mut file = self.open_file(path, FileAccess::Read)?;
        let size = file.size()?;
        let contents = file.read_range(0, size)?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }
}

/// Checks that `offset..offset + length` lies within a file of `size` bytes.
pub fn check_range(offset: u64, length: u64, size: u64) -> SpliceResult<()> {
    match offset.checked_add(length) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Box::new(SpliceError::new(ErrorKind::InvalidRange {
            offset,
            length,
            size,
        }))),
    }
}

/// Handle to a PAL implementation, enabling shared ownership.
///
/// Internally wraps `Arc<dyn Pal>` for cheap cloning and thread-safe sharing.
///
/// ```no_run
/// use filesplice_base::{PalHandle, RealPal};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let for_cache = pal.clone();
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    /// Create a new PalHandle from a Pal implementation.
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_within_file() {
        assert!(check_range(0, 10, 10).is_ok());
        assert!(check_range(10, 0, 10).is_ok());
        assert!(check_range(3, 4, 10).is_ok());
    }

    #[test]
    fn test_check_range_past_end() {
        let err = check_range(8, 3, 10).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidRange {
                offset: 8,
                length: 3,
                size: 10
            }
        ));
    }

    #[test]
    fn test_check_range_overflow() {
        assert!(check_range(u64::MAX, 2, 10).is_err());
    }

    #[test]
    fn test_file_properties_default_is_missing() {
        let props = FileProperties::default();
        assert!(!props.exists);
        assert!(!props.readable);
    }
}
