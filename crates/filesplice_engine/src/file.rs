/* 📖 # Why does the handle carry an explicit state enum?

A handle is either closed or open in exactly one access mode, and every operation
depends on which. HandleState makes that a single value: each open variant owns the
raw accessor, so an operation that pattern-matches its way to the accessor has also
proven the mode permits it. There are no separate "is open" flags to keep in sync,
and closing is simply dropping the accessor.

Closed remembers whether the handle was ever open, so a read on a fresh handle
reports NotFound while a read after close reports AlreadyClosed.
*/

use filesplice_base::{
    ErrorKind, FileAccess, FilePath, FileProperties, PalHandle, RawFileAccessor, SpliceResult,
};
use tracing::{debug, instrument};

use crate::cache::CachePolicy;
use crate::splice;

/// Open for reading.
pub const READ: u8 = 0x01;
/// Open for writing.
pub const WRITE: u8 = 0x02;
/// Open for appending.
pub const APPEND: u8 = 0x04;

/// Translate open mode bits into an access mode.
///
/// `READ`, `WRITE`, `READ | WRITE` and `APPEND` are valid; every other value fails
/// with `InvalidOption`.
pub fn parse_open_mode(mode: u8) -> SpliceResult<FileAccess> {
    match mode {
        READ => Ok(FileAccess::Read),
        WRITE => Ok(FileAccess::Write),
        m if m == READ | WRITE => Ok(FileAccess::ReadWrite),
        APPEND => Ok(FileAccess::Append),
        _ => Err(ErrorKind::InvalidOption { mode }.into()),
    }
}

#[derive(Debug)]
enum HandleState {
    Closed { was_open: bool },
    OpenRead(Box<dyn RawFileAccessor>),
    OpenWrite(Box<dyn RawFileAccessor>),
    OpenReadWrite(Box<dyn RawFileAccessor>),
    OpenAppend(Box<dyn RawFileAccessor>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Size,
    Read,
    Write,
    Append,
    Resize,
    Insert,
    Cut,
}

impl Operation {
    fn name(self) -> &'static str {
        match self {
            Operation::Size => "size",
            Operation::Read => "read",
            Operation::Write => "write",
            Operation::Append => "append",
            Operation::Resize => "resize",
            Operation::Insert => "insert",
            Operation::Cut => "cut",
        }
    }
}

/// A handle on a single file, opened in one access mode at a time.
///
/// ```
/// use filesplice_base::{FilePath, MockPal, PalHandle};
/// use filesplice_engine::{CachePolicy, READ, SpliceFile, WRITE};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("data.bin"), b"0123456789".to_vec());
///
/// let mut file = SpliceFile::open_with(PalHandle::new(mock), FilePath::from("data.bin"), READ | WRITE).unwrap();
/// file.insert(b"XY", 3, &CachePolicy::Memory).unwrap();
/// assert_eq!(file.read(0, 12).unwrap(), b"012XY3456789");
/// ```
#[derive(Debug)]
pub struct SpliceFile {
    pal: PalHandle,
    path: FilePath,
    state: HandleState,
}

impl SpliceFile {
    /// A handle on `path` that has not been opened yet.
    pub fn new(pal: PalHandle, path: FilePath) -> Self {
        Self {
            pal,
            path,
            state: HandleState::Closed { was_open: false },
        }
    }

    /// Construct a handle and open it with `mode` in one step.
    pub fn open_with(pal: PalHandle, path: FilePath, mode: u8) -> SpliceResult<Self> {
        let mut file = Self::new(pal, path);
        file.open(mode)?;
        Ok(file)
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    /// Access mode of the handle, or `None` when closed.
    pub fn access(&self) -> Option<FileAccess> {
        match self.state {
            HandleState::Closed { .. } => None,
            HandleState::OpenRead(_) => Some(FileAccess::Read),
            HandleState::OpenWrite(_) => Some(FileAccess::Write),
            HandleState::OpenReadWrite(_) => Some(FileAccess::ReadWrite),
            HandleState::OpenAppend(_) => Some(FileAccess::Append),
        }
    }

    pub fn is_open(&self) -> bool {
        self.access().is_some()
    }

    /// Create the file at this handle's path. Fails with `AlreadyExists`.
    pub fn create(&self) -> SpliceResult<()> {
        create_file(&self.pal, &self.path)
    }

    /// Open the file with the given mode bits.
    #[instrument(skip(self), fields(path = %self.path))]
    pub fn open(&mut self, mode: u8) -> SpliceResult<()> {
        let access = parse_open_mode(mode)?;
        if self.is_open() {
            return Err(ErrorKind::AlreadyOpen {
                path: self.path.as_path().to_path_buf(),
            }
            .into());
        }
        let raw = self.pal.open_file(&self.path, access)?;
        self.state = match access {
            FileAccess::Read => HandleState::OpenRead(raw),
            FileAccess::Write => HandleState::OpenWrite(raw),
            FileAccess::ReadWrite => HandleState::OpenReadWrite(raw),
            FileAccess::Append => HandleState::OpenAppend(raw),
        };
        debug!(?access, "file opened");
        Ok(())
    }

    /// Close the handle. Closing an already closed handle does nothing.
    #[instrument(skip(self), fields(path = %self.path))]
    pub fn close(&mut self) -> SpliceResult<()> {
        match self.state {
            HandleState::Closed { .. } => debug!("handle already closed"),
            _ => {
                self.state = HandleState::Closed { was_open: true };
                debug!("file closed");
            }
        }
        Ok(())
    }

    /// Existence and permission probe of this handle's path.
    pub fn properties(&self) -> SpliceResult<FileProperties> {
        file_properties(&self.pal, &self.path)
    }

    fn accessor(&mut self, operation: Operation) -> SpliceResult<&mut dyn RawFileAccessor> {
        use Operation::*;
        match (&mut self.state, operation) {
            (HandleState::Closed { was_open: false }, _) => Err(ErrorKind::NotFound {
                path: self.path.as_path().to_path_buf(),
            }
            .into()),
            (HandleState::Closed { was_open: true }, _) => Err(ErrorKind::AlreadyClosed {
                path: self.path.as_path().to_path_buf(),
            }
            .into()),
            (HandleState::OpenReadWrite(raw), _)
            | (HandleState::OpenRead(raw), Size | Read)
            | (HandleState::OpenWrite(raw), Size | Write | Append | Resize | Insert | Cut)
            | (HandleState::OpenAppend(raw), Size | Append) => Ok(&mut **raw),
            _ => Err(ErrorKind::NotOpen {
                path: self.path.as_path().to_path_buf(),
                operation: operation.name(),
            }
            .into()),
        }
    }

    /// Size of the open file in bytes.
    pub fn size(&mut self) -> SpliceResult<u64> {
        self.accessor(Operation::Size)?.size()
    }

    /// Read exactly `length` bytes at `offset`. Never returns a partial range.
    pub fn read(&mut self, offset: u64, length: u64) -> SpliceResult<Vec<u8>> {
        self.accessor(Operation::Read)?.read_range(offset, length)
    }

    /// Overwrite bytes at `offset`, extending the file if the data runs past its end.
    ///
    /// Fails with `InvalidOffset` if `offset` lies beyond the end of the file.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> SpliceResult<()> {
        let raw = self.accessor(Operation::Write)?;
        let size = raw.size()?;
        if offset > size {
            return Err(ErrorKind::InvalidOffset { offset, size }.into());
        }
        raw.write_range(offset, data)
    }

    /// Append data at the end of the file.
    pub fn append(&mut self, data: &[u8]) -> SpliceResult<()> {
        let raw = self.accessor(Operation::Append)?;
        let size = raw.size()?;
        raw.write_range(size, data)
    }

    /// Shrink or zero-extend the file to `new_size` bytes.
    pub fn resize(&mut self, new_size: u64) -> SpliceResult<()> {
        self.accessor(Operation::Resize)?.truncate(new_size)
    }

    /// Insert `data` at `offset`, shifting the rest of the file back.
    #[instrument(skip(self, data, policy), fields(path = %self.path, length = data.len()))]
    pub fn insert(&mut self, data: &[u8], offset: u64, policy: &CachePolicy) -> SpliceResult<()> {
        splice::insert(self.accessor(Operation::Insert)?, data, offset, policy)
    }

    /// Remove `length` bytes at `offset`, shifting the rest of the file forward.
    #[instrument(skip(self, policy), fields(path = %self.path))]
    pub fn cut(&mut self, length: u64, offset: u64, policy: &CachePolicy) -> SpliceResult<()> {
        splice::cut(self.accessor(Operation::Cut)?, length, offset, policy)
    }

    /// Rename the file. The handle keeps referring to it under the new name.
    pub fn rename(&mut self, new_path: FilePath) -> SpliceResult<()> {
        rename_file(&self.pal, &self.path, &new_path)?;
        self.path = new_path;
        Ok(())
    }

    /// Close the handle if open, then delete the file.
    pub fn delete(&mut self) -> SpliceResult<()> {
        self.close()?;
        delete_file(&self.pal, &self.path)
    }
}

/// Create an empty file. Fails with `AlreadyExists` if the path exists.
#[instrument(skip(pal), fields(path = %path))]
pub fn create_file(pal: &PalHandle, path: &FilePath) -> SpliceResult<()> {
    pal.create_file(path)
}

/// Existence and permission probe of a path, without opening it.
pub fn file_properties(pal: &PalHandle, path: &FilePath) -> SpliceResult<FileProperties> {
    pal.file_properties(path)
}

/// Size of the file at `path`.
pub fn size_of(pal: &PalHandle, path: &FilePath) -> SpliceResult<u64> {
    pal.open_file(path, FileAccess::Read)?.size()
}

/// Shrink or zero-extend the file at `path` to `new_size` bytes.
#[instrument(skip(pal), fields(path = %path))]
pub fn resize_path(pal: &PalHandle, path: &FilePath, new_size: u64) -> SpliceResult<()> {
    pal.open_file(path, FileAccess::Write)?.truncate(new_size)
}

/// Rename a file. Fails with `NotFound` or `AlreadyExists`.
#[instrument(skip(pal), fields(from = %from, to = %to))]
pub fn rename_file(pal: &PalHandle, from: &FilePath, to: &FilePath) -> SpliceResult<()> {
    pal.rename_file(from, to)
}

/// Delete a file. Fails with `NotFound`.
#[instrument(skip(pal), fields(path = %path))]
pub fn delete_file(pal: &PalHandle, path: &FilePath) -> SpliceResult<()> {
    pal.remove_file(path)
}
