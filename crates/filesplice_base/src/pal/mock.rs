use std::collections::HashMap;
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ErrorKind, SpliceError, SpliceResult};

use super::FilePath;
use super::traits::{FileAccess, FileProperties, Pal, RawFileAccessor, check_range};

/* 📖 # Why do MockPal entries share their contents through an Arc?

An open MockFile holds the same Arc as the directory entry, the way an OS file descriptor
refers to an inode rather than to a name. Renaming an entry therefore keeps open handles
pointing at the renamed file, and removing an entry leaves open handles usable until they
are dropped. Both mirror what RealPal does on POSIX systems, so tests written against
MockPal keep their meaning on the real filesystem.
*/

type SharedBytes = Arc<Mutex<Vec<u8>>>;

#[derive(Debug)]
struct MockEntry {
    data: SharedBytes,
    readonly: bool,
    executable: bool,
}

/// In-memory PAL implementation for testing.
///
/// ```
/// use filesplice_base::{FileAccess, FilePath, MockPal, Pal};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("data.bin"), b"0123456789".to_vec());
/// let mut file = mock.open_file(&FilePath::from("data.bin"), FileAccess::Read).unwrap();
/// assert_eq!(file.read_range(3, 2).unwrap(), b"34");
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, MockEntry>>>,
}

impl MockPal {
    /// Create a new empty MockPal.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file to the mock storage, replacing any existing entry.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.files.lock().insert(
            path,
            MockEntry {
                data: Arc::new(Mutex::new(content)),
                readonly: false,
                executable: false,
            },
        );
    }

    /// Current contents of a file, if it exists.
    pub fn file_contents(&self, path: &FilePath) -> Option<Vec<u8>> {
        self.files
            .lock()
            .get(path)
            .map(|entry| entry.data.lock().clone())
    }

    /// Mark a file read-only; opening it for writing then fails.
    pub fn set_readonly(&self, path: &FilePath, readonly: bool) {
        if let Some(entry) = self.files.lock().get_mut(path) {
            entry.readonly = readonly;
        }
    }

    pub fn set_executable(&self, path: &FilePath, executable: bool) {
        if let Some(entry) = self.files.lock().get_mut(path) {
            entry.executable = executable;
        }
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.files.lock().len()
    }
}

impl Pal for MockPal {
    fn file_properties(&self, path: &FilePath) -> SpliceResult<FileProperties> {
        let files = self.files.lock();
        Ok(match files.get(path) {
            Some(entry) => FileProperties {
                exists: true,
                readable: true,
                writable: !entry.readonly,
                executable: entry.executable,
            },
            None => FileProperties::default(),
        })
    }

    fn create_file(&self, path: &FilePath) -> SpliceResult<()> {
        let mut files = self.files.lock();
        if files.contains_key(path) {
            return Err(ErrorKind::AlreadyExists {
                path: path.as_path().to_path_buf(),
            }
            .into());
        }
        files.insert(
            path.clone(),
            MockEntry {
                data: Arc::new(Mutex::new(Vec::new())),
                readonly: false,
                executable: false,
            },
        );
        Ok(())
    }

    fn open_file(
        &self,
        path: &FilePath,
        access: FileAccess,
    ) -> SpliceResult<Box<dyn RawFileAccessor>> {
        let files = self.files.lock();
        let entry = files.get(path).ok_or_else(|| ErrorKind::NotFound {
            path: path.as_path().to_path_buf(),
        })?;
        if entry.readonly && access != FileAccess::Read {
            return Err(Box::new(SpliceError::io(
                path.as_path(),
                io::Error::new(io::ErrorKind::PermissionDenied, "file is read-only"),
            )));
        }
        Ok(Box::new(MockFile {
            path: path.clone(),
            data: Arc::clone(&entry.data),
            access,
        }))
    }

    fn rename_file(&self, from: &FilePath, to: &FilePath) -> SpliceResult<()> {
        let mut files = self.files.lock();
        if files.contains_key(to) {
            return Err(ErrorKind::AlreadyExists {
                path: to.as_path().to_path_buf(),
            }
            .into());
        }
        let entry = files.remove(from).ok_or_else(|| ErrorKind::NotFound {
            path: from.as_path().to_path_buf(),
        })?;
        files.insert(to.clone(), entry);
        Ok(())
    }

    fn remove_file(&self, path: &FilePath) -> SpliceResult<()> {
        self.files
            .lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| {
                ErrorKind::NotFound {
                    path: path.as_path().to_path_buf(),
                }
                .into()
            })
    }
}

/// An open in-memory file. Enforces its access mode the way the OS would.
#[derive(Debug)]
struct MockFile {
    path: FilePath,
    data: SharedBytes,
    access: FileAccess,
}

impl MockFile {
    fn denied(&self, operation: &str) -> Box<SpliceError> {
        Box::new(SpliceError::io(
            self.path.as_path(),
            io::Error::new(
                io::ErrorKind::PermissionDenied,
                format!("{} not permitted with {:?} access", operation, self.access),
            ),
        ))
    }
}

impl RawFileAccessor for MockFile {
    fn size(&mut self) -> SpliceResult<u64> {
        Ok(self.data.lock().len() as u64)
    }

    fn read_range(&mut self, offset: u64, length: u64) -> SpliceResult<Vec<u8>> {
        if self.access == FileAccess::Append {
            return Err(self.denied("read"));
        }
        let data = self.data.lock();
        check_range(offset, length, data.len() as u64)?;
        Ok(data[offset as usize..(offset + length) as usize].to_vec())
    }

    fn write_range(&mut self, offset: u64, bytes: &[u8]) -> SpliceResult<()> {
        let mut data = self.data.lock();
        let offset = match self.access {
            FileAccess::Read => return Err(self.denied("write")),
            FileAccess::Append => data.len(),
            FileAccess::Write | FileAccess::ReadWrite => offset as usize,
        };
        let end = offset + bytes.len();
        if end > data.len() {
            data.resize(end, 0);
        }
        data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> SpliceResult<()> {
        match self.access {
            FileAccess::Write | FileAccess::ReadWrite => {
                self.data.lock().resize(new_size as usize, 0);
                Ok(())
            }
            FileAccess::Read | FileAccess::Append => Err(self.denied("truncate")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_with(path: &str, content: &[u8]) -> MockPal {
        let pal = MockPal::new();
        pal.add_file(FilePath::from(path), content.to_vec());
        pal
    }

    #[test]
    fn test_properties() {
        let pal = mock_with("data.bin", b"x");
        let path = FilePath::from("data.bin");
        pal.set_executable(&path, true);

        let props = pal.file_properties(&path).unwrap();
        assert_eq!(
            props,
            FileProperties {
                exists: true,
                readable: true,
                writable: true,
                executable: true,
            }
        );
        assert!(!pal.file_properties(&FilePath::from("nope")).unwrap().exists);
    }

    #[test]
    fn test_create_file_conflict() {
        let pal = mock_with("data.bin", b"x");

        let err = pal.create_file(&FilePath::from("data.bin")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::AlreadyExists { .. }));

        pal.create_file(&FilePath::from("fresh.bin")).unwrap();
        assert_eq!(
            pal.file_contents(&FilePath::from("fresh.bin")),
            Some(Vec::new())
        );
    }

    #[test]
    fn test_write_extends_and_truncate_shrinks() {
        let pal = mock_with("data.bin", b"0123");
        let path = FilePath::from("data.bin");
        let mut file = pal.open_file(&path, FileAccess::ReadWrite).unwrap();

        file.write_range(2, b"abcd").unwrap();
        assert_eq!(pal.file_contents(&path).unwrap(), b"01abcd");

        file.truncate(3).unwrap();
        assert_eq!(pal.file_contents(&path).unwrap(), b"01a");
    }

    #[test]
    fn test_read_access_rejects_writes() {
        let pal = mock_with("data.bin", b"0123");
        let mut file = pal
            .open_file(&FilePath::from("data.bin"), FileAccess::Read)
            .unwrap();

        let err = file.write_range(0, b"x").unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IoFailure { .. }));
        assert!(file.truncate(0).is_err());
    }

    #[test]
    fn test_append_access_ignores_offset() {
        let pal = mock_with("log.txt", b"one;");
        let path = FilePath::from("log.txt");
        let mut file = pal.open_file(&path, FileAccess::Append).unwrap();

        file.write_range(0, b"two;").unwrap();
        assert_eq!(pal.file_contents(&path).unwrap(), b"one;two;");
        assert!(file.read_range(0, 1).is_err());
    }

    #[test]
    fn test_readonly_rejects_write_open() {
        let pal = mock_with("data.bin", b"x");
        let path = FilePath::from("data.bin");
        pal.set_readonly(&path, true);

        assert!(pal.open_file(&path, FileAccess::Read).is_ok());
        let err = pal.open_file(&path, FileAccess::Write).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::IoFailure { .. }));
        assert!(!pal.file_properties(&path).unwrap().writable);
    }

    #[test]
    fn test_open_handle_follows_rename() {
        let pal = mock_with("old.bin", b"abc");
        let mut file = pal
            .open_file(&FilePath::from("old.bin"), FileAccess::ReadWrite)
            .unwrap();

        pal.rename_file(&FilePath::from("old.bin"), &FilePath::from("new.bin"))
            .unwrap();
        file.write_range(3, b"d").unwrap();

        assert_eq!(pal.file_contents(&FilePath::from("old.bin")), None);
        assert_eq!(
            pal.file_contents(&FilePath::from("new.bin")).unwrap(),
            b"abcd"
        );
    }

    #[test]
    fn test_remove_missing() {
        let pal = MockPal::new();
        let err = pal.remove_file(&FilePath::from("nope")).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::NotFound { .. }));
        assert_eq!(pal.file_count(), 0);
    }
}
