use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::PathBuf;

use tracing::{debug, instrument};

use crate::{ErrorKind, SpliceError, SpliceResult};

use super::FilePath;
use super::traits::{FileAccess, FileProperties, Pal, RawFileAccessor, check_range};

/* 📖 # Why use std::fs instead of platform specific APIs?

std::fs already unifies the POSIX and Windows primitives the splice engine needs:
positioned reads and writes go through Seek, and truncation through File::set_len.
One implementation therefore serves every platform, and only the executable bit
probe needs a cfg switch.
*/

/// Concrete PAL implementation using the real filesystem via std::fs.
///
/// All file paths are resolved relative to a configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        path.resolve(&self.base_dir)
    }
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata, _path: &std::path::Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata, path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            ["exe", "bat", "cmd", "com"]
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_properties(&self, path: &FilePath) -> SpliceResult<FileProperties> {
        let resolved = self.resolve_path(path);
        let metadata = match fs::metadata(&resolved) {
            Ok(metadata) if metadata.is_file() => metadata,
            Ok(_) => {
                debug!("path is not a regular file");
                return Ok(FileProperties::default());
            }
            Err(e) => {
                debug!(error = %e, "path not accessible");
                return Ok(FileProperties::default());
            }
        };
        let properties = FileProperties {
            exists: true,
            readable: fs::File::open(&resolved).is_ok(),
            writable: !metadata.permissions().readonly(),
            executable: is_executable(&metadata, &resolved),
        };
        debug!(?properties, "probed file properties");
        Ok(properties)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_file(&self, path: &FilePath) -> SpliceResult<()> {
        let resolved = self.resolve_path(path);
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&resolved)
            .map_err(|e| {
                debug!(error = %e, "failed to create file");
                Box::new(SpliceError::io(&resolved, e))
            })?;
        debug!("file created");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    fn open_file(
        &self,
        path: &FilePath,
        access: FileAccess,
    ) -> SpliceResult<Box<dyn RawFileAccessor>> {
        let resolved = self.resolve_path(path);
        let mut options = fs::OpenOptions::new();
        match access {
            FileAccess::Read => options.read(true),
            FileAccess::Write | FileAccess::ReadWrite => options.read(true).write(true),
            FileAccess::Append => options.append(true),
        };
        let file = options.open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            Box::new(SpliceError::io(&resolved, e))
        })?;
        debug!(?access, "file opened");
        Ok(Box::new(RealFile {
            path: resolved,
            file,
        }))
    }

    #[instrument(skip(self), fields(from = %from, to = %to))]
    fn rename_file(&self, from: &FilePath, to: &FilePath) -> SpliceResult<()> {
        let from_resolved = self.resolve_path(from);
        let to_resolved = self.resolve_path(to);
        if !from_resolved.exists() {
            return Err(ErrorKind::NotFound {
                path: from_resolved,
            }
            .into());
        }
        if to_resolved.exists() {
            return Err(ErrorKind::AlreadyExists { path: to_resolved }.into());
        }
        fs::rename(&from_resolved, &to_resolved).map_err(|e| {
            debug!(error = %e, "failed to rename file");
            Box::new(SpliceError::io(&from_resolved, e))
        })?;
        debug!("file renamed");
        Ok(())
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove_file(&self, path: &FilePath) -> SpliceResult<()> {
        let resolved = self.resolve_path(path);
        fs::remove_file(&resolved).map_err(|e| {
            debug!(error = %e, "failed to remove file");
            Box::new(SpliceError::io(&resolved, e))
        })?;
        debug!("file removed");
        Ok(())
    }
}

/// An open OS file.
#[derive(Debug)]
struct RealFile {
    path: PathBuf,
    file: fs::File,
}

impl RealFile {
    fn io_error(&self, e: std::io::Error) -> Box<SpliceError> {
        Box::new(SpliceError::new(ErrorKind::IoFailure {
            path: self.path.clone(),
            source: e,
        }))
    }
}

impl RawFileAccessor for RealFile {
    fn size(&mut self) -> SpliceResult<u64> {
        let metadata = self.file.metadata().map_err(|e| self.io_error(e))?;
        Ok(metadata.len())
    }

    fn read_range(&mut self, offset: u64, length: u64) -> SpliceResult<Vec<u8>> {
        let size = self.size()?;
        check_range(offset, length, size)?;
        let length = usize::try_from(length)
            .map_err(|_| crate::err!("Read of {} bytes does not fit in memory", length))?;
        let mut buffer = vec![0u8; length];
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.io_error(e))?;
        self.file
            .read_exact(&mut buffer)
            .map_err(|e| self.io_error(e))?;
        Ok(buffer)
    }

    fn write_range(&mut self, offset: u64, data: &[u8]) -> SpliceResult<()> {
        self.file
            .seek(SeekFrom::Start(offset))
            .map_err(|e| self.io_error(e))?;
        self.file.write_all(data).map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn truncate(&mut self, new_size: u64) -> SpliceResult<()> {
        self.file.set_len(new_size).map_err(|e| self.io_error(e))
    }
}
