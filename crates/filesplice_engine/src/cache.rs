/* 📖 # Why offer a disk cache next to the in-memory path?

Shifting a tail means holding it somewhere while the bytes in front of it change.
The in-memory policy reads the whole tail into one buffer, which is simple and fast
but needs as much RAM as the tail is long. The disk policy spills the tail into a
cache file one chunk at a time and copies it back the same way, so memory use stays
at one chunk no matter how large the file is.
*/

use filesplice_base::{FileAccess, FilePath, PalHandle, RawFileAccessor, ResultExt, SpliceResult};
use tracing::{debug, warn};

/// Default chunk bound for the disk cache: 250 MiB.
pub const DEFAULT_MAX_RAM_CACHE_SIZE: u64 = 250 * 1024 * 1024;

/// Where `insert` and `cut` keep the tail while it is shifted.
#[derive(Debug, Clone, Default)]
pub enum CachePolicy {
    /// Hold the whole tail in one buffer.
    #[default]
    Memory,
    /// Stream the tail through a cache file in bounded chunks.
    Disk(DiskCache),
}

/// Location and chunk bound of a disk-backed tail cache.
#[derive(Debug, Clone)]
pub struct DiskCache {
    pal: PalHandle,
    path: FilePath,
    max_ram_cache_size: u64,
}

impl DiskCache {
    /// Cache file at `path` (which must not exist yet), moving at most
    /// `max_ram_cache_size` bytes through memory at a time.
    pub fn new(pal: PalHandle, path: FilePath, max_ram_cache_size: u64) -> Self {
        Self {
            pal,
            path,
            max_ram_cache_size: max_ram_cache_size.max(1),
        }
    }

    pub fn path(&self) -> &FilePath {
        &self.path
    }

    pub fn max_ram_cache_size(&self) -> u64 {
        self.max_ram_cache_size
    }

    /// Create the cache file. It is removed again when the returned guard is released or dropped.
    pub(crate) fn open(&self) -> SpliceResult<CacheFile<'_>> {
        self.pal
            .create_file(&self.path)
            .with_context(|| format!("Failed to create cache file {}", self.path))?;
        let mut guard = CacheFile {
            cache: self,
            raw: None,
            released: false,
        };
        guard.raw = Some(
            self.pal
                .open_file(&self.path, FileAccess::ReadWrite)
                .with_context(|| format!("Failed to open cache file {}", self.path))?,
        );
        debug!(path = %self.path, "cache file created");
        Ok(guard)
    }
}

/// `(offset, length)` of each chunk of a `length` byte region.
fn chunks(length: u64, chunk_size: u64) -> impl Iterator<Item = (u64, u64)> {
    let step = usize::try_from(chunk_size).unwrap_or(usize::MAX);
    (0..length)
        .step_by(step)
        .map(move |offset| (offset, chunk_size.min(length - offset)))
}

/// An open cache file owned by a single splice operation.
pub(crate) struct CacheFile<'a> {
    cache: &'a DiskCache,
    raw: Option<Box<dyn RawFileAccessor>>,
    released: bool,
}

impl CacheFile<'_> {
    fn raw(&mut self) -> SpliceResult<&mut dyn RawFileAccessor> {
        match self.raw.as_mut() {
            Some(raw) => Ok(&mut **raw),
            None => Err(filesplice_base::err!(
                "Cache file {} is not open",
                self.cache.path
            )),
        }
    }

    /// Copy `file[start..start + length]` into the cache file, one chunk at a time.
    pub(crate) fn spill(
        &mut self,
        file: &mut dyn RawFileAccessor,
        start: u64,
        length: u64,
    ) -> SpliceResult<()> {
        for (offset, chunk_length) in chunks(length, self.cache.max_ram_cache_size) {
            let block = file.read_range(start + offset, chunk_length)?;
            self.raw()?
                .write_range(offset, &block)
                .context("Failed to spill tail into cache file")?;
        }
        debug!(length, "tail spilled to cache file");
        Ok(())
    }

    /// Copy the first `length` cached bytes back into `file` starting at `start`.
    pub(crate) fn restore(
        &mut self,
        file: &mut dyn RawFileAccessor,
        start: u64,
        length: u64,
    ) -> SpliceResult<()> {
        for (offset, chunk_length) in chunks(length, self.cache.max_ram_cache_size) {
            let block = self
                .raw()?
                .read_range(offset, chunk_length)
                .context("Failed to read tail back from cache file")?;
            file.write_range(start + offset, &block)?;
        }
        debug!(length, "tail restored from cache file");
        Ok(())
    }

    /// Close and delete the cache file, reporting a failed delete.
    pub(crate) fn release(mut self) -> SpliceResult<()> {
        self.released = true;
        self.raw = None;
        self.cache
            .pal
            .remove_file(&self.cache.path)
            .with_context(|| format!("Failed to remove cache file {}", self.cache.path))?;
        debug!(path = %self.cache.path, "cache file removed");
        Ok(())
    }
}

impl Drop for CacheFile<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        self.raw = None;
        if let Err(e) = self.cache.pal.remove_file(&self.cache.path) {
            warn!(path = %self.cache.path, error = %e, "failed to remove cache file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use filesplice_base::{ErrorKind, MockPal, Pal};

    fn disk_cache(pal: &MockPal, chunk: u64) -> DiskCache {
        DiskCache::new(
            PalHandle::new(pal.clone()),
            FilePath::from("tail.cache"),
            chunk,
        )
    }

    #[test]
    fn test_chunks_cover_region() {
        let pal = MockPal::new();
        let cache = disk_cache(&pal, 4);

        let regions: Vec<_> = chunks(10, cache.max_ram_cache_size()).collect();
        assert_eq!(regions, vec![(0, 4), (4, 4), (8, 2)]);
        assert_eq!(chunks(0, 4).count(), 0);
    }

    #[test]
    fn test_zero_chunk_size_is_clamped() {
        let pal = MockPal::new();
        let cache = disk_cache(&pal, 0);

        assert_eq!(cache.max_ram_cache_size(), 1);
        assert_eq!(chunks(3, cache.max_ram_cache_size()).count(), 3);
    }

    #[test]
    fn test_release_removes_cache_file() {
        let pal = MockPal::new();
        let cache = disk_cache(&pal, 4);

        let guard = cache.open().unwrap();
        assert!(pal.file_properties(cache.path()).unwrap().exists);
        guard.release().unwrap();
        assert!(!pal.file_properties(cache.path()).unwrap().exists);
    }

    #[test]
    fn test_drop_removes_cache_file() {
        let pal = MockPal::new();
        let cache = disk_cache(&pal, 4);

        {
            let _guard = cache.open().unwrap();
            assert_eq!(pal.file_count(), 1);
        }
        assert_eq!(pal.file_count(), 0);
    }

    #[test]
    fn test_existing_cache_file_is_not_clobbered() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("tail.cache"), b"precious".to_vec());
        let cache = disk_cache(&pal, 4);

        let err = cache.open().err().unwrap();
        assert!(matches!(err.kind(), ErrorKind::AlreadyExists { .. }));
        assert_eq!(
            pal.file_contents(&FilePath::from("tail.cache")).unwrap(),
            b"precious"
        );
    }

    #[test]
    fn test_spill_and_restore_round_trip() {
        let pal = MockPal::new();
        pal.add_file(FilePath::from("data.bin"), b"0123456789".to_vec());
        let cache = disk_cache(&pal, 3);
        let mut file = pal
            .open_file(&FilePath::from("data.bin"), FileAccess::ReadWrite)
            .unwrap();

        let mut guard = cache.open().unwrap();
        guard.spill(file.as_mut(), 2, 7).unwrap();
        assert_eq!(
            pal.file_contents(&FilePath::from("tail.cache")).unwrap(),
            b"2345678"
        );
        guard.restore(file.as_mut(), 0, 7).unwrap();
        guard.release().unwrap();

        assert_eq!(
            pal.file_contents(&FilePath::from("data.bin")).unwrap(),
            b"2345678789"
        );
    }
}
