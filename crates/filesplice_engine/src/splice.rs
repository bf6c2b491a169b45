/* 📖 # How do insert and cut shift the tail?

Both operations capture the tail (everything behind the splice point) before the bytes
in front of it change, then write it back at its shifted position:

- insert: capture `old[offset..]`, write the new bytes at `offset`, write the tail after them
- cut: snapshot the size, capture `old[offset + length..]`, truncate to `offset`, write the tail at `offset`

The size snapshot in cut matters because truncation changes what `size()` reports.

Neither operation is atomic. A failure between the mutating steps leaves the file in an
intermediate state (tail partly overwritten, or truncated but not restored). All
validation happens before the first mutation, so invalid requests never touch the file.
*/

use filesplice_base::pal::check_range;
use filesplice_base::{ErrorKind, RawFileAccessor, SpliceResult};
use tracing::{debug, instrument};

use crate::cache::CachePolicy;

/// Insert `data` at `offset`, shifting `old[offset..]` back by `data.len()` bytes.
///
/// Fails with `InvalidOffset` if `offset` lies beyond the end of the file.
#[instrument(skip(file, data, policy), fields(length = data.len()))]
pub fn insert(
    file: &mut dyn RawFileAccessor,
    data: &[u8],
    offset: u64,
    policy: &CachePolicy,
) -> SpliceResult<()> {
    let size = file.size()?;
    if offset > size {
        return Err(ErrorKind::InvalidOffset { offset, size }.into());
    }
    if data.is_empty() {
        debug!("nothing to insert");
        return Ok(());
    }
    let tail_length = size - offset;
    let shifted_to = offset + data.len() as u64;
    if tail_length == 0 {
        debug!("insert at end of file, appending");
        return file.write_range(offset, data);
    }

    match policy {
        CachePolicy::Memory => {
            let tail = file.read_range(offset, tail_length)?;
            file.write_range(offset, data)?;
            file.write_range(shifted_to, &tail)?;
        }
        CachePolicy::Disk(disk) => {
            let mut cache = disk.open()?;
            cache.spill(file, offset, tail_length)?;
            file.write_range(offset, data)?;
            cache.restore(file, shifted_to, tail_length)?;
            cache.release()?;
        }
    }
    debug!(tail_length, new_size = size + data.len() as u64, "insert complete");
    Ok(())
}

/// Remove `length` bytes at `offset`, shifting `old[offset + length..]` forward.
///
/// Fails with `InvalidRange` if the range extends beyond the end of the file.
#[instrument(skip(file, policy))]
pub fn cut(
    file: &mut dyn RawFileAccessor,
    length: u64,
    offset: u64,
    policy: &CachePolicy,
) -> SpliceResult<()> {
    let cached_size = file.size()?;
    check_range(offset, length, cached_size)?;
    if length == 0 {
        debug!("nothing to cut");
        return Ok(());
    }
    let tail_offset = offset + length;
    let tail_length = cached_size - tail_offset;

    match policy {
        CachePolicy::Disk(disk) if tail_length > 0 => {
            let mut cache = disk.open()?;
            cache.spill(file, tail_offset, tail_length)?;
            file.truncate(offset)?;
            cache.restore(file, offset, tail_length)?;
            cache.release()?;
        }
        _ => {
            let buffer = file.read_range(tail_offset, tail_length)?;
            file.truncate(offset)?;
            file.write_range(offset, &buffer)?;
        }
    }
    debug!(tail_length, new_size = cached_size - length, "cut complete");
    Ok(())
}
