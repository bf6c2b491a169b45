/* 📖 # What is the Platform Abstraction Layer?

The PAL is the raw file accessor everything else is built on. It exposes path level
operations (properties, create, open, rename, remove) through the Pal trait and the
four primitives of an open file (size, range read, range write, truncate) through
RawFileAccessor.

Code depends on these traits, not on RealPal or MockPal, so the splice algorithms are
written once and tested against an in-memory filesystem.
*/

mod file_path;
pub mod mock;
pub mod real_pal;
mod traits;

pub use file_path::FilePath;
pub use mock::MockPal;
pub use real_pal::RealPal;
pub use traits::{FileAccess, FileProperties, Pal, PalHandle, RawFileAccessor, check_range};
