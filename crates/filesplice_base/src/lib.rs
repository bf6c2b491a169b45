/* 📖 # Why have filesplice_base as a core library?
filesplice_base provides the error type, tracing setup and the platform abstraction layer
shared by the engine and the CLI. Keeping them here prevents circular dependencies between crates.
*/

pub mod error;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, SpliceError, SpliceResult};
pub use pal::{
    FileAccess, FilePath, FileProperties, MockPal, Pal, PalHandle, RawFileAccessor, RealPal,
};
