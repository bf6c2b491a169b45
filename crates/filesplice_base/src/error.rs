use std::error::Error as StdError;
use std::fmt;
use std::io;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Callers branch on the kind of failure (offset out of range vs. missing file vs. OS error)
- No dependencies to compile and integrate beyond tracing-error
- More transparency into error handling logic
 */

/// Error variants surfaced by file handles, the PAL and the splice engine.
///
/// Precondition violations (`InvalidOption`, `InvalidOffset`, `InvalidRange`, `NotOpen`,
/// `AlreadyClosed`) are detected before any mutation happens.
#[derive(Debug)]
pub enum ErrorKind {
    /// The target path already exists
    AlreadyExists { path: PathBuf },

    /// An open mode value outside the supported bit combinations
    InvalidOption { mode: u8 },

    /// The handle is already open
    AlreadyOpen { path: PathBuf },

    /// The path does not exist, or the handle was never opened
    NotFound { path: PathBuf },

    /// Catch-all for other errors with a message
    Generic { message: String },

    /// The handle was open once and has since been closed
    AlreadyClosed { path: PathBuf },

    /// The handle is open, but its mode does not permit the operation
    NotOpen {
        path: PathBuf,
        operation: &'static str,
    },

    /// Offset lies beyond the end of the file
    InvalidOffset { offset: u64, size: u64 },

    /// Byte range extends beyond the end of the file
    InvalidRange { offset: u64, length: u64, size: u64 },

    /// Underlying OS read/write/truncate failed
    IoFailure { path: PathBuf, source: io::Error },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::AlreadyExists { path } => {
                write!(f, "File already exists: {}", path.display())
            }
            ErrorKind::InvalidOption { mode } => write!(f, "Invalid open mode: {:#04x}", mode),
            ErrorKind::AlreadyOpen { path } => {
                write!(f, "File is already open: {}", path.display())
            }
            ErrorKind::NotFound { path } => write!(f, "File not found: {}", path.display()),
            ErrorKind::Generic { message } => write!(f, "{}", message),
            ErrorKind::AlreadyClosed { path } => {
                write!(f, "File is already closed: {}", path.display())
            }
            ErrorKind::NotOpen { path, operation } => write!(
                f,
                "File {} is not open in a mode that permits {}",
                path.display(),
                operation
            ),
            ErrorKind::InvalidOffset { offset, size } => {
                write!(f, "Offset {} is beyond end of file (size {})", offset, size)
            }
            ErrorKind::InvalidRange {
                offset,
                length,
                size,
            } => write!(
                f,
                "Range {}+{} is beyond end of file (size {})",
                offset, length, size
            ),
            ErrorKind::IoFailure { path, source } => {
                write!(f, "I/O failure at {}: {}", path.display(), source)
            }
        }
    }
}

/* 📖 # Why separate ErrorKind and SpliceError?
This two-layer design provides a clear separation of concerns:
- ErrorKind: structural variants with specific contexts (paths, offsets, sizes)
- SpliceError: wraps ErrorKind with context strings and the span trace at creation time

Users pattern match on ErrorKind, while SpliceError carries the ergonomic context
attachment used during propagation.
*/

/// Error type wrapping [`ErrorKind`] with context and a captured span trace.
pub struct SpliceError {
    kind: ErrorKind,
    context: Vec<String>,
    span_trace: SpanTrace,
}

impl SpliceError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a `Generic` error from a message.
    pub fn generic(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Generic {
            message: message.into(),
        })
    }

    /// Classifies an OS error for the given path.
    ///
    /// `NotFound` and `AlreadyExists` map to their dedicated kinds, everything else
    /// is kept verbatim as `IoFailure`.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        let path = path.into();
        let kind = match source.kind() {
            io::ErrorKind::NotFound => ErrorKind::NotFound { path },
            io::ErrorKind::AlreadyExists => ErrorKind::AlreadyExists { path },
            _ => ErrorKind::IoFailure { path, source },
        };
        Self::new(kind)
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the attached context, outermost last.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }
}

impl From<ErrorKind> for SpliceError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ErrorKind> for Box<SpliceError> {
    fn from(kind: ErrorKind) -> Self {
        Box::new(SpliceError::new(kind))
    }
}

impl StdError for SpliceError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::IoFailure { source, .. } => Some(source),
            _ => None,
        }
    }
}

impl fmt::Display for SpliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for SpliceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        let last = self.context.len().saturating_sub(1);
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i == last { "└─" } else { "├─" };
            writeln!(f, "{} {}", branch, ctx)?;
        }
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace: {}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<SpliceError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.
The span trace alone would otherwise make every Result several words larger.
*/

/// Standard result type for filesplice operations.
pub type SpliceResult<T> = std::result::Result<T, Box<SpliceError>>;

/// Extension trait for attaching context to Results during propagation.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> SpliceResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> SpliceResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for SpliceResult<T> {
    fn context(self, context: impl Into<String>) -> SpliceResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> SpliceResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed `Generic` error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::SpliceError::generic(format!($($arg)*)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_not_found_maps_to_not_found() {
        let error = SpliceError::io(
            "missing.bin",
            io::Error::new(io::ErrorKind::NotFound, "gone"),
        );
        match error.kind() {
            ErrorKind::NotFound { path } => assert_eq!(path, &PathBuf::from("missing.bin")),
            other => panic!("Expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_io_already_exists_maps_to_already_exists() {
        let error = SpliceError::io(
            "dup.bin",
            io::Error::new(io::ErrorKind::AlreadyExists, "exists"),
        );
        assert!(matches!(error.kind(), ErrorKind::AlreadyExists { .. }));
    }

    #[test]
    fn test_io_other_kept_as_io_failure() {
        let error = SpliceError::io(
            "data.bin",
            io::Error::new(io::ErrorKind::PermissionDenied, "access denied"),
        );
        assert!(matches!(error.kind(), ErrorKind::IoFailure { .. }));
        assert!(error.source().is_some());
        assert_eq!(error.root_cause().to_string(), "access denied");
    }

    #[test]
    fn test_error_display_with_context() {
        let error = SpliceError::new(ErrorKind::InvalidOffset { offset: 12, size: 10 })
            .context("inserting into data.bin");
        assert_eq!(
            error.to_string(),
            "inserting into data.bin: Offset 12 is beyond end of file (size 10)"
        );
    }

    #[test]
    fn test_invalid_option_display() {
        let error = SpliceError::new(ErrorKind::InvalidOption { mode: 0x07 });
        assert_eq!(error.to_string(), "Invalid open mode: 0x07");
    }

    #[test]
    fn test_error_kind_into_boxed_error() {
        let result: SpliceResult<()> = Err(ErrorKind::InvalidRange {
            offset: 3,
            length: 9,
            size: 10,
        }
        .into());
        let err = result.unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidRange { length: 9, .. }));
    }

    #[test]
    fn test_err_macro() {
        let err: Box<SpliceError> = crate::err!("chunk {} failed", 3);
        assert_eq!(err.to_string(), "chunk 3 failed");
        assert!(matches!(err.kind(), ErrorKind::Generic { .. }));
    }

    #[test]
    fn test_result_ext_chaining() {
        let result: SpliceResult<i32> = Err(Box::new(SpliceError::generic("root")));
        let err = result
            .context("step 1")
            .with_context(|| "step 2".to_string())
            .unwrap_err();
        assert_eq!(err.to_string(), "step 1: step 2: root");
    }

    #[test]
    fn test_result_ext_success_passes_through() {
        let result: SpliceResult<i32> = Ok(42);
        assert_eq!(result.context("unused").unwrap(), 42);
    }
}
