use relative_path::{RelativePath, RelativePathBuf};
use std::path::{Path, PathBuf};

/* 📖 # Why use RelativePathBuf for FilePath?

FilePath wraps RelativePathBuf so every path handed to the PAL is interpreted relative
to the PAL's base directory. RealPal resolves it against its base directory, MockPal
uses it directly as the key of its in-memory file table. Both backends therefore agree
on what "the same file" means, which the cross-backend tests rely on.
*/

/// Path of a file relative to the PAL base directory.
///
/// # Examples
///
/// ```
/// use filesplice_base::FilePath;
///
/// let data = FilePath::from("data/records.bin");
/// let cache = FilePath::from(String::from(".splice.cache"));
/// assert_eq!(data.to_string(), "data/records.bin");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePath.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_relative().as_str())
    }

    /// Resolves the path against a base directory.
    pub fn resolve(&self, base_dir: &Path) -> PathBuf {
        base_dir.join(self.as_path())
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(p.to_string_lossy().into_owned()))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_from_str() {
        let path = FilePath::from("data/records.bin");
        assert_eq!(path.as_path(), Path::new("data/records.bin"));
    }

    #[test]
    fn test_file_path_from_path() {
        let pb = PathBuf::from("cache/tail.bin");
        let path = FilePath::from(pb.as_path());
        assert_eq!(path.as_path(), Path::new("cache/tail.bin"));
    }

    #[test]
    fn test_file_path_resolve() {
        let path = FilePath::from("records.bin");
        assert_eq!(
            path.resolve(Path::new("/srv/data")),
            PathBuf::from("/srv/data/records.bin")
        );
    }

    #[test]
    fn test_file_path_equality_and_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(FilePath::from("a.bin"));
        assert!(set.contains(&FilePath::from("a.bin")));
        assert!(!set.contains(&FilePath::from("b.bin")));
    }

    #[test]
    fn test_file_path_display() {
        assert_eq!(FilePath::from("dir/file.bin").to_string(), "dir/file.bin");
    }
}
