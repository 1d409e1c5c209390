//! Filesystem navigation between related files.
//!
//! Two lookups are provided:
//! - [`find_build_file`] walks upward from a file to the nearest build
//!   manifest (`BUILD` by default) without leaving the workspace root.
//! - [`counterpart_file`] switches between a C/C++ header and its source,
//!   searching the file's own directory first and then its sibling
//!   directories.
//!
//! Both take a [`FileSystem`] so the directory walk can be substituted.

use std::path::{Component, Path, PathBuf};

use tracing::{debug, info};

use crate::errors::NavigationError;

/// Filesystem queries used by the navigator.
pub trait FileSystem {
    /// Whether `path` exists.
    fn exists(&self, path: &Path) -> bool;

    /// Immediate child directories of `dir`.
    fn subdirectories(&self, dir: &Path) -> Result<Vec<PathBuf>, NavigationError>;
}

/// [`FileSystem`] backed by `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsFileSystem;

impl FileSystem for OsFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn subdirectories(&self, dir: &Path) -> Result<Vec<PathBuf>, NavigationError> {
        let mut dirs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            // Follows symlinks, so linked directories count as siblings.
            let path = entry?.path();
            if path.is_dir() {
                dirs.push(path);
            }
        }
        dirs.sort();
        Ok(dirs)
    }
}

/// Resolve `.` and `..` components lexically, without touching the
/// filesystem. `..` above the root stays at the root.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => out.push(component),
            },
            other => out.push(other),
        }
    }
    out
}

/// Nearest build manifest at or above `file`'s directory.
///
/// Both paths are normalized first. The walk stops once it leaves
/// `workspace_root` or reaches the filesystem root. In each directory the
/// `names` are tried in order.
pub fn find_build_file<F>(
    fs: &F,
    file: &Path,
    workspace_root: &Path,
    names: &[String],
) -> Result<PathBuf, NavigationError>
where
    F: FileSystem + ?Sized,
{
    let file = normalize_path(file);
    let workspace_root = normalize_path(workspace_root);
    let mut dir = file.parent();
    while let Some(current) = dir {
        if !current.starts_with(&workspace_root) {
            break;
        }
        for name in names {
            let candidate = current.join(name);
            if fs.exists(&candidate) {
                info!(path = %candidate.display(), "found build file");
                return Ok(candidate);
            }
        }
        dir = current.parent();
    }
    debug!(file = %file.display(), "no build file above");
    Err(NavigationError::BuildFileNotFound(file))
}

/// The header for a source file, or the source for a header.
///
/// Extensions include the leading dot (`.h`, `.cc`). Candidates are tried in
/// the file's directory first, then in every sibling directory, each with
/// the target extensions in the order given.
pub fn counterpart_file<F>(
    fs: &F,
    file: &Path,
    header_extensions: &[String],
    source_extensions: &[String],
) -> Result<PathBuf, NavigationError>
where
    F: FileSystem + ?Sized,
{
    let ext = file
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default();

    let targets = if header_extensions.contains(&ext) {
        source_extensions
    } else if source_extensions.contains(&ext) {
        header_extensions
    } else {
        return Err(NavigationError::UnrecognizedExtension(file.to_path_buf()));
    };

    let stem = file
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| NavigationError::UnrecognizedExtension(file.to_path_buf()))?;

    let current_dir = file.parent().unwrap_or_else(|| Path::new("."));
    let mut search_dirs = vec![current_dir.to_path_buf()];
    if let Some(parent) = current_dir.parent() {
        search_dirs.extend(fs.subdirectories(parent)?);
    }

    for dir in &search_dirs {
        for target in targets {
            let candidate = dir.join(format!("{}{}", stem, target));
            if fs.exists(&candidate) {
                info!(path = %candidate.display(), "found counterpart file");
                return Ok(candidate);
            }
        }
    }

    debug!(file = %file.display(), searched = search_dirs.len(), "no counterpart file");
    Err(NavigationError::CounterpartNotFound(file.to_path_buf()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    /// In-memory tree: a set of file paths plus a map of directory children.
    #[derive(Default)]
    struct FakeFs {
        files: BTreeSet<PathBuf>,
        dirs: BTreeMap<PathBuf, Vec<PathBuf>>,
    }

    impl FakeFs {
        fn file(mut self, path: &str) -> Self {
            self.files.insert(PathBuf::from(path));
            self
        }

        fn dir(mut self, parent: &str, children: &[&str]) -> Self {
            self.dirs.insert(
                PathBuf::from(parent),
                children.iter().map(|c| Path::new(parent).join(c)).collect(),
            );
            self
        }
    }

    impl FileSystem for FakeFs {
        fn exists(&self, path: &Path) -> bool {
            self.files.contains(path)
        }

        fn subdirectories(&self, dir: &Path) -> Result<Vec<PathBuf>, NavigationError> {
            Ok(self.dirs.get(dir).cloned().unwrap_or_default())
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_build_file_nearest_wins() {
        let fs = FakeFs::default().file("/ws/BUILD").file("/ws/pkg/BUILD");
        let found = find_build_file(
            &fs,
            Path::new("/ws/pkg/sub/main.cc"),
            Path::new("/ws"),
            &strings(&["BUILD"]),
        )
        .unwrap();
        assert_eq!(found, PathBuf::from("/ws/pkg/BUILD"));
    }

    #[test]
    fn test_build_file_stays_inside_workspace() {
        let fs = FakeFs::default().file("/BUILD");
        let result = find_build_file(
            &fs,
            Path::new("/ws/a/b.cc"),
            Path::new("/ws"),
            &strings(&["BUILD"]),
        );
        assert!(matches!(result, Err(NavigationError::BuildFileNotFound(_))));
    }

    #[test]
    fn test_build_file_with_dotted_root() {
        let fs = FakeFs::default().file("/ws/BUILD");
        let found = find_build_file(
            &fs,
            Path::new("/ws/pkg/./a.cc"),
            Path::new("/ws/pkg/../"),
            &strings(&["BUILD"]),
        )
        .unwrap();
        assert_eq!(found, PathBuf::from("/ws/BUILD"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path(Path::new("/a/b/../c/./d")), PathBuf::from("/a/c/d"));
        assert_eq!(normalize_path(Path::new("/../a")), PathBuf::from("/a"));
        assert_eq!(normalize_path(Path::new("../a/..")), PathBuf::from(".."));
        assert_eq!(normalize_path(Path::new("a/../../b")), PathBuf::from("../b"));
    }

    #[test]
    fn test_build_file_name_order() {
        let fs = FakeFs::default()
            .file("/ws/a/BUILD")
            .file("/ws/a/BUILD.bazel");
        let found = find_build_file(
            &fs,
            Path::new("/ws/a/x.cc"),
            Path::new("/ws"),
            &strings(&["BUILD.bazel", "BUILD"]),
        )
        .unwrap();
        assert_eq!(found, PathBuf::from("/ws/a/BUILD.bazel"));
    }

    #[test]
    fn test_counterpart_same_directory_first() {
        let fs = FakeFs::default()
            .file("/p/src/foo.h")
            .file("/p/include/foo.h")
            .dir("/p", &["include", "src"]);
        let found = counterpart_file(
            &fs,
            Path::new("/p/src/foo.cc"),
            &strings(&[".h", ".hpp"]),
            &strings(&[".c", ".cc"]),
        )
        .unwrap();
        assert_eq!(found, PathBuf::from("/p/src/foo.h"));
    }

    #[test]
    fn test_counterpart_in_sibling_directory() {
        let fs = FakeFs::default()
            .file("/p/src/foo.cc")
            .dir("/p", &["include", "src"]);
        let found = counterpart_file(
            &fs,
            Path::new("/p/include/foo.h"),
            &strings(&[".h", ".hpp"]),
            &strings(&[".c", ".cc"]),
        )
        .unwrap();
        assert_eq!(found, PathBuf::from("/p/src/foo.cc"));
    }

    #[test]
    fn test_counterpart_extension_order() {
        let fs = FakeFs::default().file("/p/a/foo.c").file("/p/a/foo.cc");
        let found = counterpart_file(
            &fs,
            Path::new("/p/a/foo.hpp"),
            &strings(&[".h", ".hpp"]),
            &strings(&[".c", ".cc"]),
        )
        .unwrap();
        assert_eq!(found, PathBuf::from("/p/a/foo.c"));
    }

    #[test]
    fn test_counterpart_unrecognized() {
        let fs = FakeFs::default();
        let result = counterpart_file(
            &fs,
            Path::new("/p/readme.md"),
            &strings(&[".h"]),
            &strings(&[".cc"]),
        );
        assert!(matches!(result, Err(NavigationError::UnrecognizedExtension(_))));
    }

    #[test]
    fn test_counterpart_missing() {
        let fs = FakeFs::default();
        let result = counterpart_file(
            &fs,
            Path::new("/p/a/foo.h"),
            &strings(&[".h"]),
            &strings(&[".cc"]),
        );
        assert!(matches!(result, Err(NavigationError::CounterpartNotFound(_))));
    }

    #[cfg(unix)]
    #[test]
    fn test_os_subdirectories_follow_symlinks() {
        let dir = tempfile::tempdir().unwrap();
        let real = dir.path().join("real");
        std::fs::create_dir_all(dir.path().join("p/src")).unwrap();
        std::fs::create_dir_all(&real).unwrap();
        std::fs::write(real.join("foo.h"), "").unwrap();
        std::fs::write(dir.path().join("p/src/foo.cc"), "").unwrap();
        std::os::unix::fs::symlink(&real, dir.path().join("p/include")).unwrap();

        let subdirs = OsFileSystem.subdirectories(&dir.path().join("p")).unwrap();
        assert_eq!(subdirs.len(), 2);

        let found = counterpart_file(
            &OsFileSystem,
            &dir.path().join("p/src/foo.cc"),
            &strings(&[".h"]),
            &strings(&[".cc"]),
        )
        .unwrap();
        assert_eq!(found, dir.path().join("p/include/foo.h"));
    }
}
