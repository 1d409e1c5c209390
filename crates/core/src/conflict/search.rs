//! Searching for conflict markers beyond the current block.
//!
//! [`GitGrep`] shells out to `git grep` to find the first marker line
//! anywhere in a repository. [`next_in_document`] is the in-buffer
//! counterpart used before falling back to the project search. Both match
//! the same lines: the grep pattern comes from [`ConflictMarkers`].

use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tracing::{debug, info, instrument, warn};

use super::locator::ConflictLocator;
use super::markers::ConflictMarkers;
use crate::buffer::LineBuffer;
use crate::errors::SearchError;

/// A marker line found by a search (0-based line).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictHit {
    pub path: PathBuf,
    pub line: usize,
}

/// The next marker in `buffer` after `cursor_line`, wrapping around.
pub fn next_in_document<B>(locator: &ConflictLocator, buffer: &B, cursor_line: usize) -> Option<usize>
where
    B: LineBuffer + ?Sized,
{
    locator
        .next_marker(buffer, cursor_line)
        .map(|(line, kind)| {
            debug!(line, %kind, "next marker in document");
            line
        })
}

/// Repository-wide marker search via `git grep`.
#[derive(Debug, Clone)]
pub struct GitGrep {
    git_binary: String,
    root: PathBuf,
    markers: ConflictMarkers,
}

impl GitGrep {
    /// Create a searcher rooted at `root`, invoking `git_binary`.
    pub fn new(git_binary: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            git_binary: git_binary.into(),
            root: root.into(),
            markers: ConflictMarkers::default(),
        }
    }

    /// Match marker lines with `markers`' grammar instead of the default.
    pub fn with_markers(mut self, markers: ConflictMarkers) -> Self {
        self.markers = markers;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// First marker line in the repository, if any.
    ///
    /// The returned path is joined onto the search root.
    #[instrument(skip(self), fields(root = %self.root.display()))]
    pub async fn first_marker(&self) -> Result<Option<ConflictHit>, SearchError> {
        let Some(output) = self
            .run_git(&["grep", "-n", "-I", "-E", self.markers.grep_pattern()])
            .await?
        else {
            info!("no conflict markers found");
            return Ok(None);
        };

        let Some(first) = output.lines().find(|l| !l.trim().is_empty()) else {
            return Ok(None);
        };
        let mut hit = parse_grep_line(first)?;
        hit.path = self.root.join(hit.path);
        info!(path = %hit.path.display(), line = hit.line, "found conflict marker");
        Ok(Some(hit))
    }

    /// Run git and return stdout, or `None` when git reports no matches.
    async fn run_git(&self, args: &[&str]) -> Result<Option<String>, SearchError> {
        let mut cmd = Command::new(&self.git_binary);
        cmd.current_dir(&self.root)
            .args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        debug!(cmd = ?format!("{} {}", self.git_binary, args.join(" ")), "running git command");
        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                SearchError::BinaryNotFound(self.git_binary.clone())
            } else {
                SearchError::IoError(e)
            }
        })?;

        // git grep exits 1 when nothing matched.
        match output.status.code() {
            Some(0) => Ok(Some(String::from_utf8_lossy(&output.stdout).to_string())),
            Some(1) if output.stderr.is_empty() => Ok(None),
            code => {
                let stderr = String::from_utf8_lossy(&output.stderr).to_string();
                let exit_code = code.unwrap_or(-1);
                warn!(exit_code, %stderr, "git command failed");
                Err(SearchError::CommandFailed { exit_code, stderr })
            }
        }
    }
}

/// Parse one `path:line:content` line of `git grep -n` output.
///
/// `git grep` line numbers are 1-based; the hit is 0-based.
pub fn parse_grep_line(line: &str) -> Result<ConflictHit, SearchError> {
    let mut parts = line.splitn(3, ':');
    let path = parts.next().filter(|p| !p.is_empty());
    let number = parts.next().and_then(|n| n.trim().parse::<usize>().ok());

    match (path, number) {
        (Some(path), Some(n)) if n > 0 => Ok(ConflictHit {
            path: PathBuf::from(path),
            line: n - 1,
        }),
        _ => Err(SearchError::ParseError(line.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_grep_line() {
        let hit = parse_grep_line("src/main.rs:12:<<<<<<< HEAD").unwrap();
        assert_eq!(hit.path, PathBuf::from("src/main.rs"));
        assert_eq!(hit.line, 11);

        // Content containing colons is left alone.
        let hit = parse_grep_line("a.txt:1:=======:x").unwrap();
        assert_eq!(hit.line, 0);
    }

    #[test]
    fn test_parse_grep_line_rejects_garbage() {
        assert!(parse_grep_line("no separators").is_err());
        assert!(parse_grep_line("file:abc:content").is_err());
        assert!(parse_grep_line("file:0:content").is_err());
        assert!(parse_grep_line(":3:content").is_err());
    }

    #[test]
    fn test_next_in_document() {
        let buf = vec![
            "a".to_string(),
            "<<<<<<< HEAD".to_string(),
            "b".to_string(),
        ];
        let locator = ConflictLocator::default();
        assert_eq!(next_in_document(&locator, &buf, 0), Some(1));
        assert_eq!(next_in_document(&locator, &buf, 2), Some(1));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let dir = tempfile::tempdir().unwrap();
        let grep = GitGrep::new("definitely-not-a-real-git-binary", dir.path());
        let result = grep.first_marker().await;
        assert!(matches!(result, Err(SearchError::BinaryNotFound(_))));
    }
}
