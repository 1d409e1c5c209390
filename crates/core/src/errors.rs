//! Error types for the MergeResolver core library.
//!
//! Each subsystem has its own error type derived with `thiserror`.
//! [`CommandError`] wraps the ones a command can hit, so the command layer
//! surfaces a single error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Conflict errors
// ---------------------------------------------------------------------------

/// Errors from conflict location and resolution.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConflictError {
    /// No enclosing conflict block exists for the reference line.
    #[error("no conflict block found around line {line}")]
    NotFound { line: usize },

    /// The selection does not lie entirely within one side of the block.
    #[error("invalid selection: lines {start}..={end} do not fall within a single conflict side")]
    InvalidSelection { start: usize, end: usize },

    /// The host supplied no selection at all.
    #[error("invalid selection: no lines selected")]
    NoSelection,

    /// Marker indices violate `start < divider < end`.
    #[error("malformed conflict block (start {start}, divider {divider}, end {end})")]
    MalformedBlock {
        start: usize,
        divider: usize,
        end: usize,
    },
}

impl ConflictError {
    /// `true` for both flavours of unclassifiable selection.
    pub fn is_invalid_selection(&self) -> bool {
        matches!(self, Self::InvalidSelection { .. } | Self::NoSelection)
    }
}

// ---------------------------------------------------------------------------
// Buffer errors
// ---------------------------------------------------------------------------

/// Errors from applying edits to a text buffer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BufferError {
    /// A deletion range reaches past the end of the buffer.
    #[error("line range {start}..={end} is out of bounds (buffer has {line_count} lines)")]
    LineOutOfRange {
        start: usize,
        end: usize,
        line_count: usize,
    },

    /// Two deletion ranges in one edit touch the same line.
    #[error("overlapping line ranges in edit: {first_start}..={first_end} and {second_start}..={second_end}")]
    OverlappingRanges {
        first_start: usize,
        first_end: usize,
        second_start: usize,
        second_end: usize,
    },

    /// A range with `start > end`.
    #[error("inverted line range {start}..={end}")]
    InvertedRange { start: usize, end: usize },
}

// ---------------------------------------------------------------------------
// Search errors
// ---------------------------------------------------------------------------

/// Errors from project-wide conflict-marker search.
#[derive(Debug, Error)]
pub enum SearchError {
    /// The `git` binary was not found on `$PATH`.
    #[error("git binary not found: {0}")]
    BinaryNotFound(String),

    /// `git grep` exited with an unexpected status.
    #[error("git grep failed (exit {exit_code}): {stderr}")]
    CommandFailed { exit_code: i32, stderr: String },

    /// A `git grep` output line could not be parsed.
    #[error("unparseable git grep output: {0}")]
    ParseError(String),

    /// Generic I/O wrapper.
    #[error("search I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Navigation errors
// ---------------------------------------------------------------------------

/// Errors from build-file and header/source navigation.
#[derive(Debug, Error)]
pub enum NavigationError {
    /// The file extension is neither a known header nor a known source.
    #[error("not a recognized source or header file: {}", .0.display())]
    UnrecognizedExtension(PathBuf),

    /// No build manifest was found between the file and the workspace root.
    #[error("no build file found above {}", .0.display())]
    BuildFileNotFound(PathBuf),

    /// No counterpart header/source file exists.
    #[error("no counterpart file found for {}", .0.display())]
    CounterpartNotFound(PathBuf),

    /// Generic I/O error while walking directories.
    #[error("navigation I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Command errors
// ---------------------------------------------------------------------------

/// Errors from the command registry.
#[derive(Debug, Error)]
pub enum CommandError {
    /// No handler is registered under this identifier.
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// The registry was torn down.
    #[error("command registry has been disposed")]
    Disposed,

    /// The command needs a file path but the context has none.
    #[error("command '{0}' requires a file path")]
    MissingPath(String),

    /// The computed edit could not be applied.
    #[error("failed to apply edit: {0}")]
    Apply(#[from] BufferError),

    /// Project search failed.
    #[error("conflict search failed: {0}")]
    Search(#[from] SearchError),

    /// Filesystem navigation failed.
    #[error("navigation failed: {0}")]
    Navigation(#[from] NavigationError),
}
