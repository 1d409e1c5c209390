//! Line-oriented text buffer model.
//!
//! The conflict engine only ever reads lines by index and emits whole-line
//! deletions. [`LineBuffer`] is the read side; [`TextDocument`] is the owned
//! in-memory document used by the command layer, which applies a
//! [`LineEdit`] as one atomic transaction.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::BufferError;

// ---------------------------------------------------------------------------
// Read access
// ---------------------------------------------------------------------------

/// Read-only, 0-indexed access to the lines of a buffer.
pub trait LineBuffer {
    /// Number of lines in the buffer.
    fn line_count(&self) -> usize;

    /// Text of line `index`, without its line terminator.
    fn line(&self, index: usize) -> Option<&str>;
}

impl LineBuffer for [String] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }
}

impl LineBuffer for Vec<String> {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.get(index).map(String::as_str)
    }
}

impl<'a> LineBuffer for [&'a str] {
    fn line_count(&self) -> usize {
        self.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.get(index).copied()
    }
}

// ---------------------------------------------------------------------------
// Ranges and selections
// ---------------------------------------------------------------------------

/// An inclusive range of whole lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRange {
    pub start: usize,
    pub end: usize,
}

impl LineRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A range covering exactly one line.
    pub fn single(line: usize) -> Self {
        Self {
            start: line,
            end: line,
        }
    }

    /// Number of lines covered (0 for an inverted range).
    pub fn len(&self) -> usize {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, line: usize) -> bool {
        self.start <= line && line <= self.end
    }
}

impl std::fmt::Display for LineRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}..={}", self.start, self.end)
        }
    }
}

/// The lines touched by a user selection.
///
/// `None` means the host could not supply a selection; it never classifies
/// to a conflict side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Selection {
    #[default]
    None,
    Range(LineRange),
}

impl Selection {
    /// Build a selection from two endpoints in either order.
    pub fn lines(a: usize, b: usize) -> Self {
        Self::Range(LineRange::new(a.min(b), a.max(b)))
    }

    /// A caret with no extent.
    pub fn caret(line: usize) -> Self {
        Self::Range(LineRange::single(line))
    }

    pub fn range(&self) -> Option<LineRange> {
        match self {
            Self::None => None,
            Self::Range(r) => Some(*r),
        }
    }
}

// ---------------------------------------------------------------------------
// Edits
// ---------------------------------------------------------------------------

/// A set of whole-line deletions, all expressed against the pre-edit buffer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineEdit {
    deletions: Vec<LineRange>,
}

impl LineEdit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue deletion of `range`.
    pub fn delete(mut self, range: LineRange) -> Self {
        self.deletions.push(range);
        self
    }

    pub fn deletions(&self) -> &[LineRange] {
        &self.deletions
    }

    pub fn is_empty(&self) -> bool {
        self.deletions.is_empty()
    }

    /// Total number of lines removed by this edit.
    pub fn removed_line_count(&self) -> usize {
        self.deletions.iter().map(LineRange::len).sum()
    }

    /// Check every range against a buffer of `line_count` lines.
    ///
    /// Returns the ranges sorted by start line.
    fn validated(&self, line_count: usize) -> Result<Vec<LineRange>, BufferError> {
        let mut sorted = self.deletions.clone();
        for r in &sorted {
            if r.start > r.end {
                return Err(BufferError::InvertedRange {
                    start: r.start,
                    end: r.end,
                });
            }
            if r.end >= line_count {
                return Err(BufferError::LineOutOfRange {
                    start: r.start,
                    end: r.end,
                    line_count,
                });
            }
        }
        sorted.sort_by_key(|r| r.start);
        for pair in sorted.windows(2) {
            if pair[1].start <= pair[0].end {
                return Err(BufferError::OverlappingRanges {
                    first_start: pair[0].start,
                    first_end: pair[0].end,
                    second_start: pair[1].start,
                    second_end: pair[1].end,
                });
            }
        }
        Ok(sorted)
    }
}

// ---------------------------------------------------------------------------
// Owned document
// ---------------------------------------------------------------------------

/// An in-memory text document split into lines.
///
/// Each line keeps its own terminator, so mixed `\n` / `\r\n` files
/// round-trip byte for byte and a deletion removes exactly the deleted
/// lines with their terminators.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TextDocument {
    lines: Vec<String>,
    endings: Vec<LineEnding>,
}

/// Terminator following a line in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    #[default]
    Lf,
    CrLf,
    /// Last line of a text without a final newline.
    None,
}

impl LineEnding {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "\n",
            Self::CrLf => "\r\n",
            Self::None => "",
        }
    }
}

impl TextDocument {
    /// Split `text` into lines, remembering each line's terminator.
    pub fn from_text(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut endings = Vec::new();
        for piece in text.split_inclusive('\n') {
            let (line, ending) = if let Some(l) = piece.strip_suffix("\r\n") {
                (l, LineEnding::CrLf)
            } else if let Some(l) = piece.strip_suffix('\n') {
                (l, LineEnding::Lf)
            } else {
                (piece, LineEnding::None)
            };
            lines.push(line.to_string());
            endings.push(ending);
        }
        Self { lines, endings }
    }

    /// A document whose lines all end in `\n`.
    pub fn from_lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let lines: Vec<String> = lines.into_iter().map(Into::into).collect();
        let endings = vec![LineEnding::Lf; lines.len()];
        Self { lines, endings }
    }

    /// Reassemble the document text.
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for (line, ending) in self.lines.iter().zip(&self.endings) {
            out.push_str(line);
            out.push_str(ending.as_str());
        }
        out
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Terminator of line `index`.
    pub fn line_ending(&self, index: usize) -> Option<LineEnding> {
        self.endings.get(index).copied()
    }

    /// Replace the text of a single line, keeping its terminator.
    pub fn replace_line(&mut self, index: usize, text: impl Into<String>) -> Result<(), BufferError> {
        let line_count = self.lines.len();
        let slot = self.lines.get_mut(index).ok_or(BufferError::LineOutOfRange {
            start: index,
            end: index,
            line_count,
        })?;
        *slot = text.into();
        Ok(())
    }

    /// Apply all deletions of `edit` atomically.
    ///
    /// Either every range is removed or, on error, the document is unchanged.
    pub fn apply(&mut self, edit: &LineEdit) -> Result<(), BufferError> {
        let sorted = edit.validated(self.lines.len())?;
        for r in sorted.iter().rev() {
            self.lines.drain(r.start..=r.end);
            self.endings.drain(r.start..=r.end);
        }
        debug!(
            ranges = sorted.len(),
            removed = edit.removed_line_count(),
            remaining = self.lines.len(),
            "applied line edit"
        );
        Ok(())
    }
}

impl LineBuffer for TextDocument {
    fn line_count(&self) -> usize {
        self.lines.len()
    }

    fn line(&self, index: usize) -> Option<&str> {
        self.lines.get(index).map(String::as_str)
    }
}
