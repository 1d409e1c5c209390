//! Conflict resolution actions.
//!
//! The [`ConflictResolver`] turns a located [`ConflictBlock`] into the
//! whole-line deletions that resolve it. All ranges of one resolution are
//! expressed against the unmodified buffer and returned as a single
//! [`LineEdit`], so applying them is one atomic step.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::locator::ConflictBlock;
use crate::buffer::{LineEdit, LineRange, Selection, TextDocument};
use crate::errors::{BufferError, ConflictError};

/// One side of a conflict block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    /// Lines between the start marker and the divider.
    Current,
    /// Lines between the divider and the end marker.
    Incoming,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Self::Current => Self::Incoming,
            Self::Incoming => Self::Current,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Current => write!(f, "current"),
            Self::Incoming => write!(f, "incoming"),
        }
    }
}

/// Named resolution strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    /// Keep one side's body, drop the other body and all markers.
    Keep(Side),
    /// Keep both bodies in their original order, drop the markers.
    KeepBoth,
    /// Drop the whole block.
    KeepNeither,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keep(side) => write!(f, "keep {}", side),
            Self::KeepBoth => write!(f, "keep both"),
            Self::KeepNeither => write!(f, "keep neither"),
        }
    }
}

/// Stateless conflict resolution operations.
pub struct ConflictResolver;

impl ConflictResolver {
    /// Decide which side a selection lies in.
    ///
    /// The current side admits selections starting on the start marker; the
    /// incoming side admits selections ending on the end marker. A selection
    /// touching the divider, spanning both sides, or lying outside the block
    /// is invalid.
    pub fn classify(block: &ConflictBlock, selection: Selection) -> Result<Side, ConflictError> {
        let Some(range) = selection.range() else {
            return Err(ConflictError::NoSelection);
        };

        if block.start() <= range.start && range.end < block.divider() {
            Ok(Side::Current)
        } else if block.divider() < range.start && range.end <= block.end() {
            Ok(Side::Incoming)
        } else {
            Err(ConflictError::InvalidSelection {
                start: range.start,
                end: range.end,
            })
        }
    }

    /// Which resolution accepting or rejecting the selected side implies.
    ///
    /// Rejecting one side is the same as accepting the other.
    pub fn side_resolution(
        block: &ConflictBlock,
        selection: Selection,
        should_accept: bool,
    ) -> Result<Resolution, ConflictError> {
        let chosen = Self::classify(block, selection)?;
        let kept = if should_accept { chosen } else { chosen.opposite() };
        Ok(Resolution::Keep(kept))
    }

    /// Deletions that accept (or reject) the side the selection lies in.
    pub fn resolve_side(
        block: &ConflictBlock,
        selection: Selection,
        should_accept: bool,
    ) -> Result<LineEdit, ConflictError> {
        match Self::side_resolution(block, selection, should_accept) {
            Ok(resolution) => {
                info!(%block, %resolution, should_accept, "resolving conflict side");
                Ok(Self::edit_for(block, resolution))
            }
            Err(e) => {
                warn!(%block, error = %e, "selection does not pick a conflict side");
                Err(e)
            }
        }
    }

    /// Deletions removing only the three marker lines.
    pub fn resolve_both(block: &ConflictBlock) -> LineEdit {
        info!(%block, "keeping both conflict sides");
        Self::edit_for(block, Resolution::KeepBoth)
    }

    /// A single deletion removing the entire block.
    pub fn reject_both(block: &ConflictBlock) -> LineEdit {
        info!(%block, "rejecting both conflict sides");
        Self::edit_for(block, Resolution::KeepNeither)
    }

    /// The deletions implementing `resolution` for `block`.
    pub fn edit_for(block: &ConflictBlock, resolution: Resolution) -> LineEdit {
        let (start, divider, end) = (block.start(), block.divider(), block.end());
        let edit = match resolution {
            Resolution::Keep(Side::Current) => LineEdit::new()
                .delete(LineRange::new(divider, end))
                .delete(LineRange::single(start)),
            Resolution::Keep(Side::Incoming) => LineEdit::new()
                .delete(LineRange::new(start, divider))
                .delete(LineRange::single(end)),
            Resolution::KeepBoth => LineEdit::new()
                .delete(LineRange::single(end))
                .delete(LineRange::single(divider))
                .delete(LineRange::single(start)),
            Resolution::KeepNeither => LineEdit::new().delete(LineRange::new(start, end)),
        };
        debug!(%resolution, removed = edit.removed_line_count(), "built resolution edit");
        edit
    }

    /// Apply a resolution edit to a document in one step.
    pub fn apply(document: &mut TextDocument, edit: &LineEdit) -> Result<(), BufferError> {
        document.apply(edit)
    }
}
