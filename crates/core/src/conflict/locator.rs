//! Conflict-block location.
//!
//! Given a reference line, the locator searches outward in both directions
//! for the nearest start and end markers, then looks for a divider between
//! them. The reference line may sit on any part of the block: the start
//! marker, either body, the divider, or the end marker.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use super::markers::{ConflictMarkers, DividerGrammar, MarkerKind};
use crate::buffer::{LineBuffer, LineRange};
use crate::errors::ConflictError;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Line indices of a `<<<<<<<` / `=======` / `>>>>>>>` triple.
///
/// Always satisfies `start < divider < end`. Blocks are derived views that
/// are recomputed for every command and never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictBlock {
    start: usize,
    divider: usize,
    end: usize,
}

impl ConflictBlock {
    /// Build a block, rejecting indices that violate `start < divider < end`.
    pub fn new(start: usize, divider: usize, end: usize) -> Result<Self, ConflictError> {
        if start < divider && divider < end {
            Ok(Self {
                start,
                divider,
                end,
            })
        } else {
            Err(ConflictError::MalformedBlock {
                start,
                divider,
                end,
            })
        }
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn divider(&self) -> usize {
        self.divider
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Every line of the block, markers included.
    pub fn span(&self) -> LineRange {
        LineRange::new(self.start, self.end)
    }

    /// Body lines between start and divider, if any.
    pub fn current_side(&self) -> Option<LineRange> {
        (self.divider - self.start > 1).then(|| LineRange::new(self.start + 1, self.divider - 1))
    }

    /// Body lines between divider and end, if any.
    pub fn incoming_side(&self) -> Option<LineRange> {
        (self.end - self.divider > 1).then(|| LineRange::new(self.divider + 1, self.end - 1))
    }
}

impl std::fmt::Display for ConflictBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "start {}, divider {}, end {}",
            self.start, self.divider, self.end
        )
    }
}

// ---------------------------------------------------------------------------
// Locator
// ---------------------------------------------------------------------------

/// Stateless, read-only conflict locator.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConflictLocator {
    markers: ConflictMarkers,
}

impl ConflictLocator {
    pub fn new(divider: DividerGrammar) -> Self {
        Self {
            markers: ConflictMarkers::new(divider),
        }
    }

    pub fn markers(&self) -> &ConflictMarkers {
        &self.markers
    }

    /// Find the conflict block containing `reference_line`.
    ///
    /// Returns `None` when no start marker exists at or above the line, no
    /// end marker exists at or below it, no divider lies between them, or
    /// the three found indices are out of order.
    pub fn locate<B>(&self, buffer: &B, reference_line: usize) -> Option<ConflictBlock>
    where
        B: LineBuffer + ?Sized,
    {
        let line_count = buffer.line_count();
        if reference_line >= line_count {
            trace!(reference_line, line_count, "reference line outside buffer");
            return None;
        }

        let start = (0..=reference_line)
            .rev()
            .find(|&i| buffer.line(i).is_some_and(|l| self.markers.is_start(l)))?;

        let end = (reference_line..line_count)
            .find(|&i| buffer.line(i).is_some_and(|l| self.markers.is_end(l)))?;

        let divider = (start..=end)
            .find(|&i| buffer.line(i).is_some_and(|l| self.markers.is_divider(l)))?;

        match ConflictBlock::new(start, divider, end) {
            Ok(block) => {
                debug!(reference_line, %block, "located conflict block");
                Some(block)
            }
            Err(e) => {
                debug!(reference_line, error = %e, "discarding out-of-order markers");
                None
            }
        }
    }

    /// Like [`locate`](Self::locate), reporting the miss as an error.
    pub fn require<B>(&self, buffer: &B, reference_line: usize) -> Result<ConflictBlock, ConflictError>
    where
        B: LineBuffer + ?Sized,
    {
        self.locate(buffer, reference_line)
            .ok_or(ConflictError::NotFound {
                line: reference_line,
            })
    }

    /// Every well-formed block in the buffer, top to bottom.
    pub fn find_all<B>(&self, buffer: &B) -> Vec<ConflictBlock>
    where
        B: LineBuffer + ?Sized,
    {
        let mut blocks = Vec::new();
        let mut line = 0;
        while line < buffer.line_count() {
            let is_start = buffer.line(line).is_some_and(|l| self.markers.is_start(l));
            if is_start {
                if let Some(block) = self.locate(buffer, line) {
                    if block.start == line {
                        blocks.push(block);
                        line = block.end + 1;
                        continue;
                    }
                }
            }
            line += 1;
        }
        debug!(count = blocks.len(), "scanned buffer for conflict blocks");
        blocks
    }

    /// The first marker line strictly after `after_line`, wrapping to the top
    /// of the buffer when none follows.
    pub fn next_marker<B>(&self, buffer: &B, after_line: usize) -> Option<(usize, MarkerKind)>
    where
        B: LineBuffer + ?Sized,
    {
        let line_count = buffer.line_count();
        let first = after_line.saturating_add(1).min(line_count);
        (first..line_count)
            .chain(0..first)
            .find_map(|i| buffer.line(i).and_then(|l| self.markers.classify(l)).map(|k| (i, k)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(text: &[&str]) -> Vec<String> {
        text.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Vec<String> {
        lines(&[
            "x",
            "<<<<<<< HEAD",
            "foo",
            "=======",
            "bar",
            ">>>>>>> feature",
            "y",
        ])
    }

    #[test]
    fn test_locate_from_every_block_line() {
        let buf = sample();
        let locator = ConflictLocator::default();
        let expected = ConflictBlock::new(1, 3, 5).unwrap();
        for line in 1..=5 {
            assert_eq!(locator.locate(&buf, line), Some(expected), "line {}", line);
        }
    }

    #[test]
    fn test_locate_outside_block() {
        let buf = sample();
        let locator = ConflictLocator::default();
        assert_eq!(locator.locate(&buf, 0), None);
        assert_eq!(locator.locate(&buf, 6), None);
        assert_eq!(locator.locate(&buf, 99), None);
    }

    #[test]
    fn test_locate_no_markers() {
        let buf = lines(&["a", "b", "c"]);
        let locator = ConflictLocator::default();
        for line in 0..3 {
            assert_eq!(locator.locate(&buf, line), None);
        }
    }

    #[test]
    fn test_locate_missing_divider() {
        let buf = lines(&["<<<<<<< HEAD", "a", ">>>>>>> b"]);
        assert_eq!(ConflictLocator::default().locate(&buf, 1), None);
    }

    #[test]
    fn test_locate_on_end_and_divider_lines() {
        let buf = lines(&[
            "<<<<<<< HEAD",
            "a",
            "=======",
            "b",
            ">>>>>>> one",
            "between",
            "<<<<<<< HEAD",
            "c",
            "=======",
            "d",
            ">>>>>>> two",
        ]);
        let locator = ConflictLocator::default();
        // Line 4 is itself an end marker, so it closes the first block.
        assert_eq!(
            locator.locate(&buf, 4),
            Some(ConflictBlock::new(0, 2, 4).unwrap())
        );
        assert_eq!(
            locator.locate(&buf, 8),
            Some(ConflictBlock::new(6, 8, 10).unwrap())
        );
    }

    #[test]
    fn test_locate_between_blocks_brackets_outer_markers() {
        let buf = lines(&[
            "<<<<<<< HEAD",
            "a",
            "=======",
            "b",
            ">>>>>>> one",
            "between",
            "<<<<<<< HEAD",
            "c",
            "=======",
            "d",
            ">>>>>>> two",
        ]);
        // The two scans are independent: from a line between blocks they
        // reach the first start and the last end, and the first divider
        // keeps the triple ordered.
        assert_eq!(
            ConflictLocator::default().locate(&buf, 5),
            Some(ConflictBlock::new(0, 2, 10).unwrap())
        );
    }

    #[test]
    fn test_locate_divider_before_start_is_not_found() {
        // The divider scan starts at the start marker, so a divider that
        // only exists above it is never considered.
        let buf = lines(&["=======", "<<<<<<< HEAD", "a", ">>>>>>> b"]);
        assert_eq!(ConflictLocator::default().locate(&buf, 2), None);
    }

    #[test]
    fn test_locate_strict_divider() {
        let buf = lines(&["<<<<<<< HEAD", "a", "======= label", "b", ">>>>>>> x"]);
        assert!(ConflictLocator::new(DividerGrammar::Permissive)
            .locate(&buf, 1)
            .is_some());
        assert!(ConflictLocator::new(DividerGrammar::Strict)
            .locate(&buf, 1)
            .is_none());
    }

    #[test]
    fn test_empty_sides() {
        let buf = lines(&["<<<<<<< HEAD", "=======", ">>>>>>> x"]);
        let block = ConflictLocator::default().locate(&buf, 0).unwrap();
        assert_eq!(block.current_side(), None);
        assert_eq!(block.incoming_side(), None);

        let block = ConflictBlock::new(1, 3, 5).unwrap();
        assert_eq!(block.current_side(), Some(LineRange::single(2)));
        assert_eq!(block.incoming_side(), Some(LineRange::single(4)));
    }

    #[test]
    fn test_block_invariant() {
        assert!(ConflictBlock::new(1, 1, 3).is_err());
        assert!(ConflictBlock::new(3, 2, 1).is_err());
        assert!(matches!(
            ConflictBlock::new(0, 4, 4),
            Err(ConflictError::MalformedBlock { .. })
        ));
    }

    #[test]
    fn test_require_reports_line() {
        let buf = lines(&["plain"]);
        assert_eq!(
            ConflictLocator::default().require(&buf, 0),
            Err(ConflictError::NotFound { line: 0 })
        );
    }

    #[test]
    fn test_find_all() {
        let mut buf = sample();
        buf.extend(lines(&["<<<<<<< HEAD", "=======", "z", ">>>>>>> other"]));
        let blocks = ConflictLocator::default().find_all(&buf);
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0], ConflictBlock::new(1, 3, 5).unwrap());
        assert_eq!(blocks[1], ConflictBlock::new(7, 8, 10).unwrap());
    }

    #[test]
    fn test_next_marker_wraps() {
        let buf = sample();
        let locator = ConflictLocator::default();
        assert_eq!(locator.next_marker(&buf, 0), Some((1, MarkerKind::Start)));
        assert_eq!(locator.next_marker(&buf, 1), Some((3, MarkerKind::Divider)));
        assert_eq!(locator.next_marker(&buf, 5), Some((1, MarkerKind::Start)));
        assert_eq!(locator.next_marker(&lines(&["a"]), 0), None);
    }

    #[test]
    fn test_block_serializes_as_indices() {
        let block = ConflictBlock::new(1, 3, 5).unwrap();
        let json = serde_json::to_value(block).unwrap();
        assert_eq!(json, serde_json::json!({"start": 1, "divider": 3, "end": 5}));
    }
}
