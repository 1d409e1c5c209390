//! Checkbox toggling on a single line.
//!
//! Replacements are tried in a fixed order and only the first pattern that
//! occurs in the line is applied, at its first occurrence:
//!
//! | Found | Replaced with |
//! |-------|---------------|
//! | `[x]` | `[ ]` |
//! | `[]`  | `[x]` |
//! | `[ ]` | `[x]` |

use tracing::debug;

const REPLACEMENTS: [(&str, &str); 3] = [("[x]", "[ ]"), ("[]", "[x]"), ("[ ]", "[x]")];

/// A single in-line replacement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckmarkEdit {
    /// Byte offset of the replaced text.
    pub column: usize,
    pub removed: &'static str,
    pub inserted: &'static str,
}

impl CheckmarkEdit {
    /// Apply the replacement to the line it was computed from.
    pub fn apply_to(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len() + 1);
        out.push_str(&line[..self.column]);
        out.push_str(self.inserted);
        out.push_str(&line[self.column + self.removed.len()..]);
        out
    }
}

/// The replacement that toggles the checkbox on `line`, if there is one.
pub fn toggle_checkmark(line: &str) -> Option<CheckmarkEdit> {
    let edit = REPLACEMENTS.iter().find_map(|&(from, to)| {
        line.find(from).map(|column| CheckmarkEdit {
            column,
            removed: from,
            inserted: to,
        })
    });
    match &edit {
        Some(e) => debug!(column = e.column, from = e.removed, to = e.inserted, "toggling checkmark"),
        None => debug!("no checkmark on line"),
    }
    edit
}
