//! Conflict-marker grammar.
//!
//! Markers are line-anchored and case-sensitive:
//!
//! | Marker | Pattern |
//! |--------|---------|
//! | start | `^<<<<<<<\s*(.*)$` |
//! | divider (strict) | `^=======$` |
//! | divider (permissive) | `^=======\s*(.*)$` |
//! | end | `^>>>>>>>\s*(.*)$` |

use std::sync::LazyLock;

use regex_lite::Regex;
use serde::{Deserialize, Serialize};

static START_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^<<<<<<<\s*(.*)$").expect("start marker pattern is valid"));

static DIVIDER_STRICT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^=======$").expect("strict divider pattern is valid"));

static DIVIDER_PERMISSIVE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^=======\s*(.*)$").expect("permissive divider pattern is valid")
});

static END_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^>>>>>>>\s*(.*)$").expect("end marker pattern is valid"));

/// `git grep -E` equivalents of the patterns above, one per divider grammar.
const GREP_STRICT_PATTERN: &str = "^(<{7}|={7}$|>{7})";
const GREP_PERMISSIVE_PATTERN: &str = "^(<{7}|={7}|>{7})";

/// How much trailing text a divider line may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DividerGrammar {
    /// Exactly `=======` and nothing else.
    Strict,
    /// `=======` followed by optional whitespace and label text.
    #[default]
    Permissive,
}

impl std::fmt::Display for DividerGrammar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Permissive => write!(f, "permissive"),
        }
    }
}

impl std::str::FromStr for DividerGrammar {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "strict" => Ok(Self::Strict),
            "permissive" => Ok(Self::Permissive),
            other => Err(format!(
                "unknown divider grammar '{}': use 'strict' or 'permissive'",
                other
            )),
        }
    }
}

/// Which kind of marker a line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkerKind {
    Start,
    Divider,
    End,
}

impl std::fmt::Display for MarkerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Start => write!(f, "start"),
            Self::Divider => write!(f, "divider"),
            Self::End => write!(f, "end"),
        }
    }
}

/// Marker matcher parameterised by divider strictness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConflictMarkers {
    divider: DividerGrammar,
}

impl ConflictMarkers {
    pub fn new(divider: DividerGrammar) -> Self {
        Self { divider }
    }

    pub fn divider_grammar(&self) -> DividerGrammar {
        self.divider
    }

    pub fn is_start(&self, line: &str) -> bool {
        START_PATTERN.is_match(line)
    }

    pub fn is_divider(&self, line: &str) -> bool {
        match self.divider {
            DividerGrammar::Strict => DIVIDER_STRICT_PATTERN.is_match(line),
            DividerGrammar::Permissive => DIVIDER_PERMISSIVE_PATTERN.is_match(line),
        }
    }

    pub fn is_end(&self, line: &str) -> bool {
        END_PATTERN.is_match(line)
    }

    /// Classify `line`, if it is a marker at all.
    pub fn classify(&self, line: &str) -> Option<MarkerKind> {
        if self.is_start(line) {
            Some(MarkerKind::Start)
        } else if self.is_divider(line) {
            Some(MarkerKind::Divider)
        } else if self.is_end(line) {
            Some(MarkerKind::End)
        } else {
            None
        }
    }

    /// Extended regular expression matching exactly the lines
    /// [`classify`](Self::classify) accepts, for `git grep -E`.
    pub fn grep_pattern(&self) -> &'static str {
        match self.divider {
            DividerGrammar::Strict => GREP_STRICT_PATTERN,
            DividerGrammar::Permissive => GREP_PERMISSIVE_PATTERN,
        }
    }

    /// The label following a start or end marker (`HEAD`, a branch name...).
    pub fn label<'a>(&self, line: &'a str) -> Option<&'a str> {
        START_PATTERN
            .captures(line)
            .or_else(|| END_PATTERN.captures(line))
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
    }
}
