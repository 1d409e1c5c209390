//! Conflict location, resolution, and search.
//!
//! The conflict subsystem is responsible for:
//! 1. **Markers** -- recognising `<<<<<<<`, `=======`, and `>>>>>>>` lines.
//! 2. **Location** -- finding the block that encloses a reference line.
//! 3. **Resolution** -- turning a block and a selection into line deletions.
//! 4. **Search** -- finding the next marker in a buffer or a repository.

pub mod locator;
pub mod markers;
pub mod resolver;
pub mod search;

pub use locator::{ConflictBlock, ConflictLocator};
pub use markers::{ConflictMarkers, DividerGrammar, MarkerKind};
pub use resolver::{ConflictResolver, Resolution, Side};
pub use search::{ConflictHit, GitGrep};
