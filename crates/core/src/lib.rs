//! MergeResolver core library.
//!
//! This crate provides the components behind the MergeResolver commands:
//! a line-oriented text buffer, conflict-marker location and resolution,
//! repository-wide marker search, checkbox toggling, header/source and
//! build-file navigation, configuration, and the command registry that
//! binds them to command identifiers.

pub mod buffer;
pub mod checkmark;
pub mod commands;
pub mod config;
pub mod conflict;
pub mod errors;
pub mod navigator;

// Re-exports for convenience.
pub use buffer::{LineBuffer, LineEdit, LineRange, Selection, TextDocument};
pub use commands::{CommandOutcome, CommandRegistry, EditorContext};
pub use config::AppConfig;
pub use conflict::{ConflictBlock, ConflictLocator, ConflictResolver};
