//! Command registration and dispatch.
//!
//! A [`CommandRegistry`] is built once at startup, maps command identifiers
//! to the operations of this crate, and is torn down as a unit with
//! [`CommandRegistry::dispose`]. Each invocation receives an
//! [`EditorContext`] describing the active document and cursor, runs to
//! completion, and reports a [`CommandOutcome`] for the host to surface.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::buffer::{Selection, TextDocument};
use crate::checkmark::toggle_checkmark;
use crate::config::{AppConfig, NavigationConfig};
use crate::conflict::search::next_in_document;
use crate::conflict::{ConflictLocator, ConflictResolver, GitGrep};
use crate::errors::{CommandError, NavigationError};
use crate::navigator::{counterpart_file, find_build_file, FileSystem, OsFileSystem};

// ---------------------------------------------------------------------------
// Identifiers
// ---------------------------------------------------------------------------

pub const ACCEPT_CONFLICT_SIDE: &str = "mergeResolver.acceptConflictSide";
pub const REJECT_CONFLICT_SIDE: &str = "mergeResolver.rejectConflictSide";
pub const ACCEPT_BOTH_SIDES: &str = "mergeResolver.acceptBothConflictSides";
pub const REJECT_BOTH_SIDES: &str = "mergeResolver.rejectBothConflictSides";
pub const GO_NEXT_CONFLICT: &str = "mergeResolver.goNextConflict";
pub const TOGGLE_CHECKMARK: &str = "mergeResolver.toggleCheckmark";
pub const GO_BUILD_FILE: &str = "mergeResolver.goBuildFile";
pub const TOGGLE_HEADER_SOURCE: &str = "mergeResolver.toggleHeaderSource";

// User-facing messages.
const MSG_NO_CONFLICT: &str = "No conflict found at cursor.";
const MSG_INVALID_SELECTION: &str = "Invalid selection.";
const MSG_NO_MARKERS: &str = "No conflict markers found in the workspace.";
const MSG_NO_WORKSPACE: &str = "No workspace is open.";
const MSG_NO_CHECKMARK: &str = "No checkmark found in this line.";
const MSG_NO_BUILD_FILE: &str = "No BUILD file found in the search path.";
const MSG_NOT_SOURCE_OR_HEADER: &str = "Not a recognized C/C++ source or header file.";
const MSG_NO_COUNTERPART: &str = "No corresponding file found.";

// ---------------------------------------------------------------------------
// Context & outcome
// ---------------------------------------------------------------------------

/// The active editor state a command operates on.
#[derive(Debug)]
pub struct EditorContext<'a> {
    /// The document being edited.
    pub document: &'a mut TextDocument,
    /// Line of the caret.
    pub cursor_line: usize,
    /// Lines touched by the selection.
    pub selection: Selection,
    /// On-disk path of the document, if it has one.
    pub file_path: Option<PathBuf>,
    /// Root of the open workspace, if any.
    pub workspace_root: Option<PathBuf>,
}

impl<'a> EditorContext<'a> {
    /// A context with a caret on `cursor_line` and no paths.
    pub fn new(document: &'a mut TextDocument, cursor_line: usize) -> Self {
        Self {
            document,
            cursor_line,
            selection: Selection::caret(cursor_line),
            file_path: None,
            workspace_root: None,
        }
    }

    pub fn with_selection(mut self, selection: Selection) -> Self {
        self.selection = selection;
        self
    }

    pub fn with_file_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.file_path = Some(path.into());
        self
    }

    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }
}

/// What a command did, for the host to report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    /// The document was modified.
    Edited { description: String },
    /// Move the caret within the current document.
    Reveal { line: usize },
    /// Open another file, optionally at a line.
    Open { path: PathBuf, line: Option<usize> },
    /// Nothing changed; informational message.
    Info(String),
    /// Nothing changed; the user should be warned.
    Warning(String),
}

impl CommandOutcome {
    pub fn is_edit(&self) -> bool {
        matches!(self, Self::Edited { .. })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Operations a command identifier can be bound to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    ResolveSide { should_accept: bool },
    AcceptBoth,
    RejectBoth,
    GoNextConflict,
    ToggleCheckmark,
    GoBuildFile,
    ToggleHeaderSource,
}

/// Table of registered commands plus the collaborators they need.
pub struct CommandRegistry {
    commands: BTreeMap<&'static str, CommandKind>,
    locator: ConflictLocator,
    navigation: NavigationConfig,
    git_binary: Option<String>,
    fs: Box<dyn FileSystem + Send + Sync>,
    disposed: bool,
}

impl std::fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandRegistry")
            .field("commands", &self.commands.keys().collect::<Vec<_>>())
            .field("git_binary", &self.git_binary)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl CommandRegistry {
    /// Register every built-in command using `config`.
    pub fn with_defaults(config: &AppConfig) -> Self {
        let commands = BTreeMap::from([
            (ACCEPT_CONFLICT_SIDE, CommandKind::ResolveSide { should_accept: true }),
            (REJECT_CONFLICT_SIDE, CommandKind::ResolveSide { should_accept: false }),
            (ACCEPT_BOTH_SIDES, CommandKind::AcceptBoth),
            (REJECT_BOTH_SIDES, CommandKind::RejectBoth),
            (GO_NEXT_CONFLICT, CommandKind::GoNextConflict),
            (TOGGLE_CHECKMARK, CommandKind::ToggleCheckmark),
            (GO_BUILD_FILE, CommandKind::GoBuildFile),
            (TOGGLE_HEADER_SOURCE, CommandKind::ToggleHeaderSource),
        ]);
        info!(count = commands.len(), "registered commands");
        Self {
            commands,
            locator: ConflictLocator::new(config.conflict.divider),
            navigation: config.navigation.clone(),
            git_binary: Some(config.search.git_binary.clone()),
            fs: Box::new(OsFileSystem),
            disposed: false,
        }
    }

    /// Substitute the filesystem used for navigation.
    pub fn with_file_system(mut self, fs: impl FileSystem + Send + Sync + 'static) -> Self {
        self.fs = Box::new(fs);
        self
    }

    /// Restrict `goNextConflict` to the active document.
    pub fn without_project_search(mut self) -> Self {
        self.git_binary = None;
        self
    }

    /// Registered identifiers, sorted.
    pub fn command_ids(&self) -> Vec<&'static str> {
        self.commands.keys().copied().collect()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Unregister every command at once.
    pub fn dispose(&mut self) {
        info!(count = self.commands.len(), "disposing command registry");
        self.commands.clear();
        self.disposed = true;
    }

    /// Run the command registered as `id` against `ctx`.
    pub async fn execute(
        &self,
        id: &str,
        ctx: &mut EditorContext<'_>,
    ) -> Result<CommandOutcome, CommandError> {
        if self.disposed {
            return Err(CommandError::Disposed);
        }
        let kind = *self
            .commands
            .get(id)
            .ok_or_else(|| CommandError::UnknownCommand(id.to_string()))?;
        debug!(id, ?kind, cursor_line = ctx.cursor_line, "executing command");

        match kind {
            CommandKind::ResolveSide { should_accept } => self.resolve_side(ctx, should_accept),
            CommandKind::AcceptBoth => self.resolve_whole(ctx, true),
            CommandKind::RejectBoth => self.resolve_whole(ctx, false),
            CommandKind::GoNextConflict => self.go_next_conflict(ctx).await,
            CommandKind::ToggleCheckmark => self.toggle_checkmark(ctx),
            CommandKind::GoBuildFile => self.go_build_file(ctx, id),
            CommandKind::ToggleHeaderSource => self.toggle_header_source(ctx, id),
        }
    }

    // -----------------------------------------------------------------------
    // Handlers
    // -----------------------------------------------------------------------

    fn resolve_side(
        &self,
        ctx: &mut EditorContext<'_>,
        should_accept: bool,
    ) -> Result<CommandOutcome, CommandError> {
        let Some(block) = self.locator.locate(&*ctx.document, ctx.cursor_line) else {
            return Ok(CommandOutcome::Info(MSG_NO_CONFLICT.into()));
        };

        let resolution = match ConflictResolver::side_resolution(&block, ctx.selection, should_accept) {
            Ok(r) => r,
            Err(e) if e.is_invalid_selection() => {
                warn!(error = %e, "invalid selection");
                return Ok(CommandOutcome::Warning(MSG_INVALID_SELECTION.into()));
            }
            Err(e) => {
                warn!(error = %e, "could not resolve conflict side");
                return Ok(CommandOutcome::Warning(e.to_string()));
            }
        };

        let edit = ConflictResolver::edit_for(&block, resolution);
        ConflictResolver::apply(ctx.document, &edit)?;
        Ok(CommandOutcome::Edited {
            description: format!(
                "Resolved conflict at lines {}-{}: {}",
                block.start() + 1,
                block.end() + 1,
                resolution
            ),
        })
    }

    fn resolve_whole(
        &self,
        ctx: &mut EditorContext<'_>,
        keep_both: bool,
    ) -> Result<CommandOutcome, CommandError> {
        let Some(block) = self.locator.locate(&*ctx.document, ctx.cursor_line) else {
            return Ok(CommandOutcome::Info(MSG_NO_CONFLICT.into()));
        };

        let (edit, label) = if keep_both {
            (ConflictResolver::resolve_both(&block), "kept both sides")
        } else {
            (ConflictResolver::reject_both(&block), "removed both sides")
        };
        ConflictResolver::apply(ctx.document, &edit)?;
        Ok(CommandOutcome::Edited {
            description: format!(
                "Resolved conflict at lines {}-{}: {}",
                block.start() + 1,
                block.end() + 1,
                label
            ),
        })
    }

    async fn go_next_conflict(
        &self,
        ctx: &mut EditorContext<'_>,
    ) -> Result<CommandOutcome, CommandError> {
        if let Some(line) = next_in_document(&self.locator, &*ctx.document, ctx.cursor_line) {
            return Ok(CommandOutcome::Reveal { line });
        }

        let Some(git_binary) = &self.git_binary else {
            return Ok(CommandOutcome::Info(MSG_NO_MARKERS.into()));
        };
        let Some(root) = &ctx.workspace_root else {
            return Ok(CommandOutcome::Warning(MSG_NO_WORKSPACE.into()));
        };

        let search =
            GitGrep::new(git_binary.clone(), root.clone()).with_markers(*self.locator.markers());
        match search.first_marker().await? {
            Some(hit) => Ok(CommandOutcome::Open {
                path: hit.path,
                line: Some(hit.line),
            }),
            None => Ok(CommandOutcome::Info(MSG_NO_MARKERS.into())),
        }
    }

    fn toggle_checkmark(&self, ctx: &mut EditorContext<'_>) -> Result<CommandOutcome, CommandError> {
        let line = ctx.cursor_line;
        let Some(text) = ctx.document.lines().get(line) else {
            return Ok(CommandOutcome::Info(MSG_NO_CHECKMARK.into()));
        };
        let Some(edit) = toggle_checkmark(text) else {
            return Ok(CommandOutcome::Info(MSG_NO_CHECKMARK.into()));
        };

        let updated = edit.apply_to(text);
        ctx.document.replace_line(line, updated)?;
        Ok(CommandOutcome::Edited {
            description: format!(
                "Toggled {} to {} on line {}",
                edit.removed,
                edit.inserted,
                line + 1
            ),
        })
    }

    fn go_build_file(&self, ctx: &EditorContext<'_>, id: &str) -> Result<CommandOutcome, CommandError> {
        let file = ctx
            .file_path
            .as_deref()
            .ok_or_else(|| CommandError::MissingPath(id.to_string()))?;
        let Some(root) = ctx.workspace_root.as_deref() else {
            return Ok(CommandOutcome::Warning(MSG_NO_WORKSPACE.into()));
        };

        match find_build_file(&*self.fs, file, root, &self.navigation.build_file_names) {
            Ok(path) => Ok(CommandOutcome::Open { path, line: None }),
            Err(NavigationError::BuildFileNotFound(_)) => {
                Ok(CommandOutcome::Warning(MSG_NO_BUILD_FILE.into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn toggle_header_source(
        &self,
        ctx: &EditorContext<'_>,
        id: &str,
    ) -> Result<CommandOutcome, CommandError> {
        let file = ctx
            .file_path
            .as_deref()
            .ok_or_else(|| CommandError::MissingPath(id.to_string()))?;

        match counterpart_file(
            &*self.fs,
            file,
            &self.navigation.header_extensions,
            &self.navigation.source_extensions,
        ) {
            Ok(path) => Ok(CommandOutcome::Open { path, line: None }),
            Err(NavigationError::UnrecognizedExtension(_)) => {
                Ok(CommandOutcome::Warning(MSG_NOT_SOURCE_OR_HEADER.into()))
            }
            Err(NavigationError::CounterpartNotFound(_)) => {
                Ok(CommandOutcome::Warning(MSG_NO_COUNTERPART.into()))
            }
            Err(e) => Err(e.into()),
        }
    }
}
