//! crates/copilot_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the
//! core to stay independent of the filesystem layout and of how the external
//! generation script is launched.

use async_trait::async_trait;

use crate::domain::{
    BackupReport, Category, CompletionMarker, DebugSnapshot, FileEntry, GeneratedFile,
    RestoreReport, ScriptOutcome, TextPreview, UserConfig,
};

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    InvalidInput(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

/// The File Store abstraction: a primary on-disk tree plus a structurally
/// identical Backup Mirror, constructed once at startup with resolved root
/// paths. The store is the only component permitted to copy between the two
/// trees, and nothing ever deletes from the mirror.
#[async_trait]
pub trait ContentStore: Send + Sync {
    // --- Curriculum (singleton PDF at the store root) ---

    /// Replaces the curriculum PDF, deleting any previous copy first.
    async fn save_curriculum(&self, data: &[u8]) -> PortResult<()>;

    async fn curriculum_exists(&self) -> bool;

    // --- User configuration (singleton record, last write wins) ---

    async fn save_user_config(&self, config: &UserConfig) -> PortResult<()>;

    /// Returns `None` when no configuration has been uploaded yet.
    async fn load_user_config(&self) -> PortResult<Option<UserConfig>>;

    // --- Completion marker (singleton record) ---

    /// Removes any prior marker so a new run cannot be mistaken for a
    /// finished one. Succeeds when no marker exists.
    async fn clear_completion_marker(&self) -> PortResult<()>;

    async fn write_completion_marker(&self, marker: &CompletionMarker) -> PortResult<()>;

    /// Returns `None` when no marker exists. A marker file that cannot be
    /// parsed still reads as completed, with an unknown timestamp.
    async fn load_completion_marker(&self) -> PortResult<Option<CompletionMarker>>;

    // --- Listing ---

    /// Lists a category directory, newest first. When the live directory is
    /// empty, falls back to the mirror: each mirrored file is copied back
    /// into the live directory and included in the result. Both trees empty
    /// is an empty listing, not an error.
    async fn list_category(&self, category: Category) -> PortResult<Vec<FileEntry>>;

    /// Lists allowed-extension files at the store root, newest first, with
    /// the same lazy mirror fallback as `list_category`.
    async fn list_root(&self) -> PortResult<Vec<FileEntry>>;

    /// Reads a file's bytes. The caller is responsible for rejecting names
    /// containing path separators before this is reached.
    async fn read_file(&self, category: Category, name: &str) -> PortResult<Vec<u8>>;

    /// The newest `.txt` file under course material, falling back to the
    /// store root; `None` when neither holds one.
    async fn preview_text(&self) -> PortResult<Option<TextPreview>>;

    /// Scans the store root and every category directory for
    /// allowed-extension files, as the post-generation success check.
    async fn scan_generated(&self) -> PortResult<Vec<GeneratedFile>>;

    // --- Backup / restore policy ---

    /// Copies every category file and every allowed-extension root file into
    /// the mirror, overwriting same-named files. Idempotent. Individual copy
    /// failures are counted and logged, never raised.
    async fn backup_all(&self) -> BackupReport;

    /// Whole-tree restore: only when the File Store is recursively empty of
    /// files and the mirror is not, copies the mirror's category files and
    /// allowed-extension root files back. Partial live content, even one
    /// stray file, skips the restore entirely.
    async fn restore_if_empty(&self) -> RestoreReport;

    /// Diagnostic view of both trees and the singleton files.
    async fn debug_snapshot(&self) -> DebugSnapshot;
}

/// The external generation script, treated as an opaque synchronous task
/// with a bounded execution time and a captured exit status.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Runs the script to completion or timeout. Spawn failure and timeout
    /// are `PortError::Unexpected`; a non-zero exit is not an error here,
    /// the caller decides what it means.
    async fn run(&self) -> PortResult<ScriptOutcome>;
}
