//! crates/copilot_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any storage layout or HTTP framing.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::ports::{PortError, PortResult};

/// File extensions that the store considers content; anything else is
/// invisible to listing, backup and restore at the store root.
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["txt", "docx", "pdf", "pptx"];

/// Extensions that identify a course when scanning course material.
pub const COURSE_EXTENSIONS: [&str; 3] = ["txt", "docx", "pdf"];

/// One of the four fixed content categories.
///
/// Each category maps both ways between its external token (used in URLs)
/// and its subdirectory name on disk. The two differ only for course
/// material ("course-material" vs "course material").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    CourseMaterial,
    Quizzes,
    Ppts,
    Flashcards,
}

impl Category {
    /// Canonical iteration order, used everywhere a per-category pass runs.
    pub const ALL: [Category; 4] = [
        Category::CourseMaterial,
        Category::Quizzes,
        Category::Ppts,
        Category::Flashcards,
    ];

    /// The external token, as it appears in request paths.
    pub fn token(&self) -> &'static str {
        match self {
            Category::CourseMaterial => "course-material",
            Category::Quizzes => "quizzes",
            Category::Ppts => "ppts",
            Category::Flashcards => "flashcards",
        }
    }

    /// The subdirectory name under both the File Store and the Backup Mirror.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::CourseMaterial => "course material",
            Category::Quizzes => "quizzes",
            Category::Ppts => "ppts",
            Category::Flashcards => "flashcards",
        }
    }

    /// Resolves an external token. Anything outside the four known tokens
    /// is rejected; this mapping is total over its domain.
    pub fn from_token(token: &str) -> PortResult<Category> {
        match token {
            "course-material" => Ok(Category::CourseMaterial),
            "quizzes" => Ok(Category::Quizzes),
            "ppts" => Ok(Category::Ppts),
            "flashcards" => Ok(Category::Flashcards),
            other => Err(PortError::InvalidInput(format!(
                "Invalid category: {other}"
            ))),
        }
    }
}

/// Returns true when `name` carries one of the allowed content extensions.
pub fn has_allowed_extension(name: &str) -> bool {
    extension_of(name)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

/// Returns true when `name` carries an extension that identifies a course.
pub fn has_course_extension(name: &str) -> bool {
    extension_of(name)
        .map(|ext| COURSE_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// A single file as reported by a listing operation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    pub modified: DateTime<Utc>,
    /// Lowercased extension including the leading dot, e.g. ".txt".
    pub ext: String,
}

impl FileEntry {
    /// The base name without its extension.
    pub fn stem(&self) -> &str {
        Path::new(&self.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(&self.name)
    }
}

/// The singleton user configuration written alongside a curriculum upload.
/// Exactly one instance exists at a time; last write wins.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserConfig {
    pub user_name: String,
    pub user_id: String,
    pub course_topic: String,
    pub difficulty_level: String,
    /// Course duration in weeks.
    pub duration: u32,
    pub teaching_style: String,
    pub created_at: DateTime<Utc>,
    pub curriculum_file: String,
}

/// The singleton marker signaling that the most recent generation run
/// finished and its output was backed up. Cleared at the start of every
/// generation attempt and rewritten only on detected success.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CompletionMarker {
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub files_generated: usize,
    #[serde(default)]
    pub backup_created: bool,
}

/// A file discovered by the post-generation scan.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct GeneratedFile {
    pub name: String,
    pub path: String,
    pub size: u64,
}

/// Outcome of a backup pass. Per-file failures are counted rather than
/// surfaced; backup is best-effort and must not abort the caller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupReport {
    pub copied: usize,
    pub failed: usize,
}

/// Outcome of a whole-tree restore check. `restored` is false when the
/// File Store held any file at all, or the Backup Mirror held none.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreReport {
    pub restored: bool,
    pub copied: usize,
    pub failed: usize,
}

/// Captured result of one external generation run.
#[derive(Debug, Clone, Copy)]
pub struct ScriptOutcome {
    /// Process exit code; `None` when the process was killed by a signal.
    pub exit_code: Option<i32>,
}

/// Text preview of the most recent plain-text course material file.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TextPreview {
    pub file: String,
    pub path: String,
    pub preview: String,
}

/// Per-category file counts for one course.
#[derive(Debug, Clone, Copy, Default, Serialize, ToSchema)]
pub struct CategoryCounts {
    #[serde(rename = "course-material")]
    pub course_material: usize,
    pub quizzes: usize,
    pub ppts: usize,
    pub flashcards: usize,
}

impl CategoryCounts {
    pub fn bump(&mut self, category: Category) {
        match category {
            Category::CourseMaterial => self.course_material += 1,
            Category::Quizzes => self.quizzes += 1,
            Category::Ppts => self.ppts += 1,
            Category::Flashcards => self.flashcards += 1,
        }
    }
}

/// A derived course aggregate. Never persisted; rebuilt from listings on
/// every request.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CourseSummary {
    pub slug: String,
    pub title: String,
    pub updated: DateTime<Utc>,
    pub categories: CategoryCounts,
}

/// Recursive view of both trees plus the singleton flags, for diagnostics.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DebugSnapshot {
    pub store_files: Vec<String>,
    pub backup_files: Vec<String>,
    pub config_exists: bool,
    pub curriculum_exists: bool,
    pub marker_exists: bool,
}
