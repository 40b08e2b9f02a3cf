//! services/api/src/adapters/content_store.rs
//!
//! Filesystem implementation of the `ContentStore` port: a live content tree
//! plus a parallel backup mirror, with the backup/restore policy and the
//! listing fallback living here. All paths are resolved once at construction;
//! handlers never build paths themselves.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use copilot_core::domain::{
    has_allowed_extension, BackupReport, Category, CompletionMarker, DebugSnapshot, FileEntry,
    GeneratedFile, RestoreReport, TextPreview, UserConfig,
};
use copilot_core::ports::{ContentStore, PortError, PortResult};
use tracing::{info, warn};

const CURRICULUM_FILE: &str = "curriculum.pdf";
const CONFIG_FILE: &str = "user_config.json";
const MARKER_FILE: &str = "generation_complete.json";

/// The File Store backed by two on-disk trees. Construction creates both
/// roots and every category subdirectory so later operations never have to
/// care whether a directory exists.
pub struct FsContentStore {
    root: PathBuf,
    backup: PathBuf,
}

impl FsContentStore {
    pub fn new(root: impl Into<PathBuf>, backup: impl Into<PathBuf>) -> std::io::Result<Self> {
        let store = Self {
            root: root.into(),
            backup: backup.into(),
        };
        std::fs::create_dir_all(&store.root)?;
        std::fs::create_dir_all(&store.backup)?;
        for category in Category::ALL {
            std::fs::create_dir_all(store.category_dir(category))?;
            std::fs::create_dir_all(store.backup_category_dir(category))?;
        }
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.dir_name())
    }

    fn backup_category_dir(&self, category: Category) -> PathBuf {
        self.backup.join(category.dir_name())
    }

    fn curriculum_path(&self) -> PathBuf {
        self.root.join(CURRICULUM_FILE)
    }

    fn config_path(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    fn marker_path(&self) -> PathBuf {
        self.root.join(MARKER_FILE)
    }

    /// Builds a `FileEntry` from a path, or `None` when it is not a regular
    /// file or its metadata cannot be read.
    async fn entry_for(path: &Path) -> Option<FileEntry> {
        let meta = tokio::fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let name = path.file_name()?.to_str()?.to_string();
        let modified: DateTime<Utc> = meta.modified().ok()?.into();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| format!(".{}", e.to_ascii_lowercase()))
            .unwrap_or_default();
        Some(FileEntry {
            name,
            size: meta.len(),
            modified,
            ext,
        })
    }

    /// Lists the regular files in one directory, applying `filter` to the
    /// file name. Unreadable entries are skipped.
    async fn list_dir(dir: &Path, filter: fn(&str) -> bool) -> Vec<FileEntry> {
        let mut entries = Vec::new();
        let Ok(mut read_dir) = tokio::fs::read_dir(dir).await else {
            return entries;
        };
        while let Ok(Some(item)) = read_dir.next_entry().await {
            let path = item.path();
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if !filter(name) {
                    continue;
                }
            }
            if let Some(entry) = Self::entry_for(&path).await {
                entries.push(entry);
            }
        }
        entries
    }

    /// The shared listing contract: read the live directory; when it yields
    /// nothing, fall back to the mirror, copying each mirrored file back
    /// into the live directory so subsequent listings see it without
    /// re-checking the backup. Both-empty is an empty listing.
    async fn list_with_fallback(
        &self,
        live: &Path,
        mirror: &Path,
        filter: fn(&str) -> bool,
    ) -> Vec<FileEntry> {
        let mut entries = Self::list_dir(live, filter).await;

        if entries.is_empty() {
            info!(
                "No files in {}, checking backup at {}",
                live.display(),
                mirror.display()
            );
            for entry in Self::list_dir(mirror, filter).await {
                let src = mirror.join(&entry.name);
                let dst = live.join(&entry.name);
                match tokio::fs::copy(&src, &dst).await {
                    Ok(_) => entries.push(entry),
                    Err(e) => {
                        warn!("Error restoring backup file {}: {}", entry.name, e);
                    }
                }
            }
        }

        entries.sort_by(|a, b| b.modified.cmp(&a.modified));
        entries
    }

    /// Copies every regular file in `src_dir` into `dst_dir`, applying
    /// `filter` to the file name. Failures are logged and counted, never
    /// raised; one bad file must not abort the rest.
    async fn copy_dir_files(
        src_dir: &Path,
        dst_dir: &Path,
        filter: fn(&str) -> bool,
        copied: &mut usize,
        failed: &mut usize,
    ) {
        for entry in Self::list_dir(src_dir, filter).await {
            let src = src_dir.join(&entry.name);
            let dst = dst_dir.join(&entry.name);
            match tokio::fs::copy(&src, &dst).await {
                Ok(_) => *copied += 1,
                Err(e) => {
                    warn!("Failed to copy {} to {}: {}", src.display(), dst.display(), e);
                    *failed += 1;
                }
            }
        }
    }

    /// True when the tree contains at least one regular file, at any depth.
    fn tree_has_files(root: &Path) -> bool {
        walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file())
    }

    fn tree_file_list(root: &Path) -> Vec<String> {
        let mut files: Vec<String> = walkdir::WalkDir::new(root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                e.path()
                    .strip_prefix(root)
                    .ok()
                    .map(|p| p.to_string_lossy().to_string())
            })
            .collect();
        files.sort();
        files
    }

    /// Collects every `.txt` file in `dir` as a preview candidate.
    async fn txt_candidates(dir: &Path, out: &mut Vec<(PathBuf, DateTime<Utc>)>) {
        for entry in Self::list_dir(dir, |name| name.to_ascii_lowercase().ends_with(".txt")).await
        {
            out.push((dir.join(&entry.name), entry.modified));
        }
    }
}

fn any_name(_name: &str) -> bool {
    true
}

#[async_trait]
impl ContentStore for FsContentStore {
    async fn save_curriculum(&self, data: &[u8]) -> PortResult<()> {
        let path = self.curriculum_path();
        // Replace by delete-then-write; files are never mutated in place.
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        }
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        info!("Curriculum PDF saved: {}", path.display());
        Ok(())
    }

    async fn curriculum_exists(&self) -> bool {
        self.curriculum_path().is_file()
    }

    async fn save_user_config(&self, config: &UserConfig) -> PortResult<()> {
        let json = serde_json::to_vec_pretty(config)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(self.config_path(), json)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        info!("User config saved: {}", self.config_path().display());
        Ok(())
    }

    async fn load_user_config(&self) -> PortResult<Option<UserConfig>> {
        let raw = match tokio::fs::read(self.config_path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(e.to_string())),
        };
        let config = serde_json::from_slice(&raw)
            .map_err(|e| PortError::Unexpected(format!("Corrupt user config: {e}")))?;
        Ok(Some(config))
    }

    async fn clear_completion_marker(&self) -> PortResult<()> {
        match tokio::fs::remove_file(self.marker_path()).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            // Clearing the marker is preparatory; a failure here must not
            // block the generation attempt itself.
            Err(e) => warn!("Failed clearing {}: {}", MARKER_FILE, e),
        }
        Ok(())
    }

    async fn write_completion_marker(&self, marker: &CompletionMarker) -> PortResult<()> {
        let json =
            serde_json::to_vec(marker).map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(self.marker_path(), json)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn load_completion_marker(&self) -> PortResult<Option<CompletionMarker>> {
        let raw = match tokio::fs::read(self.marker_path()).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            // The marker exists but cannot be read; report completion with
            // an unknown timestamp rather than failing the status call.
            Err(_) => {
                return Ok(Some(CompletionMarker {
                    completed: true,
                    completed_at: None,
                    files_generated: 0,
                    backup_created: false,
                }))
            }
        };
        match serde_json::from_slice(&raw) {
            Ok(marker) => Ok(Some(marker)),
            Err(_) => Ok(Some(CompletionMarker {
                completed: true,
                completed_at: None,
                files_generated: 0,
                backup_created: false,
            })),
        }
    }

    async fn list_category(&self, category: Category) -> PortResult<Vec<FileEntry>> {
        let live = self.category_dir(category);
        let mirror = self.backup_category_dir(category);
        Ok(self.list_with_fallback(&live, &mirror, any_name).await)
    }

    async fn list_root(&self) -> PortResult<Vec<FileEntry>> {
        Ok(self
            .list_with_fallback(&self.root, &self.backup, has_allowed_extension)
            .await)
    }

    async fn read_file(&self, category: Category, name: &str) -> PortResult<Vec<u8>> {
        let path = self.category_dir(category).join(name);
        match tokio::fs::read(&path).await {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(PortError::NotFound("File not found".to_string()))
            }
            Err(e) => Err(PortError::Unexpected(e.to_string())),
        }
    }

    async fn preview_text(&self) -> PortResult<Option<TextPreview>> {
        let mut candidates = Vec::new();
        Self::txt_candidates(&self.category_dir(Category::CourseMaterial), &mut candidates)
            .await;
        Self::txt_candidates(&self.root, &mut candidates).await;

        let Some((path, _)) = candidates
            .into_iter()
            .max_by_key(|(_, modified)| *modified)
        else {
            return Ok(None);
        };

        // Generated text is not guaranteed to be clean UTF-8; decode lossily
        // rather than failing the preview.
        let raw = tokio::fs::read(&path)
            .await
            .map_err(|e| PortError::Unexpected(format!("Failed to read preview: {e}")))?;
        let preview = String::from_utf8_lossy(&raw).into_owned();
        let file = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        Ok(Some(TextPreview {
            file,
            path: path.display().to_string(),
            preview,
        }))
    }

    async fn scan_generated(&self) -> PortResult<Vec<GeneratedFile>> {
        let mut found = Vec::new();
        let mut dirs = vec![self.root.clone()];
        dirs.extend(Category::ALL.iter().map(|c| self.category_dir(*c)));
        for dir in dirs {
            for entry in Self::list_dir(&dir, has_allowed_extension).await {
                let path = dir.join(&entry.name);
                found.push(GeneratedFile {
                    name: entry.name,
                    path: path.display().to_string(),
                    size: entry.size,
                });
            }
        }
        Ok(found)
    }

    async fn backup_all(&self) -> BackupReport {
        info!("Creating backup of generated files...");
        let mut copied = 0;
        let mut failed = 0;
        for category in Category::ALL {
            Self::copy_dir_files(
                &self.category_dir(category),
                &self.backup_category_dir(category),
                any_name,
                &mut copied,
                &mut failed,
            )
            .await;
        }
        // Root-level singletons: only recognized content extensions are
        // mirrored, which leaves the config and marker JSON behind.
        Self::copy_dir_files(
            &self.root,
            &self.backup,
            has_allowed_extension,
            &mut copied,
            &mut failed,
        )
        .await;
        info!("Backup finished: {} copied, {} failed", copied, failed);
        BackupReport { copied, failed }
    }

    async fn restore_if_empty(&self) -> RestoreReport {
        let live_has_files = Self::tree_has_files(&self.root);
        let backup_has_files = Self::tree_has_files(&self.backup);

        // Not a two-way sync: any live content at all, even a single stray
        // file, skips the whole-tree restore.
        if live_has_files || !backup_has_files {
            return RestoreReport::default();
        }

        info!("File Store is empty, restoring from backup...");
        let mut copied = 0;
        let mut failed = 0;
        for category in Category::ALL {
            Self::copy_dir_files(
                &self.backup_category_dir(category),
                &self.category_dir(category),
                any_name,
                &mut copied,
                &mut failed,
            )
            .await;
        }
        Self::copy_dir_files(
            &self.backup,
            &self.root,
            has_allowed_extension,
            &mut copied,
            &mut failed,
        )
        .await;
        info!("Restore finished: {} copied, {} failed", copied, failed);
        RestoreReport {
            restored: true,
            copied,
            failed,
        }
    }

    async fn debug_snapshot(&self) -> DebugSnapshot {
        DebugSnapshot {
            store_files: Self::tree_file_list(&self.root),
            backup_files: Self::tree_file_list(&self.backup),
            config_exists: self.config_path().is_file(),
            curriculum_exists: self.curriculum_path().is_file(),
            marker_exists: self.marker_path().is_file(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn new_store() -> (tempfile::TempDir, FsContentStore) {
        let dir = tempfile::tempdir().unwrap();
        let store =
            FsContentStore::new(dir.path().join("content"), dir.path().join("backup")).unwrap();
        (dir, store)
    }

    async fn write(path: &Path, content: &str) {
        tokio::fs::write(path, content).await.unwrap();
    }

    #[tokio::test]
    async fn construction_creates_both_trees() {
        let (_dir, store) = new_store();
        for category in Category::ALL {
            assert!(store.category_dir(category).is_dir());
            assert!(store.backup_category_dir(category).is_dir());
        }
    }

    #[tokio::test]
    async fn backup_copies_category_files_and_is_idempotent() {
        let (_dir, store) = new_store();
        write(
            &store.category_dir(Category::Quizzes).join("q1.txt"),
            "quiz one",
        )
        .await;

        let first = store.backup_all().await;
        assert_eq!(first, BackupReport { copied: 1, failed: 0 });
        let after_first = FsContentStore::tree_file_list(&store.backup);

        let second = store.backup_all().await;
        assert_eq!(second, BackupReport { copied: 1, failed: 0 });
        let after_second = FsContentStore::tree_file_list(&store.backup);

        assert_eq!(after_first, after_second);
        let restored = tokio::fs::read_to_string(
            store.backup_category_dir(Category::Quizzes).join("q1.txt"),
        )
        .await
        .unwrap();
        assert_eq!(restored, "quiz one");
    }

    #[tokio::test]
    async fn backup_mirrors_only_allowed_extensions_at_root() {
        let (_dir, store) = new_store();
        write(&store.root().join("notes.txt"), "notes").await;
        write(&store.root().join("ignore.xyz"), "junk").await;

        let report = store.backup_all().await;
        assert_eq!(report.copied, 1);
        assert!(store.backup.join("notes.txt").is_file());
        assert!(!store.backup.join("ignore.xyz").exists());
    }

    #[tokio::test]
    async fn restore_populates_an_empty_store() {
        let (_dir, store) = new_store();
        write(
            &store.backup_category_dir(Category::Quizzes).join("q1.txt"),
            "quiz one",
        )
        .await;
        write(&store.backup.join("summary.pdf"), "pdf bytes").await;

        let report = store.restore_if_empty().await;
        assert!(report.restored);
        assert_eq!(report.copied, 2);
        assert!(store.category_dir(Category::Quizzes).join("q1.txt").is_file());
        assert!(store.root().join("summary.pdf").is_file());
    }

    #[tokio::test]
    async fn restore_is_skipped_when_store_has_any_file() {
        let (_dir, store) = new_store();
        write(
            &store.backup_category_dir(Category::Quizzes).join("q1.txt"),
            "quiz one",
        )
        .await;
        // One stray file anywhere in the live tree blocks the restore.
        write(
            &store.category_dir(Category::Ppts).join("stray.pptx"),
            "deck",
        )
        .await;

        let report = store.restore_if_empty().await;
        assert!(!report.restored);
        assert_eq!(report.copied, 0);
        assert!(!store.category_dir(Category::Quizzes).join("q1.txt").exists());
    }

    #[tokio::test]
    async fn restore_is_skipped_when_backup_is_empty() {
        let (_dir, store) = new_store();
        let report = store.restore_if_empty().await;
        assert!(!report.restored);
    }

    #[tokio::test]
    async fn listing_falls_back_to_backup_and_heals_the_live_directory() {
        let (_dir, store) = new_store();
        write(
            &store.backup_category_dir(Category::Quizzes).join("q1.txt"),
            "quiz one",
        )
        .await;

        let listed = store.list_category(Category::Quizzes).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "q1.txt");
        assert_eq!(listed[0].ext, ".txt");

        // The read healed the live tree; the next listing must not need the
        // backup.
        assert!(store.category_dir(Category::Quizzes).join("q1.txt").is_file());
        let again = store.list_category(Category::Quizzes).await.unwrap();
        assert_eq!(again.len(), 1);
    }

    #[tokio::test]
    async fn listing_both_empty_is_empty_not_an_error() {
        let (_dir, store) = new_store();
        let listed = store.list_category(Category::Flashcards).await.unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn root_listing_ignores_unrecognized_extensions() {
        let (_dir, store) = new_store();
        write(&store.root().join("summary.docx"), "doc").await;
        write(&store.root().join("state.json"), "{}").await;

        let listed = store.list_root().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "summary.docx");
    }

    #[tokio::test]
    async fn curriculum_upload_replaces_previous_file() {
        let (_dir, store) = new_store();
        store.save_curriculum(b"first").await.unwrap();
        store.save_curriculum(b"second").await.unwrap();
        assert!(store.curriculum_exists().await);
        let data = tokio::fs::read(store.curriculum_path()).await.unwrap();
        assert_eq!(data, b"second");
    }

    #[tokio::test]
    async fn user_config_round_trips_and_is_absent_initially() {
        let (_dir, store) = new_store();
        assert!(store.load_user_config().await.unwrap().is_none());

        let config = UserConfig {
            user_name: "Ada".to_string(),
            user_id: "u-1".to_string(),
            course_topic: "Machine Learning".to_string(),
            difficulty_level: "intermediate".to_string(),
            duration: 8,
            teaching_style: "socratic".to_string(),
            created_at: Utc::now(),
            curriculum_file: "curriculum.pdf".to_string(),
        };
        store.save_user_config(&config).await.unwrap();
        let loaded = store.load_user_config().await.unwrap().unwrap();
        assert_eq!(loaded.course_topic, "Machine Learning");
        assert_eq!(loaded.duration, 8);
    }

    #[tokio::test]
    async fn marker_lifecycle_clear_write_read() {
        let (_dir, store) = new_store();
        // Clearing a missing marker is fine.
        store.clear_completion_marker().await.unwrap();
        assert!(store.load_completion_marker().await.unwrap().is_none());

        let marker = CompletionMarker {
            completed: true,
            completed_at: Some(Utc::now()),
            files_generated: 3,
            backup_created: true,
        };
        store.write_completion_marker(&marker).await.unwrap();
        let loaded = store.load_completion_marker().await.unwrap().unwrap();
        assert!(loaded.completed);
        assert_eq!(loaded.files_generated, 3);

        store.clear_completion_marker().await.unwrap();
        assert!(store.load_completion_marker().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_marker_still_reads_as_completed() {
        let (_dir, store) = new_store();
        write(&store.marker_path(), "not json").await;
        let loaded = store.load_completion_marker().await.unwrap().unwrap();
        assert!(loaded.completed);
        assert!(loaded.completed_at.is_none());
    }

    #[tokio::test]
    async fn scan_generated_covers_root_and_all_categories() {
        let (_dir, store) = new_store();
        write(&store.root().join("overview.txt"), "o").await;
        write(
            &store.category_dir(Category::Quizzes).join("q1.txt"),
            "q",
        )
        .await;
        write(
            &store.category_dir(Category::Ppts).join("deck.pptx"),
            "p",
        )
        .await;
        write(&store.root().join("state.json"), "{}").await;

        let found = store.scan_generated().await.unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|f| !f.name.ends_with(".json")));
    }

    #[tokio::test]
    async fn preview_prefers_newest_course_material_txt() {
        let (_dir, store) = new_store();
        write(&store.root().join("root.txt"), "root text").await;
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        write(
            &store
                .category_dir(Category::CourseMaterial)
                .join("week1.txt"),
            "week one",
        )
        .await;

        let preview = store.preview_text().await.unwrap().unwrap();
        assert_eq!(preview.file, "week1.txt");
        assert_eq!(preview.preview, "week one");
    }

    #[tokio::test]
    async fn preview_decodes_invalid_utf8_lossily() {
        let (_dir, store) = new_store();
        tokio::fs::write(
            store.category_dir(Category::CourseMaterial).join("week1.txt"),
            [0xff, 0xfe, b'h', b'i'],
        )
        .await
        .unwrap();

        let preview = store.preview_text().await.unwrap().unwrap();
        assert_eq!(preview.file, "week1.txt");
        assert!(preview.preview.ends_with("hi"));
        assert!(preview.preview.contains('\u{FFFD}'));
    }

    #[tokio::test]
    async fn preview_is_none_when_no_txt_exists() {
        let (_dir, store) = new_store();
        write(&store.root().join("summary.pdf"), "pdf").await;
        assert!(store.preview_text().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn read_file_missing_is_not_found() {
        let (_dir, store) = new_store();
        let err = store
            .read_file(Category::Quizzes, "nope.txt")
            .await
            .unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
