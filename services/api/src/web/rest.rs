//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use copilot_core::domain::{
    Category, CompletionMarker, CourseSummary, FileEntry, GeneratedFile, UserConfig,
};
use copilot_core::grouping;
use copilot_core::ports::PortError;
use serde::Serialize;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        root_handler,
        upload_curriculum_handler,
        generate_content_handler,
        status_handler,
        generation_status_handler,
        generated_files_handler,
        list_category_files_handler,
        download_handler,
        courses_handler,
        course_detail_handler,
        preview_handler,
        debug_info_handler,
    ),
    components(schemas(
        HealthResponse,
        UploadResponse,
        GenerateContentResponse,
        StatusResponse,
        GenerationStatusResponse,
        GeneratedFilesResponse,
        CategoryListingResponse,
        CoursesResponse,
        CourseDetailResponse,
        CourseFile,
        PreviewResponse,
        DebugInfoResponse,
    )),
    tags(
        (name = "Instructors Copilot API", description = "Curriculum upload, AI content generation, and course file serving.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    message: String,
}

/// The response payload sent after a successful curriculum upload.
#[derive(Serialize, ToSchema)]
pub struct UploadResponse {
    message: String,
    file_name: String,
    config: UserConfig,
}

/// The outcome of one generation run, returned on success and failure alike.
#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateContentResponse {
    message: String,
    generated_files: Vec<GeneratedFile>,
    total_files: usize,
    process_completed: bool,
    return_code: Option<i32>,
    backup_created: bool,
}

#[derive(Serialize, ToSchema)]
pub struct StatusResponse {
    config_uploaded: bool,
    curriculum_uploaded: bool,
    ready_for_generation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_config: Option<UserConfig>,
}

#[derive(Serialize, ToSchema)]
pub struct GenerationStatusResponse {
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

#[derive(Serialize, ToSchema)]
pub struct GeneratedFilesResponse {
    files: Vec<FileEntry>,
    total: usize,
}

/// Category listings never fail outright: an invalid category or a listing
/// error comes back as an empty result carrying an `error` field.
#[derive(Serialize, ToSchema)]
pub struct CategoryListingResponse {
    category: String,
    files: Vec<FileEntry>,
    total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct CoursesResponse {
    courses: Vec<CourseSummary>,
    total: usize,
}

/// A course file in the detail view, annotated with its download reference.
#[derive(Serialize, ToSchema)]
pub struct CourseFile {
    name: String,
    size: u64,
    modified: DateTime<Utc>,
    ext: String,
    download_url: String,
}

#[derive(Serialize, ToSchema)]
pub struct CourseDetailResponse {
    slug: String,
    title: String,
    course_material: Vec<CourseFile>,
    quizzes: Vec<CourseFile>,
    ppts: Vec<CourseFile>,
    flashcards: Vec<CourseFile>,
}

#[derive(Serialize, ToSchema)]
pub struct PreviewResponse {
    file: Option<String>,
    path: Option<String>,
    preview: String,
}

#[derive(Serialize, ToSchema)]
pub struct DebugInfoResponse {
    store_files: Vec<String>,
    backup_files: Vec<String>,
    categories: Vec<String>,
    config_exists: bool,
    curriculum_exists: bool,
    marker_exists: bool,
}

//=========================================================================================
// Helpers
//=========================================================================================

/// Filenames travel straight into a path join, so anything resembling a
/// path separator is rejected before the filesystem is touched.
pub fn is_safe_filename(name: &str) -> bool {
    !name.contains('/') && !name.contains('\\')
}

fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    error!("Internal error: {}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

fn course_files(entries: &[FileEntry], title: &str, category: Category) -> Vec<CourseFile> {
    grouping::files_with_title_prefix(entries, title)
        .into_iter()
        .map(|entry| CourseFile {
            download_url: format!("/download/{}/{}", category.token(), entry.name),
            name: entry.name,
            size: entry.size,
            modified: entry.modified,
            ext: entry.ext,
        })
        .collect()
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Health check. Also opportunistically restores the content tree from the
/// backup mirror when the live tree is empty.
#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Service is running", body = HealthResponse))
)]
pub async fn root_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let report = state.store.restore_if_empty().await;
    if report.restored {
        info!(
            "Restored {} files from backup ({} failed)",
            report.copied, report.failed
        );
    }
    Json(HealthResponse {
        message: "Instructors Copilot API is running".to_string(),
    })
}

/// Upload the curriculum PDF together with the course preferences.
///
/// Replaces the singleton curriculum file and rewrites the user
/// configuration; last write wins.
#[utoipa::path(
    post,
    path = "/upload-curriculum/",
    request_body(content_type = "multipart/form-data", description = "PDF file plus user_name, user_id, course_topic, no_of_weeks, difficulty_level and teaching_style fields."),
    responses(
        (status = 200, description = "File uploaded and configuration saved", body = UploadResponse),
        (status = 400, description = "Missing field or non-PDF upload"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn upload_curriculum_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut user_name = None;
    let mut user_id = None;
    let mut course_topic = None;
    let mut no_of_weeks = None;
    let mut difficulty_level = None;
    let mut teaching_style = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {e}"),
        )
    })? {
        let Some(name) = field.name().map(|n| n.to_string()) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload.bin").to_string();
                let data = field.bytes().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read file bytes: {e}"),
                    )
                })?;
                file = Some((file_name, data.to_vec()));
            }
            other => {
                let value = field.text().await.map_err(|e| {
                    (
                        StatusCode::BAD_REQUEST,
                        format!("Failed to read form field: {e}"),
                    )
                })?;
                match other {
                    "user_name" => user_name = Some(value),
                    "user_id" => user_id = Some(value),
                    "course_topic" => course_topic = Some(value),
                    "no_of_weeks" => no_of_weeks = Some(value),
                    "difficulty_level" => difficulty_level = Some(value),
                    "teaching_style" => teaching_style = Some(value),
                    _ => {}
                }
            }
        }
    }

    let missing = |field: &str| (StatusCode::BAD_REQUEST, format!("Missing field: {field}"));
    let (file_name, data) = file.ok_or_else(|| missing("file"))?;
    let user_name = user_name.ok_or_else(|| missing("user_name"))?;
    let user_id = user_id.ok_or_else(|| missing("user_id"))?;
    let course_topic = course_topic.ok_or_else(|| missing("course_topic"))?;
    let no_of_weeks = no_of_weeks.ok_or_else(|| missing("no_of_weeks"))?;
    let difficulty_level = difficulty_level.ok_or_else(|| missing("difficulty_level"))?;
    let teaching_style = teaching_style.ok_or_else(|| missing("teaching_style"))?;

    // Validate before any side effect.
    if !file_name.to_lowercase().ends_with(".pdf") {
        return Err((
            StatusCode::BAD_REQUEST,
            "Only PDF files are allowed".to_string(),
        ));
    }
    let duration = no_of_weeks.parse::<u32>().map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "no_of_weeks must be a whole number".to_string(),
        )
    })?;

    state
        .store
        .save_curriculum(&data)
        .await
        .map_err(internal_error)?;

    let config = UserConfig {
        user_name,
        user_id,
        course_topic,
        difficulty_level,
        duration,
        teaching_style,
        created_at: Utc::now(),
        curriculum_file: "curriculum.pdf".to_string(),
    };
    state
        .store
        .save_user_config(&config)
        .await
        .map_err(internal_error)?;

    Ok(Json(UploadResponse {
        message: "File uploaded and configuration saved successfully".to_string(),
        file_name,
        config,
    }))
}

/// Run the external generation script and report what it produced.
///
/// The run counts as successful when the script exits zero OR when at least
/// one recognized file is found afterwards; some generators exit non-zero on
/// warnings but still produce output. On success the content tree is backed
/// up and the completion marker written.
#[utoipa::path(
    post,
    path = "/generate-content/",
    responses(
        (status = 200, description = "Generation succeeded", body = GenerateContentResponse),
        (status = 400, description = "Curriculum or configuration missing"),
        (status = 500, description = "Generation failed", body = GenerateContentResponse)
    )
)]
pub async fn generate_content_handler(
    State(state): State<Arc<AppState>>,
) -> Result<(StatusCode, Json<GenerateContentResponse>), (StatusCode, String)> {
    let config = state
        .store
        .load_user_config()
        .await
        .map_err(internal_error)?;
    if config.is_none() {
        return Err((
            StatusCode::BAD_REQUEST,
            "No user configuration found. Please upload curriculum first.".to_string(),
        ));
    }
    if !state.store.curriculum_exists().await {
        return Err((
            StatusCode::BAD_REQUEST,
            "No curriculum PDF found. Please upload curriculum first.".to_string(),
        ));
    }

    // A stale marker must not read as "complete" while the new run is in
    // flight.
    state
        .store
        .clear_completion_marker()
        .await
        .map_err(internal_error)?;

    let outcome = state.generator.run().await.map_err(internal_error)?;

    let generated_files = state.store.scan_generated().await.map_err(internal_error)?;
    let success = outcome.exit_code == Some(0) || !generated_files.is_empty();

    if success {
        let backup = state.store.backup_all().await;
        if backup.failed > 0 {
            warn!("Backup completed with {} failures", backup.failed);
        }
        let marker = CompletionMarker {
            completed: true,
            completed_at: Some(Utc::now()),
            files_generated: generated_files.len(),
            backup_created: true,
        };
        if let Err(e) = state.store.write_completion_marker(&marker).await {
            warn!("Failed to write completion marker: {}", e);
        }
        let total_files = generated_files.len();
        Ok((
            StatusCode::OK,
            Json(GenerateContentResponse {
                message: "Script execution completed successfully!".to_string(),
                generated_files,
                total_files,
                process_completed: true,
                return_code: outcome.exit_code,
                backup_created: true,
            }),
        ))
    } else {
        let total_files = generated_files.len();
        Ok((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(GenerateContentResponse {
                message: format!(
                    "Script execution failed (return code: {})",
                    outcome
                        .exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "killed".to_string())
                ),
                generated_files,
                total_files,
                process_completed: false,
                return_code: outcome.exit_code,
                backup_created: false,
            }),
        ))
    }
}

/// Report whether the curriculum and configuration are in place.
#[utoipa::path(
    get,
    path = "/status/",
    responses((status = 200, description = "Current system status", body = StatusResponse))
)]
pub async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_config = state
        .store
        .load_user_config()
        .await
        .map_err(internal_error)?;
    let curriculum_uploaded = state.store.curriculum_exists().await;
    let config_uploaded = user_config.is_some();
    Ok(Json(StatusResponse {
        config_uploaded,
        curriculum_uploaded,
        ready_for_generation: config_uploaded && curriculum_uploaded,
        user_config,
    }))
}

/// Report whether the most recent generation run completed.
#[utoipa::path(
    get,
    path = "/generation/status",
    responses((status = 200, description = "Completion marker contents", body = GenerationStatusResponse))
)]
pub async fn generation_status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let marker = state
        .store
        .load_completion_marker()
        .await
        .map_err(internal_error)?;
    let response = match marker {
        Some(marker) => GenerationStatusResponse {
            completed: marker.completed,
            completed_at: marker.completed_at,
        },
        None => GenerationStatusResponse {
            completed: false,
            completed_at: None,
        },
    };
    Ok(Json(response))
}

/// List the recognized files at the content root.
#[utoipa::path(
    get,
    path = "/generated-files/",
    responses((status = 200, description = "Generated files at the content root", body = GeneratedFilesResponse))
)]
pub async fn generated_files_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let files = state.store.list_root().await.map_err(internal_error)?;
    let total = files.len();
    Ok(Json(GeneratedFilesResponse { files, total }))
}

/// List the files of one category, falling back to the backup mirror when
/// the live directory is empty.
#[utoipa::path(
    get,
    path = "/files/{category}",
    params(("category" = String, Path, description = "course-material | quizzes | ppts | flashcards")),
    responses((status = 200, description = "Category listing; invalid categories yield an empty result with an error field", body = CategoryListingResponse))
)]
pub async fn list_category_files_handler(
    State(state): State<Arc<AppState>>,
    Path(category): Path<String>,
) -> impl IntoResponse {
    let resolved = match Category::from_token(&category) {
        Ok(resolved) => resolved,
        Err(e) => {
            return Json(CategoryListingResponse {
                category,
                files: Vec::new(),
                total: 0,
                error: Some(e.to_string()),
            });
        }
    };
    match state.store.list_category(resolved).await {
        Ok(files) => {
            let total = files.len();
            Json(CategoryListingResponse {
                category,
                files,
                total,
                error: None,
            })
        }
        Err(e) => {
            error!("Error listing files for category {}: {}", category, e);
            Json(CategoryListingResponse {
                category,
                files: Vec::new(),
                total: 0,
                error: Some(e.to_string()),
            })
        }
    }
}

/// Download a file by category and filename.
#[utoipa::path(
    get,
    path = "/download/{category}/{filename}",
    params(
        ("category" = String, Path, description = "course-material | quizzes | ppts | flashcards"),
        ("filename" = String, Path, description = "File name within the category")
    ),
    responses(
        (status = 200, description = "File contents as an attachment"),
        (status = 400, description = "Invalid category or filename"),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_handler(
    State(state): State<Arc<AppState>>,
    Path((category, filename)): Path<(String, String)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    if !is_safe_filename(&filename) {
        return Err((StatusCode::BAD_REQUEST, "Invalid filename".to_string()));
    }
    let category = Category::from_token(&category)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;
    let data = state
        .store
        .read_file(category, &filename)
        .await
        .map_err(|e| match e {
            PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            other => internal_error(other),
        })?;

    let headers = [
        (
            header::CONTENT_TYPE,
            "application/octet-stream".to_string(),
        ),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{filename}\""),
        ),
    ];
    Ok((headers, data))
}

/// Group generated content into courses derived from the course material
/// listing, newest first.
#[utoipa::path(
    get,
    path = "/courses",
    responses((status = 200, description = "Derived course aggregates", body = CoursesResponse))
)]
pub async fn courses_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let material = state
        .store
        .list_category(Category::CourseMaterial)
        .await
        .map_err(internal_error)?;
    let mut others = Vec::new();
    for category in [Category::Quizzes, Category::Ppts, Category::Flashcards] {
        let entries = state
            .store
            .list_category(category)
            .await
            .map_err(internal_error)?;
        others.push((category, entries));
    }
    let courses = grouping::build_courses(&material, &others);
    let total = courses.len();
    Ok(Json(CoursesResponse { courses, total }))
}

/// Per-category file lists for one course.
#[utoipa::path(
    get,
    path = "/courses/{slug}",
    params(("slug" = String, Path, description = "Course slug derived from a course material file")),
    responses(
        (status = 200, description = "Course detail", body = CourseDetailResponse),
        (status = 404, description = "Unknown slug")
    )
)]
pub async fn course_detail_handler(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let material = state
        .store
        .list_category(Category::CourseMaterial)
        .await
        .map_err(internal_error)?;
    let title = grouping::find_title_for_slug(&material, &slug)
        .map(|t| t.to_string())
        .ok_or_else(|| (StatusCode::NOT_FOUND, "Course not found".to_string()))?;

    let course_material = course_files(&material, &title, Category::CourseMaterial);
    let mut per_category = Vec::new();
    for category in [Category::Quizzes, Category::Ppts, Category::Flashcards] {
        let entries = state
            .store
            .list_category(category)
            .await
            .map_err(internal_error)?;
        per_category.push(course_files(&entries, &title, category));
    }
    let mut per_category = per_category.into_iter();

    Ok(Json(CourseDetailResponse {
        slug,
        title,
        course_material,
        quizzes: per_category.next().unwrap_or_default(),
        ppts: per_category.next().unwrap_or_default(),
        flashcards: per_category.next().unwrap_or_default(),
    }))
}

/// Text preview of the most recent plain-text course material file.
#[utoipa::path(
    get,
    path = "/course-material/preview",
    responses((status = 200, description = "Preview text, empty when none exists", body = PreviewResponse))
)]
pub async fn preview_handler(
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let preview = state.store.preview_text().await.map_err(internal_error)?;
    let response = match preview {
        Some(preview) => PreviewResponse {
            file: Some(preview.file),
            path: Some(preview.path),
            preview: preview.preview,
        },
        None => PreviewResponse {
            file: None,
            path: None,
            preview: String::new(),
        },
    };
    Ok(Json(response))
}

/// Diagnostic snapshot of both trees and the singleton files.
#[utoipa::path(
    get,
    path = "/debug/info",
    responses((status = 200, description = "Debug snapshot", body = DebugInfoResponse))
)]
pub async fn debug_info_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let snapshot = state.store.debug_snapshot().await;
    Json(DebugInfoResponse {
        store_files: snapshot.store_files,
        backup_files: snapshot.backup_files,
        categories: Category::ALL.iter().map(|c| c.token().to_string()).collect(),
        config_exists: snapshot.config_exists,
        curriculum_exists: snapshot.curriculum_exists,
        marker_exists: snapshot.marker_exists,
    })
}
