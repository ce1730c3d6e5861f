use axum::{
    extract::{rejection::JsonRejection, Multipart, Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::{AdminUser, AuthUser};
use crate::db;
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::storage::{self, VIDEO_DIR};

#[derive(Debug, Deserialize)]
pub struct CreateCourseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

pub async fn create_course(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    payload: Result<Json<CreateCourseRequest>, JsonRejection>,
) -> AppResult<impl IntoResponse> {
    let Json(request) = payload?;
    let title = request
        .title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("title is required".to_string()))?;

    let course = db::create_course(&state.pool, &title, request.description.as_deref()).await?;
    info!("Created course {} ({})", course.id, course.title);
    Ok((StatusCode::CREATED, Json(course)))
}

pub async fn get_course(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Path(course_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    let details = db::get_course_details(&state.pool, course_id)
        .await?
        .ok_or(AppError::NotFound("Course"))?;
    Ok(Json(details))
}

pub async fn upload_video(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let mut title = None;
    let mut course_id = None;
    let mut video: Option<(String, axum::body::Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(e.body_text()))?
    {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "title" => title = Some(field.text().await.map_err(|e| AppError::Validation(e.body_text()))?),
            "courseId" => {
                course_id = Some(field.text().await.map_err(|e| AppError::Validation(e.body_text()))?)
            }
            "video" => {
                let filename = field.file_name().unwrap_or("").to_string();
                if !storage::is_allowed_video(&filename) {
                    return Err(AppError::Validation(
                        "Only video files (.mp4, .mov, .mkv) are allowed".to_string(),
                    ));
                }
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(e.body_text()))?;
                video = Some((filename, data));
            }
            _ => {}
        }
    }

    let (original_name, data) = video
        .filter(|(_, data)| !data.is_empty())
        .ok_or_else(|| AppError::Validation("No video file provided".to_string()))?;
    let title = title
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Validation("title is required".to_string()))?;
    let course_id: i32 = course_id
        .and_then(|id| id.trim().parse().ok())
        .ok_or_else(|| AppError::Validation("courseId is required".to_string()))?;

    let stored_name = storage::video_file_name(&original_name);
    let path = state.config.upload_folder.join(VIDEO_DIR).join(&stored_name);
    tokio::fs::write(&path, &data)
        .await
        .map_err(AppError::internal)?;

    let video_url = state.config.upload_url(&format!("{VIDEO_DIR}/{stored_name}"));
    let video = match db::create_video(&state.pool, course_id, &title, &video_url).await {
        Ok(video) => video,
        Err(e) => {
            if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                warn!("Could not remove orphaned upload {}: {}", path.display(), cleanup);
            }
            return Err(match e {
                sqlx::Error::Database(db) if db.is_foreign_key_violation() => {
                    AppError::NotFound("Course")
                }
                other => other.into(),
            });
        }
    };
    info!("Stored video {} for course {}", stored_name, course_id);

    Ok((StatusCode::CREATED, Json(video)))
}
