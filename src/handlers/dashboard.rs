use axum::{
    extract::{Path, State},
    response::{Html, IntoResponse, Response, Json},
    http::{StatusCode, header},
    body::Body,
};
use tower_sessions::Session;
use tokio::{
    fs::File,
    io::BufReader,
};
use tokio_util::io::ReaderStream;
use serde_json::json;
use crate::errors::{AppError, AppResult};
use crate::models::ProgressRecord;
use crate::state::AppState;
use super::render::{escape_html, render_task_rows};
use super::session::session_user;

// Loads a task of the logged in user, failing if it is not one of theirs.
async fn owned_task(state: &AppState, username: &str, task_id: &str) -> AppResult<ProgressRecord> {
    let task_ids = state.store.task_ids(username).await?;
    if !task_ids.iter().any(|id| id == task_id) {
        tracing::warn!("Task {} not found for user {}", task_id, username);
        return Err(AppError::Task(format!("Task {} not found", task_id)));
    }
    Ok(state.store.load(username, task_id).await?)
}

pub async fn serve_task_list(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let username = session_user(&session).await?;
    tracing::info!("Listing tasks for user: {}", username);

    let mut tasks = Vec::new();
    for task_id in state.store.task_ids(&username).await? {
        match state.store.load(&username, &task_id).await {
            Ok(record) => tasks.push((task_id, record)),
            Err(e) => tracing::error!("Failed to fetch task {}: {}", task_id, e),
        }
    }

    // Newest first
    tasks.sort_by(|a, b| b.1.submitted_at.cmp(&a.1.submitted_at));

    let template = std::fs::read_to_string("templates/tasks.html")
        .map_err(|e| {
            tracing::error!("Failed to read tasks template: {}", e);
            AppError::File(e)
        })?;

    let html = template
        .replace("{{username}}", &escape_html(&username))
        .replace("{{tasks}}", &render_task_rows(&tasks))
        .replace("{{task_count}}", &tasks.len().to_string());
    Ok(Html(html).into_response())
}

pub async fn get_task_status(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let username = session_user(&session).await?;
    tracing::debug!("Checking status for task: {}", task_id);

    let record = owned_task(&state, &username, &task_id).await?;

    let response = json!({
        "task_id": task_id,
        "task_complete": record.task_complete,
        "status": record.status,
        "keywords": record.keywords,
        "selected_option": record.selected_option,
        "results_found": record.results_found,
        "error": record.error,
        "submit_time": record.submitted_at,
        "complete_time": record.completed_at,
    });

    tracing::trace!("Sending task status response: {:?}", response);
    Ok(Json(response).into_response())
}

pub async fn download_results(
    Path(task_id): Path<String>,
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let username = session_user(&session).await?;
    tracing::info!("Starting download for task_id: {}", task_id);

    let record = owned_task(&state, &username, &task_id).await?;
    let artifact = record
        .artifact
        .ok_or_else(|| AppError::Task(format!("Task {} has no results to download", task_id)))?;

    let file = File::open(&artifact).await
        .map_err(|e| {
            tracing::error!("Failed to open artifact {}: {}", artifact, e);
            AppError::File(e)
        })?;
    let file_size = file.metadata().await?.len();

    let filename = std::path::Path::new(&artifact)
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("results.csv")
        .to_string();

    tracing::debug!("Preparing to send file: {} (size: {} bytes)", filename, file_size);

    // Stream the artifact chunk by chunk
    let body = Body::from_stream(ReaderStream::new(BufReader::new(file)));

    let response = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/csv")
        .header(header::CONTENT_DISPOSITION, format!("attachment; filename=\"{}\"", filename))
        .header(header::CONTENT_LENGTH, file_size.to_string())
        .body(body)
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            AppError::Task(format!("Failed to build download response: {}", e))
        })?;

    tracing::info!("Successfully prepared download response for task: {}", task_id);
    Ok(response)
}
