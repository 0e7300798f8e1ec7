use axum::{
    extract::{Multipart, State},
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::Bytes;
use tower_sessions::Session;
use std::fs;
use crate::errors::{AppError, AppResult, StoreResult};
use crate::keywords::extract_or_empty;
use crate::models::{combine_keywords, Category, ProgressRecord, SearchContext, SearchRequest, TaskStatus};
use crate::services::ProgressStore;
use crate::state::AppState;
use super::render::render_search_page;
use super::session::{load_context, save_context, session_user};

// Form data of one submission
#[derive(Default)]
struct SearchSubmission {
    email: String,
    keywords: String,
    category: Option<Category>,
    file: Option<UploadedFile>,
}

struct UploadedFile {
    file_name: String,
    data: Bytes,
}

/// The task the user is currently bound to: the one remembered in the session,
/// falling back to their newest task when the session has none.
pub async fn current_task(
    store: &dyn ProgressStore,
    username: &str,
    context: &SearchContext,
) -> StoreResult<Option<(String, ProgressRecord)>> {
    let task_id = match &context.task_id {
        Some(task_id) => Some(task_id.clone()),
        None => store.latest_task(username).await?,
    };

    match task_id {
        Some(task_id) => {
            let record = store.load(username, &task_id).await?;
            Ok(Some((task_id, record)))
        }
        None => Ok(None),
    }
}

/// Id of a running task that should block a new submission, checking both the
/// session's task and the user's newest one.
pub async fn blocking_task(
    store: &dyn ProgressStore,
    username: &str,
    context: &SearchContext,
) -> StoreResult<Option<String>> {
    let mut candidates = Vec::new();
    if let Some(task_id) = &context.task_id {
        candidates.push(task_id.clone());
    }
    if let Some(latest) = store.latest_task(username).await? {
        if !candidates.contains(&latest) {
            candidates.push(latest);
        }
    }

    for task_id in candidates {
        if store.load(username, &task_id).await?.is_running() {
            return Ok(Some(task_id));
        }
    }
    Ok(None)
}

/// The task the search page reports on. A running task wins over the session's
/// own task so the page never offers a submission the gate would refuse.
pub async fn displayed_task(
    store: &dyn ProgressStore,
    username: &str,
    context: &SearchContext,
) -> StoreResult<Option<(String, ProgressRecord)>> {
    match blocking_task(store, username, context).await? {
        Some(task_id) => {
            let record = store.load(username, &task_id).await?;
            Ok(Some((task_id, record)))
        }
        None => current_task(store, username, context).await,
    }
}

pub async fn serve_search_page(
    State(state): State<AppState>,
    session: Session,
) -> AppResult<Response> {
    let username = session_user(&session).await?;
    let mut context = load_context(&session).await?;

    let notice = context.take_notice();
    if notice.is_some() {
        save_context(&session, &context).await?;
    }

    let current = displayed_task(state.store.as_ref(), &username, &context).await?;
    tracing::debug!("Rendering search page for {} (task: {:?})", username, current.as_ref().map(|(id, _)| id));

    let template = fs::read_to_string("templates/search.html")
        .map_err(|e| {
            tracing::error!("Failed to read search template: {}", e);
            AppError::File(e)
        })?;

    let html = render_search_page(
        &template,
        &username,
        &context,
        current.as_ref().map(|(_, record)| record),
        notice.as_deref(),
    );
    Ok(Html(html).into_response())
}

pub async fn submit_search(
    State(state): State<AppState>,
    session: Session,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let username = session_user(&session).await?;
    let mut context = load_context(&session).await?;

    let submission = read_submission(&mut multipart).await?;
    context.email = submission.email;
    context.keywords = submission.keywords;
    if let Some(category) = submission.category {
        context.selected_option = category;
    }

    let notice = accept_submission(&state, &username, &mut context, submission.file).await?;
    context.notice = Some(notice);
    save_context(&session, &context).await?;

    Ok(Redirect::to("/search").into_response())
}

// Applies the submission rules and returns the message to show the user.
async fn accept_submission(
    state: &AppState,
    username: &str,
    context: &mut SearchContext,
    file: Option<UploadedFile>,
) -> AppResult<String> {
    let recipients = context.recipients();
    if recipients.is_empty() {
        return Ok("Please enter your email to proceed.".to_string());
    }

    if let Some(task_id) = blocking_task(state.store.as_ref(), username, context).await? {
        tracing::info!("Rejected submission from {}: task {} still running", username, task_id);
        return Ok(format!(
            "A task is already running for {}. Please wait until it is complete.",
            username
        ));
    }

    let mut messages = Vec::new();
    let file_keywords = match file {
        Some(file) => {
            let (keywords, error) = extract_or_empty(&file.file_name, &file.data);
            if let Some(error) = error {
                messages.push(error.to_string());
            }
            keywords
        }
        None => Vec::new(),
    };

    let keywords = combine_keywords(file_keywords, context.manual_keywords());
    if keywords.is_empty() {
        messages.push("Please provide at least one keyword.".to_string());
        return Ok(messages.join(" "));
    }

    let request = SearchRequest {
        recipients,
        keywords,
        category: context.selected_option,
    };
    let job = state.orchestrator.begin(username, request).await?;
    context.task_id = Some(job.task_id.clone());

    let handle = state.queue.enqueue(job)?;
    tokio::spawn(async move {
        let task_id = handle.task_id.clone();
        match handle.wait().await {
            Ok(TaskStatus::Failed) => tracing::warn!("Task {} ended in failure", task_id),
            Ok(status) => tracing::debug!("Task {} ended as {:?}", task_id, status),
            Err(e) => tracing::error!("Lost track of task {}: {}", task_id, e),
        }
    });

    messages.push("The process is running in the background. You will receive an email shortly.".to_string());
    Ok(messages.join(" "))
}

async fn read_submission(multipart: &mut Multipart) -> AppResult<SearchSubmission> {
    let mut submission = SearchSubmission::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::error!("Failed to get next field from multipart form: {}", e);
        AppError::Upload(format!("Failed to process form field: {}", e))
    })? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "emails" => submission.email = read_text(field).await?,
            "keywords" => submission.keywords = read_text(field).await?,
            "category" => {
                let value = read_text(field).await?;
                let category = value
                    .parse::<Category>()
                    .map_err(|e| AppError::Upload(e.to_string()))?;
                submission.category = Some(category);
            }
            "keywords_file" => {
                let file_name = field.file_name().unwrap_or("").to_string();
                let data = field.bytes().await
                    .map_err(|e| AppError::Upload(format!("Failed to read uploaded file: {}", e)))?;
                // Browsers send an empty part when no file was chosen
                if !file_name.is_empty() && !data.is_empty() {
                    tracing::debug!("Received keyword file {} ({} bytes)", file_name, data.len());
                    submission.file = Some(UploadedFile { file_name, data });
                }
            }
            field_name => {
                tracing::warn!("Unexpected form field: {}", field_name);
            }
        }
    }

    Ok(submission)
}

async fn read_text(field: axum::extract::multipart::Field<'_>) -> AppResult<String> {
    field.text().await
        .map_err(|e| AppError::Upload(format!("Failed to read field: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::MemoryProgressStore;

    #[tokio::test]
    async fn session_task_takes_precedence() {
        let store = MemoryProgressStore::new();
        let mut done = ProgressRecord::running(vec![], Category::Trade);
        done.finish(TaskStatus::Succeeded);
        store.save("alice", "old", &done).await.unwrap();
        store.record_task("alice", "old").await.unwrap();
        store.save("alice", "new", &ProgressRecord::running(vec![], Category::Trade)).await.unwrap();
        store.record_task("alice", "new").await.unwrap();

        let context = SearchContext { task_id: Some("old".into()), ..Default::default() };
        let (task_id, record) = current_task(&store, "alice", &context).await.unwrap().unwrap();
        assert_eq!(task_id, "old");
        assert!(!record.is_running());

        let fresh = SearchContext::default();
        let (task_id, record) = current_task(&store, "alice", &fresh).await.unwrap().unwrap();
        assert_eq!(task_id, "new");
        assert!(record.is_running());
    }

    #[tokio::test]
    async fn running_task_from_another_session_blocks() {
        let store = MemoryProgressStore::new();
        let mut done = ProgressRecord::running(vec![], Category::Trade);
        done.finish(TaskStatus::Succeeded);
        store.save("alice", "old", &done).await.unwrap();
        store.record_task("alice", "old").await.unwrap();

        let context = SearchContext { task_id: Some("old".into()), ..Default::default() };
        assert_eq!(blocking_task(&store, "alice", &context).await.unwrap(), None);

        store.save("alice", "new", &ProgressRecord::running(vec![], Category::Trade)).await.unwrap();
        store.record_task("alice", "new").await.unwrap();
        assert_eq!(
            blocking_task(&store, "alice", &context).await.unwrap().as_deref(),
            Some("new")
        );
        assert_eq!(blocking_task(&store, "bob", &context).await.unwrap(), None);
    }

    #[tokio::test]
    async fn page_reports_the_task_that_blocks_submission() {
        let store = MemoryProgressStore::new();
        let mut done = ProgressRecord::running(vec![], Category::Trade);
        done.finish(TaskStatus::Succeeded);
        store.save("alice", "mine", &done).await.unwrap();
        store.record_task("alice", "mine").await.unwrap();

        let context = SearchContext { task_id: Some("mine".into()), ..Default::default() };
        let (task_id, _) = displayed_task(&store, "alice", &context).await.unwrap().unwrap();
        assert_eq!(task_id, "mine");

        store.save("alice", "elsewhere", &ProgressRecord::running(vec![], Category::Trade)).await.unwrap();
        store.record_task("alice", "elsewhere").await.unwrap();

        let (task_id, record) = displayed_task(&store, "alice", &context).await.unwrap().unwrap();
        assert_eq!(task_id, "elsewhere");
        assert!(record.is_running());
    }

    #[tokio::test]
    async fn no_task_for_new_user() {
        let store = MemoryProgressStore::new();
        let current = current_task(&store, "alice", &SearchContext::default()).await.unwrap();
        assert!(current.is_none());
    }
}
