use tower_sessions::Session;
use crate::errors::{AppError, AppResult};
use crate::models::SearchContext;

pub const USER_SESSION: &str = "user_session";

/// Username of the logged in user, or an auth error that sends them to the login page.
pub async fn session_user(session: &Session) -> AppResult<String> {
    session
        .get::<String>(USER_SESSION)
        .await
        .map_err(|e| AppError::Auth(format!("Session error: {}", e)))?
        .ok_or_else(|| AppError::Auth("Not authenticated".into()))
}

pub async fn load_context(session: &Session) -> AppResult<SearchContext> {
    Ok(session
        .get::<SearchContext>(SearchContext::SESSION_KEY)
        .await
        .map_err(|e| AppError::Auth(format!("Session error: {}", e)))?
        .unwrap_or_default())
}

pub async fn save_context(session: &Session, context: &SearchContext) -> AppResult<()> {
    session
        .insert(SearchContext::SESSION_KEY, context)
        .await
        .map_err(|e| AppError::Auth(format!("Session error: {}", e)))
}
