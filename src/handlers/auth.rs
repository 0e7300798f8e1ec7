use axum::{
    extract::{Form, Query, State},
    response::{Html, IntoResponse, Response, Redirect},
};
use tower_sessions::Session;
use std::fs;
use crate::errors::{AppError, AppResult};
use crate::models::{LoginForm, LoginQuery, SearchContext};
use crate::state::AppState;
use super::render::render_login_page;
use super::session::USER_SESSION;

pub async fn serve_login_page(Query(query): Query<LoginQuery>) -> AppResult<Response> {
    let template = fs::read_to_string("templates/login.html")
        .map_err(|e| {
            tracing::error!("Failed to read login template: {}", e);
            AppError::File(e)
        })?;
    Ok(Html(render_login_page(&template, query.error.as_deref())).into_response())
}

#[axum::debug_handler]
pub async fn handle_login(
    State(state): State<AppState>,
    session: Session,
    Form(login_form): Form<LoginForm>,
) -> Response {
    tracing::info!("Login attempt for user: {}", login_form.username);

    if !state.credentials.check(&login_form.username, &login_form.password) {
        tracing::info!("Invalid credentials for user: {}", login_form.username);
        return Redirect::to("/?error=Invalid%20username%20or%20password.").into_response();
    }

    if let Err(e) = session.insert(USER_SESSION, &login_form.username).await {
        tracing::error!("Session error: {}", e);
        return Redirect::to("/?error=Server%20error").into_response();
    }

    tracing::info!("Login successful for user: {}", login_form.username);
    Redirect::to("/search").into_response()
}

#[axum::debug_handler]
pub async fn handle_logout(
    session: Session,
) -> Response {
    if let Err(e) = session.remove::<String>(USER_SESSION).await {
        tracing::warn!("Session removal error: {}", e);
    }
    if let Err(e) = session.remove::<SearchContext>(SearchContext::SESSION_KEY).await {
        tracing::warn!("Session removal error: {}", e);
    }
    Redirect::to("/").into_response()
}
