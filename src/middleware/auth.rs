use axum::{
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
    extract::Request,
    body::Body,
};
use tower_sessions::Session;
use crate::handlers::USER_SESSION;

fn is_public(path: &str) -> bool {
    path == "/" || path == "/login" || path.starts_with("/static/")
}

pub async fn require_auth(
    session: Session,
    req: Request<Body>,
    next: Next,
) -> Response {
    if is_public(req.uri().path()) {
        return next.run(req).await;
    }

    match session.get::<String>(USER_SESSION).await {
        Ok(Some(_)) => next.run(req).await,
        _ => Redirect::to("/").into_response(),
    }
}
