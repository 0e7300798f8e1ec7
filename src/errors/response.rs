use axum::{
    response::{IntoResponse, Response, Redirect},
    http::StatusCode,
};
use urlencoding;
use crate::errors::{
    AppError,
    worker::WorkerError,
};

// Converts AppError into a well-formed HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            // Authentication errors redirect to login
            AppError::Auth(msg) => {
                Redirect::to(&format!("/?error={}", urlencoding::encode(&msg)))
                    .into_response()
            }

            // The progress store being down is an internal server error
            AppError::Store(e) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Store error: {}", e)
            ).into_response(),

            AppError::File(e) => {
                let status = match e.kind() {
                    std::io::ErrorKind::NotFound => StatusCode::NOT_FOUND,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, format!("File error: {}", e)).into_response()
            }

            AppError::Upload(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Upload error: {}", msg)
            ).into_response(),

            AppError::Task(msg) => (
                StatusCode::BAD_REQUEST,
                format!("Task error: {}", msg)
            ).into_response(),

            AppError::Worker(err) => convert_worker_error(err),
        }
    }
}

fn convert_worker_error(err: WorkerError) -> Response {
    match err {
        WorkerError::QueueClosed => (
            StatusCode::SERVICE_UNAVAILABLE,
            "Task queue is not accepting work".to_string()
        ).into_response(),

        // All other worker errors are internal server errors
        _ => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Worker error: {}", err)
        ).into_response(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header;

    #[test]
    fn auth_errors_redirect_to_login_with_message() {
        let response = AppError::Auth("Not authenticated".into()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            "/?error=Not%20authenticated"
        );
    }

    #[test]
    fn task_errors_are_bad_requests() {
        let response = AppError::Task("Task x not found".into()).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn closed_queue_is_service_unavailable() {
        let response = AppError::Worker(WorkerError::QueueClosed).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
