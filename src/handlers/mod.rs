mod auth;
mod dashboard;
mod render;
mod search;
mod session;

pub use session::USER_SESSION;

pub use auth::{serve_login_page, handle_login, handle_logout};
pub use search::{serve_search_page, submit_search};
pub use dashboard::{serve_task_list, get_task_status, download_results};
