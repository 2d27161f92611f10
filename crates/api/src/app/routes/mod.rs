use axum::Router;

pub mod auth;
pub mod system;

/// Routes under `/api`.
pub fn router() -> Router {
    Router::new().nest("/api", auth::router())
}
