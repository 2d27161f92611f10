use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
    routing::{get, post},
};

use crate::app::{dto, errors, services::AuthService};

pub fn router() -> Router {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/validate", get(validate))
}

pub async fn register(
    Extension(services): Extension<Arc<AuthService>>,
    Json(body): Json<dto::RegisterRequest>,
) -> axum::response::Response {
    match services.register(&body.username, &body.password) {
        Ok(user) => (
            StatusCode::CREATED,
            Json(dto::RegisterResponse::from(&user)),
        )
            .into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn login(
    Extension(services): Extension<Arc<AuthService>>,
    Json(body): Json<dto::LoginRequest>,
) -> axum::response::Response {
    match services.login(&body.username, &body.password) {
        Ok(pair) => Json(dto::TokenResponse::from(pair)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn refresh(
    Extension(services): Extension<Arc<AuthService>>,
    Json(body): Json<dto::RefreshRequest>,
) -> axum::response::Response {
    match services.refresh(&body.refresh_token) {
        Ok(pair) => Json(dto::TokenResponse::from(pair)).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn logout(
    Extension(services): Extension<Arc<AuthService>>,
    Json(body): Json<dto::LogoutRequest>,
) -> axum::response::Response {
    match services.logout(&body.refresh_token) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

pub async fn validate(
    Extension(services): Extension<Arc<AuthService>>,
    headers: HeaderMap,
) -> axum::response::Response {
    let Some(token) = bearer_token(&headers) else {
        return errors::json_error(
            StatusCode::UNAUTHORIZED,
            "unauthorized",
            "missing bearer token",
        );
    };

    match services.validate(token) {
        Ok(user_id) => Json(dto::ValidateResponse { user_id }).into_response(),
        Err(e) => errors::auth_error_to_response(e),
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}
