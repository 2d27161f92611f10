//! HTTP application wiring (axum router + service wiring).
//!
//! - `services.rs`: infrastructure wiring (event store/bus, projection
//!   worker) and the `AuthService`
//! - `routes/`: HTTP routes + handlers
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};

use clavis_infra::workers::ProjectionWorker;

use crate::config::Config;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router plus the projection worker keeping the read
/// model current. The caller owns the worker and shuts it down when the
/// server stops.
pub fn build_app(config: &Config) -> anyhow::Result<(Router, ProjectionWorker)> {
    let (auth, worker) = services::build_services(config)?;
    let auth = Arc::new(auth);

    let router = Router::new()
        .route("/healthz", get(routes::system::health))
        .merge(routes::router())
        .layer(Extension(auth));

    Ok((router, worker))
}
