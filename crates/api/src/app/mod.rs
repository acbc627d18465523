//! HTTP application wiring (Axum router + service wiring).
//!
//! Layout:
//! - `services.rs`: service construction over a store and enrichment source
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs and JSON mapping helpers
//! - `extract.rs`: JSON body extractor with validation-shaped rejections
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Extension, Router,
};

use medstock_audit::AuditSink;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod extract;
pub mod routes;
pub mod services;

pub use services::AppServices;

/// Build the full HTTP router (entrypoint used by `main.rs` and tests).
///
/// The audit layer is outermost so it times the auth middleware too;
/// signup, login and health stay outside the bearer check.
pub fn build_app(services: Arc<AppServices>, sink: AuditSink) -> Router {
    let auth_state = middleware::AuthState {
        tokens: Arc::clone(&services.tokens),
        identity: services.identity.clone(),
    };
    let audit_state = middleware::AuditState { sink };

    let public = Router::new()
        .route("/health", get(routes::system::health))
        .route("/users/signup", post(routes::users::signup))
        .route("/users/login", post(routes::users::login));

    let protected = routes::router().layer(axum::middleware::from_fn_with_state(
        auth_state,
        middleware::auth_middleware,
    ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            audit_state,
            middleware::audit_middleware,
        ))
}
