use axum::{response::IntoResponse, Json, Router};
use serde::Serialize;

use medstock_core::DomainResult;
use medstock_movements::MovementKind;

use crate::app::errors;

pub mod medicines;
pub mod movements;
pub mod system;
pub mod users;

/// Serialize a service result as 200 JSON, or map the error. All success
/// responses are 200, including creates.
pub fn respond<T: Serialize>(result: DomainResult<T>) -> axum::response::Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/users", users::router())
        .nest("/medicines", medicines::router())
        .nest(
            "/inbound/transactions",
            movements::router(MovementKind::Inbound),
        )
        .nest(
            "/outbound/transactions",
            movements::router(MovementKind::Outbound),
        )
}
