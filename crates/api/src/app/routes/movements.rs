//! Inbound and outbound transaction routes.
//!
//! The two trees are the same shape; the kind is carried as router state
//! and decides direction, sort whitelist and the wire timestamp key.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query, State},
    routing::{get, post},
    Router,
};

use medstock_core::MovementId;
use medstock_movements::{MovementKind, MovementRequest};

use crate::app::extract::Body;
use crate::app::routes::respond;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::middleware::CurrentOperator;

pub fn router(kind: MovementKind) -> Router {
    Router::new()
        .route("/", post(apply_batch).get(list_movements))
        .route("/:id", get(get_movement))
        .with_state(kind)
}

pub async fn apply_batch(
    State(kind): State<MovementKind>,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentOperator(operator)): Extension<CurrentOperator>,
    Body(body): Body<Vec<dto::MovementRequestDto>>,
) -> axum::response::Response {
    let batch: Vec<MovementRequest> = body.into_iter().map(Into::into).collect();
    respond(
        services
            .engine
            .apply(kind, &batch, &operator)
            .await
            .map(|movements| {
                movements
                    .iter()
                    .map(|m| dto::movement_json(kind, m))
                    .collect::<Vec<_>>()
            }),
    )
}

pub async fn list_movements(
    State(kind): State<MovementKind>,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentOperator(operator)): Extension<CurrentOperator>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let pageable = match dto::parse_pageable(&params) {
        Ok(pageable) => pageable,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(
        services
            .engine
            .list(kind, &operator, &pageable)
            .await
            .map(|page| dto::movement_page_json(kind, page)),
    )
}

pub async fn get_movement(
    State(kind): State<MovementKind>,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentOperator(operator)): Extension<CurrentOperator>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MovementId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(
        services
            .engine
            .get(kind, id, &operator)
            .await
            .map(|m| dto::movement_json(kind, &m)),
    )
}
