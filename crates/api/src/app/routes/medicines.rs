use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use medstock_catalog::MedicinePatch;
use medstock_core::MedicineId;

use crate::app::extract::Body;
use crate::app::routes::respond;
use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_medicine).get(list_medicines))
        .route(
            "/:id",
            get(get_medicine).put(update_medicine).delete(delete_medicine),
        )
}

pub async fn create_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::CreateMedicineRequest>,
) -> axum::response::Response {
    respond(
        services
            .catalog
            .create(body.name, body.description, body.kind, body.quantity)
            .await,
    )
}

pub async fn list_medicines(
    Extension(services): Extension<Arc<AppServices>>,
    Query(params): Query<HashMap<String, String>>,
) -> axum::response::Response {
    let pageable = match dto::parse_pageable(&params) {
        Ok(pageable) => pageable,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.catalog.list(&pageable).await)
}

pub async fn get_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MedicineId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.catalog.get(id).await)
}

pub async fn update_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
    Body(patch): Body<MedicinePatch>,
) -> axum::response::Response {
    let id: MedicineId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(services.catalog.update(id, &patch).await)
}

pub async fn delete_medicine(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: MedicineId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.catalog.delete(id).await {
        Ok(()) => Json(json!({ "deleted": true })).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
