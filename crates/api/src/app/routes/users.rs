use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use medstock_core::OperatorId;
use medstock_infra::accounts::OperatorUpdate;

use crate::app::extract::Body;
use crate::app::routes::respond;
use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::middleware::CurrentOperator;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn signup(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::SignupRequest>,
) -> axum::response::Response {
    respond(
        services
            .accounts
            .signup(&body.name, &body.email, &body.password, body.role)
            .await
            .map(dto::token_json),
    )
}

pub async fn login(
    Extension(services): Extension<Arc<AppServices>>,
    Body(body): Body<dto::LoginRequest>,
) -> axum::response::Response {
    respond(
        services
            .accounts
            .login(&body.email, &body.password)
            .await
            .map(dto::token_json),
    )
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    respond(services.accounts.list().await.map(|operators| {
        operators
            .iter()
            .map(dto::operator_json)
            .collect::<Vec<_>>()
    }))
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let id: OperatorId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    respond(
        services
            .accounts
            .get(id)
            .await
            .map(|operator| dto::operator_json(&operator)),
    )
}

/// Operators may only edit their own record. Ownership is checked before
/// the body is validated.
pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentOperator(caller)): Extension<CurrentOperator>,
    Path(id): Path<String>,
    Body(body): Body<dto::UpdateUserRequest>,
) -> axum::response::Response {
    let id: OperatorId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    if id != caller.id {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "operators may only update their own account",
        );
    }

    let update = OperatorUpdate {
        name: body.name,
        password: body.password,
    };
    respond(
        services
            .accounts
            .update(id, &update)
            .await
            .map(|operator| dto::operator_json(&operator)),
    )
}

/// Admin-only. The role check precedes existence, so a non-admin probing
/// ids learns nothing.
pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(CurrentOperator(caller)): Extension<CurrentOperator>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if !caller.role.is_admin() {
        return errors::json_error(
            StatusCode::FORBIDDEN,
            "forbidden",
            "only admins may delete operators",
        );
    }
    let id: OperatorId = match dto::parse_id(&id) {
        Ok(id) => id,
        Err(e) => return errors::domain_error_to_response(e),
    };
    match services.accounts.delete(id).await {
        Ok(()) => Json(true).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
