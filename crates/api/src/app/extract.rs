//! JSON body extraction with domain-shaped rejections.

use axum::async_trait;
use axum::extract::{FromRequest, Request};
use axum::Json;
use serde::de::DeserializeOwned;

use medstock_core::DomainError;

use crate::app::errors;

/// `Json<T>` with the rejection routed through the error mapping: a
/// malformed or mistyped body renders as a 400 validation error instead
/// of axum's plain-text 422.
pub struct Body<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for Body<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = axum::response::Response;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(Body(value)),
            Err(rejection) => Err(errors::domain_error_to_response(
                DomainError::validation("body", rejection.body_text()),
            )),
        }
    }
}
