use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use medstock_audit::{AuditRecord, AuditSink};
use medstock_auth::{Hs256Tokens, Operator};
use medstock_infra::IdentityAdapter;

/// The resolved caller, inserted into request extensions by
/// [`auth_middleware`] for handlers to pick up.
#[derive(Clone)]
pub struct CurrentOperator(pub Operator);

/// Caller email echoed into response extensions so the (outer) audit
/// middleware can attribute the request without re-parsing the token.
#[derive(Clone)]
pub struct AuditedOperator(pub String);

#[derive(Clone)]
pub struct AuthState {
    pub tokens: Arc<Hs256Tokens>,
    pub identity: IdentityAdapter,
}

pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let email = state
        .tokens
        .verify(token)
        .map_err(|_e| StatusCode::UNAUTHORIZED)?;

    // A valid token for a deleted operator is still unauthenticated.
    let operator = state
        .identity
        .current(&email)
        .await
        .map_err(|_e| StatusCode::UNAUTHORIZED)?;

    req.extensions_mut().insert(CurrentOperator(operator));

    let mut res = next.run(req).await;
    res.extensions_mut().insert(AuditedOperator(email));
    Ok(res)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}

#[derive(Clone)]
pub struct AuditState {
    pub sink: AuditSink,
}

/// Outermost layer: times every request and pushes one record to the
/// audit sink. Publishing never blocks the response path.
pub async fn audit_middleware(
    State(state): State<AuditState>,
    req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let remote_addr = req
        .extensions()
        .get::<axum::extract::ConnectInfo<std::net::SocketAddr>>()
        .map(|info| info.0.to_string());
    let started_at = Utc::now();
    let start = Instant::now();

    let res = next.run(req).await;

    let operator_email = res
        .extensions()
        .get::<AuditedOperator>()
        .map(|op| op.0.clone());
    state.sink.publish(AuditRecord {
        method,
        path,
        operator_email,
        remote_addr,
        started_at,
        elapsed_ms: start.elapsed().as_millis() as u64,
        status: res.status().as_u16(),
    });

    res
}
