//! Request/response DTOs and JSON mapping helpers.
//!
//! Responses use the original wire casing (camelCase for movements) and
//! never expose password hashes.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::{json, Value};

use medstock_auth::{Operator, Role};
use medstock_catalog::MedicineType;
use medstock_core::{DomainError, DomainResult, MedicineId, Page, Pageable, SortDir, SortSpec};
use medstock_movements::{Movement, MovementKind, MovementRequest};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub role: Option<Role>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub name: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateMedicineRequest {
    pub name: String,
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: MedicineType,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MovementRequestDto {
    #[serde(rename = "medicineId")]
    pub medicine_id: MedicineId,
    pub quantity: i64,
    #[serde(default)]
    pub supplier: String,
}

impl From<MovementRequestDto> for MovementRequest {
    fn from(dto: MovementRequestDto) -> Self {
        MovementRequest {
            medicine_id: dto.medicine_id,
            quantity: dto.quantity,
            supplier: dto.supplier,
        }
    }
}

pub fn token_json(token: String) -> Value {
    json!({ "token": token })
}

pub fn operator_json(operator: &Operator) -> Value {
    json!({
        "id": operator.id,
        "name": operator.name,
        "email": operator.email,
        "role": operator.role,
        "createdAt": operator.created_at,
        "updatedAt": operator.updated_at,
    })
}

/// Movements carry a kind-specific timestamp key on the wire.
pub fn movement_json(kind: MovementKind, movement: &Movement) -> Value {
    json!({
        "id": movement.id,
        "medicineId": movement.medicine_id,
        "quantity": movement.quantity,
        "originalMedicineQuantity": movement.original_medicine_quantity,
        "updateTransactionQuantity": movement.update_transaction_quantity,
        "supplier": movement.supplier,
        kind.timestamp_field(): movement.recorded_at,
    })
}

pub fn movement_page_json(kind: MovementKind, page: Page<Movement>) -> Page<Value> {
    page.map(|movement| movement_json(kind, &movement))
}

/// Parse `page`, `size` and `sort=field,dir` query params. All violations
/// aggregate into one validation error, like body validation does.
pub fn parse_pageable(params: &HashMap<String, String>) -> DomainResult<Pageable> {
    let mut errors = medstock_core::FieldErrors::new();

    let page = match params.get("page") {
        Some(raw) => match raw.parse::<u32>() {
            Ok(page) => page,
            Err(_) => {
                errors.push("page", "must be a non-negative integer");
                0
            }
        },
        None => 0,
    };
    let size = match params.get("size") {
        Some(raw) => match raw.parse::<u32>() {
            Ok(size) => size,
            Err(_) => {
                errors.push("size", "must be a non-negative integer");
                Pageable::DEFAULT_SIZE
            }
        },
        None => Pageable::DEFAULT_SIZE,
    };

    let sort = match params.get("sort") {
        Some(raw) => match parse_sort(raw) {
            Ok(sort) => Some(sort),
            Err(message) => {
                errors.push("sort", message);
                None
            }
        },
        None => None,
    };

    errors.into_result()?;
    Ok(Pageable::new(page, size, sort))
}

fn parse_sort(raw: &str) -> Result<SortSpec, String> {
    let mut parts = raw.splitn(2, ',');
    let field = parts.next().unwrap_or("").trim();
    if field.is_empty() {
        return Err("sort field must not be empty".to_string());
    }
    let dir = match parts.next().map(|d| d.trim().to_ascii_lowercase()) {
        None => SortDir::Asc,
        Some(dir) if dir == "asc" => SortDir::Asc,
        Some(dir) if dir == "desc" => SortDir::Desc,
        Some(_) => return Err("sort direction must be asc or desc".to_string()),
    };
    Ok(SortSpec::new(field, dir))
}

/// Parse a positive integer path segment into a typed id.
pub fn parse_id<T>(raw: &str) -> DomainResult<T>
where
    T: std::str::FromStr<Err = DomainError>,
{
    raw.parse()
}
