//! Operator records.

use chrono::{DateTime, Utc};

use medstock_core::OperatorId;

use crate::roles::Role;

/// A persisted operator. The password hash never leaves the service layer;
/// response DTOs are built without it, and the record is deliberately not
/// serializable so it cannot end up in a response by accident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Operator {
    pub id: OperatorId,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An operator awaiting its store-assigned id (signup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOperator {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}
