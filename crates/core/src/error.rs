//! Domain error model.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::id::MedicineId;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Aggregated field-level validation failures.
///
/// Keyed by field path (e.g. `name`, `requests[2].quantity`). A request is
/// validated in full before any error is returned, so callers see every
/// violation at once. BTreeMap keeps rendering deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.insert(field.into(), message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Merge another set of violations into this one.
    pub fn extend(&mut self, other: FieldErrors) {
        self.0.extend(other.0);
    }

    /// Finish a validation pass: `Ok(())` when no violations were recorded.
    pub fn into_result(self) -> DomainResult<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(DomainError::Validation(self))
        }
    }
}

impl core::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                write!(f, "; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

fn join_ids(ids: &[MedicineId]) -> String {
    ids.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Domain-level error.
///
/// Components return these as typed values; the HTTP surface is the single
/// place that maps them to status codes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// One or more fields failed validation.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Missing or unusable identity (no token, bad credentials, unknown principal).
    #[error("unauthenticated")]
    Unauthenticated,

    /// Authenticated, but role or ownership forbids the action.
    #[error("forbidden")]
    Forbidden,

    /// A referenced resource does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A movement batch referenced medicines that do not exist.
    #[error("medicines not found: [{}]", join_ids(.0))]
    MissingMedicines(Vec<MedicineId>),

    /// Unique-constraint collision (medicine name, operator email).
    #[error("conflict: {0}")]
    Conflict(String),

    /// Deletion refused because other records still reference the target.
    #[error("in use: {0}")]
    InUse(String),

    /// Outbound movement would drive a medicine below zero.
    #[error(
        "insufficient stock for medicine {medicine_id}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        medicine_id: MedicineId,
        available: i64,
        requested: i64,
    },

    /// An identifier was invalid (e.g. parse failure).
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    /// Unexpected failure; details are logged, never surfaced to clients.
    #[error("internal error: {0}")]
    Internal(String),
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.push(field, message);
        Self::Validation(errors)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn in_use(msg: impl Into<String>) -> Self {
        Self::InUse(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}
