//! Movement records and request validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use medstock_core::{DomainResult, FieldErrors, MedicineId, MovementId, OperatorId};

/// Direction of a stock movement.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    /// Stock received from a supplier; adds to the medicine's quantity.
    Inbound,
    /// Stock dispatched to a recipient; subtracts from it.
    Outbound,
}

impl MovementKind {
    /// Signed delta this kind applies to a quantity.
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementKind::Inbound => quantity,
            MovementKind::Outbound => -quantity,
        }
    }

    /// Wire name of the timestamp field for this kind.
    pub fn timestamp_field(&self) -> &'static str {
        match self {
            MovementKind::Inbound => "receivedDate",
            MovementKind::Outbound => "dispatchedDate",
        }
    }

    /// Wire sort fields accepted by this kind's list endpoint.
    pub fn sort_fields(&self) -> &'static [&'static str] {
        match self {
            MovementKind::Inbound => {
                &["id", "medicineId", "quantity", "supplier", "receivedDate"]
            }
            MovementKind::Outbound => {
                &["id", "medicineId", "quantity", "supplier", "dispatchedDate"]
            }
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            MovementKind::Inbound => f.write_str("inbound"),
            MovementKind::Outbound => f.write_str("outbound"),
        }
    }
}

/// One requested movement within a batch. For inbound the counterparty is
/// the supplier; for outbound it names the recipient (the wire field is
/// `supplier` either way, matching the original API).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub medicine_id: MedicineId,
    pub quantity: i64,
    pub supplier: String,
}

/// A planned movement, not yet persisted: the store assigns id and
/// commit timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedMovement {
    pub medicine_id: MedicineId,
    pub operator_id: OperatorId,
    pub quantity: i64,
    pub original_medicine_quantity: i64,
    pub update_transaction_quantity: i64,
    pub supplier: String,
}

/// A committed, append-only movement record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Movement {
    pub id: MovementId,
    pub medicine_id: MedicineId,
    pub operator_id: OperatorId,
    pub quantity: i64,
    pub original_medicine_quantity: i64,
    pub update_transaction_quantity: i64,
    pub recorded_at: DateTime<Utc>,
    pub supplier: String,
}

/// Validate a submitted batch: non-empty, every quantity ≥ 1, every
/// supplier non-blank. All violations are aggregated, keyed per index.
pub fn validate_batch(batch: &[MovementRequest]) -> DomainResult<()> {
    let mut errors = FieldErrors::new();

    if batch.is_empty() {
        errors.push("requests", "batch must not be empty");
    }
    for (i, request) in batch.iter().enumerate() {
        if request.quantity < 1 {
            errors.push(format!("requests[{i}].quantity"), "must be at least 1");
        }
        if request.supplier.trim().is_empty() {
            errors.push(format!("requests[{i}].supplier"), "must not be blank");
        }
    }

    errors.into_result()
}

#[cfg(test)]
mod tests {
    use super::*;
    use medstock_core::DomainError;

    #[test]
    fn empty_batch_is_rejected() {
        assert!(matches!(
            validate_batch(&[]),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn violations_are_keyed_per_index() {
        let batch = vec![
            MovementRequest {
                medicine_id: MedicineId::from_i64(1),
                quantity: 5,
                supplier: "SupA".to_string(),
            },
            MovementRequest {
                medicine_id: MedicineId::from_i64(2),
                quantity: 0,
                supplier: "  ".to_string(),
            },
        ];

        match validate_batch(&batch).unwrap_err() {
            DomainError::Validation(fields) => {
                let keys: Vec<_> = fields.iter().map(|(k, _)| k.to_string()).collect();
                assert_eq!(keys, vec!["requests[1].quantity", "requests[1].supplier"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }
}
