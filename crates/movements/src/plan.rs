//! The batch planner.
//!
//! Runs between "rows locked" and "rows written": given the medicines a
//! transaction loaded for update, it applies a batch in submission order,
//! snapshots before/after quantities on every movement, and refuses to
//! drive any quantity below zero. The planner owns its inputs and returns
//! a complete plan or an error, so a failed batch can never leak a
//! partially-mutated medicine back to the caller.

use std::collections::BTreeMap;

use medstock_catalog::Medicine;
use medstock_core::{DomainError, DomainResult, MedicineId, OperatorId};

use crate::movement::{MovementKind, MovementRequest, StagedMovement};

/// The outcome of planning one batch: updated medicine rows to save and
/// the staged movements to insert, in submission order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub medicines: Vec<Medicine>,
    pub staged: Vec<StagedMovement>,
}

/// Distinct, ordered set of medicine ids a batch references.
pub fn referenced_ids(batch: &[MovementRequest]) -> Vec<MedicineId> {
    let mut ids: Vec<MedicineId> = batch.iter().map(|r| r.medicine_id).collect();
    ids.sort();
    ids.dedup();
    ids
}

/// Plan a batch against the loaded medicines.
///
/// `medicines` must hold exactly the rows the transaction locked; ids the
/// batch references but the map lacks abort the whole batch with
/// [`DomainError::MissingMedicines`]. Requests are applied in submission
/// order, so repeated references to one medicine chain their before/after
/// snapshots. An outbound request that would leave a negative quantity
/// aborts with [`DomainError::InsufficientStock`]; there is no partial
/// fulfilment.
pub fn plan(
    kind: MovementKind,
    operator_id: OperatorId,
    batch: &[MovementRequest],
    medicines: BTreeMap<MedicineId, Medicine>,
) -> DomainResult<BatchPlan> {
    let mut medicines = medicines;

    let missing: Vec<MedicineId> = referenced_ids(batch)
        .into_iter()
        .filter(|id| !medicines.contains_key(id))
        .collect();
    if !missing.is_empty() {
        return Err(DomainError::MissingMedicines(missing));
    }

    let mut staged = Vec::with_capacity(batch.len());
    for (index, request) in batch.iter().enumerate() {
        let medicine = medicines
            .get_mut(&request.medicine_id)
            .expect("missing ids were rejected above");

        let before = medicine.quantity;
        // checked: a quantity near i64::MAX must not wrap stock negative.
        let Some(after) = before.checked_add(kind.signed(request.quantity)) else {
            return Err(DomainError::validation(
                format!("requests[{index}].quantity"),
                "quantity too large",
            ));
        };
        if after < 0 {
            return Err(DomainError::InsufficientStock {
                medicine_id: medicine.id,
                available: before,
                requested: request.quantity,
            });
        }

        medicine.quantity = after;
        staged.push(StagedMovement {
            medicine_id: request.medicine_id,
            operator_id,
            quantity: request.quantity,
            original_medicine_quantity: before,
            update_transaction_quantity: after,
            supplier: request.supplier.clone(),
        });
    }

    Ok(BatchPlan {
        medicines: medicines.into_values().collect(),
        staged,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use medstock_catalog::MedicineType;

    fn med(id: i64, quantity: i64) -> Medicine {
        Medicine {
            id: MedicineId::from_i64(id),
            name: format!("med-{id}"),
            description: "test".to_string(),
            quantity,
            kind: MedicineType::Otc,
        }
    }

    fn loaded(meds: &[Medicine]) -> BTreeMap<MedicineId, Medicine> {
        meds.iter().map(|m| (m.id, m.clone())).collect()
    }

    fn req(id: i64, quantity: i64) -> MovementRequest {
        MovementRequest {
            medicine_id: MedicineId::from_i64(id),
            quantity,
            supplier: "SupA".to_string(),
        }
    }

    fn operator() -> OperatorId {
        OperatorId::from_i64(7)
    }

    #[test]
    fn inbound_snapshots_before_and_after() {
        let plan = plan(
            MovementKind::Inbound,
            operator(),
            &[req(1, 50)],
            loaded(&[med(1, 0)]),
        )
        .unwrap();

        assert_eq!(plan.staged.len(), 1);
        assert_eq!(plan.staged[0].original_medicine_quantity, 0);
        assert_eq!(plan.staged[0].update_transaction_quantity, 50);
        assert_eq!(plan.medicines[0].quantity, 50);
    }

    #[test]
    fn repeated_medicine_in_one_batch_chains_snapshots() {
        let plan = plan(
            MovementKind::Outbound,
            operator(),
            &[req(1, 20), req(1, 10)],
            loaded(&[med(1, 50)]),
        )
        .unwrap();

        assert_eq!(plan.staged[0].original_medicine_quantity, 50);
        assert_eq!(plan.staged[0].update_transaction_quantity, 30);
        assert_eq!(plan.staged[1].original_medicine_quantity, 30);
        assert_eq!(plan.staged[1].update_transaction_quantity, 20);
        assert_eq!(plan.medicines[0].quantity, 20);
    }

    #[test]
    fn overdraw_aborts_with_available_and_requested() {
        let err = plan(
            MovementKind::Outbound,
            operator(),
            &[req(1, 10)],
            loaded(&[med(1, 5)]),
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::InsufficientStock {
                medicine_id: MedicineId::from_i64(1),
                available: 5,
                requested: 10,
            }
        );
    }

    #[test]
    fn overdraw_mid_batch_discards_earlier_stages() {
        // First request would succeed on its own; the batch still fails whole.
        let err = plan(
            MovementKind::Outbound,
            operator(),
            &[req(1, 3), req(1, 10)],
            loaded(&[med(1, 5)]),
        )
        .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
    }

    #[test]
    fn oversized_inbound_quantity_is_rejected_not_wrapped() {
        let err = plan(
            MovementKind::Inbound,
            operator(),
            &[req(1, i64::MAX)],
            loaded(&[med(1, 5)]),
        )
        .unwrap_err();

        let DomainError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        let fields: Vec<&str> = errors.iter().map(|(f, _)| f).collect();
        assert_eq!(fields, vec!["requests[0].quantity"]);
    }

    #[test]
    fn missing_medicines_are_all_reported() {
        let err = plan(
            MovementKind::Inbound,
            operator(),
            &[req(999, 1), req(1, 1), req(1000, 2)],
            loaded(&[med(1, 0)]),
        )
        .unwrap_err();

        assert_eq!(
            err,
            DomainError::MissingMedicines(vec![
                MedicineId::from_i64(999),
                MedicineId::from_i64(1000),
            ])
        );
    }

    mod laws {
        use super::*;
        use proptest::prelude::*;

        const MEDICINES: i64 = 4;

        fn arb_batch() -> impl Strategy<Value = Vec<(i64, i64, bool)>> {
            // (medicine index, quantity, inbound?)
            prop::collection::vec((0..MEDICINES, 1i64..40, any::<bool>()), 1..12)
        }

        fn arb_stock() -> impl Strategy<Value = Vec<i64>> {
            prop::collection::vec(0i64..100, MEDICINES as usize)
        }

        proptest! {
            /// Every staged movement satisfies update = original ± quantity.
            #[test]
            fn snapshot_law(stock in arb_stock(), batch in arb_batch(), inbound in any::<bool>()) {
                let kind = if inbound { MovementKind::Inbound } else { MovementKind::Outbound };
                let meds: Vec<Medicine> =
                    stock.iter().enumerate().map(|(i, q)| med(i as i64 + 1, *q)).collect();
                let requests: Vec<MovementRequest> =
                    batch.iter().map(|(i, q, _)| req(i + 1, *q)).collect();

                if let Ok(plan) = plan(kind, operator(), &requests, loaded(&meds)) {
                    for staged in &plan.staged {
                        prop_assert_eq!(
                            staged.update_transaction_quantity,
                            staged.original_medicine_quantity + kind.signed(staged.quantity)
                        );
                        prop_assert!(staged.update_transaction_quantity >= 0);
                    }
                }
            }

            /// Final quantity of each medicine reconciles with the staged sums.
            #[test]
            fn reconciliation_law(stock in arb_stock(), batch in arb_batch(), inbound in any::<bool>()) {
                let kind = if inbound { MovementKind::Inbound } else { MovementKind::Outbound };
                let meds: Vec<Medicine> =
                    stock.iter().enumerate().map(|(i, q)| med(i as i64 + 1, *q)).collect();
                let requests: Vec<MovementRequest> =
                    batch.iter().map(|(i, q, _)| req(i + 1, *q)).collect();

                if let Ok(plan) = plan(kind, operator(), &requests, loaded(&meds)) {
                    for updated in &plan.medicines {
                        let initial = meds.iter().find(|m| m.id == updated.id).unwrap().quantity;
                        let delta: i64 = plan
                            .staged
                            .iter()
                            .filter(|s| s.medicine_id == updated.id)
                            .map(|s| kind.signed(s.quantity))
                            .sum();
                        prop_assert_eq!(updated.quantity, initial + delta);
                        prop_assert!(updated.quantity >= 0);
                    }
                }
            }

            /// Consecutive stages on one medicine form an unbroken chain.
            #[test]
            fn chain_law(stock in arb_stock(), batch in arb_batch()) {
                let meds: Vec<Medicine> =
                    stock.iter().enumerate().map(|(i, q)| med(i as i64 + 1, *q)).collect();
                let requests: Vec<MovementRequest> =
                    batch.iter().map(|(i, q, _)| req(i + 1, *q)).collect();

                if let Ok(plan) = plan(MovementKind::Inbound, operator(), &requests, loaded(&meds)) {
                    let mut last: BTreeMap<MedicineId, i64> = BTreeMap::new();
                    for staged in &plan.staged {
                        if let Some(prev_after) = last.get(&staged.medicine_id) {
                            prop_assert_eq!(staged.original_medicine_quantity, *prev_after);
                        }
                        last.insert(staged.medicine_id, staged.update_transaction_quantity);
                    }
                }
            }

            /// A failing batch yields no plan at all: the caller's rows are
            /// returned untouched because the planner consumed them.
            #[test]
            fn all_or_nothing(stock in arb_stock(), batch in arb_batch()) {
                let meds: Vec<Medicine> =
                    stock.iter().enumerate().map(|(i, q)| med(i as i64 + 1, *q)).collect();
                let requests: Vec<MovementRequest> =
                    batch.iter().map(|(i, q, _)| req(i + 1, *q)).collect();

                let result = plan(MovementKind::Outbound, operator(), &requests, loaded(&meds));
                if result.is_err() {
                    // Planning again from the same snapshot fails identically:
                    // nothing was consumed from the caller's state.
                    let again = plan(MovementKind::Outbound, operator(), &requests, loaded(&meds));
                    prop_assert_eq!(result, again);
                }
            }
        }
    }
}
