//! Movement application: the transactional stock-mutation path.
//!
//! The engine is thin on purpose. Validation and planning live in the
//! `medstock-movements` crate as pure functions; the engine only
//! orchestrates them inside a store transaction so the whole batch
//! commits or nothing does.

use std::sync::Arc;

use chrono::Utc;

use medstock_auth::Operator;
use medstock_core::{DomainError, DomainResult, MovementId, Page, Pageable};
use medstock_movements::{
    plan, referenced_ids, validate_batch, Movement, MovementKind, MovementRequest,
};

use crate::store::StockStore;

/// Applies movement batches and serves operator-scoped movement reads.
#[derive(Clone)]
pub struct MovementEngine {
    store: Arc<dyn StockStore>,
}

impl MovementEngine {
    pub fn new(store: Arc<dyn StockStore>) -> Self {
        Self { store }
    }

    /// Apply one batch atomically.
    ///
    /// Flow: validate the shape, lock every referenced medicine, plan the
    /// quantity changes, then write medicines and movement rows in one
    /// transaction. Any failure before commit leaves stock untouched.
    pub async fn apply(
        &self,
        kind: MovementKind,
        batch: &[MovementRequest],
        operator: &Operator,
    ) -> DomainResult<Vec<Movement>> {
        validate_batch(batch)?;

        let ids = referenced_ids(batch);
        let mut tx = self.store.begin().await?;
        let medicines = tx.medicines_for_update(&ids).await?;
        let batch_plan = plan(kind, operator.id, batch, medicines)?;
        tx.save_medicines(&batch_plan.medicines).await?;
        let recorded = tx
            .insert_movements(kind, &batch_plan.staged, Utc::now())
            .await?;
        tx.commit().await?;

        tracing::info!(
            %kind,
            operator = %operator.email,
            movements = recorded.len(),
            medicines = batch_plan.medicines.len(),
            "movement batch applied"
        );
        Ok(recorded)
    }

    /// List the calling operator's movements of one kind.
    pub async fn list(
        &self,
        kind: MovementKind,
        operator: &Operator,
        pageable: &Pageable,
    ) -> DomainResult<Page<Movement>> {
        pageable.ensure_sort_allowed(kind.sort_fields())?;
        Ok(self.store.list_movements(kind, operator.id, pageable).await?)
    }

    /// Fetch one movement; records of other operators read as absent.
    pub async fn get(
        &self,
        kind: MovementKind,
        id: MovementId,
        operator: &Operator,
    ) -> DomainResult<Movement> {
        self.store
            .get_movement(id, kind, operator.id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("{kind} movement {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemStore;
    use medstock_auth::Role;
    use medstock_catalog::{MedicineDraft, MedicineType};
    use medstock_core::{MedicineId, OperatorId, SortDir, SortSpec};

    fn operator(id: i64) -> Operator {
        let now = Utc::now();
        Operator {
            id: OperatorId::from_i64(id),
            name: format!("op{id}"),
            email: format!("op{id}@example.com"),
            password_hash: String::new(),
            role: Role::User,
            created_at: now,
            updated_at: now,
        }
    }

    async fn seed_medicine(store: &MemStore, name: &str, quantity: i64) -> MedicineId {
        let draft =
            MedicineDraft::new(name.to_string(), None, MedicineType::Otc, Some(quantity))
                .unwrap();
        store.insert_medicine(&draft).await.unwrap().id
    }

    fn request(medicine_id: MedicineId, quantity: i64) -> MovementRequest {
        MovementRequest {
            medicine_id,
            quantity,
            supplier: "Acme Pharma".to_string(),
        }
    }

    #[tokio::test]
    async fn inbound_batch_raises_stock_and_snapshots() {
        let store = MemStore::new();
        let id = seed_medicine(&store, "aspirin", 0).await;
        let engine = MovementEngine::new(Arc::new(store.clone()));
        let op = operator(1);

        let recorded = engine
            .apply(MovementKind::Inbound, &[request(id, 50)], &op)
            .await
            .unwrap();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].original_medicine_quantity, 0);
        assert_eq!(recorded[0].update_transaction_quantity, 50);
        assert_eq!(store.get_medicine(id).await.unwrap().unwrap().quantity, 50);
    }

    #[tokio::test]
    async fn failed_batch_leaves_stock_untouched() {
        let store = MemStore::new();
        let id = seed_medicine(&store, "ibuprofen", 10).await;
        let engine = MovementEngine::new(Arc::new(store.clone()));
        let op = operator(1);

        let err = engine
            .apply(
                MovementKind::Outbound,
                &[request(id, 4), request(id, 8)],
                &op,
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InsufficientStock { .. }));
        assert_eq!(store.get_medicine(id).await.unwrap().unwrap().quantity, 10);
    }

    #[tokio::test]
    async fn missing_medicine_aborts_with_every_missing_id() {
        let store = MemStore::new();
        let id = seed_medicine(&store, "paracetamol", 5).await;
        let engine = MovementEngine::new(Arc::new(store));
        let op = operator(1);

        let err = engine
            .apply(
                MovementKind::Inbound,
                &[
                    request(id, 1),
                    request(MedicineId::from_i64(999), 1),
                    request(MedicineId::from_i64(1000), 1),
                ],
                &op,
            )
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::MissingMedicines(vec![
                MedicineId::from_i64(999),
                MedicineId::from_i64(1000)
            ])
        );
    }

    #[tokio::test]
    async fn reads_are_scoped_to_the_operator() {
        let store = MemStore::new();
        let id = seed_medicine(&store, "amoxicillin", 0).await;
        let engine = MovementEngine::new(Arc::new(store));
        let alice = operator(1);
        let bob = operator(2);

        let recorded = engine
            .apply(MovementKind::Inbound, &[request(id, 3)], &alice)
            .await
            .unwrap();
        let movement_id = recorded[0].id;

        assert!(engine
            .get(MovementKind::Inbound, movement_id, &alice)
            .await
            .is_ok());
        assert!(matches!(
            engine.get(MovementKind::Inbound, movement_id, &bob).await,
            Err(DomainError::NotFound(_))
        ));

        let page = engine
            .list(MovementKind::Inbound, &bob, &Pageable::new(0, 20, None))
            .await
            .unwrap();
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn list_rejects_sort_fields_of_the_other_kind() {
        let store = MemStore::new();
        let engine = MovementEngine::new(Arc::new(store));
        let op = operator(1);

        let pageable = Pageable::new(
            0,
            20,
            Some(SortSpec::new("dispatchedDate", SortDir::Desc)),
        );
        let err = engine
            .list(MovementKind::Inbound, &op, &pageable)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
