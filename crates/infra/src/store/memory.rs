//! In-memory store for tests and local development.
//!
//! All state sits behind one async mutex. A transaction takes the owned
//! guard for its whole lifetime and works on a copy of the state, writing
//! the copy back on commit; dropping the guard without committing discards
//! the copy. Holding the guard across the transaction also serializes
//! concurrent batches, which is the same observable isolation the Postgres
//! row locks provide (one winner, the loser sees the committed quantities).

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, OwnedMutexGuard};

use medstock_auth::{NewOperator, Operator};
use medstock_catalog::{Medicine, MedicineDraft};
use medstock_core::{MedicineId, MovementId, OperatorId, Page, Pageable, SortDir};
use medstock_movements::{Movement, MovementKind, StagedMovement};

use super::{StockStore, StockTx, StoreError};

#[derive(Debug, Clone, Default)]
struct MemState {
    medicines: BTreeMap<i64, Medicine>,
    operators: BTreeMap<i64, Operator>,
    inbound: BTreeMap<i64, Movement>,
    outbound: BTreeMap<i64, Movement>,
    next_medicine_id: i64,
    next_operator_id: i64,
    next_inbound_id: i64,
    next_outbound_id: i64,
}

impl MemState {
    fn movements(&self, kind: MovementKind) -> &BTreeMap<i64, Movement> {
        match kind {
            MovementKind::Inbound => &self.inbound,
            MovementKind::Outbound => &self.outbound,
        }
    }

    fn next_movement_id(&mut self, kind: MovementKind) -> i64 {
        let counter = match kind {
            MovementKind::Inbound => &mut self.next_inbound_id,
            MovementKind::Outbound => &mut self.next_outbound_id,
        };
        *counter += 1;
        *counter
    }
}

/// In-memory [`StockStore`].
#[derive(Clone, Default)]
pub struct MemStore {
    state: Arc<Mutex<MemState>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }
}

pub struct MemTx {
    guard: OwnedMutexGuard<MemState>,
    work: MemState,
}

#[async_trait]
impl StockTx for MemTx {
    async fn medicines_for_update(
        &mut self,
        ids: &[MedicineId],
    ) -> Result<BTreeMap<MedicineId, Medicine>, StoreError> {
        Ok(ids
            .iter()
            .filter_map(|id| {
                self.work
                    .medicines
                    .get(&id.as_i64())
                    .map(|m| (*id, m.clone()))
            })
            .collect())
    }

    async fn save_medicines(&mut self, medicines: &[Medicine]) -> Result<(), StoreError> {
        for medicine in medicines {
            let row = self
                .work
                .medicines
                .get_mut(&medicine.id.as_i64())
                .ok_or(StoreError::NotFound)?;
            row.quantity = medicine.quantity;
        }
        Ok(())
    }

    async fn insert_movements(
        &mut self,
        kind: MovementKind,
        staged: &[StagedMovement],
        recorded_at: DateTime<Utc>,
    ) -> Result<Vec<Movement>, StoreError> {
        let mut inserted = Vec::with_capacity(staged.len());
        for movement in staged {
            let id = self.work.next_movement_id(kind);
            let record = Movement {
                id: MovementId::from_i64(id),
                medicine_id: movement.medicine_id,
                operator_id: movement.operator_id,
                quantity: movement.quantity,
                original_medicine_quantity: movement.original_medicine_quantity,
                update_transaction_quantity: movement.update_transaction_quantity,
                recorded_at,
                supplier: movement.supplier.clone(),
            };
            match kind {
                MovementKind::Inbound => self.work.inbound.insert(id, record.clone()),
                MovementKind::Outbound => self.work.outbound.insert(id, record.clone()),
            };
            inserted.push(record);
        }
        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let MemTx { mut guard, work } = *self;
        *guard = work;
        Ok(())
    }
}

fn sort_medicines(items: &mut [Medicine], pageable: &Pageable) {
    let (field, dir) = match &pageable.sort {
        Some(sort) => (sort.field.as_str(), sort.dir),
        None => ("id", SortDir::Asc),
    };
    items.sort_by(|a, b| {
        let ordering = match field {
            "name" => a.name.cmp(&b.name),
            "quantity" => a.quantity.cmp(&b.quantity),
            "type" => a.kind.as_str().cmp(b.kind.as_str()),
            _ => a.id.cmp(&b.id),
        };
        match dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

fn sort_movements(items: &mut [Movement], pageable: &Pageable) {
    let (field, dir) = match &pageable.sort {
        Some(sort) => (sort.field.as_str(), sort.dir),
        None => ("id", SortDir::Asc),
    };
    items.sort_by(|a, b| {
        let ordering = match field {
            "medicineId" => a.medicine_id.cmp(&b.medicine_id),
            "quantity" => a.quantity.cmp(&b.quantity),
            "supplier" => a.supplier.cmp(&b.supplier),
            "receivedDate" | "dispatchedDate" => a.recorded_at.cmp(&b.recorded_at),
            _ => a.id.cmp(&b.id),
        };
        match dir {
            SortDir::Asc => ordering,
            SortDir::Desc => ordering.reverse(),
        }
    });
}

fn paginate<T>(items: Vec<T>, pageable: &Pageable) -> Page<T> {
    let total = items.len() as u64;
    let page_items: Vec<T> = items
        .into_iter()
        .skip(pageable.offset() as usize)
        .take(pageable.limit() as usize)
        .collect();
    Page::new(page_items, total, pageable)
}

#[async_trait]
impl StockStore for MemStore {
    async fn begin(&self) -> Result<Box<dyn StockTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemTx { guard, work }))
    }

    async fn insert_medicine(&self, draft: &MedicineDraft) -> Result<Medicine, StoreError> {
        let mut state = self.state.lock().await;
        if state.medicines.values().any(|m| m.name == draft.name) {
            return Err(StoreError::Conflict(format!(
                "medicine name '{}' already exists",
                draft.name
            )));
        }
        state.next_medicine_id += 1;
        let medicine = Medicine {
            id: MedicineId::from_i64(state.next_medicine_id),
            name: draft.name.clone(),
            description: draft.description.clone(),
            quantity: draft.quantity,
            kind: draft.kind,
        };
        state.medicines.insert(medicine.id.as_i64(), medicine.clone());
        Ok(medicine)
    }

    async fn get_medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError> {
        Ok(self.state.lock().await.medicines.get(&id.as_i64()).cloned())
    }

    async fn list_medicines(&self, pageable: &Pageable) -> Result<Page<Medicine>, StoreError> {
        let mut items: Vec<Medicine> =
            self.state.lock().await.medicines.values().cloned().collect();
        sort_medicines(&mut items, pageable);
        Ok(paginate(items, pageable))
    }

    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let row = state
            .medicines
            .get_mut(&medicine.id.as_i64())
            .ok_or(StoreError::NotFound)?;
        row.name = medicine.name.clone();
        row.description = medicine.description.clone();
        row.kind = medicine.kind;
        Ok(())
    }

    async fn delete_medicine(&self, id: MedicineId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let referenced = state
            .inbound
            .values()
            .chain(state.outbound.values())
            .any(|m| m.medicine_id == id);
        if referenced {
            return Err(StoreError::InUse);
        }
        state
            .medicines
            .remove(&id.as_i64())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }

    async fn movements_exist_for_medicine(&self, id: MedicineId) -> Result<bool, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .inbound
            .values()
            .chain(state.outbound.values())
            .any(|m| m.medicine_id == id))
    }

    async fn list_movements(
        &self,
        kind: MovementKind,
        operator_id: OperatorId,
        pageable: &Pageable,
    ) -> Result<Page<Movement>, StoreError> {
        let mut items: Vec<Movement> = self
            .state
            .lock()
            .await
            .movements(kind)
            .values()
            .filter(|m| m.operator_id == operator_id)
            .cloned()
            .collect();
        sort_movements(&mut items, pageable);
        Ok(paginate(items, pageable))
    }

    async fn get_movement(
        &self,
        id: MovementId,
        kind: MovementKind,
        operator_id: OperatorId,
    ) -> Result<Option<Movement>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .movements(kind)
            .get(&id.as_i64())
            .filter(|m| m.operator_id == operator_id)
            .cloned())
    }

    async fn insert_operator(&self, operator: &NewOperator) -> Result<Operator, StoreError> {
        let mut state = self.state.lock().await;
        if state.operators.values().any(|o| o.email == operator.email) {
            return Err(StoreError::Conflict(format!(
                "email '{}' already exists",
                operator.email
            )));
        }
        state.next_operator_id += 1;
        let now = Utc::now();
        let record = Operator {
            id: OperatorId::from_i64(state.next_operator_id),
            name: operator.name.clone(),
            email: operator.email.clone(),
            password_hash: operator.password_hash.clone(),
            role: operator.role,
            created_at: now,
            updated_at: now,
        };
        state.operators.insert(record.id.as_i64(), record.clone());
        Ok(record)
    }

    async fn find_operator_by_email(&self, email: &str) -> Result<Option<Operator>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.operators.values().find(|o| o.email == email).cloned())
    }

    async fn get_operator(&self, id: OperatorId) -> Result<Option<Operator>, StoreError> {
        Ok(self.state.lock().await.operators.get(&id.as_i64()).cloned())
    }

    async fn list_operators(&self) -> Result<Vec<Operator>, StoreError> {
        Ok(self.state.lock().await.operators.values().cloned().collect())
    }

    async fn update_operator(&self, operator: &Operator) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let row = state
            .operators
            .get_mut(&operator.id.as_i64())
            .ok_or(StoreError::NotFound)?;
        *row = operator.clone();
        Ok(())
    }

    async fn delete_operator(&self, id: OperatorId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let referenced = state
            .inbound
            .values()
            .chain(state.outbound.values())
            .any(|m| m.operator_id == id);
        if referenced {
            return Err(StoreError::InUse);
        }
        state
            .operators
            .remove(&id.as_i64())
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}
