//! Store abstraction over the four entity families.
//!
//! Two implementations: [`PgStore`] (Postgres via sqlx, the production
//! backend) and [`MemStore`] (a single-mutex in-memory store for tests and
//! local development). Movement application goes through [`StockTx`], the
//! transactional primitive: medicines referenced by a batch are loaded
//! under row locks, rewritten, and the movement rows inserted, all
//! committing atomically or not at all.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use medstock_auth::{NewOperator, Operator};
use medstock_catalog::{Medicine, MedicineDraft};
use medstock_core::{MedicineId, MovementId, OperatorId, Page, Pageable};
use medstock_movements::{Movement, MovementKind, StagedMovement};

pub mod memory;
pub mod postgres;

pub use memory::MemStore;
pub use postgres::PgStore;

/// Storage-level failure. Services translate these into domain errors with
/// context (which entity collided, what was not found).
#[derive(Debug, Error)]
pub enum StoreError {
    /// Unique-constraint collision.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The targeted row does not exist.
    #[error("not found")]
    NotFound,

    /// Deletion refused; other rows still reference the target.
    #[error("in use")]
    InUse,

    /// Backend failure (connection, protocol, corrupt row).
    #[error("storage backend error: {0}")]
    Backend(String),
}

/// Default translation into the domain error model. Services that can say
/// which entity was involved build their own message instead.
impl From<StoreError> for medstock_core::DomainError {
    fn from(err: StoreError) -> Self {
        use medstock_core::DomainError;
        match err {
            StoreError::Conflict(msg) => DomainError::Conflict(msg),
            StoreError::NotFound => DomainError::not_found("resource not found"),
            StoreError::InUse => DomainError::in_use("record is referenced by existing rows"),
            StoreError::Backend(msg) => DomainError::Internal(msg),
        }
    }
}

/// An open store transaction.
///
/// Dropping a transaction without committing rolls it back; an abort
/// between `begin` and `commit` therefore persists nothing.
#[async_trait]
pub trait StockTx: Send {
    /// Load the given medicines under row locks (`SELECT ... FOR UPDATE`
    /// or equivalent). Ids without a row are simply absent from the map;
    /// the caller decides whether that aborts the batch.
    async fn medicines_for_update(
        &mut self,
        ids: &[MedicineId],
    ) -> Result<BTreeMap<MedicineId, Medicine>, StoreError>;

    /// Write back quantities for rows previously locked in this
    /// transaction. Only `quantity` is rewritten: movement application
    /// never edits catalog attributes.
    async fn save_medicines(&mut self, medicines: &[Medicine]) -> Result<(), StoreError>;

    /// Append staged movements, assigning ids and stamping `recorded_at`.
    /// Returned records are in input order.
    async fn insert_movements(
        &mut self,
        kind: MovementKind,
        staged: &[StagedMovement],
        recorded_at: DateTime<Utc>,
    ) -> Result<Vec<Movement>, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// Durable persistence for medicines, operators, and movements.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StockTx>, StoreError>;

    // Medicines (catalog paths; quantity is only written through StockTx).
    async fn insert_medicine(&self, draft: &MedicineDraft) -> Result<Medicine, StoreError>;
    async fn get_medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError>;
    async fn list_medicines(&self, pageable: &Pageable) -> Result<Page<Medicine>, StoreError>;
    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), StoreError>;
    async fn delete_medicine(&self, id: MedicineId) -> Result<(), StoreError>;
    async fn movements_exist_for_medicine(&self, id: MedicineId) -> Result<bool, StoreError>;

    // Movements (reads; scoped to the owning operator).
    async fn list_movements(
        &self,
        kind: MovementKind,
        operator_id: OperatorId,
        pageable: &Pageable,
    ) -> Result<Page<Movement>, StoreError>;
    async fn get_movement(
        &self,
        id: MovementId,
        kind: MovementKind,
        operator_id: OperatorId,
    ) -> Result<Option<Movement>, StoreError>;

    // Operators.
    async fn insert_operator(&self, operator: &NewOperator) -> Result<Operator, StoreError>;
    async fn find_operator_by_email(&self, email: &str) -> Result<Option<Operator>, StoreError>;
    async fn get_operator(&self, id: OperatorId) -> Result<Option<Operator>, StoreError>;
    async fn list_operators(&self) -> Result<Vec<Operator>, StoreError>;
    async fn update_operator(&self, operator: &Operator) -> Result<(), StoreError>;
    async fn delete_operator(&self, id: OperatorId) -> Result<(), StoreError>;
}
