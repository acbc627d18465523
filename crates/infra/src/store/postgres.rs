//! Postgres-backed store.
//!
//! Isolation model: movement application runs in one transaction that
//! locks the referenced medicine rows with `SELECT ... FOR UPDATE` before
//! reading their quantities. Two concurrent batches touching the same
//! medicine therefore serialize at the row lock; the loser observes the
//! winner's committed quantity, never the same starting snapshot. Locks
//! are taken in ascending id order so competing batches cannot deadlock.
//!
//! Error mapping (per Postgres error code):
//!
//! | Code  | Meaning              | StoreError |
//! |-------|----------------------|------------|
//! | 23505 | unique violation     | `Conflict` |
//! | 23503 | FK violation         | `InUse`    |
//! | other | anything else        | `Backend`  |

use std::collections::BTreeMap;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{FromRow, Postgres, Transaction};
use tracing::instrument;

use medstock_auth::{NewOperator, Operator, Role};
use medstock_catalog::{Medicine, MedicineDraft, MedicineType};
use medstock_core::{MedicineId, MovementId, OperatorId, Page, Pageable, SortDir};
use medstock_movements::{Movement, MovementKind, StagedMovement};

use super::{StockStore, StockTx, StoreError};

/// Postgres-backed store over a sqlx connection pool.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("../../migrations").run(&self.pool).await
    }
}

fn map_sqlx_error(operation: &str, e: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &e {
        match db.code().as_deref() {
            Some("23505") => return StoreError::Conflict(db.message().to_string()),
            Some("23503") => return StoreError::InUse,
            _ => {}
        }
    }
    StoreError::Backend(format!("{operation}: {e}"))
}

fn movement_table(kind: MovementKind) -> &'static str {
    match kind {
        MovementKind::Inbound => "inbound_movements",
        MovementKind::Outbound => "outbound_movements",
    }
}

/// Map a whitelisted wire sort field to its column. Callers validate the
/// whitelist first; anything unexpected falls back to the primary key so
/// no attacker-controlled string ever reaches the SQL text.
fn medicine_column(field: &str) -> &'static str {
    match field {
        "name" => "name",
        "quantity" => "quantity",
        "type" => "kind",
        _ => "id",
    }
}

fn movement_column(field: &str) -> &'static str {
    match field {
        "medicineId" => "medicine_id",
        "quantity" => "quantity",
        "supplier" => "supplier",
        "receivedDate" | "dispatchedDate" => "recorded_at",
        _ => "id",
    }
}

fn order_clause(pageable: &Pageable, column_of: fn(&str) -> &'static str) -> String {
    match &pageable.sort {
        Some(sort) => format!("{} {}", column_of(&sort.field), sort.dir.as_sql()),
        None => format!("id {}", SortDir::Asc.as_sql()),
    }
}

#[derive(FromRow)]
struct MedicineRow {
    id: i64,
    name: String,
    description: String,
    quantity: i64,
    kind: String,
}

impl MedicineRow {
    fn into_medicine(self) -> Result<Medicine, StoreError> {
        let kind = MedicineType::from_str(&self.kind)
            .map_err(|e| StoreError::Backend(format!("corrupt medicine row: {e}")))?;
        Ok(Medicine {
            id: MedicineId::from_i64(self.id),
            name: self.name,
            description: self.description,
            quantity: self.quantity,
            kind,
        })
    }
}

#[derive(FromRow)]
struct MovementRow {
    id: i64,
    medicine_id: i64,
    operator_id: i64,
    quantity: i64,
    original_medicine_quantity: i64,
    update_transaction_quantity: i64,
    recorded_at: DateTime<Utc>,
    supplier: String,
}

impl From<MovementRow> for Movement {
    fn from(row: MovementRow) -> Self {
        Movement {
            id: MovementId::from_i64(row.id),
            medicine_id: MedicineId::from_i64(row.medicine_id),
            operator_id: OperatorId::from_i64(row.operator_id),
            quantity: row.quantity,
            original_medicine_quantity: row.original_medicine_quantity,
            update_transaction_quantity: row.update_transaction_quantity,
            recorded_at: row.recorded_at,
            supplier: row.supplier,
        }
    }
}

#[derive(FromRow)]
struct OperatorRow {
    id: i64,
    name: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OperatorRow {
    fn into_operator(self) -> Result<Operator, StoreError> {
        let role = Role::from_str(&self.role)
            .map_err(|e| StoreError::Backend(format!("corrupt operator row: {e}")))?;
        Ok(Operator {
            id: OperatorId::from_i64(self.id),
            name: self.name,
            email: self.email,
            password_hash: self.password_hash,
            role,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// An open Postgres transaction holding row locks on the medicines being
/// mutated. Dropped without commit ⇒ rolled back by sqlx.
pub struct PgStockTx {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl StockTx for PgStockTx {
    async fn medicines_for_update(
        &mut self,
        ids: &[MedicineId],
    ) -> Result<BTreeMap<MedicineId, Medicine>, StoreError> {
        let raw: Vec<i64> = ids.iter().map(|id| id.as_i64()).collect();
        let rows = sqlx::query_as::<_, MedicineRow>(
            "SELECT id, name, description, quantity, kind
             FROM medicines
             WHERE id = ANY($1)
             ORDER BY id
             FOR UPDATE",
        )
        .bind(&raw)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("medicines_for_update", e))?;

        let mut medicines = BTreeMap::new();
        for row in rows {
            let medicine = row.into_medicine()?;
            medicines.insert(medicine.id, medicine);
        }
        Ok(medicines)
    }

    async fn save_medicines(&mut self, medicines: &[Medicine]) -> Result<(), StoreError> {
        for medicine in medicines {
            let result = sqlx::query("UPDATE medicines SET quantity = $2 WHERE id = $1")
                .bind(medicine.id.as_i64())
                .bind(medicine.quantity)
                .execute(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("save_medicines", e))?;
            if result.rows_affected() == 0 {
                return Err(StoreError::NotFound);
            }
        }
        Ok(())
    }

    async fn insert_movements(
        &mut self,
        kind: MovementKind,
        staged: &[StagedMovement],
        recorded_at: DateTime<Utc>,
    ) -> Result<Vec<Movement>, StoreError> {
        let sql = format!(
            "INSERT INTO {} (medicine_id, operator_id, quantity,
                             original_medicine_quantity, update_transaction_quantity,
                             recorded_at, supplier)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             RETURNING id",
            movement_table(kind)
        );

        let mut inserted = Vec::with_capacity(staged.len());
        for movement in staged {
            let id: i64 = sqlx::query_scalar(&sql)
                .bind(movement.medicine_id.as_i64())
                .bind(movement.operator_id.as_i64())
                .bind(movement.quantity)
                .bind(movement.original_medicine_quantity)
                .bind(movement.update_transaction_quantity)
                .bind(recorded_at)
                .bind(&movement.supplier)
                .fetch_one(&mut *self.tx)
                .await
                .map_err(|e| map_sqlx_error("insert_movements", e))?;

            inserted.push(Movement {
                id: MovementId::from_i64(id),
                medicine_id: movement.medicine_id,
                operator_id: movement.operator_id,
                quantity: movement.quantity,
                original_medicine_quantity: movement.original_medicine_quantity,
                update_transaction_quantity: movement.update_transaction_quantity,
                recorded_at,
                supplier: movement.supplier.clone(),
            });
        }
        Ok(inserted)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| map_sqlx_error("commit", e))
    }
}

#[async_trait]
impl StockStore for PgStore {
    async fn begin(&self) -> Result<Box<dyn StockTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin", e))?;
        Ok(Box::new(PgStockTx { tx }))
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    async fn insert_medicine(&self, draft: &MedicineDraft) -> Result<Medicine, StoreError> {
        let row = sqlx::query_as::<_, MedicineRow>(
            "INSERT INTO medicines (name, description, quantity, kind)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, description, quantity, kind",
        )
        .bind(&draft.name)
        .bind(&draft.description)
        .bind(draft.quantity)
        .bind(draft.kind.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_medicine", e))?;

        row.into_medicine()
    }

    async fn get_medicine(&self, id: MedicineId) -> Result<Option<Medicine>, StoreError> {
        let row = sqlx::query_as::<_, MedicineRow>(
            "SELECT id, name, description, quantity, kind FROM medicines WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_medicine", e))?;

        row.map(MedicineRow::into_medicine).transpose()
    }

    async fn list_medicines(&self, pageable: &Pageable) -> Result<Page<Medicine>, StoreError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM medicines")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_medicines", e))?;

        let sql = format!(
            "SELECT id, name, description, quantity, kind
             FROM medicines
             ORDER BY {}
             OFFSET $1 LIMIT $2",
            order_clause(pageable, medicine_column)
        );
        let rows = sqlx::query_as::<_, MedicineRow>(&sql)
            .bind(pageable.offset())
            .bind(pageable.limit())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_medicines", e))?;

        let items = rows
            .into_iter()
            .map(MedicineRow::into_medicine)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page::new(items, total as u64, pageable))
    }

    async fn update_medicine(&self, medicine: &Medicine) -> Result<(), StoreError> {
        // Catalog updates never touch quantity; that column is owned by
        // the movement transaction path.
        let result = sqlx::query(
            "UPDATE medicines SET name = $2, description = $3, kind = $4 WHERE id = $1",
        )
        .bind(medicine.id.as_i64())
        .bind(&medicine.name)
        .bind(&medicine.description)
        .bind(medicine.kind.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_medicine", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    #[instrument(skip(self), fields(id = %id))]
    async fn delete_medicine(&self, id: MedicineId) -> Result<(), StoreError> {
        if self.movements_exist_for_medicine(id).await? {
            return Err(StoreError::InUse);
        }
        let result = sqlx::query("DELETE FROM medicines WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_medicine", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn movements_exist_for_medicine(&self, id: MedicineId) -> Result<bool, StoreError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM inbound_movements WHERE medicine_id = $1)
                 OR EXISTS(SELECT 1 FROM outbound_movements WHERE medicine_id = $1)",
        )
        .bind(id.as_i64())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("movements_exist_for_medicine", e))?;
        Ok(exists)
    }

    async fn list_movements(
        &self,
        kind: MovementKind,
        operator_id: OperatorId,
        pageable: &Pageable,
    ) -> Result<Page<Movement>, StoreError> {
        let table = movement_table(kind);

        let count_sql = format!("SELECT COUNT(*) FROM {table} WHERE operator_id = $1");
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(operator_id.as_i64())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_movements", e))?;

        let sql = format!(
            "SELECT id, medicine_id, operator_id, quantity,
                    original_medicine_quantity, update_transaction_quantity,
                    recorded_at, supplier
             FROM {table}
             WHERE operator_id = $1
             ORDER BY {}
             OFFSET $2 LIMIT $3",
            order_clause(pageable, movement_column)
        );
        let rows = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(operator_id.as_i64())
            .bind(pageable.offset())
            .bind(pageable.limit())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_movements", e))?;

        let items = rows.into_iter().map(Movement::from).collect();
        Ok(Page::new(items, total as u64, pageable))
    }

    async fn get_movement(
        &self,
        id: MovementId,
        kind: MovementKind,
        operator_id: OperatorId,
    ) -> Result<Option<Movement>, StoreError> {
        let sql = format!(
            "SELECT id, medicine_id, operator_id, quantity,
                    original_medicine_quantity, update_transaction_quantity,
                    recorded_at, supplier
             FROM {}
             WHERE id = $1 AND operator_id = $2",
            movement_table(kind)
        );
        let row = sqlx::query_as::<_, MovementRow>(&sql)
            .bind(id.as_i64())
            .bind(operator_id.as_i64())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_movement", e))?;

        Ok(row.map(Movement::from))
    }

    #[instrument(skip(self, operator), fields(email = %operator.email))]
    async fn insert_operator(&self, operator: &NewOperator) -> Result<Operator, StoreError> {
        let row = sqlx::query_as::<_, OperatorRow>(
            "INSERT INTO operators (name, email, password_hash, role)
             VALUES ($1, $2, $3, $4)
             RETURNING id, name, email, password_hash, role, created_at, updated_at",
        )
        .bind(&operator.name)
        .bind(&operator.email)
        .bind(&operator.password_hash)
        .bind(operator.role.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_operator", e))?;

        row.into_operator()
    }

    async fn find_operator_by_email(&self, email: &str) -> Result<Option<Operator>, StoreError> {
        let row = sqlx::query_as::<_, OperatorRow>(
            "SELECT id, name, email, password_hash, role, created_at, updated_at
             FROM operators WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_operator_by_email", e))?;

        row.map(OperatorRow::into_operator).transpose()
    }

    async fn get_operator(&self, id: OperatorId) -> Result<Option<Operator>, StoreError> {
        let row = sqlx::query_as::<_, OperatorRow>(
            "SELECT id, name, email, password_hash, role, created_at, updated_at
             FROM operators WHERE id = $1",
        )
        .bind(id.as_i64())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("get_operator", e))?;

        row.map(OperatorRow::into_operator).transpose()
    }

    async fn list_operators(&self) -> Result<Vec<Operator>, StoreError> {
        let rows = sqlx::query_as::<_, OperatorRow>(
            "SELECT id, name, email, password_hash, role, created_at, updated_at
             FROM operators ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_operators", e))?;

        rows.into_iter().map(OperatorRow::into_operator).collect()
    }

    async fn update_operator(&self, operator: &Operator) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE operators
             SET name = $2, email = $3, password_hash = $4, role = $5, updated_at = $6
             WHERE id = $1",
        )
        .bind(operator.id.as_i64())
        .bind(&operator.name)
        .bind(&operator.email)
        .bind(&operator.password_hash)
        .bind(operator.role.as_str())
        .bind(operator.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_operator", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn delete_operator(&self, id: OperatorId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM operators WHERE id = $1")
            .bind(id.as_i64())
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete_operator", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}
