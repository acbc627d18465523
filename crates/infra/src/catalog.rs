//! Catalog service: medicine CRUD plus creation-time description
//! enrichment.
//!
//! Quantity never changes on these paths; the movement engine owns it.

use std::sync::Arc;

use medstock_catalog::{
    truncate_description, DescriptionSource, Medicine, MedicineDraft, MedicinePatch,
    MedicineType, MEDICINE_SORT_FIELDS,
};
use medstock_core::{DomainError, DomainResult, MedicineId, Page, Pageable};

use crate::store::{StockStore, StoreError};

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn StockStore>,
    descriptions: Arc<dyn DescriptionSource>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn StockStore>, descriptions: Arc<dyn DescriptionSource>) -> Self {
        Self {
            store,
            descriptions,
        }
    }

    /// Create a medicine. The draft is validated first so invalid input
    /// never triggers an external lookup; the description source is then
    /// consulted with the name, and a hit overrides the submitted
    /// description (truncated to the stored maximum).
    pub async fn create(
        &self,
        name: String,
        description: Option<String>,
        kind: MedicineType,
        quantity: Option<i64>,
    ) -> DomainResult<Medicine> {
        let mut draft = MedicineDraft::new(name, description, kind, quantity)?;
        if let Some(found) = self.descriptions.describe(&draft.name).await {
            draft.description = truncate_description(&found);
        }

        match self.store.insert_medicine(&draft).await {
            Ok(medicine) => {
                tracing::info!(id = %medicine.id, name = %medicine.name, "medicine created");
                Ok(medicine)
            }
            Err(StoreError::Conflict(_)) => Err(DomainError::conflict(format!(
                "medicine name '{}' already exists",
                draft.name
            ))),
            Err(other) => Err(other.into()),
        }
    }

    pub async fn get(&self, id: MedicineId) -> DomainResult<Medicine> {
        self.store
            .get_medicine(id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("medicine {id} not found")))
    }

    pub async fn list(&self, pageable: &Pageable) -> DomainResult<Page<Medicine>> {
        pageable.ensure_sort_allowed(MEDICINE_SORT_FIELDS)?;
        Ok(self.store.list_medicines(pageable).await?)
    }

    pub async fn update(&self, id: MedicineId, patch: &MedicinePatch) -> DomainResult<Medicine> {
        let mut medicine = self.get(id).await?;
        medicine.apply_patch(patch)?;
        match self.store.update_medicine(&medicine).await {
            Ok(()) => Ok(medicine),
            Err(StoreError::NotFound) => {
                Err(DomainError::not_found(format!("medicine {id} not found")))
            }
            Err(other) => Err(other.into()),
        }
    }

    /// Delete a medicine. Refused while any movement still references it;
    /// history stays reconcilable against the records that produced it.
    pub async fn delete(&self, id: MedicineId) -> DomainResult<()> {
        match self.store.delete_medicine(id).await {
            Ok(()) => {
                tracing::info!(%id, "medicine deleted");
                Ok(())
            }
            Err(StoreError::NotFound) => {
                Err(DomainError::not_found(format!("medicine {id} not found")))
            }
            Err(StoreError::InUse) => Err(DomainError::in_use(format!(
                "medicine {id} is referenced by existing transactions"
            ))),
            Err(other) => Err(other.into()),
        }
    }
}
