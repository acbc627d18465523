//! `medstock-catalog` — medicine catalog domain (pure, no IO).

pub mod enrich;
pub mod medicine;

pub use enrich::{DescriptionSource, NoEnrichment};
pub use medicine::{
    truncate_description, Medicine, MedicineDraft, MedicinePatch, MedicineType,
    DEFAULT_DESCRIPTION, MAX_DESCRIPTION_LEN, MEDICINE_SORT_FIELDS,
};
