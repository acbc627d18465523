//! `medstock-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod page;

pub use error::{DomainError, DomainResult, FieldErrors};
pub use id::{MedicineId, MovementId, OperatorId};
pub use page::{Page, Pageable, SortDir, SortSpec};
