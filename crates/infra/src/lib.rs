//! `medstock-infra` — persistence and service orchestration.
//!
//! The domain crates are pure; this crate gives them IO: the store
//! abstraction with its Postgres and in-memory implementations, and the
//! services that open transactions, run domain logic, and persist the
//! results.

pub mod accounts;
pub mod catalog;
pub mod engine;
pub mod identity;
pub mod store;


pub use accounts::AccountService;
pub use catalog::CatalogService;
pub use engine::MovementEngine;
pub use identity::IdentityAdapter;
pub use store::{MemStore, PgStore, StockStore, StockTx, StoreError};
