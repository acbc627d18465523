//! `medstock-movements` — stock movement domain (pure, no IO).
//!
//! The batch planner here is the core of the service: it turns a submitted
//! batch of movement requests plus the locked medicine rows into staged
//! movement records and updated quantities, or fails leaving nothing
//! half-applied. The transactional shell around it lives in `medstock-infra`.

pub mod movement;
pub mod plan;

pub use movement::{
    validate_batch, Movement, MovementKind, MovementRequest, StagedMovement,
};
pub use plan::{plan, referenced_ids, BatchPlan};
