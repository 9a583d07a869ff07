//! `pharmadis-stock`: stock movement domain.
//!
//! A movement is a typed batch of per-product deltas applied against the
//! inventory snapshot as one all-or-nothing unit, then recorded on an
//! immutable ledger. This crate holds the pure rules: movement kinds,
//! batch validation, per-line delta arithmetic and the snapshot-store port.
//! Applying movements (locking, idempotency, the ledger log itself) lives
//! in the infrastructure layer.

pub mod error;
pub mod movement;
pub mod snapshot;

pub use error::MovementError;
pub use movement::{
    MovementDraft, MovementKind, MovementLine, MovementResult, StockMovement,
};
pub use snapshot::SnapshotStore;
