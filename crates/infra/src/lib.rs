//! Infrastructure layer: event store, snapshot store, ledger and the
//! fulfillment command pipeline.

pub mod event_store;
pub mod fulfillment;
pub mod ledger;
pub mod snapshot;


pub use event_store::{EventStore, EventStoreError, InMemoryEventStore, StoredEvent, UncommittedEvent};
pub use fulfillment::{FulfillmentError, FulfillmentService, TransitionOutcome};
pub use ledger::MovementLedger;
pub use snapshot::InMemorySnapshotStore;
