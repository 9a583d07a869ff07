use std::sync::Arc;

use pharmadis_infra::{FulfillmentService, InMemoryEventStore, InMemorySnapshotStore, MovementLedger};

type Snapshots = Arc<InMemorySnapshotStore>;
type Fulfillment = FulfillmentService<Arc<InMemoryEventStore>, Snapshots>;

/// Wired application services shared by all handlers.
pub struct AppServices {
    fulfillment: Fulfillment,
    snapshots: Snapshots,
}

/// In-memory infra wiring: event store + snapshot store + ledger.
pub fn build_services() -> AppServices {
    let snapshots: Snapshots = Arc::new(InMemorySnapshotStore::new());
    let ledger = Arc::new(MovementLedger::new(snapshots.clone()));
    let fulfillment = FulfillmentService::new(Arc::new(InMemoryEventStore::new()), ledger);

    AppServices {
        fulfillment,
        snapshots,
    }
}

impl AppServices {
    pub fn fulfillment(&self) -> &Fulfillment {
        &self.fulfillment
    }

    pub fn ledger(&self) -> &Arc<MovementLedger<Snapshots>> {
        self.fulfillment.ledger()
    }

    pub fn snapshots(&self) -> &Snapshots {
        &self.snapshots
    }
}
