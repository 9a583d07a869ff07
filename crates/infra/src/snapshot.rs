use std::collections::BTreeMap;
use std::sync::RwLock;

use pharmadis_core::ProductCode;
use pharmadis_stock::SnapshotStore;

/// In-memory inventory snapshot store.
///
/// Stands in for the read model written by the bulk snapshot-upload
/// pipeline; batch writes become visible atomically under one lock.
#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    quantities: RwLock<BTreeMap<ProductCode, i64>>,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed initial quantities (tests/dev).
    pub fn seeded(entries: impl IntoIterator<Item = (ProductCode, i64)>) -> Self {
        let store = Self::new();
        store.set_quantities(entries.into_iter().collect());
        store
    }
}

impl SnapshotStore for InMemorySnapshotStore {
    fn get_quantity(&self, product_code: &ProductCode) -> Option<i64> {
        let map = self
            .quantities
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.get(product_code).copied()
    }

    fn set_quantities(&self, quantities: BTreeMap<ProductCode, i64>) {
        let mut map = self
            .quantities
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.extend(quantities);
    }

    fn list(&self) -> Vec<(ProductCode, i64)> {
        let map = self
            .quantities
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.iter().map(|(k, v)| (k.clone(), *v)).collect()
    }
}
