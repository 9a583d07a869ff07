use std::collections::BTreeMap;
use std::sync::Arc;

use pharmadis_core::ProductCode;

/// Port onto the Inventory Snapshot Store (an external collaborator).
///
/// The store owns the current stock quantity per product code. The ledger
/// reads it for validation and writes it after a movement is applied; the
/// bulk snapshot-upload pipeline (out of scope here) feeds it through the
/// same batch-write contract.
pub trait SnapshotStore: Send + Sync {
    /// Current quantity for a product, `None` if the product is unknown.
    fn get_quantity(&self, product_code: &ProductCode) -> Option<i64>;

    /// Atomic batch write: all entries become visible together.
    fn set_quantities(&self, quantities: BTreeMap<ProductCode, i64>);

    /// Full snapshot contents (read model for the API layer).
    fn list(&self) -> Vec<(ProductCode, i64)>;
}

impl<S> SnapshotStore for Arc<S>
where
    S: SnapshotStore + ?Sized,
{
    fn get_quantity(&self, product_code: &ProductCode) -> Option<i64> {
        (**self).get_quantity(product_code)
    }

    fn set_quantities(&self, quantities: BTreeMap<ProductCode, i64>) {
        (**self).set_quantities(quantities)
    }

    fn list(&self) -> Vec<(ProductCode, i64)> {
        (**self).list()
    }
}
