use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use chrono::Utc;

use pharmadis_core::MovementId;
use pharmadis_stock::{MovementDraft, MovementError, MovementResult, SnapshotStore, StockMovement};

/// The movement ledger: validates a movement draft against the snapshot
/// store, applies all line deltas as one all-or-nothing unit, and appends
/// the accepted movement to an immutable log.
///
/// The whole apply path runs under one lock, so two concurrent movements can
/// never both read stale stock and both pass the non-negativity check.
/// Replays of an already-applied `movement_id` return the original result
/// without touching the snapshot store, which makes caller-side resubmission
/// safe; no retries happen here.
#[derive(Debug)]
pub struct MovementLedger<S> {
    snapshots: S,
    inner: Mutex<LedgerInner>,
}

#[derive(Debug, Default)]
struct LedgerInner {
    log: Vec<StockMovement>,
    applied: HashMap<MovementId, MovementResult>,
}

impl<S> MovementLedger<S> {
    pub fn new(snapshots: S) -> Self {
        Self {
            snapshots,
            inner: Mutex::new(LedgerInner::default()),
        }
    }

    pub fn snapshots(&self) -> &S {
        &self.snapshots
    }
}

impl<S: SnapshotStore> MovementLedger<S> {
    /// Apply a movement. On success the snapshot store holds the new
    /// quantities and the movement is on the log; on any error neither has
    /// changed.
    pub fn apply(&self, draft: MovementDraft) -> Result<MovementResult, MovementError> {
        let mut inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // Idempotent replay: return the original outcome, apply nothing.
        if let Some(cached) = inner.applied.get(&draft.movement_id) {
            tracing::debug!(movement_id = %draft.movement_id, "movement replayed, returning cached result");
            return Ok(cached.clone());
        }

        draft.validate()?;

        // Compute every target quantity before writing anything: a failing
        // line aborts the whole movement with no partial application.
        let mut quantities: BTreeMap<_, _> = BTreeMap::new();
        for line in &draft.lines {
            let current = self
                .snapshots
                .get_quantity(&line.product_code)
                .ok_or_else(|| MovementError::UnknownProduct {
                    product_code: line.product_code.clone(),
                })?;
            let target = draft.kind.target_quantity(current, line)?;
            quantities.insert(line.product_code.clone(), target);
        }

        self.snapshots.set_quantities(quantities.clone());

        let movement = StockMovement::from_draft(draft, Utc::now());
        let result = MovementResult {
            movement_id: movement.movement_id,
            quantities,
        };

        tracing::info!(
            movement_id = %movement.movement_id,
            kind = %movement.kind,
            lines = movement.lines.len(),
            "movement applied"
        );

        inner.applied.insert(movement.movement_id, result.clone());
        inner.log.push(movement);

        Ok(result)
    }

    /// The immutable ledger, oldest first.
    pub fn movements(&self) -> Vec<StockMovement> {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.log.clone()
    }

    pub fn get(&self, movement_id: MovementId) -> Option<StockMovement> {
        let inner = self
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        inner
            .log
            .iter()
            .find(|m| m.movement_id == movement_id)
            .cloned()
    }
}
