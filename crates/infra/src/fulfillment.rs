//! Fulfillment command pipeline.
//!
//! Orchestrates order commands through the event-sourcing lifecycle:
//! load history, rehydrate the aggregate, handle the command (pure decision
//! logic), append the decided events. Mutations are serialized per order id;
//! the event store's optimistic concurrency check backs that up.
//!
//! The `picking -> packed` transition is the one point where the order side
//! touches the movement ledger: the outbound deduction and the state change
//! form a single unit of work under the order's lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use thiserror::Error;
use uuid::Uuid;

use pharmadis_core::{ActorId, Aggregate, AggregateId, ClientId, ExpectedVersion, MovementId, ProductCode};
use pharmadis_orders::{
    ConfirmLine, NewOrderLine, Order, OrderCommand, OrderError, OrderEvent, OrderId, OrderState,
    RecordFoundQuantity, RegisterOrder, TransitionOrder, UnconfirmLine,
};
use pharmadis_stock::{
    MovementDraft, MovementError, MovementKind, MovementLine, MovementResult, SnapshotStore,
};

use crate::event_store::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
use crate::ledger::MovementLedger;

const ORDER_AGGREGATE_TYPE: &str = "orders.order";

/// Fulfillment pipeline failure.
///
/// Domain rejections pass through verbatim; `Concurrency` means a stale
/// version raced the append and the caller should reload and retry.
#[derive(Debug, Error)]
pub enum FulfillmentError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Movement(#[from] MovementError),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("failed to decode stored event: {0}")]
    Deserialize(String),

    #[error("event store error: {0}")]
    Store(EventStoreError),
}

impl From<EventStoreError> for FulfillmentError {
    fn from(value: EventStoreError) -> Self {
        match value {
            EventStoreError::Concurrency(msg) => FulfillmentError::Concurrency(msg),
            other => FulfillmentError::Store(other),
        }
    }
}

/// Result of a state transition: the order after the change, and the
/// movement the packing deduction produced, when one was triggered.
#[derive(Debug)]
pub struct TransitionOutcome {
    pub order: Order,
    pub movement: Option<MovementResult>,
}

pub struct FulfillmentService<ES, S> {
    store: ES,
    ledger: Arc<MovementLedger<S>>,
    order_locks: Mutex<HashMap<OrderId, Arc<Mutex<()>>>>,
}

impl<ES, S> FulfillmentService<ES, S> {
    pub fn new(store: ES, ledger: Arc<MovementLedger<S>>) -> Self {
        Self {
            store,
            ledger,
            order_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn ledger(&self) -> &Arc<MovementLedger<S>> {
        &self.ledger
    }

    fn order_lock(&self, order_id: OrderId) -> Arc<Mutex<()>> {
        let mut locks = self
            .order_locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.entry(order_id).or_default().clone()
    }
}

impl<ES, S> FulfillmentService<ES, S>
where
    ES: EventStore,
    S: SnapshotStore,
{
    /// Register a fully-formed order handed over by checkout.
    pub fn register_order(
        &self,
        client_id: ClientId,
        notes: Option<String>,
        lines: Vec<NewOrderLine>,
    ) -> Result<Order, FulfillmentError> {
        let order_id = OrderId::new(AggregateId::new());
        self.execute(
            order_id,
            OrderCommand::RegisterOrder(RegisterOrder {
                order_id,
                client_id,
                notes,
                lines,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn record_found_quantity(
        &self,
        order_id: OrderId,
        product_code: ProductCode,
        quantity: u32,
    ) -> Result<Order, FulfillmentError> {
        self.execute(
            order_id,
            OrderCommand::RecordFoundQuantity(RecordFoundQuantity {
                order_id,
                product_code,
                quantity,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn confirm_line(
        &self,
        order_id: OrderId,
        product_code: ProductCode,
        proposed_quantity: u32,
    ) -> Result<Order, FulfillmentError> {
        self.execute(
            order_id,
            OrderCommand::ConfirmLine(ConfirmLine {
                order_id,
                product_code,
                proposed_quantity,
                occurred_at: Utc::now(),
            }),
        )
    }

    pub fn unconfirm_line(
        &self,
        order_id: OrderId,
        product_code: ProductCode,
    ) -> Result<Order, FulfillmentError> {
        self.execute(
            order_id,
            OrderCommand::UnconfirmLine(UnconfirmLine {
                order_id,
                product_code,
                occurred_at: Utc::now(),
            }),
        )
    }

    /// Advance the order's lifecycle state.
    ///
    /// Entering `packed` with `deduct_stock` set triggers an outbound
    /// movement for the confirmed found quantity of each line. The movement
    /// is applied before the state change is appended, all under the order's
    /// lock: if the ledger rejects it (e.g. stock changed concurrently), the
    /// transition fails with the ledger's reason verbatim and the order is
    /// unchanged. Either both effects are visible afterwards, or neither.
    pub fn transition(
        &self,
        order_id: OrderId,
        target: OrderState,
        deduct_stock: bool,
        actor: ActorId,
    ) -> Result<TransitionOutcome, FulfillmentError> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut order = self.rehydrate(order_id)?;
        let command = OrderCommand::TransitionOrder(TransitionOrder {
            order_id,
            target,
            occurred_at: Utc::now(),
        });
        let events = order.handle(&command)?;

        let movement = if target == OrderState::Packed && deduct_stock {
            match packed_outbound_draft(&order, actor) {
                Some(draft) => {
                    let result = self.ledger.apply(draft).map_err(|e| {
                        tracing::warn!(
                            order_id = %order_id,
                            error = %e,
                            "packing deduction rejected, transition rolled back"
                        );
                        e
                    })?;
                    Some(result)
                }
                // Every confirmed line was found empty-handed; nothing to
                // deduct, no ledger entry.
                None => None,
            }
        } else {
            None
        };

        self.append(&order, &events)?;
        for event in &events {
            order.apply(event);
        }

        tracing::info!(order_id = %order_id, state = %order.state(), "order transitioned");
        Ok(TransitionOutcome { order, movement })
    }

    /// Rehydrated order, `None` if no such order was ever registered.
    pub fn get_order(&self, order_id: OrderId) -> Result<Option<Order>, FulfillmentError> {
        let order = self.rehydrate(order_id)?;
        Ok(order.exists().then_some(order))
    }

    /// The order's append-only event stream (audit trail).
    pub fn order_events(&self, order_id: OrderId) -> Result<Vec<StoredEvent>, FulfillmentError> {
        Ok(self.store.load_stream(order_id.0)?)
    }

    /// Shared pipeline: load history, rehydrate, decide, append, fold the
    /// new events into the returned aggregate. An empty decision is a no-op.
    fn execute(&self, order_id: OrderId, command: OrderCommand) -> Result<Order, FulfillmentError> {
        let lock = self.order_lock(order_id);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut order = self.rehydrate(order_id)?;
        let events = order.handle(&command)?;
        if events.is_empty() {
            return Ok(order);
        }

        self.append(&order, &events)?;
        for event in &events {
            order.apply(event);
        }
        Ok(order)
    }

    fn rehydrate(&self, order_id: OrderId) -> Result<Order, FulfillmentError> {
        let mut history = self.store.load_stream(order_id.0)?;
        history.sort_by_key(|e| e.sequence_number);

        let mut order = Order::empty(order_id);
        for stored in history {
            let event: OrderEvent = serde_json::from_value(stored.payload)
                .map_err(|e| FulfillmentError::Deserialize(e.to_string()))?;
            order.apply(&event);
        }
        Ok(order)
    }

    fn append(&self, order: &Order, events: &[OrderEvent]) -> Result<Vec<StoredEvent>, FulfillmentError> {
        let expected = ExpectedVersion::Exact(order.version());
        let uncommitted = events
            .iter()
            .map(|event| {
                UncommittedEvent::from_typed(
                    order.id_typed().0,
                    ORDER_AGGREGATE_TYPE,
                    Uuid::now_v7(),
                    event,
                )
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(self.store.append(uncommitted, expected)?)
    }
}

/// Outbound deduction for a packed order: one line per confirmed found
/// quantity, skipping lines where nothing was found (zero is not a valid
/// outbound quantity). `None` when no line contributes.
fn packed_outbound_draft(order: &Order, actor: ActorId) -> Option<MovementDraft> {
    let lines: Vec<MovementLine> = order
        .lines()
        .iter()
        .filter_map(|line| {
            let found = line.found_quantity?;
            (found > 0).then(|| MovementLine {
                product_code: line.product_code.clone(),
                quantity: found,
            })
        })
        .collect();

    if lines.is_empty() {
        return None;
    }

    Some(MovementDraft {
        movement_id: MovementId::new(),
        kind: MovementKind::Outbound,
        actor,
        notes: None,
        source_document: Some(order.id_typed().to_string()),
        lines,
    })
}
