use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmadis_core::{Aggregate, AggregateId, ClientId, Event, ProductCode};

use crate::error::OrderError;
use crate::reconciliation::{self, Completeness};
use crate::state::OrderState;

/// Order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(pub AggregateId);

impl OrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for OrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Line as supplied by checkout: description is a denormalized snapshot
/// taken at order time, ordered quantity is fixed at creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewOrderLine {
    pub product_code: ProductCode,
    pub description: String,
    pub ordered_quantity: u32,
}

/// One product within an order, carrying its reconciliation annotations.
///
/// `found_quantity` is `None` until picking records a value; `completeness`
/// is derived at confirmation time and cleared again on unconfirm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_code: ProductCode,
    pub description: String,
    pub ordered_quantity: u32,
    pub found_quantity: Option<u32>,
    pub confirmed: bool,
    pub completeness: Option<Completeness>,
}

impl OrderLine {
    pub fn new(line: NewOrderLine) -> Self {
        Self {
            product_code: line.product_code,
            description: line.description,
            ordered_quantity: line.ordered_quantity,
            found_quantity: None,
            confirmed: false,
            completeness: None,
        }
    }
}

/// Aggregate root: Order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    id: OrderId,
    client_id: Option<ClientId>,
    notes: Option<String>,
    state: OrderState,
    lines: Vec<OrderLine>,
    created_at: Option<DateTime<Utc>>,
    version: u64,
    created: bool,
}

impl Order {
    /// Create an empty, not-yet-registered aggregate instance for rehydration.
    pub fn empty(id: OrderId) -> Self {
        Self {
            id,
            client_id: None,
            notes: None,
            state: OrderState::Created,
            lines: Vec::new(),
            created_at: None,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> OrderId {
        self.id
    }

    pub fn client_id(&self) -> Option<ClientId> {
        self.client_id
    }

    pub fn notes(&self) -> Option<&str> {
        self.notes.as_deref()
    }

    pub fn state(&self) -> OrderState {
        self.state
    }

    pub fn lines(&self) -> &[OrderLine] {
        &self.lines
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn line(&self, product_code: &ProductCode) -> Option<&OrderLine> {
        self.lines.iter().find(|l| &l.product_code == product_code)
    }

    pub fn exists(&self) -> bool {
        self.created
    }

    pub fn is_fully_reconciled(&self) -> bool {
        reconciliation::is_fully_reconciled(&self.lines)
    }

    pub fn unconfirmed_codes(&self) -> Vec<ProductCode> {
        reconciliation::unconfirmed_codes(&self.lines)
    }
}

/// Command: RegisterOrder (the checkout boundary hands over a fully-formed
/// order; this core never composes carts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterOrder {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: TransitionOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOrder {
    pub order_id: OrderId,
    pub target: OrderState,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RecordFoundQuantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFoundQuantity {
    pub order_id: OrderId,
    pub product_code: ProductCode,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: ConfirmLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmLine {
    pub order_id: OrderId,
    pub product_code: ProductCode,
    pub proposed_quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UnconfirmLine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnconfirmLine {
    pub order_id: OrderId,
    pub product_code: ProductCode,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderCommand {
    RegisterOrder(RegisterOrder),
    TransitionOrder(TransitionOrder),
    RecordFoundQuantity(RecordFoundQuantity),
    ConfirmLine(ConfirmLine),
    UnconfirmLine(UnconfirmLine),
}

/// Event: OrderRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRegistered {
    pub order_id: OrderId,
    pub client_id: ClientId,
    pub notes: Option<String>,
    pub lines: Vec<NewOrderLine>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: OrderStateChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderStateChanged {
    pub order_id: OrderId,
    pub from: OrderState,
    pub to: OrderState,
    pub occurred_at: DateTime<Utc>,
}

/// Event: FoundQuantityRecorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FoundQuantityRecorded {
    pub order_id: OrderId,
    pub product_code: ProductCode,
    pub quantity: u32,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineConfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineConfirmed {
    pub order_id: OrderId,
    pub product_code: ProductCode,
    pub found_quantity: u32,
    pub completeness: Completeness,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineUnconfirmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineUnconfirmed {
    pub order_id: OrderId,
    pub product_code: ProductCode,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderEvent {
    OrderRegistered(OrderRegistered),
    OrderStateChanged(OrderStateChanged),
    FoundQuantityRecorded(FoundQuantityRecorded),
    LineConfirmed(LineConfirmed),
    LineUnconfirmed(LineUnconfirmed),
}

impl Event for OrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::OrderRegistered(_) => "orders.order.registered",
            OrderEvent::OrderStateChanged(_) => "orders.order.state_changed",
            OrderEvent::FoundQuantityRecorded(_) => "orders.order.found_quantity_recorded",
            OrderEvent::LineConfirmed(_) => "orders.order.line_confirmed",
            OrderEvent::LineUnconfirmed(_) => "orders.order.line_unconfirmed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            OrderEvent::OrderRegistered(e) => e.occurred_at,
            OrderEvent::OrderStateChanged(e) => e.occurred_at,
            OrderEvent::FoundQuantityRecorded(e) => e.occurred_at,
            OrderEvent::LineConfirmed(e) => e.occurred_at,
            OrderEvent::LineUnconfirmed(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Order {
    type Id = OrderId;
    type Command = OrderCommand;
    type Event = OrderEvent;
    type Error = OrderError;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match event {
            OrderEvent::OrderRegistered(e) => {
                self.id = e.order_id;
                self.client_id = Some(e.client_id);
                self.notes = e.notes.clone();
                self.state = OrderState::Created;
                self.lines = e.lines.iter().cloned().map(OrderLine::new).collect();
                self.created_at = Some(e.occurred_at);
                self.created = true;
            }
            OrderEvent::OrderStateChanged(e) => {
                self.state = e.to;
            }
            OrderEvent::FoundQuantityRecorded(e) => {
                if let Some(line) = self.line_mut(&e.product_code) {
                    line.found_quantity = Some(e.quantity);
                }
            }
            OrderEvent::LineConfirmed(e) => {
                if let Some(line) = self.line_mut(&e.product_code) {
                    line.found_quantity = Some(e.found_quantity);
                    line.confirmed = true;
                    line.completeness = Some(e.completeness);
                }
            }
            OrderEvent::LineUnconfirmed(e) => {
                if let Some(line) = self.line_mut(&e.product_code) {
                    line.confirmed = false;
                    line.completeness = None;
                }
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            OrderCommand::RegisterOrder(cmd) => self.handle_register(cmd),
            OrderCommand::TransitionOrder(cmd) => self.handle_transition(cmd),
            OrderCommand::RecordFoundQuantity(cmd) => self.handle_record_found(cmd),
            OrderCommand::ConfirmLine(cmd) => self.handle_confirm(cmd),
            OrderCommand::UnconfirmLine(cmd) => self.handle_unconfirm(cmd),
        }
    }
}

impl Order {
    fn line_mut(&mut self, product_code: &ProductCode) -> Option<&mut OrderLine> {
        self.lines.iter_mut().find(|l| &l.product_code == product_code)
    }

    fn ensure_order_id(&self, order_id: OrderId) -> Result<(), OrderError> {
        if self.id != order_id {
            return Err(OrderError::validation("order_id mismatch"));
        }
        Ok(())
    }

    /// Line-level actions share the same preconditions: the order exists,
    /// it is being picked, and the addressed line is on it.
    fn picking_line(&self, order_id: OrderId, product_code: &ProductCode) -> Result<&OrderLine, OrderError> {
        if !self.created {
            return Err(OrderError::NotFound);
        }
        self.ensure_order_id(order_id)?;

        if self.state != OrderState::Picking {
            return Err(OrderError::NotPicking { state: self.state });
        }

        self.line(product_code).ok_or_else(|| OrderError::LineNotFound {
            product_code: product_code.clone(),
        })
    }

    fn handle_register(&self, cmd: &RegisterOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if self.created {
            return Err(OrderError::AlreadyExists);
        }

        if cmd.lines.is_empty() {
            return Err(OrderError::validation("order must have at least one line"));
        }

        let mut seen: HashSet<&ProductCode> = HashSet::with_capacity(cmd.lines.len());
        for line in &cmd.lines {
            if !seen.insert(&line.product_code) {
                return Err(OrderError::validation(format!(
                    "duplicate line for product {}",
                    line.product_code
                )));
            }
            if line.ordered_quantity == 0 {
                return Err(OrderError::validation(format!(
                    "ordered quantity must be positive for product {}",
                    line.product_code
                )));
            }
        }

        Ok(vec![OrderEvent::OrderRegistered(OrderRegistered {
            order_id: cmd.order_id,
            client_id: cmd.client_id,
            notes: cmd.notes.clone(),
            lines: cmd.lines.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_transition(&self, cmd: &TransitionOrder) -> Result<Vec<OrderEvent>, OrderError> {
        if !self.created {
            return Err(OrderError::NotFound);
        }
        self.ensure_order_id(cmd.order_id)?;

        if !self.state.can_transition_to(cmd.target) {
            return Err(OrderError::InvalidTransition {
                from: self.state,
                to: cmd.target,
            });
        }

        // The one guarded edge: packing requires every line confirmed.
        if cmd.target == OrderState::Packed && !self.is_fully_reconciled() {
            return Err(OrderError::ReconciliationIncomplete {
                unconfirmed: self.unconfirmed_codes(),
            });
        }

        Ok(vec![OrderEvent::OrderStateChanged(OrderStateChanged {
            order_id: cmd.order_id,
            from: self.state,
            to: cmd.target,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_record_found(&self, cmd: &RecordFoundQuantity) -> Result<Vec<OrderEvent>, OrderError> {
        let line = self.picking_line(cmd.order_id, &cmd.product_code)?;

        if line.confirmed {
            return Err(OrderError::LineAlreadyConfirmed {
                product_code: cmd.product_code.clone(),
            });
        }

        // No upper bound against ordered_quantity: surplus is a valid
        // outcome, flagged by completeness at confirmation time.
        Ok(vec![OrderEvent::FoundQuantityRecorded(FoundQuantityRecorded {
            order_id: cmd.order_id,
            product_code: cmd.product_code.clone(),
            quantity: cmd.quantity,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_confirm(&self, cmd: &ConfirmLine) -> Result<Vec<OrderEvent>, OrderError> {
        let line = self.picking_line(cmd.order_id, &cmd.product_code)?;

        if line.confirmed {
            return Err(OrderError::LineAlreadyConfirmed {
                product_code: cmd.product_code.clone(),
            });
        }

        if !reconciliation::quantity_match(cmd.proposed_quantity, line.found_quantity) {
            return Err(OrderError::QuantityMismatch {
                product_code: cmd.product_code.clone(),
                proposed: cmd.proposed_quantity,
                found: line.found_quantity,
            });
        }

        let found = cmd.proposed_quantity;
        Ok(vec![OrderEvent::LineConfirmed(LineConfirmed {
            order_id: cmd.order_id,
            product_code: cmd.product_code.clone(),
            found_quantity: found,
            completeness: reconciliation::classify(found, line.ordered_quantity),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_unconfirm(&self, cmd: &UnconfirmLine) -> Result<Vec<OrderEvent>, OrderError> {
        let line = self.picking_line(cmd.order_id, &cmd.product_code)?;

        // Unconfirming an unconfirmed line is a no-op, not an error.
        if !line.confirmed {
            return Ok(vec![]);
        }

        Ok(vec![OrderEvent::LineUnconfirmed(LineUnconfirmed {
            order_id: cmd.order_id,
            product_code: cmd.product_code.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmadis_core::AggregateId;

    fn test_order_id() -> OrderId {
        OrderId::new(AggregateId::new())
    }

    fn test_client_id() -> ClientId {
        ClientId::new()
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn new_line(s: &str, ordered: u32) -> NewOrderLine {
        NewOrderLine {
            product_code: code(s),
            description: format!("{s} description"),
            ordered_quantity: ordered,
        }
    }

    fn registered_order(lines: Vec<NewOrderLine>) -> Order {
        let order_id = test_order_id();
        let mut order = Order::empty(order_id);
        let cmd = RegisterOrder {
            order_id,
            client_id: test_client_id(),
            notes: None,
            lines,
            occurred_at: test_time(),
        };
        let events = order.handle(&OrderCommand::RegisterOrder(cmd)).unwrap();
        order.apply(&events[0]);
        order
    }

    fn apply_all(order: &mut Order, events: Vec<OrderEvent>) {
        for e in &events {
            order.apply(e);
        }
    }

    fn transition(order: &mut Order, target: OrderState) -> Result<(), OrderError> {
        let cmd = TransitionOrder {
            order_id: order.id_typed(),
            target,
            occurred_at: test_time(),
        };
        let events = order.handle(&OrderCommand::TransitionOrder(cmd))?;
        apply_all(order, events);
        Ok(())
    }

    fn record(order: &mut Order, s: &str, quantity: u32) -> Result<(), OrderError> {
        let cmd = RecordFoundQuantity {
            order_id: order.id_typed(),
            product_code: code(s),
            quantity,
            occurred_at: test_time(),
        };
        let events = order.handle(&OrderCommand::RecordFoundQuantity(cmd))?;
        apply_all(order, events);
        Ok(())
    }

    fn confirm(order: &mut Order, s: &str, proposed: u32) -> Result<(), OrderError> {
        let cmd = ConfirmLine {
            order_id: order.id_typed(),
            product_code: code(s),
            proposed_quantity: proposed,
            occurred_at: test_time(),
        };
        let events = order.handle(&OrderCommand::ConfirmLine(cmd))?;
        apply_all(order, events);
        Ok(())
    }

    fn picking_order(lines: Vec<NewOrderLine>) -> Order {
        let mut order = registered_order(lines);
        transition(&mut order, OrderState::Pending).unwrap();
        transition(&mut order, OrderState::Picking).unwrap();
        order
    }

    #[test]
    fn register_order_emits_order_registered_event() {
        let order_id = test_order_id();
        let order = Order::empty(order_id);
        let client_id = test_client_id();
        let cmd = RegisterOrder {
            order_id,
            client_id,
            notes: Some("urgent".to_string()),
            lines: vec![new_line("P1", 10)],
            occurred_at: test_time(),
        };

        let events = order.handle(&OrderCommand::RegisterOrder(cmd)).unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            OrderEvent::OrderRegistered(e) => {
                assert_eq!(e.order_id, order_id);
                assert_eq!(e.client_id, client_id);
                assert_eq!(e.lines.len(), 1);
            }
            _ => panic!("Expected OrderRegistered event"),
        }
    }

    #[test]
    fn registered_order_starts_created_with_unpicked_lines() {
        let order = registered_order(vec![new_line("P1", 10), new_line("P2", 4)]);
        assert_eq!(order.state(), OrderState::Created);
        assert_eq!(order.lines().len(), 2);
        for line in order.lines() {
            assert_eq!(line.found_quantity, None);
            assert!(!line.confirmed);
            assert_eq!(line.completeness, None);
        }
    }

    #[test]
    fn register_rejects_empty_lines() {
        let order = Order::empty(test_order_id());
        let cmd = RegisterOrder {
            order_id: order.id_typed(),
            client_id: test_client_id(),
            notes: None,
            lines: vec![],
            occurred_at: test_time(),
        };
        let err = order.handle(&OrderCommand::RegisterOrder(cmd)).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn register_rejects_duplicate_product_codes() {
        let order = Order::empty(test_order_id());
        let cmd = RegisterOrder {
            order_id: order.id_typed(),
            client_id: test_client_id(),
            notes: None,
            lines: vec![new_line("P1", 1), new_line("P1", 2)],
            occurred_at: test_time(),
        };
        let err = order.handle(&OrderCommand::RegisterOrder(cmd)).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn register_rejects_zero_ordered_quantity() {
        let order = Order::empty(test_order_id());
        let cmd = RegisterOrder {
            order_id: order.id_typed(),
            client_id: test_client_id(),
            notes: None,
            lines: vec![new_line("P1", 0)],
            occurred_at: test_time(),
        };
        let err = order.handle(&OrderCommand::RegisterOrder(cmd)).unwrap_err();
        assert!(matches!(err, OrderError::Validation(_)));
    }

    #[test]
    fn register_rejects_duplicate_registration() {
        let order = registered_order(vec![new_line("P1", 1)]);
        let cmd = RegisterOrder {
            order_id: order.id_typed(),
            client_id: test_client_id(),
            notes: None,
            lines: vec![new_line("P1", 1)],
            occurred_at: test_time(),
        };
        let err = order.handle(&OrderCommand::RegisterOrder(cmd)).unwrap_err();
        assert_eq!(err, OrderError::AlreadyExists);
    }

    #[test]
    fn full_lifecycle_created_to_delivered() {
        let mut order = picking_order(vec![new_line("P1", 10)]);
        record(&mut order, "P1", 10).unwrap();
        confirm(&mut order, "P1", 10).unwrap();

        transition(&mut order, OrderState::Packed).unwrap();
        transition(&mut order, OrderState::Shipped).unwrap();
        transition(&mut order, OrderState::Delivered).unwrap();
        assert_eq!(order.state(), OrderState::Delivered);
    }

    #[test]
    fn invalid_transition_is_rejected_and_state_unchanged() {
        let mut order = registered_order(vec![new_line("P1", 1)]);
        let err = transition(&mut order, OrderState::Picking).unwrap_err();
        match err {
            OrderError::InvalidTransition { from, to } => {
                assert_eq!(from, OrderState::Created);
                assert_eq!(to, OrderState::Picking);
            }
            other => panic!("expected InvalidTransition, got {other:?}"),
        }
        assert_eq!(order.state(), OrderState::Created);
    }

    #[test]
    fn cancellation_is_allowed_before_delivery() {
        for advance in 0..5usize {
            let mut order = registered_order(vec![new_line("P1", 1)]);
            let path = [
                OrderState::Pending,
                OrderState::Picking,
                OrderState::Packed,
                OrderState::Shipped,
            ];
            for target in path.iter().take(advance) {
                if *target == OrderState::Packed {
                    record(&mut order, "P1", 1).unwrap();
                    confirm(&mut order, "P1", 1).unwrap();
                }
                transition(&mut order, *target).unwrap();
            }
            transition(&mut order, OrderState::Cancelled).unwrap();
            assert_eq!(order.state(), OrderState::Cancelled);
        }
    }

    #[test]
    fn cancelled_order_is_terminal() {
        let mut order = registered_order(vec![new_line("P1", 1)]);
        transition(&mut order, OrderState::Cancelled).unwrap();
        let err = transition(&mut order, OrderState::Pending).unwrap_err();
        assert!(matches!(err, OrderError::InvalidTransition { .. }));
    }

    #[test]
    fn packing_requires_every_line_confirmed() {
        let mut order = picking_order(vec![new_line("P1", 10), new_line("P2", 5), new_line("P3", 2)]);
        record(&mut order, "P1", 10).unwrap();
        confirm(&mut order, "P1", 10).unwrap();
        record(&mut order, "P2", 5).unwrap();

        let err = transition(&mut order, OrderState::Packed).unwrap_err();
        match err {
            OrderError::ReconciliationIncomplete { unconfirmed } => {
                assert_eq!(unconfirmed, vec![code("P2"), code("P3")]);
            }
            other => panic!("expected ReconciliationIncomplete, got {other:?}"),
        }
        assert_eq!(order.state(), OrderState::Picking);
    }

    #[test]
    fn incomplete_line_does_not_block_packing_once_confirmed() {
        // Ordered 10, found 7: the line is incomplete but confirmed, so the
        // order packs.
        let mut order = picking_order(vec![new_line("P1", 10)]);
        record(&mut order, "P1", 7).unwrap();
        confirm(&mut order, "P1", 7).unwrap();

        let line = order.line(&code("P1")).unwrap();
        assert_eq!(line.completeness, Some(Completeness::Incomplete));

        transition(&mut order, OrderState::Packed).unwrap();
        assert_eq!(order.state(), OrderState::Packed);
    }

    #[test]
    fn confirm_requires_exact_match_with_recorded_quantity() {
        let mut order = picking_order(vec![new_line("P1", 10)]);
        record(&mut order, "P1", 7).unwrap();

        let err = confirm(&mut order, "P1", 8).unwrap_err();
        match err {
            OrderError::QuantityMismatch { product_code, proposed, found } => {
                assert_eq!(product_code, code("P1"));
                assert_eq!(proposed, 8);
                assert_eq!(found, Some(7));
            }
            other => panic!("expected QuantityMismatch, got {other:?}"),
        }
        assert!(!order.line(&code("P1")).unwrap().confirmed);
    }

    #[test]
    fn confirm_without_recorded_quantity_fails() {
        let mut order = picking_order(vec![new_line("P1", 10)]);
        let err = confirm(&mut order, "P1", 0).unwrap_err();
        match err {
            OrderError::QuantityMismatch { found, .. } => assert_eq!(found, None),
            other => panic!("expected QuantityMismatch, got {other:?}"),
        }
    }

    #[test]
    fn completeness_classification_on_confirm() {
        let cases = [(10u32, Completeness::Complete), (7, Completeness::Incomplete), (12, Completeness::Surplus)];
        for (found, expected) in cases {
            let mut order = picking_order(vec![new_line("P1", 10)]);
            record(&mut order, "P1", found).unwrap();
            confirm(&mut order, "P1", found).unwrap();
            let line = order.line(&code("P1")).unwrap();
            assert_eq!(line.completeness, Some(expected));
            assert!(line.confirmed);
        }
    }

    #[test]
    fn recording_on_a_confirmed_line_is_rejected() {
        let mut order = picking_order(vec![new_line("P1", 10)]);
        record(&mut order, "P1", 10).unwrap();
        confirm(&mut order, "P1", 10).unwrap();

        let err = record(&mut order, "P1", 3).unwrap_err();
        assert!(matches!(err, OrderError::LineAlreadyConfirmed { .. }));
    }

    #[test]
    fn unconfirm_keeps_found_quantity_for_reentry() {
        let mut order = picking_order(vec![new_line("P1", 10)]);
        record(&mut order, "P1", 7).unwrap();
        confirm(&mut order, "P1", 7).unwrap();

        let cmd = UnconfirmLine {
            order_id: order.id_typed(),
            product_code: code("P1"),
            occurred_at: test_time(),
        };
        let events = order.handle(&OrderCommand::UnconfirmLine(cmd)).unwrap();
        apply_all(&mut order, events);

        let line = order.line(&code("P1")).unwrap();
        assert!(!line.confirmed);
        assert_eq!(line.completeness, None);
        assert_eq!(line.found_quantity, Some(7));

        // Re-record and re-confirm with a corrected quantity.
        record(&mut order, "P1", 9).unwrap();
        confirm(&mut order, "P1", 9).unwrap();
        assert!(order.line(&code("P1")).unwrap().confirmed);
    }

    #[test]
    fn unconfirming_an_unconfirmed_line_is_a_no_op() {
        let order = picking_order(vec![new_line("P1", 10)]);
        let cmd = UnconfirmLine {
            order_id: order.id_typed(),
            product_code: code("P1"),
            occurred_at: test_time(),
        };
        let events = order.handle(&OrderCommand::UnconfirmLine(cmd)).unwrap();
        assert!(events.is_empty());
    }

    #[test]
    fn line_actions_require_picking_state() {
        let mut order = registered_order(vec![new_line("P1", 10)]);
        let err = record(&mut order, "P1", 5).unwrap_err();
        match err {
            OrderError::NotPicking { state } => assert_eq!(state, OrderState::Created),
            other => panic!("expected NotPicking, got {other:?}"),
        }
    }

    #[test]
    fn line_actions_reject_unknown_product() {
        let mut order = picking_order(vec![new_line("P1", 10)]);
        let err = record(&mut order, "P9", 5).unwrap_err();
        match err {
            OrderError::LineNotFound { product_code } => assert_eq!(product_code, code("P9")),
            other => panic!("expected LineNotFound, got {other:?}"),
        }
    }

    #[test]
    fn handle_does_not_mutate_state() {
        let order = picking_order(vec![new_line("P1", 10)]);
        let before = order.clone();

        let cmd = RecordFoundQuantity {
            order_id: order.id_typed(),
            product_code: code("P1"),
            quantity: 5,
            occurred_at: test_time(),
        };
        let events1 = order.handle(&OrderCommand::RecordFoundQuantity(cmd.clone())).unwrap();
        let events2 = order.handle(&OrderCommand::RecordFoundQuantity(cmd)).unwrap();

        assert_eq!(order, before);
        assert_eq!(events1, events2);
    }

    #[test]
    fn apply_is_deterministic() {
        let order_id = test_order_id();
        let client_id = test_client_id();
        let at = test_time();

        let events = vec![
            OrderEvent::OrderRegistered(OrderRegistered {
                order_id,
                client_id,
                notes: None,
                lines: vec![new_line("P1", 10)],
                occurred_at: at,
            }),
            OrderEvent::OrderStateChanged(OrderStateChanged {
                order_id,
                from: OrderState::Created,
                to: OrderState::Pending,
                occurred_at: at,
            }),
            OrderEvent::OrderStateChanged(OrderStateChanged {
                order_id,
                from: OrderState::Pending,
                to: OrderState::Picking,
                occurred_at: at,
            }),
            OrderEvent::FoundQuantityRecorded(FoundQuantityRecorded {
                order_id,
                product_code: code("P1"),
                quantity: 7,
                occurred_at: at,
            }),
            OrderEvent::LineConfirmed(LineConfirmed {
                order_id,
                product_code: code("P1"),
                found_quantity: 7,
                completeness: Completeness::Incomplete,
                occurred_at: at,
            }),
        ];

        let mut order1 = Order::empty(order_id);
        let mut order2 = Order::empty(order_id);
        for e in &events {
            order1.apply(e);
            order2.apply(e);
        }

        assert_eq!(order1, order2);
        assert_eq!(order1.version(), 5);
        assert_eq!(order1.state(), OrderState::Picking);
        assert!(order1.is_fully_reconciled());
    }

    #[test]
    fn version_increments_on_apply() {
        let mut order = registered_order(vec![new_line("P1", 1)]);
        assert_eq!(order.version(), 1);
        transition(&mut order, OrderState::Pending).unwrap();
        assert_eq!(order.version(), 2);
        transition(&mut order, OrderState::Picking).unwrap();
        assert_eq!(order.version(), 3);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #![proptest_config(ProptestConfig {
                cases: 256,
                ..ProptestConfig::default()
            })]

            /// Property: a confirm whose proposed quantity differs from the
            /// recorded found quantity never confirms the line.
            #[test]
            fn mismatched_confirm_never_confirms(
                recorded in 0u32..1_000,
                proposed in 0u32..1_000,
            ) {
                let mut order = picking_order(vec![new_line("P1", 10)]);
                record(&mut order, "P1", recorded).unwrap();

                let result = confirm(&mut order, "P1", proposed);
                let line = order.line(&code("P1")).unwrap();
                if proposed == recorded {
                    prop_assert!(result.is_ok());
                    prop_assert!(line.confirmed);
                } else {
                    prop_assert!(result.is_err());
                    prop_assert!(!line.confirmed);
                    prop_assert_eq!(line.found_quantity, Some(recorded));
                }
            }

            /// Property: packing succeeds iff every line is confirmed, and on
            /// failure the reported codes are exactly the unconfirmed lines.
            #[test]
            fn packing_gate_matches_confirmed_set(mask in prop::collection::vec(any::<bool>(), 1..8)) {
                let lines: Vec<NewOrderLine> = (0..mask.len())
                    .map(|i| new_line(&format!("P{i}"), 5))
                    .collect();
                let mut order = picking_order(lines);

                for (i, confirmed) in mask.iter().enumerate() {
                    let p = format!("P{i}");
                    record(&mut order, &p, 5).unwrap();
                    if *confirmed {
                        confirm(&mut order, &p, 5).unwrap();
                    }
                }

                let result = transition(&mut order, OrderState::Packed);
                if mask.iter().all(|c| *c) {
                    prop_assert!(result.is_ok());
                    prop_assert_eq!(order.state(), OrderState::Packed);
                } else {
                    let expected: Vec<ProductCode> = mask
                        .iter()
                        .enumerate()
                        .filter(|(_, c)| !**c)
                        .map(|(i, _)| code(&format!("P{i}")))
                        .collect();
                    match result.unwrap_err() {
                        OrderError::ReconciliationIncomplete { unconfirmed } => {
                            prop_assert_eq!(unconfirmed, expected);
                        }
                        other => prop_assert!(false, "expected ReconciliationIncomplete, got {other:?}"),
                    }
                    prop_assert_eq!(order.state(), OrderState::Picking);
                }
            }
        }
    }
}
