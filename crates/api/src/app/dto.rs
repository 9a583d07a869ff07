use serde::Deserialize;
use serde_json::json;

use pharmadis_core::ProductCode;
use pharmadis_infra::StoredEvent;
use pharmadis_orders::{NewOrderLine, Order, OrderLine, OrderState};
use pharmadis_stock::{MovementKind, MovementResult, StockMovement};

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
pub struct MovementLineRequest {
    pub product_code: ProductCode,
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct PostMovementRequest {
    pub movement_type: MovementKind,
    /// Client-held idempotency key; assigned server-side when absent.
    /// Resubmitting the same id is safe and returns the original result.
    pub movement_id: Option<uuid::Uuid>,
    pub notes: Option<String>,
    pub source_document: Option<String>,
    pub lines: Vec<MovementLineRequest>,
}

#[derive(Debug, Deserialize)]
pub struct SetStockRequest {
    pub quantities: std::collections::BTreeMap<ProductCode, i64>,
}

#[derive(Debug, Deserialize)]
pub struct OrderLineRequest {
    pub product_code: ProductCode,
    pub description: String,
    pub ordered_quantity: u32,
}

impl From<OrderLineRequest> for NewOrderLine {
    fn from(value: OrderLineRequest) -> Self {
        NewOrderLine {
            product_code: value.product_code,
            description: value.description,
            ordered_quantity: value.ordered_quantity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RegisterOrderRequest {
    pub client_id: uuid::Uuid,
    pub notes: Option<String>,
    pub lines: Vec<OrderLineRequest>,
}

fn default_deduct_stock() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct TransitionRequest {
    pub target_state: OrderState,
    #[serde(default = "default_deduct_stock")]
    pub deduct_stock: bool,
}

#[derive(Debug, Deserialize)]
pub struct FoundQuantityRequest {
    pub quantity: u32,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmLineRequest {
    pub proposed_quantity: u32,
}

// -------------------------
// JSON mapping helpers
// -------------------------

pub fn order_to_json(order: &Order) -> serde_json::Value {
    json!({
        "order_id": order.id_typed().to_string(),
        "client_id": order.client_id().map(|c| c.to_string()),
        "state": order.state(),
        "notes": order.notes(),
        "created_at": order.created_at().map(|t| t.to_rfc3339()),
        "fully_reconciled": order.is_fully_reconciled(),
        "lines": order.lines().iter().map(order_line_to_json).collect::<Vec<_>>(),
    })
}

pub fn order_line_to_json(line: &OrderLine) -> serde_json::Value {
    json!({
        "product_code": line.product_code,
        "description": line.description,
        "ordered_quantity": line.ordered_quantity,
        "found_quantity": line.found_quantity,
        "confirmed": line.confirmed,
        "completeness": line.completeness,
    })
}

pub fn movement_to_json(movement: &StockMovement) -> serde_json::Value {
    json!({
        "movement_id": movement.movement_id.to_string(),
        "movement_type": movement.kind,
        "actor": movement.actor.to_string(),
        "notes": movement.notes,
        "source_document": movement.source_document,
        "lines": movement.lines.iter().map(|l| json!({
            "product_code": l.product_code,
            "quantity": l.quantity,
        })).collect::<Vec<_>>(),
        "created_at": movement.created_at.to_rfc3339(),
    })
}

pub fn movement_result_to_json(result: &MovementResult) -> serde_json::Value {
    json!({
        "movement_id": result.movement_id.to_string(),
        "quantities": result.quantities,
    })
}

pub fn stored_event_to_json(event: &StoredEvent) -> serde_json::Value {
    json!({
        "event_id": event.event_id.to_string(),
        "sequence_number": event.sequence_number,
        "event_type": event.event_type,
        "occurred_at": event.occurred_at.to_rfc3339(),
        "payload": event.payload,
    })
}
