use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};

use pharmadis_core::{AggregateId, ClientId, ProductCode};
use pharmadis_orders::OrderId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(register_order))
        .route("/:id", get(get_order))
        .route("/:id/events", get(get_order_events))
        .route("/:id/transition", put(transition_order))
        .route("/:id/lines/:product_code/found", put(record_found_quantity))
        .route("/:id/lines/:product_code/confirm", put(confirm_line))
        .route("/:id/lines/:product_code/unconfirm", put(unconfirm_line))
}

fn parse_order_id(id: &str) -> Result<OrderId, axum::response::Response> {
    id.parse::<AggregateId>()
        .map(OrderId::new)
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"))
}

fn parse_product_code(code: String) -> Result<ProductCode, axum::response::Response> {
    ProductCode::new(code).map_err(|_| {
        errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product code")
    })
}

/// Checkout hands over a fully-formed order; it enters the workflow in
/// `created`.
pub async fn register_order(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::RegisterOrderRequest>,
) -> axum::response::Response {
    let client_id = ClientId::from_uuid(body.client_id);
    let lines = body.lines.into_iter().map(Into::into).collect();

    match services.fulfillment().register_order(client_id, body.notes, lines) {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.fulfillment().get_order(order_id) {
        Ok(Some(order)) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "order_not_found", "order not found"),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn get_order_events(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.fulfillment().order_events(order_id) {
        Ok(events) => {
            let events: Vec<_> = events.iter().map(dto::stored_event_to_json).collect();
            (StatusCode::OK, Json(serde_json::json!({ "events": events }))).into_response()
        }
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn transition_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Path(id): Path<String>,
    Json(body): Json<dto::TransitionRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    let outcome = match services.fulfillment().transition(
        order_id,
        body.target_state,
        body.deduct_stock,
        actor.actor_id(),
    ) {
        Ok(outcome) => outcome,
        Err(e) => return errors::fulfillment_error_to_response(e),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "order": dto::order_to_json(&outcome.order),
            "movement": outcome.movement.as_ref().map(dto::movement_result_to_json),
        })),
    )
        .into_response()
}

/// Respond with the addressed line after a successful line-level action.
fn line_response(
    order: &pharmadis_orders::Order,
    product_code: &ProductCode,
) -> axum::response::Response {
    match order.line(product_code) {
        Some(line) => (StatusCode::OK, Json(dto::order_line_to_json(line))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "line_not_found", "line not found"),
    }
}

pub async fn record_found_quantity(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, product_code)): Path<(String, String)>,
    Json(body): Json<dto::FoundQuantityRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_code = match parse_product_code(product_code) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .fulfillment()
        .record_found_quantity(order_id, product_code.clone(), body.quantity)
    {
        Ok(order) => line_response(&order, &product_code),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn confirm_line(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, product_code)): Path<(String, String)>,
    Json(body): Json<dto::ConfirmLineRequest>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_code = match parse_product_code(product_code) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .fulfillment()
        .confirm_line(order_id, product_code.clone(), body.proposed_quantity)
    {
        Ok(order) => line_response(&order, &product_code),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}

pub async fn unconfirm_line(
    Extension(services): Extension<Arc<AppServices>>,
    Path((id, product_code)): Path<(String, String)>,
) -> axum::response::Response {
    let order_id = match parse_order_id(&id) {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let product_code = match parse_product_code(product_code) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services
        .fulfillment()
        .unconfirm_line(order_id, product_code.clone())
    {
        Ok(order) => line_response(&order, &product_code),
        Err(e) => errors::fulfillment_error_to_response(e),
    }
}
