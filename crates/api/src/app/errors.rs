use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use pharmadis_core::{Classify, ErrorClass};
use pharmadis_infra::FulfillmentError;
use pharmadis_orders::OrderError;
use pharmadis_stock::MovementError;

/// Status mapping by error class: validation → 400, precondition → 422,
/// conflict/resource → 409, missing aggregate → 404.
pub fn status_for(class: ErrorClass) -> StatusCode {
    match class {
        ErrorClass::Validation => StatusCode::BAD_REQUEST,
        ErrorClass::Precondition => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorClass::Conflict => StatusCode::CONFLICT,
        ErrorClass::Resource => StatusCode::CONFLICT,
        ErrorClass::NotFound => StatusCode::NOT_FOUND,
    }
}

pub fn fulfillment_error_to_response(err: FulfillmentError) -> axum::response::Response {
    match err {
        FulfillmentError::Order(e) => order_error_to_response(e),
        FulfillmentError::Movement(e) => movement_error_to_response(e),
        FulfillmentError::Concurrency(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        FulfillmentError::Deserialize(msg) => {
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "deserialize_error", msg)
        }
        FulfillmentError::Store(e) => json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "store_error",
            format!("{e:?}"),
        ),
    }
}

pub fn movement_error_to_response(err: MovementError) -> axum::response::Response {
    let status = status_for(err.class());
    let message = err.to_string();
    match err {
        MovementError::EmptyBatch => json_error(status, "empty_batch", message),
        MovementError::DuplicateLine { product_code } => json_error_with(
            status,
            "duplicate_line",
            message,
            json!({ "product_code": product_code }),
        ),
        MovementError::InvalidQuantity { product_code, quantity } => json_error_with(
            status,
            "invalid_quantity",
            message,
            json!({ "product_code": product_code, "quantity": quantity }),
        ),
        MovementError::UnknownProduct { product_code } => json_error_with(
            status,
            "unknown_product",
            message,
            json!({ "product_code": product_code }),
        ),
        MovementError::InsufficientStock { product_code, available, requested } => json_error_with(
            status,
            "insufficient_stock",
            message,
            json!({
                "product_code": product_code,
                "available": available,
                "requested": requested,
            }),
        ),
    }
}

pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    let status = status_for(err.class());
    let message = err.to_string();
    match err {
        OrderError::AlreadyExists => json_error(status, "order_already_exists", message),
        OrderError::NotFound => json_error(status, "order_not_found", message),
        OrderError::Validation(_) => json_error(status, "validation_error", message),
        OrderError::InvalidTransition { from, to } => json_error_with(
            status,
            "invalid_transition",
            message,
            json!({ "from": from, "to": to }),
        ),
        OrderError::ReconciliationIncomplete { unconfirmed } => json_error_with(
            status,
            "reconciliation_incomplete",
            message,
            json!({ "unconfirmed_product_codes": unconfirmed }),
        ),
        OrderError::NotPicking { state } => json_error_with(
            status,
            "order_not_picking",
            message,
            json!({ "state": state }),
        ),
        OrderError::LineNotFound { product_code } => json_error_with(
            status,
            "line_not_found",
            message,
            json!({ "product_code": product_code }),
        ),
        OrderError::LineAlreadyConfirmed { product_code } => json_error_with(
            status,
            "line_already_confirmed",
            message,
            json!({ "product_code": product_code }),
        ),
        OrderError::QuantityMismatch { product_code, proposed, found } => json_error_with(
            status,
            "quantity_mismatch",
            message,
            json!({
                "product_code": product_code,
                "proposed": proposed,
                "found": found,
            }),
        ),
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Error body with structured detail fields alongside `error`/`message`.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), Some(details)) = (body.as_object_mut(), details.as_object()) {
        for (k, v) in details {
            body.insert(k.clone(), v.clone());
        }
    }

    (status, axum::Json(body)).into_response()
}
