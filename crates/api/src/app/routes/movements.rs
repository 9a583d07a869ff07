use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use pharmadis_core::MovementId;
use pharmadis_stock::{MovementDraft, MovementLine};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::ActorContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(post_movement).get(list_movements))
        .route("/:id", get(get_movement))
}

pub async fn post_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(actor): Extension<ActorContext>,
    Json(body): Json<dto::PostMovementRequest>,
) -> axum::response::Response {
    let movement_id = body
        .movement_id
        .map(MovementId::from_uuid)
        .unwrap_or_else(MovementId::new);

    let draft = MovementDraft {
        movement_id,
        kind: body.movement_type,
        actor: actor.actor_id(),
        notes: body.notes,
        source_document: body.source_document,
        lines: body
            .lines
            .into_iter()
            .map(|l| MovementLine {
                product_code: l.product_code,
                quantity: l.quantity,
            })
            .collect(),
    };

    match services.ledger().apply(draft) {
        Ok(result) => {
            (StatusCode::CREATED, Json(dto::movement_result_to_json(&result))).into_response()
        }
        Err(e) => errors::movement_error_to_response(e),
    }
}

pub async fn list_movements(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let movements: Vec<_> = services
        .ledger()
        .movements()
        .iter()
        .map(dto::movement_to_json)
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "movements": movements }))).into_response()
}

pub async fn get_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let movement_id: MovementId = match id.parse() {
        Ok(v) => v,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid movement id")
        }
    };

    match services.ledger().get(movement_id) {
        Some(movement) => (StatusCode::OK, Json(dto::movement_to_json(&movement))).into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "not_found", "movement not found"),
    }
}
