use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use pharmadis_core::ProductCode;
use pharmadis_stock::SnapshotStore;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stock).put(set_stock))
        .route("/:product_code", get(get_stock))
}

/// Snapshot ingestion boundary: the bulk upload pipeline (external to this
/// core) lands its resulting quantities through this atomic batch write.
pub async fn set_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Json(body): Json<dto::SetStockRequest>,
) -> axum::response::Response {
    services.snapshots().set_quantities(body.quantities);
    StatusCode::NO_CONTENT.into_response()
}

pub async fn list_stock(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    let stock: Vec<_> = services
        .snapshots()
        .list()
        .into_iter()
        .map(|(product_code, quantity)| {
            serde_json::json!({
                "product_code": product_code,
                "quantity": quantity,
            })
        })
        .collect();

    (StatusCode::OK, Json(serde_json::json!({ "stock": stock }))).into_response()
}

pub async fn get_stock(
    Extension(services): Extension<Arc<AppServices>>,
    Path(product_code): Path<String>,
) -> axum::response::Response {
    let product_code = match ProductCode::new(product_code) {
        Ok(c) => c,
        Err(_) => {
            return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product code")
        }
    };

    match services.snapshots().get_quantity(&product_code) {
        Some(quantity) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "product_code": product_code,
                "quantity": quantity,
            })),
        )
            .into_response(),
        None => errors::json_error(StatusCode::NOT_FOUND, "unknown_product", "product not found"),
    }
}
