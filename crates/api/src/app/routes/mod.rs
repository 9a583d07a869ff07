use axum::Router;

pub mod movements;
pub mod orders;
pub mod stock;
pub mod system;

/// Router for all actor-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/movements", movements::router())
        .nest("/orders", orders::router())
        .nest("/stock", stock::router())
}
