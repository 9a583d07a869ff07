//! `pharmadis-orders`: order fulfillment aggregate.
//!
//! Owns the order lifecycle state machine and the per-line picking
//! reconciliation protocol: staff record a found quantity per line, then
//! confirm it by re-entering the same value; only a fully confirmed order
//! may advance from picking to packed.

pub mod error;
pub mod order;
pub mod reconciliation;
pub mod state;

pub use error::OrderError;
pub use order::{
    ConfirmLine, NewOrderLine, Order, OrderCommand, OrderEvent, OrderId, OrderLine,
    OrderRegistered, OrderStateChanged, FoundQuantityRecorded, LineConfirmed, LineUnconfirmed,
    RecordFoundQuantity, RegisterOrder, TransitionOrder, UnconfirmLine,
};
pub use reconciliation::Completeness;
pub use state::OrderState;
