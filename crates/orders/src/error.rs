use thiserror::Error;

use pharmadis_core::{Classify, ErrorClass, ProductCode};

use crate::state::OrderState;

/// Order command rejection reasons.
///
/// On any error the order's state is unchanged from before the call; the
/// offending product codes or states are always carried in the variant.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderError {
    #[error("order already exists")]
    AlreadyExists,

    #[error("order not found")]
    NotFound,

    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested edge is not in the transition graph.
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition { from: OrderState, to: OrderState },

    /// The `picking -> packed` guard failed; lists exactly the lines with
    /// `confirmed == false`.
    #[error("reconciliation incomplete: {} unconfirmed line(s)", unconfirmed.len())]
    ReconciliationIncomplete { unconfirmed: Vec<ProductCode> },

    /// A line-level action was attempted outside the picking state.
    #[error("order is not being picked (state: {state})")]
    NotPicking { state: OrderState },

    #[error("order has no line for product {product_code}")]
    LineNotFound { product_code: ProductCode },

    #[error("line for product {product_code} is already confirmed")]
    LineAlreadyConfirmed { product_code: ProductCode },

    /// The double-entry match failed: the proposed quantity does not equal
    /// the recorded found quantity (`found` is `None` when nothing was
    /// recorded yet).
    #[error("proposed quantity {proposed} does not match recorded quantity for product {product_code}")]
    QuantityMismatch {
        product_code: ProductCode,
        proposed: u32,
        found: Option<u32>,
    },
}

impl OrderError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

impl Classify for OrderError {
    fn class(&self) -> ErrorClass {
        match self {
            OrderError::Validation(_) => ErrorClass::Validation,
            OrderError::AlreadyExists => ErrorClass::Conflict,
            OrderError::NotFound => ErrorClass::NotFound,
            OrderError::InvalidTransition { .. }
            | OrderError::ReconciliationIncomplete { .. }
            | OrderError::NotPicking { .. }
            | OrderError::LineNotFound { .. }
            | OrderError::LineAlreadyConfirmed { .. }
            | OrderError::QuantityMismatch { .. } => ErrorClass::Precondition,
        }
    }
}
