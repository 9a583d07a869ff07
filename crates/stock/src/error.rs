use thiserror::Error;

use pharmadis_core::{Classify, ErrorClass, ProductCode};

/// Movement rejection reasons.
///
/// Every variant names the offending product code where one exists; these
/// are surfaced verbatim to the caller, never collapsed into a generic
/// message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MovementError {
    /// The movement carries no lines.
    #[error("movement has no lines")]
    EmptyBatch,

    /// The same product code appears on more than one line.
    #[error("duplicate line for product {product_code}")]
    DuplicateLine { product_code: ProductCode },

    /// Quantity violates the kind's sign rule (zero for inbound/outbound).
    #[error("invalid quantity {quantity} for product {product_code}")]
    InvalidQuantity {
        product_code: ProductCode,
        quantity: u32,
    },

    /// A line references a product the snapshot store does not know.
    #[error("unknown product {product_code}")]
    UnknownProduct { product_code: ProductCode },

    /// An outbound line would drive stock below zero.
    #[error(
        "insufficient stock for product {product_code}: available {available}, requested {requested}"
    )]
    InsufficientStock {
        product_code: ProductCode,
        available: i64,
        requested: u32,
    },
}

impl Classify for MovementError {
    fn class(&self) -> ErrorClass {
        match self {
            MovementError::EmptyBatch
            | MovementError::DuplicateLine { .. }
            | MovementError::InvalidQuantity { .. } => ErrorClass::Validation,
            MovementError::UnknownProduct { .. } | MovementError::InsufficientStock { .. } => {
                ErrorClass::Resource
            }
        }
    }
}
