use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use pharmadis_core::{ActorId, MovementId, ProductCode};

use crate::error::MovementError;

/// Movement kind, with kind-specific delta semantics.
///
/// Inbound and outbound apply signed deltas; adjustment sets or corrects an
/// absolute value rather than applying a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementKind {
    Inbound,
    Outbound,
    Adjustment,
}

impl MovementKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MovementKind::Inbound => "inbound",
            MovementKind::Outbound => "outbound",
            MovementKind::Adjustment => "adjustment",
        }
    }

    /// Resulting snapshot quantity for one line given the current quantity.
    ///
    /// Outbound is the only kind that can fail here: stock never goes
    /// negative. Adjustment quantities are absolute values and are
    /// non-negative by construction (`u32`), so they bypass that check.
    pub fn target_quantity(self, current: i64, line: &MovementLine) -> Result<i64, MovementError> {
        match self {
            MovementKind::Inbound => Ok(current + i64::from(line.quantity)),
            MovementKind::Outbound => {
                let requested = i64::from(line.quantity);
                if requested > current {
                    return Err(MovementError::InsufficientStock {
                        product_code: line.product_code.clone(),
                        available: current,
                        requested: line.quantity,
                    });
                }
                Ok(current - requested)
            }
            MovementKind::Adjustment => Ok(i64::from(line.quantity)),
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One product within a movement.
///
/// `quantity` is a delta magnitude for inbound/outbound and an absolute
/// value for adjustment. Negative quantities are unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementLine {
    pub product_code: ProductCode,
    pub quantity: u32,
}

/// A movement as submitted, before acceptance.
///
/// `movement_id` is the idempotency key: assigned server-side for fresh
/// submissions, resubmitted unchanged by callers retrying after a timeout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementDraft {
    pub movement_id: MovementId,
    pub kind: MovementKind,
    pub actor: ActorId,
    pub notes: Option<String>,
    pub source_document: Option<String>,
    pub lines: Vec<MovementLine>,
}

impl MovementDraft {
    /// Shape validation: non-empty batch, no duplicate product codes,
    /// kind-appropriate quantities. Runs before any snapshot lookup, so a
    /// malformed draft is rejected without touching shared state.
    pub fn validate(&self) -> Result<(), MovementError> {
        if self.lines.is_empty() {
            return Err(MovementError::EmptyBatch);
        }

        let mut seen: HashSet<&ProductCode> = HashSet::with_capacity(self.lines.len());
        for line in &self.lines {
            if !seen.insert(&line.product_code) {
                return Err(MovementError::DuplicateLine {
                    product_code: line.product_code.clone(),
                });
            }

            let zero_allowed = matches!(self.kind, MovementKind::Adjustment);
            if line.quantity == 0 && !zero_allowed {
                return Err(MovementError::InvalidQuantity {
                    product_code: line.product_code.clone(),
                    quantity: line.quantity,
                });
            }
        }

        Ok(())
    }
}

/// An accepted movement on the immutable ledger.
///
/// Once recorded it is never modified or deleted; corrections are new
/// movements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub movement_id: MovementId,
    pub kind: MovementKind,
    pub actor: ActorId,
    pub notes: Option<String>,
    pub source_document: Option<String>,
    pub lines: Vec<MovementLine>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    /// Seal an accepted draft with its acceptance timestamp.
    pub fn from_draft(draft: MovementDraft, created_at: DateTime<Utc>) -> Self {
        Self {
            movement_id: draft.movement_id,
            kind: draft.kind,
            actor: draft.actor,
            notes: draft.notes,
            source_document: draft.source_document,
            lines: draft.lines,
            created_at,
        }
    }
}

/// Outcome of a successfully applied movement: the post-movement quantity
/// for every affected product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovementResult {
    pub movement_id: MovementId,
    pub quantities: BTreeMap<ProductCode, i64>,
}
