use serde::{Deserialize, Serialize};

/// Order lifecycle state.
///
/// The graph only moves forward, except for cancellation, which is reachable
/// sideways from any non-terminal state:
///
/// ```text
/// created -> pending -> picking -> packed -> shipped -> delivered
/// {created, pending, picking, packed, shipped} -> cancelled
/// ```
///
/// `delivered` and `cancelled` are terminal. The `picking -> packed` edge is
/// additionally guarded by full reconciliation; that guard lives in the
/// aggregate, not here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderState {
    Created,
    Pending,
    Picking,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderState {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderState::Created => "created",
            OrderState::Pending => "pending",
            OrderState::Picking => "picking",
            OrderState::Packed => "packed",
            OrderState::Shipped => "shipped",
            OrderState::Delivered => "delivered",
            OrderState::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, OrderState::Delivered | OrderState::Cancelled)
    }

    /// Unguarded transition-graph membership check.
    pub fn can_transition_to(self, target: OrderState) -> bool {
        use OrderState::*;

        if target == Cancelled {
            return !self.is_terminal();
        }

        matches!(
            (self, target),
            (Created, Pending)
                | (Pending, Picking)
                | (Picking, Packed)
                | (Packed, Shipped)
                | (Shipped, Delivered)
        )
    }
}

impl core::fmt::Display for OrderState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
