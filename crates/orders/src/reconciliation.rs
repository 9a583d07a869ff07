//! Picking reconciliation rules.
//!
//! The two-step protocol: staff first record the quantity they actually
//! found for a line, then confirm it by entering the same value again.
//! Confirmation is an acknowledgment of the recorded value, not an
//! independent input, so a miskeyed quantity cannot be silently accepted.

use serde::{Deserialize, Serialize};

use pharmadis_core::ProductCode;

use crate::order::OrderLine;

/// Classification of a confirmed line against its ordered quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Completeness {
    Complete,
    Incomplete,
    Surplus,
}

impl Completeness {
    pub fn as_str(self) -> &'static str {
        match self {
            Completeness::Complete => "complete",
            Completeness::Incomplete => "incomplete",
            Completeness::Surplus => "surplus",
        }
    }
}

impl core::fmt::Display for Completeness {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a found quantity against the ordered quantity.
pub fn classify(found: u32, ordered: u32) -> Completeness {
    if found == ordered {
        Completeness::Complete
    } else if found > ordered {
        Completeness::Surplus
    } else {
        Completeness::Incomplete
    }
}

/// The double-entry match rule: a confirmation succeeds only when the
/// proposed quantity equals the previously recorded found quantity.
/// A line with nothing recorded never matches.
pub fn quantity_match(proposed: u32, found: Option<u32>) -> bool {
    found == Some(proposed)
}

/// Product codes of every line not yet confirmed, in line order.
pub fn unconfirmed_codes(lines: &[OrderLine]) -> Vec<ProductCode> {
    lines
        .iter()
        .filter(|line| !line.confirmed)
        .map(|line| line.product_code.clone())
        .collect()
}

/// True iff every line has been confirmed. Sole gate for `picking -> packed`.
pub fn is_fully_reconciled(lines: &[OrderLine]) -> bool {
    lines.iter().all(|line| line.confirmed)
}
