//! Return lifecycle rules: status sets, initial-state selection, and
//! the cancellation guard.
//!
//! Webhook-driven transitions carry no from-state preconditions;
//! partner events always win. Cancellation is the one customer-facing
//! transition with a real guard.

use crate::config::ReturnPolicy;
use crate::error::{ReturnsError, ReturnsResult};
use crate::model::ReturnStatus;

/// Statuses that count as an in-flight return. Blocks a second return
/// on the same order; the partial unique index in 002_returns.sql
/// enumerates the same list.
pub const ACTIVE_STATUSES: [ReturnStatus; 7] = [
    ReturnStatus::Pending,
    ReturnStatus::Approved,
    ReturnStatus::PickupScheduled,
    ReturnStatus::PickedUp,
    ReturnStatus::WarehouseReceived,
    ReturnStatus::QualityCheck,
    ReturnStatus::RefundInitiated,
];

/// Customers can back out only before the item leaves their hands.
pub const CANCELLABLE_STATUSES: [ReturnStatus; 3] = [
    ReturnStatus::Pending,
    ReturnStatus::Approved,
    ReturnStatus::PickupScheduled,
];

pub fn is_active(status: ReturnStatus) -> bool {
    ACTIVE_STATUSES.contains(&status)
}

/// SQL fragment enumerating the active statuses, for store queries.
pub fn active_statuses_sql() -> String {
    let quoted: Vec<String> = ACTIVE_STATUSES
        .iter()
        .map(|s| format!("'{}'", s.as_str()))
        .collect();
    quoted.join(", ")
}

/// Initial status for a new return. High-value orders wait for manual
/// review; everything else auto-approves. Returns the status and the
/// `is_high_value` flag; both derive from the same threshold.
pub fn initial_status(total_amount: f64, policy: &ReturnPolicy) -> (ReturnStatus, bool) {
    if total_amount >= policy.high_value_threshold {
        (ReturnStatus::Pending, true)
    } else {
        (ReturnStatus::Approved, false)
    }
}

/// Guard for customer cancellation. On rejection nothing changes and
/// no history row is written.
pub fn check_cancellable(current: ReturnStatus) -> ReturnsResult<()> {
    if CANCELLABLE_STATUSES.contains(&current) {
        return Ok(());
    }
    let allowed: Vec<&str> = CANCELLABLE_STATUSES.iter().map(|s| s.as_str()).collect();
    Err(ReturnsError::rejected(format!(
        "Cannot cancel return in \"{current}\" status. \
         Cancellation allowed only in: {}",
        allowed.join(", ")
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_not_active() {
        for status in [
            ReturnStatus::Rejected,
            ReturnStatus::RefundCompleted,
            ReturnStatus::Cancelled,
            ReturnStatus::Closed,
        ] {
            assert!(!is_active(status), "{status} should not be active");
        }
    }

    #[test]
    fn cancellation_guard_cites_allowed_statuses() {
        let err = check_cancellable(ReturnStatus::PickedUp).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("picked_up"));
        assert!(msg.contains("pending, approved, pickup_scheduled"));
    }
}
