//! Return-eligibility evaluation.
//!
//! Pure function of the order, the policy, and the supplied "now".
//! Callers resolve the active-return check against the store first.

use crate::config::ReturnPolicy;
use crate::model::{OrderRecord, OrderStatus};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct EligibilityReport {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_window_days: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_remaining: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_amount: Option<f64>,
}

impl EligibilityReport {
    fn ineligible(reason: String) -> Self {
        Self {
            eligible: false,
            reason: Some(reason),
            return_window_days: None,
            days_remaining: None,
            deadline: None,
            order_number: None,
            category: None,
            total_amount: None,
        }
    }
}

/// Decide whether a return may be opened for `order` right now.
///
/// Checks, in order: order delivered, delivery date recorded, return
/// window still open, no active return on the order.
pub fn evaluate(
    order: &OrderRecord,
    has_active_return: bool,
    policy: &ReturnPolicy,
    now: DateTime<Utc>,
) -> EligibilityReport {
    if order.status != OrderStatus::Delivered {
        return EligibilityReport::ineligible(format!(
            "Order is not delivered yet. Current status: {}",
            order.status
        ));
    }

    let Some(delivered_at) = order.delivered_at else {
        return EligibilityReport::ineligible("Delivery date not recorded".to_string());
    };

    let window_days = policy.window_days(&order.category);
    let deadline = delivered_at + Duration::days(window_days);

    if now > deadline {
        let days_overdue = (now - deadline).num_days();
        let mut report = EligibilityReport::ineligible(format!(
            "Return window expired {days_overdue} day(s) ago. \
             Return window for {} is {window_days} days.",
            order.category
        ));
        report.return_window_days = Some(window_days);
        report.deadline = Some(deadline);
        return report;
    }

    if has_active_return {
        return EligibilityReport::ineligible(
            "An active return request already exists for this order.".to_string(),
        );
    }

    EligibilityReport {
        eligible: true,
        reason: None,
        return_window_days: Some(window_days),
        // Whole days, floored.
        days_remaining: Some((deadline - now).num_days()),
        deadline: Some(deadline),
        order_number: Some(order.order_number.clone()),
        category: Some(order.category.clone()),
        total_amount: Some(order.total_amount),
    }
}
