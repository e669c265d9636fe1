//! Rule-based fraud checks.
//!
//! Runs exactly once per return, synchronously at creation time. Three
//! independent rules; each firing produces one flag draft. No ML, no
//! re-checking later.

use crate::config::ReturnPolicy;
use crate::model::{FlagType, OrderRecord};
use chrono::{DateTime, Duration, Utc};

/// A rule firing, not yet persisted.
#[derive(Debug, Clone)]
pub struct FlagDraft {
    pub flag_type: FlagType,
    pub description: String,
}

/// Evaluate all rules for a freshly created return.
///
/// `recent_return_count` is the customer's returns created in the
/// trailing 30 days, including the one just created.
pub fn run_rules(
    order: &OrderRecord,
    recent_return_count: i64,
    policy: &ReturnPolicy,
    now: DateTime<Utc>,
) -> Vec<FlagDraft> {
    let mut flags = Vec::new();

    if recent_return_count > policy.max_returns_per_month {
        flags.push(FlagDraft {
            flag_type: FlagType::FrequentReturns,
            description: format!(
                "Customer has {recent_return_count} returns in the last 30 days. \
                 Threshold: {}",
                policy.max_returns_per_month
            ),
        });
    }

    if order.total_amount >= policy.high_value_threshold {
        flags.push(FlagDraft {
            flag_type: FlagType::HighValue,
            description: format!(
                "Return amount Rs.{:.2} exceeds threshold of Rs.{:.2}",
                order.total_amount, policy.high_value_threshold
            ),
        });
    }

    if let Some(delivered_at) = order.delivered_at {
        let since_delivery = now - delivered_at;
        if since_delivery < Duration::hours(1) {
            flags.push(FlagDraft {
                flag_type: FlagType::QuickReturn,
                description: format!(
                    "Return requested within {} minutes of delivery",
                    since_delivery.num_minutes()
                ),
            });
        }
    }

    flags
}
