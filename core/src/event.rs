//! Domain events emitted after committed state changes.
//!
//! The core guarantees one emission per committed creation or
//! transition; delivery, batching, and retry belong to the notifier
//! behind the trait.

use crate::model::{Actor, ReturnStatus};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReturnEvent {
    ReturnCreated {
        return_number: String,
        order_number: String,
        status: ReturnStatus,
        is_high_value: bool,
    },
    StatusChanged {
        return_number: String,
        from: ReturnStatus,
        to: ReturnStatus,
        actor: Actor,
    },
    ReturnFlagged {
        return_number: String,
        flag_count: usize,
    },
}

pub trait Notifier {
    fn notify(&self, event: &ReturnEvent);
}

/// Default notifier: one log line per event.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, event: &ReturnEvent) {
        match serde_json::to_string(event) {
            Ok(json) => log::info!("notify: {json}"),
            Err(err) => log::error!("notify: failed to encode event: {err}"),
        }
    }
}
