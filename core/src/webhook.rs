//! Webhook payloads from logistics and refund partners, and the token
//! check that gates them.
//!
//! Partners retry failed deliveries, so every event must be safe to
//! replay; the no-op `failed_attempt`/`failed` mappings keep replays
//! harmless.

use crate::error::{ReturnsError, ReturnsResult};
use crate::model::ReturnStatus;
use serde::Deserialize;
use std::str::FromStr;

pub const LOGISTICS_EVENTS: [&str; 6] = [
    "out_for_pickup",
    "picked_up",
    "failed_attempt",
    "rescheduled",
    "warehouse_received",
    "quality_check_started",
];

pub const REFUND_EVENTS: [&str; 3] = ["initiated", "completed", "failed"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogisticsEvent {
    OutForPickup,
    PickedUp,
    FailedAttempt,
    Rescheduled,
    WarehouseReceived,
    QualityCheckStarted,
}

impl LogisticsEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogisticsEvent::OutForPickup => "out_for_pickup",
            LogisticsEvent::PickedUp => "picked_up",
            LogisticsEvent::FailedAttempt => "failed_attempt",
            LogisticsEvent::Rescheduled => "rescheduled",
            LogisticsEvent::WarehouseReceived => "warehouse_received",
            LogisticsEvent::QualityCheckStarted => "quality_check_started",
        }
    }

    /// Internal status this event drives the return to. `FailedAttempt`
    /// keeps the current status but is still a valid, recorded event.
    pub fn target_status(&self, current: ReturnStatus) -> ReturnStatus {
        match self {
            LogisticsEvent::OutForPickup | LogisticsEvent::Rescheduled => {
                ReturnStatus::PickupScheduled
            }
            LogisticsEvent::PickedUp => ReturnStatus::PickedUp,
            LogisticsEvent::FailedAttempt => current,
            LogisticsEvent::WarehouseReceived => ReturnStatus::WarehouseReceived,
            LogisticsEvent::QualityCheckStarted => ReturnStatus::QualityCheck,
        }
    }
}

impl FromStr for LogisticsEvent {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "out_for_pickup" => Ok(LogisticsEvent::OutForPickup),
            "picked_up" => Ok(LogisticsEvent::PickedUp),
            "failed_attempt" => Ok(LogisticsEvent::FailedAttempt),
            "rescheduled" => Ok(LogisticsEvent::Rescheduled),
            "warehouse_received" => Ok(LogisticsEvent::WarehouseReceived),
            "quality_check_started" => Ok(LogisticsEvent::QualityCheckStarted),
            other => Err(ReturnsError::rejected(format!(
                "Unknown event type: {other}. Valid events: {}",
                LOGISTICS_EVENTS.join(", ")
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundEvent {
    Initiated,
    Completed,
    Failed,
}

impl RefundEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundEvent::Initiated => "initiated",
            RefundEvent::Completed => "completed",
            RefundEvent::Failed => "failed",
        }
    }

    /// `Failed` keeps the current status; the sender is expected to
    /// retry and report again.
    pub fn target_status(&self, current: ReturnStatus) -> ReturnStatus {
        match self {
            RefundEvent::Initiated => ReturnStatus::RefundInitiated,
            RefundEvent::Completed => ReturnStatus::RefundCompleted,
            RefundEvent::Failed => current,
        }
    }
}

impl FromStr for RefundEvent {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initiated" => Ok(RefundEvent::Initiated),
            "completed" => Ok(RefundEvent::Completed),
            "failed" => Ok(RefundEvent::Failed),
            other => Err(ReturnsError::rejected(format!(
                "Unknown refund status: {other}. Valid values: {}",
                REFUND_EVENTS.join(", ")
            ))),
        }
    }
}

// ── Payloads ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct LogisticsEventPayload {
    pub return_number: String,
    pub event: String,
    #[serde(default)]
    pub tracking_number: Option<String>,
    #[serde(default)]
    pub logistics_partner: Option<String>,
    #[serde(default)]
    pub delivery_agent: Option<String>,
    #[serde(default)]
    pub remarks: Option<String>,
    #[serde(default)]
    pub webhook_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundEventPayload {
    pub return_number: String,
    pub refund_status: String,
    #[serde(default)]
    pub refund_reference: Option<String>,
    #[serde(default)]
    pub refund_amount: Option<f64>,
    #[serde(default)]
    pub webhook_token: Option<String>,
}

// ── Authentication ─────────────────────────────────────────────────

/// Authenticate a webhook call. The token may arrive in the body or as
/// a transport header; the body field wins when both are present.
/// Must run before any return lookup.
pub fn verify_token(
    body_token: Option<&str>,
    header_token: Option<&str>,
    secret: &str,
) -> ReturnsResult<()> {
    let supplied = body_token.or(header_token).unwrap_or("");
    if constant_time_eq(supplied.as_bytes(), secret.as_bytes()) {
        Ok(())
    } else {
        Err(ReturnsError::Unauthorized)
    }
}

/// Byte comparison without early exit on mismatch.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
