//! Records and tagged enums for the returns domain.
//!
//! Status, reason, and flag values are real enums parsed at the edge;
//! unknown strings are rejected before anything touches the store.

use crate::error::ReturnsError;
use crate::types::{CustomerId, FlagId, OrderId, ReturnId};
use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef};
use rusqlite::ToSql;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Wires a unit enum to its TEXT column: `as_str` on the way in,
/// `FromStr` on the way out.
macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(self.as_str().into())
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                value
                    .as_str()?
                    .parse::<$ty>()
                    .map_err(|e| FromSqlError::Other(Box::new(e)))
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ── Order ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    Confirmed,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Confirmed => "confirmed",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "confirmed" => Ok(OrderStatus::Confirmed),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ReturnsError::validation(format!(
                "Unknown order status: {other}"
            ))),
        }
    }
}

sql_text_enum!(OrderStatus);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: OrderId,
    pub order_number: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub product_name: String,
    pub product_sku: String,
    pub category: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_method: String,
    pub payment_reference: String,
    pub shipping_address: String,
    pub shipping_pincode: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Order fields as they arrive from the upstream order service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewOrder {
    pub order_number: String,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    #[serde(default)]
    pub customer_phone: String,
    pub product_name: String,
    pub product_sku: String,
    pub category: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_amount: f64,
    pub status: OrderStatus,
    pub ordered_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub payment_method: String,
    #[serde(default)]
    pub payment_reference: String,
    pub shipping_address: String,
    pub shipping_pincode: String,
}

// ── Return request ─────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnStatus {
    Pending,
    Approved,
    Rejected,
    PickupScheduled,
    PickedUp,
    WarehouseReceived,
    QualityCheck,
    RefundInitiated,
    RefundCompleted,
    Cancelled,
    Closed,
}

impl ReturnStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnStatus::Pending => "pending",
            ReturnStatus::Approved => "approved",
            ReturnStatus::Rejected => "rejected",
            ReturnStatus::PickupScheduled => "pickup_scheduled",
            ReturnStatus::PickedUp => "picked_up",
            ReturnStatus::WarehouseReceived => "warehouse_received",
            ReturnStatus::QualityCheck => "quality_check",
            ReturnStatus::RefundInitiated => "refund_initiated",
            ReturnStatus::RefundCompleted => "refund_completed",
            ReturnStatus::Cancelled => "cancelled",
            ReturnStatus::Closed => "closed",
        }
    }
}

impl FromStr for ReturnStatus {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReturnStatus::Pending),
            "approved" => Ok(ReturnStatus::Approved),
            "rejected" => Ok(ReturnStatus::Rejected),
            "pickup_scheduled" => Ok(ReturnStatus::PickupScheduled),
            "picked_up" => Ok(ReturnStatus::PickedUp),
            "warehouse_received" => Ok(ReturnStatus::WarehouseReceived),
            "quality_check" => Ok(ReturnStatus::QualityCheck),
            "refund_initiated" => Ok(ReturnStatus::RefundInitiated),
            "refund_completed" => Ok(ReturnStatus::RefundCompleted),
            "cancelled" => Ok(ReturnStatus::Cancelled),
            "closed" => Ok(ReturnStatus::Closed),
            other => Err(ReturnsError::validation(format!(
                "Unknown return status: {other}"
            ))),
        }
    }
}

sql_text_enum!(ReturnStatus);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnReason {
    Defective,
    WrongItem,
    NotAsDescribed,
    SizeIssue,
    QualityIssue,
    ChangedMind,
    LateDelivery,
    MissingParts,
    Other,
}

impl ReturnReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReturnReason::Defective => "defective",
            ReturnReason::WrongItem => "wrong_item",
            ReturnReason::NotAsDescribed => "not_as_described",
            ReturnReason::SizeIssue => "size_issue",
            ReturnReason::QualityIssue => "quality_issue",
            ReturnReason::ChangedMind => "changed_mind",
            ReturnReason::LateDelivery => "late_delivery",
            ReturnReason::MissingParts => "missing_parts",
            ReturnReason::Other => "other",
        }
    }
}

impl FromStr for ReturnReason {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "defective" => Ok(ReturnReason::Defective),
            "wrong_item" => Ok(ReturnReason::WrongItem),
            "not_as_described" => Ok(ReturnReason::NotAsDescribed),
            "size_issue" => Ok(ReturnReason::SizeIssue),
            "quality_issue" => Ok(ReturnReason::QualityIssue),
            "changed_mind" => Ok(ReturnReason::ChangedMind),
            "late_delivery" => Ok(ReturnReason::LateDelivery),
            "missing_parts" => Ok(ReturnReason::MissingParts),
            "other" => Ok(ReturnReason::Other),
            other => Err(ReturnsError::validation(format!(
                "Unknown return reason: {other}"
            ))),
        }
    }
}

sql_text_enum!(ReturnReason);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundMethod {
    Original,
    Wallet,
    BankTransfer,
}

impl RefundMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RefundMethod::Original => "original",
            RefundMethod::Wallet => "wallet",
            RefundMethod::BankTransfer => "bank_transfer",
        }
    }
}

impl FromStr for RefundMethod {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "original" => Ok(RefundMethod::Original),
            "wallet" => Ok(RefundMethod::Wallet),
            "bank_transfer" => Ok(RefundMethod::BankTransfer),
            other => Err(ReturnsError::validation(format!(
                "Unknown refund method: {other}"
            ))),
        }
    }
}

sql_text_enum!(RefundMethod);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnRecord {
    pub id: ReturnId,
    pub return_number: String,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: String,
    pub customer_email: String,
    pub reason: ReturnReason,
    pub reason_description: String,
    pub status: ReturnStatus,
    pub refund_method: RefundMethod,
    pub refund_amount: Option<f64>,
    pub refund_reference: String,
    pub pickup_address: String,
    pub pickup_pincode: String,
    pub pickup_scheduled_date: Option<DateTime<Utc>>,
    pub pickup_completed_date: Option<DateTime<Utc>>,
    pub logistics_partner: String,
    pub tracking_number: String,
    pub idempotency_key: Option<String>,
    pub is_flagged: bool,
    pub is_high_value: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ── Status history ─────────────────────────────────────────────────

/// Who made a status change. `Admin` carries the admin's name and
/// round-trips as `admin:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Actor {
    System,
    Customer,
    Admin(String),
    Webhook,
}

impl Actor {
    pub fn admin(name: impl Into<String>) -> Self {
        Actor::Admin(name.into())
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Actor::System => f.write_str("system"),
            Actor::Customer => f.write_str("customer"),
            Actor::Admin(name) => write!(f, "admin:{name}"),
            Actor::Webhook => f.write_str("webhook"),
        }
    }
}

impl From<Actor> for String {
    fn from(actor: Actor) -> String {
        actor.to_string()
    }
}

impl TryFrom<String> for Actor {
    type Error = ReturnsError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl FromStr for Actor {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Actor::System),
            "customer" => Ok(Actor::Customer),
            "webhook" => Ok(Actor::Webhook),
            other => match other.strip_prefix("admin:") {
                Some(name) if !name.is_empty() => Ok(Actor::Admin(name.to_string())),
                _ => Err(ReturnsError::validation(format!("Unknown actor tag: {other}"))),
            },
        }
    }
}

impl ToSql for Actor {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Actor {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse::<Actor>()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryRecord {
    pub id: i64,
    pub return_request_id: ReturnId,
    /// `None` for the creation entry (stored as '').
    pub from_status: Option<ReturnStatus>,
    pub to_status: ReturnStatus,
    pub changed_by: Actor,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

// ── Images ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnImageRecord {
    pub id: i64,
    pub return_request_id: ReturnId,
    pub image_key: String,
    pub image_url: String,
    pub file_name: String,
    pub file_size: i64,
    pub content_type: String,
    pub uploaded_at: DateTime<Utc>,
}

// ── Fraud flags ────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagType {
    FrequentReturns,
    HighValue,
    QuickReturn,
}

impl FlagType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagType::FrequentReturns => "frequent_returns",
            FlagType::HighValue => "high_value",
            FlagType::QuickReturn => "quick_return",
        }
    }
}

impl FromStr for FlagType {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "frequent_returns" => Ok(FlagType::FrequentReturns),
            "high_value" => Ok(FlagType::HighValue),
            "quick_return" => Ok(FlagType::QuickReturn),
            other => Err(ReturnsError::validation(format!(
                "Unknown flag type: {other}"
            ))),
        }
    }
}

sql_text_enum!(FlagType);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReviewStatus {
    Open,
    Investigating,
    Cleared,
    Confirmed,
}

impl FlagReviewStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FlagReviewStatus::Open => "open",
            FlagReviewStatus::Investigating => "investigating",
            FlagReviewStatus::Cleared => "cleared",
            FlagReviewStatus::Confirmed => "confirmed",
        }
    }
}

impl FromStr for FlagReviewStatus {
    type Err = ReturnsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(FlagReviewStatus::Open),
            "investigating" => Ok(FlagReviewStatus::Investigating),
            "cleared" => Ok(FlagReviewStatus::Cleared),
            "confirmed" => Ok(FlagReviewStatus::Confirmed),
            other => Err(ReturnsError::validation(format!(
                "Unknown flag review status: {other}"
            ))),
        }
    }
}

sql_text_enum!(FlagReviewStatus);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudFlagRecord {
    pub id: FlagId,
    pub return_request_id: ReturnId,
    pub customer_id: CustomerId,
    pub flag_type: FlagType,
    pub status: FlagReviewStatus,
    pub description: String,
    pub reviewed_by: String,
    pub review_notes: String,
    pub created_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

// ── Aggregate views ────────────────────────────────────────────────

/// Full return representation: the request plus its order snapshot,
/// proof images, timeline, and any fraud flags.
#[derive(Debug, Clone, Serialize)]
pub struct ReturnDetail {
    pub request: ReturnRecord,
    pub order: OrderRecord,
    pub images: Vec<ReturnImageRecord>,
    pub status_history: Vec<StatusHistoryRecord>,
    pub fraud_flags: Vec<FraudFlagRecord>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn actor_tags_round_trip() {
        for actor in [
            Actor::System,
            Actor::Customer,
            Actor::Webhook,
            Actor::admin("priya"),
        ] {
            let tag = actor.to_string();
            assert_eq!(tag.parse::<Actor>().unwrap(), actor);
        }
        assert_eq!(Actor::admin("priya").to_string(), "admin:priya");
    }

    #[test]
    fn unknown_actor_tag_is_rejected() {
        assert!("robot".parse::<Actor>().is_err());
        assert!("admin:".parse::<Actor>().is_err());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [
            ReturnStatus::Pending,
            ReturnStatus::PickupScheduled,
            ReturnStatus::RefundCompleted,
            ReturnStatus::Closed,
        ] {
            assert_eq!(status.as_str().parse::<ReturnStatus>().unwrap(), status);
        }
        assert!("shipped_back".parse::<ReturnStatus>().is_err());
    }
}
