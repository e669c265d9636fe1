//! Shared builders for the returns integration tests.

#![allow(dead_code)]

use chrono::{DateTime, Duration, Utc};
use returns_core::config::ReturnsConfig;
use returns_core::model::{NewOrder, OrderStatus};
use returns_core::service::{CreateReturnRequest, ReturnsService};
use returns_core::store::ReturnsStore;
use returns_core::types::{CustomerId, OrderId};
use returns_core::webhook::{LogisticsEventPayload, RefundEventPayload};

pub const SECRET: &str = "test-webhook-secret";

pub fn service() -> ReturnsService {
    service_with_config(ReturnsConfig::new(SECRET))
}

pub fn service_with_config(config: ReturnsConfig) -> ReturnsService {
    let store = ReturnsStore::in_memory().expect("open in-memory store");
    store.migrate().expect("apply migrations");
    ReturnsService::new(store, config)
}

/// Delivered order for customer 1001, delivered `days_ago` days back.
pub fn delivered_order(
    svc: &ReturnsService,
    order_number: &str,
    category: &str,
    total_amount: f64,
    days_ago: i64,
) -> OrderId {
    order(
        svc,
        order_number,
        1001,
        category,
        total_amount,
        OrderStatus::Delivered,
        Some(Utc::now() - Duration::days(days_ago)),
    )
}

pub fn order(
    svc: &ReturnsService,
    order_number: &str,
    customer_id: CustomerId,
    category: &str,
    total_amount: f64,
    status: OrderStatus,
    delivered_at: Option<DateTime<Utc>>,
) -> OrderId {
    let new = NewOrder {
        order_number: order_number.to_string(),
        customer_id,
        customer_name: "Test User".to_string(),
        customer_email: "test@example.com".to_string(),
        customer_phone: "9876543210".to_string(),
        product_name: "Samsung Galaxy S24".to_string(),
        product_sku: "SAM-S24-128".to_string(),
        category: category.to_string(),
        quantity: 1,
        unit_price: total_amount,
        total_amount,
        status,
        ordered_at: Utc::now() - Duration::days(12),
        delivered_at,
        payment_method: "upi".to_string(),
        payment_reference: String::new(),
        shipping_address: "123 Test Street".to_string(),
        shipping_pincode: "560001".to_string(),
    };
    svc.store
        .insert_order(&new, Utc::now())
        .expect("insert order")
}

pub fn create_request(order_id: OrderId) -> CreateReturnRequest {
    CreateReturnRequest {
        order_id,
        reason: "defective".to_string(),
        reason_description: "Screen has dead pixels".to_string(),
        refund_method: None,
        pickup_address: "123 MG Road, Bangalore".to_string(),
        pickup_pincode: "560001".to_string(),
        idempotency_key: None,
    }
}

pub fn logistics_payload(return_number: &str, event: &str) -> LogisticsEventPayload {
    LogisticsEventPayload {
        return_number: return_number.to_string(),
        event: event.to_string(),
        tracking_number: None,
        logistics_partner: None,
        delivery_agent: None,
        remarks: None,
        webhook_token: Some(SECRET.to_string()),
    }
}

pub fn refund_payload(return_number: &str, refund_status: &str) -> RefundEventPayload {
    RefundEventPayload {
        return_number: return_number.to_string(),
        refund_status: refund_status.to_string(),
        refund_reference: None,
        refund_amount: None,
        webhook_token: Some(SECRET.to_string()),
    }
}
