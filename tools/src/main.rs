//! returns-cli: headless demo driver for the returns core.
//!
//! Usage:
//!   returns-cli --db returns.db --secret my-webhook-secret
//!   returns-cli --config config.json
//!
//! Seeds delivered orders, walks one return through the full pickup and
//! refund flow, and prints the resulting timeline.

use anyhow::Result;
use chrono::{Duration, Utc};
use returns_core::config::ReturnsConfig;
use returns_core::model::{NewOrder, OrderStatus};
use returns_core::service::{CreateReturnRequest, ReturnsService};
use returns_core::store::ReturnsStore;
use returns_core::types::OrderId;
use returns_core::webhook::{LogisticsEventPayload, RefundEventPayload};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let db = arg_value(&args, "--db").unwrap_or(":memory:");
    let config = match arg_value(&args, "--config") {
        Some(path) => ReturnsConfig::load(Path::new(path))?,
        None => {
            let secret = arg_value(&args, "--secret").unwrap_or("dev-webhook-secret");
            ReturnsConfig::new(secret)
        }
    };
    let secret = config.webhook.secret.clone();

    println!("returns-cli — customer returns demo");
    println!("  db: {db}");
    println!();

    let store = if db == ":memory:" {
        ReturnsStore::in_memory()?
    } else {
        ReturnsStore::open(db)?
    };
    store.migrate()?;
    let svc = ReturnsService::new(store, config);

    let phone = seed_order(&svc, "OD-1001", "electronics", 79_999.0, 2)?;
    let shoes = seed_order(&svc, "OD-1002", "fashion", 4_999.0, 7)?;

    // Eligibility check, the way the storefront would call it.
    let report = svc.check_eligibility(shoes)?;
    println!("eligibility for OD-1002:");
    println!("{}", serde_json::to_string_pretty(&report)?);
    println!();

    // Low-value return: auto-approved, then driven by partner webhooks.
    let outcome = svc.create_return(&CreateReturnRequest {
        order_id: shoes,
        reason: "size_issue".to_string(),
        reason_description: "Too tight".to_string(),
        refund_method: None,
        pickup_address: "123 MG Road, Bangalore".to_string(),
        pickup_pincode: "560001".to_string(),
        idempotency_key: Some("demo-key-1".to_string()),
    })?;
    let number = outcome.detail.request.return_number.clone();
    println!(
        "created {number} (status: {})",
        outcome.detail.request.status
    );

    let mut out_for_pickup = logistics_payload(&number, "out_for_pickup", &secret);
    out_for_pickup.logistics_partner = Some("Delhivery".to_string());
    out_for_pickup.tracking_number = Some("DEL123456789".to_string());
    svc.handle_logistics_event(&out_for_pickup, None)?;
    for event in ["picked_up", "warehouse_received"] {
        svc.handle_logistics_event(&logistics_payload(&number, event, &secret), None)?;
    }
    svc.handle_refund_event(&refund_payload(&number, "initiated", &secret), None)?;
    let mut completed = refund_payload(&number, "completed", &secret);
    completed.refund_reference = Some("REF-TXN-123456".to_string());
    svc.handle_refund_event(&completed, None)?;

    println!();
    println!("timeline for {number}:");
    for entry in svc.status_history(&number)?.timeline {
        let from = entry
            .from_status
            .map(|s| s.to_string())
            .unwrap_or_else(|| "(created)".to_string());
        println!(
            "  {from} -> {} [{}] {}",
            entry.to_status, entry.changed_by, entry.comment
        );
    }

    // High-value return: lands in pending with a fraud flag, needs an
    // admin to approve.
    println!();
    let outcome = svc.create_return(&CreateReturnRequest {
        order_id: phone,
        reason: "defective".to_string(),
        reason_description: "Screen has dead pixels".to_string(),
        refund_method: None,
        pickup_address: "123 MG Road, Bangalore".to_string(),
        pickup_pincode: "560001".to_string(),
        idempotency_key: None,
    })?;
    let high = outcome.detail.request.return_number.clone();
    println!(
        "created {high} (status: {}, flags: {})",
        outcome.detail.request.status,
        outcome.detail.fraud_flags.len()
    );
    let approved = svc.approve_pending(&[high.as_str()], "demo-admin")?;
    println!("approved {approved} pending return(s) as demo-admin");

    Ok(())
}

fn seed_order(
    svc: &ReturnsService,
    order_number: &str,
    category: &str,
    total_amount: f64,
    delivered_days_ago: i64,
) -> Result<OrderId> {
    let order = NewOrder {
        order_number: order_number.to_string(),
        customer_id: 1001,
        customer_name: "Demo User".to_string(),
        customer_email: "demo@example.com".to_string(),
        customer_phone: "9876543210".to_string(),
        product_name: format!("Demo {category} item"),
        product_sku: format!("SKU-{order_number}"),
        category: category.to_string(),
        quantity: 1,
        unit_price: total_amount,
        total_amount,
        status: OrderStatus::Delivered,
        ordered_at: Utc::now() - Duration::days(delivered_days_ago + 3),
        delivered_at: Some(Utc::now() - Duration::days(delivered_days_ago)),
        payment_method: "upi".to_string(),
        payment_reference: String::new(),
        shipping_address: "123 Demo Street".to_string(),
        shipping_pincode: "560001".to_string(),
    };
    Ok(svc.store.insert_order(&order, Utc::now())?)
}

fn logistics_payload(return_number: &str, event: &str, secret: &str) -> LogisticsEventPayload {
    LogisticsEventPayload {
        return_number: return_number.to_string(),
        event: event.to_string(),
        tracking_number: None,
        logistics_partner: None,
        delivery_agent: None,
        remarks: None,
        webhook_token: Some(secret.to_string()),
    }
}

fn refund_payload(return_number: &str, refund_status: &str, secret: &str) -> RefundEventPayload {
    RefundEventPayload {
        return_number: return_number.to_string(),
        refund_status: refund_status.to_string(),
        refund_reference: None,
        refund_amount: None,
        webhook_token: Some(secret.to_string()),
    }
}

fn arg_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == name)
        .map(|w| w[1].as_str())
}
