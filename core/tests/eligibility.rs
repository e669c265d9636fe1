//! Eligibility-evaluator tests: order status, delivery date, category
//! windows, expiry, and the active-return block.

mod common;

use chrono::{Duration, Utc};
use common::*;
use returns_core::clock::Clock;
use returns_core::model::OrderStatus;
use returns_core::service::ReturnsService;
use returns_core::types::OrderId;

/// Service pinned to a fixed "now" plus an order delivered exactly
/// `days_ago` days before it, so day counts come out whole.
fn pinned_delivered_order(
    order_number: &str,
    category: &str,
    total_amount: f64,
    days_ago: i64,
) -> (ReturnsService, OrderId) {
    let now = Utc::now();
    let svc = service().with_clock(Clock::Fixed(now));
    let order_id = order(
        &svc,
        order_number,
        1001,
        category,
        total_amount,
        OrderStatus::Delivered,
        Some(now - Duration::days(days_ago)),
    );
    (svc, order_id)
}

#[test]
fn undelivered_order_is_ineligible() {
    let svc = service();
    let order_id = order(
        &svc,
        "OD-TEST-003",
        1002,
        "electronics",
        19_999.0,
        OrderStatus::Shipped,
        None,
    );

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(!report.eligible);
    assert!(report.reason.unwrap().contains("shipped"));
}

#[test]
fn missing_delivery_date_is_ineligible() {
    let svc = service();
    let order_id = order(
        &svc,
        "OD-NO-DATE",
        1001,
        "books",
        500.0,
        OrderStatus::Delivered,
        None,
    );

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(!report.eligible);
    assert_eq!(report.reason.unwrap(), "Delivery date not recorded");
}

#[test]
fn electronics_window_is_10_days() {
    let (svc, order_id) = pinned_delivered_order("OD-ELEC", "electronics", 19_999.0, 2);

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(report.eligible);
    assert_eq!(report.return_window_days, Some(10));
    assert_eq!(report.days_remaining, Some(8));
    assert_eq!(report.order_number.as_deref(), Some("OD-ELEC"));
}

#[test]
fn fashion_window_is_30_days() {
    let (svc, order_id) = pinned_delivered_order("OD-FASH", "fashion", 4_999.0, 7);

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(report.eligible);
    assert_eq!(report.return_window_days, Some(30));
    assert_eq!(report.days_remaining, Some(23));
}

#[test]
fn unmapped_category_uses_default_window() {
    let (svc, order_id) = pinned_delivered_order("OD-BOOK", "books", 500.0, 2);

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(report.eligible);
    assert_eq!(report.return_window_days, Some(7));
    assert_eq!(report.days_remaining, Some(5));
}

#[test]
fn category_lookup_is_case_sensitive() {
    let (svc, order_id) = pinned_delivered_order("OD-CASE", "Electronics", 19_999.0, 2);

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    // "Electronics" is not "electronics"; falls back to the default.
    assert_eq!(report.return_window_days, Some(7));
}

#[test]
fn expired_window_reports_days_overdue() {
    let (svc, order_id) = pinned_delivered_order("OD-TEST-004", "books", 500.0, 60);

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(!report.eligible);
    let reason = report.reason.unwrap();
    assert!(reason.contains("expired"), "unexpected reason: {reason}");
    assert!(reason.contains("53 day(s) ago"), "unexpected reason: {reason}");
    assert_eq!(report.return_window_days, Some(7));
}

#[test]
fn active_return_blocks_a_second_one() {
    let svc = service();
    let order_id = delivered_order(&svc, "OD-ACTIVE", "fashion", 4_999.0, 7);
    svc.create_return(&create_request(order_id))
        .expect("create return");

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(!report.eligible);
    assert!(report.reason.unwrap().contains("active return"));
}

#[test]
fn cancelled_return_frees_the_order() {
    let svc = service();
    let order_id = delivered_order(&svc, "OD-FREED", "fashion", 4_999.0, 7);
    let outcome = svc
        .create_return(&create_request(order_id))
        .expect("create return");
    svc.cancel_return(&outcome.detail.request.return_number)
        .expect("cancel return");

    let report = svc.check_eligibility(order_id).expect("check eligibility");

    assert!(report.eligible);
}
