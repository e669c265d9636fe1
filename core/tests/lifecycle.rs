//! Lifecycle tests: cancellation guard, admin bulk actions, webhook
//! progression, and the audit-trail chain.

mod common;

use std::cell::RefCell;
use std::rc::Rc;

use common::*;
use returns_core::error::ReturnsError;
use returns_core::event::{Notifier, ReturnEvent};
use returns_core::model::{Actor, ReturnStatus};
use returns_core::service::ReturnsService;

fn approved_return(svc: &ReturnsService, order_number: &str) -> String {
    let order_id = delivered_order(svc, order_number, "fashion", 4_999.0, 7);
    svc.create_return(&create_request(order_id))
        .expect("create return")
        .detail
        .request
        .return_number
}

#[test]
fn cancel_approved_return_succeeds() {
    let svc = service();
    let number = approved_return(&svc, "OD-CANCEL-OK");

    let record = svc.cancel_return(&number).expect("cancel return");

    assert_eq!(record.status, ReturnStatus::Cancelled);
    let history = svc.store.history_for_return(record.id).unwrap();
    assert_eq!(history.len(), 2);
    let last = history.last().unwrap();
    assert_eq!(last.from_status, Some(ReturnStatus::Approved));
    assert_eq!(last.to_status, ReturnStatus::Cancelled);
    assert_eq!(last.changed_by, Actor::Customer);
}

#[test]
fn cancel_after_pickup_is_rejected() {
    let svc = service();
    let number = approved_return(&svc, "OD-CANCEL-NO");
    svc.handle_logistics_event(&logistics_payload(&number, "picked_up"), None)
        .expect("picked_up webhook");

    let err = svc.cancel_return(&number).unwrap_err();

    assert!(matches!(err, ReturnsError::Rejected(_)));
    let msg = err.to_string();
    assert!(msg.contains("picked_up"));
    assert!(msg.contains("pending, approved, pickup_scheduled"));

    // No state change, no extra history row.
    let record = svc.store.get_return_by_number(&number).unwrap();
    assert_eq!(record.status, ReturnStatus::PickedUp);
    assert_eq!(svc.store.history_count(record.id).unwrap(), 2);
}

#[test]
fn full_happy_path_reaches_refund_completed() {
    let svc = service();
    let number = approved_return(&svc, "OD-HAPPY");

    for event in ["out_for_pickup", "picked_up", "warehouse_received"] {
        let ack = svc
            .handle_logistics_event(&logistics_payload(&number, event), None)
            .expect("logistics webhook");
        assert_eq!(ack.return_number, number);
    }
    svc.handle_refund_event(&refund_payload(&number, "initiated"), None)
        .expect("refund initiated");
    let mut completed = refund_payload(&number, "completed");
    completed.refund_reference = Some("REF-TXN-123456".to_string());
    completed.refund_amount = Some(4_999.0);
    svc.handle_refund_event(&completed, None)
        .expect("refund completed");

    let detail = svc.get_return(&number).expect("get return");
    assert_eq!(detail.request.status, ReturnStatus::RefundCompleted);
    assert_eq!(detail.request.refund_reference, "REF-TXN-123456");
    assert_eq!(detail.request.refund_amount, Some(4_999.0));
    assert!(detail.request.pickup_scheduled_date.is_some());
    assert!(detail.request.pickup_completed_date.is_some());

    let expected = [
        ReturnStatus::Approved,
        ReturnStatus::PickupScheduled,
        ReturnStatus::PickedUp,
        ReturnStatus::WarehouseReceived,
        ReturnStatus::RefundInitiated,
        ReturnStatus::RefundCompleted,
    ];
    let history = &detail.status_history;
    assert_eq!(history.len(), expected.len());
    for (entry, want) in history.iter().zip(expected) {
        assert_eq!(entry.to_status, want);
    }
    // from_status chains: each entry starts where the previous ended.
    assert_eq!(history[0].from_status, None);
    for pair in history.windows(2) {
        assert_eq!(pair[1].from_status, Some(pair[0].to_status));
    }
}

#[test]
fn failed_attempt_keeps_status_but_records_history() {
    let svc = service();
    let number = approved_return(&svc, "OD-FAILED");
    svc.handle_logistics_event(&logistics_payload(&number, "out_for_pickup"), None)
        .expect("out_for_pickup webhook");

    let ack = svc
        .handle_logistics_event(&logistics_payload(&number, "failed_attempt"), None)
        .expect("failed_attempt webhook");

    assert_eq!(ack.new_status, ReturnStatus::PickupScheduled);
    let record = svc.store.get_return_by_number(&number).unwrap();
    assert_eq!(record.status, ReturnStatus::PickupScheduled);

    let history = svc.store.history_for_return(record.id).unwrap();
    assert_eq!(history.len(), 3);
    let last = history.last().unwrap();
    assert_eq!(last.from_status, Some(ReturnStatus::PickupScheduled));
    assert_eq!(last.to_status, ReturnStatus::PickupScheduled);
    assert_eq!(last.changed_by, Actor::Webhook);
}

#[test]
fn bulk_approve_touches_only_pending_returns() {
    let svc = service();
    let pending_order = delivered_order(&svc, "OD-BULK-HI", "electronics", 79_999.0, 2);
    let pending = svc
        .create_return(&create_request(pending_order))
        .expect("create high value")
        .detail
        .request
        .return_number;
    let approved = approved_return(&svc, "OD-BULK-LO");

    let updated = svc
        .approve_pending(&[pending.as_str(), approved.as_str()], "ops")
        .expect("bulk approve");

    assert_eq!(updated, 1);
    let record = svc.store.get_return_by_number(&pending).unwrap();
    assert_eq!(record.status, ReturnStatus::Approved);
    let history = svc.store.history_for_return(record.id).unwrap();
    assert_eq!(history.last().unwrap().changed_by, Actor::admin("ops"));

    // The already-approved return was skipped entirely.
    let untouched = svc.store.get_return_by_number(&approved).unwrap();
    assert_eq!(svc.store.history_count(untouched.id).unwrap(), 1);
}

#[test]
fn bulk_reject_moves_pending_to_rejected() {
    let svc = service();
    let order_id = delivered_order(&svc, "OD-REJECT", "electronics", 25_000.0, 2);
    let number = svc
        .create_return(&create_request(order_id))
        .expect("create high value")
        .detail
        .request
        .return_number;

    let updated = svc
        .reject_pending(&[number.as_str()], "ops")
        .expect("bulk reject");

    assert_eq!(updated, 1);
    let record = svc.store.get_return_by_number(&number).unwrap();
    assert_eq!(record.status, ReturnStatus::Rejected);
}

#[test]
fn schedule_pickup_moves_approved_returns() {
    let svc = service();
    let number = approved_return(&svc, "OD-PICKUP");

    let updated = svc
        .schedule_pickup(&[number.as_str()], "ops")
        .expect("schedule pickup");

    assert_eq!(updated, 1);
    let record = svc.store.get_return_by_number(&number).unwrap();
    assert_eq!(record.status, ReturnStatus::PickupScheduled);
    let history = svc.store.history_for_return(record.id).unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history.last().unwrap().changed_by, Actor::admin("ops"));
}

#[test]
fn status_history_reports_the_current_status() {
    let svc = service();
    let number = approved_return(&svc, "OD-TIMELINE");
    svc.handle_logistics_event(&logistics_payload(&number, "out_for_pickup"), None)
        .expect("out_for_pickup webhook");

    let timeline = svc.status_history(&number).expect("status history");

    assert_eq!(timeline.return_number, number);
    assert_eq!(timeline.current_status, ReturnStatus::PickupScheduled);
    assert_eq!(timeline.timeline.len(), 2);
    assert_eq!(
        timeline.timeline.last().unwrap().to_status,
        timeline.current_status
    );
}

struct Recorder(Rc<RefCell<Vec<ReturnEvent>>>);

impl Notifier for Recorder {
    fn notify(&self, event: &ReturnEvent) {
        self.0.borrow_mut().push(event.clone());
    }
}

#[test]
fn every_committed_change_emits_one_notification() {
    let events = Rc::new(RefCell::new(Vec::new()));
    let svc = service().with_notifier(Box::new(Recorder(events.clone())));

    let number = approved_return(&svc, "OD-NOTIFY");
    svc.cancel_return(&number).expect("cancel return");

    let events = events.borrow();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        &events[0],
        ReturnEvent::ReturnCreated { return_number, .. } if *return_number == number
    ));
    assert!(matches!(
        &events[1],
        ReturnEvent::StatusChanged {
            from: ReturnStatus::Approved,
            to: ReturnStatus::Cancelled,
            actor: Actor::Customer,
            ..
        }
    ));
}
