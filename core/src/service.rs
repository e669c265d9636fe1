//! Service layer: wires the store, policy, clock, and notifier into
//! the public return operations.
//!
//! Each method is one request: validate, read, mutate inside a store
//! transaction, then emit a notification. Nothing here retries;
//! callers (and webhook senders) own the retry loop.

use crate::clock::Clock;
use crate::config::ReturnsConfig;
use crate::eligibility::{self, EligibilityReport};
use crate::error::{ReturnsError, ReturnsResult};
use crate::event::{LogNotifier, Notifier, ReturnEvent};
use crate::fraud;
use crate::lifecycle;
use crate::model::{
    Actor, FlagReviewStatus, FraudFlagRecord, OrderRecord, RefundMethod, ReturnDetail,
    ReturnImageRecord, ReturnReason, ReturnRecord, ReturnStatus, StatusHistoryRecord,
};
use crate::store::{
    InsertOutcome, NewImage, NewReturn, Page, PageRequest, ReturnFilter, ReturnsStore,
    TransitionUpdate,
};
use crate::types::{FlagId, OrderId, ReturnId};
use crate::webhook::{
    self, LogisticsEvent, LogisticsEventPayload, RefundEvent, RefundEventPayload,
};
use chrono::Duration;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub struct ReturnsService {
    pub store: ReturnsStore,
    config: ReturnsConfig,
    clock: Clock,
    notifier: Box<dyn Notifier>,
}

/// Creation input as it arrives from the caller. Enum fields are raw
/// strings here; `validate` parses them before anything is persisted.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReturnRequest {
    pub order_id: OrderId,
    pub reason: String,
    #[serde(default)]
    pub reason_description: String,
    #[serde(default)]
    pub refund_method: Option<String>,
    pub pickup_address: String,
    pub pickup_pincode: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

struct ValidatedCreate {
    reason: ReturnReason,
    refund_method: RefundMethod,
}

/// `created` distinguishes a fresh return from an idempotency-key hit
/// replaying an earlier one; the payload shape is identical.
#[derive(Debug, Serialize)]
pub struct CreateOutcome {
    pub created: bool,
    pub detail: ReturnDetail,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusTimeline {
    pub return_number: String,
    pub current_status: ReturnStatus,
    pub timeline: Vec<StatusHistoryRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub return_number: String,
    pub new_status: ReturnStatus,
}

impl ReturnsService {
    pub fn new(store: ReturnsStore, config: ReturnsConfig) -> Self {
        Self {
            store,
            config,
            clock: Clock::System,
            notifier: Box::new(LogNotifier),
        }
    }

    pub fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(&self) -> &ReturnsConfig {
        &self.config
    }

    // ── Eligibility ────────────────────────────────────────────

    pub fn check_eligibility(&self, order_id: OrderId) -> ReturnsResult<EligibilityReport> {
        let order = self.store.get_order(order_id)?;
        let has_active = self.store.has_active_return(order.id)?;
        Ok(eligibility::evaluate(
            &order,
            has_active,
            &self.config.policy,
            self.clock.now(),
        ))
    }

    // ── Creation ───────────────────────────────────────────────

    /// Create a return request: idempotency guard, eligibility check,
    /// insert with initial history, then the one-shot fraud pass.
    pub fn create_return(&self, request: &CreateReturnRequest) -> ReturnsResult<CreateOutcome> {
        let parsed = validate_create(request)?;
        let order = self.store.get_order(request.order_id)?;
        let now = self.clock.now();

        let idempotency_key = request
            .idempotency_key
            .as_deref()
            .filter(|k| !k.is_empty());
        if let Some(key) = idempotency_key {
            if let Some(existing) = self.store.find_by_idempotency_key(key)? {
                info!("Duplicate return request blocked. Idempotency key: {key}");
                return Ok(CreateOutcome {
                    created: false,
                    detail: self.detail_for(&existing)?,
                });
            }
        }

        let has_active = self.store.has_active_return(order.id)?;
        let report = eligibility::evaluate(&order, has_active, &self.config.policy, now);
        if !report.eligible {
            let reason = report.reason.unwrap_or_else(|| "ineligible".to_string());
            return Err(ReturnsError::rejected(format!(
                "Return not eligible: {reason}"
            )));
        }

        let (status, is_high_value) = lifecycle::initial_status(order.total_amount, &self.config.policy);
        if is_high_value {
            info!(
                "High value return: {} for order {}",
                order.total_amount, order.order_number
            );
        }

        let return_number = generate_return_number();
        let new = NewReturn {
            return_number: &return_number,
            order_id: order.id,
            customer_id: order.customer_id,
            customer_name: &order.customer_name,
            customer_email: &order.customer_email,
            reason: parsed.reason,
            reason_description: &request.reason_description,
            status,
            refund_method: parsed.refund_method,
            refund_amount: order.total_amount,
            pickup_address: &request.pickup_address,
            pickup_pincode: &request.pickup_pincode,
            idempotency_key,
            is_high_value,
        };
        let comment = format!("Return request created. Reason: {}", parsed.reason);

        let return_id = match self.store.create_return_with_history(&new, &comment, now)? {
            InsertOutcome::Created(id) => id,
            // Lost the race against an identical retry: hand back the
            // row the winner created.
            InsertOutcome::DuplicateKey => {
                let key = idempotency_key.unwrap_or_default();
                info!("Duplicate return request blocked. Idempotency key: {key}");
                let existing = self.store.find_by_idempotency_key(key)?.ok_or_else(|| {
                    ReturnsError::not_found("Return request", format!("idempotency key {key}"))
                })?;
                return Ok(CreateOutcome {
                    created: false,
                    detail: self.detail_for(&existing)?,
                });
            }
        };

        self.run_fraud_checks(return_id, &return_number, &order)?;

        let record = self.store.get_return(return_id)?;
        info!(
            "Return created: {} for order {}",
            record.return_number, order.order_number
        );
        self.notifier.notify(&ReturnEvent::ReturnCreated {
            return_number: record.return_number.clone(),
            order_number: order.order_number.clone(),
            status: record.status,
            is_high_value: record.is_high_value,
        });

        Ok(CreateOutcome {
            created: true,
            detail: self.detail_for(&record)?,
        })
    }

    fn run_fraud_checks(
        &self,
        return_id: ReturnId,
        return_number: &str,
        order: &OrderRecord,
    ) -> ReturnsResult<()> {
        let now = self.clock.now();
        let recent = self
            .store
            .count_customer_returns_since(order.customer_id, now - Duration::days(30))?;
        let drafts = fraud::run_rules(order, recent, &self.config.policy, now);
        if drafts.is_empty() {
            return Ok(());
        }
        for draft in &drafts {
            self.store
                .insert_flag(return_id, order.customer_id, draft, now)?;
            warn!(
                "Fraud flag: {} for customer {} (return {return_number})",
                draft.flag_type, order.customer_id
            );
        }
        self.store.mark_flagged(return_id)?;
        self.notifier.notify(&ReturnEvent::ReturnFlagged {
            return_number: return_number.to_string(),
            flag_count: drafts.len(),
        });
        Ok(())
    }

    // ── Reads ──────────────────────────────────────────────────

    pub fn get_return(&self, return_number: &str) -> ReturnsResult<ReturnDetail> {
        let record = self.store.get_return_by_number(return_number)?;
        self.detail_for(&record)
    }

    pub fn status_history(&self, return_number: &str) -> ReturnsResult<StatusTimeline> {
        let record = self.store.get_return_by_number(return_number)?;
        Ok(StatusTimeline {
            timeline: self.store.history_for_return(record.id)?,
            return_number: record.return_number,
            current_status: record.status,
        })
    }

    pub fn list_returns(&self, filter: &ReturnFilter, page: &PageRequest) -> ReturnsResult<Page> {
        self.store.list_returns(filter, page)
    }

    fn detail_for(&self, record: &ReturnRecord) -> ReturnsResult<ReturnDetail> {
        Ok(ReturnDetail {
            order: self.store.get_order(record.order_id)?,
            images: self.store.images_for_return(record.id)?,
            status_history: self.store.history_for_return(record.id)?,
            fraud_flags: self.store.flags_for_return(record.id)?,
            request: record.clone(),
        })
    }

    // ── Cancellation ───────────────────────────────────────────

    /// Customer-initiated cancellation. Only allowed before pickup
    /// completes; rejected attempts leave no trace.
    pub fn cancel_return(&self, return_number: &str) -> ReturnsResult<ReturnRecord> {
        let record = self.store.get_return_by_number(return_number)?;
        lifecycle::check_cancellable(record.status)?;
        self.transition(
            &record,
            ReturnStatus::Cancelled,
            Actor::Customer,
            "Cancelled by customer".to_string(),
            TransitionUpdate::default(),
        )?;
        info!("Return {return_number} cancelled by customer");
        self.store.get_return(record.id)
    }

    // ── Admin bulk actions ─────────────────────────────────────

    /// Approve every listed return that is still pending. Returns the
    /// number of rows actually updated; rows in other statuses are
    /// skipped, unknown return numbers error out.
    pub fn approve_pending(&self, return_numbers: &[&str], admin: &str) -> ReturnsResult<usize> {
        self.bulk_transition(
            return_numbers,
            admin,
            ReturnStatus::Pending,
            ReturnStatus::Approved,
            "Bulk approved via admin panel",
        )
    }

    pub fn reject_pending(&self, return_numbers: &[&str], admin: &str) -> ReturnsResult<usize> {
        self.bulk_transition(
            return_numbers,
            admin,
            ReturnStatus::Pending,
            ReturnStatus::Rejected,
            "Bulk rejected via admin panel",
        )
    }

    pub fn schedule_pickup(&self, return_numbers: &[&str], admin: &str) -> ReturnsResult<usize> {
        self.bulk_transition(
            return_numbers,
            admin,
            ReturnStatus::Approved,
            ReturnStatus::PickupScheduled,
            "Pickup scheduled via admin panel",
        )
    }

    fn bulk_transition(
        &self,
        return_numbers: &[&str],
        admin: &str,
        from: ReturnStatus,
        to: ReturnStatus,
        comment: &str,
    ) -> ReturnsResult<usize> {
        let mut updated = 0;
        for number in return_numbers {
            let record = self.store.get_return_by_number(number)?;
            if record.status != from {
                continue;
            }
            self.transition(
                &record,
                to,
                Actor::admin(admin),
                comment.to_string(),
                TransitionUpdate::default(),
            )?;
            updated += 1;
        }
        Ok(updated)
    }

    // ── Webhooks ───────────────────────────────────────────────

    /// Logistics partner callback. Token check runs before the return
    /// is looked up; unknown events are rejected with the valid list.
    pub fn handle_logistics_event(
        &self,
        payload: &LogisticsEventPayload,
        header_token: Option<&str>,
    ) -> ReturnsResult<WebhookAck> {
        self.verify_webhook(payload.webhook_token.as_deref(), header_token)?;
        let event: LogisticsEvent = payload.event.parse()?;
        let record = self.store.get_return_by_number(&payload.return_number)?;
        let now = self.clock.now();

        let mut update = TransitionUpdate {
            tracking_number: payload.tracking_number.clone(),
            logistics_partner: payload.logistics_partner.clone(),
            ..TransitionUpdate::default()
        };
        match event {
            LogisticsEvent::OutForPickup => update.pickup_scheduled_date = Some(now),
            LogisticsEvent::PickedUp => update.pickup_completed_date = Some(now),
            _ => {}
        }

        let mut comment = format!("Logistics event: {}", event.as_str());
        if let Some(agent) = payload.delivery_agent.as_deref().filter(|a| !a.is_empty()) {
            comment.push_str(&format!(" | Agent: {agent}"));
        }
        if let Some(remarks) = payload.remarks.as_deref().filter(|r| !r.is_empty()) {
            comment.push_str(&format!(" | {remarks}"));
        }

        let to = event.target_status(record.status);
        self.transition(&record, to, Actor::Webhook, comment, update)?;
        info!(
            "Webhook processed: {} | {} | {} -> {}",
            payload.return_number,
            event.as_str(),
            record.status,
            to
        );
        Ok(WebhookAck {
            return_number: payload.return_number.clone(),
            new_status: to,
        })
    }

    /// Refund service callback. Same token rules as logistics.
    pub fn handle_refund_event(
        &self,
        payload: &RefundEventPayload,
        header_token: Option<&str>,
    ) -> ReturnsResult<WebhookAck> {
        self.verify_webhook(payload.webhook_token.as_deref(), header_token)?;
        let event: RefundEvent = payload.refund_status.parse()?;
        let record = self.store.get_return_by_number(&payload.return_number)?;

        let update = TransitionUpdate {
            refund_reference: payload.refund_reference.clone(),
            refund_amount: payload.refund_amount,
            ..TransitionUpdate::default()
        };
        let comment = format!(
            "Refund {}. Reference: {}",
            event.as_str(),
            payload.refund_reference.as_deref().unwrap_or("N/A")
        );

        let to = event.target_status(record.status);
        self.transition(&record, to, Actor::Webhook, comment, update)?;
        info!(
            "Refund webhook: {} | {}",
            payload.return_number,
            event.as_str()
        );
        Ok(WebhookAck {
            return_number: payload.return_number.clone(),
            new_status: to,
        })
    }

    fn verify_webhook(
        &self,
        body_token: Option<&str>,
        header_token: Option<&str>,
    ) -> ReturnsResult<()> {
        webhook::verify_token(body_token, header_token, &self.config.webhook.secret).map_err(|e| {
            warn!("Webhook authentication failed");
            e
        })
    }

    /// Single transition path: status update + history row in one
    /// store transaction, then exactly one notification.
    fn transition(
        &self,
        record: &ReturnRecord,
        to: ReturnStatus,
        actor: Actor,
        comment: String,
        update: TransitionUpdate,
    ) -> ReturnsResult<()> {
        self.store.apply_transition(
            record.id,
            record.status,
            to,
            &actor,
            &comment,
            &update,
            self.clock.now(),
        )?;
        self.notifier.notify(&ReturnEvent::StatusChanged {
            return_number: record.return_number.clone(),
            from: record.status,
            to,
            actor,
        });
        Ok(())
    }

    // ── Images ─────────────────────────────────────────────────

    /// Attach proof-photo metadata to a return. The blob itself is
    /// already in object storage.
    pub fn attach_image(
        &self,
        return_number: &str,
        image: &NewImage,
    ) -> ReturnsResult<ReturnImageRecord> {
        let record = self.store.get_return_by_number(return_number)?;
        let count = self.store.image_count(record.id)?;
        if count as usize >= self.config.policy.max_return_images {
            return Err(ReturnsError::rejected(format!(
                "Maximum of {} images per return request",
                self.config.policy.max_return_images
            )));
        }
        self.store.insert_image(record.id, image, self.clock.now())
    }

    // ── Fraud review ───────────────────────────────────────────

    pub fn review_flag(
        &self,
        flag_id: FlagId,
        status: FlagReviewStatus,
        reviewed_by: &str,
        notes: &str,
    ) -> ReturnsResult<FraudFlagRecord> {
        self.store
            .review_flag(flag_id, status, reviewed_by, notes, self.clock.now())?;
        self.store.get_flag(flag_id)
    }
}

fn validate_create(request: &CreateReturnRequest) -> ReturnsResult<ValidatedCreate> {
    let reason: ReturnReason = request.reason.parse()?;
    let refund_method = match request.refund_method.as_deref() {
        None | Some("") => RefundMethod::Original,
        Some(raw) => raw.parse()?,
    };
    if request.pickup_address.is_empty() {
        return Err(ReturnsError::validation("Pickup address is required."));
    }
    if request.pickup_address.len() > 1000 {
        return Err(ReturnsError::validation(
            "Pickup address must be at most 1000 characters.",
        ));
    }
    if request.reason_description.len() > 2000 {
        return Err(ReturnsError::validation(
            "Reason description must be at most 2000 characters.",
        ));
    }
    validate_pincode(&request.pickup_pincode)?;
    Ok(ValidatedCreate {
        reason,
        refund_method,
    })
}

fn validate_pincode(pincode: &str) -> ReturnsResult<()> {
    if pincode.len() == 6 && pincode.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(ReturnsError::validation(
            "Pincode must be exactly 6 digits.",
        ))
    }
}

fn generate_return_number() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("RET-{}", hex[..8].to_uppercase())
}
