//! Return-request rows, status history, and cursor-based listing.

use super::ReturnsStore;
use crate::error::{ReturnsError, ReturnsResult};
use crate::lifecycle;
use crate::model::{
    Actor, RefundMethod, ReturnReason, ReturnRecord, ReturnStatus, StatusHistoryRecord,
};
use crate::types::{CustomerId, OrderId, ReturnId};
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, ErrorCode, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Return-request fields fixed at creation time.
#[derive(Debug, Clone)]
pub struct NewReturn<'a> {
    pub return_number: &'a str,
    pub order_id: OrderId,
    pub customer_id: CustomerId,
    pub customer_name: &'a str,
    pub customer_email: &'a str,
    pub reason: ReturnReason,
    pub reason_description: &'a str,
    pub status: ReturnStatus,
    pub refund_method: RefundMethod,
    pub refund_amount: f64,
    pub pickup_address: &'a str,
    pub pickup_pincode: &'a str,
    pub idempotency_key: Option<&'a str>,
    pub is_high_value: bool,
}

/// Result of an insert attempt. `DuplicateKey` means another request
/// with the same idempotency key won the race.
#[derive(Debug)]
pub enum InsertOutcome {
    Created(ReturnId),
    DuplicateKey,
}

/// Optional field updates applied together with a status change.
/// `None` fields keep their current value.
#[derive(Debug, Clone, Default)]
pub struct TransitionUpdate {
    pub tracking_number: Option<String>,
    pub logistics_partner: Option<String>,
    pub pickup_scheduled_date: Option<DateTime<Utc>>,
    pub pickup_completed_date: Option<DateTime<Utc>>,
    pub refund_reference: Option<String>,
    pub refund_amount: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct ReturnFilter {
    pub customer_id: Option<CustomerId>,
    pub status: Option<ReturnStatus>,
    pub flagged_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Next,
    Prev,
}

#[derive(Debug, Clone)]
pub struct PageRequest {
    pub cursor: Option<ReturnId>,
    pub direction: Direction,
    pub page_size: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            cursor: None,
            direction: Direction::Next,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Page {
    pub items: Vec<ReturnRecord>,
    pub next_cursor: Option<ReturnId>,
    pub prev_cursor: Option<ReturnId>,
    pub has_more: bool,
}

impl ReturnsStore {
    /// Insert a return plus its creation history entry in one
    /// transaction. A unique-key collision on the idempotency key is
    /// reported as `DuplicateKey`, not an error; a collision on the
    /// one-active-per-order index is a business-rule rejection.
    pub fn create_return_with_history(
        &self,
        new: &NewReturn<'_>,
        comment: &str,
        now: DateTime<Utc>,
    ) -> ReturnsResult<InsertOutcome> {
        let tx = self.conn().unchecked_transaction()?;
        let inserted = tx.execute(
            "INSERT INTO return_requests (
                return_number, order_id, customer_id, customer_name,
                customer_email, reason, reason_description, status,
                refund_method, refund_amount, pickup_address, pickup_pincode,
                idempotency_key, is_high_value, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                       ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                new.return_number,
                new.order_id,
                new.customer_id,
                new.customer_name,
                new.customer_email,
                new.reason,
                new.reason_description,
                new.status,
                new.refund_method,
                new.refund_amount,
                new.pickup_address,
                new.pickup_pincode,
                new.idempotency_key,
                new.is_high_value,
                now,
                now,
            ],
        );

        match inserted {
            Ok(_) => {
                let id = tx.last_insert_rowid();
                tx.execute(
                    "INSERT INTO return_status_history
                        (return_request_id, from_status, to_status, changed_by, comment, created_at)
                     VALUES (?1, '', ?2, ?3, ?4, ?5)",
                    params![id, new.status, Actor::System, comment, now],
                )?;
                tx.commit()?;
                Ok(InsertOutcome::Created(id))
            }
            Err(err) if is_unique_violation(&err, "idempotency_key") => {
                Ok(InsertOutcome::DuplicateKey)
            }
            Err(err) if is_unique_violation(&err, "one_active_per_order") => {
                Err(ReturnsError::rejected(
                    "An active return request already exists for this order.",
                ))
            }
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_return(&self, return_id: ReturnId) -> ReturnsResult<ReturnRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {RETURN_COLUMNS} FROM return_requests WHERE id = ?1"),
                params![return_id],
                return_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ReturnsError::not_found("Return request", return_id.to_string()))
    }

    pub fn get_return_by_number(&self, return_number: &str) -> ReturnsResult<ReturnRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {RETURN_COLUMNS} FROM return_requests WHERE return_number = ?1"),
                params![return_number],
                return_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ReturnsError::not_found("Return request", return_number))
    }

    pub fn find_by_idempotency_key(&self, key: &str) -> ReturnsResult<Option<ReturnRecord>> {
        self.conn()
            .query_row(
                &format!("SELECT {RETURN_COLUMNS} FROM return_requests WHERE idempotency_key = ?1"),
                params![key],
                return_row_mapper,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn has_active_return(&self, order_id: OrderId) -> ReturnsResult<bool> {
        let sql = format!(
            "SELECT EXISTS(
                SELECT 1 FROM return_requests
                WHERE order_id = ?1 AND status IN ({})
             )",
            lifecycle::active_statuses_sql()
        );
        self.conn()
            .query_row(&sql, params![order_id], |row| row.get(0))
            .map_err(Into::into)
    }

    /// Returns created by this customer at or after `since`. Counts
    /// every status: a cancelled return still counts toward the
    /// frequency rule.
    pub fn count_customer_returns_since(
        &self,
        customer_id: CustomerId,
        since: DateTime<Utc>,
    ) -> ReturnsResult<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM return_requests
                 WHERE customer_id = ?1 AND created_at >= ?2",
                params![customer_id, since],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    pub fn mark_flagged(&self, return_id: ReturnId) -> ReturnsResult<()> {
        self.conn().execute(
            "UPDATE return_requests SET is_flagged = 1 WHERE id = ?1",
            params![return_id],
        )?;
        Ok(())
    }

    /// Apply a status change: row update plus history insert in a
    /// single transaction, so concurrent webhook deliveries can never
    /// interleave into an inconsistent (status, history) pair.
    pub fn apply_transition(
        &self,
        return_id: ReturnId,
        from: ReturnStatus,
        to: ReturnStatus,
        actor: &Actor,
        comment: &str,
        update: &TransitionUpdate,
        now: DateTime<Utc>,
    ) -> ReturnsResult<()> {
        let tx = self.conn().unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE return_requests SET
                status                = ?1,
                updated_at            = ?2,
                tracking_number       = COALESCE(?3, tracking_number),
                logistics_partner     = COALESCE(?4, logistics_partner),
                pickup_scheduled_date = COALESCE(?5, pickup_scheduled_date),
                pickup_completed_date = COALESCE(?6, pickup_completed_date),
                refund_reference      = COALESCE(?7, refund_reference),
                refund_amount         = COALESCE(?8, refund_amount)
             WHERE id = ?9",
            params![
                to,
                now,
                update.tracking_number,
                update.logistics_partner,
                update.pickup_scheduled_date,
                update.pickup_completed_date,
                update.refund_reference,
                update.refund_amount,
                return_id,
            ],
        )?;
        if changed == 0 {
            return Err(ReturnsError::not_found(
                "Return request",
                return_id.to_string(),
            ));
        }
        tx.execute(
            "INSERT INTO return_status_history
                (return_request_id, from_status, to_status, changed_by, comment, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![return_id, from.as_str(), to, actor, comment, now],
        )?;
        tx.commit()?;
        Ok(())
    }

    // ── History ────────────────────────────────────────────────

    pub fn history_for_return(
        &self,
        return_id: ReturnId,
    ) -> ReturnsResult<Vec<StatusHistoryRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, return_request_id, from_status, to_status, changed_by, comment, created_at
             FROM return_status_history
             WHERE return_request_id = ?1
             ORDER BY created_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![return_id], history_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn history_count(&self, return_id: ReturnId) -> ReturnsResult<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM return_status_history WHERE return_request_id = ?1",
                params![return_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }

    // ── Listing ────────────────────────────────────────────────

    /// Cursor-paginated listing keyed on the return's rowid. `Next`
    /// walks ascending from the cursor; `Prev` fetches descending and
    /// reverses, so pages always read in ascending id order.
    pub fn list_returns(&self, filter: &ReturnFilter, page: &PageRequest) -> ReturnsResult<Page> {
        let size = page.page_size.clamp(1, MAX_PAGE_SIZE) as usize;

        let mut conditions: Vec<&str> = Vec::new();
        let mut bind: Vec<Value> = Vec::new();
        if let Some(customer_id) = filter.customer_id {
            conditions.push("customer_id = ?");
            bind.push(Value::Integer(customer_id));
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?");
            bind.push(Value::Text(status.as_str().to_string()));
        }
        if filter.flagged_only {
            conditions.push("is_flagged = 1");
        }
        if let Some(cursor) = page.cursor {
            conditions.push(match page.direction {
                Direction::Next => "id > ?",
                Direction::Prev => "id < ?",
            });
            bind.push(Value::Integer(cursor));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let order = match page.direction {
            Direction::Next => "ASC",
            Direction::Prev => "DESC",
        };
        let sql = format!(
            "SELECT {RETURN_COLUMNS} FROM return_requests
             {where_clause} ORDER BY id {order} LIMIT {}",
            size + 1
        );

        let mut stmt = self.conn().prepare(&sql)?;
        let mut items: Vec<ReturnRecord> = stmt
            .query_map(params_from_iter(bind), return_row_mapper)?
            .collect::<Result<Vec<_>, _>>()?;

        let has_more = items.len() > size;
        if has_more {
            items.truncate(size);
        }
        if page.direction == Direction::Prev {
            items.reverse();
        }

        Ok(Page {
            next_cursor: items.last().map(|r| r.id),
            prev_cursor: items.first().map(|r| r.id),
            has_more,
            items,
        })
    }

    // ── Test / summary helpers ─────────────────────────────────

    pub fn return_count(&self) -> ReturnsResult<i64> {
        self.conn()
            .query_row("SELECT COUNT(*) FROM return_requests", [], |row| row.get(0))
            .map_err(Into::into)
    }
}

fn is_unique_violation(err: &rusqlite::Error, needle: &str) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, Some(msg)) => {
            e.code == ErrorCode::ConstraintViolation && msg.contains(needle)
        }
        _ => false,
    }
}

const RETURN_COLUMNS: &str = "id, return_number, order_id, customer_id, customer_name,
    customer_email, reason, reason_description, status, refund_method,
    refund_amount, refund_reference, pickup_address, pickup_pincode,
    pickup_scheduled_date, pickup_completed_date, logistics_partner,
    tracking_number, idempotency_key, is_flagged, is_high_value,
    created_at, updated_at";

fn return_row_mapper(row: &Row<'_>) -> rusqlite::Result<ReturnRecord> {
    Ok(ReturnRecord {
        id: row.get(0)?,
        return_number: row.get(1)?,
        order_id: row.get(2)?,
        customer_id: row.get(3)?,
        customer_name: row.get(4)?,
        customer_email: row.get(5)?,
        reason: row.get(6)?,
        reason_description: row.get(7)?,
        status: row.get(8)?,
        refund_method: row.get(9)?,
        refund_amount: row.get(10)?,
        refund_reference: row.get(11)?,
        pickup_address: row.get(12)?,
        pickup_pincode: row.get(13)?,
        pickup_scheduled_date: row.get(14)?,
        pickup_completed_date: row.get(15)?,
        logistics_partner: row.get(16)?,
        tracking_number: row.get(17)?,
        idempotency_key: row.get(18)?,
        is_flagged: row.get(19)?,
        is_high_value: row.get(20)?,
        created_at: row.get(21)?,
        updated_at: row.get(22)?,
    })
}

fn history_row_mapper(row: &Row<'_>) -> rusqlite::Result<StatusHistoryRecord> {
    let from_raw: String = row.get(2)?;
    let from_status = if from_raw.is_empty() {
        None
    } else {
        Some(from_raw.parse::<ReturnStatus>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                2,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?)
    };
    Ok(StatusHistoryRecord {
        id: row.get(0)?,
        return_request_id: row.get(1)?,
        from_status,
        to_status: row.get(3)?,
        changed_by: row.get(4)?,
        comment: row.get(5)?,
        created_at: row.get(6)?,
    })
}
