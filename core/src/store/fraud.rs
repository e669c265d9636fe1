//! Fraud-flag rows and manual review updates.

use super::ReturnsStore;
use crate::error::{ReturnsError, ReturnsResult};
use crate::fraud::FlagDraft;
use crate::model::{FlagReviewStatus, FraudFlagRecord};
use crate::types::{CustomerId, FlagId, ReturnId};
use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};

impl ReturnsStore {
    pub fn insert_flag(
        &self,
        return_id: ReturnId,
        customer_id: CustomerId,
        draft: &FlagDraft,
        now: DateTime<Utc>,
    ) -> ReturnsResult<FlagId> {
        self.conn().execute(
            "INSERT INTO fraud_flags (
                return_request_id, customer_id, flag_type, status,
                description, created_at
             ) VALUES (?1, ?2, ?3, 'open', ?4, ?5)",
            params![
                return_id,
                customer_id,
                draft.flag_type,
                draft.description,
                now,
            ],
        )?;
        Ok(self.conn().last_insert_rowid())
    }

    pub fn get_flag(&self, flag_id: FlagId) -> ReturnsResult<FraudFlagRecord> {
        self.conn()
            .query_row(
                &format!("SELECT {FLAG_COLUMNS} FROM fraud_flags WHERE id = ?1"),
                params![flag_id],
                flag_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ReturnsError::not_found("Fraud flag", flag_id.to_string()))
    }

    pub fn flags_for_return(&self, return_id: ReturnId) -> ReturnsResult<Vec<FraudFlagRecord>> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {FLAG_COLUMNS} FROM fraud_flags
             WHERE return_request_id = ?1
             ORDER BY id ASC"
        ))?;
        let rows = stmt.query_map(params![return_id], flag_row_mapper)?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Manual review outcome from the ops team.
    pub fn review_flag(
        &self,
        flag_id: FlagId,
        status: FlagReviewStatus,
        reviewed_by: &str,
        notes: &str,
        now: DateTime<Utc>,
    ) -> ReturnsResult<()> {
        let changed = self.conn().execute(
            "UPDATE fraud_flags
             SET status = ?1, reviewed_by = ?2, review_notes = ?3, reviewed_at = ?4
             WHERE id = ?5",
            params![status, reviewed_by, notes, now, flag_id],
        )?;
        if changed == 0 {
            return Err(ReturnsError::not_found("Fraud flag", flag_id.to_string()));
        }
        Ok(())
    }

    pub fn open_flag_count(&self) -> ReturnsResult<i64> {
        self.conn()
            .query_row(
                "SELECT COUNT(*) FROM fraud_flags WHERE status = 'open'",
                [],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

const FLAG_COLUMNS: &str = "id, return_request_id, customer_id, flag_type, status,
    description, reviewed_by, review_notes, created_at, reviewed_at";

fn flag_row_mapper(row: &Row<'_>) -> rusqlite::Result<FraudFlagRecord> {
    Ok(FraudFlagRecord {
        id: row.get(0)?,
        return_request_id: row.get(1)?,
        customer_id: row.get(2)?,
        flag_type: row.get(3)?,
        status: row.get(4)?,
        description: row.get(5)?,
        reviewed_by: row.get(6)?,
        review_notes: row.get(7)?,
        created_at: row.get(8)?,
        reviewed_at: row.get(9)?,
    })
}
