//! SQLite persistence layer.
//!
//! RULE: Only the store talks to the database. Business modules and
//! the service call store methods — they never execute SQL directly.

mod fraud;
mod returns;

pub use returns::{
    Direction, InsertOutcome, NewReturn, Page, PageRequest, ReturnFilter, TransitionUpdate,
    DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE,
};

use crate::error::{ReturnsError, ReturnsResult};
use crate::model::{NewOrder, OrderRecord, ReturnImageRecord};
use crate::types::{OrderId, ReturnId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

pub struct ReturnsStore {
    conn: Connection,
    path: Option<String>, // None for :memory:, Some(path) for file
}

impl ReturnsStore {
    pub fn open(path: &str) -> ReturnsResult<Self> {
        let conn = Connection::open_with_flags(
            path,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )?;
        // WAL mode only for real files (shared-memory and :memory: ignore it).
        let _ = conn.execute_batch("PRAGMA journal_mode=WAL;");
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self {
            conn,
            path: Some(path.to_string()),
        })
    }

    /// Open an in-memory database (used in tests).
    pub fn in_memory() -> ReturnsResult<Self> {
        let conn = Connection::open(":memory:")?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(Self { conn, path: None })
    }

    /// Reopen a new connection to the same database.
    /// For in-memory databases this returns a fresh, isolated database.
    pub fn reopen(&self) -> ReturnsResult<Self> {
        match &self.path {
            Some(p) => Self::open(p),
            None => Self::in_memory(),
        }
    }

    /// Apply all schema migrations in order.
    pub fn migrate(&self) -> ReturnsResult<()> {
        self.conn
            .execute_batch(include_str!("../../../migrations/001_orders.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/002_returns.sql"))?;
        self.conn
            .execute_batch(include_str!("../../../migrations/003_fraud.sql"))?;
        Ok(())
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    // ── Orders ─────────────────────────────────────────────────

    pub fn insert_order(&self, order: &NewOrder, now: DateTime<Utc>) -> ReturnsResult<OrderId> {
        self.conn.execute(
            "INSERT INTO orders (
                order_number, customer_id, customer_name, customer_email,
                customer_phone, product_name, product_sku, category,
                quantity, unit_price, total_amount, status,
                ordered_at, delivered_at, payment_method, payment_reference,
                shipping_address, shipping_pincode, created_at, updated_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10,
                       ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20)",
            params![
                order.order_number,
                order.customer_id,
                order.customer_name,
                order.customer_email,
                order.customer_phone,
                order.product_name,
                order.product_sku,
                order.category,
                order.quantity,
                order.unit_price,
                order.total_amount,
                order.status,
                order.ordered_at,
                order.delivered_at,
                order.payment_method,
                order.payment_reference,
                order.shipping_address,
                order.shipping_pincode,
                now,
                now,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn get_order(&self, order_id: OrderId) -> ReturnsResult<OrderRecord> {
        self.conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = ?1"),
                params![order_id],
                order_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ReturnsError::not_found("Order", order_id.to_string()))
    }

    pub fn get_order_by_number(&self, order_number: &str) -> ReturnsResult<OrderRecord> {
        self.conn
            .query_row(
                &format!("SELECT {ORDER_COLUMNS} FROM orders WHERE order_number = ?1"),
                params![order_number],
                order_row_mapper,
            )
            .optional()?
            .ok_or_else(|| ReturnsError::not_found("Order", order_number))
    }

    pub fn delete_order(&self, order_id: OrderId) -> ReturnsResult<()> {
        self.conn
            .execute("DELETE FROM orders WHERE id = ?1", params![order_id])?;
        Ok(())
    }

    // ── Images ─────────────────────────────────────────────────

    pub fn insert_image(
        &self,
        return_id: ReturnId,
        image: &NewImage,
        now: DateTime<Utc>,
    ) -> ReturnsResult<ReturnImageRecord> {
        self.conn.execute(
            "INSERT INTO return_images (
                return_request_id, image_key, image_url, file_name,
                file_size, content_type, uploaded_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                return_id,
                image.image_key,
                image.image_url,
                image.file_name,
                image.file_size,
                image.content_type,
                now,
            ],
        )?;
        Ok(ReturnImageRecord {
            id: self.conn.last_insert_rowid(),
            return_request_id: return_id,
            image_key: image.image_key.clone(),
            image_url: image.image_url.clone(),
            file_name: image.file_name.clone(),
            file_size: image.file_size,
            content_type: image.content_type.clone(),
            uploaded_at: now,
        })
    }

    pub fn images_for_return(&self, return_id: ReturnId) -> ReturnsResult<Vec<ReturnImageRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, return_request_id, image_key, image_url, file_name,
                    file_size, content_type, uploaded_at
             FROM return_images
             WHERE return_request_id = ?1
             ORDER BY uploaded_at ASC, id ASC",
        )?;
        let rows = stmt.query_map(params![return_id], |row| {
            Ok(ReturnImageRecord {
                id: row.get(0)?,
                return_request_id: row.get(1)?,
                image_key: row.get(2)?,
                image_url: row.get(3)?,
                file_name: row.get(4)?,
                file_size: row.get(5)?,
                content_type: row.get(6)?,
                uploaded_at: row.get(7)?,
            })
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn image_count(&self, return_id: ReturnId) -> ReturnsResult<i64> {
        self.conn
            .query_row(
                "SELECT COUNT(*) FROM return_images WHERE return_request_id = ?1",
                params![return_id],
                |row| row.get(0),
            )
            .map_err(Into::into)
    }
}

/// Image metadata as supplied after the blob lands in object storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewImage {
    pub image_key: String,
    #[serde(default)]
    pub image_url: String,
    pub file_name: String,
    #[serde(default)]
    pub file_size: i64,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    "image/jpeg".to_string()
}

const ORDER_COLUMNS: &str = "id, order_number, customer_id, customer_name, customer_email,
    customer_phone, product_name, product_sku, category, quantity,
    unit_price, total_amount, status, ordered_at, delivered_at,
    payment_method, payment_reference, shipping_address, shipping_pincode,
    created_at, updated_at";

fn order_row_mapper(row: &Row<'_>) -> rusqlite::Result<OrderRecord> {
    Ok(OrderRecord {
        id: row.get(0)?,
        order_number: row.get(1)?,
        customer_id: row.get(2)?,
        customer_name: row.get(3)?,
        customer_email: row.get(4)?,
        customer_phone: row.get(5)?,
        product_name: row.get(6)?,
        product_sku: row.get(7)?,
        category: row.get(8)?,
        quantity: row.get(9)?,
        unit_price: row.get(10)?,
        total_amount: row.get(11)?,
        status: row.get(12)?,
        ordered_at: row.get(13)?,
        delivered_at: row.get(14)?,
        payment_method: row.get(15)?,
        payment_reference: row.get(16)?,
        shipping_address: row.get(17)?,
        shipping_pincode: row.get(18)?,
        created_at: row.get(19)?,
        updated_at: row.get(20)?,
    })
}
