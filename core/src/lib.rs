//! returns-core — customer-returns backend for an e-commerce platform.
//!
//! Validates return eligibility, creates and tracks return requests
//! through a fixed lifecycle, applies rule-based fraud checks, and
//! ingests asynchronous status updates from logistics and refund
//! partners.
//!
//! RULES:
//!   - Only the store layer executes SQL; everything else calls store
//!     methods.
//!   - Status, reason, and flag values are tagged enums; raw strings
//!     are parsed at the edge and rejected before anything persists.
//!   - Every status change writes exactly one history row, inside the
//!     same transaction as the row update.

pub mod clock;
pub mod config;
pub mod eligibility;
pub mod error;
pub mod event;
pub mod fraud;
pub mod lifecycle;
pub mod model;
pub mod service;
pub mod store;
pub mod types;
pub mod webhook;
