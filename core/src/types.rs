//! Shared primitive types used across the returns core.

/// Row id of an order in the local orders table.
pub type OrderId = i64;

/// Row id of a return request.
pub type ReturnId = i64;

/// Row id of a fraud flag.
pub type FlagId = i64;

/// Upstream customer identifier, denormalized onto returns and flags.
pub type CustomerId = i64;
