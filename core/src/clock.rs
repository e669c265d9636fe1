//! Time source for the returns core.
//!
//! Eligibility windows, fraud rules, and pickup timestamps are all
//! functions of "now"; handing the service a `Fixed` clock makes them
//! deterministic in tests.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub enum Clock {
    System,
    Fixed(DateTime<Utc>),
}

impl Clock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            Clock::System => Utc::now(),
            Clock::Fixed(at) => *at,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Clock::System
    }
}
