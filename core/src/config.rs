//! Return policy and webhook configuration.

use crate::error::ReturnsResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReturnPolicy {
    /// Return window for categories absent from `category_window_days`.
    pub default_window_days: i64,
    /// Category → return-window length in days. Exact-match,
    /// case-sensitive keys.
    pub category_window_days: HashMap<String, i64>,
    /// Orders at or above this amount need manual review and carry a
    /// `high_value` fraud flag.
    pub high_value_threshold: f64,
    /// Returns per customer per trailing 30 days before the
    /// `frequent_returns` flag fires.
    pub max_returns_per_month: i64,
    /// Proof photos allowed per return request.
    pub max_return_images: usize,
}

impl Default for ReturnPolicy {
    fn default() -> Self {
        let mut windows = HashMap::new();
        windows.insert("electronics".to_string(), 10);
        windows.insert("fashion".to_string(), 30);
        Self {
            default_window_days: 7,
            category_window_days: windows,
            high_value_threshold: 10_000.0,
            max_returns_per_month: 10,
            max_return_images: 5,
        }
    }
}

impl ReturnPolicy {
    /// Return window for a category, falling back to the default window
    /// for unmapped categories.
    pub fn window_days(&self, category: &str) -> i64 {
        self.category_window_days
            .get(category)
            .copied()
            .unwrap_or(self.default_window_days)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared secret partners send with every callback.
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReturnsConfig {
    #[serde(default)]
    pub policy: ReturnPolicy,
    pub webhook: WebhookConfig,
}

impl ReturnsConfig {
    /// Production-default policy with an injected webhook secret.
    pub fn new(webhook_secret: impl Into<String>) -> Self {
        Self {
            policy: ReturnPolicy::default(),
            webhook: WebhookConfig {
                secret: webhook_secret.into(),
            },
        }
    }

    pub fn load(path: &Path) -> ReturnsResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {}: {e}", path.display()))?;
        let config: ReturnsConfig = serde_json::from_str(&content)?;
        Ok(config)
    }
}
