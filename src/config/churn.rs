//! Churn engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::{LabelSelector, ResourceTypeId};

/// Label selector applied to every candidate lookup by default.
pub const DEFAULT_LABEL_SELECTOR: &str = "app.kubernetes.io/managed-by=churn";

/// Resource types considered for deletion when a policy names none.
pub fn default_delete_candidates() -> Vec<ResourceTypeId> {
    vec![
        ResourceTypeId::new("projectcontour.io", "v1", "httpproxies"),
        ResourceTypeId::new("extensions", "v1beta1", "ingresses"),
        ResourceTypeId::new("", "v1", "services"),
        ResourceTypeId::new("", "v1", "pods"),
    ]
}

/// Defaults and limits applied by the policy compiler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChurnConfig {
    /// Interval used when a policy sets none, in milliseconds.
    pub default_interval_ms: u64,
    /// Limit used when a policy sets none.
    pub default_limit: usize,
    /// Smallest interval a policy may request, in milliseconds.
    pub min_interval_ms: u64,
    /// Selector restricting candidates to managed objects.
    pub label_selector: String,
    /// Resource types used when a policy names none.
    pub default_resources: Vec<ResourceTypeId>,
    /// Seed for per-task random sources; entropy when unset.
    pub seed: Option<u64>,
}

impl Default for ChurnConfig {
    fn default() -> Self {
        Self {
            default_interval_ms: 60_000,
            default_limit: 1,
            min_interval_ms: 1_000,
            label_selector: DEFAULT_LABEL_SELECTOR.to_string(),
            default_resources: default_delete_candidates(),
            seed: None,
        }
    }
}

impl ChurnConfig {
    /// Interval used when a policy sets none.
    pub const fn default_interval(&self) -> Duration {
        Duration::from_millis(self.default_interval_ms)
    }

    /// Smallest interval a policy may request.
    pub const fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.min_interval_ms == 0 {
            return Err("min_interval_ms must be greater than 0".into());
        }
        if self.default_interval() < self.min_interval() {
            return Err("default_interval_ms must not be below min_interval_ms".into());
        }
        if self.default_resources.is_empty() {
            return Err("default_resources must not be empty".into());
        }
        for (i, resource) in self.default_resources.iter().enumerate() {
            if self.default_resources[..i].contains(resource) {
                return Err(format!("duplicate default resource: {resource}"));
            }
        }
        self.label_selector
            .parse::<LabelSelector>()
            .map_err(|e| format!("label_selector invalid: {e}"))?;
        Ok(())
    }

    /// Parse configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Build configuration from `CHURN_*` environment variables, reading `.env` if present.
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|key| dotenvy::var(key).ok())
    }

    /// Build configuration from a key lookup, overriding defaults for keys present.
    ///
    /// Recognized keys: `CHURN_SELECTOR`, `CHURN_SEED`, `CHURN_DEFAULT_INTERVAL`,
    /// `CHURN_DEFAULT_LIMIT`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut cfg = Self::default();
        if let Some(selector) = lookup("CHURN_SELECTOR") {
            cfg.label_selector = selector;
        }
        if let Some(seed) = lookup("CHURN_SEED") {
            cfg.seed = Some(
                seed.parse()
                    .map_err(|e| format!("CHURN_SEED invalid: {e}"))?,
            );
        }
        if let Some(interval) = lookup("CHURN_DEFAULT_INTERVAL") {
            let interval = humantime::parse_duration(&interval)
                .map_err(|e| format!("CHURN_DEFAULT_INTERVAL invalid: {e}"))?;
            cfg.default_interval_ms = u64::try_from(interval.as_millis())
                .ok()
                .filter(|ms| Duration::from_millis(*ms) == interval)
                .ok_or_else(|| {
                    format!(
                        "CHURN_DEFAULT_INTERVAL must be a whole number of milliseconds: {}",
                        humantime::format_duration(interval)
                    )
                })?;
        }
        if let Some(limit) = lookup("CHURN_DEFAULT_LIMIT") {
            cfg.default_limit = limit
                .parse()
                .map_err(|e| format!("CHURN_DEFAULT_LIMIT invalid: {e}"))?;
        }
        cfg.validate()?;
        Ok(cfg)
    }
}
