//! Adapter configuration.
//!
//! [`AdapterConfig`] holds the retry settings; [`SharedConfig`] is the handle
//! the connection manager reads through, so the host can change values while
//! the adapter is live.

use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Retry and liveness settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdapterConfig {
    /// Total attempts allowed for a guarded operation; values below 1 mean 1
    pub retry_count: i64,
    /// Probe statement used to decide whether a failed connection is broken
    pub connection_alive_sql: Option<String>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            retry_count: 1,
            connection_alive_sql: None,
        }
    }
}

impl AdapterConfig {
    /// Create a config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the retry count
    pub fn with_retry_count(mut self, retry_count: i64) -> Self {
        self.retry_count = retry_count;
        self
    }

    /// Set the liveness probe
    pub fn with_connection_alive_sql(mut self, sql: impl Into<String>) -> Self {
        self.connection_alive_sql = Some(sql.into());
        self
    }

    /// Attempts allowed, never less than one
    pub fn effective_retry_count(&self) -> u32 {
        u32::try_from(self.retry_count.max(1)).unwrap_or(u32::MAX)
    }

    /// The liveness probe, if set and not blank
    pub fn alive_sql(&self) -> Option<&str> {
        self.connection_alive_sql
            .as_deref()
            .map(str::trim)
            .filter(|sql| !sql.is_empty())
    }
}

/// Shared, mutable handle to an [`AdapterConfig`]
#[derive(Debug, Clone, Default)]
pub struct SharedConfig(Arc<RwLock<AdapterConfig>>);

impl SharedConfig {
    /// Wrap a config
    pub fn new(config: AdapterConfig) -> Self {
        Self(Arc::new(RwLock::new(config)))
    }

    /// Borrow the current values
    pub fn read(&self) -> RwLockReadGuard<'_, AdapterConfig> {
        self.0.read()
    }

    /// Copy of the current values
    pub fn get(&self) -> AdapterConfig {
        self.0.read().clone()
    }

    /// Change values in place
    pub fn update(&self, f: impl FnOnce(&mut AdapterConfig)) {
        f(&mut self.0.write());
    }
}

impl From<AdapterConfig> for SharedConfig {
    fn from(config: AdapterConfig) -> Self {
        Self::new(config)
    }
}
