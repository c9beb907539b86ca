//! Connection lifecycle and retry-guarded execution.
//!
//! [`ConnectionManager`] owns at most one live connection. Operations run
//! through [`ConnectionManager::run_guarded`], which retries an operation
//! only while the connection is in autocommit mode and only after the
//! connection has been diagnosed as broken.
//!
//! # Example
//!
//! ```rust,ignore
//! use rdbc_adapter::prelude::*;
//!
//! let mut manager = ConnectionManager::connect(
//!     Arc::new(MyDriverFactory::new(url)),
//!     AdapterConfig::new()
//!         .with_retry_count(3)
//!         .with_connection_alive_sql("SELECT 1"),
//! )?;
//!
//! let rows = manager.execute_query("SELECT id, name FROM users", 0)?;
//! ```

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::bind::ParameterBinder;
use crate::classify::is_select;
use crate::config::SharedConfig;
use crate::connection::{Connection, ConnectionFactory, Guarded};
use crate::error::{Error, Result};
use crate::marshal::ResultMarshaller;
use crate::schema::SchemaIntrospector;

/// Owns a single connection and runs operations against it
pub struct ConnectionManager {
    factory: Arc<dyn ConnectionFactory>,
    config: SharedConfig,
    connection: Option<Box<dyn Connection>>,
    pub(crate) marshaller: ResultMarshaller,
    pub(crate) binder: ParameterBinder,
    pub(crate) introspector: SchemaIntrospector,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connected", &self.connection.is_some())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Create a manager without opening a connection
    pub fn new(factory: Arc<dyn ConnectionFactory>, config: impl Into<SharedConfig>) -> Self {
        Self {
            factory,
            config: config.into(),
            connection: None,
            marshaller: ResultMarshaller::default(),
            binder: ParameterBinder::default(),
            introspector: SchemaIntrospector::default(),
        }
    }

    /// Create a manager and open its connection
    pub fn connect(
        factory: Arc<dyn ConnectionFactory>,
        config: impl Into<SharedConfig>,
    ) -> Result<Self> {
        let mut manager = Self::new(factory, config);
        manager.reconnect()?;
        Ok(manager)
    }

    /// Use a different result marshaller
    pub fn with_marshaller(mut self, marshaller: ResultMarshaller) -> Self {
        self.marshaller = marshaller;
        self
    }

    /// Use a different parameter binder
    pub fn with_binder(mut self, binder: ParameterBinder) -> Self {
        self.binder = binder;
        self
    }

    /// Use a different schema introspector
    pub fn with_introspector(mut self, introspector: SchemaIntrospector) -> Self {
        self.introspector = introspector;
        self
    }

    /// Shared configuration handle
    pub fn config(&self) -> &SharedConfig {
        &self.config
    }

    /// Whether a connection is installed
    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// The live connection; fails with [`Error::NotConnected`] when there is none
    pub fn connection(&mut self) -> Result<&mut dyn Connection> {
        match self.connection {
            Some(ref mut conn) => Ok(conn.as_mut()),
            None => Err(Error::NotConnected),
        }
    }

    /// The live connection, if any
    pub fn current_connection(&mut self) -> Option<&mut dyn Connection> {
        match self.connection {
            Some(ref mut conn) => Some(conn.as_mut()),
            None => None,
        }
    }

    /// The live connection, opening one first if needed
    pub fn ensure_connected(&mut self) -> Result<&mut dyn Connection> {
        if self.connection.is_none() {
            self.reconnect()?;
        }
        self.connection()
    }

    /// Close the current connection (if any) and install a fresh one
    pub fn reconnect(&mut self) -> Result<()> {
        self.close_current();
        let conn = self.factory.new_connection()?;
        self.connection = Some(conn);
        info!("database connection established");
        Ok(())
    }

    /// Close and drop the current connection
    pub fn disconnect(&mut self) {
        if self.connection.is_some() {
            self.close_current();
            info!("database connection closed");
        }
    }

    fn close_current(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            if let Err(e) = conn.close() {
                debug!(error = %e, "ignoring connection close failure");
            }
        }
    }

    /// Run `operation` against the connection, reconnecting and retrying
    /// after failures on a broken connection.
    ///
    /// Retries happen only in autocommit mode; the retry count is read from
    /// the configuration on the first failure. [`Error::NotConnected`],
    /// [`Error::TableNotFound`] and [`Error::UnsupportedType`] are returned
    /// unchanged; every other failure comes back as [`Error::Database`]
    /// carrying the root-cause message.
    pub fn run_guarded<T, F>(&mut self, mut operation: F) -> Result<T>
    where
        F: FnMut(&mut dyn Connection) -> Result<T>,
    {
        let mut tries = 1u32;
        let mut attempts = 0u32;
        let mut auto_commit = false;
        let mut last_error = None;

        while attempts < tries {
            let conn = self.connection()?;
            let outcome = match conn.auto_commit() {
                Ok(mode) => {
                    auto_commit = mode;
                    operation(conn)
                }
                Err(e) => Err(e),
            };

            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => e,
            };

            attempts += 1;
            if !auto_commit {
                debug!(error = %err.root_cause(), "operation failed inside a transaction");
                return Err(err.wrap());
            }
            if attempts == 1 {
                tries = self.config.read().effective_retry_count();
            }
            if !self.is_connection_broken() {
                return Err(err.wrap());
            }

            warn!(
                attempt = attempts,
                tries,
                error = %err.root_cause(),
                "connection broken, reconnecting"
            );
            self.reconnect().map_err(Error::wrap)?;
            last_error = Some(err);
        }

        Err(last_error.map_or(Error::NotConnected, Error::wrap))
    }

    /// Diagnose the current connection after a failure.
    ///
    /// With a select-like `connection_alive_sql` the probe is executed and
    /// any failure means broken. Otherwise an open connection is reported as
    /// broken. A missing connection, or a failure while asking, also counts
    /// as broken.
    pub fn is_connection_broken(&mut self) -> bool {
        let probe = self
            .config
            .read()
            .alive_sql()
            .filter(|sql| is_select(sql))
            .map(str::to_string);

        let Some(conn) = self.connection.as_deref_mut() else {
            return true;
        };

        match probe {
            Some(sql) => match run_probe(conn, &sql) {
                Ok(()) => false,
                Err(e) => {
                    warn!(probe = %sql, error = %e, "liveness probe failed");
                    true
                }
            },
            None => conn.is_closed().map(|closed| !closed).unwrap_or(true),
        }
    }

    /// Leave autocommit mode
    pub fn begin(&mut self) -> Result<()> {
        self.connection()?.set_auto_commit(false)
    }

    /// Commit the open transaction and return to autocommit mode.
    ///
    /// Autocommit is restored even when the commit fails. No-op in
    /// autocommit mode.
    pub fn commit(&mut self) -> Result<()> {
        self.end_transaction(|conn| conn.commit())
    }

    /// Roll back the open transaction and return to autocommit mode.
    ///
    /// Autocommit is restored even when the rollback fails. No-op in
    /// autocommit mode.
    pub fn rollback(&mut self) -> Result<()> {
        self.end_transaction(|conn| conn.rollback())
    }

    fn end_transaction(
        &mut self,
        finish: impl FnOnce(&mut dyn Connection) -> Result<()>,
    ) -> Result<()> {
        let conn = self.connection()?;
        if conn.auto_commit()? {
            return Ok(());
        }
        let finished = finish(&mut *conn);
        let restored = conn.set_auto_commit(true);
        finished.and(restored)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.close_current();
    }
}

fn run_probe(conn: &mut dyn Connection, sql: &str) -> Result<()> {
    let mut stmt = Guarded::new(conn.create_statement()?, "statement");
    stmt.execute(sql)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AdapterConfig;

    fn unreachable_factory() -> Arc<dyn ConnectionFactory> {
        Arc::new(|| -> Result<Box<dyn Connection>> { Err(Error::driver("connection refused")) })
    }

    #[test]
    fn test_not_connected() {
        let mut manager = ConnectionManager::new(unreachable_factory(), AdapterConfig::default());
        assert!(!manager.is_connected());
        assert!(matches!(manager.connection(), Err(Error::NotConnected)));
        assert!(manager.current_connection().is_none());
        assert!(matches!(manager.begin(), Err(Error::NotConnected)));

        let result: Result<()> = manager.run_guarded(|_| Ok(()));
        assert!(matches!(result, Err(Error::NotConnected)));
    }

    #[test]
    fn test_missing_connection_is_broken() {
        let mut manager = ConnectionManager::new(unreachable_factory(), AdapterConfig::default());
        assert!(manager.is_connection_broken());
    }

    #[test]
    fn test_connect_failure_propagates() {
        let err = ConnectionManager::connect(unreachable_factory(), AdapterConfig::default())
            .unwrap_err();
        assert!(matches!(err, Error::Driver { .. }));
        assert_eq!(err.to_string(), "driver error: connection refused");
    }

    #[test]
    fn test_ensure_connected_reports_factory_error() {
        let mut manager = ConnectionManager::new(unreachable_factory(), AdapterConfig::default());
        assert!(manager.ensure_connected().is_err());
        assert!(!manager.is_connected());
    }
}
