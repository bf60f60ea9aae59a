//! Connection registry.
//!
//! One registry per transport; hands out at most one connection per account
//! and owns their lifecycle until `close` removes them.

use crate::config::{validate_application, ConnectionOptions};
use crate::connection::TerminalConnection;
use dashmap::DashMap;
use std::sync::Arc;
use termbridge_core::{Result, TerminalTransport};
use tracing::info;

/// Registry of live terminal connections keyed by account id.
pub struct ConnectionRegistry {
    transport: Arc<dyn TerminalTransport>,
    connections: DashMap<String, Arc<TerminalConnection>>,
}

impl ConnectionRegistry {
    pub fn new(transport: Arc<dyn TerminalTransport>) -> Arc<Self> {
        Arc::new(Self {
            transport,
            connections: DashMap::new(),
        })
    }

    /// Open (or return the existing) connection for an account: validates the
    /// application tag, wires listeners, prepares history storage and starts
    /// the subscribe loop.
    pub async fn connect(
        self: &Arc<Self>,
        account_id: &str,
        options: ConnectionOptions,
    ) -> Result<Arc<TerminalConnection>> {
        validate_application(&options.application)?;
        if let Some(existing) = self.connections.get(account_id) {
            return Ok(existing.clone());
        }

        let connection = Arc::new(TerminalConnection::new(
            account_id.to_string(),
            options,
            self.transport.clone(),
            Arc::downgrade(self),
        ));
        connection.initialize().await?;
        connection.subscribe();
        self.connections
            .insert(account_id.to_string(), connection.clone());
        info!(account_id, "Connection registered");
        Ok(connection)
    }

    /// Look up a live connection.
    pub fn connection(&self, account_id: &str) -> Option<Arc<TerminalConnection>> {
        self.connections.get(account_id).map(|entry| entry.clone())
    }

    /// Drop a connection from the registry. Called from
    /// [`TerminalConnection::close`].
    pub fn remove(&self, account_id: &str) {
        self.connections.remove(account_id);
    }
}
