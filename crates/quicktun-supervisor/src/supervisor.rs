//! The supervisor trait and its runtime context

use crate::config::SupervisorConfig;
use crate::signal::{ConnectedSignal, ReconnectSignal};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Supervisor runtime errors
#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("unable to reach any edge address: {0}")]
    EdgeUnreachable(String),

    #[error("edge rejected tunnel registration: {0}")]
    RegistrationRejected(String),

    #[error("connection lost and retry attempts exhausted: {0}")]
    RetriesExhausted(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Channels and capabilities handed to the supervisor alongside its
/// configuration. The bootstrap caller keeps the other half of each channel;
/// lifecycle ownership passes to the supervisor.
pub struct SupervisorContext {
    /// Caller-supplied cancellation; observed for the life of the tunnel
    pub cancel: CancellationToken,
    /// Raised once the first edge connection has registered
    pub connected: ConnectedSignal,
    /// Requests to drop and re-establish edge connections
    pub reconnect: mpsc::Receiver<ReconnectSignal>,
    /// Graceful shutdown requests; channel closure counts as a request
    pub shutdown: mpsc::Receiver<()>,
    /// Registry for connection metrics
    pub metrics: prometheus::Registry,
}

/// Long-lived connection engine maintaining the outbound tunnel.
///
/// Implementations register the credentials in `config` with the edge,
/// keep `config.ha_connections` connections alive, and forward inbound
/// requests according to `config.ingress`. `run` returns when cancelled,
/// shut down, or when the tunnel cannot be sustained.
#[async_trait]
pub trait TunnelSupervisor: Send + Sync + 'static {
    async fn run(
        &self,
        config: SupervisorConfig,
        ctx: SupervisorContext,
    ) -> Result<(), SupervisorError>;
}
