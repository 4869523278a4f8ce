//! Assembled supervisor configuration and its operational parameters

use quicktun_ingress::Ingress;
use quicktun_proto::{ClientInfo, EdgeProtocol, ProtocolSelector, TunnelCredentials};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// How long in-flight requests may drain during shutdown
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);
/// Connection registration attempts per edge address
pub const DEFAULT_RETRIES: u32 = 5;
/// Edge address re-resolution attempts before giving up
pub const DEFAULT_MAX_EDGE_ADDR_RETRIES: u32 = 8;
/// Timeout for control-plane RPCs over an established connection
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(5);
/// Per-stream write timeout; zero disables the bound
pub const DEFAULT_WRITE_STREAM_TIMEOUT: Duration = Duration::ZERO;
/// Simultaneous edge connections held for availability
pub const DEFAULT_HA_CONNECTIONS: usize = 2;
/// Connection-level flow-control window (30 MiB)
pub const DEFAULT_CONN_FLOW_CONTROL_LIMIT: u64 = 30 * (1 << 20);
/// Stream-level flow-control window (6 MiB)
pub const DEFAULT_STREAM_FLOW_CONTROL_LIMIT: u64 = 6 * (1 << 20);

/// Configuration validation errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ha_connections must be at least 1")]
    ZeroHaConnections,

    #[error("retries must be at least 1")]
    ZeroRetries,

    #[error("rpc_timeout must be non-zero")]
    ZeroRpcTimeout,

    #[error("stream flow-control limit {stream} exceeds connection limit {connection}")]
    FlowControlInverted { stream: u64, connection: u64 },

    #[error("ingress has no rules")]
    EmptyIngress,

    #[error("no TLS configuration for edge protocol {0}")]
    MissingTlsConfig(EdgeProtocol),

    #[error("TLS configuration for edge protocol {0} has an empty server name")]
    EmptyServerName(EdgeProtocol),
}

/// TLS material for dialing the edge with one protocol
#[derive(Debug, Clone)]
pub struct EdgeTlsConfig {
    /// SNI server name presented when dialing
    pub server_name: String,
    pub config: Arc<rustls::ClientConfig>,
}

/// Everything the connection supervisor needs to register and maintain the
/// tunnel. Assembled once by the bootstrap sequence and immutable afterward.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Identity of this connecting instance
    pub client: ClientInfo,
    /// Credentials from the provisioning call
    pub credentials: TunnelCredentials,
    /// Routing of inbound requests to local services
    pub ingress: Ingress,
    /// Transport protocol policy
    pub protocol: ProtocolSelector,
    /// One TLS configuration per known edge protocol
    pub edge_tls: HashMap<EdgeProtocol, EdgeTlsConfig>,

    pub grace_period: Duration,
    pub retries: u32,
    pub max_edge_addr_retries: u32,
    pub rpc_timeout: Duration,
    pub write_stream_timeout: Duration,
    pub ha_connections: usize,
    pub conn_flow_control_limit: u64,
    pub stream_flow_control_limit: u64,
}

impl SupervisorConfig {
    /// Assemble a configuration with the fixed operational defaults.
    pub fn new(
        client: ClientInfo,
        credentials: TunnelCredentials,
        ingress: Ingress,
        protocol: ProtocolSelector,
        edge_tls: HashMap<EdgeProtocol, EdgeTlsConfig>,
    ) -> Self {
        Self {
            client,
            credentials,
            ingress,
            protocol,
            edge_tls,
            grace_period: DEFAULT_GRACE_PERIOD,
            retries: DEFAULT_RETRIES,
            max_edge_addr_retries: DEFAULT_MAX_EDGE_ADDR_RETRIES,
            rpc_timeout: DEFAULT_RPC_TIMEOUT,
            write_stream_timeout: DEFAULT_WRITE_STREAM_TIMEOUT,
            ha_connections: DEFAULT_HA_CONNECTIONS,
            conn_flow_control_limit: DEFAULT_CONN_FLOW_CONTROL_LIMIT,
            stream_flow_control_limit: DEFAULT_STREAM_FLOW_CONTROL_LIMIT,
        }
    }

    /// Check the configuration before it is handed to the supervisor. A
    /// partially usable configuration is never let through.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ha_connections == 0 {
            return Err(ConfigError::ZeroHaConnections);
        }
        if self.retries == 0 {
            return Err(ConfigError::ZeroRetries);
        }
        if self.rpc_timeout.is_zero() {
            return Err(ConfigError::ZeroRpcTimeout);
        }
        if self.stream_flow_control_limit > self.conn_flow_control_limit {
            return Err(ConfigError::FlowControlInverted {
                stream: self.stream_flow_control_limit,
                connection: self.conn_flow_control_limit,
            });
        }
        if self.ingress.rules().is_empty() {
            return Err(ConfigError::EmptyIngress);
        }
        for protocol in EdgeProtocol::ALL {
            match self.edge_tls.get(&protocol) {
                None => return Err(ConfigError::MissingTlsConfig(protocol)),
                Some(tls) if tls.server_name.is_empty() => {
                    return Err(ConfigError::EmptyServerName(protocol))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}
