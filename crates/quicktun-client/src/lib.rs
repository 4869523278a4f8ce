//! Quick tunnel client - Public API
//!
//! Provisions an ephemeral public HTTPS hostname for a local service and
//! hands the assembled connection configuration to a pluggable connection
//! supervisor.
//!
//! # Quick Start
//!
//! ```ignore
//! use quicktun_client::TunnelBootstrap;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cancel = CancellationToken::new();
//!     let bootstrap = TunnelBootstrap::new(my_connection_engine)?;
//!
//!     let handle = bootstrap.start(cancel.clone(), 8080).await?;
//!     println!("Public URL: {}", handle.public_url());
//!
//!     // ... later
//!     cancel.cancel();
//!     handle.wait().await?;
//!     Ok(())
//! }
//! ```

pub mod bootstrap;
pub mod metrics;
pub mod provision;
pub mod tls;

pub use bootstrap::{start_quick_tunnel, BootstrapError, TunnelBootstrap, TunnelHandle};
pub use metrics::BuildInfo;
pub use provision::{Provisioner, ProvisionError, DEFAULT_PROVISION_TIMEOUT, DEFAULT_PROVISION_URL};
pub use tls::{build_edge_tls_config, edge_tls_configs, TlsConfigError};

// Re-export the boundary types callers wire a supervisor with
pub use quicktun_ingress::{Ingress, IngressError, IngressRule, UnvalidatedIngressRule};
pub use quicktun_proto::{
    ClientInfo, EdgeProtocol, ProtocolSelector, TlsSettings, TunnelCredentials,
};
pub use quicktun_supervisor::{
    ConnectedWatch, EdgeTlsConfig, ReconnectSignal, SupervisorConfig, SupervisorContext,
    SupervisorError, TunnelSupervisor,
};
