//! Tunnel bootstrap orchestration
//!
//! Runs the linear provisioning-and-bootstrap sequence: generate a client
//! identity, provision credentials, assemble ingress / protocol / TLS
//! configuration, validate it, and launch the connection supervisor as an
//! independent task. The public URL is returned as soon as the supervisor
//! task is spawned; connection progress and the supervisor's final result
//! are observable through the returned [`TunnelHandle`].

use crate::metrics::BuildInfo;
use crate::provision::{Provisioner, ProvisionError};
use crate::tls::{edge_tls_configs, TlsConfigError};
use prometheus::Registry;
use quicktun_ingress::{Ingress, IngressError};
use quicktun_proto::{ClientInfo, EdgeProtocol, ProtocolSelector};
use quicktun_supervisor::{
    ConfigError, ConnectedSignal, ConnectedWatch, ReconnectSignal, SupervisorConfig,
    SupervisorContext, SupervisorError, TunnelSupervisor, RECONNECT_CHANNEL_CAPACITY,
};
use rustls::pki_types::CertificateDer;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

/// Bootstrap errors, attributed to the stage that failed
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("provisioning failed: {0}")]
    Provision(#[from] ProvisionError),

    #[error("ingress assembly failed: {0}")]
    Ingress(#[from] IngressError),

    #[error("TLS assembly failed: {0}")]
    Tls(#[from] TlsConfigError),

    #[error("connection configuration rejected: {0}")]
    Config(#[from] ConfigError),

    #[error("build info registration failed: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("supervisor failed: {0}")]
    Supervisor(#[from] SupervisorError),

    #[error("supervisor task ended without reporting a result")]
    SupervisorLost,
}

/// Orchestrates the bootstrap sequence and launches the supervisor.
///
/// Construction takes the supervisor plus optional explicit capabilities:
/// metrics registry, build info, provisioner. There is no process-global
/// state.
pub struct TunnelBootstrap<S> {
    supervisor: Arc<S>,
    registry: Registry,
    build_info: BuildInfo,
    provisioner: Provisioner,
    preferred_protocol: EdgeProtocol,
    extra_roots: Vec<CertificateDer<'static>>,
}

impl<S: TunnelSupervisor> TunnelBootstrap<S> {
    /// Bootstrap against the default provisioning endpoint.
    pub fn new(supervisor: S) -> Result<Self, BootstrapError> {
        Ok(Self {
            supervisor: Arc::new(supervisor),
            registry: Registry::new(),
            build_info: BuildInfo::crate_default(),
            provisioner: Provisioner::new()?,
            preferred_protocol: EdgeProtocol::Quic,
            extra_roots: Vec::new(),
        })
    }

    /// Use an existing metrics registry instead of a private one.
    pub fn with_registry(mut self, registry: Registry) -> Self {
        self.registry = registry;
        self
    }

    /// Report the embedding binary's build metadata.
    pub fn with_build_info(mut self, build_info: BuildInfo) -> Self {
        self.build_info = build_info;
        self
    }

    /// Use a specific provisioner (endpoint and timeout).
    pub fn with_provisioner(mut self, provisioner: Provisioner) -> Self {
        self.provisioner = provisioner;
        self
    }

    /// Prefer a specific transport protocol.
    pub fn with_preferred_protocol(mut self, protocol: EdgeProtocol) -> Self {
        self.preferred_protocol = protocol;
        self
    }

    /// Trust additional root certificates when dialing the edge.
    pub fn with_extra_roots(mut self, roots: Vec<CertificateDer<'static>>) -> Self {
        self.extra_roots = roots;
        self
    }

    /// Provision a tunnel for `local_port` and launch the supervisor.
    ///
    /// The caller is responsible for having a service listening on the
    /// port. Returns once the supervisor task is spawned, without waiting
    /// for the tunnel to connect. Cancelling `cancel` after return is
    /// observed by the supervisor; it cannot affect the already-completed
    /// provisioning.
    pub async fn start(
        &self,
        cancel: CancellationToken,
        local_port: u16,
    ) -> Result<TunnelHandle, BootstrapError> {
        // Init
        let client_id = Uuid::new_v4();
        self.build_info.register(&self.registry)?;
        let client = ClientInfo::new(client_id, self.build_info.version.as_str());

        // Provision; the only blocking step, bounded by the provisioner
        // timeout. Nothing is launched if it fails.
        let credentials = self.provisioner.provision(client_id).await?;

        // Assemble
        let ingress = Ingress::for_local_port(local_port)?;
        let protocol = ProtocolSelector::new(self.preferred_protocol);
        let edge_tls = edge_tls_configs(&self.extra_roots)?;

        // Configure
        let public_url = credentials.public_url();
        let config = SupervisorConfig::new(client, credentials, ingress, protocol, edge_tls);
        config.validate()?;

        // Launch
        let (connected_signal, connected) = ConnectedSignal::channel();
        let (reconnect_tx, reconnect_rx) = mpsc::channel(RECONNECT_CHANNEL_CAPACITY);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let (completion_tx, completion_rx) = oneshot::channel();

        let ctx = SupervisorContext {
            cancel,
            connected: connected_signal,
            reconnect: reconnect_rx,
            shutdown: shutdown_rx,
            metrics: self.registry.clone(),
        };

        let supervisor = Arc::clone(&self.supervisor);
        tokio::spawn(async move {
            let result = supervisor.run(config, ctx).await;
            if let Err(error) = &result {
                error!(%error, "tunnel supervisor exited with error");
            }
            // Receiver may be gone if the caller dropped the handle
            let _ = completion_tx.send(result);
        });

        info!(url = %public_url, "quick tunnel ready");
        Ok(TunnelHandle {
            public_url,
            connected,
            completion: completion_rx,
            reconnect: reconnect_tx,
            shutdown: shutdown_tx,
        })
    }
}

/// Provision a tunnel for `local_port` with default settings.
pub async fn start_quick_tunnel<S: TunnelSupervisor>(
    supervisor: S,
    cancel: CancellationToken,
    local_port: u16,
) -> Result<TunnelHandle, BootstrapError> {
    TunnelBootstrap::new(supervisor)?.start(cancel, local_port).await
}

/// Handle to a launched tunnel.
///
/// Carries the public URL plus the caller's half of every channel shared
/// with the supervisor. Dropping the handle closes the shutdown channel,
/// which supervisors treat as a shutdown request.
#[derive(Debug)]
pub struct TunnelHandle {
    public_url: String,
    connected: ConnectedWatch,
    completion: oneshot::Receiver<Result<(), SupervisorError>>,
    reconnect: mpsc::Sender<ReconnectSignal>,
    shutdown: mpsc::Sender<()>,
}

impl TunnelHandle {
    /// Externally visible URL, `https://<hostname>`.
    pub fn public_url(&self) -> &str {
        &self.public_url
    }

    /// Whether the supervisor has reported its first edge registration.
    pub fn is_connected(&self) -> bool {
        self.connected.is_connected()
    }

    /// Wait until the supervisor reports its first edge registration.
    pub async fn wait_connected(&mut self) {
        self.connected.wait().await;
    }

    /// Ask the supervisor to drop and re-establish its edge connections.
    ///
    /// Returns `false` when the supervisor is gone or the signal channel is
    /// full.
    pub fn request_reconnect(&self, signal: ReconnectSignal) -> bool {
        self.reconnect.try_send(signal).is_ok()
    }

    /// Request graceful shutdown and wait for the supervisor to finish.
    pub async fn shutdown(self) -> Result<(), BootstrapError> {
        let _ = self.shutdown.send(()).await;
        Self::await_completion(self.completion).await
    }

    /// Wait for the supervisor to finish.
    pub async fn wait(self) -> Result<(), BootstrapError> {
        Self::await_completion(self.completion).await
    }

    async fn await_completion(
        completion: oneshot::Receiver<Result<(), SupervisorError>>,
    ) -> Result<(), BootstrapError> {
        match completion.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(error)) => Err(BootstrapError::Supervisor(error)),
            // The task panicked or was aborted before sending
            Err(_) => Err(BootstrapError::SupervisorLost),
        }
    }
}
