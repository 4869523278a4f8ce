//! quicktun demo - expose a local hello server on an ephemeral public URL

use anyhow::Result;
use async_trait::async_trait;
use axum::routing::get;
use axum::Router;
use clap::Parser;
use prometheus::{Encoder, Registry, TextEncoder};
use quicktun_client::{BuildInfo, TunnelBootstrap};
use quicktun_supervisor::{SupervisorConfig, SupervisorContext, SupervisorError, TunnelSupervisor};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// quicktun - expose a local port on a public HTTPS hostname
#[derive(Parser, Debug)]
#[command(name = "quicktun")]
#[command(about = "Expose a local port on an ephemeral public HTTPS hostname")]
#[command(version)]
struct Cli {
    /// Local port to expose
    #[arg(long, default_value_t = 8910, env = "QUICKTUN_PORT")]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Setup logging with the specified log level
fn setup_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true))
        .with(filter)
        .init();
}

/// Stand-in connection engine so the demo can exercise the bootstrap path
/// end to end. Deployments plug their edge connection engine in here.
struct IdleSupervisor;

#[async_trait]
impl TunnelSupervisor for IdleSupervisor {
    async fn run(
        &self,
        config: SupervisorConfig,
        mut ctx: SupervisorContext,
    ) -> Result<(), SupervisorError> {
        info!(
            tunnel_id = %config.credentials.id,
            protocol = %config.protocol.current(),
            ha_connections = config.ha_connections,
            "connection engine starting"
        );
        ctx.connected.notify();
        tokio::select! {
            _ = ctx.cancel.cancelled() => info!("connection engine cancelled"),
            _ = ctx.shutdown.recv() => info!("connection engine shutting down"),
        }
        Ok(())
    }
}

/// Hello server the tunnel forwards to; also exports the metrics registry.
async fn serve_hello(port: u16, registry: Registry) {
    let app = Router::new()
        .route(
            "/",
            get(|| async { "Hello, world! This is served via a quick tunnel." }),
        )
        .route(
            "/metrics",
            get(move || {
                let registry = registry.clone();
                async move {
                    let mut buf = Vec::new();
                    let encoder = TextEncoder::new();
                    if encoder.encode(&registry.gather(), &mut buf).is_err() {
                        return String::new();
                    }
                    String::from_utf8(buf).unwrap_or_default()
                }
            }),
        );

    match tokio::net::TcpListener::bind(("127.0.0.1", port)).await {
        Ok(listener) => {
            if let Err(error) = axum::serve(listener, app).await {
                warn!(%error, "hello server exited");
            }
        }
        Err(error) => warn!(%error, port, "failed to bind hello server"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let registry = Registry::new();
    tokio::spawn(serve_hello(cli.port, registry.clone()));

    let cancel = CancellationToken::new();
    let bootstrap = TunnelBootstrap::new(IdleSupervisor)?
        .with_registry(registry)
        .with_build_info(BuildInfo::new(
            env!("GIT_TAG"),
            env!("GIT_HASH"),
            env!("BUILD_TIME"),
        ));

    let handle = bootstrap.start(cancel.clone(), cli.port).await?;
    info!(
        "local port {} is publicly available at {}",
        cli.port,
        handle.public_url()
    );
    println!("{}", handle.public_url());

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    cancel.cancel();
    handle.wait().await?;
    Ok(())
}
