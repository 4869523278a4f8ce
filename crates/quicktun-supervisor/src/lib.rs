//! Connection supervisor boundary
//!
//! The bootstrap sequence ends by handing a validated [`SupervisorConfig`]
//! to a [`TunnelSupervisor`] implementation, which owns the long-lived
//! outbound edge connections from that point on. This crate defines that
//! boundary: the supervisor trait, the assembled configuration with its
//! operational parameters, and the signal channels threaded across it.

pub mod config;
pub mod signal;
pub mod supervisor;

pub use config::{ConfigError, EdgeTlsConfig, SupervisorConfig};
pub use signal::{ConnectedSignal, ConnectedWatch, ReconnectSignal, RECONNECT_CHANNEL_CAPACITY};
pub use supervisor::{SupervisorContext, SupervisorError, TunnelSupervisor};
