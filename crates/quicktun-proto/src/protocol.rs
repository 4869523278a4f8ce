//! Edge transport protocols and protocol selection policy
//!
//! The edge accepts a small, fixed set of transport protocols. Each variant
//! carries its own TLS requirements (SNI server name, optional ALPN list).
//! Selection between variants is driven by a percentage rollout table with a
//! periodic re-resolution TTL; in a single-protocol configuration the
//! selector is fully deterministic.

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;

/// How long a resolved protocol choice stays valid before the supervisor
/// should re-resolve it.
pub const RESOLVE_TTL: Duration = Duration::from_secs(60 * 60);

/// Transport protocol variant offered to the edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeProtocol {
    /// HTTP/2 over TLS (TCP, most compatible)
    Http2,
    /// QUIC (UDP-based, preferred)
    Quic,
}

impl EdgeProtocol {
    /// Every protocol variant known to the system.
    pub const ALL: [EdgeProtocol; 2] = [EdgeProtocol::Http2, EdgeProtocol::Quic];

    /// TLS requirements for connecting to the edge with this protocol.
    ///
    /// Returns `None` when no settings are known for the variant; callers
    /// must treat that as a fatal configuration error rather than guessing.
    pub fn tls_settings(&self) -> Option<TlsSettings> {
        match self {
            EdgeProtocol::Http2 => Some(TlsSettings {
                server_name: "h2.cftunnel.com",
                next_protos: &[],
            }),
            EdgeProtocol::Quic => Some(TlsSettings {
                server_name: "quic.cftunnel.com",
                next_protos: &["argotunnel"],
            }),
        }
    }
}

impl std::fmt::Display for EdgeProtocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EdgeProtocol::Http2 => write!(f, "http2"),
            EdgeProtocol::Quic => write!(f, "quic"),
        }
    }
}

impl std::str::FromStr for EdgeProtocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "http2" | "h2" => Ok(EdgeProtocol::Http2),
            "quic" => Ok(EdgeProtocol::Quic),
            _ => Err(format!("Unknown edge protocol: {}", s)),
        }
    }
}

/// TLS requirements for one edge protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsSettings {
    /// SNI server name presented to the edge
    pub server_name: &'static str,
    /// ALPN protocol list; empty when the protocol does not mandate one
    pub next_protos: &'static [&'static str],
}

/// One entry in a percentage rollout table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolShare {
    pub protocol: EdgeProtocol,
    /// Share of connectors that should pick this protocol, 0..=100
    pub percent: u8,
}

/// Protocol selection errors
#[derive(Debug, Error)]
pub enum SelectorError {
    #[error("rollout table is empty")]
    EmptyRollout,

    #[error("rollout share for {protocol} is {percent}%, must be at most 100")]
    InvalidShare { protocol: EdgeProtocol, percent: u8 },

    #[error("rollout shares sum to {0}%, must sum to exactly 100")]
    ShareSumMismatch(u32),

    #[error("preferred protocol {0} has no entry in the rollout table")]
    PreferredNotInRollout(EdgeProtocol),
}

/// Chooses the transport protocol offered to the edge.
///
/// Seeded with a preferred protocol and a rollout table. For the degenerate
/// single-protocol table the choice is deterministic and never falls back to
/// a protocol the caller did not request.
#[derive(Debug, Clone)]
pub struct ProtocolSelector {
    preferred: EdgeProtocol,
    rollout: Vec<ProtocolShare>,
    ttl: Duration,
    resolved_at: Instant,
}

impl ProtocolSelector {
    /// Selector with the degenerate rollout table: 100% preferred protocol.
    pub fn new(preferred: EdgeProtocol) -> Self {
        Self {
            preferred,
            rollout: vec![ProtocolShare {
                protocol: preferred,
                percent: 100,
            }],
            ttl: RESOLVE_TTL,
            resolved_at: Instant::now(),
        }
    }

    /// Selector with an explicit rollout table.
    ///
    /// The table must be non-empty, every share must be at most 100%, the
    /// shares must sum to exactly 100, and the preferred protocol must have
    /// an entry.
    pub fn with_rollout(
        preferred: EdgeProtocol,
        rollout: Vec<ProtocolShare>,
        ttl: Duration,
    ) -> Result<Self, SelectorError> {
        if rollout.is_empty() {
            return Err(SelectorError::EmptyRollout);
        }
        for share in &rollout {
            if share.percent > 100 {
                return Err(SelectorError::InvalidShare {
                    protocol: share.protocol,
                    percent: share.percent,
                });
            }
        }
        let total: u32 = rollout.iter().map(|s| u32::from(s.percent)).sum();
        if total != 100 {
            return Err(SelectorError::ShareSumMismatch(total));
        }
        if !rollout.iter().any(|s| s.protocol == preferred) {
            return Err(SelectorError::PreferredNotInRollout(preferred));
        }
        Ok(Self {
            preferred,
            rollout,
            ttl,
            resolved_at: Instant::now(),
        })
    }

    /// The protocol to offer to the edge.
    ///
    /// Deterministic: always the preferred protocol. The rollout table only
    /// shifts the preference at re-resolution time, which is owned by the
    /// supervisor.
    pub fn current(&self) -> EdgeProtocol {
        self.preferred
    }

    /// Rollout table this selector was seeded with.
    pub fn rollout(&self) -> &[ProtocolShare] {
        &self.rollout
    }

    /// Whether the resolved choice has outlived its TTL.
    pub fn needs_refresh(&self) -> bool {
        self.resolved_at.elapsed() >= self.ttl
    }

    /// Mark the choice as freshly resolved.
    pub fn mark_refreshed(&mut self) {
        self.resolved_at = Instant::now();
    }
}
