//! Quick Tunnel Protocol Definitions
//!
//! This crate defines the identity and wire types shared between the
//! provisioning client and the connection supervisor: tunnel credentials,
//! the provisioning API JSON shapes, and the edge protocol table.

pub mod credentials;
pub mod protocol;
pub mod provision;

pub use credentials::{ClientInfo, TunnelCredentials};
pub use protocol::{
    EdgeProtocol, ProtocolSelector, ProtocolShare, SelectorError, TlsSettings, RESOLVE_TTL,
};
pub use provision::{ProvisionApiError, ProvisionResponse, ProvisionedTunnel};

/// Product name reported to the provisioning API
pub const PRODUCT_NAME: &str = "quicktun";
