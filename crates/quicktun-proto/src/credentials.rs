//! Tunnel credentials and connecting-client identity

use std::fmt;
use uuid::Uuid;

/// Credentials proving this instance's right to register a tunnel.
///
/// Issued once per provisioning call and held unchanged for the life of the
/// connection process. The secret is sensitive: `Debug` redacts it and it
/// must never be logged or persisted.
#[derive(Clone, PartialEq, Eq)]
pub struct TunnelCredentials {
    /// Tunnel identifier assigned by the control plane
    pub id: Uuid,
    /// Owning account
    pub account_tag: String,
    /// Registration secret
    pub secret: Vec<u8>,
    /// Public DNS name under which the tunnel is reachable
    pub hostname: String,
}

impl TunnelCredentials {
    /// Externally visible URL for this tunnel.
    pub fn public_url(&self) -> String {
        format!("https://{}", self.hostname)
    }
}

impl fmt::Debug for TunnelCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TunnelCredentials")
            .field("id", &self.id)
            .field("account_tag", &self.account_tag)
            .field("secret", &"<redacted>")
            .field("hostname", &self.hostname)
            .finish()
    }
}

/// Identity reported by this connecting instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Randomly generated, unique per bootstrap invocation
    pub client_id: Uuid,
    /// Optional feature flags advertised to the edge (empty by default)
    pub features: Vec<String>,
    /// Reported software version
    pub version: String,
    /// `<os>_<arch>` of the connecting host
    pub arch: String,
}

impl ClientInfo {
    /// Build the identity for a fresh bootstrap invocation.
    pub fn new(client_id: Uuid, version: impl Into<String>) -> Self {
        Self {
            client_id,
            features: Vec::new(),
            version: version.into(),
            arch: format!("{}_{}", std::env::consts::OS, std::env::consts::ARCH),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_url() {
        let creds = TunnelCredentials {
            id: Uuid::new_v4(),
            account_tag: "acct123".to_string(),
            secret: b"secret".to_vec(),
            hostname: "example.trycloudflare.com".to_string(),
        };
        assert_eq!(creds.public_url(), "https://example.trycloudflare.com");
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = TunnelCredentials {
            id: Uuid::new_v4(),
            account_tag: "acct123".to_string(),
            secret: b"super-secret-bytes".to_vec(),
            hostname: "example.trycloudflare.com".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(rendered.contains("<redacted>"));
        assert!(!rendered.contains("super-secret"));
    }

    #[test]
    fn test_client_info_arch() {
        let info = ClientInfo::new(Uuid::new_v4(), "0.1.0");
        assert!(info.arch.contains('_'));
        assert!(info.features.is_empty());
    }
}
