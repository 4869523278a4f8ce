//! TLS client configuration for edge connections
//!
//! One configuration is built per known edge protocol from the protocol's
//! TLS settings and shared trust material. Construction is a pure function
//! of its arguments; assembly is all-or-nothing.

use quicktun_proto::{EdgeProtocol, TlsSettings};
use quicktun_supervisor::EdgeTlsConfig;
use rustls::pki_types::CertificateDer;
use rustls::{ClientConfig, RootCertStore};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// TLS assembly errors
#[derive(Debug, Error)]
pub enum TlsConfigError {
    #[error("edge protocol {0} has no known TLS settings")]
    UnknownSettings(EdgeProtocol),

    #[error("invalid extra root certificate: {0}")]
    InvalidRoot(#[from] rustls::Error),
}

static CRYPTO_PROVIDER_INIT: std::sync::Once = std::sync::Once::new();

fn ensure_crypto_provider() {
    CRYPTO_PROVIDER_INIT.call_once(|| {
        if rustls::crypto::ring::default_provider()
            .install_default()
            .is_err()
        {
            // Already installed
        }
    });
}

/// Build a TLS client configuration from one protocol's settings.
///
/// Trust anchors are the webpki roots plus any caller-supplied extras; the
/// ALPN list is applied when the settings carry one.
pub fn build_edge_tls_config(
    settings: &TlsSettings,
    extra_roots: &[CertificateDer<'static>],
) -> Result<ClientConfig, TlsConfigError> {
    ensure_crypto_provider();

    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    for root in extra_roots {
        roots.add(root.clone())?;
    }

    let mut config = ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();

    if !settings.next_protos.is_empty() {
        config.alpn_protocols = settings
            .next_protos
            .iter()
            .map(|proto| proto.as_bytes().to_vec())
            .collect();
    }

    Ok(config)
}

/// Build the TLS configuration map for every known edge protocol.
///
/// A protocol variant with no discoverable TLS settings fails the whole
/// assembly; a partial map is never returned.
pub fn edge_tls_configs(
    extra_roots: &[CertificateDer<'static>],
) -> Result<HashMap<EdgeProtocol, EdgeTlsConfig>, TlsConfigError> {
    let mut configs = HashMap::with_capacity(EdgeProtocol::ALL.len());
    for protocol in EdgeProtocol::ALL {
        let settings = protocol
            .tls_settings()
            .ok_or(TlsConfigError::UnknownSettings(protocol))?;
        let config = build_edge_tls_config(&settings, extra_roots)?;
        configs.insert(
            protocol,
            EdgeTlsConfig {
                server_name: settings.server_name.to_string(),
                config: Arc::new(config),
            },
        );
    }
    Ok(configs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_for_every_protocol() {
        let configs = edge_tls_configs(&[]).unwrap();
        assert_eq!(configs.len(), EdgeProtocol::ALL.len());
        for protocol in EdgeProtocol::ALL {
            let tls = configs.get(&protocol).unwrap();
            assert!(!tls.server_name.is_empty());
        }
    }

    #[test]
    fn test_alpn_applied_when_mandated() {
        let configs = edge_tls_configs(&[]).unwrap();

        let quic = configs.get(&EdgeProtocol::Quic).unwrap();
        assert_eq!(quic.config.alpn_protocols, vec![b"argotunnel".to_vec()]);
        assert_eq!(quic.server_name, "quic.cftunnel.com");

        let h2 = configs.get(&EdgeProtocol::Http2).unwrap();
        assert!(h2.config.alpn_protocols.is_empty());
        assert_eq!(h2.server_name, "h2.cftunnel.com");
    }

    #[test]
    fn test_invalid_extra_root_rejected() {
        let bogus = CertificateDer::from(vec![0u8, 1, 2, 3]);
        let err = edge_tls_configs(&[bogus]).unwrap_err();
        assert!(matches!(err, TlsConfigError::InvalidRoot(_)));
    }
}
