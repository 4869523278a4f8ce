//! Credential provisioning against the quick-tunnel control plane
//!
//! A single bounded POST obtains the tunnel identity, registration secret
//! and public hostname. There is no retry at this layer; callers decide
//! whether to retry the whole bootstrap.

use quicktun_proto::{ProvisionApiError, ProvisionResponse, TunnelCredentials};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

/// Provisioning endpoint used when none is configured
pub const DEFAULT_PROVISION_URL: &str = "https://api.trycloudflare.com/tunnel";

/// Bound applied uniformly to connect, TLS handshake and the full exchange
pub const DEFAULT_PROVISION_TIMEOUT: Duration = Duration::from_secs(30);

/// Informational client marker; not used for authentication
const USER_AGENT: &str = concat!("quicktun/", env!("CARGO_PKG_VERSION"));

/// Header carrying the connecting instance's identity
const CLIENT_ID_HEADER: &str = "x-quicktun-client-id";

/// Provisioning errors
#[derive(Debug, Error)]
pub enum ProvisionError {
    #[error("failed to reach provisioning endpoint: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("provisioning response did not parse: {0}")]
    Protocol(#[from] serde_json::Error),

    #[error("provisioning response reported success but carried no result")]
    MissingResult,

    #[error("provisioning request rejected: {}", describe_api_errors(.0))]
    Rejected(Vec<ProvisionApiError>),

    #[error("provisioned tunnel id is not a valid UUID: {0}")]
    InvalidTunnelId(#[from] uuid::Error),

    #[error("invalid provisioning endpoint: {0}")]
    InvalidEndpoint(#[from] url::ParseError),
}

fn describe_api_errors(errors: &[ProvisionApiError]) -> String {
    if errors.is_empty() {
        return "no error detail provided".to_string();
    }
    errors
        .iter()
        .map(|e| format!("{} ({})", e.message, e.code))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Client for the provisioning endpoint
#[derive(Debug, Clone)]
pub struct Provisioner {
    endpoint: Url,
    http: reqwest::Client,
}

impl Provisioner {
    /// Provisioner against the default endpoint.
    pub fn new() -> Result<Self, ProvisionError> {
        Self::with_endpoint(DEFAULT_PROVISION_URL)
    }

    /// Provisioner against a specific endpoint, with the default timeout.
    pub fn with_endpoint(endpoint: &str) -> Result<Self, ProvisionError> {
        Self::with_endpoint_and_timeout(Url::parse(endpoint)?, DEFAULT_PROVISION_TIMEOUT)
    }

    /// Provisioner with explicit endpoint and timeout. The one duration
    /// bounds connect, TLS handshake and the overall request alike.
    pub fn with_endpoint_and_timeout(
        endpoint: Url,
        timeout: Duration,
    ) -> Result<Self, ProvisionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .build()
            .map_err(ProvisionError::Transport)?;
        Ok(Self { endpoint, http })
    }

    /// Endpoint this provisioner talks to.
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Request a fresh tunnel.
    ///
    /// Issues exactly one POST; the client id travels in an informational
    /// header. The secret in the returned credentials is never logged.
    pub async fn provision(&self, client_id: Uuid) -> Result<TunnelCredentials, ProvisionError> {
        debug!(endpoint = %self.endpoint, %client_id, "requesting quick tunnel");

        let response = self
            .http
            .post(self.endpoint.clone())
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .header(CLIENT_ID_HEADER, client_id.to_string())
            .send()
            .await
            .map_err(ProvisionError::Transport)?;

        let body = response.bytes().await.map_err(ProvisionError::Transport)?;
        let credentials = decode_provision_response(&body)?;

        info!(
            tunnel_id = %credentials.id,
            hostname = %credentials.hostname,
            "quick tunnel provisioned"
        );
        Ok(credentials)
    }
}

/// Decode a provisioning response body into credentials.
///
/// Rejection (`success == false`) and a malformed tunnel id are hard
/// failures; a partially populated credential set is never returned.
fn decode_provision_response(body: &[u8]) -> Result<TunnelCredentials, ProvisionError> {
    let parsed: ProvisionResponse = serde_json::from_slice(body)?;

    if !parsed.success {
        return Err(ProvisionError::Rejected(parsed.errors));
    }
    let tunnel = parsed.result.ok_or(ProvisionError::MissingResult)?;
    Ok(tunnel.into_credentials()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_success() {
        let body = br#"{
            "success": true,
            "result": {
                "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
                "hostname": "example.trycloudflare.com",
                "account_tag": "acct123",
                "secret": "c2VjcmV0"
            }
        }"#;
        let credentials = decode_provision_response(body).unwrap();
        assert_eq!(credentials.hostname, "example.trycloudflare.com");
        assert_eq!(credentials.account_tag, "acct123");
        assert_eq!(credentials.secret, b"secret");
    }

    #[test]
    fn test_decode_rejection() {
        let body = br#"{"success": false, "errors": [{"code": 1001, "message": "rate limited"}]}"#;
        let err = decode_provision_response(body).unwrap_err();
        match err {
            ProvisionError::Rejected(errors) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].code, 1001);
            }
            other => panic!("expected Rejected, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_rejection_without_detail() {
        let body = br#"{"success": false}"#;
        let err = decode_provision_response(body).unwrap_err();
        assert!(matches!(err, ProvisionError::Rejected(ref errors) if errors.is_empty()));
        assert!(err.to_string().contains("no error detail"));
    }

    #[test]
    fn test_decode_malformed_body() {
        let err = decode_provision_response(b"<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, ProvisionError::Protocol(_)));
    }

    #[test]
    fn test_decode_malformed_tunnel_id() {
        let body = br#"{
            "success": true,
            "result": {
                "id": "not-a-uuid",
                "hostname": "example.trycloudflare.com",
                "account_tag": "acct123",
                "secret": "c2VjcmV0"
            }
        }"#;
        let err = decode_provision_response(body).unwrap_err();
        assert!(matches!(err, ProvisionError::InvalidTunnelId(_)));
    }

    #[test]
    fn test_decode_success_without_result() {
        let err = decode_provision_response(br#"{"success": true}"#).unwrap_err();
        assert!(matches!(err, ProvisionError::MissingResult));
    }

    #[test]
    fn test_rejects_invalid_endpoint() {
        assert!(matches!(
            Provisioner::with_endpoint("not a url"),
            Err(ProvisionError::InvalidEndpoint(_))
        ));
    }
}
