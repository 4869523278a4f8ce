//! Wire types for the tunnel provisioning API
//!
//! The provisioning endpoint answers a bare `POST` with a JSON envelope:
//!
//! ```json
//! { "success": true,
//!   "result": { "id": "...", "name": "...", "hostname": "...",
//!               "account_tag": "...", "secret": "base64..." },
//!   "errors": [ { "code": 1001, "message": "..." } ] }
//! ```

use crate::credentials::TunnelCredentials;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Response envelope returned by the provisioning endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionResponse {
    pub success: bool,
    #[serde(default)]
    pub result: Option<ProvisionedTunnel>,
    #[serde(default)]
    pub errors: Vec<ProvisionApiError>,
}

/// Newly provisioned tunnel, as reported by the control plane
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionedTunnel {
    /// Tunnel id; must parse as a UUID
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub hostname: String,
    pub account_tag: String,
    /// Registration secret, base64 on the wire
    #[serde(with = "base64_bytes")]
    pub secret: Vec<u8>,
}

impl ProvisionedTunnel {
    /// Turn the wire shape into credentials.
    ///
    /// Fails when the tunnel id is not a syntactically valid UUID; the
    /// hostname is taken verbatim.
    pub fn into_credentials(self) -> Result<TunnelCredentials, uuid::Error> {
        let id = Uuid::parse_str(&self.id)?;
        Ok(TunnelCredentials {
            id,
            account_tag: self.account_tag,
            secret: self.secret,
            hostname: self.hostname,
        })
    }
}

/// Error entry in a provisioning response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionApiError {
    pub code: i64,
    pub message: String,
}

/// Helper module for serializing the secret as base64
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = r#"{
        "success": true,
        "result": {
            "id": "3fa85f64-5717-4562-b3fc-2c963f66afa6",
            "hostname": "example.trycloudflare.com",
            "account_tag": "acct123",
            "secret": "c2VjcmV0"
        }
    }"#;

    #[test]
    fn test_parse_canonical_response() {
        let response: ProvisionResponse = serde_json::from_str(CANONICAL).unwrap();
        assert!(response.success);
        assert!(response.errors.is_empty());

        let tunnel = response.result.unwrap();
        assert_eq!(tunnel.hostname, "example.trycloudflare.com");
        assert_eq!(tunnel.secret, b"secret");
        // name is optional on the wire
        assert!(tunnel.name.is_empty());
    }

    #[test]
    fn test_into_credentials() {
        let response: ProvisionResponse = serde_json::from_str(CANONICAL).unwrap();
        let creds = response.result.unwrap().into_credentials().unwrap();
        assert_eq!(
            creds.id,
            "3fa85f64-5717-4562-b3fc-2c963f66afa6".parse::<Uuid>().unwrap()
        );
        assert_eq!(creds.account_tag, "acct123");
        assert_eq!(creds.public_url(), "https://example.trycloudflare.com");
    }

    #[test]
    fn test_malformed_tunnel_id() {
        let tunnel = ProvisionedTunnel {
            id: "not-a-uuid".to_string(),
            name: String::new(),
            hostname: "example.trycloudflare.com".to_string(),
            account_tag: "acct123".to_string(),
            secret: vec![],
        };
        assert!(tunnel.into_credentials().is_err());
    }

    #[test]
    fn test_parse_failure_envelope() {
        let body = r#"{"success":false,"errors":[{"code":1001,"message":"rate limited"}]}"#;
        let response: ProvisionResponse = serde_json::from_str(body).unwrap();
        assert!(!response.success);
        assert!(response.result.is_none());
        assert_eq!(response.errors[0].code, 1001);
        assert_eq!(response.errors[0].message, "rate limited");
    }

    #[test]
    fn test_secret_round_trips_as_base64() {
        let tunnel = ProvisionedTunnel {
            id: Uuid::new_v4().to_string(),
            name: "quick".to_string(),
            hostname: "example.trycloudflare.com".to_string(),
            account_tag: "acct123".to_string(),
            secret: b"secret".to_vec(),
        };
        let json = serde_json::to_string(&tunnel).unwrap();
        assert!(json.contains("c2VjcmV0"));
    }
}
