//! Ingress rule model and validation
//!
//! An ingress document is an ordered list of rules mapping a match pattern
//! (optional hostname, optional path prefix) to a local service URL. Inbound
//! requests are routed to the first matching rule; the final rule must be a
//! catch-all so every request has a destination.
//!
//! The same parser validates user-authored multi-rule documents and the
//! synthetic single-rule document built for a bare local port; there is no
//! separate code path for the synthetic case.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Ingress validation errors
#[derive(Debug, Error)]
pub enum IngressError {
    #[error("ingress must contain at least one rule")]
    Empty,

    #[error("last rule must be a catch-all (no hostname or path filter)")]
    MissingCatchAll,

    #[error("rule {index}: invalid service URL {service:?}: {source}")]
    InvalidService {
        index: usize,
        service: String,
        source: url::ParseError,
    },

    #[error("rule {index}: service {service:?} has unsupported scheme {scheme:?}, expected http or https")]
    UnsupportedScheme {
        index: usize,
        service: String,
        scheme: String,
    },

    #[error("rule {index}: service {service:?} has no host")]
    MissingHost { index: usize, service: String },

    #[error("local port must be non-zero")]
    InvalidPort,
}

/// A single rule in an unvalidated ingress document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UnvalidatedIngressRule {
    /// Hostname to match; `None` or `*` matches any host.
    /// A leading `*.` matches one subdomain level.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hostname: Option<String>,
    /// Path prefix to match; `None` matches any path
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Local service URL requests are forwarded to
    pub service: String,
}

/// A validated ingress rule
#[derive(Debug, Clone)]
pub struct IngressRule {
    hostname: Option<String>,
    path: Option<String>,
    service: Url,
}

impl IngressRule {
    /// Hostname pattern, if the rule filters on host.
    pub fn hostname(&self) -> Option<&str> {
        self.hostname.as_deref()
    }

    /// Path prefix, if the rule filters on path.
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Local service target.
    pub fn service(&self) -> &Url {
        &self.service
    }

    /// Whether this rule accepts every request.
    pub fn is_catch_all(&self) -> bool {
        self.matches_any_host() && self.path.is_none()
    }

    /// Whether the rule matches the given request hostname and path.
    pub fn matches(&self, hostname: &str, path: &str) -> bool {
        self.matches_hostname(hostname) && self.matches_path(path)
    }

    fn matches_any_host(&self) -> bool {
        matches!(self.hostname.as_deref(), None | Some("*"))
    }

    fn matches_hostname(&self, hostname: &str) -> bool {
        match self.hostname.as_deref() {
            None | Some("*") => true,
            Some(pattern) => {
                if let Some(base) = pattern.strip_prefix("*.") {
                    // One subdomain level in front of the base domain
                    hostname
                        .strip_suffix(base)
                        .and_then(|prefix| prefix.strip_suffix('.'))
                        .is_some_and(|label| !label.is_empty() && !label.contains('.'))
                } else {
                    hostname.eq_ignore_ascii_case(pattern)
                }
            }
        }
    }

    fn matches_path(&self, path: &str) -> bool {
        match self.path.as_deref() {
            None => true,
            Some(prefix) => path.starts_with(prefix),
        }
    }
}

/// An ordered, validated ingress rule set
#[derive(Debug, Clone)]
pub struct Ingress {
    rules: Vec<IngressRule>,
}

impl Ingress {
    /// Validate an ingress document.
    ///
    /// Every service URL must parse with an http or https scheme and a
    /// host, and the final rule must be a catch-all.
    pub fn parse(rules: &[UnvalidatedIngressRule]) -> Result<Self, IngressError> {
        if rules.is_empty() {
            return Err(IngressError::Empty);
        }

        let mut validated = Vec::with_capacity(rules.len());
        for (index, rule) in rules.iter().enumerate() {
            let service =
                Url::parse(&rule.service).map_err(|source| IngressError::InvalidService {
                    index,
                    service: rule.service.clone(),
                    source,
                })?;

            match service.scheme() {
                "http" | "https" => {}
                scheme => {
                    return Err(IngressError::UnsupportedScheme {
                        index,
                        service: rule.service.clone(),
                        scheme: scheme.to_string(),
                    })
                }
            }
            if service.host_str().is_none() {
                return Err(IngressError::MissingHost {
                    index,
                    service: rule.service.clone(),
                });
            }

            validated.push(IngressRule {
                hostname: rule.hostname.clone(),
                path: rule.path.clone(),
                service,
            });
        }

        // Requests that match nothing earlier must still have a destination
        match validated.last() {
            Some(last) if last.is_catch_all() => {}
            _ => return Err(IngressError::MissingCatchAll),
        }

        debug!(rules = validated.len(), "validated ingress document");
        Ok(Self { rules: validated })
    }

    /// The synthetic single-rule document for a bare local port: one
    /// catch-all rule targeting `http://localhost:<port>`.
    ///
    /// Runs through [`Ingress::parse`] like any user-authored document.
    pub fn for_local_port(port: u16) -> Result<Self, IngressError> {
        if port == 0 {
            return Err(IngressError::InvalidPort);
        }
        Self::parse(&[UnvalidatedIngressRule {
            hostname: None,
            path: None,
            service: format!("http://localhost:{}", port),
        }])
    }

    /// Validated rules, in match order.
    pub fn rules(&self) -> &[IngressRule] {
        &self.rules
    }

    /// First rule matching the given request hostname and path.
    pub fn find_matching(&self, hostname: &str, path: &str) -> Option<&IngressRule> {
        self.rules.iter().find(|rule| rule.matches(hostname, path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(hostname: Option<&str>, path: Option<&str>, service: &str) -> UnvalidatedIngressRule {
        UnvalidatedIngressRule {
            hostname: hostname.map(String::from),
            path: path.map(String::from),
            service: service.to_string(),
        }
    }

    #[test]
    fn test_single_rule_for_local_port() {
        // 80 is the http default port, which Url serialization elides
        for port in [1u16, 80, 8910, 65535] {
            let ingress = Ingress::for_local_port(port).unwrap();
            assert_eq!(ingress.rules().len(), 1);

            let only = &ingress.rules()[0];
            assert!(only.is_catch_all());
            assert_eq!(only.service().host_str(), Some("localhost"));
            assert_eq!(only.service().port_or_known_default(), Some(port));
            if port != 80 {
                assert_eq!(
                    only.service().as_str(),
                    format!("http://localhost:{}/", port)
                );
            }

            // Catch-all accepts every request
            assert!(only.matches("example.trycloudflare.com", "/"));
            assert!(only.matches("anything.example", "/deeply/nested?x=1"));
        }
    }

    #[test]
    fn test_port_zero_rejected() {
        assert!(matches!(
            Ingress::for_local_port(0),
            Err(IngressError::InvalidPort)
        ));
    }

    #[test]
    fn test_empty_document_rejected() {
        assert!(matches!(Ingress::parse(&[]), Err(IngressError::Empty)));
    }

    #[test]
    fn test_last_rule_must_be_catch_all() {
        let err = Ingress::parse(&[rule(
            Some("app.example.com"),
            None,
            "http://localhost:3000",
        )]);
        assert!(matches!(err, Err(IngressError::MissingCatchAll)));

        let ok = Ingress::parse(&[
            rule(Some("app.example.com"), None, "http://localhost:3000"),
            rule(None, None, "http://localhost:8080"),
        ]);
        assert!(ok.is_ok());
    }

    #[test]
    fn test_service_validation() {
        let err = Ingress::parse(&[rule(None, None, "localhost:8080")]);
        assert!(matches!(err, Err(IngressError::InvalidService { .. })));

        let err = Ingress::parse(&[rule(None, None, "ftp://localhost:8080")]);
        assert!(matches!(
            err,
            Err(IngressError::UnsupportedScheme { index: 0, .. })
        ));
    }

    #[test]
    fn test_multi_rule_match_order() {
        let ingress = Ingress::parse(&[
            rule(Some("api.example.com"), None, "http://localhost:3000"),
            rule(None, Some("/admin"), "http://localhost:4000"),
            rule(None, None, "http://localhost:8080"),
        ])
        .unwrap();

        let hit = ingress.find_matching("api.example.com", "/").unwrap();
        assert_eq!(hit.service().port(), Some(3000));

        let hit = ingress.find_matching("other.example.com", "/admin/users").unwrap();
        assert_eq!(hit.service().port(), Some(4000));

        let hit = ingress.find_matching("other.example.com", "/").unwrap();
        assert_eq!(hit.service().port(), Some(8080));
    }

    #[test]
    fn test_wildcard_hostname_matching() {
        let ingress = Ingress::parse(&[
            rule(Some("*.example.com"), None, "http://localhost:3000"),
            rule(None, None, "http://localhost:8080"),
        ])
        .unwrap();

        let hit = ingress.find_matching("api.example.com", "/").unwrap();
        assert_eq!(hit.service().port(), Some(3000));

        // Base domain and deeper nesting fall through to the catch-all
        let hit = ingress.find_matching("example.com", "/").unwrap();
        assert_eq!(hit.service().port(), Some(8080));
        let hit = ingress.find_matching("a.b.example.com", "/").unwrap();
        assert_eq!(hit.service().port(), Some(8080));
    }

    #[test]
    fn test_document_deserializes() {
        let doc: Vec<UnvalidatedIngressRule> = serde_json::from_str(
            r#"[{"hostname": "app.example.com", "service": "http://localhost:3000"},
                {"service": "http://localhost:8080"}]"#,
        )
        .unwrap();
        let ingress = Ingress::parse(&doc).unwrap();
        assert_eq!(ingress.rules().len(), 2);
    }
}
