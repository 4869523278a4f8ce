//! Build metadata registration for observability tooling

use prometheus::{IntGaugeVec, Opts, Registry};

/// Build metadata exported as a constant `quicktun_build_info` gauge.
#[derive(Debug, Clone)]
pub struct BuildInfo {
    pub version: String,
    pub commit: String,
    pub build_time: String,
}

impl BuildInfo {
    pub fn new(
        version: impl Into<String>,
        commit: impl Into<String>,
        build_time: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            commit: commit.into(),
            build_time: build_time.into(),
        }
    }

    /// Build info for this crate, used when the embedding binary does not
    /// supply its own.
    pub fn crate_default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"), "unknown", "unknown")
    }

    /// Register the gauge with the given registry.
    ///
    /// Registering the same gauge twice within one process is a no-op, so
    /// repeated bootstrap invocations stay idempotent.
    pub fn register(&self, registry: &Registry) -> Result<(), prometheus::Error> {
        let gauge = IntGaugeVec::new(
            Opts::new("quicktun_build_info", "Build and version information"),
            &["version", "commit", "build_time"],
        )?;
        gauge
            .with_label_values(&[&self.version, &self.commit, &self.build_time])
            .set(1);

        match registry.register(Box::new(gauge)) {
            Ok(()) | Err(prometheus::Error::AlreadyReg) => Ok(()),
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_exports_gauge() {
        let registry = Registry::new();
        let info = BuildInfo::new("1.2.3", "abc1234", "2026-01-01T00:00:00Z");
        info.register(&registry).unwrap();

        let families = registry.gather();
        let family = families
            .iter()
            .find(|f| f.get_name() == "quicktun_build_info")
            .unwrap();
        let labels = family.get_metric()[0].get_label();
        assert!(labels
            .iter()
            .any(|l| l.get_name() == "version" && l.get_value() == "1.2.3"));
        assert_eq!(family.get_metric()[0].get_gauge().get_value() as i64, 1);
    }

    #[test]
    fn test_double_registration_is_idempotent() {
        let registry = Registry::new();
        let info = BuildInfo::crate_default();
        info.register(&registry).unwrap();
        info.register(&registry).unwrap();

        let count = registry
            .gather()
            .iter()
            .filter(|f| f.get_name() == "quicktun_build_info")
            .count();
        assert_eq!(count, 1);
    }
}
