//!
//! Report configuration
//!
//! The configuration is an immutable value handed to the
//! [`ReportAssembler`](crate::report::ReportAssembler). The binary fills it from the command line
//! and `REPORT_*` environment variables.
use std::path::PathBuf;
use std::time::Duration;

use crate::collector::Window;
use crate::report::ColumnOrder;
use crate::{Client, ClientBuilder, Error, Result};

/// Placeholder left in the base URL until it is configured
pub const PLACEHOLDER_BASE_URL: &str = "YOUR_BASE_URL";
/// Placeholder left in the public key until it is configured
pub const PLACEHOLDER_PUBLIC_KEY: &str = "YOUR_PUBLIC_API_KEY";
/// Placeholder left in the private key until it is configured
pub const PLACEHOLDER_PRIVATE_KEY: &str = "YOUR_PRIVATE_API_KEY";

const ATLAS_BASE_URL: &str = "https://cloud.mongodb.com/api/atlas/v1.0";

/// Where the fleet is managed
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeploymentMode {
    /// Cloud managed, hosts are listed as processes
    #[default]
    Atlas,
    /// Self managed Ops Manager or Cloud Manager
    OpsManager,
}

impl DeploymentMode {
    /// Path segment listing the hosts of a project
    #[must_use]
    pub const fn host_collection(self) -> &'static str {
        match self {
            Self::Atlas => "processes",
            Self::OpsManager => "hosts",
        }
    }

    /// Base URL used when none is configured
    #[must_use]
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Atlas => ATLAS_BASE_URL,
            Self::OpsManager => PLACEHOLDER_BASE_URL,
        }
    }
}

impl std::str::FromStr for DeploymentMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('_', "-").as_str() {
            "atlas" => Ok(Self::Atlas),
            "ops-manager" | "opsmanager" | "cloud-manager" => Ok(Self::OpsManager),
            other => Err(format!(
                "unknown deployment mode '{other}', expected 'atlas' or 'ops-manager'"
            )),
        }
    }
}

impl std::fmt::Display for DeploymentMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Atlas => write!(f, "atlas"),
            Self::OpsManager => write!(f, "ops-manager"),
        }
    }
}

/// Everything a report run needs
#[derive(Clone)]
pub struct Config {
    pub mode: DeploymentMode,
    pub base_url: String,
    pub public_key: String,
    pub private_key: String,
    /// `Accept` header sent with every request
    pub accept: String,
    /// Lookback period and granularity of the measurements
    pub window: Window,
    /// Directory the CSV report is written to
    pub output_dir: PathBuf,
    pub column_order: ColumnOrder,
    /// PEM file with an additional root certificate
    pub ca_cert: Option<PathBuf>,
    pub accept_invalid_certs: bool,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        let mode = DeploymentMode::default();
        Self {
            mode,
            base_url: mode.default_base_url().to_string(),
            public_key: PLACEHOLDER_PUBLIC_KEY.to_string(),
            private_key: PLACEHOLDER_PRIVATE_KEY.to_string(),
            accept: "application/json".to_string(),
            window: Window::default(),
            output_dir: PathBuf::from("output"),
            column_order: ColumnOrder::default(),
            ca_cert: None,
            accept_invalid_certs: false,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("mode", &self.mode)
            .field("base_url", &self.base_url)
            .field("public_key", &self.public_key)
            .field("accept", &self.accept)
            .field("window", &self.window)
            .field("output_dir", &self.output_dir)
            .field("column_order", &self.column_order)
            .field("ca_cert", &self.ca_cert)
            .field("accept_invalid_certs", &self.accept_invalid_certs)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Config {
    /// Refuse to run while the URL or the keys hold their placeholder values
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("base URL", self.base_url.as_str(), PLACEHOLDER_BASE_URL),
            ("public API key", self.public_key.as_str(), PLACEHOLDER_PUBLIC_KEY),
            ("private API key", self.private_key.as_str(), PLACEHOLDER_PRIVATE_KEY),
        ]
        .into_iter()
        .filter(|(_, value, placeholder)| value.is_empty() || value.contains(placeholder))
        .map(|(name, _, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::ConfigIncomplete(missing.join(", ")))
        }
    }

    /// Create the API client described by this configuration
    pub async fn build_client(&self) -> Result<Client> {
        let mut builder = ClientBuilder::new()
            .accept(&self.accept)
            .timeout(self.timeout);

        if let Some(path) = &self.ca_cert {
            tracing::debug!("Loading root certificate from {}", path.display());
            let ca = tokio::fs::read(path).await?;
            builder = builder.add_root_certificate(&ca)?;
        }
        if self.accept_invalid_certs {
            tracing::warn!("Certificate verification disabled");
            builder = builder.danger_accept_invalid_certs();
        }

        builder.with_api_key(&self.base_url, &self.public_key, &self.private_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        Config {
            public_key: "abcdefgh".into(),
            private_key: "8f7e2c4a-1b3d-4e5f-9a0b-c1d2e3f4a5b6".into(),
            ..Default::default()
        }
    }

    #[test]
    fn placeholders_are_rejected() {
        let err = Config::default().validate().unwrap_err();
        match err {
            Error::ConfigIncomplete(what) => {
                assert_eq!(what, "public API key, private API key");
            }
            e => panic!("unexpected error {e:?}"),
        }

        let config = Config {
            mode: DeploymentMode::OpsManager,
            base_url: DeploymentMode::OpsManager.default_base_url().into(),
            ..configured()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::ConfigIncomplete(what)) if what == "base URL"
        ));

        let config = Config {
            base_url: "https://YOUR_BASE_URL/api/public/v1.0".into(),
            ..configured()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn configured_is_valid() {
        assert!(configured().validate().is_ok());
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("atlas".parse(), Ok(DeploymentMode::Atlas));
        assert_eq!("ATLAS".parse(), Ok(DeploymentMode::Atlas));
        assert_eq!("OPS_MANAGER".parse(), Ok(DeploymentMode::OpsManager));
        assert_eq!("ops-manager".parse(), Ok(DeploymentMode::OpsManager));
        assert!("mongo".parse::<DeploymentMode>().is_err());
        assert_eq!(DeploymentMode::OpsManager.to_string(), "ops-manager");
    }

    #[test]
    fn debug_hides_private_key() {
        let debug = format!("{:?}", configured());
        assert!(debug.contains("abcdefgh"));
        assert!(!debug.contains("8f7e2c4a"));
    }

    #[tokio::test]
    async fn missing_ca_cert_fails() {
        let config = Config {
            ca_cert: Some(PathBuf::from("/nonexistent/ca.pem")),
            ..configured()
        };
        assert!(matches!(config.build_client().await, Err(Error::IO(_))));
    }

    #[tokio::test]
    async fn builds_client_for_base_url() {
        let config = Config {
            mode: DeploymentMode::OpsManager,
            base_url: "https://ops.example.com:8443/api/public/v1.0".into(),
            accept_invalid_certs: true,
            ..configured()
        };
        let client = config.build_client().await.unwrap();
        assert_eq!(
            client.base_url().as_str(),
            "https://ops.example.com:8443/api/public/v1.0"
        );
    }
}
