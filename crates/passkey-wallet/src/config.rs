//! Configuration types and validation for the relayer.

use std::{collections::HashSet, net::SocketAddr, time::Duration};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
    cli::{Cli, LogArgs, MetricsArgs, RelyingPartyArgs},
    logging::LogConfig,
    service::WalletSettings,
    webauthn::RelyingParty,
};

/// A supported chain: the request-level id and the node it maps to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainEndpoint {
    /// Chain id as sent by clients (e.g. `localhost`, `base_sepolia`).
    pub id: String,
    /// JSON-RPC endpoint of the chain.
    pub rpc_url: Url,
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Invalid URL format.
    #[error("invalid {field} URL: {reason}")]
    InvalidUrl {
        /// The field name that contains the invalid URL.
        field: &'static str,
        /// The reason the URL is invalid.
        reason: String,
    },
    /// A field value is out of the allowed range.
    #[error("{field} must be {constraint}, got {value}")]
    OutOfRange {
        /// The field name that is out of range.
        field: &'static str,
        /// The constraint description.
        constraint: &'static str,
        /// The actual value.
        value: String,
    },
    /// The same chain id was configured twice.
    #[error("chain {0} configured more than once")]
    DuplicateChain(String),
    /// No chain was configured.
    #[error("at least one chain must be configured")]
    NoChains,
    /// A required contract address is zero.
    #[error("{0} address must not be zero")]
    ZeroAddress(&'static str),
    /// Invalid metrics configuration.
    #[error("invalid metrics config: {0}")]
    Metrics(String),
    /// Invalid relying party configuration.
    #[error("invalid relying party config: {0}")]
    RelyingParty(String),
}

/// Validated relayer configuration.
#[derive(Debug, Clone)]
pub struct RelayerConfig {
    /// Supported chains.
    pub chains: Vec<ChainEndpoint>,
    /// Account that submits bundles and collects the refunds.
    pub signer: PrivateKeySigner,
    /// Settings shared by every request.
    pub settings: WalletSettings,
    /// Lifetime of pending ceremony options.
    pub options_ttl: Duration,
    /// Interval between sweeps of expired store entries.
    pub store_sweep_interval: Duration,
    /// RPC server socket address.
    pub rpc_addr: SocketAddr,
    /// Logging configuration.
    pub log: LogConfig,
    /// Metrics server configuration.
    pub metrics: MetricsConfig,
}

/// Metrics server configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricsConfig {
    /// Whether the Prometheus exporter is installed.
    pub enabled: bool,
    /// Exporter listen address.
    pub addr: SocketAddr,
}

impl MetricsConfig {
    /// Installs the Prometheus recorder and its HTTP listener when enabled.
    pub fn init(&self) -> Result<(), BuildError> {
        if !self.enabled {
            return Ok(());
        }
        PrometheusBuilder::new().with_http_listener(self.addr).install()?;
        info!(target: "prometheus", "Serving metrics at: http://{}", self.addr);
        Ok(())
    }
}

impl From<MetricsArgs> for MetricsConfig {
    fn from(args: MetricsArgs) -> Self {
        Self { enabled: args.enabled, addr: SocketAddr::new(args.addr, args.port) }
    }
}

impl RelayerConfig {
    /// Create a validated configuration from CLI arguments.
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
        if cli.wallet.chains.is_empty() {
            return Err(ConfigError::NoChains);
        }
        let mut seen = HashSet::new();
        for chain in &cli.wallet.chains {
            validate_url(&chain.rpc_url, "chain rpc")?;
            if !seen.insert(chain.id.as_str()) {
                return Err(ConfigError::DuplicateChain(chain.id.clone()));
            }
        }

        if cli.wallet.entry_point == Address::ZERO {
            return Err(ConfigError::ZeroAddress("entry-point"));
        }
        if cli.wallet.factory == Address::ZERO {
            return Err(ConfigError::ZeroAddress("factory"));
        }
        if cli.wallet.paymaster == Some(Address::ZERO) {
            return Err(ConfigError::ZeroAddress("paymaster"));
        }

        if cli.wallet.confirmations == 0 {
            return Err(ConfigError::OutOfRange {
                field: "confirmations",
                constraint: "greater than 0",
                value: "0".to_string(),
            });
        }
        for (field, value) in [
            ("confirmation-timeout", cli.wallet.confirmation_timeout),
            ("options-ttl", cli.wallet.options_ttl),
            ("store-sweep-interval", cli.wallet.store_sweep_interval),
        ] {
            if value.is_zero() {
                return Err(ConfigError::OutOfRange {
                    field,
                    constraint: "greater than 0",
                    value: "0s".to_string(),
                });
            }
        }

        if cli.metrics.enabled && cli.metrics.port == 0 {
            return Err(ConfigError::Metrics(
                "metrics port must be non-zero when metrics are enabled".to_string(),
            ));
        }

        let rp = RelyingParty::try_from(cli.relying_party.clone())?;

        Ok(Self {
            chains: cli.wallet.chains,
            signer: cli.wallet.private_key,
            settings: WalletSettings {
                rp,
                entry_point: cli.wallet.entry_point,
                factory: cli.wallet.factory,
                paymaster: cli.wallet.paymaster,
                confirmations: cli.wallet.confirmations,
                confirmation_timeout: cli.wallet.confirmation_timeout,
                require_user_verification: cli.relying_party.require_user_verification,
            },
            options_ttl: cli.wallet.options_ttl,
            store_sweep_interval: cli.wallet.store_sweep_interval,
            rpc_addr: SocketAddr::new(cli.rpc.addr, cli.rpc.port),
            log: LogConfig::from(cli.logging),
            metrics: MetricsConfig::from(cli.metrics),
        })
    }
}

impl TryFrom<RelyingPartyArgs> for RelyingParty {
    type Error = ConfigError;

    fn try_from(args: RelyingPartyArgs) -> Result<Self, Self::Error> {
        let origin = Url::parse(&args.origin)
            .map_err(|e| ConfigError::InvalidUrl { field: "rp-origin", reason: e.to_string() })?;
        validate_url(&origin, "rp-origin")?;

        let id = args.id.trim();
        if id.is_empty() {
            return Err(ConfigError::RelyingParty("rp id must not be empty".to_string()));
        }
        let host = origin.host_str().unwrap_or_default();
        if host != id && !host.ends_with(&format!(".{id}")) {
            return Err(ConfigError::RelyingParty(format!(
                "rp id {id} is not a registrable suffix of origin host {host}"
            )));
        }

        // `Url` appends a trailing slash to bare origins; clients send none.
        let origin = origin.origin().ascii_serialization();
        Ok(Self { id: id.to_string(), name: args.name, origin })
    }
}

impl From<LogArgs> for LogConfig {
    fn from(args: LogArgs) -> Self {
        Self::from_verbosity(args.level, args.stdout_format, args.stdout_quiet)
    }
}

/// Validate that a URL has a scheme and host.
fn validate_url(url: &Url, field: &'static str) -> Result<(), ConfigError> {
    if url.scheme().is_empty() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing scheme".to_string() });
    }
    if url.host().is_none() {
        return Err(ConfigError::InvalidUrl { field, reason: "missing host".to_string() });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::{net::IpAddr, str::FromStr};

    use tracing_subscriber::filter::LevelFilter;

    use super::*;
    use crate::{
        DEFAULT_RP_NAME, ENTRY_POINT_V06,
        cli::{MetricsArgs, RpcServerArgs, WalletArgs},
        logging::LogFormat,
    };

    fn minimal_cli() -> Cli {
        Cli {
            wallet: WalletArgs {
                chains: vec![ChainEndpoint {
                    id: "localhost".to_string(),
                    rpc_url: Url::parse("http://localhost:8545").unwrap(),
                }],
                entry_point: ENTRY_POINT_V06,
                factory: Address::repeat_byte(0x0b),
                paymaster: None,
                private_key: PrivateKeySigner::from_str(
                    "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80",
                )
                .unwrap(),
                confirmations: 1,
                confirmation_timeout: Duration::from_secs(30),
                options_ttl: Duration::from_secs(300),
                store_sweep_interval: Duration::from_secs(60),
            },
            relying_party: RelyingPartyArgs {
                id: "localhost".to_string(),
                name: DEFAULT_RP_NAME.to_string(),
                origin: "http://localhost:3000".to_string(),
                require_user_verification: true,
            },
            logging: LogArgs { level: 3, stdout_quiet: false, stdout_format: LogFormat::Full },
            metrics: MetricsArgs {
                enabled: false,
                addr: IpAddr::from([0, 0, 0, 0]),
                port: 9090,
            },
            rpc: RpcServerArgs { addr: IpAddr::from([127, 0, 0, 1]), port: 8080 },
        }
    }

    #[test]
    fn test_valid_config() {
        let config = RelayerConfig::from_cli(minimal_cli()).unwrap();
        assert_eq!(config.chains.len(), 1);
        assert_eq!(config.settings.rp.origin, "http://localhost:3000");
        assert_eq!(config.settings.rp.id, "localhost");
        assert_eq!(config.settings.entry_point, ENTRY_POINT_V06);
        assert!(config.settings.require_user_verification);
        assert_eq!(config.rpc_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(config.log.level, LevelFilter::INFO);
    }

    #[test]
    fn test_duplicate_chain() {
        let mut cli = minimal_cli();
        cli.wallet.chains.push(cli.wallet.chains[0].clone());
        let err = RelayerConfig::from_cli(cli).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateChain(id) if id == "localhost"));
    }

    #[test]
    fn test_no_chains() {
        let mut cli = minimal_cli();
        cli.wallet.chains.clear();
        assert!(matches!(RelayerConfig::from_cli(cli).unwrap_err(), ConfigError::NoChains));
    }

    #[test]
    fn test_zero_factory() {
        let mut cli = minimal_cli();
        cli.wallet.factory = Address::ZERO;
        assert!(matches!(
            RelayerConfig::from_cli(cli).unwrap_err(),
            ConfigError::ZeroAddress("factory")
        ));
    }

    #[test]
    fn test_zero_durations_rejected() {
        let mut cli = minimal_cli();
        cli.wallet.options_ttl = Duration::ZERO;
        assert!(matches!(
            RelayerConfig::from_cli(cli).unwrap_err(),
            ConfigError::OutOfRange { field: "options-ttl", .. }
        ));

        let mut cli = minimal_cli();
        cli.wallet.confirmations = 0;
        assert!(matches!(
            RelayerConfig::from_cli(cli).unwrap_err(),
            ConfigError::OutOfRange { field: "confirmations", .. }
        ));
    }

    #[test]
    fn test_origin_must_match_rp_id() {
        let mut cli = minimal_cli();
        cli.relying_party.origin = "https://evil.example".to_string();
        assert!(matches!(
            RelayerConfig::from_cli(cli).unwrap_err(),
            ConfigError::RelyingParty(_)
        ));

        let mut cli = minimal_cli();
        cli.relying_party.id = "example.com".to_string();
        cli.relying_party.origin = "https://wallet.example.com/".to_string();
        let config = RelayerConfig::from_cli(cli).unwrap();
        assert_eq!(config.settings.rp.origin, "https://wallet.example.com");
    }

    #[test]
    fn test_invalid_origin() {
        let mut cli = minimal_cli();
        cli.relying_party.origin = "not a url".to_string();
        assert!(matches!(
            RelayerConfig::from_cli(cli).unwrap_err(),
            ConfigError::InvalidUrl { field: "rp-origin", .. }
        ));
    }

    #[test]
    fn test_metrics_port_required_when_enabled() {
        let mut cli = minimal_cli();
        cli.metrics.enabled = true;
        cli.metrics.port = 0;
        assert!(matches!(RelayerConfig::from_cli(cli).unwrap_err(), ConfigError::Metrics(_)));

        let mut cli = minimal_cli();
        cli.metrics.enabled = true;
        let config = RelayerConfig::from_cli(cli).unwrap();
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.addr, "0.0.0.0:9090".parse::<SocketAddr>().unwrap());
    }

    #[test]
    fn test_log_config_from_args() {
        let config = LogConfig::from(LogArgs {
            level: 5,
            stdout_quiet: true,
            stdout_format: LogFormat::Json,
        });
        assert_eq!(config.level, LevelFilter::TRACE);
        assert!(config.quiet);
        assert_eq!(config.format, LogFormat::Json);
    }
}
