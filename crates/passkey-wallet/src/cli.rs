//! CLI argument definitions for the relayer.

use std::{net::IpAddr, str::FromStr, time::Duration};

use alloy_primitives::Address;
use alloy_signer_local::PrivateKeySigner;
use clap::{ArgAction, Parser};
use url::Url;

use crate::{config::ChainEndpoint, logging::LogFormat};

/// Passkey relayer - turns WebAuthn assertions into ERC-4337 user operations.
#[derive(Debug, Clone, Parser)]
#[command(name = "passkey-relayer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Wallet and chain configuration arguments.
    #[command(flatten)]
    pub wallet: WalletArgs,

    /// Relying party configuration arguments.
    #[command(flatten)]
    pub relying_party: RelyingPartyArgs,

    /// Logging configuration arguments.
    #[command(flatten)]
    pub logging: LogArgs,

    /// Metrics server configuration arguments.
    #[command(flatten)]
    pub metrics: MetricsArgs,

    /// RPC server configuration arguments.
    #[command(flatten)]
    pub rpc: RpcServerArgs,
}

/// Wallet, chain and relayer account arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Wallet")]
pub struct WalletArgs {
    /// Supported chain as `<id>=<rpc-url>`. Repeat or comma-separate for several chains.
    #[arg(
        long = "chain",
        env = "PASSKEY_RELAYER_CHAINS",
        value_delimiter = ',',
        required = true,
        value_parser = parse_chain
    )]
    pub chains: Vec<ChainEndpoint>,

    /// EntryPoint v0.6 address.
    #[arg(
        long = "entry-point",
        env = "PASSKEY_RELAYER_ENTRY_POINT",
        default_value = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789",
        value_parser = parse_address
    )]
    pub entry_point: Address,

    /// Coinbase Smart Wallet factory address.
    #[arg(
        long = "factory",
        env = "PASSKEY_RELAYER_FACTORY",
        value_parser = parse_address
    )]
    pub factory: Address,

    /// Paymaster address for sponsored operations.
    #[arg(
        long = "paymaster",
        env = "PASSKEY_RELAYER_PAYMASTER",
        value_parser = parse_address
    )]
    pub paymaster: Option<Address>,

    /// Private key of the funded account that submits bundles.
    #[arg(
        long = "private-key",
        env = "PASSKEY_RELAYER_PRIVATE_KEY",
        hide_env_values = true,
        value_parser = parse_private_key
    )]
    pub private_key: PrivateKeySigner,

    /// Confirmations to wait for after submitting a bundle.
    #[arg(
        long = "confirmations",
        env = "PASSKEY_RELAYER_CONFIRMATIONS",
        default_value = "1"
    )]
    pub confirmations: u64,

    /// Deadline for the confirmations (e.g., "30s", "2m").
    #[arg(
        long = "confirmation-timeout",
        env = "PASSKEY_RELAYER_CONFIRMATION_TIMEOUT",
        default_value = "30s",
        value_parser = parse_duration
    )]
    pub confirmation_timeout: Duration,

    /// Lifetime of pending ceremony options (e.g., "5m").
    #[arg(
        long = "options-ttl",
        env = "PASSKEY_RELAYER_OPTIONS_TTL",
        default_value = "5m",
        value_parser = parse_duration
    )]
    pub options_ttl: Duration,

    /// Interval between sweeps of expired store entries.
    #[arg(
        long = "store-sweep-interval",
        env = "PASSKEY_RELAYER_STORE_SWEEP_INTERVAL",
        default_value = "1m",
        value_parser = parse_duration
    )]
    pub store_sweep_interval: Duration,
}

/// WebAuthn relying party arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Relying Party")]
pub struct RelyingPartyArgs {
    /// Relying party id (effective domain of the origin).
    #[arg(long = "rp-id", env = "PASSKEY_RELAYER_RP_ID", default_value = "localhost")]
    pub id: String,

    /// Relying party display name.
    #[arg(
        long = "rp-name",
        env = "PASSKEY_RELAYER_RP_NAME",
        default_value = crate::DEFAULT_RP_NAME
    )]
    pub name: String,

    /// Exact origin ceremonies must run on.
    #[arg(
        long = "rp-origin",
        env = "PASSKEY_RELAYER_RP_ORIGIN",
        default_value = "http://localhost:3000"
    )]
    pub origin: String,

    /// Reject assertions without the user-verified flag.
    #[arg(
        long = "require-user-verification",
        env = "PASSKEY_RELAYER_REQUIRE_USER_VERIFICATION",
        default_value = "true",
        action = ArgAction::Set
    )]
    pub require_user_verification: bool,
}

/// Logging configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Logging")]
pub struct LogArgs {
    /// Increase logging verbosity (1=ERROR, 2=WARN, 3=INFO, 4=DEBUG, 5=TRACE).
    #[arg(
        short = 'v',
        long = "verbose",
        action = ArgAction::Count,
        default_value = "3",
        env = "PASSKEY_RELAYER_LOG_LEVEL",
        global = true
    )]
    pub level: u8,

    /// Suppress stdout logging.
    #[arg(long = "quiet", short = 'q', global = true)]
    pub stdout_quiet: bool,

    /// Stdout log format.
    #[arg(
        long = "log-format",
        default_value = "full",
        env = "PASSKEY_RELAYER_LOG_FORMAT",
        global = true
    )]
    pub stdout_format: LogFormat,
}

/// Metrics server configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "Metrics")]
pub struct MetricsArgs {
    /// Enable the Prometheus metrics server.
    #[arg(
        id = "metrics_enabled",
        long = "metrics.enabled",
        env = "PASSKEY_RELAYER_METRICS_ENABLED",
        default_value = "false"
    )]
    pub enabled: bool,

    /// Metrics server bind address.
    #[arg(
        id = "metrics_addr",
        long = "metrics.addr",
        env = "PASSKEY_RELAYER_METRICS_ADDR",
        default_value = "0.0.0.0"
    )]
    pub addr: IpAddr,

    /// Metrics server port.
    #[arg(
        id = "metrics_port",
        long = "metrics.port",
        env = "PASSKEY_RELAYER_METRICS_PORT",
        default_value = "9090"
    )]
    pub port: u16,
}

/// RPC server configuration arguments.
#[derive(Debug, Clone, Parser)]
#[command(next_help_heading = "RPC Server")]
pub struct RpcServerArgs {
    /// RPC server bind address.
    #[arg(
        id = "rpc_addr",
        long = "rpc.addr",
        env = "PASSKEY_RELAYER_RPC_ADDR",
        default_value = "127.0.0.1"
    )]
    pub addr: IpAddr,

    /// RPC server port.
    #[arg(
        id = "rpc_port",
        long = "rpc.port",
        env = "PASSKEY_RELAYER_RPC_PORT",
        default_value = "8080"
    )]
    pub port: u16,
}

/// Parse a duration string like "30s", "5m", "1h".
fn parse_duration(s: &str) -> Result<Duration, humantime::DurationError> {
    humantime::parse_duration(s)
}

/// Parse an Ethereum address from hex string.
fn parse_address(s: &str) -> Result<Address, alloy_primitives::hex::FromHexError> {
    s.parse()
}

/// Parse a hex private key.
fn parse_private_key(s: &str) -> Result<PrivateKeySigner, String> {
    PrivateKeySigner::from_str(s).map_err(|_| "invalid private key".to_string())
}

/// Parse `<id>=<rpc-url>`.
fn parse_chain(s: &str) -> Result<ChainEndpoint, String> {
    let (id, url) = s.split_once('=').ok_or_else(|| format!("expected <id>=<rpc-url>, got {s}"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err("chain id must not be empty".to_string());
    }
    let rpc_url = Url::parse(url.trim()).map_err(|e| format!("invalid rpc url for {id}: {e}"))?;
    Ok(ChainEndpoint { id: id.to_string(), rpc_url })
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";

    fn minimal_args() -> Vec<&'static str> {
        vec![
            "passkey-relayer",
            "--chain",
            "localhost=http://localhost:8545",
            "--factory",
            "0x0BA5ED0c6AA8c49038F819E587E2633c4A9F428a",
            "--private-key",
            KEY,
        ]
    }

    #[test]
    fn test_parse_duration_valid() {
        assert_eq!(parse_duration("30s").unwrap(), Duration::from_secs(30));
        assert_eq!(parse_duration("5m").unwrap(), Duration::from_secs(300));
    }

    #[test]
    fn test_parse_chain() {
        let chain = parse_chain("base_sepolia=https://sepolia.base.org").unwrap();
        assert_eq!(chain.id, "base_sepolia");
        assert_eq!(chain.rpc_url.host_str(), Some("sepolia.base.org"));

        assert!(parse_chain("https://sepolia.base.org").is_err());
        assert!(parse_chain("=http://localhost:8545").is_err());
        assert!(parse_chain("localhost=not a url").is_err());
    }

    #[test]
    fn test_parse_private_key() {
        let signer = parse_private_key(KEY).unwrap();
        assert_eq!(
            signer.address(),
            "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".parse::<Address>().unwrap()
        );
        assert!(parse_private_key("0x1234").is_err());
    }

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::try_parse_from(minimal_args()).unwrap();

        assert_eq!(cli.wallet.chains.len(), 1);
        assert_eq!(cli.wallet.chains[0].id, "localhost");
        assert_eq!(cli.wallet.entry_point, crate::ENTRY_POINT_V06);
        assert_eq!(cli.wallet.paymaster, None);
        assert_eq!(cli.wallet.confirmations, 1);
        assert_eq!(cli.wallet.confirmation_timeout, Duration::from_secs(30));
        assert_eq!(cli.wallet.options_ttl, Duration::from_secs(300));
        assert_eq!(cli.wallet.store_sweep_interval, Duration::from_secs(60));

        assert_eq!(cli.relying_party.id, "localhost");
        assert_eq!(cli.relying_party.origin, "http://localhost:3000");
        assert!(cli.relying_party.require_user_verification);

        assert_eq!(cli.logging.level, 3);
        assert_eq!(cli.logging.stdout_format, LogFormat::Full);
        assert!(!cli.logging.stdout_quiet);

        assert!(!cli.metrics.enabled);
        assert_eq!(cli.metrics.port, 9090);

        assert_eq!(cli.rpc.addr, "127.0.0.1".parse::<IpAddr>().unwrap());
        assert_eq!(cli.rpc.port, 8080);
    }

    #[test]
    fn test_cli_multiple_chains() {
        let mut args = minimal_args();
        args.extend(["--chain", "a=http://a:8545,b=http://b:8545"]);
        let cli = Cli::try_parse_from(args).unwrap();
        let ids: Vec<_> = cli.wallet.chains.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["localhost", "a", "b"]);
    }

    #[test]
    fn test_cli_missing_required() {
        assert!(Cli::try_parse_from(["passkey-relayer"]).is_err());
        assert!(Cli::try_parse_from(&minimal_args()[..5]).is_err());
    }
}
