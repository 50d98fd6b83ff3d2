use crate::types::Endpoint;
use anyhow::Context;
use solana_sdk::{
    commitment_config::{CommitmentConfig, CommitmentLevel},
    pubkey::Pubkey,
};
use std::{path::PathBuf, str::FromStr, time::Duration};

/// Public mainnet endpoints, tried in order
pub const DEFAULT_RPC_ENDPOINTS: &[&str] = &[
    "https://api.mainnet-beta.solana.com",
    "https://solana-api.projectserum.com",
    "https://rpc.ankr.com/solana",
    "https://solana.public-rpc.com",
];

/// USDC
pub const DEFAULT_REFERENCE_MINT: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

pub const DEFAULT_PAIR_LISTING_URL: &str = "https://api.raydium.io/v2/main/pairs";
pub const DEFAULT_QUOTE_API_URL: &str = "https://quote-api.jup.ag/v6/quote";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// RPC endpoints in failover order
    pub rpc_endpoints: Vec<String>,

    /// Confirmation level for account reads
    pub commitment: CommitmentConfig,

    /// Asset every price is denominated in
    pub reference_mint: Pubkey,

    pub pair_listing: PairListingConfig,

    pub quote: QuoteConfig,

    pub retry: RetryConfig,

    /// Delay after each asset that touched the network
    pub asset_pacing: Duration,

    /// JSON asset catalog; built-in list when unset
    pub catalog_path: Option<PathBuf>,

    pub report: ReportConfig,
}

#[derive(Debug, Clone)]
pub struct PairListingConfig {
    pub url: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct QuoteConfig {
    pub url: String,

    /// Slippage tolerance in basis points
    pub slippage_bps: u16,

    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_attempts: u32,

    /// Backoff step for account and mint reads
    pub chain_read_backoff: Duration,

    /// Backoff step for pool discovery
    pub discovery_backoff: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            chain_read_backoff: Duration::from_millis(2000),
            discovery_backoff: Duration::from_millis(3000),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReportConfig {
    pub report_path: PathBuf,
    pub summary_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from any key/value source
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let rpc_endpoints: Vec<String> = match lookup("RPC_ENDPOINTS") {
            Some(list) => list
                .split(',')
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty())
                .collect(),
            None => DEFAULT_RPC_ENDPOINTS.iter().map(|url| url.to_string()).collect(),
        };
        if rpc_endpoints.is_empty() {
            anyhow::bail!("RPC_ENDPOINTS must name at least one endpoint");
        }

        let commitment = CommitmentLevel::from_str(&var("RPC_COMMITMENT", "confirmed"))
            .map_err(|e| anyhow::anyhow!("Invalid RPC_COMMITMENT: {}", e))?;

        let reference_mint = Pubkey::from_str(&var("REFERENCE_MINT", DEFAULT_REFERENCE_MINT))
            .context("Invalid REFERENCE_MINT")?;

        Ok(Config {
            rpc_endpoints,
            commitment: CommitmentConfig { commitment },
            reference_mint,
            pair_listing: PairListingConfig {
                url: var("PAIR_LISTING_URL", DEFAULT_PAIR_LISTING_URL),
                timeout: Duration::from_secs(
                    var("PAIR_LISTING_TIMEOUT_SECS", "10")
                        .parse()
                        .context("Invalid PAIR_LISTING_TIMEOUT_SECS")?,
                ),
            },
            quote: QuoteConfig {
                url: var("QUOTE_API_URL", DEFAULT_QUOTE_API_URL),
                slippage_bps: var("QUOTE_SLIPPAGE_BPS", "50")
                    .parse()
                    .context("Invalid QUOTE_SLIPPAGE_BPS")?,
                timeout: Duration::from_secs(
                    var("QUOTE_TIMEOUT_SECS", "8")
                        .parse()
                        .context("Invalid QUOTE_TIMEOUT_SECS")?,
                ),
            },
            retry: RetryConfig {
                max_attempts: var("RETRY_MAX_ATTEMPTS", "3")
                    .parse()
                    .context("Invalid RETRY_MAX_ATTEMPTS")?,
                chain_read_backoff: Duration::from_millis(
                    var("CHAIN_READ_BACKOFF_MS", "2000")
                        .parse()
                        .context("Invalid CHAIN_READ_BACKOFF_MS")?,
                ),
                discovery_backoff: Duration::from_millis(
                    var("DISCOVERY_BACKOFF_MS", "3000")
                        .parse()
                        .context("Invalid DISCOVERY_BACKOFF_MS")?,
                ),
            },
            asset_pacing: Duration::from_millis(
                var("ASSET_PACING_MS", "1500")
                    .parse()
                    .context("Invalid ASSET_PACING_MS")?,
            ),
            catalog_path: lookup("ASSET_CATALOG_PATH").map(PathBuf::from),
            report: ReportConfig {
                report_path: PathBuf::from(var("REPORT_PATH", "token_prices.json")),
                summary_path: PathBuf::from(var("PRICE_SUMMARY_PATH", "price_summary.json")),
            },
        })
    }

    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.rpc_endpoints
            .iter()
            .map(|url| Endpoint::new(url.clone(), self.commitment))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> anyhow::Result<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();

        assert_eq!(config.rpc_endpoints.len(), 4);
        assert_eq!(config.commitment, CommitmentConfig::confirmed());
        assert_eq!(config.reference_mint.to_string(), DEFAULT_REFERENCE_MINT);
        assert_eq!(config.quote.slippage_bps, 50);
        assert_eq!(config.quote.timeout, Duration::from_secs(8));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.chain_read_backoff, Duration::from_secs(2));
        assert_eq!(config.retry.discovery_backoff, Duration::from_secs(3));
        assert_eq!(config.asset_pacing, Duration::from_millis(1500));
        assert!(config.catalog_path.is_none());
    }

    #[test]
    fn test_endpoint_list_override() {
        let config = load(&[
            ("RPC_ENDPOINTS", "http://a, http://b,,"),
            ("RPC_COMMITMENT", "finalized"),
        ])
        .unwrap();

        let endpoints = config.endpoints();
        assert_eq!(endpoints.len(), 2);
        assert_eq!(endpoints[1].url, "http://b");
        assert_eq!(endpoints[0].commitment, CommitmentConfig::finalized());
    }

    #[test]
    fn test_empty_endpoint_list_is_fatal() {
        assert!(load(&[("RPC_ENDPOINTS", " , ")]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("REFERENCE_MINT", "not-a-key")]).is_err());
        assert!(load(&[("RETRY_MAX_ATTEMPTS", "three")]).is_err());
        assert!(load(&[("RPC_COMMITMENT", "eventually")]).is_err());
    }
}
