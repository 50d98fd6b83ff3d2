//! Pool Discovery
//!
//! Locates the liquidity pool pairing an asset with the reference asset
//! by scanning an external pair listing.

use crate::{
    config::PairListingConfig,
    error::{ReconcileError, Result},
    retry::ResilientExecutor,
    types::PoolRef,
};
use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::{str::FromStr, sync::Arc};
use tracing::{debug, info};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; SolanaBot/1.0)";

/// One entry of the pair listing
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct PairRecord {
    #[serde(default, alias = "baseMint")]
    pub token_0_mint: String,

    #[serde(default, alias = "quoteMint")]
    pub token_1_mint: String,

    #[serde(default, alias = "ammId")]
    pub pool_id: String,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PairSource: Send + Sync {
    async fn fetch_pairs(&self) -> Result<Vec<PairRecord>>;
}

/// HTTP pair listing (Raydium `main/pairs` shape)
pub struct PairListingClient {
    http: reqwest::Client,
    url: String,
}

impl PairListingClient {
    pub fn new(config: &PairListingConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl PairSource for PairListingClient {
    async fn fetch_pairs(&self) -> Result<Vec<PairRecord>> {
        let response = self
            .http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReconcileError::http_status(status.as_u16(), "Pair listing"));
        }

        let body: serde_json::Value = response.json().await?;
        parse_pairs(body)
    }
}

/// Decode a listing body; anything but a JSON array is rejected
pub fn parse_pairs(body: serde_json::Value) -> Result<Vec<PairRecord>> {
    if !body.is_array() {
        return Err(ReconcileError::Parse("Invalid API response format".to_string()));
    }

    serde_json::from_value(body).map_err(|e| ReconcileError::Parse(format!("Invalid pair record: {}", e)))
}

/// Find the pool pairing `asset` with `reference`, in either order
pub fn match_pair(pairs: &[PairRecord], asset: &Pubkey, reference: &Pubkey) -> Result<PoolRef> {
    let asset = asset.to_string();
    let reference = reference.to_string();

    let pair = pairs
        .iter()
        .find(|p| {
            (p.token_0_mint == asset && p.token_1_mint == reference)
                || (p.token_0_mint == reference && p.token_1_mint == asset)
        })
        .ok_or_else(|| ReconcileError::PoolNotFound {
            asset: asset.clone(),
            reference: reference.clone(),
        })?;

    let address = Pubkey::from_str(&pair.pool_id)
        .map_err(|e| ReconcileError::InvalidAddress(format!("{}: {}", pair.pool_id, e)))?;

    Ok(PoolRef {
        address,
        reversed: pair.token_0_mint == reference,
    })
}

pub struct PoolDiscovery {
    source: Arc<dyn PairSource>,
    executor: Arc<ResilientExecutor>,
}

impl PoolDiscovery {
    pub fn new(source: Arc<dyn PairSource>, executor: Arc<ResilientExecutor>) -> Self {
        Self { source, executor }
    }

    pub async fn find_pool(&self, asset: &Pubkey, reference: &Pubkey) -> Result<PoolRef> {
        debug!("Searching pool for {}/{}...", asset, reference);

        let pool = self
            .executor
            .discovery("pool discovery", |_| async move {
                let pairs = self.source.fetch_pairs().await?;
                match_pair(&pairs, asset, reference)
            })
            .await?;

        info!("Found pool: {} (reversed: {})", pool.address, pool.reversed);
        Ok(pool)
    }
}
