use crate::normalize::normalize;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};

/// A network address the ledger client can talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub url: String,
    pub commitment: CommitmentConfig,
}

impl Endpoint {
    pub fn new(url: impl Into<String>, commitment: CommitmentConfig) -> Self {
        Self {
            url: url.into(),
            commitment,
        }
    }
}

fn serialize_pubkey<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(key)
}

/// A liquidity pool located for one asset/reference pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolRef {
    #[serde(serialize_with = "serialize_pubkey")]
    pub address: Pubkey,

    /// True when the reference asset is the pool's first (base) constituent
    pub reversed: bool,
}

/// How a result relates to a pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PoolAssignment {
    /// The reference asset is priced without a pool
    NotApplicable,

    /// Failed before any pool was known
    Unresolved,

    /// Caller-supplied address that was never validated
    Supplied { address: String },

    /// Pool the prices were read from
    Resolved(PoolRef),
}

impl PoolAssignment {
    /// Address for display, "N/A" when there is none
    pub fn display(&self) -> String {
        match self {
            PoolAssignment::NotApplicable | PoolAssignment::Unresolved => "N/A".to_string(),
            PoolAssignment::Supplied { address } => address.clone(),
            PoolAssignment::Resolved(pool) => pool.address.to_string(),
        }
    }
}

/// Raw vault balances as read from chain, in pool (base, quote) order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolReserves {
    pub base_amount: u64,
    pub quote_amount: u64,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
}

/// Pool balances attributed to the priced asset and the reference asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservePair {
    pub asset_amount: u64,
    pub asset_decimals: u8,
    pub stable_amount: u64,
    pub stable_decimals: u8,
}

impl ReservePair {
    /// Attribute the pool sides using the `reversed` flag.
    pub fn orient(
        reserves: &PoolReserves,
        reversed: bool,
        asset_decimals: u8,
        stable_decimals: u8,
    ) -> Self {
        let (asset_amount, stable_amount) = if reversed {
            (reserves.quote_amount, reserves.base_amount)
        } else {
            (reserves.base_amount, reserves.quote_amount)
        };

        Self {
            asset_amount,
            asset_decimals,
            stable_amount,
            stable_decimals,
        }
    }

    pub fn asset_balance(&self) -> f64 {
        normalize(self.asset_amount, self.asset_decimals)
    }

    pub fn stable_balance(&self) -> f64 {
        normalize(self.stable_amount, self.stable_decimals)
    }
}

/// Where a price came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PriceSource {
    #[serde(rename = "on-chain")]
    OnChain,
    #[serde(rename = "aggregator")]
    Aggregator,
}

/// Price of one asset in units of the reference asset
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PriceQuote {
    pub price: f64,
    pub source: PriceSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolBalances {
    pub token_balance: f64,
    pub stable_balance: f64,
}

/// One record per asset per run
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationResult {
    pub token: String,
    pub mint: String,

    pub pool: PoolAssignment,

    pub quotes: Vec<PriceQuote>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_balances: Option<PoolBalances>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_difference: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub divergence_pct: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl ReconciliationResult {
    /// Record for an asset whose reconciliation failed
    pub fn failed(token: impl Into<String>, mint: impl Into<String>, error: String) -> Self {
        Self {
            token: token.into(),
            mint: mint.into(),
            pool: PoolAssignment::Unresolved,
            quotes: Vec::new(),
            pool_balances: None,
            price_difference: None,
            divergence_pct: None,
            error: Some(error),
            timestamp: Utc::now(),
        }
    }

    /// Keep the caller-supplied pool on a failed record
    pub fn with_supplied_pool(mut self, address: Option<&str>) -> Self {
        if let Some(address) = address {
            self.pool = PoolAssignment::Supplied {
                address: address.to_string(),
            };
        }
        self
    }

    pub fn price(&self, source: PriceSource) -> Option<f64> {
        self.quotes
            .iter()
            .find(|quote| quote.source == source)
            .map(|quote| quote.price)
    }

    pub fn on_chain_price(&self) -> Option<f64> {
        self.price(PriceSource::OnChain)
    }

    pub fn aggregator_price(&self) -> Option<f64> {
        self.price(PriceSource::Aggregator)
    }

    pub fn pool_display(&self) -> String {
        self.pool.display()
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counts derived from a run's results
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub success_rate: f64,
    pub timestamp: DateTime<Utc>,
}

impl RunSummary {
    pub fn from_results(results: &[ReconciliationResult]) -> Self {
        let total = results.len();
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        let success_rate = if total == 0 {
            0.0
        } else {
            succeeded as f64 / total as f64
        };

        Self {
            total,
            succeeded,
            failed: total - succeeded,
            success_rate,
            timestamp: Utc::now(),
        }
    }

    /// Success rate as a percentage string, e.g. "66.7%"
    pub fn success_rate_display(&self) -> String {
        format!("{:.1}%", self.success_rate * 100.0)
    }
}

/// Everything a run produces
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub summary: RunSummary,
    pub results: Vec<ReconciliationResult>,
}
