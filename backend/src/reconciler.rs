//! Price Reconciler
//!
//! Derives one asset's price twice, from a pool's raw reserves and from an
//! aggregator quote, and reports both with their divergence.
//!
//! # Architecture
//! ```text
//! Pool vaults    → reserve ratio  ─┐
//!                                  ├→ [Reconciler] → result + divergence
//! Jupiter quote  → implied price  ─┘
//! ```

use crate::{
    catalog::AssetEntry,
    discovery::{PairSource, PoolDiscovery},
    error::{ReconcileError, Result},
    ledger::LedgerClient,
    normalize::one_unit,
    pool_layout::PoolStateDecoder,
    quote_client::{QuoteRequest, QuoteSource},
    reserves::ReserveReader,
    retry::ResilientExecutor,
    types::{
        PoolAssignment, PoolBalances, PoolRef, PoolReserves, PriceQuote, PriceSource,
        ReconciliationResult, ReservePair,
    },
};
use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use std::{str::FromStr, sync::Arc, time::Duration};
use tracing::{debug, error, info, warn};

/// Per-run knobs for the reconciler
#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Asset every price is denominated in
    pub reference_mint: Pubkey,

    /// Delay after each asset that touched the network
    pub pacing: Duration,
}

/// Absolute and relative gap between the two prices
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    /// `|on_chain - aggregator|`, in reference units
    pub difference: f64,

    /// Difference relative to the on-chain price, in percent
    pub percent: f64,
}

/// Where the pool for an asset came from
enum PoolSelection {
    Supplied(Pubkey),
    Discovered(PoolRef),
}

impl PoolSelection {
    fn address(&self) -> Pubkey {
        match self {
            PoolSelection::Supplied(address) => *address,
            PoolSelection::Discovered(pool) => pool.address,
        }
    }
}

/// Prices one asset from both sources
pub struct PriceReconciler {
    /// Mint decimals lookups
    ledger: Arc<dyn LedgerClient>,

    /// Retry and failover around every chain read
    executor: Arc<ResilientExecutor>,

    /// Pair listing lookup for assets without a known pool
    discovery: PoolDiscovery,

    /// Pool state and vault balances
    reserves: ReserveReader,

    /// Aggregator quotes
    quotes: Arc<dyn QuoteSource>,

    settings: ReconcilerSettings,
}

impl PriceReconciler {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        pairs: Arc<dyn PairSource>,
        quotes: Arc<dyn QuoteSource>,
        decoder: Arc<dyn PoolStateDecoder>,
        executor: Arc<ResilientExecutor>,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            discovery: PoolDiscovery::new(pairs, Arc::clone(&executor)),
            reserves: ReserveReader::new(Arc::clone(&ledger), decoder, Arc::clone(&executor)),
            ledger,
            executor,
            quotes,
            settings,
        }
    }

    /// Reconcile one asset into a result record.
    ///
    /// Never fails: any error is captured in the record's `error` field so
    /// the caller can keep going with the next asset.
    pub async fn reconcile(&self, entry: &AssetEntry, token: &str) -> ReconciliationResult {
        let mint_text = entry.mint();

        let mint = match Pubkey::from_str(mint_text) {
            Ok(mint) => mint,
            Err(e) => {
                let err = ReconcileError::InvalidAddress(format!("{}: {}", mint_text, e));
                error!("Error processing {}: {}", token, err);
                return ReconciliationResult::failed(token, mint_text, err.to_string())
                    .with_supplied_pool(entry.known_pool());
            }
        };

        // The reference asset is priced by convention, not by lookup.
        if mint == self.settings.reference_mint {
            return self.reference_result(token, mint_text);
        }

        let result = match self.price_asset(&mint, entry.known_pool(), token).await {
            Ok(result) => result,
            Err(e) => {
                error!("Error processing {}: {}", token, e);
                ReconciliationResult::failed(token, mint_text, e.to_string())
                    .with_supplied_pool(entry.known_pool())
            }
        };

        if !self.settings.pacing.is_zero() {
            tokio::time::sleep(self.settings.pacing).await;
        }

        result
    }

    /// Fixed 1.0 on both sides for the reference asset
    fn reference_result(&self, token: &str, mint: &str) -> ReconciliationResult {
        let divergence = divergence(1.0, 1.0);

        ReconciliationResult {
            token: token.to_string(),
            mint: mint.to_string(),
            pool: PoolAssignment::NotApplicable,
            quotes: vec![
                PriceQuote {
                    price: 1.0,
                    source: PriceSource::OnChain,
                },
                PriceQuote {
                    price: 1.0,
                    source: PriceSource::Aggregator,
                },
            ],
            pool_balances: None,
            price_difference: divergence.map(|d| d.difference),
            divergence_pct: divergence.map(|d| d.percent),
            error: None,
            timestamp: Utc::now(),
        }
    }

    /// Get both prices for a non-reference asset
    ///
    /// # Algorithm
    /// 1. Fetch decimals for the asset and the reference asset (concurrently)
    /// 2. Use the supplied pool, or discover one
    /// 3. Read both vault balances and attribute them to asset/reference
    /// 4. On-chain price = reference balance / asset balance
    /// 5. Ask the aggregator for a one-unit swap into the reference asset
    /// 6. Compare the two when both exist
    async fn price_asset(
        &self,
        mint: &Pubkey,
        known_pool: Option<&str>,
        token: &str,
    ) -> Result<ReconciliationResult> {
        let reference = self.settings.reference_mint;

        let (asset_decimals, stable_decimals) =
            tokio::try_join!(self.fetch_decimals(mint), self.fetch_decimals(&reference))?;
        debug!(
            "Token decimals: {}, reference decimals: {}",
            asset_decimals, stable_decimals
        );

        let selection = self.resolve_pool(mint, known_pool).await?;
        let address = selection.address();
        let raw = self.reserves.read_reserves(&address).await?;

        let reversed = match &selection {
            PoolSelection::Discovered(pool) => pool.reversed,
            PoolSelection::Supplied(_) => pool_orientation(&raw, mint, &reference, &address)?,
        };
        let pair = ReservePair::orient(&raw, reversed, asset_decimals, stable_decimals);
        let (token_balance, stable_balance) = (pair.asset_balance(), pair.stable_balance());
        debug!(
            "Pool balances: {} {} / {} reference",
            token_balance, token, stable_balance
        );

        let on_chain = spot_price(token_balance, stable_balance);
        match on_chain {
            Some(price) => info!("On-chain Price: 1 {} = ${:.6}", token, price),
            None => warn!("Invalid pool balances for price calculation ({})", token),
        }

        let aggregator = self
            .quotes
            .implied_price(&QuoteRequest {
                input_mint: *mint,
                output_mint: reference,
                amount: one_unit(asset_decimals),
                input_decimals: asset_decimals,
                output_decimals: stable_decimals,
            })
            .await;
        match aggregator {
            Some(price) => info!("Jupiter Price: 1 {} = ${:.6}", token, price),
            None => info!("Jupiter price not available for {}", token),
        }

        let divergence = on_chain
            .zip(aggregator)
            .and_then(|(on_chain, aggregator)| divergence(on_chain, aggregator));
        if let Some(d) = divergence {
            info!(
                "Price Difference: {:.6} ({:.2}%)",
                d.difference, d.percent
            );
        }

        let quotes = [
            on_chain.map(|price| PriceQuote {
                price,
                source: PriceSource::OnChain,
            }),
            aggregator.map(|price| PriceQuote {
                price,
                source: PriceSource::Aggregator,
            }),
        ]
        .into_iter()
        .flatten()
        .collect();

        Ok(ReconciliationResult {
            token: token.to_string(),
            mint: mint.to_string(),
            pool: PoolAssignment::Resolved(PoolRef { address, reversed }),
            quotes,
            pool_balances: Some(PoolBalances {
                token_balance,
                stable_balance,
            }),
            price_difference: divergence.map(|d| d.difference),
            divergence_pct: divergence.map(|d| d.percent),
            error: None,
            timestamp: Utc::now(),
        })
    }

    async fn fetch_decimals(&self, mint: &Pubkey) -> Result<u8> {
        self.executor
            .chain_read("mint decimals", |endpoint| async move {
                self.ledger.get_mint_decimals(&endpoint, mint).await
            })
            .await
    }

    async fn resolve_pool(&self, mint: &Pubkey, known_pool: Option<&str>) -> Result<PoolSelection> {
        match known_pool {
            Some(text) => {
                let address = Pubkey::from_str(text)
                    .map_err(|e| ReconcileError::InvalidAddress(format!("{}: {}", text, e)))?;
                Ok(PoolSelection::Supplied(address))
            }
            None => {
                let pool = self
                    .discovery
                    .find_pool(mint, &self.settings.reference_mint)
                    .await?;
                Ok(PoolSelection::Discovered(pool))
            }
        }
    }
}

/// Spot price of the asset from normalized balances.
///
/// `None` unless both balances are strictly positive.
pub fn spot_price(asset_balance: f64, stable_balance: f64) -> Option<f64> {
    if asset_balance > 0.0 && stable_balance > 0.0 {
        Some(stable_balance / asset_balance)
    } else {
        None
    }
}

/// Compare the on-chain price against the aggregator price
///
/// # Formula
/// ```text
/// difference = |on_chain - aggregator|
/// percent    = difference / on_chain × 100
/// ```
///
/// # Example
/// ```text
/// on_chain = 50.0, aggregator = 49.0
/// difference = 1.0, percent = 2.0
/// ```
pub fn divergence(on_chain: f64, aggregator: f64) -> Option<Divergence> {
    if on_chain.is_nan() || on_chain <= 0.0 || !aggregator.is_finite() {
        return None;
    }

    let difference = (on_chain - aggregator).abs();
    Some(Divergence {
        difference,
        percent: difference / on_chain * 100.0,
    })
}

/// Orientation of a caller-supplied pool, checked against its mints
fn pool_orientation(
    reserves: &PoolReserves,
    asset: &Pubkey,
    reference: &Pubkey,
    pool: &Pubkey,
) -> Result<bool> {
    if reserves.base_mint == *asset && reserves.quote_mint == *reference {
        Ok(false)
    } else if reserves.base_mint == *reference && reserves.quote_mint == *asset {
        Ok(true)
    } else {
        Err(ReconcileError::PoolMismatch {
            pool: pool.to_string(),
            reason: format!(
                "pool pairs {} with {}, expected {} with {}",
                reserves.base_mint, reserves.quote_mint, asset, reference
            ),
        })
    }
}
