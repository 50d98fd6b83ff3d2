mod catalog;
mod config;
mod discovery;
mod endpoint_pool;
mod error;
mod ledger;
mod normalize;
mod orchestrator;
mod pool_layout;
mod quote_client;
mod reconciler;
mod report;
mod reserves;
mod retry;
#[cfg(test)]
mod testing;
mod types;

use catalog::AssetCatalog;
use config::Config;
use discovery::PairListingClient;
use endpoint_pool::EndpointPool;
use ledger::SolanaLedger;
use orchestrator::BatchOrchestrator;
use pool_layout::RaydiumAmmV4Layout;
use quote_client::JupiterQuoteClient;
use reconciler::{PriceReconciler, ReconcilerSettings};
use report::{JsonFileSink, ResultSink};
use retry::ResilientExecutor;

use anyhow::Context;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging (RUST_LOG controls the level)
    tracing_subscriber::fmt::init();

    tracing::info!("🚀 Starting price reconciliation run...");

    // Load environment variables from .env file
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    let catalog = match &config.catalog_path {
        Some(path) => AssetCatalog::load(path)
            .await
            .with_context(|| format!("Failed to load asset catalog {}", path.display()))?,
        None => AssetCatalog::builtin(),
    };

    tracing::info!("🔗 Connecting to Solana...");
    let endpoints = config.endpoints();
    tracing::info!("Using {} RPC endpoint(s)", endpoints.len());
    let pool = Arc::new(EndpointPool::new(endpoints.clone())?);
    let ledger = Arc::new(SolanaLedger::new(&endpoints));
    let executor = Arc::new(ResilientExecutor::new(pool, &config.retry));

    let reconciler = PriceReconciler::new(
        ledger,
        Arc::new(PairListingClient::new(&config.pair_listing)?),
        Arc::new(JupiterQuoteClient::new(&config.quote)?),
        Arc::new(RaydiumAmmV4Layout),
        executor,
        ReconcilerSettings {
            reference_mint: config.reference_mint,
            pacing: config.asset_pacing,
        },
    );

    let report = BatchOrchestrator::new(reconciler, catalog).run().await;

    tracing::info!("📊 Total tokens: {}", report.summary.total);
    tracing::info!("✅ Successful: {}", report.summary.succeeded);
    tracing::info!("❌ Failed: {}", report.summary.failed);
    tracing::info!("📈 Success rate: {}", report.summary.success_rate_display());

    for result in &report.results {
        match &result.error {
            Some(e) => tracing::warn!("{}: {}", result.token, e),
            None => tracing::info!(
                "{}: on-chain {}, jupiter {}, pool {}",
                result.token,
                report::format_price(result.on_chain_price()),
                report::format_price(result.aggregator_price()),
                result.pool_display()
            ),
        }
    }

    let sink = JsonFileSink::new(&config.report);
    if let Err(e) = sink.write(&report).await {
        tracing::error!("Error saving results: {}", e);
    }

    Ok(())
}
