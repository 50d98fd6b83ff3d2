use crate::{
    catalog::AssetCatalog,
    error::ReconcileError,
    reconciler::PriceReconciler,
    types::{BatchReport, ReconciliationResult, RunSummary},
};
use tracing::{info, warn};

/// Runs the reconciler over a whole catalog, one asset at a time.
pub struct BatchOrchestrator {
    /// Prices one asset per call; owns pacing between assets
    reconciler: PriceReconciler,

    /// Assets to process, in run order
    catalog: AssetCatalog,
}

impl BatchOrchestrator {
    pub fn new(reconciler: PriceReconciler, catalog: AssetCatalog) -> Self {
        Self {
            reconciler,
            catalog,
        }
    }

    /// Produces exactly one result per catalog entry, in catalog order.
    pub async fn run(&self) -> BatchReport {
        let total = self.catalog.len();
        info!("Processing {} tokens...", total);

        let mut results = Vec::with_capacity(total);
        for (position, entry) in self.catalog.entries().iter().enumerate() {
            let mint = entry.mint();

            if mint.is_empty() {
                let err = ReconcileError::EmptyAssetIdentifier { position };
                warn!("Skipping entry {}: {}", position, err);
                results.push(ReconciliationResult::failed(
                    self.catalog.display_name(mint),
                    mint,
                    err.to_string(),
                ));
                continue;
            }

            let token = self.catalog.display_name(mint);
            info!("[{}/{}] Processing {} ({})", position + 1, total, token, mint);
            results.push(self.reconciler.reconcile(entry, &token).await);
        }

        let summary = RunSummary::from_results(&results);
        info!(
            "Successful: {}/{} ({})",
            summary.succeeded,
            summary.total,
            summary.success_rate_display()
        );

        BatchReport { summary, results }
    }
}
