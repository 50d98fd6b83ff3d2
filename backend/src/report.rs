use crate::{
    config::ReportConfig,
    error::{ReconcileError, Result},
    types::{BatchReport, ReconciliationResult, RunSummary},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

/// Destination for a finished run
#[async_trait]
pub trait ResultSink: Send + Sync {
    async fn write(&self, report: &BatchReport) -> Result<()>;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDocument {
    total_tokens: usize,
    successful: usize,
    failed: usize,

    /// Percentage with two decimals, e.g. "95.00%"
    success_rate: String,

    /// When the run finished
    timestamp: DateTime<Utc>,
}

impl From<&RunSummary> for SummaryDocument {
    fn from(summary: &RunSummary) -> Self {
        Self {
            total_tokens: summary.total,
            successful: summary.succeeded,
            failed: summary.failed,
            success_rate: summary.success_rate_display(),
            timestamp: summary.timestamp,
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportDocument<'a> {
    summary: SummaryDocument,
    results: &'a [ReconciliationResult],
}

/// One line of the human-readable price summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLine {
    /// Display symbol
    pub token: String,

    /// Pool-derived price as "$x.xxxxxx" or "N/A"
    pub on_chain_price: String,

    /// Aggregator-implied price, same format
    pub aggregator_price: String,
}

/// "$x.xxxxxx", or "N/A" when the price is missing or zero
pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(price) if price != 0.0 => format!("${:.6}", price),
        _ => "N/A".to_string(),
    }
}

/// Results with at least one nonzero price, formatted for display
pub fn price_summary(results: &[ReconciliationResult]) -> Vec<PriceLine> {
    let has_price = |price: Option<f64>| price.is_some_and(|p| p != 0.0);

    results
        .iter()
        .filter(|r| has_price(r.on_chain_price()) || has_price(r.aggregator_price()))
        .map(|r| PriceLine {
            token: r.token.clone(),
            on_chain_price: format_price(r.on_chain_price()),
            aggregator_price: format_price(r.aggregator_price()),
        })
        .collect()
}

/// Writes the full report and the price summary as pretty-printed JSON
pub struct JsonFileSink {
    /// Full report: summary plus every result
    report_path: PathBuf,

    /// Priced assets only
    summary_path: PathBuf,
}

impl JsonFileSink {
    pub fn new(config: &ReportConfig) -> Self {
        Self {
            report_path: config.report_path.clone(),
            summary_path: config.summary_path.clone(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| ReconcileError::Parse(e.to_string()))
}

#[async_trait]
impl ResultSink for JsonFileSink {
    async fn write(&self, report: &BatchReport) -> Result<()> {
        let document = ReportDocument {
            summary: SummaryDocument::from(&report.summary),
            results: &report.results,
        };
        tokio::fs::write(&self.report_path, to_json(&document)?).await?;
        info!("Results saved to: {}", self.report_path.display());

        let lines = price_summary(&report.results);
        tokio::fs::write(&self.summary_path, to_json(&lines)?).await?;
        info!("Price summary saved to: {}", self.summary_path.display());

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{PriceQuote, PriceSource};

    fn priced(token: &str, on_chain: Option<f64>, aggregator: Option<f64>) -> ReconciliationResult {
        let mut result = ReconciliationResult::failed(token, "mint", String::new());
        result.error = None;
        result.quotes = [
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
        result
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price(Some(150.25)), "$150.250000");
        assert_eq!(format_price(Some(0.000021)), "$0.000021");
        assert_eq!(format_price(Some(0.0)), "N/A");
        assert_eq!(format_price(None), "N/A");
    }

    #[test]
    fn test_price_summary_skips_unpriced() {
        let results = vec![
            priced("SOL", Some(150.0), Some(149.5)),
            priced("WIF", None, Some(2.5)),
            priced("DEAD", None, None),
            ReconciliationResult::failed("BONK", "Dez", "No pool found".to_string()),
        ];

        let lines = price_summary(&results);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].on_chain_price, "$150.000000");
        assert_eq!(lines[1].token, "WIF");
        assert_eq!(lines[1].on_chain_price, "N/A");
    }

    #[tokio::test]
    async fn test_json_sink_writes_both_files() {
        let dir = std::env::temp_dir().join(format!("reconciler-report-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let sink = JsonFileSink::new(&ReportConfig {
            report_path: dir.join("token_prices.json"),
            summary_path: dir.join("price_summary.json"),
        });

        let results = vec![
            priced("SOL", Some(150.0), None),
            ReconciliationResult::failed("BONK", "Dez", "boom".to_string()),
        ];
        let report = BatchReport {
            summary: RunSummary::from_results(&results),
            results,
        };
        sink.write(&report).await.unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(dir.join("token_prices.json")).await.unwrap())
                .unwrap();
        assert_eq!(written["summary"]["totalTokens"], 2);
        assert_eq!(written["summary"]["successRate"], "50.0%");
        assert_eq!(written["results"][1]["error"], "boom");
        assert_eq!(written["results"][0]["quotes"][0]["source"], "on-chain");

        let summary: serde_json::Value =
            serde_json::from_str(&tokio::fs::read_to_string(dir.join("price_summary.json")).await.unwrap())
                .unwrap();
        assert_eq!(summary.as_array().unwrap().len(), 1);
        assert_eq!(summary[0]["aggregatorPrice"], "N/A");

        tokio::fs::remove_dir_all(&dir).await.ok();
    }
}
