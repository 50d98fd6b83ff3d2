use crate::{
    config::QuoteConfig,
    error::{ReconcileError, Result},
    normalize::normalize,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, warn};

const USER_AGENT: &str = "Mozilla/5.0 (compatible; SolanaBot/1.0)";

/// A swap to price through the aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuoteRequest {
    pub input_mint: Pubkey,
    pub output_mint: Pubkey,

    /// Raw amount in the input mint's native precision
    pub amount: u64,

    pub input_decimals: u8,
    pub output_decimals: u8,
}

/// Source of aggregator-implied prices.
///
/// Unavailability is expected and reported as `None`, never as an error.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn implied_price(&self, request: &QuoteRequest) -> Option<f64>;
}

#[derive(Debug, Serialize)]
struct QuoteQuery {
    #[serde(rename = "inputMint")]
    input_mint: String,
    #[serde(rename = "outputMint")]
    output_mint: String,
    amount: u64,
    #[serde(rename = "slippageBps")]
    slippage_bps: u16,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(rename = "outAmount")]
    out_amount: Option<serde_json::Value>,
}

/// Jupiter v6 quote API client
pub struct JupiterQuoteClient {
    http: reqwest::Client,
    url: String,
    slippage_bps: u16,
}

impl JupiterQuoteClient {
    pub fn new(config: &QuoteConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            url: config.url.clone(),
            slippage_bps: config.slippage_bps,
        })
    }

    fn build_quote(&self, request: &QuoteRequest) -> reqwest::RequestBuilder {
        let query = QuoteQuery {
            input_mint: request.input_mint.to_string(),
            output_mint: request.output_mint.to_string(),
            amount: request.amount,
            slippage_bps: self.slippage_bps,
        };

        self.http
            .get(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .query(&query)
    }

    /// Request a quote and return the raw output amount
    async fn fetch_out_amount(&self, request: &QuoteRequest) -> Result<u64> {
        let response = self.build_quote(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ReconcileError::http_status(status.as_u16(), "Jupiter quote"));
        }

        let body: QuoteResponse = response.json().await?;
        debug!("Jupiter quote for {}: {:?}", request.input_mint, body);

        parse_out_amount(body.out_amount)
    }
}

#[async_trait]
impl QuoteSource for JupiterQuoteClient {
    async fn implied_price(&self, request: &QuoteRequest) -> Option<f64> {
        match self.fetch_out_amount(request).await {
            Ok(out_amount) => implied_price(request, out_amount),
            Err(e) => {
                warn!("Jupiter price fetch error for {}: {}", request.input_mint, e);
                None
            }
        }
    }
}

/// `outAmount` arrives as a decimal string; tolerate a bare number
fn parse_out_amount(value: Option<serde_json::Value>) -> Result<u64> {
    let missing = || ReconcileError::Parse("Invalid Jupiter response: No outAmount found".to_string());

    match value.ok_or_else(missing)? {
        serde_json::Value::String(text) => text
            .parse()
            .map_err(|e| ReconcileError::Parse(format!("Invalid outAmount {:?}: {}", text, e))),
        serde_json::Value::Number(number) => number.as_u64().ok_or_else(missing),
        _ => Err(missing()),
    }
}

/// `(out / 10^out_dec) / (in / 10^in_dec)`; `None` for a zero input
pub fn implied_price(request: &QuoteRequest, out_amount: u64) -> Option<f64> {
    let input = normalize(request.amount, request.input_decimals);
    if input <= 0.0 {
        return None;
    }

    Some(normalize(out_amount, request.output_decimals) / input)
}
