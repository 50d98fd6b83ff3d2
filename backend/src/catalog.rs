use crate::error::{ReconcileError, Result};
use serde::Deserialize;
use std::{collections::HashMap, path::Path};
use tracing::info;

/// Mint → symbol for well-known tokens
const KNOWN_SYMBOLS: &[(&str, &str)] = &[
    ("So11111111111111111111111111111111111111112", "SOL"),
    ("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v", "USDC"),
    ("7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs", "WETH"),
    ("Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB", "USDT"),
    ("mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So", "mSOL"),
    ("7dHbWXmci3dT8UFYWYZweBLXgycu7Y3iL6trKn1Y7ARj", "stSOL"),
    ("bSo13r4TkiE4KumL71LsHTPpL2euBYLFx6h9HP3piy1", "bSOL"),
    ("J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn", "jitoSOL"),
    ("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263", "BONK"),
    ("EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm", "WIF"),
    ("HhJpBhRRn4g56VsyLuT8DL5Bv31HkXqsrahTTUCZeZg4", "BOME"),
    ("CKfatsPMUf8SkiURsDXs7eK6GWb4Jsd6UDbs7twMCWxo", "POPCAT"),
    ("85VBFQZC9TZkfaptBWjvUw7YbZjy52A6mjtPGjstQAmQ", "W"),
    ("27G8MtK7VtTcCHkpASjSDdkWWYfoqT6ggEuKidVJidD4", "JLP"),
    ("A9mUU4qviSctJVPJdBJWkb28deg915LYJKrzQ19ji3FM", "USDCet"),
    ("hntyVP6YFm1Hg25TN9WGLqM12b8TQmcknKrdu1oxWux", "HNT"),
    ("rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof", "RENDER"),
    ("JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN", "JUP"),
    ("MEW1gQWJ3nEXg2qgERiKu7FAFj79PHvQVREQUzScPP5", "MEW"),
    ("Df6yfrKC8kZE3KNkrHERKzAetSxbrWeniQfyJY4Jpump", "CHILLGUY"),
];

/// Built-in run order; the reference asset goes last
const DEFAULT_ASSETS: &[&str] = &[
    "So11111111111111111111111111111111111111112",
    "7vfCXTUXx5WJV5JADk17DUJ4ksgau7utNKj4b963voxs",
    "Es9vMFrzaCERmJfrF4H2FYD4KCoNkY11McCe8BenwNYB",
    "mSoLzYCxHdYgdzU16g5QSh3i5K3z3KZK7ytfqcJm7So",
    "7dHbWXmci3dT8UFYWYZweBLXgycu7Y3iL6trKn1Y7ARj",
    "bSo13r4TkiE4KumL71LsHTPpL2euBYLFx6h9HP3piy1",
    "J1toso1uCk3RLmjorhTtrVwY9HJ7X8V9yYac6Y7kGCPn",
    "DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263",
    "EKpQGSJtjMFqKZ9KQanSqYXRcF8fBopzLHYxdM65zcjm",
    "HhJpBhRRn4g56VsyLuT8DL5Bv31HkXqsrahTTUCZeZg4",
    "CKfatsPMUf8SkiURsDXs7eK6GWb4Jsd6UDbs7twMCWxo",
    "85VBFQZC9TZkfaptBWjvUw7YbZjy52A6mjtPGjstQAmQ",
    "27G8MtK7VtTcCHkpASjSDdkWWYfoqT6ggEuKidVJidD4",
    "A9mUU4qviSctJVPJdBJWkb28deg915LYJKrzQ19ji3FM",
    "hntyVP6YFm1Hg25TN9WGLqM12b8TQmcknKrdu1oxWux",
    "rndrizKT3MK1iimdxRdWabcF7Zg7AR5T4nud4EkHBof",
    "JUPyiwrYJFskUPiHa7hkeR8VUtAeFoSYbKedZNsDvCN",
    "MEW1gQWJ3nEXg2qgERiKu7FAFj79PHvQVREQUzScPP5",
    "Df6yfrKC8kZE3KNkrHERKzAetSxbrWeniQfyJY4Jpump",
    "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v",
];

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct AssetEntry {
    /// Base58 mint address, possibly padded with whitespace
    #[serde(default)]
    pub mint: String,

    /// Known pool address; discovered when absent
    #[serde(default)]
    pub pool: Option<String>,

    /// Display symbol overriding the built-in table
    #[serde(default)]
    pub symbol: Option<String>,
}

impl AssetEntry {
    pub fn new(mint: impl Into<String>) -> Self {
        Self {
            mint: mint.into(),
            ..Self::default()
        }
    }

    pub fn with_pool(mut self, pool: impl Into<String>) -> Self {
        self.pool = Some(pool.into());
        self
    }

    pub fn mint(&self) -> &str {
        self.mint.trim()
    }

    /// Caller-supplied pool, treating blanks as absent
    pub fn known_pool(&self) -> Option<&str> {
        self.pool.as_deref().map(str::trim).filter(|pool| !pool.is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    assets: Vec<AssetEntry>,
}

/// Ordered asset list plus display names
#[derive(Debug, Clone)]
pub struct AssetCatalog {
    /// Run order, blanks included
    entries: Vec<AssetEntry>,

    /// Mint → display symbol; entry symbols override the built-in table
    names: HashMap<String, String>,
}

impl AssetCatalog {
    pub fn new(entries: Vec<AssetEntry>) -> Self {
        let mut names: HashMap<String, String> = KNOWN_SYMBOLS
            .iter()
            .map(|(mint, symbol)| (mint.to_string(), symbol.to_string()))
            .collect();

        for entry in &entries {
            if let Some(symbol) = &entry.symbol {
                names.insert(entry.mint().to_string(), symbol.clone());
            }
        }

        Self { entries, names }
    }

    pub fn builtin() -> Self {
        Self::new(DEFAULT_ASSETS.iter().map(|mint| AssetEntry::new(*mint)).collect())
    }

    /// Parse `{ "assets": [{ "mint", "pool"?, "symbol"? }] }`
    pub fn from_json(json: &str) -> Result<Self> {
        let file: CatalogFile = serde_json::from_str(json)
            .map_err(|e| ReconcileError::Config(format!("Invalid asset catalog: {}", e)))?;

        Ok(Self::new(file.assets))
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let json = tokio::fs::read_to_string(path).await?;
        let catalog = Self::from_json(&json)?;
        info!("Loaded {} assets from {}", catalog.len(), path.display());
        Ok(catalog)
    }

    pub fn entries(&self) -> &[AssetEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn display_name(&self, mint: &str) -> String {
        if mint.is_empty() {
            return "Unknown".to_string();
        }

        self.names
            .get(mint)
            .cloned()
            .unwrap_or_else(|| mint.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog() {
        let catalog = AssetCatalog::builtin();

        assert_eq!(catalog.len(), 20);
        assert_eq!(catalog.display_name(catalog.entries()[0].mint()), "SOL");
        assert_eq!(
            catalog.entries().last().unwrap().mint(),
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v"
        );
        assert!(catalog.entries().iter().all(|entry| entry.known_pool().is_none()));
    }

    #[test]
    fn test_display_name_fallbacks() {
        let catalog = AssetCatalog::new(Vec::new());

        assert_eq!(catalog.display_name("DezXAZ8z7PnrnRJjz3wXBoRgixCa6xjnB7YaB1pPB263"), "BONK");
        assert_eq!(catalog.display_name("SomeUnlistedMint111"), "SomeUnlistedMint111");
        assert_eq!(catalog.display_name(""), "Unknown");
    }

    #[test]
    fn test_catalog_from_json() {
        let catalog = AssetCatalog::from_json(
            r#"{ "assets": [
                { "mint": "MyMint1111", "pool": "PoolAddr1111", "symbol": "MINE" },
                { "mint": "So11111111111111111111111111111111111111112", "pool": "  " },
                { "mint": "" }
            ] }"#,
        )
        .unwrap();

        let entries = catalog.entries();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].known_pool(), Some("PoolAddr1111"));
        assert_eq!(entries[1].known_pool(), None);
        assert_eq!(entries[2].mint(), "");
        assert_eq!(catalog.display_name("MyMint1111"), "MINE");
    }

    #[test]
    fn test_malformed_catalog_is_config_error() {
        assert!(matches!(
            AssetCatalog::from_json("[1, 2, 3]"),
            Err(ReconcileError::Config(_))
        ));
    }
}
