//! Shared fixtures for tests that need a whole simulated chain.

use crate::{
    config::{DEFAULT_REFERENCE_MINT, RetryConfig},
    discovery::MockPairSource,
    endpoint_pool::EndpointPool,
    error::ReconcileError,
    ledger::{MockLedgerClient, TokenProgram, decode_mint_decimals, mint_bytes},
    pool_layout::{DecodedPool, RaydiumAmmV4Layout, raydium_pool_bytes},
    quote_client::MockQuoteSource,
    reconciler::{PriceReconciler, ReconcilerSettings},
    reserves::vault_bytes,
    retry::ResilientExecutor,
    types::Endpoint,
};
use solana_sdk::{commitment_config::CommitmentConfig, pubkey::Pubkey};
use std::{collections::HashMap, str::FromStr, sync::Arc, time::Duration};

pub(crate) fn executor(endpoints: usize) -> Arc<ResilientExecutor> {
    let endpoints = (0..endpoints)
        .map(|i| Endpoint::new(format!("http://rpc-{}", i), CommitmentConfig::confirmed()))
        .collect();
    let retry = RetryConfig {
        max_attempts: 3,
        chain_read_backoff: Duration::ZERO,
        discovery_backoff: Duration::ZERO,
    };

    Arc::new(ResilientExecutor::new(
        Arc::new(EndpointPool::new(endpoints).unwrap()),
        &retry,
    ))
}

/// Mints, pools and vaults served by a mocked ledger
pub(crate) struct ChainFixture {
    pub reference: Pubkey,

    /// Delay handed to reconcilers built from this fixture
    pub pacing: Duration,

    accounts: HashMap<Pubkey, Vec<u8>>,

    /// SPL mint account images by mint
    mints: HashMap<Pubkey, Vec<u8>>,
}

impl ChainFixture {
    /// Starts with the USDC reference mint at 6 decimals
    pub fn new() -> Self {
        let reference = Pubkey::from_str(DEFAULT_REFERENCE_MINT).unwrap();
        Self {
            reference,
            pacing: Duration::ZERO,
            accounts: HashMap::new(),
            mints: HashMap::from([(reference, mint_bytes(6))]),
        }
    }

    pub fn mint(&mut self, decimals: u8) -> Pubkey {
        let mint = Pubkey::new_unique();
        self.mints.insert(mint, mint_bytes(decimals));
        mint
    }

    /// Raydium pool with funded vaults; returns the pool address
    pub fn pool(
        &mut self,
        base_mint: Pubkey,
        quote_mint: Pubkey,
        base_amount: u64,
        quote_amount: u64,
    ) -> Pubkey {
        let state = DecodedPool {
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            base_mint,
            quote_mint,
        };
        let address = Pubkey::new_unique();

        self.accounts.insert(address, raydium_pool_bytes(&state));
        self.accounts.insert(state.base_vault, vault_bytes(base_amount));
        self.accounts.insert(state.quote_vault, vault_bytes(quote_amount));
        address
    }

    pub fn ledger(&self) -> MockLedgerClient {
        let accounts = self.accounts.clone();
        let mints = self.mints.clone();

        let mut ledger = MockLedgerClient::new();
        ledger
            .expect_get_account_data()
            .returning(move |_, address| Ok(accounts.get(address).cloned()));
        ledger.expect_get_mint_decimals().returning(move |_, mint| {
            let data = mints.get(mint).ok_or_else(|| ReconcileError::InvalidMint {
                mint: mint.to_string(),
                reason: "unknown mint".to_string(),
            })?;
            decode_mint_decimals(mint, &TokenProgram::Spl.id(), data)
        });
        ledger
    }

    pub fn reconciler(&self, pairs: MockPairSource, quotes: MockQuoteSource) -> PriceReconciler {
        self.reconciler_with(self.ledger(), pairs, quotes)
    }

    pub fn reconciler_with(
        &self,
        ledger: MockLedgerClient,
        pairs: MockPairSource,
        quotes: MockQuoteSource,
    ) -> PriceReconciler {
        PriceReconciler::new(
            Arc::new(ledger),
            Arc::new(pairs),
            Arc::new(quotes),
            Arc::new(RaydiumAmmV4Layout),
            executor(1),
            ReconcilerSettings {
                reference_mint: self.reference,
                pacing: self.pacing,
            },
        )
    }
}
