//! Reserve Reader
//!
//! Reads a pool's state account, decodes its vault addresses and then
//! reads both vault balances concurrently. Every read goes through the
//! resilient executor and may rotate the RPC endpoint.

use crate::{
    error::{ReconcileError, Result},
    ledger::LedgerClient,
    pool_layout::{DecodedPool, PoolStateDecoder},
    retry::ResilientExecutor,
    types::PoolReserves,
};
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use tracing::debug;

/// SPL token account `amount` field
pub const VAULT_AMOUNT_OFFSET: usize = 64;
pub const VAULT_MIN_LEN: usize = VAULT_AMOUNT_OFFSET + 8;

pub struct ReserveReader {
    ledger: Arc<dyn LedgerClient>,
    decoder: Arc<dyn PoolStateDecoder>,
    executor: Arc<ResilientExecutor>,
}

impl ReserveReader {
    pub fn new(
        ledger: Arc<dyn LedgerClient>,
        decoder: Arc<dyn PoolStateDecoder>,
        executor: Arc<ResilientExecutor>,
    ) -> Self {
        Self {
            ledger,
            decoder,
            executor,
        }
    }

    /// Read both vault balances of a pool, in (base, quote) order
    pub async fn read_reserves(&self, pool: &Pubkey) -> Result<PoolReserves> {
        let state = self.read_pool_state(pool).await?;
        debug!("Vault A: {}", state.base_vault);
        debug!("Vault B: {}", state.quote_vault);

        let (base_amount, quote_amount) = tokio::try_join!(
            self.read_vault_balance(&state.base_vault),
            self.read_vault_balance(&state.quote_vault),
        )?;

        Ok(PoolReserves {
            base_amount,
            quote_amount,
            base_mint: state.base_mint,
            quote_mint: state.quote_mint,
        })
    }

    pub async fn read_pool_state(&self, pool: &Pubkey) -> Result<DecodedPool> {
        self.executor
            .chain_read("pool state", |endpoint| async move {
                let data = self
                    .ledger
                    .get_account_data(&endpoint, pool)
                    .await?
                    .ok_or_else(|| ReconcileError::AccountNotFound(pool.to_string()))?;
                self.decoder.decode(&data)
            })
            .await
    }

    pub async fn read_vault_balance(&self, vault: &Pubkey) -> Result<u64> {
        self.executor
            .chain_read("vault balance", |endpoint| async move {
                let data = self.ledger.get_account_data(&endpoint, vault).await?;
                decode_vault_amount(vault, data.as_deref())
            })
            .await
    }
}

/// Little-endian u64 token amount of a vault account
pub fn decode_vault_amount(vault: &Pubkey, data: Option<&[u8]>) -> Result<u64> {
    let data = data.ok_or_else(|| ReconcileError::InvalidVaultData {
        vault: vault.to_string(),
        reason: "account not found".to_string(),
    })?;

    let bytes: [u8; 8] = data
        .get(VAULT_AMOUNT_OFFSET..VAULT_MIN_LEN)
        .and_then(|slice| <[u8; 8]>::try_from(slice).ok())
        .ok_or_else(|| ReconcileError::InvalidVaultData {
            vault: vault.to_string(),
            reason: format!("account data too small ({} bytes)", data.len()),
        })?;

    Ok(u64::from_le_bytes(bytes))
}

/// Build an SPL token account image holding `amount` for tests
#[cfg(test)]
pub(crate) fn vault_bytes(amount: u64) -> Vec<u8> {
    let mut data = vec![0u8; 165];
    data[VAULT_AMOUNT_OFFSET..VAULT_MIN_LEN].copy_from_slice(&amount.to_le_bytes());
    data
}
