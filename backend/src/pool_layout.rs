use crate::error::{ReconcileError, Result};
use solana_sdk::pubkey::Pubkey;

/// Accounts referenced by a pool's state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedPool {
    pub base_vault: Pubkey,
    pub quote_vault: Pubkey,
    pub base_mint: Pubkey,
    pub quote_mint: Pubkey,
}

/// Decodes one AMM's pool-account schema
pub trait PoolStateDecoder: Send + Sync {
    fn decode(&self, data: &[u8]) -> Result<DecodedPool>;
}

/// Raydium AMM v4 (`675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8`) liquidity state.
///
/// 32 u64 fields and the swap accounting block precede the vaults.
pub struct RaydiumAmmV4Layout;

impl RaydiumAmmV4Layout {
    pub const ACCOUNT_LEN: usize = 752;
    pub const BASE_VAULT_OFFSET: usize = 336;
    pub const QUOTE_VAULT_OFFSET: usize = 368;
    pub const BASE_MINT_OFFSET: usize = 400;
    pub const QUOTE_MINT_OFFSET: usize = 432;
}

impl PoolStateDecoder for RaydiumAmmV4Layout {
    fn decode(&self, data: &[u8]) -> Result<DecodedPool> {
        if data.len() < Self::ACCOUNT_LEN {
            return Err(ReconcileError::InvalidPoolState(format!(
                "Raydium AMM v4 account is {} bytes, expected {}",
                data.len(),
                Self::ACCOUNT_LEN
            )));
        }

        Ok(DecodedPool {
            base_vault: read_pubkey(data, Self::BASE_VAULT_OFFSET)?,
            quote_vault: read_pubkey(data, Self::QUOTE_VAULT_OFFSET)?,
            base_mint: read_pubkey(data, Self::BASE_MINT_OFFSET)?,
            quote_mint: read_pubkey(data, Self::QUOTE_MINT_OFFSET)?,
        })
    }
}

fn read_pubkey(data: &[u8], offset: usize) -> Result<Pubkey> {
    data.get(offset..offset + 32)
        .and_then(|bytes| <[u8; 32]>::try_from(bytes).ok())
        .map(Pubkey::new_from_array)
        .ok_or_else(|| ReconcileError::InvalidPoolState(format!("no pubkey at offset {}", offset)))
}

/// Build a Raydium AMM v4 account image for tests
#[cfg(test)]
pub(crate) fn raydium_pool_bytes(pool: &DecodedPool) -> Vec<u8> {
    let mut data = vec![0u8; RaydiumAmmV4Layout::ACCOUNT_LEN];
    for (offset, key) in [
        (RaydiumAmmV4Layout::BASE_VAULT_OFFSET, pool.base_vault),
        (RaydiumAmmV4Layout::QUOTE_VAULT_OFFSET, pool.quote_vault),
        (RaydiumAmmV4Layout::BASE_MINT_OFFSET, pool.base_mint),
        (RaydiumAmmV4Layout::QUOTE_MINT_OFFSET, pool.quote_mint),
    ] {
        data[offset..offset + 32].copy_from_slice(key.as_ref());
    }
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecodedPool {
        DecodedPool {
            base_vault: Pubkey::new_unique(),
            quote_vault: Pubkey::new_unique(),
            base_mint: Pubkey::new_unique(),
            quote_mint: Pubkey::new_unique(),
        }
    }

    #[test]
    fn test_decode_raydium_v4() {
        let expected = sample();
        let decoded = RaydiumAmmV4Layout
            .decode(&raydium_pool_bytes(&expected))
            .unwrap();

        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_truncated_account_is_rejected() {
        let data = raydium_pool_bytes(&sample());
        let err = RaydiumAmmV4Layout.decode(&data[..400]).unwrap_err();

        assert!(matches!(err, ReconcileError::InvalidPoolState(_)));
    }
}
