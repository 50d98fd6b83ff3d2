use crate::{
    error::{FailureClass, ReconcileError, Result, classify_message, classify_status},
    types::Endpoint,
};
use async_trait::async_trait;
use solana_client::{
    client_error::{ClientError, ClientErrorKind},
    nonblocking::rpc_client::RpcClient,
};
use solana_sdk::{account::Account, pubkey::Pubkey};
use spl_token::solana_program::program_pack::Pack;
use spl_token_2022::extension::StateWithExtensions;
use std::collections::HashMap;
use tracing::debug;

/// Read access to ledger state through a specific endpoint
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Raw account bytes, or `None` if the account does not exist
    async fn get_account_data(&self, endpoint: &Endpoint, address: &Pubkey)
    -> Result<Option<Vec<u8>>>;

    /// Decimal precision of a token mint
    async fn get_mint_decimals(&self, endpoint: &Endpoint, mint: &Pubkey) -> Result<u8>;
}

/// Ledger client backed by Solana JSON-RPC, one client per endpoint
pub struct SolanaLedger {
    clients: HashMap<String, RpcClient>,
}

impl SolanaLedger {
    pub fn new(endpoints: &[Endpoint]) -> Self {
        let clients = endpoints
            .iter()
            .map(|endpoint| {
                (
                    endpoint.url.clone(),
                    RpcClient::new_with_commitment(endpoint.url.clone(), endpoint.commitment),
                )
            })
            .collect();

        Self { clients }
    }

    fn client(&self, endpoint: &Endpoint) -> Result<&RpcClient> {
        self.clients
            .get(&endpoint.url)
            .ok_or_else(|| ReconcileError::Config(format!("Unknown RPC endpoint {}", endpoint.url)))
    }

    /// Full account (owner included), or `None` if it does not exist
    async fn fetch_account(&self, endpoint: &Endpoint, address: &Pubkey) -> Result<Option<Account>> {
        debug!("Fetching account {} from {}", address, endpoint.url);

        let response = self
            .client(endpoint)?
            .get_account_with_commitment(address, endpoint.commitment)
            .await
            .map_err(rpc_error)?;

        Ok(response.value)
    }
}

#[async_trait]
impl LedgerClient for SolanaLedger {
    async fn get_account_data(
        &self,
        endpoint: &Endpoint,
        address: &Pubkey,
    ) -> Result<Option<Vec<u8>>> {
        Ok(self
            .fetch_account(endpoint, address)
            .await?
            .map(|account| account.data))
    }

    async fn get_mint_decimals(&self, endpoint: &Endpoint, mint: &Pubkey) -> Result<u8> {
        let account = self
            .fetch_account(endpoint, mint)
            .await?
            .ok_or_else(|| ReconcileError::AccountNotFound(mint.to_string()))?;

        decode_mint_decimals(mint, &account.owner, &account.data)
    }
}

/// Which token program owns a mint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenProgram {
    Spl,
    Token2022,
}

impl TokenProgram {
    pub fn of(owner: &Pubkey) -> Option<Self> {
        [TokenProgram::Spl, TokenProgram::Token2022]
            .into_iter()
            .find(|program| program.id() == *owner)
    }

    /// Program id as this crate's `Pubkey`; the SPL crates may carry their own
    pub fn id(self) -> Pubkey {
        let id = match self {
            TokenProgram::Spl => spl_token::id().to_bytes(),
            TokenProgram::Token2022 => spl_token_2022::id().to_bytes(),
        };
        Pubkey::new_from_array(id)
    }
}

/// Decimals of an initialized SPL Token or Token-2022 mint.
///
/// Anything else (token accounts, uninitialized mints, accounts owned by
/// another program) is `InvalidMint`.
pub fn decode_mint_decimals(mint: &Pubkey, owner: &Pubkey, data: &[u8]) -> Result<u8> {
    let invalid = |reason: String| ReconcileError::InvalidMint {
        mint: mint.to_string(),
        reason,
    };

    match TokenProgram::of(owner) {
        Some(TokenProgram::Spl) => spl_token::state::Mint::unpack(data)
            .map(|state| state.decimals)
            .map_err(|e| invalid(format!("not an SPL Token mint: {}", e))),
        Some(TokenProgram::Token2022) => {
            StateWithExtensions::<spl_token_2022::state::Mint>::unpack(data)
                .map(|state| state.base.decimals)
                .map_err(|e| invalid(format!("not a Token-2022 mint: {}", e)))
        }
        None => Err(invalid(format!("owned by {}, not a token program", owner))),
    }
}

/// Classify an RPC transport failure
fn rpc_error(e: ClientError) -> ReconcileError {
    let class = match e.kind() {
        ClientErrorKind::Reqwest(inner) => match inner.status() {
            Some(status) => classify_status(status.as_u16()),
            None => FailureClass::Transient,
        },
        ClientErrorKind::Io(_) => FailureClass::Transient,
        _ => classify_message(&e.to_string()),
    };

    ReconcileError::Rpc {
        class,
        message: e.to_string(),
    }
}

/// Packed, initialized SPL mint account image for tests
#[cfg(test)]
pub(crate) fn mint_bytes(decimals: u8) -> Vec<u8> {
    use spl_token::solana_program::program_option::COption;

    let state = spl_token::state::Mint {
        mint_authority: COption::None,
        supply: 1_000_000,
        decimals,
        is_initialized: true,
        freeze_authority: COption::None,
    };
    let mut data = vec![0u8; spl_token::state::Mint::LEN];
    spl_token::state::Mint::pack(state, &mut data).unwrap();
    data
}
