//! Remote State Fetch Aggregator
//!
//! Composes the dashboard's independent read calls into consistent
//! snapshots. All reads in a fetch are issued together and awaited
//! jointly, so total latency tracks the slowest call. The last-claim
//! lookup is the one read allowed to fail on its own: a fresh address
//! legitimately has no claim record, so a failure there means "never
//! claimed", not a failed snapshot. Any other failure fails the whole
//! fetch, since partial token data is not meaningful to display.

use crate::client::FaucetClient;
use crate::contracts::{TokenFaucet, TruffleToken};
use crate::eligibility::CooldownInputs;
use crate::units::{to_base_units, to_display_units};
use alloy::{
    primitives::{Address, U256},
    providers::RootProvider,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::{eyre, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ============================================================================
// Snapshot models
// ============================================================================

/// Account-scoped token state
///
/// Refreshed on demand or on connect, discarded on disconnect. Amounts
/// are exact decimal display strings scaled by `decimals`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// The connected account
    pub address: Address,
    /// Token balance of `address`
    pub token_balance: String,
    /// Allowance granted by `address` to the queried spender
    pub allowance: String,
    /// Total token supply
    pub total_supply: String,
    /// Token name
    pub token_name: String,
    /// Token symbol
    pub token_symbol: String,
    /// Token decimal places
    pub decimals: u8,
    /// Current token contract owner
    pub owner_address: Address,
}

/// Faucet parameters plus the connected address's claim record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetSnapshot {
    /// Amount dispensed per claim
    pub claim_amount: String,
    /// Tokens the faucet still holds
    pub faucet_balance: String,
    /// Token decimal places used to render the two amounts
    pub decimals: u8,
    /// Minimum seconds between claims
    pub cooldown_seconds: u64,
    /// Unix timestamp of the address's last claim (0 = never claimed)
    pub last_claim_timestamp: u64,
}

impl FaucetSnapshot {
    /// Timing fields for the countdown task
    pub fn cooldown_inputs(&self) -> CooldownInputs {
        CooldownInputs {
            last_claim_timestamp: self.last_claim_timestamp,
            cooldown_seconds: self.cooldown_seconds,
        }
    }

    /// Whole claims the faucet can still serve
    pub fn claims_remaining(&self) -> u64 {
        let balance = to_base_units(&self.faucet_balance, self.decimals).unwrap_or(U256::ZERO);
        let claim = to_base_units(&self.claim_amount, self.decimals).unwrap_or(U256::ZERO);
        crate::eligibility::claims_remaining(balance, claim)
    }
}

// ============================================================================
// Snapshot source
// ============================================================================

/// Source of dashboard snapshots
///
/// The store and the scenario tests depend on this seam rather than on a
/// live provider.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetch the account snapshot for `address`, reporting the allowance
    /// granted to `spender`
    async fn fetch_account(&self, address: Address, spender: Address) -> Result<AccountSnapshot>;

    /// Fetch the faucet snapshot; `address` scopes the last-claim lookup
    /// and `None` means no wallet is connected (last claim reported as 0)
    async fn fetch_faucet(&self, address: Option<Address>) -> Result<FaucetSnapshot>;
}

/// Production [`SnapshotSource`] reading from the chain over RPC
pub struct ChainSource {
    provider: RootProvider<Http<Client>>,
    token_address: Address,
    faucet_address: Address,
}

impl ChainSource {
    pub fn new(
        provider: RootProvider<Http<Client>>,
        token_address: Address,
        faucet_address: Address,
    ) -> Self {
        Self {
            provider,
            token_address,
            faucet_address,
        }
    }

    /// Build from a dashboard client, reusing its read provider
    pub fn from_client(client: &FaucetClient) -> Self {
        Self::new(
            client.read_provider(),
            client.token_address(),
            client.faucet_address(),
        )
    }
}

#[async_trait]
impl SnapshotSource for ChainSource {
    async fn fetch_account(&self, address: Address, spender: Address) -> Result<AccountSnapshot> {
        debug!(account = %address, "Fetching account snapshot");
        let token = TruffleToken::new(self.token_address, &self.provider);

        let (name, symbol, decimals, total_supply, owner, balance, allowance) = tokio::try_join!(
            async {
                token
                    .name()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get name: {}", e))
            },
            async {
                token
                    .symbol()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get symbol: {}", e))
            },
            async {
                token
                    .decimals()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get decimals: {}", e))
            },
            async {
                token
                    .totalSupply()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get total supply: {}", e))
            },
            async {
                token
                    .owner()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get owner: {}", e))
            },
            async {
                token
                    .balanceOf(address)
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get balance: {}", e))
            },
            async {
                token
                    .allowance(address, spender)
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get allowance: {}", e))
            }
        )?;

        Ok(AccountSnapshot {
            address,
            token_balance: to_display_units(balance, decimals),
            allowance: to_display_units(allowance, decimals),
            total_supply: to_display_units(total_supply, decimals),
            token_name: name,
            token_symbol: symbol,
            decimals,
            owner_address: owner,
        })
    }

    async fn fetch_faucet(&self, address: Option<Address>) -> Result<FaucetSnapshot> {
        debug!(account = ?address, "Fetching faucet snapshot");
        let token = TruffleToken::new(self.token_address, &self.provider);
        let faucet = TokenFaucet::new(self.faucet_address, &self.provider);

        let (claim_amount, faucet_balance, cooldown, decimals, last_claim) = tokio::try_join!(
            async {
                faucet
                    .claimAmount()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get claim amount: {}", e))
            },
            async {
                faucet
                    .faucetBalance()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get faucet balance: {}", e))
            },
            async {
                faucet
                    .cooldown()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get cooldown: {}", e))
            },
            async {
                token
                    .decimals()
                    .call()
                    .await
                    .map(|r| r._0)
                    .map_err(|e| eyre!("Failed to get decimals: {}", e))
            },
            async {
                let user = match address {
                    Some(user) => user,
                    None => return Ok(U256::ZERO),
                };
                Ok(last_claim_or_zero(
                    user,
                    faucet.lastClaim(user).call().await.map(|r| r._0),
                ))
            }
        )?;

        Ok(FaucetSnapshot {
            claim_amount: to_display_units(claim_amount, decimals),
            faucet_balance: to_display_units(faucet_balance, decimals),
            decimals,
            cooldown_seconds: cooldown.try_into().unwrap_or(u64::MAX),
            last_claim_timestamp: last_claim.try_into().unwrap_or(u64::MAX),
        })
    }
}

/// A fresh address may have no claim record; a failed lookup means
/// "never claimed", not a failed snapshot
fn last_claim_or_zero<E: std::fmt::Display>(user: Address, result: Result<U256, E>) -> U256 {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!(account = %user, error = %e, "Last-claim lookup failed, treating as never claimed");
            U256::ZERO
        }
    }
}
