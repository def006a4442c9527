//! Transaction Action Pipeline
//!
//! Every write the dashboard performs funnels through one shared
//! submit-and-confirm pathway, so wallet checks, amount scaling,
//! rejection handling and revert classification behave the same
//! regardless of which action raised them. Methods return a
//! [`TxOutcome`] rather than an error: callers always get something
//! displayable, and a user rejection is an outcome, not a fault.

use crate::client::FaucetClient;
use crate::contracts::{TokenFaucet, TruffleToken};
use crate::eligibility::now_unix;
use crate::errors::{classify, RawCallFailure, TxErrorKind, TxOutcome};
use crate::units::{parse_address, short_display, to_base_units};
use alloy::{
    primitives::{Address, Bytes, U256},
    providers::Provider,
    rpc::types::TransactionRequest,
};
use tracing::{info, warn};

/// Shown when a write is attempted without a configured signer
pub(crate) const CONNECT_WALLET_MESSAGE: &str = "Please connect your wallet first";

/// Executes dashboard writes against the token and faucet contracts
pub struct FaucetActions {
    client: FaucetClient,
}

impl FaucetActions {
    pub fn new(client: FaucetClient) -> Self {
        Self { client }
    }

    /// The underlying client
    pub fn client(&self) -> &FaucetClient {
        &self.client
    }

    // =========================================================================
    // Token actions
    // =========================================================================

    /// Transfer tokens from the signer to `to`
    pub async fn transfer(&self, to: &str, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let recipient = match parsed_address(to) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token.transfer(recipient, value).calldata().clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "transfer",
            format!("Successfully transferred {} tokens", amount),
        )
        .await
    }

    /// Approve `spender` to spend `amount` of the signer's tokens
    pub async fn approve(&self, spender: &str, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let spender_addr = match parsed_address(spender) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token.approve(spender_addr, value).calldata().clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "approve",
            format!("Approved {} tokens for {}", amount, short_display(spender_addr)),
        )
        .await
    }

    /// Move tokens from `from` to `to` using a previously granted allowance
    pub async fn transfer_from(&self, from: &str, to: &str, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let from_addr = match parsed_address(from) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let to_addr = match parsed_address(to) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token
            .transferFrom(from_addr, to_addr, value)
            .calldata()
            .clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "transfer_from",
            format!(
                "Successfully transferred {} tokens from {}",
                amount,
                short_display(from_addr)
            ),
        )
        .await
    }

    /// Raise an existing allowance by `amount`
    pub async fn increase_allowance(&self, spender: &str, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let spender_addr = match parsed_address(spender) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token
            .increaseAllowance(spender_addr, value)
            .calldata()
            .clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "increase_allowance",
            format!(
                "Increased allowance for {} by {} tokens",
                short_display(spender_addr),
                amount
            ),
        )
        .await
    }

    /// Lower an existing allowance by `amount`
    pub async fn decrease_allowance(&self, spender: &str, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let spender_addr = match parsed_address(spender) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token
            .decreaseAllowance(spender_addr, value)
            .calldata()
            .clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "decrease_allowance",
            format!(
                "Decreased allowance for {} by {} tokens",
                short_display(spender_addr),
                amount
            ),
        )
        .await
    }

    /// Mint new tokens to `to`; restricted to the token owner
    pub async fn mint(&self, to: &str, amount: &str) -> TxOutcome {
        let signer = match self.require_signer() {
            Ok(signer) => signer,
            Err(outcome) => return outcome,
        };
        let to_addr = match parsed_address(to) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        if let Err(outcome) = self.require_token_owner(signer).await {
            return outcome;
        }
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token.mint(to_addr, value).calldata().clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "mint",
            format!("Minted {} tokens to {}", amount, short_display(to_addr)),
        )
        .await
    }

    /// Burn tokens from the signer's own balance; restricted to the token owner
    pub async fn burn(&self, amount: &str) -> TxOutcome {
        let signer = match self.require_signer() {
            Ok(signer) => signer,
            Err(outcome) => return outcome,
        };
        if let Err(outcome) = self.require_token_owner(signer).await {
            return outcome;
        }
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token.burn(signer, value).calldata().clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "burn",
            format!("Burned {} tokens", amount),
        )
        .await
    }

    /// Burn tokens from `account` using a granted allowance
    pub async fn burn_from(&self, account: &str, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let account_addr = match parsed_address(account) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token.burnFrom(account_addr, value).calldata().clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "burn_from",
            format!("Burned {} tokens from {}", amount, short_display(account_addr)),
        )
        .await
    }

    /// Hand token contract ownership to `new_owner`
    pub async fn transfer_token_ownership(&self, new_owner: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let owner_addr = match parsed_address(new_owner) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let calldata = token.transferOwnership(owner_addr).calldata().clone();

        self.execute(
            self.client.token_address(),
            calldata,
            "transfer_token_ownership",
            format!(
                "Successfully transferred ownership to {}",
                short_display(owner_addr)
            ),
        )
        .await
    }

    // =========================================================================
    // Faucet actions
    // =========================================================================

    /// Claim tokens from the faucet
    pub async fn claim(&self) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }

        let provider = self.client.read_provider();
        let faucet = TokenFaucet::new(self.client.faucet_address(), &provider);
        let calldata = faucet.claim().calldata().clone();

        self.execute(
            self.client.faucet_address(),
            calldata,
            "claim",
            "Claim confirmed".to_string(),
        )
        .await
    }

    /// Withdraw tokens from the faucet back to its owner
    pub async fn withdraw_faucet_tokens(&self, amount: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let value = match self.scaled_amount(amount).await {
            Ok(value) => value,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let faucet = TokenFaucet::new(self.client.faucet_address(), &provider);
        let calldata = faucet.withdrawTokens(value).calldata().clone();

        self.execute(
            self.client.faucet_address(),
            calldata,
            "withdraw_faucet_tokens",
            format!("Withdrew {} tokens from the faucet", amount),
        )
        .await
    }

    /// Hand faucet contract ownership to `new_owner`
    pub async fn transfer_faucet_ownership(&self, new_owner: &str) -> TxOutcome {
        if let Err(outcome) = self.require_signer() {
            return outcome;
        }
        let owner_addr = match parsed_address(new_owner) {
            Ok(addr) => addr,
            Err(outcome) => return outcome,
        };

        let provider = self.client.read_provider();
        let faucet = TokenFaucet::new(self.client.faucet_address(), &provider);
        let calldata = faucet.transferOwnership(owner_addr).calldata().clone();

        self.execute(
            self.client.faucet_address(),
            calldata,
            "transfer_faucet_ownership",
            format!(
                "Successfully transferred faucet ownership to {}",
                short_display(owner_addr)
            ),
        )
        .await
    }

    // =========================================================================
    // Pipeline
    // =========================================================================

    fn require_signer(&self) -> Result<Address, TxOutcome> {
        self.client
            .get_signer_address()
            .ok_or_else(|| TxOutcome::validation(CONNECT_WALLET_MESSAGE))
    }

    /// Read the token's decimals for amount scaling
    async fn token_decimals(&self) -> Result<u8, TxOutcome> {
        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        match token.decimals().call().await {
            Ok(result) => Ok(result._0),
            Err(e) => {
                warn!(error = %e, "Failed to read token decimals");
                let kind = classify(&RawCallFailure::from_provider_error(&e));
                Err(TxOutcome::failure(&kind, now_unix()))
            }
        }
    }

    /// Scale a human-entered amount into base units
    async fn scaled_amount(&self, amount: &str) -> Result<U256, TxOutcome> {
        let decimals = self.token_decimals().await?;
        to_base_units(amount, decimals).map_err(|e| TxOutcome::validation(e.to_string()))
    }

    /// The token contract rejects mint and burn from non-owners. Checking
    /// up front spares the user a doomed signature prompt.
    async fn require_token_owner(&self, signer: Address) -> Result<(), TxOutcome> {
        let provider = self.client.read_provider();
        let token = TruffleToken::new(self.client.token_address(), &provider);
        let owner = match token.owner().call().await {
            Ok(result) => result._0,
            Err(e) => {
                warn!(error = %e, "Failed to read token owner");
                let kind = classify(&RawCallFailure::from_provider_error(&e));
                return Err(TxOutcome::failure(&kind, now_unix()));
            }
        };

        if owner != signer {
            info!(signer = %signer, owner = %owner, "Owner check failed");
            return Err(TxOutcome::failure(&TxErrorKind::NotOwner, now_unix()));
        }
        Ok(())
    }

    /// Shared submit-and-confirm pipeline behind every action
    async fn execute(
        &self,
        to: Address,
        calldata: Bytes,
        label: &'static str,
        success_message: String,
    ) -> TxOutcome {
        let signer = match &self.client {
            FaucetClient::WithSigner(c) => c,
            FaucetClient::ReadOnly(_) => return TxOutcome::validation(CONNECT_WALLET_MESSAGE),
        };

        let provider = match signer.wallet_provider() {
            Ok(provider) => provider,
            Err(e) => {
                let kind = classify(&RawCallFailure::from_provider_error(&e));
                return TxOutcome::failure(&kind, now_unix());
            }
        };

        let tx = TransactionRequest::default().to(to).input(calldata.into());

        info!(action = label, to = %to, "Submitting transaction");
        let pending = match provider.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(e) => {
                let failure = RawCallFailure::from_provider_error(&e);
                let kind = classify(&failure);
                match kind {
                    TxErrorKind::UserRejected => {
                        info!(action = label, "Transaction rejected by user")
                    }
                    _ => warn!(action = label, error = %e, "Transaction submission failed"),
                }
                return TxOutcome::failure(&kind, now_unix());
            }
        };

        let tx_hash = *pending.tx_hash();
        info!(action = label, tx_hash = %tx_hash, "Transaction sent, waiting for confirmation");

        let receipt = match pending.get_receipt().await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!(action = label, tx_hash = %tx_hash, error = %e, "Failed to get receipt");
                let kind = classify(&RawCallFailure::from_provider_error(&e));
                let mut outcome = TxOutcome::failure(&kind, now_unix());
                outcome.hash = Some(tx_hash.to_string());
                return outcome;
            }
        };

        if !receipt.status() {
            warn!(action = label, tx_hash = %tx_hash, "Transaction reverted");
            return TxOutcome::reverted(
                tx_hash.to_string(),
                &TxErrorKind::Unknown("Transaction failed".to_string()),
                now_unix(),
            );
        }

        info!(action = label, tx_hash = %tx_hash, "Transaction confirmed");
        TxOutcome::success(tx_hash.to_string(), success_message)
    }
}

fn parsed_address(value: &str) -> Result<Address, TxOutcome> {
    parse_address(value).map_err(|e| TxOutcome::validation(e.to_string()))
}
