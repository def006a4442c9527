//! Faucet RPC Client Wrapper
//!
//! Provides read-only and signing clients for the token and faucet
//! contracts over JSON-RPC. Reads go through a plain HTTP provider.
//! Writes build a wallet provider per submission so nonce and gas
//! filling stay attached to the signing path.

use crate::config::DashboardConfig;
use alloy::{
    network::EthereumWallet,
    primitives::Address,
    providers::{Provider, ProviderBuilder, RootProvider},
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use eyre::{eyre, Result};
use tracing::info;

/// Read-only faucet dashboard client
pub struct FaucetClientReadOnly {
    /// The alloy provider
    pub provider: RootProvider<Http<Client>>,
    /// Chain ID
    pub chain_id: u64,
    /// Token contract address
    pub token_address: Address,
    /// Faucet contract address
    pub faucet_address: Address,
}

impl FaucetClientReadOnly {
    /// Create a new read-only client
    pub async fn new(
        rpc_url: &str,
        chain_id: u64,
        token_address: Address,
        faucet_address: Address,
    ) -> Result<Self> {
        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(rpc_url = %rpc_url, chain_id = chain_id, "Created read-only faucet client");

        Ok(Self {
            provider,
            chain_id,
            token_address,
            faucet_address,
        })
    }

    /// Get the current block number
    pub async fn get_block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await?;
        Ok(block)
    }

    /// Get the chain ID from the RPC
    pub async fn get_chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chain_id().await?;
        Ok(chain_id)
    }
}

/// Faucet dashboard client with signing capabilities
pub struct FaucetClientWithSigner {
    /// Provider used for read calls
    pub provider: RootProvider<Http<Client>>,
    /// RPC URL, kept for building wallet providers
    rpc_url: String,
    /// The underlying private key signer
    signer: PrivateKeySigner,
    /// Chain ID
    pub chain_id: u64,
    /// Token contract address
    pub token_address: Address,
    /// Faucet contract address
    pub faucet_address: Address,
    /// Signer address
    pub signer_address: Address,
}

impl FaucetClientWithSigner {
    /// Create a new client with signing capabilities
    pub async fn new(
        rpc_url: &str,
        chain_id: u64,
        token_address: Address,
        faucet_address: Address,
        private_key: &str,
    ) -> Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;

        let address = signer.address();

        let provider = ProviderBuilder::new().on_http(
            rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
        );

        info!(
            rpc_url = %rpc_url,
            chain_id = chain_id,
            address = %address,
            "Created faucet client with signer"
        );

        Ok(Self {
            provider,
            rpc_url: rpc_url.to_string(),
            signer,
            chain_id,
            token_address,
            faucet_address,
            signer_address: address,
        })
    }

    /// Build a provider that can sign and submit transactions
    ///
    /// The recommended fillers are required here: without them the wallet
    /// cannot populate nonce and gas fields and sends fail with
    /// "missing properties".
    pub fn wallet_provider(&self) -> Result<impl Provider<Http<Client>>> {
        let wallet = EthereumWallet::from(self.signer.clone());
        let provider = ProviderBuilder::new()
            .with_recommended_fillers()
            .wallet(wallet)
            .on_http(
                self.rpc_url
                    .parse()
                    .map_err(|e| eyre!("Invalid RPC URL: {}", e))?,
            );
        Ok(provider)
    }

    /// Get the current block number
    pub async fn get_block_number(&self) -> Result<u64> {
        let block = self.provider.get_block_number().await?;
        Ok(block)
    }

    /// Get the chain ID from the RPC
    pub async fn get_chain_id(&self) -> Result<u64> {
        let chain_id = self.provider.get_chain_id().await?;
        Ok(chain_id)
    }

    /// Get the signer address
    pub fn get_signer_address(&self) -> Address {
        self.signer_address
    }
}

/// Unified client that can be either read-only or with signer
pub enum FaucetClient {
    ReadOnly(FaucetClientReadOnly),
    WithSigner(FaucetClientWithSigner),
}

impl FaucetClient {
    /// Create a new read-only client
    pub async fn new_readonly(
        rpc_url: &str,
        chain_id: u64,
        token_address: Address,
        faucet_address: Address,
    ) -> Result<Self> {
        Ok(FaucetClient::ReadOnly(
            FaucetClientReadOnly::new(rpc_url, chain_id, token_address, faucet_address).await?,
        ))
    }

    /// Create a new client with signing capabilities
    pub async fn new_with_signer(
        rpc_url: &str,
        chain_id: u64,
        token_address: Address,
        faucet_address: Address,
        private_key: &str,
    ) -> Result<Self> {
        Ok(FaucetClient::WithSigner(
            FaucetClientWithSigner::new(rpc_url, chain_id, token_address, faucet_address, private_key)
                .await?,
        ))
    }

    /// Create a client from dashboard configuration, picking the signing
    /// variant when a private key is configured
    pub async fn from_config(config: &DashboardConfig) -> Result<Self> {
        let token_address = config.token_address()?;
        let faucet_address = config.faucet_address()?;

        match &config.private_key {
            Some(key) => {
                Self::new_with_signer(
                    &config.rpc_url,
                    config.chain_id,
                    token_address,
                    faucet_address,
                    key,
                )
                .await
            }
            None => {
                Self::new_readonly(&config.rpc_url, config.chain_id, token_address, faucet_address)
                    .await
            }
        }
    }

    /// Get the current block number
    pub async fn get_block_number(&self) -> Result<u64> {
        match self {
            FaucetClient::ReadOnly(c) => c.get_block_number().await,
            FaucetClient::WithSigner(c) => c.get_block_number().await,
        }
    }

    /// Get the chain ID from the RPC
    pub async fn get_chain_id(&self) -> Result<u64> {
        match self {
            FaucetClient::ReadOnly(c) => c.get_chain_id().await,
            FaucetClient::WithSigner(c) => c.get_chain_id().await,
        }
    }

    /// Get a provider for read calls
    pub fn read_provider(&self) -> RootProvider<Http<Client>> {
        match self {
            FaucetClient::ReadOnly(c) => c.provider.clone(),
            FaucetClient::WithSigner(c) => c.provider.clone(),
        }
    }

    /// Token contract address
    pub fn token_address(&self) -> Address {
        match self {
            FaucetClient::ReadOnly(c) => c.token_address,
            FaucetClient::WithSigner(c) => c.token_address,
        }
    }

    /// Faucet contract address
    pub fn faucet_address(&self) -> Address {
        match self {
            FaucetClient::ReadOnly(c) => c.faucet_address,
            FaucetClient::WithSigner(c) => c.faucet_address,
        }
    }

    /// Check if the client has a signer
    pub fn has_signer(&self) -> bool {
        matches!(self, FaucetClient::WithSigner(_))
    }

    /// Get the signer address (None if read-only)
    pub fn get_signer_address(&self) -> Option<Address> {
        match self {
            FaucetClient::ReadOnly(_) => None,
            FaucetClient::WithSigner(c) => Some(c.signer_address),
        }
    }
}
