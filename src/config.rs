//! Dashboard Configuration
//!
//! Environment-based configuration for the faucet dashboard core. Loads
//! a `.env` file when present, then reads from the environment. The
//! token and faucet addresses default to the Sepolia deployment the
//! dashboard ships against.

use alloy::primitives::Address;
use eyre::{eyre, Result, WrapErr};
use serde::Deserialize;
use std::env;
use std::fmt;
use std::path::Path;
use url::Url;

/// Configuration for the faucet dashboard core
#[derive(Clone, Deserialize)]
pub struct DashboardConfig {
    /// HTTP RPC endpoint
    pub rpc_url: String,
    /// Chain ID the deployment lives on
    pub chain_id: u64,
    /// Truffle token contract address
    pub token_address: String,
    /// Faucet contract address
    pub faucet_address: String,
    /// Private key for signing (optional; read-only without it)
    #[serde(default)]
    pub private_key: Option<String>,
    /// Block explorer base URL for transaction/address links
    pub explorer_base: String,
}

/// Custom Debug that redacts private_key to prevent accidental log leakage.
impl fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("rpc_url", &self.rpc_url)
            .field("chain_id", &self.chain_id)
            .field("token_address", &self.token_address)
            .field("faucet_address", &self.faucet_address)
            .field(
                "private_key",
                &self.private_key.as_ref().map(|_| "<redacted>"),
            )
            .field("explorer_base", &self.explorer_base)
            .finish()
    }
}

/// Default functions
fn default_chain_id() -> u64 {
    // Sepolia
    11155111
}

fn default_token_address() -> String {
    "0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8".to_string()
}

fn default_faucet_address() -> String {
    "0xe746C6A272D50A90C134a3DE3fAC32f72c9528c1".to_string()
}

fn default_explorer_base() -> String {
    "https://sepolia.etherscan.io".to_string()
}

impl DashboardConfig {
    /// Load configuration from environment variables
    /// Loads .env file if present, then reads from environment
    pub fn load() -> Result<Self> {
        Self::load_from_file(".env").or_else(|_| Self::load_from_env())
    }

    /// Load from a specific .env file path
    pub fn load_from_file(path: &str) -> Result<Self> {
        if Path::new(path).exists() {
            dotenvy::from_filename(path)
                .wrap_err_with(|| format!("Failed to load .env file from {}", path))?;
        }
        Self::load_from_env()
    }

    /// Load configuration from environment variables
    fn load_from_env() -> Result<Self> {
        let config = DashboardConfig {
            rpc_url: env::var("FAUCET_RPC_URL")
                .map_err(|_| eyre!("FAUCET_RPC_URL environment variable is required"))?,
            chain_id: env::var("FAUCET_CHAIN_ID")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default_chain_id()),
            token_address: env::var("TOKEN_ADDRESS").unwrap_or_else(|_| default_token_address()),
            faucet_address: env::var("FAUCET_ADDRESS")
                .unwrap_or_else(|_| default_faucet_address()),
            private_key: env::var("FAUCET_PRIVATE_KEY").ok(),
            explorer_base: env::var("EXPLORER_BASE_URL")
                .unwrap_or_else(|_| default_explorer_base()),
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.rpc_url.is_empty() {
            return Err(eyre!("rpc_url cannot be empty"));
        }
        Url::parse(&self.rpc_url).wrap_err("rpc_url must be a valid URL")?;

        if self.chain_id == 0 {
            return Err(eyre!("chain_id cannot be 0"));
        }

        if self.token_address.len() != 42 || !self.token_address.starts_with("0x") {
            return Err(eyre!(
                "token_address must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if self.faucet_address.len() != 42 || !self.faucet_address.starts_with("0x") {
            return Err(eyre!(
                "faucet_address must be a valid hex address (42 chars with 0x prefix)"
            ));
        }

        if let Some(key) = &self.private_key {
            if key.len() != 66 || !key.starts_with("0x") {
                return Err(eyre!("private_key must be 66 chars (0x + 64 hex chars)"));
            }
        }

        Url::parse(&self.explorer_base).wrap_err("explorer_base must be a valid URL")?;

        Ok(())
    }

    /// The token address as a typed [`Address`]
    pub fn token_address(&self) -> Result<Address> {
        self.token_address
            .parse()
            .wrap_err("Invalid token address")
    }

    /// The faucet address as a typed [`Address`]
    pub fn faucet_address(&self) -> Result<Address> {
        self.faucet_address
            .parse()
            .wrap_err("Invalid faucet address")
    }
}
