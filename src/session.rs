//! Wallet Session Lifecycle
//!
//! Ties the store and the event watcher to one wallet session. Connect,
//! disconnect, account switches and chain switches each reload the
//! snapshots and restart the watcher scoped to the active account, so the
//! histories and the countdown always describe the address the user is
//! actually driving. Also builds block-explorer links for transactions
//! and addresses.

use crate::actions::FaucetActions;
use crate::client::FaucetClient;
use crate::config::DashboardConfig;
use crate::events::{EventWatcher, EventWatcherHandle};
use crate::snapshot::ChainSource;
use crate::store::DashboardStore;
use alloy::primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Connection facts a view needs beyond the store state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Connected account, if any
    pub connected: Option<Address>,
    /// Chain the wallet currently reports
    pub chain_id: u64,
}

/// One wallet session over the dashboard store
///
/// Single-owner: the caller that receives wallet events drives it.
pub struct DashboardSession {
    store: Arc<DashboardStore>,
    watcher: Option<EventWatcherHandle>,
    /// Chain the deployment is configured for
    configured_chain_id: u64,
    /// Chain the wallet currently reports
    chain_id: u64,
    explorer_base: String,
}

impl DashboardSession {
    /// Build the client, store and watcher from configuration and load
    /// the public (connection-independent) state
    ///
    /// A failing initial load is recorded in the store, not fatal: the
    /// dashboard starts in its error state and a later refresh recovers.
    pub async fn start(config: &DashboardConfig) -> Result<Self> {
        let client = FaucetClient::from_config(config).await?;
        let actions = FaucetActions::new(client);
        let source = ChainSource::from_client(actions.client());
        let store = Arc::new(DashboardStore::new(Box::new(source), actions));

        if let Err(e) = store.refresh_all().await {
            warn!(error = %e, "Initial contract load failed");
        }

        let mut session = Self {
            store,
            watcher: None,
            configured_chain_id: config.chain_id,
            chain_id: config.chain_id,
            explorer_base: config.explorer_base.trim_end_matches('/').to_string(),
        };
        session.restart_watcher(None).await;
        Ok(session)
    }

    /// The shared store behind this session
    pub fn store(&self) -> Arc<DashboardStore> {
        Arc::clone(&self.store)
    }

    /// Current session facts
    pub async fn session_state(&self) -> SessionState {
        SessionState {
            connected: self.store.state().await.connected,
            chain_id: self.chain_id,
        }
    }

    /// Connect `address` and rescope the watcher to it
    ///
    /// Returns the snapshot-load result; the connection and the watcher
    /// rescope stick even when that load fails.
    pub async fn connect(&mut self, address: Address) -> Result<()> {
        let result = self.store.connect(address).await;
        self.restart_watcher(Some(address)).await;
        result
    }

    /// Disconnect, reset to public state and reload it
    pub async fn disconnect(&mut self) {
        self.store.disconnect().await;
        if let Err(e) = self.store.refresh_all().await {
            warn!(error = %e, "Public reload after disconnect failed");
        }
        self.restart_watcher(None).await;
    }

    /// Apply a wallet `accountsChanged` notification
    ///
    /// The first account becomes the active one; an empty list is a
    /// disconnect.
    pub async fn accounts_changed(&mut self, accounts: &[Address]) -> Result<()> {
        match accounts.first() {
            Some(address) => {
                info!(account = %address, "Active account changed");
                self.connect(*address).await
            }
            None => {
                self.disconnect().await;
                Ok(())
            }
        }
    }

    /// Apply a wallet `chainChanged` notification
    ///
    /// Reloads the snapshots and restarts the watcher so its block cursor
    /// starts fresh on the new chain.
    pub async fn chain_changed(&mut self, chain_id: u64) -> Result<()> {
        if chain_id == self.chain_id {
            return Ok(());
        }
        if chain_id != self.configured_chain_id {
            warn!(
                chain_id = chain_id,
                configured = self.configured_chain_id,
                "Wallet chain differs from the deployment chain"
            );
        } else {
            info!(chain_id = chain_id, "Wallet back on the deployment chain");
        }
        self.chain_id = chain_id;

        let result = self.store.refresh_all().await;
        let user = self.store.state().await.connected;
        self.restart_watcher(user).await;
        result
    }

    /// Explorer link for a transaction hash
    pub fn tx_url(&self, hash: &str) -> String {
        explorer_tx_url(&self.explorer_base, hash)
    }

    /// Explorer link for an address
    pub fn address_url(&self, address: Address) -> String {
        explorer_address_url(&self.explorer_base, address)
    }

    /// Stop the watcher; the store's countdown stops when the store drops
    pub fn shutdown(mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.stop();
        }
    }

    /// Replace the running watcher with one scoped to `user`, backfilling
    /// the recent block window first
    async fn restart_watcher(&mut self, user: Option<Address>) {
        if let Some(handle) = self.watcher.take() {
            handle.stop();
        }

        let client = self.store.actions().client();
        let watcher = EventWatcher::new(
            client.read_provider(),
            client.token_address(),
            client.faucet_address(),
            user,
            self.store(),
        );
        if let Err(e) = watcher.backfill().await {
            warn!(error = %e, "Event backfill failed");
        }
        self.watcher = Some(watcher.spawn());
    }
}

/// Explorer link for a transaction hash
pub fn explorer_tx_url(base: &str, hash: &str) -> String {
    format!("{}/tx/{}", base.trim_end_matches('/'), hash)
}

/// Explorer link for an address
pub fn explorer_address_url(base: &str, address: Address) -> String {
    format!("{}/address/{}", base.trim_end_matches('/'), address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explorer_links() {
        assert_eq!(
            explorer_tx_url("https://sepolia.etherscan.io", "0xabc123"),
            "https://sepolia.etherscan.io/tx/0xabc123"
        );
        // trailing slashes never double up
        assert_eq!(
            explorer_tx_url("https://sepolia.etherscan.io/", "0xabc123"),
            "https://sepolia.etherscan.io/tx/0xabc123"
        );

        let address: Address = "0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8"
            .parse()
            .unwrap();
        assert_eq!(
            explorer_address_url("https://sepolia.etherscan.io", address),
            "https://sepolia.etherscan.io/address/0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8"
        );
    }

    #[tokio::test]
    async fn test_session_starts_disconnected() {
        let config = DashboardConfig {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            token_address: "0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8".to_string(),
            faucet_address: "0xe746C6A272D50A90C134a3DE3fAC32f72c9528c1".to_string(),
            private_key: None,
            explorer_base: "https://sepolia.etherscan.io/".to_string(),
        };

        let session = DashboardSession::start(&config).await.unwrap();
        let state = session.session_state().await;
        assert_eq!(state.connected, None);
        assert_eq!(state.chain_id, 31337);
        assert_eq!(
            session.tx_url("0xabc"),
            "https://sepolia.etherscan.io/tx/0xabc"
        );
        session.shutdown();
    }

    #[tokio::test]
    async fn test_chain_change_to_same_chain_is_a_no_op() {
        let config = DashboardConfig {
            rpc_url: "http://localhost:8545".to_string(),
            chain_id: 31337,
            token_address: "0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8".to_string(),
            faucet_address: "0xe746C6A272D50A90C134a3DE3fAC32f72c9528c1".to_string(),
            private_key: None,
            explorer_base: "https://sepolia.etherscan.io".to_string(),
        };

        let mut session = DashboardSession::start(&config).await.unwrap();
        session.chain_changed(31337).await.unwrap();
        assert_eq!(session.session_state().await.chain_id, 31337);
        session.shutdown();
    }
}
