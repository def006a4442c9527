//! Dashboard State Store
//!
//! Owns the single state snapshot every view reads: connection, account
//! and faucet snapshots, transaction feedback, event histories and
//! notifications. Mutations happen in four flows (connect, refresh,
//! submit, event ingestion) behind one `RwLock`; a separate guard
//! serializes writes so two transactions can never race each other's
//! feedback fields. Fetches run outside the lock, so readers are never
//! blocked on the network.

use crate::actions::{FaucetActions, CONNECT_WALLET_MESSAGE};
use crate::eligibility::{
    compute_eligibility, now_unix, start_countdown, ClaimEligibility, CooldownInputs,
    CountdownHandle,
};
use crate::errors::{ErrorCategory, TxOutcome};
use crate::events::{
    EventBackfill, EventNotification, FaucetClaimEvent, FaucetWithdrawEvent,
    OwnershipTransferEvent, TokenApprovalEvent, TokenTransferEvent,
};
use crate::snapshot::{AccountSnapshot, FaucetSnapshot, SnapshotSource};
use alloy::primitives::Address;
use eyre::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use tokio::sync::{watch, Mutex, RwLock};
use tracing::{info, warn};

/// Cap on each token/faucet event history list
pub const MAX_EVENT_HISTORY: usize = 100;

/// Cap on the ownership-change history list
pub const MAX_OWNERSHIP_HISTORY: usize = 50;

/// Cap on simultaneously visible notifications
pub const MAX_NOTIFICATIONS: usize = 10;

const BUSY_MESSAGE: &str = "A transaction is already in progress";

// ============================================================================
// State shape
// ============================================================================

/// Everything a dashboard view reads, in one snapshot
///
/// Histories are newest first and capped. `tx_hash`, `error` and
/// `success` describe the most recent write attempt and are cleared when
/// the next one begins.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashboardState {
    /// Connected account, if any
    pub connected: Option<Address>,
    /// Token state scoped to the connected account
    pub account: Option<AccountSnapshot>,
    /// Faucet parameters plus the connected account's claim record
    pub faucet: Option<FaucetSnapshot>,
    /// Whether a fetch or write is in flight
    pub is_loading: bool,
    /// Hash of the most recent accepted transaction
    pub tx_hash: Option<String>,
    /// Error text from the most recent failed attempt
    pub error: Option<String>,
    /// Success text from the most recent confirmed transaction
    pub success: Option<String>,
    /// Token transfer history
    pub transfers: Vec<TokenTransferEvent>,
    /// Token approval history
    pub approvals: Vec<TokenApprovalEvent>,
    /// Faucet claim history
    pub claims: Vec<FaucetClaimEvent>,
    /// Faucet withdrawal history
    pub withdrawals: Vec<FaucetWithdrawEvent>,
    /// Ownership transfer history (both contracts)
    pub ownership_changes: Vec<OwnershipTransferEvent>,
    /// Live notifications, oldest expiring first
    pub notifications: Vec<EventNotification>,
}

// ============================================================================
// Store
// ============================================================================

/// The dashboard's shared state store
///
/// Cheap to share behind an `Arc`; all methods take `&self`.
pub struct DashboardStore {
    source: Box<dyn SnapshotSource>,
    actions: FaucetActions,
    /// Spender whose allowance the account snapshot reports
    allowance_spender: Address,
    state: RwLock<DashboardState>,
    inputs_tx: watch::Sender<CooldownInputs>,
    countdown: CountdownHandle,
    /// Held for the duration of one write; `try_lock` failure means busy
    write_guard: Mutex<()>,
}

impl DashboardStore {
    /// Build a store over a snapshot source and an action executor
    ///
    /// The allowance reported in account snapshots defaults to the one
    /// granted to the faucet contract.
    pub fn new(source: Box<dyn SnapshotSource>, actions: FaucetActions) -> Self {
        let allowance_spender = actions.client().faucet_address();
        let (inputs_tx, inputs_rx) = watch::channel(CooldownInputs::default());
        let countdown = start_countdown(inputs_rx);

        Self {
            source,
            actions,
            allowance_spender,
            state: RwLock::new(DashboardState::default()),
            inputs_tx,
            countdown,
            write_guard: Mutex::new(()),
        }
    }

    /// Report allowances granted to `spender` instead of the faucet
    pub fn with_allowance_spender(mut self, spender: Address) -> Self {
        self.allowance_spender = spender;
        self
    }

    /// The action executor behind this store
    pub fn actions(&self) -> &FaucetActions {
        &self.actions
    }

    /// Current state snapshot
    pub async fn state(&self) -> DashboardState {
        self.state.read().await.clone()
    }

    /// Latest published claim eligibility
    pub fn eligibility(&self) -> ClaimEligibility {
        self.countdown.current()
    }

    /// Subscribe to the 1 Hz eligibility countdown
    pub fn subscribe_eligibility(&self) -> watch::Receiver<ClaimEligibility> {
        self.countdown.subscribe()
    }

    // =========================================================================
    // Connection flow
    // =========================================================================

    /// Mark `address` as connected and load its snapshots
    ///
    /// The connection itself sticks even when the load fails; the error is
    /// recorded in state and a later refresh can recover.
    pub async fn connect(&self, address: Address) -> Result<()> {
        info!(account = %address, "Account connected");
        {
            let mut state = self.state.write().await;
            state.connected = Some(address);
        }
        self.refresh_all().await
    }

    /// Drop the connection and reset to the disconnected state
    pub async fn disconnect(&self) {
        info!("Account disconnected");
        let mut state = self.state.write().await;
        *state = DashboardState::default();
        self.inputs_tx.send_replace(CooldownInputs::default());
    }

    // =========================================================================
    // Refresh flow
    // =========================================================================

    /// Reload the account snapshot for the connected address
    ///
    /// No-op when nothing is connected.
    pub async fn refresh_account(&self) -> Result<()> {
        let connected = match self.state.read().await.connected {
            Some(address) => address,
            None => return Ok(()),
        };

        {
            self.state.write().await.is_loading = true;
        }
        let result = self
            .source
            .fetch_account(connected, self.allowance_spender)
            .await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(account) => {
                state.account = Some(account);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Account refresh failed");
                state.error = Some(format!("Failed to load contract data: {}", e));
                Err(e)
            }
        }
    }

    /// Reload the faucet snapshot and republish the countdown inputs
    pub async fn refresh_faucet(&self) -> Result<()> {
        let connected = self.state.read().await.connected;

        {
            self.state.write().await.is_loading = true;
        }
        let result = self.source.fetch_faucet(connected).await;

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok(faucet) => {
                self.inputs_tx.send_replace(faucet.cooldown_inputs());
                state.faucet = Some(faucet);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Faucet refresh failed");
                state.error = Some(format!("Failed to load contract data: {}", e));
                Err(e)
            }
        }
    }

    /// Reload both snapshots together
    ///
    /// Fetches run jointly outside the lock and land in one write, so a
    /// reader sees either the old pair or the new pair, never a mix.
    pub async fn refresh_all(&self) -> Result<()> {
        let connected = self.state.read().await.connected;

        {
            self.state.write().await.is_loading = true;
        }
        let result = match connected {
            Some(address) => tokio::try_join!(
                self.source.fetch_account(address, self.allowance_spender),
                self.source.fetch_faucet(Some(address)),
            )
            .map(|(account, faucet)| (Some(account), faucet)),
            None => self
                .source
                .fetch_faucet(None)
                .await
                .map(|faucet| (None, faucet)),
        };

        let mut state = self.state.write().await;
        state.is_loading = false;
        match result {
            Ok((account, faucet)) => {
                self.inputs_tx.send_replace(faucet.cooldown_inputs());
                state.account = account;
                state.faucet = Some(faucet);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Refresh failed");
                state.error = Some(format!("Failed to load contract data: {}", e));
                Err(e)
            }
        }
    }

    // =========================================================================
    // Submission flow
    // =========================================================================

    /// Run one write action to completion and record its outcome
    ///
    /// Rejects with a validation outcome when another write is already in
    /// flight. On success the snapshots are refreshed so balances and
    /// allowances catch up with the chain.
    ///
    /// ```ignore
    /// let outcome = store.submit(store.actions().transfer(to, amount)).await;
    /// ```
    pub async fn submit<F>(&self, action: F) -> TxOutcome
    where
        F: Future<Output = TxOutcome>,
    {
        let _guard = match self.write_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => return TxOutcome::validation(BUSY_MESSAGE),
        };

        self.begin_tx().await;
        let outcome = action.await;
        self.record_outcome(&outcome).await;

        if outcome.is_success() {
            if let Err(e) = self.refresh_all().await {
                warn!(error = %e, "Post-transaction refresh failed");
            }
        }
        outcome
    }

    /// Claim from the faucet, with the cooldown applied optimistically
    ///
    /// The countdown restarts the moment the claim is submitted rather
    /// than when it confirms, so the user cannot fire a second doomed
    /// claim while the first is in flight. A failed or rejected claim
    /// rolls the cooldown back; a confirmed one is reconciled against the
    /// chain's own timestamp on refresh.
    pub async fn submit_claim(&self) -> TxOutcome {
        let _guard = match self.write_guard.try_lock() {
            Ok(guard) => guard,
            Err(_) => return TxOutcome::validation(BUSY_MESSAGE),
        };

        let (connected, faucet) = {
            let state = self.state.read().await;
            (state.connected, state.faucet.clone())
        };
        if connected.is_none() {
            return TxOutcome::validation(CONNECT_WALLET_MESSAGE);
        }

        // Gate on eligibility computed right now, not the last published
        // countdown tick
        if let Some(faucet) = &faucet {
            let eligibility = compute_eligibility(
                faucet.last_claim_timestamp,
                faucet.cooldown_seconds,
                now_unix(),
            );
            if !eligibility.can_claim {
                return TxOutcome::validation(format!(
                    "Please wait {} before claiming again",
                    eligibility.display
                ));
            }
        }

        self.begin_tx().await;

        let previous_inputs = *self.inputs_tx.borrow();
        let optimistic = CooldownInputs {
            last_claim_timestamp: now_unix(),
            cooldown_seconds: previous_inputs.cooldown_seconds,
        };
        self.inputs_tx.send_replace(optimistic);
        {
            let mut state = self.state.write().await;
            if let Some(faucet) = state.faucet.as_mut() {
                faucet.last_claim_timestamp = optimistic.last_claim_timestamp;
            }
        }

        let mut outcome = self.actions.claim().await;

        if outcome.is_success() {
            outcome.message = match &faucet {
                Some(faucet) => format!("Successfully claimed {} tokens!", faucet.claim_amount),
                None => "Successfully claimed tokens!".to_string(),
            };
        } else {
            // Roll the optimistic cooldown back to what the last snapshot said
            self.inputs_tx.send_replace(previous_inputs);
            let mut state = self.state.write().await;
            if let Some(faucet) = state.faucet.as_mut() {
                faucet.last_claim_timestamp = previous_inputs.last_claim_timestamp;
            }
        }

        self.record_outcome(&outcome).await;

        if outcome.is_success() {
            if let Err(e) = self.refresh_all().await {
                warn!(error = %e, "Post-claim refresh failed");
            }
        }
        outcome
    }

    /// Clear transaction feedback without touching anything else
    pub async fn reset_tx_state(&self) {
        let mut state = self.state.write().await;
        state.tx_hash = None;
        state.error = None;
        state.success = None;
    }

    async fn begin_tx(&self) {
        let mut state = self.state.write().await;
        state.is_loading = true;
        state.tx_hash = None;
        state.error = None;
        state.success = None;
    }

    /// Record a finished write in the feedback fields
    ///
    /// A user rejection records nothing: the attempt simply never
    /// happened as far as the state is concerned.
    async fn record_outcome(&self, outcome: &TxOutcome) {
        let mut state = self.state.write().await;
        state.is_loading = false;

        if outcome.is_success() {
            state.tx_hash = outcome.hash.clone();
            state.success = Some(outcome.message.clone());
            state.error = None;
        } else if outcome.category != Some(ErrorCategory::UserRejected) {
            state.tx_hash = outcome.hash.clone();
            state.error = Some(outcome.message.clone());
        }
    }

    // =========================================================================
    // Event ingestion
    // =========================================================================

    pub async fn add_transfer(&self, event: TokenTransferEvent) {
        let mut state = self.state.write().await;
        state.transfers.insert(0, event);
        state.transfers.truncate(MAX_EVENT_HISTORY);
    }

    pub async fn add_approval(&self, event: TokenApprovalEvent) {
        let mut state = self.state.write().await;
        state.approvals.insert(0, event);
        state.approvals.truncate(MAX_EVENT_HISTORY);
    }

    pub async fn add_claim(&self, event: FaucetClaimEvent) {
        let mut state = self.state.write().await;
        state.claims.insert(0, event);
        state.claims.truncate(MAX_EVENT_HISTORY);
    }

    pub async fn add_withdrawal(&self, event: FaucetWithdrawEvent) {
        let mut state = self.state.write().await;
        state.withdrawals.insert(0, event);
        state.withdrawals.truncate(MAX_EVENT_HISTORY);
    }

    pub async fn add_ownership_change(&self, event: OwnershipTransferEvent) {
        let mut state = self.state.write().await;
        state.ownership_changes.insert(0, event);
        state.ownership_changes.truncate(MAX_OWNERSHIP_HISTORY);
    }

    pub async fn add_notification(&self, notification: EventNotification) {
        let mut state = self.state.write().await;
        state.notifications.insert(0, notification);
        state.notifications.truncate(MAX_NOTIFICATIONS);
    }

    /// Remove one notification by id; unknown ids are ignored
    pub async fn remove_notification(&self, id: &str) {
        let mut state = self.state.write().await;
        state.notifications.retain(|n| n.id != id);
    }

    pub async fn clear_notifications(&self) {
        let mut state = self.state.write().await;
        state.notifications.clear();
    }

    /// Replace the history lists with a backfilled window
    ///
    /// Backfill delivers newest first; each list is capped the same way
    /// live ingestion caps it. Raises no notifications.
    pub async fn apply_backfill(&self, backfill: EventBackfill) {
        let mut state = self.state.write().await;
        state.transfers = backfill.transfers;
        state.transfers.truncate(MAX_EVENT_HISTORY);
        state.approvals = backfill.approvals;
        state.approvals.truncate(MAX_EVENT_HISTORY);
        state.claims = backfill.claims;
        state.claims.truncate(MAX_EVENT_HISTORY);
        state.withdrawals = backfill.withdrawals;
        state.withdrawals.truncate(MAX_EVENT_HISTORY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::FaucetClient;
    use crate::events::NotificationKind;
    use async_trait::async_trait;
    use eyre::eyre;
    use std::sync::Arc;
    use tokio::sync::oneshot;

    const TOKEN: &str = "0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8";
    const FAUCET: &str = "0xe746C6A272D50A90C134a3DE3fAC32f72c9528c1";
    const USER: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

    struct StaticSource {
        faucet: FaucetSnapshot,
    }

    impl StaticSource {
        fn claimable() -> Self {
            StaticSource {
                faucet: FaucetSnapshot {
                    claim_amount: "100".to_string(),
                    faucet_balance: "1000".to_string(),
                    decimals: 18,
                    cooldown_seconds: 86_400,
                    last_claim_timestamp: 0,
                },
            }
        }

        fn cooling() -> Self {
            let mut source = Self::claimable();
            source.faucet.last_claim_timestamp = now_unix();
            source
        }
    }

    #[async_trait]
    impl SnapshotSource for StaticSource {
        async fn fetch_account(
            &self,
            address: Address,
            _spender: Address,
        ) -> Result<AccountSnapshot> {
            Ok(AccountSnapshot {
                address,
                token_balance: "500".to_string(),
                allowance: "0".to_string(),
                total_supply: "1000000".to_string(),
                token_name: "Truffle".to_string(),
                token_symbol: "TRF".to_string(),
                decimals: 18,
                owner_address: TOKEN.parse().unwrap(),
            })
        }

        async fn fetch_faucet(
            &self,
            _address: Option<Address>,
        ) -> Result<FaucetSnapshot> {
            Ok(self.faucet.clone())
        }
    }

    struct FailingSource;

    #[async_trait]
    impl SnapshotSource for FailingSource {
        async fn fetch_account(
            &self,
            _address: Address,
            _spender: Address,
        ) -> Result<AccountSnapshot> {
            Err(eyre!("rpc unreachable"))
        }

        async fn fetch_faucet(
            &self,
            _address: Option<Address>,
        ) -> Result<FaucetSnapshot> {
            Err(eyre!("rpc unreachable"))
        }
    }

    async fn store_with(source: Box<dyn SnapshotSource>) -> DashboardStore {
        let client = FaucetClient::new_readonly(
            "http://localhost:8545",
            31337,
            TOKEN.parse().unwrap(),
            FAUCET.parse().unwrap(),
        )
        .await
        .unwrap();
        DashboardStore::new(source, FaucetActions::new(client))
    }

    fn transfer_event(n: u64) -> TokenTransferEvent {
        TokenTransferEvent {
            from: TOKEN.parse().unwrap(),
            to: USER.parse().unwrap(),
            amount: n.to_string(),
            tx_hash: format!("0x{:064x}", n),
            timestamp: n,
        }
    }

    #[tokio::test]
    async fn test_connect_loads_both_snapshots() {
        let store = store_with(Box::new(StaticSource::claimable())).await;
        store.connect(USER.parse().unwrap()).await.unwrap();

        let state = store.state().await;
        assert_eq!(state.connected, Some(USER.parse().unwrap()));
        let account = state.account.unwrap();
        assert_eq!(account.token_balance, "500");
        assert_eq!(account.token_symbol, "TRF");
        let faucet = state.faucet.unwrap();
        assert_eq!(faucet.claim_amount, "100");
        assert_eq!(faucet.last_claim_timestamp, 0);
        assert!(!state.is_loading);
        assert!(state.error.is_none());
    }

    #[tokio::test]
    async fn test_refresh_failure_keeps_connection_and_surfaces_error() {
        let store = store_with(Box::new(FailingSource)).await;
        let result = store.connect(USER.parse().unwrap()).await;
        assert!(result.is_err());

        let state = store.state().await;
        assert_eq!(state.connected, Some(USER.parse().unwrap()));
        assert!(state.account.is_none());
        assert!(state.faucet.is_none());
        let error = state.error.unwrap();
        assert!(error.starts_with("Failed to load contract data:"), "{}", error);
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_disconnect_resets_everything() {
        let store = store_with(Box::new(StaticSource::claimable())).await;
        store.connect(USER.parse().unwrap()).await.unwrap();
        store.add_transfer(transfer_event(1)).await;
        store
            .add_notification(EventNotification::new(
                NotificationKind::Claimed,
                "You claimed 100 tokens!".to_string(),
                "0xabc".to_string(),
            ))
            .await;

        store.disconnect().await;

        let state = store.state().await;
        assert!(state.connected.is_none());
        assert!(state.account.is_none());
        assert!(state.faucet.is_none());
        assert!(state.transfers.is_empty());
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_event_histories_are_capped_newest_first() {
        let store = store_with(Box::new(StaticSource::claimable())).await;

        for n in 0..120 {
            store.add_transfer(transfer_event(n)).await;
        }
        let state = store.state().await;
        assert_eq!(state.transfers.len(), MAX_EVENT_HISTORY);
        // Last pushed event sits at the front
        assert_eq!(state.transfers[0].amount, "119");
        assert_eq!(state.transfers[99].amount, "20");

        for n in 0..60 {
            store
                .add_ownership_change(OwnershipTransferEvent {
                    previous_owner: TOKEN.parse().unwrap(),
                    new_owner: USER.parse().unwrap(),
                    tx_hash: format!("0x{:064x}", n),
                    timestamp: n,
                })
                .await;
        }
        assert_eq!(
            store.state().await.ownership_changes.len(),
            MAX_OWNERSHIP_HISTORY
        );

        for n in 0..15 {
            store
                .add_notification(EventNotification::new(
                    NotificationKind::Transfer,
                    format!("notification {}", n),
                    "0xabc".to_string(),
                ))
                .await;
        }
        assert_eq!(store.state().await.notifications.len(), MAX_NOTIFICATIONS);
    }

    #[tokio::test]
    async fn test_remove_notification_by_id() {
        let store = store_with(Box::new(StaticSource::claimable())).await;
        let keep = EventNotification::new(
            NotificationKind::Claimed,
            "keep".to_string(),
            "0xaaa".to_string(),
        );
        let drop = EventNotification::new(
            NotificationKind::Withdrawn,
            "drop".to_string(),
            "0xbbb".to_string(),
        );
        let drop_id = drop.id.clone();
        store.add_notification(keep).await;
        store.add_notification(drop).await;

        store.remove_notification(&drop_id).await;
        let notifications = store.state().await.notifications;
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0].message, "keep");

        // Unknown ids are a no-op
        store.remove_notification("nonexistent").await;
        assert_eq!(store.state().await.notifications.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_backfill_replaces_and_caps() {
        let store = store_with(Box::new(StaticSource::claimable())).await;
        store.add_transfer(transfer_event(0)).await;

        let backfill = EventBackfill {
            transfers: (0..150).rev().map(transfer_event).collect(),
            ..Default::default()
        };
        store.apply_backfill(backfill).await;

        let state = store.state().await;
        assert_eq!(state.transfers.len(), MAX_EVENT_HISTORY);
        assert_eq!(state.transfers[0].amount, "149");
        assert!(state.notifications.is_empty());
    }

    #[tokio::test]
    async fn test_submit_records_success_and_refreshes() {
        let store = store_with(Box::new(StaticSource::claimable())).await;
        store.connect(USER.parse().unwrap()).await.unwrap();

        let outcome = store
            .submit(async { TxOutcome::success("0xdeadbeef", "Successfully transferred 5 tokens") })
            .await;
        assert!(outcome.is_success());

        let state = store.state().await;
        assert_eq!(state.tx_hash.as_deref(), Some("0xdeadbeef"));
        assert_eq!(
            state.success.as_deref(),
            Some("Successfully transferred 5 tokens")
        );
        assert!(state.error.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_submit_records_failure_verbatim() {
        let store = store_with(Box::new(StaticSource::claimable())).await;

        let outcome = store
            .submit(async {
                TxOutcome {
                    hash: None,
                    category: Some(ErrorCategory::NetworkOrUnknown),
                    message: "connection refused".to_string(),
                }
            })
            .await;
        assert!(!outcome.is_success());

        let state = store.state().await;
        assert_eq!(state.error.as_deref(), Some("connection refused"));
        assert!(state.success.is_none());
        assert!(state.tx_hash.is_none());
    }

    #[tokio::test]
    async fn test_user_rejection_is_silent() {
        let store = store_with(Box::new(StaticSource::claimable())).await;

        let outcome = store
            .submit(async {
                TxOutcome {
                    hash: None,
                    category: Some(ErrorCategory::UserRejected),
                    message: "Transaction rejected by user".to_string(),
                }
            })
            .await;
        assert!(!outcome.is_success());

        // Nothing surfaced: not an error, not a success
        let state = store.state().await;
        assert!(state.error.is_none());
        assert!(state.success.is_none());
        assert!(state.tx_hash.is_none());
        assert!(!state.is_loading);
    }

    #[tokio::test]
    async fn test_one_write_at_a_time() {
        let store = Arc::new(store_with(Box::new(StaticSource::claimable())).await);
        let (release_tx, release_rx) = oneshot::channel::<()>();

        let first = {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                store
                    .submit(async move {
                        release_rx.await.ok();
                        TxOutcome::success("0xaaa", "Done")
                    })
                    .await
            })
        };

        // Let the first submission take the guard
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;

        let second = store
            .submit(async { TxOutcome::success("0xbbb", "Done") })
            .await;
        assert_eq!(second.category, Some(ErrorCategory::ValidationError));
        assert_eq!(second.message, BUSY_MESSAGE);

        release_tx.send(()).unwrap();
        let first = first.await.unwrap();
        assert!(first.is_success());
    }

    #[tokio::test]
    async fn test_claim_without_connection_is_rejected_locally() {
        let store = store_with(Box::new(StaticSource::claimable())).await;

        let outcome = store.submit_claim().await;
        assert_eq!(outcome.category, Some(ErrorCategory::ValidationError));
        assert_eq!(outcome.message, CONNECT_WALLET_MESSAGE);
    }

    #[tokio::test]
    async fn test_claim_during_cooldown_is_rejected_locally() {
        let store = store_with(Box::new(StaticSource::cooling())).await;
        store.connect(USER.parse().unwrap()).await.unwrap();

        let outcome = store.submit_claim().await;
        assert_eq!(outcome.category, Some(ErrorCategory::ValidationError));
        assert!(outcome.message.starts_with("Please wait"), "{}", outcome.message);
        assert!(outcome.message.ends_with("before claiming again"));

        // The rejected attempt must not have started a cooldown
        let faucet = store.state().await.faucet.unwrap();
        assert!(faucet.last_claim_timestamp <= now_unix());
    }

    #[tokio::test]
    async fn test_failed_claim_rolls_the_cooldown_back() {
        // Read-only client: the claim fails locally after the optimistic
        // cooldown start, which must then be rolled back
        let store = store_with(Box::new(StaticSource::claimable())).await;
        store.connect(USER.parse().unwrap()).await.unwrap();

        let outcome = store.submit_claim().await;
        assert!(!outcome.is_success());

        let state = store.state().await;
        assert_eq!(state.faucet.unwrap().last_claim_timestamp, 0);
        assert!(state.error.is_some());
    }
}
