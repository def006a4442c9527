//! Contract Event History
//!
//! Watches the token and faucet contracts by polling logs, keeps the
//! dashboard's capped newest-first histories up to date, and raises
//! short-lived notifications for faucet activity. A backfill pass loads
//! the recent block window so the history panels are not empty on
//! connect.

use crate::eligibility::now_unix;
use crate::store::DashboardStore;
use crate::units::{short_display, to_display_units};
use alloy::{
    primitives::{keccak256, Address, B256, U256},
    providers::{Provider, RootProvider},
    rpc::types::{Filter, Log},
    transports::http::{Client, Http},
};
use eyre::{eyre, Result, WrapErr};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// How far back the backfill pass looks on startup
pub const BACKFILL_BLOCKS: u64 = 1000;

/// How long a notification stays visible before it is removed
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(10);

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// Event models
// ============================================================================

/// A token `Transfer` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenTransferEvent {
    pub from: Address,
    pub to: Address,
    pub amount: String,
    pub tx_hash: String,
    pub timestamp: u64,
}

/// A token `Approval` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenApprovalEvent {
    pub owner: Address,
    pub spender: Address,
    pub amount: String,
    pub tx_hash: String,
    pub timestamp: u64,
}

/// A faucet `Claimed` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetClaimEvent {
    pub user: Address,
    pub amount: String,
    pub tx_hash: String,
    pub timestamp: u64,
}

/// A faucet `TokensWithdrawn` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaucetWithdrawEvent {
    pub to: Address,
    pub amount: String,
    pub tx_hash: String,
    pub timestamp: u64,
}

/// An `OwnershipTransferred` event from either contract
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OwnershipTransferEvent {
    pub previous_owner: Address,
    pub new_owner: Address,
    pub tx_hash: String,
    pub timestamp: u64,
}

/// What a notification is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Claimed,
    Withdrawn,
    Ownership,
    Transfer,
    Approval,
}

/// A short-lived toast raised for observed contract activity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventNotification {
    pub id: String,
    pub kind: NotificationKind,
    pub message: String,
    pub timestamp: u64,
    pub tx_hash: String,
}

static NOTIFICATION_SEQ: AtomicU64 = AtomicU64::new(0);

impl EventNotification {
    /// Build a notification stamped with the current time and a unique id
    pub fn new(kind: NotificationKind, message: String, tx_hash: String) -> Self {
        let timestamp = now_unix();
        let seq = NOTIFICATION_SEQ.fetch_add(1, Ordering::Relaxed);
        EventNotification {
            id: format!("{}-{}", timestamp, seq),
            kind,
            message,
            timestamp,
            tx_hash,
        }
    }
}

/// Relative age of an event for history panels
pub fn format_event_age(event_timestamp: u64, now: u64) -> String {
    let seconds = now.saturating_sub(event_timestamp);
    let minutes = seconds / 60;
    let hours = minutes / 60;
    let days = hours / 24;

    if days > 0 {
        format!("{}d ago", days)
    } else if hours > 0 {
        format!("{}h ago", hours)
    } else if minutes > 0 {
        format!("{}m ago", minutes)
    } else {
        "Just now".to_string()
    }
}

// ============================================================================
// Event signatures
// ============================================================================

fn transfer_signature() -> B256 {
    keccak256(b"Transfer(address,address,uint256)")
}

fn approval_signature() -> B256 {
    keccak256(b"Approval(address,address,uint256)")
}

fn ownership_transferred_signature() -> B256 {
    keccak256(b"OwnershipTransferred(address,address)")
}

fn claimed_signature() -> B256 {
    keccak256(b"Claimed(address,uint256)")
}

fn tokens_withdrawn_signature() -> B256 {
    keccak256(b"TokensWithdrawn(address,uint256)")
}

// ============================================================================
// Log parsing
// ============================================================================

fn indexed_address(topic: &B256) -> Address {
    Address::from_slice(&topic.as_slice()[12..])
}

fn log_tx_hash(log: &Log) -> Result<String> {
    let hash = log
        .transaction_hash
        .ok_or_else(|| eyre!("Missing transaction hash"))?;
    Ok(hash.to_string())
}

fn log_amount(log: &Log) -> Result<U256> {
    let data = log.data().data.as_ref();
    if data.len() < 32 {
        return Err(eyre!("Log data too short for amount"));
    }
    Ok(U256::from_be_slice(&data[..32]))
}

fn require_topics(log: &Log, count: usize) -> Result<&[B256]> {
    let topics = log.topics();
    if topics.len() < count {
        return Err(eyre!(
            "Expected {} topics, log has {}",
            count,
            topics.len()
        ));
    }
    Ok(topics)
}

fn parse_transfer_log(log: &Log, decimals: u8) -> Result<TokenTransferEvent> {
    let topics = require_topics(log, 3)?;
    Ok(TokenTransferEvent {
        from: indexed_address(&topics[1]),
        to: indexed_address(&topics[2]),
        amount: to_display_units(log_amount(log)?, decimals),
        tx_hash: log_tx_hash(log)?,
        timestamp: now_unix(),
    })
}

fn parse_approval_log(log: &Log, decimals: u8) -> Result<TokenApprovalEvent> {
    let topics = require_topics(log, 3)?;
    Ok(TokenApprovalEvent {
        owner: indexed_address(&topics[1]),
        spender: indexed_address(&topics[2]),
        amount: to_display_units(log_amount(log)?, decimals),
        tx_hash: log_tx_hash(log)?,
        timestamp: now_unix(),
    })
}

fn parse_ownership_log(log: &Log) -> Result<OwnershipTransferEvent> {
    let topics = require_topics(log, 3)?;
    Ok(OwnershipTransferEvent {
        previous_owner: indexed_address(&topics[1]),
        new_owner: indexed_address(&topics[2]),
        tx_hash: log_tx_hash(log)?,
        timestamp: now_unix(),
    })
}

fn parse_claimed_log(log: &Log, decimals: u8) -> Result<FaucetClaimEvent> {
    let topics = require_topics(log, 2)?;
    Ok(FaucetClaimEvent {
        user: indexed_address(&topics[1]),
        amount: to_display_units(log_amount(log)?, decimals),
        tx_hash: log_tx_hash(log)?,
        timestamp: now_unix(),
    })
}

fn parse_withdrawn_log(log: &Log, decimals: u8) -> Result<FaucetWithdrawEvent> {
    let topics = require_topics(log, 2)?;
    Ok(FaucetWithdrawEvent {
        to: indexed_address(&topics[1]),
        amount: to_display_units(log_amount(log)?, decimals),
        tx_hash: log_tx_hash(log)?,
        timestamp: now_unix(),
    })
}

// ============================================================================
// Watcher
// ============================================================================

/// Backfilled history, newest first
#[derive(Debug, Clone, Default)]
pub struct EventBackfill {
    pub transfers: Vec<TokenTransferEvent>,
    pub approvals: Vec<TokenApprovalEvent>,
    pub claims: Vec<FaucetClaimEvent>,
    pub withdrawals: Vec<FaucetWithdrawEvent>,
}

/// Polls token and faucet logs and feeds them into the store
pub struct EventWatcher {
    provider: RootProvider<Http<Client>>,
    token_address: Address,
    faucet_address: Address,
    user: Option<Address>,
    store: Arc<DashboardStore>,
    poll_interval: Duration,
}

/// Handle to a running [`EventWatcher`] task
pub struct EventWatcherHandle {
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl EventWatcherHandle {
    /// Stop watching; the task exits at the next loop turn
    pub fn stop(self) {
        let _ = self.stop_tx.try_send(());
        self.task.abort();
    }
}

impl Drop for EventWatcherHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl EventWatcher {
    pub fn new(
        provider: RootProvider<Http<Client>>,
        token_address: Address,
        faucet_address: Address,
        user: Option<Address>,
        store: Arc<DashboardStore>,
    ) -> Self {
        Self {
            provider,
            token_address,
            faucet_address,
            user,
            store,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Load the recent block window into the store's history lists
    pub async fn backfill(&self) -> Result<()> {
        let decimals = self.token_decimals_or_default().await;
        let backfill = self.load_recent_events(decimals).await?;
        info!(
            transfers = backfill.transfers.len(),
            approvals = backfill.approvals.len(),
            claims = backfill.claims.len(),
            withdrawals = backfill.withdrawals.len(),
            "Loaded past contract events"
        );
        self.store.apply_backfill(backfill).await;
        Ok(())
    }

    /// Spawn the polling loop
    pub fn spawn(self) -> EventWatcherHandle {
        let (stop_tx, stop_rx) = mpsc::channel::<()>(1);
        let task = tokio::spawn(self.run(stop_rx));
        EventWatcherHandle { stop_tx, task }
    }

    async fn run(self, mut stop_rx: mpsc::Receiver<()>) {
        let decimals = self.token_decimals_or_default().await;
        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        // Live-only cursor; history is the backfill pass's job
        let mut cursor: Option<u64> = None;

        loop {
            tokio::select! {
                _ = stop_rx.recv() => {
                    info!("Event watcher stopping");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.poll(&mut cursor, decimals).await {
                        warn!(error = %e, "Event poll failed");
                    }
                }
            }
        }
    }

    async fn poll(&self, cursor: &mut Option<u64>, decimals: u8) -> Result<()> {
        let current_block = self
            .provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")?;

        let from_block = match *cursor {
            None => {
                *cursor = Some(current_block);
                return Ok(());
            }
            Some(last) if current_block <= last => return Ok(()),
            Some(last) => last + 1,
        };

        let filter = Filter::new()
            .address(vec![self.token_address, self.faucet_address])
            .from_block(from_block)
            .to_block(current_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .wrap_err("Failed to get logs")?;

        for log in &logs {
            if let Err(e) = self.dispatch(log, decimals).await {
                error!(
                    tx_hash = ?log.transaction_hash,
                    log_index = ?log.log_index,
                    error = %e,
                    "Failed to process event log"
                );
            }
        }

        *cursor = Some(current_block);
        Ok(())
    }

    async fn dispatch(&self, log: &Log, decimals: u8) -> Result<()> {
        let topics = log.topics();
        if topics.is_empty() {
            return Ok(());
        }
        let signature = topics[0];

        if log.address() == self.token_address {
            if signature == transfer_signature() {
                let event = parse_transfer_log(log, decimals)?;
                self.store.add_transfer(event).await;
            } else if signature == approval_signature() {
                let event = parse_approval_log(log, decimals)?;
                self.store.add_approval(event).await;
            } else if signature == ownership_transferred_signature() {
                let event = parse_ownership_log(log)?;
                self.store.add_ownership_change(event).await;
            }
        } else if log.address() == self.faucet_address {
            if signature == claimed_signature() {
                let event = parse_claimed_log(log, decimals)?;
                self.notify(self.claim_notification(&event)).await;
                self.store.add_claim(event).await;
            } else if signature == tokens_withdrawn_signature() {
                let event = parse_withdrawn_log(log, decimals)?;
                self.notify(self.withdraw_notification(&event)).await;
                self.store.add_withdrawal(event).await;
            } else if signature == ownership_transferred_signature() {
                let event = parse_ownership_log(log)?;
                self.notify(self.ownership_notification(&event)).await;
                self.store.add_ownership_change(event).await;
            }
        }
        Ok(())
    }

    fn claim_notification(&self, event: &FaucetClaimEvent) -> EventNotification {
        let message = if self.user == Some(event.user) {
            format!("You claimed {} tokens!", event.amount)
        } else {
            format!(
                "{} claimed {} tokens",
                short_display(event.user),
                event.amount
            )
        };
        EventNotification::new(NotificationKind::Claimed, message, event.tx_hash.clone())
    }

    fn withdraw_notification(&self, event: &FaucetWithdrawEvent) -> EventNotification {
        let message = format!(
            "{} tokens withdrawn to {}",
            event.amount,
            short_display(event.to)
        );
        EventNotification::new(NotificationKind::Withdrawn, message, event.tx_hash.clone())
    }

    fn ownership_notification(&self, event: &OwnershipTransferEvent) -> EventNotification {
        let message = format!(
            "Ownership transferred from {} to {}",
            short_display(event.previous_owner),
            short_display(event.new_owner)
        );
        EventNotification::new(NotificationKind::Ownership, message, event.tx_hash.clone())
    }

    /// Push a notification and schedule its removal after the TTL
    async fn notify(&self, notification: EventNotification) {
        let id = notification.id.clone();
        self.store.add_notification(notification).await;

        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            tokio::time::sleep(NOTIFICATION_TTL).await;
            store.remove_notification(&id).await;
        });
    }

    async fn token_decimals_or_default(&self) -> u8 {
        let token = crate::contracts::TruffleToken::new(self.token_address, &self.provider);
        match token.decimals().call().await {
            Ok(result) => result._0,
            Err(e) => {
                warn!(error = %e, "Failed to read token decimals, assuming 18");
                18
            }
        }
    }

    async fn load_recent_events(&self, decimals: u8) -> Result<EventBackfill> {
        let current_block = self
            .provider
            .get_block_number()
            .await
            .wrap_err("Failed to get block number")?;
        let from_block = current_block.saturating_sub(BACKFILL_BLOCKS);

        let transfers = self
            .backfill_transfers(from_block, current_block, decimals)
            .await?;
        let approvals = self
            .backfill_approvals(from_block, current_block, decimals)
            .await?;
        let claims = self
            .backfill_claims(from_block, current_block, decimals)
            .await?;
        let withdrawals = self
            .backfill_withdrawals(from_block, current_block, decimals)
            .await?;

        Ok(EventBackfill {
            transfers,
            approvals,
            claims,
            withdrawals,
        })
    }

    async fn backfill_transfers(
        &self,
        from_block: u64,
        to_block: u64,
        decimals: u8,
    ) -> Result<Vec<TokenTransferEvent>> {
        let base = Filter::new()
            .address(self.token_address)
            .event_signature(transfer_signature())
            .from_block(from_block)
            .to_block(to_block);

        // With a connected account, fetch transfers in both directions and
        // merge; self-transfers show up in both result sets
        let logs = match self.user {
            Some(user) => {
                let sent = self
                    .provider
                    .get_logs(&base.clone().topic1(user.into_word()))
                    .await
                    .wrap_err("Failed to get sent transfer logs")?;
                let received = self
                    .provider
                    .get_logs(&base.topic2(user.into_word()))
                    .await
                    .wrap_err("Failed to get received transfer logs")?;
                merge_logs(sent, received)
            }
            None => self
                .provider
                .get_logs(&base)
                .await
                .wrap_err("Failed to get transfer logs")?,
        };

        Ok(parse_newest_first(&logs, |log| {
            parse_transfer_log(log, decimals)
        }))
    }

    async fn backfill_approvals(
        &self,
        from_block: u64,
        to_block: u64,
        decimals: u8,
    ) -> Result<Vec<TokenApprovalEvent>> {
        // Approvals are only interesting for the connected account
        let user = match self.user {
            Some(user) => user,
            None => return Ok(Vec::new()),
        };

        let filter = Filter::new()
            .address(self.token_address)
            .event_signature(approval_signature())
            .topic1(user.into_word())
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .wrap_err("Failed to get approval logs")?;

        Ok(parse_newest_first(&logs, |log| {
            parse_approval_log(log, decimals)
        }))
    }

    async fn backfill_claims(
        &self,
        from_block: u64,
        to_block: u64,
        decimals: u8,
    ) -> Result<Vec<FaucetClaimEvent>> {
        let mut filter = Filter::new()
            .address(self.faucet_address)
            .event_signature(claimed_signature())
            .from_block(from_block)
            .to_block(to_block);
        if let Some(user) = self.user {
            filter = filter.topic1(user.into_word());
        }

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .wrap_err("Failed to get claim logs")?;

        Ok(parse_newest_first(&logs, |log| {
            parse_claimed_log(log, decimals)
        }))
    }

    async fn backfill_withdrawals(
        &self,
        from_block: u64,
        to_block: u64,
        decimals: u8,
    ) -> Result<Vec<FaucetWithdrawEvent>> {
        let filter = Filter::new()
            .address(self.faucet_address)
            .event_signature(tokens_withdrawn_signature())
            .from_block(from_block)
            .to_block(to_block);

        let logs = self
            .provider
            .get_logs(&filter)
            .await
            .wrap_err("Failed to get withdrawal logs")?;

        Ok(parse_newest_first(&logs, |log| {
            parse_withdrawn_log(log, decimals)
        }))
    }
}

/// Merge two log sets, dropping duplicates and restoring chain order
fn merge_logs(mut a: Vec<Log>, b: Vec<Log>) -> Vec<Log> {
    let mut seen: HashSet<(Option<B256>, Option<u64>)> = a
        .iter()
        .map(|log| (log.transaction_hash, log.log_index))
        .collect();
    for log in b {
        if seen.insert((log.transaction_hash, log.log_index)) {
            a.push(log);
        }
    }
    a.sort_by_key(|log| (log.block_number.unwrap_or(0), log.log_index.unwrap_or(0)));
    a
}

/// Parse ascending logs into newest-first events, skipping bad logs
fn parse_newest_first<T, F>(logs: &[Log], parse: F) -> Vec<T>
where
    F: Fn(&Log) -> Result<T>,
{
    let mut events = Vec::with_capacity(logs.len());
    for log in logs {
        match parse(log) {
            Ok(event) => events.push(event),
            Err(e) => {
                error!(
                    tx_hash = ?log.transaction_hash,
                    log_index = ?log.log_index,
                    error = %e,
                    "Failed to parse past event log"
                );
            }
        }
    }
    events.reverse();
    events
}
