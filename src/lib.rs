//! Truffle Faucet: Client Core for the Token Faucet Dashboard
//!
//! This crate provides the chain-facing core behind the Truffle token
//! faucet dashboard:
//!
//! - **Units** - Exact decimal/base-unit conversion and address display
//! - **Eligibility** - Claim cooldown computation and the 1 Hz countdown task
//! - **Errors** - Wallet/revert failure classification into a user-facing taxonomy
//! - **Contracts** - alloy `sol!` bindings for the token and faucet contracts
//! - **Client** - Read-only and signing RPC client wrappers
//! - **Snapshot** - Joint-awaited account and faucet state fetches
//! - **Actions** - The validate/submit/confirm pipeline behind every write
//! - **Store** - The dependency-injected dashboard state store
//! - **Events** - Log watching, backfill, bounded histories and notifications
//! - **Session** - Wallet session lifecycle and explorer links
//!
//! ## Usage
//!
//! ```toml
//! [dependencies]
//! truffle-faucet = { path = "../truffle-faucet" }
//! ```

pub mod actions;
pub mod client;
pub mod config;
pub mod contracts;
pub mod eligibility;
pub mod errors;
pub mod events;
pub mod session;
pub mod snapshot;
pub mod store;
pub mod units;

// Re-export commonly used items at the crate root
pub use actions::FaucetActions;
pub use client::{FaucetClient, FaucetClientReadOnly, FaucetClientWithSigner};
pub use config::DashboardConfig;
pub use eligibility::{
    compute_eligibility, format_remaining, now_unix, start_countdown, ClaimEligibility,
    ClaimPhase, CooldownInputs, CountdownHandle,
};
pub use errors::{
    classify, ErrorCategory, RawCallFailure, TxErrorKind, TxOutcome, USER_REJECTED_CODE,
};
pub use events::{
    format_event_age, EventBackfill, EventNotification, EventWatcher, EventWatcherHandle,
    FaucetClaimEvent, FaucetWithdrawEvent, NotificationKind, OwnershipTransferEvent,
    TokenApprovalEvent, TokenTransferEvent,
};
pub use session::{explorer_address_url, explorer_tx_url, DashboardSession, SessionState};
pub use snapshot::{AccountSnapshot, ChainSource, FaucetSnapshot, SnapshotSource};
pub use store::{DashboardState, DashboardStore};
pub use units::{
    parse_address, short_display, shorten_address, to_base_units, to_display_units, UnitError,
};
