//! Contract Error Classification
//!
//! Maps raw call failures (wallet rejection codes, custom-error revert
//! data, reason strings) to user-facing categories. Selector matching is
//! unambiguous; substring matching is a fallback only, because a message
//! that merely contains "owner" would false-positive. Anything
//! unrecognized keeps its original text verbatim so nothing is silently
//! swallowed.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::warn;

// ============================================================================
// Fixed selector table
// ============================================================================

/// 4-byte selector for `CooldownActive(uint256 nextClaimTimestamp)`
pub const SELECTOR_COOLDOWN_ACTIVE: [u8; 4] = [0xc1, 0xab, 0x61, 0xa1];
/// 4-byte selector for `InsufficientFaucetBalance()`
pub const SELECTOR_INSUFFICIENT_FAUCET_BALANCE: [u8; 4] = [0x1c, 0xd3, 0xf4, 0xd3];
/// 4-byte selector for `NotOwner()`
pub const SELECTOR_NOT_OWNER: [u8; 4] = [0x30, 0xcd, 0x74, 0x71];
/// 4-byte selector for `TransferFailed()`
pub const SELECTOR_TRANSFER_FAILED: [u8; 4] = [0x90, 0xb8, 0xec, 0x18];
/// 4-byte selector for `ZeroAddress()`
pub const SELECTOR_ZERO_ADDRESS: [u8; 4] = [0xd9, 0x2e, 0x23, 0x3d];

/// Code a wallet provider returns when the user rejects the request
pub const USER_REJECTED_CODE: i64 = 4001;

// ============================================================================
// Raw failure input
// ============================================================================

/// A raw call failure as delivered by a wallet or RPC provider
///
/// Providers populate any subset of these four fields depending on where
/// the failure happened; the classifier inspects them in confidence order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCallFailure {
    /// Numeric provider code (4001 = user rejected)
    pub code: Option<i64>,
    /// 0x-prefixed revert data; the first 4 bytes are the error selector
    pub data: Option<String>,
    /// Revert reason string, when the provider decoded one
    pub reason: Option<String>,
    /// Generic message text
    pub message: Option<String>,
}

impl RawCallFailure {
    /// Failure carrying only a message
    pub fn from_message(message: impl Into<String>) -> Self {
        RawCallFailure {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    /// Failure for a wallet-side user rejection
    pub fn user_rejection() -> Self {
        RawCallFailure {
            code: Some(USER_REJECTED_CODE),
            ..Default::default()
        }
    }

    /// Build from a JSON-RPC error object
    ///
    /// Accepts the shapes real providers emit: `data` either as a hex
    /// string or as a nested object with its own `data` string.
    pub fn from_json_rpc(error: &serde_json::Value) -> Self {
        let code = error.get("code").and_then(|c| c.as_i64());
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .map(str::to_string);
        let reason = error
            .get("reason")
            .and_then(|r| r.as_str())
            .map(str::to_string);
        let data = match error.get("data") {
            Some(serde_json::Value::String(s)) if s.starts_with("0x") => Some(s.clone()),
            Some(serde_json::Value::Object(inner)) => inner
                .get("data")
                .and_then(|d| d.as_str())
                .filter(|s| s.starts_with("0x"))
                .map(str::to_string),
            _ => None,
        };

        RawCallFailure {
            code,
            data,
            reason,
            message,
        }
    }

    /// Build from a provider error's display text
    ///
    /// Alloy surfaces revert data embedded in the error string; scan it
    /// out so selector matching still works at that boundary.
    pub fn from_provider_error<E: fmt::Display>(error: E) -> Self {
        let text = error.to_string();
        RawCallFailure {
            code: None,
            data: extract_revert_hex(&text),
            reason: None,
            message: Some(text),
        }
    }

    /// Decoded revert payload, if `data` holds at least a selector
    fn revert_bytes(&self) -> Option<Vec<u8>> {
        let data = self.data.as_deref()?;
        let bytes = hex::decode(data.strip_prefix("0x").unwrap_or(data)).ok()?;
        if bytes.len() >= 4 {
            Some(bytes)
        } else {
            None
        }
    }
}

/// Pull a 0x-prefixed hex payload out of an error string
///
/// Keeps the longest even-length run of at least one selector (8 hex
/// digits). Runs of exactly 40 digits are addresses, not revert data.
fn extract_revert_hex(message: &str) -> Option<String> {
    let mut best: Option<&str> = None;
    let mut search = message;
    while let Some(pos) = search.find("0x") {
        let rest = &search[pos + 2..];
        let len = rest
            .bytes()
            .take_while(|b| b.is_ascii_hexdigit())
            .count();
        if len >= 8 && len % 2 == 0 && len != 40 && best.map_or(true, |b| b.len() < len) {
            best = Some(&rest[..len]);
        }
        search = rest;
    }
    best.map(|run| format!("0x{}", run))
}

// ============================================================================
// Classification
// ============================================================================

/// Classified failure kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TxErrorKind {
    /// The wallet user declined to sign
    UserRejected,
    /// Claim attempted while the cooldown is running; `retry_at` carries
    /// the decoded next-claim timestamp when the revert data included one
    CooldownActive { retry_at: Option<u64> },
    /// Not enough tokens (in the faucet or the sending account)
    InsufficientBalance,
    /// Caller lacks ownership of the contract
    NotOwner,
    /// The underlying ERC20 transfer returned false
    TransferFailed,
    /// An address parameter was the zero address
    ZeroAddress,
    /// Nothing matched; the original text is preserved verbatim
    Unknown(String),
}

impl TxErrorKind {
    /// Map to the top-level error taxonomy
    pub fn category(&self) -> ErrorCategory {
        match self {
            TxErrorKind::UserRejected => ErrorCategory::UserRejected,
            TxErrorKind::CooldownActive { .. }
            | TxErrorKind::InsufficientBalance
            | TxErrorKind::NotOwner
            | TxErrorKind::TransferFailed
            | TxErrorKind::ZeroAddress => ErrorCategory::ContractRevert,
            TxErrorKind::Unknown(_) => ErrorCategory::NetworkOrUnknown,
        }
    }

    /// User-facing message for this kind
    ///
    /// `now` is the current unix time, used to render a decoded cooldown
    /// retry timestamp as time remaining.
    pub fn user_message(&self, now: u64) -> String {
        match self {
            TxErrorKind::UserRejected => "Transaction rejected by user".to_string(),
            TxErrorKind::CooldownActive {
                retry_at: Some(retry_at),
            } if *retry_at > now => {
                let remaining = retry_at - now;
                let hours = remaining / 3600;
                let minutes = (remaining % 3600) / 60;
                format!(
                    "Cooldown active. Next claim available in {}h {}m",
                    hours, minutes
                )
            }
            TxErrorKind::CooldownActive { .. } => "Cooldown period is still active".to_string(),
            TxErrorKind::InsufficientBalance => "Insufficient balance".to_string(),
            TxErrorKind::NotOwner => {
                "Only the contract owner can perform this action".to_string()
            }
            TxErrorKind::TransferFailed => "Token transfer failed".to_string(),
            TxErrorKind::ZeroAddress => "Zero address not allowed".to_string(),
            TxErrorKind::Unknown(message) => message.clone(),
        }
    }
}

/// Classify a raw failure into a [`TxErrorKind`]
///
/// Strict order: rejection code first (highest confidence, cheapest),
/// then the fixed selector table with parameter decoding, then
/// case-insensitive substring matching on reason/message, then Unknown.
pub fn classify(failure: &RawCallFailure) -> TxErrorKind {
    if failure.code == Some(USER_REJECTED_CODE) {
        return TxErrorKind::UserRejected;
    }

    if let Some(bytes) = failure.revert_bytes() {
        let mut selector = [0u8; 4];
        selector.copy_from_slice(&bytes[..4]);
        match selector {
            SELECTOR_COOLDOWN_ACTIVE => {
                return TxErrorKind::CooldownActive {
                    retry_at: decode_cooldown_retry(&bytes),
                }
            }
            SELECTOR_INSUFFICIENT_FAUCET_BALANCE => return TxErrorKind::InsufficientBalance,
            SELECTOR_NOT_OWNER => return TxErrorKind::NotOwner,
            SELECTOR_TRANSFER_FAILED => return TxErrorKind::TransferFailed,
            SELECTOR_ZERO_ADDRESS => return TxErrorKind::ZeroAddress,
            // Unknown selector: fall through to the string checks
            _ => {}
        }
    }

    if let Some(text) = failure.reason.as_deref().or(failure.message.as_deref()) {
        let lower = text.to_lowercase();
        if lower.contains("insufficient balance") {
            return TxErrorKind::InsufficientBalance;
        }
        if lower.contains("cooldown") {
            return TxErrorKind::CooldownActive { retry_at: None };
        }
        if lower.contains("not owner") || lower.contains("ownable") {
            return TxErrorKind::NotOwner;
        }
        if lower.contains("transfer failed") {
            return TxErrorKind::TransferFailed;
        }
        if lower.contains("zero address") {
            return TxErrorKind::ZeroAddress;
        }
    }

    let original = failure
        .reason
        .clone()
        .or_else(|| failure.message.clone())
        .unwrap_or_else(|| "Transaction failed".to_string());
    TxErrorKind::Unknown(original)
}

/// Decode the `uint256 nextClaimTimestamp` parameter from CooldownActive
/// revert data (selector + one 32-byte word)
fn decode_cooldown_retry(bytes: &[u8]) -> Option<u64> {
    if bytes.len() < 36 {
        return None;
    }
    let timestamp = U256::from_be_slice(&bytes[4..36]);
    let timestamp: u64 = timestamp.try_into().unwrap_or_else(|_| {
        warn!(%timestamp, "CooldownActive timestamp exceeds u64, clamping");
        u64::MAX
    });
    Some(timestamp)
}

// ============================================================================
// Outcome shape
// ============================================================================

/// Top-level error taxonomy for a transaction outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCategory {
    /// User declined in the wallet; treated as a no-op, not an error
    UserRejected,
    /// Malformed local input, caught before any network call
    ValidationError,
    /// The contract reverted with a recognized condition
    ContractRevert,
    /// Transport failures and anything unrecognized, surfaced verbatim
    NetworkOrUnknown,
}

impl ErrorCategory {
    /// Get the category as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCategory::UserRejected => "user_rejected",
            ErrorCategory::ValidationError => "validation_error",
            ErrorCategory::ContractRevert => "contract_revert",
            ErrorCategory::NetworkOrUnknown => "network_or_unknown",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome of one write attempt
///
/// Ephemeral: created per user-initiated action and replaced wholesale by
/// the next one. `hash` is present once the network accepted the
/// transaction, even if it later reverted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutcome {
    /// Transaction hash, absent when the submission never reached the chain
    pub hash: Option<String>,
    /// Error category; `None` means the transaction confirmed
    pub category: Option<ErrorCategory>,
    /// User-facing result text
    pub message: String,
}

impl TxOutcome {
    /// Confirmed transaction
    pub fn success(hash: impl Into<String>, message: impl Into<String>) -> Self {
        TxOutcome {
            hash: Some(hash.into()),
            category: None,
            message: message.into(),
        }
    }

    /// Failure before anything reached the chain
    pub fn failure(kind: &TxErrorKind, now: u64) -> Self {
        TxOutcome {
            hash: None,
            category: Some(kind.category()),
            message: kind.user_message(now),
        }
    }

    /// Transaction accepted but reverted on chain
    pub fn reverted(hash: impl Into<String>, kind: &TxErrorKind, now: u64) -> Self {
        TxOutcome {
            hash: Some(hash.into()),
            category: Some(ErrorCategory::ContractRevert),
            message: kind.user_message(now),
        }
    }

    /// Local validation failure; never generated a network call
    pub fn validation(message: impl Into<String>) -> Self {
        TxOutcome {
            hash: None,
            category: Some(ErrorCategory::ValidationError),
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.category.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cooldown_data(retry_at: u64) -> String {
        format!("0xc1ab61a1{:064x}", retry_at)
    }

    #[test]
    fn test_rejection_code_wins_over_everything() {
        let failure = RawCallFailure {
            code: Some(USER_REJECTED_CODE),
            data: Some(cooldown_data(u64::MAX / 2)),
            reason: Some("transfer failed".to_string()),
            message: Some("zero address".to_string()),
        };
        assert_eq!(classify(&failure), TxErrorKind::UserRejected);
    }

    #[test]
    fn test_cooldown_selector_decodes_retry_time() {
        let now = 1_700_000_000u64;
        let retry_at = now + 5_400; // 1h 30m out
        let failure = RawCallFailure {
            data: Some(cooldown_data(retry_at)),
            ..Default::default()
        };

        let kind = classify(&failure);
        assert_eq!(
            kind,
            TxErrorKind::CooldownActive {
                retry_at: Some(retry_at)
            }
        );
        assert_eq!(
            kind.user_message(now),
            "Cooldown active. Next claim available in 1h 30m"
        );
    }

    #[test]
    fn test_cooldown_retry_in_past_renders_plain_message() {
        let now = 1_700_000_000u64;
        let kind = classify(&RawCallFailure {
            data: Some(cooldown_data(now - 10)),
            ..Default::default()
        });
        assert_eq!(kind.user_message(now), "Cooldown period is still active");
    }

    #[test]
    fn test_bare_selector_table() {
        let cases = [
            ("0x1cd3f4d3", TxErrorKind::InsufficientBalance),
            ("0x30cd7471", TxErrorKind::NotOwner),
            ("0x90b8ec18", TxErrorKind::TransferFailed),
            ("0xd92e233d", TxErrorKind::ZeroAddress),
        ];
        for (data, expected) in cases {
            let failure = RawCallFailure {
                data: Some(data.to_string()),
                ..Default::default()
            };
            assert_eq!(classify(&failure), expected, "data {}", data);
        }
    }

    #[test]
    fn test_truncated_cooldown_data_still_classifies() {
        // Selector present but the parameter word is missing
        let failure = RawCallFailure {
            data: Some("0xc1ab61a1".to_string()),
            ..Default::default()
        };
        assert_eq!(
            classify(&failure),
            TxErrorKind::CooldownActive { retry_at: None }
        );
    }

    #[test]
    fn test_unknown_selector_falls_through_to_substrings() {
        let failure = RawCallFailure {
            data: Some("0xdeadbeef".to_string()),
            message: Some("execution reverted: cooldown not over".to_string()),
            ..Default::default()
        };
        assert_eq!(
            classify(&failure),
            TxErrorKind::CooldownActive { retry_at: None }
        );
    }

    #[test]
    fn test_substring_fallbacks() {
        let cases = [
            ("Insufficient balance for transfer", TxErrorKind::InsufficientBalance),
            ("COOLDOWN still running", TxErrorKind::CooldownActive { retry_at: None }),
            ("Ownable: caller is not the owner", TxErrorKind::NotOwner),
            ("caller is not owner", TxErrorKind::NotOwner),
            ("ERC20: transfer failed", TxErrorKind::TransferFailed),
            ("mint to the zero address", TxErrorKind::ZeroAddress),
        ];
        for (message, expected) in cases {
            let kind = classify(&RawCallFailure::from_message(message));
            assert_eq!(kind, expected, "message {:?}", message);
        }
    }

    #[test]
    fn test_reason_scanned_before_message() {
        let failure = RawCallFailure {
            reason: Some("cooldown".to_string()),
            message: Some("transfer failed".to_string()),
            ..Default::default()
        };
        assert_eq!(
            classify(&failure),
            TxErrorKind::CooldownActive { retry_at: None }
        );
    }

    #[test]
    fn test_unknown_preserves_original_text() {
        let failure = RawCallFailure::from_message("something exotic went wrong (code 77)");
        assert_eq!(
            classify(&failure),
            TxErrorKind::Unknown("something exotic went wrong (code 77)".to_string())
        );

        // Reason wins over message for the preserved text
        let failure = RawCallFailure {
            reason: Some("SomeWeirdReason".to_string()),
            message: Some("wrapped provider text".to_string()),
            ..Default::default()
        };
        assert_eq!(
            classify(&failure),
            TxErrorKind::Unknown("SomeWeirdReason".to_string())
        );

        // Nothing at all still produces a usable message
        assert_eq!(
            classify(&RawCallFailure::default()),
            TxErrorKind::Unknown("Transaction failed".to_string())
        );
    }

    #[test]
    fn test_from_provider_error_extracts_revert_data() {
        let retry_at = 1_700_005_400u64;
        let text = format!(
            "server returned an error response: error code 3: execution reverted, data: \"{}\"",
            cooldown_data(retry_at)
        );
        let failure = RawCallFailure::from_provider_error(&text);
        assert_eq!(
            classify(&failure),
            TxErrorKind::CooldownActive {
                retry_at: Some(retry_at)
            }
        );
    }

    #[test]
    fn test_provider_error_ignores_plain_addresses() {
        let failure = RawCallFailure::from_provider_error(
            "failed to reach 0xfa8D28F3c28b7D4Cc44015bEC986b0c4D63CC7B8: connection refused",
        );
        assert_eq!(failure.data, None);
        assert!(matches!(classify(&failure), TxErrorKind::Unknown(_)));
    }

    #[test]
    fn test_from_json_rpc() {
        let rejected = serde_json::json!({
            "code": 4001,
            "message": "User rejected the request."
        });
        assert_eq!(
            classify(&RawCallFailure::from_json_rpc(&rejected)),
            TxErrorKind::UserRejected
        );

        let reverted = serde_json::json!({
            "code": 3,
            "message": "execution reverted",
            "data": "0x1cd3f4d3"
        });
        assert_eq!(
            classify(&RawCallFailure::from_json_rpc(&reverted)),
            TxErrorKind::InsufficientBalance
        );

        let nested = serde_json::json!({
            "code": -32603,
            "message": "Internal JSON-RPC error.",
            "data": { "data": "0x30cd7471", "message": "execution reverted" }
        });
        assert_eq!(
            classify(&RawCallFailure::from_json_rpc(&nested)),
            TxErrorKind::NotOwner
        );
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            TxErrorKind::UserRejected.category(),
            ErrorCategory::UserRejected
        );
        assert_eq!(
            TxErrorKind::CooldownActive { retry_at: None }.category(),
            ErrorCategory::ContractRevert
        );
        assert_eq!(TxErrorKind::NotOwner.category(), ErrorCategory::ContractRevert);
        assert_eq!(
            TxErrorKind::Unknown("boom".to_string()).category(),
            ErrorCategory::NetworkOrUnknown
        );
    }

    #[test]
    fn test_outcome_shapes() {
        let ok = TxOutcome::success("0xabc", "Transaction confirmed");
        assert!(ok.is_success());
        assert_eq!(ok.hash.as_deref(), Some("0xabc"));

        let invalid = TxOutcome::validation("invalid address \"0x12\"");
        assert!(!invalid.is_success());
        assert_eq!(invalid.category, Some(ErrorCategory::ValidationError));
        assert_eq!(invalid.hash, None);

        let reverted = TxOutcome::reverted("0xdef", &TxErrorKind::TransferFailed, 0);
        assert_eq!(reverted.category, Some(ErrorCategory::ContractRevert));
        assert_eq!(reverted.hash.as_deref(), Some("0xdef"));
    }
}
