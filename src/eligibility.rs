//! Claim Eligibility Engine
//!
//! Decides whether an address can claim from the faucet and how long
//! remains until it can, from three integers: the address's last claim
//! timestamp, the faucet cooldown, and the current wall clock. Nothing
//! on chain signals the cooldown expiring, so a countdown task recomputes
//! eligibility at 1 Hz while a view is active and publishes the result
//! over a watch channel.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::debug;

// ============================================================================
// Eligibility computation
// ============================================================================

/// Claim phase for an address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClaimPhase {
    Ready,
    Cooldown,
}

impl ClaimPhase {
    /// Get the phase as a lowercase string
    pub fn as_str(&self) -> &'static str {
        match self {
            ClaimPhase::Ready => "ready",
            ClaimPhase::Cooldown => "cooldown",
        }
    }
}

impl fmt::Display for ClaimPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Derived claim eligibility for one address at one instant
///
/// Recomputed every tick from the faucet snapshot and wall-clock time,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimEligibility {
    /// Whether a claim is allowed right now
    pub can_claim: bool,
    /// Seconds until the next claim becomes available (0 when claimable)
    pub seconds_remaining: u64,
    /// Human-readable countdown ("Now", "24h 0m", "2m 5s", "59s")
    pub display: String,
}

impl ClaimEligibility {
    pub fn phase(&self) -> ClaimPhase {
        if self.can_claim {
            ClaimPhase::Ready
        } else {
            ClaimPhase::Cooldown
        }
    }
}

/// Current unix time in seconds
pub fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Compute claim eligibility from raw faucet timing fields
///
/// `can_claim` is true iff the address never claimed
/// (`last_claim_timestamp == 0`) or the cooldown has fully elapsed
/// (`now >= last_claim_timestamp + cooldown_seconds`). `seconds_remaining`
/// clamps at zero.
pub fn compute_eligibility(
    last_claim_timestamp: u64,
    cooldown_seconds: u64,
    now: u64,
) -> ClaimEligibility {
    if last_claim_timestamp == 0 {
        return ClaimEligibility {
            can_claim: true,
            seconds_remaining: 0,
            display: "Now".to_string(),
        };
    }

    let next_claim_at = last_claim_timestamp.saturating_add(cooldown_seconds);
    let seconds_remaining = next_claim_at.saturating_sub(now);

    ClaimEligibility {
        can_claim: seconds_remaining == 0,
        seconds_remaining,
        display: format_remaining(seconds_remaining),
    }
}

/// Format a remaining-seconds count for display
///
/// Exact tiering: `"Now"` at zero, `"{h}h {m}m"` from one hour up,
/// `"{m}m {s}s"` from one minute up, `"{s}s"` below that. Callers clamp
/// negative remainders to zero before calling.
pub fn format_remaining(seconds: u64) -> String {
    if seconds == 0 {
        return "Now".to_string();
    }

    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    let secs = seconds % 60;

    if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

/// Whole claims the faucet can still serve at its current balance
pub fn claims_remaining(faucet_balance: U256, claim_amount: U256) -> u64 {
    if claim_amount.is_zero() {
        return 0;
    }
    (faucet_balance / claim_amount).try_into().unwrap_or(u64::MAX)
}

// ============================================================================
// Countdown task
// ============================================================================

/// Timing inputs the countdown task recomputes from
///
/// The store republishes these whenever a refresh or an optimistic claim
/// changes them; the task picks the new values up on its next tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CooldownInputs {
    /// Unix timestamp of the address's last claim (0 = never claimed)
    pub last_claim_timestamp: u64,
    /// Faucet cooldown in seconds
    pub cooldown_seconds: u64,
}

/// Handle to a running countdown task
///
/// The task recomputes [`ClaimEligibility`] once per second and publishes
/// it over a watch channel. Stopping the handle (or dropping it) cancels
/// the task, so a torn-down view cannot leak a recurring timer.
pub struct CountdownHandle {
    eligibility_rx: watch::Receiver<ClaimEligibility>,
    stop_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl CountdownHandle {
    /// Latest published eligibility
    pub fn current(&self) -> ClaimEligibility {
        self.eligibility_rx.borrow().clone()
    }

    /// Subscribe to eligibility updates
    ///
    /// The channel only wakes subscribers when the computed value actually
    /// changes, so an idle READY state does not generate 1 Hz noise.
    pub fn subscribe(&self) -> watch::Receiver<ClaimEligibility> {
        self.eligibility_rx.clone()
    }

    /// Stop the countdown task
    pub fn stop(self) {
        let _ = self.stop_tx.try_send(());
        self.task.abort();
    }
}

impl Drop for CountdownHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Spawn the 1 Hz countdown task
///
/// Reads the latest [`CooldownInputs`] from the given watch channel on
/// every tick, so input changes take effect within one second without any
/// extra signalling.
pub fn start_countdown(inputs: watch::Receiver<CooldownInputs>) -> CountdownHandle {
    let first = {
        let inp = inputs.borrow();
        compute_eligibility(inp.last_claim_timestamp, inp.cooldown_seconds, now_unix())
    };
    let (eligibility_tx, eligibility_rx) = watch::channel(first);
    let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);

    let task = tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(1));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let inp = *inputs.borrow();
                    let eligibility = compute_eligibility(
                        inp.last_claim_timestamp,
                        inp.cooldown_seconds,
                        now_unix(),
                    );
                    eligibility_tx.send_if_modified(|current| {
                        if *current != eligibility {
                            *current = eligibility;
                            true
                        } else {
                            false
                        }
                    });
                }
                _ = stop_rx.recv() => {
                    debug!("Countdown task stopped");
                    break;
                }
            }
        }
    });

    CountdownHandle {
        eligibility_rx,
        stop_tx,
        task,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_never_claimed_is_ready() {
        for cooldown in [0u64, 1, 3600, 86400] {
            let e = compute_eligibility(0, cooldown, 5_000);
            assert!(e.can_claim);
            assert_eq!(e.seconds_remaining, 0);
            assert_eq!(e.display, "Now");
        }
    }

    #[test]
    fn test_ready_after_cooldown_elapsed() {
        let e = compute_eligibility(1_000, 600, 1_600);
        assert!(e.can_claim, "boundary instant is claimable");
        assert_eq!(e.seconds_remaining, 0);

        let e = compute_eligibility(1_000, 600, 10_000);
        assert!(e.can_claim);
        assert_eq!(e.display, "Now");
    }

    #[test]
    fn test_cooldown_countdown() {
        let e = compute_eligibility(1_000, 600, 1_599);
        assert!(!e.can_claim);
        assert_eq!(e.seconds_remaining, 1);
        assert_eq!(e.display, "1s");

        let e = compute_eligibility(1_000, 600, 1_100);
        assert!(!e.can_claim);
        assert_eq!(e.seconds_remaining, 500);
        assert_eq!(e.display, "8m 20s");
    }

    #[test]
    fn test_fresh_claim_full_cooldown() {
        // Claim just landed: the whole 24h cooldown is ahead
        let e = compute_eligibility(1_000, 86_400, 1_000);
        assert!(!e.can_claim);
        assert_eq!(e.seconds_remaining, 86_400);
        assert_eq!(e.display, "24h 0m");
    }

    #[test]
    fn test_format_remaining_tiers() {
        assert_eq!(format_remaining(0), "Now");
        assert_eq!(format_remaining(59), "59s");
        assert_eq!(format_remaining(60), "1m 0s");
        assert_eq!(format_remaining(125), "2m 5s");
        assert_eq!(format_remaining(3600), "1h 0m");
        assert_eq!(format_remaining(3661), "1h 1m");
        assert_eq!(format_remaining(86_400), "24h 0m");
    }

    #[test]
    fn test_phase() {
        assert_eq!(compute_eligibility(0, 600, 0).phase(), ClaimPhase::Ready);
        assert_eq!(
            compute_eligibility(1_000, 600, 1_001).phase(),
            ClaimPhase::Cooldown
        );
        assert_eq!(ClaimPhase::Cooldown.to_string(), "cooldown");
    }

    #[test]
    fn test_claims_remaining() {
        assert_eq!(
            claims_remaining(U256::from(1000u64), U256::from(100u64)),
            10
        );
        // rounds down
        assert_eq!(claims_remaining(U256::from(199u64), U256::from(100u64)), 1);
        assert_eq!(claims_remaining(U256::from(99u64), U256::from(100u64)), 0);
        // zero claim amount never divides
        assert_eq!(claims_remaining(U256::from(1000u64), U256::ZERO), 0);
    }

    #[tokio::test]
    async fn test_countdown_publishes_initial_state() {
        let (_inputs_tx, inputs_rx) = watch::channel(CooldownInputs::default());
        let handle = start_countdown(inputs_rx);
        let current = handle.current();
        assert!(current.can_claim);
        assert_eq!(current.display, "Now");
        handle.stop();
    }

    #[tokio::test(start_paused = true)]
    async fn test_countdown_picks_up_input_changes() {
        let (inputs_tx, inputs_rx) = watch::channel(CooldownInputs::default());
        let handle = start_countdown(inputs_rx);
        assert!(handle.current().can_claim);

        // A claim just happened: next tick must flip to cooldown
        inputs_tx
            .send(CooldownInputs {
                last_claim_timestamp: now_unix(),
                cooldown_seconds: 3_600,
            })
            .expect("countdown task alive");

        let mut sub = handle.subscribe();
        let eligibility = tokio::time::timeout(
            Duration::from_secs(5),
            sub.wait_for(|e| !e.can_claim),
        )
        .await
        .expect("countdown tick within timeout")
        .expect("countdown channel open")
        .clone();

        assert!(!eligibility.can_claim);
        assert!(eligibility.seconds_remaining > 3_590);
        handle.stop();
    }

    #[tokio::test]
    async fn test_countdown_cancelled_on_drop() {
        let (inputs_tx, inputs_rx) = watch::channel(CooldownInputs::default());
        let handle = start_countdown(inputs_rx);
        let mut sub = handle.subscribe();

        drop(handle);

        // The task owns the publishing side; abort closes the channel
        assert!(sub.changed().await.is_err());
        drop(inputs_tx);
    }
}
