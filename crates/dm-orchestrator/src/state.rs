//! Re-entrancy state machines
//!
//! Both machines are owned by a single [`DesktopManager`](crate::DesktopManager)
//! and only ever locked for short, await-free critical sections.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Whether a launch attempt is in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionState {
    Idle,
    /// `attempt` identifies the launch holding the gate
    InProgress { attempt: u64 },
}

/// Allows at most one launch attempt at a time
///
/// [`try_begin`](Self::try_begin) hands out a guard that returns the gate to
/// `Idle` when dropped, so every exit path of a launch (including the launch
/// future being dropped mid-flight) clears the flag. A guard only clears the
/// attempt it started: if the gate was reset and re-entered meanwhile, the
/// stale guard leaves the newer attempt alone.
#[derive(Debug)]
pub struct AdmissionGate {
    state: Mutex<AdmissionState>,
    next_attempt: AtomicU64,
}

impl AdmissionGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(AdmissionState::Idle),
            next_attempt: AtomicU64::new(1),
        }
    }

    /// Enter the gate, or `None` when a launch is already in flight
    pub fn try_begin(&self) -> Option<AdmissionGuard<'_>> {
        let mut state = self.state.lock();
        if matches!(*state, AdmissionState::InProgress { .. }) {
            return None;
        }
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        *state = AdmissionState::InProgress { attempt };
        Some(AdmissionGuard {
            gate: self,
            attempt,
        })
    }

    /// Force the gate back to `Idle`
    pub fn reset(&self) {
        *self.state.lock() = AdmissionState::Idle;
    }

    pub fn state(&self) -> AdmissionState {
        *self.state.lock()
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self.state(), AdmissionState::InProgress { .. })
    }

    fn finish(&self, attempt: u64) {
        let mut state = self.state.lock();
        if *state == (AdmissionState::InProgress { attempt }) {
            *state = AdmissionState::Idle;
        }
    }
}

impl Default for AdmissionGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Held for the duration of one launch attempt
#[derive(Debug)]
pub struct AdmissionGuard<'a> {
    gate: &'a AdmissionGate,
    attempt: u64,
}

impl AdmissionGuard<'_> {
    pub fn attempt(&self) -> u64 {
        self.attempt
    }
}

impl Drop for AdmissionGuard<'_> {
    fn drop(&mut self) {
        self.gate.finish(self.attempt);
    }
}

/// Reconciliation loop phase
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcilePhase {
    Idle,
    Refreshing,
}

/// The pending re-arm timer of the reconciliation loop
#[derive(Debug)]
pub struct RearmTimer {
    id: u64,
    token: CancellationToken,
}

impl RearmTimer {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Cancel the timer; cancelling twice is a no-op
    pub fn cancel(&self) {
        self.token.cancel();
    }
}

/// Phase plus the single pending re-arm timer
#[derive(Debug)]
pub struct ReconciliationState {
    phase: ReconcilePhase,
    rearm: Option<RearmTimer>,
    next_timer_id: u64,
}

impl ReconciliationState {
    pub fn new() -> Self {
        Self {
            phase: ReconcilePhase::Idle,
            rearm: None,
            next_timer_id: 1,
        }
    }

    pub fn phase(&self) -> ReconcilePhase {
        self.phase
    }

    pub fn is_refreshing(&self) -> bool {
        self.phase == ReconcilePhase::Refreshing
    }

    pub fn has_pending_rearm(&self) -> bool {
        self.rearm.is_some()
    }

    /// Enter `Refreshing`. Returns `false` if a cycle is already in flight.
    pub fn begin_cycle(&mut self) -> bool {
        if self.is_refreshing() {
            return false;
        }
        self.phase = ReconcilePhase::Refreshing;
        true
    }

    pub fn end_cycle(&mut self) {
        self.phase = ReconcilePhase::Idle;
    }

    /// Record a new pending timer, cancelling any previous one. Returns its id.
    pub fn arm(&mut self, token: CancellationToken) -> u64 {
        self.cancel_rearm();
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        self.rearm = Some(RearmTimer { id, token });
        id
    }

    /// Whether `id` is still the pending timer
    pub fn owns_rearm(&self, id: u64) -> bool {
        self.rearm.as_ref().map(|t| t.id) == Some(id)
    }

    /// Remove the pending timer without cancelling it
    pub fn take_rearm(&mut self) -> Option<RearmTimer> {
        self.rearm.take()
    }

    /// Cancel and forget the pending timer, if any
    pub fn cancel_rearm(&mut self) {
        if let Some(timer) = self.rearm.take() {
            timer.cancel();
        }
    }
}

impl Default for ReconciliationState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_rejects_second_attempt() {
        let gate = AdmissionGate::new();
        let first = gate.try_begin();
        assert!(first.is_some());
        assert!(gate.is_in_progress());
        assert!(gate.try_begin().is_none());

        drop(first);
        assert_eq!(gate.state(), AdmissionState::Idle);
        assert!(gate.try_begin().is_some());
    }

    #[test]
    fn test_stale_guard_does_not_clear_newer_attempt() {
        let gate = AdmissionGate::new();
        let stale = gate.try_begin().unwrap();

        gate.reset();
        let current = gate.try_begin().unwrap();
        assert_ne!(stale.attempt(), current.attempt());

        drop(stale);
        assert!(gate.is_in_progress());

        drop(current);
        assert!(!gate.is_in_progress());
    }

    #[test]
    fn test_single_cycle_in_flight() {
        let mut state = ReconciliationState::new();
        assert!(state.begin_cycle());
        assert!(!state.begin_cycle());
        state.end_cycle();
        assert_eq!(state.phase(), ReconcilePhase::Idle);
        assert!(state.begin_cycle());
    }

    #[test]
    fn test_arm_replaces_and_cancels_previous_timer() {
        let mut state = ReconciliationState::new();
        let first_token = CancellationToken::new();
        let first = state.arm(first_token.clone());
        let second = state.arm(CancellationToken::new());

        assert!(first_token.is_cancelled());
        assert!(!state.owns_rearm(first));
        assert!(state.owns_rearm(second));
    }

    #[test]
    fn test_cancel_rearm_is_idempotent() {
        let mut state = ReconciliationState::new();
        state.cancel_rearm();

        let token = CancellationToken::new();
        state.arm(token.clone());
        state.cancel_rearm();
        state.cancel_rearm();

        assert!(token.is_cancelled());
        assert!(!state.has_pending_rearm());
    }
}
