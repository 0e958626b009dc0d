//! Status reconciliation loop
//!
//! One cycle lists the user's desktops, checks every job's running status
//! concurrently and rebuilds the published snapshot. After each cycle the loop
//! re-arms itself: a timer counts down `countdown_ticks` ticks and then starts
//! the next cycle. An explicit refresh preempts the pending timer.
//!
//! The previous snapshot stays visible until the first status check of the
//! new cycle settles, so the list never flashes empty between polls. Entries
//! are appended in completion order.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use dm_core::types::{ConfigurationName, DesktopScope, JobRecord};

use crate::manager::Shared;

const MIN_TICK: Duration = Duration::from_millis(1);

/// Result of a refresh request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// A new cycle was spawned
    Started,
    /// A cycle is already in flight; the request was dropped
    AlreadyRunning,
    /// The view was closed
    TornDown,
}

/// Start a cycle unless one is in flight, cancelling any pending timer
pub(crate) fn request_refresh(shared: &Arc<Shared>, scope: DesktopScope) -> RefreshStatus {
    let mut state = shared.reconcile.lock();
    if shared.is_torn_down() {
        return RefreshStatus::TornDown;
    }
    if !state.begin_cycle() {
        tracing::debug!("Refresh already in progress, ignoring request for {}", scope);
        return RefreshStatus::AlreadyRunning;
    }
    state.cancel_rearm();
    drop(state);

    tokio::spawn(run_cycle(Arc::clone(shared), scope));
    RefreshStatus::Started
}

/// One reconciliation cycle. The caller must have entered `Refreshing`.
async fn run_cycle(shared: Arc<Shared>, scope: DesktopScope) {
    tracing::debug!("Refreshing desktop list for {}", scope);

    match shared
        .remote(shared.api.list(&scope.configuration, &scope.username))
        .await
    {
        Ok(jobs) if jobs.is_empty() => {
            shared.publish_snapshot(|snapshot| snapshot.clear());
        }
        Ok(jobs) => {
            collect_statuses(&shared, &scope.configuration, jobs).await;
        }
        Err(e) => {
            tracing::warn!("Desktop listing failed for {}: {}", scope, e);
            if !shared.is_torn_down() {
                shared.notify("Could not refresh desktop list!");
            }
        }
    }

    finish_cycle(&shared, scope);
}

/// Fan out one status check per job and merge results as they arrive
async fn collect_statuses(shared: &Shared, configuration: &ConfigurationName, jobs: Vec<JobRecord>) {
    let mut checks: FuturesUnordered<_> = jobs
        .into_iter()
        .map(|job| async move {
            let status = shared
                .remote(shared.api.is_running(configuration, &job.job_id))
                .await;
            (job, status)
        })
        .collect();

    let mut flushed = false;
    while let Some((job, status)) = checks.next().await {
        match status {
            Ok(running) => {
                let flush = !flushed;
                flushed = true;
                shared.publish_snapshot(|snapshot| {
                    if flush {
                        snapshot.clear();
                    }
                    snapshot.push(job.with_status(running));
                });
            }
            Err(e) => {
                tracing::warn!("Status check failed for desktop #{}: {}", job.job_id, e);
            }
        }
    }
}

/// Leave `Refreshing`, reset the countdown and arm the next cycle
fn finish_cycle(shared: &Arc<Shared>, scope: DesktopScope) {
    let mut state = shared.reconcile.lock();
    state.end_cycle();

    if shared.is_torn_down() {
        tracing::debug!("View closed, not re-arming refresh for {}", scope);
        return;
    }

    shared.countdown.send_replace(shared.settings.countdown_ticks);
    shared.cycles.send_modify(|n| *n += 1);

    let token = shared.view.child_token();
    let timer_id = state.arm(token.clone());
    drop(state);

    tokio::spawn(rearm(Arc::clone(shared), scope, timer_id, token));
}

/// Count down, then run the next cycle if this timer is still the pending one
async fn rearm(shared: Arc<Shared>, scope: DesktopScope, timer_id: u64, token: CancellationToken) {
    // A zero period would panic the interval and zero ticks would spin
    let tick = shared.settings.tick_interval.max(MIN_TICK);
    let ticks = shared.settings.countdown_ticks.max(1);
    let mut interval = interval_at(Instant::now() + tick, tick);

    for _ in 0..ticks {
        tokio::select! {
            _ = token.cancelled() => {
                tracing::trace!("Refresh timer {} cancelled", timer_id);
                return;
            }
            _ = interval.tick() => {
                let state = shared.reconcile.lock();
                if token.is_cancelled() || !state.owns_rearm(timer_id) {
                    return;
                }
                shared.countdown.send_modify(|c| *c = c.saturating_sub(1));
            }
        }
    }

    {
        let mut state = shared.reconcile.lock();
        if token.is_cancelled() || !state.owns_rearm(timer_id) {
            return;
        }
        state.take_rearm();
        if !state.begin_cycle() {
            return;
        }
    }

    run_cycle(shared, scope).await;
}
