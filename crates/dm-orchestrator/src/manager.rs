//! Desktop manager
//!
//! Owns the admission gate, the reconciliation loop and the deletion workflow
//! for one active view, and publishes their state to the display layer.

use std::future::Future;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use dm_core::config::ManagerSettings;
use dm_core::error::RemoteError;
use dm_core::traits::{ConfirmDeletion, JobApi, NotificationSink};
use dm_core::types::{
    Configuration, ConfigurationName, DesktopScope, DesktopSnapshot, JobId, LaunchParameters,
};

use crate::admission::{self, LaunchOutcome};
use crate::deletion::{self, DeleteOutcome};
use crate::notify::BroadcastNotifier;
use crate::reconcile::{self, RefreshStatus};
use crate::state::{AdmissionGate, ReconciliationState};

/// The configuration the user currently works with
#[derive(Debug, Clone)]
struct Selection {
    name: String,
    configuration: Configuration,
    parameters: LaunchParameters,
}

/// State shared between the manager handle and its background tasks
pub(crate) struct Shared {
    pub(crate) api: Arc<dyn JobApi>,
    notifier: Arc<dyn NotificationSink>,
    pub(crate) settings: ManagerSettings,
    pub(crate) admission: AdmissionGate,
    pub(crate) reconcile: Mutex<ReconciliationState>,
    pub(crate) snapshot: watch::Sender<DesktopSnapshot>,
    pub(crate) countdown: watch::Sender<u32>,
    pub(crate) cycles: watch::Sender<u64>,
    pub(crate) deleted: Mutex<Vec<JobId>>,
    selection: Mutex<Option<Selection>>,
    /// Cancelled when the view is torn down
    pub(crate) view: CancellationToken,
    broadcast: Option<BroadcastNotifier>,
}

impl Shared {
    /// Push a message to the notification sink
    pub(crate) fn notify(&self, message: &str) {
        tracing::info!("{}", message);
        self.notifier.notify(message);
    }

    /// Run a remote call, bounded by the configured request timeout
    pub(crate) async fn remote<T, F>(&self, call: F) -> Result<T, RemoteError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        match self.settings.request_timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .unwrap_or(Err(RemoteError::Timeout(limit))),
            None => call.await,
        }
    }

    pub(crate) fn is_torn_down(&self) -> bool {
        self.view.is_cancelled()
    }

    /// Apply `f` to the published snapshot unless the view is gone
    ///
    /// Runs under the reconciliation lock so that a concurrent teardown
    /// either happens entirely before or entirely after the update.
    pub(crate) fn publish_snapshot<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut DesktopSnapshot),
    {
        let _state = self.reconcile.lock();
        if self.is_torn_down() {
            return false;
        }
        self.snapshot.send_modify(f);
        true
    }
}

/// Client-side orchestrator for one user's desktops
///
/// Cheap operations (`refresh_desktop_list`, the getters) return immediately;
/// launch and deletion resolve once their remote calls settle. Background
/// work is spawned onto the current tokio runtime, so the manager must be
/// used from within one.
///
/// Dropping the manager tears the view down, see [`close_view`](Self::close_view).
pub struct DesktopManager {
    shared: Arc<Shared>,
}

impl DesktopManager {
    /// Create a manager that pushes notifications to `notifier`
    pub fn new(
        api: Arc<dyn JobApi>,
        settings: ManagerSettings,
        notifier: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::build(api, settings, notifier, None)
    }

    /// Create a manager whose notifications can be subscribed to
    pub fn with_broadcast(api: Arc<dyn JobApi>, settings: ManagerSettings) -> Self {
        let notifier = BroadcastNotifier::new();
        Self::build(api, settings, Arc::new(notifier.clone()), Some(notifier))
    }

    fn build(
        api: Arc<dyn JobApi>,
        settings: ManagerSettings,
        notifier: Arc<dyn NotificationSink>,
        broadcast: Option<BroadcastNotifier>,
    ) -> Self {
        let (snapshot, _) = watch::channel(DesktopSnapshot::new());
        let (countdown, _) = watch::channel(settings.countdown_ticks);
        let (cycles, _) = watch::channel(0);

        Self {
            shared: Arc::new(Shared {
                api,
                notifier,
                settings,
                admission: AdmissionGate::new(),
                reconcile: Mutex::new(ReconciliationState::new()),
                snapshot,
                countdown,
                cycles,
                deleted: Mutex::new(Vec::new()),
                selection: Mutex::new(None),
                view: CancellationToken::new(),
                broadcast,
            }),
        }
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.shared.settings
    }

    // ---- selection ----

    /// Select a configuration
    ///
    /// Selecting the already-selected name does nothing and returns `false`.
    /// Otherwise the launch parameters are reset to the configuration's
    /// defaults and the admission gate is cleared.
    pub fn select_configuration(&self, name: &str, configuration: &Configuration) -> bool {
        let mut selection = self.shared.selection.lock();
        if selection.as_ref().is_some_and(|s| s.name == name) {
            return false;
        }

        self.shared.admission.reset();
        let settings = &self.shared.settings;
        *selection = Some(Selection {
            name: name.to_string(),
            configuration: configuration.clone(),
            parameters: LaunchParameters::from_defaults(
                &configuration.defaults,
                settings.default_nodes,
                &settings.default_resolution,
            ),
        });
        tracing::debug!("Selected configuration {} ({})", name, configuration.name);
        true
    }

    /// The selected configuration, if any
    pub fn selected_configuration(&self) -> Option<Configuration> {
        self.shared
            .selection
            .lock()
            .as_ref()
            .map(|s| s.configuration.clone())
    }

    /// Launch parameters of the current selection
    pub fn launch_parameters(&self) -> Option<LaunchParameters> {
        self.shared
            .selection
            .lock()
            .as_ref()
            .map(|s| s.parameters.clone())
    }

    /// Edit the launch parameters of the current selection.
    /// Returns `false` when nothing is selected.
    pub fn update_launch_parameters<F>(&self, f: F) -> bool
    where
        F: FnOnce(&mut LaunchParameters),
    {
        match self.shared.selection.lock().as_mut() {
            Some(selection) => {
                f(&mut selection.parameters);
                true
            }
            None => false,
        }
    }

    // ---- operations ----

    /// Launch a desktop, subject to admission control
    pub async fn launch_desktop(
        &self,
        parameters: LaunchParameters,
        configuration: &Configuration,
        username: &str,
    ) -> LaunchOutcome {
        admission::launch_desktop(&self.shared, parameters, configuration, username).await
    }

    /// Ask for confirmation, then stop the desktop
    pub async fn stop_desktop(
        &self,
        scope: &DesktopScope,
        job_id: &JobId,
        confirm: &dyn ConfirmDeletion,
    ) -> DeleteOutcome {
        deletion::stop_desktop(&self.shared, scope, job_id, confirm).await
    }

    /// Start a reconciliation cycle for `scope` now
    ///
    /// Preempts a pending re-arm timer. Does nothing while a cycle is in
    /// flight or after the view was closed.
    pub fn refresh_desktop_list(&self, scope: DesktopScope) -> RefreshStatus {
        reconcile::request_refresh(&self.shared, scope)
    }

    pub fn is_launch_in_progress(&self) -> bool {
        self.shared.admission.is_in_progress()
    }

    pub fn is_refresh_in_progress(&self) -> bool {
        self.shared.reconcile.lock().is_refreshing()
    }

    // ---- display surface ----

    /// Current snapshot
    pub fn snapshot(&self) -> DesktopSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    pub fn subscribe_snapshot(&self) -> watch::Receiver<DesktopSnapshot> {
        self.shared.snapshot.subscribe()
    }

    /// Ticks left until the next cycle
    pub fn countdown(&self) -> u32 {
        *self.shared.countdown.borrow()
    }

    pub fn subscribe_countdown(&self) -> watch::Receiver<u32> {
        self.shared.countdown.subscribe()
    }

    /// Number of finished reconciliation cycles, bumped after each one
    pub fn subscribe_cycles(&self) -> watch::Receiver<u64> {
        self.shared.cycles.subscribe()
    }

    /// Subscribe to notifications, if built with [`with_broadcast`](Self::with_broadcast)
    pub fn subscribe_notifications(&self) -> Option<broadcast::Receiver<String>> {
        self.shared.broadcast.as_ref().map(|b| b.subscribe())
    }

    /// Ids of desktops deleted through this manager
    ///
    /// Recorded on every successful stop but not consulted by any cycle.
    pub fn deleted_desktop_ids(&self) -> Vec<JobId> {
        self.shared.deleted.lock().clone()
    }

    /// Navigation target of the viewer for a desktop
    pub fn show_desktop_path(configuration: &ConfigurationName, job_id: &JobId) -> String {
        format!("/desktop-viewer/{}/{}", configuration, job_id)
    }

    // ---- teardown ----

    /// Tear the view down
    ///
    /// Cancels the pending re-arm timer. A cycle in flight runs to completion
    /// but publishes nothing and does not re-arm. Calling this more than once
    /// is a no-op.
    pub fn close_view(&self) {
        let mut state = self.shared.reconcile.lock();
        if !self.shared.view.is_cancelled() {
            tracing::debug!("Closing desktop view");
        }
        self.shared.view.cancel();
        state.cancel_rearm();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_torn_down()
    }
}

impl Drop for DesktopManager {
    fn drop(&mut self) {
        self.close_view();
    }
}
