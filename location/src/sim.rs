//! In-memory location provider for desktop development and tests.
//!
//! Every platform answer is scripted through setters, every platform call is
//! counted, and subscriptions stay open until removed so that batches can be
//! pushed into them at will.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_channel::{Receiver, Sender, unbounded};
use log::debug;

use crate::bridge::{Permission, PermissionProvider, PermissionStatus};
use crate::{
    GeolocationError, LocationOptions, LocationService, RawLocation, ServiceAvailability,
    SettingsCheck, UpdateSink,
};

/// Scripted answer to a settings check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimSettings {
    /// Settings satisfy every request.
    Satisfied,
    /// Location is off; the user can be prompted to switch it on.
    NeedsResolution,
    /// The check fails with this cause.
    Failed(String),
}

/// Scripted answer to a single-location request.
#[derive(Debug, Clone, PartialEq)]
pub enum SimFix {
    /// Answer with this reading.
    Respond(RawLocation),
    /// Answer that no fix arrived in time.
    NoFix,
    /// Never answer.
    Hang,
    /// Fail with this cause.
    Fail(String),
}

/// Handle of a simulated subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimSubscription(u64);

/// Token of a launched simulated prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SimResolution(u64);

/// Counts of platform calls made against the simulator.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimCalls {
    /// Service-availability checks.
    pub availability_checks: usize,
    /// Intervals passed to each settings check, in call order.
    pub settings_intervals: Vec<u64>,
    /// Prompts launched.
    pub resolutions_launched: usize,
    /// Single-location requests.
    pub fetches: usize,
    /// Subscriptions started.
    pub subscriptions: usize,
    /// Subscriptions removed.
    pub removals: usize,
}

impl SimCalls {
    /// Total number of platform calls of any kind.
    #[must_use]
    pub fn total(&self) -> usize {
        self.availability_checks
            + self.settings_intervals.len()
            + self.resolutions_launched
            + self.fetches
            + self.subscriptions
            + self.removals
    }
}

#[derive(Debug)]
struct SimState {
    availability: ServiceAvailability,
    settings: SimSettings,
    fix: SimFix,
    location_enabled: bool,
    vertical_accuracy: bool,
    refuse_subscriptions: Option<String>,
    subscriptions: BTreeMap<SimSubscription, (LocationOptions, UpdateSink)>,
    next_id: u64,
    calls: SimCalls,
}

/// A scriptable [`LocationService`].
#[derive(Debug)]
pub struct SimulatedLocationService {
    state: Mutex<SimState>,
    prompts: Sender<SimResolution>,
    prompt_receiver: Receiver<SimResolution>,
}

impl Default for SimulatedLocationService {
    fn default() -> Self {
        let (prompts, prompt_receiver) = unbounded();
        Self {
            state: Mutex::new(SimState {
                availability: ServiceAvailability::Available,
                settings: SimSettings::Satisfied,
                fix: SimFix::NoFix,
                location_enabled: true,
                vertical_accuracy: true,
                refuse_subscriptions: None,
                subscriptions: BTreeMap::new(),
                next_id: 1,
                calls: SimCalls::default(),
            }),
            prompts,
            prompt_receiver,
        }
    }
}

impl SimulatedLocationService {
    /// A simulator with services available, settings satisfied and no fix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the service-availability answer.
    pub fn set_availability(&self, availability: ServiceAvailability) {
        self.lock().availability = availability;
    }

    /// Script the settings-check answer.
    pub fn set_settings(&self, settings: SimSettings) {
        self.lock().settings = settings;
    }

    /// Script the single-location answer.
    pub fn set_fix(&self, fix: SimFix) {
        self.lock().fix = fix;
    }

    /// Script whether location is switched on.
    pub fn set_location_enabled(&self, enabled: bool) {
        self.lock().location_enabled = enabled;
    }

    /// Script whether this platform version reports vertical accuracy.
    pub fn set_vertical_accuracy_supported(&self, supported: bool) {
        self.lock().vertical_accuracy = supported;
    }

    /// Make new subscriptions fail with `cause`, or succeed again with `None`.
    pub fn refuse_subscriptions(&self, cause: Option<String>) {
        self.lock().refuse_subscriptions = cause;
    }

    /// Prompts launched so far and not yet taken, in launch order.
    #[must_use]
    pub fn prompts(&self) -> Receiver<SimResolution> {
        self.prompt_receiver.clone()
    }

    /// A snapshot of the platform call counts.
    #[must_use]
    pub fn calls(&self) -> SimCalls {
        self.lock().calls.clone()
    }

    /// Handles of the running subscriptions, oldest first.
    #[must_use]
    pub fn active_subscriptions(&self) -> Vec<SimSubscription> {
        self.lock().subscriptions.keys().copied().collect()
    }

    /// The options a running subscription was started with.
    #[must_use]
    pub fn subscription_options(&self, subscription: SimSubscription) -> Option<LocationOptions> {
        self.lock()
            .subscriptions
            .get(&subscription)
            .map(|(options, _)| *options)
    }

    /// Deliver the same batches, in order, to every running subscription.
    ///
    /// Returns the number of subscriptions reached. All batches are queued
    /// before any consumer can react to the first one.
    pub fn emit(&self, batches: &[Vec<RawLocation>]) -> usize {
        let state = self.lock();
        state
            .subscriptions
            .values()
            .filter(|(_, sink)| batches.iter().all(|batch| sink.deliver(batch.clone())))
            .count()
    }

    /// Deliver a batch to one subscription. Returns `false` if it is not running.
    pub fn emit_to(&self, subscription: SimSubscription, batch: Vec<RawLocation>) -> bool {
        self.lock()
            .subscriptions
            .get(&subscription)
            .is_some_and(|(_, sink)| sink.deliver(batch))
    }

    /// Report a failure to every running subscription.
    pub fn fail_all(&self, error: &GeolocationError) -> usize {
        self.lock()
            .subscriptions
            .values()
            .filter(|(_, sink)| sink.fail(error.clone()))
            .count()
    }
}

impl LocationService for SimulatedLocationService {
    type Subscription = SimSubscription;
    type Resolution = SimResolution;

    fn check_service_availability(&self) -> ServiceAvailability {
        let mut state = self.lock();
        state.calls.availability_checks += 1;
        state.availability.clone()
    }

    fn check_settings(
        &self,
        _options: &LocationOptions,
        interval_millis: u64,
    ) -> impl Future<Output = SettingsCheck<SimResolution>> + Send {
        let answer = {
            let mut state = self.lock();
            state.calls.settings_intervals.push(interval_millis);
            match state.settings.clone() {
                SimSettings::Satisfied => SettingsCheck::Satisfied,
                SimSettings::Failed(cause) => SettingsCheck::Failed(cause),
                SimSettings::NeedsResolution => {
                    let id = state.next_id;
                    state.next_id += 1;
                    SettingsCheck::NeedsResolution(SimResolution(id))
                }
            }
        };
        async move { answer }
    }

    fn launch_resolution(&self, resolution: SimResolution) {
        self.lock().calls.resolutions_launched += 1;
        debug!("simulated resolution prompt {resolution:?} launched");
        // The receiver lives as long as the simulator, so this cannot fail.
        let _ = self.prompts.try_send(resolution);
    }

    fn current_location(
        &self,
        _options: &LocationOptions,
    ) -> impl Future<Output = Result<Option<RawLocation>, GeolocationError>> + Send {
        let fix = {
            let mut state = self.lock();
            state.calls.fetches += 1;
            state.fix.clone()
        };
        async move {
            match fix {
                SimFix::Respond(raw) => Ok(Some(raw)),
                SimFix::NoFix => Ok(None),
                SimFix::Fail(cause) => Err(GeolocationError::Platform(cause)),
                SimFix::Hang => futures::future::pending().await,
            }
        }
    }

    fn request_location_updates(
        &self,
        options: &LocationOptions,
        sink: UpdateSink,
    ) -> Result<SimSubscription, GeolocationError> {
        let mut state = self.lock();
        if let Some(cause) = &state.refuse_subscriptions {
            return Err(GeolocationError::platform(cause));
        }
        state.calls.subscriptions += 1;
        let subscription = SimSubscription(state.next_id);
        state.next_id += 1;
        state.subscriptions.insert(subscription, (*options, sink));
        Ok(subscription)
    }

    fn remove_location_updates(&self, subscription: SimSubscription) {
        let mut state = self.lock();
        state.calls.removals += 1;
        state.subscriptions.remove(&subscription);
    }

    fn is_location_enabled(&self) -> bool {
        self.lock().location_enabled
    }

    fn reports_vertical_accuracy(&self) -> bool {
        self.lock().vertical_accuracy
    }
}

/// A scriptable [`PermissionProvider`].
#[derive(Debug)]
pub struct SimulatedPermissions {
    state: Mutex<(PermissionStatus, PermissionStatus, usize)>,
}

impl SimulatedPermissions {
    /// Permissions currently in `status`; a request moves them to `after_request`.
    #[must_use]
    pub fn new(status: PermissionStatus, after_request: PermissionStatus) -> Self {
        Self {
            state: Mutex::new((status, after_request, 0)),
        }
    }

    /// Permissions that are already granted.
    #[must_use]
    pub fn granted() -> Self {
        Self::new(PermissionStatus::Granted, PermissionStatus::Granted)
    }

    fn lock(&self) -> MutexGuard<'_, (PermissionStatus, PermissionStatus, usize)> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of permission requests made.
    #[must_use]
    pub fn requests(&self) -> usize {
        self.lock().2
    }
}

impl PermissionProvider for SimulatedPermissions {
    fn check(&self, _permission: Permission) -> PermissionStatus {
        self.lock().0
    }

    fn request(&self, _permission: Permission) -> impl Future<Output = PermissionStatus> + Send {
        let status = {
            let mut state = self.lock();
            state.0 = state.1;
            state.2 += 1;
            state.0
        };
        async move { status }
    }
}
