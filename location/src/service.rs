//! The seam between the controller and a platform location provider.

use std::future::Future;

use async_channel::{Receiver, Sender, unbounded};
use log::warn;

use crate::{GeolocationError, LocationOptions, RawLocation};

/// Outcome of the platform service-availability check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceAvailability {
    /// The location services layer is present and usable.
    Available,
    /// The layer is missing or outdated, but the user can fix it.
    Resolvable(String),
    /// The layer is missing or outdated and cannot be fixed from the app.
    Unavailable(String),
}

/// Outcome of asking the platform whether its settings satisfy a request.
#[derive(Debug)]
pub enum SettingsCheck<R> {
    /// Settings already satisfy the request.
    Satisfied,
    /// The user can resolve the condition through the given platform prompt.
    NeedsResolution(R),
    /// The check failed for a reason the user cannot resolve.
    Failed(String),
}

/// A delivery from the platform to one watch.
pub(crate) type Update = Result<Vec<RawLocation>, GeolocationError>;

/// Callback handed to [`LocationService::request_location_updates`].
///
/// The platform pushes batches of readings into it, in delivery order, from
/// any thread. Dropping every clone of the sink ends the watch once queued
/// batches have been consumed.
#[derive(Debug, Clone)]
pub struct UpdateSink {
    sender: Sender<Update>,
}

impl UpdateSink {
    pub(crate) fn channel() -> (Self, Receiver<Update>) {
        let (sender, receiver) = unbounded();
        (Self { sender }, receiver)
    }

    /// Deliver a batch of readings. Returns `false` if the watch is gone.
    pub fn deliver(&self, batch: Vec<RawLocation>) -> bool {
        self.push(Ok(batch))
    }

    /// Report a failure on the stream without closing it. Returns `false`
    /// if the watch is gone.
    pub fn fail(&self, error: GeolocationError) -> bool {
        self.push(Err(error))
    }

    /// Whether the consuming watch has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    fn push(&self, update: Update) -> bool {
        match self.sender.try_send(update) {
            Ok(()) => true,
            Err(err) => {
                warn!("dropping location update for closed watch: {err}");
                false
            }
        }
    }
}

/// A platform location provider.
///
/// Implementations wrap the fused-location or location-manager APIs of a
/// platform. Settings and single-fix requests are asynchronous; availability,
/// subscription and enablement calls return immediately.
pub trait LocationService: Send + Sync + 'static {
    /// Handle identifying a running subscription.
    type Subscription: Send + 'static;
    /// Opaque token the platform needs to show its enable-location prompt.
    type Resolution: Send + 'static;

    /// Check whether the platform location services layer is usable.
    fn check_service_availability(&self) -> ServiceAvailability;

    /// Check whether current settings satisfy a request.
    ///
    /// `interval_millis` is zero for single-shot requests and the update
    /// interval for continuous monitoring.
    fn check_settings(
        &self,
        options: &LocationOptions,
        interval_millis: u64,
    ) -> impl Future<Output = SettingsCheck<Self::Resolution>> + Send;

    /// Launch the platform prompt asking the user to resolve a settings condition.
    ///
    /// Must not block. The host reports the user's answer later through
    /// [`GeolocationController::on_resolution_result`].
    ///
    /// [`GeolocationController::on_resolution_result`]: crate::GeolocationController::on_resolution_result
    fn launch_resolution(&self, resolution: Self::Resolution);

    /// Obtain one fresh reading, waiting at most the options' timeout.
    ///
    /// Resolves to `Ok(None)` when no fix arrives in time.
    fn current_location(
        &self,
        options: &LocationOptions,
    ) -> impl Future<Output = Result<Option<RawLocation>, GeolocationError>> + Send;

    /// Start continuous updates delivered into `sink`.
    ///
    /// # Errors
    /// Returns an error if the platform refuses to start the subscription.
    fn request_location_updates(
        &self,
        options: &LocationOptions,
        sink: UpdateSink,
    ) -> Result<Self::Subscription, GeolocationError>;

    /// Stop a subscription. Only triggers the removal; does not wait for it.
    fn remove_location_updates(&self, subscription: Self::Subscription);

    /// Whether location is switched on at the OS level.
    fn is_location_enabled(&self) -> bool;

    /// Whether readings carry a meaningful vertical accuracy on this
    /// platform version.
    fn reports_vertical_accuracy(&self) -> bool {
        true
    }
}
