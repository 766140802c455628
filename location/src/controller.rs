use std::pin::pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::{self, Either};
use futures_timer::Delay;
use log::{debug, warn};

use crate::options::SINGLE_SHOT_INTERVAL;
use crate::registry::WatchOwner;
use crate::watch::{self, WatchStream};
use crate::{
    GeolocationConfig, GeolocationError, LocationOptions, LocationResult, LocationService,
    RawLocation, ResolutionOutcome, ServiceAvailability, SettingsResolutionCoordinator, WatchId,
    WatchRegistry,
};

/// State shared between a controller and the watch streams it hands out.
pub(crate) struct ControllerShared<S: LocationService> {
    pub(crate) service: S,
    pub(crate) coordinator: SettingsResolutionCoordinator,
    pub(crate) registry: WatchRegistry<S::Subscription>,
    pub(crate) config: GeolocationConfig,
    next_owner: AtomicU64,
}

impl<S: LocationService> ControllerShared<S> {
    pub(crate) fn next_owner(&self) -> WatchOwner {
        WatchOwner::new(self.next_owner.fetch_add(1, Ordering::Relaxed))
    }

    pub(crate) fn map_location(&self, raw: RawLocation) -> LocationResult {
        LocationResult::from_raw(raw, self.service.reports_vertical_accuracy())
    }

    /// Timeout, service availability and settings, in that order.
    pub(crate) async fn check_preconditions(
        &self,
        options: &LocationOptions,
        interval_millis: u64,
    ) -> Result<(), GeolocationError> {
        options.validated_timeout()?;

        match self.service.check_service_availability() {
            ServiceAvailability::Available => {}
            ServiceAvailability::Resolvable(cause) => {
                debug!("location services unavailable, user resolvable: {cause}");
                return Err(GeolocationError::ServiceUnavailable { resolvable: true });
            }
            ServiceAvailability::Unavailable(cause) => {
                debug!("location services unavailable: {cause}");
                return Err(GeolocationError::ServiceUnavailable { resolvable: false });
            }
        }

        self.coordinator
            .check_and_resolve(&self.service, options, interval_millis)
            .await
    }

    /// Tear down the subscription `owner` registered under `id`, if it still holds it.
    pub(crate) fn release_watch(&self, id: &WatchId, owner: WatchOwner) {
        if let Some(subscription) = self.registry.remove_owned(id.as_str(), owner) {
            debug!("released watch {id}");
            self.service.remove_location_updates(subscription);
        }
    }
}

/// Entry point for location requests and watches.
///
/// Cloning is cheap; clones share one watch registry and one settings
/// resolution coordinator.
pub struct GeolocationController<S: LocationService> {
    shared: Arc<ControllerShared<S>>,
}

impl<S: LocationService> Clone for GeolocationController<S> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<S: LocationService> std::fmt::Debug for GeolocationController<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeolocationController")
            .field("active_watches", &self.shared.registry.len())
            .field("config", &self.shared.config)
            .finish_non_exhaustive()
    }
}

impl<S: LocationService> GeolocationController<S> {
    /// Create a controller over a platform service with default configuration.
    pub fn new(service: S) -> Self {
        Self::with_config(service, GeolocationConfig::default())
    }

    /// Create a controller over a platform service.
    pub fn with_config(service: S, config: GeolocationConfig) -> Self {
        Self {
            shared: Arc::new(ControllerShared {
                service,
                coordinator: SettingsResolutionCoordinator::new(),
                registry: WatchRegistry::new(),
                config,
                next_owner: AtomicU64::new(1),
            }),
        }
    }

    /// The platform service this controller drives.
    #[must_use]
    pub fn service(&self) -> &S {
        &self.shared.service
    }

    /// The configuration this controller was built with.
    #[must_use]
    pub fn config(&self) -> &GeolocationConfig {
        &self.shared.config
    }

    /// Obtain the device's current position.
    ///
    /// Runs the precondition checks, prompting the user to enable location if
    /// the platform allows it, then requests one fresh reading. A single
    /// attempt is made.
    ///
    /// # Errors
    /// - [`GeolocationError::InvalidTimeout`] if the timeout is not positive;
    ///   no platform call is made.
    /// - [`GeolocationError::ServiceUnavailable`] if location services are
    ///   missing or outdated.
    /// - [`GeolocationError::SettingsCheckFailed`] or
    ///   [`GeolocationError::RequestDenied`] from the settings check.
    /// - [`GeolocationError::LocationTimeout`] if no fix arrives in time.
    pub async fn get_current_position(
        &self,
        options: &LocationOptions,
    ) -> Result<LocationResult, GeolocationError> {
        let shared = &self.shared;
        shared
            .check_preconditions(options, SINGLE_SHOT_INTERVAL)
            .await?;

        let deadline = options.timeout()? + shared.config.timeout_grace();
        let fetch = pin!(shared.service.current_location(options));

        match future::select(fetch, Delay::new(deadline)).await {
            Either::Left((Ok(Some(raw)), _)) => Ok(shared.map_location(raw)),
            Either::Left((Ok(None), _)) => Err(GeolocationError::LocationTimeout),
            Either::Left((Err(err), _)) => Err(err),
            Either::Right(((), _)) => {
                warn!("location provider did not answer within {deadline:?}");
                Err(GeolocationError::LocationTimeout)
            }
        }
    }

    /// Watch the device's position under a caller-chosen id.
    ///
    /// The returned stream is cold: nothing happens until it is first polled.
    /// It then runs the precondition checks with the timeout as update
    /// interval. A precondition failure is emitted once and ends the stream.
    /// Otherwise each platform batch is emitted as one item, in delivery
    /// order, until the watch is cleared or the stream is dropped. Dropping
    /// the stream always tears down its subscription.
    pub fn add_watch(&self, options: LocationOptions, watch_id: impl Into<WatchId>) -> WatchStream {
        watch::watch(Arc::clone(&self.shared), options, watch_id.into())
    }

    /// Stop the watch registered under `id`.
    ///
    /// Returns `true` if a subscription was torn down. Otherwise the id is
    /// remembered, and a watch that registers under it later has its first
    /// batch discarded and its subscription torn down.
    pub fn clear_watch(&self, id: &str) -> bool {
        match self.shared.registry.remove_or_mark(id) {
            Some(subscription) => {
                debug!("cleared watch {id}");
                self.shared.service.remove_location_updates(subscription);
                true
            }
            None => {
                debug!("watch {id} not registered yet; denylisted");
                false
            }
        }
    }

    /// Tear down every running watch and forget pending clears.
    ///
    /// Returns the number of subscriptions removed.
    pub fn clear_all_watches(&self) -> usize {
        let subscriptions = self.shared.registry.drain();
        let count = subscriptions.len();
        for subscription in subscriptions {
            self.shared.service.remove_location_updates(subscription);
        }
        count
    }

    /// Number of watches with a running platform subscription.
    #[must_use]
    pub fn active_watch_count(&self) -> usize {
        self.shared.registry.len()
    }

    /// Whether location is switched on at the OS level.
    #[must_use]
    pub fn are_location_services_enabled(&self) -> bool {
        self.shared.service.is_location_enabled()
    }

    /// Report the user's answer to the enable-location prompt.
    ///
    /// The host must call this exactly once for every prompt the service
    /// launched. Returns `true` if a waiting request was resumed.
    pub fn on_resolution_result(&self, outcome: ResolutionOutcome) -> bool {
        self.shared.coordinator.on_resolution_result(outcome)
    }

    /// Whether a request is waiting on the user's answer.
    #[must_use]
    pub fn is_awaiting_resolution(&self) -> bool {
        self.shared.coordinator.is_awaiting_resolution()
    }
}
