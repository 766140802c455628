//! One-at-a-time handshake asking the user to enable location.
//!
//! A precondition check first asks the platform whether its settings satisfy
//! the request. When they do not but the platform can prompt the user, the
//! prompt is launched and the checking call parks on a fresh one-shot
//! channel. The host later reports the user's answer through
//! [`SettingsResolutionCoordinator::on_resolution_result`], which completes
//! the channel and resumes the parked call.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use futures::channel::oneshot;
use futures::lock::Mutex as SessionLock;
use log::{debug, warn};

use crate::{GeolocationError, LocationOptions, LocationService, SettingsCheck};

/// The user's answer to the enable-location prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// The user enabled location.
    Accepted,
    /// The user declined or dismissed the prompt.
    Declined,
}

impl ResolutionOutcome {
    /// Map a platform result flag to an outcome.
    #[must_use]
    pub const fn from_accepted(accepted: bool) -> Self {
        if accepted {
            Self::Accepted
        } else {
            Self::Declined
        }
    }
}

#[derive(Debug)]
struct PendingResolution {
    session: u64,
    prompted: bool,
    sender: oneshot::Sender<ResolutionOutcome>,
}

/// Coordinates settings checks and the resolution prompt for one controller.
///
/// Sessions are serialised: an overlapping check waits until the current
/// session finishes, then runs with its own channel. There is no timeout on
/// the wait for the user's answer.
#[derive(Debug, Default)]
pub struct SettingsResolutionCoordinator {
    session_lock: SessionLock<()>,
    pending: Mutex<Option<PendingResolution>>,
    next_session: AtomicU64,
}

impl SettingsResolutionCoordinator {
    /// Create an idle coordinator.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn pending(&self) -> MutexGuard<'_, Option<PendingResolution>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check the platform settings for a request and, if the user can fix
    /// them, prompt and wait for the answer.
    ///
    /// `interval_millis` is forwarded to the platform: zero for single-shot
    /// requests, the update interval for watches.
    ///
    /// # Errors
    /// - [`GeolocationError::SettingsCheckFailed`] if the check fails in a way
    ///   the user cannot resolve.
    /// - [`GeolocationError::RequestDenied`] if the user declines the prompt.
    pub async fn check_and_resolve<S: LocationService>(
        &self,
        service: &S,
        options: &LocationOptions,
        interval_millis: u64,
    ) -> Result<(), GeolocationError> {
        let _session_guard = self.session_lock.lock().await;

        let session = self.next_session.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = oneshot::channel();
        *self.pending() = Some(PendingResolution {
            session,
            prompted: false,
            sender,
        });
        let _cleanup = SessionCleanup {
            coordinator: self,
            session,
        };

        match service.check_settings(options, interval_millis).await {
            SettingsCheck::Satisfied => {
                debug!("location settings satisfied (session {session})");
                Ok(())
            }
            SettingsCheck::Failed(cause) => {
                debug!("location settings check failed (session {session}): {cause}");
                Err(GeolocationError::SettingsCheckFailed { cause })
            }
            SettingsCheck::NeedsResolution(resolution) => {
                if let Some(pending) = self.pending().as_mut() {
                    pending.prompted = true;
                }
                debug!("awaiting user resolution of location settings (session {session})");
                service.launch_resolution(resolution);

                match receiver.await {
                    Ok(ResolutionOutcome::Accepted) => Ok(()),
                    Ok(ResolutionOutcome::Declined) => Err(GeolocationError::RequestDenied),
                    Err(oneshot::Canceled) => Err(GeolocationError::settings(
                        "resolution session ended without an answer",
                    )),
                }
            }
        }
    }

    /// Deliver the user's answer to the call waiting on the prompt.
    ///
    /// Returns `true` if a waiting call was resumed. Answers that arrive while
    /// no prompt is outstanding are ignored.
    pub fn on_resolution_result(&self, outcome: ResolutionOutcome) -> bool {
        let pending = {
            let mut slot = self.pending();
            if slot.as_ref().is_some_and(|pending| pending.prompted) {
                slot.take()
            } else {
                None
            }
        };

        let Some(pending) = pending else {
            warn!("ignoring resolution result {outcome:?}: no prompt is outstanding");
            return false;
        };

        debug!(
            "resolution result {outcome:?} for session {}",
            pending.session
        );
        pending.sender.send(outcome).is_ok()
    }

    /// Whether a call is currently waiting on the user's answer.
    #[must_use]
    pub fn is_awaiting_resolution(&self) -> bool {
        self.pending()
            .as_ref()
            .is_some_and(|pending| pending.prompted)
    }
}

/// Clears the pending slot when a session ends, including when the waiting
/// future is dropped, unless a newer session has already replaced it.
struct SessionCleanup<'a> {
    coordinator: &'a SettingsResolutionCoordinator,
    session: u64,
}

impl Drop for SessionCleanup<'_> {
    fn drop(&mut self) {
        let mut slot = self.coordinator.pending();
        if slot
            .as_ref()
            .is_some_and(|pending| pending.session == self.session)
        {
            *slot = None;
        }
    }
}
