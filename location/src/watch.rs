use std::pin::Pin;
use std::sync::Arc;

use async_channel::Receiver;
use futures::Stream;
use futures::stream;
use log::{debug, warn};

use crate::controller::ControllerShared;
use crate::registry::WatchOwner;
use crate::service::{Update, UpdateSink};
use crate::{GeolocationError, LocationOptions, LocationResult, LocationService, WatchId};

/// One element of a watch: a batch of positions in platform delivery order,
/// or a failure.
pub type WatchItem = Result<Vec<LocationResult>, GeolocationError>;

/// A boxed, cancellable stream of watch items.
pub type WatchStream = Pin<Box<dyn Stream<Item = WatchItem> + Send>>;

enum Phase {
    Starting(LocationOptions),
    Streaming {
        updates: Receiver<Update>,
        first_batch: bool,
        denylisted: bool,
    },
    Closed,
}

/// Drives one watch. Dropping it releases the watch's registration, which
/// happens exactly once however the stream ends.
struct WatchTask<S: LocationService> {
    shared: Arc<ControllerShared<S>>,
    id: WatchId,
    owner: WatchOwner,
    phase: Phase,
}

impl<S: LocationService> Drop for WatchTask<S> {
    fn drop(&mut self) {
        self.shared.release_watch(&self.id, self.owner);
    }
}

impl<S: LocationService> WatchTask<S> {
    async fn next_item(&mut self) -> Option<WatchItem> {
        if let Phase::Starting(options) = self.phase {
            match self.start(&options).await {
                Ok(phase) => self.phase = phase,
                Err(err) => {
                    debug!("watch {} failed to start: {err}", self.id);
                    self.phase = Phase::Closed;
                    return Some(Err(err));
                }
            }
        }

        let Phase::Streaming {
            updates,
            first_batch,
            denylisted,
        } = &mut self.phase
        else {
            return None;
        };

        loop {
            let batch = match updates.recv().await.ok()? {
                Ok(batch) => batch,
                Err(err) => return Some(Err(err)),
            };

            if std::mem::take(first_batch)
                && (std::mem::take(denylisted) || self.shared.registry.clear_denylist(self.id.as_str()))
            {
                debug!("watch {} was cleared before it started; discarding", self.id);
                self.shared.release_watch(&self.id, self.owner);
                continue;
            }

            let positions = batch
                .into_iter()
                .map(|raw| self.shared.map_location(raw))
                .collect();
            return Some(Ok(positions));
        }
    }

    async fn start(&self, options: &LocationOptions) -> Result<Phase, GeolocationError> {
        let interval = options.validated_timeout()?;
        self.shared.check_preconditions(options, interval).await?;

        let (sink, updates) = UpdateSink::channel();
        let subscription = self.shared.service.request_location_updates(options, sink)?;
        let registration = self
            .shared
            .registry
            .register(self.id.clone(), self.owner, subscription);

        if let Some(displaced) = registration.displaced {
            warn!("watch id {} reused while active; replacing previous subscription", self.id);
            self.shared.service.remove_location_updates(displaced);
        }
        debug!("watch {} registered", self.id);

        Ok(Phase::Streaming {
            updates,
            first_batch: true,
            denylisted: registration.denylisted,
        })
    }
}

pub(crate) fn watch<S: LocationService>(
    shared: Arc<ControllerShared<S>>,
    options: LocationOptions,
    id: WatchId,
) -> WatchStream {
    let owner = shared.next_owner();
    let task = WatchTask {
        shared,
        id,
        owner,
        phase: Phase::Starting(options),
    };

    Box::pin(stream::unfold(task, |mut task| async move {
        let item = task.next_item().await?;
        Some((item, task))
    }))
}
