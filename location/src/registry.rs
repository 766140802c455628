//! Keyed registry of running watches plus the denylist of early clears.

use std::borrow::Borrow;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Caller-supplied identifier of a watch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(String);

impl WatchId {
    /// Create a watch id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for WatchId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for WatchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for WatchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Identifies which watch stream owns a registration.
///
/// Watch ids may be reused, so teardown on behalf of a stream is keyed by
/// id and owner together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchOwner(u64);

impl WatchOwner {
    /// Wrap a raw owner number.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

/// Result of [`WatchRegistry::register`].
#[derive(Debug)]
pub struct Registration<H> {
    /// The id had been cleared before this registration. The mark has been
    /// consumed; the first delivered batch must be discarded.
    pub denylisted: bool,
    /// A previous subscription that held the same id. The caller must tear it down.
    pub displaced: Option<H>,
}

#[derive(Debug)]
struct ActiveWatch<H> {
    owner: WatchOwner,
    handle: H,
}

#[derive(Debug)]
struct RegistryState<H> {
    active: HashMap<WatchId, ActiveWatch<H>>,
    denylist: HashSet<WatchId>,
}

impl<H> RegistryState<H> {
    fn mark_if_absent(&mut self, id: &str) -> bool {
        !self.active.contains_key(id) && self.denylist.insert(WatchId::from(id))
    }
}

/// Active subscriptions keyed by [`WatchId`], plus ids whose clear arrived
/// before their subscription existed.
///
/// An id is never both active and denylisted. All operations lock a single
/// mutex, so the register/clear/first-delivery race is serialised here.
#[derive(Debug)]
pub struct WatchRegistry<H> {
    state: Mutex<RegistryState<H>>,
}

impl<H> Default for WatchRegistry<H> {
    fn default() -> Self {
        Self {
            state: Mutex::new(RegistryState {
                active: HashMap::new(),
                denylist: HashSet::new(),
            }),
        }
    }
}

impl<H> WatchRegistry<H> {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState<H>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a running subscription under `id`.
    ///
    /// If the id was denylisted the mark moves onto the returned
    /// [`Registration`]; a subscription previously holding the id is handed
    /// back for teardown.
    pub fn register(&self, id: WatchId, owner: WatchOwner, handle: H) -> Registration<H> {
        let mut state = self.lock();
        let denylisted = state.denylist.remove(&id);
        let displaced = state
            .active
            .insert(id, ActiveWatch { owner, handle })
            .map(|previous| previous.handle);
        Registration {
            denylisted,
            displaced,
        }
    }

    /// Remove the subscription registered under `id`, whoever owns it.
    pub fn remove(&self, id: &str) -> Option<H> {
        self.lock().active.remove(id).map(|watch| watch.handle)
    }

    /// Remove the subscription under `id` only if `owner` registered it.
    pub fn remove_owned(&self, id: &str, owner: WatchOwner) -> Option<H> {
        let mut state = self.lock();
        let owned = state
            .active
            .get(id)
            .is_some_and(|watch| watch.owner == owner);
        if owned {
            state.active.remove(id).map(|watch| watch.handle)
        } else {
            None
        }
    }

    /// Denylist `id` unless it is active. Returns `true` if the mark is new.
    pub fn mark_if_absent(&self, id: &str) -> bool {
        self.lock().mark_if_absent(id)
    }

    /// Remove the subscription under `id`, or denylist the id if none exists.
    ///
    /// Both halves happen under one lock so a concurrent registration can
    /// never slip between them.
    pub fn remove_or_mark(&self, id: &str) -> Option<H> {
        let mut state = self.lock();
        let removed = state.active.remove(id).map(|watch| watch.handle);
        if removed.is_none() {
            state.mark_if_absent(id);
        }
        removed
    }

    /// Whether `id` is waiting on the denylist.
    #[must_use]
    pub fn is_denylisted(&self, id: &str) -> bool {
        self.lock().denylist.contains(id)
    }

    /// Drop `id` from the denylist. Returns `true` if it was there.
    pub fn clear_denylist(&self, id: &str) -> bool {
        self.lock().denylist.remove(id)
    }

    /// Whether a subscription is registered under `id`.
    #[must_use]
    pub fn is_active(&self, id: &str) -> bool {
        self.lock().active.contains_key(id)
    }

    /// Number of registered subscriptions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().active.len()
    }

    /// Whether no subscription is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().active.is_empty()
    }

    /// Remove every subscription and forget every denylisted id.
    pub fn drain(&self) -> Vec<H> {
        let mut state = self.lock();
        state.denylist.clear();
        state.active.drain().map(|(_, watch)| watch.handle).collect()
    }
}
