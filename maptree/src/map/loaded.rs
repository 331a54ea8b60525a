use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::MapTreeError;

type Observer = Box<dyn FnOnce() -> Result<(), MapTreeError> + Send>;

/// Identifier of a pending [`LoadedSignal`] subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// One-shot notification that a map engine has finished loading.
///
/// The signal starts as not loaded and switches to loaded exactly once; there is no way to reset
/// it. Observers subscribed before that moment are run, in subscription order, when the signal
/// fires and are then dropped. Observers subscribed afterwards are run immediately.
///
/// A signal that was closed before firing never fires: pending observers are dropped without
/// running and later subscriptions are rejected.
#[derive(Clone, Default)]
pub struct LoadedSignal {
    inner: Arc<Mutex<LatchState>>,
}

enum LatchState {
    Pending {
        next_id: u64,
        observers: Vec<(SubscriptionId, Observer)>,
    },
    Fired,
    Closed,
}

impl Default for LatchState {
    fn default() -> Self {
        Self::Pending {
            next_id: 0,
            observers: vec![],
        }
    }
}

impl LoadedSignal {
    /// Creates a new signal in the not loaded state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true once the signal has fired.
    pub fn is_loaded(&self) -> bool {
        matches!(*self.inner.lock(), LatchState::Fired)
    }

    /// Runs `observer` once the map is loaded.
    ///
    /// If the signal has already fired, the observer is run before this method returns and its
    /// result is returned with `None` as the subscription id. Otherwise the observer is stored and
    /// the returned id can be used to [cancel](Self::unsubscribe) it. A closed signal returns
    /// [`MapTreeError::Unmounted`] and drops the observer.
    pub fn subscribe(
        &self,
        observer: impl FnOnce() -> Result<(), MapTreeError> + Send + 'static,
    ) -> Result<Option<SubscriptionId>, MapTreeError> {
        {
            let mut state = self.inner.lock();
            match &mut *state {
                LatchState::Pending { next_id, observers } => {
                    let id = SubscriptionId(*next_id);
                    *next_id += 1;
                    observers.push((id, Box::new(observer)));
                    return Ok(Some(id));
                }
                LatchState::Closed => return Err(MapTreeError::Unmounted),
                LatchState::Fired => {}
            }
        }

        observer().map(|_| None)
    }

    /// Cancels a pending subscription. Does nothing if the observer has already run.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let LatchState::Pending { observers, .. } = &mut *self.inner.lock() {
            observers.retain(|(observer_id, _)| *observer_id != id);
        }
    }

    /// Switches the signal to the loaded state and runs all pending observers.
    ///
    /// Every observer is run even if some of them fail. Firing an already fired or closed signal
    /// does nothing.
    pub(crate) fn fire(&self) -> Result<(), MapTreeError> {
        let observers = {
            let mut state = self.inner.lock();
            let observers = match &mut *state {
                LatchState::Pending { observers, .. } => std::mem::take(observers),
                LatchState::Fired | LatchState::Closed => return Ok(()),
            };
            *state = LatchState::Fired;
            observers
        };

        log::debug!("Map loaded, running {} deferred registrations", observers.len());

        let errors = observers
            .into_iter()
            .filter_map(|(_, observer)| observer().err())
            .collect();
        MapTreeError::collect(errors)
    }

    /// Drops all pending observers without running them. A signal that already fired stays
    /// loaded.
    pub(crate) fn close(&self) {
        let dropped = {
            let mut state = self.inner.lock();
            if !matches!(*state, LatchState::Pending { .. }) {
                return;
            }
            std::mem::replace(&mut *state, LatchState::Closed)
        };

        if let LatchState::Pending { observers, .. } = dropped {
            log::debug!("Loaded signal closed, dropping {} pending observers", observers.len());
        }
    }
}

impl std::fmt::Debug for LoadedSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedSignal")
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

/// Handle given to an [`EngineFactory`](crate::engine::EngineFactory) to report that the engine
/// has finished loading.
#[derive(Debug, Clone)]
pub struct ReadyNotifier {
    signal: LoadedSignal,
}

impl ReadyNotifier {
    pub(crate) fn new(signal: LoadedSignal) -> Self {
        Self { signal }
    }

    /// Marks the map as loaded and runs the registrations that were waiting for it.
    ///
    /// Returns the failures of those registrations.
    pub fn notify(&self) -> Result<(), MapTreeError> {
        self.signal.fire()
    }
}
