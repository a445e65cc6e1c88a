//! Explicit reactive context
//!
//! A [`ReactiveContext`] owns one reactive graph, the keyed-state table and
//! the dirty flag of a single host (a page, a test, the CLI driver). Hosts
//! create it and hand it to components; there is no process-wide singleton.
//!
//! ```rust
//! use forecourt_core::ReactiveContext;
//!
//! let ctx = ReactiveContext::new();
//!
//! // Same key and type, same signal - survives rebuilds
//! let a = ctx.use_state_keyed("device", String::new);
//! a.set("vin-001".to_string());
//! let b = ctx.use_state_keyed("device", String::new);
//! assert_eq!(b.get(), "vin-001");
//! ```

use crate::reactive::{
    lock_graph, DirtyFlag, Effect, ReactiveGraph, SharedReactiveGraph, Signal, SignalId, State,
};
use rustc_hash::FxHashMap;
use std::any::TypeId;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Key for a keyed signal: the caller's string plus the value type
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StateKey {
    key: String,
    type_id: TypeId,
}

impl StateKey {
    fn new<T: 'static>(key: &str) -> Self {
        Self {
            key: key.to_string(),
            type_id: TypeId::of::<T>(),
        }
    }
}

/// Reactive graph, keyed state and dirty flag of one host
#[derive(Clone)]
pub struct ReactiveContext {
    reactive: SharedReactiveGraph,
    keyed: Arc<Mutex<FxHashMap<StateKey, SignalId>>>,
    dirty_flag: DirtyFlag,
}

impl std::fmt::Debug for ReactiveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveContext")
            .field("dirty", &self.is_dirty())
            .finish_non_exhaustive()
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new()
    }
}

impl ReactiveContext {
    /// Create a context with an empty graph
    pub fn new() -> Self {
        Self {
            reactive: Arc::new(Mutex::new(ReactiveGraph::new())),
            keyed: Arc::new(Mutex::new(FxHashMap::default())),
            dirty_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create an unkeyed state
    pub fn use_state<T: Clone + Send + 'static>(&self, initial: T) -> State<T> {
        let signal = lock_graph(&self.reactive).create_signal(initial);
        self.bind(signal)
    }

    /// Get or create the state stored under `key`.
    ///
    /// `init` only runs the first time a `(key, T)` pair is seen.
    pub fn use_state_keyed<T, F>(&self, key: &str, init: F) -> State<T>
    where
        T: Clone + Send + 'static,
        F: FnOnce() -> T,
    {
        let state_key = StateKey::new::<T>(key);
        let mut keyed = self.keyed.lock().unwrap_or_else(PoisonError::into_inner);

        let signal = match keyed.get(&state_key) {
            Some(id) => Signal::from_id(*id),
            None => {
                let signal = lock_graph(&self.reactive).create_signal(init());
                keyed.insert(state_key, signal.id());
                tracing::trace!(key, "created keyed state");
                signal
            }
        };
        self.bind(signal)
    }

    fn bind<T: Clone + Send + 'static>(&self, signal: Signal<T>) -> State<T> {
        State::new(
            signal,
            Arc::clone(&self.reactive),
            Arc::clone(&self.dirty_flag),
        )
    }

    /// Create an effect on this context's graph.
    ///
    /// The effect runs under the graph lock: read through the `&ReactiveGraph`
    /// argument, never through `State` handles or components.
    pub fn effect<F>(&self, run: F) -> Effect
    where
        F: FnMut(&ReactiveGraph) + Send + 'static,
    {
        lock_graph(&self.reactive).create_effect(run)
    }

    /// Whether a re-render was requested
    pub fn is_dirty(&self) -> bool {
        self.dirty_flag.load(Ordering::SeqCst)
    }

    /// Consume a pending re-render request
    pub fn take_dirty(&self) -> bool {
        self.dirty_flag.swap(false, Ordering::SeqCst)
    }
}
