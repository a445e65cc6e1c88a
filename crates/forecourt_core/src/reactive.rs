//! Fine-grained reactive signals
//!
//! Components keep their state in signals and publish changes through them.
//! Effects subscribe automatically to every signal they read and re-run when
//! one of those signals changes:
//! - Signals push invalidation to their subscribed effects
//! - Effects re-track their dependencies on every run
//!
//! # State
//!
//! [`State<T>`] binds a signal to a shared graph and the host's dirty flag.
//! It is the handle components and their owners pass around.
//!
//! ```rust
//! use forecourt_core::ReactiveContext;
//!
//! let ctx = ReactiveContext::new();
//! let selected = ctx.use_state(String::new());
//!
//! selected.set("us".to_string());
//! assert_eq!(selected.get(), "us");
//!
//! // Ask the host to re-render
//! selected.set_rebuild("ca".to_string());
//! assert!(ctx.take_dirty());
//! ```

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::any::Any;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

new_key_type! {
    /// Unique identifier for a signal
    pub struct SignalId;
    /// Unique identifier for an effect
    pub struct EffectId;
}

/// A typed signal handle (cheap to copy)
pub struct Signal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> std::fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Signal").field(&self.id).finish()
    }
}

impl<T> Signal<T> {
    /// Get the signal's internal ID
    pub fn id(&self) -> SignalId {
        self.id
    }

    /// Rebuild a typed handle from an ID.
    ///
    /// Reads through a handle whose `T` differs from the stored value
    /// return `None`; they never panic.
    pub fn from_id(id: SignalId) -> Self {
        Signal {
            id,
            _marker: PhantomData,
        }
    }
}

/// An effect handle
#[derive(Debug, Clone, Copy)]
pub struct Effect {
    id: EffectId,
}

impl Effect {
    pub fn id(&self) -> EffectId {
        self.id
    }
}

type EffectFn = Box<dyn FnMut(&ReactiveGraph) + Send>;

struct SignalNode {
    value: Box<dyn Any + Send>,
    version: u64,
    subscribers: SmallVec<[EffectId; 4]>,
}

struct EffectNode {
    /// Taken out while the effect runs
    run: Option<EffectFn>,
    dependencies: SmallVec<[SignalId; 4]>,
    dirty: bool,
}

/// Owns all signals and effects of one host
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalNode>,
    effects: SlotMap<EffectId, EffectNode>,
    pending_effects: VecDeque<EffectId>,
    /// Signals read by the effect currently running
    tracking: RefCell<Option<SmallVec<[SignalId; 4]>>>,
}

impl ReactiveGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            effects: SlotMap::with_key(),
            pending_effects: VecDeque::new(),
            tracking: RefCell::new(None),
        }
    }

    // =========================================================================
    // SIGNALS
    // =========================================================================

    /// Create a new signal with an initial value
    pub fn create_signal<T: Send + 'static>(&mut self, initial: T) -> Signal<T> {
        let id = self.signals.insert(SignalNode {
            value: Box::new(initial),
            version: 0,
            subscribers: SmallVec::new(),
        });
        Signal::from_id(id)
    }

    /// Read a signal, recording it as a dependency of the running effect
    pub fn get<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        if let Some(deps) = self.tracking.borrow_mut().as_mut() {
            if !deps.contains(&signal.id) {
                deps.push(signal.id);
            }
        }
        self.get_untracked(signal)
    }

    fn get_untracked<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.signals
            .get(signal.id)
            .and_then(|node| node.value.downcast_ref::<T>().cloned())
    }

    /// Replace a signal's value and notify its subscribers
    pub fn set<T: Send + 'static>(&mut self, signal: Signal<T>, value: T) {
        let Some(node) = self.signals.get_mut(signal.id) else {
            tracing::trace!(signal = ?signal.id, "set on a removed signal");
            return;
        };
        node.value = Box::new(value);
        node.version += 1;

        let subscribers = node.subscribers.clone();
        for effect in subscribers {
            self.mark_dirty(effect);
        }
        self.flush_effects();
    }

    /// Update a signal from its current value
    pub fn update<T: Clone + Send + 'static, F: FnOnce(T) -> T>(
        &mut self,
        signal: Signal<T>,
        f: F,
    ) {
        if let Some(current) = self.get_untracked(signal) {
            self.set(signal, f(current));
        }
    }

    fn signal_version(&self, id: SignalId) -> Option<u64> {
        self.signals.get(id).map(|n| n.version)
    }

    // =========================================================================
    // EFFECTS
    // =========================================================================

    /// Create an effect. It runs once immediately and again whenever a
    /// signal it read changes.
    pub fn create_effect<F>(&mut self, run: F) -> Effect
    where
        F: FnMut(&ReactiveGraph) + Send + 'static,
    {
        let id = self.effects.insert(EffectNode {
            run: Some(Box::new(run)),
            dependencies: SmallVec::new(),
            dirty: true,
        });
        self.pending_effects.push_back(id);
        self.flush_effects();

        Effect { id }
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn mark_dirty(&mut self, id: EffectId) {
        if let Some(node) = self.effects.get_mut(id) {
            if !node.dirty {
                node.dirty = true;
                self.pending_effects.push_back(id);
            }
        }
    }

    fn flush_effects(&mut self) {
        while let Some(id) = self.pending_effects.pop_front() {
            self.run_effect(id);
        }
    }

    fn run_effect(&mut self, id: EffectId) {
        let Some(node) = self.effects.get_mut(id) else {
            return;
        };
        if !node.dirty {
            return;
        }
        node.dirty = false;
        let Some(mut run) = node.run.take() else {
            return;
        };

        self.tracking.replace(Some(SmallVec::new()));
        run(&*self);
        let deps = self.tracking.take().unwrap_or_default();

        let previous = match self.effects.get_mut(id) {
            Some(node) => {
                node.run = Some(run);
                std::mem::replace(&mut node.dependencies, deps.clone())
            }
            None => return,
        };
        self.unsubscribe(id, &previous);

        for dep in deps {
            if let Some(signal) = self.signals.get_mut(dep) {
                if !signal.subscribers.contains(&id) {
                    signal.subscribers.push(id);
                }
            }
        }
    }

    fn unsubscribe(&mut self, id: EffectId, deps: &[SignalId]) {
        for dep in deps {
            if let Some(signal) = self.signals.get_mut(*dep) {
                signal.subscribers.retain(|s| *s != id);
            }
        }
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// STATE - handle used by components and their owners
// =============================================================================

/// Shared reactive graph
pub type SharedReactiveGraph = Arc<Mutex<ReactiveGraph>>;

/// Raised when the host should re-render
pub type DirtyFlag = Arc<AtomicBool>;

/// Lock a shared graph, recovering from a poisoned lock
pub(crate) fn lock_graph(graph: &SharedReactiveGraph) -> MutexGuard<'_, ReactiveGraph> {
    graph.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A signal bound to its graph and the host's dirty flag.
///
/// Never call `State` methods from inside an effect: effects already hold
/// the graph lock. Read through the `&ReactiveGraph` argument instead.
pub struct State<T> {
    signal: Signal<T>,
    reactive: SharedReactiveGraph,
    dirty_flag: DirtyFlag,
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self {
            signal: self.signal,
            reactive: Arc::clone(&self.reactive),
            dirty_flag: Arc::clone(&self.dirty_flag),
        }
    }
}

impl<T> std::fmt::Debug for State<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("signal", &self.signal)
            .finish_non_exhaustive()
    }
}

impl<T: Clone + Send + 'static> State<T> {
    /// Bind an existing signal
    pub fn new(signal: Signal<T>, reactive: SharedReactiveGraph, dirty_flag: DirtyFlag) -> Self {
        Self {
            signal,
            reactive,
            dirty_flag,
        }
    }

    /// Current value, or `T::default()` if the signal is gone
    pub fn get(&self) -> T
    where
        T: Default,
    {
        self.try_get().unwrap_or_default()
    }

    /// Current value, `None` if the signal is gone
    pub fn try_get(&self) -> Option<T> {
        lock_graph(&self.reactive).get_untracked(self.signal)
    }

    /// Set a new value without requesting a re-render
    pub fn set(&self, value: T) {
        lock_graph(&self.reactive).set(self.signal, value);
    }

    /// Set a new value and request a re-render
    pub fn set_rebuild(&self, value: T) {
        self.set(value);
        self.dirty_flag.store(true, Ordering::SeqCst);
    }

    /// Update the value from its current one
    pub fn update(&self, f: impl FnOnce(T) -> T) {
        lock_graph(&self.reactive).update(self.signal, f);
    }

    /// Update the value and request a re-render
    pub fn update_rebuild(&self, f: impl FnOnce(T) -> T) {
        self.update(f);
        self.dirty_flag.store(true, Ordering::SeqCst);
    }

    /// Number of writes this state has seen
    pub fn version(&self) -> u64 {
        lock_graph(&self.reactive)
            .signal_version(self.signal.id())
            .unwrap_or(0)
    }

    pub fn signal(&self) -> Signal<T> {
        self.signal
    }

    pub fn signal_id(&self) -> SignalId {
        self.signal.id()
    }
}
