//! Forecourt Core
//!
//! Foundational primitives shared by the Forecourt component library:
//!
//! - **Reactive Signals**: fine-grained signals and effects for re-rendering
//! - **Reactive Context**: explicit, per-host owner of keyed component state
//! - **Instance Keys**: stable unique keys for component instances
//! - **Input**: the keyboard model components react to
//!
//! # Example
//!
//! ```rust
//! use forecourt_core::reactive::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//! let count = graph.create_signal(0i32);
//!
//! graph.set(count, 5);
//! assert_eq!(graph.get(count), Some(5));
//! ```

pub mod context;
pub mod input;
pub mod key;
pub mod reactive;

pub use context::ReactiveContext;
pub use input::{EventResponse, Key, KeyEvent, Modifiers};
pub use key::InstanceKey;
pub use reactive::{
    DirtyFlag, Effect, ReactiveGraph, SharedReactiveGraph, Signal, SignalId, State,
};
