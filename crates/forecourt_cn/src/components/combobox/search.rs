//! Search session: raw input, debounce handle and generation-guarded results
//!
//! Every debounce cycle is stamped with a generation. A timer firing or a
//! lookup resolving only takes effect if its generation is still the current
//! one, so results apply in issuance order, never completion order.

use tokio::task::JoinHandle;

use super::option::{ComboOption, LookupError, LookupResult};

/// What the coordinator has to do after an input change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InputAction {
    /// Static source: re-filter synchronously
    Filter,
    /// Dynamic source, blank query: results were cleared, nothing to fetch
    Cleared,
    /// Dynamic source: start a debounce timer for this generation
    Schedule(u64),
}

/// What applying a lookup outcome did
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Applied {
    Results,
    Failed(LookupError),
    /// A newer cycle started (or the surface closed) since this one
    Stale,
}

#[derive(Debug, Default)]
pub(crate) struct SearchSession {
    raw_input: String,
    debounce: Option<JoinHandle<()>>,
    is_loading: bool,
    last_results: Vec<ComboOption>,
    generation: u64,
}

impl SearchSession {
    pub(crate) fn raw_input(&self) -> &str {
        &self.raw_input
    }

    /// The input as sent to the lookup
    pub(crate) fn query(&self) -> &str {
        self.raw_input.trim()
    }

    pub(crate) fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub(crate) fn results(&self) -> &[ComboOption] {
        &self.last_results
    }

    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    /// Record new input text.
    ///
    /// For dynamic sources this supersedes any earlier cycle: the pending
    /// timer is aborted and the generation moves on.
    pub(crate) fn set_input(&mut self, text: &str, dynamic: bool) -> InputAction {
        self.raw_input = text.to_string();
        if !dynamic {
            return InputAction::Filter;
        }

        self.cancel_timer();
        self.generation += 1;

        if self.query().is_empty() {
            self.last_results.clear();
            self.is_loading = false;
            InputAction::Cleared
        } else {
            InputAction::Schedule(self.generation)
        }
    }

    /// Keep the timer task of the current cycle so it can be aborted
    pub(crate) fn arm(&mut self, timer: JoinHandle<()>) {
        self.cancel_timer();
        self.debounce = Some(timer);
    }

    /// The timer of `generation` fired. Returns the query to look up, or
    /// `None` if the cycle was superseded.
    ///
    /// The handle is released without aborting: from here on the task is an
    /// in-flight lookup, which later input must not cancel.
    pub(crate) fn begin_lookup(&mut self, generation: u64) -> Option<String> {
        if generation != self.generation {
            return None;
        }
        self.debounce = None;
        self.is_loading = true;
        Some(self.query().to_string())
    }

    /// Apply the outcome of the lookup issued for `generation`
    pub(crate) fn apply(&mut self, generation: u64, result: LookupResult) -> Applied {
        if generation != self.generation {
            return Applied::Stale;
        }
        self.is_loading = false;
        match result {
            Ok(options) => {
                self.last_results = options;
                Applied::Results
            }
            Err(err) => Applied::Failed(err),
        }
    }

    /// Drop all transient search state; any in-flight result becomes stale
    pub(crate) fn reset(&mut self) {
        self.cancel_timer();
        self.generation += 1;
        self.raw_input.clear();
        self.is_loading = false;
        self.last_results.clear();
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.debounce.take() {
            timer.abort();
        }
    }
}

impl Drop for SearchSession {
    fn drop(&mut self) {
        self.cancel_timer();
    }
}
