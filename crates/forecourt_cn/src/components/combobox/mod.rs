//! Combobox component - searchable selection over a static list or an async lookup
//!
//! The combobox owns its search, selection and navigation state and exposes
//! a plain [`ComboboxView`] for the host to draw. Every visible change is
//! published through forecourt_core signals, so the host re-renders when its
//! dirty flag is raised.
//!
//! # Example
//!
//! ```rust
//! use forecourt_cn::prelude::*;
//! use forecourt_core::{Key, ReactiveContext};
//!
//! let ctx = ReactiveContext::new();
//! let country = ctx.use_state_keyed("country", String::new);
//!
//! let picker = cn::combobox(&ctx, &country)
//!     .placeholder("Search countries...")
//!     .option("ca", "Canada")
//!     .option("us", "USA")
//!     .on_change(|value| println!("Selected: {}", value))
//!     .build()
//!     .unwrap();
//!
//! picker.open();
//! picker.set_search_text("u");
//! picker.handle_key(Key::Enter);
//! assert_eq!(country.get(), "us");
//! assert!(!picker.is_open());
//! ```
//!
//! # Dynamic sources
//!
//! With [`ComboboxBuilder::lookup`], every non-blank query is debounced and
//! sent to the lookup collaborator on a tokio runtime. Results apply in the
//! order lookups were issued: a lookup that resolves after a newer one was
//! issued (or after the surface closed) is discarded.
//!
//! # Threading
//!
//! Methods may be called from any thread. Do not call them from inside a
//! reactive effect: effects run under the graph lock, and the combobox
//! writes its signals while holding its own lock.

mod navigation;
mod option;
mod search;
mod selection;
mod view;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use forecourt_core::{EventResponse, InstanceKey, Key, KeyEvent, ReactiveContext, State};
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use navigation::{NavEvent, NavState};
use search::{Applied, InputAction, SearchSession};
use selection::SelectionState;

pub use option::{
    CandidateSource, ComboOption, LookupError, LookupFuture, LookupResult, OptionLookup,
};
pub use view::{ComboboxView, FocusRequest, RowView, SurfaceView, TriggerView};

/// Quiet period before a dynamic lookup is issued
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

const DEFAULT_PLACEHOLDER: &str = "Select...";
const DEFAULT_SEARCH_PLACEHOLDER: &str = "Type to search...";
const DEFAULT_EMPTY_TEXT: &str = "No results found";
const DEFAULT_LOADING_TEXT: &str = "Searching...";

/// Errors surfaced when building a combobox
#[derive(Debug, Error)]
pub enum ComboboxError {
    #[error("dynamic combobox needs a tokio runtime: build it inside one or pass `.runtime(handle)`")]
    NoRuntime,
}

type ChangeCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Internal configuration for building a Combobox
#[derive(Clone)]
struct ComboboxConfig {
    source: CandidateSource,
    placeholder: String,
    search_placeholder: String,
    empty_text: String,
    loading_text: String,
    debounce: Duration,
    toggle_off: bool,
    on_change: Option<ChangeCallback>,
}

impl Default for ComboboxConfig {
    fn default() -> Self {
        Self {
            source: CandidateSource::default(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            search_placeholder: DEFAULT_SEARCH_PLACEHOLDER.to_string(),
            empty_text: DEFAULT_EMPTY_TEXT.to_string(),
            loading_text: DEFAULT_LOADING_TEXT.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            toggle_off: true,
            on_change: None,
        }
    }
}

/// Where the search field's focus request is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum FocusPhase {
    #[default]
    Idle,
    /// Opened, surface not rendered yet
    Requested,
    /// Surface rendered; the next `after_render` hands the request out
    Mounted,
}

#[derive(Debug, Default)]
struct Inner {
    session: SearchSession,
    selection: SelectionState,
    nav: NavState,
    focus: FocusPhase,
    /// Rows currently shown (or that would be shown when open)
    display: Vec<ComboOption>,
}

struct Shared {
    key: String,
    config: ComboboxConfig,
    runtime: Option<Handle>,
    value: State<String>,
    open: State<bool>,
    revision: State<u64>,
    inner: Mutex<Inner>,
}

/// Combobox component
///
/// Cloning yields another handle to the same control. Pending debounce
/// timers are aborted when the last handle is dropped.
#[derive(Clone)]
pub struct Combobox {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for Combobox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Combobox")
            .field("key", &self.shared.key)
            .field("source", &self.shared.config.source)
            .finish_non_exhaustive()
    }
}

impl Combobox {
    fn from_config(
        ctx: &ReactiveContext,
        key: &InstanceKey,
        value: State<String>,
        config: ComboboxConfig,
        runtime: Option<Handle>,
    ) -> Self {
        // Explicit keys may be reused; the signals stay private to this instance
        let scope = key.unique();
        let open = ctx.use_state_keyed(&scope.derive("open"), || false);
        let revision = ctx.use_state_keyed(&scope.derive("revision"), || 0u64);

        let mut inner = Inner {
            selection: SelectionState::new(value.get()),
            ..Inner::default()
        };
        if let CandidateSource::Static(options) = &config.source {
            inner.display = options.clone();
        }

        Self {
            shared: Arc::new(Shared {
                key: key.get().to_string(),
                config,
                runtime,
                value,
                open,
                revision,
                inner: Mutex::new(inner),
            }),
        }
    }

    fn upgrade(weak: &Weak<Shared>) -> Option<Self> {
        weak.upgrade().map(|shared| Self { shared })
    }

    /// Lock the inner state after picking up any owner change to the value
    fn lock(&self) -> MutexGuard<'_, Inner> {
        let mut inner = self
            .shared
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let value = self.shared.value.get();
        if inner.selection.sync_external(&value) {
            trace!(combobox = %self.shared.key, %value, "value changed by owner");
            self.refresh_display(&mut inner, false);
        }
        inner
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Open the result surface.
    ///
    /// Queues a focus request for the search field, handed out by
    /// [`after_render`](Self::after_render) once the surface has rendered.
    pub fn open(&self) {
        let mut inner = self.lock();
        let Some(next) = inner.nav.on_event(NavEvent::Open, inner.display.len()) else {
            return;
        };
        inner.nav = next;
        inner.focus = FocusPhase::Requested;
        self.refresh_display(&mut inner, false);
        debug!(combobox = %self.shared.key, "opened");
        self.publish(&inner);
    }

    /// Close the result surface. Safe to call when already closed.
    ///
    /// Drops the search text, highlight, pending timer and (for dynamic
    /// sources) the fetched results. An in-flight lookup is left to finish
    /// and its result is discarded.
    pub fn close(&self) {
        let mut inner = self.lock();
        if self.close_locked(&mut inner) {
            self.publish(&inner);
        }
    }

    /// The trigger affordance: open when closed, close when open
    pub fn toggle(&self) {
        if self.is_open() {
            self.close();
        } else {
            self.open();
        }
    }

    /// A pointer press landed outside the control
    pub fn outside_interaction(&self) {
        self.close();
    }

    fn close_locked(&self, inner: &mut Inner) -> bool {
        let Some(next) = inner.nav.on_event(NavEvent::Close, inner.display.len()) else {
            return false;
        };
        inner.nav = next;
        inner.focus = FocusPhase::Idle;
        inner.session.reset();
        self.refresh_display(inner, false);
        debug!(combobox = %self.shared.key, "closed");
        true
    }

    // =========================================================================
    // SEARCH
    // =========================================================================

    /// Replace the search text. Ignored while closed.
    pub fn set_search_text(&self, text: &str) {
        let mut inner = self.lock();
        if !inner.nav.is_open() || inner.session.raw_input() == text {
            return;
        }

        let dynamic = self.shared.config.source.is_dynamic();
        if let InputAction::Schedule(generation) = inner.session.set_input(text, dynamic) {
            if let Some(timer) = self.schedule_lookup(generation) {
                inner.session.arm(timer);
            }
        }
        self.refresh_display(&mut inner, true);
        self.publish(&inner);
    }

    /// Spawn the debounce timer of `generation`. The same task then issues
    /// the lookup and applies its result.
    fn schedule_lookup(&self, generation: u64) -> Option<JoinHandle<()>> {
        let CandidateSource::Dynamic(lookup) = &self.shared.config.source else {
            return None;
        };
        let runtime = self.shared.runtime.as_ref()?;
        let lookup = Arc::clone(lookup);
        let delay = self.shared.config.debounce;
        let weak = Arc::downgrade(&self.shared);

        Some(runtime.spawn(async move {
            tokio::time::sleep(delay).await;

            let query = {
                let Some(combobox) = Combobox::upgrade(&weak) else {
                    return;
                };
                let mut inner = combobox.lock();
                let Some(query) = inner.session.begin_lookup(generation) else {
                    return;
                };
                debug!(combobox = %combobox.shared.key, generation, %query, "issuing lookup");
                combobox.publish(&inner);
                query
            };

            // The lookup may call back into the control
            let result = lookup.lookup(&query).await;
            if let Some(combobox) = Combobox::upgrade(&weak) {
                combobox.finish_lookup(generation, result);
            }
        }))
    }

    fn finish_lookup(&self, generation: u64, result: LookupResult) {
        let mut inner = self.lock();
        match inner.session.apply(generation, result) {
            Applied::Stale => {
                debug!(
                    combobox = %self.shared.key,
                    generation,
                    current = inner.session.generation(),
                    "discarding stale lookup result"
                );
                return;
            }
            Applied::Results => {
                self.refresh_display(&mut inner, true);
                debug!(
                    combobox = %self.shared.key,
                    generation,
                    results = inner.session.results().len(),
                    "lookup resolved"
                );
            }
            Applied::Failed(err) => {
                warn!(combobox = %self.shared.key, generation, %err, "lookup failed, keeping previous results");
            }
        }
        self.publish(&inner);
    }

    /// Recompute the display set.
    ///
    /// The highlight resets when the rows differ, and always when
    /// `new_search` is set: new search text or a freshly applied result set
    /// replaces the list even if the rows came out the same.
    fn refresh_display(&self, inner: &mut Inner, new_search: bool) {
        let display = match &self.shared.config.source {
            CandidateSource::Static(options) => {
                option::filter_options(options, inner.session.query())
            }
            CandidateSource::Dynamic(_) => inner.selection.with_cached(inner.session.results()),
        };
        if display == inner.display && !new_search {
            return;
        }
        inner.display = display;

        let auto_highlight = !inner.session.query().is_empty();
        let event = NavEvent::ResultsChanged { auto_highlight };
        if let Some(next) = inner.nav.on_event(event, inner.display.len()) {
            inner.nav = next;
        }
    }

    // =========================================================================
    // NAVIGATION & COMMIT
    // =========================================================================

    /// Handle a key press from the search field.
    ///
    /// While open every key stops propagation; navigation keys are also
    /// marked handled. While closed keys are ignored.
    pub fn handle_key(&self, event: impl Into<KeyEvent>) -> EventResponse {
        let event = event.into();
        let committed = {
            let mut inner = self.lock();
            if !inner.nav.is_open() {
                return EventResponse::ignored();
            }
            let committed = match event.key {
                Key::Down => {
                    self.navigate(&mut inner, NavEvent::Next);
                    None
                }
                Key::Up => {
                    self.navigate(&mut inner, NavEvent::Prev);
                    None
                }
                Key::Enter => match inner.nav.commit_index(inner.display.len()) {
                    Some(index) => self.commit_locked(&mut inner, index),
                    None => None,
                },
                Key::Escape => {
                    self.close_locked(&mut inner);
                    None
                }
                _ => return EventResponse::captured(),
            };
            self.publish(&inner);
            committed
        };

        if let Some(value) = committed {
            self.notify(&value);
        }
        EventResponse::consumed()
    }

    /// Pointer moved over row `index`
    pub fn hover(&self, index: usize) {
        let mut inner = self.lock();
        if self.navigate(&mut inner, NavEvent::Hover(index)) {
            self.publish(&inner);
        }
    }

    /// Row `index` was clicked
    pub fn click_row(&self, index: usize) {
        let committed = {
            let mut inner = self.lock();
            if !inner.nav.is_open() {
                return;
            }
            let committed = self.commit_locked(&mut inner, index);
            self.publish(&inner);
            committed
        };
        if let Some(value) = committed {
            self.notify(&value);
        }
    }

    fn navigate(&self, inner: &mut Inner, event: NavEvent) -> bool {
        let Some(next) = inner.nav.on_event(event, inner.display.len()) else {
            return false;
        };
        trace!(combobox = %self.shared.key, ?event, from = ?inner.nav, to = ?next, "navigate");
        inner.nav = next;
        true
    }

    /// Commit display row `index` and close. Returns the new value.
    fn commit_locked(&self, inner: &mut Inner, index: usize) -> Option<String> {
        let option = inner.display.get(index).cloned()?;
        let label = option.label.clone();
        let value = inner.selection.commit(option, self.shared.config.toggle_off);
        self.shared.value.set_rebuild(value.clone());
        self.close_locked(inner);

        if value.is_empty() {
            debug!(combobox = %self.shared.key, %label, "selection toggled off");
        } else {
            debug!(combobox = %self.shared.key, %value, %label, "committed");
        }
        Some(value)
    }

    fn notify(&self, value: &str) {
        if let Some(on_change) = &self.shared.config.on_change {
            on_change(value);
        }
    }

    /// Push the current state to the host: open flag, revision, dirty flag
    fn publish(&self, inner: &Inner) {
        let is_open = inner.nav.is_open();
        if self.shared.open.try_get() != Some(is_open) {
            self.shared.open.set_rebuild(is_open);
        }
        self.shared.revision.update_rebuild(|r| r.wrapping_add(1));
    }

    // =========================================================================
    // RENDERING
    // =========================================================================

    /// Snapshot of everything the host draws
    pub fn view(&self) -> ComboboxView {
        let mut inner = self.lock();
        let config = &self.shared.config;

        let trigger = match inner
            .selection
            .resolve_label(&inner.display, config.source.static_options())
        {
            Some(label) => TriggerView {
                text: label.to_string(),
                is_placeholder: false,
            },
            None => TriggerView {
                text: config.placeholder.clone(),
                is_placeholder: true,
            },
        };

        let surface = inner.nav.is_open().then(|| {
            let selected = inner.selection.value();
            let highlighted = inner.nav.highlighted();
            let is_loading = inner.session.is_loading();
            SurfaceView {
                search_text: inner.session.raw_input().to_string(),
                search_placeholder: config.search_placeholder.clone(),
                is_loading,
                rows: inner
                    .display
                    .iter()
                    .enumerate()
                    .map(|(i, opt)| RowView {
                        value: opt.value.clone(),
                        label: opt.label.clone(),
                        selected: !selected.is_empty() && opt.value == selected,
                        highlighted: highlighted == Some(i),
                    })
                    .collect(),
                empty_text: if is_loading {
                    config.loading_text.clone()
                } else {
                    config.empty_text.clone()
                },
            }
        });

        if surface.is_some() && inner.focus == FocusPhase::Requested {
            inner.focus = FocusPhase::Mounted;
        }

        ComboboxView { trigger, surface }
    }

    /// Post-render hook. Returns the focus request queued by
    /// [`open`](Self::open), once, after a view with the surface was taken.
    pub fn after_render(&self) -> Option<FocusRequest> {
        let mut inner = self.lock();
        if inner.focus != FocusPhase::Mounted {
            return None;
        }
        inner.focus = FocusPhase::Idle;
        Some(FocusRequest { select_all: true })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn is_open(&self) -> bool {
        self.lock().nav.is_open()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().session.is_loading()
    }

    pub fn search_text(&self) -> String {
        self.lock().session.raw_input().to_string()
    }

    pub fn highlighted(&self) -> Option<usize> {
        self.lock().nav.highlighted()
    }

    /// Options in the order they are shown
    pub fn display_options(&self) -> Vec<ComboOption> {
        self.lock().display.clone()
    }

    /// Label shown on the trigger, `None` while the placeholder is shown
    pub fn selected_label(&self) -> Option<String> {
        let inner = self.lock();
        inner
            .selection
            .resolve_label(&inner.display, self.shared.config.source.static_options())
            .map(str::to_string)
    }

    /// The selected value
    pub fn value(&self) -> String {
        self.lock().selection.value().to_string()
    }

    /// Bumped on every visible change; subscribe effects to it
    pub fn revision(&self) -> State<u64> {
        self.shared.revision.clone()
    }

    /// Whether the surface is open, as a signal
    pub fn open_state(&self) -> State<bool> {
        self.shared.open.clone()
    }
}

/// Builder for creating Combobox components with fluent API
pub struct ComboboxBuilder {
    ctx: ReactiveContext,
    key: InstanceKey,
    value_state: State<String>,
    config: ComboboxConfig,
    options: Vec<ComboOption>,
    lookup: Option<Arc<dyn OptionLookup>>,
    runtime: Option<Handle>,
}

impl ComboboxBuilder {
    /// Create a new combobox builder with value state
    ///
    /// Uses `#[track_caller]` to generate a unique instance key based on the call site.
    #[track_caller]
    pub fn new(ctx: &ReactiveContext, value_state: &State<String>) -> Self {
        Self::with_instance_key(ctx, InstanceKey::new("combobox"), value_state)
    }

    /// Create a combobox builder with an explicit key
    pub fn with_key(
        ctx: &ReactiveContext,
        key: impl Into<String>,
        value_state: &State<String>,
    ) -> Self {
        Self::with_instance_key(ctx, InstanceKey::explicit(key), value_state)
    }

    fn with_instance_key(ctx: &ReactiveContext, key: InstanceKey, value_state: &State<String>) -> Self {
        Self {
            ctx: ctx.clone(),
            key,
            value_state: value_state.clone(),
            config: ComboboxConfig::default(),
            options: Vec::new(),
            lookup: None,
            runtime: None,
        }
    }

    /// Add an option with value and label
    pub fn option(mut self, value: impl Into<String>, label: impl Into<String>) -> Self {
        self.options.push(ComboOption::new(value, label));
        self
    }

    /// Add multiple options
    pub fn options(mut self, options: impl IntoIterator<Item = ComboOption>) -> Self {
        self.options.extend(options);
        self
    }

    /// Fetch options per query instead of filtering a static list
    pub fn lookup(mut self, lookup: impl OptionLookup) -> Self {
        self.lookup = Some(Arc::new(lookup));
        self
    }

    /// Use an already assembled candidate source
    pub fn source(mut self, source: CandidateSource) -> Self {
        match source {
            CandidateSource::Static(options) => {
                self.options = options;
                self.lookup = None;
            }
            CandidateSource::Dynamic(lookup) => self.lookup = Some(lookup),
        }
        self
    }

    /// Trigger text while nothing is selected
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.config.placeholder = placeholder.into();
        self
    }

    pub fn search_placeholder(mut self, text: impl Into<String>) -> Self {
        self.config.search_placeholder = text.into();
        self
    }

    /// Shown when a search has no rows
    pub fn empty_text(mut self, text: impl Into<String>) -> Self {
        self.config.empty_text = text.into();
        self
    }

    /// Shown instead of the empty text while a lookup is running
    pub fn loading_text(mut self, text: impl Into<String>) -> Self {
        self.config.loading_text = text.into();
        self
    }

    /// Quiet period before a lookup is issued
    pub fn debounce(mut self, debounce: Duration) -> Self {
        self.config.debounce = debounce;
        self
    }

    /// Whether committing the selected option again clears it (default: true)
    pub fn toggle_off(mut self, toggle_off: bool) -> Self {
        self.config.toggle_off = toggle_off;
        self
    }

    /// Runtime for debounce timers and lookups. Defaults to the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Set the change callback, called on every commit and toggle-off
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(&str) + Send + Sync + 'static,
    {
        self.config.on_change = Some(Arc::new(callback));
        self
    }

    /// Build the combobox.
    ///
    /// Dynamic sources need a tokio runtime, either passed in or current.
    pub fn build(self) -> Result<Combobox, ComboboxError> {
        let Self {
            ctx,
            key,
            value_state,
            mut config,
            options,
            lookup,
            runtime,
        } = self;

        let runtime = match lookup {
            Some(lookup) => {
                if !options.is_empty() {
                    warn!(combobox = %key, count = options.len(), "static options ignored, a lookup is set");
                }
                config.source = CandidateSource::Dynamic(lookup);
                let handle = runtime.or_else(|| Handle::try_current().ok());
                Some(handle.ok_or(ComboboxError::NoRuntime)?)
            }
            None => {
                config.source = CandidateSource::Static(options);
                None
            }
        };

        Ok(Combobox::from_config(&ctx, &key, value_state, config, runtime))
    }
}

/// Create a combobox bound to `value_state`
///
/// The selected value lives in `value_state`; the owner may change it at any
/// time and the combobox picks the change up on its next call.
#[track_caller]
pub fn combobox(ctx: &ReactiveContext, value_state: &State<String>) -> ComboboxBuilder {
    ComboboxBuilder::new(ctx, value_state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::OnceLock;

    const WINDOW: Duration = Duration::from_millis(301);

    fn countries(ctx: &ReactiveContext, value: &State<String>) -> Combobox {
        combobox(ctx, value)
            .option("ca", "Canada")
            .option("us", "USA")
            .build()
            .unwrap()
    }

    fn row_labels(combobox: &Combobox) -> Vec<String> {
        combobox
            .view()
            .surface
            .map(|s| s.rows.into_iter().map(|r| r.label).collect())
            .unwrap_or_default()
    }

    /// People directory that records every query and answers after a delay
    #[derive(Clone, Default)]
    struct Directory {
        calls: Arc<Mutex<Vec<String>>>,
    }

    impl Directory {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn lookup(&self) -> impl OptionLookup {
            let calls = Arc::clone(&self.calls);
            move |query: String| {
                calls.lock().unwrap().push(query.clone());
                async move {
                    // Slow answers for "slow...", fast ones otherwise
                    let latency = if query.starts_with("slow") { 500 } else { 50 };
                    tokio::time::sleep(Duration::from_millis(latency)).await;
                    match query.as_str() {
                        "boom" => Err(LookupError::Failed("directory offline".into())),
                        "smith" | "slow smith" => Ok(vec![ComboOption::new("1", "John Smith")]),
                        "jones" => Ok(vec![ComboOption::new("2", "Ann Jones")]),
                        _ => Ok(vec![ComboOption::new(query.clone(), query.to_uppercase())]),
                    }
                }
            }
        }
    }

    fn people(ctx: &ReactiveContext, value: &State<String>, directory: &Directory) -> Combobox {
        combobox(ctx, value).lookup(directory.lookup()).build().unwrap()
    }

    #[test]
    fn test_static_filter_then_enter() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&changes);
        let picker = combobox(&ctx, &value)
            .option("ca", "Canada")
            .option("us", "USA")
            .on_change(move |v: &str| seen.lock().unwrap().push(v.to_string()))
            .build()
            .unwrap();

        picker.open();
        assert_eq!(row_labels(&picker), ["Canada", "USA"]);

        picker.set_search_text("u");
        assert_eq!(row_labels(&picker), ["USA"]);
        assert_eq!(picker.highlighted(), Some(0));

        let response = picker.handle_key(Key::Enter);
        assert!(response.handled && response.stop_propagation);
        assert_eq!(value.get(), "us");
        assert!(!picker.is_open());
        assert_eq!(*changes.lock().unwrap(), ["us"]);

        let view = picker.view();
        assert_eq!(view.trigger.text, "USA");
        assert!(!view.trigger.is_placeholder);
        assert!(view.surface.is_none());
    }

    #[test]
    fn test_enter_without_highlight_needs_single_row() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);

        picker.open();
        picker.handle_key(Key::Enter);
        assert!(picker.is_open());
        assert_eq!(value.get(), "");
    }

    #[test]
    fn test_enter_commits_sole_row_without_highlight() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = combobox(&ctx, &value).option("us", "USA").build().unwrap();

        picker.open();
        assert_eq!(row_labels(&picker), ["USA"]);
        assert_eq!(picker.highlighted(), None);

        assert_eq!(picker.handle_key(Key::Enter), EventResponse::consumed());
        assert_eq!(value.get(), "us");
        assert!(!picker.is_open());
    }

    #[test]
    fn test_typing_resets_highlight_when_rows_stay_the_same() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);

        picker.open();
        picker.hover(1);
        picker.set_search_text("a");
        assert_eq!(row_labels(&picker), ["Canada", "USA"]);
        assert_eq!(picker.highlighted(), None);

        picker.handle_key(Key::Enter);
        assert!(picker.is_open());
        assert_eq!(value.get(), "");

        picker.handle_key(Key::Down);
        picker.handle_key(Key::Down);
        assert_eq!(picker.highlighted(), Some(1));
        picker.set_search_text("A");
        assert_eq!(row_labels(&picker), ["Canada", "USA"]);
        assert_eq!(picker.highlighted(), None);
    }

    #[test]
    fn test_navigation_wraps() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = combobox(&ctx, &value)
            .options(["a", "b", "c"].map(|v| ComboOption::new(v, v.to_uppercase())))
            .build()
            .unwrap();

        picker.open();
        for _ in 0..3 {
            picker.handle_key(Key::Down);
        }
        assert_eq!(picker.highlighted(), Some(2));
        picker.handle_key(Key::Down);
        assert_eq!(picker.highlighted(), Some(0));
        picker.handle_key(Key::Up);
        assert_eq!(picker.highlighted(), Some(2));

        let rows = picker.view().surface.unwrap().rows;
        assert!(rows[2].highlighted);
        assert!(!rows[0].highlighted);
    }

    #[test]
    fn test_keys_while_closed_propagate() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);

        assert_eq!(picker.handle_key(Key::Down), EventResponse::ignored());

        picker.open();
        let typed = picker.handle_key(Key::Char('x'));
        assert!(!typed.handled);
        assert!(typed.stop_propagation);

        assert_eq!(picker.handle_key(Key::Escape), EventResponse::consumed());
        assert!(!picker.is_open());
    }

    #[test]
    fn test_hover_and_click() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);

        picker.hover(1);
        assert_eq!(picker.highlighted(), None);

        picker.open();
        picker.hover(1);
        assert_eq!(picker.highlighted(), Some(1));
        picker.hover(7);
        assert_eq!(picker.highlighted(), Some(1));

        picker.click_row(0);
        assert_eq!(value.get(), "ca");
        assert!(!picker.is_open());
    }

    #[test]
    fn test_toggle_off() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let changes = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&changes);
        let picker = combobox(&ctx, &value)
            .option("ca", "Canada")
            .option("us", "USA")
            .on_change(move |v: &str| seen.lock().unwrap().push(v.to_string()))
            .build()
            .unwrap();

        for _ in 0..3 {
            picker.open();
            picker.click_row(1);
        }
        assert_eq!(*changes.lock().unwrap(), ["us", "", "us"]);
        assert_eq!(value.get(), "us");
    }

    #[test]
    fn test_toggle_off_disabled() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = combobox(&ctx, &value)
            .option("us", "USA")
            .toggle_off(false)
            .build()
            .unwrap();

        picker.open();
        picker.click_row(0);
        picker.open();
        picker.click_row(0);
        assert_eq!(value.get(), "us");
        assert_eq!(picker.selected_label().as_deref(), Some("USA"));
    }

    #[test]
    fn test_owner_changes_value() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state("ca".to_string());
        let picker = countries(&ctx, &value);
        assert_eq!(picker.view().trigger.text, "Canada");

        value.set("us".to_string());
        assert_eq!(picker.view().trigger.text, "USA");

        // Unknown values never leak onto the trigger
        value.set("mx".to_string());
        let trigger = picker.view().trigger;
        assert_eq!(trigger.text, "Select...");
        assert!(trigger.is_placeholder);
    }

    #[test]
    fn test_owner_clear_then_reselect_selects() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);

        picker.open();
        picker.click_row(1);
        value.set(String::new());

        picker.open();
        picker.click_row(1);
        assert_eq!(value.get(), "us");
    }

    #[test]
    fn test_focus_after_mount() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);

        picker.open();
        assert_eq!(picker.after_render(), None);
        picker.view();
        assert_eq!(picker.after_render(), Some(FocusRequest { select_all: true }));
        assert_eq!(picker.after_render(), None);

        // Closing before the surface renders drops the request
        picker.close();
        picker.open();
        picker.close();
        picker.view();
        assert_eq!(picker.after_render(), None);
    }

    #[test]
    fn test_changes_raise_dirty_flag() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let picker = countries(&ctx, &value);
        ctx.take_dirty();

        let before = picker.revision().version();
        picker.open();
        assert!(ctx.take_dirty());
        assert!(picker.open_state().get());
        assert!(picker.revision().version() > before);

        picker.view();
        assert!(!ctx.take_dirty());

        picker.close();
        picker.close();
        assert!(ctx.take_dirty());
        assert!(!picker.open_state().get());
    }

    #[test]
    fn test_same_explicit_key_keeps_instances_apart() {
        let ctx = ReactiveContext::new();
        let first_value = ctx.use_state(String::new());
        let second_value = ctx.use_state(String::new());
        let first = ComboboxBuilder::with_key(&ctx, "pump", &first_value)
            .option("1", "Pump 1")
            .build()
            .unwrap();
        let second = ComboboxBuilder::with_key(&ctx, "pump", &second_value)
            .option("2", "Pump 2")
            .build()
            .unwrap();
        assert_eq!(first.key(), second.key());

        first.open();
        assert!(first.open_state().get());
        assert!(!second.open_state().get());
        assert_ne!(first.revision().signal_id(), second.revision().signal_id());

        first.click_row(0);
        assert_eq!(first_value.get(), "1");
        assert_eq!(second_value.get(), "");
    }

    #[test]
    fn test_dynamic_needs_runtime() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let result = combobox(&ctx, &value)
            .lookup(Directory::default().lookup())
            .build();
        assert!(matches!(result, Err(ComboboxError::NoRuntime)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dynamic_smith_scenario() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("smith");
        assert!(directory.calls().is_empty());

        tokio::time::sleep(WINDOW).await;
        assert_eq!(directory.calls(), ["smith"]);
        assert!(picker.is_loading());
        assert_eq!(picker.view().surface.unwrap().empty_text, "Searching...");

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(!picker.is_loading());
        assert_eq!(row_labels(&picker), ["John Smith"]);
        assert_eq!(picker.highlighted(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_refetched_selection_is_auto_highlighted() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("smith");
        tokio::time::sleep(Duration::from_millis(400)).await;
        picker.click_row(0);
        assert_eq!(value.get(), "1");

        // The cached row is already shown before the refetch lands
        picker.open();
        assert_eq!(row_labels(&picker), ["John Smith"]);
        assert_eq!(picker.highlighted(), None);

        picker.set_search_text("smith");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(directory.calls(), ["smith", "smith"]);
        assert_eq!(row_labels(&picker), ["John Smith"]);
        assert_eq!(picker.highlighted(), Some(0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lookup_may_read_the_control() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state("7".to_string());
        let handle: Arc<OnceLock<Combobox>> = Arc::default();
        let control = Arc::clone(&handle);

        let picker = combobox(&ctx, &value)
            .lookup(move |query: String| {
                let current = control.get().map(Combobox::value).unwrap_or_default();
                async move {
                    Ok::<_, LookupError>(vec![ComboOption::new(
                        query.clone(),
                        format!("{query} after {current:?}"),
                    )])
                }
            })
            .build()
            .unwrap();
        handle.set(picker.clone()).unwrap();

        picker.open();
        picker.set_search_text("x");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(row_labels(&picker), ["x after \"7\""]);
        assert!(!picker.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_coalesces_keystrokes() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        for text in ["s", "sm", "smi", "smit", "smith"] {
            picker.set_search_text(text);
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert!(directory.calls().is_empty());

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(directory.calls(), ["smith"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stale_results_are_discarded() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("slow smith");
        tokio::time::sleep(WINDOW).await;
        picker.set_search_text("jones");
        tokio::time::sleep(WINDOW).await;

        // jones resolves first, then the slow lookup lands late
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(directory.calls(), ["slow smith", "jones"]);
        assert_eq!(row_labels(&picker), ["Ann Jones"]);
        assert!(!picker.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn test_selection_survives_refetch() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("smith");
        tokio::time::sleep(Duration::from_millis(400)).await;
        picker.click_row(0);
        assert_eq!(value.get(), "1");

        picker.open();
        assert_eq!(row_labels(&picker), ["John Smith"]);
        picker.set_search_text("jones");
        tokio::time::sleep(Duration::from_millis(400)).await;

        let view = picker.view();
        assert_eq!(view.trigger.text, "John Smith");
        let rows = view.surface.unwrap().rows;
        assert_eq!(rows[0].label, "John Smith");
        assert!(rows[0].selected);
        assert_eq!(rows[1].label, "Ann Jones");
        assert!(!rows[1].selected);

        // Owner moves to a value the cache does not know
        value.set("2".to_string());
        picker.close();
        assert_eq!(picker.view().trigger.text, "Select...");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_resets_search() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("abc");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(row_labels(&picker), ["ABC"]);

        picker.close();
        picker.open();
        let surface = picker.view().surface.unwrap();
        assert_eq!(surface.search_text, "");
        assert!(surface.rows.is_empty());
        assert_eq!(surface.empty_text, "No results found");
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_discards_in_flight_lookup() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("abc");
        tokio::time::sleep(WINDOW).await;
        assert!(picker.is_loading());

        picker.close();
        assert!(!picker.is_loading());
        tokio::time::sleep(Duration::from_millis(200)).await;

        picker.open();
        assert!(row_labels(&picker).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_cancels_pending_timer() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("abc");
        picker.close();
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert!(directory.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_blank_query_clears_without_lookup() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("smith");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(row_labels(&picker), ["John Smith"]);

        picker.set_search_text("   ");
        assert!(row_labels(&picker).is_empty());
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(directory.calls(), ["smith"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_lookup_keeps_results() {
        let ctx = ReactiveContext::new();
        let value = ctx.use_state(String::new());
        let directory = Directory::default();
        let picker = people(&ctx, &value, &directory);

        picker.open();
        picker.set_search_text("smith");
        tokio::time::sleep(Duration::from_millis(400)).await;

        picker.set_search_text("boom");
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(directory.calls(), ["smith", "boom"]);
        assert!(!picker.is_loading());
        assert_eq!(row_labels(&picker), ["John Smith"]);
    }
}
