//! Options and the sources that produce them

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One selectable item
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComboOption {
    /// Stored in the value state when selected; unique within a result set
    pub value: String,
    /// Display text, also what the search filters on
    pub label: String,
}

impl ComboOption {
    /// Create a new option with value and label
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    /// Case-insensitive substring match of `query` against the label.
    ///
    /// A blank query matches everything.
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return true;
        }
        self.label.to_lowercase().contains(&query.to_lowercase())
    }
}

/// Options of `options` whose label matches `query`, in order
pub(crate) fn filter_options(options: &[ComboOption], query: &str) -> Vec<ComboOption> {
    options
        .iter()
        .filter(|opt| opt.matches(query))
        .cloned()
        .collect()
}

/// Why a lookup produced no results
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("lookup failed: {0}")]
    Failed(String),
    #[error("lookup service unavailable")]
    Unavailable,
}

/// Outcome of one lookup call
pub type LookupResult = Result<Vec<ComboOption>, LookupError>;

/// Future returned by [`OptionLookup::lookup`]
pub type LookupFuture = Pin<Box<dyn Future<Output = LookupResult> + Send + 'static>>;

/// Asynchronous search collaborator supplied by the owner.
///
/// Closures `Fn(String) -> impl Future<Output = LookupResult>` implement it:
///
/// ```rust
/// use forecourt_cn::components::combobox::{ComboOption, LookupResult, OptionLookup};
///
/// let lookup = |query: String| async move {
///     LookupResult::Ok(vec![ComboOption::new("1", format!("{query} (1)"))])
/// };
/// let _future = lookup.lookup("smith");
/// ```
pub trait OptionLookup: Send + Sync + 'static {
    /// Search for `query` (already trimmed, never empty)
    fn lookup(&self, query: &str) -> LookupFuture;
}

impl<F, Fut> OptionLookup for F
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = LookupResult> + Send + 'static,
{
    fn lookup(&self, query: &str) -> LookupFuture {
        Box::pin((self)(query.to_string()))
    }
}

/// Where a combobox gets its candidates from
#[derive(Clone)]
pub enum CandidateSource {
    /// Fixed list, filtered locally
    Static(Vec<ComboOption>),
    /// Fetched per query through the lookup collaborator
    Dynamic(Arc<dyn OptionLookup>),
}

impl CandidateSource {
    pub fn is_dynamic(&self) -> bool {
        matches!(self, CandidateSource::Dynamic(_))
    }

    /// The static list; empty for dynamic sources
    pub fn static_options(&self) -> &[ComboOption] {
        match self {
            CandidateSource::Static(options) => options,
            CandidateSource::Dynamic(_) => &[],
        }
    }
}

impl Default for CandidateSource {
    fn default() -> Self {
        CandidateSource::Static(Vec::new())
    }
}

impl std::fmt::Debug for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CandidateSource::Static(options) => {
                f.debug_tuple("Static").field(&options.len()).finish()
            }
            CandidateSource::Dynamic(_) => f.write_str("Dynamic"),
        }
    }
}
