//! Highlight state machine for the open surface
//!
//! ```text
//! Closed ──Open──▶ OpenNoHighlight ──Next/Prev/Hover──▶ OpenHighlighted(i)
//!    ▲                    │  ▲                                   │
//!    └───────Close────────┘  └──────────ResultsChanged───────────┘
//! ```

/// Navigation state of one combobox
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub(crate) enum NavState {
    #[default]
    Closed,
    OpenNoHighlight,
    OpenHighlighted(usize),
}

/// Inputs to [`NavState::on_event`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NavEvent {
    Open,
    Close,
    /// Down arrow
    Next,
    /// Up arrow
    Prev,
    /// Pointer over row `i`
    Hover(usize),
    /// The visible rows were replaced
    ResultsChanged { auto_highlight: bool },
}

impl NavState {
    pub(crate) fn is_open(&self) -> bool {
        !matches!(self, NavState::Closed)
    }

    pub(crate) fn highlighted(&self) -> Option<usize> {
        match self {
            NavState::OpenHighlighted(i) => Some(*i),
            _ => None,
        }
    }

    /// Row that Enter commits: the highlighted one, or the only one
    pub(crate) fn commit_index(&self, count: usize) -> Option<usize> {
        match self {
            NavState::OpenHighlighted(i) if *i < count => Some(*i),
            NavState::OpenNoHighlight if count == 1 => Some(0),
            _ => None,
        }
    }

    /// Handle an event against `count` visible rows. Returns the new state,
    /// or `None` if nothing changes.
    pub(crate) fn on_event(&self, event: NavEvent, count: usize) -> Option<Self> {
        use NavEvent::*;
        use NavState::*;

        let next = match (*self, event) {
            (Closed, Open) => OpenNoHighlight,
            (Closed, _) => return None,
            (_, Open) => return None,
            (_, Close) => Closed,

            (_, Next | Prev) if count == 0 => return None,
            (OpenNoHighlight, Next) => OpenHighlighted(0),
            (OpenHighlighted(i), Next) => OpenHighlighted((i + 1) % count),
            (OpenNoHighlight, Prev) => OpenHighlighted(count - 1),
            (OpenHighlighted(i), Prev) => OpenHighlighted((i.min(count - 1) + count - 1) % count),

            (_, Hover(i)) if i < count => OpenHighlighted(i),
            (_, Hover(_)) => return None,

            (_, ResultsChanged { auto_highlight }) if auto_highlight && count == 1 => {
                OpenHighlighted(0)
            }
            (_, ResultsChanged { .. }) => OpenNoHighlight,
        };

        (next != *self).then_some(next)
    }
}
