//! Headless components built on forecourt_core primitives
//!
//! Each component follows a consistent pattern:
//! - Builder function (e.g., `combobox(&ctx, &value)`)
//! - Interaction methods the host forwards input to
//! - A `view()` model the host renders

pub mod combobox;

pub use combobox::{
    combobox, CandidateSource, ComboOption, Combobox, ComboboxBuilder, ComboboxError, ComboboxView,
    FocusRequest, LookupError, LookupFuture, LookupResult, OptionLookup,
};
