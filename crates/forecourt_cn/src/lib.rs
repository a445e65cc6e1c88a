//! # Forecourt Component Library (forecourt_cn)
//!
//! Headless components for the Forecourt back-office front-end. Components
//! own their interaction state, publish changes through `forecourt_core`
//! signals and hand the host a plain view model to draw.
//!
//! ## Example
//!
//! ```rust
//! use forecourt_cn::prelude::*;
//! use forecourt_core::ReactiveContext;
//!
//! let ctx = ReactiveContext::new();
//! let country = ctx.use_state_keyed("country", String::new);
//!
//! let picker = cn::combobox(&ctx, &country)
//!     .placeholder("Pick a country")
//!     .option("ca", "Canada")
//!     .option("us", "USA")
//!     .build()
//!     .unwrap();
//!
//! picker.open();
//! picker.set_search_text("u");
//! assert_eq!(picker.view().surface.unwrap().rows[0].label, "USA");
//! ```
//!
//! ## Components
//!
//! - **Combobox** - searchable selection over a static list or an async lookup

pub mod components;

pub use components::*;

/// Convenience module for accessing components with `cn::` prefix
pub mod cn {
    pub use crate::components::combobox::combobox;
}

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::cn;
    pub use crate::components::combobox::{
        combobox, CandidateSource, ComboOption, Combobox, ComboboxBuilder, ComboboxError,
        ComboboxView, FocusRequest, LookupError, OptionLookup,
    };
}
