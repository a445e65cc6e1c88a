//! Stable unique keys for component instances.
//!
//! Two comboboxes built from the same call site (say, inside a loop over
//! table rows) must not share keyed state, so a source location alone is not
//! enough. Each [`InstanceKey`] adds a random suffix, generated once.
//!
//! ```rust
//! use forecourt_core::InstanceKey;
//!
//! let key = InstanceKey::explicit("dealer-picker");
//! assert_eq!(key.derive("value"), "dealer-picker_value");
//! ```

use std::cell::OnceCell;
use uuid::Uuid;

/// Unique key of one component instance.
///
/// Generated keys look like `{prefix}:{file}:{line}:{col}:{uuid}`.
pub struct InstanceKey {
    key: OnceCell<String>,
    prefix: &'static str,
    file: &'static str,
    line: u32,
    column: u32,
}

impl InstanceKey {
    /// Key for the caller's location; the key text is generated lazily
    #[track_caller]
    pub fn new(prefix: &'static str) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            key: OnceCell::new(),
            prefix,
            file: loc.file(),
            line: loc.line(),
            column: loc.column(),
        }
    }

    /// Deterministic key supplied by the caller
    pub fn explicit(key: impl Into<String>) -> Self {
        Self {
            key: OnceCell::from(key.into()),
            prefix: "",
            file: "",
            line: 0,
            column: 0,
        }
    }

    /// The key text
    pub fn get(&self) -> &str {
        self.key.get_or_init(|| {
            format!(
                "{}:{}:{}:{}:{}",
                self.prefix,
                self.file,
                self.line,
                self.column,
                Uuid::new_v4().as_simple()
            )
        })
    }

    /// A fresh key under this one, `{key}:{uuid}`.
    ///
    /// Explicit keys may repeat across instances; keys made here never do.
    pub fn unique(&self) -> Self {
        Self {
            key: OnceCell::from(format!("{}:{}", self.get(), Uuid::new_v4().as_simple())),
            prefix: self.prefix,
            file: self.file,
            line: self.line,
            column: self.column,
        }
    }

    /// Key for a piece of internal state, e.g. `key.derive("open")`
    pub fn derive(&self, suffix: &str) -> String {
        format!("{}_{}", self.get(), suffix)
    }

    /// Source location the key was created at
    pub fn location(&self) -> (&'static str, u32, u32) {
        (self.file, self.line, self.column)
    }
}

impl std::fmt::Debug for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "InstanceKey({})", self.get())
    }
}

impl std::fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.get())
    }
}

impl Clone for InstanceKey {
    fn clone(&self) -> Self {
        Self {
            key: OnceCell::from(self.get().to_string()),
            prefix: self.prefix,
            file: self.file,
            line: self.line,
            column: self.column,
        }
    }
}
