//! Selected value plus the cached option that keeps its label alive
//!
//! A dynamic lookup replaces its result set on every query, so the option
//! that was picked usually disappears from it. The cache holds on to that
//! option so the trigger keeps showing its label.

use super::option::ComboOption;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SelectionState {
    value: String,
    cached: Option<ComboOption>,
}

impl SelectionState {
    pub(crate) fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cached: None,
        }
    }

    pub(crate) fn value(&self) -> &str {
        &self.value
    }

    /// Commit `option` and return the new value.
    ///
    /// With `toggle_off`, committing the option that is already selected
    /// clears the selection instead.
    pub(crate) fn commit(&mut self, option: ComboOption, toggle_off: bool) -> String {
        if toggle_off && !self.value.is_empty() && option.value == self.value {
            self.clear();
        } else {
            self.value = option.value.clone();
            self.cached = Some(option);
        }
        self.value.clone()
    }

    pub(crate) fn clear(&mut self) {
        self.value.clear();
        self.cached = None;
    }

    /// The owner changed the value. Returns whether anything changed.
    pub(crate) fn sync_external(&mut self, value: &str) -> bool {
        if value == self.value {
            return false;
        }
        self.value = value.to_string();
        if self.cached.as_ref().map_or(true, |c| c.value != value) {
            self.cached = None;
        }
        true
    }

    /// Label of the selected value: the display set first, then the cache,
    /// then the static list. `None` means show the placeholder.
    pub(crate) fn resolve_label<'a>(
        &'a self,
        display: &'a [ComboOption],
        static_options: &'a [ComboOption],
    ) -> Option<&'a str> {
        if self.value.is_empty() {
            return None;
        }
        display
            .iter()
            .find(|opt| opt.value == self.value)
            .or_else(|| self.cached.as_ref().filter(|c| c.value == self.value))
            .or_else(|| static_options.iter().find(|opt| opt.value == self.value))
            .map(|opt| opt.label.as_str())
    }

    /// Dynamic display set: `results`, with the cached option in front when
    /// it is the current selection and not already among them.
    pub(crate) fn with_cached(&self, results: &[ComboOption]) -> Vec<ComboOption> {
        let mut display = Vec::with_capacity(results.len() + 1);
        if let Some(cached) = &self.cached {
            let selected = !self.value.is_empty() && cached.value == self.value;
            if selected && !results.iter().any(|opt| opt.value == cached.value) {
                display.push(cached.clone());
            }
        }
        display.extend_from_slice(results);
        display
    }
}
