//! Render model handed to the host
//!
//! The host draws these as it likes; the combobox never touches layout.

use std::fmt;

/// Everything needed to draw one combobox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComboboxView {
    pub trigger: TriggerView,
    /// `None` while closed
    pub surface: Option<SurfaceView>,
}

/// The always-visible trigger button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerView {
    /// Selected label, or the placeholder
    pub text: String,
    pub is_placeholder: bool,
}

/// The open dropdown: search input plus result rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SurfaceView {
    pub search_text: String,
    pub search_placeholder: String,
    pub is_loading: bool,
    pub rows: Vec<RowView>,
    /// Shown in place of the rows when there are none
    pub empty_text: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub value: String,
    pub label: String,
    /// Row holds the current value (check mark)
    pub selected: bool,
    /// Keyboard/pointer highlight
    pub highlighted: bool,
}

/// Focus instruction returned by `Combobox::after_render`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FocusRequest {
    /// Select the whole search text, not just place the caret
    pub select_all: bool,
}

impl fmt::Display for ComboboxView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.trigger.is_placeholder {
            writeln!(f, "[ ({}) ]", self.trigger.text)?;
        } else {
            writeln!(f, "[ {} ]", self.trigger.text)?;
        }

        let Some(surface) = &self.surface else {
            return Ok(());
        };

        if surface.search_text.is_empty() {
            write!(f, "  search: ({})", surface.search_placeholder)?;
        } else {
            write!(f, "  search: {}", surface.search_text)?;
        }
        if surface.is_loading {
            write!(f, "  …")?;
        }
        writeln!(f)?;

        if surface.rows.is_empty() {
            writeln!(f, "    {}", surface.empty_text)?;
        }
        for row in &surface.rows {
            let cursor = if row.highlighted { '>' } else { ' ' };
            let check = if row.selected { '✓' } else { ' ' };
            writeln!(f, "  {cursor} {check} {} ({})", row.label, row.value)?;
        }
        Ok(())
    }
}
