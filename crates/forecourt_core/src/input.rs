//! Keyboard input model
//!
//! Components receive [`KeyEvent`]s from their host and answer with an
//! [`EventResponse`] telling the host whether the key was used and whether
//! it must stop bubbling to enclosing widgets.

/// Modifier key state
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Check if no modifiers are held
    pub fn is_empty(&self) -> bool {
        !self.shift && !self.ctrl && !self.alt && !self.meta
    }
}

/// Keys components care about
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Key {
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Enter,
    Escape,
    Tab,
    Backspace,
    Space,
    /// Character input
    Char(char),
    Unknown,
}

impl Key {
    /// Parse a key name as written in scripts and bindings.
    ///
    /// Names are case-insensitive; a single character parses as
    /// [`Key::Char`], anything unrecognised as [`Key::Unknown`].
    pub fn parse(name: &str) -> Self {
        let lower = name.trim().to_ascii_lowercase();
        match lower.as_str() {
            "up" | "arrowup" => Key::Up,
            "down" | "arrowdown" => Key::Down,
            "left" | "arrowleft" => Key::Left,
            "right" | "arrowright" => Key::Right,
            "home" => Key::Home,
            "end" => Key::End,
            "pageup" => Key::PageUp,
            "pagedown" => Key::PageDown,
            "enter" | "return" => Key::Enter,
            "esc" | "escape" => Key::Escape,
            "tab" => Key::Tab,
            "backspace" => Key::Backspace,
            "space" => Key::Space,
            _ => {
                let mut chars = name.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Key::Char(c),
                    _ => Key::Unknown,
                }
            }
        }
    }
}

/// A key press delivered to a component
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    /// Key press without modifiers
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::default(),
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

impl From<Key> for KeyEvent {
    fn from(key: Key) -> Self {
        Self::new(key)
    }
}

/// What a component did with an event
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EventResponse {
    /// The component acted on the event
    pub handled: bool,
    /// The host must not deliver the event to enclosing widgets
    pub stop_propagation: bool,
}

impl EventResponse {
    /// Not for this component; let it bubble
    pub fn ignored() -> Self {
        Self::default()
    }

    /// Acted on and swallowed
    pub fn consumed() -> Self {
        Self {
            handled: true,
            stop_propagation: true,
        }
    }

    /// Not acted on, but still swallowed
    pub fn captured() -> Self {
        Self {
            handled: false,
            stop_propagation: true,
        }
    }
}
