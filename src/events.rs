use std::fmt;

/// Registry key for a screen.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScreenName(String);

impl ScreenName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScreenName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScreenName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A request to make `0` the current screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRequest(pub ScreenName);

/// Raw input as delivered by an input source.
///
/// Every variant counts as an interaction for the inactivity countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    /// Mouse click or first touch.
    PointerDown,
    /// Any other key press.
    KeyDown,
    /// A widget press already resolved by the presentation layer.
    Ui(UiAction),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    /// Zero-based button slot on the content screen.
    OpenGallery(usize),
    NextItem,
    PreviousItem,
    CloseModal,
}
