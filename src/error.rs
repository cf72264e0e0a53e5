use std::path::PathBuf;

use thiserror::Error;

use crate::events::ScreenName;

/// Errors raised by the screen registry and transition coordinator.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScreenError {
    /// A transition named a screen that was never registered.
    #[error("screen {0} is not registered")]
    UnknownScreen(ScreenName),

    /// Two screens were registered under the same name.
    #[error("screen {0} registered more than once")]
    DuplicateScreen(ScreenName),

    /// A screen could not be built because part of its layout is missing.
    #[error("screen {screen} is missing required wiring: {detail}")]
    MissingWiring { screen: ScreenName, detail: String },
}

/// Per-item failure while resolving an image identifier.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("failed to fetch {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error(transparent)]
    Decode(#[from] image::ImageError),

    /// The blocking decode task panicked or was cancelled.
    #[error("decode task failed: {0}")]
    Join(String),
}
