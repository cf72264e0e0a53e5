//! Screen lifecycle contract shared by every top-level kiosk view.
//!
//! A screen is owned by the [`ScreenManager`](crate::tasks::manager::ScreenManager)
//! and only ever sees the narrow [`ScreenContext`] it is handed on each call:
//! a way to ask for a transition and a way to report a local interaction.
//! Screens never inspect or mutate the current-screen state directly.

pub mod attract;
pub mod content;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{error, warn};

use crate::config::Configuration;
use crate::events::{InputEvent, ScreenName, TransitionRequest};
use crate::fade::{Fade, FadeStatus, OPAQUE, TRANSPARENT};
use crate::inactivity::InactivityTracker;
use crate::tasks::loader::{DecodedImage, ImageCache};
use crate::tasks::manager::ScreenRegistry;

/// Builds the attract and content screens. A screen that fails to build is
/// reported and left out; the rest still start.
pub fn build_registry(
    config: &Configuration,
    slides: Vec<Arc<DecodedImage>>,
    gallery: Arc<ImageCache>,
) -> ScreenRegistry {
    let mut registry = ScreenRegistry::new();
    let attract = attract::AttractScreen::new(
        &config.attract_screen,
        slides,
        ScreenName::from(content::NAME),
    );
    let content = content::ContentScreen::new(&config.content_screen, gallery)
        .map(|screen| Box::new(screen) as Box<dyn Screen>);
    for screen in [Ok(Box::new(attract) as Box<dyn Screen>), content] {
        if let Err(err) = screen.and_then(|screen| registry.register(screen)) {
            error!("screen disabled: {err}");
        }
    }
    registry
}

/// Cloneable capability for enqueuing screen changes.
///
/// Sending never blocks; the request is validated and queued by the manager on
/// its next tick.
#[derive(Debug, Clone)]
pub struct TransitionSender {
    tx: UnboundedSender<TransitionRequest>,
}

impl TransitionSender {
    pub(crate) fn new(tx: UnboundedSender<TransitionRequest>) -> Self {
        Self { tx }
    }

    pub fn request(&self, name: impl Into<ScreenName>) {
        let name = name.into();
        if self.tx.send(TransitionRequest(name.clone())).is_err() {
            warn!(screen = %name, "screen manager gone; dropping transition request");
        }
    }
}

/// What a screen may touch while it is being driven.
pub struct ScreenContext<'a> {
    transitions: &'a TransitionSender,
    inactivity: &'a mut InactivityTracker,
}

impl<'a> ScreenContext<'a> {
    pub fn new(transitions: &'a TransitionSender, inactivity: &'a mut InactivityTracker) -> Self {
        Self {
            transitions,
            inactivity,
        }
    }

    /// Fire-and-forget request to switch screens.
    pub fn request_transition(&mut self, name: impl Into<ScreenName>) {
        self.transitions.request(name);
    }

    /// Resets the global inactivity countdown.
    pub fn register_interaction(&mut self) {
        self.inactivity.register_interaction();
    }
}

/// Required lifecycle of a screen.
pub trait Screen: Send {
    fn name(&self) -> ScreenName;

    /// Makes the screen visible and starts its recurring behaviour.
    ///
    /// Called once per activation; must not assume it is the first activation.
    fn enter(&mut self, ctx: &mut ScreenContext<'_>);

    /// Stops recurring behaviour, drops per-visit state and hides the screen.
    fn exit(&mut self, ctx: &mut ScreenContext<'_>);

    /// Advances the screen's own timers while it is current.
    fn tick(&mut self, _ctx: &mut ScreenContext<'_>, _dt: Duration) {}

    fn handle_input(&mut self, _ctx: &mut ScreenContext<'_>, _event: InputEvent) {}

    /// Closes transient overlays before an inactivity return to the idle screen.
    fn close_overlays(&mut self, _ctx: &mut ScreenContext<'_>) {}

    /// Optional fading capability.
    fn fading(&mut self) -> Option<&mut dyn Fading> {
        None
    }

    fn view(&self) -> ScreenView;
}

/// Screen-level fade capability.
///
/// Completing a fade-in must enter the screen; completing a fade-out must hide
/// and exit it.
pub trait Fading {
    fn begin_fade_in(&mut self, duration: Duration);
    fn begin_fade_out(&mut self, duration: Duration);
    fn step_fade(&mut self, ctx: &mut ScreenContext<'_>, dt: Duration) -> FadeStatus;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FadeDirection {
    In,
    Out,
}

/// Visibility and opacity of a whole screen, plus the fade currently driving it.
#[derive(Debug, Clone)]
pub struct ScreenSurface {
    visible: bool,
    opacity: f32,
    fade: Option<(FadeDirection, Fade)>,
}

impl ScreenSurface {
    pub fn hidden() -> Self {
        Self {
            visible: false,
            opacity: OPAQUE,
            fade: None,
        }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn hide(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn opacity(&self) -> f32 {
        self.opacity
    }

    /// Starts a fade from the current opacity, replacing any fade in flight.
    pub fn begin(&mut self, direction: FadeDirection, duration: Duration) {
        let fade = match direction {
            FadeDirection::In => {
                self.visible = true;
                Fade::fade_in(self.opacity, duration)
            }
            FadeDirection::Out => Fade::fade_out(self.opacity, duration),
        };
        self.fade = Some((direction, fade));
    }

    /// Advances the running fade. Returns the direction of a fade that just finished.
    pub fn step(&mut self, dt: Duration) -> Option<FadeDirection> {
        let (direction, fade) = self.fade.as_mut()?;
        self.opacity = fade.step(dt);
        if !fade.is_complete() {
            return None;
        }
        let direction = *direction;
        self.opacity = match direction {
            FadeDirection::In => OPAQUE,
            FadeDirection::Out => TRANSPARENT,
        };
        if direction == FadeDirection::Out {
            self.visible = false;
        }
        self.fade = None;
        Some(direction)
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }
}

/// Snapshot of one screen handed to the presenter.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreenView {
    pub name: ScreenName,
    pub visible: bool,
    pub opacity: f32,
    pub title: Option<String>,
    /// Bottom to top.
    pub layers: Vec<ImageLayer>,
    pub buttons: Vec<String>,
    pub modal: Option<ModalView>,
}

impl ScreenView {
    pub fn new(name: ScreenName, visible: bool, opacity: f32) -> Self {
        Self {
            name,
            visible,
            opacity,
            title: None,
            layers: Vec::new(),
            buttons: Vec::new(),
            modal: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageLayer {
    pub image: String,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModalView {
    pub title: String,
    pub index: usize,
    pub len: usize,
    /// `None` when the gallery is empty or the image failed to preload.
    pub image: Option<String>,
    pub description: String,
}
