//! Screen registry and transition coordinator.
//!
//! The manager owns every screen and is the only writer of the current-screen
//! state. Requests are validated on arrival and processed strictly in order;
//! each one runs to completion (fade out, exit, activate, enter, fade in)
//! before the next begins.

use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

use tokio::sync::mpsc::{self, UnboundedReceiver};
use tracing::{debug, error, info, warn};

use crate::config::ScreenManagerSettings;
use crate::error::ScreenError;
use crate::events::{InputEvent, ScreenName, TransitionRequest};
use crate::fade::FadeStatus;
use crate::inactivity::InactivityTracker;
use crate::screens::{Screen, ScreenContext, ScreenView, TransitionSender};

/// Name-to-screen lookup, populated once at startup.
#[derive(Default)]
pub struct ScreenRegistry {
    screens: BTreeMap<ScreenName, Box<dyn Screen>>,
}

impl ScreenRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, screen: Box<dyn Screen>) -> Result<(), ScreenError> {
        let name = screen.name();
        if self.screens.contains_key(&name) {
            return Err(ScreenError::DuplicateScreen(name));
        }
        debug!(screen = %name, "screen registered");
        self.screens.insert(name, screen);
        Ok(())
    }

    pub fn contains(&self, name: &ScreenName) -> bool {
        self.screens.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &ScreenName> {
        self.screens.keys()
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct ManagerSettings {
    /// Screen shown at startup and after an inactivity timeout.
    pub idle_screen: ScreenName,
    pub transition_duration: Duration,
    pub inactivity_timeout: Duration,
}

impl ManagerSettings {
    pub fn from_config(config: &ScreenManagerSettings, idle_screen: ScreenName) -> Self {
        Self {
            idle_screen,
            transition_duration: config.transition_duration,
            inactivity_timeout: config.inactivity_timeout,
        }
    }
}

/// Everything the presentation layer needs for one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub current: Option<ScreenName>,
    pub transitioning: bool,
    pub screens: Vec<ScreenView>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Phase {
    Settled,
    FadingOut { target: ScreenName },
    FadingIn,
}

pub struct ScreenManager {
    registry: ScreenRegistry,
    current: Option<ScreenName>,
    queue: VecDeque<ScreenName>,
    phase: Phase,
    requests: UnboundedReceiver<TransitionRequest>,
    sender: TransitionSender,
    inactivity: InactivityTracker,
    idle_screen: ScreenName,
    transition_duration: Duration,
}

impl ScreenManager {
    pub fn new(registry: ScreenRegistry, settings: ManagerSettings) -> Self {
        let (tx, requests) = mpsc::unbounded_channel();
        info!(
            screens = registry.len(),
            idle = %settings.idle_screen,
            transition = ?settings.transition_duration,
            inactivity = ?settings.inactivity_timeout,
            "screen manager ready"
        );
        Self {
            registry,
            current: None,
            queue: VecDeque::new(),
            phase: Phase::Settled,
            requests,
            sender: TransitionSender::new(tx),
            inactivity: InactivityTracker::new(settings.inactivity_timeout),
            idle_screen: settings.idle_screen,
            transition_duration: settings.transition_duration,
        }
    }

    /// Handle for code outside the manager to request screen changes.
    pub fn transitions(&self) -> TransitionSender {
        self.sender.clone()
    }

    /// Queues the first activation of the idle screen. Without one the kiosk stays blank.
    pub fn start(&mut self) {
        if self.registry.is_empty() {
            error!("no screens registered; display stays blank");
            return;
        }
        let idle = self.idle_screen.clone();
        if self.registry.contains(&idle) {
            // Registered by construction, so this cannot fail.
            let _ = self.request_transition(idle);
        } else {
            warn!(screen = %idle, "idle screen not registered; display stays blank until a transition is requested");
        }
    }

    /// Queues a transition. Unknown names are reported and never queued.
    ///
    /// Requests already sent through a [`TransitionSender`] are queued first,
    /// so both entry points share one call order.
    pub fn request_transition(&mut self, name: ScreenName) -> Result<(), ScreenError> {
        self.drain_requests();
        self.accept(name)
    }

    fn accept(&mut self, name: ScreenName) -> Result<(), ScreenError> {
        if !self.registry.contains(&name) {
            warn!(screen = %name, "transition requested for unknown screen");
            return Err(ScreenError::UnknownScreen(name));
        }
        debug!(screen = %name, pending = self.queue.len() + 1, "transition queued");
        self.queue.push_back(name);
        Ok(())
    }

    /// Records raw input and routes it to the current screen.
    pub fn handle_input(&mut self, event: InputEvent) {
        self.inactivity.register_interaction();
        let Some(current) = self.current.clone() else {
            return;
        };
        self.with_screen(&current, |screen, ctx| screen.handle_input(ctx, event));
    }

    pub fn register_interaction(&mut self) {
        self.inactivity.register_interaction();
    }

    /// One cooperative frame: queued requests, inactivity, transitions, then the
    /// current screen's own timers.
    pub fn tick(&mut self, dt: Duration) {
        self.drain_requests();
        self.enforce_inactivity(dt);
        self.advance_transitions(dt);
        if let Some(current) = self.current.clone() {
            self.with_screen(&current, |screen, ctx| screen.tick(ctx, dt));
        }
    }

    pub fn current(&self) -> Option<&ScreenName> {
        self.current.as_ref()
    }

    pub fn is_transitioning(&self) -> bool {
        self.phase != Phase::Settled
    }

    /// Accepted requests not yet started.
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn inactivity(&self) -> &InactivityTracker {
        &self.inactivity
    }

    pub fn screen_names(&self) -> impl Iterator<Item = &ScreenName> {
        self.registry.names()
    }

    pub fn view(&self, name: &ScreenName) -> Option<ScreenView> {
        self.registry.screens.get(name).map(|screen| screen.view())
    }

    pub fn frame(&self) -> Frame {
        Frame {
            current: self.current.clone(),
            transitioning: self.is_transitioning(),
            screens: self.registry.screens.values().map(|s| s.view()).collect(),
        }
    }

    fn drain_requests(&mut self) {
        while let Ok(TransitionRequest(name)) = self.requests.try_recv() {
            // Rejections are already logged.
            let _ = self.accept(name);
        }
    }

    fn enforce_inactivity(&mut self, dt: Duration) {
        let enforcing = self
            .current
            .as_ref()
            .is_some_and(|current| *current != self.idle_screen);
        if !self.inactivity.advance(dt, enforcing) {
            return;
        }
        info!(
            timeout = ?self.inactivity.timeout(),
            "inactivity timeout; returning to idle screen"
        );
        if let Some(current) = self.current.clone() {
            self.with_screen(&current, |screen, ctx| screen.close_overlays(ctx));
        }
        let idle = self.idle_screen.clone();
        let _ = self.request_transition(idle);
    }

    fn advance_transitions(&mut self, dt: Duration) {
        // Only a fade already running when the tick began sees its elapsed time.
        // Fades started within the tick are stepped by zero, which resolves
        // only those that start at their target.
        let mut dt = dt;
        loop {
            match &self.phase {
                Phase::Settled => {
                    let Some(target) = self.queue.pop_front() else {
                        return;
                    };
                    self.begin_transition(target);
                    dt = Duration::ZERO;
                }
                Phase::FadingOut { target } => {
                    let target = target.clone();
                    let status = self.step_current_fade(dt);
                    if status == FadeStatus::Running {
                        return;
                    }
                    self.activate(target);
                    dt = Duration::ZERO;
                }
                Phase::FadingIn => {
                    let status = self.step_current_fade(dt);
                    dt = Duration::ZERO;
                    if status == FadeStatus::Running {
                        return;
                    }
                    if let Some(current) = &self.current {
                        info!(screen = %current, "transition complete");
                    }
                    self.phase = Phase::Settled;
                }
            }
        }
    }

    fn begin_transition(&mut self, target: ScreenName) {
        if !self.registry.contains(&target) {
            error!(screen = %target, "queued screen disappeared from the registry");
            return;
        }
        let Some(outgoing) = self.current.clone() else {
            info!(to = %target, "initial screen activation");
            self.activate(target);
            return;
        };
        info!(from = %outgoing, to = %target, "transition started");
        let duration = self.transition_duration;
        let fading = self
            .with_screen(&outgoing, |screen, ctx| match screen.fading() {
                Some(fading) => {
                    fading.begin_fade_out(duration);
                    true
                }
                None => {
                    screen.exit(ctx);
                    false
                }
            })
            .unwrap_or(false);
        if fading {
            self.phase = Phase::FadingOut { target };
        } else {
            self.activate(target);
        }
    }

    fn activate(&mut self, target: ScreenName) {
        if target == self.idle_screen {
            self.inactivity.reset();
        }
        self.current = Some(target.clone());
        let duration = self.transition_duration;
        let fading = self
            .with_screen(&target, |screen, ctx| match screen.fading() {
                Some(fading) => {
                    fading.begin_fade_in(duration);
                    true
                }
                None => {
                    screen.enter(ctx);
                    false
                }
            })
            .unwrap_or(false);
        if fading {
            self.phase = Phase::FadingIn;
        } else {
            info!(screen = %target, "transition complete");
            self.phase = Phase::Settled;
        }
    }

    fn step_current_fade(&mut self, dt: Duration) -> FadeStatus {
        let Some(current) = self.current.clone() else {
            return FadeStatus::Complete;
        };
        self.with_screen(&current, |screen, ctx| match screen.fading() {
            Some(fading) => fading.step_fade(ctx, dt),
            None => FadeStatus::Complete,
        })
        .unwrap_or(FadeStatus::Complete)
    }

    fn with_screen<R>(
        &mut self,
        name: &ScreenName,
        f: impl FnOnce(&mut dyn Screen, &mut ScreenContext<'_>) -> R,
    ) -> Option<R> {
        let screen = self.registry.screens.get_mut(name)?;
        let mut ctx = ScreenContext::new(&self.sender, &mut self.inactivity);
        Some(f(screen.as_mut(), &mut ctx))
    }
}
