//! Idle slideshow. The next image fades in over the current one, which stays
//! fully opaque underneath; nothing ever fades out. The first image appears
//! without a fade.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{
    FadeDirection, Fading, ImageLayer, Screen, ScreenContext, ScreenSurface, ScreenView,
};
use crate::config::AttractScreenConfig;
use crate::events::{InputEvent, ScreenName};
use crate::fade::{Fade, FadeStatus, OPAQUE};
use crate::tasks::loader::DecodedImage;

pub const NAME: &str = "attract-screen";

#[derive(Debug)]
enum Slideshow {
    Stopped,
    Dwelling { elapsed: Duration },
    Crossfading { next: usize, fade: Fade },
}

pub struct AttractScreen {
    title: String,
    slides: Vec<Arc<DecodedImage>>,
    active: Option<usize>,
    slideshow: Slideshow,
    interval: Duration,
    fade_duration: Duration,
    surface: ScreenSurface,
    tap_target: ScreenName,
    input_armed: bool,
}

impl AttractScreen {
    /// `tap_target` is the screen requested by the first tap after each activation.
    pub fn new(
        config: &AttractScreenConfig,
        slides: Vec<Arc<DecodedImage>>,
        tap_target: ScreenName,
    ) -> Self {
        if slides.is_empty() {
            error!("no images were loaded for the attract slideshow");
        } else {
            info!(count = slides.len(), "attract slideshow images ready");
        }
        let active = if slides.is_empty() { None } else { Some(0) };
        Self {
            title: config.title_or_default().to_string(),
            slides,
            active,
            slideshow: Slideshow::Stopped,
            interval: config.slideshow_interval,
            fade_duration: config.fade_duration,
            surface: ScreenSurface::hidden(),
            tap_target,
            input_armed: false,
        }
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active
    }

    /// Index and opacity of the image currently fading in, if any.
    pub fn incoming(&self) -> Option<(usize, f32)> {
        match &self.slideshow {
            Slideshow::Crossfading { next, fade } => Some((*next, fade.opacity())),
            _ => None,
        }
    }

    pub fn is_running(&self) -> bool {
        !matches!(self.slideshow, Slideshow::Stopped)
    }

    pub fn accepts_tap(&self) -> bool {
        self.input_armed
    }

    fn advance_slideshow(&mut self, dt: Duration) {
        let len = self.slides.len();
        match &mut self.slideshow {
            Slideshow::Stopped => {}
            Slideshow::Dwelling { elapsed } => {
                if len == 0 {
                    return;
                }
                *elapsed = elapsed.saturating_add(dt);
                if *elapsed < self.interval {
                    return;
                }
                let next = self.active.map_or(0, |idx| (idx + 1) % len);
                debug!(next, "slideshow crossfade start");
                self.slideshow = Slideshow::Crossfading {
                    next,
                    fade: Fade::fade_in(0.0, self.fade_duration),
                };
            }
            Slideshow::Crossfading { next, fade } => {
                fade.step(dt);
                if fade.is_complete() {
                    // Promote the incoming image; its layer goes back to 0 for the next cycle.
                    self.active = Some(*next);
                    debug!(active = *next, "slideshow crossfade end");
                    self.slideshow = Slideshow::Dwelling {
                        elapsed: Duration::ZERO,
                    };
                }
            }
        }
    }
}

impl Screen for AttractScreen {
    fn name(&self) -> ScreenName {
        ScreenName::from(NAME)
    }

    fn enter(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.surface.show();
        self.input_armed = true;
        if self.slides.is_empty() {
            warn!("no images available for slideshow");
        }
        self.slideshow = Slideshow::Dwelling {
            elapsed: Duration::ZERO,
        };
    }

    fn exit(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.slideshow = Slideshow::Stopped;
        self.input_armed = false;
        self.surface.hide();
    }

    fn tick(&mut self, _ctx: &mut ScreenContext<'_>, dt: Duration) {
        self.advance_slideshow(dt);
    }

    fn handle_input(&mut self, ctx: &mut ScreenContext<'_>, event: InputEvent) {
        if event != InputEvent::PointerDown || !self.input_armed {
            return;
        }
        self.input_armed = false;
        info!(target_screen = %self.tap_target, "attract screen tapped");
        ctx.request_transition(self.tap_target.clone());
    }

    fn fading(&mut self) -> Option<&mut dyn Fading> {
        Some(self)
    }

    fn view(&self) -> ScreenView {
        let mut view = ScreenView::new(
            self.name(),
            self.surface.is_visible(),
            self.surface.opacity(),
        );
        view.title = Some(self.title.clone());
        if let Some(active) = self.active {
            view.layers.push(ImageLayer {
                image: self.slides[active].id.clone(),
                opacity: OPAQUE,
            });
        }
        if let Some((next, opacity)) = self.incoming() {
            view.layers.push(ImageLayer {
                image: self.slides[next].id.clone(),
                opacity,
            });
        }
        view
    }
}

impl Fading for AttractScreen {
    fn begin_fade_in(&mut self, duration: Duration) {
        debug!("attract screen fade in");
        self.surface.begin(FadeDirection::In, duration);
    }

    fn begin_fade_out(&mut self, duration: Duration) {
        debug!("attract screen fade out");
        self.surface.begin(FadeDirection::Out, duration);
    }

    fn step_fade(&mut self, ctx: &mut ScreenContext<'_>, dt: Duration) -> FadeStatus {
        match self.surface.step(dt) {
            Some(FadeDirection::In) => {
                self.enter(ctx);
                FadeStatus::Complete
            }
            Some(FadeDirection::Out) => {
                self.exit(ctx);
                FadeStatus::Complete
            }
            None if self.surface.is_fading() => FadeStatus::Running,
            None => FadeStatus::Complete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TransitionRequest;
    use crate::inactivity::InactivityTracker;
    use crate::screens::TransitionSender;
    use tokio::sync::mpsc;

    fn slides(n: usize) -> Vec<Arc<DecodedImage>> {
        (0..n)
            .map(|i| {
                Arc::new(DecodedImage {
                    id: format!("{i}.png"),
                    width: 1,
                    height: 1,
                    pixels: vec![0; 4],
                })
            })
            .collect()
    }

    fn config() -> AttractScreenConfig {
        AttractScreenConfig {
            title: None,
            images: Vec::new(),
            slideshow_interval: Duration::from_secs(3),
            fade_duration: Duration::from_secs(1),
        }
    }

    struct Harness {
        sender: TransitionSender,
        rx: mpsc::UnboundedReceiver<TransitionRequest>,
        inactivity: InactivityTracker,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                sender: TransitionSender::new(tx),
                rx,
                inactivity: InactivityTracker::new(Duration::from_secs(60)),
            }
        }

        fn ctx(&mut self) -> ScreenContext<'_> {
            ScreenContext::new(&self.sender, &mut self.inactivity)
        }

        fn requests(&mut self) -> Vec<ScreenName> {
            let mut out = Vec::new();
            while let Ok(TransitionRequest(name)) = self.rx.try_recv() {
                out.push(name);
            }
            out
        }
    }

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    #[test]
    fn first_image_shows_without_fade() {
        let mut h = Harness::new();
        let mut screen = AttractScreen::new(&config(), slides(3), "content-screen".into());
        screen.enter(&mut h.ctx());
        let view = screen.view();
        assert!(view.visible);
        assert_eq!(view.title.as_deref(), Some("Tap Screen to Begin"));
        assert_eq!(
            view.layers,
            vec![ImageLayer {
                image: "0.png".into(),
                opacity: 1.0
            }]
        );
    }

    #[test]
    fn slideshow_cycles_with_wraparound() {
        let mut h = Harness::new();
        let mut screen = AttractScreen::new(&config(), slides(3), "content-screen".into());
        screen.enter(&mut h.ctx());

        screen.tick(&mut h.ctx(), ms(2900));
        assert!(screen.incoming().is_none());
        screen.tick(&mut h.ctx(), ms(100));
        assert_eq!(screen.incoming(), Some((1, 0.0)));

        screen.tick(&mut h.ctx(), ms(500));
        let (next, opacity) = screen.incoming().unwrap();
        assert_eq!(next, 1);
        assert!((opacity - 0.5).abs() < 1e-3);
        assert_eq!(screen.active_index(), Some(0));

        screen.tick(&mut h.ctx(), ms(500));
        assert_eq!(screen.active_index(), Some(1));
        assert!(screen.incoming().is_none());

        let mut visited = vec![screen.active_index().unwrap()];
        for _ in 0..3 {
            screen.tick(&mut h.ctx(), ms(3000));
            screen.tick(&mut h.ctx(), ms(1000));
            visited.push(screen.active_index().unwrap());
        }
        assert_eq!(visited, vec![1, 2, 0, 1]);
    }

    #[test]
    fn taps_once_per_activation() {
        let mut h = Harness::new();
        let mut screen = AttractScreen::new(&config(), slides(1), "content-screen".into());
        screen.enter(&mut h.ctx());

        screen.handle_input(&mut h.ctx(), InputEvent::KeyDown);
        assert!(h.requests().is_empty());

        screen.handle_input(&mut h.ctx(), InputEvent::PointerDown);
        screen.handle_input(&mut h.ctx(), InputEvent::PointerDown);
        assert_eq!(h.requests(), vec![ScreenName::from("content-screen")]);

        screen.exit(&mut h.ctx());
        screen.enter(&mut h.ctx());
        screen.handle_input(&mut h.ctx(), InputEvent::PointerDown);
        assert_eq!(h.requests().len(), 1);
    }

    #[test]
    fn exit_cancels_slideshow_mid_crossfade() {
        let mut h = Harness::new();
        let mut screen = AttractScreen::new(&config(), slides(2), "content-screen".into());
        screen.enter(&mut h.ctx());
        screen.tick(&mut h.ctx(), ms(3000));
        screen.tick(&mut h.ctx(), ms(400));
        assert!(screen.incoming().is_some());

        screen.exit(&mut h.ctx());
        assert!(!screen.is_running());
        screen.tick(&mut h.ctx(), ms(100000));
        assert!(screen.incoming().is_none());
        assert_eq!(screen.active_index(), Some(0));
        assert!(!screen.view().visible);
    }

    #[test]
    fn empty_slideshow_stays_stable() {
        let mut h = Harness::new();
        let mut screen = AttractScreen::new(&config(), Vec::new(), "content-screen".into());
        screen.enter(&mut h.ctx());
        for _ in 0..10 {
            screen.tick(&mut h.ctx(), ms(5000));
        }
        assert!(screen.view().layers.is_empty());
        assert!(screen.active_index().is_none());
    }

    #[test]
    fn fade_out_exits_and_fade_in_enters() {
        let mut h = Harness::new();
        let mut screen = AttractScreen::new(&config(), slides(2), "content-screen".into());
        screen.enter(&mut h.ctx());

        screen.begin_fade_out(ms(500));
        assert_eq!(
            screen.step_fade(&mut h.ctx(), ms(250)),
            FadeStatus::Running
        );
        assert!(screen.accepts_tap());
        assert_eq!(
            screen.step_fade(&mut h.ctx(), ms(250)),
            FadeStatus::Complete
        );
        assert!(!screen.accepts_tap());
        assert!(!screen.is_running());
        let view = screen.view();
        assert!(!view.visible);
        assert_eq!(view.opacity, 0.0);

        screen.begin_fade_in(ms(500));
        assert!(screen.view().visible);
        assert!(!screen.accepts_tap());
        assert_eq!(
            screen.step_fade(&mut h.ctx(), ms(500)),
            FadeStatus::Complete
        );
        assert!(screen.accepts_tap());
        assert!(screen.is_running());
        assert_eq!(screen.view().opacity, 1.0);
    }
}
