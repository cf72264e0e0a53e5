//! Button-driven gallery screen.
//!
//! Three buttons each open a modal over their own gallery. The modal closes on
//! request, after `auto-close-modal` without interaction, when the screen exits,
//! or when the manager asks for overlays to close before an inactivity timeout.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use super::{ModalView, Screen, ScreenContext, ScreenSurface, ScreenView};
use crate::config::{ButtonConfig, ContentScreenConfig, GalleryItem};
use crate::error::ScreenError;
use crate::events::{InputEvent, ScreenName, UiAction};
use crate::tasks::loader::ImageCache;

pub const NAME: &str = "content-screen";
pub const BUTTON_SLOTS: usize = 3;

/// Wrap-around position within a gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GalleryCursor {
    index: usize,
    len: usize,
}

impl GalleryCursor {
    pub fn new(len: usize) -> Self {
        Self { index: 0, len }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Moves one item forward, wrapping to the first. `None` for empty galleries.
    pub fn next(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.index = (self.index + 1) % self.len;
        Some(self.index)
    }

    pub fn previous(&mut self) -> Option<usize> {
        if self.len == 0 {
            return None;
        }
        self.index = (self.index + self.len - 1) % self.len;
        Some(self.index)
    }
}

#[derive(Debug)]
struct Modal {
    button: usize,
    cursor: GalleryCursor,
    idle: Duration,
}

pub struct ContentScreen {
    buttons: Vec<ButtonConfig>,
    images: Arc<ImageCache>,
    auto_close: Duration,
    modal: Option<Modal>,
    surface: ScreenSurface,
}

impl ContentScreen {
    /// Fails when any of the [`BUTTON_SLOTS`] slots has no configuration.
    pub fn new(config: &ContentScreenConfig, images: Arc<ImageCache>) -> Result<Self, ScreenError> {
        let name = ScreenName::from(NAME);
        let mut buttons = Vec::with_capacity(BUTTON_SLOTS);
        for slot in 0..BUTTON_SLOTS {
            let Some(button) = config.buttons.get(slot) else {
                return Err(ScreenError::MissingWiring {
                    screen: name,
                    detail: format!("button slot {} has no configuration", slot + 1),
                });
            };
            if button.label.trim().is_empty() {
                warn!(slot = slot + 1, "gallery button has an empty label");
            }
            if button.gallery.is_empty() {
                warn!(slot = slot + 1, "gallery button has no images");
            }
            buttons.push(button.clone());
        }
        if config.buttons.len() > BUTTON_SLOTS {
            warn!(
                configured = config.buttons.len(),
                slots = BUTTON_SLOTS,
                "ignoring extra gallery buttons"
            );
        }
        Ok(Self {
            buttons,
            images,
            auto_close: config.auto_close_modal,
            modal: None,
            surface: ScreenSurface::hidden(),
        })
    }

    pub fn is_modal_open(&self) -> bool {
        self.modal.is_some()
    }

    /// `(button, index)` of the item the modal is showing.
    pub fn modal_position(&self) -> Option<(usize, usize)> {
        self.modal.as_ref().map(|m| (m.button, m.cursor.index()))
    }

    pub fn open_gallery(&mut self, ctx: &mut ScreenContext<'_>, button: usize) {
        let Some(config) = self.buttons.get(button) else {
            error!(button, "invalid gallery button index");
            return;
        };
        let cursor = GalleryCursor::new(config.gallery.len());
        if cursor.is_empty() {
            error!(button, label = %config.label, "no images in gallery for this button");
        }
        info!(button, label = %config.label, items = cursor.len(), "gallery opened");
        self.modal = Some(Modal {
            button,
            cursor,
            idle: Duration::ZERO,
        });
        self.report_missing_image();
        self.register_interaction(ctx);
    }

    pub fn next_item(&mut self, ctx: &mut ScreenContext<'_>) {
        self.navigate(ctx, GalleryCursor::next);
    }

    pub fn previous_item(&mut self, ctx: &mut ScreenContext<'_>) {
        self.navigate(ctx, GalleryCursor::previous);
    }

    pub fn close_modal(&mut self) {
        if self.modal.take().is_some() {
            debug!("gallery modal closed");
        }
    }

    /// Restarts the modal auto-close timer and the global inactivity countdown.
    pub fn register_interaction(&mut self, ctx: &mut ScreenContext<'_>) {
        if let Some(modal) = self.modal.as_mut() {
            modal.idle = Duration::ZERO;
        }
        ctx.register_interaction();
    }

    fn navigate(
        &mut self,
        ctx: &mut ScreenContext<'_>,
        step: fn(&mut GalleryCursor) -> Option<usize>,
    ) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        if let Some(index) = step(&mut modal.cursor) {
            debug!(button = modal.button, index, "gallery item shown");
        }
        self.report_missing_image();
        self.register_interaction(ctx);
    }

    fn current_item(&self) -> Option<&GalleryItem> {
        let modal = self.modal.as_ref()?;
        self.buttons
            .get(modal.button)?
            .gallery
            .get(modal.cursor.index())
    }

    fn report_missing_image(&self) {
        if let Some(item) = self.current_item() {
            if !self.images.contains(&item.image) {
                error!(image = %item.image, "gallery image was not preloaded");
            }
        }
    }
}

impl Screen for ContentScreen {
    fn name(&self) -> ScreenName {
        ScreenName::from(NAME)
    }

    fn enter(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.surface.show();
    }

    fn exit(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.close_modal();
        self.surface.hide();
    }

    fn tick(&mut self, _ctx: &mut ScreenContext<'_>, dt: Duration) {
        let Some(modal) = self.modal.as_mut() else {
            return;
        };
        modal.idle = modal.idle.saturating_add(dt);
        if modal.idle >= self.auto_close {
            info!(after = ?self.auto_close, "gallery modal auto-closed");
            self.modal = None;
        }
    }

    fn handle_input(&mut self, ctx: &mut ScreenContext<'_>, event: InputEvent) {
        if !self.surface.is_visible() {
            return;
        }
        match event {
            InputEvent::Ui(UiAction::OpenGallery(button)) => self.open_gallery(ctx, button),
            InputEvent::Ui(UiAction::NextItem) => self.next_item(ctx),
            InputEvent::Ui(UiAction::PreviousItem) => self.previous_item(ctx),
            InputEvent::Ui(UiAction::CloseModal) => {
                self.close_modal();
                self.register_interaction(ctx);
            }
            InputEvent::PointerDown | InputEvent::KeyDown => {}
        }
    }

    fn close_overlays(&mut self, _ctx: &mut ScreenContext<'_>) {
        self.close_modal();
    }

    fn view(&self) -> ScreenView {
        let mut view = ScreenView::new(
            self.name(),
            self.surface.is_visible(),
            self.surface.opacity(),
        );
        view.buttons = self.buttons.iter().map(|b| b.label.clone()).collect();
        view.modal = self.modal.as_ref().and_then(|modal| {
            let button = self.buttons.get(modal.button)?;
            let item = button.gallery.get(modal.cursor.index());
            Some(ModalView {
                title: button.label.clone(),
                index: modal.cursor.index(),
                len: modal.cursor.len(),
                image: item
                    .filter(|item| self.images.contains(&item.image))
                    .map(|item| item.image.clone()),
                description: item.map(|item| item.description.clone()).unwrap_or_default(),
            })
        });
        view
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::TransitionRequest;
    use crate::inactivity::InactivityTracker;
    use crate::screens::TransitionSender;
    use crate::tasks::loader::DecodedImage;
    use tokio::sync::mpsc;

    fn item(image: &str) -> GalleryItem {
        GalleryItem {
            image: image.into(),
            description: format!("about {image}"),
        }
    }

    fn config(buttons: usize) -> ContentScreenConfig {
        ContentScreenConfig {
            auto_close_modal: Duration::from_secs(30),
            buttons: (0..buttons)
                .map(|b| ButtonConfig {
                    label: format!("Button {b}"),
                    gallery: (0..3).map(|i| item(&format!("b{b}-{i}.png"))).collect(),
                })
                .collect(),
        }
    }

    fn cache(ids: &[&str]) -> Arc<ImageCache> {
        let mut cache = ImageCache::default();
        for id in ids {
            cache.insert(Arc::new(DecodedImage {
                id: id.to_string(),
                width: 1,
                height: 1,
                pixels: vec![0; 4],
            }));
        }
        Arc::new(cache)
    }

    struct Harness {
        sender: TransitionSender,
        _rx: mpsc::UnboundedReceiver<TransitionRequest>,
        inactivity: InactivityTracker,
    }

    impl Harness {
        fn new() -> Self {
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                sender: TransitionSender::new(tx),
                _rx: rx,
                inactivity: InactivityTracker::new(Duration::from_secs(60)),
            }
        }

        fn ctx(&mut self) -> ScreenContext<'_> {
            ScreenContext::new(&self.sender, &mut self.inactivity)
        }
    }

    fn entered(config: &ContentScreenConfig, h: &mut Harness) -> ContentScreen {
        let mut screen = ContentScreen::new(config, cache(&["b0-0.png", "b0-1.png", "b0-2.png"]))
            .expect("three buttons configured");
        screen.enter(&mut h.ctx());
        screen
    }

    #[test]
    fn cursor_wraps_both_ways() {
        let mut cursor = GalleryCursor::new(3);
        assert_eq!(cursor.previous(), Some(2));
        assert_eq!(cursor.next(), Some(0));
        assert_eq!(cursor.next(), Some(1));
        assert_eq!(cursor.next(), Some(2));
        assert_eq!(cursor.next(), Some(0));

        let mut empty = GalleryCursor::new(0);
        assert_eq!(empty.next(), None);
        assert_eq!(empty.previous(), None);
        assert_eq!(empty.index(), 0);
    }

    #[test]
    fn missing_button_slot_is_a_wiring_error() {
        let err = ContentScreen::new(&config(2), cache(&[])).err();
        assert_eq!(
            err,
            Some(ScreenError::MissingWiring {
                screen: ScreenName::from(NAME),
                detail: "button slot 3 has no configuration".into(),
            })
        );
    }

    #[test]
    fn extra_buttons_are_ignored() {
        let screen = ContentScreen::new(&config(5), cache(&[])).unwrap();
        assert_eq!(screen.view().buttons.len(), BUTTON_SLOTS);
    }

    #[test]
    fn open_starts_at_first_item_and_navigates_with_wrap() {
        let mut h = Harness::new();
        let mut screen = entered(&config(3), &mut h);

        screen.open_gallery(&mut h.ctx(), 0);
        assert_eq!(screen.modal_position(), Some((0, 0)));
        let modal = screen.view().modal.unwrap();
        assert_eq!(modal.title, "Button 0");
        assert_eq!(modal.image.as_deref(), Some("b0-0.png"));
        assert_eq!(modal.description, "about b0-0.png");

        screen.previous_item(&mut h.ctx());
        assert_eq!(screen.modal_position(), Some((0, 2)));
        screen.next_item(&mut h.ctx());
        screen.next_item(&mut h.ctx());
        assert_eq!(screen.modal_position(), Some((0, 1)));

        screen.close_modal();
        screen.open_gallery(&mut h.ctx(), 0);
        assert_eq!(screen.modal_position(), Some((0, 0)));
    }

    #[test]
    fn invalid_button_is_ignored() {
        let mut h = Harness::new();
        let mut screen = entered(&config(3), &mut h);
        screen.handle_input(&mut h.ctx(), InputEvent::Ui(UiAction::OpenGallery(7)));
        assert!(!screen.is_modal_open());
    }

    #[test]
    fn empty_gallery_still_opens_modal() {
        let mut cfg = config(3);
        cfg.buttons[1].gallery.clear();
        let mut h = Harness::new();
        let mut screen = entered(&cfg, &mut h);

        screen.open_gallery(&mut h.ctx(), 1);
        let modal = screen.view().modal.unwrap();
        assert_eq!(modal.len, 0);
        assert_eq!(modal.image, None);
        screen.next_item(&mut h.ctx());
        assert_eq!(screen.modal_position(), Some((1, 0)));
    }

    #[test]
    fn unloaded_image_has_no_view_image() {
        let mut h = Harness::new();
        let mut screen = entered(&config(3), &mut h);
        screen.open_gallery(&mut h.ctx(), 2);
        let modal = screen.view().modal.unwrap();
        assert_eq!(modal.image, None);
        assert_eq!(modal.description, "about b2-0.png");
    }

    #[test]
    fn modal_auto_closes_after_idle_period() {
        let mut h = Harness::new();
        let mut screen = entered(&config(3), &mut h);
        screen.open_gallery(&mut h.ctx(), 0);

        screen.tick(&mut h.ctx(), Duration::from_secs(20));
        screen.next_item(&mut h.ctx());
        screen.tick(&mut h.ctx(), Duration::from_secs(20));
        assert!(screen.is_modal_open());
        screen.tick(&mut h.ctx(), Duration::from_secs(10));
        assert!(!screen.is_modal_open());
    }

    #[test]
    fn interaction_resets_global_countdown() {
        let mut h = Harness::new();
        let mut screen = entered(&config(3), &mut h);
        h.inactivity.advance(Duration::from_secs(45), true);
        screen.open_gallery(&mut h.ctx(), 0);
        assert_eq!(h.inactivity.remaining(), Duration::from_secs(60));
    }

    #[test]
    fn exit_and_overlay_close_drop_the_modal() {
        let mut h = Harness::new();
        let mut screen = entered(&config(3), &mut h);
        screen.open_gallery(&mut h.ctx(), 0);
        screen.close_overlays(&mut h.ctx());
        assert!(!screen.is_modal_open());

        screen.open_gallery(&mut h.ctx(), 1);
        screen.exit(&mut h.ctx());
        assert!(!screen.is_modal_open());
        assert!(!screen.view().visible);
    }
}
