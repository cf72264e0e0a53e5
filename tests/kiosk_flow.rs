use rust_kiosk::config::Configuration;
use rust_kiosk::events::{InputEvent, ScreenName, UiAction};
use rust_kiosk::screens::{attract, build_registry, content};
use rust_kiosk::tasks::loader::{DecodedImage, ImageCache};
use rust_kiosk::tasks::manager::{ManagerSettings, ScreenManager};
use std::sync::Arc;
use std::time::Duration;

const CONFIG: &str = r#"
screen-manager:
  transition-duration: 500ms
  inactivity-timeout: 60s
attract-screen:
  images: [s0.png, s1.png]
content-screen:
  auto-close-modal: 90s
  buttons:
    - label: One
      gallery: [{image: g0.png, description: first}, {image: g1.png, description: second}]
    - label: Two
    - label: Three
"#;

fn image(id: &str) -> Arc<DecodedImage> {
    Arc::new(DecodedImage {
        id: id.into(),
        width: 1,
        height: 1,
        pixels: vec![0; 4],
    })
}

fn kiosk(yaml: &str) -> ScreenManager {
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    let mut gallery = ImageCache::default();
    gallery.insert(image("g0.png"));
    gallery.insert(image("g1.png"));
    let registry = build_registry(
        &cfg,
        vec![image("s0.png"), image("s1.png")],
        Arc::new(gallery),
    );
    let mut mgr = ScreenManager::new(
        registry,
        ManagerSettings::from_config(&cfg.screen_manager, ScreenName::from(attract::NAME)),
    );
    mgr.start();
    mgr.tick(Duration::ZERO);
    mgr
}

fn secs(v: u64) -> Duration {
    Duration::from_secs(v)
}

fn current(mgr: &ScreenManager) -> &str {
    mgr.current().map(ScreenName::as_str).unwrap_or("")
}

#[test]
fn starts_on_attract_with_first_slide_visible() {
    let mgr = kiosk(CONFIG);
    assert_eq!(current(&mgr), attract::NAME);
    let view = mgr.view(&ScreenName::from(attract::NAME)).unwrap();
    assert!(view.visible);
    assert_eq!(view.opacity, 1.0);
    assert_eq!(view.layers.len(), 1);
    assert_eq!(view.layers[0].image, "s0.png");
    assert_eq!(view.title.as_deref(), Some("Tap Screen to Begin"));
}

#[test]
fn tap_opens_content_and_inactivity_returns_with_modal_closed() {
    let mut mgr = kiosk(CONFIG);

    mgr.handle_input(InputEvent::PointerDown);
    mgr.handle_input(InputEvent::PointerDown);
    mgr.tick(Duration::ZERO);
    mgr.tick(Duration::from_millis(500));
    assert_eq!(current(&mgr), content::NAME);
    assert!(!mgr.is_transitioning());
    assert_eq!(mgr.pending(), 0);

    mgr.handle_input(InputEvent::Ui(UiAction::OpenGallery(0)));
    mgr.handle_input(InputEvent::Ui(UiAction::NextItem));
    let modal = mgr
        .view(&ScreenName::from(content::NAME))
        .unwrap()
        .modal
        .unwrap();
    assert_eq!((modal.index, modal.len), (1, 2));
    assert_eq!(modal.description, "second");

    mgr.tick(secs(59));
    assert!(mgr.view(&ScreenName::from(content::NAME)).unwrap().modal.is_some());
    assert_eq!(current(&mgr), content::NAME);
    mgr.tick(secs(1));
    let content_view = mgr.view(&ScreenName::from(content::NAME)).unwrap();
    assert!(content_view.modal.is_none());
    assert!(!content_view.visible);
    assert_eq!(current(&mgr), attract::NAME);

    mgr.tick(Duration::from_millis(500));
    assert!(!mgr.is_transitioning());
    let attract_view = mgr.view(&ScreenName::from(attract::NAME)).unwrap();
    assert!(attract_view.visible);
    assert_eq!(attract_view.opacity, 1.0);
}

#[test]
fn modal_auto_closes_before_inactivity_timeout() {
    let mut mgr = kiosk(&CONFIG.replace("auto-close-modal: 90s", "auto-close-modal: 10s"));
    mgr.handle_input(InputEvent::PointerDown);
    mgr.tick(Duration::ZERO);
    mgr.tick(Duration::from_millis(500));
    mgr.handle_input(InputEvent::Ui(UiAction::OpenGallery(0)));

    mgr.tick(secs(9));
    mgr.handle_input(InputEvent::Ui(UiAction::NextItem));
    mgr.tick(secs(9));
    assert!(mgr.view(&ScreenName::from(content::NAME)).unwrap().modal.is_some());
    mgr.tick(secs(1));
    let view = mgr.view(&ScreenName::from(content::NAME)).unwrap();
    assert!(view.modal.is_none());
    assert_eq!(current(&mgr), content::NAME);
}

#[test]
fn broken_content_screen_leaves_attract_running() {
    let yaml = "content-screen:\n  buttons:\n    - label: Only\n";
    let mut mgr = kiosk(yaml);
    assert_eq!(mgr.screen_names().count(), 1);
    assert_eq!(current(&mgr), attract::NAME);

    mgr.handle_input(InputEvent::PointerDown);
    mgr.tick(Duration::ZERO);
    mgr.tick(secs(1));
    assert_eq!(current(&mgr), attract::NAME);
    assert!(!mgr.is_transitioning());
}
