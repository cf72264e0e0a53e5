use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

pub const DEFAULT_ATTRACT_TITLE: &str = "Tap Screen to Begin";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Base directory for image identifiers that are not URLs.
    pub asset_dir: PathBuf,
    /// Global transition and inactivity timing.
    pub screen_manager: ScreenManagerSettings,
    /// Idle slideshow shown while nobody is using the kiosk.
    pub attract_screen: AttractScreenConfig,
    /// Button-driven photo gallery.
    pub content_screen: ContentScreenConfig,
    pub loader: LoaderSettings,
    pub input: InputSettings,
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    ///
    /// Screen wiring (button slots and the like) is checked when the screens are
    /// built so that one broken screen does not stop the others from starting.
    pub fn validated(self) -> Result<Self> {
        self.screen_manager
            .validate()
            .context("invalid screen-manager configuration")?;
        ensure!(
            self.loader.max_concurrent_decodes > 0,
            "loader.max-concurrent-decodes must be greater than zero"
        );
        ensure!(
            !self.loader.fetch_timeout.is_zero(),
            "loader.fetch-timeout must be positive"
        );
        if let Some(device) = &self.input.device {
            ensure!(
                !device.as_os_str().is_empty(),
                "input.device must not be empty when provided"
            );
        }
        Ok(self)
    }

    /// Every image the content screen's galleries reference, in config order.
    pub fn gallery_images(&self) -> impl Iterator<Item = &String> {
        self.content_screen
            .buttons
            .iter()
            .flat_map(|button| button.gallery.iter().map(|item| &item.image))
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            asset_dir: PathBuf::from("assets"),
            screen_manager: ScreenManagerSettings::default(),
            attract_screen: AttractScreenConfig::default(),
            content_screen: ContentScreenConfig::default(),
            loader: LoaderSettings::default(),
            input: InputSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ScreenManagerSettings {
    /// Duration of the fade-out and fade-in between screens.
    #[serde(with = "humantime_serde")]
    pub transition_duration: Duration,
    /// Time without input before returning to the attract screen.
    #[serde(with = "humantime_serde")]
    pub inactivity_timeout: Duration,
    /// Cadence of the cooperative frame driver.
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,
}

impl ScreenManagerSettings {
    fn validate(&self) -> Result<()> {
        ensure!(
            !self.inactivity_timeout.is_zero(),
            "inactivity-timeout must be positive"
        );
        ensure!(!self.tick_interval.is_zero(), "tick-interval must be positive");
        Ok(())
    }
}

impl Default for ScreenManagerSettings {
    fn default() -> Self {
        Self {
            transition_duration: Duration::from_millis(500),
            inactivity_timeout: Duration::from_secs(60),
            tick_interval: Duration::from_millis(16),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct AttractScreenConfig {
    pub title: Option<String>,
    /// Slideshow image identifiers, shown in order.
    pub images: Vec<String>,
    /// How long each image stays before the next one starts fading in.
    #[serde(with = "humantime_serde")]
    pub slideshow_interval: Duration,
    /// Cross-fade duration between slideshow images.
    #[serde(with = "humantime_serde")]
    pub fade_duration: Duration,
}

impl AttractScreenConfig {
    pub fn title_or_default(&self) -> &str {
        match &self.title {
            Some(title) if !title.trim().is_empty() => title.as_str(),
            _ => DEFAULT_ATTRACT_TITLE,
        }
    }
}

impl Default for AttractScreenConfig {
    fn default() -> Self {
        Self {
            title: None,
            images: Vec::new(),
            slideshow_interval: Duration::from_secs(3),
            fade_duration: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ContentScreenConfig {
    /// Idle time before an open gallery modal closes itself.
    #[serde(with = "humantime_serde")]
    pub auto_close_modal: Duration,
    pub buttons: Vec<ButtonConfig>,
}

impl Default for ContentScreenConfig {
    fn default() -> Self {
        Self {
            auto_close_modal: Duration::from_secs(30),
            buttons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct ButtonConfig {
    pub label: String,
    pub gallery: Vec<GalleryItem>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct GalleryItem {
    pub image: String,
    pub description: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct LoaderSettings {
    pub max_concurrent_decodes: usize,
    #[serde(with = "humantime_serde")]
    pub fetch_timeout: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_concurrent_decodes: 4,
            fetch_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct InputSettings {
    /// Touchscreen or keyboard evdev node.
    pub device: Option<PathBuf>,
    /// Accept line commands on stdin.
    pub stdin: bool,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            device: None,
            stdin: true,
        }
    }
}
