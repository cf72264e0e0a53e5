use std::io::{self, IsTerminal};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Parser};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::EnvFilter;

use rust_kiosk::config::Configuration;
use rust_kiosk::events::{InputEvent, ScreenName};
use rust_kiosk::screens::{attract, build_registry};
use rust_kiosk::tasks::loader::ImageLoader;
use rust_kiosk::tasks::manager::{ManagerSettings, ScreenManager};
use rust_kiosk::tasks::viewer::{self, LogPresenter};
use rust_kiosk::tasks::input;

#[derive(Debug, Parser)]
#[command(
    name = "kiosk",
    version,
    about = "Touchscreen kiosk: attract slideshow and button galleries"
)]
struct Args {
    /// Path to YAML config
    #[arg(value_name = "CONFIG", default_value = "config.yaml")]
    config: PathBuf,
    /// Increase log verbosity (repeatable)
    #[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
    verbose: u8,
}

fn init_tracing(verbosity: u8) -> Result<()> {
    let filter = match verbosity {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        v => {
            let level = if v == 1 { Level::DEBUG } else { Level::TRACE };
            EnvFilter::new("info")
                .add_directive(format!("rust_kiosk={level}").parse()?)
                .add_directive(format!("kiosk={level}").parse()?)
        }
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let Args { config, verbose } = Args::parse();
    init_tracing(verbose)?;

    let cfg = Configuration::from_yaml_file(&config)
        .with_context(|| format!("failed to load configuration from {}", config.display()))?
        .validated()
        .context("invalid configuration values")?;
    tracing::info!(
        "Loaded configuration from {}:\n{:#?}",
        config.display(),
        cfg
    );

    let loader = ImageLoader::new(&cfg.asset_dir, &cfg.loader)?;
    let slides = loader.load_batch(&cfg.attract_screen.images).await;
    let gallery = loader.preload(cfg.gallery_images()).await;
    tracing::info!(
        slides = slides.loaded.len(),
        gallery = gallery.len(),
        "images preloaded"
    );

    let registry = build_registry(&cfg, slides.loaded, Arc::new(gallery));
    let manager = ScreenManager::new(
        registry,
        ManagerSettings::from_config(&cfg.screen_manager, ScreenName::from(attract::NAME)),
    );

    let cancel = CancellationToken::new();
    let (input_tx, input_rx) = mpsc::channel::<InputEvent>(64); // Input sources -> frame driver

    if let Some(device) = &cfg.input.device {
        if let Err(err) = input::spawn_device(device, input_tx.clone(), cancel.clone()) {
            tracing::error!("input device unavailable: {err:?}");
        }
    }
    if cfg.input.stdin && io::stdin().is_terminal() {
        input::spawn_stdin(input_tx.clone(), cancel.clone())?;
    } else {
        tracing::debug!("stdin is not a terminal; skipping command reader");
    }
    drop(input_tx);

    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::warn!("ctrl-c handler failed: {err}");
                return;
            }
            tracing::info!("ctrl-c received; initiating shutdown");
            cancel.cancel();
        });
    }

    viewer::run(
        manager,
        input_rx,
        LogPresenter::default(),
        cancel.clone(),
        cfg.screen_manager.tick_interval,
    )
    .await
    .context("frame driver failed")?;
    cancel.cancel();
    Ok(())
}
