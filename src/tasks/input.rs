//! Raw input sources. Each runs on its own OS thread and forwards events to
//! the frame driver over a bounded channel.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::thread;

use anyhow::{Context, Result};
use evdev::{Device, EventSummary, KeyCode};
use tokio::sync::mpsc::Sender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::events::{InputEvent, UiAction};

/// Parses one stdin command.
///
/// `tap`, `key`, `open <1-3>`, `next`, `prev` and `close`. Gallery slots are
/// one-based on the command line.
pub fn parse_command(line: &str) -> Option<InputEvent> {
    let mut words = line.split_whitespace();
    let command = words.next()?.to_ascii_lowercase();
    let event = match command.as_str() {
        "tap" | "click" => InputEvent::PointerDown,
        "key" => InputEvent::KeyDown,
        "open" => {
            let slot: usize = words.next()?.parse().ok()?;
            InputEvent::Ui(UiAction::OpenGallery(slot.checked_sub(1)?))
        }
        "next" => InputEvent::Ui(UiAction::NextItem),
        "prev" | "previous" => InputEvent::Ui(UiAction::PreviousItem),
        "close" => InputEvent::Ui(UiAction::CloseModal),
        _ => return None,
    };
    Some(event)
}

/// Maps a key press (`value == 1`) to an input event. Releases and repeats are dropped.
pub fn map_key(code: KeyCode, value: i32) -> Option<InputEvent> {
    if value != 1 {
        return None;
    }
    let event = match code {
        KeyCode::BTN_TOUCH | KeyCode::BTN_LEFT => InputEvent::PointerDown,
        KeyCode::KEY_RIGHT => InputEvent::Ui(UiAction::NextItem),
        KeyCode::KEY_LEFT => InputEvent::Ui(UiAction::PreviousItem),
        KeyCode::KEY_ESC => InputEvent::Ui(UiAction::CloseModal),
        KeyCode::KEY_1 => InputEvent::Ui(UiAction::OpenGallery(0)),
        KeyCode::KEY_2 => InputEvent::Ui(UiAction::OpenGallery(1)),
        KeyCode::KEY_3 => InputEvent::Ui(UiAction::OpenGallery(2)),
        _ => InputEvent::KeyDown,
    };
    Some(event)
}

/// Reads line commands from stdin until EOF, which cancels the kiosk.
pub fn spawn_stdin(tx: Sender<InputEvent>, cancel: CancellationToken) -> Result<()> {
    thread::Builder::new()
        .name("kiosk-stdin".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let line = match line {
                    Ok(line) => line,
                    Err(err) => {
                        warn!("stdin read failed: {err}");
                        break;
                    }
                };
                if line.trim().is_empty() {
                    continue;
                }
                let Some(event) = parse_command(&line) else {
                    warn!(command = line.trim(), "unrecognised command");
                    continue;
                };
                if tx.blocking_send(event).is_err() {
                    return;
                }
            }
            info!("stdin closed; initiating shutdown");
            cancel.cancel();
        })
        .context("failed to spawn stdin reader")?;
    Ok(())
}

/// Opens an evdev node and forwards touches and key presses.
pub fn spawn_device(path: &Path, tx: Sender<InputEvent>, cancel: CancellationToken) -> Result<()> {
    let mut device =
        Device::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let path: PathBuf = path.to_path_buf();
    info!(
        device = %path.display(),
        name = device.name().unwrap_or("unknown"),
        "listening for input events"
    );
    thread::Builder::new()
        .name("kiosk-evdev".into())
        .spawn(move || {
            while !cancel.is_cancelled() {
                let events = match device.fetch_events() {
                    Ok(events) => events,
                    Err(err) => {
                        warn!(device = %path.display(), "failed reading input events: {err}");
                        return;
                    }
                };
                for event in events {
                    let EventSummary::Key(_, code, value) = event.destructure() else {
                        continue;
                    };
                    let Some(event) = map_key(code, value) else {
                        continue;
                    };
                    if tx.blocking_send(event).is_err() {
                        debug!("input channel closed");
                        return;
                    }
                }
            }
        })
        .context("failed to spawn input device reader")?;
    Ok(())
}
