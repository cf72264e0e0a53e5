//! Frame driver: feeds input to the screen manager, ticks it at a fixed
//! cadence and hands each resulting [`Frame`] to a [`Presenter`].

use std::time::Duration;

use anyhow::Result;
use tokio::select;
use tokio::sync::mpsc::Receiver;
use tokio::time::{Instant, MissedTickBehavior, interval};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

use crate::events::InputEvent;
use crate::tasks::manager::{Frame, ScreenManager};

/// Consumer of rendered frames. Drawing itself lives outside this crate.
pub trait Presenter: Send {
    fn present(&mut self, frame: &Frame);
}

/// Logs screen changes at info and every other frame change at trace.
#[derive(Debug, Default)]
pub struct LogPresenter {
    last: Option<Frame>,
}

impl Presenter for LogPresenter {
    fn present(&mut self, frame: &Frame) {
        if self.last.as_ref() == Some(frame) {
            return;
        }
        let current_changed = self
            .last
            .as_ref()
            .is_none_or(|last| last.current != frame.current);
        if current_changed {
            match &frame.current {
                Some(current) => info!(screen = %current, "now showing"),
                None => info!("display blank"),
            }
        }
        for view in frame.screens.iter().filter(|view| view.visible) {
            trace!(
                screen = %view.name,
                opacity = view.opacity,
                layers = view.layers.len(),
                modal = ?view.modal.as_ref().map(|m| m.index),
                "frame"
            );
        }
        self.last = Some(frame.clone());
    }
}

pub async fn run<P: Presenter>(
    mut manager: ScreenManager,
    mut input: Receiver<InputEvent>,
    mut presenter: P,
    cancel: CancellationToken,
    tick_interval: Duration,
) -> Result<()> {
    manager.start();
    let mut ticker = interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_tick = Instant::now();

    loop {
        select! {
            _ = cancel.cancelled() => break,
            Some(event) = input.recv() => {
                debug!(?event, "input");
                manager.handle_input(event);
            }
            _ = ticker.tick() => {
                let now = Instant::now();
                manager.tick(now.duration_since(last_tick));
                last_tick = now;
                presenter.present(&manager.frame());
            }
        }
    }
    info!("frame driver stopped");
    Ok(())
}
