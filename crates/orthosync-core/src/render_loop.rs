//! Render loop coordinator
//!
//! Each view is redrawn from a fixed-interval timer rather than from store
//! notifications, so any number of changes between two ticks costs a single
//! redraw. While a drag is in progress the surface is asked for the
//! interactive update rate; when it ends a final still-quality frame is
//! forced.

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use crate::config::RenderLoopConfig;
use crate::service::ViewService;
use crate::state::lock;

/// Result of one tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The surface is not mapped
    Skipped,
    /// Nothing to draw
    Idle,
    /// One redraw was issued
    Rendered {
        /// The frame that follows the end of an interaction
        final_still: bool,
    },
}

#[derive(Debug, Clone)]
pub struct RenderLoop {
    interval: Duration,
    interactive_rate: f64,
    still_rate: f64,
    was_interacting: bool,
    frames: u64,
}

impl RenderLoop {
    pub fn new(config: &RenderLoopConfig) -> Self {
        Self {
            interval: config.tick_interval(),
            interactive_rate: config.interactive_update_rate,
            still_rate: config.still_update_rate,
            was_interacting: false,
            frames: 0,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Frames rendered so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Drain pending updates, then redraw at most once
    pub fn tick(&mut self, view: &mut ViewService) -> TickOutcome {
        view.process_pending_updates();
        if !view.is_mapped() {
            return TickOutcome::Skipped;
        }

        let interacting = view.state().is_interacting();
        let final_still = self.was_interacting && !interacting;
        if interacting && !self.was_interacting {
            view.set_desired_update_rate(self.interactive_rate);
        } else if final_still {
            view.set_desired_update_rate(self.still_rate);
        }
        self.was_interacting = interacting;

        if !final_still && !view.is_dirty() {
            return TickOutcome::Idle;
        }
        view.render();
        self.frames += 1;
        TickOutcome::Rendered { final_still }
    }

    fn tick_shared(&mut self, view: &Mutex<ViewService>) -> TickOutcome {
        let mut view = lock(view);
        self.tick(&mut view)
    }

    /// Tick `view` every interval until `shutdown` turns true or its sender
    /// is dropped. Returns the number of frames rendered.
    pub async fn run(
        mut self,
        view: Arc<Mutex<ViewService>>,
        mut shutdown: watch::Receiver<bool>,
    ) -> u64 {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::debug!("render loop started, interval {:?}", self.interval);

        while !*shutdown.borrow() {
            tokio::select! {
                _ = ticker.tick() => {
                    self.tick_shared(&view);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        tracing::debug!("render loop stopped after {} frames", self.frames);
        self.frames
    }
}
