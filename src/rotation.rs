//! Time-based screen rotation.

use crate::error::{DashboardError, Result};
use crate::screens::{BoxedScreen, Screen};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Cycles through screens, each for its own display duration.
pub struct ScreenRotator {
    screens: Vec<BoxedScreen>,
    current: usize,
    started_at: Option<Instant>,
    required: Duration,
}

impl ScreenRotator {
    /// Fails with [`DashboardError::NoScreens`] when `screens` is empty.
    pub fn new(screens: Vec<BoxedScreen>) -> Result<Self> {
        let required = screens
            .first()
            .map(|screen| screen.display_duration())
            .ok_or(DashboardError::NoScreens)?;

        Ok(Self {
            screens,
            current: 0,
            started_at: None,
            required,
        })
    }

    /// The screen to show at `now`.
    ///
    /// The first call selects the first screen. Afterwards the rotation moves
    /// to the next screen (wrapping) once the current one has been visible
    /// for its full duration, and the timer restarts at `now`.
    pub fn advance(&mut self, now: Instant) -> &dyn Screen {
        let started = self.started_at;
        match started {
            None => self.started_at = Some(now),
            Some(started_at) if now.saturating_duration_since(started_at) >= self.required => {
                self.current = (self.current + 1) % self.screens.len();
                self.started_at = Some(now);
                self.required = self.screens[self.current].display_duration();
                debug!(
                    "Switched to screen {} for {:?}",
                    self.screens[self.current].name(),
                    self.required
                );
            }
            Some(_) => {}
        }
        self.screens[self.current].as_ref()
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The screen selected by the last [`advance`](Self::advance).
    pub fn current(&self) -> &dyn Screen {
        self.screens[self.current].as_ref()
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    pub fn screen_names(&self) -> Vec<&str> {
        self.screens.iter().map(|screen| screen.name()).collect()
    }
}
