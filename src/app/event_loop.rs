// Event loop - main run() method

use std::time::{Duration, Instant};

use crossterm::event;

use super::App;
use crate::action::Action;
use crate::config::ConfigEvent;
use crate::error::{Result, SettingsError};

impl App {
    pub fn run(&mut self) -> Result<()> {
        loop {
            // ---- 1. Poll non-input sources ----

            if self.poll_snapshot() {
                self.mark_dirty();
            }

            if self.last_tick.elapsed() >= self.tick_interval {
                self.dispatch(Action::Tick)?;
                self.last_tick = Instant::now();
            }

            let config_events = match self.config_watcher.as_mut() {
                Some(watcher) => watcher.poll_events(),
                None => Vec::new(),
            };
            for event in config_events {
                match event {
                    ConfigEvent::Changed(path) => {
                        self.dispatch(Action::ConfigChanged(path))?;
                        self.mark_dirty();
                    }
                    ConfigEvent::Error(msg) => {
                        tracing::warn!("Config watcher error: {}", msg);
                    }
                }
            }

            if self.should_quit {
                break;
            }

            // ---- 2. Poll user input (keys/mouse/paste/resize) ----

            if event::poll(Duration::from_millis(16)).map_err(|e| SettingsError::Terminal(e.to_string()))? {
                let event = event::read().map_err(|e| SettingsError::Terminal(e.to_string()))?;
                self.mark_dirty();

                if let Some(action) = self.handle_event(event) {
                    self.dispatch(action)?;
                }
            }

            if self.should_quit {
                break;
            }

            // ---- 3. Draw once if anything changed ----

            if self.needs_redraw {
                self.draw()?;
                self.needs_redraw = false;
            }
        }

        tracing::info!("Settings screen closed");
        Ok(())
    }
}
