// App module
// - mod.rs: App struct, terminal setup, snapshot application
// - event_loop.rs: main run() loop
// - rendering.rs: all UI drawing
// - handlers.rs: event routing and action dispatch

mod event_loop;
mod handlers;
mod rendering;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use arboard::Clipboard;
use crossterm::{
    event::{DisableBracketedPaste, DisableMouseCapture, EnableBracketedPaste, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use tokio::sync::watch;

use crate::components::{ConfirmDialog, NotificationManager, SettingsForm, UsageModal, WorkerModal};
use crate::config::{ConfigManager, ConfigWatcherMode};
use crate::error::{Result, SettingsError};
use crate::settings::FormController;
use crate::store::StoreSnapshot;

pub struct App {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    should_quit: bool,
    needs_redraw: bool,
    last_tick: Instant,
    tick_interval: Duration,
    clipboard: Option<Clipboard>,
    // Configuration system
    config_manager: ConfigManager,
    config_watcher: Option<ConfigWatcherMode>,
    // Settings service
    controller: FormController,
    snapshot_rx: watch::Receiver<StoreSnapshot>,
    snapshot: StoreSnapshot,
    // UI
    form: SettingsForm,
    worker_modal: WorkerModal,
    usage_modal: UsageModal,
    confirm_dialog: ConfirmDialog,
    notification_manager: NotificationManager,
}

impl App {
    pub fn new(config_manager: ConfigManager, controller: FormController) -> Result<Self> {
        enable_raw_mode().map_err(|e| SettingsError::Terminal(e.to_string()))?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture, EnableBracketedPaste)
            .map_err(|e| SettingsError::Terminal(e.to_string()))?;

        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend).map_err(|e| SettingsError::Terminal(e.to_string()))?;

        let clipboard = match Clipboard::new() {
            Ok(clipboard) => Some(clipboard),
            Err(e) => {
                tracing::debug!("Clipboard unavailable: {}", e);
                None
            }
        };

        let general = &config_manager.app_config().general;
        let tick_interval = Duration::from_millis(general.tick_interval_ms.max(16));
        let config_watcher = general.watch_config.then(|| {
            ConfigWatcherMode::start(
                config_manager.config_dir(),
                general.config_watch_debounce_ms,
                general.tick_interval_ms.max(250) * 4,
            )
        });

        let mut snapshot_rx = controller.service().subscribe();
        let snapshot = snapshot_rx.borrow_and_update().clone();
        let worker_count = controller.selected_worker_count(snapshot.user.horde_workers.as_deref());
        let form = SettingsForm::new(&snapshot, config_manager.ui_settings().clone(), worker_count);

        let mut notification_manager = NotificationManager::new();
        notification_manager.observe_notice(snapshot.notice.as_ref());

        let app = Self {
            terminal,
            should_quit: false,
            needs_redraw: true,
            last_tick: Instant::now(),
            tick_interval,
            clipboard,
            config_manager,
            config_watcher,
            controller,
            snapshot_rx,
            snapshot,
            form,
            worker_modal: WorkerModal::new(),
            usage_modal: UsageModal::new(),
            confirm_dialog: ConfirmDialog::new(),
            notification_manager,
        };

        app.controller.activate();
        tracing::info!(
            adapters = app.snapshot.adapters.len(),
            logged_in = app.snapshot.logged_in,
            "Settings screen started"
        );
        Ok(app)
    }

    pub(super) fn mark_dirty(&mut self) {
        self.needs_redraw = true;
    }

    /// Workers the form would submit right now
    fn worker_count(&self) -> usize {
        self.controller
            .selected_worker_count(self.snapshot.user.horde_workers.as_deref())
    }

    fn recompute_visible_groups(&mut self) {
        let worker_count = self.worker_count();
        self.form.recompute_visible_groups(&self.snapshot, worker_count);
    }

    /// Pull the latest snapshot if the service published one
    pub(super) fn poll_snapshot(&mut self) -> bool {
        if !self.snapshot_rx.has_changed().unwrap_or(false) {
            return false;
        }
        self.snapshot = self.snapshot_rx.borrow_and_update().clone();

        self.recompute_visible_groups();
        self.notification_manager
            .observe_notice(self.snapshot.notice.as_ref());
        self.usage_modal.set_usage(self.snapshot.metadata.openai_usage);
        if self.worker_modal.is_visible() {
            self.worker_modal.set_workers(self.snapshot.horde_workers.clone());
        }
        true
    }
}

impl Drop for App {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen, DisableMouseCapture, DisableBracketedPaste);
    }
}
