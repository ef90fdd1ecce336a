// Event routing and action dispatch

use std::path::Path;

use crossterm::event::{Event, KeyCode, KeyEventKind, KeyModifiers};

use super::App;
use crate::action::Action;
use crate::components::Component;
use crate::config::ReloadedFile;
use crate::error::Result;
use crate::settings::UiSettings;

impl App {
    /// Route a terminal event to the topmost visible layer
    pub(super) fn handle_event(&mut self, event: Event) -> Option<Action> {
        if let Event::Key(key) = &event {
            if key.kind != KeyEventKind::Press {
                return None;
            }
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Some(Action::Quit);
            }
        }

        if self.confirm_dialog.is_visible() {
            return self.confirm_dialog.handle_event(&event);
        }
        if self.worker_modal.is_visible() {
            return self.worker_modal.handle_event(&event);
        }
        if self.usage_modal.is_visible() {
            return self.usage_modal.handle_event(&event);
        }
        self.form.handle_event(&event)
    }

    /// Single exhaustive match over Action
    pub(super) fn dispatch(&mut self, action: Action) -> Result<()> {
        match action {
            Action::Noop => {}
            Action::Quit => self.should_quit = true,
            Action::Tick => {
                if self.notification_manager.tick() | self.usage_modal.tick() {
                    self.mark_dirty();
                }
            }

            Action::FormNextTab
            | Action::FormPrevTab
            | Action::FormNextRow
            | Action::FormPrevRow
            | Action::FormScrollUp(_)
            | Action::FormScrollDown(_)
            | Action::FormStartEdit
            | Action::FormCancelEdit => self.form.update(&action),
            Action::FormPaste => self.paste_from_clipboard(),

            Action::FormSubmit => self.submit_form(),
            Action::RefreshHorde => {
                self.controller.refresh_horde();
            }
            Action::DeleteKey(adapter) => {
                tracing::info!(%adapter, "Deleting stored key");
                self.controller.delete_key(adapter);
            }
            Action::ApplyUiSettings(ui) => self.apply_ui_settings(ui),

            Action::UsageShow => {
                self.usage_modal.show();
                self.controller.show_usage();
            }
            Action::UsageClose => self.usage_modal.dismiss(),

            Action::WorkersShow => {
                let current = self
                    .controller
                    .worker_selection()
                    .or(self.snapshot.user.horde_workers.as_deref())
                    .unwrap_or(&[])
                    .to_vec();
                self.worker_modal
                    .show(self.snapshot.horde_workers.clone(), &current);
            }
            Action::WorkersSave(workers) => {
                tracing::debug!(count = workers.len(), "Worker selection changed");
                self.controller.set_worker_selection(workers);
                self.worker_modal.dismiss();
                self.recompute_visible_groups();
            }
            Action::WorkersClose => self.worker_modal.dismiss(),

            Action::GuestClearRequest => self.confirm_dialog.show(),
            Action::GuestClearConfirm => {
                self.confirm_dialog.dismiss();
                self.controller.clear_guest_state();
            }
            Action::GuestClearCancel => self.confirm_dialog.dismiss(),

            Action::ConfigChanged(path) => self.reload_config(&path),
        }
        Ok(())
    }

    fn submit_form(&mut self) {
        let entries = self.form.entries();
        match self.controller.submit(&entries) {
            Ok(_) => self.form.clear_secret_drafts(),
            Err(e) => {
                tracing::warn!("Form not submitted: {}", e);
                self.notification_manager.error(e.to_string());
            }
        }
    }

    fn paste_from_clipboard(&mut self) {
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.notification_manager.error("Clipboard unavailable");
            return;
        };
        match clipboard.get_text() {
            Ok(text) => self.form.paste_text(&text),
            Err(e) => {
                tracing::debug!("Clipboard read failed: {}", e);
                self.notification_manager.error("Nothing to paste");
            }
        }
    }

    fn apply_ui_settings(&mut self, ui: UiSettings) {
        self.form.set_ui_settings(ui.clone());
        match self.config_manager.set_ui_settings(ui) {
            Ok(()) => self.notification_manager.info("UI settings saved"),
            Err(e) => {
                tracing::warn!("Failed to save UI settings: {}", e);
                self.notification_manager.error(e.to_string());
            }
        }
    }

    fn reload_config(&mut self, path: &Path) {
        tracing::info!("Config file changed: {}", path.display());
        match self.config_manager.reload_file(path) {
            Some(ReloadedFile::Main) => {
                let server = &self.config_manager.app_config().server;
                let service = self.controller.service();
                service.set_adapters(server.adapters.clone());
                service.set_logged_in(server.logged_in());
            }
            Some(ReloadedFile::Ui) | Some(ReloadedFile::Theme) => {
                self.form
                    .set_ui_settings(self.config_manager.ui_settings().clone());
            }
            None => {}
        }
    }
}
