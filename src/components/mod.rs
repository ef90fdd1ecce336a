pub mod confirm_dialog;
pub mod notification;
pub mod settings_form;
pub mod spinner;
pub mod usage_modal;
pub mod worker_modal;

use crossterm::event::Event;
use ratatui::{layout::Rect, Frame};

use crate::action::Action;
use crate::config::Theme;

pub use confirm_dialog::ConfirmDialog;
pub use notification::NotificationManager;
pub use settings_form::SettingsForm;
pub use usage_modal::UsageModal;
pub use worker_modal::WorkerModal;

pub trait Component {
    fn handle_event(&mut self, event: &Event) -> Option<Action>;

    fn update(&mut self, action: &Action);

    fn render(&self, frame: &mut Frame, area: Rect, focused: bool, theme: &Theme);
}
