use crossterm::event::{Event, KeyCode};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::action::Action;
use crate::config::Theme;
use crate::settings::UsageDisplay;

use super::spinner::{Spinner, SpinnerStyle};

/// "OpenAI Usage" popup; shows a spinner until the store has a value
pub struct UsageModal {
    display: UsageDisplay,
    spinner: Spinner,
    visible: bool,
}

impl UsageModal {
    pub fn new() -> Self {
        Self {
            display: UsageDisplay::Loading,
            spinner: Spinner::new(SpinnerStyle::Braille).with_label("Loading"),
            visible: false,
        }
    }

    pub fn show(&mut self) {
        self.display = UsageDisplay::Loading;
        self.visible = true;
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn display(&self) -> &UsageDisplay {
        &self.display
    }

    /// Track the store's usage value; `None` means a query is in flight
    pub fn set_usage(&mut self, usage: Option<f64>) {
        self.display = UsageDisplay::from_usage(usage);
    }

    /// Returns true when a redraw is needed
    pub fn tick(&mut self) -> bool {
        self.visible && self.display == UsageDisplay::Loading && self.spinner.tick()
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<Action> {
        if !self.visible {
            return None;
        }

        if let Event::Key(key) = event {
            match key.code {
                KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => return Some(Action::UsageClose),
                _ => {}
            }
        }
        None
    }

    fn body(&self, theme: &Theme) -> Line<'static> {
        let label = Span::styled(
            "Usage this month: ",
            Style::default().fg(theme.colors.muted.to_color()),
        );
        match &self.display {
            UsageDisplay::Loading => Line::from(vec![
                label,
                Span::styled(
                    format!("{} {}", self.spinner.current_frame(), self.spinner.label().unwrap_or("")),
                    Style::default().fg(theme.spinner.loading_color.to_color()),
                ),
            ]),
            UsageDisplay::Amount(amount) => Line::from(vec![
                label,
                Span::styled(
                    amount.clone(),
                    Style::default()
                        .fg(theme.colors.foreground.to_color())
                        .add_modifier(Modifier::BOLD),
                ),
            ]),
        }
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if !self.visible {
            return;
        }

        let dialog_width = 44.min(area.width);
        let dialog_height = 5.min(area.height);
        let dialog_area = Rect::new(
            area.width.saturating_sub(dialog_width) / 2,
            area.height.saturating_sub(dialog_height) / 2,
            dialog_width,
            dialog_height,
        );

        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(" OpenAI Usage ")
            .title_style(theme.title_style(true))
            .borders(Borders::ALL)
            .border_style(theme.border_style(true));

        let lines = vec![
            self.body(theme),
            Line::default(),
            Line::from(Span::styled(
                "[Esc] close",
                Style::default().fg(theme.colors.muted.to_color()),
            )),
        ];
        frame.render_widget(
            Paragraph::new(lines).block(block).alignment(Alignment::Center),
            dialog_area,
        );
    }
}

impl Default for UsageModal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};
    use pretty_assertions::assert_eq;

    fn body_text(modal: &UsageModal) -> String {
        modal
            .body(&Theme::default())
            .spans
            .iter()
            .map(|s| s.content.as_ref())
            .collect()
    }

    #[test]
    fn test_loading_until_value_arrives() {
        let mut modal = UsageModal::new();
        modal.show();
        assert_eq!(modal.display(), &UsageDisplay::Loading);
        assert!(body_text(&modal).contains("Loading"));

        modal.set_usage(Some(1050.0));
        assert_eq!(body_text(&modal), "Usage this month: $10.5");
    }

    #[test]
    fn test_reopen_starts_loading_again() {
        let mut modal = UsageModal::new();
        modal.show();
        modal.set_usage(Some(0.0));
        assert_eq!(modal.display(), &UsageDisplay::Amount("$0".to_string()));
        modal.dismiss();

        modal.show();
        assert_eq!(modal.display(), &UsageDisplay::Loading);
    }

    #[test]
    fn test_escape_closes() {
        let mut modal = UsageModal::new();
        let esc = Event::Key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(modal.handle_event(&esc), None);
        modal.show();
        assert_eq!(modal.handle_event(&esc), Some(Action::UsageClose));
    }
}
