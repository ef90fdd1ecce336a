use crossterm::event::{Event, KeyCode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::action::Action;
use crate::config::Theme;

/// Confirmation for the irreversible guest-state wipe
pub struct ConfirmDialog {
    visible: bool,
}

impl ConfirmDialog {
    pub fn new() -> Self {
        Self { visible: false }
    }

    pub fn show(&mut self) {
        self.visible = true;
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<Action> {
        if !self.is_visible() {
            return None;
        }

        if let Event::Key(key) = event {
            match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => {
                    return Some(Action::GuestClearConfirm);
                }
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                    return Some(Action::GuestClearCancel);
                }
                _ => {}
            }
        }

        None
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if !self.visible {
            return;
        }

        let dialog_width = (area.width * 60 / 100).clamp(40, 70).min(area.width);
        let dialog_height = 9.min(area.height);
        let dialog_x = area.width.saturating_sub(dialog_width) / 2;
        let dialog_y = area.height.saturating_sub(dialog_height) / 2;
        let dialog_area = Rect::new(dialog_x, dialog_y, dialog_width, dialog_height);

        frame.render_widget(Clear, dialog_area);

        let danger = theme.form.danger.to_color();
        let block = Block::default()
            .title("⚠ Delete Guest State")
            .title_style(Style::default().fg(danger).add_modifier(Modifier::BOLD))
            .borders(Borders::ALL)
            .border_style(Style::default().fg(danger));

        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Explanation
                Constraint::Length(1), // Spacer
                Constraint::Min(1),    // Instructions
            ])
            .split(inner);

        let explanation = vec![
            Line::from(Span::styled(
                "Removes every stored key and your local settings.",
                Style::default().fg(theme.colors.foreground.to_color()),
            )),
            Line::from(Span::styled(
                "This cannot be undone!",
                Style::default().fg(danger).add_modifier(Modifier::BOLD),
            )),
        ];
        frame.render_widget(
            Paragraph::new(explanation)
                .alignment(Alignment::Center)
                .wrap(Wrap { trim: true }),
            chunks[0],
        );

        let instructions = Line::from(vec![
            Span::styled(
                "[Y]",
                Style::default().fg(danger).add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Delete   "),
            Span::styled(
                "[N/Esc]",
                Style::default()
                    .fg(theme.colors.success.to_color())
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" Keep"),
        ]);
        frame.render_widget(
            Paragraph::new(instructions).alignment(Alignment::Center),
            chunks[2],
        );
    }
}

impl Default for ConfirmDialog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};

    fn key(c: char) -> Event {
        Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE))
    }

    #[test]
    fn test_hidden_dialog_ignores_input() {
        let mut dialog = ConfirmDialog::new();
        assert_eq!(dialog.handle_event(&key('y')), None);
    }

    #[test]
    fn test_enter_does_not_confirm() {
        let mut dialog = ConfirmDialog::new();
        dialog.show();
        let enter = Event::Key(KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(dialog.handle_event(&enter), None);
        assert_eq!(dialog.handle_event(&key('y')), Some(Action::GuestClearConfirm));
        assert_eq!(dialog.handle_event(&key('n')), Some(Action::GuestClearCancel));
    }
}
