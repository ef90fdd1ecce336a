// Rendering - all UI drawing

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

use super::App;
use crate::components::Component;
use crate::config::Theme;
use crate::error::{Result, SettingsError};
use crate::store::StoreSnapshot;

impl App {
    pub(super) fn draw(&mut self) -> Result<()> {
        let theme = self.config_manager.theme().clone();
        let Self {
            terminal,
            form,
            worker_modal,
            usage_modal,
            confirm_dialog,
            notification_manager,
            snapshot,
            ..
        } = self;

        let modal_open =
            worker_modal.is_visible() || usage_modal.is_visible() || confirm_dialog.is_visible();

        terminal
            .draw(|frame| {
                let area = frame.area();
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(3), Constraint::Length(1)])
                    .split(area);

                form.set_inner_area(Rect {
                    x: chunks[0].x + 1,
                    y: chunks[0].y + 1,
                    width: chunks[0].width.saturating_sub(2),
                    height: chunks[0].height.saturating_sub(2),
                });
                form.render(frame, chunks[0], !modal_open, &theme);
                frame.render_widget(Paragraph::new(status_line(snapshot, &theme)), chunks[1]);

                worker_modal.render(frame, area, &theme);
                usage_modal.render(frame, area, &theme);
                confirm_dialog.render(frame, area, &theme);
                notification_manager.render(frame, area, &theme);
            })
            .map_err(|e| SettingsError::Terminal(e.to_string()))?;
        Ok(())
    }
}

fn status_line(snapshot: &StoreSnapshot, theme: &Theme) -> Line<'static> {
    let muted = Style::default().fg(theme.colors.muted.to_color());
    let identity = if snapshot.logged_in {
        Span::styled(" Logged in ", Style::default().fg(theme.colors.success.to_color()))
    } else {
        Span::styled(" Guest ", Style::default().fg(theme.colors.warning.to_color()))
    };
    Line::from(vec![
        identity,
        Span::styled(format!("│ {} services ", snapshot.adapters.len()), muted),
        Span::styled(format!("│ default: {} ", snapshot.user.default_adapter.label()), muted),
        Span::styled("│ q quit", muted),
    ])
}
