use std::collections::HashSet;

use crossterm::event::{Event, KeyCode};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::action::Action;
use crate::config::Theme;
use crate::store::HordeWorker;

/// Multi-select over the fetched horde workers
pub struct WorkerModal {
    workers: Vec<HordeWorker>,
    selected: HashSet<String>,
    cursor: usize,
    visible: bool,
}

impl WorkerModal {
    pub fn new() -> Self {
        Self {
            workers: Vec::new(),
            selected: HashSet::new(),
            cursor: 0,
            visible: false,
        }
    }

    /// Open with the current selection pre-checked
    pub fn show(&mut self, workers: Vec<HordeWorker>, current: &[String]) {
        self.workers = workers;
        self.selected = current.iter().cloned().collect();
        self.cursor = 0;
        self.visible = true;
    }

    pub fn dismiss(&mut self) {
        self.visible = false;
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Replace the list while open, keeping checks for workers that remain
    pub fn set_workers(&mut self, workers: Vec<HordeWorker>) {
        self.workers = workers;
        if self.cursor >= self.workers.len() {
            self.cursor = self.workers.len().saturating_sub(1);
        }
    }

    /// Checked worker ids in list order
    ///
    /// Ids that are no longer listed are kept at the end so a temporarily
    /// offline worker is not silently dropped.
    pub fn selection(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .workers
            .iter()
            .filter(|w| self.selected.contains(&w.id))
            .map(|w| w.id.clone())
            .collect();
        let mut missing: Vec<String> = self
            .selected
            .iter()
            .filter(|id| !self.workers.iter().any(|w| &w.id == *id))
            .cloned()
            .collect();
        missing.sort();
        ids.extend(missing);
        ids
    }

    fn toggle_current(&mut self) {
        if let Some(worker) = self.workers.get(self.cursor) {
            if !self.selected.remove(&worker.id) {
                self.selected.insert(worker.id.clone());
            }
        }
    }

    pub fn handle_event(&mut self, event: &Event) -> Option<Action> {
        if !self.visible {
            return None;
        }

        if let Event::Key(key) = event {
            match key.code {
                KeyCode::Char('j') | KeyCode::Down => {
                    if !self.workers.is_empty() {
                        self.cursor = (self.cursor + 1) % self.workers.len();
                    }
                }
                KeyCode::Char('k') | KeyCode::Up => {
                    if !self.workers.is_empty() {
                        self.cursor = (self.cursor + self.workers.len() - 1) % self.workers.len();
                    }
                }
                KeyCode::Char(' ') => self.toggle_current(),
                KeyCode::Char('c') => self.selected.clear(),
                KeyCode::Enter => return Some(Action::WorkersSave(self.selection())),
                KeyCode::Esc | KeyCode::Char('q') => return Some(Action::WorkersClose),
                _ => {}
            }
        }

        None
    }

    fn render_lines(&self, theme: &Theme) -> Vec<Line<'static>> {
        if self.workers.is_empty() {
            return vec![Line::from(Span::styled(
                "No workers loaded. Press r on the form to refresh.",
                Style::default().fg(theme.colors.muted.to_color()),
            ))];
        }

        self.workers
            .iter()
            .enumerate()
            .map(|(idx, worker)| {
                let is_cursor = idx == self.cursor;
                let check = if self.selected.contains(&worker.id) { "[x]" } else { "[ ]" };
                let (status, status_color) = if worker.online {
                    ("online", theme.colors.success.to_color())
                } else {
                    ("offline", theme.colors.muted.to_color())
                };
                let name_style = if is_cursor {
                    theme.selection_style().add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(theme.colors.foreground.to_color())
                };
                Line::from(vec![
                    Span::styled(
                        if is_cursor { " ▸ " } else { "   " },
                        Style::default().fg(theme.colors.accent.to_color()),
                    ),
                    Span::styled(format!("{} ", check), name_style),
                    Span::styled(worker.name.clone(), name_style),
                    Span::styled(format!("  {}", status), Style::default().fg(status_color)),
                    Span::styled(
                        format!("  {} models", worker.models.len()),
                        Style::default().fg(theme.colors.muted.to_color()),
                    ),
                ])
            })
            .collect()
    }

    pub fn render(&self, frame: &mut Frame, area: Rect, theme: &Theme) {
        if !self.visible {
            return;
        }

        let dialog_width = (area.width * 60 / 100).clamp(40, 90).min(area.width);
        let dialog_height = (self.workers.len() as u16 + 6).clamp(8, area.height.max(8)).min(area.height);
        let dialog_x = area.width.saturating_sub(dialog_width) / 2;
        let dialog_y = area.height.saturating_sub(dialog_height) / 2;
        let dialog_area = Rect::new(dialog_x, dialog_y, dialog_width, dialog_height);

        frame.render_widget(Clear, dialog_area);

        let block = Block::default()
            .title(format!(" Select Specific Workers ({} selected) ", self.selected.len()))
            .title_style(theme.title_style(true))
            .borders(Borders::ALL)
            .border_style(theme.border_style(true));
        let inner = block.inner(dialog_area);
        frame.render_widget(block, dialog_area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(1)])
            .split(inner);

        let visible_height = chunks[0].height as usize;
        let skip = self.cursor.saturating_sub(visible_height.saturating_sub(1));
        let lines: Vec<Line> = self
            .render_lines(theme)
            .into_iter()
            .skip(skip)
            .take(visible_height)
            .collect();
        frame.render_widget(Paragraph::new(lines), chunks[0]);

        let muted = Style::default().fg(theme.colors.muted.to_color());
        let instructions = Line::from(vec![
            Span::styled("[Space]", Style::default().fg(theme.colors.primary.to_color()).add_modifier(Modifier::BOLD)),
            Span::styled(" toggle  ", muted),
            Span::styled("[c]", Style::default().fg(theme.colors.warning.to_color()).add_modifier(Modifier::BOLD)),
            Span::styled(" clear  ", muted),
            Span::styled("[Enter]", Style::default().fg(theme.colors.success.to_color()).add_modifier(Modifier::BOLD)),
            Span::styled(" save  ", muted),
            Span::styled("[Esc]", Style::default().fg(theme.colors.error.to_color()).add_modifier(Modifier::BOLD)),
            Span::styled(" cancel", muted),
        ]);
        frame.render_widget(Paragraph::new(instructions).alignment(Alignment::Center), chunks[1]);
    }
}

impl Default for WorkerModal {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::{KeyEvent, KeyModifiers};
    use pretty_assertions::assert_eq;

    fn worker(id: &str, name: &str) -> HordeWorker {
        HordeWorker {
            id: id.to_string(),
            name: name.to_string(),
            online: true,
            models: Vec::new(),
        }
    }

    fn key(code: KeyCode) -> Event {
        Event::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_hidden_modal_ignores_keys() {
        let mut modal = WorkerModal::new();
        assert_eq!(modal.handle_event(&key(KeyCode::Enter)), None);
    }

    #[test]
    fn test_toggle_and_save_in_list_order() {
        let mut modal = WorkerModal::new();
        modal.show(vec![worker("w-1", "Alpha"), worker("w-2", "Beta"), worker("w-3", "Gamma")], &[]);

        modal.handle_event(&key(KeyCode::Down));
        modal.handle_event(&key(KeyCode::Down));
        modal.handle_event(&key(KeyCode::Char(' ')));
        modal.handle_event(&key(KeyCode::Up));
        modal.handle_event(&key(KeyCode::Up));
        modal.handle_event(&key(KeyCode::Char(' ')));

        assert_eq!(
            modal.handle_event(&key(KeyCode::Enter)),
            Some(Action::WorkersSave(vec!["w-1".to_string(), "w-3".to_string()]))
        );
    }

    #[test]
    fn test_existing_selection_is_prechecked_and_unlisted_ids_kept() {
        let mut modal = WorkerModal::new();
        modal.show(
            vec![worker("w-1", "Alpha")],
            &["gone".to_string(), "w-1".to_string()],
        );
        assert_eq!(modal.selection(), vec!["w-1".to_string(), "gone".to_string()]);

        modal.handle_event(&key(KeyCode::Char(' ')));
        assert_eq!(modal.selection(), vec!["gone".to_string()]);

        modal.handle_event(&key(KeyCode::Char('c')));
        assert!(modal.selection().is_empty());
    }

    #[test]
    fn test_escape_closes() {
        let mut modal = WorkerModal::new();
        modal.show(vec![worker("w-1", "Alpha")], &[]);
        assert_eq!(modal.handle_event(&key(KeyCode::Esc)), Some(Action::WorkersClose));
    }

    #[test]
    fn test_render_lines_mark_selection() {
        let mut modal = WorkerModal::new();
        modal.show(vec![worker("w-1", "Alpha"), worker("w-2", "Beta")], &["w-2".to_string()]);
        let lines = modal.render_lines(&Theme::default());
        let text: Vec<String> = lines
            .iter()
            .map(|l| l.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect();
        assert!(text[0].contains("▸") && text[0].contains("[ ] Alpha"));
        assert!(text[1].contains("[x] Beta"));
    }
}
