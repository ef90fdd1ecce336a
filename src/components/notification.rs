use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

use crate::config::Theme;
use crate::store::{Notice, NoticeLevel};

const DEFAULT_DURATION_MS: u64 = 4000;
const ERROR_DURATION_MS: u64 = 8000;
const MAX_VISIBLE_NOTIFICATIONS: usize = 3;
const NOTIFICATION_WIDTH: u16 = 48;
const NOTIFICATION_HEIGHT: u16 = 4;
const NOTIFICATION_MARGIN: u16 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Error,
}

impl NotificationLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            NotificationLevel::Info => "ℹ",
            NotificationLevel::Success => "✓",
            NotificationLevel::Error => "✗",
        }
    }
}

impl From<NoticeLevel> for NotificationLevel {
    fn from(level: NoticeLevel) -> Self {
        match level {
            NoticeLevel::Success => NotificationLevel::Success,
            NoticeLevel::Error => NotificationLevel::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub created_at: Instant,
    pub duration: Duration,
}

impl Notification {
    pub fn new(level: NotificationLevel, message: impl Into<String>) -> Self {
        let duration_ms = match level {
            NotificationLevel::Error => ERROR_DURATION_MS,
            _ => DEFAULT_DURATION_MS,
        };
        Self {
            level,
            message: message.into(),
            created_at: Instant::now(),
            duration: Duration::from_millis(duration_ms),
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.duration
    }
}

/// Toasts in the top-right corner
///
/// Store notices arrive with a sequence number; each one is shown once no
/// matter how many snapshots carry it.
pub struct NotificationManager {
    notifications: VecDeque<Notification>,
    last_notice_seq: u64,
}

impl NotificationManager {
    pub fn new() -> Self {
        Self {
            notifications: VecDeque::new(),
            last_notice_seq: 0,
        }
    }

    pub fn push(&mut self, notification: Notification) {
        self.notifications.push_back(notification);
        while self.notifications.len() > MAX_VISIBLE_NOTIFICATIONS * 2 {
            self.notifications.pop_front();
        }
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(Notification::new(NotificationLevel::Info, message));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Notification::new(NotificationLevel::Error, message));
    }

    /// Show a store notice unless it was already shown; returns whether it was new
    pub fn observe_notice(&mut self, notice: Option<&Notice>) -> bool {
        match notice {
            Some(notice) if notice.seq > self.last_notice_seq => {
                self.last_notice_seq = notice.seq;
                self.push(Notification::new(notice.level.into(), notice.message.clone()));
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self) -> bool {
        let before = self.notifications.len();
        self.notifications.retain(|n| !n.is_expired());
        before != self.notifications.len()
    }

    pub fn count(&self) -> usize {
        self.notifications.len()
    }

    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.notifications.iter().take(MAX_VISIBLE_NOTIFICATIONS)
    }

    pub fn render(&self, frame: &mut Frame, screen: Rect, theme: &Theme) {
        for (idx, notification) in self.visible().enumerate() {
            let y = screen.y + 1 + (idx as u16) * (NOTIFICATION_HEIGHT + NOTIFICATION_MARGIN);
            if y + NOTIFICATION_HEIGHT > screen.height {
                break;
            }
            let width = NOTIFICATION_WIDTH.min(screen.width);
            let x = screen.width.saturating_sub(width + 2);
            let area = Rect::new(x, y, width, NOTIFICATION_HEIGHT);
            Self::render_notification(frame, area, notification, theme);
        }
    }

    fn render_notification(frame: &mut Frame, area: Rect, notification: &Notification, theme: &Theme) {
        frame.render_widget(Clear, area);

        let (fg, bg) = match notification.level {
            NotificationLevel::Info => (
                theme.notifications.info_fg.to_color(),
                theme.notifications.info_bg.to_color(),
            ),
            NotificationLevel::Success => (
                theme.notifications.success_fg.to_color(),
                theme.notifications.success_bg.to_color(),
            ),
            NotificationLevel::Error => (
                theme.notifications.error_fg.to_color(),
                theme.notifications.error_bg.to_color(),
            ),
        };

        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(fg).bg(bg))
            .style(Style::default().bg(bg));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let text = format!("{} {}", notification.level.icon(), notification.message);
        let line = Line::from(Span::styled(
            text,
            Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD),
        ));
        frame.render_widget(
            Paragraph::new(line)
                .style(Style::default().bg(bg))
                .wrap(Wrap { trim: true }),
            inner,
        );
    }
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}
