use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpinnerStyle {
    #[default]
    Braille,
    Line,
}

impl SpinnerStyle {
    pub fn frames(&self) -> &'static [&'static str] {
        match self {
            SpinnerStyle::Braille => &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"],
            SpinnerStyle::Line => &["⎯", "\\", "|", "/"],
        }
    }

    pub fn frame_duration_ms(&self) -> u64 {
        match self {
            SpinnerStyle::Braille => 80,
            SpinnerStyle::Line => 100,
        }
    }
}

/// Frame-based loading indicator, advanced from the app tick
#[derive(Debug, Clone)]
pub struct Spinner {
    style: SpinnerStyle,
    frame_index: usize,
    last_frame_time: Instant,
    label: Option<String>,
}

impl Default for Spinner {
    fn default() -> Self {
        Self::new(SpinnerStyle::default())
    }
}

impl Spinner {
    pub fn new(style: SpinnerStyle) -> Self {
        Self {
            style,
            frame_index: 0,
            last_frame_time: Instant::now(),
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Advance one frame if its duration has passed; returns whether it moved
    pub fn tick(&mut self) -> bool {
        let frame_duration = Duration::from_millis(self.style.frame_duration_ms());
        if self.last_frame_time.elapsed() >= frame_duration {
            let frames = self.style.frames();
            self.frame_index = (self.frame_index + 1) % frames.len();
            self.last_frame_time = Instant::now();
            true
        } else {
            false
        }
    }

    pub fn current_frame(&self) -> &'static str {
        let frames = self.style.frames();
        frames[self.frame_index % frames.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spinner_with_label() {
        let spinner = Spinner::new(SpinnerStyle::Braille).with_label("Loading...");
        assert_eq!(spinner.label(), Some("Loading..."));
    }

    #[test]
    fn test_spinner_tick() {
        let mut spinner = Spinner::new(SpinnerStyle::Braille);
        spinner.last_frame_time = Instant::now() - Duration::from_millis(100);
        assert!(spinner.tick());
        assert_eq!(spinner.frame_index, 1);
        assert_eq!(spinner.current_frame(), "⠙");
        assert!(!spinner.tick());
    }

    #[test]
    fn test_frames_wrap() {
        let mut spinner = Spinner::new(SpinnerStyle::Line);
        for _ in 0..SpinnerStyle::Line.frames().len() {
            spinner.last_frame_time = Instant::now() - Duration::from_millis(200);
            spinner.tick();
        }
        assert_eq!(spinner.current_frame(), "⎯");
    }
}
