use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "chat-settings.log";

/// Filter directive for this crate at the given level
///
/// Precedence: RUST_LOG > `--log-level` > `general.log_level`.
pub fn default_directive(cli_level: Option<&str>, config_level: &str) -> String {
    let level = cli_level.unwrap_or(config_level);
    format!("chat_settings={},reqwest=warn", level)
}

/// Install the global subscriber
///
/// The TUI owns the terminal, so it logs to a daily file instead of stderr.
/// The returned guard must live until exit so buffered lines are flushed.
pub fn init(directive: &str, tui: bool, log_dir: &Path) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if !tui {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return None;
    }

    if let Err(e) = std::fs::create_dir_all(log_dir) {
        // Nowhere safe to write; stay silent rather than garble the screen
        eprintln!("Warning: Could not create log directory {:?}: {}", log_dir, e);
        tracing_subscriber::registry().with(filter).init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false),
        )
        .init();
    Some(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_level_wins_over_config() {
        assert_eq!(default_directive(Some("debug"), "info"), "chat_settings=debug,reqwest=warn");
        assert_eq!(default_directive(None, "warn"), "chat_settings=warn,reqwest=warn");
    }
}
