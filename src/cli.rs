use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapter::AIAdapter;

/// chat-settings: configure AI services, UI preferences and default presets
#[derive(Parser, Debug, Clone)]
#[command(name = "chat-settings")]
#[command(version)]
#[command(about = "Settings screen for a multi-provider chat client", long_about = None)]
pub struct Cli {
    /// Run one operation without the TUI
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Log level (trace, debug, info, warn, error); overrides config.toml
    #[arg(long)]
    pub log_level: Option<String>,

    /// Configuration directory (defaults to ~/.config/chat-settings)
    #[arg(long, value_name = "DIR", env = "CHAT_SETTINGS_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the current settings
    Show,

    /// Submit form fields, e.g. `apply defaultAdapter=openai oaiKey=sk-...`
    ///
    /// Preset assignments use `preset.<adapter>=<preset id>`. Empty values
    /// leave the stored value unchanged.
    Apply {
        #[arg(value_name = "NAME=VALUE", required = true)]
        pairs: Vec<String>,
    },

    /// Delete the stored credential for an adapter
    DeleteKey {
        adapter: AIAdapter,
    },

    /// Fetch AI Horde models and workers
    Refresh,

    /// Print this month's OpenAI usage
    Usage,

    /// Remove every stored key and the local settings (guests only)
    ClearGuest,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["chat-settings"]);
        assert!(cli.command.is_none());
        assert!(cli.log_level.is_none());
    }

    #[test]
    fn test_apply_pairs() {
        let cli = Cli::parse_from([
            "chat-settings",
            "apply",
            "defaultAdapter=openai",
            "preset.openai=basic",
        ]);
        assert_eq!(
            cli.command,
            Some(Command::Apply {
                pairs: vec!["defaultAdapter=openai".to_string(), "preset.openai=basic".to_string()]
            })
        );
    }

    #[test]
    fn test_apply_requires_pairs() {
        assert!(Cli::try_parse_from(["chat-settings", "apply"]).is_err());
    }

    #[test]
    fn test_delete_key_parses_adapter() {
        let cli = Cli::parse_from(["chat-settings", "--log-level", "debug", "delete-key", "horde"]);
        assert_eq!(cli.command, Some(Command::DeleteKey { adapter: AIAdapter::Horde }));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert!(Cli::try_parse_from(["chat-settings", "delete-key", "ooba"]).is_err());
    }
}
