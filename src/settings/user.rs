//! Persisted user settings
//!
//! Stored in `~/.config/chat-settings/settings.toml`. Credential secrets are
//! never written here; only presence/verification flags are.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::adapter::AIAdapter;

/// Preset assignment: at most one preset id per adapter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, String>", into = "BTreeMap<String, String>")]
pub struct DefaultPresets(BTreeMap<AIAdapter, String>);

impl DefaultPresets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a preset, replacing any previous assignment for the adapter
    pub fn assign(&mut self, adapter: AIAdapter, preset_id: impl Into<String>) {
        self.0.insert(adapter, preset_id.into());
    }

    pub fn get(&self, adapter: AIAdapter) -> Option<&str> {
        self.0.get(&adapter).map(|s| s.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AIAdapter, &str)> {
        self.0.iter().map(|(a, p)| (*a, p.as_str()))
    }
}

impl FromIterator<(AIAdapter, String)> for DefaultPresets {
    fn from_iter<I: IntoIterator<Item = (AIAdapter, String)>>(iter: I) -> Self {
        let mut presets = Self::new();
        for (adapter, preset_id) in iter {
            presets.assign(adapter, preset_id);
        }
        presets
    }
}

impl From<BTreeMap<String, String>> for DefaultPresets {
    fn from(raw: BTreeMap<String, String>) -> Self {
        raw.into_iter()
            .filter_map(|(key, preset_id)| match key.parse::<AIAdapter>() {
                Ok(adapter) => Some((adapter, preset_id)),
                Err(e) => {
                    tracing::warn!("Dropping default preset: {}", e);
                    None
                }
            })
            .collect()
    }
}

impl From<DefaultPresets> for BTreeMap<String, String> {
    fn from(presets: DefaultPresets) -> Self {
        presets
            .0
            .into_iter()
            .map(|(adapter, preset_id)| (adapter.as_str().to_string(), preset_id))
            .collect()
    }
}

/// The user's persisted AI settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserSettings {
    pub default_adapter: AIAdapter,

    pub kobold_url: String,
    pub luminai_url: String,
    pub scale_url: String,

    pub novel_model: String,
    pub horde_model: String,

    /// Horde account name resolved from the stored key; `None` means guest access
    pub horde_name: Option<String>,
    /// Persisted worker selection; `None` when never chosen
    pub horde_workers: Option<Vec<String>>,

    pub horde_key_set: bool,
    pub novel_verified: bool,
    pub oai_key_set: bool,
    pub scale_api_key_set: bool,
    pub claude_api_key_set: bool,

    pub default_presets: DefaultPresets,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            default_adapter: AIAdapter::Horde,
            kobold_url: String::new(),
            luminai_url: String::new(),
            scale_url: String::new(),
            novel_model: "euterpe-v2".to_string(),
            horde_model: "any".to_string(),
            horde_name: None,
            horde_workers: None,
            horde_key_set: false,
            novel_verified: false,
            oai_key_set: false,
            scale_api_key_set: false,
            claude_api_key_set: false,
            default_presets: DefaultPresets::new(),
        }
    }
}

impl UserSettings {
    /// Whether a credential is stored for the adapter
    pub fn credential_set(&self, adapter: AIAdapter) -> bool {
        match adapter {
            AIAdapter::Horde => self.horde_key_set,
            AIAdapter::Novel => self.novel_verified,
            AIAdapter::OpenAI => self.oai_key_set,
            AIAdapter::Scale => self.scale_api_key_set,
            AIAdapter::Claude => self.claude_api_key_set,
            AIAdapter::Kobold | AIAdapter::Luminai => false,
        }
    }

    /// Record that a secret was stored; for Novel this means it was verified
    pub fn mark_credential_set(&mut self, adapter: AIAdapter) {
        match adapter {
            AIAdapter::Horde => self.horde_key_set = true,
            AIAdapter::Novel => self.novel_verified = true,
            AIAdapter::OpenAI => self.oai_key_set = true,
            AIAdapter::Scale => self.scale_api_key_set = true,
            AIAdapter::Claude => self.claude_api_key_set = true,
            AIAdapter::Kobold | AIAdapter::Luminai => {}
        }
    }

    /// Reset the fields owned by one adapter's credential, leaving every other field alone
    pub fn clear_credential(&mut self, adapter: AIAdapter) {
        match adapter {
            AIAdapter::Horde => {
                self.horde_key_set = false;
                self.horde_name = None;
            }
            AIAdapter::Novel => self.novel_verified = false,
            AIAdapter::OpenAI => self.oai_key_set = false,
            AIAdapter::Scale => self.scale_api_key_set = false,
            AIAdapter::Claude => self.claude_api_key_set = false,
            AIAdapter::Kobold | AIAdapter::Luminai => {}
        }
    }
}

/// Colour theme choices for the terminal UI
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeChoice {
    #[default]
    Default,
    Vibrant,
}

impl ThemeChoice {
    pub const ALL: &'static [ThemeChoice] = &[ThemeChoice::Default, ThemeChoice::Vibrant];

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeChoice::Default => "default",
            ThemeChoice::Vibrant => "vibrant",
        }
    }
}

/// Local UI preferences; applied immediately, never part of the settings update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiSettings {
    pub theme: ThemeChoice,
    /// Show credential input as dots while typing
    pub mask_credentials: bool,
}

impl Default for UiSettings {
    fn default() -> Self {
        Self {
            theme: ThemeChoice::Default,
            mask_credentials: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_assign_last_write_wins() {
        let mut presets = DefaultPresets::new();
        presets.assign(AIAdapter::Horde, "first");
        presets.assign(AIAdapter::Horde, "second");
        assert_eq!(presets.len(), 1);
        assert_eq!(presets.get(AIAdapter::Horde), Some("second"));
    }

    #[test]
    fn test_settings_roundtrip_through_toml() {
        let mut user = UserSettings::default();
        user.default_adapter = AIAdapter::OpenAI;
        user.default_presets.assign(AIAdapter::OpenAI, "openai-basic");
        user.horde_workers = Some(vec!["w1".to_string()]);
        user.oai_key_set = true;

        let text = toml::to_string_pretty(&user).unwrap();
        assert!(text.contains("openai = \"openai-basic\""));
        let parsed: UserSettings = toml::from_str(&text).unwrap();
        assert_eq!(parsed, user);
    }

    #[test]
    fn test_unknown_preset_adapters_are_dropped() {
        let text = r#"
default_adapter = "novel"

[default_presets]
novel = "novel-20"
ooba = "whatever"
"#;
        let user: UserSettings = toml::from_str(text).unwrap();
        assert_eq!(user.default_adapter, AIAdapter::Novel);
        assert_eq!(user.default_presets.len(), 1);
        assert_eq!(user.default_presets.get(AIAdapter::Novel), Some("novel-20"));
    }

    #[test]
    fn test_clear_credential_only_touches_that_adapter() {
        let mut user = UserSettings {
            horde_key_set: true,
            horde_name: Some("alice".to_string()),
            oai_key_set: true,
            novel_verified: true,
            kobold_url: "http://localhost:5000".to_string(),
            ..Default::default()
        };

        user.clear_credential(AIAdapter::Horde);

        assert!(!user.horde_key_set);
        assert_eq!(user.horde_name, None);
        assert!(user.oai_key_set);
        assert!(user.novel_verified);
        assert_eq!(user.kobold_url, "http://localhost:5000");
    }

    #[test]
    fn test_ui_settings_defaults() {
        let ui: UiSettings = toml::from_str("").unwrap();
        assert_eq!(ui.theme, ThemeChoice::Default);
        assert!(ui.mask_credentials);
    }
}
