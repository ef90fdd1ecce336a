use serde::Serialize;

use crate::adapter::AIAdapter;

use super::user::DefaultPresets;

/// A complete settings update, committed as one unit
///
/// Fixed fields are `None` when they were not rendered in the form. An
/// empty string is kept as `Some("")`; the service treats both the same way.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kobold_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novel_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub novel_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horde_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub horde_model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub luminai_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oai_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claude_api_key: Option<String>,
    pub default_adapter: AIAdapter,
    pub horde_workers: Vec<String>,
    pub default_presets: DefaultPresets,
}

impl SettingsUpdate {
    /// An update that only carries the required fields
    pub fn new(default_adapter: AIAdapter) -> Self {
        Self {
            kobold_url: None,
            novel_api_key: None,
            novel_model: None,
            horde_key: None,
            horde_model: None,
            luminai_url: None,
            oai_key: None,
            scale_api_key: None,
            scale_url: None,
            claude_api_key: None,
            default_adapter,
            horde_workers: Vec::new(),
            default_presets: DefaultPresets::new(),
        }
    }

    /// The secret submitted for an adapter, if a non-empty one was entered
    pub fn credential_for(&self, adapter: AIAdapter) -> Option<&str> {
        let value = match adapter {
            AIAdapter::Horde => &self.horde_key,
            AIAdapter::Novel => &self.novel_api_key,
            AIAdapter::OpenAI => &self.oai_key,
            AIAdapter::Scale => &self.scale_api_key,
            AIAdapter::Claude => &self.claude_api_key,
            AIAdapter::Kobold | AIAdapter::Luminai => return None,
        };
        non_empty(value)
    }
}

/// Absent and empty submit the same way: as no value
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}
