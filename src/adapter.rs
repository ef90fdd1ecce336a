//! AI adapter identifiers and the server-provided adapter configuration
//!
//! Adapters form a closed set. Conversations may also say `default`, which
//! defers to the user's default adapter; that marker is never a valid value
//! for the default-adapter setting itself, so it has no variant here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// An integration with one external inference provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AIAdapter {
    Kobold,
    Novel,
    Horde,
    Luminai,
    #[serde(rename = "openai")]
    OpenAI,
    Scale,
    Claude,
}

impl AIAdapter {
    /// Every adapter, in wire-declaration order
    pub const ALL: &'static [AIAdapter] = &[
        AIAdapter::Kobold,
        AIAdapter::Novel,
        AIAdapter::Horde,
        AIAdapter::Luminai,
        AIAdapter::OpenAI,
        AIAdapter::Scale,
        AIAdapter::Claude,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AIAdapter::Kobold => "kobold",
            AIAdapter::Novel => "novel",
            AIAdapter::Horde => "horde",
            AIAdapter::Luminai => "luminai",
            AIAdapter::OpenAI => "openai",
            AIAdapter::Scale => "scale",
            AIAdapter::Claude => "claude",
        }
    }

    /// Human-readable name used in selects and section headers
    pub fn label(&self) -> &'static str {
        match self {
            AIAdapter::Kobold => "Kobold",
            AIAdapter::Novel => "NovelAI",
            AIAdapter::Horde => "Horde",
            AIAdapter::Luminai => "LuminAI",
            AIAdapter::OpenAI => "OpenAI",
            AIAdapter::Scale => "Scale",
            AIAdapter::Claude => "Claude",
        }
    }

    /// Whether the adapter authenticates with a stored secret
    pub fn has_credential(&self) -> bool {
        matches!(
            self,
            AIAdapter::Novel
                | AIAdapter::Horde
                | AIAdapter::OpenAI
                | AIAdapter::Scale
                | AIAdapter::Claude
        )
    }
}

impl fmt::Display for AIAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown adapter: {0}")]
pub struct UnknownAdapter(pub String);

impl FromStr for AIAdapter {
    type Err = UnknownAdapter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AIAdapter::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| UnknownAdapter(s.to_string()))
    }
}

/// Ordered set of adapters the server has enabled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<AIAdapter>", into = "Vec<AIAdapter>")]
pub struct AdapterConfig {
    adapters: Vec<AIAdapter>,
}

impl AdapterConfig {
    /// Build from any iterator, keeping the first occurrence of each adapter
    pub fn new(adapters: impl IntoIterator<Item = AIAdapter>) -> Self {
        let mut ordered: Vec<AIAdapter> = Vec::new();
        for adapter in adapters {
            if !ordered.contains(&adapter) {
                ordered.push(adapter);
            }
        }
        Self { adapters: ordered }
    }

    pub fn all() -> Self {
        Self::new(AIAdapter::ALL.iter().copied())
    }

    pub fn includes(&self, adapter: AIAdapter) -> bool {
        self.adapters.contains(&adapter)
    }

    pub fn iter(&self) -> impl Iterator<Item = AIAdapter> + '_ {
        self.adapters.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }

    /// Options for the default-adapter select: `(value, label)` pairs
    pub fn to_options(&self) -> Vec<(AIAdapter, &'static str)> {
        self.iter().map(|a| (a, a.label())).collect()
    }
}

impl From<Vec<AIAdapter>> for AdapterConfig {
    fn from(adapters: Vec<AIAdapter>) -> Self {
        Self::new(adapters)
    }
}

impl From<AdapterConfig> for Vec<AIAdapter> {
    fn from(config: AdapterConfig) -> Self {
        config.adapters
    }
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("kobold", AIAdapter::Kobold)]
    #[case("novel", AIAdapter::Novel)]
    #[case("horde", AIAdapter::Horde)]
    #[case("luminai", AIAdapter::Luminai)]
    #[case("openai", AIAdapter::OpenAI)]
    #[case("scale", AIAdapter::Scale)]
    #[case("claude", AIAdapter::Claude)]
    fn test_parse_adapter(#[case] input: &str, #[case] expected: AIAdapter) {
        assert_eq!(input.parse::<AIAdapter>().unwrap(), expected);
        assert_eq!(expected.as_str(), input);
    }

    #[test]
    fn test_default_is_not_an_ai_adapter() {
        let err = "default".parse::<AIAdapter>().unwrap_err();
        assert_eq!(err, UnknownAdapter("default".to_string()));
    }

    #[test]
    fn test_adapter_config_dedups_and_keeps_order() {
        let config = AdapterConfig::new([AIAdapter::OpenAI, AIAdapter::Novel, AIAdapter::OpenAI]);
        assert_eq!(config.len(), 2);
        assert_eq!(config.iter().collect::<Vec<_>>(), vec![AIAdapter::OpenAI, AIAdapter::Novel]);
        assert!(config.includes(AIAdapter::Novel));
        assert!(!config.includes(AIAdapter::Horde));
    }

    #[test]
    fn test_adapter_config_serde_is_a_plain_list() {
        #[derive(Deserialize)]
        struct Server {
            adapters: AdapterConfig,
        }

        let server: Server = toml::from_str(r#"adapters = ["horde", "openai", "horde"]"#).unwrap();
        assert_eq!(
            server.adapters.iter().collect::<Vec<_>>(),
            vec![AIAdapter::Horde, AIAdapter::OpenAI]
        );
    }

    #[test]
    fn test_options_use_labels() {
        let config = AdapterConfig::new([AIAdapter::Novel, AIAdapter::Luminai]);
        assert_eq!(
            config.to_options(),
            vec![(AIAdapter::Novel, "NovelAI"), (AIAdapter::Luminai, "LuminAI")]
        );
    }
}
