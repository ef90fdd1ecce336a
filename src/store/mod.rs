//! Settings service: the collaborator that owns persisted settings
//!
//! The form only talks to `dyn SettingsService`. State the form renders from
//! is published as a `StoreSnapshot` through a `watch` channel; consumers
//! register with `subscribe()` and recompute whatever they derive when the
//! receiver reports a change.

mod local;
mod remote;
#[cfg(test)]
pub mod testing;

pub use local::{LocalSettingsStore, SettingsFile};
pub use remote::{HttpProviderApi, ProviderApi};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::watch;

use crate::adapter::{AIAdapter, AdapterConfig};
use crate::settings::{SettingsUpdate, UserSettings};

/// A text-generation model advertised by the horde
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HordeModel {
    pub name: String,
    #[serde(default)]
    pub queued: f64,
    #[serde(default)]
    pub eta: f64,
    #[serde(default)]
    pub count: u32,
}

impl HordeModel {
    /// Select label with live queue metadata
    pub fn label(&self) -> String {
        format!(
            "{} - (queue: {}, eta: {}, count: {})",
            self.name, self.queued, self.eta, self.count
        )
    }
}

/// A volunteer worker serving horde requests
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HordeWorker {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub online: bool,
    #[serde(default)]
    pub models: Vec<String>,
}

/// A generation preset the user can assign per adapter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetOption {
    pub id: String,
    pub name: String,
}

impl PresetOption {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Presets available to every user
pub fn builtin_presets() -> Vec<PresetOption> {
    vec![
        PresetOption::new("basic", "Basic"),
        PresetOption::new("horde", "Horde"),
        PresetOption::new("kobold", "Kobold"),
        PresetOption::new("novel", "NovelAI"),
        PresetOption::new("openai", "OpenAI"),
        PresetOption::new("claude", "Claude"),
        PresetOption::new("scale", "Scale"),
    ]
}

/// Values derived on demand, outside the main settings payload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoreMetadata {
    /// Month-to-date OpenAI spend in cents; `None` while unknown
    pub openai_usage: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Outcome message of the latest service operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    /// Increases with every notice so repeats of the same text are still seen
    pub seq: u64,
    pub level: NoticeLevel,
    pub message: String,
}

/// Everything the settings screen reads from the service
#[derive(Debug, Clone, PartialEq)]
pub struct StoreSnapshot {
    pub user: UserSettings,
    pub adapters: AdapterConfig,
    pub horde_models: Vec<HordeModel>,
    pub horde_workers: Vec<HordeWorker>,
    pub presets: Vec<PresetOption>,
    pub metadata: StoreMetadata,
    /// Whether an authenticated identity is present; guests may clear their state
    pub logged_in: bool,
    pub notice: Option<Notice>,
}

impl Default for StoreSnapshot {
    fn default() -> Self {
        Self {
            user: UserSettings::default(),
            adapters: AdapterConfig::default(),
            horde_models: Vec::new(),
            horde_workers: Vec::new(),
            presets: builtin_presets(),
            metadata: StoreMetadata::default(),
            logged_in: false,
            notice: None,
        }
    }
}

impl StoreSnapshot {
    /// Publish a notice, bumping the sequence number
    pub fn push_notice(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let seq = self.notice.as_ref().map_or(1, |n| n.seq + 1);
        self.notice = Some(Notice {
            seq,
            level,
            message: message.into(),
        });
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Could not verify {adapter} credential: {message}")]
    Verification { adapter: AIAdapter, message: String },

    #[error("No {0} credential is stored")]
    MissingCredential(AIAdapter),

    #[error("Not permitted: {0}")]
    NotPermitted(String),

    #[error("Failed to persist settings: {0}")]
    Persist(String),

    #[error("Keystore error: {0}")]
    Keystore(String),
}

/// Operations the settings form dispatches
///
/// All async operations publish their outcome into the snapshot before
/// returning, so callers are free to ignore the result.
#[async_trait]
pub trait SettingsService: Send + Sync {
    /// Current state
    fn snapshot(&self) -> StoreSnapshot;

    /// Register an observer of state changes
    fn subscribe(&self) -> watch::Receiver<StoreSnapshot>;

    /// Replace the server-provided adapter configuration
    fn set_adapters(&self, adapters: AdapterConfig);

    /// Follow the server's authenticated-profile state
    fn set_logged_in(&self, logged_in: bool);

    /// Commit a whole settings update
    async fn update_config(&self, update: SettingsUpdate) -> Result<(), StoreError>;

    /// Remove one adapter's stored credential
    async fn delete_key(&self, adapter: AIAdapter) -> Result<(), StoreError>;

    async fn refresh_horde_models(&self) -> Result<(), StoreError>;

    async fn refresh_horde_workers(&self) -> Result<(), StoreError>;

    /// Populate `metadata.openai_usage`
    async fn openai_usage(&self) -> Result<(), StoreError>;

    /// Wipe every credential and setting; refused when logged in
    async fn clear_guest_state(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_horde_model_label() {
        let model = HordeModel {
            name: "koboldcpp/Mythomax".to_string(),
            queued: 120.0,
            eta: 4.0,
            count: 3,
        };
        assert_eq!(model.label(), "koboldcpp/Mythomax - (queue: 120, eta: 4, count: 3)");
    }

    #[test]
    fn test_notice_sequence_increases() {
        let mut snapshot = StoreSnapshot::default();
        snapshot.push_notice(NoticeLevel::Success, "Settings updated");
        snapshot.push_notice(NoticeLevel::Success, "Settings updated");
        let notice = snapshot.notice.unwrap();
        assert_eq!(notice.seq, 2);
        assert_eq!(notice.level, NoticeLevel::Success);
    }

    #[test]
    fn test_default_snapshot_has_builtin_presets() {
        let snapshot = StoreSnapshot::default();
        assert!(snapshot.presets.iter().any(|p| p.id == "basic"));
        assert!(!snapshot.logged_in);
        assert_eq!(snapshot.metadata.openai_usage, None);
    }
}
