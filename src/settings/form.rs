//! Form controller: turns submitted field values into one settings update
//!
//! Field names are a closed set. Preset assignments use the `preset.<adapter>`
//! naming so the headless `apply` command can address them as text, but
//! inside the crate they are always `FieldName::Preset(adapter)`.

use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::adapter::AIAdapter;
use crate::store::{SettingsService, StoreError};

use super::update::SettingsUpdate;

const PRESET_PREFIX: &str = "preset.";

/// Fixed, statically known form fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FormField {
    KoboldUrl,
    NovelApiKey,
    NovelModel,
    HordeKey,
    HordeModel,
    LuminaiUrl,
    OaiKey,
    ScaleApiKey,
    ScaleUrl,
    ClaudeApiKey,
    DefaultAdapter,
}

impl FormField {
    pub const ALL: &'static [FormField] = &[
        FormField::KoboldUrl,
        FormField::NovelApiKey,
        FormField::NovelModel,
        FormField::HordeKey,
        FormField::HordeModel,
        FormField::LuminaiUrl,
        FormField::OaiKey,
        FormField::ScaleApiKey,
        FormField::ScaleUrl,
        FormField::ClaudeApiKey,
        FormField::DefaultAdapter,
    ];

    /// Submitted field name
    pub fn name(&self) -> &'static str {
        match self {
            FormField::KoboldUrl => "koboldUrl",
            FormField::NovelApiKey => "novelApiKey",
            FormField::NovelModel => "novelModel",
            FormField::HordeKey => "hordeKey",
            FormField::HordeModel => "hordeModel",
            FormField::LuminaiUrl => "luminaiUrl",
            FormField::OaiKey => "oaiKey",
            FormField::ScaleApiKey => "scaleApiKey",
            FormField::ScaleUrl => "scaleUrl",
            FormField::ClaudeApiKey => "claudeApiKey",
            FormField::DefaultAdapter => "defaultAdapter",
        }
    }

    /// The adapter whose field group owns this field; `None` for global fields
    pub fn adapter(&self) -> Option<AIAdapter> {
        match self {
            FormField::KoboldUrl => Some(AIAdapter::Kobold),
            FormField::NovelApiKey | FormField::NovelModel => Some(AIAdapter::Novel),
            FormField::HordeKey | FormField::HordeModel => Some(AIAdapter::Horde),
            FormField::LuminaiUrl => Some(AIAdapter::Luminai),
            FormField::OaiKey => Some(AIAdapter::OpenAI),
            FormField::ScaleApiKey | FormField::ScaleUrl => Some(AIAdapter::Scale),
            FormField::ClaudeApiKey => Some(AIAdapter::Claude),
            FormField::DefaultAdapter => None,
        }
    }

    /// Credential fields are rendered masked and never echoed back
    pub fn is_secret(&self) -> bool {
        matches!(
            self,
            FormField::NovelApiKey
                | FormField::HordeKey
                | FormField::OaiKey
                | FormField::ScaleApiKey
                | FormField::ClaudeApiKey
        )
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Name of a submitted entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldName {
    Field(FormField),
    Preset(AIAdapter),
}

impl fmt::Display for FieldName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldName::Field(field) => f.write_str(field.name()),
            FieldName::Preset(adapter) => write!(f, "{}{}", PRESET_PREFIX, adapter),
        }
    }
}

impl FromStr for FieldName {
    type Err = FormError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(adapter) = s.strip_prefix(PRESET_PREFIX) {
            return adapter
                .parse()
                .map(FieldName::Preset)
                .map_err(|_| FormError::UnknownField(s.to_string()));
        }
        FormField::ALL
            .iter()
            .copied()
            .find(|f| f.name() == s)
            .map(FieldName::Field)
            .ok_or_else(|| FormError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("missing required field: {0}")]
    MissingField(FormField),

    #[error("invalid default adapter: '{0}'")]
    InvalidDefaultAdapter(String),

    #[error("unknown form field: {0}")]
    UnknownField(String),

    #[error("expected NAME=VALUE, got '{0}'")]
    MalformedPair(String),
}

/// Ordered entries of a submitted form; duplicates are allowed and later ones win
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormEntries(Vec<(FieldName, String)>);

impl FormEntries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: FieldName, value: impl Into<String>) {
        self.0.push((name, value.into()));
    }

    pub fn push_field(&mut self, field: FormField, value: impl Into<String>) {
        self.push(FieldName::Field(field), value);
    }

    /// Last submitted value of a fixed field
    pub fn get(&self, field: FormField) -> Option<&str> {
        self.0
            .iter()
            .rev()
            .find(|(name, _)| *name == FieldName::Field(field))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, field: FormField) -> bool {
        self.get(field).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldName, &str)> {
        self.0.iter().map(|(name, value)| (*name, value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse `NAME=VALUE` pairs; the value may be empty
    pub fn parse_pairs<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<Self, FormError> {
        let mut entries = Self::new();
        for pair in pairs {
            let (name, value) = pair
                .split_once('=')
                .ok_or_else(|| FormError::MalformedPair(pair.to_string()))?;
            entries.push(name.trim().parse()?, value);
        }
        Ok(entries)
    }
}

/// Build the update payload from submitted entries
///
/// Workers come from the in-session selection, falling back to the persisted
/// selection, then to an empty list.
pub fn build_update(
    entries: &FormEntries,
    session_workers: Option<&[String]>,
    persisted_workers: Option<&[String]>,
) -> Result<SettingsUpdate, FormError> {
    let raw_default = entries
        .get(FormField::DefaultAdapter)
        .ok_or(FormError::MissingField(FormField::DefaultAdapter))?;
    let default_adapter: AIAdapter = raw_default
        .parse()
        .map_err(|_| FormError::InvalidDefaultAdapter(raw_default.to_string()))?;

    let text = |field: FormField| entries.get(field).map(str::to_string);

    let mut update = SettingsUpdate::new(default_adapter);
    update.kobold_url = text(FormField::KoboldUrl);
    update.novel_api_key = text(FormField::NovelApiKey);
    update.novel_model = text(FormField::NovelModel);
    update.horde_key = text(FormField::HordeKey);
    update.horde_model = text(FormField::HordeModel);
    update.luminai_url = text(FormField::LuminaiUrl);
    update.oai_key = text(FormField::OaiKey);
    update.scale_api_key = text(FormField::ScaleApiKey);
    update.scale_url = text(FormField::ScaleUrl);
    update.claude_api_key = text(FormField::ClaudeApiKey);

    update.horde_workers = session_workers
        .or(persisted_workers)
        .map(<[String]>::to_vec)
        .unwrap_or_default();

    update.default_presets = entries
        .iter()
        .filter_map(|(name, value)| match name {
            FieldName::Preset(adapter) => Some((adapter, value.to_string())),
            FieldName::Field(_) => None,
        })
        .collect();

    Ok(update)
}

/// Dispatches form operations to the injected settings service
///
/// Every operation is fire-and-forget: it is spawned on the runtime and its
/// outcome is only logged here. The service reports failures through its
/// snapshot notice.
pub struct FormController {
    service: Arc<dyn SettingsService>,
    runtime: Handle,
    /// Worker selection made in this session; `None` until the user saves one
    worker_selection: Option<Vec<String>>,
}

impl FormController {
    pub fn new(service: Arc<dyn SettingsService>, runtime: Handle) -> Self {
        Self {
            service,
            runtime,
            worker_selection: None,
        }
    }

    pub fn service(&self) -> &Arc<dyn SettingsService> {
        &self.service
    }

    pub fn worker_selection(&self) -> Option<&[String]> {
        self.worker_selection.as_deref()
    }

    pub fn set_worker_selection(&mut self, workers: Vec<String>) {
        self.worker_selection = Some(workers);
    }

    /// Number of workers the form would submit right now
    pub fn selected_worker_count(&self, persisted: Option<&[String]>) -> usize {
        self.worker_selection
            .as_deref()
            .or(persisted)
            .map_or(0, <[String]>::len)
    }

    /// Build the update against the service's current persisted workers
    pub fn build(&self, entries: &FormEntries) -> Result<SettingsUpdate, FormError> {
        let snapshot = self.service.snapshot();
        build_update(
            entries,
            self.worker_selection.as_deref(),
            snapshot.user.horde_workers.as_deref(),
        )
    }

    /// Build the update and dispatch exactly one `update_config` call
    pub fn submit(&self, entries: &FormEntries) -> Result<JoinHandle<()>, FormError> {
        let update = self.build(entries)?;
        tracing::info!(
            default_adapter = %update.default_adapter,
            presets = update.default_presets.len(),
            workers = update.horde_workers.len(),
            "Submitting settings update"
        );
        let service = Arc::clone(&self.service);
        Ok(self.fire("update_config", async move { service.update_config(update).await }))
    }

    /// Called when the settings screen becomes active
    pub fn activate(&self) -> JoinHandle<()> {
        self.refresh_horde()
    }

    /// Refresh horde models and workers together
    pub fn refresh_horde(&self) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        self.fire("refresh_horde", async move {
            let (models, workers) = tokio::join!(
                service.refresh_horde_models(),
                service.refresh_horde_workers()
            );
            models.and(workers)
        })
    }

    pub fn show_usage(&self) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        self.fire("openai_usage", async move { service.openai_usage().await })
    }

    pub fn delete_key(&self, adapter: AIAdapter) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        self.fire("delete_key", async move { service.delete_key(adapter).await })
    }

    pub fn clear_guest_state(&self) -> JoinHandle<()> {
        let service = Arc::clone(&self.service);
        self.fire("clear_guest_state", async move { service.clear_guest_state().await })
    }

    fn fire<F>(&self, operation: &'static str, fut: F) -> JoinHandle<()>
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        self.runtime.spawn(async move {
            if let Err(e) = fut.await {
                tracing::warn!(operation, error = %e, "Settings operation failed");
            }
        })
    }
}
