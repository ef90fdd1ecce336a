//! Settings service backed by a TOML file, the keystore, and provider lookups

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::adapter::{AIAdapter, AdapterConfig};
use crate::config::{KeyStore, SecretString};
use crate::settings::{non_empty, SettingsUpdate, UserSettings};

use super::{
    builtin_presets, NoticeLevel, PresetOption, ProviderApi, SettingsService, StoreError,
    StoreSnapshot,
};

/// On-disk shape of settings.toml
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsFile {
    pub user: UserSettings,
    /// User-defined presets offered next to the built-in ones
    pub presets: Vec<PresetOption>,
}

impl SettingsFile {
    pub fn load(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse {}: {}", path.display(), e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StoreError::Persist(e.to_string()))?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| StoreError::Persist(e.to_string()))?;
        std::fs::write(path, content).map_err(|e| StoreError::Persist(e.to_string()))
    }
}

pub struct LocalSettingsStore {
    state: watch::Sender<StoreSnapshot>,
    settings_path: PathBuf,
    custom_presets: Vec<PresetOption>,
    keystore: Arc<Mutex<KeyStore>>,
    api: Arc<dyn ProviderApi>,
    /// Serializes mutations so concurrent submits cannot interleave
    write_lock: tokio::sync::Mutex<()>,
}

impl LocalSettingsStore {
    pub fn new(
        settings_path: impl Into<PathBuf>,
        keystore: KeyStore,
        api: Arc<dyn ProviderApi>,
        adapters: AdapterConfig,
        logged_in: bool,
    ) -> Self {
        let settings_path = settings_path.into();
        let file = SettingsFile::load(&settings_path);
        let mut user = file.user;
        reconcile_credentials(&mut user, &keystore);

        let presets = builtin_presets()
            .into_iter()
            .chain(file.presets.iter().cloned())
            .collect();
        let snapshot = StoreSnapshot {
            user,
            adapters,
            presets,
            logged_in,
            ..Default::default()
        };
        tracing::info!(
            path = %settings_path.display(),
            backend = ?keystore.backend(),
            "Settings store loaded"
        );

        Self {
            state: watch::Sender::new(snapshot),
            settings_path,
            custom_presets: file.presets,
            keystore: Arc::new(Mutex::new(keystore)),
            api,
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }

    /// Run a keystore operation on the blocking pool
    ///
    /// Keyring calls block on D-Bus; the encrypted backend blocks on Argon2 and
    /// file I/O.
    async fn with_keystore<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&mut KeyStore) -> crate::error::Result<T> + Send + 'static,
    {
        let keystore = Arc::clone(&self.keystore);
        tokio::task::spawn_blocking(move || {
            let mut keystore = keystore
                .lock()
                .map_err(|_| StoreError::Keystore("keystore lock poisoned".to_string()))?;
            f(&mut keystore).map_err(|e| StoreError::Keystore(e.to_string()))
        })
        .await
        .map_err(|e| StoreError::Keystore(format!("keystore task failed: {}", e)))?
    }

    fn persist(&self, user: &UserSettings) -> Result<(), StoreError> {
        SettingsFile {
            user: user.clone(),
            presets: self.custom_presets.clone(),
        }
        .save(&self.settings_path)
    }

    /// Publish an error notice and hand the error back
    fn fail(&self, operation: &str, error: StoreError) -> Result<(), StoreError> {
        tracing::warn!(operation, error = %error, "Settings store operation failed");
        self.state
            .send_modify(|s| s.push_notice(NoticeLevel::Error, error.to_string()));
        Err(error)
    }

    fn succeed(&self, message: impl Into<String>, apply: impl FnOnce(&mut StoreSnapshot)) {
        let message = message.into();
        self.state.send_modify(|s| {
            apply(s);
            s.push_notice(NoticeLevel::Success, message);
        });
    }

    /// Verify new credentials and fold the update into a copy of `user`
    ///
    /// Nothing is written here; the secrets to store are handed back with the
    /// folded settings.
    async fn apply_update(
        &self,
        mut user: UserSettings,
        update: &SettingsUpdate,
    ) -> Result<(UserSettings, Vec<(AIAdapter, SecretString)>), StoreError> {
        if let Some(key) = update.credential_for(AIAdapter::Horde) {
            user.horde_name = Some(self.api.horde_user(key).await?);
        }
        if let Some(key) = update.credential_for(AIAdapter::Novel) {
            self.api.novel_verify(key).await?;
        }

        let mut secrets = Vec::new();
        for adapter in AIAdapter::ALL.iter().copied() {
            if let Some(secret) = update.credential_for(adapter) {
                secrets.push((adapter, SecretString::new(secret)));
                user.mark_credential_set(adapter);
            }
        }

        let keep = |current: &mut String, submitted: &Option<String>| {
            if let Some(value) = non_empty(submitted) {
                *current = value.to_string();
            }
        };
        keep(&mut user.kobold_url, &update.kobold_url);
        keep(&mut user.luminai_url, &update.luminai_url);
        keep(&mut user.scale_url, &update.scale_url);
        keep(&mut user.novel_model, &update.novel_model);
        keep(&mut user.horde_model, &update.horde_model);

        user.default_adapter = update.default_adapter;
        user.horde_workers = Some(update.horde_workers.clone());
        user.default_presets = update.default_presets.clone();

        Ok((user, secrets))
    }
}

/// Secret held before an update, `None` when the adapter had none
type PreviousSecret = (AIAdapter, Option<SecretString>);

/// Store every secret or none of them
///
/// Returns what each adapter held before, for [`restore_secrets`].
fn commit_secrets(
    keystore: &mut KeyStore,
    secrets: Vec<(AIAdapter, SecretString)>,
) -> crate::error::Result<Vec<PreviousSecret>> {
    let mut previous = Vec::with_capacity(secrets.len());
    for (adapter, secret) in secrets {
        let old = match keystore.get(adapter) {
            Ok(old) => old,
            Err(e) => {
                restore_secrets(keystore, previous);
                return Err(e);
            }
        };
        if let Err(e) = keystore.store(adapter, &secret) {
            restore_secrets(keystore, previous);
            return Err(e);
        }
        previous.push((adapter, old));
    }
    Ok(previous)
}

fn restore_secrets(keystore: &mut KeyStore, previous: Vec<PreviousSecret>) {
    for (adapter, old) in previous.into_iter().rev() {
        let result = match &old {
            Some(secret) => keystore.store(adapter, secret),
            None => keystore.delete(adapter),
        };
        if let Err(e) = result {
            tracing::error!(%adapter, "Could not roll back stored key: {}", e);
        }
    }
}

/// Drop flags whose secret is gone, e.g. after a keyring reset or in a fresh guest session
fn reconcile_credentials(user: &mut UserSettings, keystore: &KeyStore) {
    if !keystore.is_unlocked() {
        return;
    }
    for adapter in AIAdapter::ALL.iter().copied().filter(|a| a.has_credential()) {
        let flagged = user.credential_set(adapter)
            || (adapter == AIAdapter::Horde && user.horde_name.is_some());
        if !flagged {
            continue;
        }
        match keystore.exists(adapter) {
            Ok(true) => {}
            Ok(false) => {
                tracing::debug!(%adapter, "Stored flag has no secret, clearing");
                user.clear_credential(adapter);
            }
            Err(e) => tracing::warn!(%adapter, "Could not check stored key: {}", e),
        }
    }
}

#[async_trait]
impl SettingsService for LocalSettingsStore {
    fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    fn set_adapters(&self, adapters: AdapterConfig) {
        self.state.send_if_modified(|s| {
            if s.adapters == adapters {
                return false;
            }
            tracing::info!(count = adapters.len(), "Adapter configuration changed");
            s.adapters = adapters;
            true
        });
    }

    fn set_logged_in(&self, logged_in: bool) {
        self.state.send_if_modified(|s| {
            let changed = s.logged_in != logged_in;
            s.logged_in = logged_in;
            changed
        });
    }

    async fn update_config(&self, update: SettingsUpdate) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        let current = self.snapshot().user;

        let (user, secrets) = match self.apply_update(current, &update).await {
            Ok(folded) => folded,
            Err(e) => return self.fail("update_config", e),
        };
        let previous = match self
            .with_keystore(move |ks| commit_secrets(ks, secrets))
            .await
        {
            Ok(previous) => previous,
            Err(e) => return self.fail("update_config", e),
        };
        if let Err(e) = self.persist(&user) {
            if let Err(rollback) = self
                .with_keystore(move |ks| {
                    restore_secrets(ks, previous);
                    Ok(())
                })
                .await
            {
                tracing::error!("Keystore rollback did not run: {}", rollback);
            }
            return self.fail("update_config", e);
        }

        tracing::info!(default_adapter = %user.default_adapter, "Settings updated");
        self.succeed("Settings updated", |s| s.user = user);
        Ok(())
    }

    async fn delete_key(&self, adapter: AIAdapter) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if !adapter.has_credential() {
            return self.fail(
                "delete_key",
                StoreError::NotPermitted(format!("{} has no API key", adapter.label())),
            );
        }

        if let Err(e) = self.with_keystore(move |ks| ks.delete(adapter)).await {
            return self.fail("delete_key", e);
        }
        let mut user = self.snapshot().user;
        user.clear_credential(adapter);
        if let Err(e) = self.persist(&user) {
            return self.fail("delete_key", e);
        }

        tracing::info!(%adapter, "Deleted API key");
        self.succeed(format!("{} key deleted", adapter.label()), |s| s.user = user);
        Ok(())
    }

    async fn refresh_horde_models(&self) -> Result<(), StoreError> {
        match self.api.horde_models().await {
            Ok(models) => {
                self.state.send_modify(|s| s.horde_models = models);
                Ok(())
            }
            Err(e) => self.fail("refresh_horde_models", e),
        }
    }

    async fn refresh_horde_workers(&self) -> Result<(), StoreError> {
        match self.api.horde_workers().await {
            Ok(workers) => {
                self.state.send_modify(|s| s.horde_workers = workers);
                Ok(())
            }
            Err(e) => self.fail("refresh_horde_workers", e),
        }
    }

    async fn openai_usage(&self) -> Result<(), StoreError> {
        self.state.send_modify(|s| s.metadata.openai_usage = None);

        let key = match self.with_keystore(|ks| ks.get(AIAdapter::OpenAI)).await {
            Ok(Some(key)) => key,
            Ok(None) => {
                return self.fail("openai_usage", StoreError::MissingCredential(AIAdapter::OpenAI))
            }
            Err(e) => return self.fail("openai_usage", e),
        };

        match self.api.openai_usage(key.expose()).await {
            Ok(cents) => {
                self.state.send_modify(|s| s.metadata.openai_usage = Some(cents));
                Ok(())
            }
            Err(e) => self.fail("openai_usage", e),
        }
    }

    async fn clear_guest_state(&self) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;
        if self.snapshot().logged_in {
            return self.fail(
                "clear_guest_state",
                StoreError::NotPermitted("guest state can only be cleared when not logged in".to_string()),
            );
        }

        if let Err(e) = self.with_keystore(|ks| ks.clear()).await {
            return self.fail("clear_guest_state", e);
        }
        if self.settings_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.settings_path) {
                return self.fail("clear_guest_state", StoreError::Persist(e.to_string()));
            }
        }

        tracing::info!("Guest state cleared");
        self.succeed("Guest state cleared", |s| {
            s.user = UserSettings::default();
            s.metadata = Default::default();
        });
        Ok(())
    }
}
