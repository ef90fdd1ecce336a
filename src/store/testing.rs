//! Test doubles for the service and provider seams

use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::watch;

use crate::adapter::{AIAdapter, AdapterConfig};
use crate::settings::{SettingsUpdate, UserSettings};

use super::{
    HordeModel, HordeWorker, ProviderApi, SettingsService, StoreError, StoreSnapshot,
};

/// One recorded call against `RecordingService`
#[derive(Debug, Clone, PartialEq)]
pub enum ServiceCall {
    UpdateConfig(SettingsUpdate),
    DeleteKey(AIAdapter),
    RefreshHordeModels,
    RefreshHordeWorkers,
    OpenAiUsage,
    ClearGuestState,
}

/// Records every async operation; optionally fails all of them
pub struct RecordingService {
    state: watch::Sender<StoreSnapshot>,
    calls: Mutex<Vec<ServiceCall>>,
    fail: bool,
}

impl RecordingService {
    pub fn new() -> Self {
        Self {
            state: watch::Sender::new(StoreSnapshot::default()),
            calls: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    pub fn calls(&self) -> Vec<ServiceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn edit_user(&self, edit: impl FnOnce(&mut UserSettings)) {
        self.state.send_modify(|s| edit(&mut s.user));
    }

    pub fn edit(&self, edit: impl FnOnce(&mut StoreSnapshot)) {
        self.state.send_modify(edit);
    }

    fn record(&self, call: ServiceCall) -> Result<(), StoreError> {
        self.calls.lock().unwrap().push(call);
        if self.fail {
            Err(StoreError::Network {
                message: "offline".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SettingsService for RecordingService {
    fn snapshot(&self) -> StoreSnapshot {
        self.state.borrow().clone()
    }

    fn subscribe(&self) -> watch::Receiver<StoreSnapshot> {
        self.state.subscribe()
    }

    fn set_adapters(&self, adapters: AdapterConfig) {
        self.state.send_modify(|s| s.adapters = adapters);
    }

    fn set_logged_in(&self, logged_in: bool) {
        self.state.send_modify(|s| s.logged_in = logged_in);
    }

    async fn update_config(&self, update: SettingsUpdate) -> Result<(), StoreError> {
        self.record(ServiceCall::UpdateConfig(update))
    }

    async fn delete_key(&self, adapter: AIAdapter) -> Result<(), StoreError> {
        self.record(ServiceCall::DeleteKey(adapter))
    }

    async fn refresh_horde_models(&self) -> Result<(), StoreError> {
        self.record(ServiceCall::RefreshHordeModels)
    }

    async fn refresh_horde_workers(&self) -> Result<(), StoreError> {
        self.record(ServiceCall::RefreshHordeWorkers)
    }

    async fn openai_usage(&self) -> Result<(), StoreError> {
        self.record(ServiceCall::OpenAiUsage)
    }

    async fn clear_guest_state(&self) -> Result<(), StoreError> {
        self.record(ServiceCall::ClearGuestState)
    }
}

/// Canned provider responses
pub struct FakeProviderApi {
    pub models: Vec<HordeModel>,
    pub workers: Vec<HordeWorker>,
    /// Name returned for any horde key; `None` rejects every key
    pub horde_user: Option<String>,
    pub novel_ok: bool,
    /// Usage in cents; `None` makes the lookup fail
    pub usage: Option<f64>,
}

impl Default for FakeProviderApi {
    fn default() -> Self {
        Self {
            models: Vec::new(),
            workers: vec![
                HordeWorker {
                    id: "w-1".to_string(),
                    name: "Alpha".to_string(),
                    online: true,
                    models: vec!["Mythomax".to_string()],
                },
                HordeWorker {
                    id: "w-2".to_string(),
                    name: "Beta".to_string(),
                    online: false,
                    models: Vec::new(),
                },
            ],
            horde_user: None,
            novel_ok: true,
            usage: None,
        }
    }
}

#[async_trait]
impl ProviderApi for FakeProviderApi {
    async fn horde_models(&self) -> Result<Vec<HordeModel>, StoreError> {
        Ok(self.models.clone())
    }

    async fn horde_workers(&self) -> Result<Vec<HordeWorker>, StoreError> {
        Ok(self.workers.clone())
    }

    async fn horde_user(&self, _key: &str) -> Result<String, StoreError> {
        self.horde_user.clone().ok_or(StoreError::Verification {
            adapter: AIAdapter::Horde,
            message: "unknown key".to_string(),
        })
    }

    async fn novel_verify(&self, _key: &str) -> Result<(), StoreError> {
        if self.novel_ok {
            Ok(())
        } else {
            Err(StoreError::Verification {
                adapter: AIAdapter::Novel,
                message: "Novel API key is not valid".to_string(),
            })
        }
    }

    async fn openai_usage(&self, _key: &str) -> Result<f64, StoreError> {
        self.usage.ok_or(StoreError::Network {
            message: "usage unavailable".to_string(),
        })
    }
}
