//! One-shot commands run against the settings service without the TUI

use std::sync::Arc;

use serde::Serialize;

use crate::adapter::AdapterConfig;
use crate::cli::Command;
use crate::error::{Result, SettingsError};
use crate::settings::{visible_fields, FieldName, FormController, FormEntries, UsageDisplay, UserSettings};
use crate::store::{NoticeLevel, SettingsService, StoreSnapshot};

#[derive(Serialize)]
struct ShowOutput<'a> {
    logged_in: bool,
    adapters: &'a AdapterConfig,
    horde_workers_available: usize,
    settings: &'a UserSettings,
}

pub async fn run(command: Command, controller: &FormController) -> Result<()> {
    let service = Arc::clone(controller.service());
    match command {
        Command::Show => print!("{}", render_show(&service.snapshot())?),
        Command::Apply { pairs } => {
            let entries = FormEntries::parse_pairs(pairs.iter().map(String::as_str))?;
            let entries = visible_entries(entries, &service.snapshot().adapters);
            let update = controller.build(&entries)?;
            service.update_config(update).await?;
            report(service.as_ref());
        }
        Command::DeleteKey { adapter } => {
            service.delete_key(adapter).await?;
            report(service.as_ref());
        }
        Command::Refresh => {
            let (models, workers) = tokio::join!(
                service.refresh_horde_models(),
                service.refresh_horde_workers()
            );
            models?;
            workers?;
            let snapshot = service.snapshot();
            println!(
                "{} horde models, {} horde workers",
                snapshot.horde_models.len(),
                snapshot.horde_workers.len()
            );
        }
        Command::Usage => {
            service.openai_usage().await?;
            match UsageDisplay::from_usage(service.snapshot().metadata.openai_usage) {
                UsageDisplay::Amount(amount) => println!("Usage this month: {}", amount),
                UsageDisplay::Loading => println!("Usage this month: unknown"),
            }
        }
        Command::ClearGuest => {
            service.clear_guest_state().await?;
            report(service.as_ref());
        }
    }
    Ok(())
}

/// Drop entries the settings screen would not render for these adapters
fn visible_entries(entries: FormEntries, adapters: &AdapterConfig) -> FormEntries {
    let fields = visible_fields(adapters);
    let mut kept = FormEntries::new();
    for (name, value) in entries.iter() {
        let visible = match name {
            FieldName::Field(field) => fields.contains(&field),
            FieldName::Preset(adapter) => adapters.includes(adapter),
        };
        if visible {
            kept.push(name, value);
        } else {
            tracing::warn!(field = %name, "Ignoring field of a disabled service");
        }
    }
    kept
}

fn render_show(snapshot: &StoreSnapshot) -> Result<String> {
    let output = ShowOutput {
        logged_in: snapshot.logged_in,
        adapters: &snapshot.adapters,
        horde_workers_available: snapshot.horde_workers.len(),
        settings: &snapshot.user,
    };
    toml::to_string_pretty(&output)
        .map_err(|e| SettingsError::Config(format!("Failed to render settings: {}", e)))
}

fn report(service: &dyn SettingsService) {
    if let Some(notice) = service.snapshot().notice {
        if notice.level == NoticeLevel::Success {
            println!("{}", notice.message);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::AIAdapter;
    use crate::settings::SettingsUpdate;
    use crate::store::testing::{RecordingService, ServiceCall};
    use pretty_assertions::assert_eq;
    use tokio::runtime::Handle;

    fn controller(service: &Arc<RecordingService>) -> FormController {
        FormController::new(Arc::clone(service) as Arc<dyn SettingsService>, Handle::current())
    }

    fn apply(pairs: &[&str]) -> Command {
        Command::Apply {
            pairs: pairs.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_apply_submits_one_update() {
        let service = Arc::new(RecordingService::new());
        service.edit(|s| s.adapters = AdapterConfig::new([AIAdapter::OpenAI, AIAdapter::Novel]));

        run(
            apply(&["oaiKey=sk-abc", "novelApiKey=", "defaultAdapter=openai"]),
            &controller(&service),
        )
        .await
        .unwrap();

        let mut expected = SettingsUpdate::new(AIAdapter::OpenAI);
        expected.oai_key = Some("sk-abc".to_string());
        expected.novel_api_key = Some(String::new());
        assert_eq!(service.calls(), vec![ServiceCall::UpdateConfig(expected)]);
    }

    #[tokio::test]
    async fn test_apply_drops_fields_of_disabled_services() {
        let service = Arc::new(RecordingService::new());
        service.edit(|s| s.adapters = AdapterConfig::new([AIAdapter::Kobold]));

        run(
            apply(&[
                "defaultAdapter=kobold",
                "koboldUrl=http://localhost:5000",
                "hordeKey=0000000000",
                "preset.horde=horde",
                "preset.kobold=kobold",
            ]),
            &controller(&service),
        )
        .await
        .unwrap();

        let mut expected = SettingsUpdate::new(AIAdapter::Kobold);
        expected.kobold_url = Some("http://localhost:5000".to_string());
        expected.default_presets.assign(AIAdapter::Kobold, "kobold");
        assert_eq!(service.calls(), vec![ServiceCall::UpdateConfig(expected)]);
    }

    #[tokio::test]
    async fn test_invalid_apply_dispatches_nothing() {
        let service = Arc::new(RecordingService::new());
        let controller = controller(&service);

        assert!(run(apply(&["oaiKey"]), &controller).await.is_err());
        assert!(run(apply(&["oaiKey=sk-1"]), &controller).await.is_err());
        assert!(run(apply(&["defaultAdapter=ooba"]), &controller).await.is_err());
        assert!(service.calls().is_empty());
    }

    #[tokio::test]
    async fn test_service_failure_is_returned() {
        let service = Arc::new(RecordingService::failing());
        let result = run(Command::DeleteKey { adapter: AIAdapter::OpenAI }, &controller(&service)).await;
        assert!(matches!(result, Err(SettingsError::Store(_))));
        assert_eq!(service.calls(), vec![ServiceCall::DeleteKey(AIAdapter::OpenAI)]);
    }

    #[tokio::test]
    async fn test_refresh_fires_both_lookups() {
        let service = Arc::new(RecordingService::new());
        run(Command::Refresh, &controller(&service)).await.unwrap();
        assert_eq!(
            service.calls(),
            vec![ServiceCall::RefreshHordeModels, ServiceCall::RefreshHordeWorkers]
        );
    }

    #[test]
    fn test_show_renders_toml() {
        let mut snapshot = StoreSnapshot {
            adapters: AdapterConfig::new([AIAdapter::Horde, AIAdapter::OpenAI]),
            ..Default::default()
        };
        snapshot.user.default_presets.assign(AIAdapter::Horde, "horde");

        let text = render_show(&snapshot).unwrap();
        assert!(text.contains("logged_in = false"));
        assert!(text.contains("adapters = ["), "{text}");
        assert!(text.contains("\"openai\""), "{text}");
        assert!(text.contains("default_adapter = \"horde\""));
        assert!(text.contains("horde = \"horde\""));
    }
}
