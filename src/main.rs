mod action;
mod adapter;
mod app;
mod cli;
mod components;
mod config;
mod error;
mod headless;
mod logging;
mod settings;
mod store;

use std::sync::Arc;

use color_eyre::eyre::Result;

use cli::Cli;
use config::{ConfigManager, KeyStore, KeyStoreBackend};
use settings::FormController;
use store::{HttpProviderApi, LocalSettingsStore, SettingsService};

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse_args();

    let config_manager = match &cli.config_dir {
        Some(dir) => ConfigManager::with_dir(dir),
        None => ConfigManager::new()?,
    };
    if let Err(e) = config_manager.write_default_config() {
        eprintln!("Warning: Could not write default config: {}", e);
    }

    let general = &config_manager.app_config().general;
    let _log_guard = logging::init(
        &logging::default_directive(cli.log_level.as_deref(), &general.log_level),
        cli.command.is_none(),
        &config_manager.log_dir(),
    );
    tracing::info!(config_dir = %config_manager.config_dir().display(), "chat-settings starting");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    let keystore = open_keystore(&config_manager)?;
    let server = &config_manager.app_config().server;
    let api = HttpProviderApi::new(config_manager.app_config().endpoints.clone())?;
    let service: Arc<dyn SettingsService> = Arc::new(LocalSettingsStore::new(
        config_manager.settings_file(),
        keystore,
        Arc::new(api),
        server.adapters.clone(),
        server.logged_in(),
    ));
    let controller = FormController::new(service, runtime.handle().clone());

    match cli.command {
        Some(command) => runtime.block_on(headless::run(command, &controller))?,
        None => {
            let mut app = app::App::new(config_manager, controller)?;
            app.run()?;
        }
    }

    tracing::info!("chat-settings exiting");
    Ok(())
}

/// Open the configured keystore, prompting for the master password when encrypted
fn open_keystore(config_manager: &ConfigManager) -> Result<KeyStore> {
    let keys_dir = config_manager.keys_dir();
    let mut keystore = match config_manager.app_config().general.keystore {
        Some(backend) => KeyStore::with_backend(backend, keys_dir),
        None => KeyStore::detect(keys_dir),
    };

    if keystore.backend() == KeyStoreBackend::EncryptedFile {
        if keystore.is_initialized() {
            let password = config::prompt_master_password("Master password: ")?;
            keystore.unlock(&password)?;
        } else {
            println!("No system keyring found; credentials will be stored in an encrypted file.");
            let password =
                config::prompt_new_password("New master password: ", "Confirm master password: ")?;
            keystore.init_encrypted(&password)?;
        }
    }
    Ok(keystore)
}
