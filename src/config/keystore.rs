use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use argon2::{
    password_hash::{
        rand_core::{OsRng, RngCore},
        PasswordHasher, SaltString,
    },
    Argon2,
};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::adapter::AIAdapter;
use crate::error::{Result, SettingsError};

const SERVICE_NAME: &str = "chat-settings";
const KEYSTORE_FILE: &str = "keystore.enc";
const SALT_FILE: &str = "keystore.salt";

/// A secret value that is zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for SecretString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// Backend storage strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyStoreBackend {
    /// Use system keyring (Secret Service on Linux)
    SystemKeyring,
    /// Use encrypted file storage
    EncryptedFile,
    /// Process-lifetime storage for guest sessions
    Memory,
}

/// Encrypted keystore file format
#[derive(Serialize, Deserialize)]
struct EncryptedKeyStore {
    version: u32,
    nonce: [u8; 12],
    ciphertext: Vec<u8>,
}

/// Plaintext keystore (before encryption)
#[derive(Serialize, Deserialize, Default)]
struct KeyStoreData {
    keys: HashMap<String, String>,
}

/// Credential storage for provider secrets, one entry per adapter
pub struct KeyStore {
    backend: KeyStoreBackend,
    keys_dir: PathBuf,
    /// Derived key for the encrypted backend
    master_key: Option<[u8; 32]>,
    memory: HashMap<AIAdapter, SecretString>,
}

fn keystore_err(context: &str, e: impl std::fmt::Display) -> SettingsError {
    SettingsError::Keystore(format!("{}: {}", context, e))
}

impl KeyStore {
    /// Pick the system keyring when it answers, otherwise the encrypted file
    pub fn detect(keys_dir: impl Into<PathBuf>) -> Self {
        let backend = if Self::is_keyring_available() {
            tracing::info!("Using system keyring for key storage");
            KeyStoreBackend::SystemKeyring
        } else {
            tracing::info!("System keyring unavailable, using encrypted file storage");
            KeyStoreBackend::EncryptedFile
        };
        Self::with_backend(backend, keys_dir)
    }

    pub fn with_backend(backend: KeyStoreBackend, keys_dir: impl Into<PathBuf>) -> Self {
        Self {
            backend,
            keys_dir: keys_dir.into(),
            master_key: None,
            memory: HashMap::new(),
        }
    }

    pub fn memory() -> Self {
        Self::with_backend(KeyStoreBackend::Memory, PathBuf::new())
    }

    fn is_keyring_available() -> bool {
        match keyring::Entry::new(SERVICE_NAME, "__test_availability__") {
            Ok(entry) => !matches!(
                entry.get_password(),
                Err(keyring::Error::NoStorageAccess(_)) | Err(keyring::Error::PlatformFailure(_))
            ),
            Err(_) => false,
        }
    }

    pub fn backend(&self) -> KeyStoreBackend {
        self.backend
    }

    pub fn store(&mut self, adapter: AIAdapter, secret: &SecretString) -> Result<()> {
        match self.backend {
            KeyStoreBackend::SystemKeyring => self.store_keyring(adapter, secret),
            KeyStoreBackend::EncryptedFile => self.store_encrypted(adapter, secret),
            KeyStoreBackend::Memory => {
                self.memory.insert(adapter, secret.clone());
                Ok(())
            }
        }
    }

    pub fn get(&self, adapter: AIAdapter) -> Result<Option<SecretString>> {
        match self.backend {
            KeyStoreBackend::SystemKeyring => self.get_keyring(adapter),
            KeyStoreBackend::EncryptedFile => self.get_encrypted(adapter),
            KeyStoreBackend::Memory => Ok(self.memory.get(&adapter).cloned()),
        }
    }

    /// Remove a secret; removing an absent secret is not an error
    pub fn delete(&mut self, adapter: AIAdapter) -> Result<()> {
        match self.backend {
            KeyStoreBackend::SystemKeyring => self.delete_keyring(adapter),
            KeyStoreBackend::EncryptedFile => self.delete_encrypted(adapter),
            KeyStoreBackend::Memory => {
                self.memory.remove(&adapter);
                Ok(())
            }
        }
    }

    /// Adapters that currently have a stored secret
    pub fn list(&self) -> Result<Vec<AIAdapter>> {
        let mut stored = Vec::new();
        for adapter in AIAdapter::ALL.iter().filter(|a| a.has_credential()) {
            if self.get(*adapter)?.is_some() {
                stored.push(*adapter);
            }
        }
        Ok(stored)
    }

    pub fn exists(&self, adapter: AIAdapter) -> Result<bool> {
        Ok(self.get(adapter)?.is_some())
    }

    /// Remove every stored secret
    pub fn clear(&mut self) -> Result<()> {
        for adapter in AIAdapter::ALL.iter().filter(|a| a.has_credential()) {
            self.delete(*adapter)?;
        }
        Ok(())
    }

    /// Whether the encrypted backend has a salt on disk
    pub fn is_initialized(&self) -> bool {
        self.backend != KeyStoreBackend::EncryptedFile || self.salt_file().exists()
    }

    /// Unlock the encrypted keystore with a master password
    pub fn unlock(&mut self, master_password: &str) -> Result<()> {
        if self.backend != KeyStoreBackend::EncryptedFile {
            return Ok(());
        }

        let salt = self.load_salt()?;
        self.master_key = Some(derive_key(master_password, &salt)?);

        // Decrypting once verifies the password
        if self.keystore_file().exists() {
            self.load_encrypted_data()?;
        }
        Ok(())
    }

    pub fn is_unlocked(&self) -> bool {
        match self.backend {
            KeyStoreBackend::EncryptedFile => self.master_key.is_some(),
            KeyStoreBackend::SystemKeyring | KeyStoreBackend::Memory => true,
        }
    }

    /// Initialize encrypted storage with a new master password
    pub fn init_encrypted(&mut self, master_password: &str) -> Result<()> {
        self.ensure_keys_dir()?;

        let salt = SaltString::generate(&mut OsRng);
        let salt_path = self.salt_file();
        fs::write(&salt_path, salt.as_str()).map_err(|e| keystore_err("Failed to write salt", e))?;
        restrict_permissions(&salt_path, 0o600)?;

        self.master_key = Some(derive_key(master_password, &salt)?);
        self.save_encrypted_data(&KeyStoreData::default())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // System Keyring Backend
    // ─────────────────────────────────────────────────────────────────────────

    fn entry(adapter: AIAdapter) -> Result<keyring::Entry> {
        keyring::Entry::new(SERVICE_NAME, adapter.as_str())
            .map_err(|e| keystore_err("Failed to create keyring entry", e))
    }

    fn store_keyring(&self, adapter: AIAdapter, secret: &SecretString) -> Result<()> {
        Self::entry(adapter)?
            .set_password(secret.expose())
            .map_err(|e| keystore_err("Failed to store key in keyring", e))
    }

    fn get_keyring(&self, adapter: AIAdapter) -> Result<Option<SecretString>> {
        match Self::entry(adapter)?.get_password() {
            Ok(password) => Ok(Some(SecretString::new(password))),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(keystore_err("Failed to retrieve key from keyring", e)),
        }
    }

    fn delete_keyring(&self, adapter: AIAdapter) -> Result<()> {
        match Self::entry(adapter)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keystore_err("Failed to delete key from keyring", e)),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Encrypted File Backend
    // ─────────────────────────────────────────────────────────────────────────

    fn keystore_file(&self) -> PathBuf {
        self.keys_dir.join(KEYSTORE_FILE)
    }

    fn salt_file(&self) -> PathBuf {
        self.keys_dir.join(SALT_FILE)
    }

    fn ensure_keys_dir(&self) -> Result<()> {
        if !self.keys_dir.exists() {
            fs::create_dir_all(&self.keys_dir)
                .map_err(|e| keystore_err("Failed to create keys dir", e))?;
            restrict_permissions(&self.keys_dir, 0o700)?;
        }
        Ok(())
    }

    fn load_salt(&self) -> Result<SaltString> {
        let salt_path = self.salt_file();
        if !salt_path.exists() {
            return Err(SettingsError::Keystore(
                "Keystore not initialized. Call init_encrypted() first.".to_string(),
            ));
        }
        let salt_str =
            fs::read_to_string(&salt_path).map_err(|e| keystore_err("Failed to read salt", e))?;
        SaltString::from_b64(salt_str.trim()).map_err(|e| keystore_err("Invalid salt", e))
    }

    fn cipher(&self) -> Result<ChaCha20Poly1305> {
        let master_key = self.master_key.ok_or_else(|| {
            SettingsError::Keystore("Keystore is locked. Call unlock() first.".to_string())
        })?;
        ChaCha20Poly1305::new_from_slice(&master_key)
            .map_err(|e| keystore_err("Failed to create cipher", e))
    }

    fn load_encrypted_data(&self) -> Result<KeyStoreData> {
        let keystore_path = self.keystore_file();
        if !keystore_path.exists() {
            return Ok(KeyStoreData::default());
        }

        let cipher = self.cipher()?;
        let encrypted_json = fs::read_to_string(&keystore_path)
            .map_err(|e| keystore_err("Failed to read keystore", e))?;
        let encrypted: EncryptedKeyStore = serde_json::from_str(&encrypted_json)
            .map_err(|e| keystore_err("Invalid keystore format", e))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(&encrypted.nonce), encrypted.ciphertext.as_ref())
            .map_err(|_| {
                SettingsError::Keystore("Failed to decrypt keystore (wrong password?)".to_string())
            })?;

        serde_json::from_slice(&plaintext).map_err(|e| keystore_err("Invalid keystore data", e))
    }

    fn save_encrypted_data(&self, data: &KeyStoreData) -> Result<()> {
        self.ensure_keys_dir()?;
        let cipher = self.cipher()?;

        let plaintext =
            serde_json::to_vec(data).map_err(|e| keystore_err("Failed to serialize keystore", e))?;

        let mut nonce_bytes = [0u8; 12];
        OsRng.fill_bytes(&mut nonce_bytes);

        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext.as_ref())
            .map_err(|e| keystore_err("Failed to encrypt keystore", e))?;

        let encrypted = EncryptedKeyStore {
            version: 1,
            nonce: nonce_bytes,
            ciphertext,
        };
        let encrypted_json = serde_json::to_string_pretty(&encrypted)
            .map_err(|e| keystore_err("Failed to serialize encrypted data", e))?;

        let keystore_path = self.keystore_file();
        fs::write(&keystore_path, &encrypted_json)
            .map_err(|e| keystore_err("Failed to write keystore", e))?;
        restrict_permissions(&keystore_path, 0o600)
    }

    fn store_encrypted(&mut self, adapter: AIAdapter, secret: &SecretString) -> Result<()> {
        let mut data = self.load_encrypted_data()?;
        data.keys
            .insert(adapter.as_str().to_string(), secret.expose().to_string());
        self.save_encrypted_data(&data)
    }

    fn get_encrypted(&self, adapter: AIAdapter) -> Result<Option<SecretString>> {
        let data = self.load_encrypted_data()?;
        Ok(data.keys.get(adapter.as_str()).map(|s| SecretString::new(s.clone())))
    }

    fn delete_encrypted(&mut self, adapter: AIAdapter) -> Result<()> {
        let mut data = self.load_encrypted_data()?;
        if data.keys.remove(adapter.as_str()).is_some() {
            self.save_encrypted_data(&data)?;
        }
        Ok(())
    }
}

fn derive_key(password: &str, salt: &SaltString) -> Result<[u8; 32]> {
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), salt)
        .map_err(|e| keystore_err("Failed to derive key", e))?;
    let output = hash
        .hash
        .ok_or_else(|| SettingsError::Keystore("No hash output".to_string()))?;

    let bytes = output.as_bytes();
    if bytes.len() < 32 {
        return Err(SettingsError::Keystore("Hash too short".to_string()));
    }
    let mut key = [0u8; 32];
    key.copy_from_slice(&bytes[..32]);
    Ok(key)
}

#[cfg(unix)]
fn restrict_permissions(path: &Path, mode: u32) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
        .map_err(|e| keystore_err("Failed to set permissions", e))
}

#[cfg(not(unix))]
fn restrict_permissions(_path: &Path, _mode: u32) -> Result<()> {
    Ok(())
}

/// Prompt for the master password from the terminal
pub fn prompt_master_password(prompt: &str) -> Result<String> {
    rpassword::prompt_password(prompt).map_err(|e| keystore_err("Failed to read password", e))
}

/// Prompt for a new master password with confirmation
pub fn prompt_new_password(prompt: &str, confirm_prompt: &str) -> Result<String> {
    loop {
        let password = prompt_master_password(prompt)?;
        if password.len() < 8 {
            eprintln!("Password must be at least 8 characters");
            continue;
        }
        if password != prompt_master_password(confirm_prompt)? {
            eprintln!("Passwords do not match");
            continue;
        }
        return Ok(password);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn encrypted_keystore() -> (KeyStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::with_backend(KeyStoreBackend::EncryptedFile, temp_dir.path());
        store.init_encrypted("test_password").unwrap();
        (store, temp_dir)
    }

    #[test]
    fn test_secret_string_debug_redacted() {
        let secret = SecretString::new("my_api_key");
        let debug_str = format!("{:?}", secret);
        assert_eq!(debug_str, "[REDACTED]");
        assert!(!debug_str.contains("my_api_key"));
    }

    #[test]
    fn test_store_and_retrieve_encrypted() {
        let (mut store, _temp) = encrypted_keystore();

        store
            .store(AIAdapter::Claude, &SecretString::new("sk-ant-test-key-12345"))
            .unwrap();

        let retrieved = store.get(AIAdapter::Claude).unwrap();
        assert_eq!(retrieved.unwrap().expose(), "sk-ant-test-key-12345");
    }

    #[test]
    fn test_delete_encrypted() {
        let (mut store, _temp) = encrypted_keystore();

        store.store(AIAdapter::OpenAI, &SecretString::new("sk-openai-test")).unwrap();
        assert!(store.exists(AIAdapter::OpenAI).unwrap());

        store.delete(AIAdapter::OpenAI).unwrap();
        assert!(!store.exists(AIAdapter::OpenAI).unwrap());
        // Deleting twice is fine
        store.delete(AIAdapter::OpenAI).unwrap();
    }

    #[test]
    fn test_reopen_with_password() {
        let (mut store, temp) = encrypted_keystore();
        store.store(AIAdapter::Horde, &SecretString::new("horde-key")).unwrap();

        let mut reopened = KeyStore::with_backend(KeyStoreBackend::EncryptedFile, temp.path());
        assert!(reopened.is_initialized());
        assert!(!reopened.is_unlocked());
        reopened.unlock("test_password").unwrap();
        assert_eq!(reopened.get(AIAdapter::Horde).unwrap().unwrap().expose(), "horde-key");

        let mut wrong = KeyStore::with_backend(KeyStoreBackend::EncryptedFile, temp.path());
        assert!(wrong.unlock("not_the_password").is_err());
    }

    #[test]
    fn test_memory_backend_list_and_clear() {
        let mut store = KeyStore::memory();
        store.store(AIAdapter::Scale, &SecretString::new("scale")).unwrap();
        store.store(AIAdapter::Novel, &SecretString::new("novel")).unwrap();

        assert_eq!(store.list().unwrap(), vec![AIAdapter::Novel, AIAdapter::Scale]);

        store.clear().unwrap();
        assert!(store.list().unwrap().is_empty());
    }

    #[test]
    fn test_uninitialized_encrypted_store() {
        let temp_dir = TempDir::new().unwrap();
        let mut store = KeyStore::with_backend(KeyStoreBackend::EncryptedFile, temp_dir.path());
        assert!(!store.is_initialized());
        assert!(store.unlock("whatever").is_err());
    }

    #[test]
    fn test_different_passwords_produce_different_keys() {
        let salt = SaltString::from_b64("dGVzdHNhbHQxMjM0NQ").unwrap();
        let key1 = derive_key("password123", &salt).unwrap();
        let key2 = derive_key("password123", &salt).unwrap();
        let key3 = derive_key("password456", &salt).unwrap();
        assert_eq!(key1, key2);
        assert_ne!(key1, key3);
    }
}
