use std::path::{Path, PathBuf};

use anyhow::Context;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use murmur_core::{DictationSettings, HotkeyBinding, Language, TranscriptionModel};
use murmur_engine::traits::SettingsProvider;

/// User configuration persisted as JSON.
///
/// The API key is stored Base64-encoded rather than in plain text; it is
/// part of this file on purpose (no keychain prompts), matching the
/// settings-store contract the rest of the app consumes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSettings {
    pub model: TranscriptionModel,
    pub language: Language,
    pub auto_paste: bool,
    pub show_notification: bool,
    pub play_sound: bool,
    pub hotkey: HotkeyBinding,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_encoded: Option<String>,
}

impl Default for StoredSettings {
    fn default() -> Self {
        Self {
            model: TranscriptionModel::Whisper1,
            language: Language::Auto,
            auto_paste: true,
            show_notification: true,
            play_sound: true,
            hotkey: HotkeyBinding::default(),
            api_key_encoded: None,
        }
    }
}

impl StoredSettings {
    pub fn api_key(&self) -> Option<String> {
        let encoded = self.api_key_encoded.as_ref()?;
        let bytes = BASE64.decode(encoded).ok()?;
        String::from_utf8(bytes).ok().filter(|k| !k.is_empty())
    }

    pub fn set_api_key(&mut self, value: Option<&str>) {
        self.api_key_encoded = match value {
            Some(key) if !key.trim().is_empty() => Some(BASE64.encode(key.trim())),
            _ => None,
        };
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// The read-only snapshot handed to the dictation controller.
    pub fn snapshot(&self) -> DictationSettings {
        DictationSettings {
            api_key: self.api_key(),
            model: self.model,
            language: self.language,
            auto_paste: self.auto_paste,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Missing file means a fresh install; defaults apply.
    pub fn load(&self) -> anyhow::Result<StoredSettings> {
        if !self.path.exists() {
            return Ok(StoredSettings::default());
        }

        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("read settings: {}", self.path.display()))?;
        let settings: StoredSettings =
            serde_json::from_slice(&bytes).context("decode settings JSON")?;
        Ok(settings)
    }

    pub fn save(&self, settings: &StoredSettings) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(settings).context("encode settings JSON")?;
        if let Some(parent) = self.path.parent() {
            crate::fsutil::ensure_dir(parent)?;
        }

        // Atomic-ish write: write temp then replace.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).with_context(|| format!("write temp: {}", tmp.display()))?;
        crate::fsutil::replace_file(&tmp, &self.path)
            .with_context(|| format!("replace file: {}", self.path.display()))?;
        Ok(())
    }

    pub fn set_api_key(&self, value: Option<&str>) -> anyhow::Result<()> {
        let mut settings = self.load()?;
        settings.set_api_key(value);
        self.save(&settings)
    }

    pub fn reset_to_defaults(&self) -> anyhow::Result<()> {
        self.save(&StoredSettings::default())
    }
}

/// Adapts the store to the engine's snapshot seam. Each snapshot re-reads
/// the file so settings edits apply to the next session without restarts;
/// read failures fall back to defaults (and no API key) rather than
/// breaking the trigger path.
#[derive(Debug, Clone)]
pub struct StoreSettingsProvider {
    store: SettingsStore,
}

impl StoreSettingsProvider {
    pub fn new(store: SettingsStore) -> Self {
        Self { store }
    }
}

impl SettingsProvider for StoreSettingsProvider {
    fn snapshot(&self) -> DictationSettings {
        match self.store.load() {
            Ok(settings) => settings.snapshot(),
            Err(e) => {
                log::warn!("failed to load settings, using defaults: {e:#}");
                DictationSettings::default()
            }
        }
    }
}
