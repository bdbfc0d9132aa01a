use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of a persisted transcription history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntryId(pub Uuid);

impl EntryId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

/// Transcription models offered by the OpenAI audio API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TranscriptionModel {
    #[serde(rename = "whisper-1")]
    Whisper1,
    #[serde(rename = "gpt-4o-mini-transcribe")]
    Gpt4oMiniTranscribe,
    #[serde(rename = "gpt-4o-transcribe")]
    Gpt4oTranscribe,
}

impl TranscriptionModel {
    /// The wire identifier sent in the `model` form field.
    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptionModel::Whisper1 => "whisper-1",
            TranscriptionModel::Gpt4oMiniTranscribe => "gpt-4o-mini-transcribe",
            TranscriptionModel::Gpt4oTranscribe => "gpt-4o-transcribe",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            TranscriptionModel::Whisper1 => "Whisper v1",
            TranscriptionModel::Gpt4oMiniTranscribe => "GPT-4o Mini Transcribe",
            TranscriptionModel::Gpt4oTranscribe => "GPT-4o Transcribe",
        }
    }
}

impl Default for TranscriptionModel {
    fn default() -> Self {
        Self::Whisper1
    }
}

/// Languages offered for transcription. `Auto` sends no language selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Language {
    #[serde(rename = "")]
    Auto,
    #[serde(rename = "en")]
    English,
    #[serde(rename = "pt")]
    Portuguese,
    #[serde(rename = "es")]
    Spanish,
    #[serde(rename = "fr")]
    French,
    #[serde(rename = "de")]
    German,
    #[serde(rename = "it")]
    Italian,
    #[serde(rename = "ja")]
    Japanese,
    #[serde(rename = "zh")]
    Chinese,
}

impl Language {
    /// ISO code sent on the wire; empty means auto-detect.
    pub fn code(&self) -> &'static str {
        match self {
            Language::Auto => "",
            Language::English => "en",
            Language::Portuguese => "pt",
            Language::Spanish => "es",
            Language::French => "fr",
            Language::German => "de",
            Language::Italian => "it",
            Language::Japanese => "ja",
            Language::Chinese => "zh",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Language::Auto => "Auto-detect",
            Language::English => "English",
            Language::Portuguese => "Portuguese",
            Language::Spanish => "Spanish",
            Language::French => "French",
            Language::German => "German",
            Language::Italian => "Italian",
            Language::Japanese => "Japanese",
            Language::Chinese => "Chinese",
        }
    }
}

impl Default for Language {
    fn default() -> Self {
        Self::Auto
    }
}

/// Microphone authorization as reported by the OS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MicAuthorization {
    Granted,
    Denied,
    Undetermined,
}

/// Read-only snapshot of the configuration a dictation session runs with.
///
/// Taken by the controller at the start of each operation; never mutated
/// mid-session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictationSettings {
    pub api_key: Option<String>,
    pub model: TranscriptionModel,
    pub language: Language,
    pub auto_paste: bool,
}

impl DictationSettings {
    pub fn has_api_key(&self) -> bool {
        self.api_key
            .as_ref()
            .map(|k| !k.trim().is_empty())
            .unwrap_or(false)
    }
}

impl Default for DictationSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: TranscriptionModel::default(),
            language: Language::default(),
            auto_paste: true,
        }
    }
}

/// A persisted global-hotkey binding (modifier names + key name).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotkeyBinding {
    pub modifiers: Vec<String>,
    pub key: String,
}

impl Default for HotkeyBinding {
    fn default() -> Self {
        Self {
            modifiers: vec!["Control".into()],
            key: "D".into(),
        }
    }
}
