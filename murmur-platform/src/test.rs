//! In-memory collaborator doubles for composition tests and headless runs.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use murmur_core::{DictationSettings, Language, MicAuthorization, TranscriptionModel};
use murmur_engine::traits::{HistorySink, MicrophoneGate, SettingsProvider, TextDelivery};

/// Records every delivery instead of touching the real clipboard.
#[derive(Debug, Default)]
pub struct MemoryDelivery {
    pub copies: Mutex<Vec<String>>,
    pub pastes: Mutex<Vec<String>>,
}

#[async_trait]
impl TextDelivery for MemoryDelivery {
    async fn copy(&self, text: &str) {
        self.copies.lock().unwrap().push(text.to_string());
    }

    async fn paste(&self, text: &str) {
        self.pastes.lock().unwrap().push(text.to_string());
    }
}

/// Prints deliveries; handy for driving the pipeline from a terminal.
#[derive(Debug, Default)]
pub struct StdoutDelivery;

#[async_trait]
impl TextDelivery for StdoutDelivery {
    async fn copy(&self, text: &str) {
        println!("[copy] {text}");
    }

    async fn paste(&self, text: &str) {
        println!("[paste] {text}");
    }
}

#[derive(Debug, Default)]
pub struct MemoryHistory {
    pub entries: Mutex<Vec<(String, String, String, f64)>>,
}

#[async_trait]
impl HistorySink for MemoryHistory {
    async fn append(
        &self,
        text: &str,
        model: TranscriptionModel,
        language: Language,
        duration_seconds: f64,
    ) {
        self.entries.lock().unwrap().push((
            text.to_string(),
            model.as_str().to_string(),
            language.code().to_string(),
            duration_seconds,
        ));
    }
}

/// Gate with a fixed authorization and a canned prompt outcome.
#[derive(Debug)]
pub struct StaticGate {
    pub authorization: MicAuthorization,
    pub grant_on_request: bool,
    pub requests: AtomicUsize,
}

impl StaticGate {
    pub fn granted() -> Self {
        Self {
            authorization: MicAuthorization::Granted,
            grant_on_request: true,
            requests: AtomicUsize::new(0),
        }
    }

    pub fn denied() -> Self {
        Self {
            authorization: MicAuthorization::Denied,
            grant_on_request: false,
            requests: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MicrophoneGate for StaticGate {
    fn status(&self) -> MicAuthorization {
        self.authorization
    }

    async fn request(&self) -> bool {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.grant_on_request
    }
}

/// Fixed settings snapshot.
#[derive(Debug, Clone)]
pub struct StaticSettings(pub DictationSettings);

impl SettingsProvider for StaticSettings {
    fn snapshot(&self) -> DictationSettings {
        self.0.clone()
    }
}
