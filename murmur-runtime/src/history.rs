use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use murmur_core::{EntryId, Language, TranscriptionModel};
use murmur_engine::traits::HistorySink;

/// How many transcriptions the log keeps before dropping the oldest.
pub const HISTORY_CAP: usize = 200;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: EntryId,
    pub text: String,
    pub ts_unix_ms: i64,
    pub model: String,
    pub language: String,
    pub duration_seconds: f64,
}

impl HistoryEntry {
    pub fn new(
        text: impl Into<String>,
        model: TranscriptionModel,
        language: Language,
        duration_seconds: f64,
    ) -> Self {
        let ts = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as i64;

        Self {
            id: EntryId::new(),
            text: text.into(),
            ts_unix_ms: ts,
            model: model.as_str().to_string(),
            language: language.code().to_string(),
            duration_seconds,
        }
    }
}

/// Persists the transcription log as JSON, newest entry first.
#[derive(Debug, Clone)]
pub struct HistoryStore {
    path: PathBuf,
    max_entries: usize,
}

impl HistoryStore {
    pub fn at_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            max_entries: HISTORY_CAP,
        }
    }

    pub fn with_max_entries(mut self, max: usize) -> Self {
        self.max_entries = max.max(1);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> anyhow::Result<Vec<HistoryEntry>> {
        if !self.path.exists() {
            return Ok(vec![]);
        }

        let raw = fs::read_to_string(&self.path)
            .with_context(|| format!("failed to read history: {}", self.path.display()))?;
        let entries: Vec<HistoryEntry> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse history: {}", self.path.display()))?;
        Ok(entries)
    }

    pub fn append(&self, entry: HistoryEntry) -> anyhow::Result<()> {
        let mut entries = self.load()?;
        entries.insert(0, entry);
        entries.truncate(self.max_entries);
        self.write(&entries)
    }

    pub fn remove(&self, id: EntryId) -> anyhow::Result<()> {
        let mut entries = self.load()?;
        entries.retain(|e| e.id != id);
        self.write(&entries)
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        if self.path.exists() {
            fs::remove_file(&self.path)
                .with_context(|| format!("failed to remove history: {}", self.path.display()))?;
        }
        Ok(())
    }

    fn write(&self, entries: &[HistoryEntry]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            crate::fsutil::ensure_dir(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(entries)?)
            .with_context(|| format!("failed to write history temp: {}", tmp.display()))?;
        crate::fsutil::replace_file(&tmp, &self.path)
            .with_context(|| format!("failed to replace history: {}", self.path.display()))?;
        Ok(())
    }
}

/// Engine-facing adapter: appends are best-effort and never fail a session.
#[derive(Debug, Clone)]
pub struct JsonHistorySink {
    store: HistoryStore,
}

impl JsonHistorySink {
    pub fn new(store: HistoryStore) -> Self {
        Self { store }
    }
}

#[async_trait]
impl HistorySink for JsonHistorySink {
    async fn append(
        &self,
        text: &str,
        model: TranscriptionModel,
        language: Language,
        duration_seconds: f64,
    ) {
        let entry = HistoryEntry::new(text, model, language, duration_seconds);
        if let Err(e) = self.store.append(entry) {
            log::warn!("failed to append history entry: {e:#}");
        }
    }
}
