use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use murmur_core::{
    CaptureError, DictationSettings, Language, MicAuthorization, TranscribeError,
    TranscriptionModel,
};

/// Telemetry emitted by an active capture.
///
/// Events cross from the capture context onto the controller's serialized
/// context and are applied in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureEvent {
    /// Normalized amplitude sample in [0, 1], roughly 30/s while recording.
    Amplitude(f32),
    /// Time elapsed since recording start, roughly 10/s while recording.
    Elapsed(Duration),
}

/// Cloneable handle a capture backend uses to publish telemetry.
///
/// Dropping every clone closes the channel; the controller stops listening
/// once that happens or once the session moves on, whichever comes first.
#[derive(Debug, Clone)]
pub struct TelemetrySink {
    tx: mpsc::UnboundedSender<CaptureEvent>,
}

impl TelemetrySink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<CaptureEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn amplitude(&self, value: f32) {
        let _ = self.tx.send(CaptureEvent::Amplitude(value));
    }

    pub fn elapsed(&self, elapsed: Duration) {
        let _ = self.tx.send(CaptureEvent::Elapsed(elapsed));
    }
}

/// Microphone capture to a temp file.
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Begins recording to a fresh temp file, publishing telemetry into
    /// `sink` until stopped or cancelled. Fails synchronously when the
    /// engine cannot start.
    async fn start(&self, sink: TelemetrySink) -> Result<(), CaptureError>;

    /// Stops recording and yields the recorded file, if one was produced.
    /// Ownership of the returned path passes to the caller, which is then
    /// responsible for deleting it.
    async fn stop(&self) -> Result<Option<PathBuf>, CaptureError>;

    /// Discards the in-progress recording and deletes any partial file.
    async fn cancel(&self);
}

/// Uploads a recorded audio file for speech-to-text.
///
/// Implementations must bound their wait and fail fast with a typed error;
/// there is no retry loop at this layer.
#[async_trait]
pub trait TranscriptionClient: Send + Sync {
    async fn transcribe(
        &self,
        audio: &Path,
        model: TranscriptionModel,
        language: Language,
    ) -> Result<String, TranscribeError>;
}

/// Hands transcribed text to the user.
#[async_trait]
pub trait TextDelivery: Send + Sync {
    /// Places `text` on the system clipboard.
    async fn copy(&self, text: &str);

    /// Copies `text` and injects the platform paste gesture into the focused
    /// application. When the required permission is missing this degrades to
    /// `copy`; it is not a session failure.
    async fn paste(&self, text: &str);
}

/// Persisted transcription log. Fire-and-forget: implementations log
/// failures instead of surfacing them, and must never block the session.
#[async_trait]
pub trait HistorySink: Send + Sync {
    async fn append(
        &self,
        text: &str,
        model: TranscriptionModel,
        language: Language,
        duration_seconds: f64,
    );
}

/// Microphone authorization checks and the OS permission prompt.
#[async_trait]
pub trait MicrophoneGate: Send + Sync {
    fn status(&self) -> MicAuthorization;

    /// Prompts the user for microphone access; resolves with the outcome.
    async fn request(&self) -> bool;
}

/// Source of configuration snapshots.
pub trait SettingsProvider: Send + Sync {
    /// A read-only snapshot taken at the start of each controller operation.
    fn snapshot(&self) -> DictationSettings;
}
