//! Composition root: assembles the controller from real adapters.

use std::path::Path;
use std::sync::Arc;

use murmur_audio::CpalRecorder;
use murmur_engine::controller::DictationController;
use murmur_engine::traits::{MicrophoneGate, TextDelivery};
use murmur_runtime::history::{HistoryStore, JsonHistorySink};
use murmur_runtime::settings::{SettingsStore, StoreSettingsProvider};
use murmur_runtime::transcriber::OpenAiTranscriptionClient;

pub const SETTINGS_FILE: &str = "settings.json";
pub const HISTORY_FILE: &str = "history.json";

pub fn settings_store(data_dir: &Path) -> SettingsStore {
    SettingsStore::at_path(data_dir.join(SETTINGS_FILE))
}

pub fn history_store(data_dir: &Path) -> HistoryStore {
    HistoryStore::at_path(data_dir.join(HISTORY_FILE))
}

/// Wires capture, transcription, delivery, history and settings into one
/// controller. Everything downstream of the hotkey goes through it.
pub fn build_controller(data_dir: &Path) -> DictationController {
    let settings = Arc::new(StoreSettingsProvider::new(settings_store(data_dir)));
    let transcriber = Arc::new(OpenAiTranscriptionClient::new(settings.clone()));
    let history = Arc::new(JsonHistorySink::new(history_store(data_dir)));
    let capture = Arc::new(CpalRecorder::new());

    #[cfg(target_os = "macos")]
    let (delivery, mic_gate): (Arc<dyn TextDelivery>, Arc<dyn MicrophoneGate>) = (
        Arc::new(murmur_platform::macos::MacTextDelivery),
        Arc::new(murmur_platform::macos::MacMicrophoneGate),
    );

    // Elsewhere (dev boxes, CI) deliveries print and the mic gate is open;
    // capture still needs a real input device to actually record.
    #[cfg(not(target_os = "macos"))]
    let (delivery, mic_gate): (Arc<dyn TextDelivery>, Arc<dyn MicrophoneGate>) = (
        Arc::new(murmur_platform::test::StdoutDelivery),
        Arc::new(murmur_platform::test::StaticGate::granted()),
    );

    DictationController::new(capture, transcriber, delivery, history, mic_gate, settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::DictationState;
    use murmur_engine::controller::NO_API_KEY_MESSAGE;

    #[tokio::test]
    async fn fresh_install_starts_idle() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build_controller(dir.path());
        assert_eq!(controller.state().await, DictationState::Idle);
    }

    #[tokio::test]
    async fn start_without_a_key_surfaces_the_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let controller = build_controller(dir.path());

        // No settings file exists yet, so no credential is configured; the
        // error must surface before any audio device is touched.
        controller.request_start().await;
        assert_eq!(
            controller.state().await,
            DictationState::Error(NO_API_KEY_MESSAGE.into())
        );
    }

    #[tokio::test]
    async fn stored_key_reaches_the_controller_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = settings_store(dir.path());
        store.set_api_key(Some("sk-wired")).unwrap();

        let provider = StoreSettingsProvider::new(store);
        use murmur_engine::traits::SettingsProvider as _;
        assert_eq!(provider.snapshot().api_key.as_deref(), Some("sk-wired"));
    }
}
