use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, mpsc, watch};

use murmur_core::{AmplitudeHistory, DictationSettings, DictationState, MicAuthorization};

use crate::traits::{
    AudioCapture, CaptureEvent, HistorySink, MicrophoneGate, SettingsProvider, TelemetrySink,
    TextDelivery, TranscriptionClient,
};

pub const NO_API_KEY_MESSAGE: &str =
    "No API key configured. Please add your OpenAI API key in Settings.";
pub const MIC_DENIED_MESSAGE: &str =
    "Microphone access denied. Enable in System Settings → Privacy.";
pub const SAVE_FAILED_MESSAGE: &str = "Failed to save recording";

/// Delays applied around delivery and transient-state auto-recovery.
///
/// These are policy, not correctness: each stays bounded at a few seconds so
/// the controller always returns to `Idle`. Tests inject near-zero values.
#[derive(Debug, Clone)]
pub struct TimingPolicy {
    /// Settle time between hiding the overlay and the synthetic paste
    /// keystroke, so the target application has regained focus.
    pub paste_settle: Duration,
    /// How long `Success` stays visible after an auto-paste.
    pub success_hold: Duration,
    /// How long `Success` stays visible when delivery is clipboard-only.
    pub success_hold_clipboard: Duration,
    /// How long an `Error` stays before auto-dismissing back to `Idle`.
    pub error_dismiss: Duration,
    /// Failsafe: recordings longer than this are stopped automatically.
    pub max_recording: Duration,
}

impl Default for TimingPolicy {
    fn default() -> Self {
        Self {
            paste_settle: Duration::from_millis(300),
            success_hold: Duration::from_millis(1500),
            success_hold_clipboard: Duration::from_secs(2),
            error_dismiss: Duration::from_secs(5),
            max_recording: Duration::from_secs(120),
        }
    }
}

/// Snapshot of the controller published to observers (overlay, tests).
#[derive(Debug, Clone, PartialEq)]
pub struct DictationStatus {
    pub state: DictationState,
    pub amplitudes: Vec<f32>,
    pub elapsed_ms: u64,
    pub transcribed_text: String,
    pub error_message: Option<String>,
}

struct Inner {
    state: DictationState,
    amplitudes: AmplitudeHistory,
    elapsed: Duration,
    transcribed_text: String,
    error_message: Option<String>,

    // Bumped whenever a new recording starts or the current one is torn
    // down. Spawned tasks and late async results compare against it and
    // drop themselves when the session has moved on.
    generation: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: DictationState::Idle,
            amplitudes: AmplitudeHistory::default(),
            elapsed: Duration::ZERO,
            transcribed_text: String::new(),
            error_message: None,
            generation: 0,
        }
    }
}

/// Applies `next` if the transition table allows it, running entry side
/// effects before the state is visible to anyone else. Returns whether the
/// transition took effect.
fn apply_transition(inner: &mut Inner, next: DictationState) -> bool {
    if !inner.state.allows(&next) {
        log::warn!(
            "invalid state transition: {} -> {}",
            inner.state.label(),
            next.label()
        );
        return false;
    }

    log::info!("state: {} -> {}", inner.state.label(), next.label());

    match &next {
        DictationState::Idle => {
            inner.amplitudes.clear();
            inner.elapsed = Duration::ZERO;
            inner.error_message = None;
        }
        DictationState::Recording => {
            inner.transcribed_text.clear();
            inner.amplitudes.clear();
            inner.elapsed = Duration::ZERO;
            inner.generation = inner.generation.wrapping_add(1);
        }
        DictationState::Error(message) => {
            inner.error_message = Some(message.clone());
        }
        _ => {}
    }

    inner.state = next;
    true
}

/// The dictation session state machine.
///
/// Owns the single active session, validates every state change against the
/// transition table, and sequences capture -> transcription -> delivery ->
/// history as one guarded pipeline. All session data lives behind one
/// serialized lock; capture callbacks and async completions are marshaled
/// onto it and checked against the session generation before they land.
#[derive(Clone)]
pub struct DictationController {
    inner: Arc<Mutex<Inner>>,
    status_tx: watch::Sender<DictationStatus>,
    capture: Arc<dyn AudioCapture>,
    transcriber: Arc<dyn TranscriptionClient>,
    delivery: Arc<dyn TextDelivery>,
    history: Arc<dyn HistorySink>,
    mic_gate: Arc<dyn MicrophoneGate>,
    settings: Arc<dyn SettingsProvider>,
    timing: TimingPolicy,
}

impl DictationController {
    pub fn new(
        capture: Arc<dyn AudioCapture>,
        transcriber: Arc<dyn TranscriptionClient>,
        delivery: Arc<dyn TextDelivery>,
        history: Arc<dyn HistorySink>,
        mic_gate: Arc<dyn MicrophoneGate>,
        settings: Arc<dyn SettingsProvider>,
    ) -> Self {
        let inner = Inner::new();
        let (status_tx, _) = watch::channel(Self::status_of(&inner));
        Self {
            inner: Arc::new(Mutex::new(inner)),
            status_tx,
            capture,
            transcriber,
            delivery,
            history,
            mic_gate,
            settings,
            timing: TimingPolicy::default(),
        }
    }

    pub fn with_timing(mut self, timing: TimingPolicy) -> Self {
        self.timing = timing;
        self
    }

    fn status_of(inner: &Inner) -> DictationStatus {
        DictationStatus {
            state: inner.state.clone(),
            amplitudes: inner.amplitudes.samples().to_vec(),
            elapsed_ms: inner.elapsed.as_millis() as u64,
            transcribed_text: inner.transcribed_text.clone(),
            error_message: inner.error_message.clone(),
        }
    }

    fn publish(&self, inner: &Inner) {
        self.status_tx.send_replace(Self::status_of(inner));
    }

    pub async fn status(&self) -> DictationStatus {
        let inner = self.inner.lock().await;
        Self::status_of(&inner)
    }

    pub async fn state(&self) -> DictationState {
        self.inner.lock().await.state.clone()
    }

    /// Observers receive a fresh snapshot after every accepted transition
    /// and every applied telemetry update.
    pub fn subscribe(&self) -> watch::Receiver<DictationStatus> {
        self.status_tx.subscribe()
    }

    /// State-table primitive: applies `next` if legal, otherwise leaves the
    /// state untouched apart from a diagnostic. The `request_*` operations
    /// are the real entry points; this exists for composition-root nudges
    /// (e.g. flagging missing permissions) and for exercising the table.
    pub async fn transition_to(&self, next: DictationState) -> bool {
        let entering_error = matches!(next, DictationState::Error(_));
        let (accepted, generation) = {
            let mut inner = self.inner.lock().await;
            let accepted = apply_transition(&mut inner, next);
            if accepted {
                self.publish(&inner);
            }
            (accepted, inner.generation)
        };

        if accepted && entering_error {
            self.spawn_error_autodismiss(generation);
        }
        accepted
    }

    /// Flags that required permissions are missing (onboarding surface).
    pub async fn mark_permissions_needed(&self) -> bool {
        self.transition_to(DictationState::PermissionsNeeded).await
    }

    /// The "start-or-stop" trigger: starts a session from `Idle` (or
    /// `PermissionsNeeded`), routes to [`request_stop`](Self::request_stop)
    /// while recording, and is ignored anywhere else.
    pub async fn request_start(&self) {
        self.start_once(true).await;
    }

    async fn start_once(&self, allow_permission_retry: bool) {
        let state = { self.inner.lock().await.state.clone() };
        match state {
            DictationState::Idle | DictationState::PermissionsNeeded => {}
            DictationState::Recording => {
                self.request_stop().await;
                return;
            }
            other => {
                log::debug!("ignoring start request in state {}", other.label());
                return;
            }
        }

        let settings = self.settings.snapshot();
        if !settings.has_api_key() {
            self.fail(NO_API_KEY_MESSAGE).await;
            return;
        }

        match self.mic_gate.status() {
            MicAuthorization::Granted => {}
            MicAuthorization::Undetermined | MicAuthorization::Denied
                if allow_permission_retry =>
            {
                if self.mic_gate.request().await {
                    // Single automatic retry. The state guard at the top
                    // makes a platform grant callback that fires twice a
                    // logged no-op rather than a second session.
                    Box::pin(self.start_once(false)).await;
                } else {
                    self.fail(MIC_DENIED_MESSAGE).await;
                }
                return;
            }
            _ => {
                self.fail(MIC_DENIED_MESSAGE).await;
                return;
            }
        }

        let generation = {
            let mut inner = self.inner.lock().await;
            if !apply_transition(&mut inner, DictationState::Recording) {
                return;
            }
            self.publish(&inner);
            inner.generation
        };

        let (sink, events) = TelemetrySink::channel();
        self.spawn_telemetry_pump(events, generation);

        if let Err(e) = self.capture.start(sink).await {
            log::error!("audio capture failed to start: {e}");
            {
                let mut inner = self.inner.lock().await;
                // The table has no Recording -> Error edge; unwind through
                // the cancel edge first.
                apply_transition(&mut inner, DictationState::Idle);
                inner.generation = inner.generation.wrapping_add(1);
                self.publish(&inner);
            }
            self.fail(e.to_string()).await;
            return;
        }

        self.spawn_recording_watchdog(generation);
    }

    /// Stops the active recording and runs the transcription pipeline in the
    /// background. Only valid while `Recording`.
    pub async fn request_stop(&self) {
        let generation = {
            let mut inner = self.inner.lock().await;
            if inner.state != DictationState::Recording {
                log::debug!("ignoring stop request in state {}", inner.state.label());
                return;
            }
            if !apply_transition(&mut inner, DictationState::Processing) {
                return;
            }
            self.publish(&inner);
            inner.generation
        };

        let controller = self.clone();
        tokio::spawn(async move {
            controller.run_pipeline(generation).await;
        });
    }

    /// The "cancel" trigger. While recording this tears the session down and
    /// deletes the partial file; from a transient terminal state it dismisses
    /// back to `Idle`. Cancellation of an in-flight transcription is out of
    /// scope: the capture is already stopped and the single outstanding
    /// result resolves the session.
    pub async fn request_cancel(&self) {
        let mut inner = self.inner.lock().await;
        let state = inner.state.clone();
        match state {
            DictationState::Recording => {
                // Invalidate the session before teardown so no further
                // telemetry or stale completion can land.
                inner.generation = inner.generation.wrapping_add(1);
                drop(inner);

                self.capture.cancel().await;

                let mut inner = self.inner.lock().await;
                apply_transition(&mut inner, DictationState::Idle);
                self.publish(&inner);
            }
            DictationState::Success
            | DictationState::Error(_)
            | DictationState::PermissionsNeeded => {
                apply_transition(&mut inner, DictationState::Idle);
                self.publish(&inner);
            }
            DictationState::Processing => {
                log::debug!("cancel ignored while processing");
            }
            DictationState::Idle => {}
        }
    }

    /// Explicit early dismissal of a transient terminal state.
    pub async fn request_dismiss(&self) {
        let mut inner = self.inner.lock().await;
        if matches!(
            inner.state,
            DictationState::Success | DictationState::Error(_) | DictationState::PermissionsNeeded
        ) && apply_transition(&mut inner, DictationState::Idle)
        {
            self.publish(&inner);
        }
    }

    async fn run_pipeline(&self, generation: u64) {
        let settings = self.settings.snapshot();

        let audio_file = match self.capture.stop().await {
            Ok(Some(path)) => path,
            Ok(None) => {
                if self.still_current(generation).await {
                    self.fail(SAVE_FAILED_MESSAGE).await;
                }
                return;
            }
            Err(e) => {
                if self.still_current(generation).await {
                    self.fail(e.to_string()).await;
                }
                return;
            }
        };

        let result = self
            .transcriber
            .transcribe(&audio_file, settings.model, settings.language)
            .await;

        // The temp artifact is disposed of exactly once, on every outcome,
        // before the session can come back to Idle.
        if let Err(e) = tokio::fs::remove_file(&audio_file).await {
            log::warn!(
                "failed to remove temp audio {}: {e}",
                audio_file.display()
            );
        }

        if !self.still_current(generation).await {
            log::debug!("dropping transcription result from a stale session");
            return;
        }

        match result {
            Ok(text) => self.finish_session(generation, text, &settings).await,
            Err(e) => self.fail(e.to_string()).await,
        }
    }

    async fn finish_session(
        &self,
        generation: u64,
        text: String,
        settings: &DictationSettings,
    ) {
        let duration_seconds = {
            let mut inner = self.inner.lock().await;
            inner.transcribed_text = text.clone();
            self.publish(&inner);
            inner.elapsed.as_secs_f64()
        };

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            self.history
                .append(trimmed, settings.model, settings.language, duration_seconds)
                .await;
        }

        if settings.auto_paste {
            // The overlay drops out of the way first; this settle window is
            // what lets the target application take focus back before the
            // synthetic keystroke.
            tokio::time::sleep(self.timing.paste_settle).await;
            self.delivery.paste(&text).await;
            self.succeed(generation, self.timing.success_hold).await;
        } else {
            self.delivery.copy(&text).await;
            self.succeed(generation, self.timing.success_hold_clipboard)
                .await;
        }
    }

    async fn succeed(&self, generation: u64, hold: Duration) {
        {
            let mut inner = self.inner.lock().await;
            if inner.generation != generation
                || !apply_transition(&mut inner, DictationState::Success)
            {
                return;
            }
            self.publish(&inner);
        }

        let controller = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(hold).await;
            let mut inner = controller.inner.lock().await;
            if inner.generation == generation && inner.state == DictationState::Success {
                apply_transition(&mut inner, DictationState::Idle);
                controller.publish(&inner);
            }
        });
    }

    async fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        log::error!("session error: {message}");
        self.transition_to(DictationState::Error(message)).await;
    }

    async fn still_current(&self, generation: u64) -> bool {
        self.inner.lock().await.generation == generation
    }

    fn spawn_error_autodismiss(&self, generation: u64) {
        let controller = self.clone();
        let delay = self.timing.error_dismiss;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = controller.inner.lock().await;
            if inner.generation == generation
                && matches!(inner.state, DictationState::Error(_))
            {
                apply_transition(&mut inner, DictationState::Idle);
                controller.publish(&inner);
            }
        });
    }

    fn spawn_telemetry_pump(
        &self,
        mut events: mpsc::UnboundedReceiver<CaptureEvent>,
        generation: u64,
    ) {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                let mut inner = controller.inner.lock().await;
                if inner.generation != generation {
                    break;
                }
                if inner.state != DictationState::Recording {
                    // Late capture-thread events between stop and teardown.
                    continue;
                }
                match event {
                    CaptureEvent::Amplitude(value) => inner.amplitudes.push(value),
                    CaptureEvent::Elapsed(elapsed) => inner.elapsed = elapsed,
                }
                controller.publish(&inner);
            }
        });
    }

    fn spawn_recording_watchdog(&self, generation: u64) {
        let controller = self.clone();
        let max = self.timing.max_recording;
        tokio::spawn(async move {
            tokio::time::sleep(max).await;
            let should_stop = {
                let inner = controller.inner.lock().await;
                inner.generation == generation && inner.state == DictationState::Recording
            };
            if should_stop {
                log::warn!("max recording duration reached; stopping automatically");
                controller.request_stop().await;
            }
        });
    }
}
