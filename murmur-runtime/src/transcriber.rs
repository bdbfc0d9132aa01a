use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use murmur_core::{Language, TranscribeError, TranscriptionModel};
use murmur_engine::traits::{SettingsProvider, TranscriptionClient};
use murmur_providers::openai::{
    AudioUpload, OPENAI_API_BASE, OpenAiSttConfig, build_key_probe_request,
    build_transcription_request, mime_type_for,
};
use murmur_providers::parse::{parse_error_message, parse_transcription};
use murmur_providers::runtime::{HttpError, execute};

/// Upper bound on one transcription upload. Long enough for a two-minute
/// dictation over a slow link, short enough that a dead endpoint cannot
/// park the session in `Processing` forever.
pub const TRANSCRIBE_TIMEOUT: Duration = Duration::from_secs(120);

/// The credential probe carries no payload and should answer fast.
pub const KEY_PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Uploads recordings to the OpenAI `audio/transcriptions` endpoint.
///
/// Fail-fast by design: every failure maps to one typed [`TranscribeError`]
/// and the user re-initiates; there is no retry loop here.
pub struct OpenAiTranscriptionClient {
    settings: Arc<dyn SettingsProvider>,
    base_url: String,
    timeout: Duration,
}

impl std::fmt::Debug for OpenAiTranscriptionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiTranscriptionClient")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAiTranscriptionClient {
    pub fn new(settings: Arc<dyn SettingsProvider>) -> Self {
        Self {
            settings,
            base_url: OPENAI_API_BASE.into(),
            timeout: TRANSCRIBE_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Credential validation: a bare authenticated GET, valid iff it
    /// answers 200.
    pub async fn validate_api_key(&self, api_key: &str) -> bool {
        let req = build_key_probe_request(&self.base_url, api_key);
        match execute(&req, KEY_PROBE_TIMEOUT).await {
            Ok(resp) => resp.status == 200,
            Err(e) => {
                log::debug!("api key probe failed: {e}");
                false
            }
        }
    }
}

#[async_trait]
impl TranscriptionClient for OpenAiTranscriptionClient {
    async fn transcribe(
        &self,
        audio: &Path,
        model: TranscriptionModel,
        language: Language,
    ) -> Result<String, TranscribeError> {
        let api_key = self
            .settings
            .snapshot()
            .api_key
            .filter(|k| !k.trim().is_empty())
            .ok_or(TranscribeError::MissingApiKey)?;

        if !audio.exists() {
            return Err(TranscribeError::AudioFileMissing);
        }
        let bytes = std::fs::read(audio).map_err(|e| {
            log::error!("failed to read recording {}: {e}", audio.display());
            TranscribeError::AudioFileMissing
        })?;

        let filename = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();

        let cfg = OpenAiSttConfig {
            base_url: self.base_url.clone(),
            api_key,
            model,
            language,
        };
        let req = build_transcription_request(
            &cfg,
            &AudioUpload {
                filename,
                mime_type: mime_type_for(audio).into(),
                bytes,
            },
        );

        let resp = execute(&req, self.timeout).await.map_err(|e| match e {
            HttpError::Timeout => TranscribeError::Timeout,
            HttpError::Network(m) | HttpError::InvalidRequest(m) => TranscribeError::Network(m),
        })?;

        match resp.status {
            200..=299 => parse_transcription(&resp.body).map_err(|e| {
                log::error!("unparseable transcription response: {e:#}");
                TranscribeError::MalformedResponse
            }),
            401 => Err(TranscribeError::InvalidApiKey),
            429 => Err(TranscribeError::RateLimited),
            status => Err(TranscribeError::Server {
                status,
                message: parse_error_message(&resp.body)
                    .unwrap_or_else(|| "Unknown error".into()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use murmur_core::DictationSettings;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct StaticSettings(Option<&'static str>);

    impl SettingsProvider for StaticSettings {
        fn snapshot(&self) -> DictationSettings {
            DictationSettings {
                api_key: self.0.map(String::from),
                ..DictationSettings::default()
            }
        }
    }

    fn client(server: &MockServer, key: Option<&'static str>) -> OpenAiTranscriptionClient {
        OpenAiTranscriptionClient::new(Arc::new(StaticSettings(key)))
            .with_base_url(server.uri())
    }

    fn wav_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
        let path = dir.path().join("take.wav");
        std::fs::write(&path, b"RIFF....WAVEfmt ").unwrap();
        path
    }

    #[tokio::test]
    async fn returns_trimmed_text_on_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/audio/transcriptions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(
                r#"{"text":"  hello from the api  "}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let text = client(&server, Some("sk-test"))
            .transcribe(
                &wav_file(&dir),
                TranscriptionModel::Whisper1,
                Language::English,
            )
            .await
            .unwrap();
        assert_eq!(text, "hello from the api");
    }

    #[tokio::test]
    async fn maps_401_to_invalid_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, Some("sk-bad"))
            .transcribe(&wav_file(&dir), TranscriptionModel::Whisper1, Language::Auto)
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::InvalidApiKey);
    }

    #[tokio::test]
    async fn maps_429_to_rate_limited() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, Some("sk-test"))
            .transcribe(&wav_file(&dir), TranscriptionModel::Whisper1, Language::Auto)
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::RateLimited);
    }

    #[tokio::test]
    async fn surfaces_server_error_messages() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_raw(
                r#"{"error":{"message":"engine overloaded"}}"#,
                "application/json",
            ))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, Some("sk-test"))
            .transcribe(&wav_file(&dir), TranscriptionModel::Whisper1, Language::Auto)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            TranscribeError::Server {
                status: 503,
                message: "engine overloaded".into()
            }
        );
    }

    #[tokio::test]
    async fn garbage_success_body_is_malformed() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_raw("<html>", "text/html"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, Some("sk-test"))
            .transcribe(&wav_file(&dir), TranscriptionModel::Whisper1, Language::Auto)
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::MalformedResponse);
    }

    #[tokio::test]
    async fn missing_key_fails_before_any_request() {
        let server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, None)
            .transcribe(&wav_file(&dir), TranscriptionModel::Whisper1, Language::Auto)
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::MissingApiKey);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_file_fails_before_any_request() {
        let server = MockServer::start().await;
        let err = client(&server, Some("sk-test"))
            .transcribe(
                Path::new("/nonexistent/take.wav"),
                TranscriptionModel::Whisper1,
                Language::Auto,
            )
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::AudioFileMissing);
        assert!(server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn slow_endpoint_surfaces_a_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(r#"{"text":"late"}"#, "application/json")
                    .set_delay(Duration::from_millis(400)),
            )
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = client(&server, Some("sk-test"))
            .with_timeout(Duration::from_millis(50))
            .transcribe(&wav_file(&dir), TranscriptionModel::Whisper1, Language::Auto)
            .await
            .unwrap_err();
        assert_eq!(err, TranscribeError::Timeout);
    }

    #[tokio::test]
    async fn key_probe_accepts_only_200() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .and(header("authorization", "Bearer sk-good"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/models"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let c = client(&server, None);
        assert!(c.validate_api_key("sk-good").await);
        assert!(!c.validate_api_key("sk-bad").await);
    }
}
