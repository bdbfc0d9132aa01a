use std::path::Path;

use crate::request::{Body, HttpRequest};
use murmur_core::{Language, TranscriptionModel};

pub const OPENAI_API_BASE: &str = "https://api.openai.com/v1";

#[derive(Clone, PartialEq, Eq)]
pub struct OpenAiSttConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: TranscriptionModel,
    pub language: Language,
}

impl std::fmt::Debug for OpenAiSttConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiSttConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("language", &self.language)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub filename: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Builds the multipart `audio/transcriptions` request.
pub fn build_transcription_request(cfg: &OpenAiSttConfig, audio: &AudioUpload) -> HttpRequest {
    let boundary = format!("Boundary-{}", uuid::Uuid::new_v4());

    let mut body: Vec<u8> = Vec::new();

    append_file(
        &mut body,
        &boundary,
        "file",
        &audio.filename,
        &audio.mime_type,
        &audio.bytes,
    );
    append_field(&mut body, &boundary, "model", cfg.model.as_str());
    if !cfg.language.code().is_empty() {
        append_field(&mut body, &boundary, "language", cfg.language.code());
    }
    append_field(&mut body, &boundary, "response_format", "json");

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    HttpRequest {
        method: "POST".into(),
        url: join_url(&cfg.base_url, "/audio/transcriptions"),
        headers: vec![
            (
                "Content-Type".into(),
                format!("multipart/form-data; boundary={}", boundary),
            ),
            ("Accept".into(), "application/json".into()),
            ("Authorization".into(), format!("Bearer {}", cfg.api_key)),
        ],
        body: Body::MultipartFormData { boundary, bytes: body },
    }
}

/// Builds the minimal credential-validation probe (no payload).
pub fn build_key_probe_request(base_url: &str, api_key: &str) -> HttpRequest {
    HttpRequest {
        method: "GET".into(),
        url: join_url(base_url, "/models"),
        headers: vec![("Authorization".into(), format!("Bearer {}", api_key))],
        body: Body::Empty,
    }
}

/// MIME type for an audio upload, keyed off the file extension.
pub fn mime_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());
    match ext.as_deref() {
        Some("m4a") => "audio/m4a",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("mp4") => "audio/mp4",
        Some("webm") => "audio/webm",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/wav",
    }
}

fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

fn append_field(body: &mut Vec<u8>, boundary: &str, name: &str, value: &str) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", name).as_bytes(),
    );
    body.extend_from_slice(value.as_bytes());
    body.extend_from_slice(b"\r\n");
}

fn append_file(
    body: &mut Vec<u8>,
    boundary: &str,
    name: &str,
    filename: &str,
    mime_type: &str,
    bytes: &[u8],
) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            name, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", mime_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn cfg(language: Language) -> OpenAiSttConfig {
        OpenAiSttConfig {
            base_url: OPENAI_API_BASE.into(),
            api_key: "sk-test".into(),
            model: TranscriptionModel::Whisper1,
            language,
        }
    }

    fn upload() -> AudioUpload {
        AudioUpload {
            filename: "take.wav".into(),
            mime_type: "audio/wav".into(),
            bytes: vec![1, 2, 3],
        }
    }

    #[test]
    fn builds_multipart_with_bearer_auth() {
        let req = build_transcription_request(&cfg(Language::English), &upload());

        assert_eq!(req.method, "POST");
        assert!(req.url.ends_with("/audio/transcriptions"));
        assert_eq!(req.header("authorization"), Some("Bearer sk-test"));

        match req.body {
            Body::MultipartFormData { bytes, .. } => {
                let s = String::from_utf8_lossy(&bytes);
                assert!(s.contains("name=\"file\""));
                assert!(s.contains("filename=\"take.wav\""));
                assert!(s.contains("name=\"model\""));
                assert!(s.contains("whisper-1"));
                assert!(s.contains("name=\"language\""));
                assert!(s.contains("\r\nen\r\n"));
                assert!(s.contains("name=\"response_format\""));
                assert!(s.contains("json"));
            }
            _ => panic!("expected multipart"),
        }
    }

    #[test]
    fn auto_language_omits_the_field() {
        let req = build_transcription_request(&cfg(Language::Auto), &upload());
        match req.body {
            Body::MultipartFormData { bytes, .. } => {
                let s = String::from_utf8_lossy(&bytes);
                assert!(!s.contains("name=\"language\""));
            }
            _ => panic!("expected multipart"),
        }
    }

    #[test]
    fn key_probe_is_a_bare_get() {
        let req = build_key_probe_request(OPENAI_API_BASE, "sk-test");
        assert_eq!(req.method, "GET");
        assert!(req.url.ends_with("/models"));
        assert_eq!(req.body, Body::Empty);
    }

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("https://api.example.com/", "/models"),
            "https://api.example.com/models"
        );
        assert_eq!(
            join_url("https://api.example.com", "models"),
            "https://api.example.com/models"
        );
    }

    #[test]
    fn mime_type_falls_back_to_wav() {
        assert_eq!(mime_type_for(&PathBuf::from("a.M4A")), "audio/m4a");
        assert_eq!(mime_type_for(&PathBuf::from("a.flac")), "audio/flac");
        assert_eq!(mime_type_for(&PathBuf::from("a.unknown")), "audio/wav");
        assert_eq!(mime_type_for(&PathBuf::from("noext")), "audio/wav");
    }
}
