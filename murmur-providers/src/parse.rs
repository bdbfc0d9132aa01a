use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TranscriptionResponse {
    pub text: String,
}

/// Parses a successful transcription body, trimming surrounding whitespace.
pub fn parse_transcription(body: &[u8]) -> anyhow::Result<String> {
    let resp: TranscriptionResponse =
        serde_json::from_slice(body).context("decode transcription JSON")?;
    Ok(resp.text.trim().to_string())
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extracts the server's error message from an error body, if it has one.
pub fn parse_error_message(body: &[u8]) -> Option<String> {
    serde_json::from_slice::<ApiErrorResponse>(body)
        .ok()
        .map(|r| r.error.message)
}
