use thiserror::Error;

/// Failures raised by the audio capture backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("Microphone not available.")]
    MicrophoneNotAvailable,

    #[error("Audio engine failed: {0}")]
    EngineStartFailed(String),

    #[error("Recording failed: {0}")]
    RecordingFailed(String),

    #[error("recording not started")]
    NotStarted,

    #[error("recording stop timed out")]
    StopTimeout,
}

/// Failures raised by the transcription client.
///
/// These are fail-fast: the client never retries, the user re-initiates.
/// Display strings are user-facing; they end up verbatim in the `Error`
/// state shown by the overlay.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscribeError {
    #[error("No API key configured. Please add your OpenAI API key in Settings.")]
    MissingApiKey,

    #[error("Invalid API key. Please check your key in Settings.")]
    InvalidApiKey,

    #[error("Rate limit exceeded. Please wait and try again.")]
    RateLimited,

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response from server.")]
    MalformedResponse,

    #[error("Audio file not found.")]
    AudioFileMissing,

    #[error("Request timed out. Please try again.")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_includes_status_and_message() {
        let e = TranscribeError::Server {
            status: 503,
            message: "overloaded".into(),
        };
        assert_eq!(e.to_string(), "Server error (503): overloaded");
    }

    #[test]
    fn user_facing_messages_are_stable() {
        assert_eq!(
            TranscribeError::MissingApiKey.to_string(),
            "No API key configured. Please add your OpenAI API key in Settings."
        );
        assert_eq!(
            TranscribeError::RateLimited.to_string(),
            "Rate limit exceeded. Please wait and try again."
        );
    }
}
