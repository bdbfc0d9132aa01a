use serde::{Deserialize, Serialize};

/// What the app is doing, as a single source of truth.
///
/// Exactly one instance is live per controller. Equality compares tags and,
/// for `Error`, the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DictationState {
    Idle,
    Recording,
    Processing,
    Success,
    Error(String),
    PermissionsNeeded,
}

impl Default for DictationState {
    fn default() -> Self {
        Self::Idle
    }
}

impl DictationState {
    /// Whether `next` is a legal transition from this state.
    ///
    /// The table below is the sole authority for whether a requested state
    /// change takes effect; anything else must be rejected with the state
    /// left unchanged.
    pub fn allows(&self, next: &DictationState) -> bool {
        use DictationState::*;

        matches!(
            (self, next),
            (Idle, Recording)
                | (Idle, PermissionsNeeded)
                | (Idle, Error(_))
                | (Recording, Processing)
                | (Recording, Idle) // cancel
                | (Processing, Success)
                | (Processing, Error(_))
                | (Success, Idle)
                | (Error(_), Idle)
                | (PermissionsNeeded, Idle)
                | (PermissionsNeeded, Recording)
        )
    }

    /// A stable string label for logs and UI display.
    ///
    /// This is intentionally not derived from `Debug`.
    pub fn label(&self) -> &'static str {
        match self {
            DictationState::Idle => "idle",
            DictationState::Recording => "recording",
            DictationState::Processing => "processing",
            DictationState::Success => "success",
            DictationState::Error(_) => "error",
            DictationState::PermissionsNeeded => "permissions_needed",
        }
    }

    pub fn is_recording(&self) -> bool {
        *self == DictationState::Recording
    }

    pub fn is_processing(&self) -> bool {
        *self == DictationState::Processing
    }

    pub fn is_success(&self) -> bool {
        *self == DictationState::Success
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            DictationState::Error(message) => Some(message),
            _ => None,
        }
    }
}
