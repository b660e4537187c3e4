use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, BridgeError>;

/// Exit code for the missing state indicator, kept distinct from ordinary failures
pub const EXIT_INDICATOR_MISSING: i32 = 3;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_FAILURE: i32 = 1;

#[derive(Debug, Error)]
pub enum BridgeError {
    /// The 56x56 state indicator is gone: the UI layout changed or the window never loaded
    #[error("unable to find submit button")]
    IndicatorNotFound,

    #[error("empty prompt")]
    EmptyPrompt,

    #[error("unable to find prompt box")]
    PromptBoxNotFound,

    #[error("no window titled '{title}' with class '{class}'")]
    WindowNotFound { title: String, class: String },

    #[error("failed to launch {}: {reason}", path.display())]
    Launch { path: PathBuf, reason: String },

    #[error("ui automation: {0}")]
    Backend(String),

    #[error("config file {}: {source}", path.display())]
    Config {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("ui automation is only available on Windows")]
    UnsupportedPlatform,
}

impl BridgeError {
    pub fn exit_code(&self) -> i32 {
        match self {
            BridgeError::IndicatorNotFound => EXIT_INDICATOR_MISSING,
            BridgeError::EmptyPrompt => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Fatal errors end the whole run instead of just the current step
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            BridgeError::IndicatorNotFound | BridgeError::UnsupportedPlatform
        )
    }
}

#[cfg(windows)]
impl From<windows::core::Error> for BridgeError {
    fn from(err: windows::core::Error) -> Self {
        BridgeError::Backend(err.to_string())
    }
}
