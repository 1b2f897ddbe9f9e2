use std::fmt;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCause {
    Unreachable,
    TimedOut,
    MalformedResponse,
    Unknown,
}

impl TransportCause {
    pub fn classify(error: &reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::TimedOut
        } else if error.is_connect() {
            Self::Unreachable
        } else if error.is_decode() || error.is_body() {
            Self::MalformedResponse
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for TransportCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable => write!(f, "host unreachable"),
            Self::TimedOut => write!(f, "timed out"),
            Self::MalformedResponse => write!(f, "malformed response"),
            Self::Unknown => write!(f, "unknown"),
        }
    }
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("permission denied")]
    PermissionDenied,
    #[error("no environments match {}", .requested.join(" "))]
    NoMatchingEnvironments { requested: Vec<String> },
    #[error("transport failure ({cause}): {message}")]
    TransportFailure {
        cause: TransportCause,
        message: String,
    },
    #[error("collector rejected the dump with status {status}")]
    ServerRejected { status: u16 },
    #[error("malformed collector response: {0}")]
    MalformedResponse(String),
    #[error("could not serialize dump: {0}")]
    Serialization(String),
}

impl PublishError {
    /// Failures that leave no other durable trace than the log.
    pub fn is_logged(&self) -> bool {
        matches!(
            self,
            Self::TransportFailure { .. }
                | Self::ServerRejected { .. }
                | Self::MalformedResponse(_)
                | Self::Serialization(_)
        )
    }

    /// Short, non-technical text for the person who ran the command.
    pub fn user_message(&self) -> String {
        match self {
            Self::PermissionDenied => "You do not have permission for this command!".to_string(),
            Self::NoMatchingEnvironments { requested } => {
                format!("Could not find plugin(s) {}", requested.join(" "))
            }
            Self::TransportFailure { .. } | Self::ServerRejected { .. } => {
                "An error occurred while posting your dump. The server may be down \
                 or there is an issue with your internet connection."
                    .to_string()
            }
            Self::MalformedResponse(_) | Self::Serialization(_) => {
                "An error occurred causing the dump to not be completed.".to_string()
            }
        }
    }
}

pub type PublishResult = Result<String, PublishError>;
