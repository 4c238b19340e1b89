use thiserror::Error;

/// Outcome classes of a failed submission
///
/// Only [`SendError::NonTransient`] means "stop retrying"; everything else
/// may succeed on a later delivery.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    #[error("ReportStream rejected the report with status {status}: {body}")]
    NonTransient { status: u16, body: String },

    #[error("ReportStream returned status {status}: {body}")]
    Transient { status: u16, body: String },

    #[error("Transport error: {message}")]
    Transport { message: String },

    #[error("Unable to obtain access token: {message}")]
    Token { message: String },

    #[error("Unable to decode response: {message}")]
    Decode { message: String },
}

impl SendError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    pub fn token(message: impl Into<String>) -> Self {
        Self::Token {
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if (400..500).contains(&status) {
            Self::NonTransient { status, body }
        } else {
            Self::Transient { status, body }
        }
    }

    pub fn is_non_transient(&self) -> bool {
        matches!(self, Self::NonTransient { .. })
    }
}

impl From<reqwest::Error> for SendError {
    fn from(err: reqwest::Error) -> Self {
        Self::transport(err.to_string())
    }
}

pub type SendResult<T> = Result<T, SendError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SendError::from_status(400, "bad").is_non_transient());
        assert!(SendError::from_status(499, "").is_non_transient());
        assert!(!SendError::from_status(500, "").is_non_transient());
        assert!(!SendError::from_status(302, "").is_non_transient());
        assert!(!SendError::token("expired").is_non_transient());
    }
}
