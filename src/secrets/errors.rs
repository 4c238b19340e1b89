//! Secret store errors. Variants carry secret names, never secret values.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SecretError {
    #[error("Secret '{name}' not found")]
    NotFound { name: String },

    #[error("Secret '{name}' is empty")]
    Empty { name: String },

    #[error("Failed to read secret '{name}': {message}")]
    Read { name: String, message: String },
}

impl SecretError {
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound { name: name.into() }
    }

    pub fn empty(name: impl Into<String>) -> Self {
        Self::Empty { name: name.into() }
    }

    pub fn read(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Read {
            name: name.into(),
            message: message.into(),
        }
    }
}

pub type SecretResult<T> = Result<T, SecretError>;
