use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid base64 layer: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Decompression error: {0}")]
    Decompression(String),

    #[error("Text encoding error: {0}")]
    Encoding(String),

    #[error("Square root of a negative value: {value}")]
    NegativeSqrt { value: String },

    #[error("Seed derivation failed for version {version}: {reason}")]
    SeedDerivation { version: i32, reason: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Invalid read arguments: {0}")]
    InvalidReadArgs(String),

    #[error("Invalid codec options: {0}")]
    InvalidConfig(#[from] serde_json::Error),
}

impl CodecError {
    pub(crate) fn format(detail: impl Into<String>) -> Self {
        CodecError::Format(detail.into())
    }

    /// True for errors caused by the content of an encoded file, as opposed to
    /// the environment or the caller's arguments.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            CodecError::Format(_)
                | CodecError::Base64(_)
                | CodecError::Decompression(_)
                | CodecError::Encoding(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, CodecError>;
