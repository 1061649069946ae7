use std::path::PathBuf;
use thiserror::Error;

/// Core error type for omit-tilde operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file \"{path}\" was not found")]
    ManifestNotFound { path: PathBuf },

    #[error("failed to read \"{path}\": {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse \"{path}\": {source}")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to parse options at {path}: {source}")]
    OptionsParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid pattern /{pattern}/: {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("{0}")]
    Other(String),
}

impl Error {
    #[must_use]
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manifest_not_found_message() {
        let err = Error::ManifestNotFound {
            path: PathBuf::from("/app/package.json"),
        };
        assert_eq!(err.to_string(), "file \"/app/package.json\" was not found");
    }

    #[test]
    fn test_other() {
        assert_eq!(Error::other("boom").to_string(), "boom");
    }
}
