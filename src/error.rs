use std::path::PathBuf;
use thiserror::Error;

pub type FetchResult<T> = Result<T, FetchError>;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("ffmpeg not found at {}", path.display())]
    ExecutableNotFound { path: PathBuf },

    #[error("Could not make ffmpeg executable: {source}")]
    ExecutablePermission {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("yt-dlp was not found: {0}")]
    ExtractorUnavailable(String),

    /// The extractor's own error text, passed through untouched.
    #[error("{0}")]
    Extraction(String),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("A job is already running")]
    Busy,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl FetchError {
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether the failure came from the user's request rather than the environment.
    pub fn is_user_error(&self) -> bool {
        matches!(self, FetchError::InvalidRequest(_) | FetchError::Busy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_path() {
        let e = FetchError::ExecutableNotFound { path: PathBuf::from("/opt/app/resources/ffmpeg") };
        assert_eq!(e.to_string(), "ffmpeg not found at /opt/app/resources/ffmpeg");
    }

    #[test]
    fn extraction_text_is_verbatim() {
        let e = FetchError::extraction("ERROR: [youtube] abc: Video unavailable");
        assert_eq!(e.to_string(), "ERROR: [youtube] abc: Video unavailable");
        assert!(!e.is_user_error());
    }

    #[test]
    fn permission_error_includes_os_text() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "Operation not permitted");
        let e = FetchError::ExecutablePermission { path: PathBuf::from("ffmpeg"), source };
        assert!(e.to_string().contains("Operation not permitted"));
    }
}
