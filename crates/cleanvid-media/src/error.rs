//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while cleaning a media file.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("No {language} subtitles found for {}", .video.display())]
    SubtitleNotFound { video: PathBuf, language: String },

    #[error("Invalid subtitle file {}: {reason}", .path.display())]
    InvalidSubtitle { path: PathBuf, reason: String },

    #[error("Invalid media file: {0}")]
    InvalidMedia(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid word list pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Coarse classification of a cleaning failure, for logs and metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    SubtitleNotFound,
    TranscodeFailed,
    Io,
    Other,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::SubtitleNotFound => "subtitle_not_found",
            FailureKind::TranscodeFailed => "transcode_failed",
            FailureKind::Io => "io",
            FailureKind::Other => "other",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    pub fn subtitle_not_found(video: impl Into<PathBuf>, language: impl Into<String>) -> Self {
        Self::SubtitleNotFound {
            video: video.into(),
            language: language.into(),
        }
    }

    pub fn invalid_subtitle(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::InvalidSubtitle {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_media(message: impl Into<String>) -> Self {
        Self::InvalidMedia(message.into())
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            MediaError::SubtitleNotFound { .. } => FailureKind::SubtitleNotFound,
            MediaError::FfmpegFailed { .. }
            | MediaError::FfprobeFailed { .. }
            | MediaError::InvalidMedia(_)
            | MediaError::Timeout(_) => FailureKind::TranscodeFailed,
            MediaError::Io(_) | MediaError::FileNotFound(_) => FailureKind::Io,
            MediaError::FfmpegNotFound
            | MediaError::FfprobeNotFound
            | MediaError::InvalidSubtitle { .. }
            | MediaError::JsonParse(_)
            | MediaError::Pattern(_) => FailureKind::Other,
        }
    }

    /// Captured stderr of the failing FFmpeg/FFprobe run, if any.
    pub fn stderr(&self) -> Option<&str> {
        match self {
            MediaError::FfmpegFailed { stderr, .. } | MediaError::FfprobeFailed { stderr, .. } => {
                stderr.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kinds() {
        assert_eq!(
            MediaError::subtitle_not_found("movie.mkv", "eng").kind(),
            FailureKind::SubtitleNotFound
        );
        assert_eq!(
            MediaError::ffmpeg_failed("boom", None, Some(1)).kind(),
            FailureKind::TranscodeFailed
        );
        assert_eq!(
            MediaError::from(std::io::Error::from(std::io::ErrorKind::PermissionDenied)).kind(),
            FailureKind::Io
        );
        assert_eq!(MediaError::FfmpegNotFound.kind(), FailureKind::Other);
    }

    #[test]
    fn test_subtitle_not_found_message() {
        let err = MediaError::subtitle_not_found("/data/ShowB/movie.mkv", "eng");
        assert_eq!(err.to_string(), "No eng subtitles found for /data/ShowB/movie.mkv");
    }
}
