use thiserror::Error;

use crate::audio::source::SourceId;

/// Failures while building or driving the signal chain.
#[derive(Debug, Error)]
pub enum ChainError {
    /// The platform refused to hand out an audio context (no device, stream
    /// could not be built or started).
    #[error("audio context unavailable: {0}")]
    ContextUnavailable(String),

    #[error("source {0} is already attached to a signal chain")]
    SourceAlreadyAttached(SourceId),

    #[error("filter stage {label} rejected its parameters: {reason}")]
    InvalidStage { label: &'static str, reason: String },
}

/// Why a track could not be loaded. Terminal for the source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaLoadError {
    #[error("loading was aborted")]
    Aborted,

    #[error("could not read source: {0}")]
    Network(String),

    #[error("could not decode source: {0}")]
    Decode(String),

    #[error("source format not supported: {0}")]
    Unsupported(String),
}

impl MediaLoadError {
    /// Human readable status line shown in the console.
    pub fn status_message(&self) -> &'static str {
        match self {
            MediaLoadError::Aborted => "Error loading track (aborted)",
            MediaLoadError::Network(_) => "Error loading track (network error)",
            MediaLoadError::Decode(_) => "Error loading track (decode error)",
            MediaLoadError::Unsupported(_) => "Error loading track (source not supported)",
        }
    }
}

impl From<hound::Error> for MediaLoadError {
    fn from(err: hound::Error) -> Self {
        match err {
            hound::Error::IoError(io) => match io.kind() {
                std::io::ErrorKind::Interrupted => MediaLoadError::Aborted,
                std::io::ErrorKind::UnexpectedEof | std::io::ErrorKind::InvalidData => {
                    MediaLoadError::Decode(io.to_string())
                }
                _ => MediaLoadError::Network(io.to_string()),
            },
            hound::Error::FormatError(msg) => MediaLoadError::Decode(msg.to_string()),
            hound::Error::Unsupported => {
                MediaLoadError::Unsupported("unsupported WAV encoding".to_string())
            }
            other => MediaLoadError::Decode(other.to_string()),
        }
    }
}

/// Invalid input coming from a control. Discarded by the caller.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControlError {
    #[error("band index {0} is out of range")]
    BandIndex(usize),

    #[error("malformed control value {0:?}")]
    Malformed(String),

    #[error("control value is not a finite number")]
    NonFinite,
}

/// Sampling could not fill the snapshot buffer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SampleError {
    #[error("snapshot buffer holds {actual} bins, tap produces {expected}")]
    BufferLength { expected: usize, actual: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn media_errors_have_distinct_messages() {
        let errors = [
            MediaLoadError::Aborted,
            MediaLoadError::Network("gone".into()),
            MediaLoadError::Decode("bad".into()),
            MediaLoadError::Unsupported("mp3".into()),
        ];
        let mut messages: Vec<_> = errors.iter().map(|e| e.status_message()).collect();
        messages.sort();
        messages.dedup();
        assert_eq!(messages.len(), 4);
        assert!(MediaLoadError::Aborted.status_message().ends_with("(aborted)"));
    }

    #[test]
    fn hound_errors_map_to_media_kinds() {
        let unsupported: MediaLoadError = hound::Error::Unsupported.into();
        assert!(matches!(unsupported, MediaLoadError::Unsupported(_)));

        let format: MediaLoadError = hound::Error::FormatError("no RIFF tag found").into();
        assert!(matches!(format, MediaLoadError::Decode(_)));

        let missing: MediaLoadError =
            hound::Error::IoError(std::io::Error::from(std::io::ErrorKind::NotFound)).into();
        assert!(matches!(missing, MediaLoadError::Network(_)));

        let interrupted: MediaLoadError =
            hound::Error::IoError(std::io::Error::from(std::io::ErrorKind::Interrupted)).into();
        assert_eq!(interrupted, MediaLoadError::Aborted);
    }
}
