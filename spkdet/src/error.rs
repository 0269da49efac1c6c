use voxid_gmm::GmmError;

/// Errors from the speaker-detection pipeline.
#[derive(Debug, thiserror::Error)]
pub enum SpkDetError {
    #[error("invalid audio format: {0}")]
    InvalidAudioFormat(String),

    #[error("not enough audio for this operation")]
    InsufficientData,

    #[error("unknown speaker: {0}")]
    UnknownSpeaker(String),

    #[error("no speaker models enrolled")]
    NoSpeakersEnrolled,

    #[error("model format mismatch: {0}")]
    ModelFormatMismatch(String),

    #[error("background model load failed: {0}")]
    UbmLoadFailed(String),

    #[error("no background model loaded")]
    UbmNotLoaded,

    #[error("bad configuration: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<GmmError> for SpkDetError {
    fn from(err: GmmError) -> Self {
        match err {
            GmmError::InsufficientData => SpkDetError::InsufficientData,
            GmmError::Io(msg) => SpkDetError::Io(std::io::Error::other(msg)),
            other => SpkDetError::ModelFormatMismatch(other.to_string()),
        }
    }
}
