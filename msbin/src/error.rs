use thiserror::Error;

/// Errors produced while configuring, fitting or applying a spectrum binner.
#[derive(Debug, Error)]
pub enum BinningError {
    /// Custom bin edges are empty, too short, not finite or not strictly increasing.
    #[error("invalid bin edges: {0}")]
    InvalidBinEdges(String),

    /// A width, slope, range or scaling parameter is out of its supported domain.
    #[error("invalid binning parameter: {0}")]
    InvalidParameter(String),

    #[error("invalid spectrum: {0}")]
    InvalidSpectrum(String),

    /// A loaded vocabulary is not sorted or its positions disagree with its bins.
    #[error("invalid vocabulary: {0}")]
    InvalidVocabulary(String),

    #[error("spectrum binner does not contain known bins (run fit_transform() on training data first)")]
    NotFit,

    /// The weighted share of peaks outside the vocabulary exceeds the configured budget.
    #[error(
        "{missing_percentage:.2} of weighted spectrum is unknown to the model \
         (spectrum {index}, allowed {allowed_percentage:.2})"
    )]
    MissingMassExceeded {
        index: usize,
        identity: Option<String>,
        missing_percentage: f64,
        allowed_percentage: f64,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error("binary encoding failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("binary decoding failed: {0}")]
    Decode(#[from] bincode::error::DecodeError),

    #[error(transparent)]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, BinningError>;
