//! Error types for the tile pyramid builder.

use thiserror::Error;

/// Result type alias using TilerError.
pub type TilerResult<T> = Result<T, TilerError>;

/// Primary error type for pyramid building.
#[derive(Debug, Error)]
pub enum TilerError {
    /// Invalid zoom range, unsupported coordinate system, unknown sensor,
    /// missing input file.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Inputs or intermediate rasters disagree with each other (band merge
    /// mismatch, negative compositor offset).
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Unrecognized or undecodable raster container.
    #[error("format error: {0}")]
    Format(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("tile encoding failed: {0}")]
    Encode(String),

    #[error("pyramid build cancelled")]
    Cancelled,
}

impl TilerError {
    /// Create a Configuration error.
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a Consistency error.
    pub fn consistency(msg: impl Into<String>) -> Self {
        Self::Consistency(msg.into())
    }

    /// Create a Format error.
    pub fn format(msg: impl Into<String>) -> Self {
        Self::Format(msg.into())
    }

    /// Create an Io error tagged with the path it happened on.
    pub fn io(path: impl AsRef<std::path::Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().display().to_string(),
            source,
        }
    }

    /// Process exit code for this error, used by the command line front end.
    pub fn exit_code(&self) -> i32 {
        match self {
            TilerError::Configuration(_) => 2,
            TilerError::Consistency(_) => 3,
            TilerError::Format(_) => 4,
            TilerError::Io { .. } | TilerError::Encode(_) => 5,
            TilerError::Cancelled => 130,
        }
    }
}

impl From<std::io::Error> for TilerError {
    fn from(err: std::io::Error) -> Self {
        TilerError::Io {
            path: "<unknown>".to_string(),
            source: err,
        }
    }
}

impl From<serde_json::Error> for TilerError {
    fn from(err: serde_json::Error) -> Self {
        TilerError::Encode(format!("JSON error: {}", err))
    }
}
