use std::path::PathBuf;
use thiserror::Error;

use crate::models::FileStage;

#[derive(Debug, Error)]
pub enum OrganizeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cannot read pdf {path}: {reason}")]
    Extraction { path: PathBuf, reason: String },

    #[error("path has no file name: {0}")]
    MissingFileName(String),

    #[error("cannot list source folder {path}: {source}")]
    SourceListing {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("classification request failed: {0}")]
    Transport(String),

    #[error("model response is not valid destination json: {reason}")]
    Parse { reason: String, raw: String },

    #[error("cannot place file at {path}: {source}")]
    Placement {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl OrganizeError {
    /// Last state the file reached before this error stopped it.
    pub fn stage(&self) -> FileStage {
        match self {
            OrganizeError::Extraction { .. }
            | OrganizeError::MissingFileName(_)
            | OrganizeError::SourceListing { .. } => FileStage::Pending,
            OrganizeError::Http(_) | OrganizeError::Transport(_) | OrganizeError::Parse { .. } => {
                FileStage::Extracted
            }
            OrganizeError::Placement { .. } | OrganizeError::Io(_) => FileStage::Normalized,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            OrganizeError::Extraction { .. } | OrganizeError::MissingFileName(_) => "extraction",
            OrganizeError::SourceListing { .. } => "listing",
            OrganizeError::Http(_) | OrganizeError::Transport(_) => "transport",
            OrganizeError::Parse { .. } => "parse",
            OrganizeError::Placement { .. } | OrganizeError::Io(_) => "placement",
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing api credential: set GEMINI_API_KEY or pass --api-key")]
    MissingCredential,

    #[error("source folder does not exist: {0}")]
    MissingSourceFolder(PathBuf),

    #[error("source path is not a directory: {0}")]
    SourceNotADirectory(PathBuf),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("http client setup failed: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T, E = OrganizeError> = std::result::Result<T, E>;
