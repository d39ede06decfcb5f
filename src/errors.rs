// ABOUTME: Error types for the slide-bridge application
// ABOUTME: Provides structured error handling for each stage of the conversion pipeline

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Pipeline stage an error originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Input,
    Compose,
    Render,
    Assemble,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Input => "input",
            Stage::Compose => "compose",
            Stage::Render => "render",
            Stage::Assemble => "assemble",
            Stage::Persist => "persist",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to read input {path:?}: {source}")]
    InputError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path not found: {0}")]
    PathNotFoundError(PathBuf),

    #[error("Input validation error: {0}")]
    ValidationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Marp conversion failed: {stderr}")]
    RenderFailure { status: Option<i32>, stderr: String },

    #[error("Marp CLI not found ({0}). Install it with: npm install -g @marp-team/marp-cli")]
    RendererNotFound(String),

    #[error("Presentation error: {0}")]
    PresentationError(String),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("Failed to save {path:?}: {message}")]
    PersistenceFailure { path: PathBuf, message: String },

    #[error("I/O error: {0}")]
    FileReadError(#[from] std::io::Error),
}

impl BridgeError {
    /// Stage of the pipeline this error belongs to
    pub fn stage(&self) -> Stage {
        match self {
            Self::InputError { .. } | Self::PathNotFoundError(_) | Self::ValidationError(_) => {
                Stage::Input
            }
            Self::ConfigError(_) => Stage::Compose,
            Self::RenderFailure { .. } | Self::RendererNotFound(_) => Stage::Render,
            Self::PresentationError(_) | Self::XmlError(_) => Stage::Assemble,
            Self::PersistenceFailure { .. } | Self::FileReadError(_) => Stage::Persist,
        }
    }

    /// Wrap any displayable failure as a persistence failure for `path`
    pub fn persistence(path: impl Into<PathBuf>, err: impl fmt::Display) -> Self {
        Self::PersistenceFailure {
            path: path.into(),
            message: err.to_string(),
        }
    }
}

// Zip errors surface while reading or writing a deck package
impl From<zip::result::ZipError> for BridgeError {
    fn from(err: zip::result::ZipError) -> Self {
        BridgeError::PresentationError(format!("ZIP operation failed: {}", err))
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
