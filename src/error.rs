use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum BaserError {
    #[error("missing required executable(s): {0}. Please install and retry")]
    #[diagnostic(help("every tool must be on PATH, or pass --no-check-deps"))]
    MissingDependency(String),

    #[error("failed to parse GenBank file {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("could not classify {0}")]
    ClassificationAmbiguous(String),

    #[error("{stage} failed: `{command}` exited with {}: {message}", exit_code_label(.code))]
    ToolFailure {
        stage: String,
        command: String,
        code: Option<i32>,
        message: String,
    },

    #[error("invalid organism: {0}")]
    InvalidOrganism(String),

    #[error("description yields an empty identifier: {0:?}")]
    EmptyIdentifier(String),

    #[error("output database location does not exist: {0}")]
    MissingDatabaseLocation(PathBuf),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}

impl BaserError {
    /// Errors that are reported per item while the batch keeps going.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            BaserError::Parse { .. }
                | BaserError::ClassificationAmbiguous(_)
                | BaserError::EmptyIdentifier(_)
        )
    }
}

fn exit_code_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "no status (terminated by signal)".to_string(),
    }
}
