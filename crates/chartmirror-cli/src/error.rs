//! CLI error types with exit code handling
//!
//! This module provides a unified error type for CLI operations that
//! maps errors to appropriate exit codes.

use miette::Diagnostic;
use thiserror::Error;

use chartmirror_engine::EngineError;
use chartmirror_repo::{ErrorCategory, RepoError};

use crate::exit_codes;

/// CLI-specific error type that includes exit code information
#[derive(Error, Debug, Diagnostic, Clone)]
pub enum CliError {
    /// Arguments parsed but make no sense together
    #[error("Validation failed: {message}")]
    #[diagnostic(code(chartmirror::cli::validation))]
    Validation {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Template rendering or index parsing failed
    #[error("Template error: {message}")]
    #[diagnostic(code(chartmirror::cli::template))]
    Template {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Chart structure or loading error
    #[error("Chart error: {message}")]
    #[diagnostic(code(chartmirror::cli::chart))]
    Chart {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// IO error (file not found, permissions, etc.)
    #[error("IO error: {message}")]
    #[diagnostic(code(chartmirror::cli::io))]
    Io { message: String },

    /// Remote repository unreachable or refusing
    #[error("Network error: {message}")]
    #[diagnostic(code(chartmirror::cli::network))]
    Network {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Missing or malformed command line
    #[error("{message}")]
    #[diagnostic(code(chartmirror::cli::usage))]
    Usage {
        message: String,
        #[help]
        help: Option<String>,
    },

    /// Internal error (runtime, unexpected failure)
    #[error("Internal error: {message}")]
    #[diagnostic(code(chartmirror::cli::internal))]
    Internal { message: String },
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            CliError::Validation { .. } => exit_codes::VALIDATION_ERROR,
            CliError::Template { .. } => exit_codes::TEMPLATE_ERROR,
            CliError::Chart { .. } => exit_codes::CHART_ERROR,
            CliError::Io { .. } => exit_codes::IO_ERROR,
            CliError::Network { .. } => exit_codes::NETWORK_ERROR,
            CliError::Usage { .. } => exit_codes::USAGE_ERROR,
            CliError::Internal { .. } => exit_codes::ERROR,
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Create a validation error with help text
    pub fn validation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create a usage error with help text
    pub fn usage(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an IO error that names the file involved
    pub fn io_at(path: &std::path::Path, err: impl std::fmt::Display) -> Self {
        Self::Io {
            message: format!("{}: {}", path.display(), err),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io {
            message: err.to_string(),
        }
    }
}

impl From<RepoError> for CliError {
    fn from(err: RepoError) -> Self {
        let message = err.to_string();
        match err.category() {
            ErrorCategory::Validation => {
                let help = match err {
                    RepoError::VersionWithoutName { .. } => {
                        Some("add --chart-name to pick the chart the version belongs to".to_string())
                    }
                    RepoError::VersionNotFound { .. } => {
                        Some("use --ignore-errors to continue without it".to_string())
                    }
                    RepoError::InvalidDestination { .. } => {
                        Some("give the destination as a full path".to_string())
                    }
                    _ => None,
                };
                CliError::Validation { message, help }
            }
            ErrorCategory::Network => {
                let help = match err {
                    RepoError::AuthRequired { .. } => Some(
                        "pass --username/--password or set CHARTMIRROR_USERNAME/CHARTMIRROR_PASSWORD"
                            .to_string(),
                    ),
                    RepoError::IntegrityCheckFailed { .. } => {
                        Some("the archive differs from the digest recorded in the index".to_string())
                    }
                    _ => None,
                };
                CliError::Network { message, help }
            }
            ErrorCategory::Parse => CliError::Template {
                message,
                help: Some("the repository index is not valid YAML".to_string()),
            },
            ErrorCategory::Io => CliError::Io { message },
        }
    }
}

impl From<EngineError> for CliError {
    fn from(err: EngineError) -> Self {
        match &err {
            EngineError::Template { source, .. } => CliError::Template {
                message: err.to_string(),
                help: Some(format!("error kind: {}", source.kind().to_code_string())),
            },
            EngineError::Chart { .. } => CliError::Chart {
                message: err.to_string(),
                help: Some("the target must be a chart directory, a chart archive or a directory of archives".to_string()),
            },
            EngineError::Io { .. } => CliError::Io {
                message: err.to_string(),
            },
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;
