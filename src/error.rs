//! Error handling for the subst application.
//! Defines custom error types and results used throughout the application.

use std::io;
use thiserror::Error;

/// Custom error types for subst operations.
///
/// Variable expansion itself never fails; these cover everything around it:
/// reading input, gathering process details and rendering templates.
#[derive(Error, Debug)]
pub enum Error {
    /// Represents errors that occur while reading input or writing output
    #[error("IO error: {0}.")]
    IoError(#[from] io::Error),

    /// Represents errors raised while parsing or executing the template,
    /// including failures reported by template functions such as `sh()`
    #[error("input is invalid: {0}")]
    TemplateError(#[from] minijinja::Error),

    /// Represents input that must be rendered as a template but is not UTF-8
    #[error("input is invalid: {0}")]
    Utf8Error(#[from] std::str::Utf8Error),

    /// Represents failures to gather details about the running process
    #[error("Process error: {0}.")]
    ProcessError(String),

    /// Represents an unusable combination of command-line options
    #[error("invalid options: {0}")]
    OptionsError(String),
}

/// Convenience type alias for Results with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Default error handler that prints the error and exits the program.
///
/// # Arguments
/// * `err` - The error to handle
///
/// # Behavior
/// Prints the error message to stderr and exits with status code 1
pub fn default_error_handler(err: Error) {
    eprintln!("subst: {err}");
    std::process::exit(1);
}
