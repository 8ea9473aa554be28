//! subst is a filter that expands `${VAR}` references from the environment and
//! then renders the result as a template.
//! The expansion stage is a standalone, infallible scanner; the template stage
//! adds process details and a small library of helper functions.

/// Command-line interface module for the subst application
pub mod cli;

/// Environment and process details captured at start-up
pub mod context;

/// Error types and handling for the subst application
pub mod error;

/// `${VAR}` expansion
pub mod expand;

/// Functions and filters available inside templates
pub mod functions;

/// Expansion and rendering orchestration
pub mod processor;

/// Template rendering functionality
pub mod renderer;
