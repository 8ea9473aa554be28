//! Command-line interface implementation for subst.
//! Provides argument parsing and help text formatting using clap.

use clap::Parser;

use crate::error::Result;
use crate::processor::Mode;

const AFTER_HELP: &str = "\
Standard input is copied to standard output, with references to environment
variables of the form ${VARIABLE} replaced by their values first (as in
`envsubst`), and the result then rendered as a MiniJinja template.
Write $${VARIABLE} to keep a literal ${VARIABLE}.

Templates see the environment as `env`, details about the running process as
`proc` and the --debug flag as `debug`. Besides the usual filters, `sh()`
runs its argument with `sh -c '...'` and inserts what it prints (use at your
own peril!), and required_envs(), required_vals() and required_files() stop
rendering when something a template needs is missing.";

/// Command-line arguments structure for subst.
#[derive(Parser, Debug)]
#[command(
    author,
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), "\n  └ rendering with MiniJinja 2"),
    about = "Substitutes the values of environment variables, then renders a template",
    long_about = None,
    after_help = AFTER_HELP
)]
pub struct Args {
    /// Skip templating (good for debugging expansion)
    #[arg(short, long)]
    pub expand_only: bool,

    /// Skip environment variable expansion
    #[arg(short, long)]
    pub template_only: bool,

    /// Set `debug` to true in the template context
    #[arg(long)]
    pub debug: bool,

    /// Enable verbose logging output on stderr
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Stages selected by the flags.
    ///
    /// # Errors
    /// * `Error::OptionsError` if both `--expand-only` and `--template-only` are given
    pub fn mode(&self) -> Result<Mode> {
        Mode::new(!self.template_only, !self.expand_only)
    }
}

/// Parses command line arguments, exiting through clap on bad usage,
/// `--help` and `--version`.
pub fn get_args() -> Args {
    Args::parse()
}
