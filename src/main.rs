//! subst's main application entry point.
//! Parses arguments, sets up logging, and streams stdin through the processor.

use std::io::{self, IsTerminal};

use log::debug;
use subst::{
    cli::{get_args, Args},
    context::Snapshot,
    error::{default_error_handler, Result},
    processor::Processor,
    renderer::MiniJinjaRenderer,
};

/// Main application entry point.
fn main() {
    let args = get_args();

    // Logs go to stderr; stdout carries only the output.
    env_logger::Builder::new()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Warn
        })
        .init();

    if let Err(err) = run(args) {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// Piped input is read whole and processed once. A terminal on stdin is
/// processed line by line until EOF, so each line is answered as it is typed.
fn run(args: Args) -> Result<()> {
    let mode = args.mode()?;
    let snapshot = Snapshot::capture()?.shared();
    let renderer = MiniJinjaRenderer::new(snapshot.clone());
    let processor = Processor::new(&renderer, &snapshot, mode, args.debug);

    let stdin = io::stdin();
    let stdout = io::stdout().lock();

    if stdin.is_terminal() {
        debug!("stdin is a terminal, processing line by line");
        processor.process_lines(stdin.lock(), stdout)
    } else {
        processor.process_all(stdin.lock(), stdout)
    }
}
