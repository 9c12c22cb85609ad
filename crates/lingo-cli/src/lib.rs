//! Library interface for lingo-cli
//!
//! Exposes the argument parser, the demonstration handlers and the REPL loop so
//! they can be exercised without spawning the binary.
#![cfg_attr(
    test,
    allow(
        clippy::expect_used,
        clippy::unwrap_used,
        clippy::panic,
        clippy::missing_panics_doc,
        clippy::missing_errors_doc,
        reason = "Allow for tests"
    )
)]

/// Command-line arguments.
pub mod cli;
/// Handlers shipped with the command-line front end.
pub mod handlers;
/// Tracing setup.
pub mod logging;
/// Line-oriented read-eval-print loop.
pub mod repl;

pub use cli::Cli;
pub use repl::{run_once, run_repl};
