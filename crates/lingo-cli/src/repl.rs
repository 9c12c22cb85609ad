use anyhow::Result;
use lingo_routing::DispatchEngine;
use std::io::{BufRead, Write};

const BANNER: &str = "Lingo - trợ lý lệnh tiếng Việt. Gõ \"trợ giúp\" để xem hướng dẫn, \"exit\" để thoát.";
const PROMPT: &str = "> ";
const EXIT_WORDS: [&str; 4] = ["exit", "quit", "thoát", "thoat"];

/// Reads requests line by line from `input` until EOF or an exit word, writing each
/// reply to `output`.
///
/// # Errors
/// Returns an error if reading input or writing output fails.
pub fn run_repl<R: BufRead, W: Write>(engine: &DispatchEngine, input: R, mut output: W) -> Result<()> {
    writeln!(output, "{BANNER}")?;
    write!(output, "{PROMPT}")?;
    output.flush()?;

    for line in input.lines() {
        let line = line?;
        let request = line.trim();
        if EXIT_WORDS
            .iter()
            .any(|word| request.eq_ignore_ascii_case(word))
        {
            break;
        }
        if !request.is_empty() {
            let reply = engine.dispatch(request);
            writeln!(output, "{reply}")?;
        }
        write!(output, "{PROMPT}")?;
        output.flush()?;
    }

    tracing::info!("REPL finished");
    writeln!(output)?;
    Ok(())
}

/// Answers one request and writes the reply.
///
/// # Errors
/// Returns an error if writing output fails.
pub fn run_once<W: Write>(engine: &DispatchEngine, request: &str, mut output: W) -> Result<()> {
    let reply = engine.dispatch(request.trim());
    writeln!(output, "{reply}")?;
    Ok(())
}
