use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Lingo assistant
#[derive(Parser, Debug)]
#[command(name = "lingo")]
#[command(about = "Vietnamese-first command assistant", long_about = None)]
pub struct Cli {
    /// Configuration file to load instead of the default one
    #[arg(short, long, help = "Configuration file [default: ~/.lingo/config.toml]")]
    pub config: Option<PathBuf>,

    /// Log to stderr instead of the debug log file
    #[arg(long, help = "Write logs to stderr instead of ~/.lingo/debug.log")]
    pub log_stderr: bool,

    /// Single request to answer before exiting
    #[arg(long, value_name = "TEXT", help = "Answer a single request and exit")]
    pub once: Option<String>,

    /// How long to wait for the handler tiers before the first request
    #[arg(
        long,
        default_value_t = 5_000,
        help = "Milliseconds to wait for handlers to load before the first request"
    )]
    pub warmup_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["lingo"]).expect("parse");
        assert!(cli.config.is_none());
        assert!(!cli.log_stderr);
        assert!(cli.once.is_none());
        assert_eq!(cli.warmup_ms, 5_000);
    }

    #[test]
    fn test_once_with_config() {
        let cli = Cli::try_parse_from([
            "lingo",
            "--config",
            "/tmp/lingo.toml",
            "--once",
            "mấy giờ rồi",
            "--log-stderr",
        ])
        .expect("parse");
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/lingo.toml")));
        assert_eq!(cli.once.as_deref(), Some("mấy giờ rồi"));
        assert!(cli.log_stderr);
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["lingo", "--bogus"]).is_err());
    }
}
