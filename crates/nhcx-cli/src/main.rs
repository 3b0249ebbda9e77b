//! NHCX clinical document converter CLI.

use clap::{ColorChoice, Parser};
use std::io::{self, IsTerminal};
use tracing::level_filters::LevelFilter;

use nhcx_cli::cli::{Cli, Command, LogFormatArg};
use nhcx_cli::commands::{run_claim, run_codes, run_convert, run_validate};
use nhcx_cli::logging::{LogConfig, LogFormat, init_logging};

fn main() {
    let cli = Cli::parse();
    cli.color.write_global();
    init_logging(&log_config_from_cli(&cli));

    let dictionary_dir = cli.dictionary_dir.as_deref();
    let result = match &cli.command {
        Command::Convert(args) => run_convert(args, dictionary_dir),
        Command::Claim(args) => run_claim(args, dictionary_dir),
        Command::Validate(args) => run_validate(args),
        Command::Codes(args) => run_codes(args, dictionary_dir),
    };

    let exit_code = match result {
        Ok(run) => {
            if run.has_errors {
                1
            } else {
                0
            }
        }
        Err(error) => {
            eprintln!("error: {error:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

/// Build logging configuration from CLI flags with consistent precedence.
fn log_config_from_cli(cli: &Cli) -> LogConfig {
    let mut config = LogConfig {
        level_filter: level_filter_from_verbosity(cli),
        ..LogConfig::default()
    };
    config.use_env_filter = !cli.verbosity.is_present();
    config.format = match cli.log_format {
        LogFormatArg::Pretty => LogFormat::Pretty,
        LogFormatArg::Compact => LogFormat::Compact,
        LogFormatArg::Json => LogFormat::Json,
    };
    config.with_ansi = match cli.color.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => io::stderr().is_terminal(),
    };
    config
}

fn level_filter_from_verbosity(cli: &Cli) -> LevelFilter {
    cli.verbosity.tracing_level_filter()
}
