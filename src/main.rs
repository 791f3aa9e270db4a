use clap::Parser;
use std::io;
use std::process;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use quickfif::cli::{self, Cli};
use quickfif::config::AppConfig;
use quickfif::console::StdConsole;
use quickfif::ExitCode;

fn setup_tracing(verbose: bool, config_filter: Option<&str>) {
    let fallback = || EnvFilter::new(if verbose { "quickfif=debug" } else { "warn" });
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match config_filter {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| fallback()),
        None => fallback(),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn exit(code: ExitCode) -> process::ExitCode {
    process::ExitCode::from(u8::from(code))
}

fn main() -> process::ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                exit(ExitCode::BadPath)
            } else {
                exit(ExitCode::Ok)
            };
        }
    };

    let config = AppConfig::read();
    setup_tracing(
        cli.verbose,
        config.as_ref().ok().and_then(|c| c.log_filter.as_deref()),
    );
    let config = config.unwrap_or_else(|e| {
        warn!(error = %e, "using default settings");
        AppConfig::default()
    });

    let mut console = StdConsole::new(io::stdin().lock(), io::stdout(), config.console_prompt.as_str());
    match cli::run(&cli, &config, &mut console, &mut io::stdout()) {
        Ok(()) => exit(ExitCode::Ok),
        Err(e) => {
            let code = e.exit_code();
            let hint = e.hint();
            eprintln!("Error: {:#}", anyhow::Error::from(e));
            if let Some(hint) = hint {
                eprintln!("Hint: {}", hint);
            }
            exit(code)
        }
    }
}
