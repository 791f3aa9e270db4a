use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tracing::info;

use crate::config::AppConfig;
use crate::console::Console;
use crate::dispatch;
use crate::error::CliError;
use crate::fiff::SplitSize;
use crate::registry::Kind;
use crate::save;

const FTYPE_HELP: &str = "Manually specify file type instead of guessing it from extension";

#[derive(Debug, Parser)]
#[command(name = "quickfif")]
#[command(version, about = "Preview, inspect and copy MNE fif files")]
#[command(long_about = "Preview, inspect and copy MNE fif files.\n\n\
    Without a command the file summary is printed.")]
pub struct Cli {
    #[arg(value_parser = existing_file, help = "File to open")]
    pub fpath: PathBuf,

    #[arg(short = 't', long, value_enum, help = FTYPE_HELP)]
    pub ftype: Option<Kind>,

    #[arg(short, long, global = true, help = "Log debug messages to stderr")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Inspect the file in an interactive console
    Inspect,
    /// Save the file under a different name. Works with split recordings.
    #[command(alias = "copy")]
    Saveas {
        #[arg(help = "Destination file or directory")]
        dst: PathBuf,
        #[arg(short, long, help = "Overwrite destination file")]
        overwrite: bool,
        #[arg(long, help = "Maximum size of each written file, e.g. 2GB or 500MB")]
        split_size: Option<SplitSize>,
    },
}

fn existing_file(arg: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(arg);
    if !path.exists() {
        Err(format!("path '{}' does not exist", arg))
    } else if path.is_dir() {
        Err(format!("'{}' is a directory", arg))
    } else {
        Ok(path)
    }
}

/// Executes a parsed command line, writing user-facing output to `out`.
pub fn run(
    cli: &Cli,
    config: &AppConfig,
    console: &mut dyn Console,
    out: &mut dyn Write,
) -> Result<(), CliError> {
    let obj = dispatch::resolve(&cli.fpath, cli.ftype)?;

    match &cli.command {
        None => writeln!(out, "{}", obj.summary()).map_err(CliError::Output)?,
        Some(Commands::Inspect) => console.embed(&obj.to_namespace())?,
        Some(Commands::Saveas {
            dst,
            overwrite,
            split_size,
        }) => {
            let split_size = split_size.unwrap_or(config.split_size);
            let written = save::save(&obj, dst, *overwrite, split_size)?;
            info!(src = %cli.fpath.display(), files = written.len(), "copy finished");
            for path in &written {
                writeln!(out, "Saved {}", path.display()).map_err(CliError::Output)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn copy_is_an_alias_of_saveas() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("x_raw.fif");
        std::fs::write(&src, b"").unwrap();
        let src = src.to_str().unwrap();

        let cli = Cli::try_parse_from(["quickfif", src, "copy", "out_raw.fif", "-o"]).unwrap();
        match cli.command {
            Some(Commands::Saveas { dst, overwrite, split_size }) => {
                assert_eq!(dst, PathBuf::from("out_raw.fif"));
                assert!(overwrite);
                assert_eq!(split_size, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn directory_path_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let err = Cli::try_parse_from(["quickfif", dir.path().to_str().unwrap()]).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn ftype_and_split_size_parse() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("data.bin");
        std::fs::write(&src, b"").unwrap();
        let cli = Cli::try_parse_from([
            "quickfif",
            "-t",
            "epochs",
            src.to_str().unwrap(),
            "saveas",
            "--split-size",
            "5MB",
            "out-epo.fif",
        ])
        .unwrap();
        assert_eq!(cli.ftype, Some(Kind::Epochs));
        assert!(matches!(
            cli.command,
            Some(Commands::Saveas { split_size: Some(s), .. }) if s == "5MB".parse::<SplitSize>().unwrap()
        ));
    }
}
