use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::fiff::FiffError;
use crate::registry::Kind;

/// Failure to turn a path into an in-memory object.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("can't determine the file type of {path} from its extension")]
    UnsupportedKind { path: PathBuf },
    #[error("failed to read {path}")]
    BrokenFile {
        path: PathBuf,
        #[source]
        source: FiffError,
    },
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("destination {path} already exists")]
    FileExists { path: PathBuf },
    #[error("saving {kind} files is not supported")]
    UnsupportedOperation { kind: Kind },
    #[error("failed to save {path}")]
    Failed {
        path: PathBuf,
        #[source]
        source: FiffError,
    },
}

#[derive(Debug, Error)]
pub enum ConsoleError {
    #[error("console I/O failed")]
    Io(#[from] io::Error),
}

/// Process exit codes, one per failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ExitCode {
    Ok = 0,
    Aborted = 1,
    BadPath = 2,
    BrokenFile = 3,
    UnsupportedFile = 4,
    SaveFailed = 5,
    EmbedFailed = 6,
    FileExists = 7,
    UnsupportedOperation = 8,
}

impl From<ExitCode> for u8 {
    fn from(code: ExitCode) -> Self {
        code as u8
    }
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Read(#[from] ReadError),
    #[error(transparent)]
    Save(#[from] SaveError),
    #[error("interactive console failed")]
    Console(#[from] ConsoleError),
    #[error("writing output failed")]
    Output(#[source] io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> ExitCode {
        match self {
            CliError::Read(ReadError::UnsupportedKind { .. }) => ExitCode::UnsupportedFile,
            CliError::Read(ReadError::BrokenFile { .. }) => ExitCode::BrokenFile,
            CliError::Save(SaveError::FileExists { .. }) => ExitCode::FileExists,
            CliError::Save(SaveError::UnsupportedOperation { .. }) => {
                ExitCode::UnsupportedOperation
            }
            CliError::Save(SaveError::Failed { .. }) => ExitCode::SaveFailed,
            CliError::Console(_) => ExitCode::EmbedFailed,
            CliError::Output(_) => ExitCode::Aborted,
        }
    }

    /// What the user can do about it, if anything.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            CliError::Read(ReadError::UnsupportedKind { .. }) => {
                Some("specify the file type manually with --ftype (raw, epochs, annots or ica)")
            }
            CliError::Read(ReadError::BrokenFile { .. }) => {
                Some("the file may be corrupt or of another type than assumed")
            }
            CliError::Save(SaveError::FileExists { .. }) => {
                Some("pass --overwrite to replace it")
            }
            CliError::Save(SaveError::UnsupportedOperation { .. }) => {
                Some("copy the file with regular file tools instead")
            }
            _ => None,
        }
    }
}
