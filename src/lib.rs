//! Preview, inspect and copy MNE fif files.
//!
//! A file's kind is taken from an explicit [`registry::Kind`] or guessed from
//! its suffix ([`dispatch::resolve`]); copies go through [`save::save`], which
//! picks the split-file naming scheme from the destination name.

pub mod cli;
pub mod config;
pub mod console;
pub mod dispatch;
pub mod error;
pub mod fiff;
pub mod kinds;
pub mod registry;
pub mod save;

pub use dispatch::resolve;
pub use error::{CliError, ExitCode, ReadError, SaveError};
pub use kinds::QfObject;
pub use registry::{Kind, Registry};
