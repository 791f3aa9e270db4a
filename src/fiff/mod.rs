//! Minimal FIF-style tagged container used by every file kind.
//!
//! Only what the kinds need to round-trip their payloads is implemented:
//! sequential tags, nested blocks, gzip and split files chained by a
//! next-file reference.

pub mod constants;
mod io;
mod split;
mod tag;
mod tree;

pub use io::{file_header_len, open, FiffWriter};
pub use split::{
    plan_parts, read_chain, split_fname, write_split, SplitNaming, SplitSize,
    SplitSizeError,
};
pub use tag::Tag;
pub use tree::Node;

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FiffError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("file is empty")]
    Empty,
    #[error("not a FIF file (missing file id tag)")]
    NotFiff,
    #[error("malformed file: {0}")]
    Malformed(String),
    #[error("required block {0} not found")]
    MissingBlock(i32),
    #[error("required tag {0} not found")]
    MissingTag(i32),
    #[error("split file {0} referenced by the recording is missing")]
    MissingSplit(PathBuf),
    #[error("destination file already exists: {0}")]
    FileExists(PathBuf),
    #[error("split size of {split_size} bytes cannot hold a single data chunk of {needed} bytes")]
    SplitTooSmall { split_size: u64, needed: u64 },
    #[error("{0}")]
    Inconsistent(String),
}
