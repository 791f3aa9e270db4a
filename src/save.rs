use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::SaveError;
use crate::fiff::{FiffError, SplitNaming, SplitSize};
use crate::kinds::{QfObject, SaveOptions};
use crate::registry::Registry;

/// Copies `obj` to `dst`, returning the files written.
///
/// A directory `dst` receives a file named like the source. The split naming
/// follows the destination: a BIDS suffix of the kind selects BIDS naming,
/// anything else Neuromag naming.
pub fn save(
    obj: &QfObject,
    dst: &Path,
    overwrite: bool,
    split_size: SplitSize,
) -> Result<Vec<PathBuf>, SaveError> {
    save_with(Registry::builtin(), obj, dst, overwrite, split_size)
}

pub fn save_with(
    registry: &Registry,
    obj: &QfObject,
    dst: &Path,
    overwrite: bool,
    split_size: SplitSize,
) -> Result<Vec<PathBuf>, SaveError> {
    let kind = obj.kind();
    let entry = registry
        .entry(kind)
        .ok_or(SaveError::UnsupportedOperation { kind })?;
    let save_fn = entry.save.ok_or(SaveError::UnsupportedOperation { kind })?;

    if dst.is_file() && !overwrite {
        return Err(SaveError::FileExists {
            path: dst.to_path_buf(),
        });
    }

    let dst = match (dst.is_dir(), obj.fpath().file_name()) {
        (true, Some(name)) => dst.join(name),
        _ => dst.to_path_buf(),
    };

    let name = dst.to_string_lossy();
    let split_naming = if entry.bids_extensions.iter().any(|ext| name.ends_with(ext)) {
        SplitNaming::Bids
    } else {
        SplitNaming::Neuromag
    };
    debug!(dst = %dst.display(), %kind, %split_naming, %split_size, "saving");

    let opts = SaveOptions {
        overwrite,
        split_naming,
        split_size,
    };
    save_fn(obj, &dst, &opts).map_err(|source| match source {
        FiffError::FileExists(path) => SaveError::FileExists { path },
        source => SaveError::Failed {
            path: dst.clone(),
            source,
        },
    })
}
