use std::path::Path;
use tracing::debug;

use crate::error::ReadError;
use crate::kinds::QfObject;
use crate::registry::{Kind, Registry};

/// Reads `path` as `kind`, or as the kind its suffix maps to.
pub fn resolve(path: &Path, kind: Option<Kind>) -> Result<QfObject, ReadError> {
    resolve_with(Registry::builtin(), path, kind)
}

/// [`resolve`] against an arbitrary registry.
///
/// An explicit kind is used as is, even when the suffix points elsewhere.
pub fn resolve_with(
    registry: &Registry,
    path: &Path,
    kind: Option<Kind>,
) -> Result<QfObject, ReadError> {
    let unsupported = || ReadError::UnsupportedKind {
        path: path.to_path_buf(),
    };
    let kind = match kind {
        Some(kind) => {
            debug!(path = %path.display(), %kind, "file type given explicitly");
            kind
        }
        None => {
            let kind = registry.parse_kind(path).ok_or_else(unsupported)?;
            debug!(path = %path.display(), %kind, "file type guessed from extension");
            kind
        }
    };
    let entry = registry.entry(kind).ok_or_else(unsupported)?;
    (entry.read)(path).map_err(|source| ReadError::BrokenFile {
        path: path.to_path_buf(),
        source,
    })
}
