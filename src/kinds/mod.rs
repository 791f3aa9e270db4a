pub mod annots;
pub mod epochs;
pub mod ica;
mod info;
pub mod raw;

pub use annots::{Annotations, QfAnnots};
pub use epochs::{Epochs, Event, QfEpochs};
pub use ica::{Ica, IcaParams, QfIca};
pub use info::{ChannelType, MeasInfo};
pub use raw::{QfRaw, Raw};

use std::path::Path;

use crate::console::Namespace;
use crate::fiff::{FiffError, SplitNaming, SplitSize};
use crate::registry::Kind;

/// Everything a kind's save primitive needs besides the object and destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveOptions {
    pub overwrite: bool,
    pub split_naming: SplitNaming,
    pub split_size: SplitSize,
}

/// An opened file of any supported kind.
#[derive(Debug, Clone, PartialEq)]
pub enum QfObject {
    Raw(QfRaw),
    Epochs(QfEpochs),
    Annots(QfAnnots),
    Ica(QfIca),
}

impl QfObject {
    pub fn kind(&self) -> Kind {
        match self {
            QfObject::Raw(_) => Kind::Raw,
            QfObject::Epochs(_) => Kind::Epochs,
            QfObject::Annots(_) => Kind::Annots,
            QfObject::Ica(_) => Kind::Ica,
        }
    }

    /// The path this object was read from.
    pub fn fpath(&self) -> &Path {
        match self {
            QfObject::Raw(o) => &o.fpath,
            QfObject::Epochs(o) => &o.fpath,
            QfObject::Annots(o) => &o.fpath,
            QfObject::Ica(o) => &o.fpath,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            QfObject::Raw(o) => o.summary(),
            QfObject::Epochs(o) => o.summary(),
            QfObject::Annots(o) => o.summary(),
            QfObject::Ica(o) => o.summary(),
        }
    }

    pub fn to_namespace(&self) -> Namespace<'_> {
        match self {
            QfObject::Raw(o) => o.to_namespace(),
            QfObject::Epochs(o) => o.to_namespace(),
            QfObject::Annots(o) => o.to_namespace(),
            QfObject::Ica(o) => o.to_namespace(),
        }
    }
}

/// A save primitive was handed an object of another kind.
pub(crate) fn kind_mismatch(obj: &QfObject) -> FiffError {
    FiffError::Inconsistent(format!(
        "save primitive received a {} object read from {}",
        obj.kind(),
        obj.fpath().display()
    ))
}
