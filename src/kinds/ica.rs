use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{MeasInfo, QfObject};
use crate::console::{Namespace, Value};
use crate::fiff::constants::*;
use crate::fiff::{self, FiffError, FiffWriter, Tag};

pub const EXTENSIONS: &[&str] = &["_ica.fif", "-ica.fif"];

/// Fit parameters stored alongside the matrices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IcaParams {
    pub method: String,
    pub n_samples: usize,
    #[serde(default)]
    pub n_iter: Option<u32>,
    #[serde(default)]
    pub exclude: Vec<usize>,
}

/// A fitted ICA decomposition.
#[derive(Debug, Clone, PartialEq)]
pub struct Ica {
    pub info: MeasInfo,
    pub params: IcaParams,
    /// `n_components x n_channels`
    pub unmixing: Array2<f64>,
    /// `n_channels x n_components`
    pub mixing: Array2<f64>,
}

impl Ica {
    pub fn n_components(&self) -> usize {
        self.unmixing.nrows()
    }

    fn validate(&self) -> Result<(), FiffError> {
        let nch = self.info.nchan();
        let n = self.n_components();
        if self.unmixing.ncols() != nch || self.mixing.dim() != (nch, n) {
            return Err(FiffError::Inconsistent(format!(
                "unmixing {:?} and mixing {:?} do not fit {} channels",
                self.unmixing.dim(),
                self.mixing.dim(),
                nch
            )));
        }
        if let Some(bad) = self.params.exclude.iter().find(|c| **c >= n) {
            return Err(FiffError::Inconsistent(format!(
                "excluded component {} out of {}",
                bad, n
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Ica {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fit = match self.params.n_iter {
            Some(n_iter) => format!(
                "fit in {} iterations on {} samples",
                n_iter, self.params.n_samples
            ),
            None => format!("fit on {} samples", self.params.n_samples),
        };
        let types = self
            .info
            .type_counts()
            .iter()
            .map(|(ty, _)| ty.to_string().to_lowercase())
            .collect::<Vec<_>>()
            .join(", ");
        let exclude = match self.params.exclude.len() {
            0 => "no sources marked for exclusion".to_string(),
            n => format!("{} sources marked for exclusion", n),
        };
        write!(
            f,
            "<ICA | method: {} ({}), {} ICA components, channel types: {}, {}>",
            self.params.method,
            fit,
            self.n_components(),
            types,
            exclude
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QfIca {
    pub fpath: PathBuf,
    pub ica: Ica,
}

impl QfIca {
    pub fn summary(&self) -> String {
        self.ica.to_string()
    }

    pub fn to_namespace(&self) -> Namespace<'_> {
        Namespace::new()
            .with("fpath", Value::Path(&self.fpath))
            .with("ica", Value::Object(&self.ica))
    }
}

pub fn read(fpath: &Path) -> Result<QfIca, FiffError> {
    let root = fiff::open(fpath)?;
    let block = root.require(FIFFB_MNE_ICA)?;
    let info = MeasInfo::from_node(block)?;
    let params: IcaParams =
        serde_json::from_str(block.require_tag(FIFF_MNE_ICA_INTERFACE_PARAMS)?.as_str()?)
            .map_err(|e| FiffError::Malformed(format!("bad ICA parameters: {}", e)))?;
    let ica = Ica {
        info,
        params,
        unmixing: block.require_tag(FIFF_MNE_ICA_UNMIXING)?.as_double_matrix()?,
        mixing: block.require_tag(FIFF_MNE_ICA_MIXING)?.as_double_matrix()?,
    };
    ica.validate()?;
    Ok(QfIca {
        fpath: fpath.to_path_buf(),
        ica,
    })
}

/// Writes a decomposition to a single file.
///
/// Not wired into the save registry: copying an ICA file through the CLI is
/// reported as unsupported.
pub fn write(obj: &QfIca, dst: &Path, overwrite: bool) -> Result<PathBuf, FiffError> {
    let ica = &obj.ica;
    ica.validate()?;
    let params =
        serde_json::to_string(&ica.params).map_err(|e| FiffError::Malformed(e.to_string()))?;

    let mut writer = FiffWriter::create(dst, overwrite, 0)?;
    writer.start_block(FIFFB_MNE_ICA)?;
    writer.write_tags(&ica.info.to_tags())?;
    writer.write_tag(&Tag::string(FIFF_MNE_ICA_INTERFACE_PARAMS, &params))?;
    writer.write_tag(&Tag::double_matrix(FIFF_MNE_ICA_UNMIXING, &ica.unmixing))?;
    writer.write_tag(&Tag::double_matrix(FIFF_MNE_ICA_MIXING, &ica.mixing))?;
    writer.end_block(FIFFB_MNE_ICA)?;
    writer.finish()?;
    info!(path = %dst.display(), components = ica.n_components(), "wrote ICA");
    Ok(dst.to_path_buf())
}

pub(crate) fn read_obj(fpath: &Path) -> Result<QfObject, FiffError> {
    read(fpath).map(QfObject::Ica)
}
