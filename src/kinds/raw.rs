use ndarray::{s, Array2};
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{Annotations, MeasInfo, QfObject, SaveOptions};
use crate::console::{Namespace, Value};
use crate::fiff::constants::*;
use crate::fiff::{self, FiffError, Tag};

pub const NEUROMAG_EXT: &[&str] = &[
    "raw.fif",
    "raw.fif.gz",
    "raw_sss.fif",
    "raw_sss.fif.gz",
    "raw_tsss.fif",
    "raw_tsss.fif.gz",
];
pub const BIDS_EXT: &[&str] = &[
    "_meg.fif",
    "_meg.fif.gz",
    "_eeg.fif",
    "_eeg.fif.gz",
    "_ieeg.fif",
    "_ieeg.fif.gz",
];
/// Neuromag extensions first, then BIDS.
pub const EXTENSIONS: &[&str] = &[
    "raw.fif",
    "raw.fif.gz",
    "raw_sss.fif",
    "raw_sss.fif.gz",
    "raw_tsss.fif",
    "raw_tsss.fif.gz",
    "_meg.fif",
    "_meg.fif.gz",
    "_eeg.fif",
    "_eeg.fif.gz",
    "_ieeg.fif",
    "_ieeg.fif.gz",
];

pub const ANNOTS_SECTION_HEADER: &str = "Annotated segments statistics";
pub const NO_ANNOTS_MSG: &str = "No annotated segments";

/// Continuous recording: `n_channels x n_samples`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Raw {
    pub info: MeasInfo,
    pub first_samp: i64,
    pub data: Array2<f64>,
    pub annotations: Annotations,
}

impl Raw {
    pub fn new(info: MeasInfo, data: Array2<f64>) -> Self {
        Raw {
            info,
            first_samp: 0,
            data,
            annotations: Annotations::new(),
        }
    }

    pub fn n_channels(&self) -> usize {
        self.data.nrows()
    }

    pub fn n_samples(&self) -> usize {
        self.data.ncols()
    }

    /// Time of the last sample relative to the first one, in seconds.
    pub fn duration(&self) -> f64 {
        match self.n_samples() {
            0 => 0.0,
            n => (n - 1) as f64 / self.info.sfreq,
        }
    }

    // one second per buffer
    fn buffers(&self) -> Vec<Range<usize>> {
        let step = (self.info.sfreq.round() as usize).max(1);
        (0..self.n_samples())
            .step_by(step)
            .map(|start| start..(start + step).min(self.n_samples()))
            .collect()
    }

    fn buffer_tag(&self, samples: Range<usize>) -> Tag {
        let block = self.data.slice(s![.., samples]);
        // sample-major, channels fastest
        Tag::floats(FIFF_DATA_BUFFER, block.t().iter().map(|v| *v as f32))
    }

    fn head_tags(&self, sample_offset: usize) -> Result<Vec<Tag>, FiffError> {
        let first = i32::try_from(self.first_samp + sample_offset as i64).map_err(|_| {
            FiffError::Inconsistent(format!("first sample {} out of range", self.first_samp))
        })?;
        let mut tags = vec![Tag::block_start(FIFFB_MEAS)];
        tags.extend(self.info.to_tags());
        tags.push(Tag::block_start(FIFFB_RAW_DATA));
        tags.push(Tag::int(FIFF_FIRST_SAMPLE, first));
        Ok(tags)
    }

    fn tail_tags(&self) -> Vec<Tag> {
        let mut tags = vec![Tag::block_end(FIFFB_RAW_DATA)];
        if !self.annotations.is_empty() {
            tags.extend(self.annotations.to_tags());
        }
        tags.push(Tag::block_end(FIFFB_MEAS));
        tags
    }
}

impl fmt::Display for Raw {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mb = (self.data.len() * 8) as f64 / (1 << 20) as f64;
        write!(
            f,
            "<Raw | {} x {} ({:.1} s), ~{:.1} MB, data loaded>",
            self.n_channels(),
            self.n_samples(),
            self.duration(),
            mb
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QfRaw {
    pub fpath: PathBuf,
    pub raw: Raw,
}

impl QfRaw {
    pub fn summary(&self) -> String {
        let raw = &self.raw;
        let header = format!(
            "Raw data of shape {} channels x {} samples ({:?} s)",
            raw.n_channels(),
            raw.n_samples(),
            round2(raw.duration())
        );
        let mut res = vec![header.clone(), "-".repeat(header.len()), raw.info.to_string()];
        if raw.annotations.is_empty() {
            res.push(NO_ANNOTS_MSG.to_string());
        } else {
            res.push(ANNOTS_SECTION_HEADER.to_string());
            res.push("-".repeat(ANNOTS_SECTION_HEADER.len()));
            res.push(raw.annotations.stats_table());
        }
        res.join("\n")
    }

    pub fn to_namespace(&self) -> Namespace<'_> {
        Namespace::new()
            .with("fpath", Value::Path(&self.fpath))
            .with("raw", Value::Object(&self.raw))
    }
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

/// Reads a recording, following split files from the first one.
pub fn read(fpath: &Path) -> Result<QfRaw, FiffError> {
    let chain = fiff::read_chain(fpath)?;
    let (_, first) = chain
        .first()
        .ok_or_else(|| FiffError::Malformed("no files in recording".to_string()))?;
    let meas = first.require(FIFFB_MEAS)?;
    let info = MeasInfo::from_node(meas)?;
    let nchan = info.nchan();
    if nchan == 0 {
        return Err(FiffError::Inconsistent("recording has no channels".to_string()));
    }
    let first_samp = meas
        .require(FIFFB_RAW_DATA)?
        .require_tag(FIFF_FIRST_SAMPLE)?
        .as_i32()? as i64;
    let annotations = match meas.find(FIFFB_MNE_ANNOTATIONS) {
        Some(node) => Annotations::from_node(node)?,
        None => Annotations::new(),
    };

    let mut samples: Vec<f64> = Vec::new();
    for (path, root) in &chain {
        let part_meas = root.require(FIFFB_MEAS)?;
        let part_nchan = part_meas
            .require(FIFFB_MEAS_INFO)?
            .require_tag(FIFF_NCHAN)?
            .as_i32()?;
        if part_nchan as usize != nchan {
            return Err(FiffError::Inconsistent(format!(
                "{} has {} channels, expected {}",
                path.display(),
                part_nchan,
                nchan
            )));
        }
        let raw_node = part_meas.require(FIFFB_RAW_DATA)?;
        let part_first = raw_node.require_tag(FIFF_FIRST_SAMPLE)?.as_i32()? as i64;
        let expected = first_samp + (samples.len() / nchan) as i64;
        if part_first != expected {
            return Err(FiffError::Inconsistent(format!(
                "{} starts at sample {}, expected {}",
                path.display(),
                part_first,
                expected
            )));
        }
        for tag in raw_node.tags_of(FIFF_DATA_BUFFER) {
            let values = tag.as_f32s()?;
            if values.len() % nchan != 0 {
                return Err(FiffError::Inconsistent(format!(
                    "data buffer of {} values does not fit {} channels",
                    values.len(),
                    nchan
                )));
            }
            samples.extend(values.into_iter().map(f64::from));
        }
    }

    let n_samp = samples.len() / nchan;
    let data = Array2::from_shape_vec((n_samp, nchan), samples)
        .map_err(|e| FiffError::Inconsistent(e.to_string()))?
        .reversed_axes();

    Ok(QfRaw {
        fpath: fpath.to_path_buf(),
        raw: Raw {
            info,
            first_samp,
            data,
            annotations,
        },
    })
}

/// Writes the recording to `dst`, splitting it when it outgrows `opts.split_size`.
pub fn save(obj: &QfRaw, dst: &Path, opts: &SaveOptions) -> Result<Vec<PathBuf>, FiffError> {
    let raw = &obj.raw;
    if raw.n_channels() != raw.info.nchan() {
        return Err(FiffError::Inconsistent(format!(
            "data has {} channels but info describes {}",
            raw.n_channels(),
            raw.info.nchan()
        )));
    }

    let buffers = raw.buffers();
    let chunk_lens: Vec<u64> = buffers
        .iter()
        .map(|b| 16 + 4 * (raw.n_channels() * b.len()) as u64)
        .collect();
    let tail = raw.tail_tags();
    let overhead: u64 = raw
        .head_tags(0)?
        .iter()
        .chain(&tail)
        .map(Tag::encoded_len)
        .sum();

    let written = fiff::write_split(
        dst,
        opts.overwrite,
        opts.split_naming,
        opts.split_size,
        overhead,
        &chunk_lens,
        |writer, range| {
            let offset = buffers.get(range.start).map(|b| b.start).unwrap_or(0);
            writer.write_tags(&raw.head_tags(offset)?)?;
            for samples in &buffers[range] {
                writer.write_tag(&raw.buffer_tag(samples.clone()))?;
            }
            writer.write_tags(&tail)
        },
    )?;
    info!(
        dst = %dst.display(),
        files = written.len(),
        naming = %opts.split_naming,
        "saved raw"
    );
    Ok(written)
}

pub(crate) fn read_obj(fpath: &Path) -> Result<QfObject, FiffError> {
    read(fpath).map(QfObject::Raw)
}

pub(crate) fn save_obj(
    obj: &QfObject,
    dst: &Path,
    opts: &SaveOptions,
) -> Result<Vec<PathBuf>, FiffError> {
    match obj {
        QfObject::Raw(raw) => save(raw, dst, opts),
        other => Err(super::kind_mismatch(other)),
    }
}
