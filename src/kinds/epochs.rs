use ndarray::{s, Array3};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{MeasInfo, QfObject, SaveOptions};
use crate::console::{Namespace, Value};
use crate::fiff::constants::*;
use crate::fiff::{self, FiffError, Node, Tag};

pub const BIDS_EXT: &[&str] = &["_epo.fif", "_epo.fif.gz"];
pub const NEUROMAG_EXT: &[&str] = &["-epo.fif", "-epo.fif.gz"];
pub const EXTENSIONS: &[&str] = &["_epo.fif", "_epo.fif.gz", "-epo.fif", "-epo.fif.gz"];

/// One row of the events array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub sample: i32,
    pub previous: i32,
    pub id: i32,
}

/// Fixed-length segments cut around events: `n_epochs x n_channels x n_times`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Epochs {
    pub info: MeasInfo,
    pub events: Vec<Event>,
    pub event_id: BTreeMap<String, i32>,
    pub tmin: f64,
    pub data: Array3<f64>,
}

impl Epochs {
    pub fn n_epochs(&self) -> usize {
        self.data.dim().0
    }

    pub fn n_times(&self) -> usize {
        self.data.dim().2
    }

    pub fn tmax(&self) -> f64 {
        self.tmin + self.n_times().saturating_sub(1) as f64 / self.info.sfreq
    }

    /// Epoch count per event name; ids missing from `event_id` are listed by number.
    pub fn event_counts(&self) -> Vec<(String, usize)> {
        let mut counts: Vec<(String, usize)> = self
            .event_id
            .iter()
            .map(|(name, id)| (name.clone(), self.events.iter().filter(|e| e.id == *id).count()))
            .collect();
        let mut unnamed: BTreeMap<i32, usize> = BTreeMap::new();
        for event in &self.events {
            if !self.event_id.values().any(|id| *id == event.id) {
                *unnamed.entry(event.id).or_default() += 1;
            }
        }
        counts.extend(unnamed.into_iter().map(|(id, n)| (id.to_string(), n)));
        counts
    }

    fn validate(&self) -> Result<(), FiffError> {
        let (n_epochs, nch, _) = self.data.dim();
        if n_epochs != self.events.len() {
            return Err(FiffError::Inconsistent(format!(
                "{} epochs but {} events",
                n_epochs,
                self.events.len()
            )));
        }
        if nch != self.info.nchan() {
            return Err(FiffError::Inconsistent(format!(
                "data has {} channels but info describes {}",
                nch,
                self.info.nchan()
            )));
        }
        Ok(())
    }

    fn event_id_json(&self) -> Result<String, FiffError> {
        serde_json::to_string(&self.event_id).map_err(|e| FiffError::Malformed(e.to_string()))
    }

    fn head_tags(&self, epochs: Range<usize>) -> Result<Vec<Tag>, FiffError> {
        let flat: Vec<i32> = self.events[epochs]
            .iter()
            .flat_map(|e| [e.sample, e.previous, e.id])
            .collect();
        let mut tags = vec![Tag::block_start(FIFFB_MEAS)];
        tags.extend(self.info.to_tags());
        tags.extend([
            Tag::block_start(FIFFB_MNE_EVENTS),
            Tag::ints(FIFF_MNE_EVENT_LIST, &flat),
            Tag::string(FIFF_DESCRIPTION, &self.event_id_json()?),
            Tag::block_end(FIFFB_MNE_EVENTS),
            Tag::block_start(FIFFB_MNE_EPOCHS),
            Tag::double(FIFF_FIRST_TIME, self.tmin),
        ]);
        Ok(tags)
    }

    fn epoch_tag(&self, index: usize) -> Tag {
        let epoch = self.data.slice(s![index, .., ..]);
        Tag::floats(FIFF_EPOCH, epoch.iter().map(|v| *v as f32))
    }

    fn tail_tags() -> [Tag; 2] {
        [Tag::block_end(FIFFB_MNE_EPOCHS), Tag::block_end(FIFFB_MEAS)]
    }
}

impl fmt::Display for Epochs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mb = (self.data.len() * 8) as f64 / (1 << 20) as f64;
        let counts = self
            .event_counts()
            .iter()
            .map(|(name, n)| format!("'{}': {}", name, n))
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "<Epochs | {} events (all good), {:.3} - {:.3} s, ~{:.1} MB, data loaded, {}>",
            self.n_epochs(),
            self.tmin,
            self.tmax(),
            mb,
            counts
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QfEpochs {
    pub fpath: PathBuf,
    pub epochs: Epochs,
}

impl QfEpochs {
    pub fn summary(&self) -> String {
        let mut res = vec![self.epochs.to_string(), self.epochs.info.to_string()];
        res.extend(
            self.epochs
                .event_counts()
                .into_iter()
                .map(|(name, n)| format!("{:>10}: {}", name, n)),
        );
        res.join("\n")
    }

    pub fn to_namespace(&self) -> Namespace<'_> {
        Namespace::new()
            .with("fpath", Value::Path(&self.fpath))
            .with("epochs", Value::Object(&self.epochs))
    }
}

fn read_events(meas: &Node) -> Result<(Vec<Event>, BTreeMap<String, i32>), FiffError> {
    let block = meas.require(FIFFB_MNE_EVENTS)?;
    let flat = block.require_tag(FIFF_MNE_EVENT_LIST)?.as_i32s()?;
    if flat.len() % 3 != 0 {
        return Err(FiffError::Malformed(format!(
            "event list of {} values is not a multiple of 3",
            flat.len()
        )));
    }
    let events = flat
        .chunks_exact(3)
        .map(|e| Event {
            sample: e[0],
            previous: e[1],
            id: e[2],
        })
        .collect();
    let event_id = match block.tag(FIFF_DESCRIPTION) {
        Some(tag) => serde_json::from_str(tag.as_str()?)
            .map_err(|e| FiffError::Malformed(format!("bad event id mapping: {}", e)))?,
        None => BTreeMap::new(),
    };
    Ok((events, event_id))
}

/// Reads epochs, following split files from the first one.
pub fn read(fpath: &Path) -> Result<QfEpochs, FiffError> {
    let chain = fiff::read_chain(fpath)?;
    let mut info: Option<MeasInfo> = None;
    let mut tmin = 0.0;
    let mut event_id = BTreeMap::new();
    let mut events = Vec::new();
    let mut samples: Vec<f64> = Vec::new();
    let mut epoch_len: Option<usize> = None;

    for (path, root) in &chain {
        let meas = root.require(FIFFB_MEAS)?;
        let part_info = MeasInfo::from_node(meas)?;
        let (part_events, part_event_id) = read_events(meas)?;
        let block = meas.require(FIFFB_MNE_EPOCHS)?;
        let part_tmin = block.require_tag(FIFF_FIRST_TIME)?.as_f64()?;

        if let Some(first) = &info {
            if first.nchan() != part_info.nchan() || tmin != part_tmin {
                return Err(FiffError::Inconsistent(format!(
                    "{} does not match the first split file",
                    path.display()
                )));
            }
        } else {
            if part_info.nchan() == 0 {
                return Err(FiffError::Inconsistent("epochs have no channels".to_string()));
            }
            info = Some(part_info);
            tmin = part_tmin;
            event_id = part_event_id;
        }

        let epoch_tags: Vec<&Tag> = block.tags_of(FIFF_EPOCH).collect();
        if epoch_tags.len() != part_events.len() {
            return Err(FiffError::Inconsistent(format!(
                "{} holds {} epochs but {} events",
                path.display(),
                epoch_tags.len(),
                part_events.len()
            )));
        }
        for tag in epoch_tags {
            let values = tag.as_f32s()?;
            match epoch_len {
                Some(len) if len != values.len() => {
                    return Err(FiffError::Inconsistent("epochs differ in length".to_string()));
                }
                _ => epoch_len = Some(values.len()),
            }
            samples.extend(values.into_iter().map(f64::from));
        }
        events.extend(part_events);
    }

    let info = info.ok_or_else(|| FiffError::Malformed("no files in recording".to_string()))?;
    let nch = info.nchan();
    let epoch_len = epoch_len.unwrap_or(0);
    if epoch_len % nch != 0 {
        return Err(FiffError::Inconsistent(format!(
            "epoch of {} values does not fit {} channels",
            epoch_len, nch
        )));
    }
    let data = Array3::from_shape_vec((events.len(), nch, epoch_len / nch), samples)
        .map_err(|e| FiffError::Inconsistent(e.to_string()))?;

    Ok(QfEpochs {
        fpath: fpath.to_path_buf(),
        epochs: Epochs {
            info,
            events,
            event_id,
            tmin,
            data,
        },
    })
}

/// Writes the epochs to `dst`, splitting between epochs when needed.
pub fn save(obj: &QfEpochs, dst: &Path, opts: &SaveOptions) -> Result<Vec<PathBuf>, FiffError> {
    let epochs = &obj.epochs;
    epochs.validate()?;

    let chunk_lens: Vec<u64> = (0..epochs.n_epochs())
        .map(|i| epochs.epoch_tag(i).encoded_len() + 12)
        .collect();
    let overhead: u64 = epochs
        .head_tags(0..0)?
        .iter()
        .chain(&Epochs::tail_tags())
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
            writer.write_tags(&epochs.head_tags(range.clone())?)?;
            for i in range {
                writer.write_tag(&epochs.epoch_tag(i))?;
            }
            writer.write_tags(&Epochs::tail_tags())
        },
    )?;
    info!(
        dst = %dst.display(),
        files = written.len(),
        naming = %opts.split_naming,
        "saved epochs"
    );
    Ok(written)
}

pub(crate) fn read_obj(fpath: &Path) -> Result<QfObject, FiffError> {
    read(fpath).map(QfObject::Epochs)
}

pub(crate) fn save_obj(
    obj: &QfObject,
    dst: &Path,
    opts: &SaveOptions,
) -> Result<Vec<PathBuf>, FiffError> {
    match obj {
        QfObject::Epochs(epochs) => save(epochs, dst, opts),
        other => Err(super::kind_mismatch(other)),
    }
}
