use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

use super::constants::*;
use super::{file_header_len, open, FiffError, FiffWriter, Node, Tag};

/// How the files of a split recording are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitNaming {
    /// `name_split-01_meg.fif`, `name_split-02_meg.fif`, ...
    Bids,
    /// `name_raw.fif`, `name_raw-1.fif`, ...
    Neuromag,
}

impl fmt::Display for SplitNaming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitNaming::Bids => write!(f, "bids"),
            SplitNaming::Neuromag => write!(f, "neuromag"),
        }
    }
}

const KB: u64 = 1 << 10;
const MB: u64 = 1 << 20;
const GB: u64 = 1 << 30;
// file offsets are 32-bit
const MAX_SPLIT_SIZE: u64 = 2 * GB;

#[derive(Debug, Error, PartialEq)]
pub enum SplitSizeError {
    #[error("invalid split size '{0}', expected e.g. 2GB, 500MB, 64kB or a byte count")]
    Invalid(String),
    #[error("split size must be positive")]
    Zero,
    #[error("split size {0} exceeds the 2GB limit of the format")]
    TooLarge(String),
}

/// Maximum size of a single file of a split recording, in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SplitSize(u64);

impl SplitSize {
    pub fn bytes(&self) -> u64 {
        self.0
    }
}

impl Default for SplitSize {
    fn default() -> Self {
        SplitSize(2 * GB)
    }
}

impl FromStr for SplitSize {
    type Err = SplitSizeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let (digits, unit) = match trimmed {
            t if t.ends_with("GB") => (&t[..t.len() - 2], GB),
            t if t.ends_with("MB") => (&t[..t.len() - 2], MB),
            t if t.ends_with("kB") || t.ends_with("KB") => (&t[..t.len() - 2], KB),
            t => (t, 1),
        };
        let n: f64 = digits
            .trim()
            .parse()
            .map_err(|_| SplitSizeError::Invalid(s.to_string()))?;
        if !n.is_finite() || n < 0.0 {
            return Err(SplitSizeError::Invalid(s.to_string()));
        }
        // whole bytes, truncated
        let bytes = (n * unit as f64).floor();
        if bytes > MAX_SPLIT_SIZE as f64 {
            return Err(SplitSizeError::TooLarge(s.to_string()));
        }
        match bytes as u64 {
            0 => Err(SplitSizeError::Zero),
            b => Ok(SplitSize(b)),
        }
    }
}

impl TryFrom<String> for SplitSize {
    type Error = SplitSizeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SplitSize> for String {
    fn from(value: SplitSize) -> Self {
        value.to_string()
    }
}

impl fmt::Display for SplitSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            b if b % GB == 0 => write!(f, "{}GB", b / GB),
            b if b % MB == 0 => write!(f, "{}MB", b / MB),
            b if b % KB == 0 => write!(f, "{}kB", b / KB),
            b => write!(f, "{}", b),
        }
    }
}

/// File name of part `part` (zero-based) out of `n_parts`.
pub fn split_fname(dst: &Path, part: usize, n_parts: usize, naming: SplitNaming) -> PathBuf {
    let name = match dst.file_name() {
        Some(name) => name.to_string_lossy().into_owned(),
        None => return dst.to_path_buf(),
    };
    let renamed = match naming {
        SplitNaming::Neuromag if part == 0 => return dst.to_path_buf(),
        SplitNaming::Neuromag => {
            let as_path = Path::new(&name);
            let stem = as_path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| name.clone());
            match as_path.extension() {
                Some(ext) => format!("{}-{}.{}", stem, part, ext.to_string_lossy()),
                None => format!("{}-{}", stem, part),
            }
        }
        SplitNaming::Bids if n_parts <= 1 => return dst.to_path_buf(),
        SplitNaming::Bids => {
            let at = name.rfind('_').or_else(|| name.find('.')).unwrap_or(name.len());
            format!("{}_split-{:02}{}", &name[..at], part + 1, &name[at..])
        }
    };
    dst.with_file_name(renamed)
}

/// Greedy assignment of consecutive chunks to files of at most `split_size`
/// bytes, each file also paying `overhead` bytes.
pub fn plan_parts(
    split_size: SplitSize,
    overhead: u64,
    chunk_lens: &[u64],
) -> Result<Vec<Range<usize>>, FiffError> {
    let limit = split_size.bytes();
    let mut parts = Vec::new();
    let mut start = 0;
    let mut used = overhead;
    for (i, len) in chunk_lens.iter().enumerate() {
        if overhead + len > limit {
            return Err(FiffError::SplitTooSmall {
                split_size: limit,
                needed: overhead + len,
            });
        }
        if used + len > limit {
            parts.push(start..i);
            start = i;
            used = overhead;
        }
        used += len;
    }
    parts.push(start..chunk_lens.len());
    Ok(parts)
}

/// Room for the `-N` or `_split-NN` a later part inserts into the file name.
const SPLIT_NAME_GROWTH: usize = 16;

fn ref_block_len(name_len: usize) -> u64 {
    // start, role, file number, name, end
    4 * 20 + 16 + name_len as u64
}

fn next_ref_tags(file_num: usize, name: &str) -> [Tag; 5] {
    [
        Tag::block_start(FIFFB_REF),
        Tag::int(FIFF_REF_ROLE, FIFFV_ROLE_NEXT_FILE),
        Tag::int(FIFF_REF_FILE_NUM, file_num as i32),
        Tag::string(FIFF_REF_FILE_NAME, name),
        Tag::block_end(FIFFB_REF),
    ]
}

/// Writes a recording as one or more files.
///
/// `write_part` fills a freshly created file with the content for a range of
/// chunks; each part except the last gets a reference to its successor. Every
/// destination is checked against the overwrite policy before the first byte
/// is written. Returns the written paths in order.
pub fn write_split<F>(
    dst: &Path,
    overwrite: bool,
    naming: SplitNaming,
    split_size: SplitSize,
    overhead: u64,
    chunk_lens: &[u64],
    mut write_part: F,
) -> Result<Vec<PathBuf>, FiffError>
where
    F: FnMut(&mut FiffWriter, Range<usize>) -> Result<(), FiffError>,
{
    let name_len = dst.file_name().map(|n| n.len()).unwrap_or(0);
    let reserve = file_header_len() + overhead + ref_block_len(name_len + SPLIT_NAME_GROWTH);
    let parts = plan_parts(split_size, reserve, chunk_lens)?;
    let paths: Vec<PathBuf> = (0..parts.len())
        .map(|i| split_fname(dst, i, parts.len(), naming))
        .collect();

    if !overwrite {
        if let Some(existing) = paths.iter().find(|p| p.exists()) {
            return Err(FiffError::FileExists(existing.clone()));
        }
    }

    for (i, range) in parts.into_iter().enumerate() {
        let mut writer = FiffWriter::create(&paths[i], overwrite, i as i32)?;
        write_part(&mut writer, range.clone())?;
        if let Some(next) = paths.get(i + 1) {
            let next_name = next
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            writer.write_tags(&next_ref_tags(i + 1, &next_name))?;
        }
        debug!(
            path = %paths[i].display(),
            chunks = ?range,
            bytes = writer.position(),
            "wrote split part"
        );
        writer.finish()?;
    }
    Ok(paths)
}

/// Opens `first` and every split file chained after it, in order.
pub fn read_chain(first: &Path) -> Result<Vec<(PathBuf, Node)>, FiffError> {
    let mut chain: Vec<(PathBuf, Node)> = Vec::new();
    let mut seen = HashSet::new();
    let mut current = first.to_path_buf();
    loop {
        if !seen.insert(current.clone()) {
            return Err(FiffError::Malformed(format!(
                "split files reference each other in a cycle at {}",
                current.display()
            )));
        }
        let root = match open(&current) {
            Err(FiffError::Io(e)) if !chain.is_empty() && e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FiffError::MissingSplit(current));
            }
            other => other?,
        };
        let next = next_file_name(&root)?;
        chain.push((current.clone(), root));
        match next {
            Some(name) => current = current.with_file_name(name),
            None => return Ok(chain),
        }
    }
}

fn next_file_name(root: &Node) -> Result<Option<String>, FiffError> {
    for node in root.find_all(FIFFB_REF) {
        let role = node.require_tag(FIFF_REF_ROLE)?.as_i32()?;
        if role != FIFFV_ROLE_NEXT_FILE {
            continue;
        }
        let name = node.require_tag(FIFF_REF_FILE_NAME)?.as_str()?;
        // only a bare file name in the same directory is honored
        return match Path::new(name).file_name() {
            Some(bare) if bare == std::ffi::OsStr::new(name) => Ok(Some(name.to_string())),
            _ => Err(FiffError::Malformed(format!(
                "invalid split file reference '{}'",
                name
            ))),
        };
    }
    Ok(None)
}
