use polars::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

use super::{QfObject, SaveOptions};
use crate::console::{Namespace, Value};
use crate::fiff::constants::*;
use crate::fiff::{self, FiffError, FiffWriter, Node, Tag};

pub const EXTENSIONS: &[&str] = &["_annot.fif", "-annot.fif"];

pub const SUMMARY_HEADER: &str = "Annotations duration statistics";

/// Labelled time segments: onset and duration in seconds plus a description.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Annotations {
    onset: Vec<f64>,
    duration: Vec<f64>,
    description: Vec<String>,
}

impl Annotations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(
        onset: Vec<f64>,
        duration: Vec<f64>,
        description: Vec<String>,
    ) -> Result<Self, FiffError> {
        if onset.len() != duration.len() || onset.len() != description.len() {
            return Err(FiffError::Inconsistent(format!(
                "annotations have {} onsets, {} durations and {} descriptions",
                onset.len(),
                duration.len(),
                description.len()
            )));
        }
        Ok(Annotations {
            onset,
            duration,
            description,
        })
    }

    pub fn push(&mut self, onset: f64, duration: f64, description: impl Into<String>) {
        self.onset.push(onset);
        self.duration.push(duration);
        self.description.push(description.into());
    }

    pub fn len(&self) -> usize {
        self.onset.len()
    }

    pub fn is_empty(&self) -> bool {
        self.onset.is_empty()
    }

    pub fn onset(&self) -> &[f64] {
        &self.onset
    }

    pub fn duration(&self) -> &[f64] {
        &self.duration
    }

    pub fn description(&self) -> &[String] {
        &self.description
    }

    /// Duration statistics per description plus a `Total` row.
    pub fn duration_stats(&self) -> PolarsResult<DataFrame> {
        let df = df! {
            "description" => self.description.clone(),
            "duration" => self.duration.clone(),
        }?;

        let groups = df
            .clone()
            .lazy()
            .group_by([col("description")])
            .agg(duration_aggs())
            .sort_by_exprs([col("description")], SortMultipleOptions::default());

        let mut total_exprs = vec![lit("Total").alias("description")];
        total_exprs.extend(duration_aggs());
        let total = df.lazy().select(total_exprs);

        concat([groups, total], UnionArgs::default())?.collect()
    }

    /// Rendered statistics table, or the reason it could not be computed.
    pub fn stats_table(&self) -> String {
        match self.duration_stats() {
            Ok(df) => df.to_string(),
            Err(e) => format!("<statistics unavailable: {}>", e),
        }
    }

    pub(crate) fn to_tags(&self) -> Vec<Tag> {
        let mut tags = vec![
            Tag::block_start(FIFFB_MNE_ANNOTATIONS),
            Tag::doubles(FIFF_MNE_ANNOT_ONSET, &self.onset),
            Tag::doubles(FIFF_MNE_ANNOT_DURATION, &self.duration),
        ];
        tags.extend(self.description.iter().map(|d| Tag::string(FIFF_COMMENT, d)));
        tags.push(Tag::block_end(FIFFB_MNE_ANNOTATIONS));
        tags
    }

    pub(crate) fn from_node(node: &Node) -> Result<Self, FiffError> {
        let onset = node.require_tag(FIFF_MNE_ANNOT_ONSET)?.as_f64s()?;
        let duration = node.require_tag(FIFF_MNE_ANNOT_DURATION)?.as_f64s()?;
        let description = node
            .tags_of(FIFF_COMMENT)
            .map(|t| t.as_str().map(str::to_string))
            .collect::<Result<Vec<_>, _>>()?;
        Annotations::from_parts(onset, duration, description)
    }
}

fn duration_aggs() -> Vec<Expr> {
    vec![
        col("duration").count().alias("count"),
        col("duration").mean().alias("mean"),
        col("duration").std(1).alias("std"),
        col("duration").min().alias("min"),
        col("duration").median().alias("median"),
        col("duration").max().alias("max"),
    ]
}

impl fmt::Display for Annotations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut counts: Vec<(&str, usize)> = Vec::new();
        for d in &self.description {
            match counts.iter_mut().find(|(name, _)| *name == d.as_str()) {
                Some((_, n)) => *n += 1,
                None => counts.push((d.as_str(), 1)),
            }
        }
        let listed = counts
            .iter()
            .map(|(name, n)| format!("{} ({})", name, n))
            .collect::<Vec<_>>()
            .join(", ");
        write!(f, "<Annotations | {} segments: {}>", self.len(), listed)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct QfAnnots {
    pub fpath: PathBuf,
    pub annots: Annotations,
}

impl QfAnnots {
    pub fn summary(&self) -> String {
        let underline = "-".repeat(SUMMARY_HEADER.len());
        [SUMMARY_HEADER.to_string(), underline, self.annots.stats_table()].join("\n")
    }

    pub fn to_namespace(&self) -> Namespace<'_> {
        Namespace::new()
            .with("fpath", Value::Path(&self.fpath))
            .with("annots", Value::Object(&self.annots))
    }
}

pub fn read(fpath: &Path) -> Result<QfAnnots, FiffError> {
    let root = fiff::open(fpath)?;
    let annots = Annotations::from_node(root.require(FIFFB_MNE_ANNOTATIONS)?)?;
    Ok(QfAnnots {
        fpath: fpath.to_path_buf(),
        annots,
    })
}

/// Annotations are small, so they are always written as one file.
pub fn save(obj: &QfAnnots, dst: &Path, opts: &SaveOptions) -> Result<Vec<PathBuf>, FiffError> {
    let mut writer = FiffWriter::create(dst, opts.overwrite, 0)?;
    writer.write_tags(&obj.annots.to_tags())?;
    writer.finish()?;
    info!(path = %dst.display(), segments = obj.annots.len(), "saved annotations");
    Ok(vec![dst.to_path_buf()])
}

pub(crate) fn read_obj(fpath: &Path) -> Result<QfObject, FiffError> {
    read(fpath).map(QfObject::Annots)
}

pub(crate) fn save_obj(
    obj: &QfObject,
    dst: &Path,
    opts: &SaveOptions,
) -> Result<Vec<PathBuf>, FiffError> {
    match obj {
        QfObject::Annots(annots) => save(annots, dst, opts),
        other => Err(super::kind_mismatch(other)),
    }
}
