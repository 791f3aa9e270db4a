//! Static table of supported file kinds.
//!
//! Each entry names the file-name suffixes of a kind, its read function and,
//! when the kind can be copied, its save function. The reverse
//! suffix-to-kind map is derived once and keeps the table order, which is
//! also the order suffixes are tried when guessing a file's kind.

use clap::ValueEnum;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;

use crate::fiff::FiffError;
use crate::kinds::{annots, epochs, ica, raw, QfObject, SaveOptions};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ValueEnum)]
pub enum Kind {
    Raw,
    Epochs,
    Annots,
    Ica,
}

impl Kind {
    pub const ALL: [Kind; 4] = [Kind::Raw, Kind::Epochs, Kind::Annots, Kind::Ica];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Raw => "raw",
            Kind::Epochs => "epochs",
            Kind::Annots => "annots",
            Kind::Ica => "ica",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub type ReadFn = fn(&Path) -> Result<QfObject, FiffError>;
pub type SaveFn = fn(&QfObject, &Path, &SaveOptions) -> Result<Vec<PathBuf>, FiffError>;

#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    pub kind: Kind,
    /// Every suffix identifying the kind, in matching order.
    pub extensions: &'static [&'static str],
    /// The subset of `extensions` that selects BIDS split naming on save.
    pub bids_extensions: &'static [&'static str],
    pub read: ReadFn,
    pub save: Option<SaveFn>,
}

#[derive(Debug, Error, PartialEq)]
pub enum RegistryError {
    #[error("extension '{ext}' is claimed by both {first} and {second}")]
    DuplicateExtension {
        ext: &'static str,
        first: Kind,
        second: Kind,
    },
    #[error("kind {0} is registered more than once")]
    DuplicateKind(Kind),
    #[error("empty extension registered for {0}")]
    EmptyExtension(Kind),
    #[error("BIDS extension '{ext}' of {kind} is not one of its extensions")]
    UnknownBidsExtension { ext: &'static str, kind: Kind },
}

#[derive(Debug)]
pub struct Registry {
    entries: Vec<KindSpec>,
    ext_to_kind: Vec<(&'static str, Kind)>,
}

impl Registry {
    /// Builds a registry, checking that no suffix belongs to two kinds.
    ///
    /// A suffix listed twice for the same kind is kept once.
    pub fn new(entries: Vec<KindSpec>) -> Result<Self, RegistryError> {
        let mut kinds = HashSet::new();
        let mut ext_to_kind: Vec<(&'static str, Kind)> = Vec::new();
        for entry in &entries {
            if !kinds.insert(entry.kind) {
                return Err(RegistryError::DuplicateKind(entry.kind));
            }
            for &ext in entry.extensions {
                if ext.is_empty() {
                    return Err(RegistryError::EmptyExtension(entry.kind));
                }
                match ext_to_kind.iter().find(|(e, _)| *e == ext) {
                    Some((_, kind)) if *kind == entry.kind => {}
                    Some((_, kind)) => {
                        return Err(RegistryError::DuplicateExtension {
                            ext,
                            first: *kind,
                            second: entry.kind,
                        })
                    }
                    None => ext_to_kind.push((ext, entry.kind)),
                }
            }
            if let Some(&ext) = entry
                .bids_extensions
                .iter()
                .find(|e| !entry.extensions.contains(e))
            {
                return Err(RegistryError::UnknownBidsExtension {
                    ext,
                    kind: entry.kind,
                });
            }
        }
        Ok(Registry {
            entries,
            ext_to_kind,
        })
    }

    /// The registry of every kind this crate handles, built on first use.
    ///
    /// # Panics
    ///
    /// If the built-in table breaks the registry invariants.
    pub fn builtin() -> &'static Registry {
        static BUILTIN: OnceLock<Registry> = OnceLock::new();
        BUILTIN.get_or_init(|| {
            Registry::new(builtin_entries())
                .unwrap_or_else(|e| panic!("built-in file kind registry is invalid: {e}"))
        })
    }

    pub fn entries(&self) -> &[KindSpec] {
        &self.entries
    }

    pub fn entry(&self, kind: Kind) -> Option<&KindSpec> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    /// Suffix to kind pairs in matching order.
    pub fn extensions(&self) -> &[(&'static str, Kind)] {
        &self.ext_to_kind
    }

    pub fn ext_to_kind(&self, ext: &str) -> Option<Kind> {
        self.ext_to_kind
            .iter()
            .find(|(e, _)| *e == ext)
            .map(|(_, kind)| *kind)
    }

    pub fn kind_to_exts(&self, kind: Kind) -> &'static [&'static str] {
        self.entry(kind).map(|e| e.extensions).unwrap_or(&[])
    }

    /// Kind of the first registered suffix the path ends with.
    pub fn parse_kind(&self, path: &Path) -> Option<Kind> {
        let path = path.to_string_lossy();
        self.ext_to_kind
            .iter()
            .find(|(ext, _)| path.ends_with(ext))
            .map(|(_, kind)| *kind)
    }
}

fn builtin_entries() -> Vec<KindSpec> {
    vec![
        KindSpec {
            kind: Kind::Epochs,
            extensions: epochs::EXTENSIONS,
            bids_extensions: epochs::BIDS_EXT,
            read: epochs::read_obj,
            save: Some(epochs::save_obj),
        },
        KindSpec {
            kind: Kind::Annots,
            extensions: annots::EXTENSIONS,
            bids_extensions: &[],
            read: annots::read_obj,
            save: Some(annots::save_obj),
        },
        KindSpec {
            kind: Kind::Ica,
            extensions: ica::EXTENSIONS,
            bids_extensions: &[],
            read: ica::read_obj,
            save: None,
        },
        KindSpec {
            kind: Kind::Raw,
            extensions: raw::EXTENSIONS,
            bids_extensions: raw::BIDS_EXT,
            read: raw::read_obj,
            save: Some(raw::save_obj),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use quickcheck_macros::quickcheck;
    use rstest::rstest;
    use std::collections::BTreeSet;

    fn failing_read(_: &Path) -> Result<QfObject, FiffError> {
        Err(FiffError::Empty)
    }

    fn spec(kind: Kind, extensions: &'static [&'static str]) -> KindSpec {
        KindSpec {
            kind,
            extensions,
            bids_extensions: &[],
            read: failing_read,
            save: None,
        }
    }

    #[test]
    fn builtin_has_no_duplicate_extensions() {
        let registry = Registry::builtin();
        let per_kind: usize = registry
            .entries()
            .iter()
            .map(|e| e.extensions.iter().collect::<BTreeSet<_>>().len())
            .sum();
        assert_eq!(per_kind, registry.extensions().len());
    }

    #[test]
    fn builtin_covers_every_kind() {
        for kind in Kind::ALL {
            assert!(Registry::builtin().entry(kind).is_some(), "{kind}");
            assert!(!Registry::builtin().kind_to_exts(kind).is_empty(), "{kind}");
        }
    }

    #[test]
    fn only_ica_lacks_a_save_function() {
        for entry in Registry::builtin().entries() {
            assert_eq!(entry.save.is_none(), entry.kind == Kind::Ica, "{}", entry.kind);
        }
    }

    #[test]
    fn claiming_an_extension_twice_is_rejected() {
        let err = Registry::new(vec![
            spec(Kind::Raw, &["_raw.fif"]),
            spec(Kind::Epochs, &["-epo.fif", "_raw.fif"]),
        ])
        .unwrap_err();
        assert_eq!(
            err,
            RegistryError::DuplicateExtension {
                ext: "_raw.fif",
                first: Kind::Raw,
                second: Kind::Epochs
            }
        );
    }

    #[test]
    fn repeated_extension_within_a_kind_is_kept_once() {
        let registry = Registry::new(vec![spec(Kind::Raw, &["_raw.fif", "_raw.fif"])]).unwrap();
        assert_eq!(registry.extensions(), &[("_raw.fif", Kind::Raw)]);
    }

    #[test]
    fn first_registered_suffix_wins() {
        let registry = Registry::new(vec![
            spec(Kind::Annots, &["x.fif"]),
            spec(Kind::Raw, &["raw_x.fif"]),
        ])
        .unwrap();
        assert_eq!(registry.parse_kind(Path::new("a_raw_x.fif")), Some(Kind::Annots));
    }

    #[rstest]
    #[case("sub-01_task-rest_meg.fif", Some(Kind::Raw))]
    #[case("sample_audvis_raw.fif.gz", Some(Kind::Raw))]
    #[case("sample_audvis_raw_tsss.fif", Some(Kind::Raw))]
    #[case("sample-epo.fif", Some(Kind::Epochs))]
    #[case("sub-01_epo.fif.gz", Some(Kind::Epochs))]
    #[case("blinks-annot.fif", Some(Kind::Annots))]
    #[case("decomp_ica.fif", Some(Kind::Ica))]
    #[case("notes.txt", None)]
    #[case("recording.fif", None)]
    fn parse_kind_by_suffix(#[case] name: &str, #[case] expected: Option<Kind>) {
        let path = Path::new("/data").join(name);
        assert_eq!(Registry::builtin().parse_kind(&path), expected);
    }

    #[test]
    fn no_builtin_extension_ends_with_another_kinds_extension() {
        let exts = Registry::builtin().extensions();
        for (a, ka) in exts {
            for (b, kb) in exts {
                if ka != kb {
                    assert!(!a.ends_with(b), "{a} ({ka}) ends with {b} ({kb})");
                }
            }
        }
    }

    #[quickcheck]
    fn any_stem_with_a_registered_suffix_maps_to_its_kind(stem: String, index: usize) -> bool {
        let exts = Registry::builtin().extensions();
        let (ext, kind) = exts[index % exts.len()];
        let name = format!("{}{}", stem.replace(['/', '\0'], ""), ext);
        Registry::builtin().parse_kind(Path::new(&name)) == Some(kind)
            && Registry::builtin().ext_to_kind(ext) == Some(kind)
    }

    #[test]
    fn kind_names_match_cli_values() {
        for kind in Kind::ALL {
            let value = kind.to_possible_value().unwrap();
            assert_eq!(value.get_name(), kind.to_string());
        }
    }
}
