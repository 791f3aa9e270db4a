mod common;

use rstest::rstest;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use quickfif::fiff::{FiffError, SplitSize};
use quickfif::kinds::{QfEpochs, QfObject, QfRaw};
use quickfif::save::save;
use quickfif::{resolve, Kind, ReadError, SaveError};

use common::*;

fn file_names(dir: &Path) -> BTreeSet<String> {
    fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect()
}

fn five_mb() -> SplitSize {
    "5MB".parse().unwrap()
}

#[rstest]
#[case("test_raw.fif", &["test_raw.fif", "test_raw-1.fif"])]
#[case("test_raw.fif.gz", &["test_raw.fif.gz", "test_raw.fif-1.gz"])]
#[case("test_meg.fif", &["test_split-01_meg.fif", "test_split-02_meg.fif"])]
fn large_raw_is_split_by_destination_convention(#[case] dst: &str, #[case] expected: &[&str]) {
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let obj = QfObject::Raw(QfRaw {
        fpath: src_dir.path().join("src_raw.fif"),
        raw: make_raw(10, 1000.0, 200.0),
    });

    let written = save(&obj, &dst_dir.path().join(dst), false, five_mb()).unwrap();

    let names = file_names(dst_dir.path());
    for name in expected {
        assert!(names.contains(*name), "{name} missing from {names:?}");
    }
    assert_eq!(written[0], dst_dir.path().join(expected[0]));

    let QfObject::Raw(loaded) = resolve(&written[0], None).unwrap() else {
        panic!("expected raw");
    };
    let QfObject::Raw(original) = &obj else { unreachable!() };
    assert_close(&loaded.raw.data, &original.raw.data);
    assert_eq!(loaded.raw.annotations, original.raw.annotations);
}

#[rstest]
#[case("test-epo.fif", &["test-epo.fif", "test-epo-1.fif"])]
#[case("test-epo.fif.gz", &["test-epo.fif.gz", "test-epo.fif-1.gz"])]
#[case("test_epo.fif", &["test_split-01_epo.fif", "test_split-02_epo.fif"])]
fn large_epochs_are_split_by_destination_convention(
    #[case] dst: &str,
    #[case] expected: &[&str],
) {
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let obj = QfObject::Epochs(QfEpochs {
        fpath: src_dir.path().join("src-epo.fif"),
        epochs: make_epochs(150, 10, 1000),
    });

    let written = save(&obj, &dst_dir.path().join(dst), false, five_mb()).unwrap();

    let names = file_names(dst_dir.path());
    for name in expected {
        assert!(names.contains(*name), "{name} missing from {names:?}");
    }

    let QfObject::Epochs(loaded) = resolve(&written[0], None).unwrap() else {
        panic!("expected epochs");
    };
    assert_eq!(loaded.epochs.n_epochs(), 150);
    assert_eq!(loaded.epochs.events.len(), 150);
}

#[test]
fn small_bids_recording_keeps_its_name() {
    let dir = tempfile::tempdir().unwrap();
    let src = save_raw(dir.path(), "src_raw.fif", make_raw(2, 100.0, 5.0));
    let dst = dir.path().join("sub-01_eeg.fif");

    let written = save(&QfObject::Raw(src), &dst, false, SplitSize::default()).unwrap();
    assert_eq!(written, vec![dst]);
}

#[test]
fn existing_destination_is_left_alone() {
    let dir = tempfile::tempdir().unwrap();
    let src = save_annots(dir.path(), "src-annot.fif");
    let dst = dir.path().join("dst-annot.fif");
    fs::write(&dst, b"precious").unwrap();

    let err = save(&QfObject::Annots(src), &dst, false, SplitSize::default()).unwrap_err();
    assert!(matches!(err, SaveError::FileExists { ref path } if *path == dst), "{err}");
    assert_eq!(fs::read(&dst).unwrap(), b"precious");
}

#[test]
fn overwrite_replaces_destination() {
    let dir = tempfile::tempdir().unwrap();
    let src = save_annots(dir.path(), "src-annot.fif");
    let dst = dir.path().join("dst-annot.fif");
    fs::write(&dst, b"stale").unwrap();

    save(&QfObject::Annots(src.clone()), &dst, true, SplitSize::default()).unwrap();
    let QfObject::Annots(loaded) = resolve(&dst, None).unwrap() else {
        panic!("expected annotations");
    };
    assert_eq!(loaded.annots, src.annots);
}

#[test]
fn existing_later_split_part_blocks_the_whole_save() {
    let dir = tempfile::tempdir().unwrap();
    let obj = QfObject::Raw(QfRaw {
        fpath: dir.path().join("src_raw.fif"),
        raw: make_raw(10, 1000.0, 200.0),
    });
    let blocker = dir.path().join("test_raw-1.fif");
    fs::write(&blocker, b"other recording").unwrap();

    let err = save(&obj, &dir.path().join("test_raw.fif"), false, five_mb()).unwrap_err();
    assert!(matches!(err, SaveError::FileExists { ref path } if *path == blocker), "{err}");
    assert!(!dir.path().join("test_raw.fif").exists());
    assert_eq!(fs::read(&blocker).unwrap(), b"other recording");
}

#[test]
fn directory_destination_gets_source_name() {
    let src_dir = tempfile::tempdir().unwrap();
    let dst_dir = tempfile::tempdir().unwrap();
    let src = save_epochs(src_dir.path(), "session-epo.fif", make_epochs(4, 2, 20));

    let written = save(&QfObject::Epochs(src), dst_dir.path(), false, SplitSize::default()).unwrap();
    assert_eq!(written, vec![dst_dir.path().join("session-epo.fif")]);
    assert!(resolve(&written[0], None).is_ok());
}

#[rstest]
#[case(false)]
#[case(true)]
fn ica_cannot_be_copied(#[case] overwrite: bool) {
    let dir = tempfile::tempdir().unwrap();
    let src = save_ica(dir.path(), "decomp-ica.fif");
    let obj = resolve(&src.fpath, None).unwrap();
    assert_eq!(obj.kind(), Kind::Ica);

    let dst = dir.path().join("copy-ica.fif");
    if overwrite {
        fs::write(&dst, b"existing").unwrap();
    }
    let err = save(&obj, &dst, overwrite, SplitSize::default()).unwrap_err();
    assert!(matches!(err, SaveError::UnsupportedOperation { kind: Kind::Ica }), "{err}");
    if overwrite {
        assert_eq!(fs::read(&dst).unwrap(), b"existing");
    } else {
        assert!(!dst.exists());
    }
}

#[test]
fn every_savable_kind_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let sources = [
        save_raw(dir.path(), "a_raw.fif", make_raw(3, 250.0, 4.0)).fpath,
        save_epochs(dir.path(), "b-epo.fif.gz", make_epochs(5, 3, 40)).fpath,
        save_annots(dir.path(), "c_annot.fif").fpath,
    ];
    for src in sources {
        let original = resolve(&src, None).unwrap();
        let name = src.file_name().unwrap().to_string_lossy().into_owned();
        let dst = dir.path().join(format!("copy_{name}"));
        save(&original, &dst, true, SplitSize::default()).unwrap();

        let copied = resolve(&dst, None).unwrap();
        assert_eq!(copied.kind(), original.kind());
        match (&original, &copied) {
            (QfObject::Raw(a), QfObject::Raw(b)) => assert_eq!(a.raw, b.raw),
            (QfObject::Epochs(a), QfObject::Epochs(b)) => assert_eq!(a.epochs, b.epochs),
            (QfObject::Annots(a), QfObject::Annots(b)) => assert_eq!(a.annots, b.annots),
            other => panic!("kind changed: {other:?}"),
        }
    }
}

#[test]
fn unknown_suffix_needs_explicit_kind() {
    let dir = tempfile::tempdir().unwrap();
    let src = save_annots(dir.path(), "segments.dat");

    let err = resolve(&src.fpath, None).unwrap_err();
    assert!(matches!(err, ReadError::UnsupportedKind { .. }), "{err}");

    let obj = resolve(&src.fpath, Some(Kind::Annots)).unwrap();
    assert_eq!(obj.kind(), Kind::Annots);
}

#[test]
fn wrong_explicit_kind_is_a_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    let src = save_annots(dir.path(), "x-annot.fif");
    let err = resolve(&src.fpath, Some(Kind::Raw)).unwrap_err();
    assert!(matches!(err, ReadError::BrokenFile { .. }), "{err}");
}

#[test]
fn empty_file_is_a_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty_raw.fif");
    fs::write(&path, b"").unwrap();
    let err = resolve(&path, None).unwrap_err();
    assert!(
        matches!(err, ReadError::BrokenFile { source: FiffError::Empty, .. }),
        "{err}"
    );
}

#[test]
fn missing_split_part_is_a_broken_file() {
    let dir = tempfile::tempdir().unwrap();
    let obj = QfObject::Raw(QfRaw {
        fpath: dir.path().join("src_raw.fif"),
        raw: make_raw(10, 1000.0, 200.0),
    });
    let written = save(&obj, &dir.path().join("test_raw.fif"), false, five_mb()).unwrap();
    fs::remove_file(&written[1]).unwrap();

    let err = resolve(&written[0], None).unwrap_err();
    assert!(
        matches!(err, ReadError::BrokenFile { source: FiffError::MissingSplit(_), .. }),
        "{err}"
    );
}
