#![allow(dead_code)]

use ndarray::{Array2, Array3};
use std::collections::BTreeMap;
use std::path::Path;

use quickfif::fiff::SplitSize;
use quickfif::kinds::{
    annots, epochs, ica, raw, Annotations, ChannelType, Epochs, Event, Ica, IcaParams, MeasInfo,
    QfAnnots, QfEpochs, QfIca, QfRaw, Raw, SaveOptions,
};
use quickfif::fiff::SplitNaming;

pub fn options() -> SaveOptions {
    SaveOptions {
        overwrite: false,
        split_naming: SplitNaming::Neuromag,
        split_size: SplitSize::default(),
    }
}

/// `n_ch` misc channels of a deterministic signal, `dur_sec` seconds long.
pub fn make_raw(n_ch: usize, sfreq: f64, dur_sec: f64) -> Raw {
    let n_samp = (dur_sec * sfreq) as usize + 1;
    let data = Array2::from_shape_fn((n_ch, n_samp), |(c, s)| {
        ((c + 1) as f64 * s as f64 * 0.001).sin()
    });
    let mut raw = Raw::new(MeasInfo::uniform(n_ch, ChannelType::Misc, sfreq), data);
    raw.annotations.push(0.5, 1.0, "bad_segment");
    raw
}

pub fn make_epochs(n_epochs: usize, n_ch: usize, n_times: usize) -> Epochs {
    let events = (0..n_epochs)
        .map(|i| Event {
            sample: 1000 + 500 * i as i32,
            previous: 0,
            id: 1,
        })
        .collect();
    Epochs {
        info: MeasInfo::uniform(n_ch, ChannelType::Eeg, 1000.0),
        events,
        event_id: BTreeMap::from([("stim".to_string(), 1)]),
        tmin: -0.2,
        data: Array3::from_shape_fn((n_epochs, n_ch, n_times), |(e, c, t)| {
            ((e + c) as f64 + t as f64 * 0.01).sin()
        }),
    }
}

pub fn make_annots() -> Annotations {
    let mut annots = Annotations::new();
    annots.push(1.0, 0.5, "blink");
    annots.push(4.0, 2.0, "bad");
    annots.push(9.5, 0.75, "blink");
    annots
}

pub fn make_ica() -> Ica {
    Ica {
        info: MeasInfo::uniform(2, ChannelType::Eeg, 250.0),
        params: IcaParams {
            method: "infomax".into(),
            n_samples: 500,
            n_iter: None,
            exclude: vec![],
        },
        unmixing: ndarray::array![[0.5, -1.0], [1.5, 2.0]],
        mixing: ndarray::array![[1.0, 0.5], [-0.25, 0.25]],
    }
}

pub fn save_raw(dir: &Path, name: &str, raw: Raw) -> QfRaw {
    let obj = QfRaw {
        fpath: dir.join(name),
        raw,
    };
    raw::save(&obj, &obj.fpath, &options()).unwrap();
    obj
}

pub fn save_epochs(dir: &Path, name: &str, epochs: Epochs) -> QfEpochs {
    let obj = QfEpochs {
        fpath: dir.join(name),
        epochs,
    };
    epochs::save(&obj, &obj.fpath, &options()).unwrap();
    obj
}

pub fn save_annots(dir: &Path, name: &str) -> QfAnnots {
    let obj = QfAnnots {
        fpath: dir.join(name),
        annots: make_annots(),
    };
    annots::save(&obj, &obj.fpath, &options()).unwrap();
    obj
}

pub fn save_ica(dir: &Path, name: &str) -> QfIca {
    let obj = QfIca {
        fpath: dir.join(name),
        ica: make_ica(),
    };
    ica::write(&obj, &obj.fpath, false).unwrap();
    obj
}

pub fn assert_close<D: ndarray::Dimension>(a: &ndarray::Array<f64, D>, b: &ndarray::Array<f64, D>) {
    assert_eq!(a.shape(), b.shape());
    for (x, y) in a.iter().zip(b.iter()) {
        assert!((x - y).abs() < 1e-6, "{x} != {y}");
    }
}
