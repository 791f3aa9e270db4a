use std::fmt;

use crate::fiff::constants::*;
use crate::fiff::{FiffError, Node, Tag};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelType {
    Meg,
    Eeg,
    Stim,
    Eog,
    Emg,
    Ecg,
    Misc,
    Other(i32),
}

impl ChannelType {
    pub fn code(&self) -> i32 {
        match self {
            ChannelType::Meg => FIFFV_MEG_CH,
            ChannelType::Eeg => FIFFV_EEG_CH,
            ChannelType::Stim => FIFFV_STIM_CH,
            ChannelType::Eog => FIFFV_EOG_CH,
            ChannelType::Emg => FIFFV_EMG_CH,
            ChannelType::Ecg => FIFFV_ECG_CH,
            ChannelType::Misc => FIFFV_MISC_CH,
            ChannelType::Other(code) => *code,
        }
    }

    pub fn from_code(code: i32) -> Self {
        match code {
            FIFFV_MEG_CH => ChannelType::Meg,
            FIFFV_EEG_CH => ChannelType::Eeg,
            FIFFV_STIM_CH => ChannelType::Stim,
            FIFFV_EOG_CH => ChannelType::Eog,
            FIFFV_EMG_CH => ChannelType::Emg,
            FIFFV_ECG_CH => ChannelType::Ecg,
            FIFFV_MISC_CH => ChannelType::Misc,
            other => ChannelType::Other(other),
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelType::Meg => write!(f, "MEG"),
            ChannelType::Eeg => write!(f, "EEG"),
            ChannelType::Stim => write!(f, "STIM"),
            ChannelType::Eog => write!(f, "EOG"),
            ChannelType::Emg => write!(f, "EMG"),
            ChannelType::Ecg => write!(f, "ECG"),
            ChannelType::Misc => write!(f, "MISC"),
            ChannelType::Other(code) => write!(f, "kind {}", code),
        }
    }
}

/// Measurement info shared by raw, epochs and ICA files.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasInfo {
    pub ch_names: Vec<String>,
    pub ch_types: Vec<ChannelType>,
    pub sfreq: f64,
    pub bads: Vec<String>,
    pub description: Option<String>,
}

impl MeasInfo {
    pub fn new(ch_names: Vec<String>, ch_types: Vec<ChannelType>, sfreq: f64) -> Self {
        MeasInfo {
            ch_names,
            ch_types,
            sfreq,
            ..Default::default()
        }
    }

    /// `n` channels of one type named `0`, `1`, ...
    pub fn uniform(n: usize, ch_type: ChannelType, sfreq: f64) -> Self {
        MeasInfo::new(
            (0..n).map(|i| i.to_string()).collect(),
            vec![ch_type; n],
            sfreq,
        )
    }

    pub fn nchan(&self) -> usize {
        self.ch_names.len()
    }

    /// Channel counts per type, in order of first appearance.
    pub fn type_counts(&self) -> Vec<(ChannelType, usize)> {
        let mut counts: Vec<(ChannelType, usize)> = Vec::new();
        for ty in &self.ch_types {
            match counts.iter_mut().find(|(t, _)| t == ty) {
                Some((_, n)) => *n += 1,
                None => counts.push((*ty, 1)),
            }
        }
        counts
    }

    /// The complete `MEAS_INFO` block.
    pub(crate) fn to_tags(&self) -> Vec<Tag> {
        let mut tags = vec![
            Tag::block_start(FIFFB_MEAS_INFO),
            Tag::int(FIFF_NCHAN, self.nchan() as i32),
            Tag::double(FIFF_SFREQ, self.sfreq),
        ];
        for (name, ty) in self.ch_names.iter().zip(&self.ch_types) {
            tags.push(Tag::ch_info(ty.code(), name));
        }
        if let Some(description) = &self.description {
            tags.push(Tag::string(FIFF_DESCRIPTION, description));
        }
        if !self.bads.is_empty() {
            tags.push(Tag::block_start(FIFFB_MNE_BAD_CHANNELS));
            tags.push(Tag::string(FIFF_MNE_CH_NAME_LIST, &self.bads.join(":")));
            tags.push(Tag::block_end(FIFFB_MNE_BAD_CHANNELS));
        }
        tags.push(Tag::block_end(FIFFB_MEAS_INFO));
        tags
    }

    /// Reads the first `MEAS_INFO` block below `parent`.
    pub(crate) fn from_node(parent: &Node) -> Result<Self, FiffError> {
        let node = parent.require(FIFFB_MEAS_INFO)?;
        let nchan = node.require_tag(FIFF_NCHAN)?.as_i32()?;
        let sfreq = node.require_tag(FIFF_SFREQ)?.as_f64()?;

        let mut ch_names = Vec::new();
        let mut ch_types = Vec::new();
        for tag in node.tags_of(FIFF_CH_INFO) {
            let (code, name) = tag.as_ch_info()?;
            ch_types.push(ChannelType::from_code(code));
            ch_names.push(name);
        }
        if ch_names.len() != nchan.max(0) as usize {
            return Err(FiffError::Inconsistent(format!(
                "info declares {} channels but describes {}",
                nchan,
                ch_names.len()
            )));
        }

        let description = node
            .tag(FIFF_DESCRIPTION)
            .map(|t| t.as_str().map(str::to_string))
            .transpose()?;
        let bads = match node.find(FIFFB_MNE_BAD_CHANNELS) {
            Some(block) => block
                .require_tag(FIFF_MNE_CH_NAME_LIST)?
                .as_str()?
                .split(':')
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            None => Vec::new(),
        };

        Ok(MeasInfo {
            ch_names,
            ch_types,
            sfreq,
            bads,
            description,
        })
    }
}

impl fmt::Display for MeasInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let chs = self
            .type_counts()
            .iter()
            .map(|(ty, n)| format!("{} {}", n, ty))
            .collect::<Vec<_>>()
            .join(", ");
        let non_empty = 4 + usize::from(self.description.is_some());

        writeln!(f, "<Info | {} non-empty values", non_empty)?;
        writeln!(f, " bads: [{}]", self.bads.join(", "))?;
        writeln!(f, " ch_names: {}", self.ch_names.join(", "))?;
        writeln!(f, " chs: {}", chs)?;
        if let Some(description) = &self.description {
            writeln!(f, " description: {}", description)?;
        }
        writeln!(f, " nchan: {}", self.nchan())?;
        writeln!(f, " sfreq: {:.1} Hz", self.sfreq)?;
        write!(f, ">")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info() -> MeasInfo {
        let mut info = MeasInfo::new(
            vec!["EEG 001".into(), "EEG 002".into(), "STI 014".into()],
            vec![ChannelType::Eeg, ChannelType::Eeg, ChannelType::Stim],
            250.0,
        );
        info.bads = vec!["EEG 002".into()];
        info.description = Some("resting state".into());
        info
    }

    #[test]
    fn block_reads_back() {
        let info = info();
        let root = Node::from_tags(info.to_tags()).unwrap();
        assert_eq!(MeasInfo::from_node(&root).unwrap(), info);
    }

    #[test]
    fn channel_count_mismatch_is_rejected() {
        let mut tags = info().to_tags();
        tags.retain(|t| t.kind != FIFF_CH_INFO || t.as_ch_info().unwrap().1 != "STI 014");
        let root = Node::from_tags(tags).unwrap();
        assert!(matches!(MeasInfo::from_node(&root), Err(FiffError::Inconsistent(_))));
    }

    #[test]
    fn display_lists_channel_types() {
        let text = info().to_string();
        assert!(text.starts_with("<Info |"), "{text}");
        assert!(text.contains("chs: 2 EEG, 1 STIM"), "{text}");
        assert!(text.contains("sfreq: 250.0 Hz"), "{text}");
    }

    #[test]
    fn unknown_channel_codes_survive() {
        assert_eq!(ChannelType::from_code(907), ChannelType::Other(907));
        assert_eq!(ChannelType::Other(907).code(), 907);
    }
}
