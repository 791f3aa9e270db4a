// Tag, block and type codes. Values follow the FIFF numbering where one
// exists; the simplified records (channel, ICA params) are our own layout.

// structural tags
pub const FIFF_FILE_ID: i32 = 100;
pub const FIFF_DIR_POINTER: i32 = 101;
pub const FIFF_BLOCK_START: i32 = 104;
pub const FIFF_BLOCK_END: i32 = 105;

// measurement info
pub const FIFF_NCHAN: i32 = 200;
pub const FIFF_SFREQ: i32 = 201;
pub const FIFF_CH_INFO: i32 = 203;
pub const FIFF_FIRST_TIME: i32 = 204;
pub const FIFF_COMMENT: i32 = 206;
pub const FIFF_FIRST_SAMPLE: i32 = 208;
pub const FIFF_DESCRIPTION: i32 = FIFF_COMMENT;

// data
pub const FIFF_DATA_BUFFER: i32 = 300;
pub const FIFF_EPOCH: i32 = 302;

// split references
pub const FIFF_REF_ROLE: i32 = 115;
pub const FIFF_REF_FILE_NUM: i32 = 117;
pub const FIFF_REF_FILE_NAME: i32 = 118;

// mne extensions
pub const FIFF_MNE_EVENT_LIST: i32 = 3509;
pub const FIFF_MNE_CH_NAME_LIST: i32 = 3507;
pub const FIFF_MNE_ANNOT_ONSET: i32 = 3546;
pub const FIFF_MNE_ANNOT_DURATION: i32 = 3547;
pub const FIFF_MNE_ICA_INTERFACE_PARAMS: i32 = 3601;
pub const FIFF_MNE_ICA_UNMIXING: i32 = 3606;
pub const FIFF_MNE_ICA_MIXING: i32 = 3609;

// blocks
pub const FIFFB_ROOT: i32 = 999;
pub const FIFFB_MEAS: i32 = 100;
pub const FIFFB_MEAS_INFO: i32 = 101;
pub const FIFFB_RAW_DATA: i32 = 102;
pub const FIFFB_REF: i32 = 118;
pub const FIFFB_MNE_EVENTS: i32 = 355;
pub const FIFFB_MNE_EPOCHS: i32 = 373;
pub const FIFFB_MNE_BAD_CHANNELS: i32 = 359;
pub const FIFFB_MNE_ICA: i32 = 3600;
pub const FIFFB_MNE_ANNOTATIONS: i32 = 3810;

// payload types
pub const FIFFT_VOID: i32 = 0;
pub const FIFFT_INT: i32 = 3;
pub const FIFFT_FLOAT: i32 = 4;
pub const FIFFT_DOUBLE: i32 = 5;
pub const FIFFT_STRING: i32 = 10;
pub const FIFFT_CH_INFO_STRUCT: i32 = 30;
pub const FIFFT_ID_STRUCT: i32 = 31;
pub const FIFFT_MATRIX: i32 = 0x4000_0000;

pub const FIFFV_NEXT_SEQ: i32 = 0;
pub const FIFFV_ROLE_NEXT_FILE: i32 = 2;

// channel kinds
pub const FIFFV_MEG_CH: i32 = 1;
pub const FIFFV_EEG_CH: i32 = 2;
pub const FIFFV_STIM_CH: i32 = 3;
pub const FIFFV_EOG_CH: i32 = 202;
pub const FIFFV_EMG_CH: i32 = 302;
pub const FIFFV_ECG_CH: i32 = 402;
pub const FIFFV_MISC_CH: i32 = 502;

pub const FIFFC_VERSION: i32 = (1 << 16) | 3;
