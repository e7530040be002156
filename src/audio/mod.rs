// Audio-side helpers that feed the store: level shaping, waveform blobs and file placement

pub mod file_io;
pub mod levels;
pub mod waveform_blob;

pub use file_io::{LocalRecordingFiles, RecordingFileService};
pub use levels::normalize_level_db;
pub use waveform_blob::{decode_waveform, encode_waveform};
