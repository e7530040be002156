// Database models - Recording
use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::date_key::date_key_from_created_at;

/// Where a recording was made. Stored as three columns that are either all set or all NULL.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
    pub accuracy: f64,
}

impl GeoPoint {
    /// Rebuild a location from its columns; a partially populated row yields `None`
    pub fn from_columns(lat: Option<f64>, lng: Option<f64>, accuracy: Option<f64>) -> Option<Self> {
        match (lat, lng, accuracy) {
            (Some(lat), Some(lng), Some(accuracy)) => Some(Self { lat, lng, accuracy }),
            (None, None, None) => None,
            _ => {
                log::warn!("Ignoring partially stored location: {:?}/{:?}/{:?}", lat, lng, accuracy);
                None
            }
        }
    }
}

/// A finished recording that has not been inserted yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDraft {
    pub date_key: String,
    pub created_at: String,
    pub audio_uri: String,
    pub duration_ms: u32,
    pub location: Option<GeoPoint>,
    pub memo: String,
    pub waveform: Vec<f32>,
    pub recording_title: String,
}

impl RecordingDraft {
    /// Build a draft, deriving `date_key` from `created_at`
    pub fn new(
        created_at: impl Into<String>,
        audio_uri: impl Into<String>,
        duration_ms: u32,
        waveform: Vec<f32>,
    ) -> Result<Self> {
        let created_at = created_at.into();
        let date_key = date_key_from_created_at(&created_at)?;
        Ok(Self {
            date_key,
            created_at,
            audio_uri: audio_uri.into(),
            duration_ms,
            location: None,
            memo: String::new(),
            waveform,
            recording_title: String::new(),
        })
    }

    pub fn with_location(mut self, location: GeoPoint) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = memo.into();
        self
    }

    pub fn with_title(mut self, recording_title: impl Into<String>) -> Self {
        self.recording_title = recording_title.into();
        self
    }
}

/// List projection: everything the archive list shows, without the waveform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingListItem {
    pub id: i64,
    pub date_key: String,
    pub created_at: String,
    pub duration_ms: u32,
    pub location: Option<GeoPoint>,
    pub memo: String,
    pub recording_title: String,
}

/// Detail projection: the full row with the waveform decoded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingDetail {
    pub id: i64,
    pub date_key: String,
    pub created_at: String,
    pub audio_uri: String,
    pub duration_ms: u32,
    pub location: Option<GeoPoint>,
    pub memo: String,
    pub waveform: Vec<f32>,
    pub waveform_length: usize,
    pub recording_title: String,
}

impl RecordingDetail {
    /// Convert back into a draft, e.g. to prefill the edit screen
    pub fn into_draft(self) -> RecordingDraft {
        RecordingDraft {
            date_key: self.date_key,
            created_at: self.created_at,
            audio_uri: self.audio_uri,
            duration_ms: self.duration_ms,
            location: self.location,
            memo: self.memo,
            waveform: self.waveform,
            recording_title: self.recording_title,
        }
    }
}

/// The only fields that may change after insert
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RecordingEdit {
    pub recording_title: String,
    pub memo: String,
}
