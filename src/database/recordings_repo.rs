// Recordings repository for the voice memo store
// Insert, list, detail, title/memo edit and delete for finished recordings

use anyhow::{bail, Context, Result};
use rusqlite::types::Value;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::models::{GeoPoint, RecordingDetail, RecordingDraft, RecordingEdit, RecordingListItem};
use super::DatabaseManager;
use crate::audio::file_io::RecordingFileService;
use crate::audio::waveform_blob::{decode_waveform, encode_waveform};
use crate::date_key::date_key_from_created_at;

impl DatabaseManager {
    /// Insert a finished recording and return its assigned id
    pub fn insert_recording(&self, draft: &RecordingDraft) -> Result<i64> {
        self.with_connection(|conn| {
            insert_recording_impl(conn, draft)
        })
    }

    /// All recordings without their waveform, in store order
    pub fn list_recordings(&self) -> Result<Vec<RecordingListItem>> {
        self.with_connection(|conn| {
            list_recordings_impl(conn)
        })
    }

    /// Get a recording by ID with its waveform decoded
    pub fn get_recording(&self, id: i64) -> Result<Option<RecordingDetail>> {
        self.with_connection(|conn| {
            get_recording_impl(conn, id)
        })
    }

    /// Get a recording by ID as a draft, e.g. to prefill an edit form
    pub fn get_recording_draft(&self, id: i64) -> Result<Option<RecordingDraft>> {
        Ok(self.get_recording(id)?.map(RecordingDetail::into_draft))
    }

    /// Replace title and memo. Returns false if no recording has this ID.
    pub fn update_recording_title_and_memo(&self, id: i64, edit: &RecordingEdit) -> Result<bool> {
        self.with_connection(|conn| {
            update_title_and_memo_impl(conn, id, edit)
        })
    }

    /// Delete a recording. Returns false if no recording has this ID.
    pub fn delete_recording(&self, id: i64) -> Result<bool> {
        self.with_connection(|conn| {
            delete_recording_impl(conn, id)
        })
    }

    /// Delete a recording and then its audio file.
    /// Failure to remove the file is logged, the row deletion still counts.
    pub fn delete_recording_with_audio(&self, id: i64, files: &dyn RecordingFileService) -> Result<bool> {
        let audio_uri = self.with_connection(|conn| {
            get_audio_uri(conn, id)
        })?;
        let Some(audio_uri) = audio_uri else {
            return Ok(false);
        };

        if !self.delete_recording(id)? {
            return Ok(false);
        }

        if let Err(e) = files.delete_if_exists(&audio_uri) {
            log::warn!("Failed to delete audio file {}: {:#}", audio_uri, e);
        }
        log::info!("Successfully deleted recording: {}", id);
        Ok(true)
    }
}

fn insert_recording_impl(conn: &Connection, draft: &RecordingDraft) -> Result<i64> {
    let expected_date_key = date_key_from_created_at(&draft.created_at)
        .context("Failed to insert recording")?;
    if draft.date_key != expected_date_key {
        bail!(
            "Failed to insert recording: date_key {} does not match created_at {} (expected {})",
            draft.date_key, draft.created_at, expected_date_key
        );
    }

    let waveform_blob = encode_waveform(&draft.waveform);
    let (lat, lng, accuracy) = match draft.location {
        Some(point) => (Some(point.lat), Some(point.lng), Some(point.accuracy)),
        None => (None, None, None),
    };

    conn.execute(
        r#"
        INSERT INTO recordings (
            date_key, created_at, audio_uri, duration_ms, lat, lng, accuracy,
            memo, waveform_blob, waveform_length, recording_title
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
        params![
            draft.date_key,
            draft.created_at,
            draft.audio_uri,
            draft.duration_ms,
            lat,
            lng,
            accuracy,
            draft.memo,
            waveform_blob,
            draft.waveform.len() as i64,
            draft.recording_title,
        ],
    ).context("Failed to insert recording")?;

    let id = conn.last_insert_rowid();
    log::debug!("Inserted recording {} ({} waveform samples)", id, draft.waveform.len());
    Ok(id)
}

fn list_recordings_impl(conn: &Connection) -> Result<Vec<RecordingListItem>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, date_key, created_at, duration_ms, lat, lng, accuracy, memo, recording_title
        FROM recordings
        "#
    ).context("Failed to prepare list_recordings query")?;

    let recordings = stmt.query_map([], |row| {
        let id: i64 = row.get(0)?;
        Ok(RecordingListItem {
            id,
            date_key: row.get(1)?,
            created_at: row.get(2)?,
            duration_ms: resolve_duration_ms(id, row.get(3)?),
            location: GeoPoint::from_columns(row.get(4)?, row.get(5)?, row.get(6)?),
            memo: row.get::<_, Option<String>>(7)?.unwrap_or_default(),
            recording_title: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        })
    }).context("Failed to query recordings")?;

    recordings.collect::<std::result::Result<Vec<_>, _>>()
        .context("Failed to collect recordings")
}

fn get_recording_impl(conn: &Connection, id: i64) -> Result<Option<RecordingDetail>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT id, date_key, created_at, audio_uri, duration_ms, lat, lng, accuracy,
               memo, waveform_blob, waveform_length, recording_title
        FROM recordings WHERE id = ?
        "#
    ).context("Failed to prepare get_recording query")?;

    stmt.query_row(params![id], recording_detail_from_row)
        .optional()
        .context("Failed to get recording")
}

fn recording_detail_from_row(row: &Row<'_>) -> rusqlite::Result<RecordingDetail> {
    let id: i64 = row.get(0)?;
    let waveform = row
        .get::<_, Option<Vec<u8>>>(9)?
        .map(|blob| decode_waveform(&blob))
        .unwrap_or_default();
    let waveform_length = resolve_waveform_length(id, row.get(10)?, waveform.len());

    Ok(RecordingDetail {
        id,
        date_key: row.get(1)?,
        created_at: row.get(2)?,
        audio_uri: row.get(3)?,
        duration_ms: resolve_duration_ms(id, row.get(4)?),
        location: GeoPoint::from_columns(row.get(5)?, row.get(6)?, row.get(7)?),
        memo: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
        waveform,
        waveform_length,
        recording_title: row.get::<_, Option<String>>(11)?.unwrap_or_default(),
    })
}

/// Older rows may hold a fractional or out-of-range duration; those read as
/// the nearest valid value or 0 instead of failing the whole query
fn resolve_duration_ms(id: i64, stored: Option<Value>) -> u32 {
    let resolved = match &stored {
        None | Some(Value::Null) => return 0,
        Some(Value::Integer(ms)) => u32::try_from(*ms).ok(),
        Some(Value::Real(ms)) if ms.is_finite() && *ms >= 0.0 => {
            Some(ms.round().min(u32::MAX as f64) as u32)
        }
        Some(_) => None,
    };

    resolved.unwrap_or_else(|| {
        log::warn!("Recording {} stores invalid duration_ms {:?}, reading as 0", id, stored);
        0
    })
}

/// The decoded sample count wins over a missing or disagreeing stored length
fn resolve_waveform_length(id: i64, stored: Option<i64>, decoded: usize) -> usize {
    match stored {
        Some(length) if usize::try_from(length).ok() == Some(decoded) => decoded,
        Some(length) => {
            log::warn!(
                "Recording {} stores waveform_length {} but blob holds {} samples",
                id, length, decoded
            );
            decoded
        }
        None => decoded,
    }
}

fn update_title_and_memo_impl(conn: &Connection, id: i64, edit: &RecordingEdit) -> Result<bool> {
    let changed = conn.execute(
        "UPDATE recordings SET recording_title = ?1, memo = ?2 WHERE id = ?3",
        params![edit.recording_title, edit.memo, id],
    ).context("Failed to update recording")?;

    Ok(changed > 0)
}

fn delete_recording_impl(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM recordings WHERE id = ?", params![id])
        .context("Failed to delete recording")?;
    Ok(deleted > 0)
}

fn get_audio_uri(conn: &Connection, id: i64) -> Result<Option<String>> {
    conn.query_row(
        "SELECT audio_uri FROM recordings WHERE id = ?",
        params![id],
        |row| row.get(0),
    )
    .optional()
    .context("Failed to get recording audio uri")
}
