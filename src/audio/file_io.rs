// File I/O - Recording audio files
// Moves finished captures out of the temp area and removes them when a recording is deleted

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::{Path, PathBuf};

/// Extension used when the temp file has none
const DEFAULT_EXTENSION: &str = "wav";

/// File-storage collaborator used around the repository calls
pub trait RecordingFileService {
    /// Move a temporary capture to permanent storage and return its new URI
    fn move_to_permanent_location(&self, temp_uri: &str) -> Result<String>;

    /// Remove a file, treating an already-missing file as success
    fn delete_if_exists(&self, uri: &str) -> Result<()>;
}

/// Stores recordings under `<root>/recordings`
pub struct LocalRecordingFiles {
    recordings_dir: PathBuf,
}

impl LocalRecordingFiles {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            recordings_dir: root.as_ref().join("recordings"),
        }
    }

    pub fn recordings_dir(&self) -> &Path {
        &self.recordings_dir
    }

    fn permanent_file_name(temp_path: &Path) -> String {
        let extension = temp_path
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| !ext.is_empty())
            .unwrap_or(DEFAULT_EXTENSION);
        let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(6).collect();
        format!("{}_{}.{}", Utc::now().timestamp_millis(), suffix, extension)
    }
}

/// Accepts both plain paths and `file://` URIs
fn uri_to_path(uri: &str) -> PathBuf {
    PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
}

impl RecordingFileService for LocalRecordingFiles {
    fn move_to_permanent_location(&self, temp_uri: &str) -> Result<String> {
        let source = uri_to_path(temp_uri);
        std::fs::create_dir_all(&self.recordings_dir)
            .context("Failed to create recordings directory")?;

        let destination = self.recordings_dir.join(Self::permanent_file_name(&source));
        if std::fs::rename(&source, &destination).is_err() {
            // rename fails across filesystems
            std::fs::copy(&source, &destination)
                .with_context(|| format!("Failed to copy {} to permanent storage", source.display()))?;
            std::fs::remove_file(&source)
                .with_context(|| format!("Failed to remove temp file {}", source.display()))?;
        }

        log::info!("Moved recording to {}", destination.display());
        Ok(destination.to_string_lossy().into_owned())
    }

    fn delete_if_exists(&self, uri: &str) -> Result<()> {
        let path = uri_to_path(uri);
        match std::fs::remove_file(&path) {
            Ok(()) => {
                log::info!("Deleted audio file: {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to delete {}", path.display())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_move_to_permanent_location() {
        let dir = tempdir().unwrap();
        let temp_file = dir.path().join("capture.m4a");
        std::fs::write(&temp_file, b"audio").unwrap();

        let files = LocalRecordingFiles::new(dir.path().join("documents"));
        let uri = files.move_to_permanent_location(temp_file.to_str().unwrap()).unwrap();

        let moved = PathBuf::from(&uri);
        assert!(!temp_file.exists());
        assert!(moved.starts_with(files.recordings_dir()));
        assert_eq!(moved.extension().unwrap(), "m4a");
        assert_eq!(std::fs::read(&moved).unwrap(), b"audio");
    }

    #[test]
    fn test_missing_extension_defaults_to_wav() {
        let dir = tempdir().unwrap();
        let temp_file = dir.path().join("capture");
        std::fs::write(&temp_file, b"audio").unwrap();

        let files = LocalRecordingFiles::new(dir.path());
        let uri = files
            .move_to_permanent_location(&format!("file://{}", temp_file.display()))
            .unwrap();
        assert!(uri.ends_with(".wav"));
    }

    #[test]
    fn test_delete_if_exists() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("gone.wav");
        std::fs::write(&file, b"audio").unwrap();

        let files = LocalRecordingFiles::new(dir.path());
        files.delete_if_exists(file.to_str().unwrap()).unwrap();
        assert!(!file.exists());

        // Second delete is a no-op
        files.delete_if_exists(file.to_str().unwrap()).unwrap();
    }
}
