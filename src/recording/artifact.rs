//! Finalized takes.

use super::chunk::{seal_wav_sizes, Chunk};
use anyhow::{anyhow, Result};
use chrono::{DateTime, Local};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Mime type attached to every artifact.
pub const WAV_MIME_TYPE: &str = "audio/wav";

/// The playable, saveable result of one completed take.
///
/// Artifacts are shared as `Arc<Artifact>`; that reference is the playback
/// handle. The bytes are freed once the controller and every playback sink
/// have dropped their handles.
#[derive(Debug)]
pub struct Artifact {
    bytes: Vec<u8>,
    mime_type: &'static str,
    created_at: DateTime<Local>,
}

impl Artifact {
    /// Concatenates chunks in arrival order into one blob.
    ///
    /// Container size fields are patched in place, so the artifact is exactly
    /// as long as the sum of its chunks.
    pub fn assemble(chunks: Vec<Chunk>) -> Self {
        let total: usize = chunks.iter().map(Chunk::len).sum();
        let mut bytes = Vec::with_capacity(total);
        for chunk in &chunks {
            bytes.extend_from_slice(chunk.bytes());
        }
        seal_wav_sizes(&mut bytes);

        Self {
            bytes,
            mime_type: WAV_MIME_TYPE,
            created_at: Local::now(),
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    /// Playing time of the take, if the blob is a readable WAV file.
    pub fn duration(&self) -> Option<Duration> {
        let reader = hound::WavReader::new(Cursor::new(&self.bytes)).ok()?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return None;
        }
        let frames = reader.duration() as f64;
        Some(Duration::from_secs_f64(frames / spec.sample_rate as f64))
    }

    /// File name used when the take is saved.
    pub fn file_name(&self) -> String {
        format!("firstsound-{}.wav", self.created_at.format("%Y%m%d-%H%M%S"))
    }

    /// Writes the take into `dir`, creating the directory if needed.
    ///
    /// # Errors
    /// - If the directory cannot be created
    /// - If the file cannot be written
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow!("Failed to create {}: {e}", dir.display()))?;

        let path = dir.join(self.file_name());
        std::fs::write(&path, &self.bytes)
            .map_err(|e| anyhow!("Failed to write {}: {e}", path.display()))?;

        tracing::info!(
            "Take saved: {} ({} bytes, {})",
            path.display(),
            self.bytes.len(),
            self.mime_type
        );
        Ok(path)
    }
}
