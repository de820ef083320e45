//! Chunked recording of a live input stream.
//!
//! A [`ChunkRecorder`] attaches to an [`InputStream`] and delivers encoded
//! audio in slices over a channel, in capture order. The first chunk is a
//! WAV header; every following chunk is little-endian 16-bit mono PCM. The
//! header's size fields are placeholders until the take is assembled.

use crate::capture::{InputStream, PcmSink, SinkId};
use std::io::Cursor;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// One slice of encoded audio.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk(Vec<u8>);

impl Chunk {
    #[cfg(test)]
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Builds a mono 16-bit PCM WAV header with zeroed size fields.
pub fn wav_header(sample_rate: u32) -> Result<Vec<u8>, hound::Error> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    hound::WavWriter::new(&mut cursor, spec)?.finalize()?;
    Ok(cursor.into_inner())
}

/// Rewrites the RIFF and data chunk sizes of a WAV blob in place.
///
/// The byte length never changes. Blobs that are not RIFF/WAVE are left alone.
pub fn seal_wav_sizes(bytes: &mut [u8]) {
    if bytes.len() < 12 || &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" {
        return;
    }

    let riff_size = (bytes.len() - 8) as u32;
    bytes[4..8].copy_from_slice(&riff_size.to_le_bytes());

    let mut offset = 12;
    while offset + 8 <= bytes.len() {
        let id = &bytes[offset..offset + 4];
        if id == b"data" {
            let data_size = (bytes.len() - offset - 8) as u32;
            bytes[offset + 4..offset + 8].copy_from_slice(&data_size.to_le_bytes());
            return;
        }
        let mut size_field = [0u8; 4];
        size_field.copy_from_slice(&bytes[offset + 4..offset + 8]);
        let size = u32::from_le_bytes(size_field) as usize;
        offset += 8 + size + (size & 1);
    }
}

struct ChunkSink {
    tx: UnboundedSender<Chunk>,
    pending: Vec<u8>,
    flush_bytes: usize,
}

impl ChunkSink {
    fn flush(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let bytes = std::mem::replace(&mut self.pending, Vec::with_capacity(self.flush_bytes));
        if self.tx.send(Chunk(bytes)).is_err() {
            tracing::debug!("Chunk receiver dropped; discarding audio");
        }
    }
}

impl PcmSink for ChunkSink {
    fn write(&mut self, pcm: &[i16]) {
        self.pending.reserve(pcm.len() * 2);
        for sample in pcm {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }
        if self.pending.len() >= self.flush_bytes {
            self.flush();
        }
    }

    fn close(mut self: Box<Self>) {
        self.flush();
    }
}

/// Records one take from a stream as a sequence of chunks.
///
/// Dropping the recorder stops it.
pub struct ChunkRecorder {
    stream: InputStream,
    sink: Option<SinkId>,
}

impl ChunkRecorder {
    /// Starts recording and returns the chunk channel.
    ///
    /// The header chunk is queued before any audio. PCM is emitted roughly
    /// every `interval` of captured audio.
    pub fn start(
        stream: &InputStream,
        interval: Duration,
    ) -> Result<(Self, UnboundedReceiver<Chunk>), hound::Error> {
        let (tx, rx) = mpsc::unbounded_channel();
        let header = wav_header(stream.sample_rate())?;
        let _ = tx.send(Chunk(header));

        let samples_per_chunk =
            (stream.sample_rate() as u128 * interval.as_millis() / 1000).max(1) as usize;
        let flush_bytes = samples_per_chunk * 2;

        let sink = stream.attach(Box::new(ChunkSink {
            tx,
            pending: Vec::with_capacity(flush_bytes),
            flush_bytes,
        }));

        tracing::debug!(
            "Chunk recorder started on {} ({} bytes per chunk)",
            stream.info().device,
            flush_bytes
        );

        Ok((
            Self {
                stream: stream.clone(),
                sink: Some(sink),
            },
            rx,
        ))
    }

    /// Stops capture. The final partial chunk is queued before this returns and
    /// the channel closes once it has been read.
    pub fn stop(&mut self) {
        if let Some(sink) = self.sink.take() {
            self.stream.detach(sink);
            tracing::debug!("Chunk recorder stopped");
        }
    }
}

impl Drop for ChunkRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}
