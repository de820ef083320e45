//! Shared handle to a live capture stream.
//!
//! The platform callback pushes captured frames into an [`InputStream`]; the
//! spectrum renderer reads the most recent samples from its tap and the
//! recorder attaches a [`PcmSink`] to receive every sample in capture order.
//! Clones share the same underlying stream.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Number of recent mono samples kept for analysis.
pub const TAP_CAPACITY: usize = 4096;

/// Receives mono PCM in capture order while attached to a stream.
pub trait PcmSink: Send {
    /// Accepts one captured buffer.
    fn write(&mut self, pcm: &[i16]);

    /// Called exactly once when the sink is detached. Buffered data must be
    /// delivered before this returns.
    fn close(self: Box<Self>);
}

/// Identifies an attached sink.
pub type SinkId = u64;

/// Negotiated properties of a capture stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamInfo {
    /// Resolved device name
    pub device: String,
    /// Capture sample rate in Hz
    pub sample_rate: u32,
    /// Channel count of the device's native format (samples are downmixed to mono)
    pub channels: u16,
}

struct SinkTable {
    next_id: SinkId,
    entries: Vec<(SinkId, Box<dyn PcmSink>)>,
}

struct Shared {
    info: StreamInfo,
    tap: Mutex<VecDeque<f32>>,
    sinks: Mutex<SinkTable>,
}

/// Opaque, clonable handle to one live audio source.
#[derive(Clone)]
pub struct InputStream {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for InputStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InputStream")
            .field("info", &self.shared.info)
            .finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InputStream {
    /// Creates a stream handle with an empty tap and no sinks.
    pub fn new(info: StreamInfo) -> Self {
        Self {
            shared: Arc::new(Shared {
                info,
                tap: Mutex::new(VecDeque::with_capacity(TAP_CAPACITY)),
                sinks: Mutex::new(SinkTable {
                    next_id: 0,
                    entries: Vec::new(),
                }),
            }),
        }
    }

    pub fn info(&self) -> &StreamInfo {
        &self.shared.info
    }

    pub fn sample_rate(&self) -> u32 {
        self.shared.info.sample_rate
    }

    /// Returns true if both handles refer to the same live stream.
    pub fn same_stream(&self, other: &InputStream) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Feeds interleaved frames in the device's native channel layout.
    ///
    /// Multi-channel audio is converted to mono by averaging channels.
    pub fn push_interleaved(&self, data: &[i16]) {
        let channels = self.shared.info.channels.max(1) as usize;
        if channels == 1 {
            self.push_mono(data);
            return;
        }

        let mono: Vec<i16> = data
            .chunks_exact(channels)
            .map(|frame| {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect();
        self.push_mono(&mono);
    }

    /// Feeds mono samples to the analysis tap and every attached sink.
    pub fn push_mono(&self, pcm: &[i16]) {
        if pcm.is_empty() {
            return;
        }

        {
            let mut tap = lock(&self.shared.tap);
            let overflow = (tap.len() + pcm.len()).saturating_sub(TAP_CAPACITY);
            let cut = overflow.min(tap.len());
            tap.drain(..cut);
            let start = pcm.len().saturating_sub(TAP_CAPACITY);
            tap.extend(pcm[start..].iter().map(|&s| s as f32 / 32768.0));
        }

        let mut sinks = lock(&self.shared.sinks);
        for (_, sink) in sinks.entries.iter_mut() {
            sink.write(pcm);
        }
    }

    /// Copies the most recent samples into `out`, right-aligned.
    ///
    /// Leading positions are zero-filled when fewer samples have been captured.
    pub fn copy_latest(&self, out: &mut [f32]) {
        let tap = lock(&self.shared.tap);
        let available = tap.len().min(out.len());
        let pad = out.len() - available;
        out[..pad].fill(0.0);
        for (dst, src) in out[pad..].iter_mut().zip(tap.iter().skip(tap.len() - available)) {
            *dst = *src;
        }
    }

    /// Attaches a sink that will receive every subsequently captured buffer.
    pub fn attach(&self, sink: Box<dyn PcmSink>) -> SinkId {
        let mut sinks = lock(&self.shared.sinks);
        let id = sinks.next_id;
        sinks.next_id += 1;
        sinks.entries.push((id, sink));
        tracing::debug!("Sink {} attached to {}", id, self.shared.info.device);
        id
    }

    /// Detaches and closes a sink. Returns false if the id is unknown.
    ///
    /// Runs under the same lock as the capture path, so no buffer can reach
    /// the sink after this returns.
    pub fn detach(&self, id: SinkId) -> bool {
        let mut sinks = lock(&self.shared.sinks);
        let Some(pos) = sinks.entries.iter().position(|(entry_id, _)| *entry_id == id) else {
            return false;
        };
        let (_, sink) = sinks.entries.remove(pos);
        sink.close();
        tracing::debug!("Sink {} detached from {}", id, self.shared.info.device);
        true
    }

    /// Closes every attached sink. Called when the platform stream dies, so
    /// recorders see their feed end instead of waiting forever.
    pub fn end(&self) {
        let mut sinks = lock(&self.shared.sinks);
        for (id, sink) in sinks.entries.drain(..) {
            sink.close();
            tracing::debug!("Sink {} closed: {} ended", id, self.shared.info.device);
        }
    }

    #[cfg(test)]
    pub fn sink_count(&self) -> usize {
        lock(&self.shared.sinks).entries.len()
    }
}
