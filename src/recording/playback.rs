//! Playback of finished takes.

use super::artifact::Artifact;
use anyhow::{anyhow, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Destination for playing an artifact.
pub trait PlaybackSink {
    /// Takes a handle to the artifact that `play` should use.
    fn load(&mut self, artifact: Arc<Artifact>) -> Result<()>;

    /// Plays the loaded artifact from the beginning.
    fn play(&mut self) -> Result<()>;
}

/// Decodes a WAV artifact into mono f32 samples and its sample rate.
///
/// # Errors
/// - If the artifact is not a readable WAV file
pub fn decode_wav(artifact: &Artifact) -> Result<(Vec<f32>, u32)> {
    let reader = hound::WavReader::new(Cursor::new(artifact.bytes()))
        .map_err(|e| anyhow!("Take is not a readable WAV file: {e}"))?;
    let spec = reader.spec();
    let channels = spec.channels.max(1) as usize;

    let interleaved: Vec<f32> = reader
        .into_samples::<i16>()
        .collect::<std::result::Result<Vec<i16>, _>>()
        .map_err(|e| anyhow!("Failed to decode take: {e}"))?
        .into_iter()
        .map(|s| s as f32 / 32768.0)
        .collect();

    let mono = if channels == 1 {
        interleaved
    } else {
        interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    Ok((mono, spec.sample_rate))
}

/// Maps an output frame index onto the source buffer by nearest sample.
fn source_index(frame: usize, source_rate: u32, output_rate: u32) -> usize {
    (frame as u64 * source_rate as u64 / output_rate.max(1) as u64) as usize
}

/// Plays takes on the default output device.
pub struct CpalPlayback {
    artifact: Option<Arc<Artifact>>,
    samples: Arc<Vec<f32>>,
    sample_rate: u32,
    stream: Option<cpal::Stream>,
}

impl Default for CpalPlayback {
    fn default() -> Self {
        Self::new()
    }
}

impl CpalPlayback {
    pub fn new() -> Self {
        Self {
            artifact: None,
            samples: Arc::new(Vec::new()),
            sample_rate: 0,
            stream: None,
        }
    }

    fn build_stream(&self) -> Result<cpal::Stream> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No audio output device available"))?;
        let supported = device.default_output_config()?;
        let sample_format = supported.sample_format();
        let config: cpal::StreamConfig = supported.into();

        tracing::debug!(
            "Playback on {} at {}Hz, {} channels",
            device.name().unwrap_or_else(|_| "Unknown device".to_string()),
            config.sample_rate.0,
            config.channels
        );

        match sample_format {
            cpal::SampleFormat::F32 => self.build_typed::<f32>(&device, &config),
            cpal::SampleFormat::I16 => self.build_typed::<i16>(&device, &config),
            cpal::SampleFormat::U16 => self.build_typed::<u16>(&device, &config),
            other => Err(anyhow!("Unsupported output sample format: {other:?}")),
        }
    }

    fn build_typed<T>(
        &self,
        device: &cpal::Device,
        config: &cpal::StreamConfig,
    ) -> Result<cpal::Stream>
    where
        T: cpal::SizedSample + cpal::FromSample<f32>,
    {
        let samples = Arc::clone(&self.samples);
        let source_rate = self.sample_rate;
        let output_rate = config.sample_rate.0;
        let channels = config.channels.max(1) as usize;
        let position = Arc::new(AtomicUsize::new(0));

        let stream = device.build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let mut frame = position.load(Ordering::Relaxed);
                for out in data.chunks_mut(channels) {
                    let value = samples
                        .get(source_index(frame, source_rate, output_rate))
                        .copied()
                        .unwrap_or(0.0);
                    for slot in out.iter_mut() {
                        *slot = T::from_sample(value);
                    }
                    frame += 1;
                }
                position.store(frame, Ordering::Relaxed);
            },
            |err| tracing::error!("Playback stream error: {}", err),
            None,
        )?;
        Ok(stream)
    }
}

impl PlaybackSink for CpalPlayback {
    fn load(&mut self, artifact: Arc<Artifact>) -> Result<()> {
        let (samples, sample_rate) = decode_wav(&artifact)?;
        tracing::debug!(
            "Playback loaded {} samples at {}Hz",
            samples.len(),
            sample_rate
        );

        self.stream = None;
        self.samples = Arc::new(samples);
        self.sample_rate = sample_rate;
        self.artifact = Some(artifact);
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        if self.artifact.is_none() {
            return Err(anyhow!("Nothing loaded for playback"));
        }

        let stream = self.build_stream()?;
        stream.play()?;
        self.stream = Some(stream);
        tracing::info!("Playback started");
        Ok(())
    }
}
