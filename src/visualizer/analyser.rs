//! Frequency analysis node for the spectrum display.
//!
//! Produces byte magnitudes the way a classic real-time analyser does:
//! Blackman window, forward FFT, temporal smoothing across frames, then a
//! linear mapping of a decibel range onto `0..=255`.

use crate::capture::InputStream;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

/// Transform window size in samples.
pub const FFT_SIZE: usize = 256;

/// Number of frequency bins produced per frame.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

const SMOOTHING: f32 = 0.8;
const MIN_DB: f32 = -100.0;
const MAX_DB: f32 = -30.0;

/// One frame of byte magnitudes, one per frequency bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyFrame(pub Vec<u8>);

impl FrequencyFrame {
    pub fn bins(&self) -> &[u8] {
        &self.0
    }
}

/// Analysis node bound to one input stream.
pub struct Analyser {
    stream: InputStream,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    time_domain: Vec<f32>,
    buffer: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
}

impl Analyser {
    /// Binds a new analyser to `stream` with a [`FFT_SIZE`] window.
    pub fn new(stream: InputStream) -> Self {
        let mut planner = FftPlanner::new();
        Self {
            stream,
            fft: planner.plan_fft_forward(FFT_SIZE),
            window: blackman_window(FFT_SIZE),
            time_domain: vec![0.0; FFT_SIZE],
            buffer: vec![Complex::new(0.0, 0.0); FFT_SIZE],
            smoothed: vec![0.0; BIN_COUNT],
        }
    }

    pub fn stream(&self) -> &InputStream {
        &self.stream
    }

    /// Samples the stream and returns the current frequency frame.
    pub fn frequency_frame(&mut self) -> FrequencyFrame {
        self.stream.copy_latest(&mut self.time_domain);
        let samples = std::mem::take(&mut self.time_domain);
        let frame = self.analyse(&samples);
        self.time_domain = samples;
        frame
    }

    /// Runs one analysis step on an explicit window of samples.
    pub fn analyse(&mut self, samples: &[f32]) -> FrequencyFrame {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = samples.get(i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft.process(&mut self.buffer);

        let scale = 1.0 / FFT_SIZE as f32;
        let bytes = self
            .smoothed
            .iter_mut()
            .zip(self.buffer.iter())
            .map(|(previous, bin)| {
                let magnitude = bin.norm() * scale;
                *previous = SMOOTHING * *previous + (1.0 - SMOOTHING) * magnitude;
                to_byte(*previous)
            })
            .collect();

        FrequencyFrame(bytes)
    }
}

fn to_byte(magnitude: f32) -> u8 {
    let db = if magnitude > 0.0 {
        20.0 * magnitude.log10()
    } else {
        f32::NEG_INFINITY
    };
    let scaled = (255.0 / (MAX_DB - MIN_DB)) * (db - MIN_DB);
    scaled.clamp(0.0, 255.0) as u8
}

fn blackman_window(size: usize) -> Vec<f32> {
    let alpha = 0.16;
    let a0 = (1.0 - alpha) / 2.0;
    let a1 = 0.5;
    let a2 = alpha / 2.0;
    (0..size)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / size as f32;
            a0 - a1 * phase.cos() + a2 * (2.0 * phase).cos()
        })
        .collect()
}
