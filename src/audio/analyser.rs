//! Analysis tap and spectral sampler.
//!
//! The tap sits in the graph and keeps the most recent `FFT_SIZE` samples.
//! The sampler turns them into byte magnitudes the way an analyser node's
//! byte frequency data does: window, FFT, magnitude / N, smoothing over
//! time, decibels, then a linear map of `[min_db, max_db]` onto `0..=255`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use num_complex::Complex32;
use rustfft::{Fft, FftPlanner};
use spectrum_analyzer::windows::blackman_harris_4term;

use crate::error::SampleError;

/// Transform size of the tap.
pub const FFT_SIZE: usize = 2048;
/// Magnitude bins produced per sample.
pub const BIN_COUNT: usize = FFT_SIZE / 2;

static NEXT_TAP_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyserSettings {
    /// Weight of the previous spectrum, in [0, 1).
    pub smoothing: f32,
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for AnalyserSettings {
    fn default() -> Self {
        Self {
            smoothing: 0.8,
            min_db: -100.0,
            max_db: -30.0,
        }
    }
}

struct TimeRing {
    samples: Vec<f32>,
    write: usize,
}

/// Non-destructive tap exposing the latest time-domain window.
#[derive(Clone)]
pub struct AnalysisTap {
    id: u64,
    ring: Arc<Mutex<TimeRing>>,
}

impl Default for AnalysisTap {
    fn default() -> Self {
        Self::new()
    }
}

impl AnalysisTap {
    pub fn new() -> Self {
        Self {
            id: NEXT_TAP_ID.fetch_add(1, Ordering::Relaxed),
            ring: Arc::new(Mutex::new(TimeRing {
                samples: vec![0.0; FFT_SIZE],
                write: 0,
            })),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn bin_count(&self) -> usize {
        BIN_COUNT
    }

    /// Records a block of interleaved frames, down-mixed to mono. The block
    /// itself is left untouched.
    pub fn write(&self, block: &[f32], channels: usize) {
        if channels == 0 {
            return;
        }
        let Ok(mut ring) = self.ring.lock() else {
            return;
        };
        let scale = 1.0 / channels as f32;
        for frame in block.chunks(channels) {
            let mono = frame.iter().sum::<f32>() * scale;
            let write = ring.write;
            ring.samples[write] = mono;
            ring.write = (write + 1) % FFT_SIZE;
        }
    }

    /// Copies the window oldest sample first.
    fn copy_window(&self, out: &mut [f32]) {
        match self.ring.lock() {
            Ok(ring) => {
                let (newer, older) = ring.samples.split_at(ring.write);
                out[..older.len()].copy_from_slice(older);
                out[older.len()..].copy_from_slice(newer);
            }
            Err(_) => out.fill(0.0),
        }
    }
}

/// Converts tap windows into byte spectra. One sampler serves one renderer;
/// the smoothing state restarts whenever a different tap is sampled.
pub struct SpectralSampler {
    settings: AnalyserSettings,
    fft: Arc<dyn Fft<f32>>,
    window: Vec<f32>,
    time: Vec<f32>,
    spectrum: Vec<Complex32>,
    smoothed: Vec<f32>,
    tap_id: Option<u64>,
}

impl SpectralSampler {
    pub fn new(settings: AnalyserSettings) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(FFT_SIZE);
        Self {
            settings,
            fft,
            window: blackman_harris_4term(&[1.0; FFT_SIZE]),
            time: vec![0.0; FFT_SIZE],
            spectrum: vec![Complex32::new(0.0, 0.0); FFT_SIZE],
            smoothed: vec![0.0; BIN_COUNT],
            tap_id: None,
        }
    }

    /// Writes the current magnitude spectrum of `tap` into `into`.
    pub fn sample(&mut self, tap: &AnalysisTap, into: &mut [u8]) -> Result<(), SampleError> {
        if into.len() != tap.bin_count() {
            return Err(SampleError::BufferLength {
                expected: tap.bin_count(),
                actual: into.len(),
            });
        }
        if self.tap_id != Some(tap.id()) {
            self.smoothed.fill(0.0);
            self.tap_id = Some(tap.id());
        }

        tap.copy_window(&mut self.time);
        for ((bin, sample), w) in self.spectrum.iter_mut().zip(&self.time).zip(&self.window) {
            *bin = Complex32::new(sample * w, 0.0);
        }
        self.fft.process(&mut self.spectrum);

        let tau = self.settings.smoothing.clamp(0.0, 1.0);
        let scale = 1.0 / FFT_SIZE as f32;
        for (smoothed, bin) in self.smoothed.iter_mut().zip(&self.spectrum) {
            let magnitude = bin.norm() * scale;
            let next = tau * *smoothed + (1.0 - tau) * magnitude;
            *smoothed = if next.is_finite() { next } else { 0.0 };
        }

        magnitudes_to_bytes(
            &self.smoothed,
            into,
            self.settings.min_db,
            self.settings.max_db,
        );
        Ok(())
    }
}

/// Maps linear magnitudes to bytes over the `[min_db, max_db]` range.
pub fn magnitudes_to_bytes(magnitudes: &[f32], into: &mut [u8], min_db: f32, max_db: f32) {
    let range = (max_db - min_db).max(f32::EPSILON);
    for (byte, &magnitude) in into.iter_mut().zip(magnitudes) {
        if magnitude <= 0.0 {
            *byte = 0;
            continue;
        }
        let db = 20.0 * magnitude.log10();
        let scaled = (255.0 / range * (db - min_db)).floor();
        *byte = scaled.clamp(0.0, 255.0) as u8;
    }
}
