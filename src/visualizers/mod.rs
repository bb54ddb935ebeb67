//! Frame rendering: spectral snapshot in, bar field and glow out.

pub mod bars;
pub mod canvas;
pub mod color;
pub mod glow;
pub mod surface;

use tracing::warn;

use crate::audio::{AnalyserSettings, AnalysisTap, SpectralSampler};
use bars::Bar;
use canvas::Canvas;
use color::Rgba;
use glow::{Glow, overall_level};
use surface::{LinearGradient, Paint, Surface};

/// Fill used while no analysis tap exists.
pub const PLACEHOLDER: Rgba = Rgba::rgb8(15, 23, 42);
const BACKGROUND_NEAR: Rgba = Rgba::rgb8(2, 6, 23);

/// What the last frame showed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameKind {
    Placeholder,
    Spectrum(Glow),
}

impl FrameKind {
    pub fn glow(&self) -> Glow {
        match self {
            FrameKind::Placeholder => Glow::idle(),
            FrameKind::Spectrum(glow) => *glow,
        }
    }
}

// --- Visualizer Trait ---

pub trait Visualizer {
    fn name(&self) -> &str;
    /// Paints one frame into `canvas` and reports what was shown.
    fn draw(&mut self, tap: Option<&AnalysisTap>, canvas: &mut Canvas) -> FrameKind;
}

// --- Spectrum Lights ---

/// Produces one frame per call from the latest spectral snapshot.
pub struct FrameRenderer {
    sampler: SpectralSampler,
    snapshot: Vec<u8>,
    bars: Vec<Bar>,
}

impl FrameRenderer {
    pub fn new(settings: AnalyserSettings) -> Self {
        Self {
            sampler: SpectralSampler::new(settings),
            snapshot: Vec::new(),
            bars: Vec::with_capacity(bars::BAR_COUNT),
        }
    }

    /// The snapshot painted by the last spectrum frame.
    pub fn snapshot(&self) -> &[u8] {
        &self.snapshot
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    /// Renders into `canvas`. Without a tap, or if sampling fails, the
    /// placeholder is painted instead.
    pub fn render(&mut self, tap: Option<&AnalysisTap>, canvas: &mut Canvas) -> FrameKind {
        let Some(tap) = tap else {
            paint_placeholder(canvas.surface_mut());
            return FrameKind::Placeholder;
        };

        if self.snapshot.len() != tap.bin_count() {
            self.snapshot = vec![0; tap.bin_count()];
        }
        if let Err(err) = self.sampler.sample(tap, &mut self.snapshot) {
            warn!("spectral sampling failed, showing placeholder: {}", err);
            paint_placeholder(canvas.surface_mut());
            return FrameKind::Placeholder;
        }

        let glow = paint_spectrum(&self.snapshot, canvas.surface_mut(), &mut self.bars);
        FrameKind::Spectrum(glow)
    }
}

impl Visualizer for FrameRenderer {
    fn name(&self) -> &str {
        "Spectrum Lights"
    }

    fn draw(&mut self, tap: Option<&AnalysisTap>, canvas: &mut Canvas) -> FrameKind {
        self.render(tap, canvas)
    }
}

pub fn paint_placeholder(surface: &mut Surface) {
    surface.clear(PLACEHOLDER);
}

/// Paints background and bars for `bins`; returns the glow to apply
/// around the deck.
pub fn paint_spectrum(bins: &[u8], surface: &mut Surface, bars_out: &mut Vec<Bar>) -> Glow {
    let glow = Glow::from_level(overall_level(bins));
    let (width, height) = surface.logical_size();

    let background = LinearGradient::new((0.0, height), (width, 0.0))
        .stop(0.0, BACKGROUND_NEAR)
        .stop(0.35, BACKGROUND_NEAR)
        .stop(1.0, Rgba::BLACK);
    surface.clear(Rgba::BLACK);
    surface.fill_rect(0.0, 0.0, width, height, &Paint::Linear(background));

    bars::layout(bins, width, height, bars_out);
    for bar in bars_out.iter() {
        bars::paint_bar(surface, bar);
    }
    glow
}
