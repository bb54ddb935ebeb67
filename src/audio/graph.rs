use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz};

use super::analyser::AnalysisTap;
use super::bands::BandDefinition;
use super::param::LiveParam;
use super::source::SourceNode;
use crate::error::ChainError;

/// One equalizer band: a biquad per output channel.
pub struct FilterStage {
    band: &'static BandDefinition,
    gain: LiveParam,
    applied_gain: f32,
    sample_rate: f32,
    filters: Vec<DirectForm2Transposed<f32>>,
}

fn coefficients(
    band: &'static BandDefinition,
    gain_db: f32,
    sample_rate: f32,
) -> Result<Coefficients<f32>, ChainError> {
    Coefficients::<f32>::from_params(
        band.shape.biquad_type(gain_db),
        sample_rate.hz(),
        band.center_hz.hz(),
        band.shape.resonance(),
    )
    .map_err(|e| ChainError::InvalidStage {
        label: band.label,
        reason: format!("{e:?}"),
    })
}

impl FilterStage {
    pub fn new(
        band: &'static BandDefinition,
        gain: LiveParam,
        sample_rate: u32,
        channels: usize,
    ) -> Result<Self, ChainError> {
        let sample_rate = sample_rate as f32;
        let applied_gain = gain.get();
        let coeffs = coefficients(band, applied_gain, sample_rate)?;
        Ok(Self {
            band,
            gain,
            applied_gain,
            sample_rate,
            filters: (0..channels.max(1))
                .map(|_| DirectForm2Transposed::<f32>::new(coeffs))
                .collect(),
        })
    }

    /// Gain the coefficients were last computed for.
    pub fn applied_gain(&self) -> f32 {
        self.applied_gain
    }

    fn refresh(&mut self) {
        let gain = self.gain.get();
        if gain == self.applied_gain {
            return;
        }
        // A rejected gain keeps the previous response.
        if let Ok(coeffs) = coefficients(self.band, gain, self.sample_rate) {
            for filter in &mut self.filters {
                filter.update_coefficients(coeffs);
            }
            self.applied_gain = gain;
        }
    }

    pub fn process(&mut self, block: &mut [f32], channels: usize) {
        self.refresh();
        for frame in block.chunks_mut(channels) {
            for (sample, filter) in frame.iter_mut().zip(self.filters.iter_mut()) {
                *sample = filter.run(*sample);
            }
        }
    }
}

/// Linear gain stage.
pub struct GainStage {
    gain: LiveParam,
}

impl GainStage {
    pub fn new(gain: LiveParam) -> Self {
        Self { gain }
    }

    pub fn process(&mut self, block: &mut [f32]) {
        let gain = self.gain.get();
        for sample in block.iter_mut() {
            *sample *= gain;
        }
    }
}

/// A fully wired chain. Owned by the context's sink once connected.
pub struct SignalGraph {
    source: SourceNode,
    stages: Vec<FilterStage>,
    master: GainStage,
    tap: AnalysisTap,
}

impl SignalGraph {
    pub fn new(
        source: SourceNode,
        stages: Vec<FilterStage>,
        master: GainStage,
        tap: AnalysisTap,
    ) -> Self {
        Self {
            source,
            stages,
            master,
            tap,
        }
    }

    /// Produces one block of interleaved output.
    pub fn render(&mut self, out: &mut [f32], channels: usize) {
        if channels == 0 {
            return;
        }
        self.source.fill(out, channels);
        for stage in &mut self.stages {
            stage.process(out, channels);
        }
        self.master.process(out);
        self.tap.write(out, channels);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::bands::EQ_BANDS;

    fn sine(freq: f32, sample_rate: f32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate).sin())
            .collect()
    }

    fn rms(block: &[f32]) -> f32 {
        (block.iter().map(|s| s * s).sum::<f32>() / block.len() as f32).sqrt()
    }

    #[test]
    fn flat_stage_passes_signal_through() {
        let mut stage = FilterStage::new(&EQ_BANDS[2], LiveParam::new(0.0), 48_000, 1).unwrap();
        let input = sine(1000.0, 48_000.0, 4800);
        let mut block = input.clone();
        stage.process(&mut block, 1);
        for (a, b) in input.iter().zip(&block) {
            assert!((a - b).abs() < 1e-4);
        }
    }

    #[test]
    fn boosting_a_peak_raises_its_centre_frequency() {
        let gain = LiveParam::new(0.0);
        let mut stage = FilterStage::new(&EQ_BANDS[2], gain.clone(), 48_000, 1).unwrap();
        gain.set(12.0);
        let mut block = sine(1000.0, 48_000.0, 9600);
        stage.process(&mut block, 1);
        assert_eq!(stage.applied_gain(), 12.0);
        // Skip the filter's settling time; +12 dB is roughly 4x amplitude.
        let boosted = rms(&block[4800..]);
        assert!(boosted > 0.707 * 3.5, "rms {boosted}");
    }

    #[test]
    fn gain_stage_scales_linearly() {
        let mut stage = GainStage::new(LiveParam::new(0.5));
        let mut block = vec![1.0, -0.5, 0.25];
        stage.process(&mut block);
        assert_eq!(block, vec![0.5, -0.25, 0.125]);
    }

    #[test]
    fn treble_above_nyquist_is_rejected() {
        let err = FilterStage::new(&EQ_BANDS[4], LiveParam::new(0.0), 8_000, 2);
        assert!(matches!(err, Err(ChainError::InvalidStage { label: "TREBLE", .. })));
    }
}
