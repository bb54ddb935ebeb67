use super::color::Rgba;

/// Raw mean energy is usually low; boost it before clamping.
pub const GLOW_GAIN: f32 = 3.0;

const SKY: Rgba = Rgba::rgb8(56, 189, 248);
const VIOLET: Rgba = Rgba::rgb8(168, 85, 247);
const ORANGE: Rgba = Rgba::rgb8(249, 115, 22);

/// One of the three concentric soft shadows around the deck.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShadowLayer {
    /// Spread, relative to the widest layer.
    pub spread: f32,
    pub color: Rgba,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub intensity: f32,
    /// Innermost layer first.
    pub layers: [ShadowLayer; 3],
    pub border: Rgba,
}

impl Glow {
    /// Glow for a frame whose mean spectral energy is `overall_level`.
    pub fn from_level(overall_level: f32) -> Self {
        let intensity = (overall_level * GLOW_GAIN).clamp(0.0, 1.0);
        Self {
            intensity,
            layers: [
                ShadowLayer {
                    spread: 60.0 / 180.0,
                    color: SKY.with_alpha(0.35 + intensity * 0.7),
                },
                ShadowLayer {
                    spread: 140.0 / 180.0,
                    color: VIOLET.with_alpha(0.3 + intensity * 0.9),
                },
                ShadowLayer {
                    spread: 1.0,
                    color: ORANGE.with_alpha(intensity * 0.9),
                },
            ],
            border: SKY.with_alpha(0.6 + intensity * 0.35),
        }
    }

    /// Glow shown while nothing is playing.
    pub fn idle() -> Self {
        Self::from_level(0.0)
    }
}

/// Mean energy of a snapshot, in [0, 1].
pub fn overall_level(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let total: u64 = bins.iter().map(|&b| b as u64).sum();
    total as f32 / (bins.len() as f32 * 255.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_is_mean_energy() {
        assert_eq!(overall_level(&[0; 1024]), 0.0);
        assert_eq!(overall_level(&[255; 1024]), 1.0);
        assert_eq!(overall_level(&[]), 0.0);
        let half: Vec<u8> = (0..1024).map(|i| if i % 2 == 0 { 255 } else { 0 }).collect();
        assert_eq!(overall_level(&half), 0.5);
    }

    #[test]
    fn intensity_is_boosted_and_clamped() {
        assert!((Glow::from_level(0.1).intensity - 0.3).abs() < 1e-6);
        assert_eq!(Glow::from_level(1.0).intensity, 1.0);
        assert_eq!(Glow::from_level(0.5).intensity, 1.0);
    }

    #[test]
    fn opacities_follow_intensity() {
        let quiet = Glow::idle();
        assert_eq!(quiet.layers[2].color.a, 0.0);
        assert!((quiet.border.a - 0.6).abs() < 1e-6);

        let loud = Glow::from_level(1.0);
        assert!((loud.border.a - 0.95).abs() < 1e-6);
        assert_eq!(loud.layers[0].color.a, 1.0);
        assert_eq!(loud.layers[1].color.a, 1.0);
        assert!((loud.layers[2].color.a - 0.9).abs() < 1e-6);
    }
}
