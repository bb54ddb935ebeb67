//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::app::DeckSettings;
use crate::audio::{AnalyserSettings, DEFAULT_VOLUME};
use crate::logging::LogConfig;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectrum_deck")]
#[command(about = "Terminal DJ deck with a five band EQ and spectrum lights", long_about = None)]
pub struct Args {
    /// WAV tracks to load, in playlist order
    #[arg(value_name = "TRACK", default_value = "demo.wav")]
    pub tracks: Vec<PathBuf>,

    /// Initial master volume (0.0 - 1.0)
    #[arg(long, value_name = "LEVEL", default_value_t = DEFAULT_VOLUME)]
    pub volume: f32,

    /// Initial band gain, e.g. `bass=4` or `2=-3` (repeatable)
    #[arg(long = "gain", value_name = "BAND=DB")]
    pub gains: Vec<String>,

    /// Frame rate of the render loop
    #[arg(long, value_name = "FPS", default_value_t = 60)]
    pub fps: u32,

    /// Spectrum smoothing between frames (0.0 - 1.0)
    #[arg(long, value_name = "FACTOR", default_value_t = 0.8)]
    pub smoothing: f32,

    /// Pixels per logical unit on each axis (1 - 4)
    #[arg(long, value_name = "N", default_value_t = 2)]
    pub density: u32,

    /// Start playing the first track immediately
    #[arg(long)]
    pub autoplay: bool,

    /// Write logs to this file
    #[arg(long, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Log level used when RUST_LOG is unset
    #[arg(long, value_name = "LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Args {
    pub fn log_config(&self) -> LogConfig {
        LogConfig {
            level: self.log_level.clone(),
            file: self.log_file.clone(),
        }
    }

    pub fn deck_settings(&self) -> DeckSettings {
        DeckSettings {
            tracks: self.tracks.clone(),
            volume: self.volume,
            band_gains: self.gains.clone(),
            autoplay: self.autoplay,
            fps: self.fps.max(1),
            density: self.density,
            analyser: AnalyserSettings {
                smoothing: self.smoothing.clamp(0.0, 1.0),
                ..AnalyserSettings::default()
            },
        }
    }
}
