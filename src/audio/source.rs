use std::fmt;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use tracing::info;

use crate::error::{ChainError, MediaLoadError};
use crate::session::TransportEvent;

static NEXT_SOURCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(u64);

impl SourceId {
    fn next() -> Self {
        Self(NEXT_SOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A fully decoded track, interleaved `f32` samples in [-1, 1].
#[derive(Debug)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate as f64)
    }

    /// Decodes a WAV file into memory.
    pub fn load_wav(path: &Path) -> Result<Self, MediaLoadError> {
        if let Some(ext) = path.extension().and_then(|s| s.to_str()) {
            if !ext.eq_ignore_ascii_case("wav") {
                return Err(MediaLoadError::Unsupported(format!(".{ext} files")));
            }
        }

        let reader = hound::WavReader::open(path)?;
        let spec = reader.spec();
        if spec.channels == 0 || spec.sample_rate == 0 {
            return Err(MediaLoadError::Decode("empty WAV header".to_string()));
        }

        let int_depth_ok = (1..=32).contains(&spec.bits_per_sample);
        if spec.sample_format == hound::SampleFormat::Int && !int_depth_ok {
            return Err(MediaLoadError::Unsupported(format!(
                "{}-bit integer samples",
                spec.bits_per_sample
            )));
        }

        let samples: Vec<f32> = match spec.sample_format {
            hound::SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<_, _>>()?,
            hound::SampleFormat::Int => {
                let max_val = (1i64 << (spec.bits_per_sample - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / max_val))
                    .collect::<Result<_, _>>()?
            }
        };

        Ok(Self {
            samples,
            channels: spec.channels as usize,
            sample_rate: spec.sample_rate,
        })
    }
}

/// Transport flags shared between the control side and the source node.
#[derive(Debug, Default)]
struct TransportState {
    playing: AtomicBool,
    rewind: AtomicBool,
    ended: AtomicBool,
    position_frames: AtomicU64,
}

/// A loaded track that can be attached to one signal graph.
#[derive(Debug, Clone)]
pub struct SourceHandle {
    id: SourceId,
    name: String,
    audio: Arc<DecodedAudio>,
    transport: Arc<TransportState>,
    attached: Arc<AtomicBool>,
    notify: Sender<TransportEvent>,
    events: Receiver<TransportEvent>,
}

impl SourceHandle {
    /// Loads a track from disk.
    pub fn open(path: &Path) -> Result<Self, MediaLoadError> {
        let audio = DecodedAudio::load_wav(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        info!(
            track = %name,
            channels = audio.channels,
            sample_rate = audio.sample_rate,
            seconds = audio.duration().as_secs_f32(),
            "track decoded"
        );
        Ok(Self::from_audio(name, audio))
    }

    pub fn from_audio(name: impl Into<String>, audio: DecodedAudio) -> Self {
        let (notify, events) = crossbeam_channel::unbounded();
        Self {
            id: SourceId::next(),
            name: name.into(),
            audio: Arc::new(audio),
            transport: Arc::new(TransportState::default()),
            attached: Arc::new(AtomicBool::new(false)),
            notify,
            events,
        }
    }

    /// Next notification from the playing node (`Ended`), if any.
    pub fn poll_event(&self) -> Option<TransportEvent> {
        self.events.try_recv().ok()
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn duration(&self) -> Duration {
        self.audio.duration()
    }

    pub fn position(&self) -> Duration {
        if self.audio.sample_rate == 0 {
            return Duration::ZERO;
        }
        let frames = self.transport.position_frames.load(Ordering::Relaxed);
        Duration::from_secs_f64(frames as f64 / self.audio.sample_rate as f64)
    }

    /// Starts or continues playback. Playing an ended track restarts it.
    pub fn play(&self) {
        if self.transport.ended.swap(false, Ordering::AcqRel) {
            self.transport.rewind.store(true, Ordering::Release);
        }
        self.transport.playing.store(true, Ordering::Release);
    }

    pub fn pause(&self) {
        self.transport.playing.store(false, Ordering::Release);
    }

    pub fn is_playing(&self) -> bool {
        self.transport.playing.load(Ordering::Acquire)
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Creates the graph node for this track. Succeeds once per track.
    pub fn attach(&self, output_rate: u32) -> Result<SourceNode, ChainError> {
        if self.attached.swap(true, Ordering::AcqRel) {
            return Err(ChainError::SourceAlreadyAttached(self.id));
        }
        let step = if output_rate == 0 {
            1.0
        } else {
            self.audio.sample_rate as f64 / output_rate as f64
        };
        Ok(SourceNode {
            audio: Arc::clone(&self.audio),
            transport: Arc::clone(&self.transport),
            events: self.notify.clone(),
            position: 0.0,
            step,
        })
    }
}

/// Head of the signal graph. Runs on the audio thread.
pub struct SourceNode {
    audio: Arc<DecodedAudio>,
    transport: Arc<TransportState>,
    events: Sender<TransportEvent>,
    position: f64,
    step: f64,
}

impl SourceNode {
    /// Writes the next block of interleaved frames into `out`, resampling
    /// linearly to the output rate. Paused or ended sources write silence.
    pub fn fill(&mut self, out: &mut [f32], channels: usize) {
        if self.transport.rewind.swap(false, Ordering::AcqRel) {
            self.position = 0.0;
        }
        if channels == 0 || !self.transport.playing.load(Ordering::Acquire) {
            out.fill(0.0);
            return;
        }

        let frames = self.audio.frames();
        let src_channels = self.audio.channels;
        for frame in out.chunks_mut(channels) {
            let index = self.position as usize;
            if index >= frames {
                frame.fill(0.0);
                continue;
            }
            let next = (index + 1).min(frames - 1);
            let frac = (self.position - index as f64) as f32;
            for (ch, sample) in frame.iter_mut().enumerate() {
                let src_ch = ch % src_channels;
                let a = self.audio.samples[index * src_channels + src_ch];
                let b = self.audio.samples[next * src_channels + src_ch];
                *sample = a + (b - a) * frac;
            }
            self.position += self.step;
        }

        let index = (self.position as usize).min(frames);
        self.transport
            .position_frames
            .store(index as u64, Ordering::Relaxed);

        if index >= frames {
            self.transport.playing.store(false, Ordering::Release);
            if !self.transport.ended.swap(true, Ordering::AcqRel) {
                let _ = self.events.send(TransportEvent::Ended);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(frames: usize) -> DecodedAudio {
        DecodedAudio {
            samples: (0..frames).map(|i| i as f32 / frames as f32).collect(),
            channels: 1,
            sample_rate: 48_000,
        }
    }

    #[test]
    fn source_attaches_exactly_once() {
        let handle = SourceHandle::from_audio("ramp", ramp(16));
        assert!(handle.attach(48_000).is_ok());
        assert!(matches!(
            handle.clone().attach(48_000),
            Err(ChainError::SourceAlreadyAttached(id)) if id == handle.id()
        ));
    }

    #[test]
    fn paused_source_writes_silence() {
        let handle = SourceHandle::from_audio("ramp", ramp(16));
        let mut node = handle.attach(48_000).unwrap();
        let mut out = [1.0f32; 8];
        node.fill(&mut out, 2);
        assert!(out.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn mono_source_fans_out_to_every_channel() {
        let handle = SourceHandle::from_audio("ramp", ramp(16));
        let mut node = handle.attach(48_000).unwrap();
        handle.play();
        let mut out = [0.0f32; 8];
        node.fill(&mut out, 2);
        for frame in out.chunks(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert_eq!(out[2], 1.0 / 16.0);
    }

    #[test]
    fn end_of_track_emits_one_ended_event_and_replay_rewinds() {
        let handle = SourceHandle::from_audio("ramp", ramp(4));
        let mut node = handle.attach(48_000).unwrap();
        handle.play();

        let mut out = [0.0f32; 8];
        node.fill(&mut out, 1);
        node.fill(&mut out, 1);
        assert!(!handle.is_playing());
        assert_eq!(handle.poll_event(), Some(TransportEvent::Ended));
        assert_eq!(handle.poll_event(), None);

        handle.play();
        node.fill(&mut out, 1);
        assert_eq!(out[1], 0.25);
    }

    #[test]
    fn resampling_follows_rate_ratio() {
        let audio = DecodedAudio {
            samples: vec![0.0, 1.0, 2.0, 3.0],
            channels: 1,
            sample_rate: 24_000,
        };
        let handle = SourceHandle::from_audio("slow", audio);
        let mut node = handle.attach(48_000).unwrap();
        handle.play();
        let mut out = [0.0f32; 4];
        node.fill(&mut out, 1);
        assert_eq!(out, [0.0, 0.5, 1.0, 1.5]);
    }

    /// WAVE_FORMAT_EXTENSIBLE header whose valid bits field claims `valid_bits`.
    fn extensible_header(valid_bits: u16) -> Vec<u8> {
        let mut wav = Vec::new();
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&60u32.to_le_bytes());
        wav.extend_from_slice(b"WAVEfmt ");
        wav.extend_from_slice(&40u32.to_le_bytes());
        wav.extend_from_slice(&0xFFFEu16.to_le_bytes());
        wav.extend_from_slice(&1u16.to_le_bytes());
        wav.extend_from_slice(&48_000u32.to_le_bytes());
        wav.extend_from_slice(&96_000u32.to_le_bytes());
        wav.extend_from_slice(&2u16.to_le_bytes());
        wav.extend_from_slice(&16u16.to_le_bytes());
        wav.extend_from_slice(&22u16.to_le_bytes());
        wav.extend_from_slice(&valid_bits.to_le_bytes());
        wav.extend_from_slice(&4u32.to_le_bytes());
        // KSDATAFORMAT_SUBTYPE_PCM
        wav.extend_from_slice(&[
            0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x10, 0x00, 0x80, 0x00, 0x00, 0xAA, 0x00, 0x38,
            0x9B, 0x71,
        ]);
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&0u32.to_le_bytes());
        wav
    }

    #[test]
    fn oversized_bit_depth_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wide.wav");
        std::fs::write(&path, extensible_header(100)).unwrap();
        assert!(DecodedAudio::load_wav(&path).is_err());
        assert!(SourceHandle::open(&path).is_err());
    }

    #[test]
    fn non_wav_extension_is_unsupported() {
        let err = DecodedAudio::load_wav(Path::new("track.mp3")).unwrap_err();
        assert!(matches!(err, MediaLoadError::Unsupported(_)));
    }
}
