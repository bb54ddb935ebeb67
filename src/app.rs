use std::path::PathBuf;
use std::time::Duration;

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use tracing::{info, warn};

use crate::audio::{
    AnalyserSettings, AnalysisTap, ContextFactory, DEFAULT_VOLUME, SignalChainBuilder,
    SourceHandle,
};
use crate::controls::{ControlId, Selection, parse_band_gain};
use crate::error::ControlError;
use crate::session::{PlaybackState, Session, TransportEvent};

// --- Settings & Commands ---

/// Everything the deck is configured with at startup.
#[derive(Debug, Clone, PartialEq)]
pub struct DeckSettings {
    pub tracks: Vec<PathBuf>,
    pub volume: f32,
    /// Raw `BAND=DB` assignments, validated when the deck is built.
    pub band_gains: Vec<String>,
    pub autoplay: bool,
    pub fps: u32,
    pub density: u32,
    pub analyser: AnalyserSettings,
}

impl Default for DeckSettings {
    fn default() -> Self {
        Self {
            tracks: vec![PathBuf::from("demo.wav")],
            volume: DEFAULT_VOLUME,
            band_gains: Vec::new(),
            autoplay: false,
            fps: 60,
            density: 2,
            analyser: AnalyserSettings::default(),
        }
    }
}

/// User intent, independent of the input device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckCommand {
    TogglePlayback,
    NextTrack,
    SelectNext,
    SelectPrevious,
    Increase,
    Decrease,
    Reset,
    Quit,
}

impl DeckCommand {
    pub fn from_key(key: KeyEvent) -> Option<Self> {
        if key.kind != KeyEventKind::Press {
            return None;
        }
        let command = match key.code {
            KeyCode::Char(' ') => DeckCommand::TogglePlayback,
            KeyCode::Char('n') | KeyCode::Tab => DeckCommand::NextTrack,
            KeyCode::Down => DeckCommand::SelectNext,
            KeyCode::Up => DeckCommand::SelectPrevious,
            KeyCode::Right | KeyCode::Char('+') => DeckCommand::Increase,
            KeyCode::Left | KeyCode::Char('-') => DeckCommand::Decrease,
            KeyCode::Char('0') => DeckCommand::Reset,
            KeyCode::Char('q') | KeyCode::Esc => DeckCommand::Quit,
            _ => return None,
        };
        Some(command)
    }
}

// --- Deck Controller ---

pub struct App<F: ContextFactory> {
    builder: SignalChainBuilder<F>,
    session: Session,
    selection: Selection,
    playlist: Vec<PathBuf>,
    track_index: usize,
    source: Option<SourceHandle>,
}

impl<F: ContextFactory> App<F> {
    /// Creates the deck and applies the initial volume and band gains.
    /// Malformed initial values are discarded with a warning.
    pub fn new(factory: F, settings: &DeckSettings) -> Self {
        let mut app = Self {
            builder: SignalChainBuilder::new(factory),
            session: Session::default(),
            selection: Selection::default(),
            playlist: settings.tracks.clone(),
            track_index: 0,
            source: None,
        };

        if let Err(err) = app.set_control(ControlId::Volume, settings.volume) {
            warn!("ignoring initial volume {}: {}", settings.volume, err);
        }
        for assignment in &settings.band_gains {
            let applied = parse_band_gain(assignment)
                .and_then(|(index, db)| app.set_control(ControlId::Band(index), db));
            if let Err(err) = applied {
                warn!("ignoring --gain {:?}: {}", assignment, err);
            }
        }
        app
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn selection(&self) -> ControlId {
        self.selection.current()
    }

    pub fn builder(&self) -> &SignalChainBuilder<F> {
        &self.builder
    }

    pub fn source(&self) -> Option<&SourceHandle> {
        self.source.as_ref()
    }

    pub fn playlist(&self) -> &[PathBuf] {
        &self.playlist
    }

    pub fn track_index(&self) -> usize {
        self.track_index
    }

    /// Analysis tap of the live chain, if one has been built.
    pub fn tap(&self) -> Option<&AnalysisTap> {
        self.builder.chain().map(|chain| chain.tap())
    }

    /// Current value of a slider.
    pub fn control_value(&self, id: ControlId) -> f32 {
        match id {
            ControlId::Volume => self.builder.master_volume(),
            ControlId::Band(index) => self.builder.band_gain(index).unwrap_or(0.0),
        }
    }

    /// Track name with elapsed and total time.
    pub fn now_playing(&self) -> Option<(&str, Duration, Duration)> {
        self.source
            .as_ref()
            .map(|s| (s.name(), s.position(), s.duration()))
    }

    /// Clamps `value` for `id` and forwards it to the builder.
    pub fn set_control(&mut self, id: ControlId, value: f32) -> Result<(), ControlError> {
        let value = id.clamp(value)?;
        match id {
            ControlId::Volume => {
                self.builder.set_master_volume(value);
                Ok(())
            }
            ControlId::Band(index) => self.builder.set_band_gain(index, value),
        }
    }

    /// Loads playlist entry `index`, replacing the current source.
    ///
    /// If a chain already exists, or `autoplay` is set, playback starts on
    /// the new track right away.
    pub fn load_track(&mut self, index: usize, autoplay: bool) {
        let Some(path) = self.playlist.get(index).cloned() else {
            warn!(index, "no such track in the playlist");
            return;
        };
        let was_live = self.session.state() == PlaybackState::Live;
        if let Some(old) = self.source.take() {
            old.pause();
        }
        self.track_index = index;

        match SourceHandle::open(&path) {
            Ok(source) => {
                let autoplay = autoplay || self.builder.chain().is_some();
                self.session.apply(&TransportEvent::Loaded {
                    name: source.name().to_string(),
                    autoplay,
                });
                self.source = Some(source);
                if autoplay {
                    self.play();
                }
            }
            Err(err) => {
                warn!(path = %path.display(), "track failed to load: {}", err);
                if was_live {
                    self.session.apply(&TransportEvent::Pause);
                }
                self.session.apply(&TransportEvent::Error(err));
            }
        }
    }

    pub fn next_track(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        let next = (self.track_index + 1) % self.playlist.len();
        self.load_track(next, false);
    }

    /// Starts the chain if needed, resumes the context and plays the source.
    pub fn play(&mut self) {
        let Some(source) = self.source.clone() else {
            warn!("play requested without a loaded track");
            return;
        };
        let started = self
            .builder
            .start(&source)
            .and_then(|_| self.builder.resume());
        if let Err(err) = started {
            warn!("audio output unavailable: {}", err);
            self.session.apply(&TransportEvent::Unavailable);
            return;
        }
        source.play();
        self.session.apply(&TransportEvent::Play);
    }

    pub fn pause(&mut self) {
        if let Some(source) = &self.source {
            source.pause();
            self.session.apply(&TransportEvent::Pause);
        }
    }

    pub fn toggle_playback(&mut self) {
        if self.session.state() == PlaybackState::Live {
            self.pause();
        } else {
            self.play();
        }
    }

    /// Applies notifications raised by the audio thread since the last call.
    pub fn poll_transport(&mut self) {
        let Some(source) = &self.source else {
            return;
        };
        while let Some(event) = source.poll_event() {
            if event == TransportEvent::Ended {
                info!(track = source.name(), "track ended");
            }
            self.session.apply(&event);
        }
    }

    /// Moves the selected slider by `steps` increments.
    pub fn adjust_selected(&mut self, steps: i32) {
        let id = self.selection.current();
        let value = self.control_value(id) + steps as f32 * id.step();
        if let Err(err) = self.set_control(id, value) {
            warn!(control = id.label(), "discarding control input: {}", err);
        }
    }

    pub fn reset_selected(&mut self) {
        let id = self.selection.current();
        let value = match id {
            ControlId::Volume => DEFAULT_VOLUME,
            ControlId::Band(_) => 0.0,
        };
        if let Err(err) = self.set_control(id, value) {
            warn!(control = id.label(), "discarding control input: {}", err);
        }
    }

    /// Executes `command`. Returns `false` once the deck should close.
    pub fn handle(&mut self, command: DeckCommand) -> bool {
        match command {
            DeckCommand::TogglePlayback => self.toggle_playback(),
            DeckCommand::NextTrack => self.next_track(),
            DeckCommand::SelectNext => self.selection.next(),
            DeckCommand::SelectPrevious => self.selection.previous(),
            DeckCommand::Increase => self.adjust_selected(1),
            DeckCommand::Decrease => self.adjust_selected(-1),
            DeckCommand::Reset => self.reset_selected(),
            DeckCommand::Quit => return false,
        }
        true
    }
}
