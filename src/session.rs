use tracing::info;

use crate::error::MediaLoadError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Idle,
    Live,
    Paused,
    Ended,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            PlaybackState::Idle => "Idle",
            PlaybackState::Live => "Live",
            PlaybackState::Paused => "Paused",
            PlaybackState::Ended => "Ended",
        }
    }
}

/// Notifications from the transport. The session only reacts to them.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportEvent {
    /// A track finished decoding and is ready to play.
    Loaded { name: String, autoplay: bool },
    Play,
    Pause,
    Ended,
    Error(MediaLoadError),
    /// The audio context could not be created or resumed.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct Session {
    state: PlaybackState,
    status: String,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            state: PlaybackState::Idle,
            status: "Press Space to start audio".to_string(),
        }
    }
}

impl Session {
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn apply(&mut self, event: &TransportEvent) {
        let previous = self.state;
        match event {
            TransportEvent::Loaded { name, autoplay } => {
                self.status = if *autoplay {
                    format!("Playing {name}…")
                } else {
                    format!("{name} loaded, press Space to play")
                };
            }
            TransportEvent::Play => {
                self.state = PlaybackState::Live;
                self.status = "Equalizer active".to_string();
            }
            TransportEvent::Pause => {
                self.state = PlaybackState::Paused;
                self.status = "Audio paused".to_string();
            }
            TransportEvent::Ended => {
                self.state = PlaybackState::Ended;
                self.status = "Playback finished".to_string();
            }
            TransportEvent::Error(err) => {
                self.status = err.status_message().to_string();
            }
            TransportEvent::Unavailable => {
                self.status = "Audio output unavailable, press Space to retry".to_string();
            }
        }
        if previous != self.state {
            info!(from = previous.label(), to = self.state.label(), "playback state");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_drives_the_state_machine() {
        let mut session = Session::default();
        assert_eq!(session.state(), PlaybackState::Idle);

        session.apply(&TransportEvent::Play);
        assert_eq!(session.state(), PlaybackState::Live);
        assert_eq!(session.status(), "Equalizer active");

        session.apply(&TransportEvent::Pause);
        assert_eq!(session.state(), PlaybackState::Paused);
        assert_eq!(session.status(), "Audio paused");

        session.apply(&TransportEvent::Play);
        session.apply(&TransportEvent::Ended);
        assert_eq!(session.state(), PlaybackState::Ended);
        assert_eq!(session.status(), "Playback finished");
    }

    #[test]
    fn errors_only_touch_the_status() {
        let mut session = Session::default();
        session.apply(&TransportEvent::Play);
        session.apply(&TransportEvent::Error(MediaLoadError::Decode("truncated".into())));
        assert_eq!(session.state(), PlaybackState::Live);
        assert_eq!(session.status(), "Error loading track (decode error)");

        session.apply(&TransportEvent::Unavailable);
        assert!(session.status().contains("retry"));
    }

    #[test]
    fn loaded_status_depends_on_autoplay() {
        let mut session = Session::default();
        session.apply(&TransportEvent::Loaded {
            name: "demo.wav".into(),
            autoplay: false,
        });
        assert_eq!(session.status(), "demo.wav loaded, press Space to play");
        assert_eq!(session.state(), PlaybackState::Idle);
    }
}
