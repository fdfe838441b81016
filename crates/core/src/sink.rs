//! Sinks - the two interfaces a session talks through
//!
//! A session never reaches for a socket or a screen. It is handed a
//! [`FrameSink`] for outbound wire frames and a [`Presenter`] for snapshots
//! and notable events when it is constructed.

use serde::Serialize;

use crate::snapshot::SessionSnapshot;
use crate::types::Special;

/// Outbound text frames (without terminator)
pub trait FrameSink {
    fn send_frame(&mut self, frame: &str);
}

/// Collects frames in memory
impl FrameSink for Vec<String> {
    fn send_frame(&mut self, frame: &str) {
        self.push(frame.to_string());
    }
}

/// Something shown to the player besides the boards
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PresenterEvent {
    Chat { player: u8, name: String, text: String },
    Action { player: u8, name: String, text: String },
    GameMessage { text: String },
    PlayerJoined { player: u8, name: String },
    PlayerLeft { player: u8 },
    PlayerWon { player: u8 },
    PlayerLost { player: u8 },
    SpecialUsed {
        target: u8,
        special: Special,
        source: u8,
        description: &'static str,
    },
    /// Clear per-game labels and chat at game start
    ResetLabels,
    GameEnded,
    Paused { paused: bool },
    Died,
}

impl PresenterEvent {
    /// A special went off, labelled with its human-readable name
    pub fn special_used(target: u8, special: Special, source: u8) -> Self {
        Self::SpecialUsed {
            target,
            special,
            source,
            description: special.description(),
        }
    }
}

/// Consumer of read-only session state
pub trait Presenter {
    /// Called at most once per flush, only when something changed
    fn redraw(&mut self, snapshot: &SessionSnapshot);

    fn event(&mut self, _event: &PresenterEvent) {}
}

/// Presenter that keeps everything it is given
#[derive(Debug, Default)]
pub struct RecordingPresenter {
    pub redraws: usize,
    pub last: Option<SessionSnapshot>,
    pub events: Vec<PresenterEvent>,
}

impl Presenter for RecordingPresenter {
    fn redraw(&mut self, snapshot: &SessionSnapshot) {
        self.redraws += 1;
        self.last = Some(snapshot.clone());
    }

    fn event(&mut self, event: &PresenterEvent) {
        self.events.push(event.clone());
    }
}
