//! Core types module - shared data structures and constants
//!
//! This module defines the fundamental types used throughout the workspace.
//! All types are plain data with no behavior beyond parsing and naming, so they
//! can be shared by the simulation core, the wire codec and any presenter.
//!
//! # Board Dimensions
//!
//! Classic TetriNET playfield dimensions:
//!
//! - **Width**: 12 columns (indexed 0-11)
//! - **Height**: 22 rows (indexed 0-21, row 0 at the top)
//! - **Spawn position**: (6, 0)
//!
//! # Specials
//!
//! | Index | Special | Code |
//! |-------|---------|------|
//! | 0 | Add Line | `a` |
//! | 1 | Clear Line | `c` |
//! | 2 | Nuke Field | `n` |
//! | 3 | Clear Random Blocks | `r` |
//! | 4 | Switch Fields | `s` |
//! | 5 | Clear Special Blocks | `b` |
//! | 6 | Block Gravity | `g` |
//! | 7 | Blockquake | `q` |
//! | 8 | Block Bomb | `o` |
//!
//! The index column is the value stored in a game's special frequency table.
//!
//! # Examples
//!
//! ```
//! use tetrinet_types::{Intent, PieceKind, Special, BOARD_HEIGHT, BOARD_WIDTH};
//!
//! assert_eq!(PieceKind::from_index(2), Some(PieceKind::J));
//! assert_eq!(Special::from_code('q'), Some(Special::QuakeField));
//! assert_eq!("use 3".parse::<Intent>(), Ok(Intent::UseSpecial(3)));
//! assert_eq!((BOARD_WIDTH, BOARD_HEIGHT), (12, 22));
//! ```

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Board width in cells (12 columns)
pub const BOARD_WIDTH: u8 = 12;

/// Board height in cells (22 rows)
pub const BOARD_HEIGHT: u8 = 22;

/// Column of the spawn anchor
pub const INITIAL_X: i8 = 6;

/// Number of roster slots (server player numbers 1..=6)
pub const MAX_PLAYERS: u8 = 6;

/// Broadcast target for specials (`sb 0 ...`)
pub const BROADCAST_TARGET: u8 = 0;

/// Number of block colors; cell colors are always in `1..=COLOR_COUNT`
pub const COLOR_COUNT: u8 = 5;

/// Palette index of every block that carries a special
pub const SPECIAL_COLOR: u8 = 1;

/// Percent threshold for a cell of an added line to stay filled
pub const ADD_LINE_BLOCK_CHANCE: u32 = 80;

/// Rows at the top that switch field and block bomb keep clear
pub const SAFE_ROWS: u8 = 6;

/// Cells hit by one "clear random blocks" special
pub const RANDOM_CLEAR_COUNT: usize = 10;

/// Inventory size stock servers hand out
pub const DEFAULT_SPECIAL_CAPACITY: usize = 18;

/// Storage bound of the inventory. Rules asking for more are held to this.
pub const SPECIAL_CAPACITY_LIMIT: usize = 256;

/// Attempts to find an empty column when every block already carries a special
pub const SPECIAL_DROP_TRIES: usize = 20;

/// Upper bound on consequence pipeline re-runs after a single freeze
pub const MAX_CONSEQUENCE_PASSES: usize = 32;

/// Tick interval at level 0 (plus 5ms; each level removes 10ms)
pub const BASE_TICK_MS: u32 = 1005;

/// Per-level tick speed-up
pub const TICK_STEP_MS: u32 = 10;

/// Piece kinds in TetriNET frequency-table order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PieceKind {
    I,
    O,
    J,
    L,
    Z,
    S,
    T,
}

impl PieceKind {
    pub const ALL: [PieceKind; 7] = [
        PieceKind::I,
        PieceKind::O,
        PieceKind::J,
        PieceKind::L,
        PieceKind::Z,
        PieceKind::S,
        PieceKind::T,
    ];

    /// Piece for a decoded frequency-table value
    pub fn from_index(index: u8) -> Option<Self> {
        Self::ALL.get(index as usize).copied()
    }

    pub fn index(&self) -> u8 {
        match self {
            PieceKind::I => 0,
            PieceKind::O => 1,
            PieceKind::J => 2,
            PieceKind::L => 3,
            PieceKind::Z => 4,
            PieceKind::S => 5,
            PieceKind::T => 6,
        }
    }
}

/// Special (power-up) effects.
///
/// The nine queueable specials can sit on a cell and travel in a player's
/// inventory. `ClassicAddLine` is the line-add a peer's multi-line clear
/// inflicts in classic mode; it only exists as a broadcast `cs<n>` message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Special {
    AddLine,
    ClearLine,
    NukeField,
    RandomClear,
    SwitchField,
    ClearSpecials,
    Gravity,
    QuakeField,
    BlockBomb,
    ClassicAddLine(u8),
}

impl Special {
    /// Queueable specials in frequency-table order
    pub const QUEUEABLE: [Special; 9] = [
        Special::AddLine,
        Special::ClearLine,
        Special::NukeField,
        Special::RandomClear,
        Special::SwitchField,
        Special::ClearSpecials,
        Special::Gravity,
        Special::QuakeField,
        Special::BlockBomb,
    ];

    /// Special for a decoded frequency-table value
    pub fn from_index(index: u8) -> Option<Self> {
        Self::QUEUEABLE.get(index as usize).copied()
    }

    /// Lowercase one-letter code used in fields and `sb` messages
    pub fn code(&self) -> Option<char> {
        match self {
            Special::AddLine => Some('a'),
            Special::ClearLine => Some('c'),
            Special::NukeField => Some('n'),
            Special::RandomClear => Some('r'),
            Special::SwitchField => Some('s'),
            Special::ClearSpecials => Some('b'),
            Special::Gravity => Some('g'),
            Special::QuakeField => Some('q'),
            Special::BlockBomb => Some('o'),
            Special::ClassicAddLine(_) => None,
        }
    }

    /// Parse a one-letter code (case-insensitive)
    pub fn from_code(c: char) -> Option<Self> {
        Self::QUEUEABLE
            .iter()
            .copied()
            .find(|s| s.code() == Some(c.to_ascii_lowercase()))
    }

    /// Token carried in the `sb` message (`a`, `q`, ..., or `cs2`)
    pub fn wire_token(&self) -> String {
        match self {
            Special::ClassicAddLine(n) => format!("cs{}", n),
            other => other.code().map(String::from).unwrap_or_default(),
        }
    }

    /// Parse an `sb` message token
    pub fn from_wire_token(token: &str) -> Option<Self> {
        if let Some(count) = token.strip_prefix("cs") {
            return count.parse::<u8>().ok().map(Special::ClassicAddLine);
        }
        let mut chars = token.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Self::from_code(c),
            _ => None,
        }
    }

    pub fn is_queueable(&self) -> bool {
        !matches!(self, Special::ClassicAddLine(_))
    }

    pub fn description(&self) -> &'static str {
        match self {
            Special::AddLine => "Add Line",
            Special::ClearLine => "Clear Line",
            Special::NukeField => "Nuke Field",
            Special::RandomClear => "Clear Random Blocks",
            Special::SwitchField => "Switch Fields",
            Special::ClearSpecials => "Clear Special Blocks",
            Special::Gravity => "Block Gravity",
            Special::QuakeField => "Blockquake",
            Special::BlockBomb => "Block Bomb",
            Special::ClassicAddLine(_) => "Lines Added",
        }
    }
}

/// An occupied cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub color: u8,
    pub special: Option<Special>,
}

impl Block {
    /// Plain colored block. Colors outside the palette are clamped into it.
    pub fn new(color: u8) -> Self {
        Self {
            color: color.clamp(1, COLOR_COUNT),
            special: None,
        }
    }

    /// Block carrying a special. Field encodings only carry the special's
    /// letter, so these always use [`SPECIAL_COLOR`].
    pub fn with_special(special: Special) -> Self {
        Self {
            color: SPECIAL_COLOR,
            special: Some(special),
        }
    }

    /// Put a special on this block
    pub fn tag(&mut self, special: Special) {
        *self = Self::with_special(special);
    }
}

/// Cell on the board (None = empty)
pub type Cell = Option<Block>;

/// Game-wide status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GameStatus {
    Unstarted,
    Playing,
    Paused,
}

/// Local player's status within a running game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerStatus {
    Alive,
    Dead,
}

/// User intents emitted by an input layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    MoveLeft,
    MoveRight,
    Rotate,
    SoftDrop,
    HardDrop,
    /// Use the oldest special on a local player number (1 = self)
    UseSpecial(u8),
    DiscardSpecial,
    Chat(String),
    Action(String),
    GameMessage(String),
    StartGame,
    StopGame,
    Pause,
    Resume,
    Quit,
}

/// Text that is not a known command
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command: {0:?}")]
pub struct ParseIntentError(pub String);

/// Text commands: `left`, `drop`, `use 2`, `say hi`, ...
impl FromStr for Intent {
    type Err = ParseIntentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (head, rest) = match s.split_once(' ') {
            Some((h, r)) => (h, r.trim()),
            None => (s, ""),
        };
        let intent = match head.to_lowercase().as_str() {
            "left" | "h" => Some(Intent::MoveLeft),
            "right" | "l" => Some(Intent::MoveRight),
            "rotate" | "k" => Some(Intent::Rotate),
            "down" | "j" => Some(Intent::SoftDrop),
            "drop" => Some(Intent::HardDrop),
            "use" => rest.parse::<u8>().ok().map(Intent::UseSpecial),
            "discard" => Some(Intent::DiscardSpecial),
            "say" if !rest.is_empty() => Some(Intent::Chat(rest.to_string())),
            "me" if !rest.is_empty() => Some(Intent::Action(rest.to_string())),
            "gmsg" if !rest.is_empty() => Some(Intent::GameMessage(rest.to_string())),
            "start" => Some(Intent::StartGame),
            "stop" => Some(Intent::StopGame),
            "pause" => Some(Intent::Pause),
            "resume" => Some(Intent::Resume),
            "quit" => Some(Intent::Quit),
            // Number keys 1-6 use the special on that local player.
            d if d.len() == 1 => d
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=MAX_PLAYERS).contains(n))
                .map(Intent::UseSpecial),
            _ => None,
        };
        intent.ok_or_else(|| ParseIntentError(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_special_codes_roundtrip() {
        for special in Special::QUEUEABLE {
            let code = special.code().unwrap();
            assert_eq!(Special::from_code(code), Some(special));
            assert_eq!(Special::from_code(code.to_ascii_uppercase()), Some(special));
        }
        assert_eq!(Special::from_code('x'), None);
    }

    #[test]
    fn test_classic_add_line_token() {
        assert_eq!(Special::ClassicAddLine(4).wire_token(), "cs4");
        assert_eq!(Special::from_wire_token("cs2"), Some(Special::ClassicAddLine(2)));
        assert_eq!(Special::from_wire_token("a"), Some(Special::AddLine));
        assert_eq!(Special::from_wire_token("ab"), None);
        assert_eq!(Special::from_wire_token("csx"), None);
        assert!(!Special::ClassicAddLine(1).is_queueable());
    }

    #[test]
    fn test_piece_index_order() {
        for (i, kind) in PieceKind::ALL.iter().enumerate() {
            assert_eq!(kind.index() as usize, i);
        }
        assert_eq!(PieceKind::from_index(7), None);
    }

    #[test]
    fn test_block_color_clamped() {
        assert_eq!(Block::new(0).color, 1);
        assert_eq!(Block::new(9).color, COLOR_COUNT);
    }

    #[test]
    fn test_intent_parsing() {
        assert_eq!("left".parse::<Intent>(), Ok(Intent::MoveLeft));
        assert_eq!("say hello world".parse::<Intent>(), Ok(Intent::Chat("hello world".into())));
        assert_eq!(" use 2 ".parse::<Intent>(), Ok(Intent::UseSpecial(2)));
        assert_eq!("4".parse::<Intent>(), Ok(Intent::UseSpecial(4)));
        assert!("7".parse::<Intent>().is_err());
        assert!("say".parse::<Intent>().is_err());
        assert_eq!(
            "bogus".parse::<Intent>(),
            Err(ParseIntentError("bogus".to_string()))
        );
    }
}
