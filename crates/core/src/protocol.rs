//! Protocol module - the TetriNET text wire format
//!
//! Frames are space-delimited text; the first token is the command. This
//! module owns every byte-level detail: login obfuscation, full and delta
//! field strings, and the typed server/client message sets.
//!
//! # Field strings
//!
//! A full field is 264 characters, row-major: `'0'` empty, `'1'..='5'` a
//! color, or a lowercase special code. A delta field starts with one of the
//! partial characters `!"#$%&'()*+,-./`, each standing for the full code at
//! the same position in `012345acnrsbgqo`, followed by `(column, row)` pairs
//! offset from `'3'`. A partial character switches the code applied to the
//! pairs that follow it.

use std::fmt;

use crate::board::Board;
use crate::params::{GameParams, FAST_MARKER, NEWGAME_MARKER};
use crate::types::{Block, Cell, Special, BOARD_HEIGHT, BOARD_WIDTH};

const PARTIAL_UPDATE_CHARS: &[u8; 15] = b"!\"#$%&'()*+,-./";
const FULL_UPDATE_CHARS: &[u8; 15] = b"012345acnrsbgqo";
const INDEX_CODE_BASE: u8 = b'3';

/// Key derived from the fixed client address 127.0.0.1
/// (54*127 + 41*0 + 29*0 + 17*1).
const LOGIN_KEY: &[u8] = b"6875";
const LOGIN_SEED: u8 = 128;

/// Wire decode failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("Empty frame")]
    Empty,
    #[error("Unknown command: {0}")]
    UnknownCommand(String),
    #[error("{command}: expected {expected} fields, got {got}")]
    MissingField {
        command: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("Invalid number: {0}")]
    BadNumber(String),
    #[error("Invalid frequency string ({0} chars)")]
    BadFrequencies(usize),
    #[error("Invalid field string at offset {0}")]
    BadField(usize),
    #[error("Unknown special: {0}")]
    BadSpecial(String),
}

/// Obfuscate a login string for the legacy server.
///
/// Output is the seed byte followed by one byte per input character, each as
/// two uppercase hex digits.
pub fn login_encode(s: &str) -> String {
    let mut dec = LOGIN_SEED as u32;
    let mut out = format!("{:02X}", dec);
    for (i, c) in s.chars().enumerate() {
        dec = ((dec + c as u32) % 255) ^ LOGIN_KEY[i % LOGIN_KEY.len()] as u32;
        out.push_str(&format!("{:02X}", dec & 0xFF));
    }
    out
}

/// Login string announcing a client nickname
pub fn login_string(nick: &str) -> String {
    format!("tetrisstart {} 1.13", nick)
}

/// First frame a client sends: the obfuscated login string
pub fn login_frame(nick: &str) -> String {
    ClientMessage::Login(login_encode(&login_string(nick))).to_string()
}

/// Team announcement sent right after `playernum`
pub fn team_frame(player: u8, team: &str) -> String {
    ClientMessage::Team {
        player,
        team: team.to_string(),
    }
    .to_string()
}

/// Wire character for one cell
pub fn cell_code(cell: Cell) -> u8 {
    match cell {
        None => b'0',
        Some(Block {
            special: Some(special),
            ..
        }) => special.code().map(|c| c as u8).unwrap_or(b'1'),
        Some(block) => b'0' + block.color,
    }
}

/// Cell for one wire character
fn code_cell(code: u8) -> Option<Cell> {
    match code {
        b'0' => Some(None),
        b'1'..=b'5' => Some(Some(Block::new(code - b'0'))),
        other => Special::from_code(other as char)
            .filter(Special::is_queueable)
            .map(|special| Some(Block::with_special(special))),
    }
}

fn partial_to_full(c: u8) -> Option<u8> {
    PARTIAL_UPDATE_CHARS
        .iter()
        .position(|&p| p == c)
        .map(|i| FULL_UPDATE_CHARS[i])
}

fn full_to_partial(c: u8) -> Option<u8> {
    FULL_UPDATE_CHARS
        .iter()
        .position(|&f| f == c)
        .map(|i| PARTIAL_UPDATE_CHARS[i])
}

/// True if the field string is a delta update
pub fn is_partial(field: &str) -> bool {
    field
        .as_bytes()
        .first()
        .is_some_and(|&c| partial_to_full(c).is_some())
}

/// Encode a whole board
pub fn encode_field_full(board: &Board) -> String {
    board.cells().iter().map(|&c| cell_code(c) as char).collect()
}

/// Encode the cells that differ between two boards, or None if none do
pub fn encode_field_delta(prev: &Board, next: &Board) -> Option<String> {
    let mut out = String::new();
    for &code in FULL_UPDATE_CHARS {
        let mut header_written = false;
        for (i, (&a, &b)) in prev.cells().iter().zip(next.cells()).enumerate() {
            if a == b || cell_code(b) != code {
                continue;
            }
            if !header_written {
                if let Some(partial) = full_to_partial(code) {
                    out.push(partial as char);
                }
                header_written = true;
            }
            out.push((INDEX_CODE_BASE + (i % BOARD_WIDTH as usize) as u8) as char);
            out.push((INDEX_CODE_BASE + (i / BOARD_WIDTH as usize) as u8) as char);
        }
    }
    (!out.is_empty()).then_some(out)
}

/// Encode `next`, as a delta against `prev` when that is shorter.
/// Returns None when nothing changed.
pub fn encode_field(prev: Option<&Board>, next: &Board) -> Option<String> {
    let full = encode_field_full(next);
    let Some(prev) = prev else {
        return Some(full);
    };
    match encode_field_delta(prev, next) {
        None => None,
        Some(delta) if delta.len() < full.len() => Some(delta),
        Some(_) => Some(full),
    }
}

/// Apply a full or delta field string to a board.
///
/// Nothing is written unless the whole string decodes.
pub fn decode_field(board: &mut Board, field: &str) -> Result<(), ProtocolError> {
    let bytes = field.as_bytes();
    let mut decoded = board.clone();

    if is_partial(field) {
        let mut code = None;
        let mut i = 0;
        while i < bytes.len() {
            if let Some(full) = partial_to_full(bytes[i]) {
                code = Some(full);
                i += 1;
                continue;
            }
            if i + 1 >= bytes.len() {
                break;
            }
            let x = bytes[i].wrapping_sub(INDEX_CODE_BASE) as i8;
            let y = bytes[i + 1].wrapping_sub(INDEX_CODE_BASE) as i8;
            if let Some(code) = code {
                let cell = code_cell(code).ok_or(ProtocolError::BadField(i))?;
                decoded.set(x, y, cell);
            }
            i += 2;
        }
    } else {
        let size = BOARD_WIDTH as usize * BOARD_HEIGHT as usize;
        if bytes.len() < size {
            return Err(ProtocolError::BadField(bytes.len()));
        }
        for (i, &code) in bytes[..size].iter().enumerate() {
            let cell = code_cell(code).ok_or(ProtocolError::BadField(i))?;
            decoded.set(
                (i % BOARD_WIDTH as usize) as i8,
                (i / BOARD_WIDTH as usize) as i8,
                cell,
            );
        }
    }

    board.copy_cells_from(&decoded);
    Ok(())
}

/// Messages the server sends
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Field { player: u8, field: String },
    SpecialUsed { target: u8, special: Special, source: u8 },
    NewGame(Box<GameParams>),
    Pause(bool),
    EndGame,
    InGame,
    PlayerJoin { player: u8, name: String },
    PlayerLeave(u8),
    PlayerWon(u8),
    PlayerLost(u8),
    PlayerNum(u8),
    PlayerLine { player: u8, text: String },
    PlayerAction { player: u8, text: String },
    GameMessage(String),
    Team { player: u8, team: String },
    Level { player: u8, level: u32 },
}

impl ServerMessage {
    pub fn parse(frame: &str) -> Result<Self, ProtocolError> {
        let frame = frame.trim_end_matches(['\r', '\n', '\u{ff}']);
        let tokens: Vec<&str> = frame.split(' ').collect();
        let command = tokens.first().copied().unwrap_or_default();
        // Free text keeps its internal spacing.
        let text_after = |n: usize| -> String {
            frame.splitn(n + 1, ' ').nth(n).unwrap_or_default().to_string()
        };

        let msg = match command {
            "" => return Err(ProtocolError::Empty),
            "f" => ServerMessage::Field {
                player: player(&tokens, 1, "f")?,
                field: tokens.get(2).copied().unwrap_or_default().to_string(),
            },
            "sb" => {
                require(&tokens, 4, "sb")?;
                let special = Special::from_wire_token(tokens[2])
                    .ok_or_else(|| ProtocolError::BadSpecial(tokens[2].to_string()))?;
                ServerMessage::SpecialUsed {
                    target: player(&tokens, 1, "sb")?,
                    special,
                    source: player(&tokens, 3, "sb")?,
                }
            }
            NEWGAME_MARKER | FAST_MARKER => {
                ServerMessage::NewGame(Box::new(GameParams::parse_rules(&tokens)?))
            }
            "pause" => {
                require(&tokens, 2, "pause")?;
                ServerMessage::Pause(tokens[1] == "1")
            }
            "endgame" => ServerMessage::EndGame,
            "ingame" => ServerMessage::InGame,
            "playerjoin" => ServerMessage::PlayerJoin {
                player: player(&tokens, 1, "playerjoin")?,
                name: text_after(2),
            },
            "playerleave" => ServerMessage::PlayerLeave(player(&tokens, 1, "playerleave")?),
            "playerwon" => ServerMessage::PlayerWon(player(&tokens, 1, "playerwon")?),
            "playerlost" => ServerMessage::PlayerLost(player(&tokens, 1, "playerlost")?),
            "playernum" => ServerMessage::PlayerNum(player(&tokens, 1, "playernum")?),
            "pline" => ServerMessage::PlayerLine {
                player: player(&tokens, 1, "pline")?,
                text: text_after(2),
            },
            "plineact" => ServerMessage::PlayerAction {
                player: player(&tokens, 1, "plineact")?,
                text: text_after(2),
            },
            "gmsg" => ServerMessage::GameMessage(text_after(1)),
            "team" => ServerMessage::Team {
                player: player(&tokens, 1, "team")?,
                team: text_after(2),
            },
            "lvl" => {
                require(&tokens, 3, "lvl")?;
                ServerMessage::Level {
                    player: player(&tokens, 1, "lvl")?,
                    level: tokens[2]
                        .parse()
                        .map_err(|_| ProtocolError::BadNumber(tokens[2].to_string()))?,
                }
            }
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };
        Ok(msg)
    }
}

fn require(tokens: &[&str], n: usize, command: &'static str) -> Result<(), ProtocolError> {
    if tokens.len() < n {
        return Err(ProtocolError::MissingField {
            command,
            expected: n,
            got: tokens.len(),
        });
    }
    Ok(())
}

fn player(tokens: &[&str], at: usize, command: &'static str) -> Result<u8, ProtocolError> {
    require(tokens, at + 1, command)?;
    tokens[at]
        .parse()
        .map_err(|_| ProtocolError::BadNumber(tokens[at].to_string()))
}

/// Messages the client sends
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Already-obfuscated login blob
    Login(String),
    Team { player: u8, team: String },
    Field { player: u8, field: String },
    SpecialUsed { target: u8, special: Special, source: u8 },
    PlayerLost(u8),
    Level { player: u8, level: u32 },
    PlayerLine { player: u8, text: String },
    PlayerAction { player: u8, text: String },
    GameMessage(String),
    StartGame { start: bool, player: u8 },
    Pause { paused: bool, player: u8 },
}

impl fmt::Display for ClientMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientMessage::Login(blob) => f.write_str(blob),
            ClientMessage::Team { player, team } => write!(f, "team {} {}", player, team),
            ClientMessage::Field { player, field } => write!(f, "f {} {}", player, field),
            ClientMessage::SpecialUsed {
                target,
                special,
                source,
            } => write!(f, "sb {} {} {}", target, special.wire_token(), source),
            ClientMessage::PlayerLost(player) => write!(f, "playerlost {}", player),
            ClientMessage::Level { player, level } => write!(f, "lvl {} {}", player, level),
            ClientMessage::PlayerLine { player, text } => write!(f, "pline {} {}", player, text),
            ClientMessage::PlayerAction { player, text } => {
                write!(f, "plineact {} {}", player, text)
            }
            ClientMessage::GameMessage(text) => write!(f, "gmsg {}", text),
            ClientMessage::StartGame { start, player } => {
                write!(f, "startgame {} {}", u8::from(*start), player)
            }
            ClientMessage::Pause { paused, player } => {
                write!(f, "pause {} {}", u8::from(*paused), player)
            }
        }
    }
}
