use serde::Serialize;

use crate::board::{ActivePiece, Board};
use crate::protocol::cell_code;
use crate::types::{GameStatus, PieceKind, PlayerStatus, Special, BOARD_WIDTH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ActiveSnapshot {
    pub kind: PieceKind,
    pub rotation: u8,
    pub x: i8,
    pub y: i8,
    pub color: u8,
    pub cells: [(i8, i8); 4],
}

impl From<ActivePiece> for ActiveSnapshot {
    fn from(value: ActivePiece) -> Self {
        Self {
            kind: value.kind,
            rotation: value.rotation,
            x: value.x,
            y: value.y,
            color: value.color(),
            cells: value.cells(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BoardSnapshot {
    /// Server player number
    pub player: u8,
    /// Number as seen by this client (1 = self)
    pub local: u8,
    pub name: Option<String>,
    pub active: bool,
    /// One string per row in wire characters (`0` empty, digit, special code)
    pub rows: Vec<String>,
    pub piece: Option<ActiveSnapshot>,
}

impl BoardSnapshot {
    pub fn rows_of(board: &Board) -> Vec<String> {
        board
            .cells()
            .chunks(BOARD_WIDTH as usize)
            .map(|row| row.iter().map(|&c| cell_code(c) as char).collect())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub my_number: u8,
    pub status: GameStatus,
    pub player_status: PlayerStatus,
    pub boards: Vec<BoardSnapshot>,
    pub specials: Vec<Special>,
    pub special_capacity: usize,
    pub next_piece: PieceKind,
    pub next_rotation: u8,
    pub level: u32,
    pub lines: u32,
    pub tick_ms: u32,
}
