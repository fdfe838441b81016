//! Pieces module - TetriNET rotation system
//!
//! Each piece has one, two or four rotation states. Offsets are relative to
//! the piece anchor and may be negative; pieces rotate in place with no kicks.
//! Reference: https://tetris.wiki/TetriNet_Rotation_System

use crate::rng::SimpleRng;
use crate::types::PieceKind;

/// Offset of a single mino relative to piece origin
pub type MinoOffset = (i8, i8);

/// Shape of a piece - 4 mino offsets from piece origin
pub type PieceShape = [MinoOffset; 4];

/// Frequency table: 100 slots, each holding a piece or special index
pub type FrequencyTable = [u8; 100];

const I_SHAPES: [PieceShape; 2] = [
    [(-2, 0), (-1, 0), (0, 0), (1, 0)],
    [(0, 0), (0, 1), (0, 2), (0, 3)],
];

const O_SHAPES: [PieceShape; 1] = [[(0, 0), (0, 1), (1, 0), (1, 1)]];

const J_SHAPES: [PieceShape; 4] = [
    [(-1, 0), (-1, 1), (0, 1), (1, 1)],
    [(-1, 0), (0, 0), (-1, 1), (-1, 2)],
    [(-1, 0), (0, 0), (1, 0), (1, 1)],
    [(0, 0), (0, 1), (0, 2), (-1, 2)],
];

const L_SHAPES: [PieceShape; 4] = [
    [(1, 0), (-1, 1), (0, 1), (1, 1)],
    [(-1, 0), (0, 2), (-1, 1), (-1, 2)],
    [(-1, 0), (0, 0), (1, 0), (-1, 1)],
    [(-1, 0), (0, 0), (0, 1), (0, 2)],
];

const Z_SHAPES: [PieceShape; 2] = [
    [(-1, 0), (0, 0), (0, 1), (1, 1)],
    [(0, 0), (-1, 1), (0, 1), (-1, 2)],
];

const S_SHAPES: [PieceShape; 2] = [
    [(0, 0), (1, 0), (-1, 1), (0, 1)],
    [(-1, 0), (-1, 1), (0, 1), (0, 2)],
];

const T_SHAPES: [PieceShape; 4] = [
    [(-1, 1), (0, 0), (0, 1), (1, 1)],
    [(-1, 0), (-1, 1), (-1, 2), (0, 1)],
    [(-1, 0), (0, 0), (1, 0), (0, 1)],
    [(0, 0), (0, 1), (0, 2), (-1, 1)],
];

/// All rotation states of a piece
pub fn rotations(kind: PieceKind) -> &'static [PieceShape] {
    match kind {
        PieceKind::I => &I_SHAPES,
        PieceKind::O => &O_SHAPES,
        PieceKind::J => &J_SHAPES,
        PieceKind::L => &L_SHAPES,
        PieceKind::Z => &Z_SHAPES,
        PieceKind::S => &S_SHAPES,
        PieceKind::T => &T_SHAPES,
    }
}

/// Number of distinct rotation states
pub fn rotation_count(kind: PieceKind) -> u8 {
    rotations(kind).len() as u8
}

/// Get the shape for a piece kind; the rotation index wraps
pub fn get_shape(kind: PieceKind, rotation: u8) -> PieceShape {
    let states = rotations(kind);
    states[rotation as usize % states.len()]
}

/// Fixed block color of a piece
pub fn color(kind: PieceKind) -> u8 {
    match kind {
        PieceKind::I => 1,
        PieceKind::O => 2,
        PieceKind::J => 3,
        PieceKind::L => 4,
        PieceKind::Z => 5,
        PieceKind::S => 1,
        PieceKind::T => 2,
    }
}

/// Roll a piece from a frequency table.
///
/// Table values are validated when the rules are parsed; anything out of
/// range falls back to the I piece.
pub fn random_piece(table: &FrequencyTable, rng: &mut SimpleRng) -> PieceKind {
    let slot = rng.next_index(table.len());
    PieceKind::from_index(table[slot]).unwrap_or(PieceKind::I)
}

/// Roll a starting rotation for a piece
pub fn random_orientation(kind: PieceKind, rng: &mut SimpleRng) -> u8 {
    rng.next_range(rotation_count(kind) as u32) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_counts() {
        assert_eq!(rotation_count(PieceKind::I), 2);
        assert_eq!(rotation_count(PieceKind::O), 1);
        assert_eq!(rotation_count(PieceKind::J), 4);
        assert_eq!(rotation_count(PieceKind::L), 4);
        assert_eq!(rotation_count(PieceKind::Z), 2);
        assert_eq!(rotation_count(PieceKind::S), 2);
        assert_eq!(rotation_count(PieceKind::T), 4);
    }

    #[test]
    fn test_shapes_have_distinct_minos() {
        for kind in PieceKind::ALL {
            for shape in rotations(kind) {
                for i in 0..4 {
                    for j in (i + 1)..4 {
                        assert_ne!(shape[i], shape[j], "{:?} has overlapping minos", kind);
                    }
                }
            }
        }
    }

    #[test]
    fn test_rotation_wraps() {
        assert_eq!(get_shape(PieceKind::I, 2), get_shape(PieceKind::I, 0));
        assert_eq!(get_shape(PieceKind::O, 3), get_shape(PieceKind::O, 0));
        assert_eq!(get_shape(PieceKind::T, 5), get_shape(PieceKind::T, 1));
    }

    #[test]
    fn test_random_piece_follows_table() {
        let mut rng = SimpleRng::new(3);
        let table = [PieceKind::T.index(); 100];
        for _ in 0..50 {
            assert_eq!(random_piece(&table, &mut rng), PieceKind::T);
        }
    }

    #[test]
    fn test_random_orientation_in_range() {
        let mut rng = SimpleRng::new(11);
        for kind in PieceKind::ALL {
            for _ in 0..20 {
                assert!(random_orientation(kind, &mut rng) < rotation_count(kind));
            }
        }
    }

    #[test]
    fn test_colors_in_palette() {
        for kind in PieceKind::ALL {
            assert!((1..=crate::types::COLOR_COUNT).contains(&color(kind)));
        }
    }
}
