//! Board module - one player's field plus their falling piece
//!
//! The board is a 12x22 grid where each cell is empty or holds a colored block
//! that may carry a special. Uses a flat array for cache locality.
//! Coordinates: (x, y) where x ranges 0..11 (left to right), y ranges 0..21
//! (top to bottom). Pieces spawn with their anchor at (6, 0).
//!
//! Collision treats the sides and the floor as walls but not the ceiling: a
//! piece may hang above row 0 while it spawns or rotates.

use arrayvec::ArrayVec;

use crate::pieces::{self, PieceShape};
use crate::types::{Block, Cell, PieceKind, Special, BOARD_HEIGHT, BOARD_WIDTH, INITIAL_X};

/// Total number of cells on the board
pub const BOARD_SIZE: usize = (BOARD_WIDTH as usize) * (BOARD_HEIGHT as usize);

/// Specials collected from a single removed row
pub type RowSpecials = ArrayVec<Special, { BOARD_WIDTH as usize }>;

/// The piece currently falling on a board
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ActivePiece {
    pub kind: PieceKind,
    pub rotation: u8,
    pub x: i8,
    pub y: i8,
}

impl ActivePiece {
    pub fn shape(&self) -> PieceShape {
        pieces::get_shape(self.kind, self.rotation)
    }

    pub fn color(&self) -> u8 {
        pieces::color(self.kind)
    }

    /// Absolute cell positions of the piece
    pub fn cells(&self) -> [(i8, i8); 4] {
        self.shape().map(|(dx, dy)| (self.x + dx, self.y + dy))
    }
}

/// The game board - 12 columns x 22 rows using flat array storage
#[derive(Debug, Clone, PartialEq)]
pub struct Board {
    /// Flat array of cells, row-major order (y * WIDTH + x)
    cells: [Cell; BOARD_SIZE],
    active: Option<ActivePiece>,
}

impl Board {
    /// Create a new empty board
    pub fn new() -> Self {
        Self {
            cells: [None; BOARD_SIZE],
            active: None,
        }
    }

    /// Calculate flat index from (x, y) coordinates
    #[inline(always)]
    fn index(x: i8, y: i8) -> Option<usize> {
        if x < 0 || x >= BOARD_WIDTH as i8 || y < 0 || y >= BOARD_HEIGHT as i8 {
            return None;
        }
        Some((y as usize) * (BOARD_WIDTH as usize) + (x as usize))
    }

    pub fn width(&self) -> u8 {
        BOARD_WIDTH
    }

    pub fn height(&self) -> u8 {
        BOARD_HEIGHT
    }

    /// Get cell at position (x, y)
    /// Returns None if out of bounds
    pub fn get(&self, x: i8, y: i8) -> Option<Cell> {
        Self::index(x, y).map(|idx| self.cells[idx])
    }

    /// Set cell at position (x, y)
    /// Returns false if out of bounds
    pub fn set(&mut self, x: i8, y: i8, cell: Cell) -> bool {
        match Self::index(x, y) {
            Some(idx) => {
                self.cells[idx] = cell;
                true
            }
            None => false,
        }
    }

    /// Check if position is occupied (within bounds and filled)
    pub fn is_occupied(&self, x: i8, y: i8) -> bool {
        matches!(self.get(x, y), Some(Some(_)))
    }

    /// Check if a row is completely filled
    pub fn is_row_full(&self, y: usize) -> bool {
        self.row(y).is_some_and(|row| row.iter().all(|cell| cell.is_some()))
    }

    /// Borrow one row
    pub fn row(&self, y: usize) -> Option<&[Cell]> {
        if y >= BOARD_HEIGHT as usize {
            return None;
        }
        let start = y * BOARD_WIDTH as usize;
        Some(&self.cells[start..start + BOARD_WIDTH as usize])
    }

    fn row_mut(&mut self, y: usize) -> &mut [Cell] {
        let start = y * BOARD_WIDTH as usize;
        &mut self.cells[start..start + BOARD_WIDTH as usize]
    }

    /// True if any cell of `shape` anchored at (x, y) is off the sides, at or
    /// below the floor, or on an occupied cell. Rows above the top never collide.
    pub fn intersects(&self, shape: &PieceShape, x: i8, y: i8) -> bool {
        shape.iter().any(|&(dx, dy)| {
            let nx = x + dx;
            let ny = y + dy;
            if nx < 0 || nx >= BOARD_WIDTH as i8 || ny >= BOARD_HEIGHT as i8 {
                return true;
            }
            ny >= 0 && self.is_occupied(nx, ny)
        })
    }

    /// Current falling piece
    pub fn active(&self) -> Option<ActivePiece> {
        self.active
    }

    /// True if the falling piece overlaps the field where it stands
    pub fn piece_collides(&self) -> bool {
        self.active
            .is_some_and(|p| self.intersects(&p.shape(), p.x, p.y))
    }

    /// Place a new piece at the spawn point.
    /// Returns false if it cannot be placed (the player is dead).
    pub fn new_piece(&mut self, kind: PieceKind, rotation: u8) -> bool {
        let piece = ActivePiece {
            kind,
            rotation: rotation % pieces::rotation_count(kind),
            x: INITIAL_X,
            y: 0,
        };
        self.active = Some(piece);
        !self.intersects(&piece.shape(), piece.x, piece.y)
    }

    /// Rotate to the next state in place; silently does nothing on collision
    pub fn rotate(&mut self) {
        let Some(active) = self.active else {
            return;
        };
        let rotation = (active.rotation + 1) % pieces::rotation_count(active.kind);
        let shape = pieces::get_shape(active.kind, rotation);
        if !self.intersects(&shape, active.x, active.y) {
            self.active = Some(ActivePiece { rotation, ..active });
        }
    }

    /// Try to move the falling piece; no change if the target collides
    pub fn move_piece(&mut self, dx: i8, dy: i8) -> bool {
        let Some(active) = self.active else {
            return false;
        };
        let (x, y) = (active.x + dx, active.y + dy);
        if self.intersects(&active.shape(), x, y) {
            return false;
        }
        self.active = Some(ActivePiece { x, y, ..active });
        true
    }

    /// Move the falling piece down until it rests
    pub fn drop_piece(&mut self) {
        while self.move_piece(0, 1) {}
    }

    /// Write the falling piece into the field and forget it.
    /// Minos above the top row are lost.
    pub fn freeze(&mut self) {
        let Some(active) = self.active.take() else {
            return;
        };
        let block = Block::new(active.color());
        for (x, y) in active.cells() {
            self.set(x, y, Some(block));
        }
    }

    /// Remove one row, shifting everything above it down by one.
    /// Returns the specials that sat on the removed row.
    pub fn remove_line(&mut self, line: usize) -> RowSpecials {
        let mut specials = RowSpecials::new();
        let Some(row) = self.row(line) else {
            return specials;
        };
        specials.extend(row.iter().filter_map(|cell| cell.and_then(|b| b.special)));

        let width = BOARD_WIDTH as usize;
        for y in (1..=line).rev() {
            let src_start = (y - 1) * width;
            self.cells
                .copy_within(src_start..src_start + width, y * width);
        }
        self.row_mut(0).fill(None);

        specials
    }

    /// Remove every full row, scanning top to bottom.
    ///
    /// Removing row `y` only rewrites rows `0..=y`, all of which were already
    /// scanned, so one pass sees every full row exactly once.
    pub fn remove_lines(&mut self) -> (usize, Vec<Special>) {
        let mut count = 0;
        let mut specials = Vec::new();
        for y in 0..BOARD_HEIGHT as usize {
            if self.is_row_full(y) {
                specials.extend(self.remove_line(y));
                count += 1;
            }
        }
        (count, specials)
    }

    /// Shift every row up by one (the top row is lost) and install `bottom`
    pub fn shift_up(&mut self, bottom: [Cell; BOARD_WIDTH as usize]) {
        let width = BOARD_WIDTH as usize;
        self.cells.copy_within(width.., 0);
        self.row_mut(BOARD_HEIGHT as usize - 1).copy_from_slice(&bottom);
    }

    /// Copy another board's cells (not its falling piece)
    pub fn copy_cells_from(&mut self, other: &Board) {
        self.cells = other.cells;
    }

    /// Replace every cell using `f(x, y)`
    pub fn fill_with(&mut self, mut f: impl FnMut(i8, i8) -> Cell) {
        for y in 0..BOARD_HEIGHT as i8 {
            for x in 0..BOARD_WIDTH as i8 {
                self.set(x, y, f(x, y));
            }
        }
    }

    /// Mutable access to every occupied block with its position
    pub fn blocks_mut(&mut self) -> impl Iterator<Item = &mut Block> {
        self.cells.iter_mut().filter_map(|c| c.as_mut())
    }

    /// Positions of every occupied cell, row-major
    pub fn occupied_positions(&self) -> impl Iterator<Item = (i8, i8)> + '_ {
        self.cells.iter().enumerate().filter_map(|(i, c)| {
            c.map(|_| {
                (
                    (i % BOARD_WIDTH as usize) as i8,
                    (i / BOARD_WIDTH as usize) as i8,
                )
            })
        })
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }

    /// True if any cell in rows `0..rows` is occupied
    pub fn has_blocks_above(&self, rows: u8) -> bool {
        let end = rows.min(BOARD_HEIGHT) as usize * BOARD_WIDTH as usize;
        self.cells[..end].iter().any(|c| c.is_some())
    }

    /// Get a reference to the internal cells array
    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    /// Clear the field and the falling piece
    pub fn clear(&mut self) {
        self.cells.fill(None);
        self.active = None;
    }

    /// Clear only the field
    pub fn clear_cells(&mut self) {
        self.cells.fill(None);
    }

    /// Forget the falling piece without writing it
    pub fn clear_piece(&mut self) {
        self.active = None;
    }
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}
