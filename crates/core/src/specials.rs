//! Specials engine - the effects a special has on a field
//!
//! Every effect mutates one board: the field of the player it lands on. Switch
//! field additionally reads a donor board, which it copies cell by cell.
//! Effects never touch the falling piece; the session re-checks it afterwards.

use crate::board::Board;
use crate::pieces::FrequencyTable;
use crate::rng::SimpleRng;
use crate::types::{
    Block, Cell, Special, ADD_LINE_BLOCK_CHANCE, BOARD_HEIGHT, BOARD_WIDTH, COLOR_COUNT,
    RANDOM_CLEAR_COUNT, SAFE_ROWS,
};

/// Everything an effect may touch
pub struct EffectContext<'a> {
    /// The field the special landed on
    pub field: &'a mut Board,
    /// The other party's field, for switch field
    pub donor: Option<&'a Board>,
    pub rng: &'a mut SimpleRng,
}

/// Roll a special from a frequency table
pub fn random_special(table: &FrequencyTable, rng: &mut SimpleRng) -> Special {
    let slot = rng.next_index(table.len());
    Special::from_index(table[slot]).unwrap_or(Special::AddLine)
}

/// Random palette color
pub fn random_color(rng: &mut SimpleRng) -> u8 {
    1 + rng.next_range(COLOR_COUNT as u32) as u8
}

/// Apply a special to the context's field
pub fn apply(special: Special, ctx: &mut EffectContext<'_>) {
    match special {
        Special::AddLine => add_line(ctx),
        Special::ClassicAddLine(count) => {
            for _ in 0..count {
                classic_add_line(ctx);
            }
        }
        Special::ClearLine => {
            ctx.field.remove_line(BOARD_HEIGHT as usize - 1);
        }
        Special::RandomClear => random_clear(ctx),
        Special::SwitchField => switch_field(ctx),
        Special::NukeField => ctx.field.clear_cells(),
        Special::ClearSpecials => {
            for block in ctx.field.blocks_mut() {
                block.special = None;
            }
        }
        Special::Gravity => gravity(ctx.field),
        Special::QuakeField => quake(ctx),
        Special::BlockBomb => block_bomb(ctx),
    }
}

fn add_line(ctx: &mut EffectContext<'_>) {
    let mut row: [Cell; BOARD_WIDTH as usize] = [None; BOARD_WIDTH as usize];
    for cell in &mut row {
        if ctx.rng.next_range(100) <= ADD_LINE_BLOCK_CHANCE {
            *cell = Some(Block::new(random_color(ctx.rng)));
        }
    }
    ctx.field.shift_up(row);
}

fn classic_add_line(ctx: &mut EffectContext<'_>) {
    let mut row: [Cell; BOARD_WIDTH as usize] = [None; BOARD_WIDTH as usize];
    for cell in &mut row {
        *cell = Some(Block::new(random_color(ctx.rng)));
    }
    row[ctx.rng.next_index(row.len())] = None;
    ctx.field.shift_up(row);
}

fn random_clear(ctx: &mut EffectContext<'_>) {
    for _ in 0..RANDOM_CLEAR_COUNT {
        let x = ctx.rng.next_range(BOARD_WIDTH as u32) as i8;
        let y = ctx.rng.next_range(BOARD_HEIGHT as u32) as i8;
        ctx.field.set(x, y, None);
    }
}

fn switch_field(ctx: &mut EffectContext<'_>) {
    let Some(donor) = ctx.donor else {
        return;
    };
    ctx.field.copy_cells_from(donor);
    while ctx.field.has_blocks_above(SAFE_ROWS) {
        ctx.field.remove_line(BOARD_HEIGHT as usize - 1);
    }
}

/// Compact every column downward, then clear lines with no side effects.
pub fn gravity(field: &mut Board) {
    for x in 0..BOARD_WIDTH as i8 {
        let mut write_y = BOARD_HEIGHT as i8 - 1;
        for read_y in (0..BOARD_HEIGHT as i8).rev() {
            let Some(cell @ Some(_)) = field.get(x, read_y) else {
                continue;
            };
            if write_y != read_y {
                field.set(x, write_y, cell);
                field.set(x, read_y, None);
            }
            write_y -= 1;
        }
    }
    field.remove_lines();
}

fn quake(ctx: &mut EffectContext<'_>) {
    let width = BOARD_WIDTH as i8;
    for y in 0..BOARD_HEIGHT as i8 {
        let roll = ctx.rng.next_range(22);
        let mut shift = [1, 4, 11].iter().filter(|&&t| roll < t).count() as i8;
        if ctx.rng.next_bool() {
            shift = -shift;
        }
        if shift == 0 {
            continue;
        }
        let mut row: [Cell; BOARD_WIDTH as usize] = [None; BOARD_WIDTH as usize];
        for x in 0..width {
            row[(x + shift).rem_euclid(width) as usize] = field_cell(ctx.field, x, y);
        }
        for (x, cell) in row.iter().enumerate() {
            ctx.field.set(x as i8, y, *cell);
        }
    }
}

fn field_cell(field: &Board, x: i8, y: i8) -> Cell {
    field.get(x, y).flatten()
}

fn block_bomb(ctx: &mut EffectContext<'_>) {
    let bombs: Vec<(i8, i8)> = ctx
        .field
        .occupied_positions()
        .filter(|&(x, y)| is_bomb(field_cell(ctx.field, x, y)))
        .collect();

    for (bx, by) in bombs {
        ctx.field.set(bx, by, None);
        for ny in by - 1..=by + 1 {
            for nx in bx - 1..=bx + 1 {
                if (nx, ny) == (bx, by) {
                    continue;
                }
                let Some(cell) = ctx.field.get(nx, ny) else {
                    continue;
                };
                ctx.field.set(nx, ny, None);
                if is_bomb(cell) {
                    continue;
                }
                if let Some(block) = cell {
                    let x = ctx.rng.next_range(BOARD_WIDTH as u32) as i8;
                    let y = SAFE_ROWS as i8
                        + ctx.rng.next_range((BOARD_HEIGHT - SAFE_ROWS) as u32) as i8;
                    ctx.field.set(x, y, Some(block));
                }
            }
        }
    }
}

fn is_bomb(cell: Cell) -> bool {
    matches!(
        cell,
        Some(Block {
            special: Some(Special::BlockBomb),
            ..
        })
    )
}
