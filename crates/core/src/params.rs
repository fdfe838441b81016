//! Game parameters - the rules a server announces with `newgame`
//!
//! Rules message layout (12 whitespace-separated tokens):
//!
//! | # | Field |
//! |---|-------|
//! | 0 | marker: `newgame`, or `*******` for the fast variant |
//! | 1 | starting height |
//! | 2 | starting level |
//! | 3 | lines per level |
//! | 4 | level increment |
//! | 5 | lines per special |
//! | 6 | specials added |
//! | 7 | special capacity |
//! | 8 | piece frequencies (100 chars, `'1'..='7'`) |
//! | 9 | special frequencies (100 chars, `'1'..='9'`) |
//! | 10 | average levels (`1` = on) |
//! | 11 | classic mode (`1` = on) |

use serde::Serialize;

use crate::pieces::FrequencyTable;
use crate::protocol::ProtocolError;
use crate::types::{PieceKind, Special, DEFAULT_SPECIAL_CAPACITY, SPECIAL_CAPACITY_LIMIT};

/// Marker token of a regular game
pub const NEWGAME_MARKER: &str = "newgame";

/// Marker token of a tetrifast game
pub const FAST_MARKER: &str = "*******";

const RULES_TOKENS: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GameParams {
    pub starting_height: u32,
    pub starting_level: u32,
    pub lines_per_level: u32,
    pub level_increment: u32,
    pub lines_per_special: u32,
    pub specials_added: u32,
    pub special_capacity: u32,
    #[serde(skip)]
    pub piece_frequencies: FrequencyTable,
    #[serde(skip)]
    pub special_frequencies: FrequencyTable,
    pub average_levels: bool,
    pub classic_mode: bool,
    pub fast: bool,
}

impl Default for GameParams {
    /// Stock TetriNET server rules
    fn default() -> Self {
        Self {
            starting_height: 0,
            starting_level: 1,
            lines_per_level: 2,
            level_increment: 1,
            lines_per_special: 1,
            specials_added: 1,
            special_capacity: DEFAULT_SPECIAL_CAPACITY as u32,
            piece_frequencies: table_from_percentages(&[14, 14, 15, 14, 14, 14, 15]),
            special_frequencies: table_from_percentages(&[32, 18, 1, 11, 3, 14, 1, 6, 14]),
            average_levels: false,
            classic_mode: true,
            fast: false,
        }
    }
}

impl GameParams {
    /// Parse a whole rules message, marker included
    pub fn parse_rules(tokens: &[&str]) -> Result<Self, ProtocolError> {
        if tokens.len() < RULES_TOKENS {
            return Err(ProtocolError::MissingField {
                command: "newgame",
                expected: RULES_TOKENS,
                got: tokens.len(),
            });
        }

        let fast = match tokens[0] {
            NEWGAME_MARKER => false,
            FAST_MARKER => true,
            other => return Err(ProtocolError::UnknownCommand(other.to_string())),
        };

        Ok(Self {
            starting_height: number(tokens[1])?,
            starting_level: number(tokens[2])?,
            lines_per_level: number(tokens[3])?,
            level_increment: number(tokens[4])?,
            lines_per_special: number(tokens[5])?,
            specials_added: number(tokens[6])?,
            special_capacity: number(tokens[7])?,
            piece_frequencies: frequencies(tokens[8], PieceKind::ALL.len())?,
            special_frequencies: frequencies(tokens[9], Special::QUEUEABLE.len())?,
            average_levels: tokens[10] == "1",
            classic_mode: tokens[11] == "1",
            fast,
        })
    }

    /// Render back to a rules message
    pub fn rules_message(&self) -> String {
        let freq = |table: &FrequencyTable| -> String {
            table.iter().map(|&v| char::from(b'1' + v)).collect()
        };
        format!(
            "{} {} {} {} {} {} {} {} {} {} {} {}",
            if self.fast { FAST_MARKER } else { NEWGAME_MARKER },
            self.starting_height,
            self.starting_level,
            self.lines_per_level,
            self.level_increment,
            self.lines_per_special,
            self.specials_added,
            self.special_capacity,
            freq(&self.piece_frequencies),
            freq(&self.special_frequencies),
            u8::from(self.average_levels),
            u8::from(self.classic_mode),
        )
    }

    /// Inventory size actually enforced: the configured capacity, held to
    /// the storage bound
    pub fn effective_capacity(&self) -> usize {
        (self.special_capacity as usize).min(SPECIAL_CAPACITY_LIMIT)
    }

    /// Level reached after clearing `lines` lines
    pub fn level_for_lines(&self, lines: u32) -> u32 {
        if self.lines_per_level == 0 {
            return self.starting_level;
        }
        (lines / self.lines_per_level)
            .saturating_mul(self.level_increment)
            .saturating_add(self.starting_level)
    }
}

/// Tick interval for a level, in milliseconds. Never below 1.
pub fn tick_interval_ms(level: u32) -> u32 {
    crate::types::BASE_TICK_MS
        .saturating_sub(level.saturating_mul(crate::types::TICK_STEP_MS))
        .max(1)
}

/// Spread percentages over a 100-slot table, in index order
pub fn table_from_percentages(percentages: &[u8]) -> FrequencyTable {
    let mut table = [0u8; 100];
    let mut slot = 0usize;
    for (index, &pct) in percentages.iter().enumerate() {
        for _ in 0..pct {
            if slot < table.len() {
                table[slot] = index as u8;
                slot += 1;
            }
        }
    }
    table
}

fn number(token: &str) -> Result<u32, ProtocolError> {
    token
        .parse()
        .map_err(|_| ProtocolError::BadNumber(token.to_string()))
}

fn frequencies(token: &str, kinds: usize) -> Result<FrequencyTable, ProtocolError> {
    let bytes = token.as_bytes();
    if bytes.len() < 100 {
        return Err(ProtocolError::BadFrequencies(token.len()));
    }
    let mut table = [0u8; 100];
    for (slot, &b) in table.iter_mut().zip(bytes) {
        let value = b.wrapping_sub(b'1');
        if value as usize >= kinds {
            return Err(ProtocolError::BadFrequencies(token.len()));
        }
        *slot = value;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tables_are_full() {
        let params = GameParams::default();
        let pieces = params.piece_frequencies;
        assert_eq!(pieces.iter().filter(|&&v| v == 6).count(), 15);
        let specials = params.special_frequencies;
        assert_eq!(specials.iter().filter(|&&v| v == 0).count(), 32);
        assert_eq!(specials[99], 8);
    }

    #[test]
    fn test_rules_roundtrip() {
        let params = GameParams {
            starting_height: 3,
            classic_mode: false,
            fast: true,
            ..GameParams::default()
        };
        let message = params.rules_message();
        let tokens: Vec<&str> = message.split(' ').collect();
        assert_eq!(tokens.len(), 12);
        assert_eq!(GameParams::parse_rules(&tokens).unwrap(), params);
    }

    #[test]
    fn test_rules_reject_bad_input() {
        let message = GameParams::default().rules_message();
        let mut tokens: Vec<&str> = message.split(' ').collect();
        assert!(GameParams::parse_rules(&tokens[..11]).is_err());

        tokens[3] = "x";
        assert!(matches!(
            GameParams::parse_rules(&tokens),
            Err(ProtocolError::BadNumber(_))
        ));

        let bad_pieces = "8".repeat(100);
        let mut tokens: Vec<&str> = message.split(' ').collect();
        tokens[8] = &bad_pieces;
        assert!(matches!(
            GameParams::parse_rules(&tokens),
            Err(ProtocolError::BadFrequencies(_))
        ));
    }

    #[test]
    fn test_configured_special_capacity_is_honored() {
        let message = GameParams::default().rules_message();
        let mut tokens: Vec<&str> = message.split(' ').collect();
        tokens[7] = "30";
        let params = GameParams::parse_rules(&tokens).unwrap();
        assert_eq!(params.special_capacity, 30);
        assert_eq!(params.effective_capacity(), 30);

        let huge = GameParams {
            special_capacity: 100_000,
            ..GameParams::default()
        };
        assert_eq!(huge.effective_capacity(), SPECIAL_CAPACITY_LIMIT);
    }

    #[test]
    fn test_level_progression() {
        let params = GameParams::default();
        assert_eq!(params.level_for_lines(0), 1);
        assert_eq!(params.level_for_lines(5), 3);
        let flat = GameParams {
            lines_per_level: 0,
            ..GameParams::default()
        };
        assert_eq!(flat.level_for_lines(100), 1);
    }

    #[test]
    fn test_tick_interval_floor() {
        assert_eq!(tick_interval_ms(0), 1005);
        assert_eq!(tick_interval_ms(10), 905);
        assert_eq!(tick_interval_ms(100), 5);
        assert_eq!(tick_interval_ms(101), 1);
        assert_eq!(tick_interval_ms(u32::MAX), 1);
    }
}
