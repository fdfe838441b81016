//! Roster - who sits in which slot, and local/server numbering
//!
//! The server numbers players 1..=6. Each client also numbers them locally:
//! itself as 1 and everyone else contiguously in server order, which is what
//! number-key bindings refer to.

use crate::types::{BROADCAST_TARGET, MAX_PLAYERS};

/// Server number to local number for a client whose server number is `me`
pub fn server_to_local(server: u8, me: u8) -> u8 {
    if server == me {
        1
    } else if server < me {
        server + 1
    } else {
        server
    }
}

/// Local number to server number; exact inverse of [`server_to_local`]
pub fn local_to_server(local: u8, me: u8) -> u8 {
    if local == 1 {
        me
    } else if local <= me {
        local - 1
    } else {
        local
    }
}

/// True for server numbers naming a roster slot
pub fn is_slot(server: u8) -> bool {
    server != BROADCAST_TARGET && server <= MAX_PLAYERS
}

/// Slot index (0-based) for a server number
pub fn slot(server: u8) -> Option<usize> {
    is_slot(server).then(|| server as usize - 1)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Player {
    pub name: String,
    pub team: String,
    pub level: u32,
    pub active: bool,
}

/// Players by server number
#[derive(Debug, Clone, Default)]
pub struct Roster {
    players: [Option<Player>; MAX_PLAYERS as usize],
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, server: u8, name: &str) {
        if let Some(i) = slot(server) {
            self.players[i] = Some(Player {
                name: name.to_string(),
                ..Player::default()
            });
        }
    }

    pub fn leave(&mut self, server: u8) {
        if let Some(i) = slot(server) {
            self.players[i] = None;
        }
    }

    pub fn get(&self, server: u8) -> Option<&Player> {
        slot(server).and_then(|i| self.players[i].as_ref())
    }

    pub fn get_mut(&mut self, server: u8) -> Option<&mut Player> {
        slot(server).and_then(|i| self.players[i].as_mut())
    }

    pub fn name(&self, server: u8) -> Option<&str> {
        self.get(server).map(|p| p.name.as_str())
    }

    pub fn set_team(&mut self, server: u8, team: &str) {
        if let Some(p) = self.get_mut(server) {
            p.team = team.to_string();
        }
    }

    pub fn set_level(&mut self, server: u8, level: u32) {
        if let Some(p) = self.get_mut(server) {
            p.level = level;
        }
    }

    pub fn set_active(&mut self, server: u8, active: bool) {
        if let Some(p) = self.get_mut(server) {
            p.active = active;
        }
    }

    /// Mark every named slot active
    pub fn activate_all(&mut self) {
        for p in self.players.iter_mut().flatten() {
            p.active = true;
        }
    }

    pub fn deactivate_all(&mut self) {
        for p in self.players.iter_mut().flatten() {
            p.active = false;
        }
    }

    pub fn is_active(&self, server: u8) -> bool {
        self.get(server).is_some_and(|p| p.active)
    }

    /// Occupied slots with their server numbers
    pub fn iter(&self) -> impl Iterator<Item = (u8, &Player)> {
        self.players
            .iter()
            .enumerate()
            .filter_map(|(i, p)| p.as_ref().map(|p| (i as u8 + 1, p)))
    }

    /// Mean level of active players, if any
    pub fn average_active_level(&self) -> Option<u32> {
        let (sum, count) = self
            .iter()
            .filter(|(_, p)| p.active)
            .fold((0u64, 0u64), |(s, c), (_, p)| (s + p.level as u64, c + 1));
        (count > 0).then(|| (sum / count) as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_numbering() {
        // I am server player 3: 3 -> 1, 1 -> 2, 2 -> 3, 4 -> 4.
        assert_eq!(server_to_local(3, 3), 1);
        assert_eq!(server_to_local(1, 3), 2);
        assert_eq!(server_to_local(2, 3), 3);
        assert_eq!(server_to_local(4, 3), 4);
        assert_eq!(server_to_local(6, 3), 6);
    }

    #[test]
    fn test_numbering_is_bijective() {
        for me in 1..=MAX_PLAYERS {
            for n in 1..=MAX_PLAYERS {
                assert_eq!(server_to_local(local_to_server(n, me), me), n);
                assert_eq!(local_to_server(server_to_local(n, me), me), n);
            }
        }
    }

    #[test]
    fn test_roster_join_leave() {
        let mut roster = Roster::new();
        roster.join(2, "alice");
        roster.join(7, "ghost");
        assert_eq!(roster.name(2), Some("alice"));
        assert_eq!(roster.iter().count(), 1);
        roster.leave(2);
        assert_eq!(roster.name(2), None);
    }

    #[test]
    fn test_average_level() {
        let mut roster = Roster::new();
        roster.join(1, "a");
        roster.join(2, "b");
        roster.join(3, "c");
        roster.set_level(1, 4);
        roster.set_level(2, 8);
        roster.set_level(3, 100);
        roster.set_active(1, true);
        roster.set_active(2, true);
        assert_eq!(roster.average_active_level(), Some(6));
        roster.deactivate_all();
        assert_eq!(roster.average_active_level(), None);
    }
}
