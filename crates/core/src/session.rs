//! Game session - the aggregate root of one client connection
//!
//! A [`Session`] owns every player's board, the roster, the specials
//! inventory and the local player's progress. It is driven from outside by
//! three kinds of input:
//!
//! - server frames ([`Session::handle_frame`]),
//! - user intents ([`Session::apply_intent`] and the individual intent methods),
//! - timer expiries ([`Session::on_tick`]).
//!
//! Everything it emits goes through the [`FrameSink`] and [`Presenter`] it was
//! constructed with. The session never sleeps; it exposes the armed tick via
//! [`Session::pending_tick`] and the host fires it when the interval elapses.

use tracing::{debug, info, trace};

use crate::board::Board;
use crate::params::{tick_interval_ms, GameParams};
use crate::pieces::{random_orientation, random_piece};
use crate::protocol::{decode_field, encode_field, ClientMessage, ServerMessage};
use crate::queue::SpecialsQueue;
use crate::rng::SimpleRng;
use crate::roster::{self, Roster};
use crate::sink::{FrameSink, Presenter, PresenterEvent};
use crate::snapshot::{BoardSnapshot, SessionSnapshot};
use crate::specials::{self, random_special, EffectContext};
use crate::types::{
    Block, GameStatus, Intent, PieceKind, PlayerStatus, Special, BOARD_HEIGHT, BOARD_WIDTH,
    BROADCAST_TARGET, COLOR_COUNT, MAX_CONSEQUENCE_PASSES, MAX_PLAYERS, SPECIAL_DROP_TRIES,
};

/// An armed gravity timer.
///
/// Handles are stamped with a generation; firing a handle that has since been
/// cancelled or re-armed does nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickHandle {
    pub id: u64,
    pub interval_ms: u32,
}

pub struct Session<T: FrameSink, P: Presenter> {
    transport: T,
    presenter: P,
    params: GameParams,
    rng: SimpleRng,
    /// My server number
    me: u8,
    boards: [Board; MAX_PLAYERS as usize],
    /// What peers last saw of my board
    last_reported: Option<Board>,
    roster: Roster,
    specials: SpecialsQueue,
    next_piece: PieceKind,
    next_rotation: u8,
    lines_removed: u32,
    lines_since_special: u32,
    level: u32,
    tick_ms: u32,
    timer_generation: u64,
    armed_tick: Option<u64>,
    status: GameStatus,
    player_status: PlayerStatus,
    dirty: bool,
}

impl<T: FrameSink, P: Presenter> Session<T, P> {
    /// Create a session for server player `me` named `nick`
    pub fn new(me: u8, nick: &str, seed: u32, transport: T, presenter: P) -> Self {
        let params = GameParams::default();
        let mut rng = SimpleRng::new(seed);
        let next_piece = random_piece(&params.piece_frequencies, &mut rng);
        let next_rotation = random_orientation(next_piece, &mut rng);
        let me = if roster::is_slot(me) { me } else { 1 };

        let mut roster = Roster::new();
        roster.join(me, nick);

        let mut session = Self {
            transport,
            presenter,
            specials: SpecialsQueue::new(params.effective_capacity()),
            level: params.starting_level,
            tick_ms: tick_interval_ms(params.starting_level),
            params,
            rng,
            me,
            boards: Default::default(),
            last_reported: None,
            roster,
            next_piece,
            next_rotation,
            lines_removed: 0,
            lines_since_special: 0,
            timer_generation: 0,
            armed_tick: None,
            status: GameStatus::Unstarted,
            player_status: PlayerStatus::Alive,
            dirty: true,
        };
        session.roster.set_level(me, session.level);
        session
    }

    pub fn my_number(&self) -> u8 {
        self.me
    }

    pub fn params(&self) -> &GameParams {
        &self.params
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn player_status(&self) -> PlayerStatus {
        self.player_status
    }

    /// Game running and I am alive
    pub fn playing(&self) -> bool {
        self.status == GameStatus::Playing && self.player_status == PlayerStatus::Alive
    }

    pub fn level(&self) -> u32 {
        self.level
    }

    pub fn lines_removed(&self) -> u32 {
        self.lines_removed
    }

    pub fn tick_interval_ms(&self) -> u32 {
        self.tick_ms
    }

    pub fn next_piece(&self) -> (PieceKind, u8) {
        (self.next_piece, self.next_rotation)
    }

    pub fn specials(&self) -> &SpecialsQueue {
        &self.specials
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub fn presenter_mut(&mut self) -> &mut P {
        &mut self.presenter
    }

    /// Board of a server player
    pub fn board(&self, server: u8) -> Option<&Board> {
        roster::slot(server).map(|i| &self.boards[i])
    }

    pub fn my_board(&self) -> &Board {
        &self.boards[self.my_slot()]
    }

    /// Direct access to my board, for hosts staging a position
    pub fn my_board_mut(&mut self) -> &mut Board {
        let i = self.my_slot();
        &mut self.boards[i]
    }

    fn my_slot(&self) -> usize {
        self.me as usize - 1
    }

    pub fn server_to_local(&self, server: u8) -> u8 {
        roster::server_to_local(server, self.me)
    }

    pub fn local_to_server(&self, local: u8) -> u8 {
        roster::local_to_server(local, self.me)
    }

    /// Adopt a new server number; my roster entry moves with me
    pub fn set_my_number(&mut self, me: u8) {
        if !roster::is_slot(me) || me == self.me {
            return;
        }
        let player = self.roster.get(self.me).cloned();
        self.roster.leave(self.me);
        if let Some(player) = player {
            self.roster.join(me, &player.name);
            self.roster.set_team(me, &player.team);
            self.roster.set_level(me, player.level);
            self.roster.set_active(me, player.active);
        }
        let old = self.my_slot();
        self.boards.swap(old, me as usize - 1);
        info!(from = self.me, to = me, "player number changed");
        self.me = me;
        self.request_draw();
    }

    /// Back to Unstarted with empty boards and zeroed counters
    pub fn reset_game(&mut self) {
        self.cancel_tick();
        self.status = GameStatus::Unstarted;
        self.player_status = PlayerStatus::Alive;
        for board in &mut self.boards {
            board.clear();
        }
        self.last_reported = None;
        self.lines_removed = 0;
        self.lines_since_special = 0;
        self.specials.reset(self.params.effective_capacity());
        self.roster.deactivate_all();
        self.level = self.params.starting_level;
        self.roster.set_level(self.me, self.level);
        self.update_speed();

        if self.params.starting_height > 0 {
            let rows = self.params.starting_height.min(BOARD_HEIGHT as u32) as u8;
            let slot = self.my_slot();
            let mut ctx = EffectContext {
                field: &mut self.boards[slot],
                donor: None,
                rng: &mut self.rng,
            };
            specials::apply(Special::ClassicAddLine(rows), &mut ctx);
        }
        self.request_draw();
    }

    /// Install new rules and start playing
    pub fn new_game(&mut self, params: GameParams) {
        info!(fast = params.fast, classic = params.classic_mode, "new game");
        self.params = params;
        self.reset_game();
        self.next_piece = random_piece(&self.params.piece_frequencies, &mut self.rng);
        self.next_rotation = random_orientation(self.next_piece, &mut self.rng);
        self.start();
    }

    pub fn start(&mut self) {
        self.cancel_tick();
        self.roster.activate_all();
        self.presenter.event(&PresenterEvent::ResetLabels);
        self.status = GameStatus::Playing;
        self.player_status = PlayerStatus::Alive;
        if self.spawn_next_piece() {
            self.schedule_tick();
        }
        self.request_draw();
    }

    pub fn pause(&mut self) {
        if self.status != GameStatus::Playing {
            return;
        }
        self.status = GameStatus::Paused;
        self.cancel_tick();
        self.presenter.event(&PresenterEvent::Paused { paused: true });
        self.request_draw();
    }

    pub fn resume(&mut self) {
        if self.status != GameStatus::Paused {
            return;
        }
        self.status = GameStatus::Playing;
        if self.player_status == PlayerStatus::Alive {
            self.schedule_tick();
        }
        self.presenter.event(&PresenterEvent::Paused { paused: false });
        self.request_draw();
    }

    /// Game over for everyone
    pub fn end(&mut self) {
        self.reset_game();
        self.presenter.event(&PresenterEvent::GameEnded);
    }

    /// Game over for me
    pub fn die(&mut self) {
        self.cancel_tick();
        self.player_status = PlayerStatus::Dead;
        let colors = COLOR_COUNT as i8;
        let board = self.my_board_mut();
        board.clear_piece();
        board.fill_with(|_, y| Some(Block::new((y % colors + 1) as u8)));

        self.last_reported = None;
        self.report_board();
        self.send(ClientMessage::PlayerLost(self.me));
        self.roster.set_active(self.me, false);
        info!(player = self.me, lines = self.lines_removed, "died");
        self.presenter.event(&PresenterEvent::Died);
        self.request_draw();
    }

    /// The currently armed tick, if any
    pub fn pending_tick(&self) -> Option<TickHandle> {
        self.armed_tick.map(|id| TickHandle {
            id,
            interval_ms: self.tick_ms,
        })
    }

    /// Fire a tick. Returns false for stale handles or when not playing.
    pub fn on_tick(&mut self, handle: TickHandle) -> bool {
        if self.armed_tick != Some(handle.id) {
            trace!(id = handle.id, "stale tick ignored");
            return false;
        }
        self.armed_tick = None;
        if !self.playing() {
            return false;
        }
        if !self.my_board_mut().move_piece(0, 1) {
            self.freeze_and_spawn();
        }
        if self.playing() {
            self.schedule_tick();
        }
        self.request_draw();
        true
    }

    fn schedule_tick(&mut self) {
        self.timer_generation += 1;
        self.armed_tick = Some(self.timer_generation);
    }

    fn cancel_tick(&mut self) {
        self.armed_tick = None;
    }

    /// Spawn the pre-rolled piece and roll the next one. False means I died.
    fn spawn_next_piece(&mut self) -> bool {
        let (kind, rotation) = (self.next_piece, self.next_rotation);
        self.next_piece = random_piece(&self.params.piece_frequencies, &mut self.rng);
        self.next_rotation = random_orientation(self.next_piece, &mut self.rng);
        if self.my_board_mut().new_piece(kind, rotation) {
            return true;
        }
        self.die();
        false
    }

    fn freeze_and_spawn(&mut self) {
        self.my_board_mut().freeze();
        self.run_consequences();
        self.spawn_next_piece();
    }

    /// Clear lines, collect and distribute specials, report; repeated while
    /// distribution keeps earning specials.
    fn run_consequences(&mut self) {
        for pass in 0..MAX_CONSEQUENCE_PASSES {
            let (count, found) = self.my_board_mut().remove_lines();
            let count = count as u32;
            self.lines_removed += count;
            self.lines_since_special += count;

            let per_special = self.params.lines_per_special;
            let to_add = if per_special > 0 {
                let earned = self.lines_since_special / per_special * self.params.specials_added;
                self.lines_since_special %= per_special;
                earned
            } else {
                0
            };

            for _ in 0..count {
                for &special in &found {
                    self.specials.push(special);
                }
            }

            self.update_level();
            self.report_board();

            if count > 1 && self.params.classic_mode {
                let lines = if count >= 4 { 4 } else { count - 1 };
                let special = Special::ClassicAddLine(lines as u8);
                self.send(ClientMessage::SpecialUsed {
                    target: BROADCAST_TARGET,
                    special,
                    source: self.me,
                });
                self.presenter.event(&PresenterEvent::special_used(
                    BROADCAST_TARGET,
                    special,
                    self.me,
                ));
            }

            if count > 0 {
                debug!(pass, lines = count, specials = found.len(), to_add, "lines cleared");
            }
            if to_add == 0 {
                return;
            }
            self.distribute_specials(to_add);
        }
        debug!("consequence pass limit reached");
    }

    /// Tag `count` random untagged blocks on my field; once none are left,
    /// try dropping tagged blocks into empty columns.
    fn distribute_specials(&mut self, count: u32) {
        let slot = self.my_slot();
        let table = self.params.special_frequencies;
        let mut remaining = count;

        while remaining > 0 {
            let untagged = self.boards[slot]
                .cells()
                .iter()
                .filter(|c| c.is_some_and(|b| b.special.is_none()))
                .count();
            if untagged == 0 {
                break;
            }
            let pick = self.rng.next_index(untagged);
            let special = random_special(&table, &mut self.rng);
            if let Some(block) = self.boards[slot]
                .blocks_mut()
                .filter(|b| b.special.is_none())
                .nth(pick)
            {
                block.tag(special);
            }
            remaining -= 1;
        }

        for _ in 0..remaining {
            for _ in 0..SPECIAL_DROP_TRIES {
                let x = self.rng.next_range(BOARD_WIDTH as u32) as i8;
                let board = &self.boards[slot];
                if (0..BOARD_HEIGHT as i8).any(|y| board.is_occupied(x, y)) {
                    continue;
                }
                let special = random_special(&table, &mut self.rng);
                let block = Block::with_special(special);
                self.boards[slot].set(x, BOARD_HEIGHT as i8 - 1, Some(block));
                break;
            }
        }
    }

    fn update_level(&mut self) {
        let level = self.params.level_for_lines(self.lines_removed);
        if level == self.level {
            return;
        }
        self.level = level;
        self.roster.set_level(self.me, level);
        self.send(ClientMessage::Level {
            player: self.me,
            level,
        });
        self.update_speed();
    }

    fn update_speed(&mut self) {
        let level = if self.params.average_levels {
            self.roster.average_active_level().unwrap_or(self.level)
        } else {
            self.level
        };
        self.tick_ms = tick_interval_ms(level);
    }

    /// Send my board if it changed since the last report
    fn report_board(&mut self) {
        let board = self.boards[self.my_slot()].clone();
        if let Some(field) = encode_field(self.last_reported.as_ref(), &board) {
            self.send(ClientMessage::Field {
                player: self.me,
                field,
            });
        }
        self.last_reported = Some(board);
    }

    /// A special landed; apply it if it concerns me
    pub fn apply_special(&mut self, special: Special, target: u8, source: u8) {
        if !self.playing() {
            return;
        }
        let for_me =
            target == self.me || (target == BROADCAST_TARGET && source != self.me);
        if !for_me {
            return;
        }
        self.apply_effect(special, source);
    }

    /// Run an effect on my field; `donor` is the other party of a switch
    fn apply_effect(&mut self, special: Special, donor: u8) {
        let slot = self.my_slot();
        let donor_board = match special {
            Special::SwitchField => roster::slot(donor)
                .filter(|&i| i != slot)
                .map(|i| self.boards[i].clone()),
            _ => None,
        };
        let mut ctx = EffectContext {
            field: &mut self.boards[slot],
            donor: donor_board.as_ref(),
            rng: &mut self.rng,
        };
        specials::apply(special, &mut ctx);
        debug!(?special, donor, "special applied");

        let collided = self.boards[slot].piece_collides();
        if collided {
            self.boards[slot].freeze();
        }
        self.run_consequences();
        if collided {
            self.spawn_next_piece();
        }
        self.request_draw();
    }

    /// Use the oldest special on a local player number (1 = me)
    pub fn use_special(&mut self, local_target: u8) {
        if !self.playing() || !roster::is_slot(local_target) {
            return;
        }
        let target = self.local_to_server(local_target);
        if target != self.me && !self.roster.is_active(target) {
            return;
        }
        let Some(special) = self.specials.pop() else {
            return;
        };
        self.send(ClientMessage::SpecialUsed {
            target,
            special,
            source: self.me,
        });
        self.presenter.event(&PresenterEvent::special_used(target, special, self.me));
        if target == self.me || special == Special::SwitchField {
            self.apply_effect(special, target);
        }
        self.request_draw();
    }

    pub fn discard_special(&mut self) {
        if !self.playing() {
            return;
        }
        if self.specials.pop().is_some() {
            self.request_draw();
        }
    }

    pub fn move_left(&mut self) {
        self.shift(-1);
    }

    pub fn move_right(&mut self) {
        self.shift(1);
    }

    fn shift(&mut self, dx: i8) {
        if self.playing() && self.my_board_mut().move_piece(dx, 0) {
            self.request_draw();
        }
    }

    pub fn rotate(&mut self) {
        if !self.playing() {
            return;
        }
        self.my_board_mut().rotate();
        self.request_draw();
    }

    /// One row down; freezes when blocked. Restarts the gravity interval.
    pub fn soft_drop(&mut self) {
        if !self.playing() {
            return;
        }
        if !self.my_board_mut().move_piece(0, 1) {
            self.freeze_and_spawn();
        }
        if self.playing() {
            self.schedule_tick();
        }
        self.request_draw();
    }

    pub fn hard_drop(&mut self) {
        if !self.playing() {
            return;
        }
        self.my_board_mut().drop_piece();
        self.freeze_and_spawn();
        if self.playing() {
            self.schedule_tick();
        }
        self.request_draw();
    }

    pub fn send_chat(&mut self, text: &str) {
        self.send(ClientMessage::PlayerLine {
            player: self.me,
            text: text.to_string(),
        });
        let name = self.player_name(self.me);
        self.presenter.event(&PresenterEvent::Chat {
            player: self.me,
            name,
            text: text.to_string(),
        });
    }

    pub fn send_action(&mut self, text: &str) {
        self.send(ClientMessage::PlayerAction {
            player: self.me,
            text: text.to_string(),
        });
        let name = self.player_name(self.me);
        self.presenter.event(&PresenterEvent::Action {
            player: self.me,
            name,
            text: text.to_string(),
        });
    }

    pub fn send_game_message(&mut self, text: &str) {
        self.send(ClientMessage::GameMessage(text.to_string()));
    }

    pub fn request_start(&mut self, start: bool) {
        self.send(ClientMessage::StartGame {
            start,
            player: self.me,
        });
    }

    pub fn request_pause(&mut self, paused: bool) {
        self.send(ClientMessage::Pause {
            paused,
            player: self.me,
        });
    }

    /// Dispatch a user intent. Returns false for [`Intent::Quit`].
    pub fn apply_intent(&mut self, intent: Intent) -> bool {
        match intent {
            Intent::MoveLeft => self.move_left(),
            Intent::MoveRight => self.move_right(),
            Intent::Rotate => self.rotate(),
            Intent::SoftDrop => self.soft_drop(),
            Intent::HardDrop => self.hard_drop(),
            Intent::UseSpecial(target) => self.use_special(target),
            Intent::DiscardSpecial => self.discard_special(),
            Intent::Chat(text) => self.send_chat(&text),
            Intent::Action(text) => self.send_action(&text),
            Intent::GameMessage(text) => self.send_game_message(&text),
            Intent::StartGame => self.request_start(true),
            Intent::StopGame => self.request_start(false),
            Intent::Pause => self.request_pause(true),
            Intent::Resume => self.request_pause(false),
            Intent::Quit => return false,
        }
        true
    }

    /// Decode and dispatch one server frame; malformed frames are dropped
    pub fn handle_frame(&mut self, frame: &str) {
        match ServerMessage::parse(frame) {
            Ok(message) => self.handle_message(message),
            Err(err) => debug!(%err, frame, "dropping server frame"),
        }
    }

    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::Field { player, field } => {
                if player == self.me && self.status != GameStatus::Unstarted {
                    return;
                }
                let Some(i) = roster::slot(player) else {
                    return;
                };
                match decode_field(&mut self.boards[i], &field) {
                    Ok(()) => self.request_draw(),
                    Err(err) => debug!(%err, player, "bad field update"),
                }
            }
            ServerMessage::SpecialUsed {
                target,
                special,
                source,
            } => {
                self.presenter.event(&PresenterEvent::special_used(target, special, source));
                self.apply_special(special, target, source);
            }
            ServerMessage::NewGame(params) => self.new_game(*params),
            ServerMessage::Pause(true) => self.pause(),
            ServerMessage::Pause(false) => self.resume(),
            ServerMessage::EndGame => self.end(),
            ServerMessage::InGame => {
                // Joined mid-game: watch until the next one.
                self.reset_game();
                self.roster.activate_all();
                self.roster.set_active(self.me, false);
                self.status = GameStatus::Playing;
                self.player_status = PlayerStatus::Dead;
                self.request_draw();
            }
            ServerMessage::PlayerJoin { player, name } => {
                self.roster.join(player, &name);
                if let Some(i) = roster::slot(player) {
                    self.boards[i].clear();
                }
                self.presenter
                    .event(&PresenterEvent::PlayerJoined { player, name });
                self.request_draw();
            }
            ServerMessage::PlayerLeave(player) => {
                self.roster.leave(player);
                if let Some(i) = roster::slot(player) {
                    self.boards[i].clear();
                }
                self.presenter.event(&PresenterEvent::PlayerLeft { player });
                self.request_draw();
            }
            ServerMessage::PlayerWon(player) => {
                self.presenter.event(&PresenterEvent::PlayerWon { player });
            }
            ServerMessage::PlayerLost(player) => {
                self.roster.set_active(player, false);
                self.presenter.event(&PresenterEvent::PlayerLost { player });
                self.update_speed();
                self.request_draw();
            }
            ServerMessage::PlayerNum(player) => self.set_my_number(player),
            ServerMessage::PlayerLine { player, text } => {
                let name = self.player_name(player);
                self.presenter
                    .event(&PresenterEvent::Chat { player, name, text });
            }
            ServerMessage::PlayerAction { player, text } => {
                let name = self.player_name(player);
                self.presenter
                    .event(&PresenterEvent::Action { player, name, text });
            }
            ServerMessage::GameMessage(text) => {
                self.presenter.event(&PresenterEvent::GameMessage { text });
            }
            ServerMessage::Team { player, team } => {
                self.roster.set_team(player, &team);
                self.request_draw();
            }
            ServerMessage::Level { player, level } => {
                self.roster.set_level(player, level);
                self.update_speed();
            }
        }
    }

    fn player_name(&self, server: u8) -> String {
        match self.roster.name(server) {
            Some(name) => name.to_string(),
            None if server == BROADCAST_TARGET => "server".to_string(),
            None => format!("player {}", server),
        }
    }

    fn send(&mut self, message: ClientMessage) {
        let frame = message.to_string();
        trace!(%frame, "send");
        self.transport.send_frame(&frame);
    }

    /// Mark state as changed; the presenter sees it on the next flush
    pub fn request_draw(&mut self) {
        self.dirty = true;
    }

    pub fn needs_redraw(&self) -> bool {
        self.dirty
    }

    /// Hand one snapshot to the presenter if anything changed
    pub fn flush_redraw(&mut self) -> bool {
        if !self.dirty {
            return false;
        }
        self.dirty = false;
        let snapshot = self.snapshot();
        self.presenter.redraw(&snapshot);
        true
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let boards = (1..=MAX_PLAYERS)
            .filter_map(|server| {
                let board = self.board(server)?;
                let player = self.roster.get(server);
                if player.is_none() && server != self.me {
                    return None;
                }
                Some(BoardSnapshot {
                    player: server,
                    local: self.server_to_local(server),
                    name: player.map(|p| p.name.clone()),
                    active: self.roster.is_active(server),
                    rows: BoardSnapshot::rows_of(board),
                    piece: board.active().map(Into::into),
                })
            })
            .collect();

        SessionSnapshot {
            my_number: self.me,
            status: self.status,
            player_status: self.player_status,
            boards,
            specials: self.specials.as_slice().to_vec(),
            special_capacity: self.specials.capacity(),
            next_piece: self.next_piece,
            next_rotation: self.next_rotation,
            level: self.level,
            lines: self.lines_removed,
            tick_ms: self.tick_ms,
        }
    }
}
