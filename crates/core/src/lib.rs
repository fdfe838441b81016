//! TetriNET game core - rules, wire codec and the client session
//!
//! Nothing in this crate performs I/O. A [`Session`] is handed a
//! [`FrameSink`] for outgoing frames and a [`Presenter`] for snapshots, and
//! is driven by server frames, user intents and timer expiries. Given the
//! same seed and the same inputs it produces the same frames.
//!
//! # Module Structure
//!
//! - [`board`]: 12x22 field with the falling piece, collision and line removal
//! - [`pieces`]: the seven pieces and their rotation states
//! - [`specials`]: effects of the special blocks on a field
//! - [`params`]: per-game rules and level/speed progression
//! - [`protocol`]: login obfuscation, field encodings, server/client messages
//! - [`queue`]: the bounded specials inventory
//! - [`roster`]: player slots and local/server numbering
//! - [`session`]: the state machine tying it all together
//! - [`sink`]: the transport and presenter interfaces
//! - [`snapshot`]: read-only views for presenters
//!
//! # Example
//!
//! ```
//! use tetrinet_core::{GameParams, RecordingPresenter, Session};
//!
//! let mut session = Session::new(1, "alice", 7, Vec::new(), RecordingPresenter::default());
//! session.new_game(GameParams::default());
//! session.hard_drop();
//!
//! assert!(session.transport().iter().any(|f| f.starts_with("f 1 ")));
//! ```

pub mod board;
pub mod params;
pub mod pieces;
pub mod protocol;
pub mod queue;
pub mod rng;
pub mod roster;
pub mod session;
pub mod sink;
pub mod snapshot;
pub mod specials;

pub use tetrinet_types as types;

// Re-export commonly used types for convenience
pub use board::{ActivePiece, Board};
pub use params::{tick_interval_ms, GameParams};
pub use protocol::{ClientMessage, ProtocolError, ServerMessage};
pub use queue::SpecialsQueue;
pub use rng::SimpleRng;
pub use roster::{local_to_server, server_to_local, Roster};
pub use session::{Session, TickHandle};
pub use sink::{FrameSink, Presenter, PresenterEvent, RecordingPresenter};
pub use snapshot::{ActiveSnapshot, BoardSnapshot, SessionSnapshot};
