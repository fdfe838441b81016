//! Network side of the TetriNET client
//!
//! The core crate knows nothing about sockets. This crate supplies:
//!
//! - [`config`]: [`ClientConfig`] read from `TETRINET_*` environment variables
//! - [`transport`]: `0xFF`-terminated latin-1 framing over any tokio stream
//! - [`runtime`]: login handshake and the event loop driving a session
//! - [`observe`]: a presenter that writes JSON lines
//!
//! # Environment Variables
//!
//! - `TETRINET_HOST`: server address (default: "127.0.0.1")
//! - `TETRINET_PORT`: server port (default: 31457)
//! - `TETRINET_NICK`: nickname (default: "rustacean")
//! - `TETRINET_TEAM`: team name (default: none)
//! - `TETRINET_SEED`: fixed RNG seed for reproducible piece sequences
//! - `TETRINET_HANDSHAKE_TIMEOUT_MS`: how long to wait for `playernum` (default: 10000)
//!
//! # Testing
//!
//! A local TetriNET server (for example tetrinetx) listens on 31457:
//!
//! ```bash
//! TETRINET_NICK=tester RUST_LOG=debug cargo run
//! ```

pub mod config;
pub mod observe;
pub mod runtime;
pub mod transport;

pub use tetrinet_core as core;
pub use tetrinet_types as types;

pub use config::ClientConfig;
pub use observe::JsonPresenter;
pub use runtime::{handshake, run_client, run_session, Exit, Handshake};
pub use transport::{ChannelSink, FrameReader, TransportError};
