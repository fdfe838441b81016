//! TetriNET client (workspace facade crate).
//!
//! The implementation lives in dedicated crates under `crates/`; this package
//! re-exports them as `tetrinet::{core,adapter,types}` and hosts the binary.

pub use tetrinet_adapter as adapter;
pub use tetrinet_core as core;
pub use tetrinet_types as types;
