//! A deterministic, single-threaded central limit order book matching
//! engine, driven by a line-oriented CSV protocol.

pub mod book;
pub mod engine;
pub mod heap;
pub mod order;
pub mod price;
pub mod protocol;
pub mod types;

pub use engine::{Command, MatchingEngine, OrderBook, Trade};
pub use protocol::{format_output, parse_line, ProtocolError};
