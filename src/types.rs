//! Shared scalar aliases and the `Side` tag used throughout the book.

use std::fmt::{self, Display, Formatter};

/// Client-assigned order identifier. Unique for the lifetime of the engine;
/// never recycled even after the order is fully matched or pulled.
pub type OrderId = i64;

/// Fixed-point price, shifted by 10,000 relative to its decimal representation.
pub type Price = i32;

/// Resting or aggressive volume. Always positive while an order is live.
pub type Volume = i32;

/// Tradable instrument identifier, compared byte-wise for snapshot ordering.
pub type Symbol = String;

/// Direction of an order: the side of the book it either rests on or
/// aggresses against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side an aggressive order of this side matches against.
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl Display for Side {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}
