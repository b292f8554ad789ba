//! Per-side, per-symbol resting order collections and the snapshot fold.

use crate::heap::{Comparator, IndexedHeap};
use crate::order::Order;
use crate::types::{Price, Volume};

/// Comparator for the buy side: higher price first, earlier arrival breaks ties.
pub struct BuyOrder;

impl Comparator<Order> for BuyOrder {
    fn less(a: &Order, b: &Order) -> bool {
        if a.price != b.price {
            a.price > b.price
        } else {
            a.seq < b.seq
        }
    }
}

/// Comparator for the sell side: lower price first, earlier arrival breaks ties.
pub struct SellOrder;

impl Comparator<Order> for SellOrder {
    fn less(a: &Order, b: &Order) -> bool {
        if a.price != b.price {
            a.price < b.price
        } else {
            a.seq < b.seq
        }
    }
}

/// A side's resting orders for one symbol: an [`IndexedHeap`] fixed to the
/// side's priority rule via its comparator marker.
pub type SideBook<Cmp> = IndexedHeap<Order, Cmp>;

pub type BuyBook = SideBook<BuyOrder>;
pub type SellBook = SideBook<SellOrder>;

/// Folds a side's resting orders into best-to-worst `(price, total volume)`
/// levels, without mutating the live book: pops are taken from a cloned
/// heap, so the fold is single-pass and read-only from the caller's view.
pub fn levels<Cmp: Comparator<Order>>(book: &SideBook<Cmp>) -> Vec<(Price, Volume)> {
    let mut scratch = book.clone();
    let mut rows: Vec<(Price, Volume)> = Vec::new();
    while let Some(order) = scratch.pop() {
        match rows.last_mut() {
            Some((price, volume)) if *price == order.price => *volume += order.volume,
            _ => rows.push((order.price, order.volume)),
        }
    }
    rows
}
