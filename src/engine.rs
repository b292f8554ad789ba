//! The matching engine: per-symbol books, the aggressive matching loop, and
//! the amend protocol that conditionally preserves time priority.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::book::{self, BuyBook, SellBook};
use crate::heap::{Comparator, IndexedHeap};
use crate::order::Order;
use crate::types::{OrderId, Price, Side, Symbol, Volume};

/// Pre-sizing hint for the per-symbol book maps: a guess at how many
/// distinct symbols a stream typically carries, not a hard limit.
const DEFAULT_SYMBOL_CAPACITY: usize = 16;

/// A completed match between an aggressive (taker) and a passive (maker)
/// order. `price` is always the passive order's resting price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub symbol: Symbol,
    pub price: Price,
    pub volume: Volume,
    pub aggressive_order_id: OrderId,
    pub passive_order_id: OrderId,
}

/// A single best-to-worst price level: the sum of all resting volume at
/// `price` on one side.
pub type Level = (Price, Volume);

/// A per-symbol read-only view of resting liquidity, best-to-worst on each
/// side. Produced by [`MatchingEngine::snapshot_books`]; does not alias the
/// live book, so it outlives further mutation of the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub bid_levels: Vec<Level>,
    pub ask_levels: Vec<Level>,
}

/// One line of the command protocol, already parsed and validated at the
/// boundary. Dispatched in [`MatchingEngine::apply`] by pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Insert {
        order_id: OrderId,
        symbol: Symbol,
        side: Side,
        price: Price,
        volume: Volume,
    },
    Amend {
        order_id: OrderId,
        price: Price,
        volume: Volume,
    },
    Pull {
        order_id: OrderId,
    },
}

/// A deterministic, single-threaded central limit order book.
///
/// Holds every symbol's buy and sell books, a directory from order id to
/// its resting `(symbol, side)`, the arrival-sequence counter, and the
/// chronological trade log. There is no shared or global state: a host
/// juggling multiple independent streams instantiates one engine per stream.
#[derive(Debug, Default)]
pub struct MatchingEngine {
    buys: HashMap<Symbol, BuyBook>,
    sells: HashMap<Symbol, SellBook>,
    directory: HashMap<OrderId, (Symbol, Side)>,
    seq: u64,
    trades: Vec<Trade>,
}

impl MatchingEngine {
    pub fn new() -> Self {
        Self {
            buys: HashMap::with_capacity(DEFAULT_SYMBOL_CAPACITY),
            sells: HashMap::with_capacity(DEFAULT_SYMBOL_CAPACITY),
            ..Self::default()
        }
    }

    /// Dispatches a single parsed command. See [`Command`].
    pub fn apply(&mut self, command: Command) {
        match command {
            Command::Insert { order_id, symbol, side, price, volume } => {
                self.insert(order_id, symbol, side, price, volume)
            }
            Command::Amend { order_id, price, volume } => self.amend(order_id, price, volume),
            Command::Pull { order_id } => self.pull(order_id),
        }
    }

    /// Inserts a new order. Duplicate order ids are silently ignored: the
    /// engine treats order ids as globally unique and never recycled.
    pub fn insert(&mut self, order_id: OrderId, symbol: Symbol, side: Side, price: Price, volume: Volume) {
        if self.directory.contains_key(&order_id) {
            debug!(order_id, "insert: duplicate order id, ignored");
            return;
        }
        debug_assert!(volume > 0, "insert: volume must be positive");
        debug_assert!(price >= 0, "insert: price must be non-negative");

        self.seq += 1;
        let order = Order { order_id, price, volume, seq: self.seq };
        self.directory.insert(order_id, (symbol.clone(), side));

        match side {
            Side::Buy => {
                let residual = match_loop(&mut self.sells, &symbol, order, true, &mut self.trades);
                rest_if_any(&mut self.buys, symbol, residual);
            }
            Side::Sell => {
                let residual = match_loop(&mut self.buys, &symbol, order, false, &mut self.trades);
                rest_if_any(&mut self.sells, symbol, residual);
            }
        }
    }

    /// Either reduces a resting order's volume in place (price unchanged,
    /// new volume strictly smaller — time priority preserved) or forfeits
    /// priority by pulling the order and re-running it through the
    /// matching loop with a freshly allocated sequence number.
    pub fn amend(&mut self, order_id: OrderId, price: Price, volume: Volume) {
        debug_assert!(volume > 0, "amend: volume must be positive");

        let Some((symbol, side)) = self.directory.get(&order_id).cloned() else {
            debug!(order_id, "amend: unknown order id, ignored");
            return;
        };

        match side {
            Side::Buy => amend_impl(
                &mut self.buys,
                &mut self.sells,
                &symbol,
                order_id,
                price,
                volume,
                true,
                &mut self.seq,
                &mut self.trades,
            ),
            Side::Sell => amend_impl(
                &mut self.sells,
                &mut self.buys,
                &symbol,
                order_id,
                price,
                volume,
                false,
                &mut self.seq,
                &mut self.trades,
            ),
        }
    }

    /// Removes a resting order. Unknown order ids, and order ids that have
    /// already been fully matched or pulled, are silently ignored. The
    /// directory entry for a pulled order is left in place: a later
    /// `INSERT` re-using that order id is dropped as a duplicate, not
    /// revived.
    pub fn pull(&mut self, order_id: OrderId) {
        let Some((symbol, side)) = self.directory.get(&order_id).cloned() else {
            debug!(order_id, "pull: unknown order id, ignored");
            return;
        };

        match side {
            Side::Buy => pull_from(&mut self.buys, &symbol, order_id),
            Side::Sell => pull_from(&mut self.sells, &symbol, order_id),
        }
    }

    /// A read-only, best-to-worst snapshot of every symbol with resting
    /// liquidity on at least one side, in ascending alphabetical order.
    pub fn snapshot_books(&self) -> Vec<OrderBook> {
        let mut symbols: BTreeSet<&Symbol> = BTreeSet::new();
        symbols.extend(self.buys.keys());
        symbols.extend(self.sells.keys());

        symbols
            .into_iter()
            .map(|symbol| OrderBook {
                symbol: symbol.clone(),
                bid_levels: self.buys.get(symbol).map(book::levels).unwrap_or_default(),
                ask_levels: self.sells.get(symbol).map(book::levels).unwrap_or_default(),
            })
            .collect()
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }
}

fn rest_if_any<Cmp: Comparator<Order>>(books: &mut HashMap<Symbol, IndexedHeap<Order, Cmp>>, symbol: Symbol, order: Order) {
    if order.volume > 0 {
        books.entry(symbol).or_default().push(order);
    }
}

fn pull_from<Cmp: Comparator<Order>>(books: &mut HashMap<Symbol, IndexedHeap<Order, Cmp>>, symbol: &Symbol, order_id: OrderId) {
    let Some(book) = books.get_mut(symbol) else {
        return;
    };
    book.remove(order_id);
    if book.is_empty() {
        books.remove(symbol);
    }
}

/// Runs `aggressive` against `opposite`'s best price as long as it crosses,
/// appending a [`Trade`] per match at the passive order's price. Returns
/// whatever volume remains once the aggressive order stops crossing or is
/// fully filled; the caller is responsible for resting any leftover.
fn match_loop<Cmp: Comparator<Order>>(
    opposite: &mut HashMap<Symbol, IndexedHeap<Order, Cmp>>,
    symbol: &Symbol,
    mut aggressive: Order,
    buy_aggressor: bool,
    trades: &mut Vec<Trade>,
) -> Order {
    loop {
        if aggressive.volume <= 0 {
            break;
        }
        let Some(book) = opposite.get_mut(symbol) else {
            break;
        };
        if book.is_empty() {
            break;
        }

        let passive_price = book.top().expect("checked non-empty").price;
        let crosses = if buy_aggressor {
            passive_price <= aggressive.price
        } else {
            passive_price >= aggressive.price
        };
        if !crosses {
            break;
        }

        let (passive_id, passive_volume_after, traded) = {
            let passive = book.top_mut().expect("checked non-empty");
            let traded = aggressive.volume.min(passive.volume);
            passive.volume -= traded;
            (passive.order_id, passive.volume, traded)
        };
        aggressive.volume -= traded;

        trades.push(Trade {
            symbol: symbol.clone(),
            price: passive_price,
            volume: traded,
            aggressive_order_id: aggressive.order_id,
            passive_order_id: passive_id,
        });

        if passive_volume_after == 0 {
            book.pop();
        }
        if book.is_empty() {
            opposite.remove(symbol);
        }
    }
    aggressive
}

#[allow(clippy::too_many_arguments)]
fn amend_impl<Own: Comparator<Order>, Opp: Comparator<Order>>(
    own: &mut HashMap<Symbol, IndexedHeap<Order, Own>>,
    opposite: &mut HashMap<Symbol, IndexedHeap<Order, Opp>>,
    symbol: &Symbol,
    order_id: OrderId,
    price: Price,
    volume: Volume,
    buy_aggressor: bool,
    seq: &mut u64,
    trades: &mut Vec<Trade>,
) {
    let Some(book) = own.get_mut(symbol) else {
        return;
    };
    let Some(current) = book.get(order_id) else {
        debug!(order_id, "amend: order not resting on expected side, ignored");
        return;
    };

    if price == current.price && volume < current.volume {
        book.get_mut(order_id).expect("checked above").volume = volume;
        return;
    }

    let removed = book.remove(order_id).expect("checked above");
    if book.is_empty() {
        own.remove(symbol);
    }

    *seq += 1;
    let reissued = Order { order_id: removed.order_id, price, volume, seq: *seq };
    let residual = match_loop(opposite, symbol, reissued, buy_aggressor, trades);
    rest_if_any(own, symbol.clone(), residual);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn insert(engine: &mut MatchingEngine, id: OrderId, symbol: &str, side: Side, price: Price, volume: Volume) {
        engine.insert(id, symbol.to_string(), side, price, volume);
    }

    #[test]
    fn single_insert_rests_with_no_trades() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "AAPL", Side::Buy, 122_000, 5);
        assert!(e.trades().is_empty());
        let books = e.snapshot_books();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].symbol, "AAPL");
        assert_eq!(books[0].bid_levels, vec![(122_000, 5)]);
        assert!(books[0].ask_levels.is_empty());
    }

    #[test]
    fn simple_match_trades_at_passive_price() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "AAPL", Side::Buy, 122_000, 5);
        insert(&mut e, 2, "AAPL", Side::Sell, 121_000, 8);

        assert_eq!(
            e.trades(),
            &[Trade { symbol: "AAPL".into(), price: 122_000, volume: 5, aggressive_order_id: 2, passive_order_id: 1 }]
        );
        let books = e.snapshot_books();
        assert_eq!(books[0].bid_levels, Vec::<Level>::new());
        assert_eq!(books[0].ask_levels, vec![(121_000, 3)]);
    }

    #[test]
    fn resting_orders_at_same_price_match_in_arrival_order() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "A", Side::Sell, 3_0000, 1);
        insert(&mut e, 2, "A", Side::Sell, 3_0000, 1);
        insert(&mut e, 3, "A", Side::Sell, 3_0000, 1);
        insert(&mut e, 4, "A", Side::Buy, 3_0000, 3);

        let passive_ids: Vec<_> = e.trades().iter().map(|t| t.passive_order_id).collect();
        assert_eq!(passive_ids, vec![1, 2, 3]);
    }

    #[test]
    fn amend_volume_decrease_keeps_priority() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "WEBB", Side::Buy, 459_500, 5);
        e.amend(1, 459_500, 3);
        let books = e.snapshot_books();
        assert_eq!(books[0].bid_levels, vec![(459_500, 3)]);

        insert(&mut e, 2, "WEBB", Side::Sell, 459_500, 3);
        assert_eq!(e.trades()[0].passive_order_id, 1, "order 1 should still be first in queue");
    }

    #[test]
    fn amend_volume_increase_forfeits_priority() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "WEBB", Side::Buy, 459_500, 5);
        insert(&mut e, 9, "WEBB", Side::Buy, 459_500, 2);
        e.amend(1, 459_500, 6);

        insert(&mut e, 2, "WEBB", Side::Sell, 459_500, 2);
        assert_eq!(e.trades()[0].passive_order_id, 9, "order 1 forfeited priority by increasing volume");
    }

    #[test]
    fn unknown_id_amend_and_pull_are_no_ops() {
        let mut e = MatchingEngine::new();
        e.amend(999, 100, 1);
        e.pull(999);
        assert!(e.snapshot_books().is_empty());
        assert!(e.trades().is_empty());
    }

    #[test]
    fn insert_pull_insert_with_same_id_drops_second_insert() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "A", Side::Buy, 100, 5);
        e.pull(1);
        insert(&mut e, 1, "A", Side::Sell, 100, 5);
        assert!(e.snapshot_books().is_empty());
    }

    #[test]
    fn empty_side_book_is_removed_from_snapshot() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "A", Side::Buy, 100, 5);
        e.pull(1);
        assert!(e.snapshot_books().is_empty());
    }

    #[test]
    fn snapshot_orders_symbols_alphabetically() {
        let mut e = MatchingEngine::new();
        for (id, sym) in [(1, "C"), (2, "A"), (3, "B"), (4, "E"), (5, "D")] {
            insert(&mut e, id, sym, Side::Buy, 100, 1);
        }
        let symbols: Vec<_> = e.snapshot_books().into_iter().map(|b| b.symbol).collect();
        assert_eq!(symbols, vec!["A", "B", "C", "D", "E"]);
    }

    #[test]
    fn multi_level_match_with_pull_matches_spec_scenario_s3() {
        let mut e = MatchingEngine::new();
        insert(&mut e, 1, "AAPL", Side::Buy, 142_350, 5);
        insert(&mut e, 2, "AAPL", Side::Buy, 142_350, 6);
        insert(&mut e, 3, "AAPL", Side::Buy, 142_350, 12);
        insert(&mut e, 4, "AAPL", Side::Buy, 142_340, 5);
        insert(&mut e, 5, "AAPL", Side::Buy, 142_300, 3);
        insert(&mut e, 6, "AAPL", Side::Sell, 142_370, 8);
        insert(&mut e, 7, "AAPL", Side::Sell, 142_400, 9);
        e.pull(1);
        insert(&mut e, 8, "AAPL", Side::Sell, 142_340, 25);

        let trades: Vec<_> = e
            .trades()
            .iter()
            .map(|t| (t.price, t.volume, t.aggressive_order_id, t.passive_order_id))
            .collect();
        assert_eq!(
            trades,
            vec![
                (142_350, 6, 8, 2),
                (142_350, 12, 8, 3),
                (142_340, 5, 8, 4),
            ]
        );

        let books = e.snapshot_books();
        let book = &books[0];
        assert_eq!(book.bid_levels, vec![(142_300, 3)]);
        assert_eq!(book.ask_levels, vec![(142_340, 2), (142_370, 8), (142_400, 9)]);
    }
}
