//! Line-oriented CSV wire format: `INSERT`/`AMEND`/`PULL` commands in,
//! trade and book-snapshot rows out.
//!
//! One line is one command, no embedded newlines or quoting. Output pairs
//! each symbol's bid and ask levels row by row, padding the shorter side
//! with empty fields once the longer side runs out.

use thiserror::Error;

use crate::engine::{Command, OrderBook, Trade};
use crate::price::{format_price, parse_price, PriceError};
use crate::types::{Side, Volume};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("INSERT requires 6 fields, got {0}")]
    MalformedInsert(usize),
    #[error("AMEND requires 4 fields, got {0}")]
    MalformedAmend(usize),
    #[error("PULL requires 2 fields, got {0}")]
    MalformedPull(usize),
    #[error("invalid side '{0}', expected BUY or SELL")]
    InvalidSide(String),
    #[error("invalid integer field '{0}'")]
    InvalidInteger(String),
    #[error(transparent)]
    InvalidPrice(#[from] PriceError),
}

/// Parses one command line. Trailing whitespace (a trailing `\r` from
/// CRLF input, in particular) is trimmed before splitting on `,`.
pub fn parse_line(line: &str) -> Result<Command, ProtocolError> {
    let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split(',').collect();
    match fields.first().copied() {
        None | Some("") => Err(ProtocolError::Empty),
        Some("INSERT") => parse_insert(&fields),
        Some("AMEND") => parse_amend(&fields),
        Some("PULL") => parse_pull(&fields),
        Some(other) => Err(ProtocolError::UnknownCommand(other.to_string())),
    }
}

fn parse_int(field: &str) -> Result<i64, ProtocolError> {
    field.parse().map_err(|_| ProtocolError::InvalidInteger(field.to_string()))
}

fn parse_insert(fields: &[&str]) -> Result<Command, ProtocolError> {
    if fields.len() != 6 {
        return Err(ProtocolError::MalformedInsert(fields.len()));
    }
    let order_id = parse_int(fields[1])?;
    let symbol = fields[2].to_string();
    let side = match fields[3] {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        other => return Err(ProtocolError::InvalidSide(other.to_string())),
    };
    let price = parse_price(fields[4])?;
    let volume = parse_int(fields[5])? as Volume;
    Ok(Command::Insert { order_id, symbol, side, price, volume })
}

fn parse_amend(fields: &[&str]) -> Result<Command, ProtocolError> {
    if fields.len() != 4 {
        return Err(ProtocolError::MalformedAmend(fields.len()));
    }
    let order_id = parse_int(fields[1])?;
    let price = parse_price(fields[2])?;
    let volume = parse_int(fields[3])? as Volume;
    Ok(Command::Amend { order_id, price, volume })
}

fn parse_pull(fields: &[&str]) -> Result<Command, ProtocolError> {
    if fields.len() != 2 {
        return Err(ProtocolError::MalformedPull(fields.len()));
    }
    let order_id = parse_int(fields[1])?;
    Ok(Command::Pull { order_id })
}

/// Renders trades (in chronological order) followed by a `===SYMBOL===`
/// section per book, each holding one row per price level with bid and
/// ask columns paired up; the shorter side is padded with empty fields.
pub fn format_output(trades: &[Trade], books: &[OrderBook]) -> Vec<String> {
    let mut lines = Vec::with_capacity(trades.len() + books.len());

    for trade in trades {
        lines.push(format!(
            "{},{},{},{},{}",
            trade.symbol,
            format_price(trade.price),
            trade.volume,
            trade.aggressive_order_id,
            trade.passive_order_id
        ));
    }

    for book in books {
        lines.push(format!("==={}===", book.symbol));
        let rows = book.bid_levels.len().max(book.ask_levels.len());
        for row in 0..rows {
            let bid = book.bid_levels.get(row);
            let ask = book.ask_levels.get(row);
            lines.push(format_level_row(bid, ask));
        }
    }

    lines
}

fn format_level_row(bid: Option<&(crate::types::Price, Volume)>, ask: Option<&(crate::types::Price, Volume)>) -> String {
    let bid_part = match bid {
        Some((price, volume)) => format!("{},{}", format_price(*price), volume),
        None => ",".to_string(),
    };
    let ask_part = match ask {
        Some((price, volume)) => format!("{},{}", format_price(*price), volume),
        None => ",".to_string(),
    };
    format!("{bid_part},{ask_part}")
}
