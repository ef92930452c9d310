//! Line commands for the terminal front end.
//!
//! ```text
//! bet straight 17 100      bet split 17 20 50      bet street 4 10
//! bet corner 5 10          bet sixline 1 10        bet column 1 25
//! bet dozen 3 25           bet red 100             (black even odd low high)
//! confirm | reset | credit | override 17 | status | quit
//! ```
//! Column and dozen are numbered from 1 on the command line.

use roulette_types::casino::{BetLayout, SlotId};
use thiserror::Error as ThisError;

#[derive(Debug, ThisError, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty command")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("unknown bet {0:?}")]
    UnknownBet(String),
    #[error("{bet} expects {expected} argument(s)")]
    Arity { bet: String, expected: usize },
    #[error("not a number: {0:?}")]
    NotANumber(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    Bet {
        slot: SlotId,
        layout: BetLayout,
        amount: u64,
    },
    Confirm,
    Reset,
    Credit,
    Override(u8),
    Status,
    Quit,
}

fn number<T: std::str::FromStr>(word: &str) -> Result<T, ParseError> {
    word.parse()
        .map_err(|_| ParseError::NotANumber(word.to_string()))
}

/// 1-based column or dozen index to the layout's 0-based one.
fn ordinal(word: &str) -> Result<u8, ParseError> {
    let value: u8 = number(word)?;
    // Out-of-range values are left for layout validation
    Ok(value.wrapping_sub(1))
}

fn parse_bet(words: &[&str]) -> Result<Request, ParseError> {
    let (bet, args) = words
        .split_first()
        .ok_or_else(|| ParseError::Arity {
            bet: "bet".to_string(),
            expected: 2,
        })?;
    let bet = bet.to_ascii_lowercase();
    let expected = match bet.as_str() {
        "straight" | "street" | "corner" | "sixline" | "column" | "dozen" => 2,
        "split" => 3,
        "red" | "black" | "even" | "odd" | "low" | "high" => 1,
        _ => return Err(ParseError::UnknownBet(bet)),
    };
    if args.len() != expected {
        return Err(ParseError::Arity { bet, expected });
    }
    let amount: u64 = number(args[expected - 1])?;
    let layout = match bet.as_str() {
        "straight" => BetLayout::Straight {
            number: number(args[0])?,
        },
        "split" => BetLayout::Split {
            first: number(args[0])?,
            second: number(args[1])?,
        },
        "street" => BetLayout::Street {
            start: number(args[0])?,
        },
        "corner" => BetLayout::Corner {
            start: number(args[0])?,
        },
        "sixline" => BetLayout::SixLine {
            start: number(args[0])?,
        },
        "column" => BetLayout::Column {
            index: ordinal(args[0])?,
        },
        "dozen" => BetLayout::Dozen {
            index: ordinal(args[0])?,
        },
        "red" => BetLayout::RedBlack { red: true },
        "black" => BetLayout::RedBlack { red: false },
        "even" => BetLayout::EvenOdd { even: true },
        "odd" => BetLayout::EvenOdd { even: false },
        "low" => BetLayout::HighLow { high: false },
        _ => BetLayout::HighLow { high: true },
    };
    let mut slot = bet;
    for arg in &args[..expected - 1] {
        slot.push('-');
        slot.push_str(arg);
    }
    Ok(Request::Bet {
        slot: SlotId::new(slot),
        layout,
        amount,
    })
}

pub fn parse(line: &str) -> Result<Request, ParseError> {
    let words: Vec<&str> = line.split_whitespace().collect();
    let (command, rest) = words.split_first().ok_or(ParseError::Empty)?;
    match command.to_ascii_lowercase().as_str() {
        "bet" => parse_bet(rest),
        "confirm" | "spin" => Ok(Request::Confirm),
        "reset" => Ok(Request::Reset),
        "credit" => Ok(Request::Credit),
        "status" => Ok(Request::Status),
        "quit" | "exit" => Ok(Request::Quit),
        "override" => match rest {
            [value] => Ok(Request::Override(number(value)?)),
            _ => Err(ParseError::Arity {
                bet: "override".to_string(),
                expected: 1,
            }),
        },
        other => Err(ParseError::Unknown(other.to_string())),
    }
}
