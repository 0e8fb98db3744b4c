pub mod calculation;
pub mod evaluation;
pub mod simulation;
mod statearray;
pub mod strategy;

use serde::{Deserialize, Serialize};
use serde_enum_str::{Deserialize_enum_str, Serialize_enum_str};
pub use statearray::StateArray;

/// Table rules shared by data generation and policy evaluation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    /// Player hands dealt per round, before any split.
    pub hands_per_deal: u8,
}

impl Rule {
    pub fn validate(&self) -> Result<()> {
        if self.number_of_decks == 0 {
            return Err(Error::InvalidRule(String::from(
                "number_of_decks must be at least 1",
            )));
        }
        if self.hands_per_deal == 0 {
            return Err(Error::InvalidRule(String::from(
                "hands_per_deal must be at least 1",
            )));
        }
        Ok(())
    }
}

impl Default for Rule {
    fn default() -> Self {
        Rule {
            number_of_decks: 8,
            dealer_hit_on_soft17: true,
            hands_per_deal: 3,
        }
    }
}

/// The unit of strategy: player total, dealer upcard total and hardness.
///
/// The dealer upcard counts an Ace as 11, so `score_dealer` lies in [2, 11].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct State {
    pub score: u8,
    pub score_dealer: u8,
    pub hard: bool,
}

impl State {
    pub fn new(score: u8, score_dealer: u8, hard: bool) -> Self {
        State {
            score,
            score_dealer,
            hard,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let hardness = if self.hard { "hard" } else { "soft" };
        write!(f, "{} {} vs {}", hardness, self.score, self.score_dealer)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize_enum_str, Deserialize_enum_str)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    #[default]
    Stand,
    Hit,
    Double,
    Split,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("cannot split a hand that is not a pair of equal ranks")]
    CannotSplit,
    #[error("{method} is only allowed in {allowed} phase (current phase: {current})")]
    WrongPhase {
        method: &'static str,
        allowed: &'static str,
        current: String,
    },
    #[error("no player hand at seat {0}")]
    NoSuchSeat(usize),
    #[error("invalid rule: {0}")]
    InvalidRule(String),
    #[error("malformed decision table: {0}")]
    MalformedTable(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
