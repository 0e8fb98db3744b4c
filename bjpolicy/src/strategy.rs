use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::simulation::hand::Hand;
use crate::{Decision, Error, Result, State, StateArray};

const TABLE_FORMAT: &str = "bjpolicy-decision-table";
const TABLE_VERSION: u32 = 1;

/// Anything that can tell a player what to do with a hand.
pub trait Strategy {
    /// `split_done` is set for hands that came out of a split and may not split again.
    fn make_decision(&self, hand: &Hand, score_dealer: u8, split_done: bool) -> Decision;
}

/// Expected value of each action from one state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ActionValues {
    pub stand: f64,
    pub hit: f64,
    pub double: f64,
}

impl ActionValues {
    /// The best action and its value. Ties go to double, then hit, then stand.
    pub fn get_max_expectation(&self) -> (f64, Decision) {
        let (mut mx_ex, mut decision) = (self.double, Decision::Double);
        if mx_ex < self.hit {
            (mx_ex, decision) = (self.hit, Decision::Hit);
        }
        if mx_ex < self.stand {
            (mx_ex, decision) = (self.stand, Decision::Stand);
        }
        (mx_ex, decision)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionTableEntry {
    pub decision: Decision,
    pub earn: f64,
    pub earn_if_stand: f64,
    pub earn_if_double: f64,
    pub earn_if_hit: f64,
    /// Set only for even totals whose half-total state is known.
    pub should_split: Option<bool>,
}

impl DecisionTableEntry {
    pub fn from_values(values: ActionValues) -> Self {
        let (earn, decision) = values.get_max_expectation();
        DecisionTableEntry {
            decision,
            earn,
            earn_if_stand: values.stand,
            earn_if_double: values.double,
            earn_if_hit: values.hit,
            should_split: None,
        }
    }

    pub fn values(&self) -> ActionValues {
        ActionValues {
            stand: self.earn_if_stand,
            hit: self.earn_if_hit,
            double: self.earn_if_double,
        }
    }
}

/// The solved policy: one entry per state seen in the training data.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DecisionTable {
    entries: StateArray<DecisionTableEntry>,
}

impl DecisionTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn get(&self, state: &State) -> Option<&DecisionTableEntry> {
        self.entries.get(state)
    }

    pub fn insert(&mut self, state: State, entry: DecisionTableEntry) {
        self.entries.insert(state, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&State, &DecisionTableEntry)> + '_ {
        self.entries.iter()
    }

    pub(crate) fn get_mut(&mut self, state: &State) -> Option<&mut DecisionTableEntry> {
        self.entries.get_mut(state)
    }

    /// Writes the table as a self-describing JSON document.
    pub fn to_writer<W: Write>(&self, writer: W) -> Result<()> {
        let document = TableDocument {
            format: String::from(TABLE_FORMAT),
            version: TABLE_VERSION,
            entries: self
                .entries
                .iter()
                .map(|(state, entry)| TableRow {
                    score: state.score,
                    score_dealer: state.score_dealer,
                    hard: state.hard,
                    entry: *entry,
                })
                .collect(),
        };
        serde_json::to_writer_pretty(writer, &document)?;
        Ok(())
    }

    /// Reads a table written by `to_writer`, rejecting anything that does not
    /// follow the schema.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let document: TableDocument = serde_json::from_reader(reader)?;
        if document.format != TABLE_FORMAT {
            return Err(Error::MalformedTable(format!(
                "unknown format tag {:?}",
                document.format
            )));
        }
        if document.version != TABLE_VERSION {
            return Err(Error::MalformedTable(format!(
                "unsupported version {}",
                document.version
            )));
        }

        let mut table = DecisionTable::new();
        for row in document.entries {
            let state = State::new(row.score, row.score_dealer, row.hard);
            if row.entry.decision == Decision::Split {
                return Err(Error::MalformedTable(format!(
                    "{}: split is not a table decision",
                    state
                )));
            }
            let (best, _) = row.entry.values().get_max_expectation();
            if best != row.entry.earn {
                log::warn!(
                    "{}: earn {} does not match the best action value {}",
                    state,
                    row.entry.earn,
                    best
                );
            }
            if table.entries.insert(state, row.entry).is_some() {
                return Err(Error::MalformedTable(format!("duplicated state {}", state)));
            }
        }
        Ok(table)
    }

    /// Text chart of the decisions for hard or soft hands, one row per
    /// player score and one column per dealer upcard (`A` for 11).
    /// Cells read S, H or D, with `/P` appended where splitting is advised.
    pub fn chart(&self, hard: bool) -> String {
        let scores: BTreeSet<u8> = self
            .entries
            .states()
            .filter(|state| state.hard == hard && (hard || state.score < 21))
            .map(|state| state.score)
            .collect();

        let mut chart = String::new();
        let _ = write!(chart, "{:>5} |", if hard { "hard" } else { "soft" });
        for score_dealer in 2..=11 {
            let _ = write!(chart, "{:>5}", upcard_label(score_dealer));
        }
        chart.push('\n');
        chart.push_str(&"-".repeat(7 + 5 * 10));
        chart.push('\n');

        for score in scores {
            let _ = write!(chart, "{:>5} |", score);
            for score_dealer in 2..=11 {
                let cell = match self.get(&State::new(score, score_dealer, hard)) {
                    None => String::from("."),
                    Some(entry) => {
                        let letter = match entry.decision {
                            Decision::Stand => "S",
                            Decision::Hit => "H",
                            Decision::Double => "D",
                            Decision::Split => "P",
                        };
                        if entry.should_split == Some(true) {
                            format!("{}/P", letter)
                        } else {
                            String::from(letter)
                        }
                    }
                };
                let _ = write!(chart, "{:>5}", cell);
            }
            chart.push('\n');
        }
        chart
    }
}

impl Strategy for DecisionTable {
    /// Unknown states stand. A splittable hand splits when its state says so,
    /// unless it already came out of a split.
    fn make_decision(&self, hand: &Hand, score_dealer: u8, split_done: bool) -> Decision {
        let entry = match self.get(&hand.state(score_dealer)) {
            Some(entry) => entry,
            None => return Decision::Stand,
        };
        if !split_done && hand.can_split() && entry.should_split == Some(true) {
            return Decision::Split;
        }
        entry.decision
    }
}

/// Hit below a fixed score, stand from it upwards. Never doubles or splits.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ThresholdStrategy {
    pub stand_at: u8,
}

impl Strategy for ThresholdStrategy {
    fn make_decision(&self, hand: &Hand, _: u8, _: bool) -> Decision {
        if hand.score() < self.stand_at {
            Decision::Hit
        } else {
            Decision::Stand
        }
    }
}

fn upcard_label(score_dealer: u8) -> String {
    if score_dealer == 11 {
        String::from("A")
    } else {
        score_dealer.to_string()
    }
}

#[derive(Serialize, Deserialize)]
struct TableDocument {
    format: String,
    version: u32,
    entries: Vec<TableRow>,
}

#[derive(Serialize, Deserialize)]
struct TableRow {
    score: u8,
    score_dealer: u8,
    hard: bool,
    #[serde(flatten)]
    entry: DecisionTableEntry,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::{Card, Suit};

    fn hand(face_values: &[u8]) -> Hand {
        let cards: Vec<Card> = face_values
            .iter()
            .map(|&face_value| Card {
                face_value,
                suit: Suit::Club,
            })
            .collect();
        Hand::with_cards(&cards)
    }

    fn sample_table() -> DecisionTable {
        let mut table = DecisionTable::new();
        table.insert(
            State::new(16, 10, true),
            DecisionTableEntry {
                should_split: Some(true),
                ..DecisionTableEntry::from_values(ActionValues {
                    stand: -0.54,
                    hit: -0.51,
                    double: -1.02,
                })
            },
        );
        table.insert(
            State::new(11, 6, true),
            DecisionTableEntry::from_values(ActionValues {
                stand: -0.2,
                hit: 0.25,
                double: 0.5,
            }),
        );
        table.insert(State::new(20, 6, true), DecisionTableEntry::default());
        table
    }

    #[test]
    fn ties_prefer_double_then_hit() {
        let values = ActionValues {
            stand: 0.1,
            hit: 0.1,
            double: 0.1,
        };
        assert_eq!(values.get_max_expectation(), (0.1, Decision::Double));
        let values = ActionValues {
            stand: 0.1,
            hit: 0.1,
            double: -2.0,
        };
        assert_eq!(values.get_max_expectation(), (0.1, Decision::Hit));
        let values = ActionValues {
            stand: 0.3,
            hit: 0.1,
            double: 0.2,
        };
        assert_eq!(values.get_max_expectation(), (0.3, Decision::Stand));
    }

    #[test]
    fn table_lookup_and_split_flag() {
        let table = sample_table();
        assert_eq!(table.make_decision(&hand(&[8, 8]), 10, false), Decision::Split);
        assert_eq!(table.make_decision(&hand(&[8, 8]), 10, true), Decision::Hit);
        assert_eq!(table.make_decision(&hand(&[10, 6]), 10, false), Decision::Hit);
        assert_eq!(table.make_decision(&hand(&[5, 6]), 6, false), Decision::Double);
        // Never seen: stand.
        assert_eq!(table.make_decision(&hand(&[5, 6]), 7, false), Decision::Stand);
        // A default entry stands too.
        assert_eq!(Decision::default(), Decision::Stand);
        assert_eq!(table.make_decision(&hand(&[10, 10]), 6, false), Decision::Stand);
    }

    #[test]
    fn round_trip_keeps_every_entry() {
        let table = sample_table();
        let mut buffer = Vec::new();
        table.to_writer(&mut buffer).unwrap();
        let reloaded = DecisionTable::from_reader(buffer.as_slice()).unwrap();
        assert_eq!(reloaded.len(), table.len());
        for (state, entry) in table.iter() {
            let other = reloaded.get(state).unwrap();
            assert_eq!(other.decision, entry.decision);
            assert_eq!(other.earn, entry.earn);
            assert_eq!(other.should_split, entry.should_split);
        }
    }

    #[test]
    fn document_is_self_describing() {
        let mut buffer = Vec::new();
        sample_table().to_writer(&mut buffer).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&buffer).unwrap();
        assert_eq!(value["format"], TABLE_FORMAT);
        assert_eq!(value["version"], TABLE_VERSION);
        let first = &value["entries"][0];
        assert_eq!(first["score"], 11);
        assert_eq!(first["decision"], "double");
        assert!(first["should_split"].is_null());
    }

    #[test]
    fn malformed_documents_are_rejected() {
        let wrong_format = r#"{"format": "pickle", "version": 1, "entries": []}"#;
        assert!(matches!(
            DecisionTable::from_reader(wrong_format.as_bytes()),
            Err(Error::MalformedTable(_))
        ));

        let wrong_version = r#"{"format": "bjpolicy-decision-table", "version": 7, "entries": []}"#;
        assert!(matches!(
            DecisionTable::from_reader(wrong_version.as_bytes()),
            Err(Error::MalformedTable(_))
        ));

        let row = r#"{"score": 12, "score_dealer": 4, "hard": true, "decision": "stand", "earn": 0.0,
            "earn_if_stand": 0.0, "earn_if_double": -1.0, "earn_if_hit": -0.1, "should_split": null}"#;
        let duplicated = format!(
            r#"{{"format": "bjpolicy-decision-table", "version": 1, "entries": [{}, {}]}}"#,
            row, row
        );
        assert!(matches!(
            DecisionTable::from_reader(duplicated.as_bytes()),
            Err(Error::MalformedTable(_))
        ));

        let split_decision = row.replace("\"stand\"", "\"split\"");
        let split_decision = format!(
            r#"{{"format": "bjpolicy-decision-table", "version": 1, "entries": [{}]}}"#,
            split_decision
        );
        assert!(matches!(
            DecisionTable::from_reader(split_decision.as_bytes()),
            Err(Error::MalformedTable(_))
        ));

        assert!(matches!(
            DecisionTable::from_reader("not json".as_bytes()),
            Err(Error::Json(_))
        ));
    }

    #[test]
    fn chart_marks_decisions() {
        let chart = sample_table().chart(true);
        let row_16 = chart.lines().find(|line| line.trim_start().starts_with("16")).unwrap();
        assert!(row_16.contains("H/P"));
        let row_11 = chart.lines().find(|line| line.trim_start().starts_with("11")).unwrap();
        assert!(row_11.contains('D'));
        assert!(sample_table().chart(false).lines().count() == 2);
    }

    #[test]
    fn threshold_strategy() {
        let strategy = ThresholdStrategy { stand_at: 17 };
        assert_eq!(strategy.make_decision(&hand(&[10, 6]), 10, false), Decision::Hit);
        assert_eq!(strategy.make_decision(&hand(&[10, 7]), 10, false), Decision::Stand);
    }
}
