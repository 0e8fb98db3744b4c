use std::collections::BTreeMap;

use crate::simulation::transitions::TransitionRecord;
use crate::{State, StateArray};

/// Score and hardness one card later.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Successor {
    pub score: u8,
    pub hard: bool,
}

impl Successor {
    /// The successor as a state against the same dealer upcard.
    pub fn state(&self, score_dealer: u8) -> State {
        State::new(self.score, score_dealer, self.hard)
    }
}

/// Sample count and outcome sums of every record sharing one
/// (state, successor) key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct TransitionStats {
    pub count: u64,
    sum_stand: i64,
    sum_hit: i64,
    sum_double: i64,
}

impl TransitionStats {
    fn add_record(&mut self, record: &TransitionRecord) {
        self.count += 1;
        self.sum_stand += record.stand_outcome() as i64;
        self.sum_hit += record.hit_outcome() as i64;
        self.sum_double += record.double_outcome() as i64;
    }

    pub fn mean_stand(&self) -> f64 {
        self.mean(self.sum_stand)
    }

    pub fn mean_hit(&self) -> f64 {
        self.mean(self.sum_hit)
    }

    pub fn mean_double(&self) -> f64 {
        self.mean(self.sum_double)
    }

    fn mean(&self, sum: i64) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            sum as f64 / self.count as f64
        }
    }
}

/// Outgoing transitions of one state, keyed by successor. Terminal records
/// (no card drawn) sit under `None`.
pub type TransitionRows = BTreeMap<Option<Successor>, TransitionStats>;

/// Empirical transition model built from simulated records.
#[derive(Clone, Debug, Default)]
pub struct TransitionTable {
    rows: StateArray<TransitionRows>,
    number_of_records: u64,
}

impl TransitionTable {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TransitionRecord>,
    {
        let mut table = Self::new();
        for record in records {
            table.add_record(record);
        }
        table
    }

    pub fn add_record(&mut self, record: &TransitionRecord) {
        let successor = record.score_if_hit.map(|score| Successor {
            score,
            hard: record.hard_if_hit.unwrap_or(true),
        });
        self.rows[&record.state()]
            .entry(successor)
            .or_default()
            .add_record(record);
        self.number_of_records += 1;
    }

    pub fn rows(&self, state: &State) -> Option<&TransitionRows> {
        self.rows.get(state)
    }

    /// Every sampled state with its outgoing rows, in `State` order.
    pub fn iter(&self) -> impl Iterator<Item = (&State, &TransitionRows)> + '_ {
        self.rows.iter()
    }

    pub fn number_of_states(&self) -> usize {
        self.rows.len()
    }

    pub fn number_of_records(&self) -> u64 {
        self.number_of_records
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: u8, hit: Option<(u8, bool)>, fin: u8) -> TransitionRecord {
        TransitionRecord {
            score,
            score_dealer: 10,
            hard: true,
            score_if_hit: hit.map(|h| h.0),
            hard_if_hit: hit.map(|h| h.1),
            score_fin_dealer: fin,
            game_id: 0,
        }
    }

    #[test]
    fn groups_by_state_and_successor() {
        let records = vec![
            record(15, Some((19, true)), 18),
            record(15, Some((19, true)), 20),
            record(15, Some((25, true)), 18),
            record(16, Some((20, true)), 22),
        ];
        let table = TransitionTable::from_records(&records);
        assert_eq!(table.number_of_records(), 4);
        assert_eq!(table.number_of_states(), 2);

        let rows = table.rows(&State::new(15, 10, true)).unwrap();
        assert_eq!(rows.len(), 2);
        let to_19 = rows[&Some(Successor {
            score: 19,
            hard: true,
        })];
        assert_eq!(to_19.count, 2);
        assert_eq!(to_19.mean_stand(), -1.0);
        assert_eq!(to_19.mean_hit(), 0.0);
        assert_eq!(to_19.mean_double(), 0.0);

        let bust = rows[&Some(Successor {
            score: 25,
            hard: true,
        })];
        assert_eq!(bust.mean_hit(), -1.0);
        assert_eq!(bust.mean_double(), -2.0);
    }

    #[test]
    fn terminal_records_have_no_successor() {
        let mut terminal = record(21, None, 20);
        terminal.hard = false;
        let table = TransitionTable::from_records([&terminal]);
        let rows = table.rows(&State::new(21, 10, false)).unwrap();
        let stats = rows[&None];
        assert_eq!(stats.count, 1);
        assert_eq!(stats.mean_stand(), 1.0);
        assert_eq!(stats.mean_hit(), -1.0);
    }
}
