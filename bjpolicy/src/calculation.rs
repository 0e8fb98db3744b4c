pub mod diagnostics;
mod transition_stats;

use std::cmp::Ordering;

use crate::simulation::transitions::TransitionRecord;
use crate::strategy::{ActionValues, DecisionTable, DecisionTableEntry};
use crate::State;

pub use self::transition_stats::{Successor, TransitionRows, TransitionStats, TransitionTable};

/// Score whose soft variant is the pair of Aces.
const ACE_PAIR_SCORE: u8 = 12;

/// Solves a decision table from an empirical transition model by backward
/// induction.
///
/// States are resolved highest score first. The hit value of a state
/// averages the `earn` of its successors, each weighted by how often it was
/// sampled. A successor that is not resolved yet (or never was reached as a
/// decision point) contributes its immediate hit-once outcome instead.
pub struct StrategySolver {
    transitions: TransitionTable,
}

impl StrategySolver {
    pub fn new(transitions: TransitionTable) -> Self {
        Self { transitions }
    }

    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a TransitionRecord>,
    {
        Self::new(TransitionTable::from_records(records))
    }

    pub fn transitions(&self) -> &TransitionTable {
        &self.transitions
    }

    /// Every sampled state in the order it gets resolved: descending score,
    /// hard before soft, then descending dealer upcard.
    pub fn resolution_order(&self) -> Vec<State> {
        self.ordered_rows().into_iter().map(|(state, _)| *state).collect()
    }

    fn ordered_rows(&self) -> Vec<(&State, &TransitionRows)> {
        let mut rows: Vec<_> = self.transitions.iter().collect();
        rows.sort_by(|a, b| resolution_cmp(a.0, b.0));
        rows
    }

    pub fn solve(&self) -> DecisionTable {
        let mut table = DecisionTable::new();
        for (state, rows) in self.ordered_rows() {
            let entry = DecisionTableEntry::from_values(action_values(state, rows, &table));
            log::debug!("{}: {:?} earn {:.4}", state, entry.decision, entry.earn);
            table.insert(*state, entry);
        }
        mark_splits(&mut table);

        log::info!(
            "solved {} states from {} records",
            table.len(),
            self.transitions.number_of_records()
        );
        table
    }
}

fn resolution_cmp(a: &State, b: &State) -> Ordering {
    b.score
        .cmp(&a.score)
        .then(b.hard.cmp(&a.hard))
        .then(b.score_dealer.cmp(&a.score_dealer))
}

fn action_values(state: &State, rows: &TransitionRows, resolved: &DecisionTable) -> ActionValues {
    let mut count = 0u64;
    let (mut stand, mut hit, mut double) = (0.0, 0.0, 0.0);
    for (successor, stats) in rows {
        let weight = stats.count as f64;
        let hit_value = successor
            .and_then(|successor| resolved.get(&successor.state(state.score_dealer)))
            .map(|entry| entry.earn)
            .unwrap_or_else(|| stats.mean_hit());

        count += stats.count;
        stand += weight * stats.mean_stand();
        hit += weight * hit_value;
        double += weight * stats.mean_double();
    }
    if count == 0 {
        return ActionValues::default();
    }
    let count = count as f64;
    ActionValues {
        stand: stand / count,
        hit: hit / count,
        double: double / count,
    }
}

/// An even total splits when two hands of half the total are worth more
/// than playing it on. The soft 12 (pair of Aces) always splits.
fn mark_splits(table: &mut DecisionTable) {
    let even_states: Vec<State> = table
        .iter()
        .map(|(state, _)| *state)
        .filter(|state| state.score % 2 == 0)
        .collect();
    for state in even_states {
        let half = State::new(state.score / 2, state.score_dealer, state.hard);
        let earn_half = match table.get(&half) {
            Some(entry) => entry.earn,
            None => continue,
        };
        if let Some(entry) = table.get_mut(&state) {
            entry.should_split = Some(entry.earn < 2.0 * earn_half);
        }
    }

    let ace_pairs: Vec<State> = table
        .iter()
        .map(|(state, _)| *state)
        .filter(|state| state.score == ACE_PAIR_SCORE && !state.hard)
        .collect();
    for state in ace_pairs {
        if let Some(entry) = table.get_mut(&state) {
            entry.should_split = Some(true);
        }
    }
}
