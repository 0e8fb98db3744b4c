use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::Table;
use crate::{Result, Rule, State};

/// One decision point visited while generating data.
///
/// `score_if_hit` / `hard_if_hit` describe the hand after one more card, and
/// are absent when the hand had already reached 21 or more. `game_id` groups
/// the rows of one (possibly split) player hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub score: u8,
    pub score_dealer: u8,
    pub hard: bool,
    pub score_if_hit: Option<u8>,
    pub hard_if_hit: Option<bool>,
    pub score_fin_dealer: u8,
    pub game_id: u64,
}

impl TransitionRecord {
    pub fn state(&self) -> State {
        State::new(self.score, self.score_dealer, self.hard)
    }

    /// The state reached by hitting once, if a card was drawn from here.
    pub fn successor(&self) -> Option<State> {
        let score = self.score_if_hit?;
        Some(State::new(
            score,
            self.score_dealer,
            self.hard_if_hit.unwrap_or(true),
        ))
    }

    /// Unit outcome of standing on `score`.
    pub fn stand_outcome(&self) -> i8 {
        outcome(self.score, self.score_fin_dealer)
    }

    /// Unit outcome of taking exactly one card and standing. No recorded card counts as a loss.
    pub fn hit_outcome(&self) -> i8 {
        match self.score_if_hit {
            Some(score) => outcome(score, self.score_fin_dealer),
            None => -1,
        }
    }

    /// Doubling draws one card at twice the stake.
    pub fn double_outcome(&self) -> i8 {
        2 * self.hit_outcome()
    }
}

/// +1 win, 0 draw, -1 loss for a player score against the dealer's final score.
/// A player score over 21 loses whatever the dealer holds.
pub fn outcome(player_score: u8, dealer_final_score: u8) -> i8 {
    if player_score > 21 {
        -1
    } else if dealer_final_score > 21 || player_score > dealer_final_score {
        1
    } else if player_score == dealer_final_score {
        0
    } else {
        -1
    }
}

/// Generates transition records by dealing rounds and walking every player
/// hand through successive hits until it reaches 21 or more.
///
/// Every pair is split, unconditionally: the goal is to populate the state
/// space, not to play well.
pub struct GameSimulator {
    table: Table,
    last_game_id: u64,
}

impl GameSimulator {
    pub fn new(rule: &Rule, rng: StdRng) -> Result<Self> {
        Ok(Self {
            table: Table::new(rule, rng)?,
            last_game_id: 0,
        })
    }

    /// Continues `game_id` numbering after `last_game_id`.
    pub fn with_last_game_id(mut self, last_game_id: u64) -> Self {
        self.last_game_id = last_game_id;
        self
    }

    pub fn last_game_id(&self) -> u64 {
        self.last_game_id
    }

    /// Plays one full deal and returns its records, all stamped with the
    /// dealer's final score.
    pub fn play_deal(&mut self) -> Result<Vec<TransitionRecord>> {
        self.table.deal_initial_cards()?;

        let mut seat = 0;
        while seat < self.table.number_of_seats() {
            if self.table.seat(seat)?.can_split() {
                self.table.split_seat(seat)?;
                seat += 2;
            } else {
                seat += 1;
            }
        }

        let score_dealer = self.table.dealer_upcard_score();
        let mut records = Vec::new();
        for seat in 0..self.table.number_of_seats() {
            self.last_game_id += 1;
            self.walk_hand(seat, score_dealer, &mut records)?;
        }

        self.table.finish_player_turns()?;
        let score_fin_dealer = self.table.dealer_plays()?;
        for record in records.iter_mut() {
            record.score_fin_dealer = score_fin_dealer;
        }
        self.table.new_round()?;

        Ok(records)
    }

    /// Plays whole deals until at least `min_rows` records have been produced.
    pub fn generate(&mut self, min_rows: usize) -> Result<Vec<TransitionRecord>> {
        let mut records = Vec::with_capacity(min_rows + 16);
        while records.len() < min_rows {
            records.extend(self.play_deal()?);
        }
        Ok(records)
    }

    fn walk_hand(
        &mut self,
        seat: usize,
        score_dealer: u8,
        records: &mut Vec<TransitionRecord>,
    ) -> Result<()> {
        let mut state = self.table.seat(seat)?.state(score_dealer);
        if state.score >= 21 {
            records.push(self.record(state, None));
            return Ok(());
        }
        while state.score < 21 {
            self.table.hit_seat(seat)?;
            let next = self.table.seat(seat)?.state(score_dealer);
            records.push(self.record(state, Some(next)));
            state = next;
        }
        Ok(())
    }

    fn record(&self, state: State, successor: Option<State>) -> TransitionRecord {
        TransitionRecord {
            score: state.score,
            score_dealer: state.score_dealer,
            hard: state.hard,
            score_if_hit: successor.map(|s| s.score),
            hard_if_hit: successor.map(|s| s.hard),
            score_fin_dealer: 0,
            game_id: self.last_game_id,
        }
    }
}

/// One `GameSimulator` per worker. Shoes and game numbering carry over from
/// one `generate` call to the next.
pub struct ParallelSimulator {
    simulators: Vec<GameSimulator>,
    last_game_id: u64,
}

impl ParallelSimulator {
    /// Worker `i` owns its own shoe seeded with `seed + i`.
    pub fn new(rule: &Rule, number_of_workers: usize, seed: u64) -> Result<Self> {
        let simulators = (0..number_of_workers.max(1))
            .map(|worker| {
                GameSimulator::new(rule, StdRng::seed_from_u64(seed.wrapping_add(worker as u64)))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self {
            simulators,
            last_game_id: 0,
        })
    }

    pub fn with_last_game_id(mut self, last_game_id: u64) -> Self {
        self.last_game_id = last_game_id;
        self
    }

    pub fn last_game_id(&self) -> u64 {
        self.last_game_id
    }

    pub fn number_of_workers(&self) -> usize {
        self.simulators.len()
    }

    /// Generates at least `min_rows` records split evenly across the workers.
    /// Game ids are renumbered to run on from `last_game_id` in worker order,
    /// so the result does not depend on scheduling.
    pub fn generate(&mut self, min_rows: usize) -> Result<Vec<TransitionRecord>> {
        let number_of_workers = self.simulators.len();
        let rows_per_worker = (min_rows + number_of_workers - 1) / number_of_workers;
        let batches = self
            .simulators
            .par_iter_mut()
            .map(|simulator| {
                let first_game_id = simulator.last_game_id();
                let records = simulator.generate(rows_per_worker)?;
                Ok((records, first_game_id, simulator.last_game_id()))
            })
            .collect::<Result<Vec<_>>>()?;

        let start = self.last_game_id;
        let mut records = Vec::with_capacity(min_rows + 16 * number_of_workers);
        for (batch, first_game_id, last_game_id) in batches {
            let offset = self.last_game_id;
            records.extend(batch.into_iter().map(|record| TransitionRecord {
                game_id: record.game_id - first_game_id + offset,
                ..record
            }));
            self.last_game_id += last_game_id - first_game_id;
        }
        log::debug!(
            "generated {} rows over {} games with {} workers",
            records.len(),
            self.last_game_id - start,
            number_of_workers
        );
        Ok(records)
    }
}

/// One-shot `ParallelSimulator` run.
pub fn generate_parallel(
    rule: &Rule,
    min_rows: usize,
    number_of_workers: usize,
    seed: u64,
    last_game_id: u64,
) -> Result<Vec<TransitionRecord>> {
    ParallelSimulator::new(rule, number_of_workers, seed)?
        .with_last_game_id(last_game_id)
        .generate(min_rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_typical_rule() -> Rule {
        Rule {
            number_of_decks: 1,
            dealer_hit_on_soft17: true,
            hands_per_deal: 3,
        }
    }

    fn simulator(seed: u64) -> GameSimulator {
        GameSimulator::new(&get_typical_rule(), StdRng::seed_from_u64(seed)).unwrap()
    }

    #[test]
    fn outcome_table() {
        assert_eq!(outcome(20, 19), 1);
        assert_eq!(outcome(12, 22), 1);
        assert_eq!(outcome(18, 18), 0);
        assert_eq!(outcome(17, 20), -1);
        assert_eq!(outcome(22, 25), -1);
        assert_eq!(outcome(23, 17), -1);
    }

    #[test]
    fn record_outcomes() {
        let record = TransitionRecord {
            score: 15,
            score_dealer: 10,
            hard: true,
            score_if_hit: Some(19),
            hard_if_hit: Some(true),
            score_fin_dealer: 18,
            game_id: 1,
        };
        assert_eq!(record.stand_outcome(), -1);
        assert_eq!(record.hit_outcome(), 1);
        assert_eq!(record.double_outcome(), 2);

        let terminal = TransitionRecord {
            score: 21,
            hard: false,
            score_if_hit: None,
            hard_if_hit: None,
            ..record
        };
        assert_eq!(terminal.stand_outcome(), 1);
        assert_eq!(terminal.hit_outcome(), -1);
        assert_eq!(terminal.double_outcome(), -2);
        assert_eq!(terminal.successor(), None);
    }

    #[test]
    fn records_of_a_deal_share_dealer_final_score() {
        let mut simulator = simulator(17);
        for _ in 0..200 {
            let records = simulator.play_deal().unwrap();
            assert!(!records.is_empty());
            let fin = records[0].score_fin_dealer;
            assert!(fin >= 17);
            assert!(records.iter().all(|r| r.score_fin_dealer == fin));
            let upcard = records[0].score_dealer;
            assert!((2..=11).contains(&upcard));
            assert!(records.iter().all(|r| r.score_dealer == upcard));
        }
    }

    #[test]
    fn records_chain_within_a_game() {
        let mut simulator = simulator(23);
        let records = simulator.generate(5_000).unwrap();
        assert!(records.len() >= 5_000);

        let mut start = 0;
        while start < records.len() {
            let game_id = records[start].game_id;
            let end = start
                + records[start..]
                    .iter()
                    .take_while(|r| r.game_id == game_id)
                    .count();
            let game = &records[start..end];

            // Every row but the last hands its successor to the next row.
            for pair in game.windows(2) {
                assert!(pair[0].score < 21);
                assert_eq!(pair[0].successor(), Some(pair[1].state()));
            }
            let last = game.last().unwrap();
            match last.score_if_hit {
                Some(score) => assert!(score >= 21),
                None => {
                    assert_eq!(game.len(), 1);
                    assert_eq!(last.score, 21);
                }
            }
            start = end;
        }
    }

    #[test]
    fn game_ids_are_consecutive() {
        let mut simulator = simulator(5).with_last_game_id(100);
        let records = simulator.generate(1_000).unwrap();
        assert_eq!(records[0].game_id, 101);
        for pair in records.windows(2) {
            assert!(pair[1].game_id == pair[0].game_id || pair[1].game_id == pair[0].game_id + 1);
        }
        assert_eq!(simulator.last_game_id(), records.last().unwrap().game_id);
    }

    #[test]
    fn split_hands_start_from_one_card() {
        let mut simulator = simulator(31);
        let records = simulator.generate(20_000).unwrap();
        // A lone Ace is soft 11, which only a split can produce as a first decision.
        assert!(records
            .iter()
            .any(|r| r.score == 11 && !r.hard && r.score_if_hit.is_some()));
    }

    #[test]
    fn pair_splits_into_two_games_from_one_card() {
        let rule = Rule {
            hands_per_deal: 1,
            ..get_typical_rule()
        };
        let mut simulator = GameSimulator::new(&rule, StdRng::seed_from_u64(0)).unwrap();
        // 8 8 against 10 7, then 3 10 for the first eight and 2 9 2 for the second.
        simulator.table.stack_shoe(&[8, 8, 10, 7, 3, 10, 2, 9, 2]);
        let records = simulator.play_deal().unwrap();

        let rows: Vec<(u8, bool, Option<u8>, u64)> = records
            .iter()
            .map(|r| (r.score, r.hard, r.score_if_hit, r.game_id))
            .collect();
        assert_eq!(
            rows,
            vec![
                (8, true, Some(11), 1),
                (11, true, Some(21), 1),
                (8, true, Some(10), 2),
                (10, true, Some(19), 2),
                (19, true, Some(21), 2),
            ]
        );
        assert!(records
            .iter()
            .all(|r| r.score_dealer == 10 && r.score_fin_dealer == 17));
        assert_eq!(simulator.last_game_id(), 2);
    }

    #[test]
    fn dealt_21_is_a_single_terminal_row() {
        let rule = Rule {
            hands_per_deal: 1,
            ..get_typical_rule()
        };
        let mut simulator = GameSimulator::new(&rule, StdRng::seed_from_u64(0)).unwrap();
        simulator.table.stack_shoe(&[1, 12, 9, 9]);
        let records = simulator.play_deal().unwrap();
        assert_eq!(
            records,
            vec![TransitionRecord {
                score: 21,
                score_dealer: 9,
                hard: false,
                score_if_hit: None,
                hard_if_hit: None,
                score_fin_dealer: 18,
                game_id: 1,
            }]
        );
    }

    #[test]
    fn parallel_generation_is_reproducible() {
        let rule = get_typical_rule();
        let a = generate_parallel(&rule, 4_000, 4, 99, 0).unwrap();
        let b = generate_parallel(&rule, 4_000, 4, 99, 0).unwrap();
        assert_eq!(a, b);
        assert!(a.len() >= 4_000);
        for pair in a.windows(2) {
            assert!(pair[1].game_id >= pair[0].game_id);
        }
    }

    #[test]
    fn parallel_simulator_continues_numbering() {
        let mut simulator = ParallelSimulator::new(&get_typical_rule(), 3, 8)
            .unwrap()
            .with_last_game_id(10);
        assert_eq!(simulator.number_of_workers(), 3);
        let first = simulator.generate(600).unwrap();
        assert_eq!(first[0].game_id, 11);
        assert_eq!(first.last().unwrap().game_id, simulator.last_game_id());

        let second = simulator.generate(600).unwrap();
        assert_eq!(second[0].game_id, simulator.last_game_id() - count_games(&second) + 1);
        assert_eq!(second[0].game_id, first.last().unwrap().game_id + 1);
    }

    fn count_games(records: &[TransitionRecord]) -> u64 {
        1 + records
            .windows(2)
            .filter(|pair| pair[0].game_id != pair[1].game_id)
            .count() as u64
    }
}
