use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use serde::Serialize;

use crate::simulation::Table;
use crate::strategy::Strategy;
use crate::{Decision, Result, Rule};

/// Final score standing in for a natural: a player's dealt 21, or a dealer
/// 21 from two cards with the Ace first. No dealt hand can score 0.
pub const NATURAL: u8 = 0;

/// Units won by a player final score against the dealer's final score,
/// both with naturals encoded as `NATURAL`.
pub fn earnings(score: u8, score_dealer: u8) -> f64 {
    if score > 21 {
        -1.0
    } else if score == NATURAL && score_dealer != NATURAL {
        1.5
    } else if score != NATURAL && score_dealer == NATURAL {
        -1.0
    } else if score > score_dealer || score_dealer > 21 {
        1.0
    } else if score == score_dealer {
        0.0
    } else {
        -1.0
    }
}

/// Win, draw and loss counts over every settled bet. A doubled hand counts twice.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct UnitCounts {
    pub win: u64,
    pub draw: u64,
    pub loss: u64,
}

impl UnitCounts {
    fn add(&mut self, earning: f64) {
        if earning > 0.0 {
            self.win += 1;
        } else if earning == 0.0 {
            self.draw += 1;
        } else {
            self.loss += 1;
        }
    }

    pub fn total(&self) -> u64 {
        self.win + self.draw + self.loss
    }
}

impl std::ops::AddAssign for UnitCounts {
    fn add_assign(&mut self, other: Self) {
        self.win += other.win;
        self.draw += other.draw;
        self.loss += other.loss;
    }
}

/// Cumulative earnings after each hand of one session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SessionResult {
    pub cumulative: Vec<f64>,
    pub units: UnitCounts,
}

/// Plays a strategy over independent sessions of consecutive hands.
///
/// Session `i` plays on its own table whose shoe is seeded with `seed + i`,
/// so results do not depend on how sessions are scheduled.
#[derive(Clone, Debug)]
pub struct PolicyEvaluator {
    rule: Rule,
    number_of_sessions: usize,
    session_length: usize,
}

impl PolicyEvaluator {
    pub fn new(rule: &Rule, number_of_sessions: usize, session_length: usize) -> Result<Self> {
        rule.validate()?;
        Ok(Self {
            rule: *rule,
            number_of_sessions,
            session_length,
        })
    }

    pub fn number_of_sessions(&self) -> usize {
        self.number_of_sessions
    }

    pub fn session_length(&self) -> usize {
        self.session_length
    }

    /// Plays every session in parallel.
    pub fn run<S: Strategy + Sync>(&self, strategy: &S, seed: u64) -> Result<Evaluation> {
        self.run_with_progress(strategy, seed, || {})
    }

    /// Like `run`, calling `on_session_done` as each session finishes.
    pub fn run_with_progress<S, F>(
        &self,
        strategy: &S,
        seed: u64,
        on_session_done: F,
    ) -> Result<Evaluation>
    where
        S: Strategy + Sync,
        F: Fn() + Sync,
    {
        let sessions = (0..self.number_of_sessions)
            .into_par_iter()
            .map(|session| {
                let result = self.play_session(strategy, session, seed);
                on_session_done();
                result
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Evaluation::from_sessions(self.session_length, sessions))
    }

    pub fn play_session<S: Strategy>(
        &self,
        strategy: &S,
        session: usize,
        seed: u64,
    ) -> Result<SessionResult> {
        let rng = StdRng::seed_from_u64(seed.wrapping_add(session as u64));
        let mut table = Table::new(&self.rule, rng)?;
        let mut result = SessionResult {
            cumulative: Vec::with_capacity(self.session_length),
            units: UnitCounts::default(),
        };

        let mut earned = 0.0;
        let mut final_scores = Vec::new();
        for _ in 0..self.session_length {
            let dealer_final = play_round(&mut table, strategy, &mut final_scores)?;
            for &score in &final_scores {
                let earning = earnings(score, dealer_final);
                result.units.add(earning);
                earned += earning;
            }
            result.cumulative.push(earned);
        }

        log::debug!("session {} ended at {:+}", session, earned);
        Ok(result)
    }
}

/// Plays one deal through to the next round. `final_scores` receives one
/// entry per bet; the dealer's final score is returned, both with naturals
/// encoded as `NATURAL`.
fn play_round<S: Strategy>(
    table: &mut Table,
    strategy: &S,
    final_scores: &mut Vec<u8>,
) -> Result<u8> {
    final_scores.clear();
    table.deal_initial_cards()?;
    let score_dealer = table.dealer_upcard_score();

    let mut seat = 0;
    while seat < table.number_of_seats() {
        seat += play_seat(table, strategy, seat, score_dealer, final_scores)?;
    }

    table.finish_player_turns()?;
    let mut dealer_final = table.dealer_plays()?;
    if table.dealer_hand().is_ace_first_natural() {
        dealer_final = NATURAL;
    }
    table.new_round()?;
    Ok(dealer_final)
}

/// Plays the hand at `seat` and returns how many seats it ended up using.
fn play_seat<S: Strategy>(
    table: &mut Table,
    strategy: &S,
    seat: usize,
    score_dealer: u8,
    final_scores: &mut Vec<u8>,
) -> Result<usize> {
    let hand = table.seat(seat)?;
    if hand.score() == 21 {
        final_scores.push(NATURAL);
        return Ok(1);
    }
    match strategy.make_decision(hand, score_dealer, false) {
        Decision::Split => {
            table.split_seat(seat)?;
            for sub_hand in [seat, seat + 1] {
                let decision = strategy.make_decision(table.seat(sub_hand)?, score_dealer, true);
                play_hand(table, strategy, sub_hand, score_dealer, true, decision, final_scores)?;
            }
            Ok(2)
        }
        decision => {
            play_hand(table, strategy, seat, score_dealer, false, decision, final_scores)?;
            Ok(1)
        }
    }
}

/// Doubling takes exactly one card. Otherwise the hand draws until it stands
/// or reaches 21; a later double is played as a hit.
fn play_hand<S: Strategy>(
    table: &mut Table,
    strategy: &S,
    seat: usize,
    score_dealer: u8,
    split_done: bool,
    first: Decision,
    final_scores: &mut Vec<u8>,
) -> Result<()> {
    if first == Decision::Double {
        table.hit_seat(seat)?;
        let score = table.seat(seat)?.score();
        final_scores.push(score);
        final_scores.push(score);
        return Ok(());
    }

    let mut decision = first;
    while table.seat(seat)?.score() < 21 && decision != Decision::Stand {
        table.hit_seat(seat)?;
        decision = strategy.make_decision(table.seat(seat)?, score_dealer, split_done);
    }
    final_scores.push(table.seat(seat)?.score());
    Ok(())
}

/// Cumulative earnings indexed by (hand, session).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EarningsMatrix {
    session_length: usize,
    sessions: Vec<Vec<f64>>,
}

impl EarningsMatrix {
    pub fn get(&self, hand: usize, session: usize) -> f64 {
        self.sessions[session][hand]
    }

    pub fn number_of_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_length(&self) -> usize {
        self.session_length
    }

    /// Every session's cumulative earnings after `hand`.
    pub fn hand(&self, hand: usize) -> Vec<f64> {
        self.sessions.iter().map(|session| session[hand]).collect()
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Evaluation {
    pub earnings: EarningsMatrix,
    pub units: UnitCounts,
}

impl Evaluation {
    pub fn from_sessions(session_length: usize, sessions: Vec<SessionResult>) -> Self {
        let mut units = UnitCounts::default();
        let mut cumulative = Vec::with_capacity(sessions.len());
        for session in sessions {
            units += session.units;
            cumulative.push(session.cumulative);
        }
        Evaluation {
            earnings: EarningsMatrix {
                session_length,
                sessions: cumulative,
            },
            units,
        }
    }

    /// Mean over sessions of the final cumulative earnings divided by the
    /// number of hands played.
    pub fn mean_increment(&self) -> f64 {
        let m = &self.earnings;
        if m.session_length == 0 || m.sessions.is_empty() {
            return 0.0;
        }
        let last = m.session_length - 1;
        let total: f64 = m.sessions.iter().map(|session| session[last]).sum();
        total / m.sessions.len() as f64 / m.session_length as f64
    }

    pub fn summarize(&self) -> EarningsSummary {
        let hands = (0..self.earnings.session_length)
            .map(|hand| HandSummary::from_values(hand + 1, self.earnings.hand(hand)))
            .collect();
        EarningsSummary {
            number_of_sessions: self.earnings.number_of_sessions(),
            session_length: self.earnings.session_length(),
            mean_increment: self.mean_increment(),
            units: self.units,
            hands,
        }
    }
}

/// Distribution of cumulative earnings across sessions after one hand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HandSummary {
    /// 1-based.
    pub hand: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub q01: f64,
    pub q05: f64,
    pub q10: f64,
    pub q90: f64,
    pub q95: f64,
    pub q99: f64,
}

impl HandSummary {
    fn from_values(hand: usize, mut values: Vec<f64>) -> Self {
        if values.is_empty() {
            return HandSummary {
                hand,
                ..Default::default()
            };
        }
        values.sort_by(f64::total_cmp);
        HandSummary {
            hand,
            mean: values.iter().sum::<f64>() / values.len() as f64,
            min: values[0],
            max: values[values.len() - 1],
            q01: quantile(&values, 0.01),
            q05: quantile(&values, 0.05),
            q10: quantile(&values, 0.10),
            q90: quantile(&values, 0.90),
            q95: quantile(&values, 0.95),
            q99: quantile(&values, 0.99),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct EarningsSummary {
    pub number_of_sessions: usize,
    pub session_length: usize,
    pub mean_increment: f64,
    pub units: UnitCounts,
    pub hands: Vec<HandSummary>,
}

/// Linear interpolation between the order statistics around `(n - 1) * q`.
/// `sorted` must be sorted and non-empty.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    let position = (sorted.len() - 1) as f64 * q;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (position - lower as f64)
}
