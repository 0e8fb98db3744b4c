//! Summaries computed straight from the recorded games, without solving.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::simulation::transitions::TransitionRecord;

/// What a player who knew every card in advance could have earned.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct HindsightBound {
    pub games: usize,
    /// Mean of the best outcome per game, in units.
    pub mean_ev: f64,
    /// Fraction of games where some action wins.
    pub win_rate: f64,
}

/// Outcome of "hit below `threshold`, stand from it" over the recorded games.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct ThresholdResult {
    pub threshold: u8,
    pub expected: f64,
    pub win: f64,
    pub draw: f64,
    pub lose: f64,
}

fn group_by_game(records: &[TransitionRecord]) -> BTreeMap<u64, Vec<&TransitionRecord>> {
    let mut games: BTreeMap<u64, Vec<&TransitionRecord>> = BTreeMap::new();
    for record in records {
        games.entry(record.game_id).or_default().push(record);
    }
    games
}

/// For every game, the best of: the best hit-once outcome over its rows, the
/// best stand outcome over its rows, and doubling on its first row.
pub fn hindsight_bound(records: &[TransitionRecord]) -> HindsightBound {
    let games = group_by_game(records);
    if games.is_empty() {
        return HindsightBound::default();
    }

    let mut total = 0i64;
    let mut wins = 0usize;
    for rows in games.values() {
        let hit_max = rows.iter().map(|r| r.hit_outcome()).max().unwrap_or(-1);
        let stand_max = rows.iter().map(|r| r.stand_outcome()).max().unwrap_or(-1);
        let double_first = rows[0].double_outcome();
        total += hit_max.max(stand_max).max(double_first) as i64;
        if hit_max > 0 || stand_max > 0 || double_first > 0 {
            wins += 1;
        }
    }
    HindsightBound {
        games: games.len(),
        mean_ev: total as f64 / games.len() as f64,
        win_rate: wins as f64 / games.len() as f64,
    }
}

/// Replays every threshold from 2 to 21 on the recorded games.
pub fn threshold_sweep(records: &[TransitionRecord]) -> Vec<ThresholdResult> {
    let mut games: Vec<Vec<&TransitionRecord>> = group_by_game(records).into_values().collect();
    for rows in games.iter_mut() {
        rows.sort_by_key(|r| r.score);
    }

    (2..=21)
        .map(|threshold| {
            let outcomes: Vec<i8> = games
                .iter()
                .map(|rows| threshold_outcome(rows, threshold))
                .collect();
            summarize_outcomes(threshold, &outcomes)
        })
        .collect()
}

/// The threshold with the highest expected value. The lowest one wins ties.
pub fn best_threshold(results: &[ThresholdResult]) -> Option<&ThresholdResult> {
    results.iter().fold(None, |best, result| match best {
        Some(best) if best.expected >= result.expected => Some(best),
        _ => Some(result),
    })
}

fn threshold_outcome(rows: &[&TransitionRecord], threshold: u8) -> i8 {
    match rows.iter().rev().find(|r| r.score < threshold) {
        Some(last_below) => last_below.hit_outcome(),
        None => rows[0].stand_outcome(),
    }
}

fn summarize_outcomes(threshold: u8, outcomes: &[i8]) -> ThresholdResult {
    if outcomes.is_empty() {
        return ThresholdResult {
            threshold,
            ..Default::default()
        };
    }
    let n = outcomes.len() as f64;
    let fraction = |pred: fn(i8) -> bool| outcomes.iter().filter(|&&o| pred(o)).count() as f64 / n;
    ThresholdResult {
        threshold,
        expected: outcomes.iter().map(|&o| o as f64).sum::<f64>() / n,
        win: fraction(|o| o > 0),
        draw: fraction(|o| o == 0),
        lose: fraction(|o| o < 0),
    }
}
