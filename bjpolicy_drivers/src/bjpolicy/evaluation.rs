use anyhow::Context;
use bjpolicy::evaluation::{Evaluation, PolicyEvaluator};
use bjpolicy::strategy::{Strategy, ThresholdStrategy};
use bjpolicy::Rule;
use bjpolicy_drivers::storage::{load_decision_table, save_json};
use bjpolicy_drivers::{progress_bar, Config};

/// Replays the decision table, or a fixed threshold, and writes the earnings summary.
pub fn test(config: &Config, seed: u64) -> anyhow::Result<()> {
    let test = &config.test;
    let mut config_rule = config.rule.clone();
    config_rule.hands_per_deal = test.hands_per_deal;
    let rule: Rule = config_rule.try_into().context("invalid rule")?;
    let evaluator = PolicyEvaluator::new(&rule, test.number_of_sessions, test.session_length)?;

    let evaluation = match test.threshold {
        Some(stand_at) => {
            log::info!("replaying: stand at {} or above", stand_at);
            run_sessions(&evaluator, &ThresholdStrategy { stand_at }, seed)?
        }
        None => {
            let table = load_decision_table(&test.table)?;
            log::info!(
                "replaying {} states from {}",
                table.len(),
                test.table.display()
            );
            run_sessions(&evaluator, &table, seed)?
        }
    };

    let summary = evaluation.summarize();
    log::info!(
        "{} sessions of {} hands: {:+.4} units per hand",
        summary.number_of_sessions,
        summary.session_length,
        summary.mean_increment
    );
    let units = summary.units;
    if units.total() > 0 {
        log::info!(
            "win {:.2}%  draw {:.2}%  loss {:.2}% over {} bets",
            100.0 * units.win as f64 / units.total() as f64,
            100.0 * units.draw as f64 / units.total() as f64,
            100.0 * units.loss as f64 / units.total() as f64,
            units.total()
        );
    }
    if let Some(last) = summary.hands.last() {
        log::info!(
            "after hand {}: mean {:+.1}, 5% {:+.1}, 95% {:+.1}",
            last.hand,
            last.mean,
            last.q05,
            last.q95
        );
    }

    save_json(&summary, &test.output)?;
    log::info!("saved earnings summary to {}", test.output.display());
    Ok(())
}

fn run_sessions<S: Strategy + Sync>(
    evaluator: &PolicyEvaluator,
    strategy: &S,
    seed: u64,
) -> anyhow::Result<Evaluation> {
    let progress = progress_bar(evaluator.number_of_sessions() as u64, "sessions");
    let evaluation = evaluator.run_with_progress(strategy, seed, || progress.inc(1))?;
    progress.finish();
    Ok(evaluation)
}
