use bjpolicy::calculation::diagnostics::{
    best_threshold, hindsight_bound, threshold_sweep, HindsightBound, ThresholdResult,
};
use bjpolicy::calculation::StrategySolver;
use bjpolicy_drivers::storage::{read_records, save_decision_table, save_json, save_text};
use bjpolicy_drivers::Config;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct AnalysisReport {
    records: usize,
    states: usize,
    hindsight: HindsightBound,
    best_threshold: Option<ThresholdResult>,
    thresholds: Vec<ThresholdResult>,
}

/// Solves the decision table and writes it with the diagnostics beside it.
pub fn analyze(config: &Config) -> anyhow::Result<()> {
    let analyze = &config.analyze;
    let records = read_records(&analyze.input)?;
    anyhow::ensure!(
        !records.is_empty(),
        "{} holds no records",
        analyze.input.display()
    );
    log::info!(
        "loaded {} records from {}",
        records.len(),
        analyze.input.display()
    );

    let hindsight = hindsight_bound(&records);
    log::info!(
        "best possible EV (perfect hindsight): {:.3} units/hand",
        hindsight.mean_ev
    );
    log::info!(
        "best possible win rate (upper bound): {:.2}%",
        hindsight.win_rate * 100.0
    );

    let thresholds = threshold_sweep(&records);
    let best = best_threshold(&thresholds).copied();
    if let Some(best) = &best {
        log::info!(
            "best threshold: stand from {} ({:+.4} units/hand)",
            best.threshold,
            best.expected
        );
    }

    let solver = StrategySolver::from_records(&records);
    let table = solver.solve();
    save_decision_table(&table, &analyze.table)?;
    log::info!(
        "saved {} states to {}",
        table.len(),
        analyze.table.display()
    );

    for (hard, name) in [(true, "hard"), (false, "soft")] {
        let chart = table.chart(hard);
        log::info!("{} hands:\n{}", name, chart);
        save_text(
            &chart,
            analyze.output_dir.join(format!("{}_strategy.txt", name)),
        )?;
    }

    let report = AnalysisReport {
        records: records.len(),
        states: table.len(),
        hindsight,
        best_threshold: best,
        thresholds,
    };
    save_json(&report, analyze.output_dir.join("analysis.json"))?;
    Ok(())
}
