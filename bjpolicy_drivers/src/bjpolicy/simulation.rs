use anyhow::Context;
use bjpolicy::simulation::transitions::ParallelSimulator;
use bjpolicy::Rule;
use bjpolicy_drivers::storage::RecordWriter;
use bjpolicy_drivers::{progress_bar, Config};

/// Generates `max_rows` records or a few more, flushing every `chunk_write`.
pub fn simulate(config: &Config, seed: u64) -> anyhow::Result<()> {
    let rule: Rule = config.rule.clone().try_into().context("invalid rule")?;
    let simulate = &config.simulate;
    anyhow::ensure!(simulate.chunk_write > 0, "chunk_write must be at least 1");

    log::info!(
        "simulating {} rows ({} decks, dealer {} soft 17, {} hands per deal) into {}",
        simulate.max_rows,
        rule.number_of_decks,
        if rule.dealer_hit_on_soft17 { "hits" } else { "stands on" },
        rule.hands_per_deal,
        simulate.output.display()
    );

    let mut simulator = ParallelSimulator::new(&rule, rayon::current_num_threads(), seed)?;
    let mut writer = RecordWriter::create(&simulate.output)?;
    let progress = progress_bar(simulate.max_rows as u64, "rows");
    while (writer.rows_written() as usize) < simulate.max_rows {
        let remaining = simulate.max_rows - writer.rows_written() as usize;
        let records = simulator.generate(remaining.min(simulate.chunk_write))?;
        writer.write_chunk(&records)?;
        progress.inc(records.len() as u64);
    }
    progress.finish();

    log::info!(
        "wrote {} rows over {} games to {}",
        writer.rows_written(),
        simulator.last_game_id(),
        simulate.output.display()
    );
    Ok(())
}
