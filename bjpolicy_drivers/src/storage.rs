//! On-disk artifacts: simulation records as JSON Lines, the decision table,
//! and the reports written by `analyze` and `test`.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Context;
use bjpolicy::simulation::transitions::TransitionRecord;
use bjpolicy::strategy::DecisionTable;
use serde::Serialize;

fn create_file(path: &Path) -> anyhow::Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create directory {}", parent.display()))?;
    }
    File::create(path).with_context(|| format!("cannot create {}", path.display()))
}

/// Appends records to a JSON Lines file, one chunk at a time. The file is
/// truncated when the writer is created.
pub struct RecordWriter {
    path: PathBuf,
    writer: BufWriter<File>,
    rows_written: u64,
}

impl RecordWriter {
    pub fn create<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let writer = BufWriter::new(create_file(&path)?);
        Ok(RecordWriter {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Writes `records` and flushes them to disk.
    pub fn write_chunk(&mut self, records: &[TransitionRecord]) -> anyhow::Result<()> {
        for record in records {
            serde_json::to_writer(&mut self.writer, record)?;
            self.writer.write_all(b"\n")?;
        }
        self.writer
            .flush()
            .with_context(|| format!("cannot write to {}", self.path.display()))?;
        self.rows_written += records.len() as u64;
        log::debug!(
            "flushed {} rows to {} ({} in total)",
            records.len(),
            self.path.display(),
            self.rows_written
        );
        Ok(())
    }

    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}

/// Reads every record of a JSON Lines file. Blank lines are skipped.
pub fn read_records<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<TransitionRecord>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("cannot open {}", path.display()))?;
    let mut records = Vec::new();
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line.with_context(|| format!("cannot read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        let record: TransitionRecord = serde_json::from_str(&line)
            .with_context(|| format!("{}:{}: malformed record", path.display(), index + 1))?;
        records.push(record);
    }
    Ok(records)
}

pub fn save_decision_table<P: AsRef<Path>>(table: &DecisionTable, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(create_file(path)?);
    table
        .to_writer(&mut writer)
        .with_context(|| format!("cannot write decision table {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn load_decision_table<P: AsRef<Path>>(path: P) -> anyhow::Result<DecisionTable> {
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("cannot open decision table {}", path.display()))?;
    DecisionTable::from_reader(BufReader::new(file))
        .with_context(|| format!("cannot load decision table {}", path.display()))
}

pub fn save_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut writer = BufWriter::new(create_file(path)?);
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("cannot write {}", path.display()))?;
    writer.flush()?;
    Ok(())
}

pub fn save_text<P: AsRef<Path>>(text: &str, path: P) -> anyhow::Result<()> {
    let path = path.as_ref();
    let mut file = create_file(path)?;
    file.write_all(text.as_bytes())
        .with_context(|| format!("cannot write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use bjpolicy::strategy::{ActionValues, DecisionTableEntry};
    use bjpolicy::State;

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("bjpolicy-{}-{}", std::process::id(), name))
    }

    fn record(score: u8, score_if_hit: Option<u8>, game_id: u64) -> TransitionRecord {
        TransitionRecord {
            score,
            score_dealer: 7,
            hard: true,
            score_if_hit,
            hard_if_hit: score_if_hit.map(|_| true),
            score_fin_dealer: 19,
            game_id,
        }
    }

    #[test]
    fn records_written_in_chunks_read_back_in_order() {
        let path = temp_path("records.jsonl");
        let first = vec![record(12, Some(15), 1), record(15, Some(25), 1)];
        let second = vec![record(21, None, 2)];

        let mut writer = RecordWriter::create(&path).unwrap();
        writer.write_chunk(&first).unwrap();
        writer.write_chunk(&second).unwrap();
        assert_eq!(writer.rows_written(), 3);
        drop(writer);

        let records = read_records(&path).unwrap();
        assert_eq!(records, [first, second].concat());

        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 3);
        assert!(text.lines().last().unwrap().contains("\"score_if_hit\":null"));

        // Creating a writer again starts from an empty file.
        RecordWriter::create(&path).unwrap();
        assert!(read_records(&path).unwrap().is_empty());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn malformed_record_reports_its_line() {
        let path = temp_path("bad.jsonl");
        let good = serde_json::to_string(&record(12, Some(15), 1)).unwrap();
        fs::write(&path, format!("{}\n\n{{\"score\": 12}}\n", good)).unwrap();
        let error = read_records(&path).unwrap_err();
        fs::remove_file(&path).unwrap();
        assert!(format!("{}", error).contains(":3:"));
    }

    #[test]
    fn decision_table_round_trip() {
        let path = temp_path("dir/strategy.json");
        let mut table = DecisionTable::new();
        table.insert(
            State::new(16, 10, true),
            DecisionTableEntry::from_values(ActionValues {
                stand: -0.5400000000000001,
                hit: -0.5089,
                double: -1.0178,
            }),
        );
        save_decision_table(&table, &path).unwrap();
        let reloaded = load_decision_table(&path).unwrap();
        fs::remove_dir_all(path.parent().unwrap()).unwrap();
        assert_eq!(reloaded, table);
    }

    #[test]
    fn missing_decision_table_is_an_error() {
        assert!(load_decision_table(temp_path("nowhere.json")).is_err());
    }
}
