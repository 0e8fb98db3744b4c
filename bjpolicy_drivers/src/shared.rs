pub mod storage;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_FILE_NAME: &str = ".bjpolicy.yml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub rule: ConfigRule,
    /// Size of the worker pool. 0 uses every available core.
    pub number_of_threads: usize,
    /// Base seed of every random stream. A random one is drawn when unset.
    pub seed: Option<u64>,
    pub simulate: ConfigSimulate,
    pub analyze: ConfigAnalyze,
    pub test: ConfigTest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigRule {
    pub number_of_decks: u8,
    pub dealer_hit_on_soft17: bool,
    pub hands_per_deal: u8,
}

impl Default for ConfigRule {
    fn default() -> Self {
        let rule = bjpolicy::Rule::default();
        ConfigRule {
            number_of_decks: rule.number_of_decks,
            dealer_hit_on_soft17: rule.dealer_hit_on_soft17,
            hands_per_deal: rule.hands_per_deal,
        }
    }
}

impl TryInto<bjpolicy::Rule> for ConfigRule {
    type Error = bjpolicy::Error;

    fn try_into(self) -> Result<bjpolicy::Rule, Self::Error> {
        let bjpolicy_rule = bjpolicy::Rule {
            number_of_decks: self.number_of_decks,
            dealer_hit_on_soft17: self.dealer_hit_on_soft17,
            hands_per_deal: self.hands_per_deal,
        };
        bjpolicy_rule.validate()?;

        Ok(bjpolicy_rule)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigSimulate {
    /// Records to generate, rounded up to whole deals.
    pub max_rows: usize,
    /// Records buffered before each write.
    pub chunk_write: usize,
    pub output: PathBuf,
}

impl Default for ConfigSimulate {
    fn default() -> Self {
        ConfigSimulate {
            max_rows: 1_000_000,
            chunk_write: 10_000,
            output: PathBuf::from("data/blackjack_games.jsonl"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigAnalyze {
    pub input: PathBuf,
    pub table: PathBuf,
    /// Where charts and the diagnostics report go.
    pub output_dir: PathBuf,
}

impl Default for ConfigAnalyze {
    fn default() -> Self {
        ConfigAnalyze {
            input: PathBuf::from("data/blackjack_games.jsonl"),
            table: PathBuf::from("data/strategy.json"),
            output_dir: PathBuf::from("outputs"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfigTest {
    pub number_of_sessions: usize,
    pub session_length: usize,
    /// Overrides `rule.hands_per_deal` while testing.
    pub hands_per_deal: u8,
    pub table: PathBuf,
    pub output: PathBuf,
    /// Replays "stand at or above this score" instead of the decision table.
    pub threshold: Option<u8>,
}

impl Default for ConfigTest {
    fn default() -> Self {
        ConfigTest {
            number_of_sessions: 1000,
            session_length: 1000,
            hands_per_deal: 2,
            table: PathBuf::from("data/strategy.json"),
            output: PathBuf::from("outputs/earnings.json"),
            threshold: None,
        }
    }
}

/// Reads the content of a given config file and parses it to a Config.
pub fn parse_config_from_file<P: AsRef<Path>>(filename: P) -> anyhow::Result<Config> {
    let filename = filename.as_ref();
    let file_content = fs::read_to_string(filename)
        .with_context(|| format!("cannot read config file {}", filename.display()))?;
    serde_yaml::from_str(&file_content)
        .with_context(|| format!("cannot parse config file {}", filename.display()))
}

/// Loads `explicit` when given, which must exist. Otherwise loads
/// `~/.bjpolicy.yml` if there is one, and falls back to the defaults.
pub fn load_config(explicit: Option<&Path>) -> anyhow::Result<Config> {
    if let Some(path) = explicit {
        return parse_config_from_file(path);
    }
    let home_dir = home::home_dir().context("cannot find home directory")?;
    let config_file_path = home_dir.join(DEFAULT_CONFIG_FILE_NAME);
    if !config_file_path.exists() {
        log::info!(
            "no config at {}, using defaults",
            config_file_path.display()
        );
        return Ok(Config::default());
    }
    if config_file_path.is_dir() {
        anyhow::bail!(
            "{} should be a file rather than a directory",
            config_file_path.display()
        );
    }
    parse_config_from_file(&config_file_path)
}

/// A bar counting up to `len` units of work.
pub fn progress_bar(len: u64, message: &'static str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{msg:>10} [{elapsed_precise}] {wide_bar} {pos}/{len} (eta {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar());
    let progress = ProgressBar::new(len);
    progress.set_style(style);
    progress.set_message(message);
    progress
}
