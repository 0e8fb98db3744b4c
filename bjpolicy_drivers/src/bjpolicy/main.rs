mod analysis;
mod evaluation;
mod simulation;

use std::path::PathBuf;

use anyhow::Context;
use bjpolicy_drivers::{load_config, Config};
use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(author, about, long_about = None)]
struct CommandLineArgs {
    /// The path of the config file [default: ~/.bjpolicy.yml]
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Worker threads, 0 for one per core
    #[arg(long)]
    threads: Option<usize>,

    /// Base seed of every random stream
    #[arg(long)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Simulate deals and record every decision point
    Simulate(SimulateArgs),
    /// Solve a decision table from simulated records
    Analyze(AnalyzeArgs),
    /// Replay a strategy over independent sessions
    Test(TestArgs),
}

#[derive(Debug, Args)]
struct RuleArgs {
    #[arg(long)]
    decks: Option<u8>,
    /// Whether the dealer hits a soft 17
    #[arg(long)]
    soft17hit: Option<bool>,
    /// Player hands dealt per round, before splits
    #[arg(long)]
    hands: Option<u8>,
}

#[derive(Debug, Args)]
struct SimulateArgs {
    #[command(flatten)]
    rule: RuleArgs,
    #[arg(long)]
    max_rows: Option<usize>,
    #[arg(long)]
    chunk_write: Option<usize>,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct AnalyzeArgs {
    #[arg(short, long)]
    input: Option<PathBuf>,
    /// Where the decision table is written
    #[arg(long)]
    table: Option<PathBuf>,
    #[arg(long)]
    output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct TestArgs {
    #[command(flatten)]
    rule: RuleArgs,
    #[arg(long)]
    sessions: Option<usize>,
    /// Hands per session
    #[arg(long)]
    length: Option<usize>,
    /// Decision table to replay
    #[arg(long)]
    table: Option<PathBuf>,
    /// Replay "stand at or above this score" instead of a decision table
    #[arg(long)]
    threshold: Option<u8>,
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RuleArgs {
    fn apply(self, config: &mut Config) {
        if let Some(decks) = self.decks {
            config.rule.number_of_decks = decks;
        }
        if let Some(soft17hit) = self.soft17hit {
            config.rule.dealer_hit_on_soft17 = soft17hit;
        }
        if let Some(hands) = self.hands {
            config.rule.hands_per_deal = hands;
        }
    }
}

impl SimulateArgs {
    fn apply(self, config: &mut Config) {
        self.rule.apply(config);
        let simulate = &mut config.simulate;
        if let Some(max_rows) = self.max_rows {
            simulate.max_rows = max_rows;
        }
        if let Some(chunk_write) = self.chunk_write {
            simulate.chunk_write = chunk_write;
        }
        if let Some(output) = self.output {
            simulate.output = output;
        }
    }
}

impl AnalyzeArgs {
    fn apply(self, config: &mut Config) {
        let analyze = &mut config.analyze;
        if let Some(input) = self.input {
            analyze.input = input;
        }
        if let Some(table) = self.table {
            analyze.table = table;
        }
        if let Some(output_dir) = self.output_dir {
            analyze.output_dir = output_dir;
        }
    }
}

impl TestArgs {
    fn apply(self, config: &mut Config) {
        if let Some(hands) = self.rule.hands {
            config.test.hands_per_deal = hands;
        }
        RuleArgs {
            hands: None,
            ..self.rule
        }
        .apply(config);
        let test = &mut config.test;
        if let Some(sessions) = self.sessions {
            test.number_of_sessions = sessions;
        }
        if let Some(length) = self.length {
            test.session_length = length;
        }
        if let Some(table) = self.table {
            test.table = table;
        }
        if self.threshold.is_some() {
            test.threshold = self.threshold;
        }
        if let Some(output) = self.output {
            test.output = output;
        }
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = CommandLineArgs::parse();
    let mut config = load_config(args.config.as_deref())?;
    if let Some(threads) = args.threads {
        config.number_of_threads = threads;
    }
    if args.seed.is_some() {
        config.seed = args.seed;
    }

    rayon::ThreadPoolBuilder::new()
        .num_threads(config.number_of_threads)
        .build_global()
        .context("cannot start the worker pool")?;
    let seed = config.seed.unwrap_or_else(rand::random);
    log::info!(
        "seed {} on {} threads",
        seed,
        rayon::current_num_threads()
    );

    match args.command {
        Command::Simulate(simulate_args) => {
            simulate_args.apply(&mut config);
            simulation::simulate(&config, seed)
        }
        Command::Analyze(analyze_args) => {
            analyze_args.apply(&mut config);
            analysis::analyze(&config)
        }
        Command::Test(test_args) => {
            test_args.apply(&mut config);
            evaluation::test(&config, seed)
        }
    }
}
