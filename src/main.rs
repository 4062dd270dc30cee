//! taskmux CLI - Inspect and export multi-task training streams.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use taskmux::{Config, InputPipeline, Split};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "taskmux")]
#[command(version)]
#[command(about = "Multi-task sampling input pipeline for sentence-pair training data")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "config.toml")]
    config: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print estimated example counts for every split
    Count {
        /// Only count this task
        #[arg(short, long)]
        task: Option<usize>,
    },

    /// Write one split as JSONL, one example per line
    Dump {
        /// Split to iterate
        #[arg(short, long, value_enum, default_value = "train")]
        split: SplitArg,

        /// Path to output JSONL file
        #[arg(short, long)]
        output: PathBuf,

        /// Stop after this many examples
        #[arg(short, long)]
        limit: Option<u64>,

        /// Only read this task
        #[arg(short, long)]
        task: Option<usize>,
    },

    /// Validate configuration file and vocabulary
    Validate,

    /// Show example configuration
    Example,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SplitArg {
    Train,
    Eval,
    Test,
}

impl From<SplitArg> for Split {
    fn from(arg: SplitArg) -> Self {
        match arg {
            SplitArg::Train => Split::Train,
            SplitArg::Eval => Split::Eval,
            SplitArg::Test => Split::Test,
        }
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

fn print_example_config() {
    let example = r#"# taskmux configuration file

[tokenizer]
# BERT WordPiece vocabulary, one token per line
vocab_file = "${MODEL_DIR}/vocab.txt"
do_lower_case = true

[pipeline]
max_seq_len = 128
# seed = 42               # omit for a random seed per run
malformed_lines = "fail"  # or "skip"
num_categories = 2

# Each task directory holds train.tsv, dev.tsv and test.tsv.
# train_rate >= 1 oversamples, (0, 1) subsamples, 0 disables the task.
[[tasks]]
name = "lcqmc"
dir = "data/lcqmc"
train_rate = 1.0

[[tasks]]
name = "bq_corpus"
dir = "data/bq_corpus"
train_rate = 0.5
"#;
    println!("{example}");
}

fn load_config(path: &Path) -> Result<Config> {
    let config =
        Config::from_file(path).with_context(|| format!("Failed to load config from {path:?}"))?;
    config.validate().context("Invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match cli.command {
        Commands::Example => {
            print_example_config();
        }

        Commands::Validate => {
            let config = load_config(&cli.config)?;
            let pipeline =
                InputPipeline::from_config(&config).context("Failed to build pipeline")?;

            info!("Configuration is valid");
            info!("  Vocabulary: {} tokens", pipeline.tokenizer().vocab_size());
            info!("  Max sequence length: {}", pipeline.max_seq_len());
            info!("  Categories: {}", pipeline.num_categories());
            for (index, task) in config.tasks.iter().enumerate() {
                info!(
                    "  Task {index}: {} (train rate {})",
                    task.display_name(),
                    task.train_rate
                );
            }
        }

        Commands::Count { task } => {
            let config = load_config(&cli.config)?;
            let mut pipeline =
                InputPipeline::from_config(&config).context("Failed to build pipeline")?;
            pipeline.set_task_id(task)?;

            let train = pipeline.num_train_examples().context("Counting train split")?;
            let eval = pipeline.num_eval_examples().context("Counting eval split")?;
            let test = pipeline.num_test_examples().context("Counting test split")?;

            println!("\n=== Estimated Examples ===");
            println!("Train:  {train}");
            println!("Eval:   {eval}");
            println!("Test:   {test}");
        }

        Commands::Dump {
            split,
            output,
            limit,
            task,
        } => {
            let split = Split::from(split);
            let config = load_config(&cli.config)?;
            let mut pipeline =
                InputPipeline::from_config(&config).context("Failed to build pipeline")?;
            pipeline.set_task_id(task)?;

            let estimate = pipeline.estimate_example_count(split)?;
            let total = limit.map_or(estimate, |l| l.min(estimate));

            let pb = ProgressBar::new(total);
            pb.set_style(
                ProgressStyle::default_bar()
                    .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")?
                    .progress_chars("##-"),
            );

            let file = File::create(&output)
                .with_context(|| format!("Failed to create output file {output:?}"))?;
            let mut writer = BufWriter::new(file);

            let mut iter = pipeline.iter(split)?;
            let mut written: u64 = 0;
            while limit.map_or(true, |l| written < l) {
                let Some(example) = iter.next() else {
                    break;
                };
                let example = example?;
                serde_json::to_writer(&mut writer, &example)
                    .context("Failed to serialize example")?;
                writeln!(writer).context("Failed to write output")?;
                written += 1;
                pb.inc(1);
            }
            writer.flush().context("Failed to flush output")?;
            pb.finish_with_message(format!("Done! {written} examples"));

            let stats = iter.stats();
            println!("\n=== {split} Split Written ===");
            for (index, task) in config.tasks.iter().enumerate() {
                let emitted = stats.emitted_per_task.get(index).copied().unwrap_or(0);
                println!("Task {index} {:<20} {emitted}", task.display_name());
            }
            println!("Total:       {}", stats.total_emitted());
            println!("Estimated:   {estimate}");
            println!("Filtered:    {}", stats.filtered);
            println!("Blank:       {}", stats.blank);
            println!("Malformed:   {}", stats.malformed);
            println!("Output:      {output:?}");
        }
    }

    Ok(())
}
