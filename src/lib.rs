//! taskmux - Multi-task sampling input pipeline for sentence-pair training data.
//!
//! ## Architecture
//!
//! Each task corpus is a directory with `train.tsv`, `dev.tsv` and
//! `test.tsv`. For every split:
//! - **SamplingReader**: Reads one task's file, repeating it for rates >= 1
//!   and thinning it for fractional rates
//! - **ActiveTasks**: Tasks still in rotation, in task-index order
//! - **InputPipeline**: Round-robins over active tasks, parses and
//!   tokenizes each line, retires exhausted tasks between rounds
//!
//! ## Epistemic Design
//!
//! - K_i (Knowledge): Round order, header skipping, vector lengths
//! - B_i (Beliefs): File IO and line parsing (Result)
//! - I^R (Resolvable): Rates, seed and malformed-line policy from config

pub mod models;
pub mod pipeline;
pub mod reader;
pub mod tokenizer;

// Re-exports for convenience
pub use models::{
    Config, MalformedLinePolicy, PipelineError, Result, Split, SplitStats, TrainingExample,
};
pub use pipeline::{ExampleIter, InputPipeline};
pub use reader::{ReadOutcome, SamplingReader};
pub use tokenizer::{BertTokenizer, EncodedPair, PairTokenizer};
