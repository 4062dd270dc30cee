//! Multi-task input pipeline.
//!
//! Pipeline flow:
//! Split files → SamplingReaders → round-robin over active tasks →
//! parse line → tokenize pair → TrainingExample
//!
//! Each round asks every active task for one line, in task-index order.
//! After the round, the first task whose reader is exhausted leaves the
//! rotation. The stream ends when no task is left.

use super::tasks::{ActiveTasks, TaskSet};
use crate::models::{
    validate_rate, Config, MalformedLinePolicy, PipelineError, Result, Split, SplitStats,
    TrainingExample,
};
use crate::reader::{ReadOutcome, SamplingReader};
use crate::tokenizer::{BertTokenizer, PairTokenizer};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;
use tracing::{debug, info, warn};

const FIELDS_PER_LINE: usize = 5;

/// Feeds tokenized sentence pairs from several task corpora.
pub struct InputPipeline<T> {
    tokenizer: T,
    task_dirs: Vec<PathBuf>,
    train_rates: Vec<f64>,
    max_seq_len: usize,
    task_id: Option<usize>,
    malformed_lines: MalformedLinePolicy,
    num_categories: usize,
    seed: u64,
}

impl InputPipeline<BertTokenizer> {
    /// Build a pipeline with a WordPiece tokenizer from configuration.
    ///
    /// Vocabulary problems surface here as fatal tokenizer errors.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let tokenizer =
            BertTokenizer::from_vocab(&config.tokenizer.vocab_file, config.tokenizer.do_lower_case)?;

        let mut pipeline = Self::new(
            tokenizer,
            config.task_dirs(),
            config.pipeline.max_seq_len,
            config.train_rates(),
        )?
        .with_malformed_lines(config.pipeline.malformed_lines)
        .with_num_categories(config.pipeline.num_categories);

        if let Some(seed) = config.pipeline.seed {
            pipeline = pipeline.with_seed(seed);
        }
        Ok(pipeline)
    }
}

impl<T: PairTokenizer> InputPipeline<T> {
    /// Create a pipeline over `task_dirs`, one training rate per directory.
    pub fn new(
        tokenizer: T,
        task_dirs: Vec<PathBuf>,
        max_seq_len: usize,
        train_rates: Vec<f64>,
    ) -> Result<Self> {
        if max_seq_len == 0 {
            return Err(PipelineError::InvalidInput(
                "max_seq_len must be positive".to_string(),
            ));
        }
        if task_dirs.len() != train_rates.len() {
            return Err(PipelineError::InvalidInput(format!(
                "{} task directories but {} sample rates",
                task_dirs.len(),
                train_rates.len()
            )));
        }
        for (index, &rate) in train_rates.iter().enumerate() {
            validate_rate(rate)
                .map_err(|reason| PipelineError::InvalidInput(format!("task {index}: {reason}")))?;
        }

        Ok(Self {
            tokenizer,
            task_dirs,
            train_rates,
            max_seq_len,
            task_id: None,
            malformed_lines: MalformedLinePolicy::default(),
            num_categories: 2,
            seed: rand::random(),
        })
    }

    /// Seed the sampling random source for reproducible runs.
    ///
    /// Every reader is seeded from `(seed, split, task_index)`, so a pass
    /// samples the same lines regardless of what ran before it.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Choose how structurally malformed lines are handled.
    pub fn with_malformed_lines(mut self, policy: MalformedLinePolicy) -> Self {
        self.malformed_lines = policy;
        self
    }

    /// Set the number of label classes reported by [`Self::num_categories`].
    pub fn with_num_categories(mut self, num_categories: usize) -> Self {
        self.num_categories = num_categories;
        self
    }

    /// Restrict iteration and counting to one task; `None` uses all tasks.
    pub fn set_task_id(&mut self, task_id: Option<usize>) -> Result<()> {
        if let Some(index) = task_id {
            if index >= self.task_dirs.len() {
                return Err(PipelineError::InvalidInput(format!(
                    "task id {index} out of range for {} tasks",
                    self.task_dirs.len()
                )));
            }
        }
        self.task_id = task_id;
        Ok(())
    }

    pub fn task_id(&self) -> Option<usize> {
        self.task_id
    }

    pub fn num_tasks(&self) -> usize {
        self.task_dirs.len()
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    pub fn max_seq_len(&self) -> usize {
        self.max_seq_len
    }

    pub fn tokenizer(&self) -> &T {
        &self.tokenizer
    }

    /// Open fresh readers for `split`.
    ///
    /// Configured rates apply to the training split only; every other split
    /// is read exactly once.
    fn open_split(&self, split: Split) -> Result<ActiveTasks> {
        let mut tasks = Vec::with_capacity(self.task_dirs.len());

        for (index, dir) in self.task_dirs.iter().enumerate() {
            let rate = if split.uses_sample_rates() {
                self.train_rates[index]
            } else {
                1.0
            };
            let path = dir.join(split.file_name());
            let rng = self.reader_rng(split, index);
            let reader = SamplingReader::open(&path, rate, rng)?;
            debug!(task_index = index, path = %path.display(), rate, "Opened split file");
            tasks.push(TaskSet::new(index, reader));
        }

        let mut active = ActiveTasks::new(tasks);
        if let Some(task_id) = self.task_id {
            active.restrict_to(task_id);
        }
        Ok(active)
    }

    fn reader_rng(&self, split: Split, task_index: usize) -> StdRng {
        let mut seed = [0u8; 32];
        seed[..8].copy_from_slice(&self.seed.to_le_bytes());
        seed[8..16].copy_from_slice(&(split as u64).to_le_bytes());
        seed[16..24].copy_from_slice(&(task_index as u64).to_le_bytes());
        StdRng::from_seed(seed)
    }

    /// Expected number of examples in `split` under the current task filter.
    pub fn estimate_example_count(&mut self, split: Split) -> Result<u64> {
        let mut tasks = self.open_split(split)?;
        let mut total: u64 = 0;
        for task in tasks.iter_mut() {
            total = total.saturating_add(task.reader.estimated_count()?);
        }
        Ok(total)
    }

    pub fn num_train_examples(&mut self) -> Result<u64> {
        self.estimate_example_count(Split::Train)
    }

    pub fn num_eval_examples(&mut self) -> Result<u64> {
        self.estimate_example_count(Split::Eval)
    }

    pub fn num_test_examples(&mut self) -> Result<u64> {
        self.estimate_example_count(Split::Test)
    }

    /// Start one pass over `split`.
    ///
    /// Opening errors are returned here; line-level errors are yielded by
    /// the iterator, which then ends.
    pub fn iter(&mut self, split: Split) -> Result<ExampleIter<'_, T>> {
        let tasks = self.open_split(split)?;
        info!(
            split = %split,
            tasks = tasks.len(),
            max_seq_len = self.max_seq_len,
            "Starting split iteration"
        );

        Ok(ExampleIter {
            tokenizer: &self.tokenizer,
            split,
            max_seq_len: self.max_seq_len,
            malformed_lines: self.malformed_lines,
            stats: SplitStats::new(self.task_dirs.len()),
            tasks,
            position: 0,
            finished: false,
        })
    }

    pub fn iter_train(&mut self) -> Result<ExampleIter<'_, T>> {
        self.iter(Split::Train)
    }

    pub fn iter_eval(&mut self) -> Result<ExampleIter<'_, T>> {
        self.iter(Split::Eval)
    }

    pub fn iter_test(&mut self) -> Result<ExampleIter<'_, T>> {
        self.iter(Split::Test)
    }
}

/// Lazy, finite stream of examples for one split.
///
/// Dropping the iterator closes every file it still holds.
pub struct ExampleIter<'a, T> {
    tokenizer: &'a T,
    split: Split,
    max_seq_len: usize,
    malformed_lines: MalformedLinePolicy,
    stats: SplitStats,
    tasks: ActiveTasks,
    /// Position of the next task to visit in the current round
    position: usize,
    finished: bool,
}

impl<T: PairTokenizer> ExampleIter<'_, T> {
    pub fn split(&self) -> Split {
        self.split
    }

    /// Tasks still in the rotation.
    pub fn active_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Counters for the examples produced so far.
    pub fn stats(&self) -> &SplitStats {
        &self.stats
    }

    fn end_round(&mut self) {
        self.position = 0;
        self.stats.rounds += 1;
        if let Some(retired) = self.tasks.retire_first_inactive() {
            info!(
                split = %self.split,
                task_index = retired.task_index,
                emitted = self.stats.emitted_per_task[retired.task_index],
                round = self.stats.rounds,
                "Task exhausted, retired from rotation"
            );
        }
    }

    fn advance(&mut self) -> Result<Option<TrainingExample>> {
        loop {
            if self.tasks.is_empty() {
                return Ok(None);
            }
            if self.position >= self.tasks.len() {
                self.end_round();
                continue;
            }

            let position = self.position;
            self.position += 1;

            let Some(task) = self.tasks.get_mut(position) else {
                continue;
            };
            let task_index = task.task_index;
            let line = match task.reader.next_line()? {
                ReadOutcome::Line(line) => line,
                ReadOutcome::Skip => {
                    self.stats.filtered += 1;
                    continue;
                }
                ReadOutcome::Exhausted => continue,
            };

            let line = line.trim();
            if line.is_empty() {
                self.stats.blank += 1;
                continue;
            }

            let (label_id, text_a, text_b) = match parse_line(line) {
                Ok(fields) => fields,
                Err(reason) => {
                    return Err(PipelineError::Parse {
                        task_index,
                        path: task.reader.path().to_path_buf(),
                        line: task.reader.line_number(),
                        reason,
                    });
                }
            };

            let encoded = self
                .tokenizer
                .convert_pairs(text_a, text_b, self.max_seq_len)?;
            self.stats.record_emitted(task_index);

            return Ok(Some(TrainingExample {
                input_ids: encoded.input_ids,
                input_mask: encoded.input_mask,
                segment_ids: encoded.segment_ids,
                task_index,
                label_id,
            }));
        }
    }
}

impl<T: PairTokenizer> Iterator for ExampleIter<'_, T> {
    type Item = Result<TrainingExample>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        loop {
            match self.advance() {
                Ok(Some(example)) => return Some(Ok(example)),
                Ok(None) => {
                    self.finished = true;
                    return None;
                }
                Err(e)
                    if e.is_line_error()
                        && self.malformed_lines == MalformedLinePolicy::Skip =>
                {
                    warn!(error = %e, "Skipping malformed line");
                    self.stats.malformed += 1;
                }
                Err(e) => {
                    // Errors end the pass; release the files right away.
                    self.finished = true;
                    self.tasks = ActiveTasks::default();
                    return Some(Err(e));
                }
            }
        }
    }
}

impl<T: PairTokenizer> std::iter::FusedIterator for ExampleIter<'_, T> {}

/// Split `label \t _ \t _ \t text_a \t text_b` into its useful parts.
fn parse_line(line: &str) -> std::result::Result<(i64, &str, &str), String> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != FIELDS_PER_LINE {
        return Err(format!(
            "expected {FIELDS_PER_LINE} tab-separated fields, found {}",
            fields.len()
        ));
    }
    let label = fields[0]
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("label {:?} is not an integer", fields[0]))?;
    Ok((label, fields[3], fields[4]))
}
