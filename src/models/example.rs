//! Example and split types for taskmux.
//!
//! K_i: These types represent the data handed to the training loop.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A data partition. Each task directory holds one file per split.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Split {
    Train,
    Eval,
    Test,
}

impl Split {
    /// File name of this split inside a task directory.
    pub fn file_name(self) -> &'static str {
        match self {
            Split::Train => "train.tsv",
            Split::Eval => "dev.tsv",
            Split::Test => "test.tsv",
        }
    }

    /// Only the training split honours configured sampling rates.
    pub fn uses_sample_rates(self) -> bool {
        matches!(self, Split::Train)
    }
}

impl fmt::Display for Split {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Split::Train => write!(f, "train"),
            Split::Eval => write!(f, "eval"),
            Split::Test => write!(f, "test"),
        }
    }
}

/// One tokenized sentence pair, ready for the model.
///
/// K_i: `input_ids`, `input_mask` and `segment_ids` all have exactly
/// `max_seq_len` elements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    /// WordPiece ids, padded with 0
    pub input_ids: Vec<u32>,

    /// 1 for real tokens, 0 for padding
    pub input_mask: Vec<u32>,

    /// 0 for the first segment, 1 for the second
    pub segment_ids: Vec<u32>,

    /// Index of the task corpus this example came from
    pub task_index: usize,

    /// Parsed label column
    pub label_id: i64,
}

/// Statistics for one split iteration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SplitStats {
    /// Examples emitted, indexed by task index
    pub emitted_per_task: Vec<usize>,

    /// Lines dropped by fractional-rate sampling
    pub filtered: usize,

    /// Blank lines skipped
    pub blank: usize,

    /// Malformed lines skipped (only under the skip policy)
    pub malformed: usize,

    /// Completed round-robin rounds
    pub rounds: usize,
}

impl SplitStats {
    /// Empty statistics for `num_tasks` tasks.
    pub fn new(num_tasks: usize) -> Self {
        Self {
            emitted_per_task: vec![0; num_tasks],
            ..Default::default()
        }
    }

    /// Total examples emitted across tasks.
    pub fn total_emitted(&self) -> usize {
        self.emitted_per_task.iter().sum()
    }

    pub(crate) fn record_emitted(&mut self, task_index: usize) {
        if task_index >= self.emitted_per_task.len() {
            self.emitted_per_task.resize(task_index + 1, 0);
        }
        self.emitted_per_task[task_index] += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_files() {
        assert_eq!(Split::Train.file_name(), "train.tsv");
        assert_eq!(Split::Eval.file_name(), "dev.tsv");
        assert_eq!(Split::Test.file_name(), "test.tsv");
        assert!(Split::Train.uses_sample_rates());
        assert!(!Split::Eval.uses_sample_rates());
        assert_eq!(Split::Eval.to_string(), "eval");
    }

    #[test]
    fn test_example_serializes_to_json() {
        let example = TrainingExample {
            input_ids: vec![101, 7, 102, 0],
            input_mask: vec![1, 1, 1, 0],
            segment_ids: vec![0, 0, 0, 0],
            task_index: 1,
            label_id: 0,
        };
        let json = serde_json::to_string(&example).unwrap();
        assert!(json.contains(r#""task_index":1"#));
        let back: TrainingExample = serde_json::from_str(&json).unwrap();
        assert_eq!(back, example);
    }

    #[test]
    fn test_stats_totals() {
        let mut stats = SplitStats::new(2);
        stats.record_emitted(0);
        stats.record_emitted(1);
        stats.record_emitted(1);
        assert_eq!(stats.emitted_per_task, vec![1, 2]);
        assert_eq!(stats.total_emitted(), 3);
    }
}
