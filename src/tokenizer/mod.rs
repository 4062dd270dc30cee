//! Tokenizer module - sentence-pair encoding collaborator.
//!
//! The pipeline only depends on [`PairTokenizer`]; [`BertTokenizer`] is the
//! production implementation backed by a WordPiece vocabulary.

mod bert;

pub use bert::*;

use crate::models::Result;

/// Fixed-length encoding of a sentence pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedPair {
    pub input_ids: Vec<u32>,
    pub input_mask: Vec<u32>,
    pub segment_ids: Vec<u32>,
}

/// Turns two texts into model inputs of exactly `max_seq_len` elements.
pub trait PairTokenizer {
    fn convert_pairs(&self, text_a: &str, text_b: &str, max_seq_len: usize) -> Result<EncodedPair>;
}

impl<T: PairTokenizer + ?Sized> PairTokenizer for Box<T> {
    fn convert_pairs(&self, text_a: &str, text_b: &str, max_seq_len: usize) -> Result<EncodedPair> {
        (**self).convert_pairs(text_a, text_b, max_seq_len)
    }
}
