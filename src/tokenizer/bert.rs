//! BERT WordPiece tokenizer for sentence pairs.
//!
//! Wraps the `tokenizers` crate for normalization and WordPiece splitting,
//! then packs the pair the way BERT classifiers expect:
//! `[CLS] a [SEP] b [SEP]`, zero-padded to `max_seq_len`.

use super::{EncodedPair, PairTokenizer};
use crate::models::{PipelineError, Result};
use std::path::Path;
use tokenizers::decoders::wordpiece::WordPiece as WordPieceDecoder;
use tokenizers::models::wordpiece::WordPiece;
use tokenizers::normalizers::bert::BertNormalizer;
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::processors::bert::BertProcessing;
use tokenizers::{TokenizerBuilder, TokenizerImpl};

type WordPieceTokenizer =
    TokenizerImpl<WordPiece, BertNormalizer, BertPreTokenizer, BertProcessing, WordPieceDecoder>;

const CLS_TOKEN: &str = "[CLS]";
const SEP_TOKEN: &str = "[SEP]";
const UNK_TOKEN: &str = "[UNK]";

/// Sentence-pair tokenizer built from a BERT `vocab.txt`.
pub struct BertTokenizer {
    inner: WordPieceTokenizer,
    cls_id: u32,
    sep_id: u32,
}

impl BertTokenizer {
    /// Load a WordPiece vocabulary.
    ///
    /// Fails if the file cannot be read or lacks `[CLS]`, `[SEP]` or `[UNK]`.
    pub fn from_vocab(vocab_file: &Path, do_lower_case: bool) -> Result<Self> {
        let vocab = vocab_file.to_str().ok_or_else(|| {
            PipelineError::Tokenizer(format!(
                "vocabulary path is not valid UTF-8: {}",
                vocab_file.display()
            ))
        })?;

        let model = WordPiece::from_file(vocab)
            .unk_token(UNK_TOKEN.to_string())
            .build()
            .map_err(|e| {
                PipelineError::Tokenizer(format!(
                    "failed to load vocabulary {}: {e}",
                    vocab_file.display()
                ))
            })?;

        let normalizer = if do_lower_case {
            BertNormalizer::new(true, true, None, true)
        } else {
            BertNormalizer::new(true, true, Some(false), false)
        };

        let inner = TokenizerBuilder::<
            WordPiece,
            BertNormalizer,
            BertPreTokenizer,
            BertProcessing,
            WordPieceDecoder,
        >::new()
        .with_model(model)
        .with_normalizer(Some(normalizer))
        .with_pre_tokenizer(Some(BertPreTokenizer))
        .build()
        .map_err(|e| PipelineError::Tokenizer(format!("failed to build tokenizer: {e}")))?;

        let special = |token: &str| {
            inner.token_to_id(token).ok_or_else(|| {
                PipelineError::Tokenizer(format!(
                    "vocabulary {} has no {token} token",
                    vocab_file.display()
                ))
            })
        };
        let cls_id = special(CLS_TOKEN)?;
        let sep_id = special(SEP_TOKEN)?;
        special(UNK_TOKEN)?;

        Ok(Self {
            inner,
            cls_id,
            sep_id,
        })
    }

    /// Number of entries in the vocabulary.
    pub fn vocab_size(&self) -> usize {
        self.inner.get_vocab_size(true)
    }

    /// WordPiece ids of `text` without special tokens.
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| PipelineError::Tokenizer(format!("encode failed: {e}")))?;
        Ok(encoding.get_ids().to_vec())
    }
}

impl PairTokenizer for BertTokenizer {
    fn convert_pairs(&self, text_a: &str, text_b: &str, max_seq_len: usize) -> Result<EncodedPair> {
        let tokens_a = self.encode(text_a)?;
        let tokens_b = self.encode(text_b)?;
        Ok(pack_pair(tokens_a, tokens_b, self.cls_id, self.sep_id, max_seq_len))
    }
}

/// Truncate the pair longest-first and lay it out as
/// `[CLS] a [SEP] b [SEP]` padded with zeros to `max_seq_len`.
pub fn pack_pair(
    mut tokens_a: Vec<u32>,
    mut tokens_b: Vec<u32>,
    cls_id: u32,
    sep_id: u32,
    max_seq_len: usize,
) -> EncodedPair {
    // Room for [CLS] and two [SEP].
    let budget = max_seq_len.saturating_sub(3);
    while tokens_a.len() + tokens_b.len() > budget {
        if tokens_a.len() > tokens_b.len() {
            tokens_a.pop();
        } else {
            tokens_b.pop();
        }
    }

    let len = tokens_a.len() + tokens_b.len() + 3;
    let mut input_ids = Vec::with_capacity(len.max(max_seq_len));
    let mut segment_ids = Vec::with_capacity(len.max(max_seq_len));

    input_ids.push(cls_id);
    input_ids.extend_from_slice(&tokens_a);
    input_ids.push(sep_id);
    segment_ids.resize(input_ids.len(), 0);

    input_ids.extend_from_slice(&tokens_b);
    input_ids.push(sep_id);
    segment_ids.resize(input_ids.len(), 1);

    let mut input_mask = vec![1; input_ids.len()];

    // Degenerate lengths below 3 keep only the leading special tokens.
    input_ids.truncate(max_seq_len);
    input_mask.truncate(max_seq_len);
    segment_ids.truncate(max_seq_len);

    input_ids.resize(max_seq_len, 0);
    input_mask.resize(max_seq_len, 0);
    segment_ids.resize(max_seq_len, 0);

    EncodedPair {
        input_ids,
        input_mask,
        segment_ids,
    }
}
