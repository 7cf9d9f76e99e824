//! Tokenizer abstraction for chunk budgeting
//!
//! Chunking needs two things from a tokenizer: the token count of a text and
//! the byte range each token covers, so oversized renders can be truncated on
//! a token boundary. The production implementation wraps a Hugging Face
//! `tokenizer.json`; the whitespace tokenizer exists for tests and smoke runs
//! where no model file is available.

use crate::error::{TextifyError, TextifyResult};

/// Byte-offset spans of a tokenized text
#[derive(Debug, Clone)]
pub struct TokenSpans {
    /// `(start_byte, end_byte)` per token, in token order
    pub offsets: Vec<(usize, usize)>,
}

impl TokenSpans {
    /// Number of tokens in the encoded text
    pub fn token_count(&self) -> usize {
        self.offsets.len()
    }

    /// Byte range covering the first `max_tokens` tokens
    ///
    /// Returns `None` when the text has fewer tokens than requested.
    pub fn prefix_range(&self, max_tokens: usize) -> Option<(usize, usize)> {
        let first = self.offsets.first()?;
        let last = self.offsets.get(max_tokens.checked_sub(1)?)?;
        Some((first.0, last.1))
    }

    /// Byte range covering every token (trims untokenized affixes)
    pub fn full_range(&self) -> Option<(usize, usize)> {
        Some((self.offsets.first()?.0, self.offsets.last()?.1))
    }
}

/// A tokenizer exposing token counts and byte offsets
pub trait Tokenizer: Send + Sync {
    /// Encode `text` without special tokens
    ///
    /// # Errors
    ///
    /// Returns a tokenizer error when encoding fails.
    fn encode(&self, text: &str) -> TextifyResult<TokenSpans>;

    /// Human-readable tokenizer name for logs
    fn name(&self) -> &str;
}

/// Hugging Face tokenizer loaded from a `tokenizer.json` file
pub struct HfTokenizer {
    name: String,
    inner: tokenizers::Tokenizer,
}

impl HfTokenizer {
    /// Load a tokenizer from a `tokenizer.json` file
    ///
    /// # Errors
    ///
    /// Returns a tokenizer error when the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<std::path::Path>) -> TextifyResult<Self> {
        let path = path.as_ref();
        let inner = tokenizers::Tokenizer::from_file(path)
            .map_err(|e| TextifyError::tokenizer(format!("{}: {e}", path.display())))?;
        Ok(Self {
            name: path.display().to_string(),
            inner,
        })
    }
}

impl Tokenizer for HfTokenizer {
    fn encode(&self, text: &str) -> TextifyResult<TokenSpans> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| TextifyError::tokenizer(e.to_string()))?;
        Ok(TokenSpans {
            offsets: encoding.get_offsets().to_vec(),
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Whitespace tokenizer: one token per whitespace-separated word
///
/// Deterministic and dependency-free; used by the chunking tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn encode(&self, text: &str) -> TextifyResult<TokenSpans> {
        let mut offsets = Vec::new();
        let mut start: Option<usize> = None;
        for (index, character) in text.char_indices() {
            if character.is_whitespace() {
                if let Some(word_start) = start.take() {
                    offsets.push((word_start, index));
                }
            } else if start.is_none() {
                start = Some(index);
            }
        }
        if let Some(word_start) = start {
            offsets.push((word_start, text.len()));
        }
        Ok(TokenSpans { offsets })
    }

    fn name(&self) -> &str {
        "whitespace"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitespace_tokenizer_produces_byte_offsets() {
        let spans = WhitespaceTokenizer.encode("one two  three").expect("encode");
        assert_eq!(spans.token_count(), 3);
        assert_eq!(spans.offsets, vec![(0, 3), (4, 7), (9, 14)]);
    }

    #[test]
    fn prefix_range_covers_first_tokens() {
        let spans = WhitespaceTokenizer.encode("a bb ccc dddd").expect("encode");
        let (start, end) = spans.prefix_range(2).expect("range");
        assert_eq!(&"a bb ccc dddd"[start..end], "a bb");
        assert!(spans.prefix_range(9).is_none());
    }

    #[test]
    fn empty_text_has_no_tokens() {
        let spans = WhitespaceTokenizer.encode("   ").expect("encode");
        assert_eq!(spans.token_count(), 0);
        assert!(spans.full_range().is_none());
    }

    #[test]
    fn unicode_words_keep_byte_ranges() {
        let text = "Müller straße";
        let spans = WhitespaceTokenizer.encode(text).expect("encode");
        assert_eq!(spans.token_count(), 2);
        let (start, end) = spans.full_range().expect("range");
        assert_eq!(&text[start..end], text);
    }
}
