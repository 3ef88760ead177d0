//! Reading pre-tagged sentences.
//!
//! The annotator upstream of the store emits one sentence per line, each a
//! space-separated sequence of `TEXT|SENSE` tokens with multi-word phrases
//! already joined into a single token:
//!
//! ```text
//! Rats|NOUN ,|PUNCT mould|NOUN and|CCONJ broken_furniture|NOUN
//! ```

/// Separator used inside a token to join the words of a phrase.
pub const PHRASE_SEPARATOR: char = '_';

/// One `TEXT|SENSE` token of a tagged sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedToken<'a> {
    /// The word or joined phrase.
    pub text: &'a str,
    /// The sense label.
    pub sense: &'a str,
    /// The full token as it appears in the input.
    pub key: &'a str,
}

impl<'a> TaggedToken<'a> {
    /// The individual words of a joined phrase.
    pub fn words(&self) -> impl Iterator<Item = &'a str> {
        self.text
            .split(PHRASE_SEPARATOR)
            .filter(|word| !word.is_empty())
    }

    /// Whether the token covers more than one word.
    #[must_use]
    pub fn is_phrase(&self) -> bool {
        self.words().nth(1).is_some()
    }
}

/// Join the words of a phrase into a single token text.
#[must_use]
pub fn join_phrase<S: AsRef<str>>(words: &[S]) -> String {
    let mut text = String::new();
    for (i, word) in words.iter().enumerate() {
        if i > 0 {
            text.push(PHRASE_SEPARATOR);
        }
        // Inner whitespace would break the one-token-per-phrase contract.
        for c in word.as_ref().chars() {
            text.push(if c.is_whitespace() { PHRASE_SEPARATOR } else { c });
        }
    }
    text
}

/// Parse one tagged sentence.
///
/// Fails on the first token that carries no sense, since that input does
/// not follow the `TEXT|SENSE` contract.
pub fn parse_sentence<'a>(
    line: &'a str,
    codec: &crate::DelimitedKeys,
) -> sense2vec_core::Result<Vec<TaggedToken<'a>>> {
    line.split_whitespace()
        .map(|key| match codec.split(key) {
            (text, Some(sense)) if !text.is_empty() => Ok(TaggedToken { text, sense, key }),
            _ => Err(sense2vec_core::Error::InvalidArgument(format!(
                "token {key:?} is not of the form TEXT{}SENSE",
                codec.delimiter()
            ))),
        })
        .collect()
}
