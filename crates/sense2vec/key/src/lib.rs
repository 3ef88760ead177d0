//! Composite key codec: `word` + `sense` <-> `word|SENSE`.
//!
//! The sense suffix is always split off at the *last* delimiter, so words that
//! picked up delimiter-like characters during phrase joining still decompose
//! correctly as long as a sense is attached.

pub mod tagged;

/// Default delimiter between word and sense.
pub const DEFAULT_DELIMITER: char = '|';

/// Strategy for turning (word, sense) pairs into keys and back.
///
/// Passed to the store at construction so callers can swap the key format
/// without touching the store itself.
pub trait KeyCodec {
    /// Compose a key. `None` sense yields the bare word.
    fn make_key(&self, word: &str, sense: Option<&str>) -> sense2vec_core::Result<String>;

    /// Decompose a key into word and sense. Keys without a sense yield `None`.
    fn split_key(&self, key: &str) -> (String, Option<String>);
}

/// `word<delimiter>sense` keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelimitedKeys {
    delimiter: char,
}

impl DelimitedKeys {
    /// Codec using `delimiter` between word and sense.
    #[must_use]
    pub fn new(delimiter: char) -> Self {
        Self { delimiter }
    }

    /// The delimiter this codec joins on.
    #[must_use]
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Borrowing variant of [`KeyCodec::split_key`].
    #[must_use]
    pub fn split<'k>(&self, key: &'k str) -> (&'k str, Option<&'k str>) {
        match key.rsplit_once(self.delimiter) {
            Some((word, sense)) => (word, Some(sense)),
            None => (key, None),
        }
    }
}

impl Default for DelimitedKeys {
    fn default() -> Self {
        Self::new(DEFAULT_DELIMITER)
    }
}

impl KeyCodec for DelimitedKeys {
    fn make_key(&self, word: &str, sense: Option<&str>) -> sense2vec_core::Result<String> {
        let Some(sense) = sense else {
            // A bare word with a delimiter would split into a bogus sense.
            if word.contains(self.delimiter) {
                return Err(sense2vec_core::Error::InvalidArgument(format!(
                    "word {word:?} contains the delimiter {:?} but has no sense",
                    self.delimiter
                )));
            }
            return Ok(word.to_owned());
        };

        if sense.contains(self.delimiter) {
            return Err(sense2vec_core::Error::InvalidArgument(format!(
                "sense {sense:?} contains the delimiter {:?}",
                self.delimiter
            )));
        }

        let mut key = String::with_capacity(word.len() + sense.len() + self.delimiter.len_utf8());
        key.push_str(word);
        key.push(self.delimiter);
        key.push_str(sense);
        Ok(key)
    }

    fn split_key(&self, key: &str) -> (String, Option<String>) {
        let (word, sense) = self.split(key);
        (word.to_owned(), sense.map(str::to_owned))
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_make_key() {
        let codec = DelimitedKeys::default();
        assert_eq!(codec.make_key("dog", Some("NOUN")).unwrap(), "dog|NOUN");
        assert_eq!(codec.make_key("dog", None).unwrap(), "dog");
        assert_eq!(codec.make_key("dog", Some("")).unwrap(), "dog|");
    }

    #[test]
    fn test_split_on_last_delimiter() {
        let codec = DelimitedKeys::default();
        assert_eq!(
            codec.split_key("a|b|NOUN"),
            ("a|b".to_string(), Some("NOUN".to_string()))
        );
        assert_eq!(codec.split_key("dog"), ("dog".to_string(), None));
        assert_eq!(
            codec.split_key("dog|"),
            ("dog".to_string(), Some(String::new()))
        );
    }

    #[test]
    fn test_rejects_ambiguous_keys() {
        let codec = DelimitedKeys::default();
        assert!(matches!(
            codec.make_key("dog", Some("NO|UN")),
            Err(sense2vec_core::Error::InvalidArgument(_))
        ));
        assert!(matches!(
            codec.make_key("a|b", None),
            Err(sense2vec_core::Error::InvalidArgument(_))
        ));
        // Earlier delimiters in the word survive when a sense is attached.
        assert_eq!(codec.make_key("a|b", Some("X")).unwrap(), "a|b|X");
    }

    #[test]
    fn test_custom_delimiter() {
        let codec = DelimitedKeys::new('#');
        let key = codec.make_key("new_york", Some("GPE")).unwrap();
        assert_eq!(key, "new_york#GPE");
        assert_eq!(codec.split("new_york#GPE"), ("new_york", Some("GPE")));
        assert_eq!(codec.split("a|b"), ("a|b", None));
    }

    proptest! {
        #[test]
        fn make_then_split_roundtrips(
            word in "[^|]*",
            sense in proptest::option::of("[^|]*"),
        ) {
            let codec = DelimitedKeys::default();
            let key = codec.make_key(&word, sense.as_deref()).expect("valid pair");
            prop_assert_eq!(codec.split_key(&key), (word, sense));
        }
    }
}
