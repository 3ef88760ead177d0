//! Word-sense vector store.
//!
//! Keys are `word|SENSE` strings. Each key is interned to a dense id and its
//! vector lives in a row of the vector table:
//!
//! ```text
//! "duck|VERB" --codec--> interner --KeyId--> vector table row
//! ```
//!
//! Queries walk the same path backwards, from nearest rows to ids to keys.
//!
//! The store is built once and then read. Reads take `&self` and writes take
//! `&mut self`, so any number of readers may share a loaded store.

mod casing;
pub mod persist;

pub use persist::Exclude;
pub use sense2vec_core::{Error, KeyId, Result};
pub use sense2vec_key::{DEFAULT_DELIMITER, DelimitedKeys, KeyCodec};

/// Store metadata persisted next to the vectors as `cfg`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct StoreConfig {
    /// Registered sense labels, in preference order.
    #[serde(default)]
    pub senses: Vec<String>,
    /// Delimiter between word and sense in keys.
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
}

fn default_delimiter() -> char {
    DEFAULT_DELIMITER
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            senses: Vec::new(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

impl StoreConfig {
    /// Config with the given senses and the default delimiter.
    pub fn with_senses<S: Into<String>>(senses: impl IntoIterator<Item = S>) -> Self {
        Self {
            senses: senses.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }
}

/// Vectors keyed by `word|SENSE` strings.
#[derive(Debug, Clone)]
pub struct Sense2Vec<C = DelimitedKeys> {
    codec: C,
    strings: sense2vec_strings::StringStore,
    vectors: sense2vec_vectors::Vectors,
    cfg: StoreConfig,
}

impl Sense2Vec<DelimitedKeys> {
    /// Create an empty store of `dim`-wide vectors using the delimiter from
    /// `cfg`.
    #[must_use]
    pub fn new(dim: usize, cfg: StoreConfig) -> Self {
        Self::with_capacity(dim, 0, cfg)
    }

    /// Like [`Sense2Vec::new`], reserving room for `capacity` vectors.
    #[must_use]
    pub fn with_capacity(dim: usize, capacity: usize, cfg: StoreConfig) -> Self {
        let codec = DelimitedKeys::new(cfg.delimiter);
        Self::with_codec_and_capacity(dim, capacity, cfg, codec)
    }
}

impl<C: KeyCodec> Sense2Vec<C> {
    /// Create an empty store that builds and splits keys with `codec`.
    pub fn with_codec(dim: usize, cfg: StoreConfig, codec: C) -> Self {
        Self::with_codec_and_capacity(dim, 0, cfg, codec)
    }

    /// Like [`Sense2Vec::with_codec`], reserving room for `capacity` vectors.
    pub fn with_codec_and_capacity(
        dim: usize,
        capacity: usize,
        cfg: StoreConfig,
        codec: C,
    ) -> Self {
        Self {
            codec,
            strings: sense2vec_strings::StringStore::new(),
            vectors: sense2vec_vectors::Vectors::with_capacity(dim, capacity),
            cfg,
        }
    }

    /// Store `vector` under `key`, replacing any earlier vector for it.
    pub fn add(&mut self, key: &str, vector: &[f32]) -> Result<KeyId> {
        // Check before interning so a bad vector leaves no trace.
        if vector.len() != self.dim() {
            return Err(Error::DimensionMismatch {
                expected: self.dim(),
                actual: vector.len(),
            });
        }
        let id = self.strings.intern(key);
        self.vectors.add(id, vector)?;
        Ok(id)
    }

    /// Compose `word` and `sense` into a key and store `vector` under it.
    pub fn add_sense(&mut self, word: &str, sense: Option<&str>, vector: &[f32]) -> Result<KeyId> {
        let key = self.codec.make_key(word, sense)?;
        self.add(&key, vector)
    }

    /// Check whether `key` has a vector.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.id(key).is_some()
    }

    /// The vector stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<ndarray::ArrayView1<'_, f32>> {
        self.vectors.get(self.id(key)?)
    }

    /// The vector stored under `key`, failing with [`Error::KeyNotFound`].
    pub fn try_get(&self, key: &str) -> Result<ndarray::ArrayView1<'_, f32>> {
        self.get(key).ok_or_else(|| Error::KeyNotFound(key.to_owned()))
    }

    /// Id of `key` if it has a vector.
    #[must_use]
    pub fn id(&self, key: &str) -> Option<KeyId> {
        self.strings
            .lookup_id(key)
            .filter(|&id| self.vectors.contains(id))
    }

    /// Iterate over `(key, vector)` pairs in id order.
    ///
    /// Each call starts a fresh pass.
    pub fn items(&self) -> impl Iterator<Item = (&str, ndarray::ArrayView1<'_, f32>)> {
        self.vectors
            .iter()
            .filter_map(|(id, vector)| Some((self.strings.lookup_string(id)?, vector)))
    }

    /// Iterate over stored keys in id order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.items().map(|(key, _)| key)
    }

    /// Iterate over stored vectors in id order.
    pub fn values(&self) -> impl Iterator<Item = ndarray::ArrayView1<'_, f32>> {
        self.items().map(|(_, vector)| vector)
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    /// Width of every vector.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.vectors.dim()
    }

    /// Registered sense labels.
    #[must_use]
    pub fn senses(&self) -> &[String] {
        &self.cfg.senses
    }

    /// Replace the registered sense labels.
    pub fn set_senses(&mut self, senses: Vec<String>) {
        self.cfg.senses = senses;
    }

    /// The store configuration.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.cfg
    }

    /// The key codec.
    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// The interning table.
    #[must_use]
    pub fn strings(&self) -> &sense2vec_strings::StringStore {
        &self.strings
    }

    /// The vector table.
    #[must_use]
    pub fn vectors(&self) -> &sense2vec_vectors::Vectors {
        &self.vectors
    }

    /// Find the `n` keys most similar to the centroid of `keys`.
    ///
    /// Keys that are not stored are skipped. Fails with
    /// [`Error::InvalidArgument`] when none of them are. The query keys never
    /// appear in the result.
    pub fn most_similar<S: AsRef<str>>(&self, keys: &[S], n: usize) -> Result<Vec<(String, f32)>> {
        let ids: Vec<KeyId> = keys.iter().filter_map(|key| self.id(key.as_ref())).collect();
        if ids.is_empty() {
            return Err(Error::InvalidArgument(format!(
                "none of the {} query keys are in the store",
                keys.len()
            )));
        }

        // Over-fetch so that the key-level filter below cannot starve the result.
        let neighbors = self.vectors.most_similar(&ids, n.saturating_add(keys.len()))?;

        Ok(neighbors
            .into_iter()
            .filter_map(|neighbor| {
                let key = self.strings.lookup_string(neighbor.id)?;
                Some((key.to_owned(), neighbor.score))
            })
            .filter(|(key, _)| !keys.iter().any(|query| query.as_ref() == key))
            .take(n)
            .collect())
    }

    /// Stored keys for the same word under the other registered senses.
    ///
    /// Results follow the order of [`Sense2Vec::senses`].
    pub fn get_other_senses(&self, key: &str) -> Result<Vec<String>> {
        let (word, orig_sense) = self.codec.split_key(key);
        let mut result = Vec::new();
        for sense in &self.cfg.senses {
            if orig_sense.as_deref() == Some(sense.as_str()) {
                continue;
            }
            let candidate = self.codec.make_key(&word, Some(sense))?;
            if self.contains(&candidate) {
                result.push(candidate);
            }
        }
        Ok(result)
    }

    /// Guess the sense of `word` from where its keys sit in the table.
    ///
    /// Lowercase words are also tried uppercased and title-cased. Every
    /// variant is paired with every registered sense, and the pair whose key
    /// sits in the *highest* row wins; keys that are not stored rank below
    /// every row, and ties fall to the lexicographically greatest pair.
    /// Since rows are normally added most-frequent first, this picks the
    /// least frequent stored variant.
    ///
    /// With no registered senses the word comes back with `None`.
    pub fn get_best_sense(&self, word: &str) -> Result<(String, Option<String>)> {
        if self.cfg.senses.is_empty() {
            return Ok((word.to_owned(), None));
        }

        let versions = if casing::is_lower(word) {
            vec![word.to_owned(), word.to_uppercase(), casing::title(word)]
        } else {
            vec![word.to_owned()]
        };

        let mut ranked = Vec::with_capacity(versions.len() * self.cfg.senses.len());
        for text in versions {
            for sense in &self.cfg.senses {
                let key = self.codec.make_key(&text, Some(sense))?;
                let row = self
                    .strings
                    .lookup_id(&key)
                    .and_then(|id| self.vectors.find(id));
                ranked.push((row, (text.clone(), sense.clone())));
            }
        }

        Ok(ranked
            .into_iter()
            .max()
            .map_or_else(|| (word.to_owned(), None), |(_, (text, sense))| (text, Some(sense))))
    }
}

impl<'a, C: KeyCodec> IntoIterator for &'a Sense2Vec<C> {
    type Item = (&'a str, ndarray::ArrayView1<'a, f32>);
    type IntoIter = Box<dyn Iterator<Item = Self::Item> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.items())
    }
}
