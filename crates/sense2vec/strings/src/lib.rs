//! Interning table for key strings.
//!
//! Ids are handed out densely in insertion order, so the table serializes as
//! a plain ordered list where each string's position is its id.

/// Bidirectional map between key strings and [`sense2vec_core::KeyId`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StringStore {
    index: std::collections::HashMap<std::sync::Arc<str>, sense2vec_core::KeyId>,
    strings: Vec<std::sync::Arc<str>>,
}

impl StringStore {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `s`, assigning the next free id if it is new.
    pub fn intern(&mut self, s: &str) -> sense2vec_core::KeyId {
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = sense2vec_core::KeyId::from(self.strings.len());
        let s: std::sync::Arc<str> = std::sync::Arc::from(s);
        self.strings.push(s.clone());
        self.index.insert(s, id);
        id
    }

    /// Id of `s`, if interned.
    #[must_use]
    pub fn lookup_id(&self, s: &str) -> Option<sense2vec_core::KeyId> {
        self.index.get(s).copied()
    }

    /// String behind `id`, if assigned.
    #[must_use]
    pub fn lookup_string(&self, id: sense2vec_core::KeyId) -> Option<&str> {
        self.strings.get(id.index()).map(|s| &**s)
    }

    /// Number of interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterate over `(id, string)` in id order.
    pub fn iter(&self) -> impl Iterator<Item = (sense2vec_core::KeyId, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (sense2vec_core::KeyId::from(i), &**s))
    }

    /// Serialize the table as a JSON array of strings.
    pub fn to_json(&self) -> sense2vec_core::Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| sense2vec_core::Error::encode("strings table", e))
    }

    /// Load a table written by [`StringStore::to_json`].
    pub fn from_json(bytes: &[u8]) -> sense2vec_core::Result<Self> {
        serde_json::from_slice(bytes)
            .map_err(|e| sense2vec_core::Error::corrupt(format!("invalid strings table: {e}")))
    }
}

impl<S: AsRef<str>> FromIterator<S> for StringStore {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut store = Self::new();
        for s in iter {
            store.intern(s.as_ref());
        }
        store
    }
}

impl serde::Serialize for StringStore {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.strings.iter().map(|s| &**s))
    }
}

impl<'de> serde::Deserialize<'de> for StringStore {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        let expected = strings.len();
        let store: Self = strings.into_iter().collect();
        // Duplicates would shift every later id.
        if store.len() != expected {
            return Err(serde::de::Error::custom(format!(
                "strings table has {} duplicate entries",
                expected - store.len()
            )));
        }
        Ok(store)
    }
}
