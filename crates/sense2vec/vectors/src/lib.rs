//! Vector table: fixed-width rows addressed by key id.
//!
//! Rows are stored in insertion order in one row-major matrix. Because
//! vectors are conventionally added most-frequent first, a row's position
//! doubles as a frequency rank.

pub mod format;
pub mod similarity;

/// Upper bound on the `f32` elements reserved up front by
/// [`Vectors::with_capacity`]. Larger tables still grow on demand.
pub const MAX_RESERVED_ELEMENTS: usize = 1 << 24;

/// Dense table of `dim`-wide vectors keyed by [`sense2vec_core::KeyId`].
#[derive(Debug, Clone, PartialEq)]
pub struct Vectors {
    data: ndarray::Array2<f32>,
    /// row -> id
    ids: Vec<sense2vec_core::KeyId>,
    /// id -> row, ordered by id
    rows: std::collections::BTreeMap<sense2vec_core::KeyId, usize>,
}

impl Vectors {
    /// Create an empty table of `dim`-wide vectors.
    #[must_use]
    pub fn new(dim: usize) -> Self {
        Self::with_capacity(dim, 0)
    }

    /// Create an empty table with room for `capacity` rows.
    ///
    /// `capacity` is a hint: the reservation is capped at
    /// [`MAX_RESERVED_ELEMENTS`] floats.
    #[must_use]
    pub fn with_capacity(dim: usize, capacity: usize) -> Self {
        let capacity = capacity.min(MAX_RESERVED_ELEMENTS / dim.max(1));
        let buf = Vec::with_capacity(capacity.saturating_mul(dim));
        let data = ndarray::Array2::from_shape_vec((0, dim), buf)
            .unwrap_or_else(|_| ndarray::Array2::zeros((0, dim)));
        Self {
            data,
            ids: Vec::with_capacity(capacity),
            rows: std::collections::BTreeMap::new(),
        }
    }

    /// Rebuild a table from its row ids and row-major data.
    pub fn from_parts(
        dim: usize,
        ids: Vec<sense2vec_core::KeyId>,
        data: Vec<f32>,
    ) -> sense2vec_core::Result<Self> {
        let data = ndarray::Array2::from_shape_vec((ids.len(), dim), data).map_err(|e| {
            sense2vec_core::Error::corrupt(format!("vector data does not match shape: {e}"))
        })?;

        let mut rows = std::collections::BTreeMap::new();
        for (row, &id) in ids.iter().enumerate() {
            if rows.insert(id, row).is_some() {
                return Err(sense2vec_core::Error::corrupt(format!(
                    "key id {id} stored in more than one row"
                )));
            }
        }

        Ok(Self { data, ids, rows })
    }

    /// Store `vector` under `id`, overwriting any previous vector in place.
    pub fn add(&mut self, id: sense2vec_core::KeyId, vector: &[f32]) -> sense2vec_core::Result<()> {
        if vector.len() != self.dim() {
            return Err(sense2vec_core::Error::DimensionMismatch {
                expected: self.dim(),
                actual: vector.len(),
            });
        }

        let vector = ndarray::ArrayView1::from(vector);
        if let Some(&row) = self.rows.get(&id) {
            self.data.row_mut(row).assign(&vector);
            return Ok(());
        }

        self.data.push_row(vector).map_err(|e| {
            sense2vec_core::Error::InvalidArgument(format!("cannot append row: {e}"))
        })?;
        self.rows.insert(id, self.ids.len());
        self.ids.push(id);
        Ok(())
    }

    /// Check whether `id` has a vector.
    #[must_use]
    pub fn contains(&self, id: sense2vec_core::KeyId) -> bool {
        self.rows.contains_key(&id)
    }

    /// Row position of `id`.
    #[must_use]
    pub fn find(&self, id: sense2vec_core::KeyId) -> Option<usize> {
        self.rows.get(&id).copied()
    }

    /// The vector stored under `id`.
    #[must_use]
    pub fn get(&self, id: sense2vec_core::KeyId) -> Option<ndarray::ArrayView1<'_, f32>> {
        self.find(id).map(|row| self.data.row(row))
    }

    /// Number of stored vectors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Check if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Width of every vector.
    #[must_use]
    pub fn dim(&self) -> usize {
        self.data.ncols()
    }

    /// Ids in row order.
    #[must_use]
    pub fn row_ids(&self) -> &[sense2vec_core::KeyId] {
        &self.ids
    }

    /// The whole table, one row per vector in row order.
    #[must_use]
    pub fn matrix(&self) -> ndarray::ArrayView2<'_, f32> {
        self.data.view()
    }

    /// Iterate over `(id, vector)` in ascending id order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (sense2vec_core::KeyId, ndarray::ArrayView1<'_, f32>)> {
        self.rows.iter().map(|(&id, &row)| (id, self.data.row(row)))
    }

    /// Find the `k` vectors closest to the centroid of the vectors stored
    /// under `query_ids`.
    ///
    /// Ids without a vector are ignored; if none remain this fails with
    /// [`sense2vec_core::Error::InvalidArgument`]. The query ids themselves
    /// never appear in the result.
    pub fn most_similar(
        &self,
        query_ids: &[sense2vec_core::KeyId],
        k: usize,
    ) -> sense2vec_core::Result<Vec<sense2vec_core::Neighbor>> {
        let query_rows: Vec<usize> = query_ids.iter().filter_map(|&id| self.find(id)).collect();
        let queries = self.data.select(ndarray::Axis(0), &query_rows);
        self.most_similar_to(queries.view(), query_ids, k)
    }

    /// Find the `k` vectors closest to the centroid of `queries`, skipping
    /// any id in `exclude`.
    ///
    /// Results are ordered by cosine similarity, highest first, with ties
    /// going to the lower id. Fewer than `k` results come back when the table
    /// has fewer eligible rows.
    pub fn most_similar_to(
        &self,
        queries: ndarray::ArrayView2<'_, f32>,
        exclude: &[sense2vec_core::KeyId],
        k: usize,
    ) -> sense2vec_core::Result<Vec<sense2vec_core::Neighbor>> {
        if queries.ncols() != self.dim() {
            return Err(sense2vec_core::Error::DimensionMismatch {
                expected: self.dim(),
                actual: queries.ncols(),
            });
        }
        let Some(centroid) = similarity::centroid(queries) else {
            return Err(sense2vec_core::Error::InvalidArgument(
                "no query vectors to compare against".to_string(),
            ));
        };

        if k == 0 {
            return Ok(Vec::new());
        }

        let exclude: std::collections::HashSet<_> = exclude.iter().copied().collect();
        let scores = similarity::cosine_scores(self.data.view(), centroid.view());

        // Max-heap whose top is the worst kept candidate.
        let mut heap = std::collections::BinaryHeap::with_capacity(k.saturating_add(1).min(1024));
        for (&id, &score) in self.ids.iter().zip(scores.iter()) {
            if exclude.contains(&id) {
                continue;
            }
            let candidate = Ranked { score, id };
            if heap.len() < k {
                heap.push(candidate);
            } else if heap.peek().is_some_and(|worst| candidate < *worst) {
                heap.pop();
                heap.push(candidate);
            }
        }

        Ok(heap
            .into_sorted_vec()
            .into_iter()
            .map(|r| sense2vec_core::Neighbor {
                id: r.id,
                score: r.score,
            })
            .collect())
    }
}

/// Search candidate ordered best-first: higher score, then lower id.
#[derive(Debug, Clone, Copy)]
struct Ranked {
    score: f32,
    id: sense2vec_core::KeyId,
}

impl PartialEq for Ranked {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Ranked {}

impl PartialOrd for Ranked {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Ranked {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        other
            .score
            .total_cmp(&self.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use sense2vec_core::KeyId;

    use super::*;

    fn table(rows: &[(u64, [f32; 4])]) -> Vectors {
        let mut vectors = Vectors::new(4);
        for (id, v) in rows {
            vectors.add(KeyId(*id), v).unwrap();
        }
        vectors
    }

    fn ids(neighbors: &[sense2vec_core::Neighbor]) -> Vec<u64> {
        neighbors.iter().map(|n| n.id.0).collect()
    }

    #[test]
    fn test_add_and_get() {
        let vectors = table(&[(0, [1.0, 0.0, 0.0, 0.0]), (5, [0.0, 1.0, 0.0, 0.0])]);

        assert_eq!(vectors.len(), 2);
        assert!(vectors.contains(KeyId(5)));
        assert!(!vectors.contains(KeyId(1)));
        assert_eq!(vectors.get(KeyId(5)).unwrap().to_vec(), vec![0.0, 1.0, 0.0, 0.0]);
        assert!(vectors.get(KeyId(1)).is_none());
        assert_eq!(vectors.find(KeyId(5)), Some(1));
    }

    #[test]
    fn test_capacity_is_only_a_hint() {
        let mut vectors = Vectors::with_capacity(4, usize::MAX);
        assert!(vectors.is_empty());
        vectors.add(KeyId(0), &[1.0, 0.0, 0.0, 0.0]).unwrap();
        assert_eq!(vectors.len(), 1);

        let vectors = Vectors::with_capacity(0, usize::MAX);
        assert_eq!(vectors.dim(), 0);
    }

    #[test]
    fn test_readd_overwrites_in_place() {
        let mut vectors = table(&[(0, [1.0, 0.0, 0.0, 0.0]), (1, [0.0, 1.0, 0.0, 0.0])]);
        vectors.add(KeyId(0), &[0.0, 0.0, 0.0, 2.0]).unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors.find(KeyId(0)), Some(0));
        assert_eq!(vectors.get(KeyId(0)).unwrap().to_vec(), vec![0.0, 0.0, 0.0, 2.0]);
    }

    #[test]
    fn test_dimension_mismatch_leaves_table_untouched() {
        let mut vectors = table(&[(0, [1.0, 0.0, 0.0, 0.0])]);
        let before = vectors.clone();

        let err = vectors.add(KeyId(1), &[1.0, 2.0]).unwrap_err();
        assert!(matches!(
            err,
            sense2vec_core::Error::DimensionMismatch {
                expected: 4,
                actual: 2
            }
        ));
        assert!(vectors.add(KeyId(0), &[1.0; 5]).is_err());
        assert_eq!(vectors, before);
    }

    #[test]
    fn test_iter_in_id_order() {
        let vectors = table(&[
            (7, [1.0, 0.0, 0.0, 0.0]),
            (2, [0.0, 1.0, 0.0, 0.0]),
            (4, [0.0, 0.0, 1.0, 0.0]),
        ]);
        let order: Vec<u64> = vectors.iter().map(|(id, _)| id.0).collect();
        assert_eq!(order, vec![2, 4, 7]);
        // Restartable.
        assert_eq!(vectors.iter().count(), 3);
        assert_eq!(vectors.row_ids(), &[KeyId(7), KeyId(2), KeyId(4)]);
    }

    #[test]
    fn test_most_similar_orders_by_score() {
        let vectors = table(&[
            (0, [1.0, 0.0, 0.0, 0.0]),
            (1, [0.9, 0.1, 0.0, 0.0]),
            (2, [0.0, 0.0, 1.0, 0.0]),
            (3, [0.5, 0.5, 0.0, 0.0]),
        ]);

        let result = vectors.most_similar(&[KeyId(0)], 10).unwrap();
        assert_eq!(ids(&result), vec![1, 3, 2]);
        assert!((result[0].score - 0.993_883_7).abs() < 1e-5);
        assert!(result[2].score.abs() < 1e-6);
    }

    #[test]
    fn test_most_similar_excludes_queries_and_caps() {
        let vectors = table(&[
            (0, [1.0, 0.0, 0.0, 0.0]),
            (1, [0.9, 0.1, 0.0, 0.0]),
            (2, [0.0, 0.0, 1.0, 0.0]),
        ]);

        let result = vectors.most_similar(&[KeyId(0), KeyId(1)], 10).unwrap();
        assert_eq!(ids(&result), vec![2]);

        let result = vectors.most_similar(&[KeyId(0)], 1).unwrap();
        assert_eq!(ids(&result), vec![1]);

        assert!(vectors.most_similar(&[KeyId(0)], 0).unwrap().is_empty());
    }

    #[test]
    fn test_most_similar_ties_prefer_lower_id() {
        let vectors = table(&[
            (9, [0.0, 1.0, 0.0, 0.0]),
            (3, [0.0, 1.0, 0.0, 0.0]),
            (0, [1.0, 0.0, 0.0, 0.0]),
            (5, [0.0, 2.0, 0.0, 0.0]),
        ]);

        let result = vectors.most_similar(&[KeyId(0)], 2).unwrap();
        // All three candidates score 0; lowest ids win.
        assert_eq!(ids(&result), vec![3, 5]);

        let probe = ndarray::arr2(&[[0.0_f32, 1.0, 0.0, 0.0]]);
        let result = vectors.most_similar_to(probe.view(), &[], 4).unwrap();
        assert_eq!(ids(&result), vec![3, 5, 9, 0]);
    }

    #[test]
    fn test_most_similar_uses_centroid() {
        let vectors = table(&[
            (0, [1.0, 0.0, 0.0, 0.0]),
            (1, [0.0, 1.0, 0.0, 0.0]),
            (2, [1.0, 1.0, 0.0, 0.0]),
            (3, [1.0, 0.0, 1.0, 0.0]),
        ]);

        let result = vectors.most_similar(&[KeyId(0), KeyId(1)], 1).unwrap();
        assert_eq!(ids(&result), vec![2]);
        assert!((result[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_most_similar_without_queries_fails() {
        let vectors = table(&[(0, [1.0, 0.0, 0.0, 0.0])]);
        let err = vectors.most_similar(&[KeyId(42)], 5).unwrap_err();
        assert!(matches!(err, sense2vec_core::Error::InvalidArgument(_)));

        let probe = ndarray::arr2(&[[1.0_f32, 0.0]]);
        assert!(matches!(
            vectors.most_similar_to(probe.view(), &[], 5),
            Err(sense2vec_core::Error::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_from_parts_rejects_duplicate_ids() {
        let err = Vectors::from_parts(1, vec![KeyId(0), KeyId(0)], vec![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, sense2vec_core::Error::CorruptPersistedState(_)));
        assert!(Vectors::from_parts(2, vec![KeyId(0)], vec![1.0]).is_err());
    }
}
