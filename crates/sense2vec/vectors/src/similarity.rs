//! Cosine scoring against a query centroid.

/// Compute the L2 norm of a vector.
pub fn norm(v: ndarray::ArrayView1<'_, f32>) -> f32 {
    v.dot(&v).sqrt()
}

/// Cosine similarity. Zero vectors score 0.
pub fn cosine(a: ndarray::ArrayView1<'_, f32>, b: ndarray::ArrayView1<'_, f32>) -> f32 {
    let denom = norm(a) * norm(b);
    if denom > 0.0 { a.dot(&b) / denom } else { 0.0 }
}

/// Mean of the query rows.
///
/// The centroid is what stored vectors are scored against, so a single query
/// reduces to plain cosine similarity.
pub fn centroid(queries: ndarray::ArrayView2<'_, f32>) -> Option<ndarray::Array1<f32>> {
    queries.mean_axis(ndarray::Axis(0))
}

/// Cosine similarity of every row of `matrix` against `query`.
///
/// One matrix-vector product for the dot products, then a per-row division by
/// the norms. Rows or queries with zero norm score 0.
pub fn cosine_scores(
    matrix: ndarray::ArrayView2<'_, f32>,
    query: ndarray::ArrayView1<'_, f32>,
) -> ndarray::Array1<f32> {
    let query_norm = norm(query);
    let mut scores = matrix.dot(&query);
    for (score, row) in scores.iter_mut().zip(matrix.rows()) {
        let denom = norm(row) * query_norm;
        *score = if denom > 0.0 { *score / denom } else { 0.0 };
        if score.is_nan() {
            *score = f32::NEG_INFINITY;
        }
    }
    scores
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cosine() {
        let a = ndarray::arr1(&[1.0_f32, 0.0, 0.0, 0.0]);
        let b = ndarray::arr1(&[0.9_f32, 0.1, 0.0, 0.0]);
        let score = cosine(a.view(), b.view());
        assert!((score - 0.993_883_7).abs() < 1e-5, "score was {score}");

        let c = ndarray::arr1(&[0.0_f32, 0.0, 1.0, 0.0]);
        assert!(cosine(a.view(), c.view()).abs() < 1e-6);
    }

    #[test]
    fn test_cosine_zero_vector() {
        let a = ndarray::arr1(&[1.0_f32, 2.0]);
        let zero = ndarray::arr1(&[0.0_f32, 0.0]);
        assert_eq!(cosine(a.view(), zero.view()), 0.0);
    }

    #[test]
    fn test_centroid() {
        let queries = ndarray::arr2(&[[1.0_f32, 0.0], [0.0, 1.0]]);
        let c = centroid(queries.view()).unwrap();
        assert_eq!(c.to_vec(), vec![0.5, 0.5]);

        let empty = ndarray::Array2::<f32>::zeros((0, 2));
        assert!(centroid(empty.view()).is_none());
    }

    #[test]
    fn test_cosine_scores_matches_pairwise() {
        let matrix = ndarray::arr2(&[[1.0_f32, 0.0], [1.0, 1.0], [0.0, 0.0], [-2.0, 0.0]]);
        let query = ndarray::arr1(&[3.0_f32, 0.0]);
        let scores = cosine_scores(matrix.view(), query.view());

        for (row, &score) in matrix.rows().into_iter().zip(scores.iter()) {
            assert!((cosine(row, query.view()) - score).abs() < 1e-6);
        }
        assert!((scores[3] + 1.0).abs() < 1e-6);
    }
}
