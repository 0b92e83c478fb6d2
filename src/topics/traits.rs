// Topic clusterer trait: swap-ready abstraction.
//
// The pipeline only needs "vectors in, labels out". The default
// implementation is hierarchical agglomerative clustering, which needs no
// random initialization and so gives the same partition for the same input.

/// Trait for grouping embedding vectors into topics.
pub trait TopicClusterer: Send + Sync {
    /// Assign a label to each vector.
    ///
    /// Vectors must be non-empty, finite and share one dimensionality.
    /// Returns one label per input, in input order, using exactly the labels
    /// `0..min(k, vectors.len())`. An empty input yields an empty output.
    fn assign(&self, vectors: &[Vec<f64>], k: usize) -> Vec<usize>;
}
