// Hierarchical agglomerative clustering over embedding vectors.
//
// Builds the full merge tree with the nearest-neighbor-chain algorithm
// (O(n^2) time and memory) using Lance-Williams distance updates, then cuts
// it at k clusters by applying the n-k lowest merges. Everything is
// deterministic: ties are broken by index, and merges of equal height are
// applied in the order they were found.
//
// Distances are Euclidean in the encoder's output space.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::traits::TopicClusterer;

/// How the distance between two clusters is derived from point distances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Linkage {
    /// Mean distance over all cross-cluster point pairs (UPGMA).
    #[default]
    Average,
    /// Maximum distance over all cross-cluster point pairs.
    Complete,
    /// Increase in within-cluster variance caused by the merge.
    Ward,
}

impl Linkage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Linkage::Average => "average",
            Linkage::Complete => "complete",
            Linkage::Ward => "ward",
        }
    }

    /// Lance-Williams update: distance from cluster `x` to the union of
    /// clusters `a` and `b`, given the distances before the merge.
    fn merged_distance(
        &self,
        d_xa: f64,
        d_xb: f64,
        d_ab: f64,
        size_a: usize,
        size_b: usize,
        size_x: usize,
    ) -> f64 {
        let (na, nb, nx) = (size_a as f64, size_b as f64, size_x as f64);
        match self {
            Linkage::Average => (na * d_xa + nb * d_xb) / (na + nb),
            Linkage::Complete => d_xa.max(d_xb),
            Linkage::Ward => {
                let squared = ((nx + na) * d_xa * d_xa + (nx + nb) * d_xb * d_xb
                    - nx * d_ab * d_ab)
                    / (nx + na + nb);
                squared.max(0.0).sqrt()
            }
        }
    }
}

impl fmt::Display for Linkage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Linkage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "average" => Ok(Linkage::Average),
            "complete" => Ok(Linkage::Complete),
            "ward" => Ok(Linkage::Ward),
            other => Err(format!(
                "unknown linkage {other:?} (expected average, complete or ward)"
            )),
        }
    }
}

/// Agglomerative (bottom-up) hierarchical clusterer.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgglomerativeClusterer {
    pub linkage: Linkage,
}

impl AgglomerativeClusterer {
    pub fn new(linkage: Linkage) -> Self {
        Self { linkage }
    }
}

impl TopicClusterer for AgglomerativeClusterer {
    fn assign(&self, vectors: &[Vec<f64>], k: usize) -> Vec<usize> {
        let n = vectors.len();
        if n == 0 {
            return Vec::new();
        }
        let k = k.clamp(1, n);
        let merges = build_merge_tree(vectors, self.linkage);
        cut_tree(n, merges, k)
    }
}

/// Euclidean distance between two vectors of equal length.
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// One step of the merge tree. `keep` is the slot that holds the merged
/// cluster afterwards; `gone` is retired.
#[derive(Debug, Clone, Copy)]
struct Merge {
    keep: usize,
    gone: usize,
    height: f64,
}

/// Condensed upper-triangular distance matrix.
struct DistanceMatrix {
    n: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    fn euclidean(points: &[Vec<f64>]) -> Self {
        let n = points.len();
        let mut data = Vec::with_capacity(n * n.saturating_sub(1) / 2);
        for i in 0..n {
            for j in (i + 1)..n {
                data.push(euclidean(&points[i], &points[j]));
            }
        }
        Self { n, data }
    }

    fn index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - i * (i + 1) / 2 + (j - i - 1)
    }

    fn get(&self, i: usize, j: usize) -> f64 {
        self.data[self.index(i, j)]
    }

    fn set(&mut self, i: usize, j: usize, value: f64) {
        let idx = self.index(i, j);
        self.data[idx] = value;
    }
}

/// Nearest active neighbor of `a`. `preferred` wins ties, otherwise the
/// lowest index does.
fn nearest_neighbor(
    dist: &DistanceMatrix,
    active: &[bool],
    a: usize,
    preferred: Option<usize>,
) -> Option<(usize, f64)> {
    let mut best = preferred.map(|p| (p, dist.get(a, p)));
    for (x, &is_active) in active.iter().enumerate() {
        if !is_active || x == a || Some(x) == preferred {
            continue;
        }
        let d = dist.get(a, x);
        match best {
            Some((_, best_d)) if d >= best_d => {}
            _ => best = Some((x, d)),
        }
    }
    best
}

/// Build all n-1 merges with the nearest-neighbor-chain algorithm.
fn build_merge_tree(points: &[Vec<f64>], linkage: Linkage) -> Vec<Merge> {
    let n = points.len();
    let mut dist = DistanceMatrix::euclidean(points);
    let mut size = vec![1usize; n];
    let mut height = vec![0.0f64; n];
    let mut active = vec![true; n];
    let mut chain: Vec<usize> = Vec::with_capacity(n);
    let mut merges = Vec::with_capacity(n.saturating_sub(1));

    while merges.len() + 1 < n {
        if chain.is_empty() {
            match active.iter().position(|&is_active| is_active) {
                Some(start) => chain.push(start),
                None => break,
            }
        }

        // Grow the chain until its tail and the element before it are
        // reciprocal nearest neighbors.
        let (a, b, d_ab) = loop {
            let a = chain[chain.len() - 1];
            let previous = chain.len().checked_sub(2).map(|i| chain[i]);
            let Some((b, d)) = nearest_neighbor(&dist, &active, a, previous) else {
                return merges;
            };
            if Some(b) == previous {
                chain.truncate(chain.len() - 2);
                break (a, b, d);
            }
            chain.push(b);
        };

        let (keep, gone) = if a < b { (a, b) } else { (b, a) };
        let (size_keep, size_gone) = (size[keep], size[gone]);
        for x in 0..n {
            if !active[x] || x == keep || x == gone {
                continue;
            }
            let updated = linkage.merged_distance(
                dist.get(x, keep),
                dist.get(x, gone),
                d_ab,
                size_keep,
                size_gone,
                size[x],
            );
            dist.set(x, keep, updated);
        }

        // Heights never decrease up the tree, even with rounding noise.
        let merged_height = d_ab.max(height[keep]).max(height[gone]);
        active[gone] = false;
        size[keep] = size_keep + size_gone;
        height[keep] = merged_height;
        merges.push(Merge {
            keep,
            gone,
            height: merged_height,
        });
    }

    merges
}

/// Apply the n-k lowest merges and number the resulting groups by first
/// appearance in input order.
fn cut_tree(n: usize, mut merges: Vec<Merge>, k: usize) -> Vec<usize> {
    // Stable: equal heights keep discovery order, so a merge never runs
    // before the merge that built one of its inputs.
    merges.sort_by(|x, y| x.height.total_cmp(&y.height));

    let mut parent: Vec<usize> = (0..n).collect();
    for merge in merges.iter().take(n.saturating_sub(k)) {
        let root_keep = find_root(&mut parent, merge.keep);
        let root_gone = find_root(&mut parent, merge.gone);
        if root_keep != root_gone {
            parent[root_gone] = root_keep;
        }
    }

    let mut labels = Vec::with_capacity(n);
    let mut label_of_root: HashMap<usize, usize> = HashMap::new();
    for i in 0..n {
        let root = find_root(&mut parent, i);
        let next = label_of_root.len();
        labels.push(*label_of_root.entry(root).or_insert(next));
    }
    labels
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_blobs() -> Vec<Vec<f64>> {
        vec![
            vec![0.0, 0.0],
            vec![10.0, 10.0],
            vec![0.1, 0.2],
            vec![10.2, 9.9],
            vec![-0.1, 0.1],
            vec![9.8, 10.1],
        ]
    }

    #[test]
    fn test_separates_two_blobs() {
        for linkage in [Linkage::Average, Linkage::Complete, Linkage::Ward] {
            let labels = AgglomerativeClusterer::new(linkage).assign(&two_blobs(), 2);
            assert_eq!(labels, vec![0, 1, 0, 1, 0, 1], "linkage {linkage}");
        }
    }

    #[test]
    fn test_k_larger_than_input_gives_singletons() {
        let labels = AgglomerativeClusterer::default().assign(&two_blobs(), 12);
        assert_eq!(labels, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_k_one_groups_everything() {
        let labels = AgglomerativeClusterer::default().assign(&two_blobs(), 1);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_k_zero_is_treated_as_one() {
        let labels = AgglomerativeClusterer::default().assign(&two_blobs(), 0);
        assert!(labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_empty_input() {
        assert!(AgglomerativeClusterer::default().assign(&[], 4).is_empty());
    }

    #[test]
    fn test_single_point() {
        assert_eq!(
            AgglomerativeClusterer::default().assign(&[vec![1.0, 2.0]], 3),
            vec![0]
        );
    }

    #[test]
    fn test_identical_points_terminate() {
        let points = vec![vec![1.0, 1.0]; 5];
        let labels = AgglomerativeClusterer::default().assign(&points, 2);
        assert_eq!(labels.len(), 5);
        let distinct: std::collections::HashSet<_> = labels.iter().collect();
        assert_eq!(distinct.len(), 2);
    }

    #[test]
    fn test_outlier_split_off_by_average_and_complete() {
        // A tight run of points plus one far outlier.
        let points: Vec<Vec<f64>> = [0.0, 1.0, 2.0, 3.0, 4.0, 10.0]
            .iter()
            .map(|&x| vec![x])
            .collect();
        let avg = AgglomerativeClusterer::new(Linkage::Average).assign(&points, 2);
        assert_eq!(avg, vec![0, 0, 0, 0, 0, 1]);
        let complete = AgglomerativeClusterer::new(Linkage::Complete).assign(&points, 2);
        assert_eq!(complete, vec![0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_three_clusters_on_line() {
        let points: Vec<Vec<f64>> = [0.0, 0.5, 5.0, 5.5, 20.0, 20.5]
            .iter()
            .map(|&x| vec![x])
            .collect();
        let labels = AgglomerativeClusterer::default().assign(&points, 3);
        assert_eq!(labels, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_condensed_index_covers_matrix() {
        let points: Vec<Vec<f64>> = (0..5).map(|i| vec![i as f64]).collect();
        let dist = DistanceMatrix::euclidean(&points);
        assert_eq!(dist.data.len(), 10);
        for i in 0..5 {
            for j in 0..5 {
                if i != j {
                    assert_eq!(dist.get(i, j), (i as f64 - j as f64).abs());
                }
            }
        }
    }

    #[test]
    fn test_average_update_is_size_weighted() {
        let d = Linkage::Average.merged_distance(2.0, 4.0, 1.0, 3, 1, 1);
        assert!((d - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_ward_update_matches_centroid_formula() {
        // Points x=0, a=2, b=4 on a line. Ward distance between {x} and {a,b}
        // is sqrt(2 * n_x * n_ab / (n_x + n_ab)) * |centroid diff| = sqrt(4/3) * 3
        let d = Linkage::Ward.merged_distance(2.0, 4.0, 2.0, 1, 1, 1);
        let expected = (2.0_f64 * 2.0 / 3.0).sqrt() * 3.0;
        assert!((d - expected).abs() < 1e-9, "got {d}, expected {expected}");
    }

    #[test]
    fn test_linkage_parse() {
        assert_eq!("average".parse::<Linkage>().unwrap(), Linkage::Average);
        assert_eq!(" Complete ".parse::<Linkage>().unwrap(), Linkage::Complete);
        assert_eq!("WARD".parse::<Linkage>().unwrap(), Linkage::Ward);
        assert!("single".parse::<Linkage>().is_err());
    }
}
