// Nearest-centroid relabeling against the previous clustering run.
//
// Fresh cluster numbers carry no meaning across runs: label 3 today can be a
// different story than label 3 yesterday. When enabled, each new cluster
// takes the previous label whose centroid is closest, one-to-one, so topics
// keep their numbers while the news cycle drifts. The output is always a
// permutation of the input's label set 0..k'.

use std::collections::BTreeMap;

use super::cluster::euclidean;

/// Mean of a set of equal-length vectors. None when the set is empty.
pub fn centroid<'a, I>(vectors: I) -> Option<Vec<f64>>
where
    I: IntoIterator<Item = &'a [f64]>,
{
    let mut sum: Vec<f64> = Vec::new();
    let mut count = 0usize;
    for v in vectors {
        if count == 0 {
            sum = v.to_vec();
        } else {
            for (a, x) in sum.iter_mut().zip(v) {
                *a += x;
            }
        }
        count += 1;
    }
    if count == 0 {
        return None;
    }
    for a in &mut sum {
        *a /= count as f64;
    }
    Some(sum)
}

/// Remap `labels` so each new cluster reuses the previous label with the
/// nearest centroid.
///
/// `previous[i]` is the topic article `i` carried before this run. Previous
/// labels outside `0..k'` (k' = number of new clusters) are ignored so the
/// result stays within the label contract. New clusters that find no
/// partner take the lowest unused labels in ascending order.
pub fn align_with_previous(
    labels: &[usize],
    vectors: &[Vec<f64>],
    previous: &[Option<i64>],
) -> Vec<usize> {
    let cluster_count = labels.iter().max().map_or(0, |&max| max + 1);
    if cluster_count == 0 {
        return Vec::new();
    }

    let new_centroids: BTreeMap<usize, Vec<f64>> = (0..cluster_count)
        .filter_map(|label| {
            let members = labels
                .iter()
                .zip(vectors)
                .filter(|(l, _)| **l == label)
                .map(|(_, v)| v.as_slice());
            centroid(members).map(|c| (label, c))
        })
        .collect();

    let old_centroids: BTreeMap<usize, Vec<f64>> = (0..cluster_count)
        .filter_map(|old| {
            let members = previous
                .iter()
                .zip(vectors)
                .filter(|(p, _)| **p == Some(old as i64))
                .map(|(_, v)| v.as_slice());
            centroid(members).map(|c| (old, c))
        })
        .collect();

    let mut pairs: Vec<(f64, usize, usize)> = Vec::new();
    for (&new, new_c) in &new_centroids {
        for (&old, old_c) in &old_centroids {
            pairs.push((euclidean(new_c, old_c), new, old));
        }
    }
    pairs.sort_by(|x, y| {
        x.0.total_cmp(&y.0)
            .then_with(|| x.1.cmp(&y.1))
            .then_with(|| x.2.cmp(&y.2))
    });

    let mut mapping: Vec<Option<usize>> = vec![None; cluster_count];
    let mut taken = vec![false; cluster_count];
    for (_, new, old) in pairs {
        if mapping[new].is_none() && !taken[old] {
            mapping[new] = Some(old);
            taken[old] = true;
        }
    }

    let mut free = (0..cluster_count).filter(|&l| !taken[l]);
    let mapping: Vec<usize> = mapping
        .into_iter()
        .map(|m| m.or_else(|| free.next()).unwrap_or(0))
        .collect();

    labels.iter().map(|&l| mapping[l]).collect()
}
