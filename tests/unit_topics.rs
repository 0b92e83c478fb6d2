// Unit tests for topic clustering and the embedding codec.
//
// Tests the clusterer's label contract (count bound, label range,
// determinism) across linkages, and codec rejection of malformed input.

use slant::topics::cluster::{AgglomerativeClusterer, Linkage};
use slant::topics::codec::{decode_embedding, CodecError};
use slant::topics::traits::TopicClusterer;

const LINKAGES: [Linkage; 3] = [Linkage::Average, Linkage::Complete, Linkage::Ward];

/// Deterministic pseudo-random points (LCG), spread over a few loose groups.
fn scattered_points(n: usize, dim: usize) -> Vec<Vec<f64>> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = || {
        state = state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1_442_695_040_888_963_407);
        ((state >> 33) as f64) / ((1u64 << 31) as f64)
    };
    (0..n)
        .map(|i| {
            let center = (i % 4) as f64 * 3.0;
            (0..dim).map(|_| center + next()).collect()
        })
        .collect()
}

fn distinct(labels: &[usize]) -> usize {
    let mut l = labels.to_vec();
    l.sort_unstable();
    l.dedup();
    l.len()
}

// ============================================================
// Label contract
// ============================================================

#[test]
fn cluster_count_is_min_of_k_and_n() {
    let points = scattered_points(25, 5);
    for linkage in LINKAGES {
        let clusterer = AgglomerativeClusterer::new(linkage);
        for k in [1, 2, 4, 7, 12, 25, 40] {
            let labels = clusterer.assign(&points, k);
            let expected = k.min(points.len());
            assert_eq!(labels.len(), points.len());
            assert_eq!(distinct(&labels), expected, "{linkage} k={k}");
            assert!(labels.iter().all(|&l| l < expected), "{linkage} k={k}");
        }
    }
}

#[test]
fn clustering_is_deterministic() {
    let points = scattered_points(40, 8);
    for linkage in LINKAGES {
        let clusterer = AgglomerativeClusterer::new(linkage);
        let first = clusterer.assign(&points, 6);
        let second = clusterer.assign(&points, 6);
        assert_eq!(first, second, "{linkage}");
    }
}

#[test]
fn separated_groups_are_recovered() {
    let points = scattered_points(32, 3);
    for linkage in LINKAGES {
        let labels = AgglomerativeClusterer::new(linkage).assign(&points, 4);
        // Points i and i+4 were drawn around the same center
        for i in 0..28 {
            assert_eq!(labels[i], labels[i + 4], "{linkage} point {i}");
        }
        assert_eq!(distinct(&labels), 4);
    }
}

#[test]
fn labels_numbered_by_first_appearance() {
    let points = scattered_points(12, 2);
    let labels = AgglomerativeClusterer::default().assign(&points, 4);
    let mut next = 0;
    for &l in &labels {
        assert!(l <= next, "label {l} appeared before {next}");
        if l == next {
            next += 1;
        }
    }
}

#[test]
fn empty_input_yields_no_labels() {
    let labels = AgglomerativeClusterer::default().assign(&[], 5);
    assert!(labels.is_empty());
}

// ============================================================
// Embedding codec
// ============================================================

#[test]
fn codec_rejects_garbage() {
    assert!(matches!(
        decode_embedding("0.1,abc,0.3"),
        Err(CodecError::InvalidNumber { index: 1, .. })
    ));
    assert!(matches!(
        decode_embedding("0.1,,0.3"),
        Err(CodecError::InvalidNumber { index: 1, .. })
    ));
    assert!(matches!(
        decode_embedding("1,NaN"),
        Err(CodecError::NonFinite { index: 1 })
    ));
}
