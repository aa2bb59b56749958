//! Score post-processing: softmax and top-k extraction.

use std::cmp::Ordering;

use bst_common::TopPredictions;

/// Number of top classes returned per batch row, capped at the class
/// count.
pub const TOP_K: usize = 5;

/// Numerically stable softmax along the class axis: the per-row max
/// is subtracted before exponentiation.
pub fn softmax(scores: &[Vec<f32>]) -> Vec<Vec<f32>> {
    scores
        .iter()
        .map(|row| {
            let max = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);
            let exps: Vec<f32> = row.iter().map(|&score| (score - max).exp()).collect();
            let sum: f32 = exps.iter().sum();
            exps.iter().map(|&e| e / sum).collect()
        })
        .collect()
}

fn rank(probs: &[f32]) -> impl Fn(&usize, &usize) -> Ordering + '_ {
    move |&a, &b| {
        probs[b]
            .partial_cmp(&probs[a])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    }
}

/// Select the k highest-probability classes per row.
///
/// Selection is partial for k < n_classes; the selected elements are
/// always sorted afterwards, so the output is fully descending with
/// ties keeping the lower class index first.
pub fn top_k(probabilities: &[Vec<f32>], k: usize) -> TopPredictions {
    let mut indices = Vec::with_capacity(probabilities.len());
    let mut top_probs = Vec::with_capacity(probabilities.len());

    for row in probabilities {
        let k = k.min(row.len());
        let mut order: Vec<usize> = (0..row.len()).collect();

        if k > 0 && k < order.len() {
            order.select_nth_unstable_by(k - 1, rank(row));
            order.truncate(k);
        }
        order.sort_by(rank(row));

        top_probs.push(order.iter().map(|&i| row[i]).collect());
        indices.push(order);
    }

    TopPredictions {
        indices,
        probabilities: top_probs,
    }
}
