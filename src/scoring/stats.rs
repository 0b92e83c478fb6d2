// Summary statistics over sentiment values.
//
// Values are summed in sorted order so the result does not depend on the
// order articles came out of the store.

/// Arithmetic mean. None for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(ordered_sum(values.iter().copied()) / values.len() as f64)
}

/// Population standard deviation (divides by n). None for an empty slice.
pub fn population_std(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let variance = ordered_sum(values.iter().map(|v| (v - m) * (v - m))) / values.len() as f64;
    Some(variance.sqrt())
}

fn ordered_sum(values: impl Iterator<Item = f64>) -> f64 {
    let mut sorted: Vec<f64> = values.collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    sorted.iter().sum()
}
