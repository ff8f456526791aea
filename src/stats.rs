//!
//! Reduction of a series to min, max and median
//!

/// Summary of a series
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub median: f64,
}

/// Reduce `values` to min, max and median.
///
/// The median of an even number of samples is the mean of the two middle samples.
/// Returns `None` for an empty series, `NaN` samples are ignored.
pub fn summarize<I>(values: I) -> Option<Summary>
where
    I: IntoIterator<Item = f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_by(f64::total_cmp);

    let mid = sorted.len() / 2;
    let median = if sorted.len() % 2 == 0 {
        let (low, high) = (sorted[mid - 1], sorted[mid]);
        // Neither form can overflow for its sign combination
        if low.is_sign_negative() == high.is_sign_negative() {
            low + (high - low) / 2.0
        } else {
            (low + high) / 2.0
        }
    } else {
        sorted[mid]
    };

    Some(Summary {
        min: sorted[0],
        max: sorted[sorted.len() - 1],
        median,
    })
}
