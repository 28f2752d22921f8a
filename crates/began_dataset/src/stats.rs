//! Dataset summaries and range checks.

use crate::types::{DatasetError, DatasetResult, DatasetSummary, ImageTensor};

pub fn summarize(tensor: &ImageTensor) -> DatasetSummary {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    let mut sum = 0.0f64;
    let mut finite = 0usize;
    let mut non_finite = 0usize;
    for &v in tensor.as_slice() {
        if !v.is_finite() {
            non_finite += 1;
            continue;
        }
        min = min.min(v);
        max = max.max(v);
        sum += v as f64;
        finite += 1;
    }
    if finite == 0 {
        min = 0.0;
        max = 0.0;
    }
    DatasetSummary {
        count: tensor.count(),
        resolution: tensor.resolution(),
        min,
        max,
        mean: (sum / finite.max(1) as f64) as f32,
        non_finite,
    }
}

/// Fail when any value is non-finite or falls outside `[lo, hi]`.
pub fn validate_range(summary: &DatasetSummary, lo: f32, hi: f32) -> DatasetResult<()> {
    if summary.non_finite > 0 {
        return Err(DatasetError::Shape(format!(
            "{} non-finite values in dataset",
            summary.non_finite
        )));
    }
    if summary.count > 0 && (summary.min < lo || summary.max > hi) {
        return Err(DatasetError::Shape(format!(
            "values span [{:.3}, {:.3}], outside [{lo}, {hi}]",
            summary.min, summary.max
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_ignores_non_finite_values() {
        let t = ImageTensor::new(vec![-1.0, 0.5, f32::NAN], [1, 1, 1, 3]).unwrap();
        let s = summarize(&t);
        assert_eq!(s.min, -1.0);
        assert_eq!(s.max, 0.5);
        assert_eq!(s.non_finite, 1);
        assert!(validate_range(&s, -1.0, 1.0).is_err());
    }

    #[test]
    fn range_check_flags_out_of_bounds() {
        let t = ImageTensor::new(vec![-1.0, 0.0, 1.5], [1, 1, 1, 3]).unwrap();
        let s = summarize(&t);
        assert!(validate_range(&s, -1.0, 1.0).is_err());
        assert!(validate_range(&s, -1.0, 2.0).is_ok());
    }
}
