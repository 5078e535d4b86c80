//! Axis domains that frame the currently visible points
//!
//! Computed from the filtered records only, never the whole dataset:
//!
//! ```text
//! x (reference representation score): [max(0, 0.9·min), min(1.1, 1.1·max)]
//! y (contamination portion):          [0,                min(1.1, 1.1·max)]
//! ```
//!
//! Missing metrics are skipped. An axis with no usable values, or bounds that
//! come out non-finite or inverted, is reset to [`Domain::FALLBACK`]. The x
//! axis also falls back when every score is the same; the y axis is anchored
//! at 0 and keeps a shared contamination value in frame.

use crate::record::QualityRecord;
use serde::Serialize;

const CEILING: f64 = 1.1;
const LOWER_PAD: f64 = 0.9;
const UPPER_PAD: f64 = 1.1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub const FALLBACK: Domain = Domain { min: 0.0, max: 1.0 };

    /// Accept the bounds only if they are finite and strictly ordered
    fn checked(min: f64, max: f64) -> Domain {
        if min.is_finite() && max.is_finite() && min < max {
            Domain { min, max }
        } else {
            Domain::FALLBACK
        }
    }

    pub fn to_array(self) -> [f64; 2] {
        [self.min, self.max]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AxisBounds {
    pub x: Domain,
    pub y: Domain,
}

/// (min, max) over the present values, None if there are none
fn extent<I: Iterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values.fold(None, |acc, v| match acc {
        None => Some((v, v)),
        Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
    })
}

impl AxisBounds {
    pub fn compute(records: &[&QualityRecord]) -> Self {
        let x = match extent(records.iter().filter_map(|r| r.reference_score)) {
            Some((lo, hi)) if lo < hi => {
                Domain::checked((LOWER_PAD * lo).max(0.0), (UPPER_PAD * hi).min(CEILING))
            }
            _ => Domain::FALLBACK,
        };

        let y = match extent(records.iter().filter_map(|r| r.contamination)) {
            Some((_, hi)) => Domain::checked(0.0, (UPPER_PAD * hi).min(CEILING)),
            None => Domain::FALLBACK,
        };

        Self { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rec(rrs: Option<f64>, cont: Option<f64>) -> QualityRecord {
        let mut r = QualityRecord::new("S1", "m", "kingdom");
        r.reference_score = rrs;
        r.contamination = cont;
        r
    }

    fn bounds(records: &[QualityRecord]) -> AxisBounds {
        let refs: Vec<&QualityRecord> = records.iter().collect();
        AxisBounds::compute(&refs)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_typical_bounds() {
        let b = bounds(&[rec(Some(0.5), Some(0.1)), rec(Some(0.8), Some(0.3))]);
        assert!(close(b.x.min, 0.45));
        assert!(close(b.x.max, 0.88));
        assert_eq!(b.y.min, 0.0);
        assert!(close(b.y.max, 0.33));
    }

    #[test]
    fn test_upper_bound_capped() {
        let b = bounds(&[rec(Some(0.2), Some(0.0)), rec(Some(1.0), Some(1.0))]);
        assert!(close(b.x.max, 1.1));
        assert!(close(b.y.max, 1.1));
    }

    #[test]
    fn test_identical_scores_fall_back() {
        // Every genome scored 0.75: no zero-width domain
        let b = bounds(&[rec(Some(0.75), Some(0.1)), rec(Some(0.75), Some(0.2)), rec(Some(0.75), Some(0.3))]);
        assert_eq!(b.x, Domain::FALLBACK);
        assert!(close(b.y.max, 0.33));
    }

    #[test]
    fn test_shared_contamination_keeps_its_frame() {
        let b = bounds(&[rec(Some(0.5), Some(0.3)), rec(Some(0.8), Some(0.3))]);
        assert_eq!(b.y.min, 0.0);
        assert!(close(b.y.max, 0.33));

        let single = bounds(&[rec(Some(0.6), Some(0.3))]);
        assert_eq!(single.x, Domain::FALLBACK);
        assert!(close(single.y.max, 0.33));
    }

    #[test]
    fn test_all_zero_contamination_falls_back() {
        let b = bounds(&[rec(Some(0.5), Some(0.0)), rec(Some(0.9), Some(0.0))]);
        assert_eq!(b.y, Domain::FALLBACK);
    }

    #[test]
    fn test_missing_values_skipped() {
        let b = bounds(&[rec(Some(0.5), None), rec(None, Some(0.2)), rec(Some(0.9), Some(0.4))]);
        assert!(close(b.x.min, 0.45));
        assert!(close(b.y.max, 0.44));
    }

    #[test]
    fn test_no_usable_values() {
        let b = bounds(&[rec(None, None)]);
        assert_eq!(b.x, Domain::FALLBACK);
        assert_eq!(b.y, Domain::FALLBACK);
    }

    #[test]
    fn test_out_of_range_scores_fall_back() {
        // 0.9 * 2.0 = 1.8 > capped upper 1.1
        let b = bounds(&[rec(Some(2.0), Some(0.1)), rec(Some(3.0), Some(0.2))]);
        assert_eq!(b.x, Domain::FALLBACK);
    }

    proptest! {
        #[test]
        fn prop_bounds_ordered_and_finite(
            values in prop::collection::vec((prop::option::of(-5.0f64..5.0), prop::option::of(-5.0f64..5.0)), 1..40)
        ) {
            let records: Vec<QualityRecord> = values.iter().map(|(x, y)| rec(*x, *y)).collect();
            let b = bounds(&records);
            for d in [b.x, b.y] {
                prop_assert!(d.min.is_finite() && d.max.is_finite());
                prop_assert!(d.min < d.max);
            }
        }
    }
}
