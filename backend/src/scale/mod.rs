//! Y-axis scaling for bar charts.
//!
//! The axis tops out at the data maximum rounded up to a multiple of its
//! leading order of magnitude, and ticks every order of magnitude:
//!
//! ```text
//! max value   magnitude   upper bound   step
//!      4200        1000          5000   1000
//!       999         100          1000    100
//!        10          10            10     10
//! ```
//!
//! Series values are integer sums, so everything here is exact integer
//! arithmetic; there is no `log10` rounding to worry about.

use serde::{Deserialize, Serialize};

use crate::aggregate::Series;

/// `10^floor(log10(v))`, or `None` for 0.
pub fn magnitude(v: u64) -> Option<u64> {
    if v == 0 {
        return None;
    }
    let mut m = 1u64;
    while m <= v / 10 {
        m *= 10;
    }
    Some(m)
}

/// Smallest multiple of `magnitude(v)` that is `>= v`.
///
/// `None` for 0, and when the bound does not fit in a `u64`.
pub fn upper_bound(v: u64) -> Option<u64> {
    let m = magnitude(v)?;
    v.div_ceil(m).checked_mul(m)
}

/// Tick spacing for an axis whose data maximum is `v`.
pub fn step_size(v: u64) -> Option<u64> {
    magnitude(v)
}

/// Y-axis maximum and tick step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub max: u64,
    pub step: u64,
}

impl AxisBounds {
    /// Bounds used when there is nothing positive to scale to.
    pub const DEFAULT: AxisBounds = AxisBounds { max: 10, step: 1 };

    /// Bounds for a data maximum. Zero, negative and overflowing maxima get
    /// [`AxisBounds::DEFAULT`].
    pub fn from_max(max: i64) -> Self {
        let Ok(v) = u64::try_from(max) else {
            return Self::DEFAULT;
        };
        match (upper_bound(v), step_size(v)) {
            (Some(max), Some(step)) => AxisBounds { max, step },
            _ => Self::DEFAULT,
        }
    }

    /// Bounds for the largest value of a series.
    pub fn for_series(series: &Series) -> Self {
        series
            .max_value()
            .map(Self::from_max)
            .unwrap_or(Self::DEFAULT)
    }
}

impl Default for AxisBounds {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::SeriesPoint;
    use proptest::prelude::*;

    #[test]
    fn test_known_values() {
        assert_eq!(upper_bound(4200), Some(5000));
        assert_eq!(step_size(4200), Some(1000));
        assert_eq!(upper_bound(999), Some(1000));
        assert_eq!(step_size(999), Some(100));
    }

    #[test]
    fn test_exact_powers_of_ten() {
        assert_eq!(upper_bound(1), Some(1));
        assert_eq!(upper_bound(10), Some(10));
        assert_eq!(step_size(10), Some(10));
        assert_eq!(upper_bound(1000), Some(1000));
        assert_eq!(step_size(1000), Some(1000));
    }

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(upper_bound(0), None);
        assert_eq!(step_size(0), None);
        assert_eq!(AxisBounds::from_max(0), AxisBounds::DEFAULT);
        assert_eq!(AxisBounds::from_max(-5), AxisBounds::DEFAULT);
    }

    #[test]
    fn test_overflow_falls_back() {
        assert_eq!(upper_bound(u64::MAX), None);
        assert_eq!(AxisBounds::from_max(i64::MAX), AxisBounds { max: 10_000_000_000_000_000_000, step: 1_000_000_000_000_000_000 });
    }

    #[test]
    fn test_bounds_for_series() {
        let series = Series::from_points(vec![
            SeriesPoint::new("2019", 3100),
            SeriesPoint::new("2020", 4200),
        ]);
        assert_eq!(AxisBounds::for_series(&series), AxisBounds { max: 5000, step: 1000 });

        assert_eq!(AxisBounds::for_series(&Series::default()), AxisBounds::DEFAULT);

        let zeros = Series::from_points(vec![SeriesPoint::new("2019", 0)]);
        assert_eq!(AxisBounds::for_series(&zeros), AxisBounds::DEFAULT);
    }

    proptest! {
        #[test]
        fn prop_bound_covers_value(v in 1u64..=1_000_000_000_000_000_000) {
            let bound = upper_bound(v).unwrap();
            let step = step_size(v).unwrap();
            prop_assert!(bound >= v);
            prop_assert!(step <= bound);
            prop_assert_eq!(bound % step, 0);
        }

        #[test]
        fn prop_bound_is_tight(v in 1u64..=1_000_000_000_000_000_000) {
            let bound = upper_bound(v).unwrap();
            let step = step_size(v).unwrap();
            prop_assert!(bound - step < v);
        }
    }
}
