use crate::SltmError;

/// Floating point type used throughout system
pub type Real = f64;

/// Flows (pcu/h) below this are treated as zero when used as a divisor.
pub const NEGLIGIBLE_FLOW: Real = 1e-10;

/// One tolerance for everything
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SltmError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SltmError::NonFinite { what, value: v })
    }
}

/// `num / den`, or `neutral` when the divisor is numerically negligible.
#[inline]
pub fn safe_ratio(num: Real, den: Real, neutral: Real) -> Real {
    if den.abs() <= NEGLIGIBLE_FLOW {
        neutral
    } else {
        num / den
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn safe_ratio_neutral_on_zero() {
        assert_eq!(safe_ratio(5.0, 0.0, 1.0), 1.0);
        assert_eq!(safe_ratio(5.0, 1e-14, 1.0), 1.0);
        assert_eq!(safe_ratio(1.0, 4.0, 1.0), 0.25);
    }

    proptest::proptest! {
        #[test]
        fn nearly_equal_is_symmetric(a in -1e6f64..1e6, b in -1e6f64..1e6) {
            let tol = Tolerances::default();
            proptest::prop_assert_eq!(nearly_equal(a, b, tol), nearly_equal(b, a, tol));
        }

        #[test]
        fn safe_ratio_is_finite_for_finite_inputs(num in -1e9f64..1e9, den in -1e9f64..1e9) {
            proptest::prop_assert!(safe_ratio(num, den, 1.0).is_finite());
        }
    }
}
