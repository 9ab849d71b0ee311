//! Step size selection for Frank-Wolfe.

/// Root of a non decreasing function on `[lower, upper]` by bisection.
///
/// Returns `lower` if `f(lower) >= 0` and `upper` if `f(upper) <= 0`.
/// Otherwise the interval is halved until it is no wider than `tolerance`.
pub fn bisection_method(mut f: impl FnMut(f64) -> f64, mut lower: f64, mut upper: f64, tolerance: f64) -> f64 {
    assert!(lower <= upper);
    assert!(tolerance > 0.0);

    let at_lower = f(lower);
    assert!(!at_lower.is_nan(), "line search function is NaN at {}", lower);
    if at_lower >= 0.0 {
        return lower;
    }
    let at_upper = f(upper);
    assert!(!at_upper.is_nan(), "line search function is NaN at {}", upper);
    if at_upper <= 0.0 {
        return upper;
    }

    while upper - lower > tolerance {
        let middle = 0.5 * (lower + upper);
        let value = f(middle);
        assert!(!value.is_nan(), "line search function is NaN at {}", middle);
        if value == 0.0 {
            return middle;
        } else if value < 0.0 {
            lower = middle;
        } else {
            upper = middle;
        }
    }

    0.5 * (lower + upper)
}
