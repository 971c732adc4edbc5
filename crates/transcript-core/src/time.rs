//! Numeric tolerance and rounding helpers shared by every component.
//!
//! Floating-point timestamps are rounded to 6 decimal places at construction
//! and compared with an epsilon rather than raw equality, matching the
//! tolerance policy set out for this domain.

/// Equality tolerance used once a project is past import, e.g. by store-level
/// invariant checks.
pub const STEADY_STATE_EPSILON: f64 = 1e-3;

/// Minimum duration a segment may have after normalization; anything smaller
/// is dropped rather than kept as a degenerate sliver.
pub const MIN_SEGMENT_DURATION: f64 = 1e-6;

/// Tolerance for "small overlap" trimming during import normalization.
pub const SMALL_OVERLAP_TOLERANCE: f64 = -0.005;

/// Rounds a time value to 6 decimal places, the precision floor every
/// segment time is normalized to at construction.
///
/// # Example
/// ```
/// use transcript_core::time::round6;
///
/// assert_eq!(round6(1.000_000_049), 1.0);
/// ```
pub fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Coverage tolerance for import-mode validation: the smaller of the
/// configured spacer threshold and 0.1s.
///
/// # Example
/// ```
/// use transcript_core::time::import_epsilon;
///
/// assert_eq!(import_epsilon(1.0), 0.1);
/// assert_eq!(import_epsilon(0.05), 0.05);
/// ```
pub fn import_epsilon(spacer_threshold: f64) -> f64 {
    spacer_threshold.min(0.1)
}

/// Whether two times are equal within the steady-state epsilon.
pub fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() <= epsilon
}

/// Converts a clip-relative time to an absolute timeline time.
pub fn clip_to_abs(clip_start: f64, t: f64) -> f64 {
    clip_start + t
}

/// Converts an absolute timeline time to a clip-relative time.
pub fn abs_to_clip(clip_start: f64, t: f64) -> f64 {
    t - clip_start
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round6_truncates_past_six_decimals() {
        assert_eq!(round6(0.123_456_78), 0.123_457);
    }

    #[test]
    fn clip_to_abs_and_abs_to_clip_are_inverses() {
        let clip_start = 12.5;
        let t = 3.25;
        let abs = clip_to_abs(clip_start, t);
        assert_eq!(abs_to_clip(clip_start, abs), t);
    }

    #[test]
    fn approx_eq_respects_epsilon() {
        assert!(approx_eq(1.0, 1.0009, STEADY_STATE_EPSILON));
        assert!(!approx_eq(1.0, 1.01, STEADY_STATE_EPSILON));
    }
}
