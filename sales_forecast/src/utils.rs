//! Utility functions for the sales_forecast crate

/// Normalize a join key: trim surrounding whitespace, treat blank as missing
pub fn normalize_key(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Round a value to a fixed number of decimals
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Mean of a slice, `None` when empty
pub(crate) fn mean_of(values: &[f64]) -> Option<f64> {
    panel_math::stats::mean(values).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_key() {
        assert_eq!(normalize_key(Some("  P1 ")), Some("P1".to_string()));
        assert_eq!(normalize_key(Some("   ")), None);
        assert_eq!(normalize_key(None), None);
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(12.3456, 2), 12.35);
        assert_eq!(round_to(-0.004, 2), -0.0);
        assert_eq!(round_to(7.0, 0), 7.0);
    }
}
