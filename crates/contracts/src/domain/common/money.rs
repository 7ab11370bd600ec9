/// Round a currency amount to paise (two decimals)
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Amounts closer than half a paisa are considered equal
pub fn amounts_equal(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

pub fn ensure_non_negative(field: &str, value: f64) -> Result<(), String> {
    if !value.is_finite() || value < 0.0 {
        return Err(format!("{} must be a non-negative amount", field));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round2() {
        assert_eq!(round2(10.006), 10.01);
        assert_eq!(round2(99.994), 99.99);
        assert_eq!(round2(0.0), 0.0);
    }

    #[test]
    fn test_amounts_equal() {
        assert!(amounts_equal(100.0, 100.004));
        assert!(!amounts_equal(100.0, 100.01));
    }

    #[test]
    fn test_ensure_non_negative() {
        assert!(ensure_non_negative("cash", 0.0).is_ok());
        assert!(ensure_non_negative("cash", -1.0).is_err());
        assert!(ensure_non_negative("cash", f64::NAN).is_err());
    }
}
