/// Strip everything except digits; a leading "+" country prefix is dropped with it
pub fn normalize_phone(raw: &str) -> String {
    raw.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Phone numbers must carry 10 to 15 digits after normalization
pub fn validate_phone(raw: &str) -> Result<String, String> {
    let digits = normalize_phone(raw);
    if digits.len() < 10 || digits.len() > 15 {
        return Err(format!(
            "Phone number must contain 10 to 15 digits, got '{}'",
            raw.trim()
        ));
    }
    Ok(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("+91 98765-43210"), "919876543210");
        assert_eq!(normalize_phone("(022) 555 0100"), "0225550100");
    }

    #[test]
    fn test_validate_phone() {
        assert_eq!(validate_phone("98765 43210").unwrap(), "9876543210");
        assert!(validate_phone("12345").is_err());
        assert!(validate_phone("1234567890123456").is_err());
    }
}
