pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Which password rules a candidate satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordRequirements {
    pub long_enough: bool,
    pub has_uppercase: bool,
    pub has_lowercase: bool,
    pub has_digit: bool,
}

impl PasswordRequirements {
    pub fn check(password: &str) -> Self {
        Self {
            long_enough: password.chars().count() >= MIN_PASSWORD_LENGTH,
            has_uppercase: password.chars().any(char::is_uppercase),
            has_lowercase: password.chars().any(char::is_lowercase),
            has_digit: password.chars().any(|c| c.is_ascii_digit()),
        }
    }

    pub fn is_satisfied(&self) -> bool {
        self.long_enough && self.has_uppercase && self.has_lowercase && self.has_digit
    }

    pub fn unmet(&self) -> Vec<&'static str> {
        [
            (self.long_enough, "At least 8 characters"),
            (self.has_uppercase, "One uppercase letter"),
            (self.has_lowercase, "One lowercase letter"),
            (self.has_digit, "One number"),
        ]
        .into_iter()
        .filter(|(met, _)| !met)
        .map(|(_, label)| label)
        .collect()
    }
}

/// Leading integer of the input, accepted only when strictly positive.
///
/// Trailing garbage is ignored, so `"120 coins"` and `"12.5"` both parse.
pub fn parse_price(raw: &str) -> Option<i64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    if negative || value <= 0 {
        return None;
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_rules() {
        let weak = PasswordRequirements::check("abc");
        assert!(!weak.is_satisfied());
        assert_eq!(
            weak.unmet(),
            vec!["At least 8 characters", "One uppercase letter", "One number"]
        );

        assert!(PasswordRequirements::check("Witcher3Wild").is_satisfied());
    }

    #[test]
    fn price_parsing() {
        assert_eq!(parse_price("250"), Some(250));
        assert_eq!(parse_price("  120 coins"), Some(120));
        assert_eq!(parse_price("12.5"), Some(12));
        assert_eq!(parse_price("+7"), Some(7));
        assert_eq!(parse_price("0"), None);
        assert_eq!(parse_price("-5"), None);
        assert_eq!(parse_price(""), None);
        assert_eq!(parse_price("abc"), None);
        assert_eq!(parse_price("99999999999999999999"), None);
    }
}
