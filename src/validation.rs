use lazy_static::lazy_static;
use regex::Regex;

use crate::error::AppError;

pub fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Trim and lower-case, then reject anything that is not an address.
pub fn normalize_email(raw: &str) -> Result<String, AppError> {
    let email = raw.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email"));
    }
    Ok(email)
}

/// Trims `raw` and checks its length in characters (not bytes).
pub fn bounded_text(raw: &str, field: &str, min: usize, max: usize) -> Result<String, AppError> {
    let text = raw.trim();
    let len = text.chars().count();
    if len < min {
        return Err(AppError::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    if len > max {
        return Err(AppError::validation(format!(
            "{field} must be at most {max} characters"
        )));
    }
    Ok(text.to_string())
}

/// Empty or whitespace-only optional fields are treated as absent.
pub fn optional_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(is_valid_email("u@example.com"));
        assert!(!is_valid_email("u@example"));
        assert!(!is_valid_email("u example@x.it"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn normalize_lowercases() {
        assert_eq!(normalize_email("  Mario@Scuola.IT ").unwrap(), "mario@scuola.it");
        assert!(normalize_email("nope").is_err());
    }

    #[test]
    fn bounded_text_counts_chars() {
        // 20 two-byte characters
        let accented = "è".repeat(20);
        assert_eq!(bounded_text(&accented, "content", 20, 600).unwrap(), accented);
        assert!(bounded_text(&"a".repeat(19), "content", 20, 600).is_err());
        assert!(bounded_text(&"a".repeat(601), "content", 20, 600).is_err());
        assert!(bounded_text(&format!("   {}   ", "a".repeat(19)), "content", 20, 600).is_err());
    }

    #[test]
    fn blank_optional_is_none() {
        assert_eq!(optional_text(Some("  ".into())), None);
        assert_eq!(optional_text(Some(" x ".into())), Some("x".into()));
        assert_eq!(optional_text(None), None);
    }
}
