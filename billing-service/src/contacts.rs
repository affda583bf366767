use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref CONTACT_EMAIL: Option<Regex> =
        Regex::new(r"(?i)\b[A-Z0-9._-]+@[A-Z0-9][A-Z0-9.-]{0,61}[A-Z0-9]\.[A-Z.]{2,6}\b").ok();
}

/// First e-mail address in a free-text address line, upper-cased.
///
/// Address lines double as SMS endpoints (`5551234567@vtext.com`), so any
/// other text on the line is ignored.
pub fn extract_email(text: &str) -> Option<String> {
    let normalized = text.trim().to_uppercase();
    let pattern = CONTACT_EMAIL.as_ref()?;
    pattern.find(&normalized).map(|found| found.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finds_address_in_free_text() {
        assert_eq!(
            extract_email(" text: 5551234567@vtext.com (mom) "),
            Some("5551234567@VTEXT.COM".to_string())
        );
        assert_eq!(
            extract_email("jane.doe@mail.example.org"),
            Some("JANE.DOE@MAIL.EXAMPLE.ORG".to_string())
        );
    }

    #[test]
    fn test_no_address() {
        assert_eq!(extract_email("123 Main St"), None);
        assert_eq!(extract_email(""), None);
        assert_eq!(extract_email("someone@localhost"), None);
    }
}
