use crate::config::LoggerConfig;
use base64::{engine::general_purpose, Engine as _};
use lazy_static::lazy_static;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

lazy_static! {
    static ref EMAIL_REGEX: Option<Regex> =
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").ok();
    static ref PHONE_REGEX: Option<Regex> =
        Regex::new(r"\b(?:\+1[-.\s]?)?\(?([0-9]{3})\)?[-.\s]?([0-9]{3})[-.\s]?([0-9]{4})\b").ok();
}

/// PII redaction configuration
#[derive(Debug, Clone)]
pub struct RedactionConfig {
    pub enabled: bool,
    pub redact_emails: bool,
    pub redact_phones: bool,
    pub hash_for_correlation: bool,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            redact_emails: true,
            redact_phones: true,
            hash_for_correlation: false,
        }
    }
}

impl From<&LoggerConfig> for RedactionConfig {
    fn from(config: &LoggerConfig) -> Self {
        Self {
            enabled: config.redaction_enabled,
            hash_for_correlation: config.hash_for_correlation,
            ..Self::default()
        }
    }
}

/// Masks contact data before it is logged or reported
#[derive(Debug, Clone, Default)]
pub struct PiiRedactor {
    config: RedactionConfig,
}

impl PiiRedactor {
    pub fn new(config: RedactionConfig) -> Self {
        Self { config }
    }

    pub fn from_logger_config(config: &LoggerConfig) -> Self {
        Self::new(RedactionConfig::from(config))
    }

    pub fn redact(&self, text: &str) -> String {
        if !self.config.enabled {
            return text.to_string();
        }

        let mut result = text.to_string();

        // E-mail first: SMS gateway addresses start with the phone number
        if self.config.redact_emails {
            result = self.redact_emails(&result);
        }

        if self.config.redact_phones {
            result = self.redact_phones(&result);
        }

        result
    }

    fn redact_emails(&self, text: &str) -> String {
        replace_all(&EMAIL_REGEX, text, |caps| {
            let email = &caps[0];
            if self.config.hash_for_correlation {
                return format!("EMAIL[{}]", hash_value(email));
            }
            match email.split_once('@') {
                Some((local, domain)) => format!("{}***@{}***", first_char(local), first_char(domain)),
                None => "***@***".to_string(),
            }
        })
    }

    fn redact_phones(&self, text: &str) -> String {
        replace_all(&PHONE_REGEX, text, |caps| {
            if self.config.hash_for_correlation {
                format!("PHONE[{}]", hash_value(&caps[0]))
            } else {
                format!("(***) ***-{}", &caps[3])
            }
        })
    }
}

fn replace_all<F>(pattern: &Option<Regex>, text: &str, replacer: F) -> String
where
    F: FnMut(&Captures) -> String,
{
    match pattern {
        Some(regex) => regex.replace_all(text, replacer).into_owned(),
        None => text.to_string(),
    }
}

fn first_char(value: &str) -> String {
    value.chars().next().map(String::from).unwrap_or_default()
}

fn hash_value(value: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(value.as_bytes());
    let digest = hasher.finalize();
    // First 8 bytes are enough for correlation
    general_purpose::STANDARD.encode(&digest[..8])
}
