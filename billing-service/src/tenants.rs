//! Tenants encoded in a customer display name.
//!
//! ```text
//! name    := text* (segment text*)*
//! segment := '[' names ' ' dob ']'
//! names   := token (' ' token)*
//! dob     := MM/DD/YYYY
//! ```
//!
//! e.g. `A101 SMITH [JOHN SMITH 01/02/1990][JANE MARIE SMITH 03/04/1992]`.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

const DOB_LEN: usize = 10;
const DOB_FORMAT: &str = "%m/%d/%Y";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TenantParseError {
    #[error("'[' at position {position} opens a segment inside another segment")]
    UnexpectedOpen { position: usize },

    #[error("']' at position {position} closes no segment")]
    UnexpectedClose { position: usize },

    #[error("segment opened at position {position} is never closed")]
    Unterminated { position: usize },

    #[error("segment '{segment}' does not end with a MM/DD/YYYY date of birth")]
    InvalidDateOfBirth { segment: String },

    #[error("segment '{segment}' has no tenant name")]
    MissingName { segment: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tenant {
    pub full_name: String,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
}

/// All tenants of a customer name, left to right. No segments is an empty list.
pub fn parse_tenants(customer_name: &str) -> Result<Vec<Tenant>, TenantParseError> {
    segments(customer_name)?
        .into_iter()
        .map(parse_segment)
        .collect()
}

/// Bodies of the bracketed segments
fn segments(name: &str) -> Result<Vec<&str>, TenantParseError> {
    let mut found = Vec::new();
    let mut open: Option<(usize, usize)> = None;

    for (position, (offset, ch)) in name.char_indices().enumerate() {
        match (ch, open) {
            ('[', None) => open = Some((position, offset + ch.len_utf8())),
            ('[', Some(_)) => return Err(TenantParseError::UnexpectedOpen { position }),
            (']', Some((_, start))) => {
                found.push(&name[start..offset]);
                open = None;
            }
            (']', None) => return Err(TenantParseError::UnexpectedClose { position }),
            _ => {}
        }
    }

    match open {
        Some((position, _)) => Err(TenantParseError::Unterminated { position }),
        None => Ok(found),
    }
}

fn parse_segment(body: &str) -> Result<Tenant, TenantParseError> {
    let segment = body.trim();
    let invalid_dob = || TenantParseError::InvalidDateOfBirth {
        segment: segment.to_string(),
    };

    let chars: Vec<char> = segment.chars().collect();
    if chars.len() < DOB_LEN {
        return Err(invalid_dob());
    }
    let split = chars.len() - DOB_LEN;
    let dob: String = chars[split..].iter().collect();
    let names: String = chars[..split].iter().collect();

    let date_of_birth = NaiveDate::parse_from_str(&dob, DOB_FORMAT).map_err(|_| invalid_dob())?;

    let full_name = names.trim().to_uppercase();
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    let (first_name, last_name) = match (tokens.first(), tokens.last()) {
        (Some(first), Some(last)) => (first.to_string(), last.to_string()),
        _ => {
            return Err(TenantParseError::MissingName {
                segment: segment.to_string(),
            })
        }
    };
    let middle_name = match tokens.as_slice() {
        [_, middle, _] => Some(middle.to_string()),
        _ => None,
    };

    Ok(Tenant {
        full_name: tokens.join(" "),
        first_name,
        middle_name,
        last_name,
        date_of_birth,
    })
}
