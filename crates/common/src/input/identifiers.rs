//! Format checks for external identifiers and codes
//!
//! - ORCID iD: `0000-0002-1825-0097`, last character is an ISO 7064 MOD 11-2 check digit
//! - DOI: `10.<registrant>/<suffix>`
//! - Currency: ISO 4217 alphabetic code

use regex_lite::Regex;
use rust_decimal::Decimal;
use std::borrow::Cow;
use std::sync::OnceLock;
use validator::ValidationError;

fn orcid_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\d{4}-\d{4}-\d{4}-\d{3}[\dX]$").expect("ORCID pattern compiles")
    })
}

fn doi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^10\.\d{4,9}/\S+$").expect("DOI pattern compiles"))
}

fn currency_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z]{3}$").expect("currency pattern compiles"))
}

/// Check digit for the first 15 digits of an ORCID iD
fn orcid_check_digit(digits: &[u32]) -> char {
    let total = digits.iter().fold(0u32, |total, d| (total + d) * 2);
    match (12 - total % 11) % 11 {
        10 => 'X',
        n => char::from_digit(n, 10).unwrap_or('?'),
    }
}

pub fn is_valid_orcid(orcid: &str) -> bool {
    if !orcid_pattern().is_match(orcid) {
        return false;
    }

    let chars: Vec<char> = orcid.chars().filter(|c| *c != '-').collect();
    let Some((check, body)) = chars.split_last() else {
        return false;
    };
    let digits: Vec<u32> = body.iter().filter_map(|c| c.to_digit(10)).collect();

    digits.len() == 15 && orcid_check_digit(&digits) == *check
}

pub fn is_valid_doi(doi: &str) -> bool {
    doi_pattern().is_match(doi)
}

pub fn is_valid_currency(code: &str) -> bool {
    currency_pattern().is_match(code)
}

fn rejection(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn validate_orcid(orcid: &str) -> Result<(), ValidationError> {
    if is_valid_orcid(orcid) {
        Ok(())
    } else {
        Err(rejection("orcid", "ORCID iD is malformed or fails its checksum"))
    }
}

pub fn validate_doi(doi: &str) -> Result<(), ValidationError> {
    if is_valid_doi(doi) {
        Ok(())
    } else {
        Err(rejection("doi", "DOI must look like 10.<registrant>/<suffix>"))
    }
}

pub fn validate_currency(code: &str) -> Result<(), ValidationError> {
    if is_valid_currency(code) {
        Ok(())
    } else {
        Err(rejection("currency", "currency must be a three-letter ISO 4217 code"))
    }
}

pub fn validate_non_negative(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        Err(rejection("amount", "monetary amounts cannot be negative"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orcid_checksum() {
        assert!(is_valid_orcid("0000-0002-1825-0097"));
        assert!(is_valid_orcid("0000-0001-5109-3700"));
        assert!(is_valid_orcid("0000-0002-1694-233X"));

        assert!(!is_valid_orcid("0000-0002-1825-0098"));
        assert!(!is_valid_orcid("0000000218250097"));
        assert!(!is_valid_orcid("0000-0002-1825-009"));
    }

    #[test]
    fn test_doi_format() {
        assert!(is_valid_doi("10.1000/182"));
        assert!(is_valid_doi("10.1038/nphys1170"));
        assert!(!is_valid_doi("11.1000/182"));
        assert!(!is_valid_doi("10.10/182"));
        assert!(!is_valid_doi("10.1000/"));
    }

    #[test]
    fn test_currency_code() {
        assert!(is_valid_currency("EUR"));
        assert!(!is_valid_currency("eur"));
        assert!(!is_valid_currency("EURO"));
    }

    #[test]
    fn test_non_negative_amount() {
        assert!(validate_non_negative(&Decimal::new(10000, 2)).is_ok());
        assert!(validate_non_negative(&Decimal::ZERO).is_ok());
        assert!(validate_non_negative(&Decimal::new(-1, 2)).is_err());
    }
}
