//! Recipient phone-number normalization.

use crate::error::{Error, Result};

/// Domain suffix for individual chats.
pub const CHAT_SUFFIX: &str = "@c.us";

/// Default country code prefixed onto bare 10-digit numbers. A deployment
/// assumption, not a universal rule — override it via configuration.
pub const DEFAULT_COUNTRY_CODE: &str = "91";

/// Canonicalize a raw phone number: strip everything that is not a digit,
/// and prefix `country_code` when exactly 10 digits remain. Longer inputs
/// pass through digits-only.
pub fn normalize_number(raw: &str, country_code: &str) -> Result<String> {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(Error::invalid_argument(format!(
            "number contains no digits: {raw:?}"
        )));
    }
    if digits.len() == 10 {
        Ok(format!("{country_code}{digits}"))
    } else {
        Ok(digits)
    }
}

/// Chat address for a normalized number.
#[must_use]
pub fn chat_address(number: &str) -> String {
    format!("{number}{CHAT_SUFFIX}")
}
