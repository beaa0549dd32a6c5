//! Turkish mobile phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`PhoneNumber`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input contains no digits.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input is not a Turkish mobile number.
    #[error("phone number must be a 10-digit mobile number starting with 5")]
    InvalidFormat,
}

/// A Turkish mobile number in E.164 form (`+905XXXXXXXXX`).
///
/// Accepts the spellings users actually type: `0532 123 45 67`,
/// `90 532 1234567`, `+90 (532) 123-45-67` and bare `5321234567`.
///
/// ```
/// use duct_order_core::PhoneNumber;
///
/// let phone = PhoneNumber::parse("0532 123 45 67").unwrap();
/// assert_eq!(phone.as_str(), "+905321234567");
/// assert_eq!(phone.masked(), "+90*******67");
///
/// assert!(PhoneNumber::parse("0212 123 45 67").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Country calling code prefix.
    pub const COUNTRY_PREFIX: &'static str = "+90";

    /// Parse and normalize a `PhoneNumber`.
    ///
    /// # Errors
    ///
    /// Returns [`PhoneError::Empty`] when the input has no digits and
    /// [`PhoneError::InvalidFormat`] when the remaining national number is
    /// not ten digits starting with `5`.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(PhoneError::Empty);
        }

        // Country code first, then the trunk prefix.
        let national = if digits.len() == 12 {
            digits.strip_prefix("90").unwrap_or(&digits)
        } else if digits.len() == 11 {
            digits.strip_prefix('0').unwrap_or(&digits)
        } else {
            &digits
        };

        if national.len() != 10 || !national.starts_with('5') {
            return Err(PhoneError::InvalidFormat);
        }

        Ok(Self(format!("{}{national}", Self::COUNTRY_PREFIX)))
    }

    /// Returns the E.164 representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the number with all but the last two digits hidden, for logs.
    #[must_use]
    pub fn masked(&self) -> String {
        let tail = self.0.get(self.0.len().saturating_sub(2)..).unwrap_or("");
        format!("{}*******{tail}", Self::COUNTRY_PREFIX)
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for PhoneNumber {
    type Err = PhoneError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for PhoneNumber {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<PhoneNumber> for String {
    fn from(phone: PhoneNumber) -> Self {
        phone.0
    }
}
