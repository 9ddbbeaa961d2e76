//! GS1 identifiers used by market participants and accounting points.
//!
//! Both identifiers are fixed-length digit strings whose last digit is a GS1
//! mod-10 check digit computed over the preceding digits.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use marketroles_core::{DomainError, ValueObject};

const GSRN_LENGTH: usize = 18;
const GLN_LENGTH: usize = 13;

/// Accounting point identifier (Global Service Relation Number, 18 digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Gsrn(String);

/// Market participant identifier (Global Location Number, 13 digits).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GlnNumber(String);

/// Whether `value` is `length` ASCII digits ending in a valid GS1 check digit.
fn has_valid_check_digit(value: &str, length: usize) -> bool {
    if value.len() != length || !value.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (body, check) = value.split_at(length - 1);
    let expected = gs1_check_digit(body);
    check.as_bytes()[0] - b'0' == expected
}

/// GS1 mod-10: weights 3,1,3,1… from the rightmost body digit.
fn gs1_check_digit(body: &str) -> u8 {
    let sum: u32 = body
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let digit = u32::from(b - b'0');
            if i % 2 == 0 { digit * 3 } else { digit }
        })
        .sum();
    ((10 - sum % 10) % 10) as u8
}

macro_rules! impl_gs1_identifier {
    ($t:ident, $length:expr, $name:literal) => {
        impl $t {
            pub fn parse(value: &str) -> Result<Self, DomainError> {
                let value = value.trim();
                if Self::is_valid(value) {
                    Ok(Self(value.to_string()))
                } else {
                    Err(DomainError::invalid_id(format!(
                        "{}: '{}' is not a valid {}-digit GS1 number",
                        $name, value, $length
                    )))
                }
            }

            pub fn is_valid(value: &str) -> bool {
                has_valid_check_digit(value, $length)
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ValueObject for $t {}

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_gs1_identifier!(Gsrn, GSRN_LENGTH, "Gsrn");
impl_gs1_identifier!(GlnNumber, GLN_LENGTH, "GlnNumber");
