//! Shared data types for the PhoneVault record system.
//!
//! This crate defines the caller-facing metadata shape ([`PhoneDetails`]),
//! its closed enumerated code sets ([`Currency`], [`Finished`]), the
//! structured service-flags sub-object ([`Services`]) and the field
//! constraints the HTTP layer enforces before anything reaches storage.
//!
//! Enumerated codes are persisted as their symbolic names; parsing back is
//! strict so that an unrecognised stored string surfaces as
//! [`InvalidEnumValue`] instead of silently becoming free-form text.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;

/// Maximum lengths and ranges enforced by [`PhoneDetails::validate`].
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_ADDRESS_LEN: usize = 500;
pub const MAX_COMMENT_LEN: usize = 5000;
pub const MAX_SOURCE_URL_LEN: usize = 2000;
pub const MAX_PRICE_INTEGER_DIGITS: usize = 12;
pub const MAX_PRICE_FRACTION_DIGITS: u32 = 2;

/// A stored enumerated value that does not match any known symbolic name.
///
/// Defensive against store corruption; not expected in normal operation.
#[derive(Debug, thiserror::Error)]
#[error("unrecognised {kind} value: {value}")]
pub struct InvalidEnumValue {
    pub kind: &'static str,
    pub value: String,
}

/// A field constraint violation in caller-supplied metadata.
#[derive(Debug, thiserror::Error)]
pub enum DetailsError {
    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },
    #[error("price must not be negative")]
    NegativePrice,
    #[error("price exceeds {MAX_PRICE_INTEGER_DIGITS} integer digits")]
    PriceTooLarge,
    #[error("price exceeds {MAX_PRICE_FRACTION_DIGITS} fraction digits")]
    PriceTooPrecise,
    #[error("rating must be between 1 and 5")]
    RatingOutOfRange,
}

/// Currency code for a record's price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Mdl,
    Eur,
    Usd,
}

impl Currency {
    /// Symbolic name used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Mdl => "MDL",
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }
}

impl FromStr for Currency {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MDL" => Ok(Currency::Mdl),
            "EUR" => Ok(Currency::Eur),
            "USD" => Ok(Currency::Usd),
            other => Err(InvalidEnumValue {
                kind: "currency",
                value: other.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Completion-state code for a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Finished {
    Yes,
    No,
    Partially,
    Hand,
    Ora,
}

impl Finished {
    /// Symbolic name used for persistence.
    pub fn as_str(&self) -> &'static str {
        match self {
            Finished::Yes => "YES",
            Finished::No => "NO",
            Finished::Partially => "PARTIALLY",
            Finished::Hand => "HAND",
            Finished::Ora => "ORA",
        }
    }
}

impl FromStr for Finished {
    type Err = InvalidEnumValue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "YES" => Ok(Finished::Yes),
            "NO" => Ok(Finished::No),
            "PARTIALLY" => Ok(Finished::Partially),
            "HAND" => Ok(Finished::Hand),
            "ORA" => Ok(Finished::Ora),
            other => Err(InvalidEnumValue {
                kind: "finished",
                value: other.to_owned(),
            }),
        }
    }
}

impl std::fmt::Display for Finished {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured service flags attached to a record.
///
/// Stored as a compact JSON string inside the record entity and decoded
/// symmetrically on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Services {
    pub owc: Option<bool>,
    pub ana: Option<bool>,
}

/// Caller-supplied metadata for one phone record.
///
/// Every field is optional; an upsert overwrites all of them, so a field the
/// caller omits is written as absent rather than left untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PhoneDetails {
    pub description: Option<String>,
    #[schema(value_type = Option<String>)]
    pub price: Option<Decimal>,
    pub currency: Option<Currency>,
    pub address: Option<String>,
    pub services: Option<Services>,
    pub comment: Option<String>,
    pub visited: Option<bool>,
    pub rating: Option<u8>,
    pub finished: Option<Finished>,
    pub source_url: Option<String>,
}

impl PhoneDetails {
    /// Checks the field constraints the HTTP layer promises the storage core.
    pub fn validate(&self) -> Result<(), DetailsError> {
        check_len(self.description.as_deref(), "description", MAX_DESCRIPTION_LEN)?;
        check_len(self.address.as_deref(), "address", MAX_ADDRESS_LEN)?;
        check_len(self.comment.as_deref(), "comment", MAX_COMMENT_LEN)?;
        check_len(self.source_url.as_deref(), "source_url", MAX_SOURCE_URL_LEN)?;

        if let Some(price) = self.price {
            if price.is_sign_negative() {
                return Err(DetailsError::NegativePrice);
            }
            if price.normalize().scale() > MAX_PRICE_FRACTION_DIGITS {
                return Err(DetailsError::PriceTooPrecise);
            }
            let integer_digits = price.trunc().abs().to_string().len();
            if integer_digits > MAX_PRICE_INTEGER_DIGITS {
                return Err(DetailsError::PriceTooLarge);
            }
        }

        if let Some(rating) = self.rating {
            if !(1..=5).contains(&rating) {
                return Err(DetailsError::RatingOutOfRange);
            }
        }

        Ok(())
    }
}

fn check_len(value: Option<&str>, field: &'static str, max: usize) -> Result<(), DetailsError> {
    match value {
        Some(v) if v.chars().count() > max => Err(DetailsError::TooLong { field, max }),
        _ => Ok(()),
    }
}
