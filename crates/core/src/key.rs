//! Phone key normalization.
//!
//! The normalized key is used directly as a filesystem directory name and as
//! the metadata primary key, so its alphabet is restricted to an optional
//! leading `+` followed by ASCII digits. Two inputs that normalize
//! identically address the same record; that collision is intentional
//! deduplication, not a defect.

use crate::{StorageError, StorageResult};

/// Canonical, filesystem-and-metadata-safe identifier for one phone record.
///
/// Invariant: matches `^\+?[0-9]+$`. Computed fresh from raw input on every
/// request and never persisted on its own.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneKey(String);

impl PhoneKey {
    /// Normalizes a raw phone input into a safe storage key.
    ///
    /// Trims the input, remembers whether the first character is `+`, strips
    /// everything that is not an ASCII digit and re-attaches the `+` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidKey`] when the input is blank or
    /// contains no digits.
    pub fn normalize(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(StorageError::InvalidKey("phone is required".into()));
        }

        let has_plus = trimmed.starts_with('+');
        let digits: String = trimmed.chars().filter(char::is_ascii_digit).collect();
        if digits.is_empty() {
            return Err(StorageError::InvalidKey(
                "phone must contain digits".into(),
            ));
        }

        Ok(Self(if has_plus {
            format!("+{digits}")
        } else {
            digits
        }))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PhoneKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_formatting() {
        assert_eq!(
            PhoneKey::normalize("+1 (202) 555-0100").unwrap().as_str(),
            "+12025550100"
        );
        assert_eq!(
            PhoneKey::normalize("202.555.0100").unwrap().as_str(),
            "2025550100"
        );
    }

    #[test]
    fn normalize_keeps_plus_only_when_leading() {
        assert_eq!(PhoneKey::normalize("+40 721").unwrap().as_str(), "+40721");
        assert_eq!(PhoneKey::normalize("40+721").unwrap().as_str(), "40721");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in ["+1 (202) 555-0100", "202.555.0100", "  +373 69 123 456 "] {
            let once = PhoneKey::normalize(raw).unwrap();
            let twice = PhoneKey::normalize(once.as_str()).unwrap();
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn normalize_rejects_blank_input() {
        assert!(matches!(
            PhoneKey::normalize(""),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            PhoneKey::normalize("   "),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn normalize_rejects_input_without_digits() {
        assert!(matches!(
            PhoneKey::normalize("abc"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            PhoneKey::normalize("+"),
            Err(StorageError::InvalidKey(_))
        ));
    }

    #[test]
    fn normalized_key_is_filesystem_safe() {
        let key = PhoneKey::normalize("../+1 (202) 555-0100/..").unwrap();
        assert_eq!(key.as_str(), "12025550100");
        assert!(key.as_str().chars().all(|c| c.is_ascii_digit() || c == '+'));
    }
}
