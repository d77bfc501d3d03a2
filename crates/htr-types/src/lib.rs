//! Validated text types shared across the HTR crates.
//!
//! Each type here is a thin wrapper around `String` that guarantees its invariant once
//! constructed, so downstream code can use the value for storage paths and lookups without
//! re-checking it.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// The input is not a usable national identity card number
    #[error("invalid NIC '{0}': expected 1-20 ASCII letters or digits")]
    InvalidNic(String),

    /// The input is not a usable hospital identifier
    #[error("invalid hospital id '{0}': expected 1-64 ASCII letters, digits, '-' or '_'")]
    InvalidHospitalId(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The input is automatically trimmed of leading and trailing whitespace during construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed of leading and trailing whitespace. If the trimmed
    /// result is empty, an error is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A patient's national identity card number.
///
/// NICs double as file names in the patient directory, so the accepted alphabet is kept to
/// ASCII letters and digits. Surrounding whitespace is trimmed; case is preserved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Nic(String);

impl Nic {
    const MAX_LEN: usize = 20;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN || !trimmed.bytes().all(|b| b.is_ascii_alphanumeric()) {
            return Err(TextError::InvalidNic(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a registered hospital (for example `H0001`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HospitalId(String);

impl HospitalId {
    const MAX_LEN: usize = 64;

    pub fn parse(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        let ok = trimmed.len() <= Self::MAX_LEN
            && trimmed
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if !ok {
            return Err(TextError::InvalidHospitalId(trimmed.to_owned()));
        }
        Ok(Self(trimmed.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! string_newtype_impls {
    ($ty:ident, $ctor:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = TextError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $ty::$ctor(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::$ctor(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

string_newtype_impls!(NonEmptyText, new);
string_newtype_impls!(Nic, parse);
string_newtype_impls!(HospitalId, parse);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  Dr. A  ").unwrap();
        assert_eq!(text.as_str(), "Dr. A");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
    }

    #[test]
    fn test_nic_accepts_alphanumeric() {
        assert_eq!(Nic::parse(" 123456789V ").unwrap().as_str(), "123456789V");
        assert_eq!(Nic::parse("NIC123").unwrap().to_string(), "NIC123");
    }

    #[test]
    fn test_nic_rejects_path_characters() {
        assert!(matches!(Nic::parse("../etc"), Err(TextError::InvalidNic(_))));
        assert!(matches!(Nic::parse("NIC 123"), Err(TextError::InvalidNic(_))));
        assert!(matches!(
            Nic::parse("123456789012345678901"),
            Err(TextError::InvalidNic(_))
        ));
        assert_eq!(Nic::parse(""), Err(TextError::Empty));
    }

    #[test]
    fn test_hospital_id_allows_dash_and_underscore() {
        assert!(HospitalId::parse("H0001").is_ok());
        assert!(HospitalId::parse("general-hospital_2").is_ok());
        assert!(matches!(
            HospitalId::parse("H1/../H2"),
            Err(TextError::InvalidHospitalId(_))
        ));
    }

    #[test]
    fn test_serde_uses_plain_strings() {
        let nic = Nic::parse("NIC123").unwrap();
        let json = serde_json::to_string(&nic).unwrap();
        assert_eq!(json, "\"NIC123\"");

        let back: Nic = serde_json::from_str(&json).unwrap();
        assert_eq!(back, nic);

        let bad: Result<HospitalId, _> = serde_json::from_str("\"a b\"");
        assert!(bad.is_err());
    }
}
