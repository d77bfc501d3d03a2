//! Requester identification.
//!
//! Session handling lives outside HTR. Mutating requests carry the authenticated hospital's id
//! in the [`HOSPITAL_ID_HEADER`] header, set by whatever fronts the API.

use htr_core::{RecordError, RecordResult};

/// Header carrying the id of the hospital acting on a request.
pub const HOSPITAL_ID_HEADER: &str = "x-hospital-id";

/// Extracts the requester's hospital id from the raw header value.
///
/// A missing, blank or non-UTF-8 header means there is no hospital session.
pub fn requester_from_header(value: Option<&[u8]>) -> RecordResult<String> {
    value
        .and_then(|raw| std::str::from_utf8(raw).ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .ok_or(RecordError::HospitalSessionMissing)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requester_from_header() {
        assert_eq!(requester_from_header(Some(" H1 ".as_bytes())).unwrap(), "H1");
    }

    #[test]
    fn test_missing_or_blank_header_is_missing_session() {
        assert!(matches!(
            requester_from_header(None),
            Err(RecordError::HospitalSessionMissing)
        ));
        assert!(matches!(
            requester_from_header(Some("   ".as_bytes())),
            Err(RecordError::HospitalSessionMissing)
        ));
        assert!(matches!(
            requester_from_header(Some(&[0xff, 0xfe][..])),
            Err(RecordError::HospitalSessionMissing)
        ));
    }
}
