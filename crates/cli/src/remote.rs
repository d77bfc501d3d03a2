//! Submitting an intake to a running HTR REST server.

use api_shared::{MessageRes, TreatmentCreatedRes};
use htr_core::{
    Nic, RecordError, RecordResult, TreatmentRecord, TreatmentSubmission, TreatmentSubmitter,
};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// [`TreatmentSubmitter`] that POSTs to `<base_url>/api/treatment/<nic>`.
///
/// Connection failures become [`RecordError::Transport`]; non-2xx answers become
/// [`RecordError::Rejected`] carrying the server's message. Nothing is retried.
#[derive(Debug)]
pub struct HttpSubmitter {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl HttpSubmitter {
    pub fn new(base_url: &str) -> RecordResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RecordError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn treatment_url(&self, patient_nic: &Nic) -> String {
        format!("{}/api/treatment/{}", self.base_url, patient_nic)
    }
}

impl TreatmentSubmitter for HttpSubmitter {
    fn submit(
        &self,
        patient_nic: &Nic,
        submission: TreatmentSubmission,
    ) -> RecordResult<TreatmentRecord> {
        let response = self
            .client
            .post(self.treatment_url(patient_nic))
            .json(&submission)
            .send()
            .map_err(|e| RecordError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            let created: TreatmentCreatedRes = response
                .json()
                .map_err(|e| RecordError::Transport(format!("unreadable response: {}", e)))?;
            return Ok(created.treatment);
        }

        let message = response
            .json::<MessageRes>()
            .map(|body| body.message)
            .unwrap_or_else(|_| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });
        Err(RecordError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use htr_core::ErrorKind;

    #[test]
    fn test_treatment_url_strips_trailing_slash() {
        let submitter = HttpSubmitter::new("http://localhost:3000/").unwrap();
        let nic = Nic::parse("NIC123").unwrap();

        assert_eq!(
            submitter.treatment_url(&nic),
            "http://localhost:3000/api/treatment/NIC123"
        );
    }

    #[test]
    fn test_unreachable_server_is_a_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let submitter = HttpSubmitter::new("http://127.0.0.1:9").unwrap();
        let nic = Nic::parse("NIC123").unwrap();

        let err = submitter
            .submit(&nic, TreatmentSubmission::default())
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Transport);
    }
}
