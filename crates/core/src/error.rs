use htr_types::TextError;

/// Coarse classification of a [`RecordError`], used by the API layers to choose status
/// codes and user-facing wording.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any persistence attempt.
    Validation,
    /// The patient or treatment does not exist (or nothing is visible to the caller).
    NotFound,
    /// The caller's hospital may not touch this record.
    Forbidden,
    /// The server could not be reached.
    Transport,
    /// Storage or serialisation failure.
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    InvalidText(#[from] TextError),
    #[error("invalid identifier: {0}")]
    InvalidId(#[from] htr_uuid::UuidError),
    #[error("Hospital ID and name are required")]
    MissingHospitalIdentity,
    #[error("Hospital information is missing. Please log in again.")]
    HospitalSessionMissing,
    #[error("Missing required data: {0}")]
    MissingSection(&'static str),
    #[error("Admission date cannot be in the future.")]
    FutureAdmissionDate,
    #[error("attachment is not an image")]
    NotAnImage,
    #[error("intake is at the {current} stage, not {expected}")]
    StageOrder {
        current: &'static str,
        expected: &'static str,
    },
    #[error("patient with NIC {0} is already registered")]
    PatientAlreadyExists(String),
    #[error("hospital {0} is already registered")]
    HospitalAlreadyExists(String),

    #[error("Patient not found")]
    PatientNotFound,
    #[error("Hospital not found")]
    HospitalNotFound,
    #[error("Treatment not found")]
    TreatmentNotFound,
    #[error("Treatment not found for this NIC")]
    NoTreatmentForNic,
    #[error("No treatments found for this patient that were added by your hospital")]
    NoTreatmentsForHospital,
    #[error("No treatments found for this patient")]
    NoTreatments,

    #[error("You can only modify treatments added by your hospital")]
    NotOwner,
    #[error("Your hospital is not approved to record treatments")]
    HospitalNotApproved,

    #[error("Server not responding. Please try again later. ({0})")]
    Transport(String),
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("failed to create storage directory: {0}")]
    StorageDirCreation(std::io::Error),
    #[error("failed to create record directory: {0}")]
    RecordDirCreation(std::io::Error),
    #[error(
        "create failed and cleanup also failed (path: {path}): create={create_error}; cleanup={cleanup_error}",
        path = path.display()
    )]
    CleanupAfterCreateFailed {
        path: std::path::PathBuf,
        #[source]
        create_error: Box<RecordError>,
        cleanup_error: std::io::Error,
    },
    #[error("failed to write record file: {0}")]
    FileWrite(std::io::Error),
    #[error("failed to read record file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to delete record: {0}")]
    FileDelete(std::io::Error),
    #[error("failed to serialize YAML: {0}")]
    YamlSerialization(serde_yaml::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
    #[error("image storage error: {0}")]
    Files(#[from] htr_files::FilesError),
}

impl RecordError {
    pub fn kind(&self) -> ErrorKind {
        use RecordError::*;
        match self {
            InvalidInput(_)
            | InvalidText(_)
            | InvalidId(_)
            | MissingHospitalIdentity
            | HospitalSessionMissing
            | MissingSection(_)
            | FutureAdmissionDate
            | NotAnImage
            | StageOrder { .. }
            | PatientAlreadyExists(_)
            | HospitalAlreadyExists(_) => ErrorKind::Validation,
            PatientNotFound
            | HospitalNotFound
            | TreatmentNotFound
            | NoTreatmentForNic
            | NoTreatmentsForHospital
            | NoTreatments => ErrorKind::NotFound,
            NotOwner | HospitalNotApproved => ErrorKind::Forbidden,
            Transport(_) => ErrorKind::Transport,
            Rejected { status, .. } => match status {
                400 | 422 => ErrorKind::Validation,
                403 => ErrorKind::Forbidden,
                404 => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            },
            StorageDirCreation(_)
            | RecordDirCreation(_)
            | CleanupAfterCreateFailed { .. }
            | FileWrite(_)
            | FileRead(_)
            | FileDelete(_)
            | YamlSerialization(_)
            | YamlDeserialization(_)
            | Files(_) => ErrorKind::Internal,
        }
    }
}

pub type RecordResult<T> = std::result::Result<T, RecordError>;
