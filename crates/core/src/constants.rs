//! Constants used throughout the HTR core crate.
//!
//! This module contains all path and filename constants to ensure
//! consistency across the codebase and make maintenance easier.

/// Default directory for record storage when no explicit directory is configured.
pub const DEFAULT_DATA_DIR: &str = "htr_data";

/// Directory name for the patient directory (one YAML file per NIC).
pub const PATIENTS_DIR_NAME: &str = "patients";

/// Directory name for the hospital directory (one YAML file per hospital id).
pub const HOSPITALS_DIR_NAME: &str = "hospitals";

/// Directory name for sharded treatment records.
pub const TREATMENTS_DIR_NAME: &str = "treatments";

/// Filename of the treatment document inside each record directory.
pub const TREATMENT_YAML_FILENAME: &str = "treatment.yaml";

/// Extension used for per-entity YAML files in the flat directories.
pub const YAML_EXTENSION: &str = "yaml";

/// Number of attempts made to allocate an unused record directory.
pub const RECORD_DIR_ALLOCATION_ATTEMPTS: usize = 5;
