//! Repository management modules.
//!
//! This module contains the file-backed stores behind the treatment workflow: the patient and
//! hospital directories (flat YAML files keyed by NIC and hospital id) and the sharded
//! treatment record store.

pub mod hospitals;
pub mod patients;
pub(crate) mod shared;
pub mod treatments;
