//! Typed clinical records
//!
//! Read-only snapshots of the admissions, patients and lab events
//! extracts, loaded once per pipeline run.

pub mod encounter;
pub mod lab_event;
pub mod patient;
pub mod types;

pub use encounter::Encounter;
pub use lab_event::{ABNORMAL_FLAG, LabEvent};
pub use patient::Patient;
pub use types::{AdmissionType, Gender};
