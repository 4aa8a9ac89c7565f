//! Pure, deterministic logic: data model, fixtures, digests, reference
//! classification, the poll decision table and verification findings.

pub mod digest;
pub mod fixture;
pub mod poll;
pub mod reference;
pub mod report;
pub mod types;
