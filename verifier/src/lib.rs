//! End-to-end verification of asynchronously executed workflow runs.
//!
//! A session submits a run, waits for it under a fixed probe budget, fetches
//! the finished run record and compares it against hand-authored fixtures:
//! request echo, run log, ordered task logs and output digests.
//!
//! - **[`core`]**: Pure logic (data model, fixtures, digests, reference
//!   classification, poll decisions, findings). No I/O.
//! - **[`io`]**: The service transport and artifact reads, behind traits so
//!   tests can script them.
//!
//! The stage modules ([`submit`], [`poll`], [`fetch`], [`verify`]) run in that
//! order and [`session`] chains them.

pub mod config;
pub mod core;
pub mod error;
pub mod fetch;
pub mod io;
pub mod logging;
pub mod poll;
pub mod session;
pub mod submit;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
