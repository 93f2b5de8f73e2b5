//! # vigil-core
//!
//! Domain core for Vigil, an exam-duty check-in and paper-submission tracker
//! for invigilation staff.
//!
//! This crate owns the duty state machine and nothing else:
//!
//! - **Records**: the per-(staff, hall, date) [`record::DutyRecord`] and its
//!   status lifecycle
//! - **Store Abstraction**: the [`store::RecordStore`] trait (read-by-key,
//!   read-by-filter, guarded conditional update) that persistence backends
//!   implement
//! - **Ledger**: the [`ledger::DutyLedger`] transition rules (check-in, proxy
//!   substitution, submission) and their error taxonomy
//! - **Observability**: structured logging bootstrap shared by binaries
//!
//! ## Crate Boundary
//!
//! HTTP routing, JSON shaping, and configuration live in `vigil-api`. This
//! crate never computes "today" on its own: the reference date and wall-clock
//! time are explicit parameters on every mutating operation, so callers (and
//! tests) control them.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rust_2018_idioms)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ledger;
pub mod observability;
pub mod record;
pub mod store;

pub use error::{Error, Result};
pub use ledger::{DutyLedger, LedgerError};
pub use record::{DutyRecord, DutyStanding, DutyStatus};
pub use store::{MemoryStore, RecordPatch, RecordStore, UpdateGuard, UpdateOutcome};
