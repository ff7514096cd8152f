//! Work-pass expiry handling: short-term visit pass issuance and extension, manual
//! expiry edits, and the amendment trail that records every date change.
//!
//! Both mutating operations take `today` explicitly and run their
//! read-decide-write sequence inside a single per-application repository
//! transaction.

pub mod domain;
pub mod expiry;
pub mod ledger;
pub mod lifecycle;
pub mod memory;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{
    canonical_date, parse_canonical_date, Amendment, AmendmentId, Application, ApplicationId,
    ApplicationStatus, HolderId, PassType, Stvp, StvpId, ValidationError,
};
pub use expiry::{ExpiryUpdate, ExpiryUpdateService};
pub use ledger::AmendmentLedger;
pub use lifecycle::{StvpLifecycleManager, StvpOutcome, StvpOutcomeKind};
pub use memory::InMemoryPassStore;
pub use policy::{is_eligible_for_stvp, ExpiryState, STVP_EXTENSION_DAYS};
pub use repository::{PassRepository, PassTransaction, RepositoryError};
pub use router::{pass_router, Clock, FixedClock, SystemClock};
pub use service::{PassServiceError, WorkPassService};
