use chrono::{NaiveDate, Utc};
use tracing::debug;

use super::domain::{canonical_date, Amendment, AmendmentId, ApplicationId};
use super::repository::{PassRepository, PassTransaction, RepositoryError};

/// Append-only trail of date changes made to applications.
///
/// Identifiers are derived from the number of amendments already recorded for
/// the application, so [`AmendmentLedger::record`] only ever runs inside the
/// transaction that performs the change it documents. The per-application lock
/// held by that transaction is what makes the count-then-insert sequence safe;
/// a collision that slips through surfaces as a conflict at commit time.
#[derive(Debug, Default, Clone, Copy)]
pub struct AmendmentLedger;

impl AmendmentLedger {
    pub fn new() -> Self {
        Self
    }

    /// Stage an amendment for `original -> amended` in the caller's transaction.
    pub fn record<T>(
        &self,
        tx: &mut T,
        original: NaiveDate,
        amended: NaiveDate,
    ) -> Result<AmendmentId, RepositoryError>
    where
        T: PassTransaction + ?Sized,
    {
        let application_id = tx.application_id().clone();
        let sequence = tx.count_amendments()? + 1;
        let amendment_id = AmendmentId::for_sequence(sequence, &application_id);

        tx.insert_amendment(Amendment {
            amendment_id: amendment_id.clone(),
            application_id: application_id.clone(),
            amendment_date: Utc::now(),
            original_value: canonical_date(original),
            amended_value: canonical_date(amended),
        })?;

        debug!(%application_id, %amendment_id, sequence, "staged amendment");
        Ok(amendment_id)
    }

    /// Amendments for the application, oldest first.
    pub fn history<R>(
        &self,
        repository: &R,
        application_id: &ApplicationId,
    ) -> Result<Vec<Amendment>, RepositoryError>
    where
        R: PassRepository + ?Sized,
    {
        let mut amendments = repository.amendments(application_id)?;
        // equal timestamps order by numeric sequence, not identifier text
        amendments.sort_by_cached_key(|amendment| {
            (
                amendment.amendment_date,
                amendment.amendment_id.sequence(application_id),
                amendment.amendment_id.clone(),
            )
        });
        Ok(amendments)
    }
}
