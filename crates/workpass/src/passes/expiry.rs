use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{parse_canonical_date, AmendmentId, ApplicationId, ValidationError};
use super::ledger::AmendmentLedger;
use super::policy::is_expiry_editable;
use super::repository::PassRepository;
use super::service::{PassServiceError, CANNOT_UPDATE_EXPIRED, NO_RECORDED_EXPIRY};

/// Outcome of a manual expiry change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryUpdate {
    pub application_id: ApplicationId,
    pub amendment_id: AmendmentId,
    pub previous_expiry: NaiveDate,
    pub new_expiry: NaiveDate,
}

/// Applies manual expiry edits while the pass is still valid.
///
/// Lapsed passes are refused so they go through the STVP path rather than
/// being silently re-dated.
pub struct ExpiryUpdateService<R> {
    repository: Arc<R>,
    ledger: AmendmentLedger,
}

impl<R> ExpiryUpdateService<R>
where
    R: PassRepository,
{
    pub fn new(repository: Arc<R>, ledger: AmendmentLedger) -> Self {
        Self { repository, ledger }
    }

    pub fn update(
        &self,
        application_id: &ApplicationId,
        new_expiry: &str,
        today: NaiveDate,
    ) -> Result<ExpiryUpdate, PassServiceError> {
        if new_expiry.trim().is_empty() {
            return Err(ValidationError::MissingField { field: "new_doe" }.into());
        }
        let new_expiry = parse_canonical_date(new_expiry)?;

        let mut tx = self.repository.begin(application_id)?;
        let mut application = tx
            .application()?
            .ok_or_else(|| PassServiceError::NotFound(application_id.clone()))?;
        let previous_expiry = application
            .date_of_expiry
            .ok_or(PassServiceError::InvalidState(NO_RECORDED_EXPIRY))?;

        if !is_expiry_editable(previous_expiry, today) {
            warn!(%application_id, %previous_expiry, %today, "rejected expiry edit on lapsed pass");
            return Err(PassServiceError::InvalidState(CANNOT_UPDATE_EXPIRED));
        }

        application.date_of_expiry = Some(new_expiry);
        tx.save_application(application)?;
        let amendment_id = self
            .ledger
            .record(tx.as_mut(), previous_expiry, new_expiry)?;
        tx.commit()?;

        info!(
            %application_id,
            %amendment_id,
            %previous_expiry,
            %new_expiry,
            "updated application expiry"
        );

        Ok(ExpiryUpdate {
            application_id: application_id.clone(),
            amendment_id,
            previous_expiry,
            new_expiry,
        })
    }
}
