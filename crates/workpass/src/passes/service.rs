use std::sync::Arc;

use axum::http::StatusCode;
use chrono::NaiveDate;
use tracing::{error, info};

use super::domain::{Amendment, Application, ApplicationId, ValidationError};
use super::expiry::{ExpiryUpdate, ExpiryUpdateService};
use super::ledger::AmendmentLedger;
use super::lifecycle::{StvpLifecycleManager, StvpOutcome};
use super::repository::{PassRepository, RepositoryError};

pub(crate) const PASS_NOT_EXPIRED: &str = "pass not expired";
pub(crate) const CANNOT_UPDATE_EXPIRED: &str = "cannot update expired application";
pub(crate) const NO_RECORDED_EXPIRY: &str = "application has no recorded expiry";

/// Service composing the STVP lifecycle, expiry updates, and the amendment ledger
/// over one shared repository.
pub struct WorkPassService<R> {
    repository: Arc<R>,
    lifecycle: StvpLifecycleManager<R>,
    expiry: ExpiryUpdateService<R>,
    ledger: AmendmentLedger,
}

impl<R> WorkPassService<R>
where
    R: PassRepository + 'static,
{
    pub fn new(repository: Arc<R>) -> Self {
        let ledger = AmendmentLedger::new();
        Self {
            lifecycle: StvpLifecycleManager::new(repository.clone(), ledger),
            expiry: ExpiryUpdateService::new(repository.clone(), ledger),
            repository,
            ledger,
        }
    }

    /// Create or extend the application's STVP as of `today`.
    pub fn process_stvp(
        &self,
        application_id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<StvpOutcome, PassServiceError> {
        self.lifecycle.process(application_id, today)
    }

    /// Apply a manual expiry change given in canonical `YYYY-MM-DD` form.
    pub fn update_expiry(
        &self,
        application_id: &ApplicationId,
        new_expiry: &str,
        today: NaiveDate,
    ) -> Result<ExpiryUpdate, PassServiceError> {
        self.expiry.update(application_id, new_expiry, today)
    }

    /// Amendment trail for an existing application, oldest first.
    pub fn amendment_history(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Amendment>, PassServiceError> {
        self.application(application_id)?;
        Ok(self.ledger.history(self.repository.as_ref(), application_id)?)
    }

    pub fn application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Application, PassServiceError> {
        self.repository
            .fetch_application(application_id)?
            .ok_or_else(|| PassServiceError::NotFound(application_id.clone()))
    }

    /// Intake hook for filings created outside the pass workflow.
    pub fn register_application(
        &self,
        application: Application,
    ) -> Result<Application, PassServiceError> {
        let stored = self.repository.insert_application(application)?;
        info!(
            application_id = %stored.id,
            status = stored.status.label(),
            "registered application"
        );
        Ok(stored)
    }
}

/// Error raised by the pass services.
#[derive(Debug, thiserror::Error)]
pub enum PassServiceError {
    #[error("application {0} not found")]
    NotFound(ApplicationId),
    #[error("{0}")]
    InvalidState(&'static str),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("conflicting write: {0}")]
    Conflict(String),
    #[error("storage unavailable, retry later")]
    Unavailable,
    #[error("internal storage error")]
    Internal,
}

impl PassServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PassServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            PassServiceError::InvalidState(_) | PassServiceError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            PassServiceError::Conflict(_) => StatusCode::CONFLICT,
            PassServiceError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            PassServiceError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<RepositoryError> for PassServiceError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Conflict(detail) => PassServiceError::Conflict(detail),
            RepositoryError::Timeout => PassServiceError::Unavailable,
            RepositoryError::Unavailable(detail) => {
                error!(%detail, "pass storage unavailable");
                PassServiceError::Unavailable
            }
            RepositoryError::NotFound => {
                error!("storage lost a row inside an open transaction");
                PassServiceError::Internal
            }
        }
    }
}
