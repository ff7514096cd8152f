use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{AmendmentId, ApplicationId, Stvp, StvpId};
use super::ledger::AmendmentLedger;
use super::policy::{extend_window, is_eligible_for_stvp, stvp_window_start};
use super::repository::PassRepository;
use super::service::{PassServiceError, NO_RECORDED_EXPIRY, PASS_NOT_EXPIRED};

/// Whether a call opened a new STVP window or pushed an existing one forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StvpOutcomeKind {
    Created,
    Extended,
}

/// Result of [`StvpLifecycleManager::process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StvpOutcome {
    Created {
        stvp: Stvp,
    },
    Extended {
        stvp: Stvp,
        previous_end_date: NaiveDate,
        amendment_id: AmendmentId,
    },
}

impl StvpOutcome {
    pub fn kind(&self) -> StvpOutcomeKind {
        match self {
            StvpOutcome::Created { .. } => StvpOutcomeKind::Created,
            StvpOutcome::Extended { .. } => StvpOutcomeKind::Extended,
        }
    }

    pub fn stvp(&self) -> &Stvp {
        match self {
            StvpOutcome::Created { stvp } | StvpOutcome::Extended { stvp, .. } => stvp,
        }
    }

    pub fn amendment_id(&self) -> Option<&AmendmentId> {
        match self {
            StvpOutcome::Created { .. } => None,
            StvpOutcome::Extended { amendment_id, .. } => Some(amendment_id),
        }
    }
}

/// Decides between issuing a first STVP and extending the latest one.
///
/// An existing STVP is extended whether or not its window is still running; only
/// the extension path writes an amendment (old end date to new end date). The
/// whole read-decide-write sequence runs inside one repository transaction, so
/// two concurrent calls for the same application resolve to one creation
/// followed by one extension.
pub struct StvpLifecycleManager<R> {
    repository: Arc<R>,
    ledger: AmendmentLedger,
}

impl<R> StvpLifecycleManager<R>
where
    R: PassRepository,
{
    pub fn new(repository: Arc<R>, ledger: AmendmentLedger) -> Self {
        Self { repository, ledger }
    }

    pub fn process(
        &self,
        application_id: &ApplicationId,
        today: NaiveDate,
    ) -> Result<StvpOutcome, PassServiceError> {
        let mut tx = self.repository.begin(application_id)?;

        let application = tx
            .application()?
            .ok_or_else(|| PassServiceError::NotFound(application_id.clone()))?;
        let expiry = application
            .date_of_expiry
            .ok_or(PassServiceError::InvalidState(NO_RECORDED_EXPIRY))?;

        if !is_eligible_for_stvp(expiry, today) {
            warn!(%application_id, %expiry, %today, "rejected STVP for unexpired pass");
            return Err(PassServiceError::InvalidState(PASS_NOT_EXPIRED));
        }

        let outcome = match tx.latest_stvp()? {
            None => {
                let start_date = stvp_window_start(expiry, today);
                let stvp = Stvp {
                    id: StvpId::generate(),
                    application_id: application_id.clone(),
                    start_date,
                    end_date: extend_window(start_date),
                };
                tx.insert_stvp(stvp.clone())?;
                StvpOutcome::Created { stvp }
            }
            Some(mut stvp) => {
                let previous_end_date = stvp.end_date;
                stvp.end_date = extend_window(previous_end_date);
                tx.update_stvp(stvp.clone())?;
                let amendment_id =
                    self.ledger
                        .record(tx.as_mut(), previous_end_date, stvp.end_date)?;
                StvpOutcome::Extended {
                    stvp,
                    previous_end_date,
                    amendment_id,
                }
            }
        };

        tx.commit()?;

        let stvp = outcome.stvp();
        info!(
            %application_id,
            stvp_id = %stvp.id.0,
            kind = ?outcome.kind(),
            start_date = %stvp.start_date,
            end_date = %stvp.end_date,
            amendment_id = outcome.amendment_id().map(|id| id.0.as_str()),
            "processed STVP"
        );
        Ok(outcome)
    }
}
