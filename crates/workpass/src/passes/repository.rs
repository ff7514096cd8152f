use super::domain::{Amendment, Application, ApplicationId, Stvp};

/// Storage abstraction so the pass services can be exercised in isolation.
///
/// Every mutation goes through a [`PassTransaction`] opened for a single
/// application. Implementations must serialize transactions on the same
/// application for as long as the transaction is alive, which is what keeps the
/// read-decide-write sequences of the services free of lost updates and
/// duplicate amendment identifiers.
pub trait PassRepository: Send + Sync {
    /// Lock `application_id` and open a unit of work against its rows.
    ///
    /// Fails with [`RepositoryError::Timeout`] when the lock cannot be taken in
    /// time. The application does not have to exist.
    fn begin(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Box<dyn PassTransaction + '_>, RepositoryError>;

    fn insert_application(&self, application: Application)
        -> Result<Application, RepositoryError>;

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError>;

    fn amendments(&self, application_id: &ApplicationId)
        -> Result<Vec<Amendment>, RepositoryError>;
}

/// Unit of work scoped to one locked application.
///
/// Reads observe the transaction's own staged writes. Dropping the transaction
/// without calling [`PassTransaction::commit`] discards everything it staged.
pub trait PassTransaction {
    fn application_id(&self) -> &ApplicationId;

    fn application(&mut self) -> Result<Option<Application>, RepositoryError>;

    fn save_application(&mut self, application: Application) -> Result<(), RepositoryError>;

    /// STVP with the latest end date, if any.
    fn latest_stvp(&mut self) -> Result<Option<Stvp>, RepositoryError>;

    fn insert_stvp(&mut self, stvp: Stvp) -> Result<(), RepositoryError>;

    fn update_stvp(&mut self, stvp: Stvp) -> Result<(), RepositoryError>;

    fn count_amendments(&mut self) -> Result<usize, RepositoryError>;

    fn insert_amendment(&mut self, amendment: Amendment) -> Result<(), RepositoryError>;

    /// Apply every staged write atomically, or none of them.
    fn commit(self: Box<Self>) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("timed out waiting for application lock")]
    Timeout,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
