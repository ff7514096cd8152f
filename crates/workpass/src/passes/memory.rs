use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use tracing::debug;

use super::domain::{Amendment, AmendmentId, Application, ApplicationId, Stvp};
use super::repository::{PassRepository, PassTransaction, RepositoryError};

const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct Tables {
    applications: HashMap<ApplicationId, Application>,
    // insertion order doubles as the tie-break for equal end dates
    stvps: Vec<Stvp>,
    amendments: BTreeMap<AmendmentId, Amendment>,
}

/// Process-local store with per-application row locks and all-or-nothing commits.
#[derive(Debug)]
pub struct InMemoryPassStore {
    tables: Mutex<Tables>,
    leases: Mutex<HashSet<ApplicationId>>,
    released: Condvar,
    lock_timeout: Duration,
}

impl Default for InMemoryPassStore {
    fn default() -> Self {
        Self::with_lock_timeout(DEFAULT_LOCK_TIMEOUT)
    }
}

impl InMemoryPassStore {
    pub fn with_lock_timeout(lock_timeout: Duration) -> Self {
        Self {
            tables: Mutex::new(Tables::default()),
            leases: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            lock_timeout,
        }
    }

    /// Every STVP recorded for the application, in insertion order.
    pub fn stvps(&self, application_id: &ApplicationId) -> Result<Vec<Stvp>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .stvps
            .iter()
            .filter(|stvp| &stvp.application_id == application_id)
            .cloned()
            .collect())
    }

    fn tables(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("pass tables lock poisoned".to_string()))
    }

    fn acquire(&self, application_id: &ApplicationId) -> Result<Lease<'_>, RepositoryError> {
        let deadline = Instant::now() + self.lock_timeout;
        let mut held = self
            .leases
            .lock()
            .map_err(|_| RepositoryError::Unavailable("lease table lock poisoned".to_string()))?;

        while held.contains(application_id) {
            let now = Instant::now();
            if now >= deadline {
                debug!(application_id = %application_id, "gave up waiting for application lock");
                return Err(RepositoryError::Timeout);
            }
            let (guard, _) = self
                .released
                .wait_timeout(held, deadline - now)
                .map_err(|_| {
                    RepositoryError::Unavailable("lease table lock poisoned".to_string())
                })?;
            held = guard;
        }

        held.insert(application_id.clone());
        Ok(Lease {
            store: self,
            application_id: application_id.clone(),
        })
    }

    fn snapshot(&self, application_id: &ApplicationId) -> Result<WorkingSet, RepositoryError> {
        let tables = self.tables()?;
        Ok(WorkingSet {
            application: tables.applications.get(application_id).cloned(),
            stvps: tables
                .stvps
                .iter()
                .filter(|stvp| &stvp.application_id == application_id)
                .cloned()
                .collect(),
            amendment_count: tables
                .amendments
                .values()
                .filter(|amendment| &amendment.application_id == application_id)
                .count(),
        })
    }
}

impl PassRepository for InMemoryPassStore {
    fn begin(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Box<dyn PassTransaction + '_>, RepositoryError> {
        let lease = self.acquire(application_id)?;
        let working = self.snapshot(application_id)?;
        Ok(Box::new(MemoryTransaction {
            store: self,
            lease,
            working,
            writes: Vec::new(),
        }))
    }

    fn insert_application(
        &self,
        application: Application,
    ) -> Result<Application, RepositoryError> {
        let mut tables = self.tables()?;
        if tables.applications.contains_key(&application.id) {
            return Err(RepositoryError::Conflict(format!(
                "application {}",
                application.id
            )));
        }
        tables
            .applications
            .insert(application.id.clone(), application.clone());
        Ok(application)
    }

    fn fetch_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Ok(self.tables()?.applications.get(application_id).cloned())
    }

    fn amendments(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Amendment>, RepositoryError> {
        let tables = self.tables()?;
        Ok(tables
            .amendments
            .values()
            .filter(|amendment| &amendment.application_id == application_id)
            .cloned()
            .collect())
    }
}

/// Held for the lifetime of a transaction; releasing wakes blocked writers.
struct Lease<'a> {
    store: &'a InMemoryPassStore,
    application_id: ApplicationId,
}

impl Drop for Lease<'_> {
    fn drop(&mut self) {
        let mut held = self
            .store
            .leases
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        held.remove(&self.application_id);
        self.store.released.notify_all();
    }
}

struct WorkingSet {
    application: Option<Application>,
    stvps: Vec<Stvp>,
    amendment_count: usize,
}

enum StagedWrite {
    SaveApplication(Application),
    InsertStvp(Stvp),
    UpdateStvp(Stvp),
    InsertAmendment(Amendment),
}

struct MemoryTransaction<'a> {
    store: &'a InMemoryPassStore,
    lease: Lease<'a>,
    working: WorkingSet,
    writes: Vec<StagedWrite>,
}

impl PassTransaction for MemoryTransaction<'_> {
    fn application_id(&self) -> &ApplicationId {
        &self.lease.application_id
    }

    fn application(&mut self) -> Result<Option<Application>, RepositoryError> {
        Ok(self.working.application.clone())
    }

    fn save_application(&mut self, application: Application) -> Result<(), RepositoryError> {
        if application.id != self.lease.application_id || self.working.application.is_none() {
            return Err(RepositoryError::NotFound);
        }
        self.working.application = Some(application.clone());
        self.writes.push(StagedWrite::SaveApplication(application));
        Ok(())
    }

    fn latest_stvp(&mut self) -> Result<Option<Stvp>, RepositoryError> {
        // max_by_key keeps the last of equal maxima, i.e. the most recent insert
        Ok(self
            .working
            .stvps
            .iter()
            .max_by_key(|stvp| stvp.end_date)
            .cloned())
    }

    fn insert_stvp(&mut self, stvp: Stvp) -> Result<(), RepositoryError> {
        if stvp.application_id != self.lease.application_id {
            return Err(RepositoryError::NotFound);
        }
        self.working.stvps.push(stvp.clone());
        self.writes.push(StagedWrite::InsertStvp(stvp));
        Ok(())
    }

    fn update_stvp(&mut self, stvp: Stvp) -> Result<(), RepositoryError> {
        let slot = self
            .working
            .stvps
            .iter_mut()
            .find(|existing| existing.id == stvp.id)
            .ok_or(RepositoryError::NotFound)?;
        *slot = stvp.clone();
        self.writes.push(StagedWrite::UpdateStvp(stvp));
        Ok(())
    }

    fn count_amendments(&mut self) -> Result<usize, RepositoryError> {
        Ok(self.working.amendment_count)
    }

    fn insert_amendment(&mut self, amendment: Amendment) -> Result<(), RepositoryError> {
        if amendment.application_id != self.lease.application_id {
            return Err(RepositoryError::NotFound);
        }
        self.working.amendment_count += 1;
        self.writes.push(StagedWrite::InsertAmendment(amendment));
        Ok(())
    }

    fn commit(self: Box<Self>) -> Result<(), RepositoryError> {
        let MemoryTransaction {
            store,
            lease,
            writes,
            ..
        } = *self;

        let mut tables = store.tables()?;
        validate(&tables, &writes)?;

        let count = writes.len();
        for write in writes {
            match write {
                StagedWrite::SaveApplication(application) => {
                    tables
                        .applications
                        .insert(application.id.clone(), application);
                }
                StagedWrite::InsertStvp(stvp) => tables.stvps.push(stvp),
                StagedWrite::UpdateStvp(stvp) => {
                    if let Some(slot) = tables.stvps.iter_mut().find(|row| row.id == stvp.id) {
                        *slot = stvp;
                    }
                }
                StagedWrite::InsertAmendment(amendment) => {
                    tables
                        .amendments
                        .insert(amendment.amendment_id.clone(), amendment);
                }
            }
        }
        drop(tables);

        debug!(application_id = %lease.application_id, writes = count, "committed pass transaction");
        drop(lease);
        Ok(())
    }
}

/// Reject the whole batch before touching any table.
fn validate(tables: &Tables, writes: &[StagedWrite]) -> Result<(), RepositoryError> {
    let mut new_amendments = HashSet::new();
    let mut new_stvps = HashSet::new();

    for write in writes {
        match write {
            StagedWrite::SaveApplication(application) => {
                if !tables.applications.contains_key(&application.id) {
                    return Err(RepositoryError::NotFound);
                }
            }
            StagedWrite::InsertStvp(stvp) => {
                let taken = tables.stvps.iter().any(|row| row.id == stvp.id);
                if taken || !new_stvps.insert(&stvp.id) {
                    return Err(RepositoryError::Conflict(format!("stvp {}", stvp.id.0)));
                }
            }
            StagedWrite::UpdateStvp(stvp) => {
                let known = tables.stvps.iter().any(|row| row.id == stvp.id)
                    || new_stvps.contains(&stvp.id);
                if !known {
                    return Err(RepositoryError::NotFound);
                }
            }
            StagedWrite::InsertAmendment(amendment) => {
                let id = &amendment.amendment_id;
                if tables.amendments.contains_key(id) || !new_amendments.insert(id) {
                    return Err(RepositoryError::Conflict(format!("amendment {id}")));
                }
            }
        }
    }

    Ok(())
}
