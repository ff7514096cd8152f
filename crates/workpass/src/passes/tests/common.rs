use std::sync::Arc;

use axum::response::Response;
use chrono::{Duration, NaiveDate};
use serde_json::Value;

use crate::passes::domain::{
    Amendment, Application, ApplicationId, ApplicationStatus, HolderId, PassType,
};
use crate::passes::memory::InMemoryPassStore;
use crate::passes::repository::{PassRepository, PassTransaction, RepositoryError};
use crate::passes::router::{pass_router, FixedClock};
use crate::passes::service::WorkPassService;

pub(super) fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date")
}

pub(super) fn days_from_today(days: i64) -> NaiveDate {
    today() + Duration::days(days)
}

pub(super) fn application_id(raw: &str) -> ApplicationId {
    ApplicationId(raw.to_string())
}

pub(super) fn application(id: &str, expiry: Option<NaiveDate>) -> Application {
    Application {
        id: application_id(id),
        fin: HolderId::parse("S1234567X").expect("valid FIN"),
        name: "Test User".to_string(),
        pass_type: PassType::EmploymentPass,
        date_of_application: days_from_today(-30),
        company_uen: "UEN12345".to_string(),
        status: ApplicationStatus::Issued,
        date_of_expiry: expiry,
    }
}

pub(super) fn build_service() -> (WorkPassService<InMemoryPassStore>, Arc<InMemoryPassStore>) {
    let store = Arc::new(InMemoryPassStore::default());
    let service = WorkPassService::new(store.clone());
    (service, store)
}

/// Service holding `A0001`, whose pass lapsed ten days ago.
pub(super) fn expired_service() -> (WorkPassService<InMemoryPassStore>, Arc<InMemoryPassStore>) {
    let (service, store) = build_service();
    service
        .register_application(application("A0001", Some(days_from_today(-10))))
        .expect("seed application");
    (service, store)
}

/// Service holding `A0002`, whose pass is valid for another sixty days.
pub(super) fn active_service() -> (WorkPassService<InMemoryPassStore>, Arc<InMemoryPassStore>) {
    let (service, store) = build_service();
    service
        .register_application(application("A0002", Some(days_from_today(60))))
        .expect("seed application");
    (service, store)
}

pub(super) fn amendment_ids(store: &InMemoryPassStore, id: &str) -> Vec<String> {
    store
        .amendments(&application_id(id))
        .expect("amendments readable")
        .into_iter()
        .map(|amendment: Amendment| amendment.amendment_id.0)
        .collect()
}

pub(super) fn pass_router_with_service(
    service: WorkPassService<InMemoryPassStore>,
) -> axum::Router {
    pass_router(Arc::new(service), Arc::new(FixedClock(today())))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 4096)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) struct UnavailableRepository;

impl PassRepository for UnavailableRepository {
    fn begin(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Box<dyn PassTransaction + '_>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert_application(
        &self,
        _application: Application,
    ) -> Result<Application, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch_application(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Option<Application>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn amendments(
        &self,
        _application_id: &ApplicationId,
    ) -> Result<Vec<Amendment>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}
