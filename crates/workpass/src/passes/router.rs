use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::domain::{canonical_date, Amendment, ApplicationId};
use super::lifecycle::{StvpOutcome, StvpOutcomeKind};
use super::repository::PassRepository;
use super::service::{PassServiceError, WorkPassService};

/// Source of "today" for the HTTP edge; the services themselves take the date as an argument.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date of the running host.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

pub(crate) struct RouterState<R> {
    service: Arc<WorkPassService<R>>,
    clock: Arc<dyn Clock>,
}

impl<R> RouterState<R> {
    pub(crate) fn new(service: Arc<WorkPassService<R>>, clock: Arc<dyn Clock>) -> Self {
        Self { service, clock }
    }
}

impl<R> Clone for RouterState<R> {
    fn clone(&self) -> Self {
        Self {
            service: self.service.clone(),
            clock: self.clock.clone(),
        }
    }
}

/// Router builder exposing STVP processing, expiry updates, and amendment history.
pub fn pass_router<R>(service: Arc<WorkPassService<R>>, clock: Arc<dyn Clock>) -> Router
where
    R: PassRepository + 'static,
{
    Router::new()
        .route(
            "/api/applications/:application_id/create-stvp",
            post(create_stvp_handler::<R>),
        )
        .route(
            "/api/applications/:application_id/update-expiry",
            put(update_expiry_handler::<R>),
        )
        .route(
            "/api/applications/:application_id/amendments",
            get(amendment_history_handler::<R>),
        )
        .with_state(RouterState::new(service, clock))
}

#[derive(Debug, Serialize)]
pub(crate) struct StvpResponse {
    pub(crate) message: &'static str,
    pub(crate) stvp_id: String,
    pub(crate) start_date: String,
    pub(crate) end_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) amendment_id: Option<String>,
}

impl From<&StvpOutcome> for StvpResponse {
    fn from(outcome: &StvpOutcome) -> Self {
        let stvp = outcome.stvp();
        let message = match outcome.kind() {
            StvpOutcomeKind::Created => "New STVP created",
            StvpOutcomeKind::Extended => "Existing STVP extended",
        };
        Self {
            message,
            stvp_id: stvp.id.0.clone(),
            start_date: canonical_date(stvp.start_date),
            end_date: canonical_date(stvp.end_date),
            amendment_id: outcome.amendment_id().map(|id| id.0.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateExpiryRequest {
    #[serde(default)]
    pub(crate) new_doe: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct AmendmentView {
    pub(crate) amendment_id: String,
    pub(crate) amendment_date: String,
    pub(crate) original_value: String,
    pub(crate) amended_value: String,
}

impl From<Amendment> for AmendmentView {
    fn from(amendment: Amendment) -> Self {
        Self {
            amendment_id: amendment.amendment_id.0,
            amendment_date: amendment.amendment_date.to_rfc3339(),
            original_value: amendment.original_value,
            amended_value: amendment.amended_value,
        }
    }
}

/// Run a service call on the blocking pool so lock waits never park an async worker.
async fn run_blocking<R, T, F>(state: &RouterState<R>, call: F) -> Result<T, PassServiceError>
where
    R: PassRepository + 'static,
    T: Send + 'static,
    F: FnOnce(&WorkPassService<R>, NaiveDate) -> Result<T, PassServiceError> + Send + 'static,
{
    let service = state.service.clone();
    let today = state.clock.today();
    match tokio::task::spawn_blocking(move || call(&service, today)).await {
        Ok(result) => result,
        Err(join_error) => {
            error!(%join_error, "pass service task did not complete");
            Err(PassServiceError::Internal)
        }
    }
}

fn error_response(error: &PassServiceError) -> Response {
    let payload = json!({ "error": error.to_string() });
    (error.status_code(), Json(payload)).into_response()
}

pub(crate) async fn create_stvp_handler<R>(
    State(state): State<RouterState<R>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PassRepository + 'static,
{
    let id = ApplicationId(application_id);
    let result =
        run_blocking(&state, move |service, today| service.process_stvp(&id, today)).await;
    match result {
        Ok(outcome) => {
            let status = match outcome.kind() {
                StvpOutcomeKind::Created => StatusCode::CREATED,
                StvpOutcomeKind::Extended => StatusCode::OK,
            };
            (status, Json(StvpResponse::from(&outcome))).into_response()
        }
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn update_expiry_handler<R>(
    State(state): State<RouterState<R>>,
    Path(application_id): Path<String>,
    Json(request): Json<UpdateExpiryRequest>,
) -> Response
where
    R: PassRepository + 'static,
{
    let id = ApplicationId(application_id);
    let new_doe = request.new_doe.unwrap_or_default();
    let result = run_blocking(&state, move |service, today| {
        service.update_expiry(&id, &new_doe, today)
    })
    .await;
    match result {
        Ok(update) => {
            let payload = json!({
                "message": "Expiry date updated successfully",
                "amendment_id": update.amendment_id.0,
                "new_expiry": canonical_date(update.new_expiry),
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(error) => error_response(&error),
    }
}

pub(crate) async fn amendment_history_handler<R>(
    State(state): State<RouterState<R>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: PassRepository + 'static,
{
    let id = ApplicationId(application_id);
    let result =
        run_blocking(&state, move |service, _| service.amendment_history(&id)).await;
    match result {
        Ok(amendments) if amendments.is_empty() => {
            let payload = json!({ "message": "No amendments found for this application" });
            (StatusCode::NOT_FOUND, Json(payload)).into_response()
        }
        Ok(amendments) => {
            let views: Vec<AmendmentView> = amendments.into_iter().map(Into::into).collect();
            (StatusCode::OK, Json(views)).into_response()
        }
        Err(error) => error_response(&error),
    }
}
