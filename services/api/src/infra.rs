use chrono::{Duration, NaiveDate};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;
use workpass::passes::{
    parse_canonical_date, Application, ApplicationId, ApplicationStatus, HolderId, PassRepository,
    PassServiceError, PassType, ValidationError, WorkPassService,
};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    parse_canonical_date(raw).map_err(|err| err.to_string())
}

fn sample_application(
    id: &str,
    fin: &str,
    name: &str,
    pass_type: PassType,
    status: ApplicationStatus,
    applied_on: NaiveDate,
    expiry: Option<NaiveDate>,
) -> Result<Application, ValidationError> {
    Ok(Application {
        id: ApplicationId(id.to_string()),
        fin: HolderId::parse(fin)?,
        name: name.to_string(),
        pass_type,
        date_of_application: applied_on,
        company_uen: "UEN12345".to_string(),
        status,
        date_of_expiry: expiry,
    })
}

/// Small fixed data set: one lapsed pass (A0001), one active pass, one filing without an expiry.
pub(crate) fn sample_applications(today: NaiveDate) -> Result<Vec<Application>, ValidationError> {
    Ok(vec![
        sample_application(
            "A0001",
            "S1234567X",
            "Test User",
            PassType::EmploymentPass,
            ApplicationStatus::Pending,
            today - Duration::days(30),
            Some(today - Duration::days(10)),
        )?,
        sample_application(
            "A0002",
            "G7654321K",
            "Active Holder",
            PassType::SPass,
            ApplicationStatus::Issued,
            today - Duration::days(200),
            Some(today + Duration::days(90)),
        )?,
        sample_application(
            "A0003",
            "F1122334N",
            "Pending Dependant",
            PassType::DependantsPass,
            ApplicationStatus::Pending,
            today - Duration::days(5),
            None,
        )?,
    ])
}

pub(crate) fn seed_sample<R>(
    service: &WorkPassService<R>,
    today: NaiveDate,
) -> Result<usize, PassServiceError>
where
    R: PassRepository + 'static,
{
    let applications = sample_applications(today)?;
    let count = applications.len();
    for application in applications {
        service.register_application(application)?;
    }
    info!(count, "seeded sample applications");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use workpass::passes::InMemoryPassStore;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, 1).expect("valid date")
    }

    #[test]
    fn parse_date_reports_canonical_format() {
        assert_eq!(parse_date("2025-10-01"), Ok(today()));
        let message = parse_date("01/10/2025").expect_err("wrong format");
        assert!(message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn sample_seed_includes_lapsed_test_application() {
        let service = WorkPassService::new(Arc::new(InMemoryPassStore::default()));
        assert_eq!(seed_sample(&service, today()).expect("seeded"), 3);

        let lapsed = service
            .application(&ApplicationId("A0001".to_string()))
            .expect("present");
        assert_eq!(lapsed.fin.as_str(), "S1234567X");
        assert_eq!(
            lapsed.date_of_expiry,
            NaiveDate::from_ymd_opt(2025, 9, 21)
        );

        assert!(matches!(
            seed_sample(&service, today()),
            Err(PassServiceError::Conflict(_))
        ));
    }
}
