use crate::infra::seed_sample;
use chrono::{Duration, Local, NaiveDate};
use clap::Args;
use std::sync::Arc;
use workpass::error::AppError;
use workpass::passes::{
    canonical_date, ApplicationId, InMemoryPassStore, PassRepository, StvpOutcome,
    WorkPassService,
};

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Business date for the walkthrough (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) today: Option<NaiveDate>,
    /// Number of STVP requests to issue against the lapsed sample application.
    #[arg(long, default_value_t = 2)]
    pub(crate) stvp_requests: u32,
    /// Skip the manual expiry edit on the active sample application.
    #[arg(long)]
    pub(crate) skip_expiry_edit: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        today,
        stvp_requests,
        skip_expiry_edit,
    } = args;
    let today = today.unwrap_or_else(|| Local::now().date_naive());

    println!("Work pass extension demo (business date {})", canonical_date(today));
    let service = WorkPassService::new(Arc::new(InMemoryPassStore::default()));
    let seeded = seed_sample(&service, today)?;
    println!("- Seeded {seeded} sample applications");

    let lapsed = ApplicationId("A0001".to_string());
    println!("\nSTVP requests for {lapsed}");
    for attempt in 1..=stvp_requests {
        match service.process_stvp(&lapsed, today) {
            Ok(outcome) => print_outcome(attempt, &outcome),
            Err(err) => println!("  {attempt}. rejected: {err}"),
        }
    }

    if !skip_expiry_edit {
        let active = ApplicationId("A0002".to_string());
        println!("\nExpiry edits for {active}");
        match service.process_stvp(&active, today) {
            Ok(_) => println!("  unexpected STVP for an active pass"),
            Err(err) => println!("  STVP request refused: {err}"),
        }
        let target = canonical_date(today + Duration::days(365));
        match service.update_expiry(&active, &target, today) {
            Ok(update) => println!(
                "  expiry {} -> {} (amendment {})",
                canonical_date(update.previous_expiry),
                canonical_date(update.new_expiry),
                update.amendment_id
            ),
            Err(err) => println!("  expiry edit rejected: {err}"),
        }
        print_history(&service, &active);
    }

    print_history(&service, &lapsed);
    Ok(())
}

fn print_outcome(attempt: u32, outcome: &StvpOutcome) {
    let stvp = outcome.stvp();
    match outcome {
        StvpOutcome::Created { .. } => println!(
            "  {attempt}. created STVP {} covering {} to {}",
            stvp.id.0,
            canonical_date(stvp.start_date),
            canonical_date(stvp.end_date)
        ),
        StvpOutcome::Extended {
            previous_end_date,
            amendment_id,
            ..
        } => println!(
            "  {attempt}. extended STVP {} from {} to {} (amendment {amendment_id})",
            stvp.id.0,
            canonical_date(*previous_end_date),
            canonical_date(stvp.end_date)
        ),
    }
}

fn print_history<R>(service: &WorkPassService<R>, application_id: &ApplicationId)
where
    R: PassRepository + 'static,
{
    match service.amendment_history(application_id) {
        Ok(history) if history.is_empty() => {
            println!("\nNo amendments recorded for {application_id}")
        }
        Ok(history) => {
            println!("\nAmendment trail for {application_id}");
            for amendment in history {
                println!(
                    "  - {} at {}: {} -> {}",
                    amendment.amendment_id,
                    amendment.amendment_date.format("%Y-%m-%d %H:%M:%S"),
                    amendment.original_value,
                    amendment.amended_value
                );
            }
        }
        Err(err) => println!("\nAmendment trail unavailable: {err}"),
    }
}
