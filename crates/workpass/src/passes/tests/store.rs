use std::time::Duration;

use super::common::*;
use crate::passes::domain::{Amendment, Stvp, StvpId};
use crate::passes::memory::InMemoryPassStore;
use crate::passes::repository::{PassRepository, RepositoryError};
use chrono::Utc;

fn stvp(id: &str, application: &str, days: i64) -> Stvp {
    Stvp {
        id: StvpId(id.to_string()),
        application_id: application_id(application),
        start_date: today(),
        end_date: days_from_today(days),
    }
}

#[test]
fn dropping_a_transaction_discards_staged_writes() {
    let store = InMemoryPassStore::default();
    store
        .insert_application(application("A0001", Some(days_from_today(-10))))
        .expect("seed");

    {
        let mut tx = store.begin(&application_id("A0001")).expect("begin");
        tx.insert_stvp(stvp("STVP0001", "A0001", 30)).expect("stage");
        let mut record = tx.application().expect("read").expect("present");
        record.date_of_expiry = Some(days_from_today(90));
        tx.save_application(record).expect("stage");
        assert!(tx.latest_stvp().expect("read own write").is_some());
    }

    assert!(store.stvps(&application_id("A0001")).expect("read").is_empty());
    let stored = store
        .fetch_application(&application_id("A0001"))
        .expect("read")
        .expect("present");
    assert_eq!(stored.date_of_expiry, Some(days_from_today(-10)));
}

#[test]
fn latest_stvp_orders_by_end_date() {
    let store = InMemoryPassStore::default();
    store
        .insert_application(application("A0001", Some(days_from_today(-10))))
        .expect("seed");

    let mut tx = store.begin(&application_id("A0001")).expect("begin");
    tx.insert_stvp(stvp("late", "A0001", 60)).expect("stage");
    tx.insert_stvp(stvp("early", "A0001", 30)).expect("stage");
    tx.commit().expect("commit");

    let mut tx = store.begin(&application_id("A0001")).expect("begin");
    let latest = tx.latest_stvp().expect("read").expect("present");
    assert_eq!(latest.id.0, "late");
}

#[test]
fn second_transaction_times_out_while_lock_is_held() {
    let store = InMemoryPassStore::with_lock_timeout(Duration::from_millis(50));
    let _held = store.begin(&application_id("A0001")).expect("first lock");

    match store.begin(&application_id("A0001")) {
        Err(RepositoryError::Timeout) => {}
        Ok(_) => panic!("expected timeout, lock was granted twice"),
        Err(other) => panic!("expected timeout, got {other:?}"),
    }

    store
        .begin(&application_id("A0002"))
        .expect("other applications are independent");
}

#[test]
fn lock_is_released_after_commit() {
    let store = InMemoryPassStore::with_lock_timeout(Duration::from_millis(50));
    let tx = store.begin(&application_id("A0001")).expect("first lock");
    tx.commit().expect("empty commit");
    store
        .begin(&application_id("A0001"))
        .expect("lock available again");
}

#[test]
fn duplicate_amendment_id_rejects_whole_commit() {
    let store = InMemoryPassStore::default();
    store
        .insert_application(application("A0001", Some(days_from_today(-10))))
        .expect("seed");

    let amendment = |id: &str| Amendment {
        amendment_id: crate::passes::domain::AmendmentId(id.to_string()),
        application_id: application_id("A0001"),
        amendment_date: Utc::now(),
        original_value: "2025-09-21".to_string(),
        amended_value: "2025-10-21".to_string(),
    };

    let mut tx = store.begin(&application_id("A0001")).expect("begin");
    tx.insert_amendment(amendment("P01A0001")).expect("stage");
    tx.commit().expect("commit");

    let mut tx = store.begin(&application_id("A0001")).expect("begin");
    tx.insert_stvp(stvp("STVP0001", "A0001", 30)).expect("stage");
    tx.insert_amendment(amendment("P01A0001")).expect("stage");
    match tx.commit() {
        Err(RepositoryError::Conflict(detail)) => assert!(detail.contains("P01A0001")),
        other => panic!("expected conflict, got {other:?}"),
    }

    assert!(store.stvps(&application_id("A0001")).expect("read").is_empty());
    assert_eq!(amendment_ids(&store, "A0001"), vec!["P01A0001"]);
}

#[test]
fn insert_application_rejects_duplicates() {
    let store = InMemoryPassStore::default();
    store
        .insert_application(application("A0001", None))
        .expect("first insert");
    assert!(matches!(
        store.insert_application(application("A0001", None)),
        Err(RepositoryError::Conflict(_))
    ));
}
