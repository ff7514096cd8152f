use super::common::*;
use crate::passes::domain::{
    canonical_date, parse_canonical_date, AmendmentId, HolderId, PassType, ValidationError,
};
use chrono::NaiveDate;

#[test]
fn holder_id_accepts_letter_digits_alnum_pattern() {
    let fin = HolderId::parse("S1234567X").expect("valid FIN");
    assert_eq!(fin.as_str(), "S1234567X");
    assert!(HolderId::parse("G76543210").is_ok());
}

#[test]
fn holder_id_reports_the_failing_rule() {
    assert_eq!(
        HolderId::parse("S123"),
        Err(ValidationError::HolderIdLength { length: 4 })
    );
    assert_eq!(
        HolderId::parse("11234567X"),
        Err(ValidationError::HolderIdPrefix)
    );
    assert_eq!(
        HolderId::parse("S12345A7X"),
        Err(ValidationError::HolderIdDigits)
    );
    assert_eq!(
        HolderId::parse("S1234567-"),
        Err(ValidationError::HolderIdSuffix)
    );
}

#[test]
fn holder_id_deserialization_validates() {
    let parsed: Result<HolderId, _> = serde_json::from_str("\"INVALID\"");
    assert!(parsed.is_err());
    let parsed: HolderId = serde_json::from_str("\"F7654321K\"").expect("valid FIN");
    assert_eq!(parsed.as_str(), "F7654321K");
}

#[test]
fn canonical_dates_must_be_zero_padded() {
    let date = parse_canonical_date("2025-03-07").expect("canonical date");
    assert_eq!(date, NaiveDate::from_ymd_opt(2025, 3, 7).expect("valid"));
    assert_eq!(canonical_date(date), "2025-03-07");

    for raw in ["invalid-date", "2025-3-7", "07/03/2025", "2025-02-30", ""] {
        match parse_canonical_date(raw) {
            Err(ValidationError::InvalidDate { value }) => assert_eq!(value, raw),
            other => panic!("expected invalid date for {raw:?}, got {other:?}"),
        }
    }
}

#[test]
fn amendment_ids_embed_padded_sequence_and_application() {
    let id = application_id("A0001");
    assert_eq!(AmendmentId::for_sequence(1, &id).0, "P01A0001");
    assert_eq!(AmendmentId::for_sequence(12, &id).0, "P12A0001");
    assert_eq!(AmendmentId::for_sequence(100, &id).0, "P100A0001");
}

#[test]
fn pass_types_serialize_as_display_labels() {
    let json = serde_json::to_string(&PassType::DependantsPass).expect("serialize");
    assert_eq!(json, "\"Dependant's Pass\"");
    let parsed: PassType = serde_json::from_str("\"S Pass\"").expect("deserialize");
    assert_eq!(parsed, PassType::SPass);
    assert_eq!(parsed.label(), "S Pass");
}

#[test]
fn application_serializes_legacy_date_columns() {
    let record = application("A0001", Some(days_from_today(-10)));
    let value = serde_json::to_value(&record).expect("serialize");
    assert_eq!(value["doe"], "2025-09-21");
    assert_eq!(value["doa"], "2025-09-01");
    assert_eq!(value["fin"], "S1234567X");
    assert_eq!(value["status"], "Issued");
}
