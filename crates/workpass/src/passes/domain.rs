use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Wire and storage format for every date the workflow records.
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%d";

/// Identifier wrapper for work-pass applications (e.g. `A0001`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier wrapper for short-term visit passes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StvpId(pub String);

impl StvpId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}

/// Amendment identifier of the form `P<seq:02><application id>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AmendmentId(pub String);

impl AmendmentId {
    pub fn for_sequence(sequence: usize, application_id: &ApplicationId) -> Self {
        Self(format!("P{sequence:02}{}", application_id.0))
    }

    /// Sequence number encoded in the identifier, if it was issued for `application_id`.
    pub fn sequence(&self, application_id: &ApplicationId) -> Option<usize> {
        self.0
            .strip_prefix('P')?
            .strip_suffix(application_id.0.as_str())?
            .parse()
            .ok()
    }
}

impl fmt::Display for AmendmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Malformed caller input, rejected before any storage is touched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("invalid date format '{value}': use YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("FIN must be 9 characters (found {length})")]
    HolderIdLength { length: usize },
    #[error("FIN must start with a letter")]
    HolderIdPrefix,
    #[error("FIN characters 2-8 must be digits")]
    HolderIdDigits,
    #[error("FIN must end with a letter or digit")]
    HolderIdSuffix,
}

/// Parse a date given in the canonical zero-padded `YYYY-MM-DD` form.
pub fn parse_canonical_date(raw: &str) -> Result<NaiveDate, ValidationError> {
    let trimmed = raw.trim();
    let invalid = || ValidationError::InvalidDate {
        value: raw.to_string(),
    };

    let date = NaiveDate::parse_from_str(trimmed, CANONICAL_DATE_FORMAT).map_err(|_| invalid())?;
    // chrono accepts unpadded fields; the stored representation must round-trip.
    if canonical_date(date) != trimmed {
        return Err(invalid());
    }
    Ok(date)
}

pub fn canonical_date(date: NaiveDate) -> String {
    date.format(CANONICAL_DATE_FORMAT).to_string()
}

/// Foreign identification number carried by the pass holder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HolderId(String);

impl HolderId {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let chars: Vec<char> = raw.chars().collect();
        if chars.len() != 9 {
            return Err(ValidationError::HolderIdLength {
                length: chars.len(),
            });
        }
        if !chars[0].is_ascii_alphabetic() {
            return Err(ValidationError::HolderIdPrefix);
        }
        if !chars[1..8].iter().all(char::is_ascii_digit) {
            return Err(ValidationError::HolderIdDigits);
        }
        if !chars[8].is_ascii_alphanumeric() {
            return Err(ValidationError::HolderIdSuffix);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HolderId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HolderId> for String {
    fn from(value: HolderId) -> Self {
        value.0
    }
}

/// Work-pass categories an application can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PassType {
    #[serde(rename = "Employment Pass")]
    EmploymentPass,
    #[serde(rename = "EntrePass")]
    EntrePass,
    #[serde(rename = "S Pass")]
    SPass,
    #[serde(rename = "Dependant's Pass")]
    DependantsPass,
    #[serde(rename = "Long-Term Visit Pass")]
    LongTermVisitPass,
}

impl PassType {
    pub const fn label(self) -> &'static str {
        match self {
            PassType::EmploymentPass => "Employment Pass",
            PassType::EntrePass => "EntrePass",
            PassType::SPass => "S Pass",
            PassType::DependantsPass => "Dependant's Pass",
            PassType::LongTermVisitPass => "Long-Term Visit Pass",
        }
    }
}

/// Processing status of a filing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicationStatus {
    Pending,
    Approved,
    Rejected,
    Withdrawn,
    Cancelled,
    Issued,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Pending => "Pending",
            ApplicationStatus::Approved => "Approved",
            ApplicationStatus::Rejected => "Rejected",
            ApplicationStatus::Withdrawn => "Withdrawn",
            ApplicationStatus::Cancelled => "Cancelled",
            ApplicationStatus::Issued => "Issued",
        }
    }
}

/// One work-pass filing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub id: ApplicationId,
    pub fin: HolderId,
    pub name: String,
    pub pass_type: PassType,
    #[serde(rename = "doa")]
    pub date_of_application: NaiveDate,
    pub company_uen: String,
    pub status: ApplicationStatus,
    #[serde(rename = "doe")]
    pub date_of_expiry: Option<NaiveDate>,
}

/// Short-term visit pass window granted after the primary pass lapsed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stvp {
    pub id: StvpId,
    pub application_id: ApplicationId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Immutable audit entry for one date change on an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amendment {
    pub amendment_id: AmendmentId,
    pub application_id: ApplicationId,
    pub amendment_date: DateTime<Utc>,
    pub original_value: String,
    pub amended_value: String,
}
