use chrono::{Datelike, NaiveDate, Utc};
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct NameOutcome {
    pub normalized: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameError {
    InvalidChars,
    TooFewTokens,
}

impl NameError {
    pub fn kind(self) -> &'static str {
        match self {
            NameError::InvalidChars => "invalid_chars",
            NameError::TooFewTokens => "too_few_tokens",
        }
    }
}

/// Curly-quote fold, token/character checks (spec §4.2 `person_name_validation`).
pub fn validate_person_name(raw: &str) -> Result<NameOutcome, NameError> {
    let folded: String = raw
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{02BC}' => '\'',
            other => other,
        })
        .collect();
    let trimmed = folded.trim();

    let allowed = |c: char| c.is_ascii_alphabetic() || c == ' ' || c == '-' || c == '\'';
    if trimmed.is_empty() || !trimmed.chars().all(allowed) {
        return Err(NameError::InvalidChars);
    }

    let tokens: Vec<&str> = trimmed.split_whitespace().collect();
    if tokens.len() < 2 || tokens.iter().any(|t| t.chars().count() < 2) {
        return Err(NameError::TooFewTokens);
    }

    Ok(NameOutcome {
        normalized: tokens.join(" "),
    })
}

#[derive(Debug, Clone)]
pub struct DobOutcome {
    pub iso_date: String,
    pub formatted: String,
    pub birth_year: i32,
    pub age_group: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DobError {
    Unparseable,
    InFuture,
    TooOld,
}

impl DobError {
    pub fn kind(self) -> &'static str {
        match self {
            DobError::Unparseable => "unparseable",
            DobError::InFuture => "in_future",
            DobError::TooOld => "too_old",
        }
    }
}

const DATE_LAYOUTS: &[&str] = &["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%d %b %Y", "%d %B %Y"];

const MINIMUM_BIRTH_YEAR: i32 = 2007;

/// Age-group cutoff year used to compute `U<n>` bands. Resolved once here
/// rather than threaded through every call site; matches the season cutoff
/// `club-subscription` uses for the 25/26 season.
const AGE_BAND_ASSESSMENT_YEAR: i32 = 2025;

/// School-year cutoff month/day: a child born on or after 1 September belongs
/// to the following school year's age band (spec §4.6 step 3, GLOSSARY
/// "Age group").
const AGE_BAND_CUTOFF_MONTH: u32 = 9;
const AGE_BAND_CUTOFF_DAY: u32 = 1;

fn parse_any_layout(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    DATE_LAYOUTS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
}

pub fn validate_child_dob(raw: &str) -> Result<DobOutcome, DobError> {
    let date = parse_any_layout(raw).ok_or(DobError::Unparseable)?;
    let today = Utc::now().date_naive();
    if date > today {
        return Err(DobError::InFuture);
    }
    if date.year() < MINIMUM_BIRTH_YEAR {
        return Err(DobError::TooOld);
    }

    // School year runs September-August: a child born in Sept-Dec belongs to
    // the same cohort as one born the following Jan-Aug, so the cohort's
    // starting year is the birth year itself from September onward, and the
    // prior year otherwise.
    let school_year_start = if (date.month(), date.day()) >= (AGE_BAND_CUTOFF_MONTH, AGE_BAND_CUTOFF_DAY) {
        date.year()
    } else {
        date.year() - 1
    };
    let age = (AGE_BAND_ASSESSMENT_YEAR - school_year_start).max(0);
    let age_group = if age >= 18 {
        "Open Age".to_string()
    } else {
        format!("U{age}")
    };

    Ok(DobOutcome {
        iso_date: date.format("%Y-%m-%d").to_string(),
        formatted: date.format("%d-%m-%Y").to_string(),
        birth_year: date.year(),
        age_group,
    })
}

#[derive(Debug, Clone)]
pub struct MedicalOutcome {
    pub normalized: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MedicalError {
    NeedsFollowup,
}

impl MedicalError {
    pub fn kind(self) -> &'static str {
        "needs_followup"
    }
}

fn critical_conditions() -> &'static [&'static str] {
    &["epilepsy", "diabetes", "anaphylaxis", "severe allerg", "heart condition"]
}

/// `has_medical_issues` + free-text `details`; critical conditions require
/// enough detail to be useful downstream (spec §4.2 `medical_issues_validation`).
pub fn validate_medical_issues(has_medical_issues: bool, details: Option<&str>) -> Result<MedicalOutcome, MedicalError> {
    if !has_medical_issues {
        return Ok(MedicalOutcome {
            normalized: "none".to_string(),
        });
    }

    let details = details.unwrap_or("").trim();
    if details.is_empty() {
        return Err(MedicalError::NeedsFollowup);
    }

    let normalized: String = details
        .split([',', ';'])
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let lower = normalized.to_lowercase();
    let mentions_critical = critical_conditions().iter().any(|c| lower.contains(c));
    if mentions_critical && normalized.len() < 15 {
        return Err(MedicalError::NeedsFollowup);
    }

    Ok(MedicalOutcome { normalized })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressAreaError {
    OutOfArea,
    Incomplete,
}

impl AddressAreaError {
    pub fn kind(self) -> &'static str {
        match self {
            AddressAreaError::OutOfArea => "out_of_area",
            AddressAreaError::Incomplete => "incomplete",
        }
    }
}

const SERVED_POSTCODE_PREFIXES: &[&str] = &["CR", "SW", "SE", "BR", "TW"];

fn uk_postcode_regex() -> &'static regex::Regex {
    static RE: OnceLock<regex::Regex> = OnceLock::new();
    RE.get_or_init(|| regex::Regex::new(r"(?i)\b([A-Z]{1,2})[0-9][A-Z0-9]?\s*[0-9][A-Z]{2}\b").unwrap())
}

/// Confirms a full address string looks UK-shaped and within the served area.
pub fn validate_address_in_area(full_address: &str) -> Result<(), AddressAreaError> {
    let parts: Vec<&str> = full_address.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();
    if parts.len() < 2 {
        return Err(AddressAreaError::Incomplete);
    }

    let caps = uk_postcode_regex()
        .captures(full_address)
        .ok_or(AddressAreaError::Incomplete)?;
    let prefix = caps.get(1).unwrap().as_str().to_uppercase();

    if !SERVED_POSTCODE_PREFIXES.contains(&prefix.as_str()) {
        return Err(AddressAreaError::OutOfArea);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn folds_curly_apostrophe() {
        let out = validate_person_name("O\u{2019}Brien Junior").unwrap();
        assert_eq!(out.normalized, "O'Brien Junior");
    }

    #[test]
    fn rejects_single_token() {
        assert_eq!(validate_person_name("Madonna").unwrap_err(), NameError::TooFewTokens);
    }

    #[test]
    fn rejects_single_letter_token() {
        assert_eq!(validate_person_name("J Smith").unwrap_err(), NameError::TooFewTokens);
    }

    #[test]
    fn rejects_digits() {
        assert_eq!(validate_person_name("John Sm1th").unwrap_err(), NameError::InvalidChars);
    }

    #[test]
    fn parses_iso_dob() {
        let out = validate_child_dob("2016-04-02").unwrap();
        assert_eq!(out.formatted, "02-04-2016");
        // Born before the 1 September cutoff: cohort starts the prior year.
        assert_eq!(out.age_group, "U10");
    }

    #[test]
    fn same_birth_year_splits_across_september_cutoff() {
        let before_cutoff = validate_child_dob("2016-08-31").unwrap();
        let after_cutoff = validate_child_dob("2016-09-01").unwrap();
        assert_eq!(before_cutoff.age_group, "U10");
        assert_eq!(after_cutoff.age_group, "U9");
    }

    #[test]
    fn parses_slash_dob() {
        let out = validate_child_dob("02/04/2016").unwrap();
        assert_eq!(out.iso_date, "2016-04-02");
    }

    #[test]
    fn rejects_too_old() {
        assert_eq!(validate_child_dob("1999-01-01").unwrap_err(), DobError::TooOld);
    }

    #[test]
    fn rejects_future_date() {
        assert_eq!(validate_child_dob("2099-01-01").unwrap_err(), DobError::InFuture);
    }

    #[test]
    fn no_issues_normalizes_to_none() {
        let out = validate_medical_issues(false, None).unwrap();
        assert_eq!(out.normalized, "none");
    }

    #[test]
    fn critical_condition_without_detail_needs_followup() {
        assert_eq!(
            validate_medical_issues(true, Some("epilepsy")).unwrap_err(),
            MedicalError::NeedsFollowup
        );
    }

    #[test]
    fn non_critical_short_detail_passes() {
        let out = validate_medical_issues(true, Some("mild hayfever")).unwrap();
        assert_eq!(out.normalized, "mild hayfever");
    }

    #[test]
    fn in_area_postcode_passes() {
        assert!(validate_address_in_area("12 High Street, Croydon, CR0 1AA").is_ok());
    }

    #[test]
    fn out_of_area_postcode_rejected() {
        assert_eq!(
            validate_address_in_area("1 Main St, Glasgow, G1 1AA").unwrap_err(),
            AddressAreaError::OutOfArea
        );
    }

    #[test]
    fn incomplete_address_rejected() {
        assert_eq!(
            validate_address_in_area("CR0 1AA").unwrap_err(),
            AddressAreaError::Incomplete
        );
    }
}
