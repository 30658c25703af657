//! Pure function computing subscription start/interim windows under the
//! "no collections before the season starts" policy and a payment-provider
//! buffer. No I/O; fully unit-testable.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;

pub const SEASON_CUTOFF_YEAR: i32 = 2025;
pub const SEASON_CUTOFF_MONTH: u32 = 8;
pub const SEASON_CUTOFF_DAY: u32 = 28;

pub const SEASON_END_YEAR: i32 = 2026;
pub const SEASON_END_MONTH: u32 = 5;
pub const SEASON_END_DAY: u32 = 31;

pub const PROVIDER_BUFFER_DAYS: i64 = 5;
pub const FAIRNESS_BOUNDARY_DAY: u32 = 10;

pub fn season_cutoff() -> NaiveDate {
    NaiveDate::from_ymd_opt(SEASON_CUTOFF_YEAR, SEASON_CUTOFF_MONTH, SEASON_CUTOFF_DAY).unwrap()
}

pub fn season_end() -> NaiveDate {
    NaiveDate::from_ymd_opt(SEASON_END_YEAR, SEASON_END_MONTH, SEASON_END_DAY).unwrap()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubscriptionPlan {
    pub ongoing_start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub create_interim: bool,
    pub interim_start: Option<NaiveDate>,
    pub interim_end: Option<NaiveDate>,
}

fn last_day_of_month(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    let first_of_next = NaiveDate::from_ymd_opt(next_year, next_month, 1).unwrap();
    first_of_next.pred_opt().unwrap()
}

/// The preferred-day occurrence in a given year/month, clamped to the last
/// valid day of that month when the day doesn't exist there or is `-1`
/// ("last day" sentinel).
fn occurrence_in_month(year: i32, month: u32, preferred_payment_day: i8) -> NaiveDate {
    if preferred_payment_day == -1 {
        return last_day_of_month(year, month);
    }
    NaiveDate::from_ymd_opt(year, month, preferred_payment_day as u32)
        .unwrap_or_else(|| last_day_of_month(year, month))
}

fn next_month(year: i32, month: u32) -> (i32, u32) {
    if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    }
}

/// The next occurrence of the preferred payment day at or after `today`:
/// try the current month, and if that candidate already passed, advance to
/// the next month.
fn next_occurrence(today: NaiveDate, preferred_payment_day: i8) -> NaiveDate {
    let candidate = occurrence_in_month(today.year(), today.month(), preferred_payment_day);
    if candidate < today {
        let (y, m) = next_month(today.year(), today.month());
        occurrence_in_month(y, m, preferred_payment_day)
    } else {
        candidate
    }
}

fn next_months_occurrence(today: NaiveDate, preferred_payment_day: i8) -> NaiveDate {
    let (y, m) = next_month(today.year(), today.month());
    occurrence_in_month(y, m, preferred_payment_day)
}

pub fn compute_plan(today: NaiveDate, preferred_payment_day: i8) -> SubscriptionPlan {
    let end_date = season_end();

    if today < season_cutoff() {
        let ongoing_start = occurrence_in_month(2025, 9, preferred_payment_day);
        return SubscriptionPlan {
            ongoing_start_date: ongoing_start,
            end_date,
            create_interim: false,
            interim_start: None,
            interim_end: None,
        };
    }

    let occurrence = next_occurrence(today, preferred_payment_day);
    let days_until = (occurrence - today).num_days();

    if days_until >= PROVIDER_BUFFER_DAYS {
        SubscriptionPlan {
            ongoing_start_date: occurrence,
            end_date,
            create_interim: false,
            interim_start: None,
            interim_end: None,
        }
    } else if today.day() > FAIRNESS_BOUNDARY_DAY {
        SubscriptionPlan {
            ongoing_start_date: next_months_occurrence(today, preferred_payment_day),
            end_date,
            create_interim: false,
            interim_start: None,
            interim_end: None,
        }
    } else {
        let interim_start = today + chrono::Duration::days(PROVIDER_BUFFER_DAYS);
        let interim_end = last_day_of_month(today.year(), today.month());
        SubscriptionPlan {
            ongoing_start_date: next_months_occurrence(today, preferred_payment_day),
            end_date,
            create_interim: true,
            interim_start: Some(interim_start),
            interim_end: Some(interim_end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pre_cutoff_always_september_no_interim() {
        let plan = compute_plan(date(2025, 6, 1), 15);
        assert!(!plan.create_interim);
        assert_eq!(plan.ongoing_start_date, date(2025, 9, 15));
        assert_eq!(plan.end_date, season_end());
    }

    #[test]
    fn pre_cutoff_clamps_invalid_day() {
        let plan = compute_plan(date(2025, 1, 1), -1);
        assert_eq!(plan.ongoing_start_date, date(2025, 9, 30));
    }

    #[test]
    fn buffer_satisfied_no_interim() {
        // today 2025-09-01, preferred day 10 -> 9 days until, >= buffer
        let plan = compute_plan(date(2025, 9, 1), 10);
        assert!(!plan.create_interim);
        assert_eq!(plan.ongoing_start_date, date(2025, 9, 10));
    }

    #[test]
    fn interim_path_scenario_4() {
        let plan = compute_plan(date(2025, 9, 8), 10);
        assert!(plan.create_interim);
        assert_eq!(plan.interim_start, Some(date(2025, 9, 13)));
        assert_eq!(plan.interim_end, Some(date(2025, 9, 30)));
        assert_eq!(plan.ongoing_start_date, date(2025, 10, 10));
        assert_eq!(plan.end_date, date(2026, 5, 31));
    }

    #[test]
    fn late_month_fairness_scenario_5() {
        let plan = compute_plan(date(2025, 9, 27), 30);
        assert!(!plan.create_interim);
        assert_eq!(plan.ongoing_start_date, date(2025, 10, 30));
    }

    #[test]
    fn december_to_january_rollover() {
        // today is late December, short on buffer, past fairness boundary
        let plan = compute_plan(date(2025, 12, 28), 5);
        assert!(!plan.create_interim);
        assert_eq!(plan.ongoing_start_date, date(2026, 1, 5));
    }

    #[test]
    fn invalid_day_clamps_to_february_end() {
        // preferred day 31 doesn't exist in February -> clamps to last day
        let plan = compute_plan(date(2026, 2, 1), 31);
        assert_eq!(plan.ongoing_start_date, date(2026, 2, 28));
    }
}
