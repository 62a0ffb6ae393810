//! Business rules shared by the services and the guardian sweep.
//!
//! Everything here is pure: callers pass the current date or time in.

use chrono::{DateTime, Datelike, Duration, LocalResult, NaiveDate, TimeZone};
use uuid::Uuid;

use crate::models::PaymentStatus;

/// Age at which a customer no longer needs a guardian on file.
pub const ADULT_AGE: i32 = 18;

/// Whole years between `birth_date` and `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn requires_guardian(birth_date: NaiveDate, today: NaiveDate) -> bool {
    age_on(birth_date, today) < ADULT_AGE
}

pub fn guardian_removable(birth_date: NaiveDate, guardian_id: Option<Uuid>, today: NaiveDate) -> bool {
    guardian_id.is_some() && !requires_guardian(birth_date, today)
}

/// Net profit of a sale. Negative when sold below cost.
pub fn sale_profit(price: f64, cost: f64) -> f64 {
    price - cost
}

/// A paid sale reports `paid` unless it was cancelled.
pub fn settle_sale_status(paid: bool, status: PaymentStatus) -> PaymentStatus {
    if paid && status != PaymentStatus::Cancelled {
        PaymentStatus::Paid
    } else {
        status
    }
}

/// Next charge for a subscription billed on `billing_day`.
///
/// The billing day is clamped to the last day of short months, so day 31
/// bills on 30 April and on 28 or 29 February. Charges happen at local
/// midnight. If this month's charge is already behind `now`, the following
/// month's is returned, so the result is never earlier than `now`.
///
/// Returns `None` for a billing day outside `1..=31`.
pub fn next_billing_date<Tz: TimeZone>(now: &DateTime<Tz>, billing_day: u32) -> Option<DateTime<Tz>> {
    if !(1..=31).contains(&billing_day) {
        return None;
    }
    let tz = now.timezone();
    let today = now.date_naive();

    let this_month = clamped_date(today.year(), today.month(), billing_day)?;
    let candidate = local_midnight(&tz, this_month)?;
    if candidate >= *now {
        return Some(candidate);
    }

    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };
    local_midnight(&tz, clamped_date(year, month, billing_day)?)
}

fn days_in_month(year: i32, month: u32) -> Option<u32> {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)?
        .pred_opt()
        .map(|last| last.day())
}

fn clamped_date(year: i32, month: u32, day: u32) -> Option<NaiveDate> {
    let day = day.min(days_in_month(year, month)?);
    NaiveDate::from_ymd_opt(year, month, day)
}

fn local_midnight<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_hms_opt(0, 0, 0)?;
    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        // Midnight skipped by a DST change.
        LocalResult::None => tz
            .from_local_datetime(&(midnight + Duration::hours(1)))
            .earliest(),
    }
}
