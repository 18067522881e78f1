//! Summary — aggregates that feed the dashboard's payment widgets.
//!
//! DESIGN
//! ======
//! Pure functions over the rows a [`ResourceClient`](crate::resources::ResourceClient)
//! lists. Nothing here talks to the backend or renders anything; callers pass
//! the rows and, where a calendar matters, today's date.
//!
//! Percentages round half up to whole numbers. An empty input gives zero
//! percentages, never a division by zero.

#[cfg(test)]
#[path = "summary_test.rs"]
mod tests;

use serde::Serialize;
use time::{Date, Month};

use crate::records::{Record, ScalarValue};

pub const COURSE_TYPE_FIELD: &str = "course_type";
pub const PAY_OPTION_FIELD: &str = "pay_option";
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// `pay_option` values and their labels, in display order.
pub const PAY_OPTIONS: &[(&str, &str)] = &[("full", "Full Payment"), ("pre", "Pre-payment")];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CourseCounts {
    pub total: usize,
    pub edge: usize,
    pub edge_plus: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PayOptionShare {
    pub option: String,
    pub label: String,
    pub count: usize,
    pub percentage: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MonthGrowth {
    pub this_month: usize,
    pub last_month: usize,
    /// Change against last month. 100 when last month had nothing and this
    /// month has something.
    pub percentage: i64,
}

/// Inclusive calendar-day window on the payment timestamp. Open ends match
/// everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<Date>,
    pub to: Option<Date>,
}

impl DateRange {
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }

    /// Rows without a parseable timestamp fall outside any bounded range.
    #[must_use]
    pub fn contains(&self, row: &Record) -> bool {
        if self.is_open() {
            return true;
        }
        let Some(day) = payment_day(row) else {
            return false;
        };
        self.from.is_none_or(|from| day >= from) && self.to.is_none_or(|to| day <= to)
    }
}

// =============================================================================
// AGGREGATES
// =============================================================================

/// Everything the payment widgets show, in one serializable value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentSummary {
    pub courses: CourseCounts,
    pub pay_options: Vec<PayOptionShare>,
    pub growth: MonthGrowth,
}

#[must_use]
pub fn payment_summary(rows: &[Record], range: DateRange, today: Date) -> PaymentSummary {
    PaymentSummary {
        courses: course_counts(rows),
        pay_options: pay_option_breakdown(rows, range),
        growth: month_growth(rows, today),
    }
}

#[must_use]
pub fn course_counts(rows: &[Record]) -> CourseCounts {
    CourseCounts {
        total: rows.len(),
        edge: count_text(rows, COURSE_TYPE_FIELD, "edge"),
        edge_plus: count_text(rows, COURSE_TYPE_FIELD, "edge+"),
    }
}

/// Share of each known `pay_option` among the rows inside `range`.
#[must_use]
pub fn pay_option_breakdown(rows: &[Record], range: DateRange) -> Vec<PayOptionShare> {
    let selected: Vec<Record> = rows.iter().filter(|r| range.contains(r)).cloned().collect();
    PAY_OPTIONS
        .iter()
        .map(|(option, label)| {
            let count = count_text(&selected, PAY_OPTION_FIELD, option);
            PayOptionShare {
                option: (*option).to_owned(),
                label: (*label).to_owned(),
                count,
                percentage: percent(count, selected.len()),
            }
        })
        .collect()
}

/// Payments this calendar month against last, by UTC timestamp.
#[must_use]
pub fn month_growth(rows: &[Record], today: Date) -> MonthGrowth {
    let this = (today.year(), today.month());
    let last = match today.month() {
        Month::January => (today.year() - 1, Month::December),
        month => (today.year(), month.previous()),
    };

    let in_month = |(year, month): (i32, Month)| {
        rows.iter()
            .filter_map(payment_day)
            .filter(|day| day.year() == year && day.month() == month)
            .count()
    };
    let this_month = in_month(this);
    let last_month = in_month(last);

    let percentage = if last_month > 0 {
        #[allow(clippy::cast_possible_wrap)]
        let delta = this_month as i64 - last_month as i64;
        ratio_percent(delta, last_month)
    } else if this_month > 0 {
        100
    } else {
        0
    };
    MonthGrowth { this_month, last_month, percentage }
}

// =============================================================================
// HELPERS
// =============================================================================

fn count_text(rows: &[Record], field: &str, wanted: &str) -> usize {
    rows.iter()
        .filter(|row| matches!(row.get(field), Some(ScalarValue::Text(value)) if value == wanted))
        .count()
}

fn payment_day(row: &Record) -> Option<Date> {
    match row.get(TIMESTAMP_FIELD)? {
        ScalarValue::Date(at) => Some(at.date()),
        _ => None,
    }
}

#[allow(clippy::cast_possible_wrap)]
fn percent(part: usize, total: usize) -> i64 {
    if total == 0 {
        return 0;
    }
    ratio_percent(part as i64, total)
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]
fn ratio_percent(part: i64, whole: usize) -> i64 {
    let value = part as f64 / whole as f64 * 100.0;
    (value + 0.5).floor() as i64
}
