use super::*;
use serde_json::{Value, json};
use time::macros::date;

fn rows(values: Value) -> Vec<Record> {
    Record::list_from_json(&values).unwrap()
}

fn payments() -> Vec<Record> {
    rows(json!([
        { "_id": "1", "course_type": "edge", "pay_option": "full", "timestamp": "2024-03-02T09:00:00Z" },
        { "_id": "2", "course_type": "edge+", "pay_option": "pre", "timestamp": "2024-03-15T09:00:00Z" },
        { "_id": "3", "course_type": "edge", "pay_option": "full", "timestamp": "2024-02-20T09:00:00Z" },
        { "_id": "4", "course_type": "bootcamp", "pay_option": "installments", "timestamp": "2024-02-01" },
        { "_id": "5", "course_type": "edge+", "pay_option": "full", "timestamp": "not a date" }
    ]))
}

#[test]
fn course_counts_split_edge_and_edge_plus() {
    assert_eq!(course_counts(&payments()), CourseCounts { total: 5, edge: 2, edge_plus: 2 });
    assert_eq!(course_counts(&[]), CourseCounts { total: 0, edge: 0, edge_plus: 0 });
}

#[test]
fn breakdown_rounds_shares_of_all_rows() {
    let shares = pay_option_breakdown(&payments(), DateRange::default());
    let summary: Vec<(&str, &str, usize, i64)> = shares
        .iter()
        .map(|s| (s.option.as_str(), s.label.as_str(), s.count, s.percentage))
        .collect();
    assert_eq!(summary, [("full", "Full Payment", 3, 60), ("pre", "Pre-payment", 1, 20)]);
}

#[test]
fn breakdown_rounds_half_up() {
    let shares = pay_option_breakdown(
        &rows(json!([{ "pay_option": "full" }, { "pay_option": "pre" }, { "pay_option": "pre" }])),
        DateRange::default(),
    );
    assert_eq!(shares[0].percentage, 33);
    assert_eq!(shares[1].percentage, 67);
}

#[test]
fn breakdown_of_nothing_is_zero() {
    let shares = pay_option_breakdown(&[], DateRange::default());
    assert!(shares.iter().all(|s| s.count == 0 && s.percentage == 0));
    assert_eq!(shares.len(), PAY_OPTIONS.len());
}

#[test]
fn breakdown_honors_inclusive_range() {
    let march = DateRange { from: Some(date!(2024 - 03 - 01)), to: Some(date!(2024 - 03 - 15)) };
    let shares = pay_option_breakdown(&payments(), march);
    assert_eq!((shares[0].count, shares[0].percentage), (1, 50));
    assert_eq!((shares[1].count, shares[1].percentage), (1, 50));

    let empty = DateRange { from: Some(date!(2025 - 01 - 01)), to: None };
    assert!(pay_option_breakdown(&payments(), empty).iter().all(|s| s.percentage == 0));
}

#[test]
fn undated_rows_fall_outside_bounded_ranges() {
    let undated = &payments()[4];
    assert!(DateRange::default().contains(undated));
    assert!(!DateRange { from: None, to: Some(date!(2030 - 01 - 01)) }.contains(undated));
}

#[test]
fn growth_compares_calendar_months() {
    let growth = month_growth(&payments(), date!(2024 - 03 - 20));
    assert_eq!(growth, MonthGrowth { this_month: 2, last_month: 2, percentage: 0 });

    let more = rows(json!([
        { "timestamp": "2024-03-01" },
        { "timestamp": "2024-03-02" },
        { "timestamp": "2024-03-03" },
        { "timestamp": "2024-02-10" },
        { "timestamp": "2024-02-11" }
    ]));
    assert_eq!(month_growth(&more, date!(2024 - 03 - 31)).percentage, 50);
    assert_eq!(month_growth(&more, date!(2024 - 04 - 01)).percentage, -100);
}

#[test]
fn growth_from_empty_last_month_is_full() {
    let fresh = rows(json!([{ "timestamp": "2024-03-01" }]));
    assert_eq!(month_growth(&fresh, date!(2024 - 03 - 09)).percentage, 100);
    assert_eq!(month_growth(&fresh, date!(2024 - 06 - 09)).percentage, 0);
}

#[test]
fn growth_wraps_january_to_previous_december() {
    let rows = rows(json!([
        { "timestamp": "2023-12-31T23:00:00Z" },
        { "timestamp": "2024-01-05T00:00:00Z" },
        { "timestamp": "2024-01-06T00:00:00Z" },
        { "timestamp": "2024-12-10T00:00:00Z" }
    ]));
    assert_eq!(month_growth(&rows, date!(2024 - 01 - 15)), MonthGrowth { this_month: 2, last_month: 1, percentage: 100 });
}

#[test]
fn summary_serializes_for_widgets() {
    let summary = payment_summary(&payments(), DateRange::default(), date!(2024 - 03 - 20));
    let value = serde_json::to_value(&summary).unwrap();
    assert_eq!(value["courses"], json!({ "total": 5, "edge": 2, "edge_plus": 2 }));
    assert_eq!(value["payOptions"][0]["label"], "Full Payment");
    assert_eq!(value["growth"]["percentage"], 0);
}
