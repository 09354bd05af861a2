//! Report rendering tests
//!
//! The formatter is a pure function over reconciliation results; these tests
//! pin the subject conventions, the currency formatting and the two report
//! shapes.

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

use shared::models::stock_take::{GrandTotals, LineReckoning};
use shared::report::{render_grand_report, render_line_report, render_transfer_report};

fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn sample_reckoning() -> LineReckoning {
    LineReckoning {
        sku: "SKU-1".to_string(),
        description: "widget".to_string(),
        xfer_price: dec("2.00"),
        retail_price: dec("3.50"),
        opening_stock: 50,
        closing_stock: 40,
        units_diff: -10,
        units_xferred: 10,
        units_sold: 15,
        units_shrunk: 5,
        unrecorded_history: 0,
        sold_value: dec("52.50"),
        shrinkage_value: dec("17.50"),
        xferred_value: dec("20.00"),
        unrecorded_value_at_xfer_price: dec("0.00"),
        unrecorded_value_at_retail_price: dec("0.00"),
        held_value_at_xfer_price: dec("80.00"),
        held_value_at_retail_price: dec("140.00"),
    }
}

fn sample_grand() -> GrandTotals {
    GrandTotals {
        held_opening_stock: 50,
        held_closing_stock: 40,
        units_transferred: 10,
        units_recorded_sold: 15,
        units_recorded_shrunk: 5,
        units_unrecorded_history: -3,
        value_recorded_sold: dec("52.50"),
        value_recorded_shrunk: dec("17.50"),
        value_unrecorded_at_xfer_price: dec("6.00"),
        value_unrecorded_at_retail_price: dec("10.50"),
        value_transferred: dec("1234.56"),
        held_value_at_xfer_price: dec("80.00"),
        held_value_at_retail_price: dec("140.00"),
        all_time_xfer_value: dec("10234.56"),
    }
}

#[test]
fn line_report_subject_names_the_account() {
    let taken_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let report = render_line_report("alice", taken_at, &[sample_reckoning()], "£");

    assert_eq!(
        report.subject,
        "[STOCK MANAGEMENT] Stock Take: Lines Report for alice"
    );
}

#[test]
fn line_report_carries_every_line_figure() {
    let taken_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let report = render_line_report("alice", taken_at, &[sample_reckoning()], "£");

    assert!(report.plaintext.contains("Stock line: SKU-1"));
    assert!(report.plaintext.contains("Opening stock units: 50"));
    assert!(report.plaintext.contains("Closing stock units: 40"));
    assert!(report.plaintext.contains("Stock units change: -10"));
    assert!(report.plaintext.contains("£52.50"));
    assert!(report.plaintext.contains("£80.00"));
    assert!(report.plaintext.contains("£140.00"));
    assert!(report.plaintext.contains("15 Jan 2024, 09:30:00 UTC"));
}

#[test]
fn line_report_html_is_marked_up() {
    let taken_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let report = render_line_report("alice", taken_at, &[sample_reckoning()], "£");

    assert!(report.html.starts_with("<html>"));
    assert!(report.html.contains("<li>Opening stock units: 50</li>"));
    assert!(report.html.trim_end().ends_with("</html>"));
    assert!(!report.plaintext.contains("<li>"));
}

#[test]
fn grand_report_formats_totals_with_grouping() {
    let taken_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let report = render_grand_report("alice", taken_at, &sample_grand(), "£");

    assert_eq!(
        report.subject,
        "[STOCK MANAGEMENT] Stock Take: Grand Totals Report for alice"
    );
    assert!(report.plaintext.contains("GRAND TOTALS FOR ACCOUNT: alice"));
    assert!(report.plaintext.contains("£1,234.56"));
    assert!(report.plaintext.contains("All time total transfer value: £10,234.56"));
    // the signed unit discrepancy keeps its sign in the report
    assert!(report
        .plaintext
        .contains("Change with unrecorded history since last stock take: -3"));
}

#[test]
fn grand_report_renders_both_bodies() {
    let taken_at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 30, 0).unwrap();
    let report = render_grand_report("alice", taken_at, &sample_grand(), "$");

    assert!(report.plaintext.contains("$1,234.56"));
    assert!(report.html.contains("<li>Held stock at current transfer price: $80.00</li>"));
}

#[test]
fn transfer_report_describes_the_transfer() {
    let when = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
    let report = render_transfer_report(
        "bob",
        "bob@example.com",
        "SKU-9",
        "gadget",
        12,
        dec("1.25"),
        when,
        "£",
    );

    assert_eq!(report.subject, "[STOCK MANAGEMENT] A transfer has taken place!");
    assert!(report.plaintext.contains("Transfer to: bob [bob@example.com]"));
    assert!(report.plaintext.contains("Units transferred: 12"));
    assert!(report.plaintext.contains("Unit price: £1.25"));
    assert!(report.html.contains("mailto:bob@example.com"));
}
