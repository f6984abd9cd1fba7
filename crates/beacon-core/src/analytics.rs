//! # Sales Analytics
//!
//! Read-only aggregation over historical bill records - daily/weekly/monthly
//! rollups and payment-method summaries. Pure data transforms: deterministic
//! given the same bill list and reference date, no mutation, no control
//! logic.
//!
//! ## Window Semantics
//! ```text
//! daily_sales(d)    bills whose created_at falls on calendar day d
//! weekly_sales(d)   the 7-day window starting on the SUNDAY of d's week
//! monthly_sales(d)  bills in d's calendar month (year + month match)
//! ```

use chrono::{Datelike, Days, NaiveDate};
use std::collections::BTreeMap;

use crate::money::Money;
use crate::types::{Bill, PaymentMethod};

// =============================================================================
// Summaries
// =============================================================================

/// Count and revenue total for one grouping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SalesSummary {
    pub count: usize,
    pub total: Money,
}

/// Sums count and total over a set of bills.
pub fn summarize<'a>(bills: impl IntoIterator<Item = &'a Bill>) -> SalesSummary {
    let mut summary = SalesSummary::default();
    for bill in bills {
        summary.count += 1;
        summary.total += bill.total;
    }
    summary
}

// =============================================================================
// Rollups
// =============================================================================

/// Bills created on the given calendar day.
pub fn daily_sales<'a>(bills: &'a [Bill], date: NaiveDate) -> Vec<&'a Bill> {
    bills
        .iter()
        .filter(|b| b.created_at.date_naive() == date)
        .collect()
}

/// Bills in the 7-day window of the week containing `date`.
///
/// Weeks start on Sunday, matching register reporting conventions.
pub fn weekly_sales<'a>(bills: &'a [Bill], date: NaiveDate) -> Vec<&'a Bill> {
    let week_start = date - Days::new(date.weekday().num_days_from_sunday() as u64);
    let week_end = week_start + Days::new(7);

    bills
        .iter()
        .filter(|b| {
            let day = b.created_at.date_naive();
            day >= week_start && day < week_end
        })
        .collect()
}

/// Bills in the calendar month containing `date`.
pub fn monthly_sales<'a>(bills: &'a [Bill], date: NaiveDate) -> Vec<&'a Bill> {
    bills
        .iter()
        .filter(|b| {
            let day = b.created_at.date_naive();
            day.year() == date.year() && day.month() == date.month()
        })
        .collect()
}

/// Count and total grouped by payment method.
///
/// BTreeMap for stable iteration order in reports.
pub fn payment_method_summary(bills: &[Bill]) -> BTreeMap<PaymentMethod, SalesSummary> {
    let mut groups: BTreeMap<PaymentMethod, SalesSummary> = BTreeMap::new();
    for bill in bills {
        let entry = groups.entry(bill.payment_method).or_default();
        entry.count += 1;
        entry.total += bill.total;
    }
    groups
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::FeeDirection;
    use crate::money::FeeRate;
    use chrono::{DateTime, Utc};

    fn bill_on(ts: &str, total_cents: i64, method: PaymentMethod) -> Bill {
        Bill {
            bill_id: format!("BL{}", ts.replace(['-', ':', 'T', 'Z'], "")),
            items: Vec::new(),
            subtotal: Money::from_cents(total_cents),
            fee_percent: FeeRate::zero(),
            fee_direction: FeeDirection::Discount,
            fee_amount: Money::zero(),
            total: Money::from_cents(total_cents),
            payment_method: method,
            customer_name: None,
            customer_phone: None,
            created_at: DateTime::parse_from_rfc3339(ts)
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_daily_sales_filters_by_day() {
        let bills = vec![
            bill_on("2024-03-01T09:00:00Z", 5000, PaymentMethod::Cash),
            bill_on("2024-02-29T18:30:00Z", 3000, PaymentMethod::Card),
        ];

        let today = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let daily = daily_sales(&bills, today);
        assert_eq!(daily.len(), 1);
        assert_eq!(daily[0].total.cents(), 5000);
    }

    #[test]
    fn test_weekly_sales_sunday_window() {
        // 2024-03-06 is a Wednesday; its week runs Sun 03-03 .. Sat 03-09
        let bills = vec![
            bill_on("2024-03-03T00:00:00Z", 100, PaymentMethod::Cash), // Sunday, in
            bill_on("2024-03-09T23:59:59Z", 200, PaymentMethod::Cash), // Saturday, in
            bill_on("2024-03-02T12:00:00Z", 400, PaymentMethod::Cash), // prior Saturday, out
            bill_on("2024-03-10T00:00:00Z", 800, PaymentMethod::Cash), // next Sunday, out
        ];

        let wednesday = NaiveDate::from_ymd_opt(2024, 3, 6).unwrap();
        let weekly = weekly_sales(&bills, wednesday);
        assert_eq!(summarize(weekly.iter().copied()).total.cents(), 300);
    }

    #[test]
    fn test_monthly_sales_year_and_month_match() {
        let bills = vec![
            bill_on("2024-03-15T10:00:00Z", 100, PaymentMethod::Cash),
            bill_on("2024-03-01T10:00:00Z", 200, PaymentMethod::Card),
            bill_on("2023-03-20T10:00:00Z", 400, PaymentMethod::Cash), // same month, wrong year
            bill_on("2024-04-01T10:00:00Z", 800, PaymentMethod::Cash),
        ];

        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let monthly = monthly_sales(&bills, date);
        assert_eq!(monthly.len(), 2);
        assert_eq!(summarize(monthly.iter().copied()).total.cents(), 300);
    }

    #[test]
    fn test_payment_method_summary() {
        let bills = vec![
            bill_on("2024-03-01T09:00:00Z", 5000, PaymentMethod::Cash),
            bill_on("2024-03-01T10:00:00Z", 3000, PaymentMethod::Cash),
            bill_on("2024-03-01T11:00:00Z", 7000, PaymentMethod::Upi),
        ];

        let summary = payment_method_summary(&bills);
        assert_eq!(summary[&PaymentMethod::Cash].count, 2);
        assert_eq!(summary[&PaymentMethod::Cash].total.cents(), 8000);
        assert_eq!(summary[&PaymentMethod::Upi].count, 1);
        assert_eq!(summary[&PaymentMethod::Upi].total.cents(), 7000);
        assert!(!summary.contains_key(&PaymentMethod::Card));
    }

    #[test]
    fn test_rollups_are_pure() {
        let bills = vec![bill_on("2024-03-01T09:00:00Z", 5000, PaymentMethod::Cash)];
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let first = daily_sales(&bills, date).len();
        let second = daily_sales(&bills, date).len();
        assert_eq!(first, second);
        assert_eq!(bills.len(), 1);
    }
}
