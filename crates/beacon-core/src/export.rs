//! # CSV Export
//!
//! Projects bill records to the fixed CSV report format and parses that
//! format back into summaries. Stateless - a pure projection, the items
//! themselves are not round-tripped (the report carries only their count).
//!
//! ## Column Layout
//! ```text
//! Bill Number,Date,Customer Name,Phone,Items Count,Subtotal,Discount %,Discount Amount,Total,Payment Method
//! BL20240301042,2024-03-01T09:30:00+00:00,Asha,9876543210,2,130.00,10,13.00,117.00,Cash
//! ```
//! The "Discount" columns carry the bill's fee regardless of direction; a
//! tax-direction bill reports its tax there.

use chrono::{DateTime, Utc};
use std::io;
use thiserror::Error;

use crate::money::{FeeRate, Money};
use crate::types::{Bill, PaymentMethod};

/// The fixed report header, in order.
pub const CSV_HEADERS: [&str; 10] = [
    "Bill Number",
    "Date",
    "Customer Name",
    "Phone",
    "Items Count",
    "Subtotal",
    "Discount %",
    "Discount Amount",
    "Total",
    "Payment Method",
];

// =============================================================================
// Export Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Row {row}: invalid {field}: '{value}'")]
    InvalidField {
        row: usize,
        field: &'static str,
        value: String,
    },
}

pub type ExportResult<T> = Result<T, ExportError>;

// =============================================================================
// Bill Summary (parsed row)
// =============================================================================

/// One parsed report row. Items are represented only by their count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillSummary {
    pub bill_id: String,
    pub date: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items_count: usize,
    pub subtotal: Money,
    pub fee_percent: FeeRate,
    pub fee_amount: Money,
    pub total: Money,
    pub payment_method: PaymentMethod,
}

// =============================================================================
// Writing
// =============================================================================

/// Writes bills as CSV to any writer.
pub fn write_bills_csv<W: io::Write>(writer: W, bills: &[Bill]) -> ExportResult<()> {
    let mut out = csv::Writer::from_writer(writer);
    out.write_record(CSV_HEADERS)?;

    for bill in bills {
        out.write_record([
            bill.bill_id.as_str(),
            &bill.created_at.to_rfc3339(),
            bill.customer_name.as_deref().unwrap_or(""),
            bill.customer_phone.as_deref().unwrap_or(""),
            &bill.items.len().to_string(),
            &bill.subtotal.to_string(),
            &bill.fee_percent.to_string(),
            &bill.fee_amount.to_string(),
            &bill.total.to_string(),
            &bill.payment_method.to_string(),
        ])?;
    }

    out.flush()?;
    Ok(())
}

/// Renders bills to an in-memory CSV string.
pub fn bills_to_csv_string(bills: &[Bill]) -> ExportResult<String> {
    let mut buf = Vec::new();
    write_bills_csv(&mut buf, bills)?;
    // The writer only ever emits valid UTF-8
    Ok(String::from_utf8(buf).expect("csv output is utf-8"))
}

// =============================================================================
// Reading
// =============================================================================

/// Parses the CSV report format back into bill summaries.
pub fn read_bills_csv<R: io::Read>(reader: R) -> ExportResult<Vec<BillSummary>> {
    let mut input = csv::Reader::from_reader(reader);
    let mut rows = Vec::new();

    for (idx, record) in input.records().enumerate() {
        let record = record?;
        let row = idx + 2; // 1-based, after the header line
        let field = |i: usize| record.get(i).unwrap_or("").to_string();

        let date = DateTime::parse_from_rfc3339(&field(1))
            .map_err(|_| ExportError::InvalidField {
                row,
                field: "Date",
                value: field(1),
            })?
            .with_timezone(&Utc);

        let items_count =
            field(4)
                .parse::<usize>()
                .map_err(|_| ExportError::InvalidField {
                    row,
                    field: "Items Count",
                    value: field(4),
                })?;

        let payment_method =
            PaymentMethod::parse(&field(9)).ok_or_else(|| ExportError::InvalidField {
                row,
                field: "Payment Method",
                value: field(9),
            })?;

        rows.push(BillSummary {
            bill_id: field(0),
            date,
            customer_name: non_empty(field(2)),
            customer_phone: non_empty(field(3)),
            items_count,
            subtotal: parse_money(row, "Subtotal", &field(5))?,
            fee_percent: parse_rate(row, "Discount %", &field(6))?,
            fee_amount: parse_money(row, "Discount Amount", &field(7))?,
            total: parse_money(row, "Total", &field(8))?,
            payment_method,
        });
    }

    Ok(rows)
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

/// Parses a "117.00"-style decimal into cents. Accepts 0, 1 or 2 fraction
/// digits; anything beyond that is rejected rather than silently truncated.
fn parse_money(row: usize, field: &'static str, value: &str) -> ExportResult<Money> {
    let invalid = || ExportError::InvalidField {
        row,
        field,
        value: value.to_string(),
    };

    let value = value.trim();
    let (negative, digits) = match value.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, value),
    };

    let (whole, frac) = match digits.split_once('.') {
        Some((w, f)) => (w, f),
        None => (digits, ""),
    };

    if whole.is_empty() || frac.len() > 2 {
        return Err(invalid());
    }

    let whole: i64 = whole.parse().map_err(|_| invalid())?;
    let frac: i64 = if frac.is_empty() {
        0
    } else {
        let padded = format!("{:0<2}", frac);
        padded.parse().map_err(|_| invalid())?
    };

    let cents = whole * 100 + frac;
    Ok(Money::from_cents(if negative { -cents } else { cents }))
}

/// Parses a "10" / "8.25" percentage into basis points.
fn parse_rate(row: usize, field: &'static str, value: &str) -> ExportResult<FeeRate> {
    let invalid = || ExportError::InvalidField {
        row,
        field,
        value: value.to_string(),
    };

    // Same shape as money, scaled ×100 into bps
    let as_money = parse_money(row, field, value)?;
    let bps = as_money.cents();
    if !(0..=10000).contains(&bps) {
        return Err(invalid());
    }
    Ok(FeeRate::from_bps(bps as u32))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::{CartLine, FeeDirection};
    use crate::money::Quantity;

    fn sample_bill() -> Bill {
        Bill {
            bill_id: "BL20240301042".to_string(),
            items: vec![
                CartLine {
                    product_id: 1,
                    barcode: "1001".to_string(),
                    name: "Rice".to_string(),
                    unit: "kg".to_string(),
                    price: Money::from_cents(5000),
                    original_price: None,
                    quantity: Quantity::from_units(2),
                },
                CartLine {
                    product_id: 7,
                    barcode: "1007".to_string(),
                    name: "Bread".to_string(),
                    unit: "pcs".to_string(),
                    price: Money::from_cents(3000),
                    original_price: None,
                    quantity: Quantity::one(),
                },
            ],
            subtotal: Money::from_cents(13000),
            fee_percent: FeeRate::from_percent(10),
            fee_direction: FeeDirection::Discount,
            fee_amount: Money::from_cents(1300),
            total: Money::from_cents(11700),
            payment_method: PaymentMethod::Cash,
            customer_name: Some("Asha".to_string()),
            customer_phone: Some("9876543210".to_string()),
            created_at: DateTime::parse_from_rfc3339("2024-03-01T09:30:00Z")
                .unwrap()
                .with_timezone(&Utc),
        }
    }

    #[test]
    fn test_header_line() {
        let csv = bills_to_csv_string(&[]).unwrap();
        assert_eq!(
            csv.trim_end(),
            "Bill Number,Date,Customer Name,Phone,Items Count,Subtotal,\
             Discount %,Discount Amount,Total,Payment Method"
        );
    }

    #[test]
    fn test_round_trip_preserves_key_fields() {
        let bill = sample_bill();
        let csv = bills_to_csv_string(std::slice::from_ref(&bill)).unwrap();
        let parsed = read_bills_csv(csv.as_bytes()).unwrap();

        assert_eq!(parsed.len(), 1);
        let row = &parsed[0];
        assert_eq!(row.bill_id, bill.bill_id);
        assert_eq!(row.total, bill.total); // exact to 2 decimals
        assert_eq!(row.payment_method, bill.payment_method);
        assert_eq!(row.items_count, 2);
        assert_eq!(row.subtotal, bill.subtotal);
        assert_eq!(row.fee_percent, bill.fee_percent);
        assert_eq!(row.customer_name.as_deref(), Some("Asha"));
    }

    #[test]
    fn test_round_trip_without_customer() {
        let mut bill = sample_bill();
        bill.customer_name = None;
        bill.customer_phone = None;

        let csv = bills_to_csv_string(std::slice::from_ref(&bill)).unwrap();
        let parsed = read_bills_csv(csv.as_bytes()).unwrap();
        assert_eq!(parsed[0].customer_name, None);
        assert_eq!(parsed[0].customer_phone, None);
    }

    #[test]
    fn test_parse_money_shapes() {
        assert_eq!(parse_money(2, "Total", "117.00").unwrap().cents(), 11700);
        assert_eq!(parse_money(2, "Total", "117.5").unwrap().cents(), 11750);
        assert_eq!(parse_money(2, "Total", "117").unwrap().cents(), 11700);
        assert_eq!(parse_money(2, "Total", "-5.50").unwrap().cents(), -550);

        assert!(parse_money(2, "Total", "117.005").is_err());
        assert!(parse_money(2, "Total", "abc").is_err());
        assert!(parse_money(2, "Total", "").is_err());
    }

    #[test]
    fn test_parse_rate_shapes() {
        assert_eq!(parse_rate(2, "Discount %", "10").unwrap().bps(), 1000);
        assert_eq!(parse_rate(2, "Discount %", "8.25").unwrap().bps(), 825);
        assert!(parse_rate(2, "Discount %", "101").is_err());
        assert!(parse_rate(2, "Discount %", "-1").is_err());
    }

    #[test]
    fn test_invalid_method_rejected() {
        let csv = "Bill Number,Date,Customer Name,Phone,Items Count,Subtotal,Discount %,Discount Amount,Total,Payment Method\n\
                   BL1,2024-03-01T09:30:00+00:00,,,1,10.00,0,0.00,10.00,Bitcoin\n";
        let err = read_bills_csv(csv.as_bytes()).unwrap_err();
        assert!(matches!(
            err,
            ExportError::InvalidField {
                field: "Payment Method",
                ..
            }
        ));
    }
}
