//! Text table and CSV rendering of report rows.

use std::io;

use crate::domain::{Decimal, ReportRow};

/// Column order shared by the table and the CSV output.
pub const COLUMNS: [&str; 11] = [
    "NUM_SHARES",
    "BUY_DATE",
    "BUY_PRICE_PER_SHARE",
    "SELL_DATE",
    "SELL_PRICE_PER_SHARE",
    "TICKER",
    "NAME",
    "ISIN",
    "CURRENCY",
    "TAX_YEAR",
    "RESULT",
];

fn exact_fields(row: &ReportRow) -> [String; 11] {
    [
        row.num_shares.to_string(),
        row.buy_date.to_string(),
        row.buy_price_per_share.to_string(),
        row.sell_date.to_string(),
        row.sell_price_per_share.to_string(),
        row.ticker.to_string(),
        row.name.clone(),
        row.isin.to_string(),
        row.currency.clone(),
        row.tax_year.to_string(),
        row.result.to_string(),
    ]
}

fn display_fields(row: &ReportRow) -> [String; 11] {
    [
        row.num_shares.to_fixed(6),
        row.buy_date.to_string(),
        row.buy_price_per_share.to_fixed(4),
        row.sell_date.to_string(),
        row.sell_price_per_share.to_fixed(4),
        row.ticker.to_string(),
        row.name.clone(),
        row.isin.to_string(),
        row.currency.clone(),
        row.tax_year.to_string(),
        row.result.to_fixed(2),
    ]
}

/// Aligned plain-text table with a closing total line.
///
/// Numbers are rounded for display; use [`write_csv`] for exact values.
pub fn render_table(rows: &[ReportRow]) -> String {
    let cells: Vec<[String; 11]> = rows.iter().map(display_fields).collect();

    let mut widths = COLUMNS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_line(&mut out, &COLUMNS.map(str::to_string), &widths);
    let rule: usize = widths.iter().sum::<usize>() + 2 * (widths.len() - 1);
    out.push_str(&"-".repeat(rule));
    out.push('\n');
    for row in &cells {
        push_line(&mut out, row, &widths);
    }

    let total: Decimal = rows.iter().map(|row| row.result).sum();
    out.push_str(&format!("TOTAL RESULT: {}\n", total.to_fixed(2)));
    out
}

fn push_line(out: &mut String, cells: &[String; 11], widths: &[usize; 11]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

/// Write rows as CSV with exact decimal values.
pub fn write_csv<W: io::Write>(rows: &[ReportRow], writer: W) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(COLUMNS)?;
    for row in rows {
        writer.write_record(exact_fields(row))?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Isin, Ticker};
    use chrono::NaiveDate;

    fn d(s: &str) -> Decimal {
        Decimal::from_str_canonical(s).unwrap()
    }

    fn row() -> ReportRow {
        ReportRow {
            num_shares: d("0.5"),
            buy_date: NaiveDate::from_ymd_opt(2020, 1, 2).unwrap(),
            buy_price_per_share: d("100"),
            sell_date: NaiveDate::from_ymd_opt(2021, 2, 3).unwrap(),
            sell_price_per_share: d("120.125"),
            ticker: Ticker::new("AAPL"),
            name: "Apple, Inc.".to_string(),
            isin: Isin::new("US0378331005"),
            currency: "EUR".to_string(),
            tax_year: 2021,
            result: d("10.0625"),
        }
    }

    #[test]
    fn test_csv_header_and_exact_values() {
        let mut out = Vec::new();
        write_csv(&[row()], &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        assert_eq!(
            lines.next().unwrap(),
            "NUM_SHARES,BUY_DATE,BUY_PRICE_PER_SHARE,SELL_DATE,SELL_PRICE_PER_SHARE,TICKER,NAME,ISIN,CURRENCY,TAX_YEAR,RESULT"
        );
        assert_eq!(
            lines.next().unwrap(),
            "0.5,2020-01-02,100,2021-02-03,120.125,AAPL,\"Apple, Inc.\",US0378331005,EUR,2021,10.0625"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn test_csv_of_no_rows_is_header_only() {
        let mut out = Vec::new();
        write_csv(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 1);
    }

    #[test]
    fn test_table_rounds_and_totals() {
        let table = render_table(&[row(), row()]);
        let lines: Vec<&str> = table.lines().collect();

        assert!(lines[0].starts_with("NUM_SHARES"));
        assert!(lines[1].chars().all(|c| c == '-'));
        assert!(lines[2].starts_with("0.500000"));
        assert!(lines[2].contains("120.1250"));
        assert!(lines[2].ends_with("10.06"));
        assert_eq!(lines[4], "TOTAL RESULT: 20.13");
    }
}
