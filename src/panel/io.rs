//! CSV ingestion for monthly panels.
//!
//! Schema: a header row whose first column is `Date` (case-insensitive),
//! followed by numeric columns. Dates are ISO `YYYY-MM-DD`; a trailing time
//! component (`YYYY-MM-DD HH:MM:SS`) is ignored. Empty cells and the tokens
//! `NaN`, `nan`, `NA`, `N/A`, `null` are missing values. Rows are sorted by
//! date and every date is moved to its month end.
use crate::panel::{
    calendar::month_end,
    data::TimePanel,
    errors::{PanelError, PanelResult},
};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use ndarray::Array2;
use std::{fs::File, io::Read, path::Path};

const MISSING_TOKENS: [&str; 6] = ["", "nan", "na", "n/a", "null", "none"];

/// Read a monthly panel from a CSV file.
///
/// # Errors
/// - `PanelError::Io` if the file cannot be opened.
/// - Any error of [`read_panel`].
pub fn read_panel_csv(path: &Path) -> PanelResult<TimePanel> {
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| PanelError::Io { path: name.clone(), source })?;
    read_panel(file, &name)
}

/// Read a monthly panel from any reader; `source` names it in errors.
///
/// # Errors
/// - `PanelError::Csv` for malformed CSV.
/// - `PanelError::MissingDateColumn`, `InvalidDate`, `InvalidValue`,
///   `RaggedRow` for schema violations.
/// - Constructor errors of [`TimePanel::new`] (duplicate months after
///   normalization, duplicate columns).
pub fn read_panel<R: Read>(reader: R, source: &str) -> PanelResult<TimePanel> {
    let csv_err = |e: csv::Error| PanelError::Csv { path: source.to_string(), source: e };
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = rdr.headers().map_err(csv_err)?.clone();
    let first = headers.get(0).unwrap_or_default();
    if !first.eq_ignore_ascii_case("date") {
        return Err(PanelError::MissingDateColumn {
            path: source.to_string(),
            found: first.to_string(),
        });
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let n_cols = columns.len();

    let mut rows: Vec<(NaiveDate, Vec<f64>)> = Vec::new();
    for (row, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_err)?;
        if record.len() != n_cols + 1 {
            return Err(PanelError::RaggedRow {
                row,
                expected: n_cols,
                actual: record.len().saturating_sub(1),
            });
        }
        let date = parse_date(&record[0]).ok_or_else(|| PanelError::InvalidDate {
            row,
            value: record[0].to_string(),
        })?;
        let mut values = Vec::with_capacity(n_cols);
        for (j, cell) in record.iter().skip(1).enumerate() {
            values.push(parse_value(cell).ok_or_else(|| PanelError::InvalidValue {
                row,
                column: columns[j].clone(),
                value: cell.to_string(),
            })?);
        }
        rows.push((month_end(date), values));
    }
    rows.sort_by_key(|(d, _)| *d);

    let n = rows.len();
    let dates: Vec<NaiveDate> = rows.iter().map(|(d, _)| *d).collect();
    let flat: Vec<f64> = rows.into_iter().flat_map(|(_, v)| v).collect();
    let values = Array2::from_shape_vec((n, n_cols), flat).map_err(|_| PanelError::ShapeMismatch {
        rows: n,
        cols: n_cols,
        expected_rows: n,
        expected_cols: n_cols,
    })?;
    TimePanel::new(dates, columns, values)
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn parse_value(s: &str) -> Option<f64> {
    if MISSING_TOKENS.iter().any(|t| s.eq_ignore_ascii_case(t)) {
        return Some(f64::NAN);
    }
    s.parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    // Purpose
    // -------
    // A well-formed CSV is parsed with month-end dates, sorted rows and NaN
    // for missing cells.
    fn parses_panel_with_missing_cells() {
        let csv = "Date,CPI,10Y\n2020-02-01,2.0,\n2020-01-01 00:00:00,1.0,1.5\n";
        let p = read_panel(csv.as_bytes(), "inline").unwrap();

        assert_eq!(p.columns(), &["CPI".to_string(), "10Y".to_string()]);
        assert_eq!(p.dates()[0], NaiveDate::from_ymd_opt(2020, 1, 31).unwrap());
        assert_eq!(p.dates()[1], NaiveDate::from_ymd_opt(2020, 2, 29).unwrap());
        assert_eq!(p.values()[[0, 1]], 1.5);
        assert!(p.values()[[1, 1]].is_nan());
    }

    #[test]
    // Purpose
    // -------
    // Schema violations are reported with row context.
    fn schema_violations_are_reported() {
        let no_date = "When,CPI\n2020-01-01,1.0\n";
        assert!(matches!(
            read_panel(no_date.as_bytes(), "x"),
            Err(PanelError::MissingDateColumn { .. })
        ));

        let bad_value = "Date,CPI\n2020-01-01,abc\n";
        assert!(matches!(
            read_panel(bad_value.as_bytes(), "x"),
            Err(PanelError::InvalidValue { row: 0, .. })
        ));

        let ragged = "Date,CPI,PPI\n2020-01-01,1.0\n";
        assert!(matches!(
            read_panel(ragged.as_bytes(), "x"),
            Err(PanelError::RaggedRow { row: 0, expected: 2, actual: 1 })
        ));

        let same_month = "Date,CPI\n2020-01-01,1.0\n2020-01-15,2.0\n";
        assert!(matches!(
            read_panel(same_month.as_bytes(), "x"),
            Err(PanelError::DuplicateDate { .. })
        ));
    }
}
