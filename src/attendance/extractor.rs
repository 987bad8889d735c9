//! Turns raw sheet rows into candidate attendance records.
//!
//! Columns are bound by position. A row that cannot be used is skipped and
//! reported; a field that cannot be normalized is left empty.

use crate::excel::{
    classify_time_in, format_number, normalize_clock, normalize_date, CellValue, DateEpoch, TimeInKind,
};

use super::types::*;

const COL_SEQUENCE: usize = 0;
const COL_EMPLOYEE_CODE: usize = 1;
const COL_SECONDARY_CODE: usize = 2;
const COL_FULL_NAME: usize = 3;
const COL_GENDER: usize = 4;
const COL_BIRTH_DATE: usize = 5;
const COL_DEPARTMENT_CODE: usize = 6;
const COL_DEPARTMENT_NAME: usize = 7;
const COL_TIME_IN: usize = 8;
const COL_TIME_OUT: usize = 9;
const COL_SHIFT: usize = 10;
const COL_TIME_KEEPING: usize = 11;

/// Extract candidate records from data rows (header rows already removed).
///
/// `header_rows` is only used to report spreadsheet row numbers.
pub fn extract_candidates(rows: &[Vec<CellValue>], epoch: DateEpoch, header_rows: usize) -> ExtractionReport {
    let mut report = ExtractionReport {
        rows_read: rows.len(),
        ..Default::default()
    };

    for (row_index, row) in rows.iter().enumerate() {
        let sheet_row = header_rows + row_index + 1;

        if row.iter().all(CellValue::is_blank) {
            report.skipped.push(SkippedRow {
                sheet_row,
                reason: SkipReason::Blank,
            });
            continue;
        }

        let Some(employee_code) = parse_employee_code(cell(row, COL_EMPLOYEE_CODE)) else {
            report.skipped.push(SkippedRow {
                sheet_row,
                reason: SkipReason::InvalidEmployeeCode,
            });
            continue;
        };

        let sequence_number = parse_sequence(cell(row, COL_SEQUENCE))
            .unwrap_or(report.candidates.len() as i64 + 1);

        let birth_cell = cell(row, COL_BIRTH_DATE);
        let birth_date = normalize_date(birth_cell, epoch);
        if birth_date.is_empty() && !birth_cell.is_blank() {
            report.warnings.push(RowWarning {
                sheet_row,
                employee_code: employee_code.clone(),
                message: format!("Unparseable birth date '{}'", birth_cell.to_text()),
            });
        }

        let time_in = normalize_clock(cell(row, COL_TIME_IN));
        if classify_time_in(&time_in) == TimeInKind::Other {
            report.warnings.push(RowWarning {
                sheet_row,
                employee_code: employee_code.clone(),
                message: format!("Unrecognized time-in value '{}'", time_in),
            });
        }

        let record = AttendanceRecord {
            employee_code,
            sequence_number,
            secondary_code: cell(row, COL_SECONDARY_CODE).to_text(),
            full_name: cell(row, COL_FULL_NAME).to_text(),
            gender_flag: cell(row, COL_GENDER).to_text(),
            birth_date,
            department_code: cell(row, COL_DEPARTMENT_CODE).to_text(),
            department_name: cell(row, COL_DEPARTMENT_NAME).to_text(),
            shift: cell(row, COL_SHIFT).to_text(),
            time_in,
            time_out: normalize_clock(cell(row, COL_TIME_OUT)),
            time_keeping_code: cell(row, COL_TIME_KEEPING).to_text(),
        };

        report.candidates.push(CandidateRow {
            row_key: format!("emp_{}", row_index),
            row_index,
            record,
        });
    }

    if !report.skipped.is_empty() {
        tracing::debug!(
            skipped = report.skipped.len(),
            accepted = report.candidates.len(),
            "Rows skipped during extraction"
        );
    }

    report
}

fn cell(row: &[CellValue], col: usize) -> &CellValue {
    static EMPTY: CellValue = CellValue::Empty;
    row.get(col).unwrap_or(&EMPTY)
}

/// Employee codes must be positive integers; the text is kept as written
fn parse_employee_code(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Number(n) => {
            (n.is_finite() && n.fract() == 0.0 && *n >= 1.0).then(|| format_number(*n))
        }
        CellValue::Text(s) => {
            let trimmed = s.trim();
            let value: i64 = trimmed.parse().ok()?;
            (value > 0).then(|| trimmed.to_string())
        }
        _ => None,
    }
}

fn parse_sequence(cell: &CellValue) -> Option<i64> {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then(|| value.trunc() as i64)
}
