use calamine::{open_workbook_auto_from_rs, Data, ExcelDateTime, Range, Reader, Sheets};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::io::{Cursor, Read};

use super::types::*;

static DATE1904_ATTR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"date1904\s*=\s*["'](1|true)["']"#).expect("valid regex"));
static ISO_DURATION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^P(?:(\d+)D)?T(?:(\d+)H)?(?:(\d+)M)?(?:(\d+(?:\.\d+)?)S)?$").expect("valid regex")
});

/// Read the selected sheet of an uploaded workbook, dropping the header rows
pub fn read_workbook(bytes: &[u8], options: &WorkbookReadOptions) -> Result<SheetRows, ExcelError> {
    let checksum = compute_checksum(bytes);
    let epoch = detect_epoch(bytes);

    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExcelError::invalid_format(format!("Failed to open workbook: {}", e)))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let target_sheet = match &options.sheet {
        Some(name) => {
            if !sheet_names.iter().any(|s| s == name) {
                return Err(ExcelError::sheet_not_found(name));
            }
            name.clone()
        }
        None => sheet_names.first().cloned().ok_or_else(ExcelError::no_sheets)?,
    };

    let range = workbook
        .worksheet_range(&target_sheet)
        .map_err(|e| ExcelError::read_error(format!("Failed to read sheet '{}': {}", target_sheet, e)))?;

    let all_rows = range_to_rows(&range);
    let total_rows = all_rows.len();

    if total_rows <= options.header_rows {
        return Err(ExcelError::empty_data(&target_sheet, total_rows));
    }

    tracing::debug!(
        sheet = %target_sheet,
        total_rows,
        epoch1904 = epoch.is_1904(),
        "Workbook sheet loaded"
    );

    let rows = all_rows.into_iter().skip(options.header_rows).collect();

    Ok(SheetRows {
        sheet: target_sheet,
        epoch,
        checksum,
        header_rows: options.header_rows,
        rows,
    })
}

/// Materialize a calamine range as absolute rows.
///
/// calamine trims leading empty rows and columns from the range, so the
/// offset is padded back in to keep positional column binding intact.
fn range_to_rows(range: &Range<Data>) -> Vec<Vec<CellValue>> {
    let Some((start_row, start_col)) = range.start() else {
        return Vec::new();
    };

    let mut rows: Vec<Vec<CellValue>> = (0..start_row).map(|_| Vec::new()).collect();

    for row in range.rows() {
        let mut values = vec![CellValue::Empty; start_col as usize];
        values.extend(row.iter().map(convert_cell_value));
        rows.push(values);
    }

    rows
}

/// Convert calamine Data to our CellValue.
///
/// Date-formatted cells carry their own epoch flag; plain numbers stay
/// serials for the normalizer to decode against the workbook epoch.
pub fn convert_cell_value(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Boolean(*b),
        Data::DateTime(dt) => convert_excel_datetime(dt),
        Data::DateTimeIso(s) => parse_iso_datetime(s)
            .map(CellValue::DateTime)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        // ODS stores time-of-day cells as ISO durations
        Data::DurationIso(s) => parse_iso_duration(s)
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(s.clone())),
        Data::Error(e) => CellValue::Error(format!("{:?}", e)),
    }
}

/// Decode a date-formatted cell against the flag calamine read for it.
///
/// Durations, time-only values and the 1900 leap day stay numeric so the
/// normalizers can still treat them as day fractions or serials.
fn convert_excel_datetime(dt: &ExcelDateTime) -> CellValue {
    let serial = dt.as_f64();
    if dt.is_duration() {
        return CellValue::Number(serial);
    }

    let Some(value) = dt.as_datetime() else {
        return CellValue::Number(serial);
    };
    let date = value.date();
    let before_epoch = NaiveDate::from_ymd_opt(1900, 1, 1).map_or(true, |first| date < first);
    let leap_day = serial.floor() == 60.0 && NaiveDate::from_ymd_opt(1900, 2, 28) == Some(date);

    if before_epoch || leap_day {
        CellValue::Number(serial)
    } else {
        CellValue::DateTime(value)
    }
}

/// `PnDTnHnMnS` as a fraction of a day
fn parse_iso_duration(s: &str) -> Option<f64> {
    let caps = ISO_DURATION.captures(s.trim())?;
    let part = |i: usize| -> Option<f64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0.0),
        }
    };
    let seconds = part(1)? * 86_400.0 + part(2)? * 3_600.0 + part(3)? * 60.0 + part(4)?;
    Some(seconds / 86_400.0)
}

fn parse_iso_datetime(s: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S").ok())
        .or_else(|| {
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Detect the workbook's serial-date scheme.
///
/// Only the OOXML container records the flag in a place we can reach
/// (`xl/workbook.xml`); other formats fall back to the 1900 scheme.
pub fn detect_epoch(bytes: &[u8]) -> DateEpoch {
    let Ok(mut archive) = zip::ZipArchive::new(Cursor::new(bytes)) else {
        return DateEpoch::Epoch1900;
    };
    let Ok(mut entry) = archive.by_name("xl/workbook.xml") else {
        return DateEpoch::Epoch1900;
    };

    let mut xml = String::new();
    if entry.read_to_string(&mut xml).is_err() {
        return DateEpoch::Epoch1900;
    }

    DateEpoch::from_flag(workbook_xml_declares_1904(&xml))
}

fn workbook_xml_declares_1904(xml: &str) -> bool {
    DATE1904_ATTR.is_match(xml)
}

/// Get list of sheets in a workbook
pub fn get_sheets(bytes: &[u8]) -> Result<Vec<SheetInfo>, ExcelError> {
    let workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes))
        .map_err(|e| ExcelError::invalid_format(format!("Failed to open workbook: {}", e)))?;

    Ok(workbook
        .sheet_names()
        .iter()
        .enumerate()
        .map(|(index, name)| SheetInfo {
            name: name.clone(),
            index: index as u32,
        })
        .collect())
}

/// Compute SHA-256 checksum of an uploaded workbook
pub fn compute_checksum(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
