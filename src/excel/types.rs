use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Represents a cell value with type information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    Boolean(bool),
    DateTime(NaiveDateTime), // already decoded against the workbook epoch
    Error(String),
}

impl Default for CellValue {
    fn default() -> Self {
        CellValue::Empty
    }
}

impl CellValue {
    /// True when the cell carries nothing once whitespace is trimmed
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Plain text rendering used for free-form columns
    pub fn to_text(&self) -> String {
        match self {
            CellValue::Empty | CellValue::Error(_) => String::new(),
            CellValue::Text(s) => s.trim().to_string(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Boolean(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

/// Render whole numbers without a trailing ".0"
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Which serial-date scheme a workbook uses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DateEpoch {
    #[default]
    Epoch1900,
    Epoch1904,
}

impl DateEpoch {
    pub fn from_flag(epoch1904: bool) -> Self {
        if epoch1904 {
            DateEpoch::Epoch1904
        } else {
            DateEpoch::Epoch1900
        }
    }

    pub fn is_1904(self) -> bool {
        self == DateEpoch::Epoch1904
    }
}

/// Information about a sheet in a workbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetInfo {
    pub name: String,
    pub index: u32,
}

/// Raw rows of one sheet after the header rows were dropped
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetRows {
    pub sheet: String,
    pub epoch: DateEpoch,
    pub checksum: String,
    /// Number of leading rows that were skipped as headers
    pub header_rows: usize,
    pub rows: Vec<Vec<CellValue>>,
}

/// Options for reading an uploaded workbook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkbookReadOptions {
    pub sheet: Option<String>,
    pub header_rows: usize,
}

impl Default for WorkbookReadOptions {
    fn default() -> Self {
        WorkbookReadOptions {
            sheet: None,
            header_rows: 2,
        }
    }
}

/// Excel-specific errors
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExcelError {
    pub message: String,
    pub error_type: ExcelErrorType,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExcelErrorType {
    InvalidFormat,
    NoSheets,
    SheetNotFound,
    ReadError,
    EmptyData,
}

impl std::fmt::Display for ExcelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExcelError {}

impl ExcelError {
    pub fn new(message: impl Into<String>, error_type: ExcelErrorType) -> Self {
        ExcelError {
            message: message.into(),
            error_type,
        }
    }

    pub fn invalid_format(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::InvalidFormat)
    }

    pub fn no_sheets() -> Self {
        ExcelError::new("Workbook contains no sheets", ExcelErrorType::NoSheets)
    }

    pub fn sheet_not_found(sheet: &str) -> Self {
        ExcelError::new(format!("Sheet not found: {}", sheet), ExcelErrorType::SheetNotFound)
    }

    pub fn read_error(message: impl Into<String>) -> Self {
        ExcelError::new(message, ExcelErrorType::ReadError)
    }

    pub fn empty_data(sheet: &str, total_rows: usize) -> Self {
        ExcelError::new(
            format!("Sheet '{}' has no data rows ({} rows in total)", sheet, total_rows),
            ExcelErrorType::EmptyData,
        )
    }
}
