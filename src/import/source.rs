//! Reading import files
//!
//! Spreadsheets are converted to CSV first so every pipeline parses one
//! row format.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto, Data, Reader};
use csv::ReaderBuilder;
use tracing::debug;

use super::ImportError;

const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xls", "xlsb", "ods"];

/// Input file flavour, decided by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Spreadsheet,
}

impl SourceFormat {
    pub fn detect(path: &Path) -> Option<SourceFormat> {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("")
            .to_lowercase();
        if extension == "csv" {
            Some(SourceFormat::Csv)
        } else if SPREADSHEET_EXTENSIONS.contains(&extension.as_str()) {
            Some(SourceFormat::Spreadsheet)
        } else {
            None
        }
    }
}

/// One data row with its line number in the source (header is line 1)
#[derive(Debug, Clone)]
pub struct Row {
    pub line: usize,
    pub cells: Vec<String>,
}

impl Row {
    /// Cell at `index`, empty if the row is short
    pub fn cell(&self, index: usize) -> &str {
        self.cells.get(index).map(String::as_str).unwrap_or("")
    }
}

/// A parsed import file
#[derive(Debug, Clone)]
pub struct Table {
    pub path: PathBuf,
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Table {
    /// Header names trimmed and lower-cased for comparison
    pub fn normalized_headers(&self) -> Vec<String> {
        self.headers
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect()
    }
}

/// Read a CSV or spreadsheet file into a [`Table`]
pub fn read_table(path: &Path) -> Result<Table, ImportError> {
    match SourceFormat::detect(path) {
        Some(SourceFormat::Csv) => {
            let file = File::open(path).map_err(|source| ImportError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            parse_csv(BufReader::new(file), path)
        }
        Some(SourceFormat::Spreadsheet) => {
            let csv = spreadsheet_to_csv(path)?;
            debug!(path = %path.display(), bytes = csv.len(), "converted spreadsheet to CSV");
            parse_csv(csv.as_slice(), path)
        }
        None => Err(ImportError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Parse CSV text. Blank rows are dropped; short rows read as empty cells.
pub fn parse_csv<R: Read>(reader: R, path: &Path) -> Result<Table, ImportError> {
    let csv_error = |source| ImportError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()
        .map_err(csv_error)?
        .iter()
        .map(|h| h.trim_start_matches('\u{feff}').to_string())
        .collect();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(ImportError::EmptyFile {
            path: path.to_path_buf(),
        });
    }

    let mut rows = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record.map_err(csv_error)?;
        let cells: Vec<String> = record.iter().map(String::from).collect();
        if cells.iter().all(|c| c.is_empty()) {
            continue;
        }
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(idx + 2);
        rows.push(Row { line, cells });
    }

    Ok(Table {
        path: path.to_path_buf(),
        headers,
        rows,
    })
}

/// Convert the first sheet of a workbook to CSV, keeping every column
pub fn spreadsheet_to_csv(path: &Path) -> Result<Vec<u8>, ImportError> {
    let spreadsheet_error = |message: String| ImportError::Spreadsheet {
        path: path.to_path_buf(),
        message,
    };

    let mut workbook = open_workbook_auto(path).map_err(|e| spreadsheet_error(e.to_string()))?;
    let sheet_names = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| spreadsheet_error("workbook has no sheets".to_string()))?;
    let range = workbook
        .worksheet_range(first)
        .map_err(|e| spreadsheet_error(e.to_string()))?;

    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in range.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| match cell {
                Data::Empty => String::new(),
                Data::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        writer
            .write_record(&cells)
            .map_err(|source| ImportError::Csv {
                path: path.to_path_buf(),
                source,
            })?;
    }
    writer
        .into_inner()
        .map_err(|e| spreadsheet_error(e.to_string()))
}
