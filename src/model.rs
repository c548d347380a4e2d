use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Header-level fields extracted once per source document.
///
/// The ordering of the variants fixes the column order of the summary report
/// and the ordering of the per-field missing counters.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Field {
    BudgetId,
    ContractNumber,
    Department,
    DocumentId,
    Remarks,
    Preparer,
    Date,
}

impl Field {
    /// All header fields in report column order.
    pub const ALL: [Field; 7] = [
        Field::BudgetId,
        Field::ContractNumber,
        Field::Department,
        Field::DocumentId,
        Field::Remarks,
        Field::Preparer,
        Field::Date,
    ];

    /// Column title used in the summary report.
    pub fn title(self) -> &'static str {
        match self {
            Field::BudgetId => "Budget ID",
            Field::ContractNumber => "Contract Number",
            Field::Department => "Department",
            Field::DocumentId => "Document ID",
            Field::Remarks => "Remarks",
            Field::Preparer => "Preparer",
            Field::Date => "Date",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.title())
    }
}

/// Metadata captured for every file in the scanned folder, used by the
/// inventory report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub file_name: String,
    pub stem: String,
    pub extension: String,
    pub size: u64,
    /// Modification time formatted as `YYYY-MM-DD HH:MM:SS` local time.
    pub modified: String,
}

impl SourceFile {
    /// Captures name, stem, extension, size, and modification time for the
    /// given path.
    pub fn from_path(path: &Path) -> Result<SourceFile> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()
            .map(|time| {
                DateTime::<Local>::from(time)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_default();
        Ok(SourceFile {
            path: path.to_path_buf(),
            file_name: file_component(path, Path::file_name),
            stem: file_component(path, Path::file_stem),
            extension: file_component(path, Path::extension),
            size: metadata.len(),
            modified,
        })
    }
}

fn file_component(
    path: &Path,
    component: fn(&Path) -> Option<&std::ffi::OsStr>,
) -> String {
    component(path)
        .map(|value| value.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// One flat record per source document: the located header fields plus the
/// originating file. Missing fields hold an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub file_name: String,
    pub source_path: PathBuf,
    pub values: BTreeMap<Field, String>,
}

impl HeaderRecord {
    /// Creates a record for the given file with every field empty.
    pub fn empty(path: &Path) -> HeaderRecord {
        let values = Field::ALL
            .iter()
            .map(|field| (*field, String::new()))
            .collect();
        HeaderRecord {
            file_name: file_component(path, Path::file_name),
            source_path: path.to_path_buf(),
            values,
        }
    }

    /// Returns the value for the given field, empty when unset.
    pub fn get(&self, field: Field) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }

    /// Stores a value for the given field.
    pub fn set(&mut self, field: Field, value: String) {
        self.values.insert(field, value);
    }
}

/// One line item from a document's detail table, carrying the header-level
/// budget and document identifiers alongside the line columns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub budget_id: String,
    pub document_id: String,
    pub sequence: String,
    pub stock_code: String,
    pub stock_name: String,
    pub specification: String,
    pub material: String,
    pub unit: String,
    pub quantity: String,
    pub technical_standard: String,
    pub price_category: String,
    pub price: String,
    pub line_remark: String,
    pub source_line: String,
    pub annual_contract: String,
    pub source_path: PathBuf,
}

impl DetailRecord {
    /// Column titles of the detail report, excluding the trailing link column.
    pub const COLUMNS: [&'static str; 15] = [
        "Budget ID",
        "Document ID",
        "Sequence",
        "Stock Code",
        "Stock Name",
        "Specification",
        "Material",
        "Unit",
        "Quantity",
        "Technical Standard",
        "Price Category",
        "Price",
        "Line Remark",
        "Source Line",
        "Annual Contract",
    ];
}

/// Counters accumulated over one batch run and reported on the statistics
/// sheet. Owned by the batch functions and returned to the caller; there is
/// no process-wide state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatistics {
    /// Files found in the folder with a supported extension.
    pub total_files: u64,
    /// Files whose workbook opened and was extracted without error.
    pub processed_files: u64,
    /// Budget IDs whose digits cross-checked against the filename.
    pub matched_budget_ids: u64,
    /// Budget IDs whose digits disagreed with the filename.
    pub mismatched_budget_ids: u64,
    /// Budget IDs recovered from the filename after the sheet yielded none.
    pub budget_ids_from_filename: u64,
    /// Per-field count of records where the field stayed empty.
    pub missing_fields: BTreeMap<Field, u64>,
}

impl RunStatistics {
    /// Bumps the missing counter for the given field.
    pub fn record_missing(&mut self, field: Field) {
        *self.missing_fields.entry(field).or_insert(0) += 1;
    }

    /// Bumps every per-field missing counter, used when a file fails to open
    /// and degrades to an all-empty record.
    pub fn record_all_missing(&mut self) {
        for field in Field::ALL {
            self.record_missing(field);
        }
    }

    /// Metric/value rows for the statistics sheet.
    pub fn summary_rows(&self) -> Vec<(String, String)> {
        let mut rows = vec![
            ("Total files".to_string(), self.total_files.to_string()),
            (
                "Processed files".to_string(),
                self.processed_files.to_string(),
            ),
            (
                "Budget IDs matching filename".to_string(),
                self.matched_budget_ids.to_string(),
            ),
            (
                "Budget IDs mismatching filename".to_string(),
                self.mismatched_budget_ids.to_string(),
            ),
            (
                "Budget IDs recovered from filename".to_string(),
                self.budget_ids_from_filename.to_string(),
            ),
        ];
        for (field, count) in &self.missing_fields {
            rows.push((format!("Missing: {field}"), count.to_string()));
        }
        rows
    }
}
