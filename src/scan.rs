//! Sequential batch extraction over a folder of budget documents.
//!
//! Each public entry point enumerates the folder once, processes files one at
//! a time, and returns the assembled records together with the run's
//! statistics. A failure inside a single file is logged and degraded to an
//! empty-field record; the batch itself only aborts on top-level problems
//! such as a missing input folder.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument, warn};

use crate::error::{Result, ScanError};
use crate::locate::{
    SearchBounds, detect_header_row, find_value_by_coordinate, find_value_by_keyword,
};
use crate::model::{DetailRecord, Field, HeaderRecord, RunStatistics, SourceFile};
use crate::normalize::{budget_id_from_filename, digits_match, normalize_budget_id};
use crate::sheet::{Sheet, open_document};

/// Known template coordinates (zero-based) for the two anchor fields.
pub const BUDGET_ID_CELL: (u32, u32) = (3, 0);
pub const DOCUMENT_ID_CELL: (u32, u32) = (5, 0);

/// Header row of the detail table in the known template (zero-based), used
/// when the keyword heuristic finds no header row.
const DETAIL_HEADER_FALLBACK: u32 = 7;

/// Candidate labels per header field. Longer labels are listed first so the
/// inline splitter strips the most specific one.
fn field_labels(field: Field) -> &'static [&'static str] {
    match field {
        Field::BudgetId => &["事业部预算编号", "预算编号", "budget id", "budget no"],
        Field::ContractNumber => &["合同编号", "合同号", "contract number", "contract no"],
        Field::Department => &["需求部门", "申请部门", "部门", "department"],
        Field::DocumentId => &["单据编号", "单据号", "document id", "document no"],
        Field::Remarks => &["备注", "remarks"],
        Field::Preparer => &["制单人", "编制人", "preparer", "prepared by"],
        Field::Date => &["制单日期", "日期", "date"],
    }
}

/// Fixed coordinate tried before the keyword chain, for fields the template
/// pins to a known cell.
fn field_coordinate(field: Field) -> Option<(u32, u32)> {
    match field {
        Field::BudgetId => Some(BUDGET_ID_CELL),
        Field::DocumentId => Some(DOCUMENT_ID_CELL),
        _ => None,
    }
}

/// Progress callback receiving a completion percentage, the seam a desktop
/// shell drives from its worker thread. The CLI passes `None`.
pub type ProgressFn<'a> = &'a mut dyn FnMut(f64);

/// Records plus statistics from one header-field run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanOutcome {
    pub records: Vec<HeaderRecord>,
    pub stats: RunStatistics,
}

/// Detail rows plus statistics from one line-item run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailOutcome {
    pub records: Vec<DetailRecord>,
    pub stats: RunStatistics,
}

/// Validates the input path up front so a bad folder aborts before any
/// output is written.
pub fn ensure_directory(folder: &Path) -> Result<()> {
    if !folder.exists() {
        return Err(ScanError::MissingInput(folder.to_path_buf()));
    }
    if !folder.is_dir() {
        return Err(ScanError::NotADirectory(folder.to_path_buf()));
    }
    Ok(())
}

/// Lists the spreadsheet files directly inside the folder (non-recursive),
/// sorted by name for deterministic report order.
pub fn list_source_files(folder: &Path) -> Result<Vec<PathBuf>> {
    ensure_directory(folder)?;
    let mut files: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && is_excel_file(path))
        .collect();
    files.sort();
    Ok(files)
}

/// True for the spreadsheet extensions the scanner opens.
pub fn is_excel_file(path: &Path) -> bool {
    match path.extension() {
        Some(ext) => {
            let ext = ext.to_string_lossy().to_lowercase();
            matches!(ext.as_str(), "xls" | "xlsx")
        }
        None => false,
    }
}

/// Captures name, size, and modification time for every regular file in the
/// folder, feeding the inventory report.
#[instrument(level = "info", skip_all, fields(folder = %folder.display()))]
pub fn inventory_folder(folder: &Path) -> Result<Vec<SourceFile>> {
    ensure_directory(folder)?;
    let mut paths: Vec<PathBuf> = std::fs::read_dir(folder)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();
    let mut files = Vec::with_capacity(paths.len());
    for path in &paths {
        files.push(SourceFile::from_path(path)?);
    }
    info!(file_count = files.len(), "folder inventory captured");
    Ok(files)
}

/// Extracts one header-field record per spreadsheet file in the folder.
#[instrument(level = "info", skip_all, fields(folder = %folder.display()))]
pub fn scan_folder(folder: &Path, mut progress: Option<ProgressFn<'_>>) -> Result<ScanOutcome> {
    let files = list_source_files(folder)?;
    let bounds = SearchBounds::default();
    let mut stats = RunStatistics {
        total_files: files.len() as u64,
        ..RunStatistics::default()
    };
    info!(file_count = files.len(), "starting header-field scan");

    let mut records = Vec::with_capacity(files.len());
    for (index, path) in files.iter().enumerate() {
        let record = match extract_header_fields(path, bounds) {
            Ok(mut record) => {
                stats.processed_files += 1;
                finalize_record(&mut record, path, &mut stats);
                record
            }
            Err(error) => {
                warn!(file = %path.display(), %error, "file failed, recording empty fields");
                stats.record_all_missing();
                let mut record = HeaderRecord::empty(path);
                if let Ok(path) = absolute_path(path) {
                    record.source_path = path;
                }
                record
            }
        };
        debug!(file = %path.display(), "file processed");
        records.push(record);
        notify(&mut progress, index + 1, files.len());
    }

    info!(
        processed = stats.processed_files,
        mismatched = stats.mismatched_budget_ids,
        "header-field scan finished"
    );
    Ok(ScanOutcome { records, stats })
}

/// Extracts the line-item rows of every spreadsheet file in the folder.
#[instrument(level = "info", skip_all, fields(folder = %folder.display()))]
pub fn extract_details(
    folder: &Path,
    mut progress: Option<ProgressFn<'_>>,
) -> Result<DetailOutcome> {
    let files = list_source_files(folder)?;
    let bounds = SearchBounds::default();
    let mut stats = RunStatistics {
        total_files: files.len() as u64,
        ..RunStatistics::default()
    };
    info!(file_count = files.len(), "starting detail extraction");

    let mut records = Vec::new();
    for (index, path) in files.iter().enumerate() {
        match extract_file_details(path, bounds, &mut stats) {
            Ok(rows) => {
                stats.processed_files += 1;
                debug!(file = %path.display(), row_count = rows.len(), "detail rows read");
                records.extend(rows);
            }
            Err(error) => {
                warn!(file = %path.display(), %error, "file failed, skipping its detail rows");
                stats.record_missing(Field::BudgetId);
                stats.record_missing(Field::DocumentId);
            }
        }
        notify(&mut progress, index + 1, files.len());
    }

    info!(
        processed = stats.processed_files,
        row_count = records.len(),
        "detail extraction finished"
    );
    Ok(DetailOutcome { records, stats })
}

/// Locates every header field in one document: fixed coordinate first where
/// the template pins one, then the keyword strategy chain.
fn extract_header_fields(path: &Path, bounds: SearchBounds) -> Result<HeaderRecord> {
    let sheet = open_document(path)?;
    let mut record = HeaderRecord::empty(path);
    record.source_path = absolute_path(path)?;
    for field in Field::ALL {
        let labels = field_labels(field);
        let mut value = match field_coordinate(field) {
            Some((row, col)) => find_value_by_coordinate(&sheet, row, col, labels),
            None => String::new(),
        };
        if value.is_empty() {
            value = find_value_by_keyword(&sheet, labels, bounds);
        }
        record.set(field, value);
    }
    Ok(record)
}

/// Post-extraction pass over one record: filename fallback for a missing
/// budget ID, normalization, digit cross-check against the filename, and the
/// per-field missing counters.
fn finalize_record(record: &mut HeaderRecord, path: &Path, stats: &mut RunStatistics) {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    if record.get(Field::BudgetId).is_empty() {
        if let Some(recovered) = budget_id_from_filename(&stem) {
            debug!(file = %path.display(), budget_id = %recovered, "budget ID taken from filename");
            record.set(Field::BudgetId, recovered);
            stats.budget_ids_from_filename += 1;
        }
    }

    let budget_id = normalize_budget_id(record.get(Field::BudgetId));
    record.set(Field::BudgetId, budget_id.clone());

    if !budget_id.is_empty() {
        if digits_match(&budget_id, &stem) {
            stats.matched_budget_ids += 1;
        } else {
            stats.mismatched_budget_ids += 1;
            warn!(
                file = %path.display(),
                budget_id = %budget_id,
                "budget ID digits disagree with the filename"
            );
        }
    }

    for field in Field::ALL {
        if record.get(field).is_empty() {
            stats.record_missing(field);
        }
    }
}

/// Reads the detail table of one document: the two anchor fields at their
/// template coordinates, the header row (detected, falling back to the
/// template row), then consecutive rows until the first empty sequence cell.
fn extract_file_details(
    path: &Path,
    bounds: SearchBounds,
    stats: &mut RunStatistics,
) -> Result<Vec<DetailRecord>> {
    let sheet = open_document(path)?;
    let source_path = absolute_path(path)?;

    let budget_id = normalize_budget_id(&find_value_by_coordinate(
        &sheet,
        BUDGET_ID_CELL.0,
        BUDGET_ID_CELL.1,
        field_labels(Field::BudgetId),
    ));
    let document_id = find_value_by_coordinate(
        &sheet,
        DOCUMENT_ID_CELL.0,
        DOCUMENT_ID_CELL.1,
        field_labels(Field::DocumentId),
    );
    if budget_id.is_empty() {
        stats.record_missing(Field::BudgetId);
    }
    if document_id.is_empty() {
        stats.record_missing(Field::DocumentId);
    }

    let header_row = detect_header_row(&sheet, bounds).unwrap_or(DETAIL_HEADER_FALLBACK);
    let mut rows = Vec::new();
    let mut row = header_row + 1;
    while row < sheet.rows() {
        let sequence = sheet.text(row, 0);
        if sequence.is_empty() {
            break;
        }
        rows.push(detail_row(&sheet, row, &budget_id, &document_id, &source_path));
        row += 1;
    }
    Ok(rows)
}

fn detail_row(
    sheet: &Sheet,
    row: u32,
    budget_id: &str,
    document_id: &str,
    source_path: &Path,
) -> DetailRecord {
    DetailRecord {
        budget_id: budget_id.to_string(),
        document_id: document_id.to_string(),
        sequence: sheet.text(row, 0),
        stock_code: sheet.text(row, 1),
        stock_name: sheet.text(row, 2),
        specification: sheet.text(row, 3),
        material: sheet.text(row, 4),
        unit: sheet.text(row, 5),
        quantity: sheet.text(row, 6),
        technical_standard: sheet.text(row, 7),
        price_category: sheet.text(row, 8),
        price: sheet.text(row, 9),
        line_remark: sheet.text(row, 10),
        source_line: sheet.text(row, 11),
        annual_contract: sheet.text(row, 12),
        source_path: source_path.to_path_buf(),
    }
}

fn absolute_path(path: &Path) -> Result<PathBuf> {
    Ok(std::path::absolute(path)?)
}

fn notify(progress: &mut Option<ProgressFn<'_>>, done: usize, total: usize) {
    if total == 0 {
        return;
    }
    if let Some(callback) = progress {
        callback(done as f64 / total as f64 * 100.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn excel_extensions_are_case_insensitive() {
        assert!(is_excel_file(Path::new("a.xlsx")));
        assert!(is_excel_file(Path::new("b.XLS")));
        assert!(!is_excel_file(Path::new("c.csv")));
        assert!(!is_excel_file(Path::new("no_extension")));
    }

    #[test]
    fn missing_folder_is_a_top_level_error() {
        let result = ensure_directory(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(ScanError::MissingInput(_))));
    }

    #[test]
    fn file_as_input_folder_is_rejected() {
        let dir = tempfile::tempdir().expect("temporary directory");
        let file = dir.path().join("plain.txt");
        std::fs::write(&file, "x").expect("fixture written");
        let result = ensure_directory(&file);
        assert!(matches!(result, Err(ScanError::NotADirectory(_))));
    }

    #[test]
    fn listing_filters_by_extension_and_sorts() {
        let dir = tempfile::tempdir().expect("temporary directory");
        for name in ["b.xlsx", "a.xls", "ignore.csv", "notes.txt"] {
            std::fs::write(dir.path().join(name), "x").expect("fixture written");
        }
        let files = list_source_files(dir.path()).expect("listing");
        let names: Vec<String> = files
            .iter()
            .filter_map(|path| path.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.xls", "b.xlsx"]);
    }
}
