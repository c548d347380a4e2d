use std::path::Path;

use calamine::{Data, Dimensions, Range, Reader, Xls, Xlsx, open_workbook};

use crate::error::{Result, ScanError};

/// The first worksheet of a budget document together with its merged-cell
/// regions, indexable by absolute zero-based row/column coordinates.
///
/// The merged regions are only available for `.xlsx` workbooks; legacy `.xls`
/// files expose none, so merged-aware lookups simply find nothing there.
#[derive(Debug, Clone)]
pub struct Sheet {
    range: Range<Data>,
    merged: Vec<Dimensions>,
}

impl Sheet {
    pub fn new(range: Range<Data>, merged: Vec<Dimensions>) -> Sheet {
        Sheet { range, merged }
    }

    /// Number of rows up to the last populated cell.
    pub fn rows(&self) -> u32 {
        self.range.end().map(|(row, _)| row + 1).unwrap_or(0)
    }

    /// Number of columns up to the last populated cell.
    pub fn cols(&self) -> u32 {
        self.range.end().map(|(_, col)| col + 1).unwrap_or(0)
    }

    /// Trimmed text of the cell at the given absolute coordinates; empty for
    /// blank or out-of-range cells.
    pub fn text(&self, row: u32, col: u32) -> String {
        let value = self
            .range
            .get_value((row, col))
            .map(cell_to_string)
            .unwrap_or_default();
        value.trim().to_string()
    }

    /// True when the cell holds no usable text.
    pub fn is_blank(&self, row: u32, col: u32) -> bool {
        self.text(row, col).is_empty()
    }

    /// The merged region containing the given cell, if any.
    pub fn merged_region_at(&self, row: u32, col: u32) -> Option<&Dimensions> {
        self.merged.iter().find(|region| {
            row >= region.start.0
                && row <= region.end.0
                && col >= region.start.1
                && col <= region.end.1
        })
    }
}

/// Opens the first worksheet of the given document, choosing the reader by
/// extension (`.xlsx`/`.xlsm` or legacy `.xls`).
pub fn open_document(path: &Path) -> Result<Sheet> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    match extension.as_str() {
        "xlsx" | "xlsm" => open_xlsx(path),
        "xls" => open_xls(path),
        _ => Err(ScanError::UnsupportedExtension(path.to_path_buf())),
    }
}

fn open_xlsx(path: &Path) -> Result<Sheet> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    workbook.load_merged_regions()?;
    let name = first_sheet_name(&workbook)?;
    let merged = workbook
        .merged_regions_by_sheet(&name)
        .into_iter()
        .map(|(_, _, dimensions)| *dimensions)
        .collect();
    let range = workbook.worksheet_range(&name)?;
    Ok(Sheet::new(range, merged))
}

fn open_xls(path: &Path) -> Result<Sheet> {
    let mut workbook: Xls<_> = open_workbook(path)?;
    let name = first_sheet_name(&workbook)?;
    let range = workbook.worksheet_range(&name)?;
    Ok(Sheet::new(range, Vec::new()))
}

fn first_sheet_name<R: Reader<std::io::BufReader<std::fs::File>>>(
    workbook: &R,
) -> Result<String> {
    workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ScanError::InvalidWorkbook("workbook has no sheets".into()))
}

/// Coerces a cell into its text form. Whole-number floats drop the trailing
/// `.0` so sequence numbers and codes read back as entered.
fn cell_to_string(cell: &Data) -> String {
    match cell {
        Data::String(value) => value.clone(),
        Data::Float(value) => float_to_string(*value),
        Data::Int(value) => value.to_string(),
        Data::Bool(value) => value.to_string(),
        Data::DateTime(value) => value
            .as_datetime()
            .map(|datetime| datetime.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| float_to_string(value.as_f64())),
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

fn float_to_string(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet_from(cells: &[(u32, u32, Data)]) -> Sheet {
        let max_row = cells.iter().map(|(row, _, _)| *row).max().unwrap_or(0);
        let max_col = cells.iter().map(|(_, col, _)| *col).max().unwrap_or(0);
        let mut range = Range::new((0, 0), (max_row, max_col));
        for (row, col, value) in cells {
            range.set_value((*row, *col), value.clone());
        }
        Sheet::new(range, Vec::new())
    }

    #[test]
    fn text_trims_and_coerces_numbers() {
        let sheet = sheet_from(&[
            (0, 0, Data::String("  Budget  ".to_string())),
            (0, 1, Data::Float(32.0)),
            (0, 2, Data::Float(1.5)),
        ]);
        assert_eq!(sheet.text(0, 0), "Budget");
        assert_eq!(sheet.text(0, 1), "32");
        assert_eq!(sheet.text(0, 2), "1.5");
    }

    #[test]
    fn out_of_range_cells_read_as_blank() {
        let sheet = sheet_from(&[(0, 0, Data::String("x".to_string()))]);
        assert!(sheet.is_blank(10, 10));
        assert_eq!(sheet.text(10, 10), "");
    }

    #[test]
    fn merged_region_lookup_covers_the_full_span() {
        let mut range = Range::new((0, 0), (2, 2));
        range.set_value((0, 0), Data::String("label".to_string()));
        let merged = vec![Dimensions {
            start: (0, 0),
            end: (1, 1),
        }];
        let sheet = Sheet::new(range, merged);
        assert!(sheet.merged_region_at(1, 1).is_some());
        assert!(sheet.merged_region_at(2, 0).is_none());
    }

    #[test]
    fn unsupported_extension_is_rejected() {
        let result = open_document(Path::new("notes.txt"));
        assert!(matches!(result, Err(ScanError::UnsupportedExtension(_))));
    }
}
