//! Styled report output.
//!
//! Converts extracted records into a workbook with a styled header row,
//! bordered data cells, computed column widths, a frozen top row, hyperlink
//! cells pointing back at the source documents, and an optional statistics
//! sheet.

use std::path::{Path, PathBuf};

use rust_xlsxwriter::{
    Color, Format, FormatAlign, FormatBorder, FormatUnderline, Url, Workbook, Worksheet,
};

use crate::error::Result;
use crate::model::{DetailRecord, Field, HeaderRecord, RunStatistics, SourceFile};

/// Fill colour of the header row.
const HEADER_FILL: u32 = 0x1F4E78;

/// Display text of the hyperlink cells.
const LINK_TEXT: &str = "open file";

/// Title of the trailing hyperlink column.
const LINK_COLUMN: &str = "Source File";

/// Sheet name of the run-statistics sheet.
const STATISTICS_SHEET: &str = "Statistics";

/// One output row: plain cells plus an optional trailing hyperlink back to
/// the source document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportRow {
    pub cells: Vec<String>,
    pub link: Option<PathBuf>,
}

/// A table destined for one worksheet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub sheet_name: String,
    pub columns: Vec<String>,
    pub rows: Vec<ReportRow>,
}

/// Builds the summary table: one row per document with the header fields and
/// an open-file link.
pub fn header_table(records: &[HeaderRecord]) -> ReportTable {
    let mut columns = vec!["File Name".to_string()];
    columns.extend(Field::ALL.iter().map(|field| field.title().to_string()));
    columns.push(LINK_COLUMN.to_string());

    let rows = records
        .iter()
        .map(|record| {
            let mut cells = vec![record.file_name.clone()];
            cells.extend(Field::ALL.iter().map(|field| record.get(*field).to_string()));
            ReportRow {
                cells,
                link: Some(record.source_path.clone()),
            }
        })
        .collect();

    ReportTable {
        sheet_name: "Summary".to_string(),
        columns,
        rows,
    }
}

/// Builds the detail table: one row per line item with an open-file link.
pub fn detail_table(records: &[DetailRecord]) -> ReportTable {
    let mut columns: Vec<String> = DetailRecord::COLUMNS
        .iter()
        .map(|column| column.to_string())
        .collect();
    columns.push(LINK_COLUMN.to_string());

    let rows = records
        .iter()
        .map(|record| ReportRow {
            cells: vec![
                record.budget_id.clone(),
                record.document_id.clone(),
                record.sequence.clone(),
                record.stock_code.clone(),
                record.stock_name.clone(),
                record.specification.clone(),
                record.material.clone(),
                record.unit.clone(),
                record.quantity.clone(),
                record.technical_standard.clone(),
                record.price_category.clone(),
                record.price.clone(),
                record.line_remark.clone(),
                record.source_line.clone(),
                record.annual_contract.clone(),
            ],
            link: Some(record.source_path.clone()),
        })
        .collect();

    ReportTable {
        sheet_name: "Details".to_string(),
        columns,
        rows,
    }
}

/// Builds the filename inventory table.
pub fn inventory_table(files: &[SourceFile]) -> ReportTable {
    let columns = [
        "File Name",
        "Stem",
        "Extension",
        "Size (bytes)",
        "Modified",
    ]
    .iter()
    .map(|column| column.to_string())
    .collect();

    let rows = files
        .iter()
        .map(|file| ReportRow {
            cells: vec![
                file.file_name.clone(),
                file.stem.clone(),
                file.extension.clone(),
                file.size.to_string(),
                file.modified.clone(),
            ],
            link: None,
        })
        .collect();

    ReportTable {
        sheet_name: "Files".to_string(),
        columns,
        rows,
    }
}

/// Writes the table, and the statistics sheet when given, to the output
/// path.
pub fn write_report(
    path: &Path,
    table: &ReportTable,
    stats: Option<&RunStatistics>,
) -> Result<()> {
    let mut workbook = Workbook::new();
    write_table(workbook.add_worksheet(), table)?;
    if let Some(stats) = stats {
        write_table(workbook.add_worksheet(), &statistics_table(stats))?;
    }
    workbook.save(path)?;
    Ok(())
}

fn statistics_table(stats: &RunStatistics) -> ReportTable {
    let rows = stats
        .summary_rows()
        .into_iter()
        .map(|(metric, value)| ReportRow {
            cells: vec![metric, value],
            link: None,
        })
        .collect();
    ReportTable {
        sheet_name: STATISTICS_SHEET.to_string(),
        columns: vec!["Metric".to_string(), "Value".to_string()],
        rows,
    }
}

fn write_table(worksheet: &mut Worksheet, table: &ReportTable) -> Result<()> {
    worksheet.set_name(&table.sheet_name)?;

    let header_format = Format::new()
        .set_bold()
        .set_font_color(Color::White)
        .set_background_color(Color::RGB(HEADER_FILL))
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);
    let data_format = Format::new()
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);
    let link_format = Format::new()
        .set_font_color(Color::Blue)
        .set_underline(FormatUnderline::Single)
        .set_align(FormatAlign::Left)
        .set_align(FormatAlign::VerticalCenter)
        .set_border(FormatBorder::Thin);

    let mut widths: Vec<usize> = table.columns.iter().map(|c| display_width(c)).collect();

    for (col, title) in table.columns.iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, title, &header_format)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let excel_row = (index + 1) as u32;
        for (col, cell) in row.cells.iter().enumerate() {
            worksheet.write_string_with_format(excel_row, col as u16, cell, &data_format)?;
            if let Some(width) = widths.get_mut(col) {
                *width = (*width).max(display_width(cell));
            }
        }
        if let Some(target) = &row.link {
            let col = row.cells.len();
            let url = Url::new(format!("file://{}", target.display())).set_text(LINK_TEXT);
            worksheet.write_url_with_format(excel_row, col as u16, url, &link_format)?;
            if let Some(width) = widths.get_mut(col) {
                *width = (*width).max(display_width(LINK_TEXT));
            }
        }
    }

    for (col, width) in widths.iter().enumerate() {
        worksheet.set_column_width(col as u16, column_width(*width))?;
    }
    worksheet.set_freeze_panes(1, 0)?;
    Ok(())
}

/// Approximate on-screen width of a cell: CJK and other non-ASCII characters
/// render about twice as wide as Latin ones.
fn display_width(text: &str) -> usize {
    text.chars()
        .map(|ch| if ch.is_ascii() { 1 } else { 2 })
        .sum()
}

fn column_width(max_chars: usize) -> f64 {
    (max_chars as f64 * 1.2 + 2.0).clamp(6.0, 80.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_table_appends_the_link_column() {
        let record = HeaderRecord::empty(Path::new("WZ-FJ-202406-032.xlsx"));
        let table = header_table(&[record]);
        assert_eq!(table.columns.len(), Field::ALL.len() + 2);
        assert_eq!(table.columns.last().map(String::as_str), Some(LINK_COLUMN));
        assert_eq!(table.rows.len(), 1);
        assert!(table.rows[0].link.is_some());
        assert_eq!(table.rows[0].cells.len(), table.columns.len() - 1);
    }

    #[test]
    fn detail_columns_line_up_with_detail_cells() {
        let table = detail_table(&[]);
        assert_eq!(table.columns.len(), DetailRecord::COLUMNS.len() + 1);
        assert!(table.rows.is_empty());
    }

    #[test]
    fn statistics_table_mirrors_summary_rows() {
        let mut stats = RunStatistics::default();
        stats.total_files = 2;
        stats.record_missing(Field::Date);
        let table = statistics_table(&stats);
        assert_eq!(table.sheet_name, STATISTICS_SHEET);
        assert_eq!(table.rows.len(), stats.summary_rows().len());
    }

    #[test]
    fn cjk_text_counts_double_for_widths() {
        assert_eq!(display_width("abc"), 3);
        assert_eq!(display_width("预算编号"), 8);
        assert!(column_width(0) >= 6.0);
        assert!(column_width(1000) <= 80.0);
    }
}
