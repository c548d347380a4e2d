//! Heuristic location of labelled values inside untyped worksheet grids.
//!
//! Budget documents scatter their header fields at irregular positions, so
//! the locator runs an explicit ordered list of strategies over a bounded
//! window of the sheet: exact label match, detected table-header column,
//! substring match (with merged-cell awareness), and finally label-and-value
//! packed into a single cell. The first strategy producing a non-empty value
//! wins; there is no scoring and no ambiguity resolution beyond the order.

use calamine::Dimensions;

use crate::sheet::Sheet;

/// Vocabulary used to recognise a table header row: a row with at least
/// three cells matching one of these is treated as the column-label row of a
/// tabular block. Mixed-language because the observed documents are.
const HEADER_KEYWORDS: &[&str] = &[
    "序号",
    "编码",
    "编号",
    "名称",
    "规格",
    "型号",
    "材质",
    "单位",
    "数量",
    "价格",
    "备注",
    "sequence",
    "seq",
    "code",
    "name",
    "specification",
    "material",
    "unit",
    "quantity",
    "price",
    "remark",
];

/// Minimum keyword hits for a row to qualify as a table header.
const HEADER_KEYWORD_THRESHOLD: usize = 3;

/// Window of the sheet the keyword strategies scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchBounds {
    pub max_rows: u32,
    pub max_cols: u32,
}

impl Default for SearchBounds {
    fn default() -> Self {
        SearchBounds {
            max_rows: 30,
            max_cols: 12,
        }
    }
}

impl SearchBounds {
    fn row_limit(&self, sheet: &Sheet) -> u32 {
        self.max_rows.min(sheet.rows())
    }

    fn col_limit(&self, sheet: &Sheet) -> u32 {
        self.max_cols.min(sheet.cols())
    }
}

/// One attempt at extracting a labelled value from a sheet. Strategies are
/// independent so they can be tested and reordered on their own.
pub trait LocateStrategy {
    fn locate(&self, sheet: &Sheet, labels: &[&str], bounds: SearchBounds) -> Option<String>;
}

/// Strategy 1: a cell whose whole text equals a candidate label
/// (case-insensitive, trailing colon ignored). The value is taken from the
/// adjacent right cell, else the cell below, else the diagonal.
pub struct ExactLabel;

impl LocateStrategy for ExactLabel {
    fn locate(&self, sheet: &Sheet, labels: &[&str], bounds: SearchBounds) -> Option<String> {
        for row in 0..bounds.row_limit(sheet) {
            for col in 0..bounds.col_limit(sheet) {
                let text = sheet.text(row, col);
                if text.is_empty() || !is_exact_label(&text, labels) {
                    continue;
                }
                let neighbours = [(row, col + 1), (row + 1, col), (row + 1, col + 1)];
                for (value_row, value_col) in neighbours {
                    let value = sheet.text(value_row, value_col);
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
        None
    }
}

/// Strategy 2: when the sheet has a detectable table header row, candidate
/// labels are matched against the header text and the value is the first
/// non-empty cell beneath the matching column.
pub struct HeaderColumn;

impl LocateStrategy for HeaderColumn {
    fn locate(&self, sheet: &Sheet, labels: &[&str], bounds: SearchBounds) -> Option<String> {
        let header_row = detect_header_row(sheet, bounds)?;
        for col in 0..bounds.col_limit(sheet) {
            let header = sheet.text(header_row, col);
            if header.is_empty() {
                continue;
            }
            if labels
                .iter()
                .any(|label| find_label_ci(&header, label).is_some())
            {
                if let Some(value) = find_value_in_column(sheet, header_row, col) {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Strategy 3: a cell containing a candidate label as a substring. The value
/// is the first non-empty non-label cell to the right in the same row, else
/// the cell below, else the first cell past the merged region containing the
/// label.
pub struct Substring;

impl LocateStrategy for Substring {
    fn locate(&self, sheet: &Sheet, labels: &[&str], bounds: SearchBounds) -> Option<String> {
        for row in 0..bounds.row_limit(sheet) {
            for col in 0..bounds.col_limit(sheet) {
                let text = sheet.text(row, col);
                if text.is_empty() || !contains_label(&text, labels) {
                    continue;
                }
                for value_col in (col + 1)..bounds.col_limit(sheet) {
                    let value = sheet.text(row, value_col);
                    if !value.is_empty() && !contains_label(&value, labels) {
                        return Some(value);
                    }
                }
                let below = sheet.text(row + 1, col);
                if !below.is_empty() && !contains_label(&below, labels) {
                    return Some(below);
                }
                if let Some(value) = value_past_merged_region(sheet, row, col, labels) {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Strategy 4: label and value packed into one cell, as in
/// `Budget ID: WZ-FJ-202406-032`. The text after the label is returned with
/// a leading colon stripped.
pub struct InlineSplit;

impl LocateStrategy for InlineSplit {
    fn locate(&self, sheet: &Sheet, labels: &[&str], bounds: SearchBounds) -> Option<String> {
        for row in 0..bounds.row_limit(sheet) {
            for col in 0..bounds.col_limit(sheet) {
                let text = sheet.text(row, col);
                if text.is_empty() {
                    continue;
                }
                if let Some(value) = split_after_label(&text, labels) {
                    return Some(value);
                }
            }
        }
        None
    }
}

/// Runs the strategy chain in order and returns the first non-empty value,
/// or an empty string when every strategy comes up dry.
pub fn find_value_by_keyword(sheet: &Sheet, labels: &[&str], bounds: SearchBounds) -> String {
    let strategies: [&dyn LocateStrategy; 4] = [&ExactLabel, &HeaderColumn, &Substring, &InlineSplit];
    for strategy in strategies {
        if let Some(value) = strategy.locate(sheet, labels, bounds) {
            if !value.is_empty() {
                return value;
            }
        }
    }
    String::new()
}

/// Reads a fixed cell for documents following the known template. When the
/// cell packs a label next to the value, the label part is stripped.
pub fn find_value_by_coordinate(sheet: &Sheet, row: u32, col: u32, labels: &[&str]) -> String {
    let text = sheet.text(row, col);
    if text.is_empty() {
        return text;
    }
    if let Some(value) = split_after_label(&text, labels) {
        return value;
    }
    if is_exact_label(&text, labels) {
        // The cell holds only the label itself; the keyword fallback will
        // have to find the value elsewhere.
        return String::new();
    }
    text
}

/// First non-empty cell beneath the given header column.
pub fn find_value_in_column(sheet: &Sheet, header_row: u32, col: u32) -> Option<String> {
    for row in (header_row + 1)..sheet.rows() {
        let value = sheet.text(row, col);
        if !value.is_empty() {
            return Some(value);
        }
    }
    None
}

/// Scans the bounded window for the first row with at least
/// [`HEADER_KEYWORD_THRESHOLD`] cells matching the header vocabulary.
pub fn detect_header_row(sheet: &Sheet, bounds: SearchBounds) -> Option<u32> {
    for row in 0..bounds.row_limit(sheet) {
        let mut hits = 0;
        for col in 0..bounds.col_limit(sheet) {
            let text = sheet.text(row, col).to_lowercase();
            if text.is_empty() {
                continue;
            }
            if HEADER_KEYWORDS.iter().any(|keyword| text.contains(keyword)) {
                hits += 1;
                if hits >= HEADER_KEYWORD_THRESHOLD {
                    return Some(row);
                }
            }
        }
    }
    None
}

fn value_past_merged_region(
    sheet: &Sheet,
    row: u32,
    col: u32,
    labels: &[&str],
) -> Option<String> {
    let region: Dimensions = *sheet.merged_region_at(row, col)?;
    let candidates = [(row, region.end.1 + 1), (region.end.0 + 1, col)];
    for (value_row, value_col) in candidates {
        let value = sheet.text(value_row, value_col);
        if !value.is_empty() && !contains_label(&value, labels) {
            return Some(value);
        }
    }
    None
}

/// Strips a trailing colon (ASCII or full-width) and surrounding whitespace,
/// lower-casing for comparison.
fn normalize_label(text: &str) -> String {
    text.trim()
        .trim_end_matches([':', '：'])
        .trim()
        .to_lowercase()
}

fn is_exact_label(text: &str, labels: &[&str]) -> bool {
    let normalized = normalize_label(text);
    labels.iter().any(|label| normalized == normalize_label(label))
}

fn contains_label(text: &str, labels: &[&str]) -> bool {
    labels
        .iter()
        .any(|label| find_label_ci(text, label).is_some())
}

/// Case-insensitive substring search returning the byte span of the match in
/// the original text. Indexing stays on character boundaries of the
/// original, which a plain `to_lowercase().find()` would not guarantee.
fn find_label_ci(text: &str, label: &str) -> Option<(usize, usize)> {
    let label_lower = label.trim().to_lowercase();
    if label_lower.is_empty() {
        return None;
    }
    for (start, _) in text.char_indices() {
        let rest = &text[start..];
        if !rest.to_lowercase().starts_with(&label_lower) {
            continue;
        }
        let mut matched = String::new();
        let mut len = 0;
        for ch in rest.chars() {
            matched.extend(ch.to_lowercase());
            len += ch.len_utf8();
            if matched.len() >= label_lower.len() {
                break;
            }
        }
        return Some((start, start + len));
    }
    None
}

/// Splits `label[:] value` inside one cell, trying longer labels first so
/// `事业部预算编号` wins over a plain `预算编号`.
fn split_after_label(text: &str, labels: &[&str]) -> Option<String> {
    let mut ordered: Vec<&str> = labels.to_vec();
    ordered.sort_by_key(|label| std::cmp::Reverse(label.len()));
    for label in ordered {
        if let Some((_, end)) = find_label_ci(text, label) {
            let remainder = text[end..]
                .trim_start()
                .trim_start_matches([':', '：'])
                .trim();
            if !remainder.is_empty() {
                return Some(remainder.to_string());
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use calamine::{Data, Range};

    fn sheet_from(cells: &[(u32, u32, &str)]) -> Sheet {
        sheet_with_merges(cells, Vec::new())
    }

    fn sheet_with_merges(cells: &[(u32, u32, &str)], merged: Vec<Dimensions>) -> Sheet {
        let max_row = cells.iter().map(|(row, _, _)| *row).max().unwrap_or(0);
        let max_col = cells.iter().map(|(_, col, _)| *col).max().unwrap_or(0);
        let mut range = Range::new((0, 0), (max_row.max(1), max_col.max(1)));
        for (row, col, value) in cells {
            range.set_value((*row, *col), Data::String((*value).to_string()));
        }
        Sheet::new(range, merged)
    }

    const BUDGET_LABELS: &[&str] = &["事业部预算编号", "budget id"];

    #[test]
    fn exact_label_prefers_the_right_cell() {
        let sheet = sheet_from(&[
            (2, 0, "Budget ID:"),
            (2, 1, "WZ-FJ-202406-032"),
            (3, 0, "below-value"),
        ]);
        assert_eq!(
            find_value_by_keyword(&sheet, BUDGET_LABELS, SearchBounds::default()),
            "WZ-FJ-202406-032"
        );
    }

    #[test]
    fn exact_label_falls_back_to_the_cell_below() {
        let sheet = sheet_from(&[(2, 0, "Budget ID"), (3, 0, "WZ-FJ-202406-032")]);
        assert_eq!(
            ExactLabel
                .locate(&sheet, BUDGET_LABELS, SearchBounds::default())
                .as_deref(),
            Some("WZ-FJ-202406-032")
        );
    }

    #[test]
    fn exact_label_takes_the_diagonal_as_a_last_resort() {
        let sheet = sheet_from(&[(2, 0, "budget id："), (3, 1, "WZ-FJ-202406-032")]);
        assert_eq!(
            ExactLabel
                .locate(&sheet, BUDGET_LABELS, SearchBounds::default())
                .as_deref(),
            Some("WZ-FJ-202406-032")
        );
    }

    #[test]
    fn header_row_detection_needs_three_keyword_hits() {
        let sheet = sheet_from(&[
            (0, 0, "标题"),
            (7, 0, "序号"),
            (7, 1, "存货编码"),
            (7, 2, "存货名称"),
            (7, 3, "单位"),
        ]);
        assert_eq!(detect_header_row(&sheet, SearchBounds::default()), Some(7));
    }

    #[test]
    fn header_column_strategy_reads_beneath_the_matching_header() {
        let sheet = sheet_from(&[
            (1, 0, "序号"),
            (1, 1, "名称"),
            (1, 2, "单位"),
            (2, 2, "件"),
        ]);
        assert_eq!(
            HeaderColumn
                .locate(&sheet, &["单位"], SearchBounds::default())
                .as_deref(),
            Some("件")
        );
    }

    #[test]
    fn substring_match_skips_label_cells_in_the_same_row() {
        let sheet = sheet_from(&[
            (4, 0, "（事业部预算编号）"),
            (4, 1, "budget id"),
            (4, 2, "WZ-FJ-202406-032"),
        ]);
        assert_eq!(
            Substring
                .locate(&sheet, BUDGET_LABELS, SearchBounds::default())
                .as_deref(),
            Some("WZ-FJ-202406-032")
        );
    }

    #[test]
    fn substring_match_reads_past_a_merged_region() {
        let merged = vec![Dimensions {
            start: (4, 0),
            end: (4, 2),
        }];
        let sheet = sheet_with_merges(
            &[(4, 0, "（事业部预算编号）"), (4, 3, "WZ-FJ-202406-032")],
            merged,
        );
        assert_eq!(
            Substring
                .locate(&sheet, BUDGET_LABELS, SearchBounds::default())
                .as_deref(),
            Some("WZ-FJ-202406-032")
        );
    }

    #[test]
    fn inline_split_strips_the_label_and_colon() {
        let sheet = sheet_from(&[(3, 0, "事业部预算编号：WZ-FJ-202406-032")]);
        assert_eq!(
            find_value_by_keyword(&sheet, BUDGET_LABELS, SearchBounds::default()),
            "WZ-FJ-202406-032"
        );
    }

    #[test]
    fn inline_split_prefers_the_longest_matching_label() {
        let value = split_after_label(
            "事业部预算编号：WZ-FJ-202406-032",
            &["预算编号", "事业部预算编号"],
        );
        assert_eq!(value.as_deref(), Some("WZ-FJ-202406-032"));
    }

    #[test]
    fn coordinate_read_strips_an_inline_label() {
        let sheet = sheet_from(&[(3, 0, "事业部预算编号：WZ-FJ-202406-032")]);
        assert_eq!(
            find_value_by_coordinate(&sheet, 3, 0, BUDGET_LABELS),
            "WZ-FJ-202406-032"
        );
    }

    #[test]
    fn coordinate_read_of_a_bare_label_is_empty() {
        let sheet = sheet_from(&[(3, 0, "Budget ID:")]);
        assert_eq!(find_value_by_coordinate(&sheet, 3, 0, BUDGET_LABELS), "");
    }

    #[test]
    fn nothing_found_yields_an_empty_string() {
        let sheet = sheet_from(&[(0, 0, "完全无关的内容")]);
        assert_eq!(
            find_value_by_keyword(&sheet, BUDGET_LABELS, SearchBounds::default()),
            ""
        );
    }

    #[test]
    fn bounds_limit_the_scanned_window() {
        let sheet = sheet_from(&[(40, 0, "Budget ID"), (40, 1, "WZ-FJ-202406-032")]);
        let narrow = SearchBounds {
            max_rows: 10,
            max_cols: 5,
        };
        assert_eq!(find_value_by_keyword(&sheet, BUDGET_LABELS, narrow), "");
    }
}
