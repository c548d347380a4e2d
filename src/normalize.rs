use std::sync::OnceLock;

use regex::Regex;

/// Shape of a business-unit budget identifier: two letter groups, a six-digit
/// year-month block, and a three-digit sequence, with optional `-`/`_`/space
/// separators between the groups.
const BUDGET_ID_PATTERN: &str =
    r"([A-Za-z]{1,2})[-_ ]?([A-Za-z]{1,2})[-_ ]?([0-9]{6})[-_ ]?([0-9]{3})";

fn budget_id_exact() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(&format!("^{BUDGET_ID_PATTERN}$")).expect("hardcoded pattern")
    })
}

fn budget_id_anywhere() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(BUDGET_ID_PATTERN).expect("hardcoded pattern"))
}

/// Reformats a raw budget identifier into the canonical upper-case dashed
/// form `LL-LL-YYYYMM-NNN`. Values that do not match the expected shape are
/// returned trimmed but otherwise unchanged.
pub fn normalize_budget_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match budget_id_exact().captures(trimmed) {
        Some(captures) => canonical(&captures),
        None => trimmed.to_string(),
    }
}

/// Searches a filename stem for an embedded budget identifier and returns it
/// in canonical form.
pub fn budget_id_from_filename(stem: &str) -> Option<String> {
    budget_id_anywhere()
        .captures(stem)
        .map(|captures| canonical(&captures))
}

/// Cross-checks two semi-structured identifiers by their digit sequences:
/// true when both contain digits and either digit string contains the other.
pub fn digits_match(left: &str, right: &str) -> bool {
    let left_digits = digits(left);
    let right_digits = digits(right);
    if left_digits.is_empty() || right_digits.is_empty() {
        return false;
    }
    left_digits.contains(&right_digits) || right_digits.contains(&left_digits)
}

fn canonical(captures: &regex::Captures<'_>) -> String {
    format!(
        "{}-{}-{}-{}",
        captures[1].to_uppercase(),
        captures[2].to_uppercase(),
        &captures[3],
        &captures[4],
    )
}

fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn separator_variants_normalize_to_the_dashed_form() {
        for raw in ["WZ-FJ-202406-032", "WZFJ202406032", "WZ_FJ_202406_032"] {
            assert_eq!(normalize_budget_id(raw), "WZ-FJ-202406-032", "raw: {raw}");
        }
    }

    #[test]
    fn lower_case_and_padding_are_cleaned_up() {
        assert_eq!(normalize_budget_id("  wz fj 202406 032 "), "WZ-FJ-202406-032");
    }

    #[test]
    fn non_matching_input_is_returned_trimmed() {
        assert_eq!(normalize_budget_id(" 预算202406 "), "预算202406");
        assert_eq!(normalize_budget_id(""), "");
    }

    #[test]
    fn filename_extraction_finds_an_embedded_identifier() {
        assert_eq!(
            budget_id_from_filename("2024预算导出 wz_fj_202406_032 终版"),
            Some("WZ-FJ-202406-032".to_string())
        );
        assert_eq!(budget_id_from_filename("2024预算导出"), None);
    }

    #[test]
    fn digit_cross_check_requires_substring_containment() {
        assert!(digits_match("WZ-FJ-202406-032", "WZ-FJ-202406-032"));
        assert!(digits_match("202406032", "文件202406032终版"));
        assert!(!digits_match("WZ-FJ-202406-032", "WZ-FJ-202406-099"));
        assert!(!digits_match("", "202406032"));
    }
}
