//! Raw value sanitization applied before any coercion.

use crate::types::RawCell;
use crate::utils::is_missing_marker;

/// Strip wrapping quote pairs left over from double-escaped exports.
///
/// `"""North"""`, `""North""`, `"North"` and `'North'` all become `North`.
pub(crate) fn strip_wrapping_quotes(value: &str) -> &str {
    let mut cleaned = value.trim();

    loop {
        let unwrapped = ['"', '\'']
            .iter()
            .find(|q| cleaned.len() >= 2 && cleaned.starts_with(**q) && cleaned.ends_with(**q))
            .map(|_| cleaned[1..cleaned.len() - 1].trim());

        match unwrapped {
            Some(inner) => cleaned = inner,
            None => break,
        }
    }

    cleaned
}

/// Sanitize one raw cell.
///
/// Text is unquoted and trimmed; blanks and missing markers become
/// [`RawCell::Missing`]. Non-finite numbers are treated as missing.
pub(crate) fn sanitize_cell(cell: RawCell, missing_markers: &[String]) -> RawCell {
    match cell {
        RawCell::Text(text) => {
            let cleaned = strip_wrapping_quotes(&text);
            if is_missing_marker(cleaned, missing_markers) {
                RawCell::Missing
            } else {
                RawCell::Text(cleaned.to_string())
            }
        }
        RawCell::Number(n) if !n.is_finite() => RawCell::Missing,
        other => other,
    }
}

/// Sanitize a whole column of raw cells.
pub(crate) fn sanitize_cells(cells: Vec<RawCell>, missing_markers: &[String]) -> Vec<RawCell> {
    cells
        .into_iter()
        .map(|cell| sanitize_cell(cell, missing_markers))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn markers() -> Vec<String> {
        vec!["n/a".to_string(), "null".to_string()]
    }

    #[test]
    fn test_strip_wrapping_quotes() {
        assert_eq!(strip_wrapping_quotes("\"\"\"North\"\"\""), "North");
        assert_eq!(strip_wrapping_quotes("'South'"), "South");
        assert_eq!(strip_wrapping_quotes(" \" East \" "), "East");
        assert_eq!(strip_wrapping_quotes("O'Neil"), "O'Neil");
        assert_eq!(strip_wrapping_quotes("\""), "\"");
    }

    #[test]
    fn test_sanitize_cell_markers() {
        assert_eq!(
            sanitize_cell(RawCell::Text("N/A".to_string()), &markers()),
            RawCell::Missing
        );
        assert_eq!(
            sanitize_cell(RawCell::Text("\"null\"".to_string()), &markers()),
            RawCell::Missing
        );
        assert_eq!(
            sanitize_cell(RawCell::Text("   ".to_string()), &markers()),
            RawCell::Missing
        );
        assert_eq!(
            sanitize_cell(RawCell::Text(" 12 ".to_string()), &markers()),
            RawCell::Text("12".to_string())
        );
    }

    #[test]
    fn test_sanitize_cell_numbers() {
        assert_eq!(sanitize_cell(RawCell::Number(2.5), &markers()), RawCell::Number(2.5));
        assert_eq!(
            sanitize_cell(RawCell::Number(f64::NAN), &markers()),
            RawCell::Missing
        );
    }
}
