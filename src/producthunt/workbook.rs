//! Typed workbook layout for the exported lead and thread reports.
//!
//! The export format is a workbook: one sheet per product, an optional
//! two-row merged header (product name, product URL), a blank spacer row,
//! then a tabular dump with column widths auto-sized up to a cap. The
//! layout is modeled here as plain data so the sizing rules are testable;
//! rendering targets markdown, one file per run date.

use std::fmt::Write;

/// Characters a sheet name may not contain.
const FORBIDDEN_SHEET_CHARS: &[char] = &['[', ']', ':', '*', '?', '/', '\\'];

/// Maximum sheet name length.
const MAX_SHEET_NAME: usize = 31;

/// Extra padding added to every auto-sized column.
const WIDTH_PADDING: usize = 2;

/// Truncate to 31 characters and strip `[]:*?/\`, in that order.
pub fn sanitize_sheet_name(name: &str) -> String {
    name.chars()
        .take(MAX_SHEET_NAME)
        .filter(|c| !FORBIDDEN_SHEET_CHARS.contains(c))
        .collect()
}

/// One sheet of tabular data with an optional merged header block.
#[derive(Debug, Clone)]
pub struct Sheet {
    /// Sanitized sheet name.
    pub name: String,
    /// Two merged header lines shown above the table, typically
    /// `Name: …` and `URL: …`.
    pub header: Option<(String, String)>,
    /// Column titles.
    pub columns: Vec<String>,
    /// Data rows; each row has one cell per column.
    pub rows: Vec<Vec<String>>,
    /// Cap applied to auto-sized column widths.
    pub width_cap: usize,
}

impl Sheet {
    pub fn new(name: &str, columns: &[&str], width_cap: usize) -> Self {
        Self {
            name: sanitize_sheet_name(name),
            header: None,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
            width_cap,
        }
    }

    /// Attach the merged header block.
    pub fn with_header(mut self, name_line: String, url_line: String) -> Self {
        self.header = Some((name_line, url_line));
        self
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Auto-sized width per column: the longest of the column title and its
    /// cells, plus padding, capped.
    pub fn column_widths(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .map(|(idx, title)| {
                let longest_cell = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(idx))
                    .map(|cell| cell.chars().count())
                    .max()
                    .unwrap_or(0);
                (longest_cell.max(title.chars().count()) + WIDTH_PADDING).min(self.width_cap)
            })
            .collect()
    }
}

/// An ordered collection of sheets, one per product.
#[derive(Debug, Clone, Default)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_sheet(&mut self, sheet: Sheet) {
        self.sheets.push(sheet);
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Render every sheet as a padded markdown table.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        for sheet in &self.sheets {
            let widths = sheet.column_widths();

            writeln!(out, "## {}\n", sheet.name).unwrap();
            if let Some((name_line, url_line)) = &sheet.header {
                writeln!(out, "**{name_line}**").unwrap();
                writeln!(out, "**{url_line}**").unwrap();
                // spacer row between the merged header and the table
                writeln!(out).unwrap();
            }

            let titles: Vec<String> = sheet
                .columns
                .iter()
                .zip(&widths)
                .map(|(title, width)| pad_cell(title, *width))
                .collect();
            writeln!(out, "| {} |", titles.join(" | ")).unwrap();

            let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
            writeln!(out, "| {} |", rule.join(" | ")).unwrap();

            for row in &sheet.rows {
                let cells: Vec<String> = (0..sheet.columns.len())
                    .map(|idx| {
                        let cell = row.get(idx).map(String::as_str).unwrap_or("");
                        pad_cell(cell, widths[idx])
                    })
                    .collect();
                writeln!(out, "| {} |", cells.join(" | ")).unwrap();
            }
            writeln!(out).unwrap();
        }
        out
    }
}

/// Escape pipes and pad the cell to the column width.
fn pad_cell(cell: &str, width: usize) -> String {
    let escaped = cell.replace('|', "\\|");
    format!("{escaped:<width$}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_sheet() -> Sheet {
        let mut sheet = Sheet::new("Gadget", &["Name", "Role"], 50)
            .with_header("Name: Gadget".to_string(), "URL: https://g.example".to_string());
        sheet.push_row(vec!["Ada Lovelace".to_string(), "Founder".to_string()]);
        sheet.push_row(vec!["Bob".to_string(), "Designer and tinkerer".to_string()]);
        sheet
    }

    #[test]
    fn test_sanitize_strips_forbidden_chars() {
        assert_eq!(sanitize_sheet_name("a/b:c*d?e[f]g\\h"), "abcdefgh");
    }

    #[test]
    fn test_sanitize_truncates_before_stripping() {
        let name = format!("{}/x", "a".repeat(30));
        // 31-char prefix keeps the slash position, which then gets stripped.
        assert_eq!(sanitize_sheet_name(&name), "a".repeat(30));
    }

    #[test]
    fn test_column_widths_from_longest_cell() {
        let sheet = sample_sheet();
        // "Ada Lovelace" (12) + 2 and "Designer and tinkerer" (21) + 2.
        assert_eq!(sheet.column_widths(), vec![14, 23]);
    }

    #[test]
    fn test_column_widths_use_title_when_cells_are_short() {
        let mut sheet = Sheet::new("s", &["Description"], 50);
        sheet.push_row(vec!["x".to_string()]);
        assert_eq!(sheet.column_widths(), vec!["Description".len() + 2]);
    }

    #[test]
    fn test_column_widths_are_capped() {
        let mut sheet = Sheet::new("s", &["Name"], 10);
        sheet.push_row(vec!["an extremely long cell value".to_string()]);
        assert_eq!(sheet.column_widths(), vec![10]);
    }

    #[test]
    fn test_markdown_render_contains_header_spacer_and_rows() {
        let mut workbook = Workbook::new();
        workbook.add_sheet(sample_sheet());
        let rendered = workbook.to_markdown();

        assert!(rendered.contains("## Gadget"));
        assert!(rendered.contains("**Name: Gadget**\n**URL: https://g.example**\n\n"));
        assert!(rendered.contains("| Ada Lovelace"));
        assert!(rendered.contains("Founder"));
    }

    #[test]
    fn test_markdown_render_escapes_pipes() {
        let mut sheet = Sheet::new("s", &["Name"], 50);
        sheet.push_row(vec!["a|b".to_string()]);
        let mut workbook = Workbook::new();
        workbook.add_sheet(sheet);
        assert!(workbook.to_markdown().contains("a\\|b"));
    }
}
