use std::borrow::Cow;
use std::fmt::Write as _;

use crate::data::{Cell, CleanedTable};

const NULL_MARKER: &str = "<null>";

/// Renders the first `limit` rows of `table` as an aligned plain-text table.
pub fn render_table(table: &CleanedTable, limit: usize) -> String {
    let rows = table
        .rows
        .iter()
        .take(limit)
        .map(|row| row.iter().map(render_cell).collect::<Vec<_>>())
        .collect::<Vec<_>>();
    render_grid(&table.columns, &rows)
}

pub fn render_grid(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths = headers.iter().map(|h| display_width(h)).collect::<Vec<_>>();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(display_width(cell));
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    let _ = writeln!(output, "{}", format_row(headers, &widths));
    let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
    let _ = writeln!(output, "{}", format_row(&separator, &widths));
    for row in rows {
        let _ = writeln!(output, "{}", format_row(row, &widths));
    }
    output
}

pub fn print_table(table: &CleanedTable, limit: usize) {
    print!("{}", render_table(table, limit));
}

fn render_cell(cell: &Cell) -> String {
    match cell {
        Cell::Null => NULL_MARKER.to_string(),
        other => other.as_display(),
    }
}

fn format_row(values: &[String], widths: &[usize]) -> String {
    let mut line = values
        .iter()
        .zip(widths)
        .map(|(value, width)| {
            let sanitized = sanitize_cell(value);
            let padding = width.saturating_sub(display_width(&sanitized));
            format!("{sanitized}{}", " ".repeat(padding))
        })
        .collect::<Vec<_>>()
        .join("  ");
    let trimmed = line.trim_end().len();
    line.truncate(trimmed);
    line
}

fn display_width(value: &str) -> usize {
    value.chars().count()
}

fn sanitize_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_aligned_columns_with_null_marker() {
        let table = CleanedTable::new(
            vec!["id".into(), "note".into()],
            vec![
                vec![Cell::Number(1.0), Cell::Text("multi\nline".into())],
                vec![Cell::Number(22.0), Cell::Null],
            ],
        );
        let rendered = render_table(&table, 10);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "id   note");
        assert_eq!(lines[1], "---  ----------");
        assert_eq!(lines[2], "1    multi line");
        assert_eq!(lines[3], "22   <null>");
    }

    #[test]
    fn limit_caps_rendered_rows() {
        let table = CleanedTable::new(vec!["n".into()], vec![vec![Cell::Number(1.0)]; 5]);
        assert_eq!(render_table(&table, 2).lines().count(), 4);
    }
}
