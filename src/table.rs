use std::fmt::Write as _;

/// Renders an elastic plain-text table: header, dashed separator, rows, with
/// columns padded to the widest cell and separated by two spaces.
pub fn render_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (idx, cell) in row.iter().enumerate().take(widths.len()) {
            widths[idx] = widths[idx].max(cell.chars().count());
        }
    }
    for width in &mut widths {
        *width = (*width).max(3);
    }

    let mut output = String::new();
    append_row(&mut output, headers, &widths);
    let separator: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    append_row(&mut output, &separator, &widths);
    for row in rows {
        append_row(&mut output, row, &widths);
    }
    output
}

pub fn print_table(headers: &[String], rows: &[Vec<String>]) {
    print!("{}", render_table(headers, rows));
}

fn append_row(output: &mut String, cells: &[String], widths: &[usize]) {
    let mut line = String::new();
    for (idx, cell) in cells.iter().enumerate().take(widths.len()) {
        if idx > 0 {
            line.push_str("  ");
        }
        line.push_str(cell);
        if idx + 1 < widths.len() {
            let padding = widths[idx].saturating_sub(cell.chars().count());
            line.push_str(&" ".repeat(padding));
        }
    }
    let _ = writeln!(output, "{}", line.trim_end());
}
