//! Plain-text table rendering for terminal output.

use std::{borrow::Cow, fmt::Write as _};

const COLUMN_GAP: &str = "  ";

#[derive(Debug, Clone, Default)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        Self {
            headers: headers.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn widths(&self) -> Vec<usize> {
        let mut widths = self
            .headers
            .iter()
            .map(|header| header.chars().count().max(3))
            .collect::<Vec<_>>();
        for row in &self.rows {
            for (width, cell) in widths.iter_mut().zip(row) {
                *width = (*width).max(flatten_cell(cell).chars().count());
            }
        }
        widths
    }

    pub fn render(&self) -> String {
        let widths = self.widths();
        let mut output = String::new();
        let separator = widths.iter().map(|w| "-".repeat(*w)).collect::<Vec<_>>();
        for line in std::iter::once(&self.headers)
            .chain(std::iter::once(&separator))
            .chain(&self.rows)
        {
            let _ = writeln!(output, "{}", format_line(line, &widths));
        }
        output
    }
}

fn format_line(cells: &[String], widths: &[usize]) -> String {
    let mut line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", flatten_cell(cell), width = *width))
        .collect::<Vec<_>>()
        .join(COLUMN_GAP);
    line.truncate(line.trim_end().len());
    line
}

/// Keeps each cell on one line.
fn flatten_cell(value: &str) -> Cow<'_, str> {
    if value.contains(['\n', '\r', '\t']) {
        Cow::Owned(value.replace(['\n', '\r', '\t'], " "))
    } else {
        Cow::Borrowed(value)
    }
}
