use crate::dataset::{format_number, Dataset, Dimension, PeriodValue};
use crate::filter::FilterView;
use crate::pagination::PageWindow;

/// Display options for table cells.
#[derive(Debug, Clone)]
pub struct CellStyle {
    pub placeholder: String,
    /// Render literal zero as the placeholder instead of `0`.
    pub zero_as_blank: bool,
    pub max_text_width: usize,
}

impl Default for CellStyle {
    fn default() -> Self {
        Self {
            placeholder: "...".to_string(),
            zero_as_blank: false,
            max_text_width: 28,
        }
    }
}

impl CellStyle {
    pub fn period_cell(&self, value: PeriodValue) -> String {
        match value {
            PeriodValue::Number(v) if v == 0.0 && self.zero_as_blank => self.placeholder.clone(),
            PeriodValue::Number(v) => format_number(v),
            PeriodValue::Missing => self.placeholder.clone(),
        }
    }

    pub fn text_cell(&self, value: &str) -> String {
        if value.is_empty() {
            return self.placeholder.clone();
        }
        truncate(value, self.max_text_width)
    }
}

fn truncate(value: &str, max_width: usize) -> String {
    if max_width == 0 || value.chars().count() <= max_width {
        return value.to_string();
    }
    let kept: String = value.chars().take(max_width.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Render one page of `view` as an aligned text table followed by the page footer.
pub fn render_table(
    view: &FilterView<'_>,
    dataset: &Dataset,
    window: &PageWindow,
    style: &CellStyle,
) -> String {
    let headers: Vec<String> = Dimension::ALL
        .iter()
        .map(|d| d.label().to_string())
        .chain(view.display_columns.iter().cloned())
        .collect();

    let body: Vec<Vec<String>> = window
        .slice(&view.rows)
        .iter()
        .map(|record| {
            Dimension::ALL
                .iter()
                .map(|dimension| style.text_cell(dataset.dimension_value(record, *dimension)))
                .chain(
                    view.display_columns
                        .iter()
                        .map(|column| style.period_cell(record.period(column))),
                )
                .collect()
        })
        .collect();

    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in &body {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let dimension_count = Dimension::ALL.len();
    let format_row = |cells: &[String]| -> String {
        cells
            .iter()
            .zip(&widths)
            .enumerate()
            .map(|(idx, (cell, width))| {
                if idx < dimension_count {
                    format!("{:<width$}", cell, width = *width)
                } else {
                    format!("{:>width$}", cell, width = *width)
                }
            })
            .collect::<Vec<_>>()
            .join(" │ ")
    };

    let mut output = String::new();
    output.push_str(&format_row(headers.as_slice()));
    output.push('\n');
    let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    output.push_str(&rule.join("─┼─"));
    output.push('\n');
    for row in &body {
        output.push_str(&format_row(row.as_slice()));
        output.push('\n');
    }
    output.push_str(&window.summary());
    output
}
