use chrono::Utc;
use csv::{ReaderBuilder, StringRecord, Trim};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, HashSet};
use std::time::Instant;
use tracing::{debug, info};

use crate::dataset::{Dataset, DimensionLayout, IngestStats, PeriodValue, Record};
use crate::error::{ExplorerError, Result};
use crate::timeframe::Timeframe;

/// Text written for missing values by the exporter; read back as missing.
pub const MISSING_PLACEHOLDER: &str = "...";

/// Digits grouped in threes by commas, e.g. `1,234,567.5`.
static GROUPED_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[+-]?\d{1,3}(,\d{3})+(\.\d+)?$").expect("valid regex"));

/// Where each header lands after classification.
enum ColumnSlot {
    Dimension(usize),
    Period(String),
    /// Blank header cell, e.g. from trailing commas; its fields are dropped.
    Ignored,
}

/// Parse raw CSV text into a [`Dataset`].
///
/// Padding policy: a data line with fewer fields than the header is padded, dimension
/// fields with `""` and period fields with [`PeriodValue::Missing`]. Fields beyond the
/// header width are ignored. Blank header cells and their fields are ignored. Lines whose
/// fields are all blank are skipped when the header has period columns; without period
/// columns such a line is a record whose dimensions are all empty.
pub fn parse(raw: &str, timeframe: Timeframe, location: &str) -> Result<Dataset> {
    let start_time = Instant::now();
    let text = raw.strip_prefix('\u{feff}').unwrap_or(raw);

    if text.trim().is_empty() {
        return Err(parse_error(location, "no header line"));
    }

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let mut rows = reader.records();
    let header = match rows.next() {
        Some(row) => row.map_err(|e| parse_error(location, &e.to_string()))?,
        None => return Err(parse_error(location, "no header line")),
    };
    if header.iter().all(str::is_empty) {
        return Err(parse_error(location, "header line has no column names"));
    }

    let (slots, dimension_columns, period_columns) = classify(&header, timeframe, location)?;
    info!(
        "🧭 Classified {} columns: {} dimension, {} {} period",
        slots.len(),
        dimension_columns.len(),
        period_columns.len(),
        timeframe
    );
    debug!("Dimension columns: {:?}", dimension_columns);

    let mut stats = IngestStats {
        ignored_header_cells: slots
            .iter()
            .filter(|slot| matches!(slot, ColumnSlot::Ignored))
            .count(),
        ..IngestStats::default()
    };
    let mut records = Vec::new();

    for (line_idx, row) in rows.enumerate() {
        let row = row.map_err(|e| parse_error(location, &e.to_string()))?;
        if !period_columns.is_empty() && row.iter().all(str::is_empty) {
            stats.skipped_blank_lines += 1;
            continue;
        }
        if row.len() < slots.len() {
            stats.padded_rows += 1;
        } else if row.len() > slots.len() {
            stats.truncated_rows += 1;
            debug!(
                "Line {} has {} fields, header has {}; extra fields ignored",
                line_idx + 2,
                row.len(),
                slots.len()
            );
        }
        records.push(build_record(&row, &slots, dimension_columns.len(), &mut stats));
    }

    let layout = DimensionLayout::resolve(&dimension_columns);

    info!(
        "📥 Parsed {} rows from {} in {}ms",
        records.len(),
        location,
        start_time.elapsed().as_millis()
    );
    if stats != IngestStats::default() {
        info!(
            "🩹 Tolerated input: {} padded, {} truncated, {} blank lines, {} unparsable cells, {} blank headers",
            stats.padded_rows,
            stats.truncated_rows,
            stats.skipped_blank_lines,
            stats.unparsable_cells,
            stats.ignored_header_cells
        );
    }

    Ok(Dataset {
        timeframe,
        location: location.to_string(),
        loaded_at: Utc::now(),
        dimension_columns,
        period_columns,
        layout,
        records,
        stats,
    })
}

fn classify(
    header: &StringRecord,
    timeframe: Timeframe,
    location: &str,
) -> Result<(Vec<ColumnSlot>, Vec<String>, Vec<String>)> {
    let mut seen = HashSet::new();
    let mut slots = Vec::with_capacity(header.len());
    let mut dimension_columns = Vec::new();
    let mut period_columns = Vec::new();

    for name in header.iter() {
        if name.is_empty() {
            slots.push(ColumnSlot::Ignored);
            continue;
        }
        if !seen.insert(name) {
            return Err(ExplorerError::DuplicateColumn {
                location: location.to_string(),
                column: name.to_string(),
            });
        }
        if timeframe.is_period_column(name) {
            period_columns.push(name.to_string());
            slots.push(ColumnSlot::Period(name.to_string()));
        } else {
            slots.push(ColumnSlot::Dimension(dimension_columns.len()));
            dimension_columns.push(name.to_string());
        }
    }

    Ok((slots, dimension_columns, period_columns))
}

fn build_record(
    row: &StringRecord,
    slots: &[ColumnSlot],
    dimension_count: usize,
    stats: &mut IngestStats,
) -> Record {
    let mut dimensions = vec![String::new(); dimension_count];
    let mut periods = BTreeMap::new();

    for (idx, slot) in slots.iter().enumerate() {
        let field = row.get(idx).unwrap_or("");
        match slot {
            ColumnSlot::Dimension(pos) => dimensions[*pos] = field.to_string(),
            ColumnSlot::Period(column) => {
                let value = parse_period_value(field);
                if value.is_missing() && !is_blank_marker(field) {
                    stats.unparsable_cells += 1;
                    debug!("Unparsable value '{}' in column {} treated as missing", field, column);
                }
                periods.insert(column.clone(), value);
            }
            ColumnSlot::Ignored => {}
        }
    }

    Record::new(dimensions, periods)
}

fn is_blank_marker(field: &str) -> bool {
    field.is_empty() || field == MISSING_PLACEHOLDER
}

/// Coerce a trimmed period cell.
///
/// Empty text and the export placeholder are missing; `0` is a real zero. Thousands
/// separators inside quoted numbers (`"1,234.5"`) are accepted only in groups of three;
/// `"1,2"` is unparsable. Non-finite results are treated as missing.
pub fn parse_period_value(field: &str) -> PeriodValue {
    let field = field.trim();
    if is_blank_marker(field) {
        return PeriodValue::Missing;
    }
    let parsed = field.parse::<f64>().ok().or_else(|| {
        GROUPED_NUMBER
            .is_match(field)
            .then(|| field.replace(',', "").parse::<f64>().ok())
            .flatten()
    });
    match parsed {
        Some(v) if v.is_finite() => PeriodValue::Number(v),
        _ => PeriodValue::Missing,
    }
}

fn parse_error(location: &str, reason: &str) -> ExplorerError {
    ExplorerError::Parse {
        location: location.to_string(),
        reason: reason.to_string(),
    }
}
