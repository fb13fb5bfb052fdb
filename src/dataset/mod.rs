use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::timeframe::Timeframe;

/// One period cell: a number, or explicitly missing.
///
/// `Missing` and `Number(0.0)` are different values and are kept apart everywhere,
/// including rendered and exported text.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<f64>", into = "Option<f64>")]
pub enum PeriodValue {
    Number(f64),
    #[default]
    Missing,
}

impl PeriodValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PeriodValue::Number(v) => Some(*v),
            PeriodValue::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, PeriodValue::Missing)
    }
}

impl From<Option<f64>> for PeriodValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(PeriodValue::Missing, PeriodValue::Number)
    }
}

impl From<PeriodValue> for Option<f64> {
    fn from(value: PeriodValue) -> Self {
        value.as_f64()
    }
}

/// Shortest decimal text that reads back to the same number (`5`, `0`, `1.25`).
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // keeps -0 from printing as "-0"
        return "0".to_string();
    }
    value.to_string()
}

/// The five categorical dimensions of an indicator table.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum Dimension {
    Indicator,
    Category,
    Country,
    Notes,
    Source,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Indicator,
        Dimension::Category,
        Dimension::Country,
        Dimension::Notes,
        Dimension::Source,
    ];

    /// Conventional position among the dimension columns.
    pub fn position(&self) -> usize {
        match self {
            Dimension::Indicator => 0,
            Dimension::Category => 1,
            Dimension::Country => 2,
            Dimension::Notes => 3,
            Dimension::Source => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Indicator => "Indicator",
            Dimension::Category => "Category",
            Dimension::Country => "Country",
            Dimension::Notes => "Notes",
            Dimension::Source => "Source",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Which dimension column backs each [`Dimension`].
///
/// Resolution prefers a header with the dimension's name (case-insensitive). Dimensions
/// without a named header fall back to their conventional position, unless a named
/// dimension already claimed that column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionLayout {
    slots: [Option<usize>; 5],
}

impl DimensionLayout {
    pub fn resolve(dimension_columns: &[String]) -> Self {
        let mut slots = [None; 5];

        for dimension in Dimension::ALL {
            slots[dimension.position()] = dimension_columns
                .iter()
                .position(|header| header.eq_ignore_ascii_case(dimension.label()));
        }

        let claimed: Vec<usize> = slots.iter().flatten().copied().collect();
        for dimension in Dimension::ALL {
            let slot = &mut slots[dimension.position()];
            if slot.is_none()
                && dimension.position() < dimension_columns.len()
                && !claimed.contains(&dimension.position())
            {
                *slot = Some(dimension.position());
            }
        }

        Self { slots }
    }

    /// Index into the dimension columns for `dimension`, if resolved.
    pub fn column_index(&self, dimension: Dimension) -> Option<usize> {
        self.slots[dimension.position()]
    }

    /// True when the dimension was found by header name rather than position.
    pub fn is_named(&self, dimension: Dimension, dimension_columns: &[String]) -> bool {
        self.column_index(dimension)
            .and_then(|idx| dimension_columns.get(idx))
            .is_some_and(|header| header.eq_ignore_ascii_case(dimension.label()))
    }
}

/// A single table row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    /// Trimmed dimension values, aligned with `Dataset::dimension_columns`.
    dimensions: Vec<String>,
    periods: BTreeMap<String, PeriodValue>,
}

impl Record {
    pub fn new(dimensions: Vec<String>, periods: BTreeMap<String, PeriodValue>) -> Self {
        Self {
            dimensions,
            periods,
        }
    }

    pub fn dimension_at(&self, index: usize) -> &str {
        self.dimensions.get(index).map(String::as_str).unwrap_or("")
    }

    /// Value of a period column; columns the record does not carry read as missing.
    pub fn period(&self, column: &str) -> PeriodValue {
        self.periods.get(column).copied().unwrap_or_default()
    }
}

/// Counters describing how forgiving the parser had to be.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IngestStats {
    pub padded_rows: usize,
    pub truncated_rows: usize,
    pub skipped_blank_lines: usize,
    pub unparsable_cells: usize,
    /// Header cells with no name; their fields are dropped.
    pub ignored_header_cells: usize,
}

/// A fully parsed indicator table. Immutable once built; replaced wholesale on reload.
#[derive(Debug, Clone)]
pub struct Dataset {
    pub timeframe: Timeframe,
    pub location: String,
    pub loaded_at: DateTime<Utc>,
    pub dimension_columns: Vec<String>,
    pub period_columns: Vec<String>,
    pub layout: DimensionLayout,
    pub records: Vec<Record>,
    pub stats: IngestStats,
}

impl Dataset {
    /// Value of `dimension` for `record`, empty when the layout has no column for it.
    pub fn dimension_value<'r>(&self, record: &'r Record, dimension: Dimension) -> &'r str {
        self.layout
            .column_index(dimension)
            .map(|idx| record.dimension_at(idx))
            .unwrap_or("")
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
