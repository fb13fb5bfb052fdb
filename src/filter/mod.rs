use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::dataset::{Dataset, Dimension, Record};
use crate::timeframe::Timeframe;

/// User choices driving a view.
///
/// An empty value set for a dimension places no constraint on it; an empty period
/// selection shows every period column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub dimension_filters: BTreeMap<Dimension, BTreeSet<String>>,
    pub periods: BTreeSet<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add accepted values for a dimension. Values are trimmed; blanks are dropped.
    pub fn with_values<I, S>(mut self, dimension: Dimension, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let entry = self.dimension_filters.entry(dimension).or_default();
        entry.extend(
            values
                .into_iter()
                .map(|v| v.as_ref().trim().to_string())
                .filter(|v| !v.is_empty()),
        );
        self
    }

    pub fn with_periods<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.periods.extend(
            tokens
                .into_iter()
                .map(|t| t.as_ref().trim().to_string())
                .filter(|t| !t.is_empty()),
        );
        self
    }

    pub fn is_unconstrained(&self) -> bool {
        self.periods.is_empty() && self.dimension_filters.values().all(BTreeSet::is_empty)
    }

    fn accepts(&self, dataset: &Dataset, record: &Record) -> bool {
        self.dimension_filters.iter().all(|(dimension, accepted)| {
            accepted.is_empty() || accepted.contains(dataset.dimension_value(record, *dimension))
        })
    }
}

/// Rows and period columns selected from a dataset. Borrows the records.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterView<'a> {
    pub rows: Vec<&'a Record>,
    pub display_columns: Vec<String>,
}

impl<'a> FilterView<'a> {
    /// Row count, used by callers to size pages.
    pub fn total(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Apply `selection` to `dataset`. Pure: the dataset is only read.
pub fn filter<'a>(dataset: &'a Dataset, selection: &Selection) -> FilterView<'a> {
    let rows: Vec<&Record> = dataset
        .records
        .iter()
        .filter(|record| selection.accepts(dataset, record))
        .collect();

    let display_columns = display_columns(dataset.timeframe, &dataset.period_columns, &selection.periods);

    debug!(
        "Filter kept {}/{} rows, {} display columns",
        rows.len(),
        dataset.len(),
        display_columns.len()
    );

    FilterView {
        rows,
        display_columns,
    }
}

/// Period columns to show for a period selection.
///
/// Each token is expanded under `timeframe`; only columns present in `period_columns`
/// survive, deduplicated and in lexicographic (chronological) order. Absent sub-periods
/// are dropped, never invented.
pub fn display_columns(
    timeframe: Timeframe,
    period_columns: &[String],
    periods: &BTreeSet<String>,
) -> Vec<String> {
    if periods.is_empty() {
        return period_columns.to_vec();
    }

    let available: BTreeSet<&str> = period_columns.iter().map(String::as_str).collect();
    let expanded: BTreeSet<String> = periods
        .iter()
        .flat_map(|token| timeframe.expand_token(token))
        .filter(|column| available.contains(column.as_str()))
        .collect();

    expanded.into_iter().collect()
}

/// Selectable values for every dimension plus the years present in the period columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Facets {
    pub values: BTreeMap<Dimension, Vec<String>>,
    pub years: Vec<String>,
}

impl Facets {
    pub fn from_dataset(dataset: &Dataset) -> Self {
        let mut values = BTreeMap::new();
        for dimension in Dimension::ALL {
            let unique: BTreeSet<&str> = dataset
                .records
                .iter()
                .map(|record| dataset.dimension_value(record, dimension))
                .filter(|value| !value.is_empty())
                .collect();
            values.insert(dimension, unique.into_iter().map(str::to_string).collect());
        }

        let years: BTreeSet<&str> = dataset
            .period_columns
            .iter()
            .filter_map(|column| Timeframe::year_of(column))
            .collect();

        Self {
            values,
            years: years.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn values_for(&self, dimension: Dimension) -> &[String] {
        self.values.get(&dimension).map(Vec::as_slice).unwrap_or(&[])
    }
}
