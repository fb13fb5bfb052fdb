use serde::Serialize;
use std::collections::BTreeSet;
use textplots::{Chart, Plot, Shape};

use crate::dataset::{format_number, Dataset, Dimension};
use crate::filter::FilterView;

/// One indicator/country line ready for charting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChartSeries {
    pub indicator: String,
    pub country: String,
    /// Measurement units, taken from the Notes dimension.
    pub units: Option<String>,
    pub points: Vec<(String, Option<f64>)>,
}

impl ChartSeries {
    /// Series for the first row of `view` matching `indicator` and `country`.
    pub fn from_view(
        view: &FilterView<'_>,
        dataset: &Dataset,
        indicator: &str,
        country: &str,
    ) -> Option<Self> {
        let record = view.rows.iter().find(|record| {
            dataset.dimension_value(record, Dimension::Indicator) == indicator
                && dataset.dimension_value(record, Dimension::Country) == country
        })?;

        let notes = dataset.dimension_value(record, Dimension::Notes);
        let points = view
            .display_columns
            .iter()
            .map(|column| (column.clone(), record.period(column).as_f64()))
            .collect();

        Some(Self {
            indicator: indicator.to_string(),
            country: country.to_string(),
            units: (!notes.is_empty()).then(|| notes.to_string()),
            points,
        })
    }

    pub fn present_values(&self) -> Vec<f64> {
        self.points.iter().filter_map(|(_, v)| *v).collect()
    }
}

/// Indicator and country choices offered for charting a view, each sorted and unique.
pub fn chart_choices(view: &FilterView<'_>, dataset: &Dataset) -> (Vec<String>, Vec<String>) {
    let collect = |dimension: Dimension| -> Vec<String> {
        view.rows
            .iter()
            .map(|record| dataset.dimension_value(record, dimension))
            .filter(|value| !value.is_empty())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect()
    };
    (collect(Dimension::Indicator), collect(Dimension::Country))
}

/// Countries that have a row for `indicator` in `view`, sorted and unique.
pub fn countries_for(view: &FilterView<'_>, dataset: &Dataset, indicator: &str) -> Vec<String> {
    view.rows
        .iter()
        .filter(|record| dataset.dimension_value(record, Dimension::Indicator) == indicator)
        .map(|record| dataset.dimension_value(record, Dimension::Country))
        .filter(|country| !country.is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Indicator and country of the first row in `view` that has both, in view order.
pub fn first_pair(view: &FilterView<'_>, dataset: &Dataset) -> Option<(String, String)> {
    view.rows.iter().find_map(|record| {
        let indicator = dataset.dimension_value(record, Dimension::Indicator);
        let country = dataset.dimension_value(record, Dimension::Country);
        (!indicator.is_empty() && !country.is_empty())
            .then(|| (indicator.to_string(), country.to_string()))
    })
}

/// ASCII line charts for indicator series
pub struct TimeSeriesPlotter;

impl TimeSeriesPlotter {
    const MIN_WIDTH: usize = 32;
    const MIN_HEIGHT: usize = 8;

    pub fn new() -> Self {
        Self
    }

    /// Plot a series; missing periods break the line instead of being drawn as zero.
    pub fn plot_series(&self, series: &ChartSeries, width: Option<usize>, height: Option<usize>) -> String {
        let title = format!("📊 {} - {}", series.indicator, series.country);
        let values = series.present_values();
        if values.is_empty() {
            return format!("{}\n📭 No data available for the selected periods", title);
        }

        let chart_width = width.unwrap_or(80).max(Self::MIN_WIDTH);
        let chart_height = height.unwrap_or(20).max(Self::MIN_HEIGHT);

        let min_val = values.iter().fold(f64::INFINITY, |a, &b| a.min(b));
        let max_val = values.iter().fold(f64::NEG_INFINITY, |a, &b| a.max(b));
        let avg_val = values.iter().sum::<f64>() / values.len() as f64;

        let mut output = String::new();
        output.push_str(&title);
        output.push('\n');
        if let Some(units) = &series.units {
            output.push_str(&format!("📏 Units: {}\n", units));
        }
        output.push_str(&format!(
            "📈 Points: {}/{} | Min: {} | Max: {} | Avg: {:.2}\n",
            values.len(),
            series.points.len(),
            format_number(min_val),
            format_number(max_val),
            avg_val
        ));
        output.push_str(&"─".repeat(chart_width));
        output.push('\n');

        let segments = line_segments(&series.points);
        let shapes: Vec<Shape> = segments
            .iter()
            .map(|segment| Shape::Lines(segment.as_slice()))
            .collect();

        // index-based x axis keeps periods evenly spaced
        let x_max = (series.points.len().max(2) - 1) as f32;
        let mut chart = Chart::new(chart_width as u32, chart_height as u32, 0.0, x_max);
        let mut plot = &mut chart;
        for shape in &shapes {
            plot = plot.lineplot(shape);
        }
        plot.axis();
        plot.figures();
        output.push_str(&plot.to_string());
        output.push('\n');

        if let (Some((first, _)), Some((last, _))) = (series.points.first(), series.points.last()) {
            output.push_str(&format!("📍 Periods: {} ──────── {}\n", first, last));
        }
        output.push_str(&"─".repeat(chart_width));
        output
    }

    /// Chart size derived from the terminal, with a fixed fallback.
    pub fn get_optimal_dimensions(&self) -> (usize, usize) {
        match crossterm::terminal::size() {
            Ok((cols, rows)) => {
                let width = (cols as usize).clamp(60, 120);
                let height = (rows as usize / 3).clamp(15, 30);
                (width, height)
            }
            Err(_) => (80, 20),
        }
    }
}

impl Default for TimeSeriesPlotter {
    fn default() -> Self {
        Self::new()
    }
}

/// Split points into runs of present values; a lone point becomes a zero-length segment.
fn line_segments(points: &[(String, Option<f64>)]) -> Vec<Vec<(f32, f32)>> {
    let mut segments = Vec::new();
    let mut current: Vec<(f32, f32)> = Vec::new();

    for (idx, (_, value)) in points.iter().enumerate() {
        match value {
            Some(v) => current.push((idx as f32, *v as f32)),
            None if !current.is_empty() => segments.push(std::mem::take(&mut current)),
            None => {}
        }
    }
    if !current.is_empty() {
        segments.push(current);
    }

    for segment in &mut segments {
        if segment.len() == 1 {
            let point = segment[0];
            segment.push(point);
        }
    }
    segments
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{filter, Selection};
    use crate::ingest::parse;
    use crate::timeframe::Timeframe;

    fn dataset() -> Dataset {
        let text = "Indicator,Category,Country,Notes,Source,2020,2021,2022,2023\n\
                    GDP,Economy,A,USD bn,IMF,1,,3,4\n\
                    GDP,Economy,B,,IMF,,,,\n\
                    CPI,Prices,A,%,NSO,0,1,2,3\n";
        parse(text, Timeframe::Annual, "inline").unwrap()
    }

    #[test]
    fn test_series_from_view() {
        let ds = dataset();
        let view = filter(&ds, &Selection::new().with_periods(["2021", "2022"]));
        let series = ChartSeries::from_view(&view, &ds, "GDP", "A").unwrap();
        assert_eq!(series.units.as_deref(), Some("USD bn"));
        assert_eq!(
            series.points,
            vec![("2021".to_string(), None), ("2022".to_string(), Some(3.0))]
        );
        assert!(ChartSeries::from_view(&view, &ds, "GDP", "Z").is_none());
    }

    #[test]
    fn test_chart_choices() {
        let ds = dataset();
        let view = filter(&ds, &Selection::new());
        let (indicators, countries) = chart_choices(&view, &ds);
        assert_eq!(indicators, vec!["CPI", "GDP"]);
        assert_eq!(countries, vec!["A", "B"]);
    }

    #[test]
    fn test_first_pair_comes_from_one_row() {
        let text = "Indicator,Category,Country,Notes,Source,2023\n\
                    GDP,Economy,B,,IMF,1\n\
                    CPI,Prices,C,,NSO,2\n";
        let ds = parse(text, Timeframe::Annual, "inline").unwrap();
        let view = filter(&ds, &Selection::new());

        // sorted choices would pair CPI with B, which no row has
        let (indicators, countries) = chart_choices(&view, &ds);
        assert!(ChartSeries::from_view(&view, &ds, &indicators[0], &countries[0]).is_none());

        let (indicator, country) = first_pair(&view, &ds).unwrap();
        assert_eq!((indicator.as_str(), country.as_str()), ("GDP", "B"));
        assert!(ChartSeries::from_view(&view, &ds, &indicator, &country).is_some());
    }

    #[test]
    fn test_first_pair_skips_rows_without_country() {
        let text = "Indicator,Category,Country,2023\nGDP,Economy,,1\nCPI,Prices,A,2\n";
        let ds = parse(text, Timeframe::Annual, "inline").unwrap();
        let view = filter(&ds, &Selection::new());
        assert_eq!(first_pair(&view, &ds), Some(("CPI".to_string(), "A".to_string())));

        let empty = filter(&ds, &Selection::new().with_values(Dimension::Country, ["Z"]));
        assert_eq!(first_pair(&empty, &ds), None);
    }

    #[test]
    fn test_countries_for_indicator() {
        let ds = dataset();
        let view = filter(&ds, &Selection::new());
        assert_eq!(countries_for(&view, &ds, "GDP"), vec!["A", "B"]);
        assert_eq!(countries_for(&view, &ds, "CPI"), vec!["A"]);
        assert!(countries_for(&view, &ds, "XYZ").is_empty());
    }

    #[test]
    fn test_line_segments_break_on_missing() {
        let points = vec![
            ("2020".to_string(), Some(1.0)),
            ("2021".to_string(), None),
            ("2022".to_string(), Some(3.0)),
            ("2023".to_string(), Some(4.0)),
        ];
        let segments = line_segments(&points);
        assert_eq!(segments, vec![vec![(0.0, 1.0), (0.0, 1.0)], vec![(2.0, 3.0), (3.0, 4.0)]]);
    }

    #[test]
    fn test_plot_series() {
        let ds = dataset();
        let view = filter(&ds, &Selection::new());
        let series = ChartSeries::from_view(&view, &ds, "CPI", "A").unwrap();
        let plot = TimeSeriesPlotter::new().plot_series(&series, Some(60), Some(10));
        assert!(plot.contains("CPI - A"));
        assert!(plot.contains("Units: %"));
        assert!(plot.contains("Points: 4/4 | Min: 0 | Max: 3"));
        assert!(plot.contains("2020 ──────── 2023"));
    }

    #[test]
    fn test_plot_without_values() {
        let ds = dataset();
        let view = filter(&ds, &Selection::new());
        let series = ChartSeries::from_view(&view, &ds, "GDP", "B").unwrap();
        assert!(series.units.is_none());
        let plot = TimeSeriesPlotter::new().plot_series(&series, None, None);
        assert!(plot.contains("No data available"));
    }
}
