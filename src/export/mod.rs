use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::path::Path;
use tracing::info;

use crate::dataset::{format_number, Dataset, Dimension};
use crate::error::{ExplorerError, Result};
use crate::filter::FilterView;
use crate::timeframe::Timeframe;

/// Serialize a view as CSV text.
///
/// Header is `Indicator,Category,Country,Notes,Source` followed by the display columns.
/// Rows keep view order; `\n` ends every line. Empty dimension values are written empty,
/// missing period values as `placeholder`, numbers in their shortest round-trip form.
/// Fields are quoted only when they contain a delimiter, quote or line break.
pub fn export_csv(view: &FilterView<'_>, dataset: &Dataset, placeholder: &str) -> Result<String> {
    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .quote_style(QuoteStyle::Necessary)
        .from_writer(Vec::new());

    let header: Vec<String> = Dimension::ALL
        .iter()
        .map(|dimension| dimension.label().to_string())
        .chain(view.display_columns.iter().cloned())
        .collect();
    writer.write_record(&header).map_err(csv_error)?;

    for record in &view.rows {
        let mut fields: Vec<String> = Dimension::ALL
            .iter()
            .map(|dimension| dataset.dimension_value(record, *dimension).to_string())
            .collect();
        fields.extend(view.display_columns.iter().map(|column| {
            record
                .period(column)
                .as_f64()
                .map(format_number)
                .unwrap_or_else(|| placeholder.to_string())
        }));
        writer.write_record(&fields).map_err(csv_error)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ExplorerError::Export(format!("flush failed: {}", e.error())))?;
    String::from_utf8(bytes).map_err(|e| ExplorerError::Export(format!("output is not UTF-8: {}", e)))
}

/// Download-style file name for an export, e.g. `indicators_quarterly_data.csv`.
pub fn export_file_name(prefix: &str, timeframe: Timeframe) -> String {
    format!("{}_{}_data.csv", prefix, timeframe)
}

/// Export a non-empty view to `path`.
pub fn write_export(
    path: &Path,
    view: &FilterView<'_>,
    dataset: &Dataset,
    placeholder: &str,
) -> Result<usize> {
    if view.is_empty() {
        return Err(ExplorerError::EmptyExport);
    }
    let text = export_csv(view, dataset, placeholder)?;
    std::fs::write(path, text).map_err(|source| ExplorerError::Io {
        path: path.display().to_string(),
        source,
    })?;
    info!("💾 Exported {} rows to {}", view.total(), path.display());
    Ok(view.total())
}

fn csv_error(err: csv::Error) -> ExplorerError {
    ExplorerError::Export(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::PeriodValue;
    use crate::filter::{filter, Selection};
    use crate::ingest::{parse, MISSING_PLACEHOLDER};

    const SOURCE: &str = "Indicator,Category,Country,Notes,Source,2022,2023\n\
                          GDP,Economy,A,USD bn,IMF,4.25,5\n\
                          CPI,Prices,\"Korea, Rep.\",,NSO,0,\n";

    #[test]
    fn test_export_exact_text() {
        let ds = parse(SOURCE, Timeframe::Annual, "inline").unwrap();
        let view = filter(&ds, &Selection::new());
        let text = export_csv(&view, &ds, MISSING_PLACEHOLDER).unwrap();
        assert_eq!(
            text,
            "Indicator,Category,Country,Notes,Source,2022,2023\n\
             GDP,Economy,A,USD bn,IMF,4.25,5\n\
             CPI,Prices,\"Korea, Rep.\",,NSO,0,...\n"
        );
    }

    #[test]
    fn test_export_only_display_columns() {
        let ds = parse(SOURCE, Timeframe::Annual, "inline").unwrap();
        let selection = Selection::new()
            .with_values(Dimension::Indicator, ["GDP"])
            .with_periods(["2023"]);
        let view = filter(&ds, &selection);
        let text = export_csv(&view, &ds, "n/a").unwrap();
        assert_eq!(
            text,
            "Indicator,Category,Country,Notes,Source,2023\nGDP,Economy,A,USD bn,IMF,5\n"
        );
    }

    #[test]
    fn test_round_trip() {
        let ds = parse(SOURCE, Timeframe::Annual, "inline").unwrap();
        let view = filter(&ds, &Selection::new());
        let text = export_csv(&view, &ds, MISSING_PLACEHOLDER).unwrap();
        let again = parse(&text, Timeframe::Annual, "export").unwrap();

        assert_eq!(again.period_columns, view.display_columns);
        assert_eq!(again.len(), view.total());
        for (original, reparsed) in view.rows.iter().zip(&again.records) {
            for dimension in Dimension::ALL {
                assert_eq!(
                    ds.dimension_value(original, dimension),
                    again.dimension_value(reparsed, dimension)
                );
            }
            for column in &view.display_columns {
                assert_eq!(original.period(column), reparsed.period(column));
            }
        }
        assert_eq!(again.records[1].period("2022"), PeriodValue::Number(0.0));
        assert_eq!(again.records[1].period("2023"), PeriodValue::Missing);
    }

    #[test]
    fn test_round_trip_keeps_row_with_empty_dimensions() {
        let text = "Indicator,Category,Country,Notes,Source,2023\n,,,,,1\nGDP,E,A,u,IMF,2\n";
        let ds = parse(text, Timeframe::Annual, "inline").unwrap();
        // a period selection that matches nothing leaves only dimension columns
        let view = filter(&ds, &Selection::new().with_periods(["1999"]));
        assert!(view.display_columns.is_empty());

        let exported = export_csv(&view, &ds, MISSING_PLACEHOLDER).unwrap();
        assert_eq!(exported, "Indicator,Category,Country,Notes,Source\n,,,,\nGDP,E,A,u,IMF\n");

        let again = parse(&exported, Timeframe::Annual, "export").unwrap();
        assert_eq!(again.len(), view.total());
        assert_eq!(again.dimension_value(&again.records[0], Dimension::Indicator), "");
        assert_eq!(again.dimension_value(&again.records[1], Dimension::Source), "IMF");
    }

    #[test]
    fn test_write_export_refuses_empty_view() {
        let ds = parse(SOURCE, Timeframe::Annual, "inline").unwrap();
        let selection = Selection::new().with_values(Dimension::Country, ["nowhere"]);
        let view = filter(&ds, &selection);
        let dir = tempfile::tempdir().unwrap();
        let err = write_export(&dir.path().join("out.csv"), &view, &ds, "...").unwrap_err();
        assert!(matches!(err, ExplorerError::EmptyExport));
    }

    #[test]
    fn test_write_export_to_file() {
        let ds = parse(SOURCE, Timeframe::Annual, "inline").unwrap();
        let view = filter(&ds, &Selection::new());
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(export_file_name("indicators", Timeframe::Annual));
        assert_eq!(write_export(&path, &view, &ds, "...").unwrap(), 2);
        assert!(path.ends_with("indicators_annual_data.csv"));
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("Indicator,Category,Country,Notes,Source,2022,2023\n"));
    }
}
