use anyhow::Result;
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::ExplorerConfig;
use crate::dataset::{Dataset, Dimension, IngestStats, PeriodValue};
use crate::error::ExplorerError;
use crate::explorer::Explorer;
use crate::export::{export_csv, export_file_name, write_export};
use crate::filter::{filter, Facets, FilterView, Selection};
use crate::pagination::{PageWindow, Pager};
use crate::plotting::{first_pair, ChartSeries, TimeSeriesPlotter};
use crate::render::render_table;
use crate::search::{FacetSearch, MatchMode};
use crate::source::DataLocation;
use crate::timeframe::Timeframe;

/// Where the table comes from. Shared by every subcommand.
#[derive(Args, Clone, Debug)]
pub struct DataArgs {
    /// Timeframe table to load
    #[arg(short, long, value_enum, default_value = "annual")]
    pub timeframe: Timeframe,

    /// YAML config file (defaults to ./indicator-explorer.yaml when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Data file prefix, e.g. `all` for all-annual-data.csv
    #[arg(long)]
    pub data_source: Option<String>,

    /// Directory or http(s) base URL holding the data files
    #[arg(long)]
    pub data_root: Option<String>,

    /// Load this file or URL directly instead of resolving one from the data root
    #[arg(long, help = "Explicit CSV path or URL; bypasses --data-root/--data-source")]
    pub file: Option<String>,
}

impl DataArgs {
    /// Config file settings with command-line overrides applied.
    pub fn config(&self) -> Result<ExplorerConfig> {
        let mut config = ExplorerConfig::load(self.config.as_deref())?;
        if let Some(source) = &self.data_source {
            config.data_source = source.clone();
        }
        if let Some(root) = &self.data_root {
            config.data_root = root.clone();
        }
        config.validate()?;
        Ok(config)
    }

    pub fn explorer(&self) -> Result<Explorer> {
        Ok(Explorer::new(self.config()?)?)
    }

    /// Load `timeframe` through `explorer`, honouring `--file`.
    pub async fn load(&self, explorer: &Explorer, timeframe: Timeframe) -> Result<Arc<Dataset>> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}")?);
        spinner.set_message(format!("Loading {} data...", timeframe));
        spinner.enable_steady_tick(Duration::from_millis(100));

        let result = match &self.file {
            Some(file) => {
                let location = DataLocation::parse(file)?;
                explorer.load_from(&location, timeframe).await
            }
            None => explorer.load(timeframe).await,
        };
        spinner.finish_and_clear();

        match result {
            Ok(dataset) => {
                if dataset.is_empty() {
                    warn!("⚠️  {} has a header but no data rows", dataset.location);
                }
                Ok(dataset)
            }
            Err(e) => {
                if e.is_fetch() {
                    warn!("📡 Could not retrieve the data file; check --data-root, --file or the network");
                }
                Err(e.into())
            }
        }
    }
}

/// Page size for one command: the `--rows-per-page` override, else the config value.
fn resolve_rows_per_page(requested: Option<usize>, config: &ExplorerConfig) -> Result<usize> {
    match requested {
        Some(0) => Err(ExplorerError::Config("--rows-per-page must be at least 1".to_string()).into()),
        Some(rows) => Ok(rows),
        None => Ok(config.rows_per_page),
    }
}

/// Dimension and period filters. Repeat a flag to accept several values.
#[derive(Args, Clone, Debug, Default)]
pub struct FilterArgs {
    #[arg(long = "indicator", help = "Keep rows with this indicator (repeatable)")]
    pub indicators: Vec<String>,

    #[arg(long = "category", help = "Keep rows with this category (repeatable)")]
    pub categories: Vec<String>,

    #[arg(long = "country", help = "Keep rows for this country (repeatable)")]
    pub countries: Vec<String>,

    #[arg(long = "notes", help = "Keep rows with these notes/units (repeatable)")]
    pub notes: Vec<String>,

    #[arg(long = "source", help = "Keep rows from this source (repeatable)")]
    pub sources: Vec<String>,

    /// Year (expands to every period of that year) or exact period name
    #[arg(long = "period", visible_alias = "year")]
    pub periods: Vec<String>,
}

impl FilterArgs {
    pub fn selection(&self) -> Selection {
        Selection::new()
            .with_values(Dimension::Indicator, &self.indicators)
            .with_values(Dimension::Category, &self.categories)
            .with_values(Dimension::Country, &self.countries)
            .with_values(Dimension::Notes, &self.notes)
            .with_values(Dimension::Source, &self.sources)
            .with_periods(&self.periods)
    }
}

#[derive(clap::ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
}

#[derive(Args)]
pub struct ShowCommand {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Page to show (1-based, clamped into range)
    #[arg(short, long, default_value = "1")]
    pub page: usize,

    /// Rows per page (overrides the config file)
    #[arg(long)]
    pub rows_per_page: Option<usize>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table", help = "Output format: table, json, or csv")]
    pub format: OutputFormat,
}

#[derive(Serialize)]
struct PageReport<'a> {
    timeframe: Timeframe,
    location: &'a str,
    columns: &'a [String],
    window: PageWindow,
    rows: Vec<RowReport>,
}

#[derive(Serialize)]
struct RowReport {
    dimensions: BTreeMap<&'static str, String>,
    values: BTreeMap<String, PeriodValue>,
}

fn page_report<'a>(view: &'a FilterView<'_>, dataset: &'a Dataset, window: PageWindow) -> PageReport<'a> {
    let rows = window
        .slice(&view.rows)
        .iter()
        .map(|record| RowReport {
            dimensions: Dimension::ALL
                .iter()
                .map(|d| (d.label(), dataset.dimension_value(record, *d).to_string()))
                .collect(),
            values: view
                .display_columns
                .iter()
                .map(|column| (column.clone(), record.period(column)))
                .collect(),
        })
        .collect();

    PageReport {
        timeframe: dataset.timeframe,
        location: &dataset.location,
        columns: &view.display_columns,
        window,
        rows,
    }
}

impl ShowCommand {
    pub async fn execute(self) -> Result<()> {
        let explorer = self.data.explorer()?;
        let dataset = self.data.load(&explorer, self.data.timeframe).await?;
        let config = explorer.config();

        let rows_per_page = resolve_rows_per_page(self.rows_per_page, config)?;
        let selection = self.filters.selection();
        if selection.is_unconstrained() {
            debug!("No filters given, showing every row and period");
        }
        let view = filter(&dataset, &selection);
        let window = Pager::new(rows_per_page).at_page(self.page).window(view.total());
        info!("🔍 {} of {} rows match", view.total(), dataset.len());

        match self.format {
            OutputFormat::Table => {
                println!("{}", render_table(&view, &dataset, &window, &config.cell_style()));
            }
            OutputFormat::Json => {
                let report = page_report(&view, &dataset, window);
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Csv => {
                // the whole view, not just one page
                print!("{}", export_csv(&view, &dataset, &config.missing_placeholder)?);
            }
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ChartCommand {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    #[arg(long, help = "Chart width in columns (defaults to terminal size)")]
    pub width: Option<usize>,

    #[arg(long, help = "Chart height in rows (defaults to terminal size)")]
    pub height: Option<usize>,
}

impl ChartCommand {
    pub async fn execute(self) -> Result<()> {
        let explorer = self.data.explorer()?;
        let dataset = self.data.load(&explorer, self.data.timeframe).await?;
        let view = filter(&dataset, &self.filters.selection());

        // --indicator/--country narrow the view; the first remaining row is charted
        let Some((indicator, country)) = first_pair(&view, &dataset) else {
            println!("📭 Nothing to chart: no rows match the current selection");
            return Ok(());
        };

        let Some(series) = ChartSeries::from_view(&view, &dataset, &indicator, &country) else {
            println!("📭 No row for {} / {} in the current selection", indicator, country);
            return Ok(());
        };

        let plotter = TimeSeriesPlotter::new();
        let (auto_width, auto_height) = plotter.get_optimal_dimensions();
        let width = self.width.unwrap_or(auto_width);
        let height = self.height.unwrap_or(auto_height);
        println!("{}", plotter.plot_series(&series, Some(width), Some(height)));
        Ok(())
    }
}

#[derive(Args)]
pub struct ExportCommand {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub filters: FilterArgs,

    /// Output file (defaults to <export_prefix>_<timeframe>_data.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

impl ExportCommand {
    pub async fn execute(self) -> Result<()> {
        let explorer = self.data.explorer()?;
        let dataset = self.data.load(&explorer, self.data.timeframe).await?;
        let config = explorer.config();
        let view = filter(&dataset, &self.filters.selection());

        let output = self
            .output
            .unwrap_or_else(|| PathBuf::from(export_file_name(&config.export_prefix, dataset.timeframe)));
        let rows = write_export(&output, &view, &dataset, &config.missing_placeholder)?;

        println!("💾 Exported {} rows × {} periods to {}", rows, view.display_columns.len(), output.display());
        Ok(())
    }
}

#[derive(Args)]
pub struct FacetsCommand {
    #[command(flatten)]
    pub data: DataArgs,

    /// Only list this dimension
    #[arg(short, long, value_enum)]
    pub dimension: Option<Dimension>,

    /// Narrow each list to values matching this text
    #[arg(short, long)]
    pub search: Option<String>,

    /// Use fuzzy matching for --search (overrides the config file)
    #[arg(long)]
    pub fuzzy: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

impl FacetsCommand {
    pub async fn execute(self) -> Result<()> {
        let explorer = self.data.explorer()?;
        let dataset = self.data.load(&explorer, self.data.timeframe).await?;

        let mode = if self.fuzzy { MatchMode::Fuzzy } else { explorer.config().facet_match };
        let search = FacetSearch::new(mode);
        let query = self.search.as_deref().unwrap_or("");

        let facets = Facets::from_dataset(&dataset);
        let dimensions: Vec<Dimension> = match self.dimension {
            Some(dimension) => vec![dimension],
            None => Dimension::ALL.to_vec(),
        };
        let lists: BTreeMap<Dimension, Vec<String>> = dimensions
            .iter()
            .map(|d| (*d, search.matching_values(facets.values_for(*d), query)))
            .collect();

        match self.format {
            OutputFormat::Json => {
                #[derive(Serialize)]
                struct FacetReport<'a> {
                    values: &'a BTreeMap<Dimension, Vec<String>>,
                    years: &'a [String],
                }
                let report = FacetReport {
                    values: &lists,
                    years: &facets.years,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            }
            OutputFormat::Csv => print!("{}", facets_csv(&lists)?),
            OutputFormat::Table => {
                println!("\n📚 Facets for {} ({} rows)", dataset.location, dataset.len());
                for (dimension, values) in &lists {
                    println!("\n{} ({})", dimension, values.len());
                    for value in values {
                        println!("   • {}", value);
                    }
                }
                if self.dimension.is_none() {
                    println!("\n📅 Years: {}", facets.years.join(", "));
                }
            }
        }
        Ok(())
    }
}

/// `dimension,value` lines, one per facet value.
fn facets_csv(lists: &BTreeMap<Dimension, Vec<String>>) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(Vec::new());

    writer.write_record(["dimension", "value"])?;
    for (dimension, values) in lists {
        for value in values {
            writer.write_record([dimension.label(), value.as_str()])?;
        }
    }

    let bytes = writer.into_inner().map_err(|e| anyhow::anyhow!("CSV flush failed: {}", e.error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[derive(Args)]
pub struct InspectCommand {
    #[command(flatten)]
    pub data: DataArgs,
}

impl InspectCommand {
    pub async fn execute(self) -> Result<()> {
        let explorer = self.data.explorer()?;
        let dataset = self.data.load(&explorer, self.data.timeframe).await?;

        println!("\n🗂️  {}", dataset.location);
        println!("⏰ Loaded at: {}", dataset.loaded_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("📅 Timeframe: {}", dataset.timeframe);
        println!("📊 Rows: {}", dataset.len());

        println!("\n🏷️  Dimension columns ({}):", dataset.dimension_columns.len());
        for line in layout_lines(&dataset) {
            println!("   {}", line);
        }

        let periods = &dataset.period_columns;
        match (periods.first(), periods.last()) {
            (Some(first), Some(last)) => {
                println!("\n📈 Period columns: {} ({} ── {})", periods.len(), first, last)
            }
            _ => println!("\n📈 Period columns: none"),
        }

        print_stats(&dataset.stats);
        Ok(())
    }
}

fn layout_lines(dataset: &Dataset) -> Vec<String> {
    Dimension::ALL
        .iter()
        .map(|dimension| match dataset.layout.column_index(*dimension) {
            Some(idx) => {
                let how = if dataset.layout.is_named(*dimension, &dataset.dimension_columns) {
                    "by name"
                } else {
                    "by position"
                };
                format!(
                    "{:<10} ← column {} \"{}\" ({})",
                    dimension.label(),
                    idx + 1,
                    dataset.dimension_columns[idx],
                    how
                )
            }
            None => format!("{:<10} ← not present", dimension.label()),
        })
        .collect()
}

fn print_stats(stats: &IngestStats) {
    println!("\n🧹 Parse report:");
    println!("   Short rows padded:      {}", stats.padded_rows);
    println!("   Long rows truncated:    {}", stats.truncated_rows);
    println!("   Blank lines skipped:    {}", stats.skipped_blank_lines);
    println!("   Unparsable cells:       {}", stats.unparsable_cells);
    println!("   Blank headers ignored:  {}", stats.ignored_header_cells);
}
