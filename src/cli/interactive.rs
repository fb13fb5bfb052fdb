use anyhow::Result;
use clap::Args;
use inquire::{InquireError, MultiSelect, Select, Text};
use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

use super::commands::DataArgs;
use crate::dataset::{Dataset, Dimension};
use crate::explorer::Explorer;
use crate::export::{export_file_name, write_export};
use crate::filter::{filter, Facets, Selection};
use crate::pagination::{PageWindow, Pager};
use crate::plotting::{chart_choices, countries_for, ChartSeries, TimeSeriesPlotter};
use crate::render::render_table;
use crate::search::FacetSearch;
use crate::timeframe::Timeframe;

/// Dimensions offered in the filter step, in prompt order.
const FILTER_DIMENSIONS: [Dimension; 2] = [Dimension::Indicator, Dimension::Country];
const PROMPT_PAGE_SIZE: usize = 15;

#[derive(Args)]
pub struct InteractiveCommand {
    #[command(flatten)]
    pub data: DataArgs,
}

impl InteractiveCommand {
    pub async fn execute(self) -> Result<()> {
        info!("🖥️  Starting interactive explorer");
        let Some(mut session) = Session::start(self.data).await? else {
            return Ok(());
        };
        session.run().await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    NextPage,
    PreviousPage,
    Chart,
    ChangeFilters,
    Export,
    SwitchTimeframe,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Action::NextPage => "▶  Next page",
            Action::PreviousPage => "◀  Previous page",
            Action::Chart => "📊 Chart a series",
            Action::ChangeFilters => "🔍 Change filters",
            Action::Export => "💾 Export to CSV",
            Action::SwitchTimeframe => "📅 Switch timeframe",
            Action::Quit => "🚪 Quit",
        };
        f.write_str(label)
    }
}

/// Actions that make sense for the page currently on screen.
fn available_actions(window: &PageWindow) -> Vec<Action> {
    let mut actions = Vec::new();
    if window.has_next() {
        actions.push(Action::NextPage);
    }
    if window.has_previous() {
        actions.push(Action::PreviousPage);
    }
    if window.total_rows > 0 {
        actions.push(Action::Chart);
    }
    actions.push(Action::ChangeFilters);
    if window.total_rows > 0 {
        actions.push(Action::Export);
    }
    actions.push(Action::SwitchTimeframe);
    actions.push(Action::Quit);
    actions
}

fn cancelled(err: &InquireError) -> bool {
    matches!(
        err,
        InquireError::OperationCanceled | InquireError::OperationInterrupted
    )
}

/// Replace the accepted values of one dimension.
fn replace_values(selection: &mut Selection, dimension: Dimension, values: Vec<String>) {
    let values: BTreeSet<String> = values.into_iter().filter(|v| !v.trim().is_empty()).collect();
    selection.dimension_filters.insert(dimension, values);
}

/// Indices of `options` that are already selected, for pre-checking a prompt.
fn selected_indices(options: &[String], selected: Option<&BTreeSet<String>>) -> Vec<usize> {
    let Some(selected) = selected else {
        return Vec::new();
    };
    options
        .iter()
        .enumerate()
        .filter(|(_, option)| selected.contains(*option))
        .map(|(idx, _)| idx)
        .collect()
}

/// Prompt-driven browsing session over one loaded table at a time.
struct Session {
    data: DataArgs,
    explorer: Explorer,
    dataset: Arc<Dataset>,
    selection: Selection,
    pager: Pager,
}

impl Session {
    /// Ask for a timeframe and load it. `None` when the user backs out.
    async fn start(data: DataArgs) -> Result<Option<Self>> {
        let explorer = data.explorer()?;
        let Some(timeframe) = prompt_timeframe(data.timeframe)? else {
            return Ok(None);
        };
        let dataset = data.load(&explorer, timeframe).await?;
        let pager = Pager::new(explorer.config().rows_per_page);

        let mut session = Self {
            data,
            explorer,
            dataset,
            selection: Selection::new(),
            pager,
        };
        session.choose_filters()?;
        Ok(Some(session))
    }

    async fn run(&mut self) -> Result<()> {
        loop {
            let dataset = Arc::clone(&self.dataset);
            let view = filter(&dataset, &self.selection);
            let window = self.pager.window(view.total());
            let style = self.explorer.config().cell_style();

            println!("\n📅 {} │ {}", dataset.timeframe, dataset.location);
            println!("{}", render_table(&view, &dataset, &window, &style));

            let action = match Select::new("What next?", available_actions(&window))
                .with_page_size(PROMPT_PAGE_SIZE)
                .prompt()
            {
                Ok(action) => action,
                Err(e) if cancelled(&e) => Action::Quit,
                Err(e) => return Err(e.into()),
            };
            debug!("Action: {:?}", action);

            match action {
                Action::NextPage => self.pager.next(view.total()),
                Action::PreviousPage => self.pager.previous(view.total()),
                Action::Chart => {
                    let (indicators, _) = chart_choices(&view, &dataset);
                    if indicators.is_empty() {
                        println!("📭 Rows in this view have no indicator to chart");
                        continue;
                    }
                    let Some(indicator) = skippable(Select::new("Indicator to chart:", indicators).prompt())? else {
                        continue;
                    };
                    let countries = countries_for(&view, &dataset, &indicator);
                    if countries.is_empty() {
                        println!("📭 No country has a row for {} in this view", indicator);
                        continue;
                    }
                    let Some(country) = skippable(Select::new("Country:", countries).prompt())? else {
                        continue;
                    };
                    match ChartSeries::from_view(&view, &dataset, &indicator, &country) {
                        Some(series) => {
                            let plotter = TimeSeriesPlotter::new();
                            let (width, height) = plotter.get_optimal_dimensions();
                            println!("\n{}", plotter.plot_series(&series, Some(width), Some(height)));
                        }
                        None => println!("📭 No row for {} / {} in the current selection", indicator, country),
                    }
                }
                Action::ChangeFilters => self.choose_filters()?,
                Action::Export => {
                    let config = self.explorer.config();
                    let default_name = export_file_name(&config.export_prefix, dataset.timeframe);
                    let Some(path) = skippable(
                        Text::new("Export to:").with_default(&default_name).prompt(),
                    )?
                    else {
                        continue;
                    };
                    match write_export(&PathBuf::from(path.trim()), &view, &dataset, &config.missing_placeholder) {
                        Ok(rows) => println!("💾 Exported {} rows to {}", rows, path.trim()),
                        Err(e) => println!("❌ Export failed: {}", e),
                    }
                }
                Action::SwitchTimeframe => {
                    let Some(timeframe) = prompt_timeframe(dataset.timeframe)? else {
                        continue;
                    };
                    self.switch_timeframe(timeframe).await?;
                }
                Action::Quit => {
                    println!("👋 Bye");
                    return Ok(());
                }
            }
        }
    }

    /// Load `timeframe`; on success the selection and page start over, on failure the
    /// current table stays.
    async fn switch_timeframe(&mut self, timeframe: Timeframe) -> Result<()> {
        if timeframe == self.dataset.timeframe {
            return Ok(());
        }
        match self.data.load(&self.explorer, timeframe).await {
            Ok(dataset) => {
                self.dataset = dataset;
                self.selection = Selection::new();
                self.pager.reset();
                self.choose_filters()?;
            }
            Err(e) => println!("❌ Could not load {} data: {:#}", timeframe, e),
        }
        Ok(())
    }

    /// Walk through indicator, country and year choices. Esc keeps a choice unchanged.
    fn choose_filters(&mut self) -> Result<()> {
        let facets = Facets::from_dataset(&self.dataset);
        let search = FacetSearch::new(self.explorer.config().facet_match);

        for dimension in FILTER_DIMENSIONS {
            let all = facets.values_for(dimension);
            if all.is_empty() {
                continue;
            }

            let query = skippable(
                Text::new(&format!("Search {} ({} values, blank for all):", dimension, all.len()))
                    .prompt(),
            )?
            .unwrap_or_default();
            let options = search.matching_values(all, &query);
            if options.is_empty() {
                println!("🔍 No {} matches '{}'", dimension.label().to_lowercase(), query);
                continue;
            }

            let defaults = selected_indices(&options, self.selection.dimension_filters.get(&dimension));
            let message = format!("{} (none = all):", dimension);
            let chosen = skippable(
                MultiSelect::new(&message, options)
                    .with_default(&defaults)
                    .with_page_size(PROMPT_PAGE_SIZE)
                    .with_help_message("space to toggle, → all, ← none, type to narrow, esc to keep")
                    .prompt_skippable(),
            )?
            .flatten();
            if let Some(values) = chosen {
                replace_values(&mut self.selection, dimension, values);
            }
        }

        if !facets.years.is_empty() {
            let defaults = selected_indices(&facets.years, Some(&self.selection.periods));
            let chosen = skippable(
                MultiSelect::new("Years (none = all periods):", facets.years.clone())
                    .with_default(&defaults)
                    .with_page_size(PROMPT_PAGE_SIZE)
                    .prompt_skippable(),
            )?
            .flatten();
            if let Some(years) = chosen {
                self.selection.periods = years.into_iter().collect();
            }
        }

        self.pager.reset();
        Ok(())
    }
}

fn prompt_timeframe(current: Timeframe) -> Result<Option<Timeframe>> {
    let start = Timeframe::ALL.iter().position(|t| *t == current).unwrap_or(0);
    skippable(
        Select::new("Timeframe:", Timeframe::ALL.to_vec())
            .with_starting_cursor(start)
            .prompt(),
    )
}

/// Treat Esc or Ctrl-C as "no answer" instead of an error.
fn skippable<T>(answer: inquire::error::InquireResult<T>) -> Result<Option<T>> {
    match answer {
        Ok(value) => Ok(Some(value)),
        Err(e) if cancelled(&e) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(page: usize, total_rows: usize) -> PageWindow {
        Pager::new(10).at_page(page).window(total_rows)
    }

    #[test]
    fn test_actions_follow_page_position() {
        let first = available_actions(&window(1, 25));
        assert_eq!(first[0], Action::NextPage);
        assert!(!first.contains(&Action::PreviousPage));

        let last = available_actions(&window(3, 25));
        assert!(!last.contains(&Action::NextPage));
        assert!(last.contains(&Action::PreviousPage));
        assert_eq!(last.last(), Some(&Action::Quit));
    }

    #[test]
    fn test_empty_view_offers_no_chart_or_export() {
        let actions = available_actions(&window(1, 0));
        assert_eq!(
            actions,
            vec![Action::ChangeFilters, Action::SwitchTimeframe, Action::Quit]
        );
    }

    #[test]
    fn test_replace_values_drops_blanks() {
        let mut selection = Selection::new().with_values(Dimension::Country, ["A", "B"]);
        replace_values(
            &mut selection,
            Dimension::Country,
            vec!["C".to_string(), "".to_string()],
        );
        let countries: Vec<&String> = selection.dimension_filters[&Dimension::Country].iter().collect();
        assert_eq!(countries, vec!["C"]);
    }

    #[test]
    fn test_selected_indices() {
        let options = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let selected: BTreeSet<String> = ["C", "A", "Z"].iter().map(|s| s.to_string()).collect();
        assert_eq!(selected_indices(&options, Some(&selected)), vec![0, 2]);
        assert!(selected_indices(&options, None).is_empty());
    }

    #[test]
    fn test_cancel_is_not_an_error() {
        let answer: inquire::error::InquireResult<u8> = Err(InquireError::OperationCanceled);
        assert_eq!(skippable(answer).unwrap(), None);
        assert_eq!(skippable(Ok(3u8)).unwrap(), Some(3));
    }
}
