use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::ExplorerConfig;
use crate::dataset::Dataset;
use crate::error::{ExplorerError, Result};
use crate::ingest;
use crate::source::{DataLocation, Fetcher};
use crate::timeframe::Timeframe;

/// Identifies one load request. Later requests carry larger ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct LoadTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied,
    /// A newer request already committed; this result was discarded.
    Stale,
}

#[derive(Default)]
struct DatasetSlot {
    dataset: Option<Arc<Dataset>>,
    committed: u64,
}

/// Owns the current dataset and the loading lifecycle.
///
/// The dataset is swapped as a whole under a lock, so readers see either the previous
/// table or the new one, never a mix. A failed load leaves the previous table in place.
pub struct Explorer {
    config: ExplorerConfig,
    fetcher: Fetcher,
    next_ticket: AtomicU64,
    slot: RwLock<DatasetSlot>,
}

impl Explorer {
    pub fn new(config: ExplorerConfig) -> Result<Self> {
        let fetcher = Fetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;
        Ok(Self {
            config,
            fetcher,
            next_ticket: AtomicU64::new(0),
            slot: RwLock::new(DatasetSlot::default()),
        })
    }

    pub fn config(&self) -> &ExplorerConfig {
        &self.config
    }

    pub fn current(&self) -> Option<Arc<Dataset>> {
        self.slot
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .dataset
            .clone()
    }

    pub fn begin_load(&self) -> LoadTicket {
        LoadTicket(self.next_ticket.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Install `dataset` unless a newer ticket has already been committed.
    pub fn commit(&self, ticket: LoadTicket, dataset: Dataset) -> LoadOutcome {
        let mut slot = self
            .slot
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if ticket.0 <= slot.committed {
            warn!(
                "⏭️  Discarding stale load #{} ({}); #{} is already in place",
                ticket.0, dataset.location, slot.committed
            );
            return LoadOutcome::Stale;
        }

        info!(
            "✅ Loaded {} {} rows from {} (load #{})",
            dataset.len(),
            dataset.timeframe,
            dataset.location,
            ticket.0
        );
        slot.committed = ticket.0;
        slot.dataset = Some(Arc::new(dataset));
        LoadOutcome::Applied
    }

    /// Load the configured file for `timeframe`.
    pub async fn load(&self, timeframe: Timeframe) -> Result<Arc<Dataset>> {
        let location =
            DataLocation::resolve(&self.config.data_root, &self.config.data_source, timeframe)?;
        self.load_from(&location, timeframe).await
    }

    /// Fetch and parse `location`, then commit it.
    ///
    /// Returns the dataset that is current afterwards: the new one, or the newer one
    /// that superseded it while this request was in flight.
    pub async fn load_from(&self, location: &DataLocation, timeframe: Timeframe) -> Result<Arc<Dataset>> {
        let ticket = self.begin_load();
        info!("🔄 Loading {} data from {} (load #{})", timeframe, location, ticket.0);

        let text = self.fetcher.fetch_text(location).await?;
        let dataset = ingest::parse(&text, timeframe, &location.to_string())?;

        self.commit(ticket, dataset);
        self.current().ok_or_else(|| ExplorerError::Parse {
            location: location.to_string(),
            reason: "dataset vanished after commit".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn write_tables(dir: &Path) {
        std::fs::write(
            dir.join("all-annual-data.csv"),
            "Indicator,Category,Country,Notes,Source,2022,2023\nGDP,Economy,A,USD bn,IMF,1,2\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("all-quarterly-data.csv"),
            "Indicator,Category,Country,Notes,Source,2023Q1\nGDP,Economy,A,USD bn,IMF,1\nCPI,Prices,A,%,NSO,2\n",
        )
        .unwrap();
    }

    fn explorer_for(dir: &Path) -> Explorer {
        let config = ExplorerConfig {
            data_root: dir.display().to_string(),
            ..ExplorerConfig::default()
        };
        Explorer::new(config).unwrap()
    }

    fn parsed(text: &str, timeframe: Timeframe) -> Dataset {
        ingest::parse(text, timeframe, "inline").unwrap()
    }

    #[tokio::test]
    async fn test_load_replaces_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        let explorer = explorer_for(dir.path());
        assert!(explorer.current().is_none());

        let annual = explorer.load(Timeframe::Annual).await.unwrap();
        assert_eq!(annual.period_columns, vec!["2022", "2023"]);

        let quarterly = explorer.load(Timeframe::Quarterly).await.unwrap();
        assert_eq!(quarterly.len(), 2);
        assert_eq!(explorer.current().unwrap().timeframe, Timeframe::Quarterly);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_dataset() {
        let dir = tempfile::tempdir().unwrap();
        write_tables(dir.path());
        let explorer = explorer_for(dir.path());
        explorer.load(Timeframe::Annual).await.unwrap();

        let err = explorer.load(Timeframe::Monthly).await.unwrap_err();
        assert!(err.is_fetch());

        std::fs::write(dir.path().join("all-monthly-data.csv"), "").unwrap();
        assert!(explorer.load(Timeframe::Monthly).await.is_err());

        assert_eq!(explorer.current().unwrap().timeframe, Timeframe::Annual);
    }

    #[test]
    fn test_stale_result_never_overwrites_newer() {
        let explorer = Explorer::new(ExplorerConfig::default()).unwrap();
        let first = explorer.begin_load();
        let second = explorer.begin_load();
        assert!(second > first);

        let newer = parsed("Indicator,2023Q1\nGDP,1\n", Timeframe::Quarterly);
        let older = parsed("Indicator,2023\nGDP,1\n", Timeframe::Annual);

        assert_eq!(explorer.commit(second, newer), LoadOutcome::Applied);
        assert_eq!(explorer.commit(first, older), LoadOutcome::Stale);
        assert_eq!(explorer.current().unwrap().timeframe, Timeframe::Quarterly);
    }

    #[test]
    fn test_in_order_commits_apply() {
        let explorer = Explorer::new(ExplorerConfig::default()).unwrap();
        let first = explorer.begin_load();
        let second = explorer.begin_load();
        assert_eq!(
            explorer.commit(first, parsed("Indicator,2023\nGDP,1\n", Timeframe::Annual)),
            LoadOutcome::Applied
        );
        assert_eq!(
            explorer.commit(second, parsed("Indicator,2023-01\nGDP,1\n", Timeframe::Monthly)),
            LoadOutcome::Applied
        );
        assert_eq!(explorer.current().unwrap().timeframe, Timeframe::Monthly);
    }
}
