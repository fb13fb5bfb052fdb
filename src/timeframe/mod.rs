use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static ANNUAL_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{4}$").expect("valid regex"));
static QUARTERLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}Q[1-4]$").expect("valid regex"));
static MONTHLY_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}$").expect("valid regex"));

/// Period granularity of a dataset.
///
/// The timeframe decides which header names count as period columns and how a bare
/// year selected by the user maps onto concrete columns.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[default]
    Annual,
    Quarterly,
    Monthly,
}

impl Timeframe {
    pub const ALL: [Timeframe; 3] = [Timeframe::Annual, Timeframe::Quarterly, Timeframe::Monthly];

    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::Annual => "annual",
            Timeframe::Quarterly => "quarterly",
            Timeframe::Monthly => "monthly",
        }
    }

    /// Pattern recognising period-column names of this timeframe
    pub fn pattern(&self) -> &'static Regex {
        match self {
            Timeframe::Annual => &ANNUAL_PATTERN,
            Timeframe::Quarterly => &QUARTERLY_PATTERN,
            Timeframe::Monthly => &MONTHLY_PATTERN,
        }
    }

    pub fn is_period_column(&self, header: &str) -> bool {
        self.pattern().is_match(header)
    }

    /// Expand a bare year into every period column it owns under this timeframe.
    pub fn expand_year(&self, year: &str) -> Vec<String> {
        match self {
            Timeframe::Annual => vec![year.to_string()],
            Timeframe::Quarterly => (1..=4).map(|q| format!("{}Q{}", year, q)).collect(),
            Timeframe::Monthly => (1..=12).map(|m| format!("{}-{:02}", year, m)).collect(),
        }
    }

    /// Expand a user-supplied period token.
    ///
    /// A bare year expands through [`Timeframe::expand_year`]; a token that already names
    /// a period of this timeframe stands for itself; anything else selects nothing.
    pub fn expand_token(&self, token: &str) -> Vec<String> {
        let token = token.trim();
        if self.is_period_column(token) {
            vec![token.to_string()]
        } else if ANNUAL_PATTERN.is_match(token) {
            self.expand_year(token)
        } else {
            Vec::new()
        }
    }

    /// Year prefix of a period column name, if it has one.
    pub fn year_of(column: &str) -> Option<&str> {
        let prefix = column.get(..4)?;
        prefix.chars().all(|c| c.is_ascii_digit()).then_some(prefix)
    }

    /// File name holding this timeframe's table for a data source, e.g. `all-annual-data.csv`.
    pub fn file_name(&self, data_source: &str) -> String {
        format!("{}-{}-data.csv", data_source, self.as_str())
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "annual" => Ok(Timeframe::Annual),
            "quarterly" => Ok(Timeframe::Quarterly),
            "monthly" => Ok(Timeframe::Monthly),
            other => Err(format!(
                "unknown timeframe '{}' (expected annual, quarterly or monthly)",
                other
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_patterns() {
        assert!(Timeframe::Annual.is_period_column("2023"));
        assert!(!Timeframe::Annual.is_period_column("2023Q1"));
        assert!(Timeframe::Quarterly.is_period_column("2023Q4"));
        assert!(!Timeframe::Quarterly.is_period_column("2023Q5"));
        assert!(Timeframe::Monthly.is_period_column("2023-07"));
        assert!(!Timeframe::Monthly.is_period_column("Indicator"));
    }

    #[test]
    fn test_expand_year() {
        assert_eq!(Timeframe::Annual.expand_year("2020"), vec!["2020"]);
        assert_eq!(
            Timeframe::Quarterly.expand_year("2020"),
            vec!["2020Q1", "2020Q2", "2020Q3", "2020Q4"]
        );
        let months = Timeframe::Monthly.expand_year("2020");
        assert_eq!(months.len(), 12);
        assert_eq!(months.first().map(String::as_str), Some("2020-01"));
        assert_eq!(months.last().map(String::as_str), Some("2020-12"));
    }

    #[test]
    fn test_expand_token() {
        assert_eq!(Timeframe::Quarterly.expand_token("2021Q3"), vec!["2021Q3"]);
        assert_eq!(Timeframe::Quarterly.expand_token(" 2021 ").len(), 4);
        assert!(Timeframe::Monthly.expand_token("2021Q3").is_empty());
        assert!(Timeframe::Annual.expand_token("latest").is_empty());
    }

    #[test]
    fn test_year_of_and_file_name() {
        assert_eq!(Timeframe::year_of("2019-03"), Some("2019"));
        assert_eq!(Timeframe::year_of("2019Q2"), Some("2019"));
        assert_eq!(Timeframe::year_of("Notes"), None);
        assert_eq!(Timeframe::Monthly.file_name("all"), "all-monthly-data.csv");
        assert_eq!("Quarterly".parse::<Timeframe>(), Ok(Timeframe::Quarterly));
        assert!("weekly".parse::<Timeframe>().is_err());
    }
}
