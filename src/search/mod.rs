use fuzzy_matcher::{skim::SkimMatcherV2, FuzzyMatcher};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// How a typed query narrows a facet list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Case-insensitive substring; keeps the list order.
    #[default]
    Contains,
    /// Skim-style fuzzy match; best score first.
    Fuzzy,
}

#[derive(Debug, Clone, Serialize)]
pub struct FacetMatch {
    pub value: String,
    pub score: Option<i64>,
}

pub struct FacetSearch {
    mode: MatchMode,
    fuzzy_matcher: SkimMatcherV2,
}

impl FacetSearch {
    pub fn new(mode: MatchMode) -> Self {
        Self {
            mode,
            fuzzy_matcher: SkimMatcherV2::default().ignore_case(),
        }
    }

    /// Values matching `query`. An empty query keeps every value in its original order.
    pub fn search(&self, values: &[String], query: &str) -> Vec<FacetMatch> {
        let query = query.trim();
        if query.is_empty() {
            return values
                .iter()
                .map(|value| FacetMatch {
                    value: value.clone(),
                    score: None,
                })
                .collect();
        }

        let matches = match self.mode {
            MatchMode::Contains => {
                let needle = query.to_lowercase();
                values
                    .iter()
                    .filter(|value| value.to_lowercase().contains(&needle))
                    .map(|value| FacetMatch {
                        value: value.clone(),
                        score: None,
                    })
                    .collect()
            }
            MatchMode::Fuzzy => {
                let mut scored: Vec<FacetMatch> = values
                    .iter()
                    .filter_map(|value| {
                        self.fuzzy_matcher
                            .fuzzy_match(value, query)
                            .map(|score| FacetMatch {
                                value: value.clone(),
                                score: Some(score),
                            })
                    })
                    .collect();
                // stable sort keeps list order among equal scores
                scored.sort_by(|a, b| b.score.cmp(&a.score));
                scored
            }
        };

        debug!("Facet search '{}' ({:?}) matched {:?}", query, self.mode, matches);
        matches
    }

    /// Convenience wrapper returning only the matched values.
    pub fn matching_values(&self, values: &[String], query: &str) -> Vec<String> {
        self.search(values, query)
            .into_iter()
            .map(|m| m.value)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn countries() -> Vec<String> {
        ["Canada", "Ghana", "Kenya", "South Africa"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn test_empty_query_keeps_all() {
        let search = FacetSearch::new(MatchMode::Contains);
        assert_eq!(search.matching_values(&countries(), "  "), countries());
    }

    #[test]
    fn test_contains_is_case_insensitive() {
        let search = FacetSearch::new(MatchMode::Contains);
        assert_eq!(
            search.matching_values(&countries(), "ANA"),
            vec!["Canada", "Ghana"]
        );
        assert!(search.matching_values(&countries(), "zz").is_empty());
    }

    #[test]
    fn test_fuzzy_ranks_matches() {
        let search = FacetSearch::new(MatchMode::Fuzzy);
        let results = search.search(&countries(), "sthafr");
        assert_eq!(results.first().map(|m| m.value.as_str()), Some("South Africa"));
        assert!(results.iter().all(|m| m.score.is_some()));
    }
}
