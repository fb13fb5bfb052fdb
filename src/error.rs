use thiserror::Error;

/// Errors raised while loading, parsing or exporting indicator tables.
///
/// A selection that matches no rows is not an error: the filter engine returns an
/// empty view and the caller decides how to present it.
#[derive(Debug, Error)]
pub enum ExplorerError {
    /// Network or filesystem failure while retrieving a data file.
    #[error("failed to fetch {location}: {reason}")]
    Fetch { location: String, reason: String },

    /// The server answered with a non-success status.
    #[error("HTTP error {status} while fetching {location}")]
    HttpStatus { location: String, status: u16 },

    /// Unrecoverable structural problem in the CSV text.
    #[error("failed to parse {location}: {reason}")]
    Parse { location: String, reason: String },

    /// The same header name appears more than once.
    #[error("duplicate column '{column}' in {location}")]
    DuplicateColumn { location: String, column: String },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The CSV writer failed while serializing a view.
    #[error("export failed: {0}")]
    Export(String),

    /// Export was requested for a view with no rows.
    #[error("no data to export; adjust the filters first")]
    EmptyExport,
}

impl ExplorerError {
    /// True for failures that happened before any text was parsed.
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::HttpStatus { .. })
    }
}

pub type Result<T> = std::result::Result<T, ExplorerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ExplorerError::HttpStatus {
            location: "data/all-annual-data.csv".to_string(),
            status: 404,
        };
        assert_eq!(
            err.to_string(),
            "HTTP error 404 while fetching data/all-annual-data.csv"
        );
        assert!(err.is_fetch());
    }

    #[test]
    fn test_parse_error_is_not_fetch() {
        let err = ExplorerError::Parse {
            location: "inline".to_string(),
            reason: "no header line".to_string(),
        };
        assert!(!err.is_fetch());
        assert!(err.to_string().contains("no header line"));
    }

    #[test]
    fn test_export_error_names_the_export() {
        let err = ExplorerError::Export("buffer flush failed".to_string());
        assert_eq!(err.to_string(), "export failed: buffer flush failed");
        assert!(!err.is_fetch());
    }
}
