use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrafficError {
    #[error("Network error: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Invalid URL: {0}")]
    Url(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Unparseable timestamp: '{value}'")]
    Timestamp { value: String },
    #[error("Missing field: {0}")]
    MissingField(&'static str),
    #[error("No usable trip rows ({skipped} skipped)")]
    NoUsableRows { skipped: usize },
    #[error("Filter value {0} outside [-1, 1439]")]
    InvalidFilter(i32),
    #[error("Datasets not loaded yet")]
    NotReady,
    #[error("Dataset load failed: {0}")]
    LoadFailed(String),
}

pub type Result<T> = std::result::Result<T, TrafficError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_timestamp() {
        let err = TrafficError::Timestamp {
            value: "yesterday".into(),
        };
        assert_eq!(err.to_string(), "Unparseable timestamp: 'yesterday'");
    }

    #[test]
    fn test_display_invalid_filter() {
        assert_eq!(
            TrafficError::InvalidFilter(1440).to_string(),
            "Filter value 1440 outside [-1, 1439]"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TrafficError = io_err.into();
        assert!(matches!(err, TrafficError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_json_error() {
        let result: std::result::Result<serde_json::Value, _> = serde_json::from_str("{nope");
        let err: TrafficError = result.unwrap_err().into();
        assert!(matches!(err, TrafficError::Json(_)));
    }
}
