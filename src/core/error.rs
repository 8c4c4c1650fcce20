// Chart engine error handling
//
// Every failure the engine can report is a ChartError. None of them is
// fatal to the process: the caller decides whether to hide the affected
// indicator/session or surface the message.

use thiserror::Error;

/// Unified error type for the chart engine
#[derive(Error, Debug)]
pub enum ChartError {
    /// A volume profile payload could not be parsed; the session is skipped
    #[error("Malformed volume profile for '{indicator_id}' at {time}: {message}")]
    MalformedProfile {
        indicator_id: String,
        time: i64,
        message: String,
    },

    /// An indicator with the same id is already active
    #[error("Duplicate indicator id: {id}")]
    DuplicateIndicator { id: String },

    /// An existing id was re-submitted with a different indicator type
    #[error("Indicator '{id}' cannot change type from {from} to {to}")]
    TypeChange { id: String, from: String, to: String },

    /// The render surface behind a pane could not be constructed
    #[error("Render surface unavailable for {pane} pane: {message}")]
    SurfaceUnavailable { pane: String, message: String },

    /// Input data broke an invariant (ordering, finiteness, ...)
    #[error("Data validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
        value: Option<String>,
    },

    /// A record time could not be normalized to epoch seconds
    #[error("Cannot parse time value: {raw}")]
    TimeParse { raw: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Result alias used across the crate
pub type ChartResult<T> = Result<T, ChartError>;

impl ChartError {
    pub fn malformed_profile(
        indicator_id: impl Into<String>,
        time: i64,
        message: impl Into<String>,
    ) -> Self {
        ChartError::MalformedProfile {
            indicator_id: indicator_id.into(),
            time,
            message: message.into(),
        }
    }

    pub fn duplicate(id: impl Into<String>) -> Self {
        ChartError::DuplicateIndicator { id: id.into() }
    }

    pub fn surface_unavailable(pane: impl Into<String>, message: impl Into<String>) -> Self {
        ChartError::SurfaceUnavailable {
            pane: pane.into(),
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ChartError::Validation {
            message: message.into(),
            field: None,
            value: None,
        }
    }

    /// Validation error pointing at a specific field and the offending value
    pub fn validation_field(
        message: impl Into<String>,
        field: impl Into<String>,
        value: impl ToString,
    ) -> Self {
        ChartError::Validation {
            message: message.into(),
            field: Some(field.into()),
            value: Some(value.to_string()),
        }
    }

    pub fn time_parse(raw: impl ToString) -> Self {
        ChartError::TimeParse { raw: raw.to_string() }
    }

    /// Whether the failure only degrades a single indicator, session or record.
    ///
    /// Configuration and IO failures happen before the engine runs and are
    /// the only ones a caller may want to treat as startup errors.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ChartError::Config(_) | ChartError::Io(_) | ChartError::Toml(_)
        )
    }

    /// Short category string for log lines
    pub fn category(&self) -> &'static str {
        match self {
            ChartError::MalformedProfile { .. } => "profile",
            ChartError::DuplicateIndicator { .. } | ChartError::TypeChange { .. } => "indicator",
            ChartError::SurfaceUnavailable { .. } => "surface",
            ChartError::Validation { .. } | ChartError::TimeParse { .. } => "data",
            ChartError::Json(_) => "json",
            ChartError::Io(_) | ChartError::Toml(_) | ChartError::Config(_) => "config",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        assert!(ChartError::duplicate("ema_1").is_recoverable());
        assert!(ChartError::malformed_profile("vp", 10, "bad json").is_recoverable());
        assert!(!ChartError::Config("unit height".into()).is_recoverable());
    }

    #[test]
    fn test_error_messages() {
        let err = ChartError::surface_unavailable("secondary", "no canvas");
        assert_eq!(
            err.to_string(),
            "Render surface unavailable for secondary pane: no canvas"
        );
        assert_eq!(err.category(), "surface");

        let err = ChartError::validation_field("time not ascending", "time", 42);
        match err {
            ChartError::Validation { field, value, .. } => {
                assert_eq!(field.as_deref(), Some("time"));
                assert_eq!(value.as_deref(), Some("42"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }
}
