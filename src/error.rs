//! Error types.
//!
//! - `AppError` is what the binary reports: an exit code plus a message.
//! - `BlendError` is the pipeline's taxonomy, one variant per failure class.
//! - `PipelineError` tags a `BlendError` with the stage that produced it.

use serde::Serialize;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Structured failure body: `{"error": "<message>"}`.
    pub fn to_payload_json(&self) -> String {
        let payload = ErrorPayload {
            error: self.message.clone(),
        };
        serde_json::to_string(&payload).unwrap_or_else(|_| format!("{{\"error\":{:?}}}", self.message))
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorPayload {
    pub error: String,
}

/// Pipeline stage that produced an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Request,
    Fetch,
    TemporalFilter,
    Overrides,
    Fallback,
}

impl Stage {
    pub fn label(self) -> &'static str {
        match self {
            Stage::Request => "request",
            Stage::Fetch => "fetch",
            Stage::TemporalFilter => "temporal-filter",
            Stage::Overrides => "overrides",
            Stage::Fallback => "fallback",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlendError {
    /// Network, HTTP status, or payload parse failure while fetching a dataset.
    Retrieval { url: String, reason: String },
    /// The timestamp column is absent, or (strict mode) a value is unparsable.
    MalformedTimestamp { detail: String },
    /// An override hit a non-numeric cell.
    TypeMismatch {
        entity: String,
        category: String,
        line: usize,
        value: String,
    },
    /// An override produced an infinite or NaN value.
    NonFiniteResult {
        entity: String,
        category: String,
        line: usize,
        value: String,
        multiplier: f64,
    },
    /// Primary and fallback tables disagree on the number of rows for a category.
    FallbackAlignment {
        category: String,
        scenario: String,
        primary_rows: usize,
        fallback_rows: usize,
    },
    FallbackCategoryNotFound { category: String, scenario: String },
    FallbackColumnMissing {
        category: String,
        scenario: String,
        column: String,
    },
    MissingColumn { column: String },
    InvalidRequest(String),
}

impl BlendError {
    /// Short machine-friendly name of the failure class.
    pub fn kind(&self) -> &'static str {
        match self {
            BlendError::Retrieval { .. } => "retrieval",
            BlendError::MalformedTimestamp { .. } => "malformed-timestamp",
            BlendError::TypeMismatch { .. } => "type-mismatch",
            BlendError::NonFiniteResult { .. } => "non-finite-result",
            BlendError::FallbackAlignment { .. } => "fallback-alignment",
            BlendError::FallbackCategoryNotFound { .. } => "fallback-category-not-found",
            BlendError::FallbackColumnMissing { .. } => "fallback-column-missing",
            BlendError::MissingColumn { .. } => "missing-column",
            BlendError::InvalidRequest(_) => "invalid-request",
        }
    }

    fn exit_code(&self) -> u8 {
        match self {
            BlendError::Retrieval { .. } => 4,
            BlendError::InvalidRequest(_) => 2,
            _ => 3,
        }
    }
}

impl std::fmt::Display for BlendError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BlendError::Retrieval { url, reason } => {
                write!(f, "failed to retrieve '{url}': {reason}")
            }
            BlendError::MalformedTimestamp { detail } => {
                write!(f, "malformed `weather_datetime`: {detail}")
            }
            BlendError::TypeMismatch {
                entity,
                category,
                line,
                value,
            } => write!(
                f,
                "cannot scale non-numeric value '{value}' in column `{entity}` (subsector '{category}', line {line})"
            ),
            BlendError::NonFiniteResult {
                entity,
                category,
                line,
                value,
                multiplier,
            } => write!(
                f,
                "scaling '{value}' by {multiplier} in column `{entity}` (subsector '{category}', line {line}) is not finite"
            ),
            BlendError::FallbackAlignment {
                category,
                scenario,
                primary_rows,
                fallback_rows,
            } => write!(
                f,
                "subsector '{category}' has {primary_rows} rows but fallback scenario '{scenario}' has {fallback_rows}"
            ),
            BlendError::FallbackCategoryNotFound { category, scenario } => write!(
                f,
                "fallback scenario '{scenario}' has no rows for subsector '{category}'"
            ),
            BlendError::FallbackColumnMissing {
                category,
                scenario,
                column,
            } => write!(
                f,
                "fallback scenario '{scenario}' lacks column `{column}` needed for subsector '{category}'"
            ),
            BlendError::MissingColumn { column } => write!(f, "missing required column `{column}`"),
            BlendError::InvalidRequest(msg) => write!(f, "invalid request: {msg}"),
        }
    }
}

impl std::error::Error for BlendError {}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineError {
    pub stage: Stage,
    pub error: BlendError,
}

impl PipelineError {
    pub fn new(stage: Stage, error: BlendError) -> Self {
        Self { stage, error }
    }
}

impl std::fmt::Display for PipelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.stage, self.error)
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.error.exit_code(), err.to_string())
    }
}

impl From<BlendError> for AppError {
    fn from(err: BlendError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_error_names_stage_and_context() {
        let err = PipelineError::new(
            Stage::Fallback,
            BlendError::FallbackCategoryNotFound {
                category: "industrial".to_string(),
                scenario: "baseline".to_string(),
            },
        );
        let msg = err.to_string();
        assert!(msg.starts_with("[fallback]"));
        assert!(msg.contains("industrial"));
        assert!(msg.contains("baseline"));
    }

    #[test]
    fn exit_codes_follow_failure_class() {
        let retrieval: AppError = PipelineError::new(
            Stage::Fetch,
            BlendError::Retrieval {
                url: "https://x/2030_a.csv".to_string(),
                reason: "status 404".to_string(),
            },
        )
        .into();
        assert_eq!(retrieval.exit_code(), 4);

        let bad_request: AppError = BlendError::InvalidRequest("empty scenario".to_string()).into();
        assert_eq!(bad_request.exit_code(), 2);

        let shape: AppError = BlendError::MissingColumn {
            column: "subsector".to_string(),
        }
        .into();
        assert_eq!(shape.exit_code(), 3);
    }

    #[test]
    fn payload_is_error_object() {
        let err = AppError::new(4, "boom \"quoted\"");
        let value: serde_json::Value = serde_json::from_str(&err.to_payload_json()).unwrap();
        assert_eq!(value["error"], "boom \"quoted\"");
    }
}
