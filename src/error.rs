//! Core error taxonomy.
//!
//! Every failure the pipeline can surface falls into one of a small closed
//! set of categories. The HTTP layer maps each variant to a stable external
//! error code; nothing outside this module needs to inspect provider SDK or
//! database error types.

use thiserror::Error;

use crate::provider::ProviderError;

/// Failures produced by the ingestion and answer pipelines.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The provider client could not be constructed (missing credential,
    /// invalid base URL). Signaled before any network call is made.
    #[error("provider is not configured: {0}")]
    Configuration(String),

    /// A classified provider failure. Transient variants reach here only
    /// after the retry policy has exhausted its attempts.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Chunking produced nothing to ingest (input was empty after trimming).
    #[error("document contains no ingestible text")]
    EmptyDocument,

    /// Model output could not be coerced into the answer schema. Holds a
    /// short reason, never the raw output (that goes to the logs).
    #[error("model output failed validation: {0}")]
    MalformedOutput(String),

    /// The one-shot repair round-trip also failed to produce valid output.
    #[error("repair attempt produced invalid output: {0}")]
    RepairFailed(String),

    /// The persistence layer rejected a write. Not retried; the write is
    /// not assumed idempotent.
    #[error("storage write failed: {0}")]
    Storage(#[from] sqlx::Error),
}

impl PipelineError {
    /// Stable machine-readable code for the external error contract.
    pub fn code(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration_error",
            PipelineError::Provider(ProviderError::Auth(_)) => "provider_auth",
            PipelineError::Provider(e) if e.is_transient() => "provider_unavailable",
            PipelineError::Provider(_) => "provider_error",
            PipelineError::EmptyDocument => "empty_document",
            PipelineError::MalformedOutput(_) => "malformed_output",
            PipelineError::RepairFailed(_) => "repair_failed",
            PipelineError::Storage(_) => "storage_failure",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_category_has_a_distinct_code() {
        let cases = [
            (
                PipelineError::Configuration("key missing".into()),
                "configuration_error",
            ),
            (
                PipelineError::Provider(ProviderError::Auth("401".into())),
                "provider_auth",
            ),
            (
                PipelineError::Provider(ProviderError::RateLimited("429".into())),
                "provider_unavailable",
            ),
            (
                PipelineError::Provider(ProviderError::Connection("reset".into())),
                "provider_unavailable",
            ),
            (
                PipelineError::Provider(ProviderError::Api {
                    status: 500,
                    body: "boom".into(),
                }),
                "provider_error",
            ),
            (PipelineError::EmptyDocument, "empty_document"),
            (
                PipelineError::MalformedOutput("not an object".into()),
                "malformed_output",
            ),
            (
                PipelineError::RepairFailed("still not JSON".into()),
                "repair_failed",
            ),
            (
                PipelineError::Storage(sqlx::Error::Protocol("count mismatch".into())),
                "storage_failure",
            ),
        ];
        for (err, code) in cases {
            assert_eq!(err.code(), code, "{err}");
        }
    }

    #[test]
    fn test_provider_errors_display_transparently() {
        let err = PipelineError::Provider(ProviderError::RateLimited("slow down".into()));
        assert_eq!(
            err.to_string(),
            "provider rate limited the request: slow down"
        );
    }
}
