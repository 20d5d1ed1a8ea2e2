//! Ingestion pipeline orchestration: chunk → embed → persist.
//!
//! One ingestion call handles one document in one worker context: the
//! chunks are embedded in a single batched provider call (no per-chunk
//! fan-out) and persisted in chunk-index order inside one transaction.

use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::chunk::chunk_document;
use crate::config::ChunkingConfig;
use crate::error::PipelineError;
use crate::models::IngestResponse;
use crate::provider::ProviderClient;
use crate::retry::RetryPolicy;
use crate::store::write_records;

/// Ingest one document's text under a freshly generated document id.
///
/// Fails with [`PipelineError::EmptyDocument`] before any provider or
/// storage call when chunking yields nothing. The embedding call goes
/// through the resilient invoker, so transient provider failures are
/// retried under the configured policy.
pub async fn ingest_text(
    pool: &SqlitePool,
    provider: &ProviderClient,
    retry: &RetryPolicy,
    chunking: &ChunkingConfig,
    source: &str,
    text: &str,
    metadata: Option<&serde_json::Value>,
) -> Result<IngestResponse, PipelineError> {
    let document_id = Uuid::new_v4().to_string();

    let chunks = chunk_document(&document_id, text, chunking.chunk_size, chunking.overlap);
    if chunks.is_empty() {
        return Err(PipelineError::EmptyDocument);
    }

    let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
    let vectors = retry.invoke(|| provider.embed(&texts)).await?;

    let chunks_created =
        write_records(pool, &document_id, source, &chunks, &vectors, metadata).await?;

    info!(
        document_id = %document_id,
        source,
        chunks_created,
        "document ingested"
    );

    Ok(IngestResponse {
        document_id,
        chunks_created,
    })
}
