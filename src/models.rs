//! Core data models used throughout ragline.
//!
//! These types represent the chunks, persisted rows, and request/response
//! contracts that flow through the ingestion and answer pipelines.

use serde::{Deserialize, Serialize};

/// A bounded contiguous slice of a document's text, the unit of embedding.
///
/// Produced only by the chunker; ordered by `index`; immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub source_document_id: String,
    pub index: usize,
    pub text: String,
}

/// A persisted (chunk, vector, metadata) row.
///
/// Keyed by the composite `"<document_id>:<chunk_index>"` identifier. Rows
/// are append-only: re-ingesting the same text produces new rows under a new
/// document id, never an overwrite.
#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub row_id: String,
    pub document_id: String,
    pub source: String,
    pub chunk_index: i64,
    pub content: String,
    pub metadata: Option<serde_json::Value>,
    pub embedding: Vec<f32>,
}

/// Input contract for `POST /api/ingest/text`.
#[derive(Debug, Clone, Deserialize)]
pub struct IngestRequest {
    pub source: String,
    pub text: String,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Output contract for `POST /api/ingest/text`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub document_id: String,
    pub chunks_created: usize,
}

/// Input contract for `POST /api/answer`.
#[derive(Debug, Clone, Deserialize)]
pub struct AnswerRequest {
    /// User's question; must be at least 3 characters.
    pub question: String,
    /// Optional context/policy text to ground the answer.
    #[serde(default)]
    pub context: Option<String>,
}

/// Output contract for `POST /api/answer`.
///
/// This is the sole accepted shape of model output. It is never built
/// directly from deserialization of untrusted text; see `validate::parse_answer`
/// for the explicit decode-then-validate path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Vec<String>,
    /// Confidence score in `[0.0, 1.0]`.
    pub confidence: f64,
    #[serde(default)]
    pub follow_ups: Vec<String>,
}
