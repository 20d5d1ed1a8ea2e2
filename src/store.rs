//! Vector store writer.
//!
//! Persists one row per (chunk, vector) pair under the composite
//! `"<document_id>:<chunk_index>"` key. All rows for one ingestion call are
//! written inside a single transaction, in chunk-index order, so a failed
//! ingestion leaves no partial document behind.
//!
//! Embeddings are encoded as little-endian f32 BLOBs.

use sqlx::SqlitePool;

use crate::error::PipelineError;
use crate::models::{Chunk, DocumentRecord};

/// Pair each chunk with its vector into the row shape the store persists.
///
/// Row ids are the composite `"<document_id>:<chunk_index>"`; the metadata
/// object, when present, is attached to every row of the document.
fn build_records(
    document_id: &str,
    source: &str,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    metadata: Option<&serde_json::Value>,
) -> Vec<DocumentRecord> {
    chunks
        .iter()
        .zip(vectors.iter())
        .map(|(chunk, vector)| DocumentRecord {
            row_id: format!("{}:{}", document_id, chunk.index),
            document_id: document_id.to_string(),
            source: source.to_string(),
            chunk_index: chunk.index as i64,
            content: chunk.text.clone(),
            metadata: metadata.cloned(),
            embedding: vector.clone(),
        })
        .collect()
}

/// Insert one row per chunk/vector pair. Returns the number of rows created.
///
/// Requires `chunks.len() == vectors.len()`; the pairs are persisted in
/// chunk-index order. Rows are never updated: re-ingesting the same text
/// under a new document id creates new rows alongside the old ones.
pub async fn write_records(
    pool: &SqlitePool,
    document_id: &str,
    source: &str,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
    metadata: Option<&serde_json::Value>,
) -> Result<usize, PipelineError> {
    if chunks.len() != vectors.len() {
        return Err(PipelineError::Storage(sqlx::Error::Protocol(format!(
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        ))));
    }

    let records = build_records(document_id, source, chunks, vectors, metadata);
    let created_at = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;
    for record in &records {
        sqlx::query(
            r#"
            INSERT INTO documents (row_id, document_id, source, chunk_index, content, metadata_json, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.row_id)
        .bind(&record.document_id)
        .bind(&record.source)
        .bind(record.chunk_index)
        .bind(&record.content)
        .bind(record.metadata.as_ref().map(|m| m.to_string()))
        .bind(vec_to_blob(&record.embedding))
        .bind(created_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;

    Ok(records.len())
}

/// Encode a float vector as little-endian f32 bytes for BLOB storage.
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB back into a float vector.
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::Row;

    fn chunk(document_id: &str, index: usize, text: &str) -> Chunk {
        Chunk {
            source_document_id: document_id.to_string(),
            index,
            text: text.to_string(),
        }
    }

    async fn test_pool() -> SqlitePool {
        // A pool over :memory: must stay on one connection, or each
        // checkout would see a different empty database.
        let pool = sqlx::sqlite::SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        crate::migrate::run_migrations(&pool).await.unwrap();
        pool
    }

    #[test]
    fn test_build_records_pairs_chunks_with_vectors() {
        let chunks = vec![chunk("doc-9", 0, "alpha"), chunk("doc-9", 1, "beta")];
        let vectors = vec![vec![0.1f32, 0.2], vec![0.3, 0.4]];
        let metadata = serde_json::json!({"lang": "en"});

        let records = build_records("doc-9", "notes", &chunks, &vectors, Some(&metadata));
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row_id, "doc-9:0");
        assert_eq!(records[1].row_id, "doc-9:1");
        assert_eq!(records[1].document_id, "doc-9");
        assert_eq!(records[1].chunk_index, 1);
        assert_eq!(records[0].content, "alpha");
        assert_eq!(records[1].embedding, vec![0.3f32, 0.4]);
        // The document's metadata rides along on every row.
        assert_eq!(records[0].metadata.as_ref(), Some(&metadata));
        assert_eq!(records[1].metadata.as_ref(), Some(&metadata));
    }

    #[test]
    fn test_blob_roundtrip() {
        let vec = vec![1.0f32, -2.5, 3.125, 0.0, -0.001];
        assert_eq!(blob_to_vec(&vec_to_blob(&vec)), vec);
    }

    #[tokio::test]
    async fn test_rows_keyed_by_composite_id() {
        let pool = test_pool().await;
        let chunks = vec![chunk("doc-1", 0, "alpha"), chunk("doc-1", 1, "beta")];
        let vectors = vec![vec![0.1f32, 0.2], vec![0.3, 0.4]];

        let created = write_records(&pool, "doc-1", "notes", &chunks, &vectors, None)
            .await
            .unwrap();
        assert_eq!(created, 2);

        let rows = sqlx::query(
            "SELECT row_id, content, metadata_json, embedding FROM documents ORDER BY chunk_index",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get::<String, _>("row_id"), "doc-1:0");
        assert_eq!(rows[1].get::<String, _>("row_id"), "doc-1:1");
        assert_eq!(rows[0].get::<String, _>("content"), "alpha");
        assert_eq!(rows[0].get::<Option<String>, _>("metadata_json"), None);
        assert_eq!(
            blob_to_vec(&rows[1].get::<Vec<u8>, _>("embedding")),
            vec![0.3f32, 0.4]
        );
    }

    #[tokio::test]
    async fn test_metadata_stored_when_provided() {
        let pool = test_pool().await;
        let metadata = serde_json::json!({"team": "support"});
        write_records(
            &pool,
            "doc-2",
            "notes",
            &[chunk("doc-2", 0, "gamma")],
            &[vec![1.0f32]],
            Some(&metadata),
        )
        .await
        .unwrap();

        let stored: Option<String> =
            sqlx::query_scalar("SELECT metadata_json FROM documents WHERE row_id = 'doc-2:0'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(stored.unwrap(), metadata.to_string());
    }

    #[tokio::test]
    async fn test_mismatched_lengths_rejected() {
        let pool = test_pool().await;
        let err = write_records(
            &pool,
            "doc-3",
            "notes",
            &[chunk("doc-3", 0, "delta")],
            &[],
            None,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, PipelineError::Storage(_)));
    }

    #[tokio::test]
    async fn test_reingest_does_not_overwrite() {
        let pool = test_pool().await;
        let chunks = vec![chunk("doc-a", 0, "same text")];
        let vectors = vec![vec![0.5f32]];
        write_records(&pool, "doc-a", "notes", &chunks, &vectors, None)
            .await
            .unwrap();

        let chunks_b = vec![chunk("doc-b", 0, "same text")];
        write_records(&pool, "doc-b", "notes", &chunks_b, &vectors, None)
            .await
            .unwrap();

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM documents")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 2);
    }
}
