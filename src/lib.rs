//! # ragline
//!
//! A retrieval-augmented question answering service. Documents are chunked,
//! embedded through an LLM provider, and persisted as vectors; questions are
//! answered by the provider and the untrusted output is validated against a
//! strict schema, with a one-shot repair round-trip for malformed replies.
//!
//! ## Pipelines
//!
//! ```text
//! Ingest:  text ──▶ chunk ──▶ embed (retry) ──▶ SQLite (one tx)
//! Answer:  question ──▶ prompt ──▶ generate (retry) ──▶ validate / repair
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`models`] | Core data types and API contracts |
//! | [`chunk`] | Windowed text chunking |
//! | [`provider`] | LLM provider HTTP client and error classification |
//! | [`retry`] | Bounded retry with exponential backoff and jitter |
//! | [`answer`] | Prompt assembly and answer generation |
//! | [`validate`] | Untrusted-output validation and repair |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`store`] | Vector row persistence |
//! | [`server`] | HTTP API |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`error`] | Core error taxonomy |

pub mod answer;
pub mod chunk;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod provider;
pub mod retry;
pub mod server;
pub mod store;
pub mod validate;
