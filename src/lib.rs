//! RAG chat backend for a fixed corpus of product documents.
//!
//! The `build-index` binary chunks and embeds the corpus into a SQLite
//! artifact; the serving binary loads it and answers questions over HTTP,
//! grounding each answer in retrieved chunks and the conversation so far.

pub mod chat;
pub mod core;
pub mod embedding;
pub mod history;
pub mod llm;
pub mod logging;
pub mod rag;
pub mod server;
pub mod state;
