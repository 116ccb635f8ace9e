//! Offline indexing: load the document corpus, chunk, embed, and write the
//! index artifact the serving binary loads at startup.
//!
//! Run after the corpus changes:
//!
//! ```text
//! DOCQA_DOCS_DIR=./docs cargo run --bin build-index
//! ```

use std::sync::Arc;

use anyhow::Context;

use docqa_backend::core::config::{AppPaths, Settings};
use docqa_backend::embedding::{Embedder, HttpEmbedder};
use docqa_backend::logging;
use docqa_backend::rag::{load_documents, Chunker, IndexBuilder};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let paths = AppPaths::new();
    logging::init(&paths);

    let settings = Settings::load(&paths).context("Failed to load settings")?;

    let chunker = Chunker::new(
        settings.chunking.chunk_size,
        settings.chunking.chunk_overlap,
    )
    .context("Invalid chunking configuration")?;

    let documents = load_documents(&paths.docs_dir)
        .with_context(|| format!("Failed to read documents from {}", paths.docs_dir.display()))?;
    if documents.is_empty() {
        anyhow::bail!(
            "no documents found under {} — nothing to index",
            paths.docs_dir.display()
        );
    }

    let embedder: Arc<dyn Embedder> = Arc::new(
        HttpEmbedder::connect(
            &settings.embedding.base_url,
            &settings.embedding.model,
            settings.embedding.api_key.as_deref(),
        )
        .await
        .context("Embedding backend unavailable")?,
    );

    let builder = IndexBuilder::new(embedder, chunker, &settings.embedding.model);
    let index = builder
        .build_and_save(&documents, &paths.index_path)
        .await
        .context("Index build failed")?;

    tracing::info!(
        documents = documents.len(),
        chunks = index.len(),
        dimension = index.dimension(),
        path = %paths.index_path.display(),
        "index build complete"
    );

    Ok(())
}
