//! SQLite persistence for the vector index artifact.
//!
//! One file holds both the vectors (`chunks.embedding`, little-endian f32
//! BLOBs) and the parallel metadata table. Writes go to `<path>.tmp` and
//! are renamed over the target, so a failed build never clobbers a valid
//! artifact.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use super::chunker::ChunkRecord;
use super::index::{IndexError, IndexMeta, VectorIndex};

fn serialize_embedding(embedding: &[f32]) -> Vec<u8> {
    embedding.iter().flat_map(|f| f.to_le_bytes()).collect()
}

fn deserialize_embedding(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

async fn open_pool(path: &Path, writable: bool) -> Result<SqlitePool, sqlx::Error> {
    // DELETE journal keeps the artifact a single file, which the rename
    // swap relies on.
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(writable)
        .read_only(!writable)
        .journal_mode(SqliteJournalMode::Delete)
        .synchronous(SqliteSynchronous::Full);

    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(if writable { 1 } else { 4 })
        .connect_with(options)
        .await
}

/// Persist the index atomically: write a fresh database at `<path>.tmp`,
/// then rename it over `path`.
pub async fn save_index(index: &VectorIndex, path: &Path) -> Result<(), IndexError> {
    let tmp_path = PathBuf::from(format!("{}.tmp", path.display()));
    if tmp_path.exists() {
        std::fs::remove_file(&tmp_path).map_err(|e| IndexError::Persist(e.to_string()))?;
    }

    let pool = open_pool(&tmp_path, true)
        .await
        .map_err(|e| IndexError::Persist(e.to_string()))?;

    let result = write_all(index, &pool).await;
    pool.close().await;
    result?;

    std::fs::rename(&tmp_path, path).map_err(|e| IndexError::Persist(e.to_string()))?;
    tracing::info!(
        path = %path.display(),
        chunks = index.len(),
        dimension = index.dimension(),
        "index artifact written"
    );
    Ok(())
}

async fn write_all(index: &VectorIndex, pool: &SqlitePool) -> Result<(), IndexError> {
    let persist = |e: sqlx::Error| IndexError::Persist(e.to_string());

    sqlx::query(
        "CREATE TABLE chunks (
            chunk_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            seq INTEGER NOT NULL,
            content TEXT NOT NULL,
            start_offset INTEGER NOT NULL,
            end_offset INTEGER NOT NULL,
            embedding BLOB NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(persist)?;

    sqlx::query(
        "CREATE TABLE index_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await
    .map_err(persist)?;

    let mut tx = pool.begin().await.map_err(persist)?;

    for entry in index.entries() {
        let chunk = &entry.chunk;
        sqlx::query(
            "INSERT INTO chunks (chunk_id, document_id, seq, content, start_offset, end_offset, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(&chunk.chunk_id)
        .bind(&chunk.document_id)
        .bind(chunk.seq as i64)
        .bind(&chunk.text)
        .bind(chunk.start as i64)
        .bind(chunk.end as i64)
        .bind(serialize_embedding(&entry.embedding))
        .execute(&mut *tx)
        .await
        .map_err(persist)?;
    }

    let meta = index.meta();
    let meta_rows = [
        ("dimension", index.dimension().to_string()),
        ("embedding_model", meta.embedding_model.clone()),
        ("chunk_size", meta.chunk_size.to_string()),
        ("chunk_overlap", meta.chunk_overlap.to_string()),
        ("document_count", meta.document_count.to_string()),
        ("fingerprint", meta.fingerprint.clone()),
        ("created_at", meta.created_at.clone()),
    ];
    for (key, value) in meta_rows {
        sqlx::query("INSERT INTO index_meta (key, value) VALUES (?1, ?2)")
            .bind(key)
            .bind(value)
            .execute(&mut *tx)
            .await
            .map_err(persist)?;
    }

    tx.commit().await.map_err(persist)
}

/// Load a persisted index. A missing file is [`IndexError::NotFound`];
/// anything unreadable or dimension-inconsistent is [`IndexError::Corrupt`].
pub async fn load_index(path: &Path) -> Result<VectorIndex, IndexError> {
    if !path.exists() {
        return Err(IndexError::NotFound(path.to_path_buf()));
    }

    let pool = open_pool(path, false)
        .await
        .map_err(|e| IndexError::Corrupt(e.to_string()))?;

    let result = read_all(&pool).await;
    pool.close().await;
    result
}

async fn read_all(pool: &SqlitePool) -> Result<VectorIndex, IndexError> {
    let corrupt = |e: sqlx::Error| IndexError::Corrupt(e.to_string());

    let meta_rows = sqlx::query("SELECT key, value FROM index_meta")
        .fetch_all(pool)
        .await
        .map_err(corrupt)?;
    let meta_map: HashMap<String, String> = meta_rows
        .iter()
        .map(|row| (row.get::<String, _>("key"), row.get::<String, _>("value")))
        .collect();

    let meta_field = |key: &str| {
        meta_map
            .get(key)
            .cloned()
            .ok_or_else(|| IndexError::Corrupt(format!("index_meta missing '{key}'")))
    };
    let meta_usize = |key: &str| {
        meta_field(key)?
            .parse::<usize>()
            .map_err(|_| IndexError::Corrupt(format!("index_meta '{key}' is not a number")))
    };

    let dimension = meta_usize("dimension")?;
    if dimension == 0 {
        return Err(IndexError::Corrupt("dimension is zero".to_string()));
    }

    let meta = IndexMeta {
        embedding_model: meta_field("embedding_model")?,
        chunk_size: meta_usize("chunk_size")?,
        chunk_overlap: meta_usize("chunk_overlap")?,
        document_count: meta_usize("document_count")?,
        fingerprint: meta_field("fingerprint")?,
        created_at: meta_field("created_at")?,
    };

    let rows = sqlx::query(
        "SELECT chunk_id, document_id, seq, content, start_offset, end_offset, embedding
         FROM chunks
         ORDER BY document_id, seq",
    )
    .fetch_all(pool)
    .await
    .map_err(corrupt)?;

    let mut index = VectorIndex::new(dimension, meta);
    for row in rows {
        let chunk_id: String = row.get("chunk_id");
        let blob: Vec<u8> = row.get("embedding");
        if blob.len() % 4 != 0 || blob.len() / 4 != dimension {
            return Err(IndexError::Corrupt(format!(
                "chunk {chunk_id} carries a {}-byte embedding, expected {}",
                blob.len(),
                dimension * 4
            )));
        }

        let chunk = ChunkRecord {
            chunk_id,
            document_id: row.get("document_id"),
            seq: row.get::<i64, _>("seq") as usize,
            text: row.get("content"),
            start: row.get::<i64, _>("start_offset") as usize,
            end: row.get::<i64, _>("end_offset") as usize,
        };

        index
            .insert(chunk, deserialize_embedding(&blob))
            .map_err(|e| IndexError::Corrupt(e.to_string()))?;
    }

    Ok(index)
}
