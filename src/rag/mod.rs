pub mod builder;
pub mod chunker;
pub mod index;
pub mod loader;
pub mod retriever;
pub mod sqlite;

pub use builder::{BuildError, IndexBuilder};
pub use chunker::{ChunkRecord, Chunker};
pub use index::{IndexError, IndexHandle, IndexMeta, VectorIndex};
pub use loader::{load_documents, Document};
pub use retriever::{RetrievedChunk, Retriever};
pub use sqlite::{load_index, save_index};
