//! Document loading for the indexing pipeline.
//!
//! The corpus is a directory of `.txt`/`.md` files. Crawled pages follow
//! the convention of carrying their source URL on the first line; that
//! line is lifted into `source_uri` and stripped from the text.

use std::fs;
use std::io;
use std::path::Path;

/// A named, immutable text unit. The filesystem is the source of truth;
/// the pipeline never writes documents back.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub text: String,
    pub source_uri: Option<String>,
}

/// Load every `.txt`/`.md` file under `dir`, sorted by file name so a
/// rebuild over the same corpus sees the same document order.
///
/// Unreadable individual files are logged and skipped; an unreadable
/// directory is an error.
pub fn load_documents(dir: &Path) -> io::Result<Vec<Document>> {
    let mut paths: Vec<_> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::warn!(path = %path.display(), "skipping unreadable document: {err}");
                continue;
            }
        };

        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let (source_uri, text) = split_source_line(&contents);
        if text.trim().is_empty() {
            tracing::warn!(document = %id, "skipping empty document");
            continue;
        }

        documents.push(Document {
            id,
            text,
            source_uri,
        });
    }

    tracing::info!(count = documents.len(), dir = %dir.display(), "loaded documents");
    Ok(documents)
}

fn split_source_line(contents: &str) -> (Option<String>, String) {
    let mut lines = contents.lines();
    match lines.next() {
        Some(first) if first.starts_with("http") => {
            let rest: Vec<&str> = lines.collect();
            (Some(first.to_string()), rest.join("\n").trim_start().to_string())
        }
        _ => (None, contents.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_line_url_becomes_source_uri() {
        let (uri, text) = split_source_line("https://example.com/page\n\nBody text here.");
        assert_eq!(uri.as_deref(), Some("https://example.com/page"));
        assert_eq!(text, "Body text here.");
    }

    #[test]
    fn plain_text_keeps_everything() {
        let (uri, text) = split_source_line("Just a document.\nSecond line.");
        assert!(uri.is_none());
        assert_eq!(text, "Just a document.\nSecond line.");
    }

    #[test]
    fn loads_sorted_and_skips_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.txt"), "doc b").unwrap();
        fs::write(dir.path().join("a.md"), "doc a").unwrap();
        fs::write(dir.path().join("ignore.pdf"), "binary").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        let ids: Vec<&str> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a.md", "b.txt"]);
    }

    #[test]
    fn empty_documents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("empty.txt"), "   \n").unwrap();
        fs::write(dir.path().join("real.txt"), "content").unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "real.txt");
    }
}
