use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use super::{Embedder, EmbedderError};

/// Embedder backed by an OpenAI-compatible `/v1/embeddings` endpoint
/// (Ollama, LM Studio, hosted APIs).
#[derive(Clone, Debug)]
pub struct HttpEmbedder {
    base_url: String,
    model: String,
    api_key: Option<String>,
    client: Client,
    dimensions: usize,
}

impl HttpEmbedder {
    /// Connect to the backend and probe it with a single embedding to
    /// verify reachability and learn the vector dimension.
    ///
    /// A failure here means the model cannot be served at all; callers
    /// treat it as fatal at startup.
    pub async fn connect(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
    ) -> Result<Self, EmbedderError> {
        let mut embedder = Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key: api_key.map(|k| k.to_string()),
            client: Client::new(),
            dimensions: 0,
        };

        let probe = embedder
            .request(&["dimension probe".to_string()])
            .await
            .map_err(|e| EmbedderError::Unavailable(e.to_string()))?;
        let first = probe
            .first()
            .ok_or_else(|| EmbedderError::Unavailable("probe returned no vector".to_string()))?;
        if first.is_empty() {
            return Err(EmbedderError::Unavailable(
                "probe returned an empty vector".to_string(),
            ));
        }

        embedder.dimensions = first.len();
        tracing::info!(
            model = %embedder.model,
            dimensions = embedder.dimensions,
            "embedding backend ready"
        );
        Ok(embedder)
    }

    async fn request(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        let url = format!("{}/v1/embeddings", self.base_url);

        let body = json!({
            "model": self.model,
            "input": inputs,
        });

        let mut req = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            req = req.bearer_auth(key);
        }

        let res = req
            .send()
            .await
            .map_err(|e| EmbedderError::Request(e.to_string()))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(EmbedderError::Request(format!(
                "embeddings endpoint returned {status}: {text}"
            )));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| EmbedderError::Malformed(e.to_string()))?;

        let data = payload["data"]
            .as_array()
            .ok_or_else(|| EmbedderError::Malformed("missing data array".to_string()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let vals = item["embedding"]
                .as_array()
                .ok_or_else(|| EmbedderError::Malformed("missing embedding field".to_string()))?;
            let vec: Vec<f32> = vals
                .iter()
                .filter_map(|v| v.as_f64().map(|f| f as f32))
                .collect();
            embeddings.push(vec);
        }

        if embeddings.len() != inputs.len() {
            return Err(EmbedderError::Malformed(format!(
                "expected {} vectors, got {}",
                inputs.len(),
                embeddings.len()
            )));
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        let mut vecs = self.request(&[text.to_string()]).await?;
        vecs.pop()
            .ok_or_else(|| EmbedderError::Malformed("empty response".to_string()))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let vecs = self.request(texts).await?;
        for vec in &vecs {
            if vec.len() != self.dimensions {
                return Err(EmbedderError::Malformed(format!(
                    "dimension drift: expected {}, got {}",
                    self.dimensions,
                    vec.len()
                )));
            }
        }
        Ok(vecs)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}
