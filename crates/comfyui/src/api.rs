//! REST client for the notebook-hosted ComfyUI backend.
//!
//! Wraps the backend's three-endpoint HTTP surface (queue a job graph,
//! read execution history, download an output image) using [`reqwest`].

use serde::Deserialize;

/// HTTP client for a single backend instance.
pub struct ComfyUIApi {
    client: reqwest::Client,
    base_url: String,
}

/// Response returned by the backend `/queue` endpoint after
/// successfully queuing a job graph.
#[derive(Debug, Deserialize)]
pub struct QueueResponse {
    /// Server-assigned identifier for the queued job.
    pub prompt_id: String,
}

/// Response returned by the backend `/history/{prompt_id}` endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryResponse {
    /// Execution status; `"completed"` marks a finished job.
    pub status: String,
    /// URLs of produced images, present once the job completes.
    #[serde(default)]
    pub output_images: Vec<String>,
}

/// Errors from the backend REST layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend returned a non-2xx status code.
    #[error("Backend error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },
}

impl ComfyUIApi {
    /// Create a new API client.
    ///
    /// * `base_url` - Base HTTP URL of the notebook tunnel, without a
    ///   trailing slash, e.g. `https://tunnel.example.net`.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    /// Queue a job graph for execution.
    ///
    /// Sends `POST /queue` with the graph as the JSON body and returns
    /// the server-assigned `prompt_id`.
    pub async fn queue_workflow(
        &self,
        graph: &serde_json::Value,
    ) -> Result<QueueResponse, ComfyUIApiError> {
        let response = self
            .client
            .post(format!("{}/queue", self.base_url))
            .json(graph)
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Read the execution history for a queued job.
    ///
    /// Sends `GET /history/{prompt_id}`.
    pub async fn get_history(&self, prompt_id: &str) -> Result<HistoryResponse, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.base_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    /// Download an output image, returning its bytes verbatim.
    pub async fn download_image(&self, url: &str) -> Result<Vec<u8>, ComfyUIApiError> {
        let response = self.client.get(url).send().await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.bytes().await?.to_vec())
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUIApiError::Api`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_without_output_images_parses() {
        let history: HistoryResponse =
            serde_json::from_str(r#"{"status": "running"}"#).unwrap();
        assert_eq!(history.status, "running");
        assert!(history.output_images.is_empty());
    }

    #[test]
    fn completed_history_parses_image_urls() {
        let history: HistoryResponse = serde_json::from_str(
            r#"{"status": "completed", "output_images": ["http://x/img.png"]}"#,
        )
        .unwrap();
        assert_eq!(history.status, "completed");
        assert_eq!(history.output_images, vec!["http://x/img.png"]);
    }
}
