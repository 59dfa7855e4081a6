use reqwest::Request;
use tracing::warn;

use super::UploadError;

/// Thin wrapper around the shared HTTP client that reduces an upload
/// response to the pipeline's error taxonomy. Success is exactly an HTTP
/// status in [200, 299]; there are no retries and no timeout overrides
/// beyond the client defaults.
pub struct UploadClient {
    http: reqwest::Client,
}

impl UploadClient {
    pub fn new(http: reqwest::Client) -> Self {
        UploadClient { http }
    }

    pub async fn send(&self, request: Request) -> Result<(), UploadError> {
        match self.http.execute(request).await {
            Ok(response) => {
                let status = response.status();

                if status.is_success() {
                    Ok(())
                } else {
                    warn!(%status, "upload endpoint rejected the request");
                    Err(UploadError::Server { status })
                }
            }
            Err(err) => {
                warn!("upload transport failure: {err}");
                Err(UploadError::Transport(err))
            }
        }
    }
}
