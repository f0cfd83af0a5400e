//! Client for the external render service.
//!
//! The render service loads a chart page in a browser and writes the chart
//! element as SVG to a path on the shared filesystem. The call is
//! synchronous: the request returns once the renderer is done, and success is
//! judged by the output file appearing, not by the response.
//!
//! Wire format:
//!
//! ```text
//! POST http://<host>:<port>/
//! Content-Type: application/json
//!
//! {"data": {"URL": "<page url>", "selector": "<element id>", "output": "<svg path>"}}
//! ```

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::RenderServiceConfig;
use crate::core::ChartError;

/// One render job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderRequest {
    /// Absolute URL of the chart page.
    #[serde(rename = "URL")]
    pub url: String,
    /// Id of the chart element to capture.
    pub selector: String,
    /// Where the renderer must write the SVG.
    pub output: PathBuf,
}

#[derive(Serialize)]
struct Envelope<'a> {
    data: &'a RenderRequest,
}

/// Renders chart pages to SVG files.
pub trait RenderService: Send + Sync {
    /// Run `request` to completion. Returning `Ok` does not imply the output
    /// file exists; callers check for it.
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;
}

/// [`RenderService`] over HTTP.
#[derive(Debug, Clone)]
pub struct HttpRenderService {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl HttpRenderService {
    /// # Errors
    ///
    /// Fails if the HTTP client cannot be constructed.
    pub fn new(config: &RenderServiceConfig) -> Result<Self> {
        let timeout = config.timeout();
        let client = reqwest::Client::builder().timeout(timeout).build().map_err(|e| {
            ChartError::NetworkError {
                operation: "create render service client".to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            client,
            endpoint: config.endpoint(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl RenderService for HttpRenderService {
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            debug!(
                endpoint = %self.endpoint,
                url = %request.url,
                selector = %request.selector,
                "Calling render service"
            );

            let response = self
                .client
                .post(&self.endpoint)
                .json(&Envelope {
                    data: request,
                })
                .send()
                .await
                .map_err(|e| ChartError::NetworkError {
                    operation: format!("POST {}", self.endpoint),
                    reason: if e.is_timeout() {
                        format!("timed out after {:?}", self.timeout)
                    } else {
                        e.to_string()
                    },
                })?;

            if !response.status().is_success() {
                warn!("Render service answered HTTP {}", response.status());
            }
            // Drain the body so the renderer is finished before the output is checked
            let _ = response.bytes().await;
            Ok(())
        })
    }
}
