//! In-process fakes of the plugin's external collaborators.

use anyhow::Result;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::models::ChartFile;
use crate::render::{Decryptor, RenderRequest, RenderService};

/// How [`FakeRenderService`] answers a render call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderBehavior {
    /// Write an SVG with lowercased attributes, like a headless browser does.
    WriteSvg,
    /// Return success without writing anything.
    NoOutput,
    /// Return an error.
    Fail(String),
    /// Never return.
    Hang,
}

/// Render service double that records every request.
#[derive(Debug, Clone)]
pub struct FakeRenderService {
    behavior: RenderBehavior,
    delay: Duration,
    web_root: Option<PathBuf>,
    required: Vec<PathBuf>,
    calls: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RenderRequest>>>,
}

impl Default for FakeRenderService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeRenderService {
    pub fn new() -> Self {
        Self::with_behavior(RenderBehavior::WriteSvg)
    }

    pub fn with_behavior(behavior: RenderBehavior) -> Self {
        Self {
            behavior,
            delay: Duration::ZERO,
            web_root: None,
            required: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Sleep this long inside every call.
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// After the delay, fail unless the requested page still exists below
    /// `web_root`, like a browser that is still loading it would.
    #[must_use]
    pub fn checking_page(mut self, web_root: &Path) -> Self {
        self.web_root = Some(web_root.to_path_buf());
        self
    }

    /// After the delay, fail unless each of `paths` still exists.
    #[must_use]
    pub fn requiring(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.required.extend(paths);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RenderRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }

    /// The SVG written for `selector`.
    pub fn svg_for(selector: &str) -> String {
        format!(
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="900" height="400" viewbox="0 0 900 400" preserveaspectratio="xMidYMid meet"><g id="{selector}"><path d="M0 0L10 10"/></g></svg>"#
        )
    }
}

impl FakeRenderService {
    fn check_inputs(&self, request: &RenderRequest) -> Result<()> {
        if let Some(web_root) = &self.web_root {
            // http://host/<path below the web root>
            let url_path = request.url.splitn(4, '/').nth(3).unwrap_or_default();
            let page = web_root.join(url_path);
            if !page.exists() {
                anyhow::bail!("page {} vanished mid-render", page.display());
            }
        }
        for path in &self.required {
            if !path.exists() {
                anyhow::bail!("input {} vanished mid-render", path.display());
            }
        }
        Ok(())
    }
}

impl RenderService for FakeRenderService {
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Ok(mut requests) = self.requests.lock() {
                requests.push(request.clone());
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            self.check_inputs(request)?;

            match &self.behavior {
                RenderBehavior::WriteSvg => {
                    tokio::fs::write(&request.output, Self::svg_for(&request.selector)).await?;
                    Ok(())
                }
                RenderBehavior::NoOutput => Ok(()),
                RenderBehavior::Fail(message) => Err(anyhow::anyhow!("{message}")),
                RenderBehavior::Hang => std::future::pending().await,
            }
        })
    }
}

/// Decryptor double writing a small CSV at the expected plaintext path.
#[derive(Debug, Clone, Default)]
pub struct FakeDecryptor {
    calls: Arc<AtomicUsize>,
}

impl FakeDecryptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Decryptor for FakeDecryptor {
    fn decrypt<'a>(
        &'a self,
        file: &'a ChartFile,
    ) -> Pin<Box<dyn Future<Output = Result<PathBuf>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if let Some(parent) = file.local_path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }
            tokio::fs::write(&file.local_path, format!("x,y\n0,{}\n1,{}\n", file.id, file.id + 1))
                .await?;
            Ok(file.local_path.clone())
        })
    }
}
