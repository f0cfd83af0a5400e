//! Render failures and cleanup of transient files.

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

use linegraph::config::{PluginConfig, RenderServiceConfig};
use linegraph::core::ChartError;
use linegraph::identity::{CacheLayout, ChartKey, ChartTarget};
use linegraph::plugin::{ChartRequest, LineChartPlugin};
use linegraph::render::TeraTemplateEngine;
use linegraph::test_utils::{
    FakeDecryptor, FakeRenderService, RenderBehavior, RequestFixture, test_plugin,
};

const STAMP: i64 = 1_700_000_000_123_456;

fn rollup_request(web_root: &Path) -> ChartRequest {
    RequestFixture::new(web_root, 5)
        .with_record("7", "Run A", 10)
        .with_record("8", "Run B", 11)
        .with_record("9", "Run C", 12)
        .with_option("use_rollup", "true", STAMP, true)
        .build_graph(Some(ChartTarget::Rollup))
        .build()
}

fn expected_artifact(web_root: &Path) -> PathBuf {
    CacheLayout::new(web_root).artifact_path(5, &ChartKey::for_rollup([10, 11, 12], STAMP))
}

fn entries(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// Nothing but the lock directory may remain after a failed build.
fn assert_cleaned_up(web_root: &Path) {
    let layout = CacheLayout::new(web_root);
    assert_eq!(entries(&layout.datatype_dir(5)), Vec::<String>::new());
    assert_eq!(entries(&web_root.join("scratch")), Vec::<String>::new());
    for id in [10, 11, 12] {
        let plaintext = web_root.join("uploads/files").join(format!("File_{id}.csv"));
        assert!(!plaintext.exists(), "{} should be removed", plaintext.display());
    }
}

fn assert_render_failed(err: &anyhow::Error, web_root: &Path) {
    let artifact = expected_artifact(web_root).to_string_lossy().into_owned();
    match err.downcast_ref::<ChartError>() {
        Some(ChartError::RenderFailed { path_suffix, .. }) => {
            assert_eq!(path_suffix.chars().count(), 40);
            assert!(artifact.ends_with(path_suffix.as_str()));
        }
        other => panic!("expected RenderFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn test_renderer_error_is_render_failed() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::with_behavior(RenderBehavior::Fail("browser crashed".into()));
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));

    let err = plugin.render(&rollup_request(temp.path())).await.unwrap_err();
    assert_render_failed(&err, temp.path());
    assert!(format!("{err:#}").contains("browser crashed"));
    assert!(!expected_artifact(temp.path()).exists());
    assert_cleaned_up(temp.path());
    assert_eq!(plugin.cache().coordinator().in_flight_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_missing_output_is_render_failed() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::with_behavior(RenderBehavior::NoOutput);
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));

    let err = plugin.render(&rollup_request(temp.path())).await.unwrap_err();
    assert_render_failed(&err, temp.path());
    assert!(err.to_string().contains("no output"));
    assert_cleaned_up(temp.path());
    assert_eq!(renderer.calls(), 1, "failed builds are not retried");
    Ok(())
}

#[tokio::test]
async fn test_hanging_renderer_times_out() -> Result<()> {
    let temp = TempDir::new()?;
    let config = PluginConfig {
        web_root: temp.path().to_path_buf(),
        scratch_dir: temp.path().join("scratch"),
        render_service: RenderServiceConfig {
            timeout_secs: 1,
            poll_attempts: 1,
            poll_interval_ms: 10,
            ..RenderServiceConfig::default()
        },
        ..PluginConfig::default()
    };
    let plugin = LineChartPlugin::new(
        config,
        Arc::new(FakeRenderService::with_behavior(RenderBehavior::Hang)),
        Arc::new(FakeDecryptor::new()),
        Arc::new(TeraTemplateEngine::new()),
    );

    let err = plugin.render(&rollup_request(temp.path())).await.unwrap_err();
    assert_render_failed(&err, temp.path());
    assert!(err.to_string().contains("timed out"));
    assert_cleaned_up(temp.path());
    Ok(())
}

#[tokio::test]
async fn test_failure_does_not_poison_retry() -> Result<()> {
    let temp = TempDir::new()?;
    let failing = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::with_behavior(RenderBehavior::NoOutput)),
        Arc::new(FakeDecryptor::new()),
    );
    assert!(failing.render(&rollup_request(temp.path())).await.is_err());

    let renderer = FakeRenderService::new();
    let working = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    working.render(&rollup_request(temp.path())).await?;

    assert!(expected_artifact(temp.path()).exists());
    assert_eq!(renderer.calls(), 1);
    Ok(())
}
