//! Cache purges after uploads change.

use anyhow::Result;
use std::sync::Arc;
use tempfile::TempDir;

use linegraph::identity::{CacheLayout, ChartKey, ChartTarget};
use linegraph::test_utils::{FakeDecryptor, FakeRenderService, RequestFixture, test_plugin};

#[tokio::test]
async fn test_file_change_purges_dependent_charts() -> Result<()> {
    let temp = TempDir::new()?;
    let layout = CacheLayout::new(temp.path());
    let dir = layout.datatype_dir(5);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("Chart__10_11_12_1000.svg"), "<svg/>")?;
    std::fs::write(dir.join("Chart__11_1000.svg"), "<svg/>")?;
    std::fs::write(dir.join("Chart__10_999.svg"), "<svg/>")?;
    std::fs::write(dir.join("Chart__110_1000.svg"), "<svg/>")?;

    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(FakeDecryptor::new()),
    );
    let removed = plugin.on_file_changed(5, 11).await?;

    assert_eq!(removed, 2);
    assert!(!dir.join("Chart__10_11_12_1000.svg").exists());
    assert!(!dir.join("Chart__11_1000.svg").exists());
    assert!(dir.join("Chart__10_999.svg").exists());
    assert!(dir.join("Chart__110_1000.svg").exists());
    Ok(())
}

#[tokio::test]
async fn test_file_change_without_cache() -> Result<()> {
    let temp = TempDir::new()?;
    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(FakeDecryptor::new()),
    );
    assert_eq!(plugin.on_file_changed(42, 11).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_purged_chart_is_rebuilt() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    let request = RequestFixture::new(temp.path(), 5)
        .with_record("7", "Run A", 10)
        .with_record("8", "Run B", 11)
        .build_graph(Some(ChartTarget::Rollup))
        .build();

    plugin.render(&request).await?;
    let artifact = CacheLayout::new(temp.path()).artifact_path(5, &ChartKey::for_rollup([10, 11], 0));
    assert!(artifact.exists());

    assert_eq!(plugin.on_file_changed(5, 10).await?, 1);
    assert!(!artifact.exists());

    plugin.render(&request).await?;
    assert!(artifact.exists());
    assert_eq!(renderer.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_lifecycle_hooks_leave_cache_alone() -> Result<()> {
    let temp = TempDir::new()?;
    let dir = CacheLayout::new(temp.path()).datatype_dir(5);
    std::fs::create_dir_all(&dir)?;
    std::fs::write(dir.join("Chart__10_1000.svg"), "<svg/>")?;

    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(FakeDecryptor::new()),
    );
    plugin.on_plugin_removed(5);
    plugin.on_settings_changed(5);

    assert!(dir.join("Chart__10_1000.svg").exists());
    Ok(())
}
