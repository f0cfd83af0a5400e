//! Overlapping builds that share intermediate files.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use linegraph::identity::ChartTarget;
use linegraph::plugin::RenderOutput;
use linegraph::test_utils::{
    FakeDecryptor, FakeRenderService, RequestFixture, init_test_logging, test_plugin,
};

fn runs(web_root: &std::path::Path, stamp: i64) -> RequestFixture {
    RequestFixture::new(web_root, 5)
        .with_record("7", "Run A", 10)
        .with_record("8", "Run B", 11)
        .with_record("9", "Run C", 12)
        .with_option("use_rollup", "true", stamp, true)
}

fn is_file(output: &RenderOutput) -> bool {
    matches!(output, RenderOutput::File(path) if path.exists())
}

#[tokio::test]
async fn test_builds_of_one_file_across_stamps_keep_their_own_pages() -> Result<()> {
    init_test_logging(None);
    let temp = TempDir::new()?;
    let fixture = runs(temp.path(), 1000);
    for id in [10, 11, 12] {
        let path = fixture.file_path(id);
        std::fs::create_dir_all(path.parent().unwrap())?;
        std::fs::write(&path, "x,y\n0,1\n")?;
    }

    let slow = FakeRenderService::new()
        .with_delay(Duration::from_millis(300))
        .checking_page(temp.path());
    let fast = FakeRenderService::new().checking_page(temp.path());
    let old_plugin = test_plugin(temp.path(), Arc::new(slow.clone()), Arc::new(FakeDecryptor::new()));
    let new_plugin = test_plugin(temp.path(), Arc::new(fast.clone()), Arc::new(FakeDecryptor::new()));

    let target = Some(ChartTarget::Record("7".to_string()));
    let old_request = fixture.build_graph(target.clone()).build();
    let new_request = runs(temp.path(), 2000).build_graph(target).build();

    let old_build = tokio::spawn(async move { old_plugin.render(&old_request).await });
    tokio::time::sleep(Duration::from_millis(50)).await;
    let new_output = new_plugin.render(&new_request).await?;
    let old_output = old_build.await??;

    assert!(is_file(&old_output));
    assert!(is_file(&new_output));
    assert_ne!(old_output, new_output);
    assert_eq!(slow.calls(), 1);
    assert_eq!(fast.calls(), 1);

    let leftover_pages = std::fs::read_dir(temp.path().join("uploads/files/graphs/datatype_5"))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.path().extension().is_some_and(|ext| ext == "html"))
        .count();
    assert_eq!(leftover_pages, 0);
    Ok(())
}

#[tokio::test]
async fn test_record_and_rollup_builds_share_decrypted_files() -> Result<()> {
    init_test_logging(None);
    let temp = TempDir::new()?;
    let fixture = runs(temp.path(), 1000);
    let shared_file = fixture.file_path(10);

    let renderer = FakeRenderService::new()
        .with_delay(Duration::from_millis(200))
        .checking_page(temp.path())
        .requiring([shared_file.clone()]);
    let decryptor = FakeDecryptor::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(decryptor.clone()));

    let record_request = fixture.clone().build_graph(Some(ChartTarget::Record("7".to_string()))).build();
    let rollup_request = fixture.clone().build_graph(Some(ChartTarget::Rollup)).build();

    let record_plugin = plugin.clone();
    let record_build = tokio::spawn(async move { record_plugin.render(&record_request).await });
    tokio::time::sleep(Duration::from_millis(30)).await;
    let rollup_output = plugin.render(&rollup_request).await?;
    let record_output = record_build.await??;

    assert!(is_file(&record_output));
    assert!(is_file(&rollup_output));
    assert_eq!(renderer.calls(), 2);
    assert_eq!(decryptor.calls(), 3, "the shared file is decrypted once");

    for id in [10, 11, 12] {
        assert!(!fixture.file_path(id).exists(), "plaintext of file {id} was left behind");
    }
    assert_eq!(plugin.plaintexts().claimed_count(), 0);
    Ok(())
}
