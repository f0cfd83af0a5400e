//! Render calls through the full pipeline.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use linegraph::core::ChartError;
use linegraph::identity::ChartTarget;
use linegraph::plugin::RenderOutput;
use linegraph::test_utils::{
    FakeDecryptor, FakeRenderService, RequestFixture, init_test_logging, test_plugin,
};

const STAMP: i64 = 1_700_000_000_123_456;

fn three_runs(web_root: &std::path::Path) -> RequestFixture {
    RequestFixture::new(web_root, 5)
        .with_record("7", "Run A", 10)
        .with_record("8", "Run B", 11)
        .with_record("9", "Run C", 12)
        .with_option("use_rollup", "true", STAMP, true)
}

fn file_of(output: RenderOutput) -> std::path::PathBuf {
    match output {
        RenderOutput::File(path) => path,
        RenderOutput::Html(html) => panic!("expected a chart file, got HTML: {html}"),
    }
}

#[tokio::test]
async fn test_rollup_builds_once_then_hits() -> Result<()> {
    init_test_logging(None);
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    let request = three_runs(temp.path()).build_graph(Some(ChartTarget::Rollup)).build();

    let path = file_of(plugin.render(&request).await?);
    assert!(path.ends_with(format!("uploads/files/graphs/datatype_5/Chart__10_11_12_{STAMP}.svg")));
    assert!(path.exists());
    assert_eq!(renderer.calls(), 1);

    let again = file_of(plugin.render(&request).await?);
    assert_eq!(again, path);
    assert_eq!(renderer.calls(), 1, "cached chart must not reach the renderer");
    Ok(())
}

#[tokio::test]
async fn test_record_chart_has_fixed_svg_casing() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    let request = three_runs(temp.path())
        .build_graph(Some(ChartTarget::Record("8".to_string())))
        .build();

    let path = file_of(plugin.render(&request).await?);
    assert_eq!(path.file_name().unwrap().to_string_lossy(), format!("Chart__11_{STAMP}.svg"));

    let svg = std::fs::read_to_string(&path)?;
    assert!(svg.contains(r#"viewBox="0 0 900 400""#));
    assert!(svg.contains(r#"preserveAspectRatio="xMidYMid meet""#));
    assert!(!svg.contains("viewbox="));

    let requests = renderer.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.starts_with("http://localhost/uploads/files/graphs/datatype_5/"));
    assert!(requests[0].url.ends_with(&format!("Chart__11_{STAMP}.html")));
    assert!(requests[0].selector.starts_with("Chart_"));
    assert!(svg.contains(&requests[0].selector));
    Ok(())
}

#[tokio::test]
async fn test_option_change_retires_cached_name() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));

    let before = three_runs(temp.path()).build_graph(Some(ChartTarget::Rollup)).build();
    let first = file_of(plugin.render(&before).await?);

    let after = three_runs(temp.path())
        .with_option("graph_width", "640", STAMP + 1_000_000, true)
        .build_graph(Some(ChartTarget::Rollup))
        .build();
    let second = file_of(plugin.render(&after).await?);

    assert_ne!(first, second);
    assert!(second.ends_with(format!("Chart__10_11_12_{}.svg", STAMP + 1_000_000)));
    assert!(first.exists(), "old artifacts are left in place");
    assert_eq!(renderer.calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_inactive_option_does_not_change_name() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));

    let request = three_runs(temp.path())
        .with_option("graph_height", "200", STAMP + 5, false)
        .build_graph(Some(ChartTarget::Rollup))
        .build();
    let path = file_of(plugin.render(&request).await?);
    assert!(path.ends_with(format!("Chart__10_11_12_{STAMP}.svg")));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_requests_build_once() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new().with_delay(Duration::from_millis(200));
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    let request = three_runs(temp.path()).build_graph(Some(ChartTarget::Rollup)).build();

    let other = plugin.clone();
    let other_request = request.clone();
    let (a, b) = tokio::join!(plugin.render(&request), async move {
        other.render(&other_request).await
    });

    assert_eq!(file_of(a?), file_of(b?));
    assert_eq!(renderer.calls(), 1);
    assert_eq!(plugin.cache().coordinator().in_flight_count(), 0);
    Ok(())
}

#[tokio::test]
async fn test_existing_plaintext_is_kept() -> Result<()> {
    let temp = TempDir::new()?;
    let decryptor = FakeDecryptor::new();
    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(decryptor.clone()),
    );
    let fixture = three_runs(temp.path());
    let plaintext = fixture.file_path(10);
    std::fs::create_dir_all(plaintext.parent().unwrap())?;
    std::fs::write(&plaintext, "x,y\n0,1\n")?;

    let request = fixture.build_graph(Some(ChartTarget::Record("7".to_string()))).build();
    plugin.render(&request).await?;

    assert_eq!(decryptor.calls(), 0);
    assert!(plaintext.exists());
    Ok(())
}

#[tokio::test]
async fn test_decrypted_private_plaintext_is_removed() -> Result<()> {
    let temp = TempDir::new()?;
    let decryptor = FakeDecryptor::new();
    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(decryptor.clone()),
    );
    let fixture = three_runs(temp.path());
    let plaintexts: Vec<_> = [10, 11, 12].iter().map(|id| fixture.file_path(*id)).collect();

    let request = fixture.build_graph(Some(ChartTarget::Rollup)).build();
    let path = file_of(plugin.render(&request).await?);

    assert!(path.exists());
    assert_eq!(decryptor.calls(), 3);
    for plaintext in plaintexts {
        assert!(!plaintext.exists(), "{} should be removed", plaintext.display());
    }
    Ok(())
}

#[tokio::test]
async fn test_fragment_lists_charts_in_rank_order() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    let request = three_runs(temp.path()).build();

    let html = match plugin.render(&request).await? {
        RenderOutput::Html(html) => html,
        RenderOutput::File(path) => panic!("expected HTML, got {}", path.display()),
    };

    let a = html.find("Run A").expect("Run A listed");
    let b = html.find("Run B").expect("Run B listed");
    let c = html.find("Run C").expect("Run C listed");
    assert!(a < b && b < c);
    assert!(html.contains("linegraph-rollup"));
    assert!(html.contains(&format!("Chart__10_11_12_{STAMP}.svg")));
    assert_eq!(renderer.calls(), 0, "the fragment never renders charts");
    Ok(())
}

#[tokio::test]
async fn test_fragment_without_rollup_option() -> Result<()> {
    let temp = TempDir::new()?;
    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(FakeDecryptor::new()),
    );
    let request = RequestFixture::new(temp.path(), 5).with_record("7", "Run A", 10).build();

    let RenderOutput::Html(html) = plugin.render(&request).await? else {
        panic!("expected HTML");
    };
    assert!(html.contains("Run A"));
    assert!(!html.contains("linegraph-rollup"));
    Ok(())
}

#[tokio::test]
async fn test_build_without_target() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));

    let request = three_runs(temp.path()).build_graph(None).build();
    let err = plugin.render(&request).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChartError>(),
        Some(ChartError::TargetNotSpecified { .. })
    ));

    let request = three_runs(temp.path())
        .build_graph(Some(ChartTarget::Record("404".to_string())))
        .build();
    let err = plugin.render(&request).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChartError>(),
        Some(ChartError::TargetNotSpecified { .. })
    ));
    assert_eq!(renderer.calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_record_without_file_is_skipped() -> Result<()> {
    let temp = TempDir::new()?;
    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(FakeDecryptor::new()),
    );
    let request = RequestFixture::new(temp.path(), 5)
        .with_record("7", "Run A", 10)
        .with_record_files("8", "Empty", &[])
        .build_graph(Some(ChartTarget::Rollup))
        .build();

    let path = file_of(plugin.render(&request).await?);
    assert!(path.ends_with("Chart__10_0.svg"));
    Ok(())
}

#[tokio::test]
async fn test_multiple_uploads_rejected() -> Result<()> {
    let temp = TempDir::new()?;
    let plugin = test_plugin(
        temp.path(),
        Arc::new(FakeRenderService::new()),
        Arc::new(FakeDecryptor::new()),
    );
    let request = RequestFixture::new(temp.path(), 5).with_record_files("7", "Run A", &[10, 11]).build();

    let err = plugin.render(&request).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<ChartError>(),
        Some(ChartError::MultipleUploads { count: 2, .. })
    ));
    Ok(())
}

#[tokio::test]
async fn test_unknown_binding_is_configuration_error() -> Result<()> {
    let temp = TempDir::new()?;
    let renderer = FakeRenderService::new();
    let plugin = test_plugin(temp.path(), Arc::new(renderer.clone()), Arc::new(FakeDecryptor::new()));
    let request = three_runs(temp.path())
        .with_binding("graph_file", 999)
        .build_graph(Some(ChartTarget::Rollup))
        .build();

    let err = plugin.render(&request).await.unwrap_err();
    match err.downcast_ref::<ChartError>() {
        Some(ChartError::ConfigurationError { role, field_id, .. }) => {
            assert_eq!(role, "graph_file");
            assert_eq!(*field_id, Some(999));
        }
        other => panic!("expected ConfigurationError, got {other:?}"),
    }
    assert_eq!(renderer.calls(), 0);
    Ok(())
}
