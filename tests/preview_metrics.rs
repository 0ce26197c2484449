mod support;

use std::{collections::HashSet, sync::Arc};

use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

use support::{
    AsciiOnlyFont, RecordingRenderer, SHOW, StubPreferences, context_with, preview_service,
    write_source_fixture,
};

#[tokio::test]
async fn preview_emits_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("source");
    let scratch = dir.path().join("scratch");
    std::fs::create_dir_all(&scratch).expect("scratch");
    write_source_fixture(&source, &["Pilot"], true);

    let service = preview_service(
        context_with(StubPreferences::new(&source), dir.path()),
        support::store_at(&dir.path().join("tv.yml")),
        Arc::new(AsciiOnlyFont),
        Arc::new(RecordingRenderer::default()),
        &scratch,
    );
    let candidate = json!({"media_directory": "/media/a"});
    let candidate = candidate.as_object().expect("object");

    service.generate(SHOW, candidate).await.expect("preview");
    service
        .generate("Unknown Show", candidate)
        .await
        .expect_err("no year");

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    for metric in ["tcm_preview_total", "tcm_preview_failed_total", "tcm_preview_ms"] {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
