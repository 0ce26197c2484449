mod support;

use serde_json::json;
use tcm_webui_api_types::{ConfigPayload, ConfigWriteRequest};

use support::store_at;

const WRITERS: usize = 12;

fn request(writer: usize) -> ConfigWriteRequest {
    serde_json::from_value(json!({
        "libraries": {format!("Library {writer}"): {"plex_name": format!("TV {writer}")}},
        "series": [
            {"name": format!("Show {writer} (2020)"), "config": {"card_type": "standard", "writer": writer}},
            {"name": "Shared (1999)", "config": {"episode_text_format": format!("E{writer}")}}
        ]
    }))
    .expect("write request")
}

fn payload(writer: usize) -> ConfigPayload {
    let request = request(writer);
    ConfigPayload {
        libraries: request.libraries.unwrap_or_default(),
        series: request.series,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_leave_one_complete_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tv.yml");
    let store = store_at(&path);

    let handles = (0..WRITERS)
        .map(|writer| {
            let store = store.clone();
            tokio::spawn(async move { store.write(request(writer)).await })
        })
        .collect::<Vec<_>>();
    for handle in handles {
        handle.await.expect("writer task").expect("write succeeds");
    }

    let cached = store.as_payload().await.expect("cached payload");
    let on_disk = store_at(&path)
        .as_payload()
        .await
        .expect("re-read payload");
    assert_eq!(cached, on_disk);

    let winners = (0..WRITERS)
        .filter(|writer| payload(*writer) == cached)
        .count();
    assert_eq!(winners, 1, "{cached:?}");
}

#[tokio::test]
async fn omitted_libraries_survive_a_write() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("tv.yml");
    let store = store_at(&path);
    store.write(request(1)).await.expect("first write");

    let series_only: ConfigWriteRequest = serde_json::from_value(json!({
        "series": [{"name": "Other (2001)", "config": {"card_type": "tinted frame"}}]
    }))
    .expect("write request");
    store.write(series_only).await.expect("second write");

    let reread = store_at(&path).as_payload().await.expect("re-read payload");
    assert_eq!(reread.libraries, payload(1).libraries);
    assert_eq!(reread.series.len(), 1);
    assert_eq!(reread.series[0].name.as_deref(), Some("Other (2001)"));
}
