use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use cfpurge::application::coordinator::{PurgeCoordinator, WritePolicy};
use cfpurge::application::resolver::{ConfigResolver, StaticPurgeConfig};
use cfpurge::application::targets::PurgeTargetBuilder;
use cfpurge::domain::content::PurgeSubject;
use cfpurge::domain::types::SitePath;
use cfpurge::infra::cloudflare::CloudflareClient;
use cfpurge::infra::settings_store::InMemorySiteSettings;
use httpmock::MockServer;
use metrics_util::debugging::DebuggingRecorder;
use serde_json::json;

struct Page {
    link: Option<String>,
}

impl PurgeSubject for Page {
    fn object_id(&self) -> String {
        "page-1".to_string()
    }

    fn is_versioned(&self) -> bool {
        true
    }

    fn link(&self) -> Option<String> {
        self.link.clone()
    }
}

#[tokio::test]
async fn purge_paths_emit_expected_metric_keys() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder
        .install()
        .expect("debug metrics recorder should install in this test process");

    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/zones/zone-1/purge_cache")
                .body_includes("stage=Stage");
            then.status(500).json_body(json!({
                "success": false,
                "errors": [{"code": 10000, "message": "internal error"}]
            }));
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/zones/zone-1/purge_cache")
                .body_excludes("stage=Stage");
            then.status(200)
                .json_body(json!({"success": true, "errors": [], "result": {"id": "zone-1"}}));
        })
        .await;

    let static_layer = StaticPurgeConfig {
        email: Some("ops@example.com".to_string()),
        auth_key: Some("secret".to_string()),
        zone_identifier: Some("zone-1".to_string()),
        paths: None,
        hide_site_config: false,
    };
    let resolver = Arc::new(ConfigResolver::new(
        static_layer,
        Arc::new(InMemorySiteSettings::default()),
    ));
    let client =
        CloudflareClient::new(&server.base_url(), Duration::from_secs(5)).expect("client builds");
    let coordinator = PurgeCoordinator::new(
        resolver,
        PurgeTargetBuilder::new(SitePath::normalize("https://example.com").expect("base url")),
        Arc::new(client),
        WritePolicy::Always,
    );

    let purged = coordinator
        .on_after_delete(&Page {
            link: Some("/about".to_string()),
        })
        .await;
    assert_eq!(purged.calls.len(), 2);
    assert!(!purged.is_clean());

    let skipped = coordinator.on_before_publish(&Page { link: None }).await;
    assert!(skipped.calls.is_empty());

    let names: HashSet<String> = snapshotter
        .snapshot()
        .into_vec()
        .into_iter()
        .map(|(composite_key, _, _, _)| composite_key.key().name().to_string())
        .collect();

    let expected = [
        "cfpurge_purge_requests_total",
        "cfpurge_purge_failures_total",
        "cfpurge_purge_skipped_total",
        "cfpurge_purge_ms",
    ];

    for metric in expected {
        assert!(names.contains(metric), "missing metric: {metric}");
    }
}
