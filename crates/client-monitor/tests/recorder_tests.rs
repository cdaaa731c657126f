//! Process-wide recorder installation.
//!
//! Installs the global Prometheus recorder, so this file holds a single
//! test and runs in its own binary.

// Test code is allowed to use expect/unwrap for assertions
#![allow(clippy::unwrap_used, clippy::expect_used)]

use client_monitor::client::{Client, CreateOptions};
use client_monitor::observability::{init_metrics_recorder, CLIENT_REQUEST_TIME_SECONDS};
use client_monitor::Monitor;
use monitor_test_utils::fixtures;
use monitor_test_utils::MockClient;

#[tokio::test]
async fn test_init_metrics_recorder_serves_client_histogram() {
    let handle = init_metrics_recorder(CLIENT_REQUEST_TIME_SECONDS)
        .expect("first install should succeed");

    let client = Monitor::fixed("app").instrument_client(MockClient::new());
    let mut pod = fixtures::pod("default", "web");
    client
        .create(&mut pod, &CreateOptions::default())
        .await
        .unwrap();

    let rendered = handle.render();
    assert!(rendered.contains("# HELP controller_client_request_time_seconds"));
    assert!(rendered.contains("controller_client_request_time_seconds_bucket"));
    assert!(rendered.contains("verb=\"Create\""));
    assert!(rendered.contains("controller_client_request_time_seconds_count"));

    assert!(init_metrics_recorder(CLIENT_REQUEST_TIME_SECONDS).is_err());
}
