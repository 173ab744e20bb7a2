// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

mod common;

use std::sync::Arc;

use common::{Fixture, drain};
use hyperdat_client::{ClientConfig, ClientError, ClientEvent, ClientMetrics, ClientState};
use hyperdat_store_core::{Encoding, FileContent, Replica as _};
use hyperdat_swarm::{PeerId, SwarmError, TeardownStep};
use prometheus::Registry;
use serde_json::json;

#[test_log::test(tokio::test)]
async fn initialize_then_close() {
    let fixture = Fixture::with_files(&[("/a", "1")]);
    let client = fixture.client(ClientConfig::default());
    assert_eq!(client.state(), ClientState::Uninitialized);
    assert_eq!(client.archive_key(), None);
    assert_eq!(client.peer_count(), 0);
    assert!(client.archive_info().is_empty());

    client.initialize().await.unwrap();
    assert!(client.is_ready());
    assert_eq!(client.archive_key(), Some(fixture.key));
    assert_eq!(client.version(), Some(fixture.archive.version()));
    assert!(client.resolved_address().unwrap().path.is_root());

    client.close().await.unwrap();
    assert_eq!(client.state(), ClientState::Closed);
    assert_eq!(
        fixture.transport.teardown_log(),
        vec![
            TeardownStep::Leave(fixture.discovery_key()),
            TeardownStep::Destroy(fixture.discovery_key()),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn second_initialize_is_a_state_violation() {
    let fixture = Fixture::new();
    let client = fixture.ready_client(ClientConfig::default()).await;
    let err = client.initialize().await.unwrap_err();
    assert!(err.is_state_violation(), "{err}");
    assert!(client.is_ready());
}

#[test_log::test(tokio::test)]
async fn close_requires_ready() {
    let fixture = Fixture::new();
    let client = fixture.client(ClientConfig::default());
    let err = client.close().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::StateViolation {
            state: ClientState::Uninitialized,
            ..
        }
    ));

    client.initialize().await.unwrap();
    client.close().await.unwrap();
    let err = client.close().await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::StateViolation {
            state: ClientState::Closed,
            ..
        }
    ));
    assert!(client.initialize().await.unwrap_err().is_state_violation());
}

#[test_log::test(tokio::test)]
async fn pinned_version_is_recorded_but_reads_follow_latest() {
    let fixture = Fixture::with_files(&[("/a", "old")]);
    fixture.archive.put("/a", "new").unwrap();
    let address = format!("dat://{}+1/", fixture.key);
    let client = fixture.client_for(&address, ClientConfig::default());

    client.initialize().await.unwrap();
    assert_eq!(client.resolved_address().unwrap().version, Some(1));
    assert_eq!(client.version(), Some(fixture.archive.version()));
    assert_eq!(
        client.read_file("/a", Encoding::Utf8).await.unwrap(),
        FileContent::Text("new".to_string())
    );
}

#[test_log::test(tokio::test)]
async fn operations_require_ready() {
    let fixture = Fixture::with_files(&[("/a", "1")]);
    let client = fixture.client(ClientConfig::default());
    assert!(client.archive_file_tree().await.unwrap_err().is_state_violation());
    assert!(matches!(
        client.read_history_stream(),
        Err(e) if e.is_state_violation()
    ));

    client.initialize().await.unwrap();
    client.close().await.unwrap();
    assert!(
        client
            .read_file("/a", Default::default())
            .await
            .unwrap_err()
            .is_state_violation()
    );
    assert!(
        client
            .download("/a", Some(std::path::Path::new("/tmp/unused")))
            .await
            .unwrap_err()
            .is_state_violation()
    );
}

#[test_log::test(tokio::test)]
async fn concurrent_initialize_admits_one_caller() {
    let fixture = Fixture::new();
    let client = fixture.client(ClientConfig::default());
    let (first, second) = tokio::join!(client.initialize(), client.initialize());
    assert!(first.is_ok() != second.is_ok());
    assert!(client.is_ready());
}

#[test_log::test(tokio::test)]
async fn refused_swarm_aborts_bring_up() {
    let fixture = Fixture::new();
    fixture.transport.refuse_joins("network unreachable");
    let client = fixture.client(ClientConfig::default());

    let err = client.initialize().await.unwrap_err();
    assert!(matches!(err, ClientError::Swarm(SwarmError::Join { .. })));
    assert_eq!(client.state(), ClientState::Initializing);
    assert!(!client.is_ready());
    assert!(client.initialize().await.unwrap_err().is_state_violation());
    assert!(client.close().await.unwrap_err().is_state_violation());
}

#[test_log::test(tokio::test)]
async fn unknown_name_aborts_bring_up() {
    let fixture = Fixture::new();
    let client = fixture.client_for("dat://missing.example/", ClientConfig::default());
    let err = client.initialize().await.unwrap_err();
    assert!(matches!(err, ClientError::Address(_)));
    assert_eq!(client.archive_key(), None);
}

#[test_log::test(tokio::test)]
async fn resolves_names() {
    let fixture = Fixture::with_files(&[("/docs/readme", "hi")]);
    let client = fixture.client_for("dat://Example.org/docs", ClientConfig::default());
    client.initialize().await.unwrap();
    assert_eq!(client.archive_key(), Some(fixture.key));
    assert_eq!(client.resolved_address().unwrap().path.as_str(), "/docs");
}

#[test_log::test(tokio::test)]
async fn probes_archive_info() {
    let fixture = Fixture::with_files(&[("/dat.json", r#"{"title": "demo", "size": 3}"#)]);
    let client = fixture.ready_client(ClientConfig::default()).await;
    let info = client.archive_info();
    assert_eq!(info["title"], json!("demo"));
    assert_eq!(info["size"], json!(3));
}

#[test_log::test(tokio::test)]
async fn malformed_archive_info_is_empty() {
    let fixture = Fixture::with_files(&[("/dat.json", "[1, 2")]);
    let client = fixture.ready_client(ClientConfig::default()).await;
    assert!(client.archive_info().is_empty());
}

#[test_log::test(tokio::test)]
async fn waits_for_first_peer() {
    let fixture = Fixture::new();
    let client = fixture.client(ClientConfig {
        wait_for_peer: true,
        ..ClientConfig::default()
    });
    let dk = fixture.discovery_key();

    let connect = async {
        while fixture.transport.joined_config(&dk).is_none() {
            tokio::task::yield_now().await;
        }
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(client.state(), ClientState::Initializing);
        fixture.transport.connect_peer(&dk, PeerId::new([1])).unwrap();
    };
    let (result, ()) = tokio::join!(client.initialize(), connect);
    result.unwrap();
    assert!(client.is_ready());
    assert_eq!(client.peer_count(), 1);
}

#[test_log::test(tokio::test)]
async fn emits_lifecycle_events() {
    let fixture = Fixture::new();
    let client = fixture.client(ClientConfig::default());
    let mut rx = client.subscribe();

    client.initialize().await.unwrap();
    fixture
        .transport
        .connect_peer(&fixture.discovery_key(), PeerId::new([9]))
        .unwrap();
    let peers = loop {
        match rx.recv().await.unwrap() {
            ClientEvent::PeersChanged(n) if n > 0 => break n,
            _ => {}
        }
    };
    assert_eq!(peers, 1);
    client.close().await.unwrap();

    let states: Vec<_> = drain(&mut rx)
        .into_iter()
        .filter_map(|event| match event {
            ClientEvent::StateChanged { to, .. } => Some(to),
            _ => None,
        })
        .collect();
    assert_eq!(states, vec![ClientState::Closing, ClientState::Closed]);
}

#[test_log::test(tokio::test)]
async fn records_metrics() {
    let registry = Registry::new();
    let metrics = Arc::new(ClientMetrics::new("client", &registry).unwrap());
    let fixture = Fixture::with_files(&[("/a", "abc"), ("/b/c", "de")]);
    let client = fixture
        .ready_client(ClientConfig {
            metrics: Some(Arc::clone(&metrics)),
            ..ClientConfig::default()
        })
        .await;
    let tmp = tempfile::tempdir().unwrap();
    client.download("/", Some(tmp.path())).await.unwrap();

    assert_eq!(
        metrics
            .files_downloaded
            .with_label_values(&["materialize"])
            .get(),
        2
    );
    assert_eq!(metrics.bytes_downloaded.get(), 5);
    let text = prometheus::TextEncoder::new()
        .encode_to_string(&registry.gather())
        .unwrap();
    assert!(text.contains("operation=\"initialize\""));
    assert!(text.contains("operation=\"download\""));
}
