// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

mod common;

use std::collections::BTreeMap;
use std::sync::Arc;

use common::Fixture;
use futures::{StreamExt as _, TryStreamExt as _};
use hyperdat_client::{ClientConfig, FileTree};
use hyperdat_store_core::{Encoding, EntryKind, FileContent, HistoryKind, ReadStreamOptions};
use hyperdat_utils_test::arb_tree;
use proptest::prelude::*;

#[test_log::test(tokio::test)]
async fn reads_whole_files() {
    let fixture = Fixture::with_files(&[("/notes/hello.txt", "hello world")]);
    let client = fixture.ready_client(ClientConfig::default()).await;

    let text = client
        .read_file("notes/hello.txt", Encoding::Utf8)
        .await
        .unwrap();
    assert_eq!(text, FileContent::Text("hello world".to_string()));

    let bytes = client
        .read_file("/notes/hello.txt", Encoding::Binary)
        .await
        .unwrap();
    assert_eq!(bytes.into_bytes(), "hello world".as_bytes());

    let err = client
        .read_file("/notes/missing", Encoding::Binary)
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test_log::test(tokio::test)]
async fn streams_byte_ranges() {
    let fixture = Fixture::with_files(&[("/data", "0123456789")]);
    let client = fixture.ready_client(ClientConfig::default()).await;
    let chunks: Vec<_> = client
        .read_file_stream("/data", ReadStreamOptions::range(2, 5))
        .await
        .unwrap()
        .try_collect()
        .await
        .unwrap();
    let joined: Vec<u8> = chunks.concat();
    assert_eq!(joined, b"23456");
}

#[test_log::test(tokio::test)]
async fn history_replays_then_follows() {
    let fixture = Fixture::with_files(&[("/a", "1")]);
    let client = fixture.ready_client(ClientConfig::default()).await;
    let mut history = client.read_history_stream().unwrap();

    let first = history.next().await.unwrap();
    assert_eq!(first.kind, HistoryKind::Put);
    assert_eq!(first.path.as_str(), "/a");

    fixture.archive.put("/b", "2").unwrap();
    let next = history.next().await.unwrap();
    assert_eq!(next.path.as_str(), "/b");
    assert!(next.version > first.version);
}

#[test_log::test(tokio::test)]
async fn tree_of_empty_archive_is_empty() {
    let fixture = Fixture::new();
    let client = fixture.ready_client(ClientConfig::default()).await;
    let tree = client.archive_file_tree().await.unwrap();
    assert!(tree.is_empty());
}

#[test_log::test(tokio::test)]
async fn tree_is_enumerated_once() {
    let fixture = Fixture::with_files(&[("/a", "1"), ("/dir/b", "22"), ("/dir/sub/c", "333")]);
    let client = fixture.ready_client(ClientConfig::default()).await;

    let first = client.archive_file_tree().await.unwrap();
    assert_eq!(first.keys().collect::<Vec<_>>(), vec!["a", "dir"]);
    let dir = &first["dir"];
    assert_eq!(dir.kind, EntryKind::Directory);
    let sub = &dir.children.as_ref().unwrap()["sub"];
    assert_eq!(sub.children.as_ref().unwrap()["c"].stat.size, 3);

    fixture.archive.put("/late", "x").unwrap();
    let second = client.archive_file_tree().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(!second.contains_key("late"));
}

#[test_log::test(tokio::test)]
async fn concurrent_tree_requests_share_one_result() {
    let fixture = Fixture::with_files(&[("/x/y", "1")]);
    let client = fixture.ready_client(ClientConfig::default()).await;
    let (a, b) = tokio::join!(client.archive_file_tree(), client.archive_file_tree());
    assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
}

fn collect_files(tree: &FileTree, out: &mut BTreeMap<String, u64>) {
    for node in tree.values() {
        match &node.children {
            Some(children) => collect_files(children, out),
            None => {
                out.insert(node.path.as_str().to_string(), node.stat.size);
            }
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn proptest_tree_lists_every_file(files in arb_tree()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let fixture = Fixture::new();
            for (path, content) in &files {
                fixture.archive.put(path.as_str(), content.clone()).unwrap();
            }
            let client = fixture.ready_client(ClientConfig::default()).await;
            let tree = client.archive_file_tree().await.unwrap();

            let mut listed = BTreeMap::new();
            collect_files(&tree, &mut listed);
            let expected: BTreeMap<String, u64> = files
                .iter()
                .map(|(path, content)| (format!("/{path}"), content.len() as u64))
                .collect();
            prop_assert_eq!(listed, expected);
            Ok(())
        })?;
    }
}
