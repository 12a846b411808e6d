//! End-to-end tests for the saved-track library.

mod common;

use common::client::TestClient;
use common::constants::*;
use common::server::TestServer;
use reqwest::StatusCode;
use serde_json::{json, Value};

fn track(id: &str, title: &str) -> Value {
    json!({
        "videoId": id,
        "title": title,
        "thumbnail": format!("http://thumbs.example/{}.jpg", id)
    })
}

#[tokio::test]
async fn add_is_idempotent_per_video_id() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let response = client.library_add(track(VIDEO_1_ID, VIDEO_1_TITLE)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = client.library_add(track(VIDEO_1_ID, VIDEO_1_TITLE)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let list: Vec<Value> = client.library_list().await.json().await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["videoId"], VIDEO_1_ID);
}

#[tokio::test]
async fn remove_of_absent_id_is_a_noop() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.library_add(track(VIDEO_1_ID, VIDEO_1_TITLE)).await;

    let response = client.library_remove("absent00000").await;
    assert_eq!(response.status(), StatusCode::OK);

    let list: Vec<Value> = client.library_list().await.json().await.unwrap();
    assert_eq!(list.len(), 1);
}

#[tokio::test]
async fn contains_tracks_membership_through_toggles() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    let body: Value = client.library_contains(VIDEO_1_ID).await.json().await.unwrap();
    assert_eq!(body["saved"], false);

    client.library_add(track(VIDEO_1_ID, VIDEO_1_TITLE)).await;
    let body: Value = client.library_contains(VIDEO_1_ID).await.json().await.unwrap();
    assert_eq!(body["saved"], true);

    client.library_remove(VIDEO_1_ID).await;
    let body: Value = client.library_contains(VIDEO_1_ID).await.json().await.unwrap();
    assert_eq!(body["saved"], false);
}

#[tokio::test]
async fn list_preserves_insertion_order() {
    let server = TestServer::spawn().await;
    let client = TestClient::new(server.base_url.clone());

    client.library_add(track(VIDEO_1_ID, VIDEO_1_TITLE)).await;
    client.library_add(track(VIDEO_2_ID, VIDEO_2_TITLE)).await;
    client.library_add(track(VIDEO_3_ID, VIDEO_3_TITLE)).await;
    client.library_remove(VIDEO_2_ID).await;

    let list: Vec<Value> = client.library_list().await.json().await.unwrap();
    let ids: Vec<&str> = list.iter().map(|t| t["videoId"].as_str().unwrap()).collect();
    assert_eq!(ids, vec![VIDEO_1_ID, VIDEO_3_ID]);
}
