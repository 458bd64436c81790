mod common;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use common::{test_config, TestApp};
use serde_json::{json, Value};

const BOUNDARY: &str = "nurture-test-boundary";

/// Builds a multipart upload with an optional `file` part and `folder` field
fn upload_request(app: &TestApp, token: &str, file: Option<(&str, &str, &[u8])>, folder: Option<&str>) -> Request<Body> {
    let mut body = Vec::new();
    if let Some(folder) = folder {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"folder\"\r\n\r\n{}\r\n",
                BOUNDARY, folder
            )
            .as_bytes(),
        );
    }
    if let Some((file_name, content_type, bytes)) = file {
        body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, file_name, content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method(Method::POST)
        .uri(format!("{}/media/upload", app.base))
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={}", BOUNDARY),
        )
        .body(Body::from(body))
        .unwrap()
}

#[tokio::test]
async fn upload_list_and_delete_media() {
    let app = TestApp::new();
    let mother = app.mother("mother@example.com").await;
    let png: &[u8] = b"\x89PNG\r\n\x1a\nfake image bytes";

    let request = upload_request(&app, &mother.token, Some(("scan.png", "image/png", png)), Some("ultrasounds"));
    let (status, body) = app.send(request).await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["kind"], "image");
    assert_eq!(body["data"]["size_bytes"], png.len());
    let public_id = body["data"]["public_id"].as_str().unwrap().to_string();
    assert!(public_id.starts_with("nurture-test/ultrasounds/"));
    assert!(app.files.contains(&public_id));
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app.get("/media", Some(&mother.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let other = app.mother("other@example.com").await;
    let (_, body) = app.get("/media", Some(&other.token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (status, _) = app.delete(&format!("/media/{}", id), Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/media/{}", id), Some(&mother.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(!app.files.contains(&public_id));
    let (status, _) = app.delete(&format!("/media/{}", id), Some(&mother.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn uploads_are_checked_before_storage() {
    let app = TestApp::new();
    let mother = app.mother("mother@example.com").await;

    let (status, body) = app.send(upload_request(&app, &mother.token, None, Some("x"))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Please provide a file to upload");

    let (status, _) = app
        .send(upload_request(&app, &mother.token, Some(("empty.png", "image/png", &b""[..])), None))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .send(upload_request(
            &app,
            &mother.token,
            Some(("run.sh", "application/x-sh", &b"#!/bin/sh"[..])),
            None,
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Only image, video and PDF files are allowed");

    let (status, _) = app
        .send(upload_request(&app, &mother.token, Some(("doc.pdf", "application/pdf", &b"%PDF-1.7"[..])), None))
        .await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn oversized_uploads_are_rejected() {
    let mut config = test_config();
    config.api.max_upload_bytes = 16;
    let app = TestApp::with_config(config);
    let mother = app.mother("mother@example.com").await;

    let bytes = vec![0u8; 64];
    let (status, body) = app
        .send(upload_request(&app, &mother.token, Some(("big.jpg", "image/jpeg", bytes.as_slice())), None))
        .await;
    assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(body["code"], "PAYLOAD_TOO_LARGE");
}

async fn seed_inbox(app: &TestApp) -> (common::Session, Vec<String>) {
    let author = app.mother("author@example.com").await;
    let friend = app.mother("friend@example.com").await;
    let (_, body) = app
        .post("/community/posts", Some(&author.token), json!({ "content": "Hello" }))
        .await;
    let post = body["data"]["id"].as_str().unwrap().to_string();
    for content in ["One", "Two", "Three"] {
        app.post(
            &format!("/community/posts/{}/comments", post),
            Some(&friend.token),
            json!({ "content": content }),
        )
        .await;
    }

    let (_, body) = app.get("/notifications", Some(&author.token)).await;
    let ids = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n: &Value| n["id"].as_str().unwrap().to_string())
        .collect();
    (author, ids)
}

#[tokio::test]
async fn notifications_can_be_read_one_by_one_or_all_at_once() {
    let app = TestApp::new();
    let (author, ids) = seed_inbox(&app).await;
    assert_eq!(ids.len(), 3);

    let stranger = app.mother("stranger@example.com").await;
    let (status, _) = app
        .put(&format!("/notifications/{}/read", ids[0]), Some(&stranger.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app
        .put(&format!("/notifications/{}/read", ids[0]), Some(&author.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.get("/notifications?unread=true", Some(&author.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = app.put("/notifications/read-all", Some(&author.token), json!({})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 2);

    let (_, body) = app.get("/notifications?unread=true", Some(&author.token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
    let (_, body) = app.get("/notifications", Some(&author.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}
