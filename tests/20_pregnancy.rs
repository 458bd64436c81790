mod common;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use common::TestApp;
use serde_json::json;

fn due_in(weeks: i64) -> chrono::NaiveDate {
    Utc::now().date_naive() + Duration::weeks(weeks)
}

#[tokio::test]
async fn create_and_read_current_pregnancy() {
    let app = TestApp::new();
    let mother = app.mother("mom@example.com").await;

    let (status, body) = app
        .post(
            "/pregnancy",
            Some(&mother.token),
            json!({ "due_date": due_in(30), "baby_name": "  Sol  " }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["current_week"], 10);
    assert_eq!(body["data"]["status"], "active");
    assert_eq!(body["data"]["baby_name"], "Sol");
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.get("/pregnancy/current", Some(&mother.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], id.as_str());
    assert_eq!(body["data"]["trimester"], 1);
    assert_eq!(body["data"]["days_until_due"], 210);
    assert!(body["data"].get("week_guide").is_none());

    let (status, _) = app.get(&format!("/pregnancy/{}", id), Some(&mother.token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn due_date_must_be_in_the_window() {
    let app = TestApp::new();
    let mother = app.mother("window@example.com").await;

    let (status, _) = app.post("/pregnancy", Some(&mother.token), json!({})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let yesterday = Utc::now().date_naive() - Duration::days(1);
    let (status, _) = app
        .post("/pregnancy", Some(&mother.token), json!({ "due_date": yesterday }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post("/pregnancy", Some(&mother.token), json!({ "due_date": due_in(45) }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn only_one_active_pregnancy_per_mother() {
    let app = TestApp::new();
    let mother = app.mother("twice@example.com").await;

    let (status, body) = app
        .post("/pregnancy", Some(&mother.token), json!({ "due_date": due_in(20) }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let first = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post("/pregnancy", Some(&mother.token), json!({ "due_date": due_in(25) }))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // closing the first one frees the slot
    let (status, body) = app
        .put(
            &format!("/pregnancy/{}", first),
            Some(&mother.token),
            json!({ "status": "completed" }),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = app
        .post("/pregnancy", Some(&mother.token), json!({ "due_date": due_in(25) }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let second = body["data"]["id"].as_str().unwrap().to_string();

    // and reactivating the first now collides with the second
    let (status, _) = app
        .put(
            &format!("/pregnancy/{}", first),
            Some(&mother.token),
            json!({ "status": "active" }),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get("/pregnancy/current", Some(&mother.token)).await;
    assert_eq!(body["data"]["id"], second.as_str());
}

#[tokio::test]
async fn no_active_pregnancy_is_not_found() {
    let app = TestApp::new();
    let mother = app.mother("none@example.com").await;

    let (status, body) = app.get("/pregnancy/current", Some(&mother.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "No active pregnancy found");

    let (status, _) = app
        .post(
            "/pregnancy/symptoms",
            Some(&mother.token),
            json!({ "symptom": "Nausea", "severity": 3 }),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn other_mothers_cannot_read_a_pregnancy() {
    let app = TestApp::new();
    let owner = app.mother("owner@example.com").await;
    let other = app.mother("other@example.com").await;

    let (_, body) = app
        .post("/pregnancy", Some(&owner.token), json!({ "due_date": due_in(20) }))
        .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app.get(&format!("/pregnancy/{}", id), Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app
        .put(&format!("/pregnancy/{}", id), Some(&other.token), json!({ "notes": "mine now" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn pregnancy_routes_are_for_mothers() {
    let app = TestApp::new();
    let collaborator = app.register("doula@example.com", "collaborator").await;

    let (status, body) = app
        .post("/pregnancy", Some(&collaborator.token), json!({ "due_date": due_in(20) }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You do not have permission to perform this action");

    let (status, _) = app.get("/pregnancy/current", None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn symptoms_are_logged_against_the_current_week() {
    let app = TestApp::new();
    let mother = app.mother("symptoms@example.com").await;
    app.post("/pregnancy", Some(&mother.token), json!({ "due_date": due_in(20) }))
        .await;

    let (status, body) = app
        .post(
            "/pregnancy/symptoms",
            Some(&mother.token),
            json!({ "symptom": "Back pain", "severity": 11 }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);

    for (symptom, severity) in [("Back pain", 6), ("Fatigue", 4)] {
        let (status, body) = app
            .post(
                "/pregnancy/symptoms",
                Some(&mother.token),
                json!({ "symptom": symptom, "severity": severity }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["data"]["week"], 20);
    }

    let (status, body) = app.get("/pregnancy/symptoms", Some(&mother.token)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (_, body) = app.get("/pregnancy/symptoms?week=12", Some(&mother.token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (_, body) = app.get("/pregnancy/symptoms?limit=1", Some(&mother.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = app.get("/pregnancy/symptoms?week=41", Some(&mother.token)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn week_guides_are_public_and_admin_managed() {
    let app = TestApp::new();
    let admin = app.admin("admin@example.com").await;
    let mother = app.mother("reader@example.com").await;

    let (status, _) = app.get("/pregnancy/weeks/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = app.get("/pregnancy/weeks/41", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = app.get("/pregnancy/weeks/20", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Week guide not found");

    let guide = json!({
        "title": "Halfway there",
        "baby_size": "Banana",
        "baby_development": "Baby can hear sounds",
        "tips": ["  Stay hydrated ", ""]
    });
    let (status, _) = app.put("/admin/weeks/20", Some(&mother.token), guide.clone()).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.put("/admin/weeks/20", Some(&admin.token), guide).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/pregnancy/weeks/20", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["baby_size"], "Banana");
    assert_eq!(body["data"]["tips"], json!(["Stay hydrated"]));

    // the overview picks up the guide for the current week
    app.post("/pregnancy", Some(&mother.token), json!({ "due_date": due_in(20) }))
        .await;
    let (_, body) = app.get("/pregnancy/current", Some(&mother.token)).await;
    assert_eq!(body["data"]["week_guide"]["title"], "Halfway there");
}
