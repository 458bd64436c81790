mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::{json, Value};

fn count_of(reactions: &Value, kind: &str) -> i64 {
    reactions
        .as_array()
        .unwrap()
        .iter()
        .find(|r| r["kind"] == kind)
        .map(|r| r["count"].as_i64().unwrap())
        .unwrap_or(0)
}

#[tokio::test]
async fn group_membership_lifecycle() {
    let app = TestApp::new();
    let owner = app.mother("owner@example.com").await;
    let member = app.mother("member@example.com").await;

    let (status, body) = app
        .post(
            "/community/groups",
            Some(&owner.token),
            json!({ "name": " First-time moms ", "category": "support" }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["name"], "First-time moms");
    assert_eq!(body["data"]["member_count"], 1);
    let group = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .post(&format!("/community/groups/{}/join", group), Some(&member.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(&format!("/community/groups/{}/join", group), Some(&member.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.get(&format!("/community/groups/{}", group), Some(&member.token)).await;
    assert_eq!(body["data"]["member_count"], 2);

    let (status, body) = app
        .post(&format!("/community/groups/{}/leave", group), Some(&owner.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Group owners cannot leave their own group");

    let (status, _) = app
        .post(&format!("/community/groups/{}/leave", group), Some(&member.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = app
        .post(&format!("/community/groups/{}/leave", group), Some(&member.token), json!({}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "You are not a member of this group");

    let (_, body) = app.get(&format!("/community/groups/{}", group), Some(&member.token)).await;
    assert_eq!(body["data"]["member_count"], 1);
}

#[tokio::test]
async fn posting_into_a_group_requires_membership() {
    let app = TestApp::new();
    let owner = app.mother("owner@example.com").await;
    let outsider = app.mother("outsider@example.com").await;

    let (_, body) = app
        .post("/community/groups", Some(&owner.token), json!({ "name": "Night feeds" }))
        .await;
    let group = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .post(
            "/community/posts",
            Some(&outsider.token),
            json!({ "content": "Hello!", "group_id": group }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "You must be a member of this group to post");

    app.post(&format!("/community/groups/{}/join", group), Some(&outsider.token), json!({}))
        .await;
    let (status, _) = app
        .post(
            "/community/posts",
            Some(&outsider.token),
            json!({ "content": "Hello!", "group_id": group }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // a post outside any group is always allowed
    let (status, _) = app
        .post("/community/posts", Some(&outsider.token), json!({ "content": "Feed post" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app
        .get(&format!("/community/posts?group_id={}", group), Some(&owner.token))
        .await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = app.get("/community/posts", Some(&owner.token)).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, _) = app
        .post("/community/posts", Some(&outsider.token), json!({ "content": "   " }))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn reactions_toggle_and_switch() {
    let app = TestApp::new();
    let author = app.mother("author@example.com").await;
    let fan = app.mother("fan@example.com").await;

    let (_, body) = app
        .post("/community/posts", Some(&author.token), json!({ "content": "Week 20 today!" }))
        .await;
    let post = body["data"]["id"].as_str().unwrap().to_string();
    let path = format!("/community/posts/{}/reactions", post);

    let (status, body) = app.post(&path, Some(&fan.token), json!({ "kind": "like" })).await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["data"]["action"], "added");
    assert_eq!(count_of(&body["data"]["reactions"], "like"), 1);

    // a different kind replaces the reaction, the total stays at one
    let (_, body) = app.post(&path, Some(&fan.token), json!({ "kind": "hug" })).await;
    assert_eq!(body["data"]["action"], "changed");
    assert_eq!(count_of(&body["data"]["reactions"], "like"), 0);
    assert_eq!(count_of(&body["data"]["reactions"], "hug"), 1);
    let (_, body) = app.get(&format!("/community/posts/{}", post), Some(&fan.token)).await;
    assert_eq!(body["data"]["reaction_count"], 1);

    // the same kind again removes it
    let (_, body) = app.post(&path, Some(&fan.token), json!({ "kind": "hug" })).await;
    assert_eq!(body["data"]["action"], "removed");
    assert!(body["data"]["reactions"].as_array().unwrap().is_empty());
    let (_, body) = app.get(&format!("/community/posts/{}", post), Some(&fan.token)).await;
    assert_eq!(body["data"]["reaction_count"], 0);

    let (status, _) = app.post(&path, Some(&fan.token), json!({ "kind": "dislike" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // only the first add notified the author
    let (_, body) = app.get("/notifications", Some(&author.token)).await;
    let reactions: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .filter(|n| n["kind"] == "reaction")
        .collect();
    assert_eq!(reactions.len(), 1);
}

#[tokio::test]
async fn comments_notify_the_author_but_not_self() {
    let app = TestApp::new();
    let author = app.mother("author@example.com").await;
    let friend = app.mother("friend@example.com").await;

    let (_, body) = app
        .post("/community/posts", Some(&author.token), json!({ "content": "Any tips for sleep?" }))
        .await;
    let post = body["data"]["id"].as_str().unwrap().to_string();
    let comments = format!("/community/posts/{}/comments", post);

    let (status, _) = app
        .post(&comments, Some(&friend.token), json!({ "content": "Pillows. Lots of pillows." }))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, _) = app
        .post(&comments, Some(&author.token), json!({ "content": "Thanks!" }))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.get(&comments, Some(&friend.token)).await;
    let listed = body["data"].as_array().unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0]["content"], "Pillows. Lots of pillows.");

    let (_, body) = app.get(&format!("/community/posts/{}", post), Some(&friend.token)).await;
    assert_eq!(body["data"]["comment_count"], 2);

    let (_, body) = app.get("/notifications", Some(&author.token)).await;
    let inbox = body["data"].as_array().unwrap();
    assert_eq!(inbox.len(), 1);
    assert_eq!(inbox[0]["kind"], "comment");
    assert_eq!(inbox[0]["is_read"], false);
}

#[tokio::test]
async fn only_authors_and_admins_delete_posts() {
    let app = TestApp::new();
    let admin = app.admin("admin@example.com").await;
    let author = app.mother("author@example.com").await;
    let other = app.mother("other@example.com").await;

    let mut posts = Vec::new();
    for content in ["first", "second"] {
        let (_, body) = app
            .post("/community/posts", Some(&author.token), json!({ "content": content }))
            .await;
        posts.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let (status, _) = app
        .put(
            &format!("/community/posts/{}", posts[0]),
            Some(&other.token),
            json!({ "content": "hijacked" }),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/community/posts/{}", posts[0]), Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/community/posts/{}", posts[0]), Some(&author.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.delete(&format!("/community/posts/{}", posts[1]), Some(&admin.token)).await;
    assert_eq!(status, StatusCode::OK);

    // soft-deleted posts disappear from reads
    let (status, _) = app.get(&format!("/community/posts/{}", posts[0]), Some(&author.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.get("/community/posts", Some(&author.token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn deleted_groups_are_hidden() {
    let app = TestApp::new();
    let owner = app.mother("owner@example.com").await;
    let other = app.mother("other@example.com").await;

    let (_, body) = app
        .post("/community/groups", Some(&owner.token), json!({ "name": "Short lived" }))
        .await;
    let group = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .put(&format!("/community/groups/{}", group), Some(&other.token), json!({ "name": "Mine" }))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.delete(&format!("/community/groups/{}", group), Some(&other.token)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app.delete(&format!("/community/groups/{}", group), Some(&owner.token)).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.get(&format!("/community/groups/{}", group), Some(&owner.token)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, body) = app.get("/community/groups", Some(&owner.token)).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}
