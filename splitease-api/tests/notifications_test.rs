//! Notification inbox, de-duplication and the event stream.

mod common;

use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use common::{group_id, TestContext};
use futures::StreamExt;
use serde_json::{json, Value};
use tower::ServiceExt;

fn messages(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|n| n["message"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_join_notifies_member_and_group() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let ana = ctx.register("Ana").await;
    let luis = ctx.register("Luis").await;

    let group = ctx.create_group(&ana, "Trip").await;
    ctx.join(&luis, &group).await;

    let (status, inbox) = ctx.get("/notifications", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert!(messages(&inbox).contains(&"Luis se unió al grupo \"Trip\"".to_string()));

    let joined = inbox
        .as_array()
        .unwrap()
        .iter()
        .find(|n| n["kind"] == "invitacion")
        .unwrap();
    assert_eq!(joined["link"], format!("/groups/{}", group_id(&group)));
    assert_eq!(joined["read"], false);

    let (_, inbox) = ctx.get("/notifications", &luis).await;
    assert!(messages(&inbox).contains(&"Te uniste al grupo \"Trip\"".to_string()));
}

#[tokio::test]
async fn test_identical_notification_is_suppressed() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let ana = ctx.register("Ana").await;
    let body = json!({ "kind": "cambio_saldo", "message": "Recordatorio", "link": "/groups/1" });

    let (status, first) = ctx.post("/notifications", &ana, body.clone()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(first["created"], true);

    let (status, second) = ctx.post("/notifications", &ana, body.clone()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second, json!({ "isDuplicate": true }));

    let (_, count) = ctx.get("/notifications/unread-count", &ana).await;
    assert_eq!(count["count"], 1);

    // Once read it no longer blocks a new one
    let id = first["notification"]["id"].as_i64().unwrap();
    let (status, read) = ctx
        .put(&format!("/notifications/{}/read", id), &ana, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["read"], true);
    assert!(read["read_at"].is_string());

    let (status, _) = ctx.post("/notifications", &ana, body).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_inbox_operations_are_owner_scoped() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let ana = ctx.register("Ana").await;
    let eva = ctx.register("Eva").await;

    for message in ["uno", "dos", "tres"] {
        let (status, _) = ctx
            .post(
                "/notifications",
                &ana,
                json!({ "kind": "invitacion", "message": message }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (_, inbox) = ctx.get("/notifications", &ana).await;
    let first_id = inbox[0]["id"].as_i64().unwrap();

    let (status, _) = ctx.get(&format!("/notifications/{}", first_id), &eva).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = ctx.delete(&format!("/notifications/{}", first_id), &eva).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx
        .put(&format!("/notifications/{}/read", first_id), &ana, None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, unread) = ctx.get("/notifications?unread=true", &ana).await;
    assert_eq!(unread.as_array().unwrap().len(), 2);

    let (status, marked) = ctx.put("/notifications/read-all", &ana, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(marked["count"], 2);

    let (status, deleted) = ctx.delete("/notifications/read", &ana).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(deleted["count"], 3);

    let (_, inbox) = ctx.get("/notifications", &ana).await;
    assert!(inbox.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_stream_sends_connected_then_unread() {
    let Some(ctx) = TestContext::new().await else {
        return;
    };

    let ana = ctx.register("Ana").await;
    for message in ["Cena", "Taxi"] {
        let (status, _) = ctx
            .post(
                "/notifications",
                &ana,
                json!({ "kind": "gasto_agregado", "message": message }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    // EventSource clients pass the token in the query string
    let request = Request::builder()
        .uri(format!("/notifications/stream?token={}", ana.token))
        .body(Body::empty())
        .unwrap();
    let response = ctx.app.clone().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));

    let mut frames = response.into_body().into_data_stream();
    let mut received = String::new();

    tokio::time::timeout(Duration::from_secs(10), async {
        while received.matches("data:").count() < 2 {
            let chunk = frames.next().await.unwrap().unwrap();
            received.push_str(&String::from_utf8_lossy(&chunk));
        }
    })
    .await
    .expect("stream should deliver unread notifications");

    assert!(received.starts_with(": connected"));

    // One JSON object per frame
    let mut delivered: Vec<String> = received
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| {
            let value: Value = serde_json::from_str(data.trim()).unwrap();
            assert!(value.is_object());
            value["message"].as_str().unwrap().to_string()
        })
        .collect();
    delivered.sort();
    assert_eq!(delivered, vec!["Cena", "Taxi"]);
}
