mod common;

use std::net::SocketAddr;

use reqwest::StatusCode;
use serde_json::{Value, json};
use tokio::net::TcpListener;

use common::{Harness, new_game};
use hunt_back::{error::VERSION_CONFLICT_MESSAGE, routes, state::game::Game};

async fn serve(harness: &Harness) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = routes::router(harness.state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service()).await.unwrap();
    });
    addr
}

async fn post_save(addr: SocketAddr, action: &str, game: &Game) -> reqwest::Response {
    reqwest::Client::new()
        .post(format!("http://{addr}/games/save"))
        .json(&json!({ "action": action, "arguments": {}, "game": game }))
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn save_then_read_back_by_id_and_code() {
    let harness = Harness::new().await;
    let addr = serve(&harness).await;

    let response = post_save(addr, "Create", &new_game()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let created: Game = response.json().await.unwrap();

    let by_id: Game = reqwest::get(format!("http://{addr}/games/{}", created.id))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_id, created);

    let code = created.entry_code.clone().unwrap();
    let by_code: Game = reqwest::get(format!("http://{addr}/games/by-code/{code}"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(by_code.id, created.id);
}

#[tokio::test]
async fn stale_token_answers_409_with_a_refetch_message() {
    let harness = Harness::new().await;
    let addr = serve(&harness).await;

    let created: Game = post_save(addr, "Create", &new_game())
        .await
        .json()
        .await
        .unwrap();
    let response = post_save(addr, "UpdatePlayer", &created).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_save(addr, "UpdatePlayer", &created).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["message"], VERSION_CONFLICT_MESSAGE);
}

#[tokio::test]
async fn unknown_game_and_code_answer_404() {
    let harness = Harness::new().await;
    let addr = serve(&harness).await;

    let response = reqwest::get(format!("http://{addr}/games/{}", uuid::Uuid::new_v4()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = reqwest::get(format!("http://{addr}/games/by-code/999999"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_action_is_a_bad_request() {
    let harness = Harness::new().await;
    let addr = serve(&harness).await;

    let response = post_save(addr, "", &new_game()).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_are_bad_requests() {
    let harness = Harness::new().await;
    let addr = serve(&harness).await;
    let client = reqwest::Client::new();
    let url = format!("http://{addr}/games/save");

    let wrong_shape = client
        .post(&url)
        .json(&json!({ "action": "Create", "game": { "id": "not-a-uuid" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong_shape.status(), StatusCode::BAD_REQUEST);
    let body: Value = wrong_shape.json().await.unwrap();
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let not_json = client.post(&url).body("{").send().await.unwrap();
    assert_eq!(not_json.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn health_reports_degraded_without_storage() {
    let harness = Harness::without_store(Default::default());
    let addr = serve(&harness).await;

    let body: Value = reqwest::get(format!("http://{addr}/healthcheck"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["status"], "degraded");
}
