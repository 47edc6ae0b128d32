mod common;

// crates.io
use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use httpmock::prelude::*;
use serde_json::Value;
use tower::ServiceExt;
// self
use common::*;
use twitch_streams_proxy::gateway::{self, LIVENESS_TEXT};

async fn get(router: &Router, uri: &str) -> (StatusCode, Vec<u8>) {
	let request = Request::builder()
		.uri(uri)
		.body(Body::empty())
		.expect("Test request should build.");
	let response =
		router.clone().oneshot(request).await.expect("Router should always produce a response.");
	let status = response.status();
	let bytes = body::to_bytes(response.into_body(), usize::MAX)
		.await
		.expect("Response body should be readable.");

	(status, bytes.to_vec())
}

fn json(bytes: &[u8]) -> Value {
	serde_json::from_slice(bytes).expect("Response body should be JSON.")
}

#[tokio::test]
async fn root_reports_liveness() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let (status, body) = get(&router, "/").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body, LIVENESS_TEXT.as_bytes());
}

#[tokio::test]
async fn streams_route_serves_cached_array() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let token = mock_token(&server, "route-token", 3600).await;
	let streams = mock_streams(&server, "route-token", r#"{"data":[{"id":"1"}]}"#).await;
	let (status, body) = get(&router, "/streams").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(json(&body), serde_json::json!([{ "id": "1" }]));

	let (status, repeat) = get(&router, "/streams").await;

	assert_eq!(status, StatusCode::OK);
	assert_eq!(repeat, body);

	token.assert_calls_async(1).await;
	streams.assert_calls_async(1).await;
}

#[tokio::test]
async fn streams_route_hides_token_failure() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let _token = server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(400)
				.header("content-type", "application/json")
				.body("{\"error\":\"invalid_client\",\"error_description\":\"bad secret\"}");
		})
		.await;
	let (status, body) = get(&router, "/streams").await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json(&body), serde_json::json!({ "error": "Failed to fetch streams" }));
}

#[tokio::test]
async fn streams_route_hides_upstream_failure() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let _token = mock_token(&server, "route-token", 3600).await;
	let _streams = mock_streams_status(&server, 503).await;
	let (status, body) = get(&router, "/streams").await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json(&body), serde_json::json!({ "error": "Failed to fetch streams" }));
}

#[tokio::test]
async fn debug_game_returns_both_lookups() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let _token = mock_token(&server, "route-token", 3600).await;
	let _by_name = server
		.mock_async(|when, then| {
			when.method(GET).path(GAMES_PATH).query_param("name", "Deadlock");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"data":[{"id":"1234","name":"Deadlock"}]}"#);
		})
		.await;
	let _by_igdb = server
		.mock_async(|when, then| {
			when.method(GET).path(GAMES_PATH).query_param("igdb_id", "328663");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"data":[{"id":"1234","igdb_id":"328663"}]}"#);
		})
		.await;
	let (status, body) = get(&router, "/debug/game").await;
	let body = json(&body);

	assert_eq!(status, StatusCode::OK);
	assert_eq!(body["byName"]["data"][0]["name"], "Deadlock");
	assert_eq!(body["byIGDB"]["data"][0]["igdb_id"], "328663");
	assert!(body["note"].as_str().is_some_and(|note| note.contains("TWITCH_GAME_ID")));
}

#[tokio::test]
async fn debug_game_hides_failure() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let _token = mock_token(&server, "route-token", 3600).await;
	let _games = server
		.mock_async(|when, then| {
			when.method(GET).path(GAMES_PATH);
			then.status(500).body("boom");
		})
		.await;
	let (status, body) = get(&router, "/debug/game").await;

	assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
	assert_eq!(json(&body), serde_json::json!({ "error": "Failed to fetch game info" }));
}

#[tokio::test]
async fn debug_status_reports_token_and_cache() {
	let server = MockServer::start_async().await;
	let router = gateway::router(build_state(&server, &clock()));
	let (_, before) = get(&router, "/debug/status").await;
	let before = json(&before);

	assert_eq!(before["token"]["valid"], false);
	assert_eq!(before["streams"]["populated"], false);

	let _token = mock_token(&server, "route-token", 3600).await;
	let _streams = mock_streams(&server, "route-token", r#"{"data":[{"id":"1"}]}"#).await;

	get(&router, "/streams").await;

	let (status, after) = get(&router, "/debug/status").await;
	let after = json(&after);

	assert_eq!(status, StatusCode::OK);
	assert_eq!(after["token"]["valid"], true);
	assert_eq!(after["token"]["expiresInSecs"], 3540);
	assert_eq!(after["token"]["refreshing"], false);
	assert_eq!(after["streams"]["fresh"], true);
	assert_eq!(after["streams"]["records"], 1);
	assert_eq!(after["streams"]["expiresInSecs"], 60);
	assert!(!after.to_string().contains("route-token"));
}
