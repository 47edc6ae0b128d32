#![allow(dead_code)]

// std
use std::{
	net::{IpAddr, Ipv4Addr},
	sync::Arc,
	time::Duration as StdDuration,
};
// crates.io
use httpmock::{Mock, prelude::*};
use time::macros;
// self
use twitch_streams_proxy::{
	clock::ManualClock,
	config::{Cli, Config},
	gateway::AppState,
};

pub const CLIENT_ID: &str = "proxy-client";
pub const CLIENT_SECRET: &str = "proxy-secret";
pub const TOKEN_PATH: &str = "/oauth2/token";
pub const STREAMS_PATH: &str = "/helix/streams";
pub const GAMES_PATH: &str = "/helix/games";

pub fn clock() -> ManualClock {
	ManualClock::new(macros::datetime!(2025-01-01 00:00 UTC))
}

pub fn cli(server: &MockServer) -> Cli {
	Cli {
		client_id: Some(CLIENT_ID.into()),
		client_secret: Some(CLIENT_SECRET.into()),
		host: IpAddr::V4(Ipv4Addr::LOCALHOST),
		port: 0,
		game_id: "322644".into(),
		streams_first: 5,
		game_name: "Deadlock".into(),
		igdb_id: "328663".into(),
		token_url: server.url(TOKEN_PATH),
		api_base: server.url("/helix/"),
	}
}

pub fn build_state(server: &MockServer, clock: &ManualClock) -> AppState {
	let config = Config::from_cli(cli(server)).expect("Mock server configuration should validate.");

	AppState::from_config(&config, Arc::new(clock.clone()))
		.expect("Application state should build against the mock server.")
}

pub fn build_state_with_timeout(
	server: &MockServer,
	clock: &ManualClock,
	request_timeout: StdDuration,
) -> AppState {
	let mut config =
		Config::from_cli(cli(server)).expect("Mock server configuration should validate.");

	config.request_timeout = request_timeout;

	AppState::from_config(&config, Arc::new(clock.clone()))
		.expect("Application state should build against the mock server.")
}

pub fn token_body(token: &str, expires_in: u64) -> String {
	serde_json::json!({ "access_token": token, "token_type": "bearer", "expires_in": expires_in })
		.to_string()
}

pub async fn mock_token<'a>(server: &'a MockServer, token: &str, expires_in: u64) -> Mock<'a> {
	let body = token_body(token, expires_in);

	server
		.mock_async(|when, then| {
			when.method(POST).path(TOKEN_PATH);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

pub async fn mock_streams<'a>(server: &'a MockServer, token: &str, body: &str) -> Mock<'a> {
	let authorization = format!("Bearer {token}");

	server
		.mock_async(|when, then| {
			when.method(GET)
				.path(STREAMS_PATH)
				.query_param("game_id", "322644")
				.query_param("first", "5")
				.header("client-id", CLIENT_ID)
				.header("authorization", authorization);
			then.status(200).header("content-type", "application/json").body(body);
		})
		.await
}

pub async fn mock_streams_status(server: &MockServer, status: u16) -> Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(GET).path(STREAMS_PATH);
			then.status(status).body("{\"error\":\"Service Unavailable\"}");
		})
		.await
}
