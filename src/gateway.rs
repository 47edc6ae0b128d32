//! HTTP gateway: axum routes over the token manager and the response cache.
//!
//! Handlers never leak the internal failure kind; any core error becomes a generic 500 with
//! a fixed message, and the real cause goes to the log.

// crates.io
use axum::{
	Json, Router,
	extract::State,
	http::StatusCode,
	response::{IntoResponse, Response},
	routing::get,
};
use tokio::net::TcpListener;
// self
use crate::{
	_prelude::*,
	cache::{CacheSnapshot, ResponseCache, Streams},
	clock::Clock,
	config::Config,
	error::ConfigError,
	helix::HelixClient,
	http::ReqwestHttpClient,
	tokens::{TokenManager, TokenSnapshot},
};

/// Body returned by `GET /`.
pub const LIVENESS_TEXT: &str = "Twitch streams proxy is running!";

const GAME_LOOKUP_NOTE: &str =
	"Use the `id` field from these results as TWITCH_GAME_ID to filter /streams.";

/// Long-lived services shared by every request.
#[derive(Clone)]
pub struct AppState {
	/// Token lifecycle manager.
	pub tokens: Arc<TokenManager>,
	/// Streams cache and game lookup.
	pub cache: Arc<ResponseCache>,
	clock: Arc<dyn Clock>,
}
impl AppState {
	/// Wires the HTTP client, token manager, Helix client, and cache from `config`.
	pub fn from_config(config: &Config, clock: Arc<dyn Clock>) -> Result<Self, ConfigError> {
		let http_client = ReqwestHttpClient::new(config.request_timeout)?;
		let tokens = Arc::new(TokenManager::new(
			&config.credentials,
			&config.endpoints.token,
			http_client.clone(),
			Arc::clone(&clock),
		)?);
		let helix =
			HelixClient::new(http_client, config.credentials.client_id.clone(), &config.endpoints)?;
		let cache = Arc::new(ResponseCache::new(
			Arc::clone(&tokens),
			helix,
			Arc::clone(&clock),
			config.cache_ttl,
			config.streams.clone(),
			config.game.clone(),
		));

		Ok(Self { tokens, cache, clock })
	}
}
impl Debug for AppState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AppState")
			.field("tokens", &self.tokens)
			.field("cache", &self.cache)
			.finish()
	}
}

/// Builds the router with all proxy routes.
pub fn router(state: AppState) -> Router {
	Router::new()
		.route("/", get(liveness))
		.route("/streams", get(streams))
		.route("/debug/game", get(debug_game))
		.route("/debug/status", get(debug_status))
		.with_state(state)
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
	F: 'static + Send + Future<Output = ()>,
{
	axum::serve(listener, router(state)).with_graceful_shutdown(shutdown).await
}

/// Generic 500 response; the cause has already been logged.
#[derive(Debug)]
pub struct GatewayError {
	message: &'static str,
}
impl GatewayError {
	fn log(route: &'static str, message: &'static str, error: Error) -> Self {
		tracing::error!(route, error = %error, "{message}.");

		Self { message }
	}
}
impl IntoResponse for GatewayError {
	fn into_response(self) -> Response {
		(StatusCode::INTERNAL_SERVER_ERROR, Json(serde_json::json!({ "error": self.message })))
			.into_response()
	}
}

#[derive(Debug, Serialize)]
struct GameLookupBody {
	#[serde(rename = "byName")]
	by_name: Value,
	#[serde(rename = "byIGDB")]
	by_igdb: Value,
	note: &'static str,
}

#[derive(Debug, Serialize)]
struct StatusBody {
	token: TokenSnapshot,
	streams: CacheSnapshot,
}

async fn liveness() -> &'static str {
	LIVENESS_TEXT
}

async fn streams(State(state): State<AppState>) -> Result<Json<Streams>, GatewayError> {
	state
		.cache
		.fetch_streams()
		.await
		.map(Json)
		.map_err(|e| GatewayError::log("/streams", "Failed to fetch streams", e))
}

async fn debug_game(State(state): State<AppState>) -> Result<Json<GameLookupBody>, GatewayError> {
	let lookup = state
		.cache
		.lookup_game_identifiers()
		.await
		.map_err(|e| GatewayError::log("/debug/game", "Failed to fetch game info", e))?;

	Ok(Json(GameLookupBody {
		by_name: lookup.by_name,
		by_igdb: lookup.by_igdb,
		note: GAME_LOOKUP_NOTE,
	}))
}

async fn debug_status(State(state): State<AppState>) -> Json<StatusBody> {
	let now = state.clock.now();

	Json(StatusBody { token: state.tokens.status_at(now), streams: state.cache.status_at(now) })
}
