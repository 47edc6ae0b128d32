//! Authenticated Helix queries (streams and games).

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	config::{GameLookupQuery, StreamQuery, TwitchEndpoints},
	error::{ConfigError, UpstreamError},
	http::{self, ReqwestHttpClient},
};

/// Ordered stream records exactly as Helix returned them.
pub type StreamRecords = Vec<Value>;

#[derive(Debug, Deserialize)]
struct HelixPage {
	#[serde(default)]
	data: Option<StreamRecords>,
}

/// Thin Helix client that attaches `Client-ID` and bearer headers to every query.
#[derive(Clone, Debug)]
pub struct HelixClient {
	http_client: ReqwestHttpClient,
	client_id: String,
	streams_url: Url,
	games_url: Url,
}
impl HelixClient {
	/// Resolves the endpoint URLs against the configured API base.
	pub fn new(
		http_client: ReqwestHttpClient,
		client_id: impl Into<String>,
		endpoints: &TwitchEndpoints,
	) -> Result<Self, ConfigError> {
		let join = |path: &str| {
			endpoints.api_base.join(path).map_err(|source| ConfigError::InvalidUrl {
				name: "TWITCH_API_BASE",
				source: Some(source),
			})
		};

		Ok(Self {
			streams_url: join("streams")?,
			games_url: join("games")?,
			http_client,
			client_id: client_id.into(),
		})
	}

	/// Fetches the live streams matching `query`.
	///
	/// A missing or `null` `data` field yields an empty list.
	pub async fn streams(
		&self,
		token: &TokenSecret,
		query: &StreamQuery,
	) -> Result<StreamRecords, UpstreamError> {
		const ENDPOINT: &str = "streams";

		let first = query.first.to_string();
		let params = [("game_id", query.game_id.as_str()), ("first", first.as_str())];
		let body = self.get(ENDPOINT, &self.streams_url, &params, token).await?;
		let page: HelixPage = parse(ENDPOINT, &body)?;

		Ok(page.data.unwrap_or_default())
	}

	/// Looks the game up by display name; returns the raw response body.
	pub async fn games_by_name(
		&self,
		token: &TokenSecret,
		query: &GameLookupQuery,
	) -> Result<Value, UpstreamError> {
		const ENDPOINT: &str = "games?name";

		let body =
			self.get(ENDPOINT, &self.games_url, &[("name", query.name.as_str())], token).await?;

		parse(ENDPOINT, &body)
	}

	/// Looks the game up by IGDB identifier; returns the raw response body.
	pub async fn games_by_igdb_id(
		&self,
		token: &TokenSecret,
		query: &GameLookupQuery,
	) -> Result<Value, UpstreamError> {
		const ENDPOINT: &str = "games?igdb_id";

		let params = [("igdb_id", query.igdb_id.as_str())];
		let body = self.get(ENDPOINT, &self.games_url, &params, token).await?;

		parse(ENDPOINT, &body)
	}

	async fn get(
		&self,
		endpoint: &'static str,
		url: &Url,
		query: &[(&str, &str)],
		token: &TokenSecret,
	) -> Result<Vec<u8>, UpstreamError> {
		let response = self
			.http_client
			.get(url.clone())
			.query(query)
			.header("Client-ID", &self.client_id)
			.bearer_auth(token.expose())
			.timeout(self.http_client.timeout())
			.send()
			.await
			.map_err(|e| UpstreamError::from_reqwest(endpoint, e))?;
		let status = response.status();
		let body = response.bytes().await.map_err(|e| UpstreamError::from_reqwest(endpoint, e))?;

		if !status.is_success() {
			let body_preview = http::body_preview(&body);

			tracing::warn!(
				endpoint,
				status = status.as_u16(),
				body = %body_preview,
				"Helix query failed."
			);

			return Err(UpstreamError::Status { endpoint, status: status.as_u16(), body_preview });
		}

		Ok(body.to_vec())
	}
}

fn parse<T>(endpoint: &'static str, body: &[u8]) -> Result<T, UpstreamError>
where
	T: for<'de> Deserialize<'de>,
{
	let mut deserializer = serde_json::Deserializer::from_slice(body);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| UpstreamError::Parse { endpoint, source })
}
