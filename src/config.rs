//! Command-line and environment configuration.
//!
//! Every setting can be supplied as a flag or through the environment; the two Twitch
//! secrets have no default and their absence is fatal before any port is bound.

// std
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
// crates.io
use clap::Parser;
// self
use crate::{_prelude::*, auth::TokenSecret, error::ConfigError};

/// Upper bound applied to every outbound HTTP call.
pub const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(10);
/// Fixed freshness window for the cached streams payload.
pub const STREAMS_CACHE_TTL: Duration = Duration::seconds(60);
/// Twitch identity provider token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
/// Twitch Helix API base.
pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix/";

const CLIENT_ID_ENV: &str = "TWITCH_CLIENT_ID";
const CLIENT_SECRET_ENV: &str = "TWITCH_CLIENT_SECRET";

/// Raw command-line/environment settings.
#[derive(Clone, Debug, Parser)]
#[command(name = "twitch-streams-proxy", version, about)]
pub struct Cli {
	/// Twitch application client identifier.
	#[arg(long, env = "TWITCH_CLIENT_ID", hide_env_values = true)]
	pub client_id: Option<String>,
	/// Twitch application client secret.
	#[arg(long, env = "TWITCH_CLIENT_SECRET", hide_env_values = true)]
	pub client_secret: Option<String>,
	/// Address to bind the HTTP listener to.
	#[arg(long, env = "PROXY_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
	pub host: IpAddr,
	/// Port to bind the HTTP listener to.
	#[arg(long, env = "PORT", default_value_t = 3000)]
	pub port: u16,
	/// Helix game identifier used to filter `/streams`.
	#[arg(long, env = "TWITCH_GAME_ID", default_value = "322644")]
	pub game_id: String,
	/// Number of streams requested from Helix.
	#[arg(long, env = "TWITCH_STREAMS_FIRST", default_value_t = 5)]
	pub streams_first: u8,
	/// Display name used by the game lookup diagnostic.
	#[arg(long, env = "TWITCH_GAME_NAME", default_value = "Deadlock")]
	pub game_name: String,
	/// IGDB identifier used by the game lookup diagnostic.
	#[arg(long, env = "TWITCH_GAME_IGDB_ID", default_value = "328663")]
	pub igdb_id: String,
	/// Identity provider token endpoint.
	#[arg(long, env = "TWITCH_TOKEN_URL", default_value = DEFAULT_TOKEN_URL)]
	pub token_url: String,
	/// Helix API base URL.
	#[arg(long, env = "TWITCH_API_BASE", default_value = DEFAULT_API_BASE)]
	pub api_base: String,
}

/// Validated proxy configuration.
#[derive(Clone, Debug)]
pub struct Config {
	/// Socket address the gateway listens on.
	pub bind: SocketAddr,
	/// Client credentials for the grant and the `Client-ID` header.
	pub credentials: Credentials,
	/// Identity provider and Helix locations.
	pub endpoints: TwitchEndpoints,
	/// Filter for the cached streams query.
	pub streams: StreamQuery,
	/// Inputs for the game identifier diagnostic.
	pub game: GameLookupQuery,
	/// Upper bound for each outbound HTTP call.
	pub request_timeout: StdDuration,
	/// Freshness window for the streams cache.
	pub cache_ttl: Duration,
}
impl Config {
	/// Parses flags and environment, then validates them.
	pub fn load() -> Result<Self, ConfigError> {
		Self::from_cli(Cli::parse())
	}

	/// Validates already parsed settings.
	pub fn from_cli(cli: Cli) -> Result<Self, ConfigError> {
		let client_id = required_secret(cli.client_id, CLIENT_ID_ENV)?;
		let client_secret = required_secret(cli.client_secret, CLIENT_SECRET_ENV)?;

		if !(1..=100).contains(&cli.streams_first) {
			return Err(ConfigError::InvalidStreamsFirst { value: cli.streams_first });
		}

		let token = parse_url(&cli.token_url, "TWITCH_TOKEN_URL")?;
		let api_base = parse_base_url(&cli.api_base, "TWITCH_API_BASE")?;

		Ok(Self {
			bind: SocketAddr::new(cli.host, cli.port),
			credentials: Credentials {
				client_id: client_id.expose().to_owned(),
				client_secret,
			},
			endpoints: TwitchEndpoints { token, api_base },
			streams: StreamQuery { game_id: cli.game_id, first: cli.streams_first },
			game: GameLookupQuery { name: cli.game_name, igdb_id: cli.igdb_id },
			request_timeout: REQUEST_TIMEOUT,
			cache_ttl: STREAMS_CACHE_TTL,
		})
	}
}

/// Client identifier + secret pair.
#[derive(Clone, Debug)]
pub struct Credentials {
	/// OAuth client identifier; also sent as `Client-ID` to Helix.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
}

/// Remote endpoints the proxy talks to.
#[derive(Clone, Debug)]
pub struct TwitchEndpoints {
	/// Token endpoint for the client credentials grant.
	pub token: Url,
	/// Helix base URL; always ends with `/`.
	pub api_base: Url,
}

/// Filter applied to the streams query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StreamQuery {
	/// Helix game identifier.
	pub game_id: String,
	/// Page size.
	pub first: u8,
}

/// Inputs for the game identifier lookup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameLookupQuery {
	/// Game display name.
	pub name: String,
	/// IGDB catalog identifier.
	pub igdb_id: String,
}

fn required_secret(value: Option<String>, name: &'static str) -> Result<TokenSecret, ConfigError> {
	value
		.map(TokenSecret::from)
		.filter(|secret| !secret.is_blank())
		.ok_or(ConfigError::MissingSecret { name })
}

fn parse_url(raw: &str, name: &'static str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { name, source: Some(source) })
}

fn parse_base_url(raw: &str, name: &'static str) -> Result<Url, ConfigError> {
	let mut url = parse_url(raw, name)?;

	if url.cannot_be_a_base() {
		return Err(ConfigError::InvalidUrl { name, source: None });
	}
	if !url.path().ends_with('/') {
		let path = format!("{}/", url.path());

		url.set_path(&path);
	}

	Ok(url)
}
