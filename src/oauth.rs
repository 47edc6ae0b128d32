//! Client credentials exchange against the identity provider, built on `oauth2`.

// crates.io
use oauth2::{
	AccessToken, AuthType, Client, ClientId, ClientSecret, EndpointNotSet, EndpointSet,
	HttpClientError, RefreshToken, RequestTokenError, Scope, StandardRevocableToken,
	TokenResponse, TokenUrl,
	basic::{
		BasicErrorResponse, BasicRequestTokenError, BasicRevocationErrorResponse,
		BasicTokenIntrospectionResponse, BasicTokenType,
	},
};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenRecordBuilderError},
	clock::Clock,
	config::Credentials,
	error::{AuthError, ConfigError},
	http::{self, ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

type AppTokenClient<HasTokenUrl> = Client<
	BasicErrorResponse,
	AppAccessTokenResponse,
	BasicTokenIntrospectionResponse,
	StandardRevocableToken,
	BasicRevocationErrorResponse,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	EndpointNotSet,
	HasTokenUrl,
>;

// Anything beyond this is treated as a broken response rather than a real lifetime.
const MAX_LIFETIME_SECS: i64 = i32::MAX as i64;

/// App access token response; only `access_token` is mandatory.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct AppAccessTokenResponse {
	access_token: AccessToken,
	#[serde(
		default = "default_token_type",
		deserialize_with = "oauth2::helpers::deserialize_untagged_enum_case_insensitive"
	)]
	token_type: BasicTokenType,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	expires_in: Option<u64>,
}
impl TokenResponse for AppAccessTokenResponse {
	type TokenType = BasicTokenType;

	fn access_token(&self) -> &AccessToken {
		&self.access_token
	}

	fn token_type(&self) -> &BasicTokenType {
		&self.token_type
	}

	fn expires_in(&self) -> Option<StdDuration> {
		self.expires_in.map(StdDuration::from_secs)
	}

	fn refresh_token(&self) -> Option<&RefreshToken> {
		None
	}

	fn scopes(&self) -> Option<&Vec<Scope>> {
		None
	}
}

fn default_token_type() -> BasicTokenType {
	BasicTokenType::Bearer
}

/// Performs the `client_credentials` grant with credentials sent in the request body.
pub(crate) struct ClientCredentialsFacade {
	oauth_client: AppTokenClient<EndpointSet>,
	http_client: ReqwestHttpClient,
}
impl ClientCredentialsFacade {
	pub(crate) fn new(
		credentials: &Credentials,
		token_endpoint: &Url,
		http_client: ReqwestHttpClient,
	) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(token_endpoint.to_string()).map_err(|source| {
			ConfigError::InvalidUrl { name: "TWITCH_TOKEN_URL", source: Some(source) }
		})?;
		let oauth_client =
			AppTokenClient::<EndpointNotSet>::new(ClientId::new(credentials.client_id.clone()))
				.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
				.set_token_uri(token_url)
				.set_auth_type(AuthType::RequestBody);

		Ok(Self { oauth_client, http_client })
	}

	/// Exchanges the client credentials for a fresh [`TokenRecord`].
	///
	/// `issued_at` is stamped from `clock` once the response arrives.
	pub(crate) async fn exchange_client_credentials(
		&self,
		clock: &dyn Clock,
	) -> Result<TokenRecord, AuthError> {
		let meta = ResponseMetadataSlot::default();
		let instrumented = self.http_client.instrumented(meta.clone());
		let response = self
			.oauth_client
			.exchange_client_credentials()
			.request_async(&instrumented)
			.await
			.map_err(|err| map_request_error(meta.take(), err))?;
		let mut builder = TokenRecord::builder()
			.access_token(response.access_token().secret().to_owned())
			.issued_at(clock.now());

		if let Some(lifetime) = response.expires_in() {
			let secs = i64::try_from(lifetime.as_secs())
				.ok()
				.filter(|secs| *secs <= MAX_LIFETIME_SECS)
				.ok_or_else(|| AuthError::MalformedResponse {
					status: Some(200),
					message: "expires_in exceeds the supported range".into(),
				})?;

			builder = builder.expires_in(Duration::seconds(secs));
		}

		builder.build().map_err(|err| match err {
			TokenRecordBuilderError::MissingAccessToken => AuthError::MissingAccessToken,
		})
	}
}
impl Debug for ClientCredentialsFacade {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsFacade")
			.field("client_id", self.oauth_client.client_id())
			.field("token_url", &self.oauth_client.token_uri().as_str())
			.finish()
	}
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> AuthError {
	let status = meta.and_then(|value| value.status);
	let rejected = status.filter(|code| !(200..300).contains(code));

	match err {
		RequestTokenError::ServerResponse(response) => {
			let reason = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error().as_ref()),
				None => response.error().as_ref().to_owned(),
			};

			AuthError::Rejected { status: status.unwrap_or(400), reason }
		},
		RequestTokenError::Request(error) => map_transport_error(error),
		RequestTokenError::Parse(error, body) => match rejected {
			Some(status) => AuthError::Rejected { status, reason: http::body_preview(&body) },
			None => AuthError::MalformedResponse { status, message: error.to_string() },
		},
		RequestTokenError::Other(message) => match rejected {
			Some(status) => AuthError::Rejected { status, reason: message },
			None => AuthError::MalformedResponse { status, message },
		},
	}
}

fn map_transport_error(err: HttpClientError<ReqwestError>) -> AuthError {
	match err {
		HttpClientError::Reqwest(inner) if inner.is_timeout() => AuthError::Timeout,
		HttpClientError::Reqwest(inner) => AuthError::Network { source: Arc::new(*inner) },
		HttpClientError::Http(inner) => AuthError::Transport { message: inner.to_string() },
		HttpClientError::Io(inner) => AuthError::Transport { message: inner.to_string() },
		HttpClientError::Other(message) => AuthError::Transport { message },
		_ => AuthError::Transport { message: "unknown HTTP client failure".into() },
	}
}
