//! Proxy-level error types shared by the token manager, the response cache, and startup.

// self
use crate::_prelude::*;

/// Proxy-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical proxy error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem; fatal at startup.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Identity provider refused or botched the client credentials grant.
	#[error(transparent)]
	Authentication(#[from] AuthError),
	/// Helix API answered a query with a failure.
	#[error(transparent)]
	Upstream(#[from] UpstreamError),
}

/// Configuration and validation failures raised before the proxy starts serving.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// A required secret is absent or empty.
	#[error("Required secret `{name}` is not set.")]
	MissingSecret {
		/// Environment variable carrying the secret.
		name: &'static str,
	},
	/// An endpoint URL cannot be parsed or cannot act as a base URL.
	#[error("Configured `{name}` is not a usable URL.")]
	InvalidUrl {
		/// Setting that holds the URL.
		name: &'static str,
		/// Underlying parsing failure, when one exists.
		#[source]
		source: Option<url::ParseError>,
	},
	/// The streams page size is outside the range Helix accepts.
	#[error("Streams page size must be between 1 and 100, got {value}.")]
	InvalidStreamsFirst {
		/// Rejected page size.
		value: u8,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Client credentials grant failures.
///
/// The type is [`Clone`] because a single refresh outcome is handed to every caller that
/// joined the in-flight refresh.
#[derive(Clone, Debug, ThisError)]
pub enum AuthError {
	/// Identity provider answered with a non-success status.
	#[error("Identity provider rejected the grant with status {status}: {reason}.")]
	Rejected {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// Provider-supplied error text or a body preview.
		reason: String,
	},
	/// Token endpoint answered with a success status but an unusable body.
	#[error("Token endpoint returned a malformed response: {message}.")]
	MalformedResponse {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Parser or protocol message describing the problem.
		message: String,
	},
	/// Token endpoint response carried an empty access token.
	#[error("Token endpoint response did not include an access token.")]
	MissingAccessToken,
	/// Token request exceeded its time budget.
	#[error("Token request timed out.")]
	Timeout,
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the token endpoint.")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: Arc<ReqwestError>,
	},
	/// HTTP plumbing failed before a response could be read.
	#[error("HTTP client error occurred while calling the token endpoint: {message}.")]
	Transport {
		/// Human-readable failure description.
		message: String,
	},
}
impl AuthError {
	/// Returns `true` when the failure came from the request time budget.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout)
	}
}

/// Failures returned by Helix queries.
#[derive(Debug, ThisError)]
pub enum UpstreamError {
	/// Helix answered with a non-success status.
	#[error("Helix `{endpoint}` returned status {status}.")]
	Status {
		/// Helix endpoint label.
		endpoint: &'static str,
		/// HTTP status code.
		status: u16,
		/// Preview of the response body.
		body_preview: String,
	},
	/// Helix query exceeded its time budget.
	#[error("Helix `{endpoint}` request timed out.")]
	Timeout {
		/// Helix endpoint label.
		endpoint: &'static str,
	},
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling Helix `{endpoint}`.")]
	Network {
		/// Helix endpoint label.
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: ReqwestError,
	},
	/// Helix answered with JSON that could not be parsed.
	#[error("Helix `{endpoint}` returned malformed JSON.")]
	Parse {
		/// Helix endpoint label.
		endpoint: &'static str,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl UpstreamError {
	pub(crate) fn from_reqwest(endpoint: &'static str, e: ReqwestError) -> Self {
		if e.is_timeout() {
			Self::Timeout { endpoint }
		} else {
			Self::Network { endpoint, source: e }
		}
	}

	/// Returns `true` when the failure came from the request time budget.
	pub fn is_timeout(&self) -> bool {
		matches!(self, Self::Timeout { .. })
	}
}
