//! Token lifecycle manager for the proxy's single client-credentials grant.
//!
//! [`TokenManager`] keeps the current [`TokenRecord`] and the in-flight refresh marker in one
//! critical section. A caller that finds no valid token either joins the refresh that is
//! already running or starts one; every joined caller resolves from that single exchange,
//! success or failure.

mod client_credentials;
mod metrics;

pub use self::metrics::*;

// crates.io
use futures::future::{BoxFuture, Shared};
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	clock::Clock,
	config::Credentials,
	error::{AuthError, ConfigError},
	http::ReqwestHttpClient,
	oauth::ClientCredentialsFacade,
};

type RefreshFuture = Shared<BoxFuture<'static, Result<TokenSecret, AuthError>>>;

#[derive(Default)]
struct TokenState {
	record: Option<TokenRecord>,
	in_flight: Option<RefreshFuture>,
}

/// Owns the access token, its expiry, and the refresh de-duplication guard.
pub struct TokenManager {
	facade: Arc<ClientCredentialsFacade>,
	clock: Arc<dyn Clock>,
	state: Arc<Mutex<TokenState>>,
	/// Counters for refresh cycles, reuse, and joins.
	pub metrics: Arc<RefreshMetrics>,
}
impl TokenManager {
	/// Creates a manager that exchanges `credentials` at `token_endpoint`.
	pub fn new(
		credentials: &Credentials,
		token_endpoint: &Url,
		http_client: ReqwestHttpClient,
		clock: Arc<dyn Clock>,
	) -> Result<Self, ConfigError> {
		let facade = ClientCredentialsFacade::new(credentials, token_endpoint, http_client)?;

		Ok(Self {
			facade: Arc::new(facade),
			clock,
			state: Default::default(),
			metrics: Default::default(),
		})
	}

	/// Reports the cached token state at `now` without exposing the secret.
	pub fn status_at(&self, now: OffsetDateTime) -> TokenSnapshot {
		let state = self.state.lock();
		let valid = state.record.as_ref().filter(|record| record.is_valid_at(now));

		TokenSnapshot {
			valid: valid.is_some(),
			expires_in_secs: valid.map(|record| record.remaining_at(now).whole_seconds()),
			refreshing: state.in_flight.is_some(),
		}
	}

	/// Reports the cached token state using the manager's clock.
	pub fn status(&self) -> TokenSnapshot {
		self.status_at(self.clock.now())
	}
}
impl Debug for TokenManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenManager")
			.field("facade", &self.facade)
			.field("status", &self.status())
			.finish()
	}
}

/// Point-in-time view of the token cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenSnapshot {
	/// A token usable right now is cached.
	pub valid: bool,
	/// Whole seconds until the cached token stops being handed out.
	pub expires_in_secs: Option<i64>,
	/// A refresh is currently in flight.
	pub refreshing: bool,
}
