//! `acquire_token` fast path, join path, and refresh initiation.

// crates.io
use futures::FutureExt;
// self
use crate::{
	_prelude::*,
	auth::{TokenRecord, TokenSecret},
	error::AuthError,
	obs::{self, Operation, OperationSpan, Outcome},
	tokens::{RefreshFuture, RefreshMetrics, TokenManager, TokenState},
};

const OPERATION: Operation = Operation::TokenRefresh;

impl TokenManager {
	/// Returns an access token that is valid right now.
	///
	/// A cached token is returned without suspending. Otherwise the caller joins the refresh
	/// already in flight, or starts one; at most one exchange runs at a time and all of its
	/// callers observe the same outcome.
	pub async fn acquire_token(&self) -> Result<TokenSecret, AuthError> {
		let refresh = {
			let mut state = self.state.lock();
			let now = self.clock.now();

			if let Some(record) = state.record.as_ref().filter(|record| record.is_valid_at(now)) {
				self.metrics.record_reuse();
				obs::record_outcome(OPERATION, Outcome::CacheHit);

				return Ok(record.access_token.clone());
			}

			match &state.in_flight {
				Some(refresh) => {
					self.metrics.record_join();
					tracing::debug!("Joining in-flight token refresh.");

					refresh.clone()
				},
				None => {
					let refresh = self.begin_refresh();

					state.in_flight = Some(refresh.clone());

					refresh
				},
			}
		};

		refresh.await
	}

	// The exchange runs on its own task and settles the marker there, so dropping every
	// awaiting caller never strands the marker. Requires a tokio runtime.
	fn begin_refresh(&self) -> RefreshFuture {
		let facade = Arc::clone(&self.facade);
		let clock = Arc::clone(&self.clock);
		let state = Arc::clone(&self.state);
		let metrics = Arc::clone(&self.metrics);
		let span = OperationSpan::new(OPERATION, "client_credentials");
		let task = tokio::spawn(span.instrument(async move {
			tracing::info!("Refreshing Twitch token.");
			metrics.record_attempt();
			obs::record_outcome(OPERATION, Outcome::Attempt);

			let result = facade.exchange_client_credentials(clock.as_ref()).await;

			settle(&state, &metrics, result)
		}));
		let state = Arc::clone(&self.state);
		let metrics = Arc::clone(&self.metrics);

		async move {
			match task.await {
				Ok(result) => result,
				Err(e) => {
					let message = format!("token refresh task ended abnormally: {e}");

					settle(&state, &metrics, Err(AuthError::Transport { message }))
				},
			}
		}
		.boxed()
		.shared()
	}
}

fn settle(
	state: &Mutex<TokenState>,
	metrics: &RefreshMetrics,
	result: Result<TokenRecord, AuthError>,
) -> Result<TokenSecret, AuthError> {
	let mut state = state.lock();

	state.in_flight = None;

	match result {
		Ok(record) => {
			let token = record.access_token.clone();

			tracing::info!(expires_at = %record.expires_at, "Twitch token refreshed.");
			metrics.record_success();
			obs::record_outcome(OPERATION, Outcome::Success);

			state.record = Some(record);

			Ok(token)
		},
		Err(e) => {
			// The previous record stays in place; it is expired and never handed out.
			tracing::warn!(error = %e, timeout = e.is_timeout(), "Twitch token refresh failed.");
			metrics.record_failure();
			obs::record_outcome(OPERATION, Outcome::Failure);

			Err(e)
		},
	}
}
