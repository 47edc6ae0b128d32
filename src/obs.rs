//! Observability helpers shared by the token manager, the cache, and the gateway.
//!
//! # Feature Flags
//!
//! - Spans are always emitted as `twitch_proxy.operation` with the `operation` and `stage`
//!   fields.
//! - Enable `metrics` to increment the `twitch_proxy_operation_total` counter for every
//!   attempt/cache hit/success/failure, labeled by `operation` + `outcome`.

mod metrics;
mod tracing;

pub use self::{metrics::*, tracing::*};

// self
use crate::_prelude::*;

/// Operations observed by the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
	/// Client credentials grant against the identity provider.
	TokenRefresh,
	/// Cached streams query.
	Streams,
	/// Uncached game identifier lookup.
	GameLookup,
}
impl Operation {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Operation::TokenRefresh => "token_refresh",
			Operation::Streams => "streams",
			Operation::GameLookup => "game_lookup",
		}
	}
}
impl Display for Operation {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
	/// Work that needs the network started.
	Attempt,
	/// Answer came from memory without touching the network.
	CacheHit,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::CacheHit => "cache_hit",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
