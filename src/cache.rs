//! Response cache for the streams query, plus the uncached game lookup diagnostic.
//!
//! The cached payload and its expiry are replaced together under one lock. A failed
//! upstream query never touches the slot, so the last good payload survives until the next
//! success overwrites it.

// std
use std::sync::atomic::{AtomicU64, Ordering};
// self
use crate::{
	_prelude::*,
	clock::Clock,
	config::{GameLookupQuery, StreamQuery},
	helix::{HelixClient, StreamRecords},
	obs::{self, Operation, OperationSpan, Outcome},
	tokens::TokenManager,
};

/// Shared, immutable streams payload.
pub type Streams = Arc<StreamRecords>;

/// Last successful streams payload and the instant it stops being served.
#[derive(Clone, Debug)]
pub struct CachedStreams {
	/// Ordered records as returned by Helix.
	pub payload: Streams,
	/// Instant after which the payload must not be served.
	pub expires_at: OffsetDateTime,
}
impl CachedStreams {
	/// Returns `true` if the payload can be served at `instant`.
	pub fn is_fresh_at(&self, instant: OffsetDateTime) -> bool {
		instant < self.expires_at
	}
}

/// Both raw game lookup responses, for picking the right streams filter.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct GameLookup {
	/// Response of `games?name=`.
	pub by_name: Value,
	/// Response of `games?igdb_id=`.
	pub by_igdb: Value,
}

/// Caches the streams query for a fixed window and serves the game lookup.
pub struct ResponseCache {
	tokens: Arc<TokenManager>,
	helix: HelixClient,
	clock: Arc<dyn Clock>,
	ttl: Duration,
	streams_query: StreamQuery,
	game_query: GameLookupQuery,
	slot: Mutex<Option<CachedStreams>>,
	/// Hit/miss/failure counters.
	pub metrics: Arc<CacheMetrics>,
}
impl ResponseCache {
	/// Creates an empty cache.
	pub fn new(
		tokens: Arc<TokenManager>,
		helix: HelixClient,
		clock: Arc<dyn Clock>,
		ttl: Duration,
		streams_query: StreamQuery,
		game_query: GameLookupQuery,
	) -> Self {
		Self {
			tokens,
			helix,
			clock,
			ttl,
			streams_query,
			game_query,
			slot: Default::default(),
			metrics: Default::default(),
		}
	}

	/// Returns the cached streams while fresh, otherwise queries Helix and caches the result.
	pub async fn fetch_streams(&self) -> Result<Streams> {
		const OPERATION: Operation = Operation::Streams;

		if let Some(payload) = self.fresh_streams_at(self.clock.now()) {
			self.metrics.record_hit();
			obs::record_outcome(OPERATION, Outcome::CacheHit);
			tracing::debug!(records = payload.len(), "Serving cached streams.");

			return Ok(payload);
		}

		let span = OperationSpan::new(OPERATION, "fetch_streams");
		let result: Result<Streams> = span
			.instrument(async {
				self.metrics.record_miss();
				obs::record_outcome(OPERATION, Outcome::Attempt);

				let token = self.tokens.acquire_token().await?;

				tracing::info!(
					game_id = %self.streams_query.game_id,
					"Fetching streams from Helix."
				);

				let payload = Arc::new(self.helix.streams(&token, &self.streams_query).await?);

				*self.slot.lock() = Some(CachedStreams {
					payload: Arc::clone(&payload),
					expires_at: self.clock.now() + self.ttl,
				});

				Ok(payload)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => {
				self.metrics.record_failure();
				obs::record_outcome(OPERATION, Outcome::Failure);
			},
		}

		result
	}

	/// Looks the configured game up by name and by IGDB id concurrently.
	///
	/// Never reads or writes the streams cache.
	pub async fn lookup_game_identifiers(&self) -> Result<GameLookup> {
		const OPERATION: Operation = Operation::GameLookup;

		let span = OperationSpan::new(OPERATION, "lookup_game_identifiers");
		let result: Result<GameLookup> = span
			.instrument(async {
				obs::record_outcome(OPERATION, Outcome::Attempt);

				let token = self.tokens.acquire_token().await?;
				let (by_name, by_igdb) = futures::try_join!(
					self.helix.games_by_name(&token, &self.game_query),
					self.helix.games_by_igdb_id(&token, &self.game_query),
				)?;

				Ok(GameLookup { by_name, by_igdb })
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_) => obs::record_outcome(OPERATION, Outcome::Failure),
		}

		result
	}

	/// Returns the cached payload if it is still fresh at `now`.
	pub fn fresh_streams_at(&self, now: OffsetDateTime) -> Option<Streams> {
		self.slot
			.lock()
			.as_ref()
			.filter(|cached| cached.is_fresh_at(now))
			.map(|cached| Arc::clone(&cached.payload))
	}

	/// Returns the last stored entry regardless of freshness.
	pub fn last_cached(&self) -> Option<CachedStreams> {
		self.slot.lock().clone()
	}

	/// Reports the cache state at `now`.
	pub fn status_at(&self, now: OffsetDateTime) -> CacheSnapshot {
		let slot = self.slot.lock();

		match slot.as_ref() {
			Some(cached) => CacheSnapshot {
				populated: true,
				fresh: cached.is_fresh_at(now),
				records: cached.payload.len(),
				expires_in_secs: cached
					.is_fresh_at(now)
					.then(|| (cached.expires_at - now).whole_seconds()),
			},
			None => CacheSnapshot::default(),
		}
	}

	/// Reports the cache state using the cache's clock.
	pub fn status(&self) -> CacheSnapshot {
		self.status_at(self.clock.now())
	}
}
impl Debug for ResponseCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ResponseCache")
			.field("ttl", &self.ttl)
			.field("streams_query", &self.streams_query)
			.field("status", &self.status())
			.finish()
	}
}

/// Point-in-time view of the streams cache.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheSnapshot {
	/// A payload has been stored at least once.
	pub populated: bool,
	/// The stored payload is still served.
	pub fresh: bool,
	/// Number of records in the stored payload.
	pub records: usize,
	/// Whole seconds until the payload stops being served.
	pub expires_in_secs: Option<i64>,
}

/// Thread-safe counters for the streams cache.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	misses: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Returns how often a fresh payload was served from memory.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns how often the cache had to go upstream.
	pub fn misses(&self) -> u64 {
		self.misses.load(Ordering::Relaxed)
	}

	/// Returns how many upstream refreshes failed.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	fn record_miss(&self) {
		self.misses.fetch_add(1, Ordering::Relaxed);
	}

	fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn cached_streams_expire_at_boundary() {
		let cached = CachedStreams {
			payload: Arc::new(vec![serde_json::json!({ "id": "1" })]),
			expires_at: macros::datetime!(2025-01-01 00:01 UTC),
		};

		assert!(cached.is_fresh_at(macros::datetime!(2025-01-01 00:00:59 UTC)));
		assert!(!cached.is_fresh_at(macros::datetime!(2025-01-01 00:01 UTC)));
	}

	#[test]
	fn game_lookup_serializes_raw_bodies() {
		let lookup = GameLookup {
			by_name: serde_json::json!({ "data": [{ "id": "322644" }] }),
			by_igdb: serde_json::json!({ "data": [] }),
		};
		let value = serde_json::to_value(&lookup).expect("Lookup should serialize.");

		assert_eq!(value["by_name"]["data"][0]["id"], "322644");
		assert_eq!(value["by_igdb"]["data"], serde_json::json!([]));
	}
}
