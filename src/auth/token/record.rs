//! Token record struct, expiry helpers, and builder.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Safety margin subtracted from the provider-declared lifetime.
///
/// Covers clock skew and requests that are still in flight when the token lapses.
pub const EXPIRY_MARGIN: Duration = Duration::seconds(60);

/// Current lifecycle status for a token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
	/// Token may be handed out.
	Active,
	/// Token reached its (margin-adjusted) expiry and must be refreshed.
	Expired,
}

/// Errors produced by [`TokenRecordBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum TokenRecordBuilderError {
	/// Issued when no access token value was provided, or it was empty.
	#[error("Access token is required.")]
	MissingAccessToken,
}

/// Access token issued by the identity provider together with its expiry.
#[derive(Clone)]
pub struct TokenRecord {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the token response was received.
	pub issued_at: OffsetDateTime,
	/// Instant after which the token must not be reused.
	pub expires_at: OffsetDateTime,
}
impl TokenRecord {
	/// Returns a builder that applies [`EXPIRY_MARGIN`] to the declared lifetime.
	pub fn builder() -> TokenRecordBuilder {
		TokenRecordBuilder::default()
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, instant: OffsetDateTime) -> TokenStatus {
		if instant >= self.expires_at { TokenStatus::Expired } else { TokenStatus::Active }
	}

	/// Returns `true` if the token can still be handed out at `instant`.
	pub fn is_valid_at(&self, instant: OffsetDateTime) -> bool {
		matches!(self.status_at(instant), TokenStatus::Active)
	}

	/// Remaining lifetime at `instant`, clamped to zero.
	pub fn remaining_at(&self, instant: OffsetDateTime) -> Duration {
		let remaining = self.expires_at - instant;

		if remaining.is_negative() { Duration::ZERO } else { remaining }
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}

/// Builder for [`TokenRecord`].
#[derive(Clone, Debug, Default)]
pub struct TokenRecordBuilder {
	access_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl TokenRecordBuilder {
	/// Sets the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets the lifetime declared by the provider (`expires_in`).
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Consumes the builder and produces a [`TokenRecord`].
	///
	/// Without a declared lifetime the record expires at `issued_at`: the token serves the
	/// refresh that produced it and is never reused.
	pub fn build(self) -> Result<TokenRecord, TokenRecordBuilderError> {
		let access_token = self
			.access_token
			.filter(|token| !token.expose().is_empty())
			.ok_or(TokenRecordBuilderError::MissingAccessToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let expires_at = match self.expires_in {
			Some(lifetime) => issued_at + lifetime - EXPIRY_MARGIN,
			None => issued_at,
		};

		Ok(TokenRecord { access_token, issued_at, expires_at })
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn builder_subtracts_expiry_margin() {
		let record = TokenRecord::builder()
			.access_token("secret")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::seconds(5_000_000))
			.build()
			.expect("Token record builder should support relative expiry calculations.");

		assert_eq!(
			record.expires_at,
			macros::datetime!(2025-01-01 00:00 UTC) + Duration::seconds(5_000_000 - 60)
		);
	}

	#[test]
	fn status_flips_exactly_at_expiry() {
		let record = TokenRecord::builder()
			.access_token("access")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(61))
			.build()
			.expect("Token record builder should succeed for status transitions.");

		assert_eq!(record.expires_at, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(
			record.status_at(macros::datetime!(2025-01-01 00:59:59 UTC)),
			TokenStatus::Active
		);
		assert_eq!(record.status_at(macros::datetime!(2025-01-01 01:00 UTC)), TokenStatus::Expired);
		assert!(!record.is_valid_at(macros::datetime!(2025-01-01 01:00:01 UTC)));
		assert_eq!(
			record.remaining_at(macros::datetime!(2025-01-01 00:59 UTC)),
			Duration::minutes(1)
		);
		assert_eq!(record.remaining_at(macros::datetime!(2025-01-01 02:00 UTC)), Duration::ZERO);
	}

	#[test]
	fn missing_lifetime_or_short_lifetime_is_never_reusable() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let no_lifetime = TokenRecord::builder()
			.access_token("once")
			.issued_at(issued)
			.build()
			.expect("Builder should accept records without a declared lifetime.");
		let short = TokenRecord::builder()
			.access_token("short")
			.issued_at(issued)
			.expires_in(Duration::seconds(30))
			.build()
			.expect("Builder should accept lifetimes shorter than the margin.");

		assert!(!no_lifetime.is_valid_at(issued));
		assert!(!short.is_valid_at(issued));
	}

	#[test]
	fn builder_rejects_missing_or_empty_token() {
		assert_eq!(
			TokenRecord::builder().build().expect_err("Missing token should be rejected."),
			TokenRecordBuilderError::MissingAccessToken
		);
		assert_eq!(
			TokenRecord::builder()
				.access_token("")
				.build()
				.expect_err("Empty token should be rejected."),
			TokenRecordBuilderError::MissingAccessToken
		);
	}

	#[test]
	fn debug_output_redacts_secret() {
		let record = TokenRecord::builder()
			.access_token("super-secret")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Token record builder should succeed.");

		assert!(!format!("{record:?}").contains("super-secret"));
	}
}
