// crates.io
use tracing::{Instrument, instrument::Instrumented};
use tracing_subscriber::{EnvFilter, fmt};
// self
use crate::{_prelude::*, obs::Operation};

/// Span wrapper used around every networked operation.
#[derive(Clone, Debug)]
pub struct OperationSpan {
	span: tracing::Span,
}
impl OperationSpan {
	/// Creates a new span tagged with the provided operation + stage.
	pub fn new(operation: Operation, stage: &'static str) -> Self {
		let span =
			tracing::info_span!("twitch_proxy.operation", operation = operation.as_str(), stage);

		Self { span }
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}

/// Installs the global fmt subscriber, filtered by `RUST_LOG` (defaults to `info`).
///
/// Calling it twice is harmless; the second install is ignored.
pub fn init_tracing() {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
	let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrument_wraps_future() {
		let span = OperationSpan::new(Operation::Streams, "instrument_wraps_future");
		let value = OperationSpan::instrument(&span, async { 42 }).await;

		assert_eq!(value, 42);
	}

	#[test]
	fn init_tracing_is_idempotent() {
		init_tracing();
		init_tracing();
	}
}
