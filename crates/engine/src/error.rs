use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by an [`AutomationEngine`](crate::AutomationEngine).
///
/// Initialization errors ([`Connect`](Error::Connect), [`Launch`](Error::Launch))
/// are fatal to a test run and propagate to the harness caller untouched;
/// there is no meaningful recovery from an unreachable engine or a missing
/// browser executable at this layer.
#[derive(Debug, Error)]
pub enum Error {
	/// Establishing the engine connection failed.
	#[error("engine connection failed: {0}")]
	Connect(String),

	/// Launching the browser process failed.
	#[error("browser launch failed: {0}")]
	Launch(String),

	/// Creating a browsing context failed.
	#[error("context creation failed: {0}")]
	Context(String),

	/// Creating a page failed.
	#[error("page creation failed: {0}")]
	Page(String),

	/// The engine was driven outside its lifecycle contract or returned a
	/// malformed response.
	#[error("engine protocol error: {0}")]
	Protocol(String),
}
