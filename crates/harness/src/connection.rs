//! Run-scoped ownership of the engine connection and browser process.

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info};
use wt_engine::{AutomationEngine, BrowserHandle, LaunchOptions, Result};

/// Connection and process state. Both fields are lazily populated and
/// cleared together by [`EngineConnection::close`], but tracked separately
/// so a launch failure after a successful connect does not reconnect on the
/// next attempt.
#[derive(Default)]
struct ConnState {
	connected: bool,
	browser: Option<BrowserHandle>,
}

/// Owns the single engine connection and launched browser process for a
/// whole test run.
///
/// Constructed once and shared (via [`Arc`]) by every worker; an explicit
/// handle rather than ambient static state, so the manager itself can be
/// unit-tested against isolated instances. All mutable state lives behind
/// one async mutex, and [`initialize`](Self::initialize) holds it across the
/// connect/launch round-trips: racing calls from concurrent workers always
/// resolve to exactly one live connection and one live process.
pub struct EngineConnection {
	engine: Arc<dyn AutomationEngine>,
	options: LaunchOptions,
	state: Mutex<ConnState>,
}

impl EngineConnection {
	/// Creates an uninitialized connection around `engine`.
	pub fn new(engine: Arc<dyn AutomationEngine>, options: LaunchOptions) -> Self {
		Self {
			engine,
			options,
			state: Mutex::new(ConnState::default()),
		}
	}

	/// Connects to the engine and launches the browser process, unless both
	/// already exist.
	///
	/// Idempotent: any number of calls, sequential or concurrent, leave
	/// exactly one connection and one process. Connect or launch failure is
	/// fatal to the run and propagates to the caller; nothing is retried.
	pub async fn initialize(&self) -> Result<()> {
		let mut state = self.state.lock().await;
		self.ensure_initialized(&mut state).await?;
		Ok(())
	}

	/// Returns the shared browser process handle, initializing first when
	/// necessary.
	///
	/// Never hands out a closed process: after [`close`](Self::close), the
	/// next call transparently re-establishes the connection and launches a
	/// fresh browser.
	pub async fn browser(&self) -> Result<BrowserHandle> {
		let mut state = self.state.lock().await;
		self.ensure_initialized(&mut state).await
	}

	/// Closes the browser process (if launched) and the engine connection
	/// (if established), clearing both so a later
	/// [`initialize`](Self::initialize) can recreate them.
	///
	/// Idempotent: with nothing open this is a no-op. Both teardown steps
	/// are always attempted; the first engine error (if any) is returned
	/// after the state is cleared.
	pub async fn close(&self) -> Result<()> {
		let mut state = self.state.lock().await;
		let mut first_err = None;

		if let Some(browser) = state.browser.take() {
			info!(target = "wt.connection", %browser, "closing browser process");
			if let Err(err) = self.engine.close_browser(&browser).await {
				first_err = Some(err);
			}
		}

		if state.connected {
			state.connected = false;
			debug!(target = "wt.connection", "disconnecting from automation engine");
			if let Err(err) = self.engine.disconnect().await {
				first_err.get_or_insert(err);
			}
		}

		match first_err {
			Some(err) => Err(err),
			None => Ok(()),
		}
	}

	/// Returns `true` while a live browser process is held.
	pub async fn is_initialized(&self) -> bool {
		self.state.lock().await.browser.is_some()
	}

	/// The engine this connection drives.
	pub fn engine(&self) -> &Arc<dyn AutomationEngine> {
		&self.engine
	}

	/// Launch options applied to every (re-)launch.
	pub fn options(&self) -> &LaunchOptions {
		&self.options
	}

	async fn ensure_initialized(&self, state: &mut ConnState) -> Result<BrowserHandle> {
		if !state.connected {
			debug!(target = "wt.connection", "connecting to automation engine");
			self.engine.connect().await?;
			state.connected = true;
		}

		if let Some(browser) = state.browser.as_ref() {
			return Ok(browser.clone());
		}

		info!(
			target = "wt.connection",
			kind = %self.options.kind,
			headless = self.options.headless,
			"launching browser process"
		);
		let browser = self.engine.launch(&self.options).await?;
		state.browser = Some(browser.clone());
		Ok(browser)
	}
}

#[cfg(test)]
mod tests {
	use wt_engine::testing::MockEngine;
	use wt_engine::{BrowserKind, Error};

	use super::*;

	fn connection(engine: &Arc<MockEngine>) -> EngineConnection {
		EngineConnection::new(
			Arc::clone(engine) as Arc<dyn AutomationEngine>,
			LaunchOptions::default(),
		)
	}

	#[tokio::test]
	async fn initialize_is_idempotent() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);

		for _ in 0..3 {
			conn.initialize().await.unwrap();
		}

		assert_eq!(engine.connect_count(), 1);
		assert_eq!(engine.launch_count(), 1);
		assert!(conn.is_initialized().await);
	}

	#[tokio::test]
	async fn concurrent_initialize_creates_one_connection() {
		let engine = Arc::new(MockEngine::new());
		let conn = Arc::new(connection(&engine));

		let mut tasks = tokio::task::JoinSet::new();
		for _ in 0..8 {
			let conn = Arc::clone(&conn);
			tasks.spawn(async move { conn.initialize().await });
		}
		while let Some(result) = tasks.join_next().await {
			result.unwrap().unwrap();
		}

		assert_eq!(engine.connect_count(), 1);
		assert_eq!(engine.launch_count(), 1);
	}

	#[tokio::test]
	async fn browser_lazily_initializes() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);
		assert!(!conn.is_initialized().await);

		let browser = conn.browser().await.unwrap();
		assert!(engine.is_browser_open(&browser));
		assert_eq!(engine.connect_count(), 1);
	}

	#[tokio::test]
	async fn close_then_browser_reinitializes() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);

		let first = conn.browser().await.unwrap();
		conn.close().await.unwrap();
		assert!(!conn.is_initialized().await);
		assert!(!engine.is_connected());

		let second = conn.browser().await.unwrap();
		assert_ne!(first, second);
		assert!(engine.is_browser_open(&second));
		assert_eq!(engine.connect_count(), 2);
		assert_eq!(engine.launch_count(), 2);
	}

	#[tokio::test]
	async fn double_close_is_a_noop() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);

		conn.initialize().await.unwrap();
		conn.close().await.unwrap();
		conn.close().await.unwrap();

		assert!(!engine.is_connected());
		assert_eq!(engine.launch_count(), 1);
	}

	#[tokio::test]
	async fn close_without_initialize_is_a_noop() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);
		conn.close().await.unwrap();
		assert_eq!(engine.connect_count(), 0);
	}

	#[tokio::test]
	async fn launch_failure_propagates_and_leaves_no_browser() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);

		engine.fail_next_launch();
		let err = conn.initialize().await.unwrap_err();
		assert!(matches!(err, Error::Launch(_)));
		assert!(!conn.is_initialized().await);

		// The connect survived; a retry only repeats the launch.
		conn.initialize().await.unwrap();
		assert_eq!(engine.connect_count(), 1);
		assert_eq!(engine.launch_count(), 1);
	}

	#[tokio::test]
	async fn connect_failure_propagates() {
		let engine = Arc::new(MockEngine::new());
		let conn = connection(&engine);

		engine.fail_next_connect();
		let err = conn.initialize().await.unwrap_err();
		assert!(matches!(err, Error::Connect(_)));
		assert!(!conn.is_initialized().await);
		assert!(!engine.is_connected());
	}

	#[tokio::test]
	async fn launch_options_are_forwarded() {
		let engine = Arc::new(MockEngine::new());
		let options = LaunchOptions::default()
			.with_kind(BrowserKind::Firefox)
			.with_headless(false);
		let conn = EngineConnection::new(
			Arc::clone(&engine) as Arc<dyn AutomationEngine>,
			options,
		);

		conn.initialize().await.unwrap();
		let seen = engine.last_launch_options().unwrap();
		assert_eq!(seen.kind, BrowserKind::Firefox);
		assert!(!seen.headless);
	}
}
