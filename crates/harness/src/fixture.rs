//! Per-test fixture: open a session on start, reclaim it on finish.

use std::sync::Arc;

use wt_engine::{ContextHandle, Error, PageHandle, Result};

use crate::registry::{SessionRegistry, WorkerId};

/// Scoped browser session for one test body.
///
/// The setup/teardown pair test cases are written against:
/// [`start`](Self::start) creates the worker's context and page (lazily
/// initializing the shared connection), [`finish`](Self::finish) closes
/// them. If a test aborts without calling `finish`, the harness can still
/// reclaim the session through [`SessionRegistry::close_context`], which is
/// safe on any path.
pub struct TestSession {
	registry: Arc<SessionRegistry>,
	worker: WorkerId,
	context: ContextHandle,
	page: PageHandle,
}

impl TestSession {
	/// Opens a fresh session for `worker`.
	pub async fn start(registry: Arc<SessionRegistry>, worker: impl Into<WorkerId>) -> Result<Self> {
		let worker = worker.into();
		let page = registry.create_page(&worker).await?;
		let context = registry.browser_context(&worker).ok_or_else(|| {
			Error::Protocol(format!("session for worker {worker} vanished during setup"))
		})?;
		Ok(Self {
			registry,
			worker,
			context,
			page,
		})
	}

	/// Identity of the worker this session belongs to.
	pub fn worker(&self) -> &WorkerId {
		&self.worker
	}

	/// The page the test body drives.
	pub fn page(&self) -> &PageHandle {
		&self.page
	}

	/// The isolated context owning the page.
	pub fn context(&self) -> &ContextHandle {
		&self.context
	}

	/// Closes the session's context and page.
	pub async fn finish(self) -> Result<()> {
		self.registry.close_context(&self.worker).await
	}
}

#[cfg(test)]
mod tests {
	use wt_engine::testing::MockEngine;
	use wt_engine::{AutomationEngine, LaunchOptions};

	use super::*;
	use crate::connection::EngineConnection;

	fn registry(engine: &Arc<MockEngine>) -> Arc<SessionRegistry> {
		let connection = Arc::new(EngineConnection::new(
			Arc::clone(engine) as Arc<dyn AutomationEngine>,
			LaunchOptions::default(),
		));
		Arc::new(SessionRegistry::new(connection))
	}

	#[tokio::test]
	async fn start_and_finish_reclaim_the_session() {
		let engine = Arc::new(MockEngine::new());
		let registry = registry(&engine);

		let session = TestSession::start(Arc::clone(&registry), "w1").await.unwrap();
		let context = session.context().clone();
		assert!(engine.is_context_open(&context));
		assert!(engine.is_page_open(session.page()));
		assert_eq!(registry.active_sessions(), 1);

		session.finish().await.unwrap();
		assert!(!engine.is_context_open(&context));
		assert_eq!(registry.active_sessions(), 0);
	}

	#[tokio::test]
	async fn abandoned_session_is_reclaimed_by_defensive_teardown() {
		let engine = Arc::new(MockEngine::new());
		let registry = registry(&engine);

		let session = TestSession::start(Arc::clone(&registry), "w1").await.unwrap();
		let worker = session.worker().clone();
		drop(session);

		// The harness teardown path runs unconditionally.
		registry.close_context(&worker).await.unwrap();
		assert_eq!(engine.live_contexts(), 0);
	}
}
