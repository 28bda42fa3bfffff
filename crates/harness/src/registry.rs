//! Per-worker session registry: one isolated context/page pair per worker.
//!
//! Replaces thread-local session scoping with an explicit map keyed by
//! worker identity. Entries are partitioned by key, so no cross-worker
//! locking is needed; the shared connection is guarded inside
//! [`EngineConnection`].

use std::fmt;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};
use wt_engine::{ContextHandle, PageHandle, Result};

use crate::connection::EngineConnection;

/// Identity of an execution unit: a thread or worker running exactly one
/// test at a time. Keys the per-worker session state.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkerId(Arc<str>);

impl WorkerId {
	pub fn new(id: impl Into<Arc<str>>) -> Self {
		Self(id.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl From<&str> for WorkerId {
	fn from(id: &str) -> Self {
		Self::new(id)
	}
}

impl From<String> for WorkerId {
	fn from(id: String) -> Self {
		Self::new(id)
	}
}

impl fmt::Display for WorkerId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

/// Context/page pair owned exclusively by one worker. The context owns the
/// page; both are reclaimed together.
struct WorkerSession {
	context: ContextHandle,
	page: PageHandle,
}

/// Hands each worker its own browsing context and page from the shared
/// browser process.
///
/// One worker's in-flight session is never visible, readable, or closable
/// through another worker's identity; that partitioning is what keeps
/// concurrently running tests from cross-talking.
pub struct SessionRegistry {
	connection: Arc<EngineConnection>,
	sessions: DashMap<WorkerId, WorkerSession>,
}

impl SessionRegistry {
	/// Creates an empty registry on top of `connection`.
	pub fn new(connection: Arc<EngineConnection>) -> Self {
		Self {
			connection,
			sessions: DashMap::new(),
		}
	}

	/// The shared connection backing every session.
	pub fn connection(&self) -> &Arc<EngineConnection> {
		&self.connection
	}

	/// Creates a fresh context and page for `worker` and returns the page.
	///
	/// Initializes the shared connection first if no browser is live yet.
	/// Returns only once both context and page exist, so the test body can
	/// proceed immediately.
	///
	/// The harness is expected to call [`close_context`](Self::close_context)
	/// between tests; a session left open by a previous test on the same
	/// worker is closed here first (with a warning) rather than silently
	/// leaked.
	pub async fn create_page(&self, worker: &WorkerId) -> Result<PageHandle> {
		// Clone the stale handle out instead of holding a map reference
		// across the close await. The entry is dropped only once the close
		// succeeds, so a failed close leaves the session reclaimable
		// through close_context.
		let stale = self.sessions.get(worker).map(|session| session.context.clone());
		if let Some(stale) = stale {
			warn!(
				target = "wt.registry",
				%worker,
				context = %stale,
				"previous session still open; closing it before creating a new one"
			);
			self.connection.engine().close_context(&stale).await?;
			self.sessions.remove(worker);
		}

		let browser = self.connection.browser().await?;
		let engine = self.connection.engine();

		let context = engine.new_context(&browser).await?;
		let page = match engine.new_page(&context).await {
			Ok(page) => page,
			Err(err) => {
				// Reclaim the half-built session; the page error is the one
				// worth reporting.
				let _ = engine.close_context(&context).await;
				return Err(err);
			}
		};

		debug!(
			target = "wt.registry",
			%worker,
			%context,
			%page,
			"session created"
		);
		self.sessions.insert(
			worker.clone(),
			WorkerSession {
				context: context.clone(),
				page: page.clone(),
			},
		);
		Ok(page)
	}

	/// Returns the context currently associated with `worker`, if any.
	pub fn browser_context(&self, worker: &WorkerId) -> Option<ContextHandle> {
		self.sessions.get(worker).map(|session| session.context.clone())
	}

	/// Returns the page currently associated with `worker`, if any.
	pub fn page(&self, worker: &WorkerId) -> Option<PageHandle> {
		self.sessions.get(worker).map(|session| session.page.clone())
	}

	/// Closes `worker`'s context (which closes its page) and drops the
	/// association.
	///
	/// A no-op when the worker has no open session, so failure and
	/// cancellation paths can call it unconditionally, even when
	/// [`create_page`](Self::create_page) never ran.
	pub async fn close_context(&self, worker: &WorkerId) -> Result<()> {
		let Some((_, session)) = self.sessions.remove(worker) else {
			debug!(target = "wt.registry", %worker, "no session to close");
			return Ok(());
		};

		self.connection.engine().close_context(&session.context).await?;
		debug!(
			target = "wt.registry",
			%worker,
			context = %session.context,
			"session closed"
		);
		Ok(())
	}

	/// Number of workers currently holding a live session.
	pub fn active_sessions(&self) -> usize {
		self.sessions.len()
	}
}
