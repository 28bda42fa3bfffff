//! Testing infrastructure for the wt harness.
//!
//! Provides [`MockEngine`], an in-process [`AutomationEngine`] that tracks
//! connection state, object liveness, and parentage without spawning a
//! browser. It is strict about the lifecycle contract (connect before
//! launch, no closing objects that are not open) so harness bugs surface as
//! errors instead of silently passing.
//!
//! # Example
//!
//! ```ignore
//! use wt_engine::testing::MockEngine;
//! use wt_engine::{AutomationEngine, LaunchOptions};
//!
//! #[tokio::test]
//! async fn launch_once() {
//!     let engine = MockEngine::new();
//!     engine.connect().await.unwrap();
//!     let browser = engine.launch(&LaunchOptions::default()).await.unwrap();
//!     assert!(engine.is_browser_open(&browser));
//!     assert_eq!(engine.launch_count(), 1);
//! }
//! ```

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::AutomationEngine;
use crate::error::{Error, Result};
use crate::types::{BrowserHandle, ContextHandle, LaunchOptions, PageHandle};

/// Action recorded by [`MockEngine`] for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
	/// The engine connection was established.
	Connect,
	/// A browser process was launched.
	Launch { browser: String },
	/// A browsing context was opened.
	NewContext { browser: String, context: String },
	/// A page was opened.
	NewPage { context: String, page: String },
	/// A page was closed directly.
	ClosePage { page: String },
	/// A context (and its pages) was closed.
	CloseContext { context: String },
	/// A browser process (and everything beneath it) was closed.
	CloseBrowser { browser: String },
	/// The engine connection was torn down.
	Disconnect,
}

#[derive(Default)]
struct Inner {
	connected: bool,
	next_guid: u64,
	browsers: HashSet<String>,
	/// context guid -> owning browser guid
	contexts: HashMap<String, String>,
	/// page guid -> owning context guid
	pages: HashMap<String, String>,
	/// context guid -> cookie jar, used by isolation tests
	cookies: HashMap<String, HashMap<String, String>>,
	events: Vec<EngineEvent>,
	connect_count: usize,
	launch_count: usize,
	fail_next_connect: bool,
	fail_next_launch: bool,
	fail_next_new_page: bool,
	fail_next_close_context: bool,
	last_launch_options: Option<LaunchOptions>,
}

impl Inner {
	fn next_guid(&mut self, prefix: &str) -> String {
		self.next_guid += 1;
		format!("{prefix}@{}", self.next_guid)
	}

	fn remove_context(&mut self, context: &str) {
		self.contexts.remove(context);
		self.cookies.remove(context);
		self.pages.retain(|_, parent| parent != context);
	}
}

/// In-process engine double for harness lifecycle tests.
///
/// Configure failures with `fail_next_*`, drive it through the
/// [`AutomationEngine`] trait, then assert on liveness queries and the
/// recorded [`events`](Self::events).
#[derive(Default)]
pub struct MockEngine {
	inner: Mutex<Inner>,
}

impl MockEngine {
	/// Creates a disconnected mock engine with no live objects.
	pub fn new() -> Self {
		Self::default()
	}

	/// Makes the next [`connect`](AutomationEngine::connect) call fail.
	pub fn fail_next_connect(&self) {
		self.inner.lock().fail_next_connect = true;
	}

	/// Makes the next [`launch`](AutomationEngine::launch) call fail.
	pub fn fail_next_launch(&self) {
		self.inner.lock().fail_next_launch = true;
	}

	/// Makes the next [`new_page`](AutomationEngine::new_page) call fail.
	pub fn fail_next_new_page(&self) {
		self.inner.lock().fail_next_new_page = true;
	}

	/// Makes the next [`close_context`](AutomationEngine::close_context)
	/// call fail, leaving the context open.
	pub fn fail_next_close_context(&self) {
		self.inner.lock().fail_next_close_context = true;
	}

	/// Stores a cookie in `context`'s jar. Panics if the context is not open.
	pub fn set_cookie(&self, context: &ContextHandle, name: &str, value: &str) {
		let mut inner = self.inner.lock();
		assert!(
			inner.contexts.contains_key(context.guid()),
			"set_cookie on closed context {context}"
		);
		inner
			.cookies
			.entry(context.guid().to_string())
			.or_default()
			.insert(name.to_string(), value.to_string());
	}

	/// Returns `context`'s cookie jar (empty for fresh or closed contexts).
	pub fn cookies(&self, context: &ContextHandle) -> HashMap<String, String> {
		self.inner
			.lock()
			.cookies
			.get(context.guid())
			.cloned()
			.unwrap_or_default()
	}

	/// Returns `true` while the engine connection is established.
	pub fn is_connected(&self) -> bool {
		self.inner.lock().connected
	}

	/// Returns `true` while `browser` is a live process.
	pub fn is_browser_open(&self, browser: &BrowserHandle) -> bool {
		self.inner.lock().browsers.contains(browser.guid())
	}

	/// Returns `true` while `context` is open.
	pub fn is_context_open(&self, context: &ContextHandle) -> bool {
		self.inner.lock().contexts.contains_key(context.guid())
	}

	/// Returns `true` while `page` is open.
	pub fn is_page_open(&self, page: &PageHandle) -> bool {
		self.inner.lock().pages.contains_key(page.guid())
	}

	/// Number of open contexts across all browsers.
	pub fn live_contexts(&self) -> usize {
		self.inner.lock().contexts.len()
	}

	/// Number of open pages across all contexts.
	pub fn live_pages(&self) -> usize {
		self.inner.lock().pages.len()
	}

	/// Total successful [`connect`](AutomationEngine::connect) calls.
	pub fn connect_count(&self) -> usize {
		self.inner.lock().connect_count
	}

	/// Total successful [`launch`](AutomationEngine::launch) calls.
	pub fn launch_count(&self) -> usize {
		self.inner.lock().launch_count
	}

	/// Options passed to the most recent successful launch.
	pub fn last_launch_options(&self) -> Option<LaunchOptions> {
		self.inner.lock().last_launch_options.clone()
	}

	/// Returns all recorded events, in call order.
	pub fn events(&self) -> Vec<EngineEvent> {
		self.inner.lock().events.clone()
	}
}

#[async_trait]
impl AutomationEngine for MockEngine {
	async fn connect(&self) -> Result<()> {
		let mut inner = self.inner.lock();
		if inner.fail_next_connect {
			inner.fail_next_connect = false;
			return Err(Error::Connect("injected connect failure".to_string()));
		}
		if inner.connected {
			return Err(Error::Protocol("connect while already connected".to_string()));
		}
		inner.connected = true;
		inner.connect_count += 1;
		inner.events.push(EngineEvent::Connect);
		Ok(())
	}

	async fn launch(&self, options: &LaunchOptions) -> Result<BrowserHandle> {
		let mut inner = self.inner.lock();
		if inner.fail_next_launch {
			inner.fail_next_launch = false;
			return Err(Error::Launch("injected launch failure".to_string()));
		}
		if !inner.connected {
			return Err(Error::Protocol("launch before connect".to_string()));
		}
		let guid = inner.next_guid("browser");
		inner.browsers.insert(guid.clone());
		inner.launch_count += 1;
		inner.last_launch_options = Some(options.clone());
		inner.events.push(EngineEvent::Launch { browser: guid.clone() });
		Ok(BrowserHandle::new(guid))
	}

	async fn new_context(&self, browser: &BrowserHandle) -> Result<ContextHandle> {
		let mut inner = self.inner.lock();
		if !inner.browsers.contains(browser.guid()) {
			return Err(Error::Context(format!("browser {browser} is not open")));
		}
		let guid = inner.next_guid("browser-context");
		inner.contexts.insert(guid.clone(), browser.guid().to_string());
		inner.events.push(EngineEvent::NewContext {
			browser: browser.guid().to_string(),
			context: guid.clone(),
		});
		Ok(ContextHandle::new(guid))
	}

	async fn new_page(&self, context: &ContextHandle) -> Result<PageHandle> {
		let mut inner = self.inner.lock();
		if inner.fail_next_new_page {
			inner.fail_next_new_page = false;
			return Err(Error::Page("injected page failure".to_string()));
		}
		if !inner.contexts.contains_key(context.guid()) {
			return Err(Error::Page(format!("context {context} is not open")));
		}
		let guid = inner.next_guid("page");
		inner.pages.insert(guid.clone(), context.guid().to_string());
		inner.events.push(EngineEvent::NewPage {
			context: context.guid().to_string(),
			page: guid.clone(),
		});
		Ok(PageHandle::new(guid))
	}

	async fn close_page(&self, page: &PageHandle) -> Result<()> {
		let mut inner = self.inner.lock();
		if inner.pages.remove(page.guid()).is_none() {
			return Err(Error::Protocol(format!("close of unknown page {page}")));
		}
		inner.events.push(EngineEvent::ClosePage { page: page.guid().to_string() });
		Ok(())
	}

	async fn close_context(&self, context: &ContextHandle) -> Result<()> {
		let mut inner = self.inner.lock();
		if inner.fail_next_close_context {
			inner.fail_next_close_context = false;
			return Err(Error::Protocol("injected close-context failure".to_string()));
		}
		if !inner.contexts.contains_key(context.guid()) {
			return Err(Error::Protocol(format!("close of unknown context {context}")));
		}
		inner.remove_context(context.guid());
		inner.events.push(EngineEvent::CloseContext { context: context.guid().to_string() });
		Ok(())
	}

	async fn close_browser(&self, browser: &BrowserHandle) -> Result<()> {
		let mut inner = self.inner.lock();
		if !inner.browsers.remove(browser.guid()) {
			return Err(Error::Protocol(format!("close of unknown browser {browser}")));
		}
		let owned: Vec<String> = inner
			.contexts
			.iter()
			.filter(|(_, parent)| parent.as_str() == browser.guid())
			.map(|(guid, _)| guid.clone())
			.collect();
		for context in owned {
			inner.remove_context(&context);
		}
		inner.events.push(EngineEvent::CloseBrowser { browser: browser.guid().to_string() });
		Ok(())
	}

	async fn disconnect(&self) -> Result<()> {
		let mut inner = self.inner.lock();
		if !inner.connected {
			return Err(Error::Protocol("disconnect while not connected".to_string()));
		}
		inner.connected = false;
		inner.events.push(EngineEvent::Disconnect);
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	async fn connected_browser(engine: &MockEngine) -> BrowserHandle {
		engine.connect().await.unwrap();
		engine.launch(&LaunchOptions::default()).await.unwrap()
	}

	#[tokio::test]
	async fn launch_requires_connect() {
		let engine = MockEngine::new();
		let err = engine.launch(&LaunchOptions::default()).await.unwrap_err();
		assert!(matches!(err, Error::Protocol(_)));
	}

	#[tokio::test]
	async fn close_context_cascades_to_pages() {
		let engine = MockEngine::new();
		let browser = connected_browser(&engine).await;
		let context = engine.new_context(&browser).await.unwrap();
		let page = engine.new_page(&context).await.unwrap();
		assert!(engine.is_page_open(&page));

		engine.close_context(&context).await.unwrap();
		assert!(!engine.is_context_open(&context));
		assert!(!engine.is_page_open(&page));
		assert_eq!(engine.live_pages(), 0);
	}

	#[tokio::test]
	async fn close_page_removes_only_that_page() {
		let engine = MockEngine::new();
		let browser = connected_browser(&engine).await;
		let context = engine.new_context(&browser).await.unwrap();
		let first = engine.new_page(&context).await.unwrap();
		let second = engine.new_page(&context).await.unwrap();

		engine.close_page(&first).await.unwrap();
		assert!(!engine.is_page_open(&first));
		assert!(engine.is_page_open(&second));
		assert!(engine.is_context_open(&context));
	}

	#[tokio::test]
	async fn close_browser_cascades_to_contexts() {
		let engine = MockEngine::new();
		let browser = connected_browser(&engine).await;
		let context = engine.new_context(&browser).await.unwrap();
		let page = engine.new_page(&context).await.unwrap();

		engine.close_browser(&browser).await.unwrap();
		assert!(!engine.is_browser_open(&browser));
		assert!(!engine.is_context_open(&context));
		assert!(!engine.is_page_open(&page));
	}

	#[tokio::test]
	async fn injected_launch_failure_fires_once() {
		let engine = MockEngine::new();
		engine.connect().await.unwrap();
		engine.fail_next_launch();

		let err = engine.launch(&LaunchOptions::default()).await.unwrap_err();
		assert!(matches!(err, Error::Launch(_)));
		assert_eq!(engine.launch_count(), 0);

		engine.launch(&LaunchOptions::default()).await.unwrap();
		assert_eq!(engine.launch_count(), 1);
	}

	#[tokio::test]
	async fn cookie_jars_are_per_context() {
		let engine = MockEngine::new();
		let browser = connected_browser(&engine).await;
		let a = engine.new_context(&browser).await.unwrap();
		let b = engine.new_context(&browser).await.unwrap();

		engine.set_cookie(&a, "session", "user-a");
		assert_eq!(engine.cookies(&a).get("session").map(String::as_str), Some("user-a"));
		assert!(engine.cookies(&b).is_empty());
	}

	#[tokio::test]
	async fn double_close_of_context_is_an_error() {
		let engine = MockEngine::new();
		let browser = connected_browser(&engine).await;
		let context = engine.new_context(&browser).await.unwrap();

		engine.close_context(&context).await.unwrap();
		let err = engine.close_context(&context).await.unwrap_err();
		assert!(matches!(err, Error::Protocol(_)));
	}

	#[tokio::test]
	async fn events_record_call_order() {
		let engine = MockEngine::new();
		let browser = connected_browser(&engine).await;
		let context = engine.new_context(&browser).await.unwrap();
		engine.close_context(&context).await.unwrap();
		engine.close_browser(&browser).await.unwrap();
		engine.disconnect().await.unwrap();

		let events = engine.events();
		assert_eq!(events.first(), Some(&EngineEvent::Connect));
		assert_eq!(events.last(), Some(&EngineEvent::Disconnect));
		assert_eq!(events.len(), 6);
	}
}
