//! wt-engine: the automation-engine seam for the wt test harness.
//!
//! The harness never talks to a concrete browser driver. It drives the
//! [`AutomationEngine`] trait, which models the black-box capability the
//! suite depends on: connect to an engine, launch one browser process, open
//! isolated browsing contexts, and create pages inside a context. Handles
//! are opaque guids; what a page can *do* (navigate, click, screenshot) is
//! the engine's business and out of this crate's scope.
//!
//! [`testing::MockEngine`] implements the trait in-process so the harness
//! lifecycle can be tested without spawning a browser.

mod error;
pub mod testing;
mod types;

pub use error::{Error, Result};
pub use types::{BrowserHandle, BrowserKind, ContextHandle, LaunchOptions, PageHandle};

use async_trait::async_trait;

/// Black-box browser automation capability consumed by the harness.
///
/// Ownership is hierarchical and enforced by the engine: a browser owns its
/// contexts and a context owns its pages, so [`close_context`](Self::close_context)
/// closes every page created within the context and
/// [`close_browser`](Self::close_browser) tears down everything beneath the
/// process. Callers are responsible for lifecycle ordering ([`connect`](Self::connect)
/// before [`launch`](Self::launch), one [`disconnect`](Self::disconnect) per
/// [`connect`](Self::connect)); engines may reject out-of-order calls with
/// [`Error::Protocol`].
#[async_trait]
pub trait AutomationEngine: Send + Sync {
	/// Establishes the connection to the engine.
	async fn connect(&self) -> Result<()>;

	/// Launches a browser process with the given options.
	async fn launch(&self, options: &LaunchOptions) -> Result<BrowserHandle>;

	/// Opens a fresh, isolated browsing context in `browser`.
	async fn new_context(&self, browser: &BrowserHandle) -> Result<ContextHandle>;

	/// Opens a new page (tab) inside `context`.
	async fn new_page(&self, context: &ContextHandle) -> Result<PageHandle>;

	/// Closes a single page.
	async fn close_page(&self, page: &PageHandle) -> Result<()>;

	/// Closes a context and every page it owns.
	async fn close_context(&self, context: &ContextHandle) -> Result<()>;

	/// Closes the browser process and everything beneath it.
	async fn close_browser(&self, browser: &BrowserHandle) -> Result<()>;

	/// Tears down the engine connection.
	async fn disconnect(&self) -> Result<()>;
}
