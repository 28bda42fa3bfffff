//! Launch configuration and guid-addressed engine handles.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Browser engine to launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
	#[default]
	Chromium,
	Firefox,
	Webkit,
}

impl fmt::Display for BrowserKind {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			BrowserKind::Chromium => "chromium",
			BrowserKind::Firefox => "firefox",
			BrowserKind::Webkit => "webkit",
		};
		write!(f, "{name}")
	}
}

impl FromStr for BrowserKind {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s {
			"chromium" | "chrome" => Ok(BrowserKind::Chromium),
			"firefox" => Ok(BrowserKind::Firefox),
			"webkit" => Ok(BrowserKind::Webkit),
			other => Err(format!("unknown browser kind: {other}")),
		}
	}
}

/// Options applied when launching the shared browser process.
///
/// Defaults to headless Chromium, which is what suite runs use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchOptions {
	/// Browser engine to launch.
	pub kind: BrowserKind,
	/// Whether to run without a visible window.
	pub headless: bool,
	/// Delay applied to each engine operation, for debugging flaky suites.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub slow_mo_ms: Option<u64>,
	/// Extra command-line arguments passed to the browser process.
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub args: Vec<String>,
}

impl Default for LaunchOptions {
	fn default() -> Self {
		Self {
			kind: BrowserKind::Chromium,
			headless: true,
			slow_mo_ms: None,
			args: Vec::new(),
		}
	}
}

impl LaunchOptions {
	/// Sets the browser engine.
	pub fn with_kind(mut self, kind: BrowserKind) -> Self {
		self.kind = kind;
		self
	}

	/// Sets headless/headful mode.
	pub fn with_headless(mut self, headless: bool) -> Self {
		self.headless = headless;
		self
	}

	/// Sets the per-operation slow-motion delay.
	pub fn with_slow_mo_ms(mut self, ms: u64) -> Self {
		self.slow_mo_ms = Some(ms);
		self
	}

	/// Appends a browser command-line argument.
	pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
		self.args.push(arg.into());
		self
	}
}

macro_rules! guid_handle {
	($(#[$meta:meta])* $name:ident) => {
		$(#[$meta])*
		#[derive(Debug, Clone, PartialEq, Eq, Hash)]
		pub struct $name(Arc<str>);

		impl $name {
			pub fn new(guid: impl Into<Arc<str>>) -> Self {
				Self(guid.into())
			}

			/// Engine-assigned identifier for this object.
			pub fn guid(&self) -> &str {
				&self.0
			}
		}

		impl fmt::Display for $name {
			fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
				write!(f, "{}", self.0)
			}
		}
	};
}

guid_handle! {
	/// Handle to the single launched browser process. Shared by every worker
	/// in a run; only the connection owner may close it.
	BrowserHandle
}

guid_handle! {
	/// Handle to an isolated browsing context (cookies, storage, permissions).
	/// The unit of per-test isolation; owns the pages created within it.
	ContextHandle
}

guid_handle! {
	/// Handle to a page (tab) within a browsing context.
	PageHandle
}
