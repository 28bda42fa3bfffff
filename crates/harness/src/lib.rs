//! wt: browser-session lifecycle manager for end-to-end test suites.
//!
//! One [`EngineConnection`] per run owns the single automation-engine
//! connection and the single launched browser process. A [`SessionRegistry`]
//! hands each concurrently running worker its own isolated browsing context
//! and page, created lazily per test and reclaimed deterministically
//! afterwards. Test bodies drive the handles through the engine directly;
//! this crate only manages their lifecycle.
//!
//! # Control flow
//!
//! ```ignore
//! use std::sync::Arc;
//! use wt::{EngineConnection, SessionRegistry, WorkerId};
//! use wt_engine::LaunchOptions;
//!
//! let connection = Arc::new(EngineConnection::new(engine, LaunchOptions::default()));
//! let registry = SessionRegistry::new(Arc::clone(&connection));
//!
//! connection.initialize().await?;               // run start
//!
//! let worker = WorkerId::from("worker-1");
//! let page = registry.create_page(&worker).await?;  // test setup
//! // ... test body drives `page` ...
//! registry.close_context(&worker).await?;       // test teardown
//!
//! connection.close().await?;                    // run end
//! ```

pub mod connection;
pub mod fixture;
pub mod logging;
pub mod registry;

pub use connection::EngineConnection;
pub use fixture::TestSession;
pub use registry::{SessionRegistry, WorkerId};
pub use wt_engine::{Error, Result};
