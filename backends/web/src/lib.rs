#![allow(clippy::module_name_repetitions)]

//! Browser backend for Ripple.
//!
//! [`WebHost`] implements [`ripple_core::Host`] on top of `web-sys`, and
//! [`WebApp`] wires it to a [`ripple_core::Reconciler`] mounted on a page
//! element:
//!
//! ```no_run
//! use ripple_core::VNode;
//! use ripple_web::WebApp;
//!
//! let mut app = WebApp::builder().with_root_id("app").build()?;
//! app.render(&VNode::element("h1").child("Hello").into())?;
//! app.render(&VNode::element("h1").child("Hello again").into())?;
//! # Ok::<(), ripple_web::WebError>(())
//! ```
//!
//! The DOM is only reachable from `wasm32-unknown-unknown` builds running in
//! a page. In a worker, [`WebAppBuilder::build`] fails with
//! [`WebError::DomUnavailable`].

mod app;
mod dom;
mod error;
mod host;

pub use app::{WebApp, WebAppBuilder};
pub use dom::{DEFAULT_ROOT_ID, DomRoot};
pub use error::WebError;
pub use host::WebHost;
