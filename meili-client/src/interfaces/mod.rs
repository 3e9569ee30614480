//! Interface definitions for the client's injected collaborators.
//!
//! The transport, the JSON codec and index plugins are traits so that
//! implementations can be swapped (reqwest, mocks, faster codecs) without
//! touching the document operations.

mod json_handler;
mod plugin;
mod transport;

pub use json_handler::JsonHandler;
pub use plugin::{IndexPlugin, PluginEvent, PluginOutcome, PluginPayload};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, Transport};
