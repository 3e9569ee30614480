//! HTTP plumbing: the reqwest transport and the codec-aware request helper.

mod requests;
mod reqwest_transport;

pub use requests::HttpRequests;
pub use reqwest_transport::{user_agent, ReqwestTransport};
