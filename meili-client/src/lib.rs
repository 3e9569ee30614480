//! # Meili Client
//!
//! Client for the Meilisearch REST API. Mutating operations are enqueued as
//! server-side tasks that can be polled to completion; document operations can
//! be split into batches that are fanned out under a concurrency limit, and
//! every operation can be extended with pre, concurrent and post plugins.
//!
//! The async [`Client`] is the primary interface. [`blocking::Client`] runs
//! the same code sequentially on an owned runtime.

pub mod batching;
pub mod blocking;
pub mod client;
pub mod codec;
pub mod config;
pub mod errors;
pub mod executor;
pub mod http;
pub mod index;
pub mod interfaces;
pub mod plugins;
pub mod tasks;

#[cfg(test)]
mod testing;

pub use client::{Client, Health};
pub use codec::BuiltinHandler;
#[cfg(feature = "simd-json")]
pub use codec::SimdJsonHandler;
#[cfg(feature = "sonic-rs")]
pub use codec::SonicHandler;
pub use config::{ClientConfig, ProxyMode};
pub use errors::{ApiError, MeiliError};
pub use executor::{ExecutionMode, Executor};
pub use http::{HttpRequests, ReqwestTransport};
pub use index::{BatchOptions, DocumentOptions, Index, DEFAULT_BATCH_SIZE};
pub use interfaces::{
    HttpMethod, HttpRequest, HttpResponse, IndexPlugin, JsonHandler, PluginEvent, PluginOutcome,
    PluginPayload, Transport,
};
pub use plugins::{
    IndexPlugins, OperationKind, PluginCapabilities, PluginRegistration, PluginTiming,
};
pub use tasks::{TaskFilter, Tasks, WaitOptions};

pub use meili_shared::{
    Document, FacetHit, FacetSearchQuery, FacetSearchResults, Filter, MatchingStrategy,
    SearchQuery, SearchResults, TaskError, TaskInfo, TaskList, TaskResult, TaskStatus,
};
