//! Plugin registration, classification and the three-phase pipeline.

mod pipeline;
mod registry;

pub use pipeline::PluginPipeline;
pub use registry::{
    IndexPlugins, OperationKind, PhasedPlugins, PluginCapabilities, PluginRegistration,
    PluginTable, PluginTiming,
};
