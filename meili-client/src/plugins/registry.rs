use std::fmt;
use std::sync::Arc;

use crate::interfaces::IndexPlugin;

/// Hooks a plugin implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PluginCapabilities {
    /// [`IndexPlugin::run_plugin`]
    pub generic: bool,
    /// [`IndexPlugin::run_document_plugin`], for add and update operations.
    pub document_transform: bool,
    /// [`IndexPlugin::run_post_search_plugin`], for searches.
    pub search_transform: bool,
}

impl Default for PluginCapabilities {
    fn default() -> Self {
        Self {
            generic: true,
            document_transform: false,
            search_transform: false,
        }
    }
}

/// When a plugin runs relative to the request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PluginTiming {
    pub before: bool,
    pub after: bool,
    /// Unset means "concurrently, unless it runs before or after".
    pub concurrent: Option<bool>,
}

impl PluginTiming {
    pub fn runs_concurrently(&self) -> bool {
        self.concurrent.unwrap_or(!self.before && !self.after)
    }
}

/// A plugin together with its declared capabilities and timing.
#[derive(Clone)]
pub struct PluginRegistration {
    name: String,
    plugin: Arc<dyn IndexPlugin>,
    capabilities: PluginCapabilities,
    timing: PluginTiming,
}

impl fmt::Debug for PluginRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginRegistration")
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .field("timing", &self.timing)
            .finish()
    }
}

impl PluginRegistration {
    /// Register a plugin with the generic hook, running concurrently.
    pub fn new(name: impl Into<String>, plugin: Arc<dyn IndexPlugin>) -> Self {
        Self {
            name: name.into(),
            plugin,
            capabilities: PluginCapabilities::default(),
            timing: PluginTiming::default(),
        }
    }

    pub fn with_capabilities(mut self, capabilities: PluginCapabilities) -> Self {
        self.capabilities = capabilities;
        self
    }

    /// Also invoke the document transform hook.
    pub fn document_transform(mut self) -> Self {
        self.capabilities.document_transform = true;
        self
    }

    /// Also invoke the search transform hook.
    pub fn search_transform(mut self) -> Self {
        self.capabilities.search_transform = true;
        self
    }

    /// Do not invoke the generic hook.
    pub fn without_generic(mut self) -> Self {
        self.capabilities.generic = false;
        self
    }

    pub fn runs_before(mut self) -> Self {
        self.timing.before = true;
        self
    }

    pub fn runs_after(mut self) -> Self {
        self.timing.after = true;
        self
    }

    pub fn runs_concurrently(mut self, concurrent: bool) -> Self {
        self.timing.concurrent = Some(concurrent);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn plugin(&self) -> &dyn IndexPlugin {
        self.plugin.as_ref()
    }

    pub fn capabilities(&self) -> PluginCapabilities {
        self.capabilities
    }

    pub fn timing(&self) -> PluginTiming {
        self.timing
    }
}

/// Operations that can be extended by plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    AddDocuments,
    UpdateDocuments,
    DeleteDocument,
    DeleteDocuments,
    DeleteDocumentsByFilter,
    DeleteAllDocuments,
    Search,
    FacetSearch,
}

impl OperationKind {
    pub const ALL: [OperationKind; 8] = [
        Self::AddDocuments,
        Self::UpdateDocuments,
        Self::DeleteDocument,
        Self::DeleteDocuments,
        Self::DeleteDocumentsByFilter,
        Self::DeleteAllDocuments,
        Self::Search,
        Self::FacetSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AddDocuments => "add_documents",
            Self::UpdateDocuments => "update_documents",
            Self::DeleteDocument => "delete_document",
            Self::DeleteDocuments => "delete_documents",
            Self::DeleteDocumentsByFilter => "delete_documents_by_filter",
            Self::DeleteAllDocuments => "delete_all_documents",
            Self::Search => "search",
            Self::FacetSearch => "facet_search",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

/// Plugins registered per operation, in registration order.
#[derive(Debug, Clone, Default)]
pub struct IndexPlugins {
    pub add_documents: Vec<PluginRegistration>,
    pub update_documents: Vec<PluginRegistration>,
    pub delete_document: Vec<PluginRegistration>,
    pub delete_documents: Vec<PluginRegistration>,
    pub delete_documents_by_filter: Vec<PluginRegistration>,
    pub delete_all_documents: Vec<PluginRegistration>,
    pub search: Vec<PluginRegistration>,
    pub facet_search: Vec<PluginRegistration>,
}

impl IndexPlugins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a plugin for one operation.
    pub fn register(mut self, kind: OperationKind, registration: PluginRegistration) -> Self {
        self.for_kind_mut(kind).push(registration);
        self
    }

    pub fn is_empty(&self) -> bool {
        OperationKind::ALL
            .iter()
            .all(|kind| self.for_kind(*kind).is_empty())
    }

    pub fn for_kind(&self, kind: OperationKind) -> &[PluginRegistration] {
        match kind {
            OperationKind::AddDocuments => &self.add_documents,
            OperationKind::UpdateDocuments => &self.update_documents,
            OperationKind::DeleteDocument => &self.delete_document,
            OperationKind::DeleteDocuments => &self.delete_documents,
            OperationKind::DeleteDocumentsByFilter => &self.delete_documents_by_filter,
            OperationKind::DeleteAllDocuments => &self.delete_all_documents,
            OperationKind::Search => &self.search,
            OperationKind::FacetSearch => &self.facet_search,
        }
    }

    fn for_kind_mut(&mut self, kind: OperationKind) -> &mut Vec<PluginRegistration> {
        match kind {
            OperationKind::AddDocuments => &mut self.add_documents,
            OperationKind::UpdateDocuments => &mut self.update_documents,
            OperationKind::DeleteDocument => &mut self.delete_document,
            OperationKind::DeleteDocuments => &mut self.delete_documents,
            OperationKind::DeleteDocumentsByFilter => &mut self.delete_documents_by_filter,
            OperationKind::DeleteAllDocuments => &mut self.delete_all_documents,
            OperationKind::Search => &mut self.search,
            OperationKind::FacetSearch => &mut self.facet_search,
        }
    }
}

/// Plugins of one operation split by phase.
///
/// A registration with several timing flags appears in several lists.
#[derive(Debug, Clone, Default)]
pub struct PhasedPlugins {
    pub pre: Vec<PluginRegistration>,
    pub concurrent: Vec<PluginRegistration>,
    pub post: Vec<PluginRegistration>,
}

impl PhasedPlugins {
    fn classify(registrations: &[PluginRegistration]) -> Self {
        let mut phased = Self::default();
        for registration in registrations {
            let timing = registration.timing();
            if timing.before {
                phased.pre.push(registration.clone());
            }
            if timing.runs_concurrently() {
                phased.concurrent.push(registration.clone());
            }
            if timing.after {
                phased.post.push(registration.clone());
            }
        }
        phased
    }

    pub fn is_empty(&self) -> bool {
        self.pre.is_empty() && self.concurrent.is_empty() && self.post.is_empty()
    }
}

/// Read-only phase lists for every operation, computed once per index.
#[derive(Debug, Clone, Default)]
pub struct PluginTable {
    phases: [PhasedPlugins; 8],
}

impl PluginTable {
    pub fn classify(plugins: &IndexPlugins) -> Self {
        Self {
            phases: OperationKind::ALL.map(|kind| PhasedPlugins::classify(plugins.for_kind(kind))),
        }
    }

    pub fn get(&self, kind: OperationKind) -> &PhasedPlugins {
        &self.phases[kind.index()]
    }
}
