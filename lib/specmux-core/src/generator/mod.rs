//! Document generation.
//!
//! One [`DocumentGenerator`] run is a single synchronous pass over the module
//! registry and operation catalog snapshots. Each document is produced
//! independently: a malformed module fails only its own document, a failing
//! filter drops only one operation, and a route conflict drops only the
//! shadowed operation. Regeneration against unchanged snapshots yields
//! byte-identical documents.

use tracing::warn;
use utoipa::openapi::OpenApi;

mod classifier;
use self::classifier::belongs_to;

mod error;
pub use self::error::{FilterError, GenerationError};

mod filters;
use self::filters::{FilterContext, OperationBuild, OperationFilter, default_pipeline};

mod schema_ids;

mod assembler;
use self::assembler::assemble;

use crate::catalog::OperationCatalog;
use crate::config::GeneratorConfig;
use crate::registry::ModuleRegistry;

/// The closed set of document kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentKind {
    /// Superset of every operation, used only to render the browsing UI.
    Ui,
    /// Operations owned by the platform core, plus unowned operations.
    Platform,
    /// Operations owned by one activated module.
    Module {
        /// The module (and document) name.
        name: String,
        /// The module id, used for presentation.
        id: String,
    },
}

/// One emitted API description document.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    /// Document name; documents are served at a path keyed by this name.
    pub name: String,
    /// What the document covers.
    pub kind: DocumentKind,
    /// The assembled OpenAPI description.
    pub openapi: OpenApi,
}

impl ApiDocument {
    /// The predictable path this document is served at.
    pub fn serve_path(&self) -> String {
        format!("docs/{}/openapi.json", self.name)
    }

    /// Serializes the document as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.openapi)
    }
}

/// A document that could not be produced.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    /// The affected document name.
    pub name: String,
    /// Why it failed.
    pub error: GenerationError,
}

/// An entry of the browsing-UI endpoint listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEndpoint {
    /// Document name shown in the selector.
    pub name: String,
    /// URL of the document.
    pub url: String,
}

/// The result of one generation pass.
///
/// Documents and failures are independent per name: callers serve whatever
/// was produced and surface the failures, maximizing partial availability.
#[derive(Debug, Clone, Default)]
pub struct DocumentSetOutcome {
    /// Produced documents, in endpoint-listing order (UI, platform, then
    /// modules ordered by id).
    pub documents: Vec<ApiDocument>,
    /// Documents that could not be produced.
    pub failures: Vec<DocumentFailure>,
}

impl DocumentSetOutcome {
    /// Looks up a produced document by name, case-insensitively.
    pub fn document(&self, name: &str) -> Option<&ApiDocument> {
        self.documents
            .iter()
            .find(|document| document.name.eq_ignore_ascii_case(name))
    }

    /// The endpoint listing for the browsing UI.
    pub fn endpoints(&self) -> Vec<DocEndpoint> {
        self.documents
            .iter()
            .map(|document| DocEndpoint {
                name: document.name.clone(),
                url: document.serve_path(),
            })
            .collect()
    }

    /// Returns `true` when every document of the pass was produced.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Partitions the operation catalog into per-module OpenAPI documents.
///
/// The registry and catalog are explicit arguments to every call; the
/// generator holds only static configuration and the fixed filter pipeline,
/// so concurrent passes over different snapshots cannot interfere.
pub struct DocumentGenerator {
    config: GeneratorConfig,
    filters: Vec<Box<dyn OperationFilter>>,
}

impl std::fmt::Debug for DocumentGenerator {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let filters: Vec<_> = self.filters.iter().map(|filter| filter.name()).collect();
        formatter
            .debug_struct("DocumentGenerator")
            .field("config", &self.config)
            .field("filters", &filters)
            .finish()
    }
}

impl DocumentGenerator {
    /// Creates a generator with the fixed default filter pipeline.
    pub fn new(config: GeneratorConfig) -> Self {
        Self {
            config,
            filters: default_pipeline(),
        }
    }

    /// The static configuration of this generator.
    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    /// Generates every document of the pass: the UI document, the platform
    /// document, and one document per activated module (ordered by module
    /// id).
    ///
    /// # Errors
    ///
    /// Fails only when generation is disabled; everything else is reported
    /// per document inside the outcome.
    pub fn generate(
        &self,
        registry: &ModuleRegistry,
        catalog: &OperationCatalog,
    ) -> Result<DocumentSetOutcome, GenerationError> {
        if !self.config.enabled {
            return Err(GenerationError::Disabled);
        }

        let mut outcome = DocumentSetOutcome::default();
        let mut roster: Vec<String> = vec![
            self.config.ui_doc_name.clone(),
            self.config.platform_doc_name.clone(),
        ];
        roster.extend(
            registry
                .modules_by_id()
                .into_iter()
                .map(|module| module.name.clone()),
        );

        for name in roster {
            match self.generate_document(registry, catalog, &name) {
                Ok(document) => outcome.documents.push(document),
                Err(error) => {
                    warn!(document = %name, %error, "document generation failed");
                    outcome.failures.push(DocumentFailure { name, error });
                }
            }
        }
        Ok(outcome)
    }

    /// Generates a single document by name.
    ///
    /// # Errors
    ///
    /// Fails when generation is disabled, the name is unknown, or the
    /// backing module metadata is malformed. Sibling documents are never
    /// affected.
    pub fn generate_document(
        &self,
        registry: &ModuleRegistry,
        catalog: &OperationCatalog,
        name: &str,
    ) -> Result<ApiDocument, GenerationError> {
        if !self.config.enabled {
            return Err(GenerationError::Disabled);
        }
        let (canonical_name, kind) = self.resolve_kind(registry, name)?;

        let cx = FilterContext {
            config: &self.config,
            registry,
            shapes: catalog.shapes(),
        };

        let mut builds = Vec::new();
        for operation in catalog.operations() {
            if operation.obsolete {
                continue;
            }
            if !belongs_to(&self.config, registry, &canonical_name, operation) {
                continue;
            }
            let mut build = OperationBuild::from_discovered(operation);
            match self.run_pipeline(&mut build, &cx) {
                Ok(()) => builds.push(build),
                Err(error) => {
                    warn!(
                        document = %canonical_name,
                        operation_id = %build.operation_id,
                        %error,
                        "operation dropped from document"
                    );
                }
            }
        }

        let openapi = assemble(&canonical_name, &kind, builds, catalog.shapes(), &self.config);
        Ok(ApiDocument {
            name: canonical_name,
            kind,
            openapi,
        })
    }

    fn run_pipeline(
        &self,
        build: &mut OperationBuild,
        cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        for filter in &self.filters {
            filter.apply(build, cx)?;
        }
        Ok(())
    }

    /// Resolves a requested name to its canonical document name and kind,
    /// validating the backing module metadata.
    fn resolve_kind(
        &self,
        registry: &ModuleRegistry,
        name: &str,
    ) -> Result<(String, DocumentKind), GenerationError> {
        if name.eq_ignore_ascii_case(&self.config.ui_doc_name) {
            return Ok((self.config.ui_doc_name.clone(), DocumentKind::Ui));
        }
        if name.eq_ignore_ascii_case(&self.config.platform_doc_name) {
            return Ok((self.config.platform_doc_name.clone(), DocumentKind::Platform));
        }
        if let Some(module) = registry.find_by_name(name) {
            if module.name.trim().is_empty() {
                return Err(GenerationError::Registration {
                    name: module.id.clone(),
                    reason: "module name is empty".to_string(),
                });
            }
            if registry.is_ambiguous_name(&module.name) {
                return Err(GenerationError::Registration {
                    name: module.name.clone(),
                    reason: "module name is not unique within the registry".to_string(),
                });
            }
            return Ok((
                module.name.clone(),
                DocumentKind::Module {
                    name: module.name.clone(),
                    id: module.id.clone(),
                },
            ));
        }
        Err(GenerationError::UnknownDocument {
            name: name.to_string(),
        })
    }
}
