//! # Specmux Core
//!
//! Partition one application's HTTP API into per-module OpenAPI documents.
//!
//! A modular platform hosts operations owned by independently-authored
//! modules. Specmux takes a snapshot of the activated modules and the
//! discovered operations and produces one independently-servable OpenAPI
//! document per module, an aggregate platform document, and a superset UI
//! document used to render a combined browsing interface — resolving the
//! naming conflicts that arise when modules expose same-named types.
//!
//! ## Quick Start
//!
//! ```rust
//! use http::Method;
//! use specmux_core::{
//!     DiscoveredOperation, DocumentGenerator, GeneratorConfig, ModuleInfo, ModuleRegistry,
//!     OperationCatalog, ResponseSpec, ShapeEntry, TypeIdent, UnitId, UnitRef, schema_ref,
//! };
//! use utoipa::openapi::{ObjectBuilder, Type};
//!
//! # fn main() -> Result<(), specmux_core::GenerationError> {
//! let registry = ModuleRegistry::new([ModuleInfo::new("CatalogModule", "Acme.Catalog", UnitId(10))]);
//!
//! let mut catalog = OperationCatalog::new();
//! catalog.add_shape(ShapeEntry::new(
//!     TypeIdent::new("Catalog.Item"),
//!     ObjectBuilder::new()
//!         .property("name", ObjectBuilder::new().schema_type(Type::String))
//!         .build(),
//! ));
//! catalog.add_operation(
//!     DiscoveredOperation::new(
//!         Method::GET,
//!         "/api/catalog/items",
//!         UnitRef::new(UnitId(10), "Catalog.Api"),
//!         "Items",
//!         "list",
//!     )
//!     .with_response(ResponseSpec::json(200, schema_ref(&TypeIdent::new("Catalog.Item")))),
//! );
//!
//! let generator = DocumentGenerator::new(GeneratorConfig::default());
//! let outcome = generator.generate(&registry, &catalog)?;
//!
//! // One document per module, plus the platform and UI documents.
//! assert!(outcome.document("CatalogModule").is_some());
//! assert!(outcome.document("Platform").is_some());
//! assert!(outcome.document("PlatformUI").is_some());
//! # Ok(())
//! # }
//! ```
//!
//! ## Documents
//!
//! - **Module documents** carry exactly the operations declared by that
//!   module's compiled unit, matched by reference identity.
//! - The **platform document** carries operations declared by the core
//!   itself, plus operations no activated module claims.
//! - The **UI document** aggregates everything and exists only so the
//!   browsing interface never misses an endpoint.
//!
//! ## Schema identity
//!
//! Schema ids are scoped per document. Platform and module documents prefer
//! short simple-name ids and fall back to qualified names only for colliding
//! groups; the UI document uses qualified names throughout, because it
//! aggregates all modules and collisions there are expected. Ids are
//! assigned only after a document's operations have been fully walked, so an
//! id never changes once observable.
//!
//! ## Partial availability
//!
//! No error aborts a whole pass: a malformed module fails its own document, a
//! failing filter drops one operation, and duplicate routes keep their first
//! registration (warn-logged).

pub mod catalog;
pub mod registry;

mod config;
pub use self::config::{
    DEFAULT_PLATFORM_DOC_NAME, DEFAULT_TOKEN_ENDPOINT, DEFAULT_UI_DOC_NAME, GeneratorConfig,
};

mod generator;
pub use self::generator::{
    ApiDocument, DocEndpoint, DocumentFailure, DocumentGenerator, DocumentKind,
    DocumentSetOutcome, FilterError, GenerationError,
};

pub use self::catalog::{
    AuthPolicy, BodySpec, DiscoveredOperation, OperationCatalog, ParamLocation, ParameterSpec,
    ResponseSpec, ShapeEntry, ShapeTable, TypeIdent, schema_ref,
};
pub use self::registry::{ModuleInfo, ModuleRegistry, UnitId, UnitRef};
