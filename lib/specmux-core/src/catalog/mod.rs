//! Operation catalog snapshot.
//!
//! The catalog is the flat, discovery-ordered collection of every HTTP
//! operation the application exposes, together with the shape table for all
//! referenced types. It is built once per generation pass and read-only
//! afterwards; emission order of every document derives from catalog order.

use http::Method;
use utoipa::openapi::{RefOr, Schema};

mod shapes;
pub use self::shapes::{ShapeEntry, ShapeTable, TypeIdent, schema_ref};
pub(crate) use self::shapes::{collect_schema_refs, ref_schema_name};

/// Where a parameter is carried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamLocation {
    /// Route template segment.
    Path,
    /// Query string.
    Query,
    /// HTTP header.
    Header,
    /// Cookie.
    Cookie,
}

/// One declared operation parameter.
#[derive(Debug, Clone)]
pub struct ParameterSpec {
    /// Parameter name as it appears on the wire.
    pub name: String,
    /// Parameter location.
    pub location: ParamLocation,
    /// Parameter schema; either inline or a qualified-name placeholder ref.
    pub schema: RefOr<Schema>,
    /// Declared default value, if any. Parameters with a default are emitted
    /// as optional.
    pub default: Option<serde_json::Value>,
}

impl ParameterSpec {
    /// Creates a parameter.
    pub fn new(
        name: impl Into<String>,
        location: ParamLocation,
        schema: impl Into<RefOr<Schema>>,
    ) -> Self {
        Self {
            name: name.into(),
            location,
            schema: schema.into(),
            default: None,
        }
    }

    /// Attaches a declared default value.
    #[must_use]
    pub fn with_default(mut self, default: impl Into<serde_json::Value>) -> Self {
        self.default = Some(default.into());
        self
    }
}

/// Declared request body.
#[derive(Debug, Clone)]
pub struct BodySpec {
    /// Media types the handler declared it consumes; normalized to a single
    /// convention by the filter pipeline.
    pub media_types: Vec<String>,
    /// Body schema; either inline or a qualified-name placeholder ref.
    pub schema: RefOr<Schema>,
    /// Whether the body is required.
    pub required: bool,
}

impl BodySpec {
    /// Creates a JSON body.
    pub fn json(schema: impl Into<RefOr<Schema>>) -> Self {
        Self {
            media_types: vec![mime::APPLICATION_JSON.to_string()],
            schema: schema.into(),
            required: true,
        }
    }

    /// Overrides the declared media types.
    #[must_use]
    pub fn with_media_types(
        mut self,
        media_types: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.media_types = media_types.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the body optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// One declared response.
#[derive(Debug, Clone)]
pub struct ResponseSpec {
    /// HTTP status code.
    pub status: u16,
    /// Declared media type, if the response carries content.
    pub media_type: Option<String>,
    /// Response schema; either inline or a qualified-name placeholder ref.
    pub schema: Option<RefOr<Schema>>,
    /// Whether the handler returns a file/stream; file responses are
    /// normalized to a binary media type by the filter pipeline.
    pub is_file: bool,
    /// Response description; defaults to the status reason phrase.
    pub description: Option<String>,
}

impl ResponseSpec {
    /// Creates a JSON response for the given status.
    pub fn json(status: u16, schema: impl Into<RefOr<Schema>>) -> Self {
        Self {
            status,
            media_type: Some(mime::APPLICATION_JSON.to_string()),
            schema: Some(schema.into()),
            is_file: false,
            description: None,
        }
    }

    /// Creates a content-less response for the given status.
    pub fn empty(status: u16) -> Self {
        Self {
            status,
            media_type: None,
            schema: None,
            is_file: false,
            description: None,
        }
    }

    /// Creates a file-returning response.
    ///
    /// The declared media type is kept as-is here; the pipeline rewrites it
    /// to `application/octet-stream` regardless of what was declared.
    pub fn file(status: u16, declared_media_type: impl Into<String>) -> Self {
        Self {
            status,
            media_type: Some(declared_media_type.into()),
            schema: None,
            is_file: true,
            description: None,
        }
    }

    /// Overrides the response description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Authorization policy declared on an operation.
///
/// Policies translate into oauth2 scopes on the emitted security requirement;
/// an empty policy list still marks the operation as secured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Required policy/scope names.
    pub policies: Vec<String>,
}

impl AuthPolicy {
    /// Creates a policy requiring the given scopes.
    pub fn new(policies: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            policies: policies.into_iter().map(Into::into).collect(),
        }
    }
}

/// One discovered API operation, immutable once the catalog snapshot is
/// taken.
#[derive(Debug, Clone)]
pub struct DiscoveredOperation {
    /// Route template, e.g. `/api/catalog/items/{id}`.
    pub route: String,
    /// HTTP verb.
    pub method: Method,
    /// The compiled unit that declared the handler.
    pub unit: crate::registry::UnitRef,
    /// Simple name of the handler type, e.g. `CatalogItems`.
    pub handler_type: String,
    /// Handler method name, e.g. `get_item`.
    pub handler_name: String,
    /// Short human summary.
    pub summary: Option<String>,
    /// Author-declared tags; overridden by module ownership during
    /// generation.
    pub tags: Vec<String>,
    /// Declared parameters.
    pub parameters: Vec<ParameterSpec>,
    /// Declared request body.
    pub request_body: Option<BodySpec>,
    /// Declared responses.
    pub responses: Vec<ResponseSpec>,
    /// Additional shapes the author declared as part of the contract; pruned
    /// when unreachable from the operation's own request/response graph.
    pub dependent_types: Vec<TypeIdent>,
    /// Authorization policy, if the operation is secured.
    pub authorization: Option<AuthPolicy>,
    /// Obsolete operations are excluded from every document.
    pub obsolete: bool,
}

impl DiscoveredOperation {
    /// Creates an operation with the minimum discovery facts.
    pub fn new(
        method: Method,
        route: impl Into<String>,
        unit: crate::registry::UnitRef,
        handler_type: impl Into<String>,
        handler_name: impl Into<String>,
    ) -> Self {
        Self {
            route: route.into(),
            method,
            unit,
            handler_type: handler_type.into(),
            handler_name: handler_name.into(),
            summary: None,
            tags: Vec::new(),
            parameters: Vec::new(),
            request_body: None,
            responses: Vec::new(),
            dependent_types: Vec::new(),
            authorization: None,
            obsolete: false,
        }
    }

    /// The synthesized operation id, `{HandlerType}_{handler_method}`.
    pub fn operation_id(&self) -> String {
        format!("{}_{}", self.handler_type, self.handler_name)
    }

    /// Sets the summary.
    #[must_use]
    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Sets author-declared tags.
    #[must_use]
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, parameter: ParameterSpec) -> Self {
        self.parameters.push(parameter);
        self
    }

    /// Sets the request body.
    #[must_use]
    pub fn with_request_body(mut self, body: BodySpec) -> Self {
        self.request_body = Some(body);
        self
    }

    /// Adds a response.
    #[must_use]
    pub fn with_response(mut self, response: ResponseSpec) -> Self {
        self.responses.push(response);
        self
    }

    /// Declares additional contract shapes.
    #[must_use]
    pub fn with_dependent_types(mut self, types: impl IntoIterator<Item = TypeIdent>) -> Self {
        self.dependent_types = types.into_iter().collect();
        self
    }

    /// Secures the operation with an authorization policy.
    #[must_use]
    pub fn with_authorization(mut self, policy: AuthPolicy) -> Self {
        self.authorization = Some(policy);
        self
    }

    /// Marks the operation obsolete.
    #[must_use]
    pub fn obsolete(mut self) -> Self {
        self.obsolete = true;
        self
    }
}

/// Read-only snapshot of discovered operations plus the shape table.
#[derive(Debug, Clone, Default)]
pub struct OperationCatalog {
    operations: Vec<DiscoveredOperation>,
    shapes: ShapeTable,
}

impl OperationCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an operation; catalog order is emission order.
    pub fn add_operation(&mut self, operation: DiscoveredOperation) {
        self.operations.push(operation);
    }

    /// Registers a shape.
    pub fn add_shape(&mut self, entry: ShapeEntry) {
        self.shapes.insert(entry);
    }

    /// All operations in discovery order.
    pub fn operations(&self) -> &[DiscoveredOperation] {
        &self.operations
    }

    /// The shape table.
    pub fn shapes(&self) -> &ShapeTable {
        &self.shapes
    }
}
