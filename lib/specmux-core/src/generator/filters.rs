//! The operation filter pipeline.
//!
//! A fixed, ordered list of mutators applied once per (document, operation)
//! during assembly. Order is significant: later stages rely on earlier
//! normalization. Every stage is idempotent and operates on an explicit
//! [`OperationBuild`] accumulator; a failing stage drops the affected
//! operation from the current document only.

use indexmap::IndexSet;
use utoipa::openapi::path::{Parameter, ParameterBuilder, ParameterIn, ParameterStyle};
use utoipa::openapi::security::SecurityRequirement;
use utoipa::openapi::{KnownFormat, ObjectBuilder, RefOr, Required, Schema, SchemaFormat, Type};

use crate::catalog::{
    AuthPolicy, DiscoveredOperation, ParamLocation, ShapeTable, collect_schema_refs,
};
use crate::config::GeneratorConfig;
use crate::registry::{ModuleRegistry, UnitRef};

use super::FilterError;

/// Name under which the oauth2 scheme is registered in every document.
pub(crate) const OAUTH2_SCHEME_NAME: &str = "oauth2";

/// Read-only context shared by all filter stages.
pub(crate) struct FilterContext<'a> {
    pub(crate) config: &'a GeneratorConfig,
    pub(crate) registry: &'a ModuleRegistry,
    pub(crate) shapes: &'a ShapeTable,
}

/// A parameter being assembled.
#[derive(Debug, Clone)]
pub(crate) struct ParameterBuild {
    pub(crate) inner: Parameter,
    pub(crate) location: ParamLocation,
    pub(crate) has_default: bool,
}

/// A request body being assembled.
#[derive(Debug, Clone)]
pub(crate) struct BodyBuild {
    pub(crate) media_types: Vec<String>,
    pub(crate) schema: RefOr<Schema>,
    pub(crate) required: bool,
}

/// A response being assembled.
#[derive(Debug, Clone)]
pub(crate) struct ResponseBuild {
    pub(crate) status: u16,
    pub(crate) description: String,
    pub(crate) media_type: Option<String>,
    pub(crate) schema: Option<RefOr<Schema>>,
    pub(crate) is_file: bool,
}

/// Per-operation accumulator threaded through the pipeline.
///
/// Makes every data dependency of the filter chain explicit, so per-document
/// assembly shares no hidden mutable state with sibling documents.
#[derive(Debug, Clone)]
pub(crate) struct OperationBuild {
    pub(crate) route: String,
    pub(crate) method: http::Method,
    pub(crate) operation_id: String,
    pub(crate) unit: UnitRef,
    pub(crate) summary: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) tags: Vec<String>,
    pub(crate) parameters: Vec<ParameterBuild>,
    pub(crate) request_body: Option<BodyBuild>,
    pub(crate) responses: Vec<ResponseBuild>,
    pub(crate) security: Option<Vec<SecurityRequirement>>,
    /// Qualified names of every shape this operation's contract references;
    /// pruned to the reachable closure by the first pipeline stage.
    pub(crate) type_refs: IndexSet<String>,
    pub(crate) authorization: Option<AuthPolicy>,
}

impl OperationBuild {
    pub(crate) fn from_discovered(operation: &DiscoveredOperation) -> Self {
        let parameters: Vec<_> = operation
            .parameters
            .iter()
            .map(|spec| {
                let required = match spec.location {
                    ParamLocation::Path | ParamLocation::Query => Required::True,
                    ParamLocation::Header | ParamLocation::Cookie => Required::False,
                };
                let inner = ParameterBuilder::new()
                    .name(&spec.name)
                    .parameter_in(parameter_in(spec.location))
                    .required(required)
                    .schema(Some(spec.schema.clone()))
                    .build();
                ParameterBuild {
                    inner,
                    location: spec.location,
                    has_default: spec.default.is_some(),
                }
            })
            .collect();

        let request_body = operation.request_body.as_ref().map(|body| BodyBuild {
            media_types: body.media_types.clone(),
            schema: body.schema.clone(),
            required: body.required,
        });

        let responses: Vec<_> = operation
            .responses
            .iter()
            .map(|response| ResponseBuild {
                status: response.status,
                description: response
                    .description
                    .clone()
                    .unwrap_or_else(|| status_reason(response.status)),
                media_type: response.media_type.clone(),
                schema: response.schema.clone(),
                is_file: response.is_file,
            })
            .collect();

        let mut type_refs = IndexSet::new();
        for parameter in &operation.parameters {
            collect_schema_refs(&parameter.schema, &mut type_refs);
        }
        if let Some(body) = &operation.request_body {
            collect_schema_refs(&body.schema, &mut type_refs);
        }
        for response in &operation.responses {
            if let Some(schema) = &response.schema {
                collect_schema_refs(schema, &mut type_refs);
            }
        }
        type_refs.extend(
            operation
                .dependent_types
                .iter()
                .map(|ident| ident.qualified().to_string()),
        );

        Self {
            route: operation.route.clone(),
            method: operation.method.clone(),
            operation_id: operation.operation_id(),
            unit: operation.unit.clone(),
            summary: operation.summary.clone(),
            description: None,
            tags: operation.tags.clone(),
            parameters,
            request_body,
            responses,
            security: None,
            type_refs,
            authorization: operation.authorization.clone(),
        }
    }

    /// Qualified names referenced by the operation's own contract, excluding
    /// author-declared extras.
    fn contract_roots(&self) -> IndexSet<String> {
        let mut roots = IndexSet::new();
        for parameter in &self.parameters {
            if let Some(schema) = &parameter.inner.schema {
                collect_schema_refs(schema, &mut roots);
            }
        }
        if let Some(body) = &self.request_body {
            collect_schema_refs(&body.schema, &mut roots);
        }
        for response in &self.responses {
            if let Some(schema) = &response.schema {
                collect_schema_refs(schema, &mut roots);
            }
        }
        roots
    }
}

fn parameter_in(location: ParamLocation) -> ParameterIn {
    match location {
        ParamLocation::Path => ParameterIn::Path,
        ParamLocation::Query => ParameterIn::Query,
        ParamLocation::Header => ParameterIn::Header,
        ParamLocation::Cookie => ParameterIn::Cookie,
    }
}

fn status_reason(status: u16) -> String {
    http::StatusCode::from_u16(status)
        .ok()
        .and_then(|code| code.canonical_reason())
        .unwrap_or("Response")
        .to_string()
}

/// One stage of the pipeline.
pub(crate) trait OperationFilter {
    /// Stable stage name, used in failure logs.
    fn name(&self) -> &'static str;

    /// Applies the stage to the operation under assembly.
    fn apply(
        &self,
        operation: &mut OperationBuild,
        cx: &FilterContext<'_>,
    ) -> Result<(), FilterError>;
}

/// Builds the fixed default pipeline, in execution order.
pub(crate) fn default_pipeline() -> Vec<Box<dyn OperationFilter>> {
    vec![
        Box::new(PruneUnreachableDeps),
        Box::new(ConsumeFromBody),
        Box::new(FileResponseType),
        Box::new(OptionalParameters),
        Box::new(ArrayInQueryParameters),
        Box::new(SecurityRequirements),
        Box::new(ModuleTag),
        Box::new(TokenEndpointDescription),
    ]
}

/// Restricts the operation's type set to shapes reachable from its own
/// contract, stripping author-declared extras that nothing references.
pub(crate) struct PruneUnreachableDeps;

impl OperationFilter for PruneUnreachableDeps {
    fn name(&self) -> &'static str {
        "prune-unreachable-deps"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        let roots = operation.contract_roots();
        let reachable = cx
            .shapes
            .reachable_from(roots.iter().map(String::as_str))?;
        operation.type_refs = reachable;
        Ok(())
    }
}

/// Collapses the request body to a single convention, regardless of how the
/// handler declared it.
///
/// Vendor-suffixed JSON media types (`application/*+json`) are broken for
/// several downstream generators, so they collapse to plain
/// `application/json`; media-type parameters are stripped. When several
/// conventions remain, JSON wins, otherwise the first declared one.
pub(crate) struct ConsumeFromBody;

impl ConsumeFromBody {
    fn normalize(media_type: &str) -> String {
        let base = media_type
            .split(';')
            .next()
            .unwrap_or(media_type)
            .trim()
            .to_ascii_lowercase();
        if base.starts_with("application/") && base.ends_with("+json") {
            mime::APPLICATION_JSON.to_string()
        } else {
            base
        }
    }
}

impl OperationFilter for ConsumeFromBody {
    fn name(&self) -> &'static str {
        "consume-from-body"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        _cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        let Some(body) = &mut operation.request_body else {
            return Ok(());
        };

        let mut media_types = IndexSet::new();
        for media_type in &body.media_types {
            media_types.insert(Self::normalize(media_type));
        }
        let json = mime::APPLICATION_JSON.to_string();
        let chosen = if media_types.is_empty() || media_types.contains(&json) {
            json
        } else {
            media_types
                .into_iter()
                .next()
                .unwrap_or_else(|| mime::APPLICATION_JSON.to_string())
        };
        body.media_types = vec![chosen];
        Ok(())
    }
}

/// Normalizes file-returning responses to a binary media type.
pub(crate) struct FileResponseType;

impl FileResponseType {
    fn binary_schema() -> RefOr<Schema> {
        RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .format(Some(SchemaFormat::KnownFormat(KnownFormat::Binary)))
                .build(),
        ))
    }
}

impl OperationFilter for FileResponseType {
    fn name(&self) -> &'static str {
        "file-response-type"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        _cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        for response in &mut operation.responses {
            if response.is_file {
                response.media_type = Some(mime::APPLICATION_OCTET_STREAM.to_string());
                response.schema = Some(Self::binary_schema());
            }
        }
        Ok(())
    }
}

/// Parameters with a declared default value are optional.
pub(crate) struct OptionalParameters;

impl OperationFilter for OptionalParameters {
    fn name(&self) -> &'static str {
        "optional-parameters"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        _cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        for parameter in &mut operation.parameters {
            if parameter.has_default {
                parameter.inner.required = Required::False;
            }
        }
        Ok(())
    }
}

/// Array-typed query parameters are emitted in repeatable form.
pub(crate) struct ArrayInQueryParameters;

impl OperationFilter for ArrayInQueryParameters {
    fn name(&self) -> &'static str {
        "array-in-query-parameters"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        _cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        for parameter in &mut operation.parameters {
            let is_array = matches!(
                parameter.inner.schema,
                Some(RefOr::T(Schema::Array(_)))
            );
            if parameter.location == ParamLocation::Query && is_array {
                parameter.inner.style = Some(ParameterStyle::Form);
                parameter.inner.explode = Some(true);
            }
        }
        Ok(())
    }
}

/// Injects the oauth2 security requirement derived from the operation's
/// authorization policy, along with the 401/403 responses a secured endpoint
/// can produce.
pub(crate) struct SecurityRequirements;

impl OperationFilter for SecurityRequirements {
    fn name(&self) -> &'static str {
        "security-requirements"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        _cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        let Some(policy) = &operation.authorization else {
            return Ok(());
        };

        operation.security = Some(vec![SecurityRequirement::new(
            OAUTH2_SCHEME_NAME,
            policy.policies.iter().map(String::as_str),
        )]);

        for status in [401, 403] {
            if !operation.responses.iter().any(|it| it.status == status) {
                operation.responses.push(ResponseBuild {
                    status,
                    description: status_reason(status),
                    media_type: None,
                    schema: None,
                    is_file: false,
                });
            }
        }
        Ok(())
    }
}

/// Recomputes the display tag as the owning module's name, so grouping in the
/// browsing UI always reflects module ownership rather than author intent.
pub(crate) struct ModuleTag;

impl OperationFilter for ModuleTag {
    fn name(&self) -> &'static str {
        "module-tag"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        let tag = cx
            .registry
            .module_for_unit(operation.unit.id)
            .map_or_else(|| cx.config.platform_doc_name.clone(), |it| it.name.clone());
        operation.tags = vec![tag];
        Ok(())
    }
}

/// Annotates the token-issuing endpoint with protocol description text.
pub(crate) struct TokenEndpointDescription;

const TOKEN_ENDPOINT_DESCRIPTION: &str =
    "Issues access tokens using the OAuth2 resource owner password flow.";

impl OperationFilter for TokenEndpointDescription {
    fn name(&self) -> &'static str {
        "token-endpoint-description"
    }

    fn apply(
        &self,
        operation: &mut OperationBuild,
        cx: &FilterContext<'_>,
    ) -> Result<(), FilterError> {
        if operation.route == cx.config.token_endpoint {
            operation.description = Some(TOKEN_ENDPOINT_DESCRIPTION.to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{
        BodySpec, ParameterSpec, ResponseSpec, ShapeEntry, TypeIdent, schema_ref,
    };
    use crate::registry::{ModuleInfo, UnitId};
    use http::Method;
    use utoipa::openapi::schema::ArrayItems;
    use utoipa::openapi::ArrayBuilder;

    fn context_fixtures() -> (GeneratorConfig, ModuleRegistry, ShapeTable) {
        let config = GeneratorConfig::default();
        let registry = ModuleRegistry::new([ModuleInfo::new(
            "CatalogModule",
            "Acme.Catalog",
            UnitId(10),
        )]);
        let mut shapes = ShapeTable::default();
        shapes.insert(ShapeEntry::new(
            TypeIdent::new("Catalog.Address"),
            ObjectBuilder::new()
                .property("street", ObjectBuilder::new().schema_type(Type::String))
                .build(),
        ));
        shapes.insert(ShapeEntry::new(
            TypeIdent::new("Catalog.Unused"),
            ObjectBuilder::new().build(),
        ));
        (config, registry, shapes)
    }

    fn catalog_operation() -> DiscoveredOperation {
        DiscoveredOperation::new(
            Method::GET,
            "/api/catalog/addresses",
            UnitRef::new(UnitId(10), "Catalog.Api"),
            "Addresses",
            "list",
        )
        .with_response(ResponseSpec::json(
            200,
            schema_ref(&TypeIdent::new("Catalog.Address")),
        ))
    }

    fn apply<F: OperationFilter>(
        filter: &F,
        operation: &mut OperationBuild,
        cx: &FilterContext<'_>,
    ) {
        filter
            .apply(operation, cx)
            .unwrap_or_else(|error| panic!("{error}"));
    }

    #[test]
    fn should_prune_unreachable_dependent_types() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered =
            catalog_operation().with_dependent_types([TypeIdent::new("Catalog.Unused")]);
        let mut operation = OperationBuild::from_discovered(&discovered);
        assert!(operation.type_refs.contains("Catalog.Unused"));

        apply(&PruneUnreachableDeps, &mut operation, &cx);

        assert!(operation.type_refs.contains("Catalog.Address"));
        assert!(!operation.type_refs.contains("Catalog.Unused"));
    }

    #[test]
    fn should_fail_pruning_when_shape_is_missing() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered = catalog_operation()
            .with_response(ResponseSpec::json(404, schema_ref(&TypeIdent::new("Nope"))));
        let mut operation = OperationBuild::from_discovered(&discovered);

        let result = PruneUnreachableDeps.apply(&mut operation, &cx);
        assert!(result.is_err());
    }

    #[test]
    fn should_collapse_vendor_json_media_types() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered = catalog_operation().with_request_body(
            BodySpec::json(schema_ref(&TypeIdent::new("Catalog.Address"))).with_media_types([
                "application/merge-patch+json",
                "application/json; charset=utf-8",
            ]),
        );
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&ConsumeFromBody, &mut operation, &cx);
        let body = operation.request_body.as_ref().expect("has a body");
        assert_eq!(body.media_types, vec!["application/json"]);

        // Idempotent: a second application changes nothing.
        apply(&ConsumeFromBody, &mut operation, &cx);
        let body = operation.request_body.as_ref().expect("has a body");
        assert_eq!(body.media_types, vec!["application/json"]);
    }

    #[test]
    fn should_emit_exactly_one_body_convention() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };

        // JSON wins over siblings.
        let discovered = catalog_operation().with_request_body(
            BodySpec::json(schema_ref(&TypeIdent::new("Catalog.Address")))
                .with_media_types(["application/x-www-form-urlencoded", "application/json"]),
        );
        let mut operation = OperationBuild::from_discovered(&discovered);
        apply(&ConsumeFromBody, &mut operation, &cx);
        let body = operation.request_body.as_ref().expect("has a body");
        assert_eq!(body.media_types, vec!["application/json"]);

        // Without JSON, the first declared convention wins.
        let discovered = catalog_operation().with_request_body(
            BodySpec::json(schema_ref(&TypeIdent::new("Catalog.Address")))
                .with_media_types(["multipart/form-data", "text/plain"]),
        );
        let mut operation = OperationBuild::from_discovered(&discovered);
        apply(&ConsumeFromBody, &mut operation, &cx);
        let body = operation.request_body.as_ref().expect("has a body");
        assert_eq!(body.media_types, vec!["multipart/form-data"]);
    }

    #[test]
    fn should_normalize_file_responses_to_binary() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered = catalog_operation().with_response(ResponseSpec::file(200, "image/png"));
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&FileResponseType, &mut operation, &cx);

        let file = operation
            .responses
            .iter()
            .find(|it| it.is_file)
            .expect("has a file response");
        assert_eq!(file.media_type.as_deref(), Some("application/octet-stream"));
        assert!(file.schema.is_some());
    }

    #[test]
    fn should_make_defaulted_parameters_optional() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered = catalog_operation()
            .with_parameter(
                ParameterSpec::new(
                    "limit",
                    ParamLocation::Query,
                    ObjectBuilder::new().schema_type(Type::Integer),
                )
                .with_default(20),
            )
            .with_parameter(ParameterSpec::new(
                "q",
                ParamLocation::Query,
                ObjectBuilder::new().schema_type(Type::String),
            ));
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&OptionalParameters, &mut operation, &cx);

        let limit = operation
            .parameters
            .iter()
            .find(|it| it.inner.name == "limit")
            .expect("limit parameter");
        assert_eq!(limit.inner.required, Required::False);
        let query = operation
            .parameters
            .iter()
            .find(|it| it.inner.name == "q")
            .expect("q parameter");
        assert_eq!(query.inner.required, Required::True);
    }

    #[test]
    fn should_expand_array_query_parameters() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let items = ArrayBuilder::new()
            .items(ArrayItems::RefOrSchema(Box::new(RefOr::T(Schema::Object(
                ObjectBuilder::new().schema_type(Type::String).build(),
            )))))
            .build();
        let discovered = catalog_operation().with_parameter(ParameterSpec::new(
            "ids",
            ParamLocation::Query,
            Schema::Array(items),
        ));
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&ArrayInQueryParameters, &mut operation, &cx);

        let ids = operation
            .parameters
            .iter()
            .find(|it| it.inner.name == "ids")
            .expect("ids parameter");
        assert_eq!(ids.inner.style, Some(ParameterStyle::Form));
        assert_eq!(ids.inner.explode, Some(true));
    }

    #[test]
    fn should_inject_security_and_error_responses() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered =
            catalog_operation().with_authorization(AuthPolicy::new(["catalog:read"]));
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&SecurityRequirements, &mut operation, &cx);
        apply(&SecurityRequirements, &mut operation, &cx);

        assert!(operation.security.is_some());
        let statuses: Vec<_> = operation.responses.iter().map(|it| it.status).collect();
        assert_eq!(statuses.iter().filter(|&&it| it == 401).count(), 1);
        assert_eq!(statuses.iter().filter(|&&it| it == 403).count(), 1);
    }

    #[test]
    fn should_override_tags_with_module_name() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered = catalog_operation().with_tags(["hand-written-tag"]);
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&ModuleTag, &mut operation, &cx);
        assert_eq!(operation.tags, vec!["CatalogModule"]);
    }

    #[test]
    fn should_fall_back_to_platform_tag_for_unowned_units() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };
        let discovered = DiscoveredOperation::new(
            Method::GET,
            "/api/ping",
            UnitRef::new(UnitId(99), "Stray.Api"),
            "Ping",
            "get",
        );
        let mut operation = OperationBuild::from_discovered(&discovered);

        apply(&ModuleTag, &mut operation, &cx);
        assert_eq!(operation.tags, vec!["Platform"]);
    }

    #[test]
    fn should_describe_token_endpoint_only() {
        let (config, registry, shapes) = context_fixtures();
        let cx = FilterContext {
            config: &config,
            registry: &registry,
            shapes: &shapes,
        };

        let discovered = DiscoveredOperation::new(
            Method::POST,
            "/connect/token",
            UnitRef::new(UnitId(1), "Platform.Web"),
            "Token",
            "issue",
        );
        let mut operation = OperationBuild::from_discovered(&discovered);
        apply(&TokenEndpointDescription, &mut operation, &cx);
        assert!(operation.description.is_some());

        let mut other = OperationBuild::from_discovered(&catalog_operation());
        apply(&TokenEndpointDescription, &mut other, &cx);
        assert!(other.description.is_none());
    }
}
