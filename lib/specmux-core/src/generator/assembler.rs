//! Document assembly.
//!
//! Combines the classified, filtered operations of one document into the
//! final `utoipa` OpenAPI artifact: first-wins route-conflict resolution,
//! catalog-order emission, schema-id resolution and `$ref` rewriting, the
//! components section (schemas plus the oauth2 scheme), and per-document
//! info metadata.

use std::collections::BTreeSet;

use indexmap::{IndexMap, IndexSet};
use tracing::warn;
use utoipa::openapi::path::{Operation, PathItem};
use utoipa::openapi::request_body::RequestBody;
use utoipa::openapi::security::{Flow, OAuth2, Password, Scopes, SecurityScheme};
use utoipa::openapi::{
    Components, ContactBuilder, Content, Info, InfoBuilder, LicenseBuilder, OpenApi, Paths,
    Required, ResponseBuilder, ResponsesBuilder, Schema, Tag,
};

use crate::catalog::{ShapeEntry, ShapeTable};
use crate::config::GeneratorConfig;

use super::filters::{OAUTH2_SCHEME_NAME, OperationBuild, ResponseBuild};
use super::schema_ids::{NamingPolicy, SchemaIdResolver};
use super::DocumentKind;

/// Assembles one document from its pipeline-processed operations.
///
/// `operations` must be in catalog order; duplicate (route, verb) pairs keep
/// the first occurrence and the rest are dropped with a warning.
pub(crate) fn assemble(
    document_name: &str,
    kind: &DocumentKind,
    operations: Vec<OperationBuild>,
    shapes: &ShapeTable,
    config: &GeneratorConfig,
) -> OpenApi {
    let kept = resolve_route_conflicts(document_name, operations);

    // Second pass: the full reference set is known before any id is assigned.
    let mut referenced = IndexSet::new();
    for operation in &kept {
        referenced.extend(operation.type_refs.iter().cloned());
    }
    let policy = match kind {
        DocumentKind::Ui => NamingPolicy::AlwaysQualified,
        DocumentKind::Platform | DocumentKind::Module { .. } => NamingPolicy::ShortWithFallback,
    };
    let resolver = SchemaIdResolver::assign(policy, &referenced);
    let extend = config.extend_reference_schemas;

    let tags = collect_tags(&kept);

    let mut paths = IndexMap::<String, PathItem>::new();
    for operation in &kept {
        let assembled = build_operation(operation, &resolver, extend);
        let item = paths.entry(operation.route.clone()).or_default();
        match operation.method {
            http::Method::GET => item.get = Some(assembled),
            http::Method::PUT => item.put = Some(assembled),
            http::Method::POST => item.post = Some(assembled),
            http::Method::DELETE => item.delete = Some(assembled),
            http::Method::OPTIONS => item.options = Some(assembled),
            http::Method::HEAD => item.head = Some(assembled),
            http::Method::PATCH => item.patch = Some(assembled),
            http::Method::TRACE => item.trace = Some(assembled),
            ref method => {
                warn!(%method, document = document_name, "unsupported method");
            }
        }
    }

    let mut paths_builder = Paths::builder();
    for (route, item) in paths {
        paths_builder = paths_builder.path(route, item);
    }

    let components = build_components(&resolver, shapes, config, extend);

    let mut builder = OpenApi::builder()
        .info(document_info(kind, config))
        .paths(paths_builder.build())
        .components(Some(components));
    if !tags.is_empty() {
        builder = builder.tags(Some(tags));
    }
    builder.build()
}

/// Keeps exactly the first operation per (route, verb), in catalog order.
fn resolve_route_conflicts(
    document_name: &str,
    operations: Vec<OperationBuild>,
) -> Vec<OperationBuild> {
    let mut seen = IndexSet::new();
    let mut kept = Vec::with_capacity(operations.len());
    for operation in operations {
        let key = (operation.route.clone(), operation.method.clone());
        if seen.contains(&key) {
            warn!(
                document = document_name,
                route = %operation.route,
                method = %operation.method,
                operation_id = %operation.operation_id,
                "duplicate route registration, keeping the first occurrence"
            );
            continue;
        }
        seen.insert(key);
        kept.push(operation);
    }
    kept
}

/// Unique display tags across the document's operations.
fn collect_tags(operations: &[OperationBuild]) -> Vec<Tag> {
    let mut names = BTreeSet::new();
    for operation in operations {
        for tag in &operation.tags {
            names.insert(tag.clone());
        }
    }
    names.into_iter().map(Tag::new).collect()
}

fn build_operation(
    operation: &OperationBuild,
    resolver: &SchemaIdResolver,
    extend: bool,
) -> Operation {
    let mut builder = Operation::builder()
        .operation_id(Some(operation.operation_id.clone()))
        .summary(operation.summary.clone())
        .description(operation.description.clone());

    if !operation.tags.is_empty() {
        builder = builder.tags(Some(operation.tags.clone()));
    }

    let parameters: Vec<_> = operation
        .parameters
        .iter()
        .map(|parameter| {
            let mut inner = parameter.inner.clone();
            if let Some(schema) = &mut inner.schema {
                resolver.rewrite_refs(schema, extend);
            }
            inner
        })
        .collect();
    if !parameters.is_empty() {
        builder = builder.parameters(Some(parameters));
    }

    if let Some(body) = &operation.request_body {
        let mut schema = body.schema.clone();
        resolver.rewrite_refs(&mut schema, extend);
        let mut request_body = RequestBody::builder().required(Some(if body.required {
            Required::True
        } else {
            Required::False
        }));
        for media_type in &body.media_types {
            let content = Content::builder().schema(Some(schema.clone())).build();
            request_body = request_body.content(media_type, content);
        }
        builder = builder.request_body(Some(request_body.build()));
    }

    if let Some(security) = &operation.security {
        builder = builder.securities(Some(security.clone()));
    }

    let mut responses = ResponsesBuilder::new();
    for response in &operation.responses {
        responses = responses.response(
            response.status.to_string(),
            build_response(response, resolver, extend),
        );
    }
    builder = builder.responses(responses.build());

    builder.build()
}

fn build_response(
    response: &ResponseBuild,
    resolver: &SchemaIdResolver,
    extend: bool,
) -> utoipa::openapi::Response {
    let mut builder = ResponseBuilder::new().description(&response.description);
    if let (Some(media_type), Some(schema)) = (&response.media_type, &response.schema) {
        let mut schema = schema.clone();
        resolver.rewrite_refs(&mut schema, extend);
        let content = Content::builder().schema(Some(schema)).build();
        builder = builder.content(media_type, content);
    }
    builder.build()
}

/// Builds the components section: resolved schemas in first-reference order
/// plus the oauth2 scheme definition.
fn build_components(
    resolver: &SchemaIdResolver,
    shapes: &ShapeTable,
    config: &GeneratorConfig,
    extend: bool,
) -> Components {
    let mut components = Components::new();
    for (qualified, id) in resolver.bindings() {
        let Some(entry) = shapes.get(qualified) else {
            // The pipeline verified reachability, so this cannot happen for
            // operations that survived it.
            warn!(%qualified, "schema binding without a registered shape");
            continue;
        };
        let mut schema = entry.schema.clone();
        apply_shape_metadata(&mut schema, entry);
        let mut schema = utoipa::openapi::RefOr::T(schema);
        resolver.rewrite_refs(&mut schema, extend);
        components.schemas.insert(id.to_string(), schema);
    }

    components
        .security_schemes
        .insert(OAUTH2_SCHEME_NAME.to_string(), oauth2_scheme(config));
    components
}

/// Applies enum-variant and ignored-property metadata to an emitted schema.
fn apply_shape_metadata(schema: &mut Schema, entry: &ShapeEntry) {
    let Schema::Object(object) = schema else {
        return;
    };
    if let Some(variants) = &entry.enum_variants {
        object.enum_values = Some(
            variants
                .iter()
                .map(|variant| serde_json::Value::String(variant.clone()))
                .collect(),
        );
    }
    if !entry.ignored_properties.is_empty() {
        object
            .properties
            .retain(|name, _| !entry.ignored_properties.contains(name));
        object
            .required
            .retain(|name| !entry.ignored_properties.contains(name));
    }
}

fn oauth2_scheme(config: &GeneratorConfig) -> SecurityScheme {
    let password = Password::new(&config.token_endpoint, Scopes::new());
    SecurityScheme::OAuth2(OAuth2::with_description(
        [Flow::Password(password)],
        "OAuth2 Resource Owner Password Grant flow",
    ))
}

/// Per-document info metadata: platform and UI documents share the platform
/// info block; module documents are titled by module id.
fn document_info(kind: &DocumentKind, config: &GeneratorConfig) -> Info {
    match kind {
        DocumentKind::Platform | DocumentKind::Ui => {
            let contact = (config.contact_name.is_some()
                || config.contact_email.is_some()
                || config.contact_url.is_some())
            .then(|| {
                ContactBuilder::new()
                    .name(config.contact_name.clone())
                    .email(config.contact_email.clone())
                    .url(config.contact_url.clone())
                    .build()
            });
            let license = config.license_name.as_ref().map(|name| {
                LicenseBuilder::new()
                    .name(name)
                    .url(config.license_url.clone())
                    .build()
            });
            InfoBuilder::new()
                .title(&config.title)
                .version(&config.version)
                .description(config.description.clone())
                .contact(contact)
                .license(license)
                .build()
        }
        DocumentKind::Module { id, .. } => InfoBuilder::new()
            .title(id)
            .version("v1")
            .build(),
    }
}
