//! Document-scoped schema identity resolution.
//!
//! Each document gets its own resolver; the memo table is never shared across
//! documents, so the same type can bind to different ids in sibling
//! documents. Ids are assigned in a second pass, after the document's
//! operation list has been fully walked, so no id is ever observable before
//! it is final and nothing gets renamed retroactively.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};
use tracing::warn;
use utoipa::openapi::schema::ArrayItems;
use utoipa::openapi::{AllOfBuilder, Ref, RefOr, Schema};

use crate::catalog::{TypeIdent, ref_schema_name};

/// How schema ids are chosen for a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum NamingPolicy {
    /// Simple names, falling back to qualified names for *all* members of a
    /// colliding simple-name group. Used for platform and module documents,
    /// where collisions are rare and short ids favor readability.
    ShortWithFallback,
    /// Qualified names from the first reference. Used for the UI document,
    /// which aggregates all modules: collisions there are expected, not
    /// exceptional.
    AlwaysQualified,
}

/// Per-document binding table from qualified type names to schema ids.
///
/// Within one document the mapping is injective: two distinct shapes never
/// share an id.
#[derive(Debug, Clone)]
pub(crate) struct SchemaIdResolver {
    ids: IndexMap<String, String>,
}

impl SchemaIdResolver {
    /// Assigns an id to every referenced qualified name under the given
    /// policy.
    ///
    /// `referenced` must be the complete set for the document (the union of
    /// every operation's pruned type set, in first-reference order).
    pub(crate) fn assign(policy: NamingPolicy, referenced: &IndexSet<String>) -> Self {
        let mut simple_counts: HashMap<&str, usize> = HashMap::new();
        let idents: Vec<TypeIdent> = referenced
            .iter()
            .map(|qualified| TypeIdent::new(qualified.clone()))
            .collect();
        for ident in &idents {
            *simple_counts.entry(ident.simple()).or_insert(0) += 1;
        }

        let ids = idents
            .iter()
            .map(|ident| {
                let id = match policy {
                    NamingPolicy::AlwaysQualified => ident.qualified().to_string(),
                    NamingPolicy::ShortWithFallback => {
                        let collisions =
                            simple_counts.get(ident.simple()).copied().unwrap_or(0);
                        if collisions > 1 {
                            ident.qualified().to_string()
                        } else {
                            ident.simple().to_string()
                        }
                    }
                };
                (ident.qualified().to_string(), id)
            })
            .collect();

        Self { ids }
    }

    /// Resolves the schema id bound to a qualified name.
    pub(crate) fn schema_id(&self, qualified: &str) -> Option<&str> {
        self.ids.get(qualified).map(String::as_str)
    }

    /// Iterates bindings in first-reference order as (qualified name, id).
    pub(crate) fn bindings(&self) -> impl Iterator<Item = (&str, &str)> {
        self.ids
            .iter()
            .map(|(qualified, id)| (qualified.as_str(), id.as_str()))
    }

    /// Rewrites every qualified-name `$ref` placeholder in the schema to its
    /// resolved document-scoped id.
    ///
    /// When `extend` is set, nested references are wrapped in an `allOf`
    /// envelope so contextual metadata can attach at the reference site;
    /// top-level schemas and references already inside an `allOf` are left
    /// bare.
    pub(crate) fn rewrite_refs(&self, schema: &mut RefOr<Schema>, extend: bool) {
        if let RefOr::Ref(reference) = schema {
            self.rewrite_ref(reference);
            return;
        }
        self.rewrite_nested(schema, extend);
    }

    fn rewrite_ref(&self, reference: &mut Ref) {
        let Some(qualified) = ref_schema_name(&reference.ref_location) else {
            return;
        };
        match self.schema_id(qualified) {
            Some(id) => *reference = Ref::from_schema_name(id),
            None => warn!(%qualified, "unresolved schema reference left as-is"),
        }
    }

    fn rewrite_nested(&self, schema: &mut RefOr<Schema>, extend: bool) {
        match schema {
            RefOr::Ref(reference) => {
                self.rewrite_ref(reference);
                if extend {
                    let envelope = AllOfBuilder::new()
                        .item(RefOr::Ref(reference.clone()))
                        .build();
                    *schema = RefOr::T(Schema::AllOf(envelope));
                }
            }
            RefOr::T(inner) => match inner {
                Schema::Object(object) => {
                    for property in object.properties.values_mut() {
                        self.rewrite_nested(property, extend);
                    }
                }
                Schema::Array(array) => {
                    if let ArrayItems::RefOrSchema(items) = &mut array.items {
                        self.rewrite_nested(items, extend);
                    }
                }
                Schema::OneOf(one_of) => {
                    for item in &mut one_of.items {
                        self.rewrite_nested(item, false);
                    }
                }
                Schema::AllOf(all_of) => {
                    // Members of an existing allOf stay bare, which also keeps
                    // the envelope from nesting into itself.
                    for item in &mut all_of.items {
                        self.rewrite_nested(item, false);
                    }
                }
                Schema::AnyOf(any_of) => {
                    for item in &mut any_of.items {
                        self.rewrite_nested(item, false);
                    }
                }
                _ => {}
            },
        }
    }
}
