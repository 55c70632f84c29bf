//! Type identities and the shape table.
//!
//! Every request/response type referenced by a discovered operation is
//! registered here under its *qualified* name (dotted namespace plus simple
//! name, e.g. `Catalog.Address`). Inside the table, `$ref`s between shapes
//! use the qualified name as a placeholder; the document assembler rewrites
//! them to document-scoped schema ids at emission time, so the same shape can
//! carry different ids in different documents.

use indexmap::{IndexMap, IndexSet};
use utoipa::openapi::schema::ArrayItems;
use utoipa::openapi::{Ref, RefOr, Schema};

use crate::generator::FilterError;

/// Identity of a data shape: qualified name plus derived simple name.
///
/// Two idents collide within a document when their simple names match but
/// their qualified names differ.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
#[display("{qualified}")]
pub struct TypeIdent {
    qualified: String,
    simple: String,
}

impl TypeIdent {
    /// Creates an ident from a dotted qualified name.
    ///
    /// The simple name is the last dot-separated segment, so
    /// `TypeIdent::new("Catalog.Address")` has simple name `Address`.
    pub fn new(qualified: impl Into<String>) -> Self {
        let qualified = qualified.into();
        let simple = qualified
            .rsplit('.')
            .next()
            .unwrap_or(qualified.as_str())
            .to_string();
        Self { qualified, simple }
    }

    /// The full qualified name.
    pub fn qualified(&self) -> &str {
        &self.qualified
    }

    /// The simple (unqualified) name.
    pub fn simple(&self) -> &str {
        &self.simple
    }
}

/// Builds the internal `$ref` placeholder for a shape.
///
/// Placeholders point at the qualified name and are only valid until the
/// assembler rewrites them to the document's resolved schema ids.
pub fn schema_ref(ident: &TypeIdent) -> RefOr<Schema> {
    RefOr::Ref(Ref::from_schema_name(ident.qualified()))
}

/// One registered shape with its metadata.
#[derive(Debug, Clone)]
pub struct ShapeEntry {
    /// Identity of the shape.
    pub ident: TypeIdent,
    /// The schema; nested `$ref`s use qualified-name placeholders.
    pub schema: Schema,
    /// Shapes this one references, directly or by declaration (e.g.
    /// polymorphic variants reachable through a discriminator).
    pub depends_on: Vec<TypeIdent>,
    /// Variant names for enum shapes, applied to the emitted schema.
    pub enum_variants: Option<Vec<String>>,
    /// Property names stripped from the emitted schema.
    pub ignored_properties: Vec<String>,
}

impl ShapeEntry {
    /// Creates a shape entry without metadata.
    pub fn new(ident: TypeIdent, schema: impl Into<Schema>) -> Self {
        Self {
            ident,
            schema: schema.into(),
            depends_on: Vec::new(),
            enum_variants: None,
            ignored_properties: Vec::new(),
        }
    }

    /// Declares direct dependencies on other shapes.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = TypeIdent>) -> Self {
        self.depends_on = deps.into_iter().collect();
        self
    }

    /// Declares this shape as an enum with the given variant names.
    #[must_use]
    pub fn with_enum_variants(
        mut self,
        variants: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.enum_variants = Some(variants.into_iter().map(Into::into).collect());
        self
    }

    /// Declares properties to strip from the emitted schema.
    #[must_use]
    pub fn with_ignored_properties(
        mut self,
        names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.ignored_properties = names.into_iter().map(Into::into).collect();
        self
    }
}

/// Qualified-name-indexed table of every shape known to the catalog.
#[derive(Debug, Clone, Default)]
pub struct ShapeTable {
    entries: IndexMap<String, ShapeEntry>,
}

impl ShapeTable {
    /// Registers a shape; a later registration under the same qualified name
    /// replaces the earlier one.
    pub fn insert(&mut self, entry: ShapeEntry) {
        self.entries
            .insert(entry.ident.qualified().to_string(), entry);
    }

    /// Looks up a shape by qualified name.
    pub fn get(&self, qualified: &str) -> Option<&ShapeEntry> {
        self.entries.get(qualified)
    }

    /// Number of registered shapes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` when no shape is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Computes the set of qualified names reachable from the given roots by
    /// walking nested `$ref`s and declared dependencies.
    ///
    /// Fails when a root or a transitive dependency has no registered shape:
    /// an emitted document must never contain a dangling reference.
    pub(crate) fn reachable_from<'a>(
        &self,
        roots: impl IntoIterator<Item = &'a str>,
    ) -> Result<IndexSet<String>, FilterError> {
        let mut reachable = IndexSet::new();
        let mut pending: Vec<String> = roots.into_iter().map(ToString::to_string).collect();

        while let Some(qualified) = pending.pop() {
            if reachable.contains(&qualified) {
                continue;
            }
            let Some(entry) = self.entries.get(&qualified) else {
                return Err(FilterError::new(
                    "prune-unreachable-deps",
                    format!("no shape registered for type '{qualified}'"),
                ));
            };
            reachable.insert(qualified);

            let mut nested = IndexSet::new();
            collect_schema_refs(&RefOr::T(entry.schema.clone()), &mut nested);
            pending.extend(nested);
            pending.extend(
                entry
                    .depends_on
                    .iter()
                    .map(|dep| dep.qualified().to_string()),
            );
        }

        Ok(reachable)
    }
}

/// Collects the qualified names of every `$ref` placeholder nested in a
/// schema, in encounter order.
pub(crate) fn collect_schema_refs(schema: &RefOr<Schema>, refs: &mut IndexSet<String>) {
    match schema {
        RefOr::Ref(reference) => {
            if let Some(name) = ref_schema_name(&reference.ref_location) {
                refs.insert(name.to_string());
            }
        }
        RefOr::T(schema) => match schema {
            Schema::Object(object) => {
                for property in object.properties.values() {
                    collect_schema_refs(property, refs);
                }
            }
            Schema::Array(array) => {
                if let ArrayItems::RefOrSchema(items) = &array.items {
                    collect_schema_refs(items, refs);
                }
            }
            Schema::OneOf(one_of) => {
                for item in &one_of.items {
                    collect_schema_refs(item, refs);
                }
            }
            Schema::AllOf(all_of) => {
                for item in &all_of.items {
                    collect_schema_refs(item, refs);
                }
            }
            Schema::AnyOf(any_of) => {
                for item in &any_of.items {
                    collect_schema_refs(item, refs);
                }
            }
            _ => {}
        },
    }
}

const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Extracts the schema name from a `$ref` location.
pub(crate) fn ref_schema_name(ref_location: &str) -> Option<&str> {
    ref_location.strip_prefix(SCHEMA_REF_PREFIX)
}
