//! Module registry snapshot.
//!
//! The registry is built once per generation pass by the module loader and
//! handed to the [`DocumentGenerator`](crate::DocumentGenerator) as a
//! read-only argument. Only activated modules (those with a running instance)
//! are expected to appear in the snapshot; the loader filters out the rest
//! before the snapshot is taken.
//!
//! Module ownership is decided by *reference identity* of the compiled unit
//! that declared an operation handler, never by comparing unit names: two
//! same-named modules loaded from different units must never be conflated.

/// Opaque identity of a compiled unit (the assembly/dylib a handler was
/// loaded from).
///
/// Identity is assigned by whoever discovers the units; equal ids mean "the
/// very same loaded unit".
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display,
)]
#[display("unit#{_0}")]
pub struct UnitId(pub u64);

/// Reference to the compiled unit that declared an operation handler.
///
/// Carries both the identity (for module matching) and the unit's qualified
/// name (for the platform-prefix classification rule).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRef {
    /// Reference identity of the unit.
    pub id: UnitId,
    /// Qualified unit name, e.g. `Platform.Web` or `Catalog.Api`.
    pub name: String,
}

impl UnitRef {
    /// Creates a unit reference.
    pub fn new(id: UnitId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An activated module as seen by the generation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleInfo {
    /// Module name, unique within the registry; also the name of the module's
    /// document.
    pub name: String,
    /// Module id, used for presentation ordering of module listings.
    pub id: String,
    /// The compiled unit owned by this module.
    pub unit: UnitId,
}

impl ModuleInfo {
    /// Creates a module description.
    pub fn new(name: impl Into<String>, id: impl Into<String>, unit: UnitId) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
            unit,
        }
    }
}

/// Read-only snapshot of the activated modules.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ModuleInfo>,
}

impl ModuleRegistry {
    /// Creates a registry from the loader's activated-module snapshot.
    ///
    /// Malformed entries (empty or duplicate names) are kept as-is here and
    /// surface as per-document registration failures during generation, so a
    /// single bad module cannot poison its siblings.
    pub fn new(modules: impl IntoIterator<Item = ModuleInfo>) -> Self {
        Self {
            modules: modules.into_iter().collect(),
        }
    }

    /// All activated modules, in loader order.
    pub fn modules(&self) -> &[ModuleInfo] {
        &self.modules
    }

    /// Looks up a module by name, case-insensitively.
    ///
    /// Returns the first match in loader order; duplicate names are rejected
    /// at document-generation time.
    pub fn find_by_name(&self, name: &str) -> Option<&ModuleInfo> {
        self.modules
            .iter()
            .find(|module| module.name.eq_ignore_ascii_case(name))
    }

    /// Looks up the module owning the given unit, by reference identity.
    pub fn module_for_unit(&self, unit: UnitId) -> Option<&ModuleInfo> {
        self.modules.iter().find(|module| module.unit == unit)
    }

    /// Modules ordered by id, the order used for endpoint listings.
    pub fn modules_by_id(&self) -> Vec<&ModuleInfo> {
        let mut ordered: Vec<_> = self.modules.iter().collect();
        ordered.sort_by(|left, right| left.id.cmp(&right.id));
        ordered
    }

    /// Returns `true` when more than one activated module carries this name
    /// (case-insensitively).
    pub(crate) fn is_ambiguous_name(&self, name: &str) -> bool {
        self.modules
            .iter()
            .filter(|module| module.name.eq_ignore_ascii_case(name))
            .count()
            > 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_registry() -> ModuleRegistry {
        ModuleRegistry::new([
            ModuleInfo::new("CatalogModule", "Acme.Catalog", UnitId(10)),
            ModuleInfo::new("OrderModule", "Acme.Order", UnitId(11)),
        ])
    }

    #[test]
    fn should_find_module_by_name_case_insensitively() {
        let registry = sample_registry();

        let module = registry.find_by_name("catalogmodule");
        assert_eq!(module.map(|it| it.unit), Some(UnitId(10)));
    }

    #[test]
    fn should_resolve_module_by_unit_identity() {
        let registry = sample_registry();

        assert_eq!(
            registry.module_for_unit(UnitId(11)).map(|it| it.name.as_str()),
            Some("OrderModule")
        );
        assert!(registry.module_for_unit(UnitId(99)).is_none());
    }

    #[test]
    fn should_order_modules_by_id() {
        let registry = ModuleRegistry::new([
            ModuleInfo::new("Zeta", "b-zeta", UnitId(2)),
            ModuleInfo::new("Alpha", "a-alpha", UnitId(1)),
        ]);

        let names: Vec<_> = registry
            .modules_by_id()
            .into_iter()
            .map(|it| it.name.as_str())
            .collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn should_detect_ambiguous_names() {
        let registry = ModuleRegistry::new([
            ModuleInfo::new("Shipping", "a", UnitId(1)),
            ModuleInfo::new("shipping", "b", UnitId(2)),
        ]);

        assert!(registry.is_ambiguous_name("Shipping"));
        assert!(!sample_registry().is_ambiguous_name("CatalogModule"));
    }
}
