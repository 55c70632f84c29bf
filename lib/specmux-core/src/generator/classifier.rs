//! Document classification.
//!
//! Decides, for each (document name, operation) pair, whether the operation
//! belongs in that document. The decision is a pure function of the document
//! name, the operation's owning unit, and the registry snapshot, so repeated
//! classification of the same pair is always identical.

use crate::catalog::DiscoveredOperation;
use crate::config::GeneratorConfig;
use crate::registry::ModuleRegistry;

/// Returns `true` when the operation belongs in the named document.
///
/// Rules, first match wins:
///
/// 1. The UI document aggregates every operation.
/// 2. The platform document takes operations whose owning unit name starts
///    with the platform document name, plus operations no activated module
///    claims (unowned operations default to the platform).
/// 3. A module document takes operations whose owning unit *is* the module's
///    unit, by reference identity — never by unit name, so same-named
///    modules are never conflated.
/// 4. Anything else: no.
pub(crate) fn belongs_to(
    config: &GeneratorConfig,
    registry: &ModuleRegistry,
    document_name: &str,
    operation: &DiscoveredOperation,
) -> bool {
    // UI endpoint: return all, to correctly build the browsing page.
    if document_name.eq_ignore_ascii_case(&config.ui_doc_name) {
        return true;
    }

    // Platform endpoint, including the unowned fallback.
    if document_name.eq_ignore_ascii_case(&config.platform_doc_name) {
        return operation.unit.name.starts_with(&config.platform_doc_name)
            || registry.module_for_unit(operation.unit.id).is_none();
    }

    // Module endpoint.
    registry
        .find_by_name(document_name)
        .is_some_and(|module| module.unit == operation.unit.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{ModuleInfo, UnitId, UnitRef};
    use http::Method;
    use rstest::rstest;

    fn config() -> GeneratorConfig {
        GeneratorConfig::default()
    }

    fn registry() -> ModuleRegistry {
        ModuleRegistry::new([
            ModuleInfo::new("CatalogModule", "Acme.Catalog", UnitId(10)),
            ModuleInfo::new("OrderModule", "Acme.Order", UnitId(11)),
        ])
    }

    fn operation(unit: UnitRef) -> DiscoveredOperation {
        DiscoveredOperation::new(Method::GET, "/api/ping", unit, "Ping", "get")
    }

    #[rstest]
    // UI takes everything.
    #[case("PlatformUI", UnitRef::new(UnitId(10), "Catalog.Api"), true)]
    #[case("platformui", UnitRef::new(UnitId(1), "Platform.Web"), true)]
    #[case("PlatformUI", UnitRef::new(UnitId(99), "Stray.Api"), true)]
    // Platform takes its own units and unowned units.
    #[case("Platform", UnitRef::new(UnitId(1), "Platform.Web"), true)]
    #[case("platform", UnitRef::new(UnitId(1), "Platform.Web"), true)]
    #[case("Platform", UnitRef::new(UnitId(99), "Stray.Api"), true)]
    #[case("Platform", UnitRef::new(UnitId(10), "Catalog.Api"), false)]
    // Module documents match by unit identity.
    #[case("CatalogModule", UnitRef::new(UnitId(10), "Catalog.Api"), true)]
    #[case("catalogmodule", UnitRef::new(UnitId(10), "Catalog.Api"), true)]
    #[case("CatalogModule", UnitRef::new(UnitId(11), "Order.Api"), false)]
    #[case("OrderModule", UnitRef::new(UnitId(10), "Catalog.Api"), false)]
    // Unknown document names match nothing.
    #[case("NotADocument", UnitRef::new(UnitId(10), "Catalog.Api"), false)]
    fn should_classify(#[case] document: &str, #[case] unit: UnitRef, #[case] expected: bool) {
        let actual = belongs_to(&config(), &registry(), document, &operation(unit));
        assert_eq!(actual, expected);
    }

    #[test]
    fn should_be_deterministic() {
        let config = config();
        let registry = registry();
        let operation = operation(UnitRef::new(UnitId(10), "Catalog.Api"));

        let first = belongs_to(&config, &registry, "CatalogModule", &operation);
        let second = belongs_to(&config, &registry, "CatalogModule", &operation);
        assert_eq!(first, second);
    }

    #[test]
    fn should_never_conflate_same_named_units() {
        // A stray unit that mimics the catalog unit's *name* must not land in
        // the catalog module document; identity decides.
        let config = config();
        let registry = registry();
        let impostor = operation(UnitRef::new(UnitId(66), "Catalog.Api"));

        assert!(!belongs_to(&config, &registry, "CatalogModule", &impostor));
    }
}
