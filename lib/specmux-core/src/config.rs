//! Generator configuration.
//!
//! Read once at startup (typically bound from the host's configuration tree
//! via serde) and passed into the generator; never re-evaluated per request.

use serde::{Deserialize, Serialize};

/// Default name of the aggregate platform document.
pub const DEFAULT_PLATFORM_DOC_NAME: &str = "Platform";

/// Default name of the superset document backing the browsing UI.
pub const DEFAULT_UI_DOC_NAME: &str = "PlatformUI";

/// Default token-issuing endpoint, annotated by the filter pipeline and used
/// as the oauth2 password-flow token URL.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "/connect/token";

/// Static configuration for a generation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GeneratorConfig {
    /// Master switch; when off, no document is generated.
    pub enabled: bool,
    /// When set, nested schema references are wrapped in an `allOf` envelope
    /// so contextual metadata can attach at the reference site.
    pub extend_reference_schemas: bool,
    /// Name of the aggregate platform document; also the unit-name prefix
    /// identifying platform-owned operations.
    pub platform_doc_name: String,
    /// Name of the superset UI document.
    pub ui_doc_name: String,
    /// Title of the platform and UI documents.
    pub title: String,
    /// Version stamped on every document.
    pub version: String,
    /// Description of the platform and UI documents.
    pub description: Option<String>,
    /// Contact name for the platform info block.
    pub contact_name: Option<String>,
    /// Contact email for the platform info block.
    pub contact_email: Option<String>,
    /// Contact URL for the platform info block.
    pub contact_url: Option<String>,
    /// License name for the platform info block.
    pub license_name: Option<String>,
    /// License URL for the platform info block.
    pub license_url: Option<String>,
    /// Token-issuing endpoint route.
    pub token_endpoint: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            extend_reference_schemas: false,
            platform_doc_name: DEFAULT_PLATFORM_DOC_NAME.to_string(),
            ui_doc_name: DEFAULT_UI_DOC_NAME.to_string(),
            title: "Platform REST API".to_string(),
            version: "v1".to_string(),
            description: None,
            contact_name: None,
            contact_email: None,
            contact_url: None,
            license_name: None,
            license_url: None,
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
        }
    }
}

impl GeneratorConfig {
    /// Creates the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Disables generation.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Enables the `allOf` envelope around nested schema references.
    #[must_use]
    pub fn with_extended_reference_schemas(mut self) -> Self {
        self.extend_reference_schemas = true;
        self
    }

    /// Sets the platform and UI document titles.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets the document version.
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Sets the platform document description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides the platform document name (and the platform unit-name
    /// prefix).
    #[must_use]
    pub fn with_platform_doc_name(mut self, name: impl Into<String>) -> Self {
        self.platform_doc_name = name.into();
        self
    }

    /// Overrides the UI document name.
    #[must_use]
    pub fn with_ui_doc_name(mut self, name: impl Into<String>) -> Self {
        self.ui_doc_name = name.into();
        self
    }

    /// Overrides the token endpoint route.
    #[must_use]
    pub fn with_token_endpoint(mut self, route: impl Into<String>) -> Self {
        self.token_endpoint = route.into();
        self
    }
}
