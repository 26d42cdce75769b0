//! Category registry.
//!
//! A static table describing every resource category the teardown knows
//! about: where it is listed, how a listing is shaped, whether it must be
//! undeployed first, what it is nested under, and which names are never
//! touched. [`TEARDOWN_ORDER`] fixes the global order in which top-level
//! categories are processed.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CategoryKind {
    Developer,
    App,
    ApiProduct,
    Report,
    SharedFlow,
    Extension,
    ApiProxy,
    Portal,
    Spec,
}

/// Base URL a path is resolved against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Host {
    /// `{management}/organizations/{org}/...`
    Organization,
    /// `{management}/...`
    Management,
    /// `{portal_api}/...`
    PortalApi,
}

/// A resolved API location, before it is joined with a base URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: Host,
    /// Slash-separated path; each segment is percent-encoded when joined.
    pub path: String,
    pub query: Vec<(&'static str, String)>,
}

impl Endpoint {
    pub fn organization(path: impl Into<String>) -> Self {
        Self::new(Host::Organization, path)
    }

    pub fn management(path: impl Into<String>) -> Self {
        Self::new(Host::Management, path)
    }

    pub fn portal_api(path: impl Into<String>) -> Self {
        Self::new(Host::PortalApi, path)
    }

    fn new(host: Host, path: impl Into<String>) -> Self {
        Self {
            host,
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }
}

/// How a listing response is shaped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListShape {
    /// `["a", "b"]`
    Names,
    /// `{ "qualifier": [ { "name": "a" } ] }`
    Qualifier,
    /// `{ container: [ { key: "a" } ] }`; a bare array of objects is accepted too.
    Field {
        container: &'static str,
        key: &'static str,
    },
}

/// What a category's listing is scoped under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Organization,
    /// Listed under one resource of the parent category.
    Parent(CategoryKind),
    /// Listed once per environment.
    Environment,
}

/// Concrete scope value for one listing call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListScope<'a> {
    Organization,
    Parent(&'a str),
    Environment(&'a str),
}

impl ListScope<'_> {
    /// Parent or environment name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Self::Organization => None,
            Self::Parent(name) | Self::Environment(name) => Some(name),
        }
    }
}

/// How a deployable resource is taken out of an environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Undeploy {
    /// `DELETE environments/{env}/{collection}/{id}/revisions/{rev}/deployments`
    Revision,
    /// `PATCH environments/{env}/{collection}/{id}` with `{"state":"UNDEPLOYED"}`
    StatePatch,
}

/// How a resource is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removal {
    /// `DELETE` on the resource path.
    Delete,
    /// `POST` to the portal's trash endpoint.
    Trash,
}

/// Static description of one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceCategory {
    pub kind: CategoryKind,
    /// Stable key used on the command line and in config.
    pub key: &'static str,
    pub label: &'static str,
    pub plural: &'static str,
    pub scope: Scope,
    pub list_shape: ListShape,
    pub undeploy: Option<Undeploy>,
    pub removal: Removal,
    /// Whether calls carry `X-Org-Name`.
    pub org_header: bool,
    /// Names that are never undeployed or deleted.
    pub exclusions: &'static [&'static str],
}

/// Top-level categories in the order they are torn down. Nested categories
/// are handled while processing their parent.
pub const TEARDOWN_ORDER: &[CategoryKind] = &[
    CategoryKind::Developer,
    CategoryKind::ApiProduct,
    CategoryKind::Report,
    CategoryKind::SharedFlow,
    CategoryKind::Extension,
    CategoryKind::ApiProxy,
    CategoryKind::Portal,
    CategoryKind::Spec,
];

/// Proxies provisioned with every organization.
pub const PROTECTED_PROXIES: &[&str] = &["oauth", "helloworld", "apigee-test_bundle"];

static CATEGORIES: &[ResourceCategory] = &[
    ResourceCategory {
        kind: CategoryKind::Developer,
        key: "developers",
        label: "Developer",
        plural: "Developers",
        scope: Scope::Organization,
        list_shape: ListShape::Names,
        undeploy: None,
        removal: Removal::Delete,
        org_header: false,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::App,
        key: "apps",
        label: "App",
        plural: "Apps",
        scope: Scope::Parent(CategoryKind::Developer),
        list_shape: ListShape::Names,
        undeploy: None,
        removal: Removal::Delete,
        org_header: false,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::ApiProduct,
        key: "products",
        label: "API Product",
        plural: "API Products",
        scope: Scope::Organization,
        list_shape: ListShape::Names,
        undeploy: None,
        removal: Removal::Delete,
        org_header: false,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::Report,
        key: "reports",
        label: "Custom Report",
        plural: "Custom Reports",
        scope: Scope::Organization,
        list_shape: ListShape::Qualifier,
        undeploy: None,
        removal: Removal::Delete,
        org_header: false,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::SharedFlow,
        key: "sharedflows",
        label: "Shared Flow",
        plural: "Shared Flows",
        scope: Scope::Organization,
        list_shape: ListShape::Names,
        undeploy: Some(Undeploy::Revision),
        removal: Removal::Delete,
        org_header: false,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::Extension,
        key: "extensions",
        label: "Extension",
        plural: "Extensions",
        scope: Scope::Environment,
        list_shape: ListShape::Field {
            container: "contents",
            key: "id",
        },
        undeploy: Some(Undeploy::StatePatch),
        removal: Removal::Delete,
        org_header: false,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::ApiProxy,
        key: "proxies",
        label: "API Proxy",
        plural: "API Proxies",
        scope: Scope::Organization,
        list_shape: ListShape::Names,
        undeploy: Some(Undeploy::Revision),
        removal: Removal::Delete,
        org_header: false,
        exclusions: PROTECTED_PROXIES,
    },
    ResourceCategory {
        kind: CategoryKind::Portal,
        key: "portals",
        label: "API Portal",
        plural: "API Portals",
        scope: Scope::Organization,
        list_shape: ListShape::Field {
            container: "data",
            key: "id",
        },
        undeploy: None,
        removal: Removal::Trash,
        org_header: true,
        exclusions: &[],
    },
    ResourceCategory {
        kind: CategoryKind::Spec,
        key: "specs",
        label: "Spec",
        plural: "Specs",
        scope: Scope::Organization,
        list_shape: ListShape::Field {
            container: "contents",
            key: "self",
        },
        undeploy: None,
        removal: Removal::Delete,
        org_header: true,
        exclusions: &[],
    },
];

/// Every registered category.
pub fn all() -> &'static [ResourceCategory] {
    CATEGORIES
}

/// Look up a category.
pub fn category(kind: CategoryKind) -> &'static ResourceCategory {
    CATEGORIES
        .iter()
        .find(|c| c.kind == kind)
        .unwrap_or_else(|| unreachable!("category {kind:?} missing from registry"))
}

/// Categories nested under `kind`, in registry order.
pub fn children(kind: CategoryKind) -> impl Iterator<Item = &'static ResourceCategory> {
    CATEGORIES
        .iter()
        .filter(move |c| c.scope == Scope::Parent(kind))
}

/// Full processing sequence: every top-level category preceded by the
/// categories nested under it.
pub fn teardown_sequence() -> Vec<CategoryKind> {
    let mut sequence = Vec::with_capacity(CATEGORIES.len());
    for &kind in TEARDOWN_ORDER {
        push_subtree(kind, &mut sequence);
    }
    sequence
}

fn push_subtree(kind: CategoryKind, sequence: &mut Vec<CategoryKind>) {
    for child in children(kind) {
        push_subtree(child.kind, sequence);
    }
    sequence.push(kind);
}

/// Listing endpoint used to discover environments for per-environment categories.
pub fn environments_endpoint() -> Endpoint {
    Endpoint::organization("environments")
}

impl CategoryKind {
    pub fn category(self) -> &'static ResourceCategory {
        category(self)
    }

    pub fn key(self) -> &'static str {
        self.category().key
    }

    pub fn parent(self) -> Option<CategoryKind> {
        match self.category().scope {
            Scope::Parent(parent) => Some(parent),
            Scope::Organization | Scope::Environment => None,
        }
    }
}

impl fmt::Display for CategoryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CategoryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let alias = match wanted.as_str() {
            "developer" | "devs" => "developers",
            "app" => "apps",
            "product" | "apiproducts" | "api-products" => "products",
            "report" => "reports",
            "sharedflow" | "shared-flows" | "flows" => "sharedflows",
            "extension" => "extensions",
            "proxy" | "apis" | "api-proxies" => "proxies",
            "portal" | "sites" => "portals",
            "spec" => "specs",
            other => other,
        };
        CATEGORIES
            .iter()
            .find(|c| c.key == alias)
            .map(|c| c.kind)
            .ok_or_else(|| format!("unknown category '{}'", s.trim()))
    }
}

impl ResourceCategory {
    pub fn is_deployable(&self) -> bool {
        self.undeploy.is_some()
    }

    pub fn is_excluded(&self, id: &str) -> bool {
        self.exclusions.contains(&id)
    }

    /// Listing endpoint for one scope.
    pub fn list_endpoint(&self, scope: ListScope<'_>, organization: &str) -> Endpoint {
        match (self.kind, scope) {
            (CategoryKind::App, ListScope::Parent(developer)) => {
                Endpoint::organization(format!("developers/{developer}/apps"))
            }
            (CategoryKind::Extension, ListScope::Environment(env)) => {
                Endpoint::organization(format!("environments/{env}/extensions"))
            }
            (CategoryKind::Portal, _) => {
                Endpoint::management("portals/api/sites").with_query("orgname", organization)
            }
            (CategoryKind::Spec, _) => Endpoint::management("homeFolder/contents"),
            _ => Endpoint::organization(self.collection()),
        }
    }

    /// Path of one resource, used for deletion and descriptors.
    pub fn resource_endpoint(&self, id: &str, scope: ListScope<'_>) -> Endpoint {
        match (self.kind, scope) {
            (CategoryKind::App, ListScope::Parent(developer)) => {
                Endpoint::organization(format!("developers/{developer}/apps/{id}"))
            }
            (CategoryKind::Extension, ListScope::Environment(env)) => {
                Endpoint::organization(format!("environments/{env}/extensions/{id}"))
            }
            (CategoryKind::Portal, _) => Endpoint::portal_api(format!("sites/{id}")),
            // Specs are listed by their own `self` path.
            (CategoryKind::Spec, _) => Endpoint::management(id.to_string()),
            _ => Endpoint::organization(format!("{}/{id}", self.collection())),
        }
    }

    /// Endpoint hit to remove one resource.
    pub fn removal_endpoint(&self, id: &str, scope: ListScope<'_>) -> Endpoint {
        let mut endpoint = self.resource_endpoint(id, scope);
        if self.removal == Removal::Trash {
            endpoint.path.push_str("/trash");
        }
        endpoint
    }

    /// Deployment descriptor for revision-deployed resources.
    pub fn deployments_endpoint(&self, id: &str) -> Endpoint {
        Endpoint::organization(format!("{}/{id}/deployments", self.collection()))
    }

    /// Undeploy endpoint for one environment/revision pair.
    pub fn undeploy_endpoint(
        &self,
        id: &str,
        environment: &str,
        revision: Option<&str>,
    ) -> Endpoint {
        match (self.undeploy, revision) {
            (Some(Undeploy::Revision), Some(rev)) => Endpoint::organization(format!(
                "environments/{environment}/{}/{id}/revisions/{rev}/deployments",
                self.collection()
            )),
            _ => Endpoint::organization(format!(
                "environments/{environment}/{}/{id}",
                self.collection()
            )),
        }
    }

    /// Collection segment in management API paths.
    fn collection(&self) -> &'static str {
        match self.kind {
            CategoryKind::Developer => "developers",
            CategoryKind::App => "apps",
            CategoryKind::ApiProduct => "apiproducts",
            CategoryKind::Report => "reports",
            CategoryKind::SharedFlow => "sharedflows",
            CategoryKind::Extension => "extensions",
            CategoryKind::ApiProxy => "apis",
            CategoryKind::Portal => "sites",
            CategoryKind::Spec => "homeFolder",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_kind_registered_once() {
        for category in all() {
            let matches = all().iter().filter(|c| c.kind == category.kind).count();
            assert_eq!(matches, 1, "{:?} registered {} times", category.kind, matches);
        }
    }

    #[test]
    fn test_teardown_order() {
        assert_eq!(
            TEARDOWN_ORDER,
            &[
                CategoryKind::Developer,
                CategoryKind::ApiProduct,
                CategoryKind::Report,
                CategoryKind::SharedFlow,
                CategoryKind::Extension,
                CategoryKind::ApiProxy,
                CategoryKind::Portal,
                CategoryKind::Spec,
            ]
        );
    }

    #[test]
    fn test_sequence_places_children_before_parents() {
        let sequence = teardown_sequence();
        assert_eq!(sequence.len(), all().len());

        for kind in &sequence {
            if let Some(parent) = kind.parent() {
                let child_pos = sequence.iter().position(|k| k == kind).unwrap();
                let parent_pos = sequence.iter().position(|k| *k == parent).unwrap();
                assert!(child_pos < parent_pos, "{kind:?} must precede {parent:?}");
            }
        }
        assert_eq!(&sequence[..2], &[CategoryKind::App, CategoryKind::Developer]);
    }

    #[test]
    fn test_products_precede_proxies() {
        let sequence = teardown_sequence();
        let products = sequence.iter().position(|k| *k == CategoryKind::ApiProduct);
        let proxies = sequence.iter().position(|k| *k == CategoryKind::ApiProxy);
        assert!(products < proxies);
    }

    #[test]
    fn test_deployable_categories() {
        let deployable: Vec<_> = all()
            .iter()
            .filter(|c| c.is_deployable())
            .map(|c| c.kind)
            .collect();
        assert_eq!(
            deployable,
            vec![
                CategoryKind::SharedFlow,
                CategoryKind::Extension,
                CategoryKind::ApiProxy
            ]
        );
    }

    #[test]
    fn test_protected_proxies() {
        let proxies = category(CategoryKind::ApiProxy);
        for name in ["oauth", "helloworld", "apigee-test_bundle"] {
            assert!(proxies.is_excluded(name));
        }
        assert!(!proxies.is_excluded("orders-v1"));
        assert!(!category(CategoryKind::SharedFlow).is_excluded("oauth"));
    }

    #[test]
    fn test_list_endpoints() {
        let apps = category(CategoryKind::App);
        assert_eq!(
            apps.list_endpoint(ListScope::Parent("d1"), "acme"),
            Endpoint::organization("developers/d1/apps")
        );

        let portals = category(CategoryKind::Portal);
        let endpoint = portals.list_endpoint(ListScope::Organization, "acme");
        assert_eq!(endpoint.host, Host::Management);
        assert_eq!(endpoint.path, "portals/api/sites");
        assert_eq!(endpoint.query, vec![("orgname", "acme".to_string())]);

        let extensions = category(CategoryKind::Extension);
        assert_eq!(
            extensions.list_endpoint(ListScope::Environment("test"), "acme"),
            Endpoint::organization("environments/test/extensions")
        );
    }

    #[test]
    fn test_removal_endpoints() {
        let proxies = category(CategoryKind::ApiProxy);
        assert_eq!(
            proxies.removal_endpoint("orders", ListScope::Organization),
            Endpoint::organization("apis/orders")
        );

        let portals = category(CategoryKind::Portal);
        assert_eq!(
            portals.removal_endpoint("site-1", ListScope::Organization),
            Endpoint::portal_api("sites/site-1/trash")
        );

        let specs = category(CategoryKind::Spec);
        assert_eq!(
            specs.removal_endpoint("/homeFolder/contents/42", ListScope::Organization),
            Endpoint::management("/homeFolder/contents/42")
        );
    }

    #[test]
    fn test_undeploy_endpoints() {
        let flows = category(CategoryKind::SharedFlow);
        assert_eq!(
            flows.undeploy_endpoint("sf1", "test", Some("3")),
            Endpoint::organization("environments/test/sharedflows/sf1/revisions/3/deployments")
        );

        let extensions = category(CategoryKind::Extension);
        assert_eq!(
            extensions.undeploy_endpoint("ext-1", "prod", None),
            Endpoint::organization("environments/prod/extensions/ext-1")
        );
    }

    #[test]
    fn test_parse_category_keys_and_aliases() {
        assert_eq!("proxies".parse::<CategoryKind>(), Ok(CategoryKind::ApiProxy));
        assert_eq!("apis".parse::<CategoryKind>(), Ok(CategoryKind::ApiProxy));
        assert_eq!(" Products ".parse::<CategoryKind>(), Ok(CategoryKind::ApiProduct));
        assert_eq!("sharedflow".parse::<CategoryKind>(), Ok(CategoryKind::SharedFlow));
        assert!("databases".parse::<CategoryKind>().is_err());
    }

    #[test]
    fn test_parent_relationships() {
        assert_eq!(CategoryKind::App.parent(), Some(CategoryKind::Developer));
        assert_eq!(CategoryKind::Developer.parent(), None);
        let children: Vec<_> = children(CategoryKind::Developer).map(|c| c.kind).collect();
        assert_eq!(children, vec![CategoryKind::App]);
    }
}
