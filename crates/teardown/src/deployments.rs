//! Deployment walker.
//!
//! Resolves where a deployable resource is currently deployed. Malformed
//! pieces of a descriptor are skipped one environment at a time; a bad entry
//! never hides the others.

use crate::client::{Fetched, ManagementClient};
use crate::error::{FetchError, MalformedResponse};
use crate::registry::{ListScope, ResourceCategory, Undeploy};
use serde::Serialize;
use serde_json::Value;

/// Where one resource is deployed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeploymentRecord {
    pub environment: String,
    /// Deployed revision; `None` for state-deployed resources (extensions).
    pub revision: Option<String>,
}

impl DeploymentRecord {
    pub fn revision(environment: impl Into<String>, revision: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            revision: Some(revision.into()),
        }
    }

    pub fn state(environment: impl Into<String>) -> Self {
        Self {
            environment: environment.into(),
            revision: None,
        }
    }
}

/// Everything learned from one descriptor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deployments {
    pub records: Vec<DeploymentRecord>,
    /// Entries that were skipped.
    pub skipped: Vec<MalformedResponse>,
    /// Set when the descriptor itself could not be read.
    pub error: Option<FetchError>,
}

/// Resolve the deployments of one resource.
///
/// Non-deployable categories have none. A descriptor that cannot be read
/// yields no records and sets [`Deployments::error`].
pub fn deployments(
    client: &ManagementClient<'_>,
    category: &ResourceCategory,
    id: &str,
    scope: ListScope<'_>,
) -> Deployments {
    let Some(style) = category.undeploy else {
        return Deployments::default();
    };

    let endpoint = match style {
        Undeploy::Revision => category.deployments_endpoint(id),
        Undeploy::StatePatch => category.resource_endpoint(id, scope),
    };
    let context = format!("deployments of {} {}", category.label, id);

    let value = match client.get_json(&endpoint, category.org_header) {
        Ok(Fetched::Json(value)) => value,
        Ok(Fetched::Empty | Fetched::NotFound) => return Deployments::default(),
        Err(e) => {
            log::warn!("Could not read {context}: {e}");
            return Deployments {
                error: Some(e),
                ..Deployments::default()
            };
        }
    };

    let (records, skipped) = match (style, scope) {
        (Undeploy::Revision, _) => parse_revision_deployments(&value, &context),
        (Undeploy::StatePatch, ListScope::Environment(env)) => parse_state(&value, env, &context),
        (Undeploy::StatePatch, _) => (
            Vec::new(),
            vec![MalformedResponse::new(context.clone(), "environment")],
        ),
    };
    for problem in &skipped {
        log::warn!("Skipping deployment: {problem}");
    }

    Deployments {
        records,
        skipped,
        error: None,
    }
}

/// Parse `{ environment: [ { name, revision: [ { name } ] } ] }`.
///
/// Takes the first listed revision of every environment.
pub fn parse_revision_deployments(
    value: &Value,
    context: &str,
) -> (Vec<DeploymentRecord>, Vec<MalformedResponse>) {
    let mut records = Vec::new();
    let mut skipped = Vec::new();

    let environments = match value.get("environment") {
        None | Some(Value::Null) => return (records, skipped),
        Some(Value::Array(entries)) => entries,
        Some(_) => {
            skipped.push(MalformedResponse::new(context, "environment"));
            return (records, skipped);
        }
    };

    for (index, entry) in environments.iter().enumerate() {
        let entry_context = format!("{context}, entry {}", index + 1);

        let Some(environment) = entry.get("name").and_then(Value::as_str) else {
            skipped.push(MalformedResponse::new(entry_context, "environment name"));
            continue;
        };
        let Some(revisions) = entry.get("revision").and_then(Value::as_array) else {
            skipped.push(MalformedResponse::new(entry_context, "revision"));
            continue;
        };
        let Some(first) = revisions.first().filter(|r| !r.is_null()) else {
            skipped.push(MalformedResponse::new(entry_context, "first revision"));
            continue;
        };
        let revision = match first.get("name") {
            Some(Value::String(name)) => name.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => {
                skipped.push(MalformedResponse::new(entry_context, "revision name"));
                continue;
            }
        };

        records.push(DeploymentRecord::revision(environment, revision));
    }

    (records, skipped)
}

/// Parse an extension descriptor: deployed unless `state` is `UNDEPLOYED`.
///
/// A missing `state` is reported but still yields a record, so the
/// extension is undeployed before its delete.
fn parse_state(
    value: &Value,
    environment: &str,
    context: &str,
) -> (Vec<DeploymentRecord>, Vec<MalformedResponse>) {
    match value.get("state").and_then(Value::as_str) {
        Some(state) if state.eq_ignore_ascii_case("UNDEPLOYED") => (Vec::new(), Vec::new()),
        Some(_) => (vec![DeploymentRecord::state(environment)], Vec::new()),
        None => (
            vec![DeploymentRecord::state(environment)],
            vec![MalformedResponse::new(context, "state")],
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Endpoints;
    use crate::credential::{Credential, OrgContext};
    use crate::registry::{CategoryKind, category};
    use crate::transport::{Method, MockTransport};
    use secrecy::SecretString;
    use serde_json::json;

    const ORG: &str = "https://api.enterprise.apigee.com/v1/organizations/acme";

    fn org() -> OrgContext {
        OrgContext::new(
            "acme",
            Credential::Bearer(SecretString::from("tok".to_string())),
        )
    }

    #[test]
    fn test_first_revision_per_environment() {
        let value = json!({
            "name": "sf1",
            "environment": [
                { "name": "test", "revision": [ { "name": "3" }, { "name": "2" } ] },
                { "name": "prod", "revision": [ { "name": "1" } ] }
            ]
        });
        let (records, skipped) = parse_revision_deployments(&value, "sf1");
        assert_eq!(
            records,
            vec![
                DeploymentRecord::revision("test", "3"),
                DeploymentRecord::revision("prod", "1")
            ]
        );
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_malformed_entries_skip_only_themselves() {
        let value = json!({
            "environment": [
                { "name": "a" },
                { "name": "b", "revision": null },
                { "name": "c", "revision": [] },
                { "name": "d", "revision": [ null ] },
                { "name": "e", "revision": [ { "state": "deployed" } ] },
                { "revision": [ { "name": "9" } ] },
                null,
                { "name": "prod", "revision": [ { "name": 4 } ] }
            ]
        });
        let (records, skipped) = parse_revision_deployments(&value, "apis/x");
        assert_eq!(records, vec![DeploymentRecord::revision("prod", "4")]);

        let fields: Vec<_> = skipped.iter().map(|s| s.field).collect();
        assert_eq!(
            fields,
            vec![
                "revision",
                "revision",
                "first revision",
                "first revision",
                "revision name",
                "environment name",
                "environment name"
            ]
        );
    }

    #[test]
    fn test_missing_environment_list_means_undeployed() {
        let (records, skipped) = parse_revision_deployments(&json!({ "name": "x" }), "x");
        assert!(records.is_empty());
        assert!(skipped.is_empty());

        let (records, skipped) = parse_revision_deployments(&json!({ "environment": "test" }), "x");
        assert!(records.is_empty());
        assert_eq!(skipped.len(), 1);
    }

    #[test]
    fn test_walker_reads_descriptor() {
        let (mock, endpoints, org) = (MockTransport::new(), Endpoints::default(), org());
        mock.on_get_json(
            &format!("{ORG}/sharedflows/sf1/deployments"),
            &json!({ "environment": [ { "name": "test", "revision": [ { "name": "3" } ] } ] }),
        );
        let client = ManagementClient::new(&mock, &endpoints, &org);

        let found = deployments(
            &client,
            category(CategoryKind::SharedFlow),
            "sf1",
            ListScope::Organization,
        );
        assert_eq!(found.records, vec![DeploymentRecord::revision("test", "3")]);
        assert!(found.error.is_none());
    }

    #[test]
    fn test_walker_fetch_failure_yields_nothing() {
        let (mock, endpoints, org) = (MockTransport::new(), Endpoints::default(), org());
        mock.on(Method::Get, &format!("{ORG}/apis/x/deployments"), 500, "");
        let client = ManagementClient::new(&mock, &endpoints, &org);

        let found = deployments(
            &client,
            category(CategoryKind::ApiProxy),
            "x",
            ListScope::Organization,
        );
        assert!(found.records.is_empty());
        assert!(matches!(found.error, Some(FetchError::Status { status: 500, .. })));
    }

    #[test]
    fn test_non_deployable_makes_no_call() {
        let (mock, endpoints, org) = (MockTransport::new(), Endpoints::default(), org());
        let client = ManagementClient::new(&mock, &endpoints, &org);

        let found = deployments(
            &client,
            category(CategoryKind::ApiProduct),
            "p1",
            ListScope::Organization,
        );
        assert_eq!(found, Deployments::default());
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_extension_state() {
        let (mock, endpoints, org) = (MockTransport::new(), Endpoints::default(), org());
        mock.on_get_json(
            &format!("{ORG}/environments/test/extensions/e1"),
            &json!({ "id": "e1", "state": "DEPLOYED" }),
        );
        mock.on_get_json(
            &format!("{ORG}/environments/test/extensions/e2"),
            &json!({ "id": "e2", "state": "UNDEPLOYED" }),
        );
        mock.on_get_json(&format!("{ORG}/environments/test/extensions/e3"), &json!({ "id": "e3" }));
        let client = ManagementClient::new(&mock, &endpoints, &org);
        let extensions = category(CategoryKind::Extension);

        let deployed = deployments(&client, extensions, "e1", ListScope::Environment("test"));
        assert_eq!(deployed.records, vec![DeploymentRecord::state("test")]);

        let undeployed = deployments(&client, extensions, "e2", ListScope::Environment("test"));
        assert!(undeployed.records.is_empty());

        let unknown = deployments(&client, extensions, "e3", ListScope::Environment("test"));
        assert_eq!(unknown.records, vec![DeploymentRecord::state("test")]);
        assert_eq!(unknown.skipped.len(), 1);
    }
}
