//! Teardown executor.
//!
//! Walks [`TEARDOWN_ORDER`], and for every listed resource: skip it if
//! excluded, tear down its children, undeploy it from every environment it
//! is deployed to, then delete it. Every call is sequential and every
//! failure stays with the resource it belongs to.

use crate::cancel::CancelToken;
use crate::client::ManagementClient;
use crate::deployments::{self, DeploymentRecord};
use crate::enumerate::{self, Listing, ListingStatus};
use crate::outcome::{
    ListingReport, ResourceReport, RunReport, TeardownOutcome, UndeployReport, UndeployResult,
};
use crate::registry::{
    self, CategoryKind, ListScope, Removal, ResourceCategory, Scope, TEARDOWN_ORDER, Undeploy,
};
use crate::report::Reporter;
use crate::retry::RetryPolicy;
use crate::transport::{Body, Method};
use serde_json::json;
use std::collections::HashMap;

/// Per-run settings.
#[derive(Debug, Clone)]
pub struct TeardownOptions {
    /// Enumerate and walk, but issue no undeploy or delete.
    pub dry_run: bool,
    /// Categories to act on; empty means all.
    pub only: Vec<CategoryKind>,
    /// Applied to listing reads.
    pub retry: RetryPolicy,
    /// Environments to sweep for extensions when they cannot be listed.
    pub extension_environments: Vec<String>,
    /// Names never touched, on top of each category's built-in set.
    pub extra_exclusions: HashMap<CategoryKind, Vec<String>>,
}

impl Default for TeardownOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            only: Vec::new(),
            retry: RetryPolicy::no_retry(),
            extension_environments: vec!["test".to_string(), "prod".to_string()],
            extra_exclusions: HashMap::new(),
        }
    }
}

impl TeardownOptions {
    /// Whether resources of `kind` are acted on. Selecting a parent
    /// selects its children too.
    pub fn selects(&self, kind: CategoryKind) -> bool {
        self.only.is_empty()
            || self.only.contains(&kind)
            || kind.parent().is_some_and(|parent| self.only.contains(&parent))
    }

    /// Whether `kind` has to be enumerated at all.
    fn visits(&self, kind: CategoryKind) -> bool {
        self.selects(kind) || registry::children(kind).any(|child| self.selects(child.kind))
    }

    pub fn is_excluded(&self, category: &ResourceCategory, id: &str) -> bool {
        category.is_excluded(id)
            || self
                .extra_exclusions
                .get(&category.kind)
                .is_some_and(|names| names.iter().any(|name| name == id))
    }
}

/// Runs one teardown against one organization.
pub struct Executor<'a> {
    client: ManagementClient<'a>,
    options: &'a TeardownOptions,
    cancel: CancelToken,
}

impl<'a> Executor<'a> {
    pub fn new(client: ManagementClient<'a>, options: &'a TeardownOptions) -> Self {
        Self {
            client,
            options,
            cancel: CancelToken::new(),
        }
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Tear down every selected category in order.
    pub fn run(&self, reporter: &mut Reporter) -> RunReport {
        reporter
            .redactor_mut()
            .protect_credential(self.client.credential());

        let mut report = RunReport::new(self.client.organization(), self.options.dry_run);
        if self.options.dry_run {
            reporter.warn("Dry run: nothing will be undeployed or deleted");
        }

        for &kind in TEARDOWN_ORDER {
            if self.cancel.is_cancelled() {
                break;
            }
            if !self.options.visits(kind) {
                log::debug!("Skipping unselected category {kind}");
                continue;
            }

            let category = kind.category();
            reporter.section(category.plural);
            match category.scope {
                Scope::Environment => self.sweep_environments(category, reporter, &mut report),
                Scope::Organization | Scope::Parent(_) => {
                    self.sweep_scope(category, ListScope::Organization, reporter, &mut report);
                }
            }
        }

        if self.cancel.is_cancelled() {
            report.cancelled = true;
            reporter.warn("Cancelled: no further resources were started");
        }
        report.finish();
        report
    }

    fn sweep_environments(
        &self,
        category: &ResourceCategory,
        reporter: &mut Reporter,
        report: &mut RunReport,
    ) {
        let environments = match enumerate::list_environments(&self.client, &self.options.retry) {
            Listing::Found(environments) => environments,
            other => {
                reporter.warn(&format!(
                    "Could not list environments ({:?}); using {}",
                    other.status(),
                    self.options.extension_environments.join(", ")
                ));
                self.options.extension_environments.clone()
            }
        };

        for environment in &environments {
            if self.cancel.is_cancelled() {
                return;
            }
            self.sweep_scope(category, ListScope::Environment(environment), reporter, report);
        }
    }

    fn sweep_scope(
        &self,
        category: &ResourceCategory,
        scope: ListScope<'_>,
        reporter: &mut Reporter,
        report: &mut RunReport,
    ) {
        let place = scope.name().map(|name| format!(" in {name}")).unwrap_or_default();
        reporter.step(&format!("Listing {}{place}", category.plural));
        let listing = enumerate::list(&self.client, category, scope, &self.options.retry);

        let status = match &listing {
            Listing::Found(ids) => {
                reporter.step(&format!("Found {} {}{place}", ids.len(), category.plural));
                listing.status()
            }
            Listing::Empty | Listing::NotFound => {
                reporter.step(&format!("No {}{place}", category.plural));
                listing.status()
            }
            Listing::Failed(e) => {
                let reason = reporter.redact(&e.to_string());
                reporter.failure(&format!("Could not list {}{place}: {reason}", category.plural));
                ListingStatus::Failed { reason }
            }
        };
        report
            .category_mut(category.kind)
            .listings
            .push(ListingReport::new(scope.name(), status));

        for id in listing.ids() {
            if self.cancel.is_cancelled() {
                return;
            }
            self.sweep_resource(category, id, scope, reporter, report);
        }
    }

    fn sweep_resource(
        &self,
        category: &ResourceCategory,
        id: &str,
        scope: ListScope<'_>,
        reporter: &mut Reporter,
        report: &mut RunReport,
    ) {
        let label = describe(category, id, scope);

        if self.options.is_excluded(category, id) {
            reporter.warn(&format!("Skipping excluded {label}"));
            self.record(report, category, id, scope, Vec::new(), TeardownOutcome::SkippedExcluded);
            return;
        }

        for child in registry::children(category.kind) {
            if !self.options.selects(child.kind) {
                continue;
            }
            self.sweep_scope(child, ListScope::Parent(id), reporter, report);
            if self.cancel.is_cancelled() {
                return;
            }
        }

        if !self.options.selects(category.kind) {
            return;
        }

        let mut undeploys = Vec::new();
        if category.is_deployable() {
            reporter.step(&format!("Checking deployments of {label}"));
            let found = deployments::deployments(&self.client, category, id, scope);
            if let Some(e) = &found.error {
                let reason = reporter.redact(&e.to_string());
                reporter.warn(&format!("Could not read deployments of {label}: {reason}"));
            }
            for problem in &found.skipped {
                reporter.warn(&format!("Skipping {problem}"));
            }
            if found.error.is_none() {
                let count = found.records.len();
                let noun = if count == 1 { "deployment" } else { "deployments" };
                reporter.step(&format!("{count} {noun} of {label}"));
            }
            for record in &found.records {
                undeploys.push(self.undeploy(category, id, &label, record, reporter));
            }
        }

        let outcome = self.remove(category, id, scope, &label, reporter);
        self.record(report, category, id, scope, undeploys, outcome);
    }

    fn undeploy(
        &self,
        category: &ResourceCategory,
        id: &str,
        label: &str,
        record: &DeploymentRecord,
        reporter: &mut Reporter,
    ) -> UndeployReport {
        let target = match &record.revision {
            Some(revision) => format!("revision {revision} of {label} from {}", record.environment),
            None => format!("{label} from {}", record.environment),
        };

        let result = if self.options.dry_run {
            reporter.step(&format!("Would undeploy {target}"));
            UndeployResult::Planned
        } else {
            reporter.step(&format!("Undeploying {target}"));
            let endpoint =
                category.undeploy_endpoint(id, &record.environment, record.revision.as_deref());
            let (method, body) = match category.undeploy {
                Some(Undeploy::StatePatch) => {
                    (Method::Patch, Body::Json(json!({ "state": "UNDEPLOYED" })))
                }
                Some(Undeploy::Revision) | None => (Method::Delete, Body::Empty),
            };
            match self.client.write(method, &endpoint, body, category.org_header) {
                Ok(()) => {
                    reporter.success(&format!("Undeployed {target}"));
                    UndeployResult::Undeployed
                }
                Err(e) => {
                    let reason = reporter.redact(&e.to_string());
                    reporter.failure(&format!("Failed to undeploy {target}: {reason}"));
                    UndeployResult::Failed { reason }
                }
            }
        };

        UndeployReport {
            environment: record.environment.clone(),
            revision: record.revision.clone(),
            result,
        }
    }

    fn remove(
        &self,
        category: &ResourceCategory,
        id: &str,
        scope: ListScope<'_>,
        label: &str,
        reporter: &mut Reporter,
    ) -> TeardownOutcome {
        if self.options.dry_run {
            reporter.step(&format!("Would delete {label}"));
            return TeardownOutcome::Planned;
        }

        reporter.step(&format!("Deleting {label}"));
        let method = match category.removal {
            Removal::Delete => Method::Delete,
            Removal::Trash => Method::Post,
        };
        let endpoint = category.removal_endpoint(id, scope);
        match self.client.write(method, &endpoint, Body::Empty, category.org_header) {
            Ok(()) => {
                reporter.success(&format!("Deleted {label}"));
                TeardownOutcome::Deleted
            }
            Err(e) => {
                let reason = reporter.redact(&e.to_string());
                reporter.failure(&format!("Failed to delete {label}: {reason}"));
                TeardownOutcome::Failed { reason }
            }
        }
    }

    fn record(
        &self,
        report: &mut RunReport,
        category: &ResourceCategory,
        id: &str,
        scope: ListScope<'_>,
        undeploys: Vec<UndeployReport>,
        outcome: TeardownOutcome,
    ) {
        let (parent, environment) = match scope {
            ListScope::Organization => (None, None),
            ListScope::Parent(parent) => (Some(parent.to_string()), None),
            ListScope::Environment(env) => (None, Some(env.to_string())),
        };
        report.category_mut(category.kind).resources.push(ResourceReport {
            category: category.kind,
            id: id.to_string(),
            parent,
            environment,
            undeploys,
            outcome,
        });
    }
}

fn describe(category: &ResourceCategory, id: &str, scope: ListScope<'_>) -> String {
    match scope {
        ListScope::Organization => format!("{} {id}", category.label),
        ListScope::Parent(parent) => format!("{} {id} of {parent}", category.label),
        ListScope::Environment(env) => format!("{} {id} in {env}", category.label),
    }
}
