//! Run outcomes.

use crate::enumerate::ListingStatus;
use crate::registry::CategoryKind;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// What happened to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TeardownOutcome {
    Deleted,
    SkippedExcluded,
    SkippedEmpty,
    /// Dry run: the delete would have been issued.
    Planned,
    Failed { reason: String },
}

impl TeardownOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Result of one undeploy call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum UndeployResult {
    Undeployed,
    Planned,
    Failed { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UndeployReport {
    pub environment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub revision: Option<String>,
    #[serde(flatten)]
    pub result: UndeployResult,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceReport {
    pub category: CategoryKind,
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub undeploys: Vec<UndeployReport>,
    #[serde(flatten)]
    pub outcome: TeardownOutcome,
}

/// One listing call and how it went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingReport {
    /// Parent or environment the listing was scoped to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub status: ListingStatus,
}

impl ListingReport {
    pub fn new(scope: Option<&str>, status: ListingStatus) -> Self {
        Self {
            scope: scope.map(str::to_string),
            status,
        }
    }

    /// `SkippedEmpty` for listings that produced nothing to act on.
    pub fn outcome(&self) -> Option<TeardownOutcome> {
        match &self.status {
            ListingStatus::Found { .. } => None,
            ListingStatus::Empty | ListingStatus::NotFound => Some(TeardownOutcome::SkippedEmpty),
            ListingStatus::Failed { reason } => Some(TeardownOutcome::Failed {
                reason: reason.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryReport {
    pub kind: CategoryKind,
    pub listings: Vec<ListingReport>,
    pub resources: Vec<ResourceReport>,
}

impl CategoryReport {
    pub fn new(kind: CategoryKind) -> Self {
        Self {
            kind,
            listings: Vec::new(),
            resources: Vec::new(),
        }
    }
}

/// Counts over a whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub deleted: usize,
    pub planned: usize,
    pub excluded: usize,
    pub empty_listings: usize,
    pub failed: usize,
    pub failed_undeploys: usize,
    pub failed_listings: usize,
}

/// Everything a run did, in the order it did it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub organization: String,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub categories: Vec<CategoryReport>,
}

impl RunReport {
    pub fn new(organization: impl Into<String>, dry_run: bool) -> Self {
        Self {
            organization: organization.into(),
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            cancelled: false,
            categories: Vec::new(),
        }
    }

    /// Report for `kind`, created on first use.
    pub fn category_mut(&mut self, kind: CategoryKind) -> &mut CategoryReport {
        let index = match self.categories.iter().position(|c| c.kind == kind) {
            Some(index) => index,
            None => {
                self.categories.push(CategoryReport::new(kind));
                self.categories.len() - 1
            }
        };
        &mut self.categories[index]
    }

    pub fn category(&self, kind: CategoryKind) -> Option<&CategoryReport> {
        self.categories.iter().find(|c| c.kind == kind)
    }

    /// Every resource report, in run order per category.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceReport> {
        self.categories.iter().flat_map(|c| c.resources.iter())
    }

    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for category in &self.categories {
            for listing in &category.listings {
                match listing.outcome() {
                    Some(TeardownOutcome::SkippedEmpty) => summary.empty_listings += 1,
                    Some(TeardownOutcome::Failed { .. }) => summary.failed_listings += 1,
                    _ => {}
                }
            }
            for resource in &category.resources {
                match resource.outcome {
                    TeardownOutcome::Deleted => summary.deleted += 1,
                    TeardownOutcome::Planned => summary.planned += 1,
                    TeardownOutcome::SkippedExcluded => summary.excluded += 1,
                    TeardownOutcome::SkippedEmpty => summary.empty_listings += 1,
                    TeardownOutcome::Failed { .. } => summary.failed += 1,
                }
                summary.failed_undeploys += resource
                    .undeploys
                    .iter()
                    .filter(|u| matches!(u.result, UndeployResult::Failed { .. }))
                    .count();
            }
        }
        summary
    }

    /// No failed call of any kind and not cancelled.
    pub fn is_clean(&self) -> bool {
        let summary = self.summary();
        !self.cancelled
            && summary.failed == 0
            && summary.failed_undeploys == 0
            && summary.failed_listings == 0
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
