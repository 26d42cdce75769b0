//! Resource enumeration.
//!
//! Listings are fail-soft: whatever goes wrong, the caller gets a
//! [`Listing`] it can iterate. Only [`Listing::Found`] carries identifiers;
//! the other variants all mean "nothing to act on here" and differ only in
//! how they are reported.

use crate::client::{Fetched, ManagementClient};
use crate::error::{FetchError, MalformedResponse};
use crate::registry::{self, Endpoint, ListScope, ListShape, ResourceCategory};
use crate::retry::RetryPolicy;
use serde::Serialize;
use serde_json::Value;

/// Outcome of one listing call.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
    Found(Vec<String>),
    Empty,
    NotFound,
    Failed(FetchError),
}

impl Listing {
    /// Identifiers to act on; empty unless [`Listing::Found`].
    pub fn ids(&self) -> &[String] {
        match self {
            Self::Found(ids) => ids,
            Self::Empty | Self::NotFound | Self::Failed(_) => &[],
        }
    }

    pub fn status(&self) -> ListingStatus {
        match self {
            Self::Found(ids) => ListingStatus::Found { count: ids.len() },
            Self::Empty => ListingStatus::Empty,
            Self::NotFound => ListingStatus::NotFound,
            Self::Failed(e) => ListingStatus::Failed {
                reason: e.to_string(),
            },
        }
    }
}

/// Serializable summary of a [`Listing`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ListingStatus {
    Found { count: usize },
    Empty,
    NotFound,
    Failed { reason: String },
}

/// List one category under the given scope.
pub fn list(
    client: &ManagementClient<'_>,
    category: &ResourceCategory,
    scope: ListScope<'_>,
    retry: &RetryPolicy,
) -> Listing {
    let endpoint = category.list_endpoint(scope, client.organization());
    let context = match scope.name() {
        Some(name) => format!("{} of {}", category.plural, name),
        None => category.plural.to_string(),
    };
    fetch_listing(
        client,
        &endpoint,
        category.list_shape,
        category.org_header,
        &context,
        retry,
    )
}

/// List the organization's environments.
pub fn list_environments(client: &ManagementClient<'_>, retry: &RetryPolicy) -> Listing {
    fetch_listing(
        client,
        &registry::environments_endpoint(),
        ListShape::Names,
        false,
        "environments",
        retry,
    )
}

fn fetch_listing(
    client: &ManagementClient<'_>,
    endpoint: &Endpoint,
    shape: ListShape,
    org_header: bool,
    context: &str,
    retry: &RetryPolicy,
) -> Listing {
    let fetched = retry.run(|| client.get_json(endpoint, org_header), FetchError::is_transient);

    match fetched {
        Ok(Fetched::Json(value)) => {
            let (ids, skipped) = extract_ids(&value, shape, context);
            for problem in &skipped {
                log::warn!("Skipping entry: {problem}");
            }
            if ids.is_empty() {
                Listing::Empty
            } else {
                Listing::Found(ids)
            }
        }
        Ok(Fetched::Empty) => Listing::Empty,
        Ok(Fetched::NotFound) => {
            log::info!("No {context} (404)");
            Listing::NotFound
        }
        Err(e) => {
            log::warn!("Could not list {context}: {e}");
            Listing::Failed(e)
        }
    }
}

/// Pull identifiers out of a listing body.
///
/// Elements that do not carry an identifier are returned as problems and
/// left out; they never fail the whole listing.
pub fn extract_ids(
    value: &Value,
    shape: ListShape,
    context: &str,
) -> (Vec<String>, Vec<MalformedResponse>) {
    let (items, key) = match shape {
        ListShape::Names => (value.as_array(), None),
        ListShape::Qualifier => (value.get("qualifier").and_then(Value::as_array), Some("name")),
        ListShape::Field { container, key } => (
            value
                .as_array()
                .or_else(|| value.get(container).and_then(Value::as_array)),
            Some(key),
        ),
    };

    let mut ids = Vec::new();
    let mut problems = Vec::new();

    let Some(items) = items else {
        if !value.is_object() || key.is_none() {
            problems.push(MalformedResponse::new(context, "list"));
        }
        return (ids, problems);
    };

    for (index, item) in items.iter().enumerate() {
        let id = match (item, key) {
            (Value::String(s), _) => Some(s.as_str()),
            (Value::Object(_), Some(key)) => item.get(key).and_then(Value::as_str),
            _ => None,
        };
        match id {
            Some(id) if !id.trim().is_empty() => ids.push(id.to_string()),
            _ => problems.push(MalformedResponse::new(
                format!("{context}, entry {}", index + 1),
                key.unwrap_or("name"),
            )),
        }
    }

    (ids, problems)
}
