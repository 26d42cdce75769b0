//! Authenticated access to the management API.

use crate::credential::{Credential, OrgContext};
use crate::error::{DeleteError, FetchError, TransportError};
use crate::registry::{Endpoint, Host};
use crate::transport::{Body, Method, Request, Transport};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// Base URLs of the services the teardown talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    /// Management API root, e.g. `https://api.enterprise.apigee.com/v1`.
    pub management: String,
    /// OAuth token exchange URL.
    pub token: String,
    /// Portal administration API root.
    pub portal_api: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            management: "https://api.enterprise.apigee.com/v1".to_string(),
            token: "https://login.apigee.com/oauth/token".to_string(),
            portal_api: "https://apigee.com/portals/api".to_string(),
        }
    }
}

/// Result of a successful read.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched {
    Json(Value),
    /// 2xx with a blank or `null` body.
    Empty,
    /// 404.
    NotFound,
}

/// Management API client bound to one organization and credential.
pub struct ManagementClient<'a> {
    transport: &'a dyn Transport,
    endpoints: &'a Endpoints,
    org: &'a OrgContext,
}

impl<'a> ManagementClient<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        endpoints: &'a Endpoints,
        org: &'a OrgContext,
    ) -> Self {
        Self {
            transport,
            endpoints,
            org,
        }
    }

    pub fn organization(&self) -> &str {
        &self.org.organization
    }

    pub fn credential(&self) -> &Credential {
        &self.org.credential
    }

    /// Join an endpoint with its base URL, percent-encoding each path segment.
    pub fn url(&self, endpoint: &Endpoint) -> Result<String, TransportError> {
        let base = match endpoint.host {
            Host::Organization | Host::Management => &self.endpoints.management,
            Host::PortalApi => &self.endpoints.portal_api,
        };
        let mut url = Url::parse(base)
            .map_err(|e| TransportError::new(format!("invalid base URL {base}: {e}")))?;

        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|()| TransportError::new(format!("base URL {base} cannot have a path")))?;
            segments.pop_if_empty();
            if endpoint.host == Host::Organization {
                segments.push("organizations").push(&self.org.organization);
            }
            for segment in endpoint.path.split('/').filter(|s| !s.is_empty()) {
                segments.push(segment);
            }
        }

        if !endpoint.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &endpoint.query {
                pairs.append_pair(key, value);
            }
        }

        Ok(url.into())
    }

    fn request(&self, method: Method, url: String, org_header: bool) -> Request {
        let request = Request::new(method, url)
            .header("Authorization", self.org.credential.authorization_header())
            .header("Accept", "application/json");
        if org_header {
            request.header("X-Org-Name", self.org.organization.clone())
        } else {
            request
        }
    }

    /// Read JSON from an endpoint.
    pub fn get_json(&self, endpoint: &Endpoint, org_header: bool) -> Result<Fetched, FetchError> {
        let url = self.url(endpoint)?;
        let response = self
            .transport
            .send(&self.request(Method::Get, url.clone(), org_header))?;

        if response.status == 404 {
            return Ok(Fetched::NotFound);
        }
        if !response.is_success() {
            return Err(FetchError::Status {
                url,
                status: response.status,
            });
        }

        match response.json() {
            Ok(Some(value)) => Ok(Fetched::Json(value)),
            Ok(None) => Ok(Fetched::Empty),
            Err(e) => Err(FetchError::Parse {
                url,
                message: e.to_string(),
            }),
        }
    }

    /// Issue a write (undeploy, delete, trash) and succeed only on 2xx.
    pub fn write(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Body,
        org_header: bool,
    ) -> Result<(), DeleteError> {
        let url = self.url(endpoint)?;
        let mut request = self.request(method, url, org_header);
        request.body = body;

        let response = self.transport.send(&request)?;
        if response.is_success() {
            Ok(())
        } else {
            Err(DeleteError::status(response.status, &response.body))
        }
    }
}
