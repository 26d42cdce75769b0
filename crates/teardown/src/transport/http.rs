//! Blocking HTTP transport backed by `ureq`.

use super::{Body, Method, Request, Response, Transport};
use crate::error::TransportError;

/// Identifies the tool to the management API.
const USER_AGENT: &str = concat!("edgesweep/", env!("CARGO_PKG_VERSION"));

/// Real transport.
///
/// Non-2xx statuses come back as [`Response`]s so callers can tell a 404
/// listing apart from an unreachable host.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    #[must_use]
    pub fn new() -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

fn with_headers<B>(
    mut builder: ureq::RequestBuilder<B>,
    request: &Request,
) -> ureq::RequestBuilder<B> {
    builder = builder.header("User-Agent", USER_AGENT);
    for (name, value) in &request.headers {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
}

impl Transport for UreqTransport {
    fn send(&self, request: &Request) -> Result<Response, TransportError> {
        log::trace!("{}", request.line());

        let url = request.url.as_str();
        let mut response = match request.method {
            Method::Get => with_headers(self.agent.get(url), request).call()?,
            Method::Delete => with_headers(self.agent.delete(url), request).call()?,
            Method::Post | Method::Patch => {
                let builder = if request.method == Method::Post {
                    self.agent.post(url)
                } else {
                    self.agent.patch(url)
                };
                let builder = with_headers(builder, request);
                match &request.body {
                    Body::Empty => builder.send_empty()?,
                    Body::Json(value) => builder.send_json(value)?,
                    Body::Form(fields) => builder
                        .send_form(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))?,
                }
            }
        };

        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        log::trace!("{} -> {}", request.line(), status);

        Ok(Response { status, body })
    }
}
