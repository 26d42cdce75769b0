//! # teardown
//!
//! Dependency-ordered teardown of everything provisioned in an Apigee Edge
//! organization.
//!
//! This crate provides:
//! - Authentication (OAuth password grant or Basic) selected once per run
//! - Fail-soft enumeration of every resource category
//! - Deployment discovery and undeploy-before-delete for proxies, shared
//!   flows and extensions
//! - A structured run report and a redacting progress reporter
//!
//! ## Example
//!
//! ```no_run
//! use secrecy::SecretString;
//! use teardown::{
//!     AuthMode, CredentialsInput, Endpoints, Executor, ManagementClient, MemorySink,
//!     OAuthClient, OrgContext, Reporter, TeardownOptions, UreqTransport, authenticate,
//! };
//!
//! let transport = UreqTransport::new();
//! let endpoints = Endpoints::default();
//! let input = CredentialsInput {
//!     organization: "acme".to_string(),
//!     username: "ops@example.com".to_string(),
//!     password: SecretString::from("hunter2".to_string()),
//!     mfa_code: None,
//! };
//!
//! let credential = authenticate(
//!     &input,
//!     AuthMode::OAuth,
//!     &OAuthClient::default(),
//!     &endpoints.token,
//!     &transport,
//! )
//! .expect("authentication failed");
//!
//! let org = OrgContext::new("acme", credential);
//! let options = TeardownOptions { dry_run: true, ..TeardownOptions::default() };
//! let mut reporter = Reporter::new(MemorySink::new());
//!
//! let client = ManagementClient::new(&transport, &endpoints, &org);
//! let report = Executor::new(client, &options).run(&mut reporter);
//! println!("{} resources planned", report.summary().planned);
//! ```
//!
//! ## Order
//!
//! Top-level categories follow [`registry::TEARDOWN_ORDER`]: developers
//! (each with its apps first), API products, custom reports, shared flows,
//! extensions, API proxies, portals, specs.

pub mod cancel;
pub mod client;
pub mod credential;
pub mod deployments;
pub mod enumerate;
pub mod error;
pub mod executor;
pub mod outcome;
pub mod registry;
pub mod report;
pub mod retry;
pub mod transport;

pub use cancel::CancelToken;
pub use client::{Endpoints, ManagementClient};
pub use credential::{
    AuthMode, Credential, CredentialsInput, OAuthClient, OrgContext, authenticate,
    authorization_header,
};
pub use error::{AuthError, DeleteError, FetchError, MalformedResponse, TransportError};
pub use executor::{Executor, TeardownOptions};
pub use outcome::{RunReport, RunSummary, TeardownOutcome};
pub use registry::{CategoryKind, ResourceCategory, TEARDOWN_ORDER};
pub use report::{MemorySink, REDACTED, Redactor, ReportSink, Reporter, Tone};
pub use retry::RetryPolicy;
pub use transport::{MockTransport, Transport, UreqTransport};
