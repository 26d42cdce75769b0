//! Credentials for the management API.
//!
//! A run authenticates exactly once. Depending on [`AuthMode`] the result is
//! either a bearer token from the OAuth password grant or a Basic header
//! derived locally from the username and password. Callers never look inside
//! a [`Credential`]; they only ask it for an `Authorization` header value.

use crate::error::AuthError;
use crate::transport::{Method, Request, Transport};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the run authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// OAuth password grant, bearer token for every call.
    #[default]
    OAuth,
    /// Basic header from username/password, no token exchange.
    Basic,
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OAuth => f.write_str("oauth"),
            Self::Basic => f.write_str("basic"),
        }
    }
}

/// OAuth client registration used for the password grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
}

impl Default for OAuthClient {
    fn default() -> Self {
        Self {
            client_id: "edgecli".to_string(),
            client_secret: "edgeclisecret".to_string(),
        }
    }
}

/// What the operator supplied.
pub struct CredentialsInput {
    pub organization: String,
    pub username: String,
    pub password: SecretString,
    /// One-time code for accounts with MFA enabled.
    pub mfa_code: Option<String>,
}

impl fmt::Debug for CredentialsInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsInput")
            .field("organization", &self.organization)
            .field("username", &self.username)
            .field("password", &"<hidden>")
            .field("mfa_code", &self.mfa_code.as_ref().map(|_| "<hidden>"))
            .finish()
    }
}

/// An authenticated credential.
pub enum Credential {
    Bearer(SecretString),
    Basic(SecretString),
}

impl Credential {
    /// Derive a Basic credential without any network call.
    pub fn basic(username: &str, password: &SecretString) -> Self {
        let raw = format!("{}:{}", username, password.expose_secret());
        Self::Basic(SecretString::from(STANDARD.encode(raw)))
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        match self {
            Self::Bearer(token) => format!("Bearer {}", token.expose_secret()),
            Self::Basic(encoded) => format!("Basic {}", encoded.expose_secret()),
        }
    }

    /// Scheme name, safe to display.
    pub fn scheme(&self) -> &'static str {
        match self {
            Self::Bearer(_) => "Bearer",
            Self::Basic(_) => "Basic",
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Credential::{}(<hidden>)", self.scheme())
    }
}

/// Value for the `Authorization` header of any credential.
pub fn authorization_header(credential: &Credential) -> String {
    credential.authorization_header()
}

/// The organization and credential shared by every call of a run.
#[derive(Debug)]
pub struct OrgContext {
    pub organization: String,
    pub credential: Credential,
}

impl OrgContext {
    pub fn new(organization: impl Into<String>, credential: Credential) -> Self {
        Self {
            organization: organization.into(),
            credential,
        }
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
}

/// Obtain the run's credential.
///
/// In [`AuthMode::Basic`] this never touches the network. In
/// [`AuthMode::OAuth`] it performs the password grant against `token_url`,
/// adding `mfa_token` only when a one-time code was supplied.
pub fn authenticate(
    input: &CredentialsInput,
    mode: AuthMode,
    client: &OAuthClient,
    token_url: &str,
    transport: &dyn Transport,
) -> Result<Credential, AuthError> {
    if mode == AuthMode::Basic {
        log::debug!("Using Basic credentials for {}", input.username);
        return Ok(Credential::basic(&input.username, &input.password));
    }

    let mut form = vec![
        ("grant_type".to_string(), "password".to_string()),
        ("username".to_string(), input.username.clone()),
        ("password".to_string(), input.password.expose_secret().to_string()),
        ("client_id".to_string(), client.client_id.clone()),
        ("client_secret".to_string(), client.client_secret.clone()),
    ];
    if let Some(code) = input.mfa_code.as_deref().map(str::trim)
        && !code.is_empty()
    {
        form.push(("mfa_token".to_string(), code.to_string()));
    }

    let request = Request::new(Method::Post, token_url)
        .header("Accept", "application/json")
        .form(form);

    log::debug!("Requesting access token from {token_url}");
    let response = transport.send(&request)?;
    if !response.is_success() {
        return Err(AuthError::Rejected {
            status: response.status,
        });
    }

    let parsed: TokenResponse = serde_json::from_str(&response.body)
        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

    match parsed.access_token {
        Some(token) if !token.trim().is_empty() => {
            Ok(Credential::Bearer(SecretString::from(token)))
        }
        _ => Err(AuthError::MissingToken),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{Body, MockTransport};

    const TOKEN_URL: &str = "https://login.example.com/oauth/token";

    fn input(mfa: Option<&str>) -> CredentialsInput {
        CredentialsInput {
            organization: "acme".to_string(),
            username: "Aladdin".to_string(),
            password: SecretString::from("opensesame".to_string()),
            mfa_code: mfa.map(str::to_string),
        }
    }

    fn form_field<'a>(body: &'a Body, name: &str) -> Option<&'a str> {
        match body {
            Body::Form(fields) => fields
                .iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.as_str()),
            _ => None,
        }
    }

    #[test]
    fn test_basic_header_encoding() {
        let credential =
            Credential::basic("Aladdin", &SecretString::from("opensesame".to_string()));
        assert_eq!(
            credential.authorization_header(),
            "Basic QWxhZGRpbjpvcGVuc2VzYW1l"
        );
        assert_eq!(
            authorization_header(&credential),
            credential.authorization_header()
        );
    }

    #[test]
    fn test_basic_mode_makes_no_call() {
        let mock = MockTransport::new();
        let credential =
            authenticate(&input(None), AuthMode::Basic, &OAuthClient::default(), TOKEN_URL, &mock)
                .unwrap();
        assert_eq!(credential.scheme(), "Basic");
        assert!(mock.calls().is_empty());
    }

    #[test]
    fn test_oauth_success() {
        let mock = MockTransport::new();
        mock.on(Method::Post, TOKEN_URL, 200, r#"{"access_token":"tok-123","expires_in":1799}"#);

        let credential =
            authenticate(&input(None), AuthMode::OAuth, &OAuthClient::default(), TOKEN_URL, &mock)
                .unwrap();
        assert_eq!(credential.authorization_header(), "Bearer tok-123");

        let calls = mock.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(form_field(&calls[0].body, "grant_type"), Some("password"));
        assert_eq!(form_field(&calls[0].body, "client_id"), Some("edgecli"));
        assert_eq!(form_field(&calls[0].body, "mfa_token"), None);
    }

    #[test]
    fn test_oauth_appends_mfa_token() {
        let mock = MockTransport::new();
        mock.on(Method::Post, TOKEN_URL, 200, r#"{"access_token":"tok"}"#);

        authenticate(
            &input(Some("123456")),
            AuthMode::OAuth,
            &OAuthClient::default(),
            TOKEN_URL,
            &mock,
        )
        .unwrap();
        assert_eq!(form_field(&mock.calls()[0].body, "mfa_token"), Some("123456"));
    }

    #[test]
    fn test_oauth_blank_mfa_is_ignored() {
        let mock = MockTransport::new();
        mock.on(Method::Post, TOKEN_URL, 200, r#"{"access_token":"tok"}"#);

        authenticate(&input(Some("  ")), AuthMode::OAuth, &OAuthClient::default(), TOKEN_URL, &mock)
            .unwrap();
        assert_eq!(form_field(&mock.calls()[0].body, "mfa_token"), None);
    }

    #[test]
    fn test_oauth_rejected() {
        let mock = MockTransport::new();
        mock.on(Method::Post, TOKEN_URL, 401, r#"{"error":"unauthorized"}"#);

        let err =
            authenticate(&input(None), AuthMode::OAuth, &OAuthClient::default(), TOKEN_URL, &mock)
                .unwrap_err();
        assert_eq!(err, AuthError::Rejected { status: 401 });
    }

    #[test]
    fn test_oauth_missing_token() {
        let mock = MockTransport::new();
        mock.on(Method::Post, TOKEN_URL, 200, r#"{"token_type":"bearer"}"#);

        let err =
            authenticate(&input(None), AuthMode::OAuth, &OAuthClient::default(), TOKEN_URL, &mock)
                .unwrap_err();
        assert_eq!(err, AuthError::MissingToken);
    }

    #[test]
    fn test_oauth_transport_failure() {
        let mock = MockTransport::new();
        mock.fail(Method::Post, TOKEN_URL, "connection refused");

        let err =
            authenticate(&input(None), AuthMode::OAuth, &OAuthClient::default(), TOKEN_URL, &mock)
                .unwrap_err();
        assert!(matches!(err, AuthError::Transport(_)));
    }

    #[test]
    fn test_debug_never_prints_secrets() {
        let credential = Credential::Bearer(SecretString::from("tok-123".to_string()));
        assert_eq!(format!("{credential:?}"), "Credential::Bearer(<hidden>)");

        let debug = format!("{:?}", input(Some("987654")));
        assert!(!debug.contains("opensesame"));
        assert!(!debug.contains("987654"));
    }

    #[test]
    fn test_auth_mode_serde() {
        let mode: AuthMode = serde_json::from_str(r#""basic""#).unwrap();
        assert_eq!(mode, AuthMode::Basic);
        assert_eq!(AuthMode::default(), AuthMode::OAuth);
    }
}
