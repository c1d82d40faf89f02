//! Authentication gate shared by both transports.
//!
//! A failed check is a value with a reason, never an error. The HTTP
//! transport turns denials into 401 responses; stdio only logs them.

use base64::Engine;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Request details the gate inspects. Transports lowercase header names
/// before insertion.
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
}

impl RequestMeta {
    pub fn new(method: impl Into<String>, path: impl Into<String>) -> Self {
        RequestMeta {
            method: method.into(),
            path: path.into(),
            headers: HashMap::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Outcome of an authentication check.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthOutcome {
    pub authenticated: bool,
    pub reason: Option<String>,
}

impl AuthOutcome {
    pub fn ok() -> Self {
        AuthOutcome {
            authenticated: true,
            reason: None,
        }
    }

    pub fn denied(reason: impl Into<String>) -> Self {
        AuthOutcome {
            authenticated: false,
            reason: Some(reason.into()),
        }
    }
}

pub type AuthPredicate = Arc<dyn Fn(&RequestMeta) -> bool + Send + Sync>;

/// Authentication scheme attached to a server at build time.
#[derive(Clone)]
pub enum AuthConfig {
    /// `Authorization: Bearer <token>` with an exact token match.
    Bearer { token: String },
    /// Key accepted from `X-Api-Key`, a bare `Authorization` value, or a
    /// `Bearer `-prefixed `Authorization` value.
    ApiKey { keys: Vec<String> },
    /// `Authorization: Basic <base64(user:pass)>`, compared field-wise.
    Basic { username: String, password: String },
    /// Caller-supplied predicate over the request metadata.
    Custom { predicate: AuthPredicate },
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        AuthConfig::Bearer {
            token: token.into(),
        }
    }

    pub fn api_key<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        AuthConfig::ApiKey {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }

    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        AuthConfig::Basic {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn custom<F>(predicate: F) -> Self
    where
        F: Fn(&RequestMeta) -> bool + Send + Sync + 'static,
    {
        AuthConfig::Custom {
            predicate: Arc::new(predicate),
        }
    }

    pub fn scheme(&self) -> &'static str {
        match self {
            AuthConfig::Bearer { .. } => "bearer",
            AuthConfig::ApiKey { .. } => "api-key",
            AuthConfig::Basic { .. } => "basic",
            AuthConfig::Custom { .. } => "custom",
        }
    }

    /// Check one request. Malformed credentials are denials, not errors.
    pub fn authenticate(&self, meta: &RequestMeta) -> AuthOutcome {
        match self {
            AuthConfig::Bearer { token } => {
                let header = match meta.header("authorization") {
                    Some(h) => h,
                    None => return AuthOutcome::denied("Missing Authorization header"),
                };
                match header.strip_prefix("Bearer ") {
                    Some(candidate) if candidate == token => AuthOutcome::ok(),
                    Some(_) => AuthOutcome::denied("Invalid bearer token"),
                    None => AuthOutcome::denied("Authorization header is not a bearer token"),
                }
            }
            AuthConfig::ApiKey { keys } => {
                let candidate = meta.header("x-api-key").or_else(|| {
                    meta.header("authorization")
                        .map(|h| h.strip_prefix("Bearer ").unwrap_or(h))
                });
                match candidate {
                    Some(candidate) if keys.iter().any(|k| k == candidate) => AuthOutcome::ok(),
                    Some(_) => AuthOutcome::denied("Invalid API key"),
                    None => AuthOutcome::denied("Missing API key"),
                }
            }
            AuthConfig::Basic { username, password } => {
                let header = match meta.header("authorization") {
                    Some(h) => h,
                    None => return AuthOutcome::denied("Missing Authorization header"),
                };
                let encoded = match header.strip_prefix("Basic ") {
                    Some(e) => e,
                    None => return AuthOutcome::denied("Authorization header is not basic auth"),
                };
                let decoded = match base64::engine::general_purpose::STANDARD.decode(encoded) {
                    Ok(bytes) => bytes,
                    Err(_) => return AuthOutcome::denied("Invalid base64 in basic credentials"),
                };
                let text = match String::from_utf8(decoded) {
                    Ok(t) => t,
                    Err(_) => return AuthOutcome::denied("Basic credentials are not valid UTF-8"),
                };
                match text.split_once(':') {
                    Some((user, pass)) if user == username && pass == password => {
                        AuthOutcome::ok()
                    }
                    Some(_) => AuthOutcome::denied("Invalid username or password"),
                    None => AuthOutcome::denied("Malformed basic credentials"),
                }
            }
            AuthConfig::Custom { predicate } => {
                if predicate(meta) {
                    AuthOutcome::ok()
                } else {
                    AuthOutcome::denied("Rejected by custom authenticator")
                }
            }
        }
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthConfig::Bearer { .. } => f.write_str("AuthConfig::Bearer"),
            AuthConfig::ApiKey { keys } => write!(f, "AuthConfig::ApiKey({} keys)", keys.len()),
            AuthConfig::Basic { username, .. } => write!(f, "AuthConfig::Basic({})", username),
            AuthConfig::Custom { .. } => f.write_str("AuthConfig::Custom"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> RequestMeta {
        RequestMeta::new("POST", "/rpc")
    }

    #[test]
    fn test_bearer_auth() {
        let auth = AuthConfig::bearer("secret-token");

        let ok = auth.authenticate(&meta().with_header("Authorization", "Bearer secret-token"));
        assert!(ok.authenticated);
        assert!(ok.reason.is_none());

        let missing = auth.authenticate(&meta());
        assert!(!missing.authenticated);
        assert_eq!(missing.reason.as_deref(), Some("Missing Authorization header"));

        let wrong = auth.authenticate(&meta().with_header("Authorization", "Bearer nope"));
        assert!(!wrong.authenticated);

        let scheme = auth.authenticate(&meta().with_header("Authorization", "Basic abc"));
        assert_eq!(
            scheme.reason.as_deref(),
            Some("Authorization header is not a bearer token")
        );
    }

    #[test]
    fn test_api_key_accepts_three_header_forms() {
        let auth = AuthConfig::api_key(["k1", "k2"]);

        assert!(auth
            .authenticate(&meta().with_header("X-Api-Key", "k1"))
            .authenticated);
        assert!(auth
            .authenticate(&meta().with_header("Authorization", "k2"))
            .authenticated);
        assert!(auth
            .authenticate(&meta().with_header("Authorization", "Bearer k1"))
            .authenticated);

        let wrong = auth.authenticate(&meta().with_header("X-Api-Key", "k3"));
        assert_eq!(wrong.reason.as_deref(), Some("Invalid API key"));

        let missing = auth.authenticate(&meta());
        assert_eq!(missing.reason.as_deref(), Some("Missing API key"));
    }

    #[test]
    fn test_basic_auth() {
        let auth = AuthConfig::basic("alice", "s3cret");
        let encode =
            |creds: &str| base64::engine::general_purpose::STANDARD.encode(creds.as_bytes());

        let ok = auth.authenticate(
            &meta().with_header("Authorization", format!("Basic {}", encode("alice:s3cret"))),
        );
        assert!(ok.authenticated);

        let wrong_pass = auth.authenticate(
            &meta().with_header("Authorization", format!("Basic {}", encode("alice:wrong"))),
        );
        assert_eq!(wrong_pass.reason.as_deref(), Some("Invalid username or password"));

        let no_colon = auth.authenticate(
            &meta().with_header("Authorization", format!("Basic {}", encode("alice"))),
        );
        assert_eq!(no_colon.reason.as_deref(), Some("Malformed basic credentials"));

        let bad_b64 = auth.authenticate(&meta().with_header("Authorization", "Basic %%%"));
        assert_eq!(bad_b64.reason.as_deref(), Some("Invalid base64 in basic credentials"));
    }

    #[test]
    fn test_custom_predicate() {
        let auth = AuthConfig::custom(|meta| meta.path == "/health");
        assert!(auth.authenticate(&RequestMeta::new("GET", "/health")).authenticated);
        let denied = auth.authenticate(&RequestMeta::new("GET", "/rpc"));
        assert_eq!(denied.reason.as_deref(), Some("Rejected by custom authenticator"));
    }

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let m = meta().with_header("X-API-KEY", "abc");
        assert_eq!(m.header("x-api-key"), Some("abc"));
        assert_eq!(m.header("X-Api-Key"), Some("abc"));
    }
}
