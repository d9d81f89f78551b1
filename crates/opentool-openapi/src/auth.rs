//! Security-scheme resolution and credential injection.
//!
//! Supported schemes:
//! - API Key (in header, query parameter or cookie)
//! - HTTP Bearer (Authorization: Bearer <token>)
//! - HTTP Basic (Authorization: Basic <base64>)
//! - OAuth2 and OpenID Connect, sent as bearer tokens
//!
//! Credentials come from the call context. When none of an operation's
//! security requirements can be satisfied, any available credentials are
//! injected the legacy way: API key under the document's default header,
//! otherwise a bearer token, otherwise basic credentials.

use crate::types::SecurityRequirement;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use opentool_core::Credentials;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Header used for API keys when the document declares no header scheme.
pub const DEFAULT_API_KEY_HEADER: &str = "X-API-Key";

/// Location where an API key is sent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    Header,
    Query,
    Cookie,
}

/// A security scheme from `components.securitySchemes`, reduced to what
/// credential injection needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SecuritySchemeKind {
    ApiKey {
        location: ApiKeyLocation,
        name: String,
    },
    Bearer,
    Basic,
    OAuth2,
    OpenIdConnect,
    /// An HTTP scheme other than bearer/basic
    Unsupported { scheme: String },
}

impl SecuritySchemeKind {
    pub fn from_openapi(scheme: &openapiv3::SecurityScheme) -> Self {
        match scheme {
            openapiv3::SecurityScheme::APIKey { location, name, .. } => {
                let location = match location {
                    openapiv3::APIKeyLocation::Header => ApiKeyLocation::Header,
                    openapiv3::APIKeyLocation::Query => ApiKeyLocation::Query,
                    openapiv3::APIKeyLocation::Cookie => ApiKeyLocation::Cookie,
                };
                SecuritySchemeKind::ApiKey {
                    location,
                    name: name.clone(),
                }
            }
            openapiv3::SecurityScheme::HTTP { scheme, .. } => {
                match scheme.to_ascii_lowercase().as_str() {
                    "bearer" => SecuritySchemeKind::Bearer,
                    "basic" => SecuritySchemeKind::Basic,
                    _ => SecuritySchemeKind::Unsupported {
                        scheme: scheme.clone(),
                    },
                }
            }
            openapiv3::SecurityScheme::OAuth2 { .. } => SecuritySchemeKind::OAuth2,
            openapiv3::SecurityScheme::OpenIDConnect { .. } => SecuritySchemeKind::OpenIdConnect,
        }
    }

    /// Human readable summary used in error narratives
    pub fn describe(&self) -> String {
        match self {
            SecuritySchemeKind::ApiKey { location, name } => {
                let location = match location {
                    ApiKeyLocation::Header => "header",
                    ApiKeyLocation::Query => "query parameter",
                    ApiKeyLocation::Cookie => "cookie",
                };
                format!("API key in {} '{}'", location, name)
            }
            SecuritySchemeKind::Bearer => "HTTP bearer token".to_string(),
            SecuritySchemeKind::Basic => "HTTP basic credentials".to_string(),
            SecuritySchemeKind::OAuth2 => "OAuth2 access token (sent as bearer)".to_string(),
            SecuritySchemeKind::OpenIdConnect => {
                "OpenID Connect token (sent as bearer)".to_string()
            }
            SecuritySchemeKind::Unsupported { scheme } => {
                format!("unsupported HTTP scheme '{}'", scheme)
            }
        }
    }

    /// Build the injection for this scheme if the credentials can satisfy it.
    fn injection(&self, credentials: &Credentials) -> Option<AuthInjection> {
        match self {
            SecuritySchemeKind::ApiKey { location, name } => {
                let key = credentials.api_key.clone()?;
                Some(match location {
                    ApiKeyLocation::Header => AuthInjection::Header(name.clone(), key),
                    ApiKeyLocation::Query => AuthInjection::Query(name.clone(), key),
                    ApiKeyLocation::Cookie => AuthInjection::Cookie(name.clone(), key),
                })
            }
            SecuritySchemeKind::Bearer
            | SecuritySchemeKind::OAuth2
            | SecuritySchemeKind::OpenIdConnect => credentials.bearer_token.as_deref().map(bearer),
            SecuritySchemeKind::Basic => basic(credentials),
            SecuritySchemeKind::Unsupported { .. } => None,
        }
    }
}

/// A credential placed on the outbound request.
///
/// Values are secrets; `Debug` only shows where they go.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthInjection {
    Header(String, String),
    Query(String, String),
    Cookie(String, String),
}

impl AuthInjection {
    fn target(&self) -> (&'static str, String) {
        match self {
            AuthInjection::Header(name, _) => ("header", name.to_ascii_lowercase()),
            AuthInjection::Query(name, _) => ("query", name.clone()),
            AuthInjection::Cookie(name, _) => ("cookie", name.clone()),
        }
    }
}

impl std::fmt::Debug for AuthInjection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (location, name) = self.target();
        write!(f, "AuthInjection({} '{}')", location, name)
    }
}

fn bearer(token: &str) -> AuthInjection {
    AuthInjection::Header("Authorization".to_string(), format!("Bearer {}", token))
}

fn basic(credentials: &Credentials) -> Option<AuthInjection> {
    let (user, pass) = credentials.basic_pair()?;
    let encoded = STANDARD.encode(format!("{}:{}", user, pass.unwrap_or_default()));
    Some(AuthInjection::Header(
        "Authorization".to_string(),
        format!("Basic {}", encoded),
    ))
}

/// Name of the first `apiKey` scheme sent in a header, else `X-API-Key`.
pub fn default_api_key_header(schemes: &[(String, SecuritySchemeKind)]) -> String {
    schemes
        .iter()
        .find_map(|(_, kind)| match kind {
            SecuritySchemeKind::ApiKey {
                location: ApiKeyLocation::Header,
                name,
            } => Some(name.clone()),
            _ => None,
        })
        .unwrap_or_else(|| DEFAULT_API_KEY_HEADER.to_string())
}

/// Resolve which credentials to inject for one call.
///
/// Each requirement is satisfied by the first of its schemes the
/// credentials can serve. Two injections never target the same header,
/// query parameter or cookie.
pub fn resolve_auth(
    requirements: &[SecurityRequirement],
    schemes: &[(String, SecuritySchemeKind)],
    credentials: &Credentials,
    default_header: &str,
) -> Vec<AuthInjection> {
    let mut injections: Vec<AuthInjection> = Vec::new();
    let mut satisfied = false;

    for requirement in requirements {
        let found = requirement.schemes.iter().find_map(|scheme_ref| {
            let kind = schemes
                .iter()
                .find(|(name, _)| name == &scheme_ref.name)
                .map(|(_, kind)| kind)?;
            kind.injection(credentials)
                .map(|injection| (scheme_ref.name.as_str(), injection))
        });

        if let Some((scheme_name, injection)) = found {
            debug!(scheme = %scheme_name, "Security requirement satisfied");
            satisfied = true;
            push_unique(&mut injections, injection);
        }
    }

    if satisfied {
        return injections;
    }

    if let Some(key) = &credentials.api_key {
        push_unique(
            &mut injections,
            AuthInjection::Header(default_header.to_string(), key.clone()),
        );
    }
    if let Some(token) = &credentials.bearer_token {
        push_unique(&mut injections, bearer(token));
    } else if let Some(injection) = basic(credentials) {
        push_unique(&mut injections, injection);
    }

    if !injections.is_empty() {
        debug!(count = injections.len(), "Applied fallback credential injection");
    }
    injections
}

fn push_unique(injections: &mut Vec<AuthInjection>, injection: AuthInjection) {
    let target = injection.target();
    if !injections.iter().any(|existing| existing.target() == target) {
        injections.push(injection);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::SchemeRef;

    fn requirement(names: &[&str]) -> SecurityRequirement {
        SecurityRequirement {
            schemes: names
                .iter()
                .map(|name| SchemeRef {
                    name: name.to_string(),
                    scopes: vec![],
                })
                .collect(),
        }
    }

    fn schemes() -> Vec<(String, SecuritySchemeKind)> {
        vec![
            (
                "queryKey".to_string(),
                SecuritySchemeKind::ApiKey {
                    location: ApiKeyLocation::Query,
                    name: "api_key".to_string(),
                },
            ),
            ("bearerAuth".to_string(), SecuritySchemeKind::Bearer),
            ("basicAuth".to_string(), SecuritySchemeKind::Basic),
        ]
    }

    #[test]
    fn test_api_key_goes_where_the_scheme_says() {
        let creds = Credentials::new().with_api_key("k");
        let injections = resolve_auth(&[requirement(&["queryKey"])], &schemes(), &creds, "X-API-Key");

        assert_eq!(
            injections,
            vec![AuthInjection::Query("api_key".to_string(), "k".to_string())]
        );
    }

    #[test]
    fn test_first_satisfiable_scheme_wins() {
        let creds = Credentials::new().with_basic_auth("user", "pass");
        let injections = resolve_auth(
            &[requirement(&["bearerAuth", "basicAuth"])],
            &schemes(),
            &creds,
            "X-API-Key",
        );

        assert_eq!(
            injections,
            vec![AuthInjection::Header(
                "Authorization".to_string(),
                "Basic dXNlcjpwYXNz".to_string()
            )]
        );
    }

    #[test]
    fn test_fallback_injects_default_header_and_bearer() {
        let creds = Credentials::new()
            .with_api_key("k")
            .with_bearer_token("t")
            .with_basic_auth("u", "p");
        let injections = resolve_auth(&[], &schemes(), &creds, "X-Custom-Key");

        assert_eq!(
            injections,
            vec![
                AuthInjection::Header("X-Custom-Key".to_string(), "k".to_string()),
                AuthInjection::Header("Authorization".to_string(), "Bearer t".to_string()),
            ]
        );
    }

    #[test]
    fn test_no_credentials_no_injection() {
        let injections = resolve_auth(
            &[requirement(&["bearerAuth"])],
            &schemes(),
            &Credentials::new(),
            "X-API-Key",
        );
        assert!(injections.is_empty());
    }

    #[test]
    fn test_default_api_key_header() {
        assert_eq!(default_api_key_header(&schemes()), "X-API-Key");

        let with_header = vec![(
            "headerKey".to_string(),
            SecuritySchemeKind::ApiKey {
                location: ApiKeyLocation::Header,
                name: "X-Token".to_string(),
            },
        )];
        assert_eq!(default_api_key_header(&with_header), "X-Token");
    }

    #[test]
    fn test_debug_hides_secret() {
        let injection = AuthInjection::Header("Authorization".to_string(), "Bearer s3cret".to_string());
        assert!(!format!("{:?}", injection).contains("s3cret"));
    }
}
