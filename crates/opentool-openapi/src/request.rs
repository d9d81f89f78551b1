//! Mapping validated arguments to a concrete HTTP request.

use crate::auth::AuthInjection;
use crate::error::{OpenApiError, Result};
use crate::input_schema::{ParameterNameMap, REQUEST_BODY_PROPERTY};
use crate::types::{Operation, ParameterLocation};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use rand::seq::SliceRandom;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Render a scalar argument for the wire.
///
/// Integral numbers never carry a fractional part, so `42.0` renders as
/// `42`. Arrays join with `,`; objects render as compact JSON.
pub fn format_parameter_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => {
            if n.is_i64() || n.is_u64() {
                n.to_string()
            } else {
                match n.as_f64() {
                    Some(f) if f.fract() == 0.0 && f.abs() < 9.007_199_254_740_992e15 => {
                        format!("{}", f as i64)
                    }
                    Some(f) => f.to_string(),
                    None => n.to_string(),
                }
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(format_parameter_value)
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => value.to_string(),
    }
}

/// RFC 3986 unreserved characters pass through, everything else is escaped
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value for use as one path segment
pub fn encode_path_segment(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

/// RFC 6265 cookie-octet
fn is_cookie_octet(b: u8) -> bool {
    matches!(b, 0x21 | 0x23..=0x2B | 0x2D..=0x3A | 0x3C..=0x5B | 0x5D..=0x7E)
}

/// Cookie values that are not RFC 6265 tokens are percent-encoded
pub fn encode_cookie_value(value: &str) -> String {
    if value.bytes().all(is_cookie_octet) {
        value.to_string()
    } else {
        utf8_percent_encode(value, UNRESERVED).to_string()
    }
}

/// Pick one base URL per call.
pub fn select_base_url(candidates: &[String]) -> Option<&str> {
    candidates
        .choose(&mut rand::thread_rng())
        .map(String::as_str)
}

/// A fully resolved request, not yet bound to a client.
#[derive(Clone)]
pub struct PreparedRequest {
    pub method: reqwest::Method,
    /// Base URL plus substituted path, without query
    pub url: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub cookies: Vec<(String, String)>,
    /// Content type and JSON body
    pub body: Option<(String, Value)>,
    credentials: Vec<AuthInjection>,
}

impl std::fmt::Debug for PreparedRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreparedRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("query", &self.query)
            .field("headers", &self.headers)
            .field("cookies", &self.cookies)
            .field("has_body", &self.body.is_some())
            .field("credentials", &self.credentials)
            .finish()
    }
}

impl PreparedRequest {
    /// Build the request for `operation` from validated arguments.
    #[instrument(skip(operation, names, arguments), fields(operation = %operation.id()))]
    pub fn build(
        operation: &Operation,
        names: &ParameterNameMap,
        arguments: &Map<String, Value>,
        base_url: &str,
    ) -> Result<Self> {
        let method = reqwest::Method::from_bytes(operation.method.as_bytes()).map_err(|e| {
            OpenApiError::InvalidSpec(format!("invalid HTTP method {}: {}", operation.method, e))
        })?;

        let mut path = operation.path.clone();
        let mut query = Vec::new();
        let mut headers = Vec::new();
        let mut cookies = Vec::new();

        for param in &operation.parameters {
            let escaped = names.escaped(&param.name, param.location);
            let value = arguments
                .get(escaped)
                .or_else(|| arguments.get(&param.name));
            let Some(value) = value.filter(|v| !v.is_null()) else {
                continue;
            };

            match param.location {
                ParameterLocation::Path => {
                    let encoded = encode_path_segment(&format_parameter_value(value));
                    path = path.replace(&format!("{{{}}}", param.name), &encoded);
                }
                ParameterLocation::Query => match value {
                    Value::Array(items) => {
                        for item in items {
                            query.push((param.name.clone(), format_parameter_value(item)));
                        }
                    }
                    _ => query.push((param.name.clone(), format_parameter_value(value))),
                },
                ParameterLocation::Header => {
                    headers.push((param.name.clone(), format_parameter_value(value)));
                }
                ParameterLocation::Cookie => {
                    cookies.push((param.name.clone(), format_parameter_value(value)));
                }
            }
        }

        let body = match (
            operation
                .request_body
                .as_ref()
                .and_then(|body| body.json_media_type()),
            arguments.get(REQUEST_BODY_PROPERTY),
        ) {
            (Some(media_type), Some(body)) => Some((media_type.to_string(), body.clone())),
            _ => None,
        };

        let url = format!("{}{}", base_url.trim_end_matches('/'), path);
        debug!("Request URL: {} {}", method, url);

        Ok(Self {
            method,
            url,
            query,
            headers,
            cookies,
            body,
            credentials: Vec::new(),
        })
    }

    /// Attach resolved credentials; they are applied when the request is sent
    pub fn with_credentials(mut self, credentials: Vec<AuthInjection>) -> Self {
        self.credentials = credentials;
        self
    }

    /// URL with caller-supplied query parameters, never credentials
    pub fn display_url(&self) -> String {
        if self.query.is_empty() {
            return self.url.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        format!("{}?{}", self.url, query)
    }

    /// Value of the `Cookie` header, if any cookies are set
    pub fn cookie_header(&self) -> Option<String> {
        let caller = self.cookies.iter().map(|(k, v)| (k.as_str(), v.as_str()));
        let injected = self.credentials.iter().filter_map(|c| match c {
            AuthInjection::Cookie(k, v) => Some((k.as_str(), v.as_str())),
            _ => None,
        });
        let pairs: Vec<String> = caller
            .chain(injected)
            .map(|(name, value)| format!("{}={}", name, encode_cookie_value(value)))
            .collect();
        (!pairs.is_empty()).then(|| pairs.join("; "))
    }

    /// Bind the request to a client.
    pub fn into_request_builder(self, client: &reqwest::Client) -> Result<reqwest::RequestBuilder> {
        let url = url::Url::parse(&self.url)?;
        let cookie = self.cookie_header();

        let mut builder = client
            .request(self.method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json, */*;q=0.8");

        let mut query = self.query.clone();
        for injection in &self.credentials {
            if let AuthInjection::Query(name, value) = injection {
                query.push((name.clone(), value.clone()));
            }
        }
        if !query.is_empty() {
            builder = builder.query(&query);
        }

        for (name, value) in &self.headers {
            builder = builder.header(header_name(name)?, header_value(name, value)?);
        }
        for injection in &self.credentials {
            if let AuthInjection::Header(name, value) = injection {
                let mut value = header_value(name, value)?;
                value.set_sensitive(true);
                builder = builder.header(header_name(name)?, value);
            }
        }
        if let Some(cookie) = cookie {
            builder = builder.header(reqwest::header::COOKIE, header_value("Cookie", &cookie)?);
        }

        if let Some((content_type, body)) = self.body {
            let bytes = serde_json::to_vec(&body)?;
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, header_value("Content-Type", &content_type)?)
                .body(bytes);
        }

        Ok(builder)
    }
}

fn header_name(name: &str) -> Result<HeaderName> {
    HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| OpenApiError::InvalidParameter(name.to_string(), e.to_string()))
}

fn header_value(name: &str, value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| OpenApiError::InvalidParameter(name.to_string(), e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiParameter, RequestBodySpec};
    use serde_json::json;

    fn operation() -> Operation {
        let param = |name: &str, location| ApiParameter {
            name: name.to_string(),
            location,
            required: false,
            schema: None,
            description: None,
        };
        Operation {
            operation_id: Some("findPets".to_string()),
            summary: None,
            description: None,
            method: "POST".to_string(),
            path: "/owners/{ownerId}/pets".to_string(),
            parameters: vec![
                param("ownerId", ParameterLocation::Path),
                param("tags", ParameterLocation::Query),
                param("filter[name]", ParameterLocation::Query),
                param("X-Trace", ParameterLocation::Header),
                param("session", ParameterLocation::Cookie),
                param("theme", ParameterLocation::Cookie),
            ],
            request_body: Some(RequestBodySpec {
                content: vec![("application/vnd.api+json".to_string(), None)],
                required: false,
                description: None,
            }),
            tags: vec![],
            security: vec![],
        }
    }

    fn build(arguments: Value) -> PreparedRequest {
        let op = operation();
        let names = ParameterNameMap::new(&op.parameters, &[REQUEST_BODY_PROPERTY]);
        PreparedRequest::build(
            &op,
            &names,
            arguments.as_object().unwrap(),
            "https://api.test/v1/",
        )
        .unwrap()
    }

    #[test]
    fn test_format_integral_float() {
        assert_eq!(format_parameter_value(&json!(42.0)), "42");
        assert_eq!(format_parameter_value(&json!(42)), "42");
        assert_eq!(format_parameter_value(&json!(1.5)), "1.5");
        assert_eq!(format_parameter_value(&json!(["a", 2])), "a,2");
    }

    #[test]
    fn test_path_query_header_cookie() {
        let request = build(json!({
            "ownerId": "a b/c",
            "tags": ["x", "y"],
            "filter_name_": "rex",
            "X-Trace": 7.0,
            "session": "a b"
        }));

        assert_eq!(request.url, "https://api.test/v1/owners/a%20b%2Fc/pets");
        assert_eq!(
            request.query,
            vec![
                ("tags".to_string(), "x".to_string()),
                ("tags".to_string(), "y".to_string()),
                ("filter[name]".to_string(), "rex".to_string()),
            ]
        );
        assert_eq!(request.headers, vec![("X-Trace".to_string(), "7".to_string())]);
        assert_eq!(request.cookie_header().as_deref(), Some("session=a%20b"));
    }

    #[test]
    fn test_raw_name_fallback() {
        let request = build(json!({"ownerId": 1, "filter[name]": "rex"}));
        assert!(request.query.contains(&("filter[name]".to_string(), "rex".to_string())));
    }

    #[test]
    fn test_json_api_body_keeps_media_type() {
        let request = build(json!({"ownerId": 1, "requestBody": {"data": {"type": "pets"}}}));
        let (content_type, body) = request.body.unwrap();
        assert_eq!(content_type, "application/vnd.api+json");
        assert_eq!(body["data"]["type"], "pets");
    }

    #[test]
    fn test_cookie_values() {
        assert_eq!(encode_cookie_value("abc123"), "abc123");
        assert_eq!(encode_cookie_value("a;b"), "a%3Bb");
        assert_eq!(encode_cookie_value("\"quoted\""), "%22quoted%22");
    }

    #[test]
    fn test_multiple_cookies_joined() {
        let request = build(json!({"ownerId": 1, "session": "abc", "theme": "dark;mode"}));
        assert_eq!(request.cookie_header().as_deref(), Some("session=abc; theme=dark%3Bmode"));

        let request = request.with_credentials(vec![AuthInjection::Cookie(
            "sid".to_string(),
            "k1".to_string(),
        )]);
        assert_eq!(
            request.cookie_header().as_deref(),
            Some("session=abc; theme=dark%3Bmode; sid=k1")
        );
    }

    #[test]
    fn test_path_segment_non_ascii() {
        assert_eq!(encode_path_segment("café"), "caf%C3%A9");
        assert_eq!(encode_path_segment("a-b.c_d~e"), "a-b.c_d~e");
        assert_eq!(encode_path_segment("50%"), "50%25");
        assert_eq!(encode_cookie_value("thé"), "th%C3%A9");
    }

    #[test]
    fn test_injected_query_credentials_not_displayed() {
        let request = build(json!({"ownerId": 1})).with_credentials(vec![AuthInjection::Query(
            "api_key".to_string(),
            "secret".to_string(),
        )]);
        assert!(!request.display_url().contains("secret"));
        assert!(!format!("{:?}", request).contains("secret"));
    }

    #[test]
    fn test_select_base_url() {
        let candidates = vec!["https://a.test".to_string(), "https://b.test".to_string()];
        let chosen = select_base_url(&candidates).unwrap();
        assert!(candidates.iter().any(|c| c == chosen));
        assert_eq!(select_base_url(&[]), None);
    }
}
