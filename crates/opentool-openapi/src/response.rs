//! Response classification and result shaping.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use opentool_core::{ToolOutput, ToolResponse};
use percent_encoding::percent_decode_str;
use serde_json::{Value, json};

use crate::types::is_json_media_type;

/// How a response body is surfaced to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Json,
    Text,
    Binary,
}

/// Classify a response by its `Content-Type`.
///
/// A missing content type is treated as text.
pub fn classify_content_type(content_type: Option<&str>) -> BodyKind {
    let Some(content_type) = content_type else {
        return BodyKind::Text;
    };
    if is_json_media_type(content_type) {
        return BodyKind::Json;
    }

    let essence = content_type
        .split(';')
        .next()
        .unwrap_or(content_type)
        .trim()
        .to_ascii_lowercase();
    let text_like = essence.starts_with("text/")
        || essence.ends_with("+xml")
        || matches!(
            essence.as_str(),
            "application/xml"
                | "application/javascript"
                | "application/x-www-form-urlencoded"
                | "application/yaml"
                | "application/x-yaml"
                | "application/graphql"
                | ""
        );

    if text_like {
        BodyKind::Text
    } else {
        BodyKind::Binary
    }
}

/// Extract a filename from a `Content-Disposition` header.
///
/// `filename*` (RFC 5987) wins over `filename`.
pub fn content_disposition_filename(header: &str) -> Option<String> {
    let mut plain = None;
    for part in header.split(';').map(str::trim) {
        let Some((key, value)) = part.split_once('=') else {
            continue;
        };
        match key.trim().to_ascii_lowercase().as_str() {
            "filename*" => {
                let value = value.trim();
                let encoded = value.splitn(3, '\'').nth(2).unwrap_or(value);
                return Some(percent_decode_str(encoded).decode_utf8_lossy().into_owned());
            }
            "filename" => {
                plain = Some(value.trim().trim_matches('"').to_string());
            }
            _ => {}
        }
    }
    plain.filter(|name| !name.is_empty())
}

/// Everything result shaping needs to know about one exchange.
#[derive(Debug, Clone)]
pub struct HttpExchange {
    pub tool_name: String,
    pub operation_id: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub content_disposition: Option<String>,
    pub body: Vec<u8>,
}

impl HttpExchange {
    pub fn body_kind(&self) -> BodyKind {
        classify_content_type(self.content_type.as_deref())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    fn mime_type(&self) -> String {
        self.content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string())
    }

    fn filename(&self) -> Option<String> {
        self.content_disposition
            .as_deref()
            .and_then(content_disposition_filename)
    }
}

/// Shape a 2xx response.
pub fn shape_success(exchange: &HttpExchange, pretty: bool) -> ToolResponse {
    match exchange.body_kind() {
        BodyKind::Binary => ToolResponse::new(ToolOutput::File {
            data: STANDARD.encode(&exchange.body),
            mime_type: exchange.mime_type(),
            filename: exchange.filename(),
            size: exchange.body.len(),
        }),
        kind => {
            let raw = exchange.body_text();
            let body = if pretty && kind == BodyKind::Json {
                serde_json::from_str::<Value>(&raw)
                    .ok()
                    .and_then(|v| serde_json::to_string_pretty(&v).ok())
                    .unwrap_or(raw)
            } else {
                raw
            };
            ToolResponse::text(format!(
                "{} {}\nStatus: {}\n\n{}",
                exchange.method, exchange.url, exchange.status, body
            ))
        }
    }
}

/// Shape a non-2xx response; `narrative` explains how to recover.
pub fn shape_failure(exchange: &HttpExchange, narrative: &str) -> ToolResponse {
    let response = match exchange.body_kind() {
        BodyKind::Binary => ToolResponse::json(json!({
            "status": exchange.status,
            "operation": {
                "tool": exchange.tool_name,
                "operationId": exchange.operation_id,
                "method": exchange.method,
                "url": exchange.url,
            },
            "mimeType": exchange.mime_type(),
            "filename": exchange.filename(),
            "size": exchange.body.len(),
            "data": STANDARD.encode(&exchange.body),
            "explanation": narrative,
        })),
        _ => {
            let body = exchange.body_text();
            let body = if body.trim().is_empty() {
                "(empty)".to_string()
            } else {
                body
            };
            ToolResponse::text(format!(
                "HTTP {} from {} {} (operation '{}', tool '{}')\n\n{}\n\nResponse body:\n{}",
                exchange.status,
                exchange.method,
                exchange.url,
                exchange.operation_id,
                exchange.tool_name,
                narrative,
                body
            ))
        }
    };

    response
        .with_error(true)
        .with_next_step(format!("schema {}", exchange.tool_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exchange(status: u16, content_type: Option<&str>, body: &[u8]) -> HttpExchange {
        HttpExchange {
            tool_name: "getReport".to_string(),
            operation_id: "getReport".to_string(),
            method: "GET".to_string(),
            url: "https://api.test/report".to_string(),
            status,
            content_type: content_type.map(str::to_string),
            content_disposition: Some("attachment; filename=\"report.pdf\"".to_string()),
            body: body.to_vec(),
        }
    }

    #[test]
    fn test_classify_content_type() {
        assert_eq!(classify_content_type(Some("application/json")), BodyKind::Json);
        assert_eq!(classify_content_type(Some("application/problem+json")), BodyKind::Json);
        assert_eq!(classify_content_type(Some("text/csv; charset=utf-8")), BodyKind::Text);
        assert_eq!(classify_content_type(Some("application/atom+xml")), BodyKind::Text);
        assert_eq!(classify_content_type(Some("image/png")), BodyKind::Binary);
        assert_eq!(classify_content_type(None), BodyKind::Text);
    }

    #[test]
    fn test_content_disposition_filename() {
        assert_eq!(
            content_disposition_filename("attachment; filename=\"a b.txt\""),
            Some("a b.txt".to_string())
        );
        assert_eq!(
            content_disposition_filename("attachment; filename=x.txt; filename*=UTF-8''na%C3%AFve.txt"),
            Some("naïve.txt".to_string())
        );
        assert_eq!(
            content_disposition_filename("attachment; filename*=UTF-8''100%25%zz.txt"),
            Some("100%%zz.txt".to_string())
        );
        assert_eq!(content_disposition_filename("inline"), None);
    }

    #[test]
    fn test_binary_success_is_file() {
        let response = shape_success(&exchange(200, Some("application/pdf"), b"%PDF"), false);
        match response.output {
            ToolOutput::File {
                data,
                filename,
                size,
                ..
            } => {
                assert_eq!(data, STANDARD.encode(b"%PDF"));
                assert_eq!(filename.as_deref(), Some("report.pdf"));
                assert_eq!(size, 4);
            }
            other => panic!("unexpected output: {:?}", other),
        }
        assert!(!response.is_error);
    }

    #[test]
    fn test_pretty_json_envelope() {
        let response = shape_success(&exchange(200, Some("application/json"), br#"{"a":1}"#), true);
        let text = response.text_content().unwrap();
        assert!(text.starts_with("GET https://api.test/report\nStatus: 200"));
        assert!(text.contains("{\n  \"a\": 1\n}"));
    }

    #[test]
    fn test_binary_failure_is_structured() {
        let response = shape_failure(&exchange(500, Some("image/png"), &[0, 1, 2]), "Server error");
        assert!(response.is_error);
        match response.output {
            ToolOutput::Json { value } => {
                assert_eq!(value["status"], 500);
                assert_eq!(value["filename"], "report.pdf");
                assert_eq!(value["operation"]["operationId"], "getReport");
            }
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn test_text_failure_includes_narrative() {
        let response = shape_failure(&exchange(404, None, b""), "Check the id");
        let text = response.text_content().unwrap();
        assert!(response.is_error);
        assert!(text.contains("HTTP 404"));
        assert!(text.contains("Check the id"));
        assert!(text.contains("(empty)"));
    }
}
