//! The tool behind one API operation.
//!
//! Each call runs the invocation pipeline: strip control arguments,
//! validate, check confirmation, build the request, authenticate, execute,
//! classify and shape the result.

use crate::auth::{SecuritySchemeKind, resolve_auth};
use crate::error::OpenApiError;
use crate::input_schema::{InputSchema, ParameterNameMap};
use crate::narrator::{NarrativeContext, compact_json, example_call, narrate};
use crate::request::{PreparedRequest, select_base_url};
use crate::response::{HttpExchange, shape_failure, shape_success};
use crate::types::Operation;
use crate::validation::{Violation, validate_arguments};
use async_trait::async_trait;
use opentool_core::{Error, ToolAnnotations, ToolOutput, ToolResponse};
use opentool_telemetry::{HttpSpanAttributes, trace_http_exchange};
use opentool_tool::{Tool, ToolContext};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Base URL used when neither an override nor document servers exist
pub const DEFAULT_BASE_URL: &str = "http://localhost:8080";

/// Requests streaming; the result is marked partial
pub const STREAM_ARG: &str = "stream";
/// Continues an earlier partial result
pub const RESUME_TOKEN_ARG: &str = "resumeToken";
/// Confirms a mutating call
pub const CONFIRM_ARGS: [&str; 2] = ["confirm", "confirmDestructive"];

/// State shared by every operation tool of one catalog.
#[derive(Debug, Clone)]
pub struct ToolRuntime {
    pub client: reqwest::Client,
    pub base_urls: Arc<[String]>,
    pub security_schemes: Arc<[(String, SecuritySchemeKind)]>,
    pub default_api_key_header: String,
    pub pretty: bool,
    pub confirm_destructive: bool,
}

#[derive(Debug, Default)]
struct ControlArguments {
    stream: bool,
    resume_token: Option<String>,
    confirmed: bool,
}

/// A tool that executes one REST API operation.
pub struct OperationTool {
    name: String,
    description: String,
    operation: Arc<Operation>,
    input_schema: Value,
    names: ParameterNameMap,
    annotations: ToolAnnotations,
    runtime: Arc<ToolRuntime>,
}

impl OperationTool {
    pub fn new(
        name: impl Into<String>,
        operation: Arc<Operation>,
        input: InputSchema,
        runtime: Arc<ToolRuntime>,
    ) -> Self {
        let annotations = annotations_for(&operation);
        Self {
            name: name.into(),
            description: operation.display_description(),
            operation,
            input_schema: input.schema,
            names: input.names,
            annotations,
            runtime,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn names(&self) -> &ParameterNameMap {
        &self.names
    }

    /// Remove control arguments unless the operation declares a parameter
    /// of the same name.
    fn take_control_arguments(&self, arguments: &mut Map<String, Value>) -> ControlArguments {
        let declared = |name: &str| {
            self.input_schema
                .get("properties")
                .and_then(|p| p.get(name))
                .is_some()
        };
        let mut control = ControlArguments::default();

        if !declared(STREAM_ARG) {
            if let Some(value) = arguments.remove(STREAM_ARG) {
                control.stream = value.as_bool().unwrap_or(false);
            }
        }
        if !declared(RESUME_TOKEN_ARG) {
            if let Some(value) = arguments.remove(RESUME_TOKEN_ARG) {
                control.resume_token = value.as_str().map(str::to_string);
            }
        }
        for name in CONFIRM_ARGS {
            if !declared(name) {
                if let Some(value) = arguments.remove(name) {
                    control.confirmed |= value.as_bool().unwrap_or(false);
                }
            }
        }
        control
    }

    fn validation_error(&self, violations: &[Violation], arguments: Value) -> ToolResponse {
        let example = example_call(&self.name, &self.input_schema);
        let mut text = format!("Invalid arguments for '{}':\n", self.name);
        for violation in violations {
            text.push_str(&format!("- {}\n", violation.message));
        }
        text.push_str(&format!("\nExample: {}", example));

        ToolResponse::error_text(text)
            .with_schema(self.input_schema.clone())
            .with_arguments(arguments)
            .with_usage(example.clone())
            .with_next_step(format!("schema {}", self.name))
            .with_next_step(example)
    }

    fn confirmation_required(&self, arguments: &Map<String, Value>) -> ToolResponse {
        let mut confirmed = arguments.clone();
        confirmed.insert(CONFIRM_ARGS[0].to_string(), Value::Bool(true));
        let retry = format!("call {} {}", self.name, compact_json(&Value::Object(confirmed)));

        ToolResponse::new(ToolOutput::ConfirmationRequired {
            tool: self.name.clone(),
            message: format!(
                "'{}' performs {} {}, which can modify or delete data. Re-invoke with \"confirm\": true to proceed.",
                self.name, self.operation.method, self.operation.path
            ),
        })
        .with_arguments(Value::Object(arguments.clone()))
        .with_next_step(retry)
    }

    /// Send the request, racing it against cancellation.
    #[instrument(skip(self, builder, cancel), fields(tool = %self.name))]
    async fn send(
        &self,
        builder: reqwest::RequestBuilder,
        cancel: CancellationToken,
        url: String,
    ) -> opentool_core::Result<HttpExchange> {
        let started = Instant::now();

        let response = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Call cancelled before the response arrived");
                return Err(Error::Cancelled(self.name.clone()));
            }
            result = builder.send() => result
                .map_err(|e| Error::tool_failed(&self.name, OpenApiError::HttpError(e)))?,
        };

        let status = response.status().as_u16();
        let header = |name: reqwest::header::HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let content_type = header(reqwest::header::CONTENT_TYPE);
        let content_disposition = header(reqwest::header::CONTENT_DISPOSITION);

        let body = tokio::select! {
            _ = cancel.cancelled() => {
                return Err(Error::Cancelled(self.name.clone()));
            }
            bytes = response.bytes() => bytes
                .map_err(|e| Error::tool_failed(&self.name, OpenApiError::HttpError(e)))?,
        };

        trace_http_exchange(HttpSpanAttributes {
            method: self.operation.method.clone(),
            url: url.clone(),
            status: Some(status),
            duration_ms: started.elapsed().as_millis(),
        });

        Ok(HttpExchange {
            tool_name: self.name.clone(),
            operation_id: self.operation.id(),
            method: self.operation.method.clone(),
            url,
            status,
            content_type,
            content_disposition,
            body: body.to_vec(),
        })
    }
}

fn annotations_for(operation: &Operation) -> ToolAnnotations {
    let method = operation.method.as_str();
    let read_only = matches!(method, "GET" | "HEAD" | "OPTIONS");
    ToolAnnotations {
        title: Some(
            operation
                .summary
                .clone()
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| operation.id()),
        ),
        read_only_hint: Some(read_only),
        destructive_hint: Some(method == "DELETE"),
        idempotent_hint: Some(read_only || matches!(method, "PUT" | "DELETE")),
        open_world_hint: Some(true),
    }
}

fn mark_partial(response: ToolResponse, resume_token: String) -> ToolResponse {
    let text = match &response.output {
        ToolOutput::Text { text } => text.clone(),
        ToolOutput::Json { value } => {
            serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
        }
        _ => return response,
    };
    ToolResponse {
        output: ToolOutput::Partial { text, resume_token },
        ..response
    }
}

#[async_trait]
impl Tool for OperationTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn schema(&self) -> Value {
        self.input_schema.clone()
    }

    fn annotations(&self) -> ToolAnnotations {
        self.annotations.clone()
    }

    async fn execute(
        &self,
        ctx: Arc<dyn ToolContext>,
        params: Value,
    ) -> opentool_core::Result<ToolResponse> {
        debug!("Executing operation tool: {}", self.name);

        let mut arguments = match params {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                let violation = Violation {
                    kind: crate::validation::ViolationKind::WrongType,
                    path: "arguments".to_string(),
                    message: "Arguments must be a JSON object.".to_string(),
                };
                return Ok(self.validation_error(&[violation], other));
            }
        };

        let control = self.take_control_arguments(&mut arguments);
        let args_value = Value::Object(arguments.clone());

        let violations = validate_arguments(&self.input_schema, &args_value);
        if !violations.is_empty() {
            debug!(count = violations.len(), "Arguments failed validation");
            return Ok(self.validation_error(&violations, args_value));
        }

        if self.runtime.confirm_destructive && self.operation.is_mutating() && !control.confirmed {
            debug!("Mutating call held for confirmation");
            return Ok(self.confirmation_required(&arguments));
        }

        let base_url =
            select_base_url(&self.runtime.base_urls).unwrap_or(DEFAULT_BASE_URL);
        let request =
            match PreparedRequest::build(&self.operation, &self.names, &arguments, base_url) {
                Ok(request) => request,
                Err(e) => return Err(Error::tool_failed(&self.name, e)),
            };

        let injections = resolve_auth(
            &self.operation.security,
            &self.runtime.security_schemes,
            ctx.credentials(),
            &self.runtime.default_api_key_header,
        );
        let request = request.with_credentials(injections);
        let display_url = request.display_url();

        let builder = match request.into_request_builder(&self.runtime.client) {
            Ok(builder) => builder,
            Err(OpenApiError::InvalidParameter(name, reason)) => {
                warn!(parameter = %name, "Argument cannot be sent as a header");
                return Ok(ToolResponse::error_text(format!(
                    "Argument '{}' cannot be sent: {}",
                    name, reason
                ))
                .with_schema(self.input_schema.clone())
                .with_arguments(args_value)
                .with_next_step(format!("schema {}", self.name)));
            }
            Err(e) => return Err(Error::tool_failed(&self.name, e)),
        };

        let exchange = self
            .send(builder, ctx.cancellation_token(), display_url)
            .await?;

        let response = if exchange.is_success() {
            shape_success(&exchange, self.runtime.pretty)
        } else {
            let narrative_ctx = NarrativeContext {
                tool_name: &self.name,
                operation: &self.operation,
                input_schema: &self.input_schema,
                names: &self.names,
                arguments: &args_value,
                security_schemes: &self.runtime.security_schemes,
            };
            let narrative = narrate(&narrative_ctx, exchange.status, &exchange.body_text());
            shape_failure(&exchange, &narrative).with_arguments(args_value)
        };

        if control.stream || control.resume_token.is_some() {
            let token = control
                .resume_token
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            return Ok(mark_partial(response, token));
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input_schema::build_input_schema;
    use crate::schema::SchemaSynthesizer;
    use crate::types::{ApiParameter, ParameterLocation};
    use opentool_tool::DefaultToolContext;
    use serde_json::json;

    fn tool(method: &str, path: &str, base_url: &str, confirm_destructive: bool) -> OperationTool {
        let operation = Operation {
            operation_id: Some("getPet".to_string()),
            summary: Some("Get a pet".to_string()),
            description: None,
            method: method.to_string(),
            path: path.to_string(),
            parameters: vec![ApiParameter {
                name: "petId".to_string(),
                location: ParameterLocation::Path,
                required: true,
                schema: Some(json!({"type": "integer"})),
                description: None,
            }],
            request_body: None,
            tags: vec![],
            security: vec![],
        };
        let root = json!({});
        let input = build_input_schema(&operation.parameters, None, &SchemaSynthesizer::new(&root));
        let runtime = ToolRuntime {
            client: reqwest::Client::new(),
            base_urls: vec![base_url.to_string()].into(),
            security_schemes: Vec::new().into(),
            default_api_key_header: "X-API-Key".to_string(),
            pretty: false,
            confirm_destructive,
        };
        OperationTool::new("getPet", Arc::new(operation), input, Arc::new(runtime))
    }

    fn ctx() -> Arc<dyn ToolContext> {
        Arc::new(DefaultToolContext::new("call-1".to_string(), "inv-1".to_string()))
    }

    #[test]
    fn test_annotations_follow_method() {
        let get = tool("GET", "/pets/{petId}", "http://unused", false);
        assert_eq!(get.annotations().read_only_hint, Some(true));
        assert_eq!(get.annotations().title.as_deref(), Some("Get a pet"));

        let delete = tool("DELETE", "/pets/{petId}", "http://unused", false);
        assert_eq!(delete.annotations().destructive_hint, Some(true));
        assert_eq!(delete.annotations().idempotent_hint, Some(true));
        assert_eq!(delete.annotations().open_world_hint, Some(true));
    }

    #[tokio::test]
    async fn test_validation_failure_makes_no_call() {
        let tool = tool("GET", "/pets/{petId}", "http://127.0.0.1:1", false);
        let response = tool.execute(ctx(), json!({"petId": "abc"})).await.unwrap();

        assert!(response.is_error);
        assert!(response.schema.is_some());
        assert_eq!(response.usage.as_deref(), Some(r#"call getPet {"petId": 123}"#));
    }

    #[tokio::test]
    async fn test_integral_float_path_and_partial_result() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/pets/42")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id": 42}"#)
            .create_async()
            .await;

        let tool = tool("GET", "/pets/{petId}", &server.url(), false);
        let response = tool
            .execute(ctx(), json!({"petId": 42.0, "stream": true}))
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(response.is_partial());
        assert!(response.text_content().unwrap().contains("Status: 200"));
    }

    #[tokio::test]
    async fn test_resume_token_is_echoed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/pets/1")
            .with_status(200)
            .with_body("ok")
            .create_async()
            .await;

        let tool = tool("GET", "/pets/{petId}", &server.url(), false);
        let response = tool
            .execute(ctx(), json!({"petId": 1, "resumeToken": "abc"}))
            .await
            .unwrap();

        match response.output {
            ToolOutput::Partial { resume_token, .. } => assert_eq!(resume_token, "abc"),
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_confirmation_gate() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("DELETE", "/pets/5")
            .with_status(204)
            .expect(1)
            .create_async()
            .await;

        let tool = tool("DELETE", "/pets/{petId}", &server.url(), true);

        let held = tool.execute(ctx(), json!({"petId": 5})).await.unwrap();
        assert!(held.requires_confirmation());
        assert_eq!(held.next_steps, vec![r#"call getPet {"confirm": true, "petId": 5}"#.to_string()]);

        let done = tool
            .execute(ctx(), json!({"petId": 5, "confirm": true}))
            .await
            .unwrap();
        assert!(!done.is_error);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_cancelled_call_is_an_error() {
        let tool = tool("GET", "/pets/{petId}", "http://10.255.255.1:9", false);
        let token = CancellationToken::new();
        token.cancel();
        let ctx: Arc<dyn ToolContext> = Arc::new(
            DefaultToolContext::new("c".to_string(), "i".to_string()).with_cancellation_token(token),
        );

        let result = tool.execute(ctx, json!({"petId": 1})).await;
        assert!(matches!(result, Err(Error::Cancelled(_))));
    }
}
