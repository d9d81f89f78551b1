//! Consistency checks between the document and the built catalog.

use crate::parser::ApiDocument;
use crate::schema::SchemaSynthesizer;
use crate::types::{ApiParameter, Operation, ParameterLocation};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

const STANDARD_TYPES: [&str; 6] = ["string", "number", "integer", "boolean", "array", "object"];

/// Header parameters OpenAPI says must be ignored
const RESERVED_HEADERS: [&str; 3] = ["accept", "content-type", "authorization"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
        }
    }
}

/// One finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    pub severity: Severity,
    pub message: String,
    pub suggestion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameter: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
}

impl LintIssue {
    fn new(severity: Severity, operation: &Operation, message: String, suggestion: &str) -> Self {
        Self {
            severity,
            message,
            suggestion: suggestion.to_string(),
            operation: operation.operation_id.clone().filter(|id| !id.trim().is_empty()),
            parameter: None,
            path: Some(operation.path.clone()),
            method: Some(operation.method.clone()),
        }
    }

    fn for_parameter(mut self, parameter: &ApiParameter) -> Self {
        self.parameter = Some(parameter.name.clone());
        self
    }
}

/// Issues plus counts per severity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintReport {
    pub issues: Vec<LintIssue>,
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl LintReport {
    pub fn new(issues: Vec<LintIssue>) -> Self {
        let count = |s: Severity| issues.iter().filter(|i| i.severity == s).count();
        Self {
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            infos: count(Severity::Info),
            issues,
        }
    }

    /// True iff there are no errors
    pub fn passed(&self) -> bool {
        self.errors == 0
    }
}

impl std::fmt::Display for LintReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for issue in &self.issues {
            let location = match (&issue.method, &issue.path) {
                (Some(method), Some(path)) => format!("{} {}", method, path),
                _ => "document".to_string(),
            };
            match &issue.parameter {
                Some(param) => writeln!(
                    f,
                    "[{}] {} (parameter '{}'): {}",
                    issue.severity, location, param, issue.message
                )?,
                None => writeln!(f, "[{}] {}: {}", issue.severity, location, issue.message)?,
            }
            writeln!(f, "    suggestion: {}", issue.suggestion)?;
        }
        write!(
            f,
            "{} errors, {} warnings, {} info: {}",
            self.errors,
            self.warnings,
            self.infos,
            if self.passed() { "PASSED" } else { "FAILED" }
        )
    }
}

/// Cross-check operations against the registered tool names.
///
/// Errors are always reported; `detailed` adds warnings and info.
pub fn check(
    document: &ApiDocument,
    operations: &[Operation],
    registered_tool_names: &[String],
    detailed: bool,
) -> Vec<LintIssue> {
    let synthesizer = SchemaSynthesizer::new(document.raw());
    let mut issues = Vec::new();

    let mut seen: HashMap<&str, usize> = HashMap::new();
    for op in operations {
        if let Some(id) = op.operation_id.as_deref().filter(|id| !id.trim().is_empty()) {
            *seen.entry(id).or_default() += 1;
        }
    }

    for op in operations {
        if !op.has_operation_id() {
            issues.push(LintIssue::new(
                Severity::Error,
                op,
                "Operation has no operationId".to_string(),
                "Add a unique, non-empty operationId.",
            ));
            let generated = op.id();
            if registered_tool_names.contains(&generated) {
                issues.push(LintIssue::new(
                    Severity::Error,
                    op,
                    format!(
                        "Tool '{}' is registered under a generated name because its operation has no operationId",
                        generated
                    ),
                    "Declare an operationId so the tool name stays stable.",
                ));
            }
        } else if let Some(id) = op.operation_id.as_deref() {
            if seen.get(id).copied().unwrap_or(0) > 1 {
                issues.push(LintIssue::new(
                    Severity::Error,
                    op,
                    format!("operationId '{}' is not unique", id),
                    "Rename one of the operations; the last registration would shadow the others.",
                ));
            }
        }

        for param in &op.parameters {
            check_parameter(op, param, &synthesizer, detailed, &mut issues);
        }

        if detailed {
            check_prose(op, &mut issues);
        }
    }

    issues
}

fn check_parameter(
    op: &Operation,
    param: &ApiParameter,
    synthesizer: &SchemaSynthesizer<'_>,
    detailed: bool,
    issues: &mut Vec<LintIssue>,
) {
    if param.name.trim().is_empty() {
        issues.push(
            LintIssue::new(
                Severity::Error,
                op,
                "Parameter has no name".to_string(),
                "Give every parameter a name.",
            )
            .for_parameter(param),
        );
        return;
    }

    let fragment = synthesizer
        .synthesize(param.schema.as_ref(), &param.name)
        .fragment;
    let ty = fragment
        .as_ref()
        .and_then(|f| f.get("type"))
        .and_then(Value::as_str)
        .map(str::to_string);
    let polymorphic = fragment
        .as_ref()
        .is_some_and(|f| f.get("oneOf").is_some() || f.get("anyOf").is_some());

    if ty.is_none() && !polymorphic {
        issues.push(
            LintIssue::new(
                Severity::Error,
                op,
                "Parameter has no resolvable schema type".to_string(),
                "Declare a schema with a type for the parameter.",
            )
            .for_parameter(param),
        );
    }

    if !detailed {
        return;
    }

    if let Some(ty) = ty.as_deref() {
        if !STANDARD_TYPES.contains(&ty) {
            issues.push(
                LintIssue::new(
                    Severity::Warning,
                    op,
                    format!("Parameter type '{}' is not a standard JSON Schema type", ty),
                    "Use string, number, integer, boolean, array or object.",
                )
                .for_parameter(param),
            );
        }
    }

    match param.location {
        ParameterLocation::Header
            if RESERVED_HEADERS.contains(&param.name.to_ascii_lowercase().as_str()) =>
        {
            issues.push(
                LintIssue::new(
                    Severity::Warning,
                    op,
                    format!("Header parameter '{}' is ignored by OpenAPI tooling", param.name),
                    "Model Accept/Content-Type via media types and Authorization via security schemes.",
                )
                .for_parameter(param),
            );
        }
        ParameterLocation::Path if !op.path.contains(&format!("{{{}}}", param.name)) => {
            issues.push(
                LintIssue::new(
                    Severity::Warning,
                    op,
                    format!("Path parameter '{}' does not appear in the path template", param.name),
                    "Add the placeholder to the path or move the parameter to the query.",
                )
                .for_parameter(param),
            );
        }
        _ => {}
    }

    let Some(fragment) = fragment else {
        return;
    };
    let enumeration = fragment.get("enum").and_then(Value::as_array);
    let default = fragment.get("default");

    if matches!(ty.as_deref(), Some("string") | Some("integer"))
        && enumeration.is_none()
        && default.is_none()
        && fragment.get("example").is_none()
    {
        issues.push(
            LintIssue::new(
                Severity::Info,
                op,
                "Parameter has no enum, default or example".to_string(),
                "Add an example so callers can see a valid value.",
            )
            .for_parameter(param),
        );
    }

    if let (Some(values), Some(default)) = (enumeration, default) {
        if !values.contains(default) {
            issues.push(
                LintIssue::new(
                    Severity::Warning,
                    op,
                    format!("Default {} is not one of the enum values", default),
                    "Make the default one of the allowed values.",
                )
                .for_parameter(param),
            );
        }
    }
}

fn check_prose(op: &Operation, issues: &mut Vec<LintIssue>) {
    let summary = op.summary.as_deref().unwrap_or("").trim();
    let description = op.description.as_deref().unwrap_or("").trim();

    if summary.is_empty() {
        issues.push(LintIssue::new(
            Severity::Warning,
            op,
            "Operation has no summary".to_string(),
            "Add a one-line summary; it becomes the tool title.",
        ));
    }
    if description.is_empty() {
        issues.push(LintIssue::new(
            Severity::Info,
            op,
            "Operation has no description".to_string(),
            "Describe what the operation does and when to use it.",
        ));
    }
    if op.tags.is_empty() {
        issues.push(LintIssue::new(
            Severity::Info,
            op,
            "Operation has no tags".to_string(),
            "Tag the operation so it can be filtered.",
        ));
    }

    let prose = format!("{} {}", summary, description).to_ascii_lowercase();
    for param in op.parameters.iter().filter(|p| p.required) {
        if !prose.contains(&param.name.to_ascii_lowercase()) {
            issues.push(
                LintIssue::new(
                    Severity::Info,
                    op,
                    format!("Required parameter '{}' is not mentioned in the operation's prose", param.name),
                    "Mention required parameters in the summary or description.",
                )
                .for_parameter(param),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::OpenApiParser;

    const SPEC: &str = r#"
openapi: 3.0.0
info:
  title: Lint
  version: 1.0.0
paths:
  /items/{itemId}:
    get:
      operationId: getItem
      summary: Get an item by itemId
      description: Returns one item.
      tags: [items]
      parameters:
        - name: itemId
          in: path
          required: true
          schema:
            type: integer
            example: 1
        - name: sort
          in: query
          schema:
            type: string
            enum: [asc, desc]
            default: up
      responses:
        '200':
          description: OK
    delete:
      responses:
        '204':
          description: Deleted
      parameters:
        - name: itemId
          in: path
          required: true
          content:
            text/plain: {}
"#;

    fn run(detailed: bool, registered: &[&str]) -> LintReport {
        let parser = OpenApiParser::from_str(SPEC).unwrap();
        let operations = parser.parse().unwrap();
        let registered: Vec<String> = registered.iter().map(|s| s.to_string()).collect();
        LintReport::new(check(parser.document(), &operations, &registered, detailed))
    }

    #[test]
    fn test_errors_always_reported() {
        let report = run(false, &["getItem", "delete_items_itemId"]);

        assert!(!report.passed());
        assert_eq!(report.warnings, 0);
        let messages: Vec<&str> = report.issues.iter().map(|i| i.message.as_str()).collect();
        assert!(messages.contains(&"Operation has no operationId"));
        assert!(messages.iter().any(|m| m.contains("generated name")));
        assert!(messages.contains(&"Parameter has no resolvable schema type"));
    }

    #[test]
    fn test_detailed_adds_warnings() {
        let report = run(true, &["getItem"]);

        assert!(report.issues.iter().any(|i| {
            i.severity == Severity::Warning && i.message.contains("not one of the enum values")
        }));
        assert!(report.issues.iter().any(|i| {
            i.severity == Severity::Warning && i.message == "Operation has no summary"
        }));
        assert!(report.to_string().contains("FAILED"));
    }

    #[test]
    fn test_clean_document_passes() {
        let parser = OpenApiParser::from_str(
            "openapi: 3.0.0\ninfo: {title: t, version: '1'}\npaths:\n  /a:\n    get:\n      operationId: getA\n      responses: {'200': {description: ok}}\n",
        )
        .unwrap();
        let operations = parser.parse().unwrap();
        let report = LintReport::new(check(parser.document(), &operations, &["getA".to_string()], false));
        assert!(report.passed());
    }
}
