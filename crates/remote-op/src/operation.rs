//! Operation catalogue
//!
//! The bucket-operations endpoint is a single URL that dispatches on an
//! `operation` field: POST bodies for mutations, query strings for reads.
//! Update and destroy endpoints are dedicated URLs triggered with an
//! empty POST or a DELETE.

use reqwest::Method;
use serde_json::{Value, json};

/// A named action sent to a remote endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Create the user's working bucket
    Create,
    /// Create the user's output bucket
    CreateOutput,
    /// Write `content` to `path` inside the bucket
    Upload { path: String, content: String },
    /// Build requirements.txt from the uploaded sources
    GenerateRequirements,
    /// Read a file back
    Read { path: String },
    /// Request a signed download URL
    Download { path: String },
    /// Bare POST with no body (code/data update functions)
    Trigger,
    /// DELETE with an empty JSON object body
    Destroy,
    /// Request a signed URL for the compressed output workspace
    WorkspaceUrl { bucket_name: String },
    /// Anything else, given on the command line
    Custom {
        method: Method,
        name: Option<String>,
        body: Option<Value>,
    },
}

impl Operation {
    /// Name used in logs and in the `operation` field.
    pub fn name(&self) -> &str {
        match self {
            Operation::Create => "create",
            Operation::CreateOutput => "create_output",
            Operation::Upload { .. } => "upload",
            Operation::GenerateRequirements => "generate_requirements",
            Operation::Read { .. } => "read",
            Operation::Download { .. } => "download",
            Operation::Trigger => "trigger",
            Operation::Destroy => "destroy",
            Operation::WorkspaceUrl { .. } => "workspace_url",
            Operation::Custom { name, .. } => name.as_deref().unwrap_or("custom"),
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Operation::Read { .. } | Operation::Download { .. } => Method::GET,
            Operation::Destroy => Method::DELETE,
            Operation::Custom { method, .. } => method.clone(),
            _ => Method::POST,
        }
    }

    /// JSON body, if the operation sends one.
    pub fn body(&self) -> Option<Value> {
        match self {
            Operation::Create | Operation::CreateOutput | Operation::GenerateRequirements => {
                Some(json!({ "operation": self.name() }))
            }
            Operation::Upload { path, content } => Some(json!({
                "operation": "upload",
                "path": path,
                "content": content,
            })),
            Operation::Destroy => Some(json!({})),
            Operation::WorkspaceUrl { bucket_name } => Some(json!({ "bucket_name": bucket_name })),
            Operation::Read { .. } | Operation::Download { .. } | Operation::Trigger => None,
            Operation::Custom { method, .. } if *method == Method::GET => None,
            Operation::Custom { name, body, .. } => custom_body(name.as_deref(), body.clone()),
        }
    }

    /// Query parameters, if the operation is addressed by query string.
    pub fn query(&self) -> Vec<(String, String)> {
        match self {
            Operation::Read { path } | Operation::Download { path } => vec![
                ("operation".to_string(), self.name().to_string()),
                ("path".to_string(), path.clone()),
            ],
            Operation::Custom {
                method,
                name: Some(name),
                ..
            } if *method == Method::GET => vec![("operation".to_string(), name.clone())],
            _ => Vec::new(),
        }
    }
}

/// Merge an operation name into a custom body. An explicit `operation`
/// key in the body wins; non-object bodies are sent as-is.
fn custom_body(name: Option<&str>, body: Option<Value>) -> Option<Value> {
    match (name, body) {
        (None, body) => body,
        (Some(name), None) => Some(json!({ "operation": name })),
        (Some(name), Some(Value::Object(mut map))) => {
            map.entry("operation")
                .or_insert_with(|| Value::String(name.to_string()));
            Some(Value::Object(map))
        }
        (Some(_), Some(other)) => Some(other),
    }
}
