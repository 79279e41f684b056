use std::time::Duration;

use async_trait::async_trait;
use flowline_config::NodeType;
use flowline_step::StepError;
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, instrument};
use url::Url;

use crate::context::ExecutionContext;
use crate::error::NodeError;
use crate::executor::{ExecutorParams, NodeExecutor};
use crate::template;

const HTTP_STEP: &str = "http-request";
const ERROR_PREFIX: &str = "HTTP Request node";

/// Methods the HTTP request node supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
  Get,
  Post,
  Put,
  Patch,
  Delete,
}

impl HttpMethod {
  pub fn parse(method: &str) -> Option<Self> {
    match method.to_uppercase().as_str() {
      "GET" => Some(Self::Get),
      "POST" => Some(Self::Post),
      "PUT" => Some(Self::Put),
      "PATCH" => Some(Self::Patch),
      "DELETE" => Some(Self::Delete),
      _ => None,
    }
  }

  /// Whether requests with this method carry the configured body.
  pub fn has_body(self) -> bool {
    matches!(self, Self::Post | Self::Put | Self::Patch)
  }

  fn as_reqwest(self) -> Method {
    match self {
      Self::Get => Method::GET,
      Self::Post => Method::POST,
      Self::Put => Method::PUT,
      Self::Patch => Method::PATCH,
      Self::Delete => Method::DELETE,
    }
  }
}

/// Node data as stored on the graph, before validation.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHttpRequestData {
  variable_name: Option<String>,
  endpoint: Option<String>,
  method: Option<String>,
  body: Option<String>,
}

/// Validated configuration of an HTTP request node.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequestConfig {
  /// Context key the response is stored under.
  pub variable_name: String,
  /// Endpoint template.
  pub endpoint: String,
  pub method: HttpMethod,
  /// JSON body template, sent for POST, PUT and PATCH.
  pub body: Option<String>,
}

impl HttpRequestConfig {
  /// Validate node data. Every failure is a configuration error naming the
  /// offending field.
  pub fn from_data(data: &Value) -> Result<Self, NodeError> {
    if !data.is_object() {
      return Err(config_error("configuration must be an object"));
    }
    let raw: RawHttpRequestData = serde_json::from_value(data.clone())
      .map_err(|e| config_error(format!("Invalid configuration: {}", e)))?;

    let endpoint = non_empty(raw.endpoint).ok_or_else(|| config_error("No endpoint configured"))?;

    let method = non_empty(raw.method).ok_or_else(|| config_error("No method configured"))?;
    let method = HttpMethod::parse(&method)
      .ok_or_else(|| config_error(format!("Unsupported method '{}'", method)))?;

    let variable_name =
      non_empty(raw.variable_name).ok_or_else(|| config_error("No variable name configured"))?;
    if !is_identifier(&variable_name) {
      return Err(config_error(format!(
        "Invalid variable name '{}'",
        variable_name
      )));
    }

    Ok(Self {
      variable_name,
      endpoint,
      method,
      body: non_empty(raw.body),
    })
  }

  fn request_body(&self) -> Option<&str> {
    if self.method.has_body() {
      self.body.as_deref()
    } else {
      None
    }
  }
}

/// What an HTTP request node stores in the context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
  pub status: u16,
  pub status_text: String,
  /// Parsed JSON body, or the raw text when the body is not JSON.
  pub data: Value,
}

/// Executor for [`NodeType::HttpRequest`] nodes.
#[derive(Debug, Clone, Default)]
pub struct HttpRequestExecutor {
  client: Client,
}

impl HttpRequestExecutor {
  pub fn new(client: Client) -> Self {
    Self { client }
  }

  /// Build an executor whose requests give up after `timeout`.
  pub fn with_timeout(timeout: Duration) -> Result<Self, reqwest::Error> {
    let client = Client::builder().timeout(timeout).build()?;
    Ok(Self::new(client))
  }
}

#[async_trait]
impl NodeExecutor for HttpRequestExecutor {
  #[instrument(name = "http_request", skip(self, params), fields(node_id = %params.node_id))]
  async fn execute(&self, params: ExecutorParams<'_>) -> Result<ExecutionContext, NodeError> {
    let config = HttpRequestConfig::from_data(params.data)?;

    let client = self.client.clone();
    let request_config = config.clone();
    let request_context = params.context.clone();
    let response: HttpResponse = params
      .step
      .run(HTTP_STEP, move || {
        let client = client.clone();
        let config = request_config.clone();
        let context = request_context.clone();
        async move { send_request(&client, &config, &context).await }
      })
      .await?;

    debug!(
      status = response.status,
      variable_name = %config.variable_name,
      "http request completed"
    );

    let mut context = params.context;
    context.insert(config.variable_name, json!({ "httpResponse": response }));
    Ok(context)
  }
}

async fn send_request(
  client: &Client,
  config: &HttpRequestConfig,
  context: &ExecutionContext,
) -> Result<HttpResponse, StepError> {
  let endpoint = template::render(&config.endpoint, context)?;
  let url = Url::parse(&endpoint)
    .map_err(|e| StepError::failed(format!("invalid endpoint URL '{}': {}", endpoint, e)))?;

  let mut request = client.request(config.method.as_reqwest(), url);
  if let Some(body) = config.request_body() {
    let rendered = template::render(body, context)?;
    let body: Value = serde_json::from_str(&rendered)
      .map_err(|e| StepError::failed(format!("request body is not valid JSON: {}", e)))?;
    request = request.json(&body);
  }

  let response = request
    .send()
    .await
    .map_err(|e| StepError::failed(format!("request failed: {}", e)))?;

  let status = response.status();
  let status_text = status.canonical_reason().unwrap_or_default().to_string();
  if !status.is_success() {
    return Err(StepError::failed(format!(
      "request failed with status {} {}",
      status.as_u16(),
      status_text
    )));
  }

  let text = response
    .text()
    .await
    .map_err(|e| StepError::failed(format!("failed to read response body: {}", e)))?;

  // Try to parse body as JSON, fall back to string
  let data: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

  Ok(HttpResponse {
    status: status.as_u16(),
    status_text,
    data,
  })
}

fn config_error(message: impl std::fmt::Display) -> NodeError {
  NodeError::configuration(
    NodeType::HttpRequest,
    format!("{}: {}", ERROR_PREFIX, message),
  )
}

fn non_empty(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

/// `^[A-Za-z_$][A-Za-z0-9_]*$`
fn is_identifier(name: &str) -> bool {
  let mut chars = name.chars();
  match chars.next() {
    Some(first) if first.is_ascii_alphabetic() || first == '_' || first == '$' => {
      chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    }
    _ => false,
  }
}
