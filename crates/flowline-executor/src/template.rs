//! Minimal template substitution over an [`ExecutionContext`].
//!
//! Supported expressions:
//! - `{{ path }}` inserts the value at a dotted context path. Strings are
//!   inserted as-is, other values as compact JSON.
//! - `{{ json path }}` inserts the value as pretty-printed JSON.
//! - `this` refers to the whole context.
//!
//! There is no expression language. Anything outside `{{ }}` is copied
//! verbatim.

use flowline_step::StepError;
use serde_json::Value;
use thiserror::Error;

use crate::context::ExecutionContext;

const OPEN: &str = "{{";
const CLOSE: &str = "}}";
const THIS: &str = "this";
const JSON_HELPER: &str = "json";

/// Errors raised while rendering a template.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TemplateError {
  #[error("unclosed '{{{{' at offset {offset}")]
  Unterminated { offset: usize },

  #[error("empty template expression at offset {offset}")]
  EmptyExpression { offset: usize },

  #[error("malformed template expression '{expression}'")]
  Malformed { expression: String },

  #[error("unknown template helper '{helper}'")]
  UnknownHelper { helper: String },

  #[error("template path '{path}' not found in context")]
  MissingPath { path: String },
}

impl From<TemplateError> for StepError {
  fn from(e: TemplateError) -> Self {
    StepError::failed(e.to_string())
  }
}

enum Format {
  Raw,
  Json,
}

/// Render `template` against `context`.
pub fn render(template: &str, context: &ExecutionContext) -> Result<String, TemplateError> {
  let mut output = String::with_capacity(template.len());
  let mut rest = template;
  let mut offset = 0;

  while let Some(start) = rest.find(OPEN) {
    output.push_str(&rest[..start]);
    let open_at = offset + start;
    let after_open = &rest[start + OPEN.len()..];
    let end = after_open
      .find(CLOSE)
      .ok_or(TemplateError::Unterminated { offset: open_at })?;

    let expression = after_open[..end].trim();
    if expression.is_empty() {
      return Err(TemplateError::EmptyExpression { offset: open_at });
    }
    output.push_str(&evaluate(expression, context)?);

    let consumed = start + OPEN.len() + end + CLOSE.len();
    rest = &rest[consumed..];
    offset += consumed;
  }

  output.push_str(rest);
  Ok(output)
}

fn evaluate(expression: &str, context: &ExecutionContext) -> Result<String, TemplateError> {
  let parts: Vec<&str> = expression.split_whitespace().collect();
  let (format, path) = match parts.as_slice() {
    [path] => (Format::Raw, *path),
    [helper, path] if *helper == JSON_HELPER => (Format::Json, *path),
    [helper, _] => {
      return Err(TemplateError::UnknownHelper {
        helper: helper.to_string(),
      });
    }
    _ => {
      return Err(TemplateError::Malformed {
        expression: expression.to_string(),
      });
    }
  };

  if path.split('.').any(str::is_empty) {
    return Err(TemplateError::Malformed {
      expression: expression.to_string(),
    });
  }

  let whole;
  let value = if path == THIS {
    whole = context.to_value();
    &whole
  } else {
    context
      .lookup(path)
      .ok_or_else(|| TemplateError::MissingPath {
        path: path.to_string(),
      })?
  };

  Ok(match format {
    Format::Raw => match value {
      Value::String(s) => s.clone(),
      other => other.to_string(),
    },
    Format::Json => serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string()),
  })
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn context() -> ExecutionContext {
    ExecutionContext::from_payload(json!({
      "foo": "bar",
      "count": 3,
      "user": { "name": "ada", "tags": ["x", "y"] }
    }))
  }

  #[test]
  fn plain_text_is_copied() {
    assert_eq!(render("no templates here }}", &context()).unwrap(), "no templates here }}");
    assert_eq!(render("", &context()).unwrap(), "");
  }

  #[test]
  fn substitutes_paths() {
    let ctx = context();
    assert_eq!(
      render("https://api.test/{{ user.name }}/{{count}}", &ctx).unwrap(),
      "https://api.test/ada/3"
    );
    assert_eq!(render("{{user.tags.0}}", &ctx).unwrap(), "x");
    assert_eq!(render("{{ user.tags }}", &ctx).unwrap(), r#"["x","y"]"#);
  }

  #[test]
  fn json_helper_quotes_strings() {
    let ctx = context();
    assert_eq!(render(r#"{"value": {{ json foo }}}"#, &ctx).unwrap(), r#"{"value": "bar"}"#);
    assert_eq!(
      render("{{ json user.tags }}", &ctx).unwrap(),
      "[\n  \"x\",\n  \"y\"\n]"
    );
  }

  #[test]
  fn this_refers_to_whole_context() {
    let ctx = ExecutionContext::from_payload(json!({ "a": 1 }));
    assert_eq!(render("{{ this }}", &ctx).unwrap(), r#"{"a":1}"#);
    assert_eq!(render("{{ json this }}", &ctx).unwrap(), "{\n  \"a\": 1\n}");
  }

  #[test]
  fn errors() {
    let ctx = context();
    assert_eq!(
      render("{{ missing.path }}", &ctx),
      Err(TemplateError::MissingPath {
        path: "missing.path".to_string()
      })
    );
    assert_eq!(
      render("abc {{ foo", &ctx),
      Err(TemplateError::Unterminated { offset: 4 })
    );
    assert_eq!(
      render("{{foo}} {{   }}", &ctx),
      Err(TemplateError::EmptyExpression { offset: 8 })
    );
    assert_eq!(
      render("{{ upper foo }}", &ctx),
      Err(TemplateError::UnknownHelper {
        helper: "upper".to_string()
      })
    );
    assert!(matches!(
      render("{{ json foo bar }}", &ctx),
      Err(TemplateError::Malformed { .. })
    ));
    assert!(matches!(
      render("{{ user..name }}", &ctx),
      Err(TemplateError::Malformed { .. })
    ));
  }

  #[test]
  fn template_errors_are_retriable_step_failures() {
    let err: StepError = TemplateError::MissingPath {
      path: "x".to_string(),
    }
    .into();
    assert!(err.is_retriable());
  }
}
