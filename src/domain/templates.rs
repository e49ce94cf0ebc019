//! Notification template domain types
//!
//! Templates are referenced by name from escalation steps. Subjects and bodies
//! are Jinja-style (`{{ variable }}`, filters, conditionals) and every top-level
//! variable they read must be declared in `variables`.

use chrono::{DateTime, Utc};
use minijinja::{Environment, ErrorKind, Template, UndefinedBehavior};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use super::notifications::NotificationCategory;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("missing value for template variable '{0}'")]
    MissingVariable(String),

    #[error("placeholder '{0}' is not declared in variables")]
    UndeclaredPlaceholder(String),

    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("template render error: {0}")]
    Render(String),
}

impl From<minijinja::Error> for TemplateError {
    fn from(err: minijinja::Error) -> Self {
        let msg = err.to_string();
        match err.kind() {
            ErrorKind::SyntaxError => TemplateError::Syntax(msg),
            ErrorKind::UndefinedError => TemplateError::MissingVariable(msg),
            _ => TemplateError::Render(msg),
        }
    }
}

/// Notification template entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationTemplate {
    pub id: Uuid,
    pub name: String,
    pub category: NotificationCategory,
    pub subject: String,
    pub body: String,
    pub variables: Vec<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Rendered subject and body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderedTemplate {
    pub subject: String,
    pub body: String,
}

impl NotificationTemplate {
    pub fn render(&self, variables: &Map<String, Value>) -> Result<RenderedTemplate, TemplateError> {
        Ok(RenderedTemplate {
            subject: render_text(&self.subject, variables)?,
            body: render_text(&self.body, variables)?,
        })
    }
}

/// Request DTO for creating a template
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateTemplateRequest {
    pub name: String,
    pub category: NotificationCategory,
    pub subject: String,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}

/// Request DTO for updating a template
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct UpdateTemplateRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<NotificationCategory>,
    #[serde(default)]
    pub subject: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub variables: Option<Vec<String>>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

/// Request DTO for previewing a rendered template
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct PreviewTemplateRequest {
    #[serde(default)]
    pub variables: Map<String, Value>,
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_keep_trailing_newline(true);
    env
}

fn referenced(template: &Template<'_, '_>) -> Vec<String> {
    let mut names: Vec<String> = template.undeclared_variables(false).into_iter().collect();
    names.sort();
    names
}

/// Top-level variables a template text reads, sorted and deduplicated
pub fn placeholders(text: &str) -> Result<Vec<String>, TemplateError> {
    let env = environment();
    let template = env.template_from_str(text)?;
    Ok(referenced(&template))
}

/// Check that every placeholder in `texts` is declared
pub fn validate_declared(texts: &[&str], variables: &[String]) -> Result<(), TemplateError> {
    for text in texts {
        for name in placeholders(text)? {
            if !variables.iter().any(|v| v == &name) {
                return Err(TemplateError::UndeclaredPlaceholder(name));
            }
        }
    }
    Ok(())
}

/// Render `text`; a referenced variable absent (or null) in `variables` fails
pub fn render_text(text: &str, variables: &Map<String, Value>) -> Result<String, TemplateError> {
    let env = environment();
    let template = env.template_from_str(text)?;
    if let Some(missing) = referenced(&template)
        .into_iter()
        .find(|name| matches!(variables.get(name), None | Some(Value::Null)))
    {
        return Err(TemplateError::MissingVariable(missing));
    }
    Ok(template.render(variables)?)
}
