//! Template store
//!
//! In-memory notification templates with placeholder validation.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::domain::notifications::NotificationCategory;
use crate::domain::templates::{
    validate_declared, CreateTemplateRequest, NotificationTemplate, RenderedTemplate,
    UpdateTemplateRequest,
};
use crate::error::{ServiceError, ServiceResult};

const ENTITY: &str = "notification template";

#[derive(Debug, Default)]
pub struct TemplateStore {
    templates: RwLock<Vec<NotificationTemplate>>,
}

impl TemplateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn list(&self) -> Vec<NotificationTemplate> {
        self.templates.read().clone()
    }

    pub fn get(&self, id: Uuid) -> ServiceResult<NotificationTemplate> {
        self.templates
            .read()
            .iter()
            .find(|t| t.id == id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))
    }

    /// Active template with the given name, as referenced by escalation steps
    pub fn find_active(&self, name: &str) -> Option<NotificationTemplate> {
        self.templates
            .read()
            .iter()
            .find(|t| t.is_active && t.name == name)
            .cloned()
    }

    pub fn create(
        &self,
        req: CreateTemplateRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<NotificationTemplate> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("template name is required".into()));
        }
        validate_declared(&[req.subject.as_str(), req.body.as_str()], &req.variables)?;

        let mut templates = self.templates.write();
        if templates.iter().any(|t| t.name == name) {
            return Err(ServiceError::Conflict(format!(
                "a template named '{}' already exists",
                name
            )));
        }

        let template = NotificationTemplate {
            id: Uuid::new_v4(),
            name,
            category: req.category,
            subject: req.subject,
            body: req.body,
            variables: req.variables,
            is_active: req.is_active,
            created_at: now,
            updated_at: now,
        };
        templates.push(template.clone());

        tracing::info!(
            template_id = %template.id,
            name = %template.name,
            category = %template.category,
            "Notification template created"
        );

        Ok(template)
    }

    pub fn update(
        &self,
        id: Uuid,
        req: UpdateTemplateRequest,
        now: DateTime<Utc>,
    ) -> ServiceResult<NotificationTemplate> {
        let mut templates = self.templates.write();

        if let Some(name) = &req.name {
            let name = name.trim();
            if name.is_empty() {
                return Err(ServiceError::Validation("template name is required".into()));
            }
            if templates.iter().any(|t| t.id != id && t.name == name) {
                return Err(ServiceError::Conflict(format!(
                    "a template named '{}' already exists",
                    name
                )));
            }
        }

        let template = templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| ServiceError::not_found(ENTITY, id))?;

        let mut updated = template.clone();
        if let Some(name) = req.name {
            updated.name = name.trim().to_string();
        }
        if let Some(category) = req.category {
            updated.category = category;
        }
        if let Some(subject) = req.subject {
            updated.subject = subject;
        }
        if let Some(body) = req.body {
            updated.body = body;
        }
        if let Some(variables) = req.variables {
            updated.variables = variables;
        }
        if let Some(is_active) = req.is_active {
            updated.is_active = is_active;
        }
        validate_declared(&[updated.subject.as_str(), updated.body.as_str()], &updated.variables)?;
        updated.updated_at = now;

        *template = updated.clone();
        tracing::info!(template_id = %id, "Notification template updated");
        Ok(updated)
    }

    pub fn delete(&self, id: Uuid) -> ServiceResult<()> {
        let mut templates = self.templates.write();
        let before = templates.len();
        templates.retain(|t| t.id != id);
        if templates.len() == before {
            return Err(ServiceError::not_found(ENTITY, id));
        }
        tracing::info!(template_id = %id, "Notification template deleted");
        Ok(())
    }

    pub fn preview(&self, id: Uuid, variables: &Map<String, Value>) -> ServiceResult<RenderedTemplate> {
        Ok(self.get(id)?.render(variables)?)
    }
}

/// Templates available out of the box
pub fn default_templates() -> Vec<CreateTemplateRequest> {
    let vars = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        CreateTemplateRequest {
            name: "high-value-follow-up".into(),
            category: NotificationCategory::Opportunity,
            subject: "Follow up needed: {{title}}".into(),
            body: "{{message}}\n\nThis alert is still unread. Escalation rule \"{{rule_name}}\", step {{step_number}}.".into(),
            variables: vars(&["title", "message", "rule_name", "step_number"]),
            is_active: true,
        },
        CreateTemplateRequest {
            name: "high-value-director-escalation".into(),
            category: NotificationCategory::Opportunity,
            subject: "Director escalation: {{project_name}}".into(),
            body: "{{project_name}} valued at {{estimated_value}} has not been picked up.\n\n{{message}}".into(),
            variables: vars(&["project_name", "estimated_value", "message"]),
            is_active: true,
        },
        CreateTemplateRequest {
            name: "engineer-follow-up-reminder".into(),
            category: NotificationCategory::Engineer,
            subject: "Engineer follow-up overdue: {{engineer_name}}".into(),
            body: "{{message}}\n\nPlease log the interaction once complete.".into(),
            variables: vars(&["engineer_name", "message"]),
            is_active: true,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::templates::TemplateError;
    use serde_json::json;

    fn request(name: &str) -> CreateTemplateRequest {
        CreateTemplateRequest {
            name: name.into(),
            category: NotificationCategory::Quote,
            subject: "Quote {{quote_id}}".into(),
            body: "Quote {{quote_id}} from {{manufacturer}}".into(),
            variables: vec!["quote_id".into(), "manufacturer".into()],
            is_active: true,
        }
    }

    #[test]
    fn test_create_and_find_by_name() {
        let store = TemplateStore::new();
        let now = Utc::now();
        let created = store.create(request("quote-in"), now).unwrap();
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get(created.id).unwrap().name, "quote-in");
        assert!(store.find_active("quote-in").is_some());
        assert!(store.find_active("missing").is_none());
    }

    #[test]
    fn test_create_rejects_undeclared_placeholder() {
        let store = TemplateStore::new();
        let mut req = request("quote-in");
        req.variables.pop();
        let err = store.create(req, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Template(TemplateError::UndeclaredPlaceholder(ref name)) if name == "manufacturer"
        ));
    }

    #[test]
    fn test_duplicate_names_conflict() {
        let store = TemplateStore::new();
        store.create(request("quote-in"), Utc::now()).unwrap();
        let err = store.create(request("quote-in"), Utc::now()).unwrap_err();
        assert!(matches!(err, ServiceError::Conflict(_)));
    }

    #[test]
    fn test_update_revalidates_and_refreshes_timestamp() {
        let store = TemplateStore::new();
        let t0 = Utc::now();
        let created = store.create(request("quote-in"), t0).unwrap();

        let bad = UpdateTemplateRequest {
            body: Some("{{unknown}}".into()),
            ..Default::default()
        };
        assert!(store.update(created.id, bad, t0).is_err());
        assert_eq!(store.get(created.id).unwrap().body, created.body);

        let t1 = t0 + chrono::Duration::minutes(1);
        let updated = store
            .update(
                created.id,
                UpdateTemplateRequest {
                    is_active: Some(false),
                    ..Default::default()
                },
                t1,
            )
            .unwrap();
        assert!(!updated.is_active);
        assert_eq!(updated.updated_at, t1);
        assert!(store.find_active("quote-in").is_none());
    }

    #[test]
    fn test_unknown_ids_are_not_found() {
        let store = TemplateStore::new();
        let id = Uuid::new_v4();
        assert!(matches!(store.get(id), Err(ServiceError::NotFound { .. })));
        assert!(matches!(store.delete(id), Err(ServiceError::NotFound { .. })));
        assert!(matches!(
            store.update(id, UpdateTemplateRequest::default(), Utc::now()),
            Err(ServiceError::NotFound { .. })
        ));
    }

    #[test]
    fn test_preview_renders_or_reports_missing() {
        let store = TemplateStore::new();
        let created = store.create(request("quote-in"), Utc::now()).unwrap();
        let vars = json!({"quote_id": "Q-9", "manufacturer": "Lennox"});
        let rendered = store
            .preview(created.id, vars.as_object().unwrap())
            .unwrap();
        assert_eq!(rendered.subject, "Quote Q-9");
        assert_eq!(rendered.body, "Quote Q-9 from Lennox");

        let partial = json!({"quote_id": "Q-9"});
        let err = store
            .preview(created.id, partial.as_object().unwrap())
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::Template(TemplateError::MissingVariable(_))
        ));
    }

    #[test]
    fn test_default_templates_are_valid() {
        let store = TemplateStore::new();
        for req in default_templates() {
            store.create(req, Utc::now()).unwrap();
        }
        assert_eq!(store.list().len(), 3);
    }
}
