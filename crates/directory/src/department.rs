use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opsconsole_core::{
    DepartmentId, DomainError, DomainResult, Entity, optional_text, require_hex_color,
    require_text,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Department {
    pub id: DepartmentId,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Department {
    type Id = DepartmentId;
    const KIND: &'static str = "departments";

    fn id(&self) -> DepartmentId {
        self.id
    }

    fn department_id(&self) -> Option<DepartmentId> {
        Some(self.id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewDepartment {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepartmentPatch {
    pub code: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
    pub color: Option<String>,
}

/// Upper-cased, 2 to 16 characters of `[A-Z0-9_-]`.
pub fn normalize_code(code: &str) -> DomainResult<String> {
    let code = require_text("code", code)?.to_ascii_uppercase();
    let len_ok = (2..=16).contains(&code.len());
    let chars_ok = code
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if !len_ok || !chars_ok {
        return Err(DomainError::validation(
            "code must be 2-16 letters, digits, '-' or '_'",
        ));
    }
    Ok(code)
}

fn normalize_color(color: Option<String>) -> DomainResult<Option<String>> {
    optional_text(color)
        .map(|c| require_hex_color("color", &c))
        .transpose()
}

impl Department {
    pub fn create(input: NewDepartment, now: DateTime<Utc>) -> DomainResult<Self> {
        Ok(Self {
            id: DepartmentId::new(),
            code: normalize_code(&input.code)?,
            name: require_text("name", &input.name)?,
            description: optional_text(input.description),
            icon: optional_text(input.icon),
            color: normalize_color(input.color)?,
            created_at: now,
            updated_at: now,
        })
    }

    /// Validates the whole patch before committing any field.
    pub fn apply(&mut self, patch: DepartmentPatch, now: DateTime<Utc>) -> DomainResult<()> {
        let mut next = self.clone();
        if let Some(code) = patch.code {
            next.code = normalize_code(&code)?;
        }
        if let Some(name) = patch.name {
            next.name = require_text("name", &name)?;
        }
        if patch.description.is_some() {
            next.description = optional_text(patch.description);
        }
        if patch.icon.is_some() {
            next.icon = optional_text(patch.icon);
        }
        if patch.color.is_some() {
            next.color = normalize_color(patch.color)?;
        }
        next.updated_at = now;
        *self = next;
        Ok(())
    }
}
